use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

/// Category tag used when the knowledge base entry carries none
pub const UNKNOWN_CATEGORY: &str = "desconocido";

/// A government procedure ("trámite") as stored in the knowledge base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProcedureRecord {
    /// Stable identifier: the procedure's page URL
    #[serde(rename = "url")]
    pub id: String,

    /// Category tag (organism/theme the procedure belongs to)
    #[serde(
        rename = "categoria",
        default = "default_category",
        deserialize_with = "null_as_category"
    )]
    pub category: String,

    /// Structured procedure attributes
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: ProcedureData,
}

fn default_category() -> String {
    UNKNOWN_CATEGORY.to_string()
}

impl ProcedureRecord {
    /// Create a record with the default category
    pub fn new(id: impl Into<String>, data: ProcedureData) -> Self {
        Self {
            id: id.into(),
            category: default_category(),
            data,
        }
    }

    /// Builder: set category
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Title, trimmed; empty when the record has none
    #[must_use]
    pub fn title(&self) -> &str {
        self.data.title.trim()
    }

    /// Number of physical locations the procedure can be done at
    #[must_use]
    pub fn location_count(&self) -> usize {
        match self.data.location_options.len() {
            0 if self.data.contact.is_empty() => 0,
            0 => 1,
            n => n,
        }
    }

    /// True while the procedure maps to several offices and none was picked yet
    #[must_use]
    pub fn needs_location_choice(&self) -> bool {
        self.data.location_options.len() > 1 && self.data.selected_location.is_none()
    }

    /// The contact details that answer a location question, if any.
    ///
    /// Top-level details win (they hold a merged selection); a lone location option is
    /// used when the top level is empty.
    #[must_use]
    pub fn effective_contact(&self) -> Option<&ContactDetails> {
        if !self.data.contact.is_empty() {
            return Some(&self.data.contact);
        }
        match self.data.location_options.as_slice() {
            [only] if !only.contact.is_empty() => Some(&only.contact),
            _ => None,
        }
    }

    /// Copy of this record with `location` merged into its top-level contact details and
    /// recorded as choice `index` (0-based). The previous map link is dropped.
    #[must_use]
    pub fn with_location(&self, index: usize, location: &LocationEntry) -> Self {
        let mut merged = self.clone();
        merged.data.contact = location.contact.clone();
        merged.data.selected_location = Some(index);
        merged.data.map_url = None;
        merged
    }
}

/// Procedure attributes, keyed the way the scraper writes them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProcedureData {
    #[serde(rename = "titulo", default, deserialize_with = "null_as_default")]
    pub title: String,

    #[serde(rename = "descripcion", default, deserialize_with = "null_as_default")]
    pub description: String,

    #[serde(rename = "requisitos", default, deserialize_with = "null_as_default")]
    pub requirements: TextOrList,

    #[serde(rename = "costo", default, deserialize_with = "null_as_default")]
    pub cost: Cost,

    #[serde(rename = "pasos", default, deserialize_with = "null_as_default")]
    pub steps: TextOrList,

    #[serde(rename = "observaciones", default, deserialize_with = "null_as_default")]
    pub observations: TextOrList,

    #[serde(rename = "formularios", default, deserialize_with = "null_as_default")]
    pub forms: Vec<FormEntry>,

    /// Single-office details, or the merged details of a selected office
    #[serde(flatten)]
    pub contact: ContactDetails,

    /// Candidate offices when the procedure is available at several places
    #[serde(rename = "opciones_ubicacion", default)]
    pub location_options: Vec<LocationEntry>,

    /// 0-based index into `location_options` once the user picked one
    #[serde(
        rename = "ubicacion_seleccionada",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub selected_location: Option<usize>,

    #[serde(rename = "modalidad", default, skip_serializing_if = "Option::is_none")]
    pub modality: Option<String>,

    #[serde(rename = "mapa_url", default, skip_serializing_if = "Option::is_none")]
    pub map_url: Option<String>,

    #[serde(rename = "sitio", default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    #[serde(rename = "coordenadas", default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<String>,
}

impl ProcedureData {
    /// Create data with a title and description only
    pub fn titled(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn modality(&self) -> Option<&str> {
        present(self.modality.as_ref())
    }

    #[must_use]
    pub fn map_url(&self) -> Option<&str> {
        present(self.map_url.as_ref())
    }
}

/// Address and contact fields shared by a procedure and each of its offices
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ContactDetails {
    #[serde(rename = "direccion", default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(rename = "horarios", default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<String>,

    #[serde(rename = "telefono", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(rename = "responsable", default, skip_serializing_if = "Option::is_none")]
    pub responsible: Option<String>,
}

impl ContactDetails {
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        present(self.address.as_ref())
    }

    #[must_use]
    pub fn hours(&self) -> Option<&str> {
        present(self.hours.as_ref())
    }

    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        present(self.phone.as_ref())
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        present(self.email.as_ref())
    }

    #[must_use]
    pub fn responsible(&self) -> Option<&str> {
        present(self.responsible.as_ref())
    }

    /// True when no field carries a non-blank value
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.address().is_none()
            && self.hours().is_none()
            && self.phone().is_none()
            && self.email().is_none()
            && self.responsible().is_none()
    }
}

/// One office where a procedure can be carried out
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LocationEntry {
    #[serde(rename = "nombre", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(flatten)]
    pub contact: ContactDetails,
}

impl LocationEntry {
    /// Create an entry with a name and address
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            contact: ContactDetails {
                address: Some(address.into()),
                ..Default::default()
            },
        }
    }

    /// Builder: set opening hours
    #[must_use]
    pub fn hours(mut self, hours: impl Into<String>) -> Self {
        self.contact.hours = Some(hours.into());
        self
    }

    /// Builder: set phone
    #[must_use]
    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.contact.phone = Some(phone.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        present(self.name.as_ref())
    }
}

/// Cost of a procedure: free text, or a table of labelled amounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Cost {
    Items(Vec<CostItem>),
    Text(String),
}

/// Sentinel the normalized record uses when no cost is on file
pub const COST_UNSPECIFIED: &str = "No especificado";

const COST_SENTINELS: &[&str] = &["no especificado", "no se especifica costo"];

impl Default for Cost {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl Cost {
    /// True when the cost carries no usable information
    #[must_use]
    pub fn is_unspecified(&self) -> bool {
        match self {
            Self::Items(items) => items.is_empty(),
            Self::Text(text) => {
                let normalized = text.trim().trim_end_matches('.').to_lowercase();
                normalized.is_empty() || COST_SENTINELS.contains(&normalized.as_str())
            }
        }
    }
}

/// One row of a cost table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CostItem {
    #[serde(rename = "descripcion", default, deserialize_with = "null_as_default")]
    pub label: String,

    #[serde(rename = "valor", default, deserialize_with = "null_as_default")]
    pub amount: String,
}

impl CostItem {
    pub fn new(label: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            amount: amount.into(),
        }
    }
}

/// Requirements, steps and observations are lists in most pages and a single paragraph
/// in some
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum TextOrList {
    List(Vec<String>),
    Text(String),
}

impl Default for TextOrList {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl TextOrList {
    /// True when nothing renderable is present
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::List(items) => items.iter().all(|item| item.trim().is_empty()),
            Self::Text(text) => text.trim().is_empty(),
        }
    }
}

impl From<Vec<&str>> for TextOrList {
    fn from(items: Vec<&str>) -> Self {
        Self::List(items.into_iter().map(str::to_string).collect())
    }
}

/// A downloadable form attached to a procedure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FormEntry {
    #[serde(rename = "nombre", default, deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
}

impl FormEntry {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Scraped pages write `null` where a field could not be extracted
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_category<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_category))
}

/// Blank strings count as absent
fn present(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}
