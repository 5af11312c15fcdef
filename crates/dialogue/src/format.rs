//! Deterministic rendering of a procedure facet.
//!
//! Every `(record, intent)` pair renders a non-empty message. Absent fields are omitted or
//! replaced by an explicit "nothing on file" sentence; the placeholder values of the
//! normalized record never reach the text.

use crate::maps::map_link;
use std::fmt::Write as _;
use tramites_knowledge::{ContactDetails, Cost, ProcedureRecord, TextOrList, COST_UNSPECIFIED};
use tramites_protocol::{Intent, NormalizedRecord, StructuredAnswer};

pub const UNTITLED: &str = "Trámite no especificado";
pub const ADDRESS_UNAVAILABLE: &str = "No disponible";

const FOLLOW_UP: &str = "¿Necesitás saber algo más sobre este trámite?";
const NEXT_FACETS: &str = "¿Qué más te gustaría saber? Por ejemplo: requisitos, pasos, costo, ubicación, horarios, formularios u observaciones.";

#[derive(Debug, Clone, PartialEq)]
pub struct FormattedAnswer {
    pub text: String,
    pub structured: StructuredAnswer,
}

pub struct Formatter;

impl Formatter {
    #[must_use]
    pub fn render(record: &ProcedureRecord, intent: Intent) -> FormattedAnswer {
        let text = match intent {
            Intent::Location => Self::location(record),
            Intent::Cost => Self::cost(record),
            Intent::Forms => Self::forms(record),
            Intent::Requirements => Self::listing(
                &record.data.requirements,
                &format!("📋 **Requisitos para el trámite de {}**", subject(record)),
                &format!(
                    "No encontré requisitos específicos para **{}**.",
                    subject(record)
                ),
            ),
            Intent::Steps => Self::listing(
                &record.data.steps,
                &format!("➡️ **Pasos para realizar el trámite de {}**", subject(record)),
                &format!(
                    "No encontré pasos detallados para **{}**.",
                    subject(record)
                ),
            ),
            Intent::Observations => Self::listing(
                &record.data.observations,
                &format!(
                    "⚠️ **Observaciones importantes para el trámite de {}**",
                    subject(record)
                ),
                &format!(
                    "No encontré observaciones para **{}**.",
                    subject(record)
                ),
            ),
            Intent::General => Self::general(record),
        };

        FormattedAnswer {
            text,
            structured: StructuredAnswer {
                intent,
                category: record.category.clone(),
                record: normalize(record),
            },
        }
    }

    /// Numbered office list shown while the user has to pick one
    #[must_use]
    pub fn location_choices(record: &ProcedureRecord) -> String {
        let mut text = format!(
            "Para el trámite de **{}** hay varias ubicaciones disponibles. Por favor, seleccioná una:",
            subject(record)
        );
        for (idx, option) in record.data.location_options.iter().enumerate() {
            let number = idx + 1;
            match option.name() {
                Some(name) => {
                    let _ = write!(text, "\n{number}. {name}");
                }
                None => {
                    let _ = write!(text, "\n{number}. Opción {number}");
                }
            }
            if let Some(address) = option.contact.address() {
                let _ = write!(text, "\n   📍 Dirección: {address}");
            }
            if let Some(hours) = option.contact.hours() {
                let _ = write!(text, "\n   ⏰ Horarios: {hours}");
            }
        }
        text.push_str("\nRespondé con el número de la ubicación que prefieras.");
        text
    }

    fn location(record: &ProcedureRecord) -> String {
        if record.needs_location_choice() {
            return Self::location_choices(record);
        }

        let Some(contact) = record.effective_contact() else {
            return no_address(record);
        };
        let Some(address) = contact.address() else {
            return no_address(record);
        };

        let mut text = format!(
            "La ubicación para **{}** es:\n- 📍 **Dirección:** {address}",
            subject(record)
        );
        let lines = [
            ("⏰ **Horarios:**", contact.hours()),
            ("📞 **Teléfono:**", contact.phone()),
            ("📧 **E-mail:**", contact.email()),
            ("👤 **Responsable:**", contact.responsible()),
        ];
        for (label, value) in lines {
            if let Some(value) = value {
                let _ = write!(text, "\n- {label} {value}");
            }
        }
        let _ = write!(
            text,
            "\n[Ver en Google Maps]({})\n{FOLLOW_UP}",
            location_map_url(record, address)
        );
        text
    }

    fn cost(record: &ProcedureRecord) -> String {
        let cost = &record.data.cost;
        if cost.is_unspecified() {
            return format!(
                "No encontré información sobre el costo de **{}**.",
                subject(record)
            );
        }

        match cost {
            Cost::Items(items) => {
                let mut text = format!("Los costos para el trámite de **{}** son:", subject(record));
                for item in items {
                    let label = match item.label.trim() {
                        "" => "Costo",
                        label => label,
                    };
                    match item.amount.trim() {
                        "" => {
                            let _ = write!(text, "\n- {label}");
                        }
                        amount => {
                            let _ = write!(text, "\n- {label}: {amount}");
                        }
                    }
                }
                text
            }
            Cost::Text(value) => format!(
                "El costo para el trámite de **{}** es: **{}**.",
                subject(record),
                value.trim()
            ),
        }
    }

    fn forms(record: &ProcedureRecord) -> String {
        let forms: Vec<_> = record
            .data
            .forms
            .iter()
            .filter(|form| !form.name.trim().is_empty() || !form.url.trim().is_empty())
            .collect();
        if forms.is_empty() {
            return format!("No encontré formularios para **{}**.", subject(record));
        }

        let mut text = format!(
            "Para el trámite de **{}** podés descargar estos formularios:",
            subject(record)
        );
        for form in forms {
            let name = match form.name.trim() {
                "" => "Formulario",
                name => name,
            };
            match form.url.trim() {
                "" => {
                    let _ = write!(text, "\n- 📄 {name}");
                }
                url => {
                    let _ = write!(text, "\n- 📄 [{name}]({url})");
                }
            }
        }
        text
    }

    fn listing(value: &TextOrList, heading: &str, empty: &str) -> String {
        if value.is_empty() {
            return empty.to_string();
        }
        match value {
            TextOrList::List(items) => {
                let mut text = format!("{heading}:");
                let kept = items.iter().map(|item| item.trim()).filter(|item| !item.is_empty());
                for (idx, item) in kept.enumerate() {
                    let _ = write!(text, "\n{}. {item}", idx + 1);
                }
                text
            }
            TextOrList::Text(paragraph) => format!("{heading}: {}", paragraph.trim()),
        }
    }

    fn general(record: &ProcedureRecord) -> String {
        let mut text = format!("Información sobre **{}**:", subject(record));
        let description = record.data.description.trim();
        if !description.is_empty() {
            let _ = write!(text, "\n{description}");
        }

        let mut summary = Vec::new();
        if record.location_count() > 0 {
            summary.push("📍 Ubicación disponible".to_string());
        }
        match &record.data.cost {
            cost if cost.is_unspecified() => {}
            Cost::Text(value) if value.trim().eq_ignore_ascii_case("ninguno") => {}
            Cost::Text(value) => summary.push(format!("💰 Costo: {}", value.trim())),
            Cost::Items(_) => summary.push("💰 Costo: ver detalles".to_string()),
        }
        if let Some(modality) = record.data.modality() {
            summary.push(format!("💻 Modalidad: {modality}"));
        }
        if !record.data.forms.is_empty() {
            summary.push(format!(
                "📄 Formularios disponibles ({})",
                record.data.forms.len()
            ));
        }
        if !summary.is_empty() {
            let _ = write!(text, "\n\n{}", summary.join("\n"));
        }

        let _ = write!(text, "\n\n{NEXT_FACETS}");
        text
    }
}

/// The record with defaults substituted for every missing field
#[must_use]
pub fn normalize(record: &ProcedureRecord) -> NormalizedRecord {
    let data = &record.data;
    let contact = record.effective_contact();
    let field = |value: Option<&str>| value.unwrap_or_default().to_string();
    let address = contact.and_then(ContactDetails::address);

    NormalizedRecord {
        url: record.id.clone(),
        titulo: match record.title() {
            "" => UNTITLED.to_string(),
            title => title.to_string(),
        },
        descripcion: data.description.trim().to_string(),
        requisitos: data.requirements.clone(),
        costo: if data.cost.is_unspecified() {
            Cost::Text(COST_UNSPECIFIED.to_string())
        } else {
            data.cost.clone()
        },
        pasos: data.steps.clone(),
        observaciones: data.observations.clone(),
        formularios: data.forms.clone(),
        direccion: address.unwrap_or(ADDRESS_UNAVAILABLE).to_string(),
        horarios: field(contact.and_then(ContactDetails::hours)),
        telefono: field(contact.and_then(ContactDetails::phone)),
        email: field(contact.and_then(ContactDetails::email)),
        responsable: field(contact.and_then(ContactDetails::responsible)),
        opciones_ubicacion: data.location_options.clone(),
        modalidad: data.modality().unwrap_or_default().to_string(),
        mapa_url: address
            .map(|address| location_map_url(record, address))
            .unwrap_or_default(),
        sitio: data
            .website
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string(),
        coordenadas: data
            .coordinates
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string(),
    }
}

/// Stored map link, or one generated from the address
fn location_map_url(record: &ProcedureRecord, address: &str) -> String {
    record
        .data
        .map_url()
        .map_or_else(|| map_link(address), str::to_string)
}

fn subject(record: &ProcedureRecord) -> &str {
    match record.title() {
        "" => "este trámite",
        title => title,
    }
}

fn no_address(record: &ProcedureRecord) -> String {
    format!(
        "No encontré la dirección de **{}** en mi base de datos. Te recomiendo contactar al organismo directamente.",
        subject(record)
    )
}
