use tramites_protocol::Intent;

/// Keyword families in evaluation order. The first family with a keyword contained in the
/// lowercased query wins, so this order decides every ambiguous query.
pub const INTENT_TABLE: &[(Intent, &[&str])] = &[
    (
        Intent::Location,
        &[
            "ubicacion",
            "ubicación",
            "dónde",
            "donde",
            "cómo llegar",
            "como llegar",
            "dirección",
            "direccion",
            "lugar",
            "oficina",
            "dependencia",
            "horario",
            "teléfono",
            "telefono",
            "email",
            "correo",
        ],
    ),
    (
        Intent::Cost,
        &[
            "costo",
            "cuánto sale",
            "cuanto sale",
            "cuánto cuesta",
            "cuanto cuesta",
            "valor",
            "precio",
            "arancel",
            "pago",
            "tasa",
        ],
    ),
    (
        Intent::Forms,
        &[
            "formulario",
            "documento",
            "descargar",
            "archivo",
            "papel",
            "modelo",
        ],
    ),
    (
        Intent::Requirements,
        &[
            "requisito",
            "necesito",
            "qué llevar",
            "que llevar",
            "qué presentar",
            "que presentar",
            "documentos",
        ],
    ),
    (
        Intent::Observations,
        &[
            "observaciones",
            "observacion",
            "observación",
            "notas",
            "detalles adicionales",
            "importante",
            "tener en cuenta",
        ],
    ),
    (
        Intent::Steps,
        &[
            "pasos",
            "paso a paso",
            "cómo se hace",
            "como se hace",
            "procedimiento",
            "proceso",
            "realizar",
        ],
    ),
];

pub struct IntentClassifier;

impl IntentClassifier {
    #[must_use]
    pub fn classify(query: &str) -> Intent {
        let lowered = query.trim().to_lowercase();
        if lowered.is_empty() {
            return Intent::General;
        }

        INTENT_TABLE
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
            .map_or(Intent::General, |(intent, _)| *intent)
    }

    /// Whitespace-separated word count
    #[must_use]
    pub fn token_count(query: &str) -> usize {
        query.split_whitespace().count()
    }
}
