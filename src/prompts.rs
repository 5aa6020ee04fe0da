//! Prompt templates for the three report sections.
//!
//! Templates are data: plain strings with `{placeholder}` markers filled in
//! from a [`PropertySnapshot`] (and, for the executive summary, the supplied
//! valuation figure). They can be overridden wholesale from configuration.

use crate::model::{PropertySnapshot, SlotKind};
use serde::{Deserialize, Serialize};

const DESCRIPTION_TEMPLATE: &str = "\
Eres un experto redactor inmobiliario. Genera una descripción comercial atractiva y profesional para esta propiedad basándote en los datos proporcionados.
Incluye características únicas, ubicación, y beneficios. Longitud: 200-300 palabras.

Datos de la propiedad:
- Título: {title}
- Tipo: {property_type}
- Precio: ${price}
- Habitaciones: {bedrooms}
- Baños: {bathrooms}
- Metros cuadrados: {square_feet}
- Año construcción: {year_built}
- Dirección: {street}, {city}
- Características: {features}
- Amenidades: {amenities}

Escribe una descripción que destaque el valor y atractivo de la propiedad.";

const MARKET_ANALYSIS_TEMPLATE: &str = "\
Eres un analista inmobiliario experto. Genera un análisis de mercado profesional que incluya:
tendencias de precios, comparación con propiedades similares, factores de valor, y perspectivas de inversión.
Longitud: 300-500 palabras.

Datos de la propiedad:
- Tipo: {property_type}
- Precio: ${price}
- Ubicación: {city}, {state}
- Tamaño: {square_feet} pies cuadrados
- Habitaciones: {bedrooms}
- Año: {year_built}

Proporciona un análisis detallado del mercado local y factores que afectan el valor.";

const EXECUTIVE_SUMMARY_TEMPLATE: &str = "\
Genera un resumen ejecutivo para un informe de valoración que incluya:
valoración recomendada, justificación del precio, puntos clave, y nivel de confianza.
Longitud: 150-250 palabras.

Valoración estimada: ${valuation}

Datos de la propiedad:
- Título: {title}
- Tipo: {property_type}
- Ubicación: {city}
- Tamaño: {square_feet} pies cuadrados
- Habitaciones: {bedrooms}
- Baños: {bathrooms}

Escribe un resumen ejecutivo profesional que justifique la valoración.";

/// The per-slot template set. `Default` carries the built-in templates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptTemplates {
    pub description: String,
    pub market_analysis: String,
    pub executive_summary: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            description: DESCRIPTION_TEMPLATE.to_string(),
            market_analysis: MARKET_ANALYSIS_TEMPLATE.to_string(),
            executive_summary: EXECUTIVE_SUMMARY_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplates {
    pub fn template_for(&self, kind: SlotKind) -> &str {
        match kind {
            SlotKind::Description => &self.description,
            SlotKind::MarketAnalysis => &self.market_analysis,
            SlotKind::ExecutiveSummary => &self.executive_summary,
        }
    }
}

/// Render the template for `kind` against a snapshot. `valuation` is only
/// consulted by templates that reference `{valuation}`; the executive-summary
/// precondition (a valuation must be present) is enforced by the caller.
pub fn render(
    templates: &PromptTemplates,
    kind: SlotKind,
    snapshot: &PropertySnapshot,
    valuation: Option<f64>,
) -> String {
    let features = join_or_na(&snapshot.features);
    let amenities = join_or_na(&snapshot.amenities);
    let valuation = valuation
        .map(|v| format_thousands(v.round() as i64))
        .unwrap_or_default();

    templates
        .template_for(kind)
        .replace("{title}", &snapshot.title)
        .replace("{property_type}", &snapshot.property_type)
        .replace("{price}", &format_thousands(snapshot.price.round() as i64))
        .replace("{bedrooms}", &snapshot.bedrooms.to_string())
        .replace("{bathrooms}", &snapshot.bathrooms.to_string())
        .replace("{square_feet}", &snapshot.square_feet.to_string())
        .replace("{year_built}", &snapshot.year_built.to_string())
        .replace("{street}", &snapshot.address.street)
        .replace("{city}", &snapshot.address.city)
        .replace("{state}", &snapshot.address.state)
        .replace("{zip_code}", &snapshot.address.zip_code)
        .replace("{features}", &features)
        .replace("{amenities}", &amenities)
        .replace("{valuation}", &valuation)
}

fn join_or_na(items: &[String]) -> String {
    if items.is_empty() {
        "N/A".to_string()
    } else {
        items.join(", ")
    }
}

/// Group digits by thousands, e.g. `1234567 -> "1,234,567"`.
fn format_thousands(n: i64) -> String {
    let negative = n < 0;
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if negative {
        format!("-{}", out)
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Address;

    fn sample_snapshot() -> PropertySnapshot {
        PropertySnapshot {
            title: "Casa del Sol".into(),
            property_type: "Single Family Home".into(),
            price: 425_000.0,
            bedrooms: 4,
            bathrooms: 2.5,
            square_feet: 2_150,
            year_built: 1998,
            address: Address {
                street: "12 Calle Mayor".into(),
                city: "Valencia".into(),
                state: "VC".into(),
                zip_code: "46001".into(),
            },
            features: vec!["Fireplace".into(), "Garage".into()],
            amenities: vec![],
        }
    }

    #[test]
    fn format_thousands_groups_digits() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1_000), "1,000");
        assert_eq!(format_thousands(425_000), "425,000");
        assert_eq!(format_thousands(1_234_567), "1,234,567");
        assert_eq!(format_thousands(-12_500), "-12,500");
    }

    #[test]
    fn description_prompt_fills_all_fields() {
        let templates = PromptTemplates::default();
        let prompt = render(&templates, SlotKind::Description, &sample_snapshot(), None);
        assert!(prompt.contains("Título: Casa del Sol"));
        assert!(prompt.contains("Precio: $425,000"));
        assert!(prompt.contains("Baños: 2.5"));
        assert!(prompt.contains("Dirección: 12 Calle Mayor, Valencia"));
        assert!(prompt.contains("Características: Fireplace, Garage"));
        assert!(prompt.contains("Amenidades: N/A"));
        assert!(!prompt.contains('{'));
    }

    #[test]
    fn executive_summary_prompt_includes_valuation() {
        let templates = PromptTemplates::default();
        let prompt = render(
            &templates,
            SlotKind::ExecutiveSummary,
            &sample_snapshot(),
            Some(410_000.0),
        );
        assert!(prompt.contains("Valoración estimada: $410,000"));
        assert!(prompt.contains("Ubicación: Valencia"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let templates = PromptTemplates::default();
        let snap = sample_snapshot();
        let a = render(&templates, SlotKind::MarketAnalysis, &snap, None);
        let b = render(&templates, SlotKind::MarketAnalysis, &snap, None);
        assert_eq!(a, b);
    }

    #[test]
    fn custom_template_is_used_verbatim() {
        let templates = PromptTemplates {
            description: "Describe {title} in {city}.".into(),
            ..Default::default()
        };
        let prompt = render(&templates, SlotKind::Description, &sample_snapshot(), None);
        assert_eq!(prompt, "Describe Casa del Sol in Valencia.");
    }
}
