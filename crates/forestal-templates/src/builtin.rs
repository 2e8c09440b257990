//! Built-in Templates
//!
//! The baseline catalog shipped with each build, embedded as YAML. Parsed on
//! every call so callers always get fresh values they own.

use std::collections::HashSet;

use forestal_types::{field_ids, ActivityTemplate, FieldDefinition, FieldKind};

use crate::error::TemplateError;

const BUILTIN_TEMPLATES_YAML: &str = include_str!("builtin_templates.yaml");

/// Parse the embedded built-in catalog.
///
/// Fails loudly on anything that is a build defect: YAML that does not
/// parse (including an unknown field `kind`), duplicate template ids, or a
/// template declaring the same field twice.
pub fn builtin_templates() -> Result<Vec<ActivityTemplate>, TemplateError> {
    let templates: Vec<ActivityTemplate> = serde_yaml::from_str(BUILTIN_TEMPLATES_YAML)
        .map_err(|e| TemplateError::InvalidBuiltIn(e.to_string()))?;

    let mut seen = HashSet::new();
    for template in &templates {
        if !seen.insert(template.id.as_str()) {
            return Err(TemplateError::InvalidBuiltIn(format!(
                "duplicate template id '{}'",
                template.id
            )));
        }
        if let Some(field_id) = template.duplicate_field_id() {
            return Err(TemplateError::DuplicateFieldId {
                template_id: template.id.clone(),
                field_id: field_id.to_string(),
            });
        }
    }

    Ok(templates)
}

/// Unstructured field set used when no template matches a work order.
pub fn generic_fields() -> Vec<FieldDefinition> {
    let status = FieldKind::Select {
        options: vec!["Pendiente".to_string(), "Completado".to_string()],
    };
    vec![
        FieldDefinition::new(field_ids::FECHA, "Fecha", FieldKind::Date)
            .required()
            .system()
            .with_order(1),
        FieldDefinition::new(
            field_ids::CUADRILLA,
            "Cuadrilla",
            FieldKind::Select { options: vec![] },
        )
        .required()
        .system()
        .with_order(2),
        FieldDefinition::new(field_ids::CANT_PERSONAL, "Cantidad de personal", FieldKind::Number)
            .system()
            .with_order(3),
        FieldDefinition::new(field_ids::JORNADA, "Jornada", FieldKind::Number)
            .system()
            .with_order(4),
        FieldDefinition::new(field_ids::SUPERFICIE, "Superficie", FieldKind::Number)
            .with_order(5),
        FieldDefinition::new(field_ids::ESTADO, "Estado", status)
            .system()
            .with_order(6),
        FieldDefinition::new(field_ids::OBSERVACIONES, "Observaciones", FieldKind::TextArea)
            .system()
            .with_order(7),
    ]
}
