//! Template catalog errors

use thiserror::Error;

/// Errors raised while building, editing or persisting the template catalog.
///
/// Resolution misses are not errors - see `TemplateResolution::is_miss`.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// No template with this id in the catalog
    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    /// A template declares the same field id twice
    #[error("Template '{template_id}' declares field '{field_id}' more than once")]
    DuplicateFieldId {
        template_id: String,
        field_id: String,
    },

    /// Built-in templates can be customized or deactivated, never removed
    #[error("Built-in template '{0}' cannot be removed")]
    BuiltInNotRemovable(String),

    /// The embedded built-in catalog is malformed (e.g. a field kind outside
    /// the supported set). This is a build defect, not a runtime condition.
    #[error("Invalid built-in catalog: {0}")]
    InvalidBuiltIn(String),

    /// Overlay (de)serialization failed
    #[error("Overlay encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// The overlay store collaborator failed
    #[error("Overlay store error: {0}")]
    Store(#[from] anyhow::Error),
}
