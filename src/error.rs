//! Engine error types.
//!
//! Only validation failures reach the operator. Resolution misses and skipped
//! computations are ordinary values (`TemplateResolution::is_miss`,
//! `DerivedValues::skipped`).

use std::fmt;
use std::path::PathBuf;

use forestal_templates::TemplateError;
use thiserror::Error;

/// Which kind of rule a record broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationRule {
    /// Value missing or blank
    Required,
    /// Number must be greater than zero
    Positive,
    /// Plantation year outside the accepted range
    YearRange,
    InvalidNumber,
    InvalidDate,
    /// Time punch not in `HH:MM`
    InvalidTime,
    /// Select value not among the declared options
    InvalidOption,
    InvalidCheckbox,
    /// Weed-control product rows missing or over the cap
    ProductRows,
}

impl ValidationRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationRule::Required => "required",
            ValidationRule::Positive => "positive",
            ValidationRule::YearRange => "year_range",
            ValidationRule::InvalidNumber => "invalid_number",
            ValidationRule::InvalidDate => "invalid_date",
            ValidationRule::InvalidTime => "invalid_time",
            ValidationRule::InvalidOption => "invalid_option",
            ValidationRule::InvalidCheckbox => "invalid_checkbox",
            ValidationRule::ProductRows => "product_rows",
        }
    }
}

impl fmt::Display for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// First rule a record failed. Shown to the operator as-is.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("[{rule}] {field}: {reason}")]
pub struct ValidationFailure {
    /// Field id (or reserved slot) the rule is about
    pub field: String,
    pub rule: ValidationRule,
    /// Human-readable reason, in the operator's language
    pub reason: String,
}

impl ValidationFailure {
    pub fn new(field: impl Into<String>, rule: ValidationRule, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            rule,
            reason: reason.into(),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Errors building a `FormEngine`
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
