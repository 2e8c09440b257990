//! Activity Templates for Field Reports
//!
//! Templates are the schemas behind the progress-report form of each forestry
//! activity. This crate owns where they come from and which one applies:
//!
//! - Built-in catalog embedded at build time (`builtin_templates.yaml`)
//! - Persisted overlay with runtime customizations (`OverlayStore`)
//! - Reconciliation of the two into the session catalog (`TemplateCatalog`)
//! - Work order → template matching (`TemplateResolver`)
//!
//! # Example
//!
//! ```
//! use forestal_templates::{
//!     MemoryOverlayStore, TemplateCatalog, TemplateResolver, BUILTIN_SCHEMA_VERSION,
//! };
//! use forestal_types::WorkOrderRef;
//!
//! let store = MemoryOverlayStore::new();
//! let catalog = TemplateCatalog::load(&store, BUILTIN_SCHEMA_VERSION)
//!     .unwrap()
//!     .catalog;
//!
//! let resolution = TemplateResolver::new(&catalog).resolve(&WorkOrderRef::new("Poda rodal 7"));
//! assert_eq!(resolution.template_id(), Some("PODA"));
//! ```

mod builtin;
mod catalog;
mod error;
mod resolver;
mod store;

/// Schema version of the embedded built-in catalog. A stored overlay written
/// under any other version is discarded on load.
pub const BUILTIN_SCHEMA_VERSION: &str = "2024.10-3";

pub use builtin::{builtin_templates, generic_fields};
pub use catalog::{reconcile, Reconciliation, TemplateCatalog};
pub use error::TemplateError;
pub use resolver::{
    matches_template, normalize_text, MatchTier, TemplateResolution, TemplateResolver,
    PRIORITY_ORDER,
};
pub use store::{decode_overlay, encode_overlay, MemoryOverlayStore, OverlayStore};
