//! Forestry activity report engine
//!
//! Turns a work order and the values an operator entered into a validated,
//! normalized activity record:
//!
//! 1. resolve the governing template (`FormEngine::resolve_template`)
//! 2. recompute derived fields as inputs change (`FormEngine::recompute`)
//! 3. validate, stopping at the first broken rule (`FormEngine::validate`)
//! 4. normalize for persistence (`FormEngine::normalize`, or `submit`)
//!
//! Templates and their overlay live in `forestal_templates`; the data model
//! lives in `forestal_types`. Both are re-exported here.
//!
//! # Example
//!
//! ```
//! use forestal::{EngineConfig, FormEngine, ReferenceBook};
//! use forestal::templates::MemoryOverlayStore;
//! use forestal::types::{field_ids, FormRecord, WorkOrderRef};
//!
//! let store = MemoryOverlayStore::new();
//! let (engine, _) =
//!     FormEngine::load(&store, EngineConfig::default(), ReferenceBook::new()).unwrap();
//!
//! let resolution = engine.resolve_template(&WorkOrderRef::new("Quema controlada lote 4"));
//! let template = resolution.template.unwrap();
//!
//! let mut record = FormRecord::new()
//!     .with(field_ids::HORA_INGRESO, "22:00")
//!     .with(field_ids::HORA_EGRESO, "02:00")
//!     .with(field_ids::CANT_PERSONAL, 5.0);
//! engine.recompute(&template, &mut record);
//!
//! assert_eq!(record.number(field_ids::HS_TRABAJADAS), Some(4.0));
//! assert_eq!(record.number(field_ids::JORNADA), Some(20.0));
//! ```

pub mod config;
pub mod derived;
pub mod engine;
pub mod error;
pub mod normalizer;
pub mod reference;
pub mod validation;

pub use forestal_templates as templates;
pub use forestal_types as types;

pub use config::{EngineConfig, CONFIG_ENV_VAR};
pub use derived::{
    compute_area, compute_derived, elapsed_hours, labor_days_per_eight_hour_shift,
    labor_days_unscaled, planting_total_plants, ComputationSkip, DerivedValues, LoadingMethod,
};
pub use engine::FormEngine;
pub use error::{ConfigError, EngineError, ValidationFailure, ValidationRule};
pub use normalizer::{NormalizedRecord, RecordMetadata, RecordNormalizer};
pub use reference::{
    ReferenceBook, ReferenceEntry, ReferenceKind, ReferenceResolver, ResolutionMethod,
    ResolvedReference,
};
pub use validation::validate_record;
