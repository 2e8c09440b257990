//! Form engine
//!
//! Session-level facade over the catalog, the derived-field computer, the
//! validation engine and the normalizer. Holds no mutable state: catalog
//! edits produce a new catalog that is swapped in with `with_catalog`.

use std::sync::Arc;

use forestal_templates::{
    generic_fields, OverlayStore, Reconciliation, TemplateCatalog, TemplateResolution,
    TemplateResolver,
};
use forestal_types::{ActivityTemplate, Category, FieldDefinition, FormRecord, WorkOrderRef};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::derived::{compute_derived, DerivedValues};
use crate::error::{EngineError, ValidationFailure};
use crate::normalizer::{NormalizedRecord, RecordMetadata, RecordNormalizer};
use crate::reference::{ReferenceBook, ReferenceKind, ReferenceResolver, ResolvedReference};
use crate::validation::validate_record;

/// Everything a data-entry session needs to fill in an activity report.
#[derive(Debug, Clone)]
pub struct FormEngine {
    catalog: TemplateCatalog,
    config: EngineConfig,
    references: ReferenceBook,
}

impl FormEngine {
    pub fn new(catalog: TemplateCatalog, config: EngineConfig, references: ReferenceBook) -> Self {
        Self {
            catalog,
            config,
            references,
        }
    }

    /// Reconcile the stored overlay and build an engine over the result.
    ///
    /// The reconciliation report is returned so the caller can tell the
    /// operator about discarded customizations.
    pub fn load(
        store: &dyn OverlayStore,
        config: EngineConfig,
        references: ReferenceBook,
    ) -> Result<(Self, Reconciliation), EngineError> {
        config.validate()?;
        let reconciliation = TemplateCatalog::load(store, &config.schema_version)?;
        info!(
            templates = reconciliation.catalog.len(),
            schema_version = %config.schema_version,
            "Form engine ready"
        );
        let engine = Self::new(reconciliation.catalog.clone(), config, references);
        Ok((engine, reconciliation))
    }

    /// Same engine over another catalog. Templates already handed out are
    /// unaffected.
    pub fn with_catalog(mut self, catalog: TemplateCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_references(mut self, references: ReferenceBook) -> Self {
        self.references = references;
        self
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn references(&self) -> &ReferenceBook {
        &self.references
    }

    pub fn template(&self, id: &str) -> Option<Arc<ActivityTemplate>> {
        self.catalog.get(id)
    }

    /// Template governing a work order, or a miss
    pub fn resolve_template(&self, order: &WorkOrderRef) -> TemplateResolution {
        TemplateResolver::new(&self.catalog).resolve(order)
    }

    /// Fields to render for a resolution: the template's in display order,
    /// or the generic set on a miss.
    pub fn field_set(&self, resolution: &TemplateResolution) -> Vec<FieldDefinition> {
        match resolution.template.as_deref() {
            Some(template) => template.ordered_fields().into_iter().cloned().collect(),
            None => generic_fields(),
        }
    }

    pub fn compute_derived(&self, category: Category, record: &FormRecord) -> DerivedValues {
        compute_derived(category, record, &self.config)
    }

    /// Recompute derived fields and write them into the record.
    ///
    /// Returns what was computed and what was skipped.
    pub fn recompute(&self, template: &ActivityTemplate, record: &mut FormRecord) -> DerivedValues {
        let derived = self.compute_derived(template.category, record);
        derived.apply_to(record);
        debug!(
            template = %template.id,
            computed = derived.values.len(),
            skipped = derived.skipped.len(),
            "Recomputed derived fields"
        );
        derived
    }

    pub fn validate(
        &self,
        template: &ActivityTemplate,
        record: &FormRecord,
    ) -> Result<(), ValidationFailure> {
        validate_record(template, record, &self.config)
    }

    pub fn normalize(
        &self,
        template: &ActivityTemplate,
        record: &FormRecord,
        metadata: &RecordMetadata,
    ) -> NormalizedRecord {
        self.normalizer().normalize(template, record, metadata)
    }

    /// Validate, then normalize
    pub fn submit(
        &self,
        template: &ActivityTemplate,
        record: &FormRecord,
        metadata: &RecordMetadata,
    ) -> Result<NormalizedRecord, ValidationFailure> {
        self.validate(template, record)?;
        let normalized = self.normalize(template, record, metadata);
        info!(
            template = %template.id,
            work_order = %metadata.work_order_id,
            "Activity record submitted"
        );
        Ok(normalized)
    }

    pub fn resolve_reference(&self, kind: ReferenceKind, value: &str) -> ResolvedReference {
        self.resolver()
            .resolve_entry(kind, value, self.references.entries(kind))
    }

    fn resolver(&self) -> ReferenceResolver {
        ReferenceResolver::from_config(&self.config)
    }

    fn normalizer(&self) -> RecordNormalizer<'_> {
        RecordNormalizer::new(&self.references, self.resolver())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{ReferenceEntry, ResolutionMethod};
    use forestal_templates::MemoryOverlayStore;
    use forestal_types::field_ids;

    fn engine() -> FormEngine {
        let store = MemoryOverlayStore::new();
        let refs = ReferenceBook::new()
            .with_entry(ReferenceKind::Crew, ReferenceEntry::new("c-1", "Cuadrilla Norte"));
        FormEngine::load(&store, EngineConfig::default(), refs).unwrap().0
    }

    #[test]
    fn test_load_persists_catalog() {
        let store = MemoryOverlayStore::new();
        let (engine, report) =
            FormEngine::load(&store, EngineConfig::default(), ReferenceBook::new()).unwrap();
        assert_eq!(engine.catalog().len(), 12);
        assert!(report.version_reset);
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn test_load_rejects_bad_config() {
        let store = MemoryOverlayStore::new();
        let config = EngineConfig {
            max_product_rows: 0,
            ..EngineConfig::default()
        };
        let err = FormEngine::load(&store, config, ReferenceBook::new()).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn test_miss_falls_back_to_generic_fields() {
        let engine = engine();
        let resolution = engine.resolve_template(&WorkOrderRef::new("Inventario forestal"));
        assert!(resolution.is_miss());
        let fields = engine.field_set(&resolution);
        assert_eq!(fields.len(), 7);
        assert_eq!(fields[0].id, field_ids::FECHA);
    }

    #[test]
    fn test_field_set_is_ordered() {
        let engine = engine();
        let resolution = engine.resolve_template(&WorkOrderRef::new("Quema controlada"));
        let fields = engine.field_set(&resolution);
        let orders: Vec<u32> = fields.iter().map(|f| f.order).collect();
        let mut sorted = orders.clone();
        sorted.sort();
        assert_eq!(orders, sorted);
    }

    #[test]
    fn test_recompute_then_submit() {
        let engine = engine();
        let template = engine.template("PODA").unwrap();
        let mut record = FormRecord::new()
            .with(field_ids::FECHA, "2024-09-12")
            .with(field_ids::CUADRILLA, "c-1")
            .with(field_ids::CANT_PERSONAL, 6.0)
            .with(field_ids::JORNADA, 8.0)
            .with(field_ids::TIPO_PODA, "Primera poda")
            .with(field_ids::ALTURA_PODA, 2.2)
            .with(field_ids::CANT_PLANTAS, 3333.0)
            .with(field_ids::DENSIDAD, 1111.0)
            .with(field_ids::ANIO_PLANTACION, 2016.0);

        assert_eq!(engine.validate(&template, &record).unwrap_err().field, field_ids::SUPERFICIE);

        engine.recompute(&template, &mut record);
        assert_eq!(record.number(field_ids::SUPERFICIE), Some(3.0));

        let out = engine
            .submit(&template, &record, &RecordMetadata::new("jperez", "OT-1"))
            .unwrap();
        assert_eq!(out.get("cuadrillaNombre"), Some(&serde_json::json!("Cuadrilla Norte")));
        assert_eq!(out.get("superficie"), Some(&serde_json::json!(3.0)));
    }

    #[test]
    fn test_resolve_reference_uses_book() {
        let engine = engine();
        let res = engine.resolve_reference(ReferenceKind::Crew, "CUADRILLA NORTE");
        assert_eq!(res.method, ResolutionMethod::ByName);
        assert_eq!(res.id.as_deref(), Some("c-1"));
    }
}
