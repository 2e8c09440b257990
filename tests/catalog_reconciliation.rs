//! Overlay reconciliation across sessions

mod helpers;

use forestal::templates::{
    builtin_templates, MemoryOverlayStore, OverlayStore, TemplateCatalog, TemplateError,
    BUILTIN_SCHEMA_VERSION,
};
use forestal::types::{field_ids, ActivityTemplate, FieldDefinition, FieldKind, WorkOrderRef};
use forestal::{EngineConfig, EngineError, FormEngine, ReferenceBook};
use pretty_assertions::assert_eq;

fn builtin(id: &str) -> ActivityTemplate {
    builtin_templates()
        .unwrap()
        .into_iter()
        .find(|t| t.id == id)
        .unwrap()
}

fn overlay_with(entries: Vec<ActivityTemplate>) -> Vec<ActivityTemplate> {
    let mut overlay = builtin_templates().unwrap();
    for entry in entries {
        match overlay.iter_mut().find(|t| t.id == entry.id) {
            Some(slot) => *slot = entry,
            None => overlay.push(entry),
        }
    }
    overlay
}

fn load(store: &MemoryOverlayStore) -> (FormEngine, forestal::templates::Reconciliation) {
    helpers::init_tracing();
    FormEngine::load(store, EngineConfig::default(), ReferenceBook::new()).unwrap()
}

#[test]
fn customized_description_survives_reload() {
    let mut poda = builtin("PODA");
    poda.description = "Poda de formación, rodales de pino".to_string();
    let store = MemoryOverlayStore::with_overlay(overlay_with(vec![poda]), BUILTIN_SCHEMA_VERSION);

    let (engine, report) = load(&store);
    assert!(!report.version_reset);
    assert!(report.kept_overlay.contains(&"PODA".to_string()));
    assert_eq!(
        engine.template("PODA").unwrap().description,
        "Poda de formación, rodales de pino"
    );
}

#[test]
fn drifted_field_list_falls_back_to_builtin() {
    let mut poda = builtin("PODA");
    poda.description = "stale".to_string();
    poda.fields.pop();
    let store = MemoryOverlayStore::with_overlay(overlay_with(vec![poda]), BUILTIN_SCHEMA_VERSION);

    let (engine, report) = load(&store);
    assert_eq!(report.stale_overlay, vec!["PODA".to_string()]);
    assert_eq!(*engine.template("PODA").unwrap(), builtin("PODA"));
}

#[test]
fn reordered_fields_count_as_drift() {
    let mut raleo = builtin("RALEO");
    raleo.fields.swap(0, 1);
    let store = MemoryOverlayStore::with_overlay(overlay_with(vec![raleo]), BUILTIN_SCHEMA_VERSION);

    let (_, report) = load(&store);
    assert_eq!(report.stale_overlay, vec!["RALEO".to_string()]);
}

#[test]
fn version_bump_discards_whole_overlay() {
    let mut poda = builtin("PODA");
    poda.description = "custom".to_string();
    let mut custom = builtin("RALEO");
    custom.id = "custom-raleo-sanitario".to_string();
    custom.name = "RALEO SANITARIO".to_string();
    let store = MemoryOverlayStore::with_overlay(overlay_with(vec![poda, custom]), "2023.01-1");

    let (engine, report) = load(&store);
    assert!(report.version_reset);
    assert!(report.custom.is_empty());
    assert!(engine.template("custom-raleo-sanitario").is_none());
    assert_eq!(engine.template("PODA").unwrap().description, builtin("PODA").description);

    assert_eq!(store.schema_version().unwrap().as_deref(), Some(BUILTIN_SCHEMA_VERSION));
    assert_eq!(store.load().unwrap().unwrap().len(), 12);
}

#[test]
fn custom_templates_are_kept_and_resolvable() {
    let custom = ActivityTemplate {
        id: "custom-fertilizacion".to_string(),
        name: "FERTILIZACION".to_string(),
        description: "Fertilización post plantación".to_string(),
        category: forestal::types::Category::Planting,
        unit: "ha".to_string(),
        match_patterns: vec!["fertilizacion".to_string()],
        codes: vec![],
        fields: vec![
            FieldDefinition::new(field_ids::FECHA, "Fecha", FieldKind::Date).required(),
            FieldDefinition::new("dosis", "Dosis", FieldKind::Number).with_order(2),
        ],
        active: true,
    };
    let store = MemoryOverlayStore::with_overlay(overlay_with(vec![custom]), BUILTIN_SCHEMA_VERSION);

    let (engine, report) = load(&store);
    assert_eq!(report.custom, vec!["custom-fertilizacion".to_string()]);
    assert_eq!(engine.catalog().len(), 13);

    let resolution = engine.resolve_template(&WorkOrderRef::new("FERTILIZACION"));
    assert_eq!(resolution.template_id(), Some("custom-fertilizacion"));
}

#[test]
fn catalog_edits_do_not_touch_handed_out_templates() {
    let store = MemoryOverlayStore::new();
    let (engine, _) = load(&store);
    let before = engine.template("RALEO").unwrap();

    let mut edited = (*before).clone();
    edited.description = "Raleo selectivo".to_string();
    let catalog = engine.catalog().with_template(edited).unwrap();
    catalog.persist(&store).unwrap();
    let engine = engine.with_catalog(catalog);

    assert_eq!(before.description, builtin("RALEO").description);
    assert_eq!(engine.template("RALEO").unwrap().description, "Raleo selectivo");

    let (reloaded, report) = load(&store);
    assert_eq!(reloaded.template("RALEO").unwrap().description, "Raleo selectivo");
    assert!(report.kept_overlay.contains(&"RALEO".to_string()));
}

#[test]
fn duplicated_template_gets_fresh_id() {
    let store = MemoryOverlayStore::new();
    let (engine, _) = load(&store);
    let (catalog, new_id) = engine
        .catalog()
        .duplicate("CONTROL_MALEZAS", "CONTROL DE MALEZAS QUIMICO")
        .unwrap();

    assert_ne!(new_id, "CONTROL_MALEZAS");
    let copy = catalog.get(&new_id).unwrap();
    assert_eq!(copy.name, "CONTROL DE MALEZAS QUIMICO");
    assert!(copy.same_field_layout(&builtin("CONTROL_MALEZAS")));
    assert!(!catalog.is_builtin(&new_id));
}

#[test]
fn builtins_cannot_be_removed() {
    let catalog = TemplateCatalog::from_builtin(BUILTIN_SCHEMA_VERSION).unwrap();
    assert!(matches!(
        catalog.without("PODA"),
        Err(TemplateError::BuiltInNotRemovable(_))
    ));
}

#[test]
fn store_failure_surfaces_as_engine_error() {
    struct BrokenStore;

    impl OverlayStore for BrokenStore {
        fn load(&self) -> anyhow::Result<Option<Vec<ActivityTemplate>>> {
            anyhow::bail!("disk unavailable")
        }
        fn save(&self, _templates: &[ActivityTemplate]) -> anyhow::Result<()> {
            anyhow::bail!("disk unavailable")
        }
        fn schema_version(&self) -> anyhow::Result<Option<String>> {
            Ok(Some(BUILTIN_SCHEMA_VERSION.to_string()))
        }
        fn set_schema_version(&self, _version: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    let err = FormEngine::load(&BrokenStore, EngineConfig::default(), ReferenceBook::new())
        .unwrap_err();
    assert!(matches!(err, EngineError::Template(TemplateError::Store(_))));
    assert!(err.to_string().contains("disk unavailable"));
}
