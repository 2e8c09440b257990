//! Shared fixtures for the integration tests

#![allow(dead_code)]

use forestal::templates::MemoryOverlayStore;
use forestal::types::{field_ids, FormRecord, ProductRow};
use forestal::{EngineConfig, FormEngine, ReferenceBook, ReferenceEntry, ReferenceKind};

pub const CREW_NORTE: &str = "64f1a2b3c4d5e6f708192a3b";
pub const NURSERY_MARIAS: &str = "650a0b1c2d3e4f5061728394";

/// Opt-in test logging, `RUST_LOG=forestal=debug`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn reference_book() -> ReferenceBook {
    ReferenceBook::new()
        .with_entry(ReferenceKind::Crew, ReferenceEntry::new(CREW_NORTE, "Cuadrilla Norte"))
        .with_entry(
            ReferenceKind::Crew,
            ReferenceEntry::new("64f1a2b3c4d5e6f708192a3c", "Cuadrilla Sur"),
        )
        .with_entry(
            ReferenceKind::Nursery,
            ReferenceEntry::new(NURSERY_MARIAS, "Vivero Las Marias"),
        )
        .with_entry(
            ReferenceKind::Species,
            ReferenceEntry::new("650a0b1c2d3e4f50617283a0", "Eucalyptus grandis"),
        )
        .with_entry(
            ReferenceKind::ClonalLine,
            ReferenceEntry::new("650a0b1c2d3e4f50617283b0", "INTA 1"),
        )
}

/// Engine over a fresh store, plus the store for inspection
pub fn engine() -> (FormEngine, MemoryOverlayStore) {
    init_tracing();
    let store = MemoryOverlayStore::new();
    let (engine, _) = FormEngine::load(&store, EngineConfig::default(), reference_book())
        .expect("engine loads over an empty store");
    (engine, store)
}

/// Fields every template's base rules ask for
pub fn base_record() -> FormRecord {
    FormRecord::new()
        .with(field_ids::FECHA, "2024-09-12")
        .with(field_ids::CUADRILLA, CREW_NORTE)
        .with(field_ids::CANT_PERSONAL, 6.0)
        .with(field_ids::JORNADA, 8.0)
        .with(field_ids::SUPERFICIE, 12.5)
}

pub fn weed_control_record() -> FormRecord {
    base_record()
        .with(field_ids::TIPO_APLICACION, "En faja")
        .with(field_ids::VOLUMEN_APLICADO, 120.0)
}

pub fn glyphosate() -> ProductRow {
    ProductRow::new("Glifosato 48%", 3.0, "L")
}

pub fn terrain_record() -> FormRecord {
    FormRecord::new()
        .with(field_ids::FECHA, "2024-09-12")
        .with(field_ids::CUADRILLA, CREW_NORTE)
        .with(field_ids::CANT_PERSONAL, 2.0)
        .with(field_ids::TIPO_PREPARACION, "Subsolado")
        .with(field_ids::JORNALES, 3.0)
}
