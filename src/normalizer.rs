//! Record Normalizer
//!
//! Flattens a validated record into the shape the persistence collaborator
//! stores. The output is a key-sorted JSON object:
//!
//! - system fields shared by every activity
//! - the category's own fields, always present (`null` when empty)
//! - every other declared or entered value, copied through verbatim
//! - the metadata block
//!
//! Reference fields (crew, nursery, species, clone) carry the resolved
//! identifier under the field id and a display label under `<field>Nombre`.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use forestal_types::{field_ids, ActivityTemplate, Category, FieldKind, FormRecord, RecordStatus};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::reference::{ReferenceBook, ReferenceKind, ReferenceResolver};

/// Caller-supplied context for a submitted record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    pub author: String,
    pub work_order_id: String,
    #[serde(default)]
    pub supervisor_id: Option<String>,
    #[serde(default)]
    pub provider_id: Option<String>,
    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,
}

impl RecordMetadata {
    pub fn new(author: impl Into<String>, work_order_id: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            work_order_id: work_order_id.into(),
            ..Default::default()
        }
    }

    pub fn with_supervisor(mut self, id: impl Into<String>) -> Self {
        self.supervisor_id = Some(id.into());
        self
    }

    pub fn with_provider(mut self, id: impl Into<String>) -> Self {
        self.provider_id = Some(id.into());
        self
    }

    pub fn recorded_at(mut self, at: DateTime<Utc>) -> Self {
        self.recorded_at = Some(at);
        self
    }
}

/// Flat output record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedRecord(pub Map<String, Value>);

impl NormalizedRecord {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

/// Fields enumerated for a category, in output order
pub fn category_fields(category: Category) -> &'static [&'static str] {
    use field_ids::*;
    match category {
        Category::Pruning => &[TIPO_PODA, ALTURA_PODA, CANT_PLANTAS, DENSIDAD, ANIO_PLANTACION],
        Category::Planting => &[
            METODO_CARGA,
            CANT_BANDEJAS,
            CANT_PLANTINES,
            TOTAL_PLANTAS,
            DENSIDAD,
            VIVERO,
            ESPECIE,
            CLON,
            ANIO_PLANTACION,
        ],
        Category::Thinning | Category::ThinningToWaste => &[ESPECIE],
        Category::AntControl => &[NRO_NIDOS, ESPECIE_HORMIGA, PRODUCTO, CANTIDAD, UNIDAD],
        Category::WeedControl => &[TIPO_APLICACION, VOLUMEN_APLICADO],
        Category::ControlledBurn => &[
            HORA_INGRESO,
            HORA_INICIO_QUEMA,
            HORA_FIN_QUEMA,
            HORA_EGRESO,
            HS_TRABAJADAS,
            HS_QUEMA,
        ],
        Category::ExoticControl => &[HORA_INICIO, HORA_FIN, HS_TRABAJADAS, JORNALES],
        Category::PineRegenerationControl | Category::RegrowthManagement => &[
            HORA_INICIO,
            HORA_FIN,
            HS_TRABAJADAS,
            JORNALES,
            HA,
            ANIO_PLANTACION,
        ],
        Category::TerrainPreparation => &[HA, TIPO_PREPARACION, JORNALES],
    }
}

/// Reference list behind a field id, if it is a reference field
pub fn reference_kind(field_id: &str) -> Option<ReferenceKind> {
    match field_id {
        field_ids::CUADRILLA => Some(ReferenceKind::Crew),
        field_ids::VIVERO => Some(ReferenceKind::Nursery),
        field_ids::ESPECIE => Some(ReferenceKind::Species),
        field_ids::CLON => Some(ReferenceKind::ClonalLine),
        _ => None,
    }
}

/// Builds normalized records against a session's reference lists.
pub struct RecordNormalizer<'a> {
    references: &'a ReferenceBook,
    resolver: ReferenceResolver,
}

impl<'a> RecordNormalizer<'a> {
    pub fn new(references: &'a ReferenceBook, resolver: ReferenceResolver) -> Self {
        Self {
            references,
            resolver,
        }
    }

    pub fn normalize(
        &self,
        template: &ActivityTemplate,
        record: &FormRecord,
        metadata: &RecordMetadata,
    ) -> NormalizedRecord {
        let mut out = Map::new();
        // Input keys already represented in the output
        let mut covered: BTreeSet<&str> = BTreeSet::new();

        // System fields
        out.insert(field_ids::FECHA.into(), self.value(template, record, field_ids::FECHA));
        let hectares_only =
            template.category.uses_hectare_field() && !record.is_present(field_ids::SUPERFICIE);
        let area = if !hectares_only {
            self.value(template, record, field_ids::SUPERFICIE)
        } else {
            self.value(template, record, field_ids::HA)
        };
        out.insert(field_ids::SUPERFICIE.into(), area);

        let (crew_id, crew_name) =
            self.reference(ReferenceKind::Crew, record, field_ids::CUADRILLA);
        out.insert("cuadrillaId".into(), crew_id);
        out.insert("cuadrillaNombre".into(), crew_name);
        covered.insert(field_ids::CUADRILLA);

        out.insert(
            field_ids::CANT_PERSONAL.into(),
            self.value(template, record, field_ids::CANT_PERSONAL),
        );
        out.insert(field_ids::JORNADA.into(), self.value(template, record, field_ids::JORNADA));
        out.insert(
            field_ids::ESTADO.into(),
            Value::from(RecordStatus::from_value(record.get(field_ids::ESTADO)).as_str()),
        );
        out.insert(
            field_ids::OBSERVACIONES.into(),
            self.value(template, record, field_ids::OBSERVACIONES),
        );

        // Category fields
        for &id in category_fields(template.category) {
            match reference_kind(id) {
                Some(kind) => {
                    let (ref_id, name) = self.reference(kind, record, id);
                    out.insert(id.into(), ref_id);
                    out.insert(format!("{}Nombre", id), name);
                }
                None => {
                    out.insert(id.into(), self.value(template, record, id));
                }
            }
        }

        if template.category == Category::WeedControl || !record.products.is_empty() {
            let rows: Vec<Value> = record
                .products
                .iter()
                .filter(|row| row.is_complete())
                .map(|row| {
                    json!({
                        "productName": row.product_name.trim(),
                        "quantity": row.quantity,
                        "unit": row.unit.trim(),
                    })
                })
                .collect();
            out.insert("productos".into(), Value::Array(rows));
        }
        covered.insert(field_ids::PRODUCTS);

        // Everything else, verbatim
        for field in &template.fields {
            if covered.contains(field.id.as_str()) || out.contains_key(&field.id) {
                continue;
            }
            out.insert(field.id.clone(), self.value(template, record, &field.id));
        }
        for (id, value) in &record.values {
            if covered.contains(id.as_str()) || out.contains_key(id) {
                continue;
            }
            out.insert(id.clone(), value.to_json());
        }

        // Metadata
        out.insert("autor".into(), Value::from(metadata.author.clone()));
        out.insert("ordenTrabajoId".into(), Value::from(metadata.work_order_id.clone()));
        out.insert("supervisorId".into(), opt_string(&metadata.supervisor_id));
        out.insert("proveedorId".into(), opt_string(&metadata.provider_id));
        if let Some(at) = metadata.recorded_at {
            out.insert("registradoEn".into(), Value::from(at.to_rfc3339()));
        }
        out.insert("plantillaId".into(), Value::from(template.id.clone()));
        out.insert("plantillaNombre".into(), Value::from(template.name.clone()));
        out.insert("categoria".into(), Value::from(template.category.as_str()));

        NormalizedRecord(out)
    }

    /// Entered value as JSON. Numeric fields become numbers when they parse.
    fn value(&self, template: &ActivityTemplate, record: &FormRecord, id: &str) -> Value {
        let Some(value) = record.get(id).filter(|v| !v.is_blank()) else {
            return Value::Null;
        };
        let numeric = template
            .field(id)
            .is_some_and(|f| matches!(f.kind, FieldKind::Number));
        if numeric {
            if let Some(n) = value.as_f64().and_then(serde_json::Number::from_f64) {
                return Value::Number(n);
            }
        }
        match value.as_text() {
            Some(text) => Value::from(text),
            None => value.to_json(),
        }
    }

    /// `(id, display name)` for a reference field
    fn reference(&self, kind: ReferenceKind, record: &FormRecord, id: &str) -> (Value, Value) {
        let Some(raw) = record.get(id).filter(|v| !v.is_blank()) else {
            return (Value::Null, Value::Null);
        };
        let raw = raw.to_string();
        let resolved = self
            .resolver
            .resolve_entry(kind, &raw, self.references.entries(kind));
        let ref_id = resolved
            .id
            .map(Value::from)
            .unwrap_or_else(|| Value::from(raw.trim()));
        (ref_id, Value::from(resolved.display_name))
    }
}

fn opt_string(value: &Option<String>) -> Value {
    value.clone().map(Value::from).unwrap_or(Value::Null)
}
