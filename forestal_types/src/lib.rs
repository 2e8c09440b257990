//! Forestal Types - Level 1 Foundation Types
//!
//! Pure data structures shared by every crate in the workspace: the activity
//! template schema, the field definitions it declares, and the form record an
//! operator fills in while reporting progress on a work order.
//!
//! ## Architecture Level: LEVEL 1 (Foundation)
//!
//! This crate depends on nothing else in the workspace. Template matching,
//! derived-field formulas and validation live in the crates above it.
//!
//! ## Contents
//!
//! - Work categories (`Category`)
//! - Field schema (`FieldKind`, `FieldDefinition`, `ActivityTemplate`)
//! - Form values (`FieldValue`, `ProductRow`, `FormRecord`, `RecordStatus`)
//! - Work order reference (`WorkOrderRef`)
//! - Storage keys (`field_ids`)

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

// ============================================================================
// FIELD IDENTIFIERS
// ============================================================================

/// Storage keys for the fields the engine knows about.
///
/// A field id is the key its value is stored under, both in a `FormRecord`
/// and in the normalized output record.
pub mod field_ids {
    // Base fields, present on (almost) every template
    pub const FECHA: &str = "fecha";
    pub const CUADRILLA: &str = "cuadrilla";
    pub const CANT_PERSONAL: &str = "cantPersonal";
    pub const JORNADA: &str = "jornada";
    pub const SUPERFICIE: &str = "superficie";
    pub const HA: &str = "ha";
    pub const ESTADO: &str = "estado";
    pub const OBSERVACIONES: &str = "observaciones";

    // Planting / pruning
    pub const METODO_CARGA: &str = "metodoCarga";
    pub const CANT_BANDEJAS: &str = "cantBandejas";
    pub const CANT_PLANTINES: &str = "cantPlantines";
    pub const TOTAL_PLANTAS: &str = "totalPlantas";
    pub const DENSIDAD: &str = "densidad";
    pub const VIVERO: &str = "vivero";
    pub const ESPECIE: &str = "especie";
    pub const CLON: &str = "clon";
    pub const ANIO_PLANTACION: &str = "anioPlantacion";
    pub const TIPO_PODA: &str = "tipoPoda";
    pub const ALTURA_PODA: &str = "alturaPoda";
    pub const CANT_PLANTAS: &str = "cantPlantas";

    // Ant control
    pub const NRO_NIDOS: &str = "nroNidos";
    pub const ESPECIE_HORMIGA: &str = "especieHormiga";
    pub const PRODUCTO: &str = "producto";
    pub const CANTIDAD: &str = "cantidad";
    pub const UNIDAD: &str = "unidad";

    // Weed control
    pub const TIPO_APLICACION: &str = "tipoAplicacion";
    pub const VOLUMEN_APLICADO: &str = "volumenAplicado";
    /// Reserved dynamic-list slot holding the product rows.
    pub const PRODUCTS: &str = "products";

    // Time punches and labor
    pub const HORA_INGRESO: &str = "horaIngreso";
    pub const HORA_INICIO_QUEMA: &str = "horaInicioQuema";
    pub const HORA_FIN_QUEMA: &str = "horaFinQuema";
    pub const HORA_EGRESO: &str = "horaEgreso";
    pub const HORA_INICIO: &str = "horaInicio";
    pub const HORA_FIN: &str = "horaFin";
    pub const HS_TRABAJADAS: &str = "hsTrabajadas";
    pub const HS_QUEMA: &str = "hsQuema";
    pub const JORNALES: &str = "jornales";

    // Terrain preparation
    pub const TIPO_PREPARACION: &str = "tipoPreparacion";
}

// ============================================================================
// WORK CATEGORIES
// ============================================================================

/// Fixed classification of a template. Drives which derived-field formulas
/// and which validation overlay apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Pruning,
    Thinning,
    ThinningToWaste,
    Planting,
    AntControl,
    WeedControl,
    ControlledBurn,
    ExoticControl,
    PineRegenerationControl,
    RegrowthManagement,
    TerrainPreparation,
}

impl Category {
    /// Every category, in declaration order
    pub const ALL: [Category; 11] = [
        Category::Pruning,
        Category::Thinning,
        Category::ThinningToWaste,
        Category::Planting,
        Category::AntControl,
        Category::WeedControl,
        Category::ControlledBurn,
        Category::ExoticControl,
        Category::PineRegenerationControl,
        Category::RegrowthManagement,
        Category::TerrainPreparation,
    ];

    /// Stable machine name (matches the serde representation)
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Pruning => "pruning",
            Category::Thinning => "thinning",
            Category::ThinningToWaste => "thinning_to_waste",
            Category::Planting => "planting",
            Category::AntControl => "ant_control",
            Category::WeedControl => "weed_control",
            Category::ControlledBurn => "controlled_burn",
            Category::ExoticControl => "exotic_control",
            Category::PineRegenerationControl => "pine_regeneration_control",
            Category::RegrowthManagement => "regrowth_management",
            Category::TerrainPreparation => "terrain_preparation",
        }
    }

    /// Operator-facing label
    pub fn label(&self) -> &'static str {
        match self {
            Category::Pruning => "Poda",
            Category::Thinning => "Raleo",
            Category::ThinningToWaste => "Raleo a desecho",
            Category::Planting => "Plantación",
            Category::AntControl => "Control de hormigas",
            Category::WeedControl => "Control de malezas",
            Category::ControlledBurn => "Quema controlada",
            Category::ExoticControl => "Control de exóticas",
            Category::PineRegenerationControl => "Control de regeneración de pinos",
            Category::RegrowthManagement => "Manejo de rebrote",
            Category::TerrainPreparation => "Preparación de terreno",
        }
    }

    /// Categories that record worked area in `ha` instead of `superficie`.
    pub fn uses_hectare_field(&self) -> bool {
        matches!(
            self,
            Category::PineRegenerationControl
                | Category::TerrainPreparation
                | Category::RegrowthManagement
        )
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// FIELD SCHEMA
// ============================================================================

fn default_max_rows() -> usize {
    5
}

fn default_true() -> bool {
    true
}

/// Kind of a form field, with only the data that kind needs.
///
/// Serialized with a `kind` discriminant. An unknown `kind` fails to
/// deserialize - templates declaring a kind outside this enum are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Number,
    Date,
    Select {
        /// Allowed values in display order. Empty for reference selects
        /// whose options come from a reference list at runtime.
        #[serde(default)]
        options: Vec<String>,
    },
    Checkbox,
    TextArea,
    DynamicList {
        #[serde(default = "default_max_rows")]
        max_rows: usize,
    },
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Number => "number",
            FieldKind::Date => "date",
            FieldKind::Select { .. } => "select",
            FieldKind::Checkbox => "checkbox",
            FieldKind::TextArea => "text_area",
            FieldKind::DynamicList { .. } => "dynamic_list",
        }
    }

    /// Select options, if this is a select field
    pub fn options(&self) -> Option<&[String]> {
        match self {
            FieldKind::Select { options } => Some(options.as_slice()),
            _ => None,
        }
    }
}

/// One field of a template's data-entry form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Storage key of the value; unique within a template
    pub id: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    /// Display/iteration order only
    #[serde(default)]
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// System fields are shared by all templates (date, crew, status...)
    #[serde(default, rename = "system")]
    pub is_system_field: bool,
}

impl FieldDefinition {
    /// Create a field with defaults for every optional attribute
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
            required: false,
            order: 0,
            placeholder: None,
            unit: None,
            description: None,
            is_system_field: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    pub fn system(mut self) -> Self {
        self.is_system_field = true;
        self
    }
}

/// A named schema of fields governing one activity's data-entry form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityTemplate {
    /// Stable identifier, never reused
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    #[serde(default)]
    pub unit: String,
    /// Free-text patterns the resolver matches activity names against
    #[serde(default)]
    pub match_patterns: Vec<String>,
    /// Activity codes this template answers to
    #[serde(default)]
    pub codes: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl ActivityTemplate {
    /// Look up a declared field by id
    pub fn field(&self, id: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Does the template declare this field?
    pub fn declares(&self, id: &str) -> bool {
        self.field(id).is_some()
    }

    /// Field ids in declaration order
    pub fn field_ids(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.id.as_str()).collect()
    }

    /// True when both templates declare the same field ids in the same order.
    pub fn same_field_layout(&self, other: &ActivityTemplate) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(other.fields.iter())
                .all(|(a, b)| a.id == b.id)
    }

    /// Fields sorted by `order`, ties kept in declaration order
    pub fn ordered_fields(&self) -> Vec<&FieldDefinition> {
        let mut fields: Vec<&FieldDefinition> = self.fields.iter().collect();
        fields.sort_by_key(|f| f.order);
        fields
    }

    /// First field id declared more than once, if any
    pub fn duplicate_field_id(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.fields
            .iter()
            .map(|f| f.id.as_str())
            .find(|id| !seen.insert(*id))
    }
}

// ============================================================================
// FORM VALUES
// ============================================================================

/// A single entered value.
///
/// Form inputs arrive as text more often than not, so numeric accessors also
/// accept numeric strings (with either `.` or `,` as decimal separator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Numeric view of the value, if it has one and it is finite
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) if n.is_finite() => Some(*n),
            FieldValue::Text(s) => s
                .trim()
                .replace(',', ".")
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Text view of the value (trimmed), `None` for non-text values
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.trim()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Empty or whitespace-only text. Numbers and booleans are never blank.
    pub fn is_blank(&self) -> bool {
        matches!(self, FieldValue::Text(s) if s.trim().is_empty())
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Bool(b) => serde_json::Value::Bool(*b),
            FieldValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FieldValue::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

/// One row of the weed-control product list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRow {
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: String,
}

impl ProductRow {
    pub fn new(product_name: impl Into<String>, quantity: f64, unit: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            quantity: Some(quantity),
            unit: unit.into(),
        }
    }

    /// Product chosen, quantity > 0 and unit chosen
    pub fn is_complete(&self) -> bool {
        !self.product_name.trim().is_empty()
            && self.quantity.is_some_and(|q| q.is_finite() && q > 0.0)
            && !self.unit.trim().is_empty()
    }
}

/// Values entered for one activity report, keyed by field id.
///
/// Owned by the data-entry session that created it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormRecord {
    /// Reserved dynamic-list slot (weed control only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<ProductRow>,
    #[serde(flatten)]
    pub values: BTreeMap<String, FieldValue>,
}

impl FormRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, id: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.values.insert(id.into(), value.into());
        self
    }

    /// Builder-style product row
    pub fn with_product(mut self, row: ProductRow) -> Self {
        self.products.push(row);
        self
    }

    pub fn set(&mut self, id: impl Into<String>, value: impl Into<FieldValue>) {
        self.values.insert(id.into(), value.into());
    }

    pub fn remove(&mut self, id: &str) -> Option<FieldValue> {
        self.values.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&FieldValue> {
        self.values.get(id)
    }

    /// Present and not blank
    pub fn is_present(&self, id: &str) -> bool {
        self.get(id).is_some_and(|v| !v.is_blank())
    }

    /// Numeric value of a field, if present and numeric
    pub fn number(&self, id: &str) -> Option<f64> {
        self.get(id).and_then(FieldValue::as_f64)
    }

    /// Non-blank text value of a field
    pub fn text(&self, id: &str) -> Option<&str> {
        self.get(id)
            .and_then(FieldValue::as_text)
            .filter(|s| !s.is_empty())
    }

    /// Write a batch of values over the current ones
    pub fn merge(&mut self, values: &BTreeMap<String, FieldValue>) {
        for (id, value) in values {
            self.values.insert(id.clone(), value.clone());
        }
    }
}

/// Status of a reported activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
    #[default]
    #[serde(rename = "Pendiente")]
    Pending,
    #[serde(rename = "Completado")]
    Completed,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Pending => "Pendiente",
            RecordStatus::Completed => "Completado",
        }
    }

    /// Parse an entered status; anything unrecognized is pending
    pub fn from_value(value: Option<&FieldValue>) -> Self {
        match value.and_then(FieldValue::as_text) {
            Some(s) if s.eq_ignore_ascii_case("completado") || s.eq_ignore_ascii_case("completed") => {
                RecordStatus::Completed
            }
            _ => RecordStatus::Pending,
        }
    }
}

// ============================================================================
// WORK ORDER REFERENCE
// ============================================================================

/// Location fields carried by a work order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkOrderFields {
    #[serde(default)]
    pub campo: Option<String>,
    #[serde(default)]
    pub rodales: Vec<String>,
}

/// Read-only view of the work order an activity report belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderRef {
    pub activity_name: String,
    #[serde(default)]
    pub activity_code: Option<String>,
    #[serde(default)]
    pub fields: WorkOrderFields,
}

impl WorkOrderRef {
    pub fn new(activity_name: impl Into<String>) -> Self {
        Self {
            activity_name: activity_name.into(),
            ..Default::default()
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.activity_code = Some(code.into());
        self
    }
}
