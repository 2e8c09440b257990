//! Derived-Field Computer
//!
//! Pure functions computing area, elapsed hours and labor days from entered
//! values. Nothing here writes to a record; callers apply the returned
//! `DerivedValues` themselves (see `DerivedValues::apply_to`).
//!
//! A value that cannot be computed because its inputs are missing or invalid
//! is reported as a `ComputationSkip` and the field is left as it was.

use std::collections::BTreeMap;

use chrono::{NaiveTime, Timelike};
use forestal_types::{field_ids, Category, FieldValue, FormRecord};
use tracing::debug;

use crate::config::EngineConfig;

const MINUTES_PER_DAY: i64 = 24 * 60;
const SHIFT_HOURS: f64 = 8.0;

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// `total_plants / density`, 4 decimals. `None` unless both are > 0.
pub fn compute_area(total_plants: f64, density: f64) -> Option<f64> {
    compute_area_with(total_plants, density, 4)
}

fn compute_area_with(total_plants: f64, density: f64, decimals: u32) -> Option<f64> {
    if !(total_plants.is_finite() && density.is_finite()) {
        return None;
    }
    if total_plants <= 0.0 || density <= 0.0 {
        return None;
    }
    Some(round_to(total_plants / density, decimals)).filter(|area| area.is_finite())
}

/// Parse an `HH:MM` punch into minutes since midnight
pub fn parse_punch(punch: &str) -> Option<i64> {
    let time = NaiveTime::parse_from_str(punch.trim(), "%H:%M").ok()?;
    Some(i64::from(time.hour()) * 60 + i64::from(time.minute()))
}

/// Hours between two `HH:MM` punches, wrapping past midnight, 2 decimals.
///
/// `22:00` to `02:00` is 4 hours. Equal punches are 0 hours.
pub fn elapsed_hours(start: &str, end: &str) -> Option<f64> {
    elapsed_hours_with(start, end, 2)
}

fn elapsed_hours_with(start: &str, end: &str, decimals: u32) -> Option<f64> {
    let start = parse_punch(start)?;
    let end = parse_punch(end)?;
    let minutes = (end - start).rem_euclid(MINUTES_PER_DAY);
    Some(round_to(minutes as f64 / 60.0, decimals)).filter(|hours| hours.is_finite())
}

/// `hours × workers`, 2 decimals. Controlled burns report this as `jornada`.
pub fn labor_days_unscaled(hours: f64, workers: f64) -> Option<f64> {
    labor_product(hours, workers).map(|v| round_to(v, 2))
}

/// `hours × workers / 8`, 2 decimals. Hand-labor control activities report
/// this as `jornales`.
pub fn labor_days_per_eight_hour_shift(hours: f64, workers: f64) -> Option<f64> {
    labor_product(hours, workers).map(|v| round_to(v / SHIFT_HOURS, 2))
}

fn labor_product(hours: f64, workers: f64) -> Option<f64> {
    if !(hours.is_finite() && workers.is_finite()) || hours < 0.0 || workers <= 0.0 {
        return None;
    }
    Some(hours * workers)
}

/// Planting loading method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingMethod {
    /// Seedling trays, a fixed number of plants each
    Bandejas,
    /// Bare-root bundles, plantlets counted by hand
    Rocambole,
}

impl LoadingMethod {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "bandejas" => Some(LoadingMethod::Bandejas),
            "rocambole" => Some(LoadingMethod::Rocambole),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoadingMethod::Bandejas => "Bandejas",
            LoadingMethod::Rocambole => "Rocambole",
        }
    }
}

/// Total plants for a planting record.
///
/// Trays times `plants_per_tray` for "Bandejas", the plantlet count for
/// "Rocambole". Without a usable loading method the entered `totalPlantas`
/// is used as-is.
pub fn planting_total_plants(record: &FormRecord, plants_per_tray: u32) -> Option<f64> {
    let method = record
        .text(field_ids::METODO_CARGA)
        .and_then(LoadingMethod::parse);

    let total = match method {
        Some(LoadingMethod::Bandejas) => record
            .number(field_ids::CANT_BANDEJAS)
            .map(|trays| trays * f64::from(plants_per_tray)),
        Some(LoadingMethod::Rocambole) => record.number(field_ids::CANT_PLANTINES),
        None => record.number(field_ids::TOTAL_PLANTAS),
    };
    total.filter(|t| *t > 0.0)
}

/// A derived value that could not be computed
#[derive(Debug, Clone, PartialEq)]
pub struct ComputationSkip {
    pub field: String,
    pub reason: String,
}

/// Output of one computation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedValues {
    pub values: BTreeMap<String, FieldValue>,
    pub skipped: Vec<ComputationSkip>,
}

impl DerivedValues {
    pub fn get(&self, id: &str) -> Option<f64> {
        self.values.get(id).and_then(FieldValue::as_f64)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Write computed values into the record. Skipped fields are untouched.
    pub fn apply_to(&self, record: &mut FormRecord) {
        record.merge(&self.values);
    }

    fn put(&mut self, field: &str, value: Option<f64>, reason: &str) -> Option<f64> {
        match value {
            Some(v) => {
                self.values.insert(field.to_string(), FieldValue::Number(v));
            }
            None => {
                debug!(field, reason, "Skipped derived field");
                self.skipped.push(ComputationSkip {
                    field: field.to_string(),
                    reason: reason.to_string(),
                });
            }
        }
        value
    }
}

/// Compute every derived field for a category from the record's inputs.
///
/// Running it again on a record that already holds the results yields the
/// same values.
pub fn compute_derived(
    category: Category,
    record: &FormRecord,
    config: &EngineConfig,
) -> DerivedValues {
    let mut out = DerivedValues::default();
    let area_dp = config.area_decimals;
    let time_dp = config.time_decimals;

    match category {
        Category::Pruning => {
            let area = record
                .number(field_ids::CANT_PLANTAS)
                .zip(record.number(field_ids::DENSIDAD))
                .and_then(|(plants, density)| compute_area_with(plants, density, area_dp));
            out.put(field_ids::SUPERFICIE, area, "cantPlantas y densidad deben ser > 0");
        }

        Category::Planting => {
            let total = planting_total_plants(record, config.plants_per_tray);
            if record
                .text(field_ids::METODO_CARGA)
                .and_then(LoadingMethod::parse)
                .is_some()
            {
                out.put(field_ids::TOTAL_PLANTAS, total, "faltan bandejas o plantines");
            }
            let area = total
                .zip(record.number(field_ids::DENSIDAD))
                .and_then(|(plants, density)| compute_area_with(plants, density, area_dp));
            out.put(field_ids::SUPERFICIE, area, "totalPlantas y densidad deben ser > 0");
        }

        Category::ControlledBurn => {
            let worked = punches(
                record,
                field_ids::HORA_INGRESO,
                field_ids::HORA_EGRESO,
                time_dp,
            );
            out.put(field_ids::HS_TRABAJADAS, worked, "horaIngreso/horaEgreso inválidas");

            let burn = punches(
                record,
                field_ids::HORA_INICIO_QUEMA,
                field_ids::HORA_FIN_QUEMA,
                time_dp,
            );
            out.put(field_ids::HS_QUEMA, burn, "horaInicioQuema/horaFinQuema inválidas");

            let hours = worked.or_else(|| record.number(field_ids::HS_TRABAJADAS));
            let jornada = hours
                .zip(record.number(field_ids::CANT_PERSONAL))
                .and_then(|(h, w)| labor_days_unscaled(h, w));
            out.put(field_ids::JORNADA, jornada, "faltan horas trabajadas o personal");
        }

        Category::ExoticControl
        | Category::PineRegenerationControl
        | Category::RegrowthManagement => {
            let worked = punches(record, field_ids::HORA_INICIO, field_ids::HORA_FIN, time_dp);
            out.put(field_ids::HS_TRABAJADAS, worked, "horaInicio/horaFin inválidas");

            let hours = worked.or_else(|| record.number(field_ids::HS_TRABAJADAS));
            let jornales = hours
                .zip(record.number(field_ids::CANT_PERSONAL))
                .and_then(|(h, w)| labor_days_per_eight_hour_shift(h, w));
            out.put(field_ids::JORNALES, jornales, "faltan horas trabajadas o personal");
        }

        Category::Thinning
        | Category::ThinningToWaste
        | Category::AntControl
        | Category::WeedControl
        | Category::TerrainPreparation => {}
    }

    out
}

fn punches(record: &FormRecord, start: &str, end: &str, decimals: u32) -> Option<f64> {
    let start = record.text(start)?;
    let end = record.text(end)?;
    elapsed_hours_with(start, end, decimals)
}
