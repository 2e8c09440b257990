//! Validation Engine
//!
//! Checks a record against its template and stops at the first failure.
//! Rules run in a fixed order:
//!
//! 1. Base rules shared by every template
//! 2. Value-kind conformance of every declared field
//! 3. The category's own rules
//! 4. Any remaining field the template marks required

use chrono::NaiveDate;
use forestal_types::{field_ids, ActivityTemplate, Category, FieldKind, FormRecord};
use tracing::debug;

use crate::config::EngineConfig;
use crate::derived::parse_punch;
use crate::error::{ValidationFailure, ValidationRule};

type Check = Result<(), ValidationFailure>;

// =============================================================================
// ENTRY POINT
// =============================================================================

/// Validate a record, returning the first rule it breaks.
pub fn validate_record(
    template: &ActivityTemplate,
    record: &FormRecord,
    config: &EngineConfig,
) -> Result<(), ValidationFailure> {
    let validator = RecordValidator {
        template,
        record,
        config,
    };
    validator.validate().inspect_err(|failure| {
        debug!(
            template = %template.id,
            field = %failure.field,
            rule = %failure.rule,
            "Record failed validation"
        );
    })
}

// =============================================================================
// VALIDATOR
// =============================================================================

struct RecordValidator<'a> {
    template: &'a ActivityTemplate,
    record: &'a FormRecord,
    config: &'a EngineConfig,
}

impl RecordValidator<'_> {
    fn validate(&self) -> Check {
        self.base_rules()?;
        self.kind_conformance()?;
        self.category_rules()?;
        self.declared_required()
    }

    // ── Base rules ──

    fn base_rules(&self) -> Check {
        self.required(field_ids::FECHA)?;
        self.required(field_ids::CUADRILLA)?;
        if self.template.declares(field_ids::CANT_PERSONAL) {
            self.required(field_ids::CANT_PERSONAL)?;
        }
        if self.template.declares(field_ids::JORNADA) {
            self.required(field_ids::JORNADA)?;
        }
        if !self.template.category.uses_hectare_field() {
            self.required(field_ids::SUPERFICIE)?;
        }
        Ok(())
    }

    // ── Kind conformance ──

    fn kind_conformance(&self) -> Check {
        for field in &self.template.fields {
            if field.id == field_ids::PRODUCTS {
                continue;
            }
            let value = self.record.get(&field.id).filter(|v| !v.is_blank());
            let Some(value) = value else {
                continue;
            };
            let label = field.label.as_str();
            match &field.kind {
                FieldKind::Number if value.as_f64().is_none() => {
                    return Err(self.fail(
                        &field.id,
                        ValidationRule::InvalidNumber,
                        format!("{} no es un número válido", label),
                    ));
                }
                FieldKind::Date => {
                    let parsed = value
                        .as_text()
                        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());
                    if parsed.is_none() {
                        return Err(self.fail(
                            &field.id,
                            ValidationRule::InvalidDate,
                            format!("{} debe tener formato AAAA-MM-DD", label),
                        ));
                    }
                }
                FieldKind::Select { options } if !options.is_empty() => {
                    let entered = value.to_string();
                    let entered = entered.trim();
                    if !options.iter().any(|o| o.trim().eq_ignore_ascii_case(entered)) {
                        return Err(self.fail(
                            &field.id,
                            ValidationRule::InvalidOption,
                            format!("{}: opción no válida '{}'", label, entered),
                        ));
                    }
                }
                FieldKind::Checkbox if value.as_bool().is_none() => {
                    return Err(self.fail(
                        &field.id,
                        ValidationRule::InvalidCheckbox,
                        format!("{} debe ser verdadero o falso", label),
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }

    // ── Category rules ──

    fn category_rules(&self) -> Check {
        match self.template.category {
            Category::Planting => {
                for id in [
                    field_ids::METODO_CARGA,
                    field_ids::DENSIDAD,
                    field_ids::VIVERO,
                    field_ids::ESPECIE,
                    field_ids::CLON,
                ] {
                    self.required(id)?;
                }
                self.plantation_year()
            }
            Category::Pruning => {
                self.required(field_ids::TIPO_PODA)?;
                self.positive(field_ids::ALTURA_PODA)?;
                self.positive(field_ids::CANT_PLANTAS)?;
                self.positive(field_ids::DENSIDAD)?;
                self.plantation_year()
            }
            Category::AntControl => {
                for id in [
                    field_ids::NRO_NIDOS,
                    field_ids::ESPECIE_HORMIGA,
                    field_ids::PRODUCTO,
                    field_ids::CANTIDAD,
                ] {
                    self.required(id)?;
                }
                Ok(())
            }
            Category::WeedControl => {
                self.required(field_ids::TIPO_APLICACION)?;
                self.required(field_ids::VOLUMEN_APLICADO)?;
                self.product_rows()
            }
            Category::Thinning => self.required(field_ids::ESPECIE),
            Category::ControlledBurn => {
                for id in [
                    field_ids::HORA_INGRESO,
                    field_ids::HORA_INICIO_QUEMA,
                    field_ids::HORA_FIN_QUEMA,
                    field_ids::HORA_EGRESO,
                ] {
                    self.punch(id)?;
                }
                self.required(field_ids::CANT_PERSONAL)?;
                self.required(field_ids::JORNADA)
            }
            Category::RegrowthManagement | Category::PineRegenerationControl => {
                self.positive(field_ids::CANT_PERSONAL)?;
                self.positive(field_ids::HA)?;
                if let Some(field) = self.template.field(field_ids::ANIO_PLANTACION) {
                    if field.required || self.record.is_present(field_ids::ANIO_PLANTACION) {
                        self.plantation_year()?;
                    }
                }
                Ok(())
            }
            Category::TerrainPreparation => {
                self.positive(field_ids::HA)?;
                self.positive(field_ids::JORNALES)
            }
            Category::ThinningToWaste | Category::ExoticControl => Ok(()),
        }
    }

    fn plantation_year(&self) -> Check {
        let id = field_ids::ANIO_PLANTACION;
        self.required(id)?;
        let year = self.number(id)?;
        if !self.config.year_in_range(year) {
            return Err(self.fail(
                id,
                ValidationRule::YearRange,
                format!(
                    "{} debe estar entre {} y {}",
                    self.label(id),
                    self.config.plantation_year_min,
                    self.config.plantation_year_max
                ),
            ));
        }
        Ok(())
    }

    fn product_rows(&self) -> Check {
        let cap = match self.template.field(field_ids::PRODUCTS).map(|f| &f.kind) {
            Some(FieldKind::DynamicList { max_rows }) => *max_rows,
            _ => self.config.max_product_rows,
        };
        let rows = &self.record.products;
        if rows.len() > cap {
            return Err(self.fail(
                field_ids::PRODUCTS,
                ValidationRule::ProductRows,
                format!("Se admiten como máximo {} productos", cap),
            ));
        }
        if !rows.iter().any(|row| row.is_complete()) {
            return Err(self.fail(
                field_ids::PRODUCTS,
                ValidationRule::ProductRows,
                "Debe cargar al menos un producto completo (producto, cantidad mayor a 0 y unidad)",
            ));
        }
        Ok(())
    }

    fn punch(&self, id: &str) -> Check {
        self.required(id)?;
        let valid = self.record.text(id).and_then(parse_punch).is_some();
        if !valid {
            return Err(self.fail(
                id,
                ValidationRule::InvalidTime,
                format!("{} debe tener formato HH:MM", self.label(id)),
            ));
        }
        Ok(())
    }

    // ── Declared required ──

    fn declared_required(&self) -> Check {
        for field in self.template.ordered_fields() {
            if !field.required {
                continue;
            }
            let present = match field.kind {
                FieldKind::DynamicList { .. } => !self.record.products.is_empty(),
                _ => self.record.is_present(&field.id),
            };
            if !present {
                return Err(self.fail(
                    &field.id,
                    ValidationRule::Required,
                    format!("{} es obligatorio", field.label),
                ));
            }
        }
        Ok(())
    }

    // ── Primitives ──

    fn required(&self, id: &str) -> Check {
        if self.record.is_present(id) {
            return Ok(());
        }
        Err(self.fail(
            id,
            ValidationRule::Required,
            format!("{} es obligatorio", self.label(id)),
        ))
    }

    fn number(&self, id: &str) -> Result<f64, ValidationFailure> {
        self.record.number(id).ok_or_else(|| {
            self.fail(
                id,
                ValidationRule::InvalidNumber,
                format!("{} no es un número válido", self.label(id)),
            )
        })
    }

    fn positive(&self, id: &str) -> Check {
        self.required(id)?;
        if self.number(id)? <= 0.0 {
            return Err(self.fail(
                id,
                ValidationRule::Positive,
                format!("{} debe ser mayor a 0", self.label(id)),
            ));
        }
        Ok(())
    }

    fn label(&self, id: &str) -> String {
        if let Some(field) = self.template.field(id) {
            return field.label.clone();
        }
        match id {
            field_ids::FECHA => "Fecha".to_string(),
            field_ids::CUADRILLA => "Cuadrilla".to_string(),
            field_ids::CANT_PERSONAL => "Cantidad de personal".to_string(),
            field_ids::JORNADA => "Jornada".to_string(),
            field_ids::SUPERFICIE => "Superficie".to_string(),
            field_ids::HA => "Hectáreas".to_string(),
            field_ids::ANIO_PLANTACION => "Año de plantación".to_string(),
            other => other.to_string(),
        }
    }

    fn fail(&self, id: &str, rule: ValidationRule, reason: impl Into<String>) -> ValidationFailure {
        ValidationFailure::new(id, rule, reason)
    }
}
