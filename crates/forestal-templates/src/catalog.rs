//! Template Catalog
//!
//! The effective set of activity templates for a session: the built-in
//! baseline reconciled against the persisted overlay.
//!
//! Reconciliation rules:
//! 1. Stored schema version differs from the build's → overlay discarded
//! 2. Overlay entry with a built-in id and the same field-id sequence → overlay wins
//! 3. Overlay entry with a built-in id but a drifted field list → built-in wins
//! 4. Overlay entry with no built-in counterpart → kept as a custom template
//!
//! The catalog is copy-on-write. Templates are shared as `Arc`s and every
//! edit (including reconciliation) builds a new catalog with new template
//! values; sessions holding an older `Arc` keep a consistent template.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use forestal_types::ActivityTemplate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::builtin::builtin_templates;
use crate::error::TemplateError;
use crate::store::OverlayStore;

/// Outcome of reconciling the built-in catalog against a stored overlay.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// The effective catalog
    pub catalog: TemplateCatalog,
    /// The stored version did not match; the overlay was ignored entirely
    pub version_reset: bool,
    /// Built-in ids whose overlay customization was kept
    pub kept_overlay: Vec<String>,
    /// Built-in ids whose overlay entry was discarded for field drift
    pub stale_overlay: Vec<String>,
    /// Custom template ids carried over from the overlay
    pub custom: Vec<String>,
    /// Overlay ids dropped because their field list was malformed
    pub rejected: Vec<String>,
}

/// Effective, queryable set of activity templates.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    templates: Vec<Arc<ActivityTemplate>>,
    builtin_ids: BTreeSet<String>,
    schema_version: String,
}

/// Reconcile built-ins against an overlay.
///
/// Pure: reads its inputs, returns a brand new catalog.
pub fn reconcile(
    builtin: &[ActivityTemplate],
    overlay: Option<&[ActivityTemplate]>,
    stored_version: Option<&str>,
    current_version: &str,
) -> Reconciliation {
    let version_reset = stored_version != Some(current_version);
    let overlay: &[ActivityTemplate] = if version_reset {
        &[]
    } else {
        overlay.unwrap_or(&[])
    };

    // First entry per id wins
    let mut by_id: HashMap<&str, &ActivityTemplate> = HashMap::new();
    for entry in overlay {
        by_id.entry(entry.id.as_str()).or_insert(entry);
    }

    let builtin_ids: BTreeSet<String> = builtin.iter().map(|t| t.id.clone()).collect();
    let mut templates = Vec::with_capacity(builtin.len() + overlay.len());
    let mut kept_overlay = Vec::new();
    let mut stale_overlay = Vec::new();
    let mut custom = Vec::new();
    let mut rejected = Vec::new();

    for base in builtin {
        match by_id.get(base.id.as_str()) {
            Some(entry) if entry.same_field_layout(base) && entry.duplicate_field_id().is_none() => {
                debug!(template = %base.id, "Keeping overlay customization");
                kept_overlay.push(base.id.clone());
                templates.push(Arc::new((*entry).clone()));
            }
            Some(entry) => {
                warn!(
                    template = %base.id,
                    overlay_fields = entry.fields.len(),
                    builtin_fields = base.fields.len(),
                    "Overlay field list drifted from built-in, discarding customization"
                );
                stale_overlay.push(base.id.clone());
                templates.push(Arc::new(base.clone()));
            }
            None => templates.push(Arc::new(base.clone())),
        }
    }

    let mut seen_custom = BTreeSet::new();
    for entry in overlay {
        if builtin_ids.contains(&entry.id) || !seen_custom.insert(entry.id.clone()) {
            continue;
        }
        if let Some(field_id) = entry.duplicate_field_id() {
            warn!(
                template = %entry.id,
                field = %field_id,
                "Custom template declares a field twice, dropping it"
            );
            rejected.push(entry.id.clone());
            continue;
        }
        custom.push(entry.id.clone());
        templates.push(Arc::new(entry.clone()));
    }

    info!(
        version = %current_version,
        version_reset,
        kept = kept_overlay.len(),
        stale = stale_overlay.len(),
        custom = custom.len(),
        "Template catalog reconciled"
    );

    Reconciliation {
        catalog: TemplateCatalog {
            templates,
            builtin_ids,
            schema_version: current_version.to_string(),
        },
        version_reset,
        kept_overlay,
        stale_overlay,
        custom,
        rejected,
    }
}

impl TemplateCatalog {
    /// Catalog made of the embedded built-ins only.
    pub fn from_builtin(schema_version: impl Into<String>) -> Result<Self, TemplateError> {
        let builtin = builtin_templates()?;
        Ok(Self {
            builtin_ids: builtin.iter().map(|t| t.id.clone()).collect(),
            templates: builtin.into_iter().map(Arc::new).collect(),
            schema_version: schema_version.into(),
        })
    }

    /// Load the session catalog: read the overlay, reconcile it against the
    /// embedded built-ins, then write the reconciled set and version back.
    pub fn load(
        store: &dyn OverlayStore,
        current_version: &str,
    ) -> Result<Reconciliation, TemplateError> {
        let builtin = builtin_templates()?;
        Self::load_with(store, &builtin, current_version)
    }

    /// `load` against an explicit built-in set.
    pub fn load_with(
        store: &dyn OverlayStore,
        builtin: &[ActivityTemplate],
        current_version: &str,
    ) -> Result<Reconciliation, TemplateError> {
        let stored_version = store.schema_version()?;
        let overlay = if stored_version.as_deref() == Some(current_version) {
            store.load()?
        } else {
            info!(
                stored = ?stored_version,
                current = %current_version,
                "Schema version changed, resetting template overlay"
            );
            None
        };

        let reconciliation = reconcile(
            builtin,
            overlay.as_deref(),
            stored_version.as_deref(),
            current_version,
        );
        reconciliation.catalog.persist(store)?;
        Ok(reconciliation)
    }

    /// Write the effective set and schema version to the store.
    pub fn persist(&self, store: &dyn OverlayStore) -> Result<(), TemplateError> {
        store.save(&self.snapshot())?;
        store.set_schema_version(&self.schema_version)?;
        Ok(())
    }

    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    /// All templates in catalog order (built-ins first, then customs)
    pub fn templates(&self) -> &[Arc<ActivityTemplate>] {
        &self.templates
    }

    /// Active templates in catalog order
    pub fn active(&self) -> impl Iterator<Item = &Arc<ActivityTemplate>> {
        self.templates.iter().filter(|t| t.active)
    }

    pub fn get(&self, id: &str) -> Option<Arc<ActivityTemplate>> {
        self.templates.iter().find(|t| t.id == id).cloned()
    }

    pub fn is_builtin(&self, id: &str) -> bool {
        self.builtin_ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Owned copy of every template, for persistence
    pub fn snapshot(&self) -> Vec<ActivityTemplate> {
        self.templates.iter().map(|t| (**t).clone()).collect()
    }

    /// Insert or replace a template. A replaced template keeps its position.
    pub fn with_template(&self, template: ActivityTemplate) -> Result<Self, TemplateError> {
        if let Some(field_id) = template.duplicate_field_id() {
            return Err(TemplateError::DuplicateFieldId {
                template_id: template.id.clone(),
                field_id: field_id.to_string(),
            });
        }

        let mut next = self.clone();
        let replacement = Arc::new(template);
        match next.position(&replacement.id) {
            Some(idx) => next.templates[idx] = replacement,
            None => next.templates.push(replacement),
        }
        Ok(next)
    }

    /// Activate or deactivate a template
    pub fn with_active(&self, id: &str, active: bool) -> Result<Self, TemplateError> {
        let idx = self
            .position(id)
            .ok_or_else(|| TemplateError::UnknownTemplate(id.to_string()))?;

        let mut next = self.clone();
        let mut updated = (*next.templates[idx]).clone();
        updated.active = active;
        next.templates[idx] = Arc::new(updated);
        Ok(next)
    }

    /// Remove a custom template
    pub fn without(&self, id: &str) -> Result<Self, TemplateError> {
        if self.is_builtin(id) {
            return Err(TemplateError::BuiltInNotRemovable(id.to_string()));
        }
        let idx = self
            .position(id)
            .ok_or_else(|| TemplateError::UnknownTemplate(id.to_string()))?;

        let mut next = self.clone();
        next.templates.remove(idx);
        Ok(next)
    }

    /// Copy a template under a fresh id and a new name.
    ///
    /// Returns the new catalog and the id assigned to the copy.
    pub fn duplicate(&self, id: &str, new_name: &str) -> Result<(Self, String), TemplateError> {
        let source = self
            .get(id)
            .ok_or_else(|| TemplateError::UnknownTemplate(id.to_string()))?;

        let mut copy = (*source).clone();
        copy.id = format!("custom-{}", Uuid::new_v4());
        copy.name = new_name.to_string();
        let new_id = copy.id.clone();

        let next = self.with_template(copy)?;
        Ok((next, new_id))
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.templates.iter().position(|t| t.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryOverlayStore;
    use forestal_types::{Category, FieldDefinition, FieldKind};
    use pretty_assertions::assert_eq;

    fn template(id: &str, fields: &[&str]) -> ActivityTemplate {
        ActivityTemplate {
            id: id.to_string(),
            name: id.to_string(),
            description: "built-in".to_string(),
            category: Category::Thinning,
            unit: "ha".to_string(),
            match_patterns: vec![id.to_lowercase()],
            codes: vec![],
            fields: fields
                .iter()
                .map(|f| FieldDefinition::new(*f, *f, FieldKind::Text))
                .collect(),
            active: true,
        }
    }

    fn customized(id: &str, fields: &[&str]) -> ActivityTemplate {
        let mut t = template(id, fields);
        t.description = "customized".to_string();
        t
    }

    #[test]
    fn test_overlay_with_same_layout_wins() {
        let builtin = vec![template("T", &["a", "b", "c"])];
        let overlay = vec![customized("T", &["a", "b", "c"])];

        let rec = reconcile(&builtin, Some(&overlay), Some("v1"), "v1");

        assert_eq!(rec.kept_overlay, vec!["T".to_string()]);
        assert_eq!(rec.catalog.get("T").unwrap().description, "customized");
    }

    #[test]
    fn test_drifted_overlay_is_discarded() {
        let builtin = vec![template("T", &["a", "b", "c"])];
        let overlay = vec![customized("T", &["a", "b"])];

        let rec = reconcile(&builtin, Some(&overlay), Some("v1"), "v1");

        assert_eq!(rec.stale_overlay, vec!["T".to_string()]);
        assert_eq!(rec.catalog.get("T").unwrap().description, "built-in");
    }

    #[test]
    fn test_reordered_fields_count_as_drift() {
        let builtin = vec![template("T", &["a", "b", "c"])];
        let overlay = vec![customized("T", &["a", "c", "b"])];

        let rec = reconcile(&builtin, Some(&overlay), Some("v1"), "v1");
        assert_eq!(rec.catalog.get("T").unwrap().description, "built-in");
    }

    #[test]
    fn test_version_change_discards_everything() {
        let builtin = vec![template("T", &["a"])];
        let overlay = vec![customized("T", &["a"]), template("CUSTOM", &["x"])];

        let rec = reconcile(&builtin, Some(&overlay), Some("v0"), "v1");

        assert!(rec.version_reset);
        assert!(rec.kept_overlay.is_empty());
        assert!(rec.custom.is_empty());
        assert_eq!(rec.catalog.len(), 1);
        assert_eq!(rec.catalog.get("T").unwrap().description, "built-in");
    }

    #[test]
    fn test_custom_templates_kept_after_builtins() {
        let builtin = vec![template("A", &["a"]), template("B", &["b"])];
        let overlay = vec![template("CUSTOM", &["x"]), customized("B", &["b"])];

        let rec = reconcile(&builtin, Some(&overlay), Some("v1"), "v1");

        let ids: Vec<&str> = rec.catalog.templates().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "CUSTOM"]);
        assert_eq!(rec.custom, vec!["CUSTOM".to_string()]);
        assert!(!rec.catalog.is_builtin("CUSTOM"));
    }

    #[test]
    fn test_malformed_custom_rejected() {
        let builtin = vec![template("A", &["a"])];
        let overlay = vec![template("BAD", &["x", "x"])];

        let rec = reconcile(&builtin, Some(&overlay), Some("v1"), "v1");

        assert_eq!(rec.rejected, vec!["BAD".to_string()]);
        assert!(rec.catalog.get("BAD").is_none());
    }

    #[test]
    fn test_reconcile_builds_new_values() {
        let builtin = vec![template("T", &["a"])];
        let first = reconcile(&builtin, None, None, "v1");
        let held = first.catalog.get("T").unwrap();

        let edited = first.catalog.with_active("T", false).unwrap();

        assert!(held.active);
        assert!(!edited.get("T").unwrap().active);
        assert!(!Arc::ptr_eq(&held, &edited.get("T").unwrap()));
    }

    #[test]
    fn test_load_persists_reconciled_set() {
        let store = MemoryOverlayStore::new();

        let rec = TemplateCatalog::load(&store, "v1").unwrap();

        assert!(rec.version_reset);
        assert_eq!(store.schema_version().unwrap().as_deref(), Some("v1"));
        assert_eq!(store.load().unwrap().unwrap().len(), rec.catalog.len());
    }

    #[test]
    fn test_load_keeps_customization_across_sessions() {
        let store = MemoryOverlayStore::new();
        let first = TemplateCatalog::load(&store, "v1").unwrap().catalog;

        let mut poda = (*first.get("PODA").unwrap()).clone();
        poda.description = "Poda con tijera neumática".to_string();
        first.with_template(poda).unwrap().persist(&store).unwrap();

        let second = TemplateCatalog::load(&store, "v1").unwrap();
        assert_eq!(second.kept_overlay.len(), 12);
        assert_eq!(
            second.catalog.get("PODA").unwrap().description,
            "Poda con tijera neumática"
        );

        let bumped = TemplateCatalog::load(&store, "v2").unwrap();
        assert!(bumped.version_reset);
        assert_ne!(
            bumped.catalog.get("PODA").unwrap().description,
            "Poda con tijera neumática"
        );
    }

    #[test]
    fn test_builtin_cannot_be_removed() {
        let catalog = TemplateCatalog::from_builtin("v1").unwrap();
        assert!(matches!(
            catalog.without("PODA"),
            Err(TemplateError::BuiltInNotRemovable(_))
        ));
    }

    #[test]
    fn test_duplicate_assigns_fresh_id() {
        let catalog = TemplateCatalog::from_builtin("v1").unwrap();

        let (next, new_id) = catalog.duplicate("PODA", "PODA ALTA").unwrap();

        assert_ne!(new_id, "PODA");
        assert_eq!(next.len(), catalog.len() + 1);
        let copy = next.get(&new_id).unwrap();
        assert_eq!(copy.name, "PODA ALTA");
        assert_eq!(copy.fields, catalog.get("PODA").unwrap().fields);

        let removed = next.without(&new_id).unwrap();
        assert_eq!(removed.len(), catalog.len());
    }

    #[test]
    fn test_with_template_rejects_duplicate_fields() {
        let catalog = TemplateCatalog::from_builtin("v1").unwrap();
        let result = catalog.with_template(template("NEW", &["a", "a"]));
        assert!(matches!(
            result,
            Err(TemplateError::DuplicateFieldId { .. })
        ));
    }

    #[test]
    fn test_unknown_template_errors() {
        let catalog = TemplateCatalog::from_builtin("v1").unwrap();
        assert!(matches!(
            catalog.with_active("NOPE", false),
            Err(TemplateError::UnknownTemplate(_))
        ));
    }
}
