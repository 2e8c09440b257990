use anyhow::{anyhow, Result};
use forestal_types::ActivityTemplate;
use std::sync::RwLock;

use crate::error::TemplateError;

// ── Overlay Store ──
// The persisted, possibly customized copy of the catalog plus the schema
// version it was written under. Owned by the persistence collaborator.

/// Persistence seam for the template overlay.
///
/// Implementations are synchronous; failures are reported, never retried.
pub trait OverlayStore: Send + Sync {
    /// Stored overlay, `None` if nothing was ever saved.
    fn load(&self) -> Result<Option<Vec<ActivityTemplate>>>;
    fn save(&self, templates: &[ActivityTemplate]) -> Result<()>;
    /// Schema version the overlay was written under.
    fn schema_version(&self) -> Result<Option<String>>;
    fn set_schema_version(&self, version: &str) -> Result<()>;
}

/// Encode an overlay for string-based stores (key/value, browser storage).
pub fn encode_overlay(templates: &[ActivityTemplate]) -> Result<String, TemplateError> {
    Ok(serde_json::to_string(templates)?)
}

/// Decode an overlay written by `encode_overlay`.
pub fn decode_overlay(raw: &str) -> Result<Vec<ActivityTemplate>, TemplateError> {
    Ok(serde_json::from_str(raw)?)
}

// ── MemoryOverlayStore ──

#[derive(Debug, Default)]
struct MemoryState {
    templates: Option<Vec<ActivityTemplate>>,
    schema_version: Option<String>,
    saves: usize,
}

/// In-memory OverlayStore for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryOverlayStore {
    inner: RwLock<MemoryState>,
}

impl MemoryOverlayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with an overlay written under `version`.
    pub fn with_overlay(templates: Vec<ActivityTemplate>, version: impl Into<String>) -> Self {
        Self {
            inner: RwLock::new(MemoryState {
                templates: Some(templates),
                schema_version: Some(version.into()),
                saves: 0,
            }),
        }
    }

    /// Number of `save` calls received.
    pub fn save_count(&self) -> usize {
        self.inner.read().map(|s| s.saves).unwrap_or_default()
    }
}

impl OverlayStore for MemoryOverlayStore {
    fn load(&self) -> Result<Option<Vec<ActivityTemplate>>> {
        let state = self.inner.read().map_err(|e| anyhow!("Lock: {}", e))?;
        Ok(state.templates.clone())
    }

    fn save(&self, templates: &[ActivityTemplate]) -> Result<()> {
        let mut state = self.inner.write().map_err(|e| anyhow!("Lock: {}", e))?;
        state.templates = Some(templates.to_vec());
        state.saves += 1;
        Ok(())
    }

    fn schema_version(&self) -> Result<Option<String>> {
        let state = self.inner.read().map_err(|e| anyhow!("Lock: {}", e))?;
        Ok(state.schema_version.clone())
    }

    fn set_schema_version(&self, version: &str) -> Result<()> {
        let mut state = self.inner.write().map_err(|e| anyhow!("Lock: {}", e))?;
        state.schema_version = Some(version.to_string());
        Ok(())
    }
}
