//! Reference Resolver
//!
//! Crew, nursery, species and clone fields hold either an opaque identifier
//! or a display name typed by the operator. One resolution chain serves all
//! four lists:
//!
//! 1. exact id match
//! 2. case-insensitive display-name match
//! 3. truncated placeholder when the value looks like an identifier
//! 4. the raw value, unchanged

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::EngineConfig;

static HEX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]+$").unwrap());

/// Which reference list a value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Crew,
    Nursery,
    Species,
    ClonalLine,
}

impl ReferenceKind {
    /// Label used in placeholders
    pub fn label(&self) -> &'static str {
        match self {
            ReferenceKind::Crew => "Cuadrilla",
            ReferenceKind::Nursery => "Vivero",
            ReferenceKind::Species => "Especie",
            ReferenceKind::ClonalLine => "Clon",
        }
    }
}

/// One candidate from a reference-list provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceEntry {
    pub id: String,
    #[serde(alias = "nombre")]
    pub display_name: String,
    /// Provider fields this core does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ReferenceEntry {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            extra: Map::new(),
        }
    }
}

/// How a reference value was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMethod {
    ById,
    ByName,
    Placeholder,
    Passthrough,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedReference {
    /// Identifier of the matched entry, or the raw identifier for placeholders
    pub id: Option<String>,
    pub display_name: String,
    pub method: ResolutionMethod,
}

/// Resolution chain shared by every reference list.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceResolver {
    id_length: usize,
    prefix_len: usize,
}

impl Default for ReferenceResolver {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl ReferenceResolver {
    pub fn new(id_length: usize, prefix_len: usize) -> Self {
        Self {
            id_length,
            prefix_len,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.reference_id_length, config.placeholder_prefix_len)
    }

    /// Fixed-length hexadecimal shape
    pub fn looks_like_id(&self, value: &str) -> bool {
        value.len() == self.id_length && HEX_RE.is_match(value)
    }

    /// Run the chain against any candidate type.
    ///
    /// `id_of` and `name_of` select the identifier and display field.
    pub fn resolve<T>(
        &self,
        value: &str,
        label: &str,
        candidates: &[T],
        id_of: impl Fn(&T) -> &str,
        name_of: impl Fn(&T) -> &str,
    ) -> ResolvedReference {
        let value = value.trim();

        if let Some(hit) = candidates.iter().find(|c| !value.is_empty() && id_of(*c) == value) {
            return ResolvedReference {
                id: Some(id_of(hit).to_string()),
                display_name: name_of(hit).to_string(),
                method: ResolutionMethod::ById,
            };
        }

        let lowered = value.to_lowercase();
        if let Some(hit) = candidates
            .iter()
            .find(|c| !value.is_empty() && name_of(*c).trim().to_lowercase() == lowered)
        {
            return ResolvedReference {
                id: Some(id_of(hit).to_string()),
                display_name: name_of(hit).to_string(),
                method: ResolutionMethod::ByName,
            };
        }

        if self.looks_like_id(value) {
            let prefix: String = value.chars().take(self.prefix_len).collect();
            return ResolvedReference {
                id: Some(value.to_string()),
                display_name: format!("{} {}…", label, prefix),
                method: ResolutionMethod::Placeholder,
            };
        }

        ResolvedReference {
            id: None,
            display_name: value.to_string(),
            method: ResolutionMethod::Passthrough,
        }
    }

    /// `resolve` over provider entries
    pub fn resolve_entry(
        &self,
        kind: ReferenceKind,
        value: &str,
        entries: &[ReferenceEntry],
    ) -> ResolvedReference {
        self.resolve(
            value,
            kind.label(),
            entries,
            |e| e.id.as_str(),
            |e| e.display_name.as_str(),
        )
    }
}

/// Reference lists available to a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceBook {
    #[serde(default)]
    pub crews: Vec<ReferenceEntry>,
    #[serde(default)]
    pub nurseries: Vec<ReferenceEntry>,
    #[serde(default)]
    pub species: Vec<ReferenceEntry>,
    #[serde(default)]
    pub clones: Vec<ReferenceEntry>,
}

impl ReferenceBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self, kind: ReferenceKind) -> &[ReferenceEntry] {
        match kind {
            ReferenceKind::Crew => &self.crews,
            ReferenceKind::Nursery => &self.nurseries,
            ReferenceKind::Species => &self.species,
            ReferenceKind::ClonalLine => &self.clones,
        }
    }

    pub fn with_entry(mut self, kind: ReferenceKind, entry: ReferenceEntry) -> Self {
        match kind {
            ReferenceKind::Crew => self.crews.push(entry),
            ReferenceKind::Nursery => self.nurseries.push(entry),
            ReferenceKind::Species => self.species.push(entry),
            ReferenceKind::ClonalLine => self.clones.push(entry),
        }
        self
    }
}
