//! Template Resolver
//!
//! Maps a work order's free-text activity (and optional code) to exactly one
//! active template, or none.
//!
//! Resolution tiers, first hit wins:
//!
//! 1. **Exact name** - template name equals the activity text
//! 2. **Priority** - fixed category order, most specific first
//! 3. **Catalog order** - every remaining active template
//!
//! Every comparison is on trimmed, lower-cased text. Patterns match in both
//! directions (pattern inside activity, or activity inside pattern).

use std::sync::Arc;

use forestal_types::{ActivityTemplate, Category, WorkOrderRef};
use tracing::debug;

use crate::catalog::TemplateCatalog;

/// Category order for the priority tier. A broadly worded pattern in a later
/// category cannot shadow an earlier one.
pub const PRIORITY_ORDER: [Category; 7] = [
    Category::TerrainPreparation,
    Category::ControlledBurn,
    Category::WeedControl,
    Category::AntControl,
    Category::Planting,
    Category::Pruning,
    Category::Thinning,
];

/// Which tier produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    ExactName,
    Priority,
    CatalogOrder,
}

/// Result of resolving a work order.
#[derive(Debug, Clone)]
pub struct TemplateResolution {
    /// Governing template; `None` is a resolution miss
    pub template: Option<Arc<ActivityTemplate>>,
    /// Always the work order's original activity name, unchanged
    pub display_name: String,
    pub tier: Option<MatchTier>,
}

impl TemplateResolution {
    /// No template governs this activity; use the generic field set
    pub fn is_miss(&self) -> bool {
        self.template.is_none()
    }

    pub fn template_id(&self) -> Option<&str> {
        self.template.as_deref().map(|t| t.id.as_str())
    }
}

/// Trimmed, lower-cased comparison form
pub fn normalize_text(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Resolves work orders against a catalog.
pub struct TemplateResolver<'a> {
    catalog: &'a TemplateCatalog,
}

impl<'a> TemplateResolver<'a> {
    pub fn new(catalog: &'a TemplateCatalog) -> Self {
        Self { catalog }
    }

    /// Resolve the template governing a work order.
    pub fn resolve(&self, order: &WorkOrderRef) -> TemplateResolution {
        let activity = normalize_text(&order.activity_name);
        let code = order
            .activity_code
            .as_deref()
            .map(normalize_text)
            .filter(|c| !c.is_empty());

        let hit = self
            .exact_name(&activity)
            .map(|t| (t, MatchTier::ExactName))
            .or_else(|| {
                self.priority(&activity, code.as_deref())
                    .map(|t| (t, MatchTier::Priority))
            })
            .or_else(|| {
                self.catalog_order(&activity, code.as_deref())
                    .map(|t| (t, MatchTier::CatalogOrder))
            });

        match hit {
            Some((template, tier)) => {
                debug!(
                    activity = %order.activity_name,
                    template = %template.id,
                    ?tier,
                    "Resolved activity template"
                );
                TemplateResolution {
                    template: Some(template),
                    display_name: order.activity_name.clone(),
                    tier: Some(tier),
                }
            }
            None => {
                debug!(activity = %order.activity_name, "No template matches activity");
                TemplateResolution {
                    template: None,
                    display_name: order.activity_name.clone(),
                    tier: None,
                }
            }
        }
    }

    fn exact_name(&self, activity: &str) -> Option<Arc<ActivityTemplate>> {
        if activity.is_empty() {
            return None;
        }
        self.catalog
            .active()
            .find(|t| normalize_text(&t.name) == activity)
            .cloned()
    }

    fn priority(&self, activity: &str, code: Option<&str>) -> Option<Arc<ActivityTemplate>> {
        PRIORITY_ORDER.iter().find_map(|category| {
            self.catalog
                .active()
                .filter(|t| t.category == *category)
                .find(|t| matches_template(t, activity, code))
                .cloned()
        })
    }

    fn catalog_order(&self, activity: &str, code: Option<&str>) -> Option<Arc<ActivityTemplate>> {
        self.catalog
            .active()
            .filter(|t| !PRIORITY_ORDER.contains(&t.category))
            .find(|t| matches_template(t, activity, code))
            .cloned()
    }
}

/// Substring predicate shared by the priority and catalog-order tiers.
///
/// Expects already-normalized `activity` and `code`. Empty activity text and
/// empty patterns never match, otherwise they would match everything.
pub fn matches_template(template: &ActivityTemplate, activity: &str, code: Option<&str>) -> bool {
    let by_pattern = !activity.is_empty()
        && template
            .match_patterns
            .iter()
            .map(|p| normalize_text(p))
            .filter(|p| !p.is_empty())
            .any(|p| p == activity || activity.contains(&p) || p.contains(activity));

    let by_code = code.is_some_and(|code| {
        template
            .codes
            .iter()
            .map(|c| normalize_text(c))
            .filter(|c| !c.is_empty())
            .any(|c| code.contains(&c))
    });

    by_pattern || by_code
}
