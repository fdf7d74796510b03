//! Engine configuration.

use gallery_core::{ReconcileStrategy, SectionId};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Section holding the item grid
    pub section: SectionId,
    /// Reconcile strategy for the item grid
    pub item_strategy: ReconcileStrategy,
    /// Reconcile strategy for both group lists
    pub group_strategy: ReconcileStrategy,
    /// Content states buffered per edit-feed receiver
    pub edit_feed_capacity: usize,
    /// Prompts issued while authorization stays pending
    pub max_authorization_prompts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            section: SectionId::images(),
            item_strategy: ReconcileStrategy::default(),
            group_strategy: ReconcileStrategy::default(),
            edit_feed_capacity: 64,
            max_authorization_prompts: 3,
        }
    }
}

impl EngineConfig {
    /// Anchor-exchange item moves, swap group moves, reinserted group changes.
    pub fn legacy() -> Self {
        Self {
            item_strategy: ReconcileStrategy::LEGACY_ITEMS,
            group_strategy: ReconcileStrategy::LEGACY_GROUPS,
            ..Self::default()
        }
    }

    /// Parse a JSON configuration; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }
}
