/// Rule and strategy-configuration entries
///
/// Both types are plain data, deserializable from the configuration
/// document, with a validity check that the table relies on.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::StrategyOptions;

/// Wildcard matching any workspace or layer
pub const ANY: &str = "*";

/// Id of the default strategy configuration
pub const DEFAULT_STRATEGY_ID: &str = "default";

/// Binding used by the default strategy configuration
pub const DEFAULT_STRATEGY_BINDING: &str = "allow-all";

/// Builds a rule key, i.e. `<workspace>.<layer>`
pub fn build_key(workspace: &str, layer: &str) -> String {
    format!("{}.{}", workspace, layer)
}

/// Maps a `(workspace, layer)` pattern to a strategy configuration id
///
/// Each pattern is a literal name or [`ANY`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEntry {
    pub workspace: String,
    pub layer: String,
    #[serde(rename = "strategyId")]
    pub strategy_id: String,
}

impl RuleEntry {
    pub fn new(
        workspace: impl Into<String>,
        layer: impl Into<String>,
        strategy_id: impl Into<String>,
    ) -> Self {
        Self {
            workspace: workspace.into(),
            layer: layer.into(),
            strategy_id: strategy_id.into(),
        }
    }

    /// All three fields must be non-blank
    pub fn is_valid(&self) -> bool {
        !is_blank(&self.workspace) && !is_blank(&self.layer) && !is_blank(&self.strategy_id)
    }

    /// Rule key, or `None` if the rule is invalid
    pub fn key(&self) -> Option<String> {
        if !self.is_valid() {
            return None;
        }
        Some(build_key(&self.workspace, &self.layer))
    }
}

impl fmt::Display for RuleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rule [{}.{} -> {}]",
            self.workspace, self.layer, self.strategy_id
        )
    }
}

/// A named strategy binding plus the options handed to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyConfig {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "bindingName")]
    pub binding_name: String,
    #[serde(default)]
    pub options: StrategyOptions,
}

impl StrategyConfig {
    pub fn new(id: impl Into<String>, binding_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            binding_name: binding_name.into(),
            options: StrategyOptions::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Id and binding name must be non-blank
    pub fn is_valid(&self) -> bool {
        !is_blank(&self.id) && !is_blank(&self.binding_name)
    }
}

impl Default for StrategyConfig {
    /// Allow-all, applied when no rule matches
    fn default() -> Self {
        Self::new(DEFAULT_STRATEGY_ID, DEFAULT_STRATEGY_BINDING)
    }
}

impl fmt::Display for StrategyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "strategy [{} -> {}]", self.id, self.binding_name)
    }
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}
