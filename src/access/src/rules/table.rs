/// Rule table: prioritized `(workspace, layer)` lookup of strategy configurations
///
/// The table keeps two derived indices (strategies by id, rules by key) to
/// make lookups cheap. Indices are rebuilt on every mutation, but only when
/// the table is valid; an invalid table keeps whatever indices it had.

use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::types::{build_key, RuleEntry, StrategyConfig, ANY};
use crate::error::{AccessError, Result};
use crate::types::CatalogMode;

/// Prioritized rule table
///
/// # Examples
///
/// ```
/// use layergate_access::rules::{RuleEntry, RuleTable, StrategyConfig};
///
/// let table = RuleTable::new()
///     .with_strategy(StrategyConfig::new("ro", "read-only"))
///     .with_rule(RuleEntry::new("topp", "*", "ro"));
///
/// assert_eq!(table.resolve("topp", "states").unwrap().id, "ro");
/// assert_eq!(table.resolve("cite", "roads").unwrap().id, "default");
/// ```
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<RuleEntry>,
    strategies: Vec<StrategyConfig>,
    default_strategy: StrategyConfig,
    catalog_mode: CatalogMode,
    strategy_by_id: HashMap<String, StrategyConfig>,
    rule_by_key: HashMap<String, RuleEntry>,
    /// Outcome of the last validation
    valid: bool,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            strategies: Vec::new(),
            default_strategy: StrategyConfig::default(),
            catalog_mode: CatalogMode::default(),
            strategy_by_id: HashMap::new(),
            rule_by_key: HashMap::new(),
            valid: true,
        }
    }
}

impl RuleTable {
    /// Empty table: every resource resolves to the default (allow-all) strategy
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from its parts and rebuilds the indices
    pub fn from_parts(
        strategies: Vec<StrategyConfig>,
        rules: Vec<RuleEntry>,
        default_strategy: Option<StrategyConfig>,
        catalog_mode: CatalogMode,
    ) -> Self {
        let mut table = Self {
            rules,
            strategies,
            default_strategy: default_strategy.unwrap_or_default(),
            catalog_mode,
            ..Self::default()
        };
        table.validate();
        table
    }

    pub fn with_strategy(mut self, strategy: StrategyConfig) -> Self {
        self.push_strategy(strategy);
        self
    }

    pub fn with_rule(mut self, rule: RuleEntry) -> Self {
        self.push_rule(rule);
        self
    }

    pub fn with_default_strategy(mut self, strategy: StrategyConfig) -> Self {
        self.default_strategy = strategy;
        self
    }

    pub fn with_catalog_mode(mut self, mode: CatalogMode) -> Self {
        self.catalog_mode = mode;
        self
    }

    /// Replaces all rules
    pub fn set_rules(&mut self, rules: Vec<RuleEntry>) {
        self.rules = rules;
        self.validate();
    }

    /// Replaces all strategy configurations
    pub fn set_strategies(&mut self, strategies: Vec<StrategyConfig>) {
        self.strategies = strategies;
        self.validate();
    }

    pub fn push_rule(&mut self, rule: RuleEntry) {
        self.rules.push(rule);
        self.validate();
    }

    pub fn push_strategy(&mut self, strategy: StrategyConfig) {
        self.strategies.push(strategy);
        self.validate();
    }

    pub fn rules(&self) -> &[RuleEntry] {
        &self.rules
    }

    pub fn strategies(&self) -> &[StrategyConfig] {
        &self.strategies
    }

    pub fn default_strategy(&self) -> &StrategyConfig {
        &self.default_strategy
    }

    pub fn catalog_mode(&self) -> CatalogMode {
        self.catalog_mode
    }

    /// Indexed strategy configuration by id
    pub fn strategy(&self, id: &str) -> Option<&StrategyConfig> {
        self.strategy_by_id.get(id)
    }

    /// Indexed rule by key (`<workspace>.<layer>`)
    pub fn rule(&self, key: &str) -> Option<&RuleEntry> {
        self.rule_by_key.get(key)
    }

    /// Number of indexed rules
    pub fn indexed_rules(&self) -> usize {
        self.rule_by_key.len()
    }

    /// Number of indexed strategy configurations
    pub fn indexed_strategies(&self) -> usize {
        self.strategy_by_id.len()
    }

    /// Validity as of the last mutation
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Checks every entry and every rule -> strategy reference
    fn check(&self) -> bool {
        let mut ids = HashSet::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            if !strategy.is_valid() {
                debug!("Invalid strategy configuration detected: {}", strategy);
                return false;
            }
            ids.insert(strategy.id.as_str());
        }

        for rule in &self.rules {
            if !rule.is_valid() {
                debug!("Invalid rule detected: {}", rule);
                return false;
            }
            if !ids.contains(rule.strategy_id.as_str()) {
                debug!(
                    "Invalid configuration detected: rule references unknown strategy {}",
                    rule.strategy_id
                );
                return false;
            }
        }

        true
    }

    /// Validates the table and, if valid, rebuilds the lookup indices
    ///
    /// Returns the validity. A failed validation leaves the indices untouched.
    pub fn validate(&mut self) -> bool {
        self.valid = self.check();
        if !self.valid {
            debug!("Configuration is invalid, keeping previous lookup indices");
            return false;
        }

        debug!("Rebuilding rule table indices");
        self.strategy_by_id = self
            .strategies
            .iter()
            .map(|s| (s.id.clone(), s.clone()))
            .collect();

        // Later duplicates overwrite earlier ones
        self.rule_by_key = self
            .rules
            .iter()
            .filter_map(|r| r.key().map(|k| (k, r.clone())))
            .collect();

        true
    }

    /// Finds the strategy configuration for a resource
    ///
    /// Keys are tried in this order, first hit wins:
    ///
    /// 1. `<workspace>.<layer>`
    /// 2. `<workspace>.*`
    /// 3. `*.<layer>` (skipped when `layer` is the wildcard)
    /// 4. `*.*`
    ///
    /// Falls back to the default strategy configuration.
    ///
    /// # Errors
    ///
    /// * `InvalidArgument` - blank or wildcard workspace, blank layer
    /// * `InvalidConfiguration` - the table is not valid
    pub fn resolve(&self, workspace: &str, layer: &str) -> Result<&StrategyConfig> {
        if workspace.trim().is_empty() || workspace == ANY {
            return Err(AccessError::InvalidArgument(
                "workspace must be specified".to_string(),
            ));
        }
        if layer.trim().is_empty() {
            return Err(AccessError::InvalidArgument(format!(
                "layer must be specified, use {} to look up by workspace only",
                ANY
            )));
        }
        if !self.is_valid() {
            return Err(AccessError::InvalidConfiguration(
                "current configuration is not valid, please fix before using it".to_string(),
            ));
        }

        let Some(rule) = self.best_match(workspace, layer) else {
            debug!(
                "No rule matches {}.{}, using default strategy {}",
                workspace, layer, self.default_strategy.id
            );
            return Ok(&self.default_strategy);
        };

        debug!("Resource {}.{} matched {}", workspace, layer, rule);
        self.strategy_by_id.get(&rule.strategy_id).ok_or_else(|| {
            AccessError::InvalidConfiguration(format!(
                "rule references unknown strategy {}",
                rule.strategy_id
            ))
        })
    }

    fn best_match(&self, workspace: &str, layer: &str) -> Option<&RuleEntry> {
        let any_layer = layer == ANY;

        let candidates = [
            (!any_layer).then(|| build_key(workspace, layer)),
            Some(build_key(workspace, ANY)),
            (!any_layer).then(|| build_key(ANY, layer)),
            Some(build_key(ANY, ANY)),
        ];

        candidates
            .into_iter()
            .flatten()
            .find_map(|key| self.rule_by_key.get(&key))
    }
}
