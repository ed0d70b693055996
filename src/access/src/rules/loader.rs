/// Configuration document loading
///
/// Reads the JSON rule configuration into a [`RuleTable`]. The strict entry
/// points report every problem; [`load_configuration`] falls back to the
/// default table instead.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{error, info, warn};

use super::table::RuleTable;
use super::types::{RuleEntry, StrategyConfig, DEFAULT_STRATEGY_ID};
use crate::error::{AccessError, Result};
use crate::types::CatalogMode;

/// On-disk shape of the rule configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(rename = "catalogMode", default)]
    pub catalog_mode: CatalogMode,

    #[serde(
        rename = "defaultStrategy",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub default_strategy: Option<StrategyConfig>,

    #[serde(default)]
    pub strategies: Vec<StrategyConfig>,

    #[serde(default)]
    pub rules: Vec<RuleEntry>,
}

impl ConfigDocument {
    /// Builds the rule table; the result may be invalid
    pub fn into_table(self) -> RuleTable {
        let default_strategy = self.default_strategy.map(|mut strategy| {
            if strategy.id.trim().is_empty() {
                strategy.id = DEFAULT_STRATEGY_ID.to_string();
            }
            strategy
        });

        RuleTable::from_parts(
            self.strategies,
            self.rules,
            default_strategy,
            self.catalog_mode,
        )
    }

    /// Snapshot of an existing table, e.g. for persisting it
    pub fn from_table(table: &RuleTable) -> Self {
        Self {
            catalog_mode: table.catalog_mode(),
            default_strategy: Some(table.default_strategy().clone()),
            strategies: table.strategies().to_vec(),
            rules: table.rules().to_vec(),
        }
    }
}

/// Parses a JSON document into a valid rule table
///
/// # Errors
///
/// * `Config` - the document is not well-formed
/// * `InvalidConfiguration` - the resulting table is not valid
pub fn parse_document(json: &str) -> Result<RuleTable> {
    let document: ConfigDocument =
        serde_json::from_str(json).map_err(|e| AccessError::Config(e.to_string()))?;

    let table = document.into_table();
    if !table.is_valid() {
        return Err(AccessError::InvalidConfiguration(
            "configuration document describes an invalid rule table".to_string(),
        ));
    }

    Ok(table)
}

/// Reads and parses a configuration file
pub fn read_configuration(path: impl AsRef<Path>) -> Result<RuleTable> {
    let json = std::fs::read_to_string(path.as_ref())?;
    parse_document(&json)
}

/// Loads a configuration file, falling back to the default table
///
/// A missing, unreadable or invalid file yields an empty table (no rules,
/// allow-all default, `HIDE` catalog mode).
pub fn load_configuration(path: impl AsRef<Path>) -> RuleTable {
    let path = path.as_ref();

    if !path.exists() {
        warn!(
            "Configuration file {} not found, using default configuration",
            path.display()
        );
        return RuleTable::new();
    }

    match read_configuration(path) {
        Ok(table) => {
            info!(
                "Loaded configuration from {}: {} strategies, {} rules",
                path.display(),
                table.strategies().len(),
                table.rules().len()
            );
            table
        }
        Err(e) => {
            error!(
                "Failed to load configuration from {}, using default configuration: {}",
                path.display(),
                e
            );
            RuleTable::new()
        }
    }
}

/// Serializes a table back to the JSON document shape
pub fn to_document(table: &RuleTable) -> Result<String> {
    serde_json::to_string_pretty(&ConfigDocument::from_table(table))
        .map_err(|e| AccessError::Config(e.to_string()))
}
