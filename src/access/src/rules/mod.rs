/// Rule table module
///
/// Maps `(workspace, layer)` patterns to strategy configurations with a fixed
/// precedence cascade, and loads the table from its JSON document.
///
/// # Examples
///
/// ```
/// use layergate_access::rules::parse_document;
///
/// let table = parse_document(r#"{
///     "strategies": [{ "id": "ro", "bindingName": "read-only" }],
///     "rules": [{ "workspace": "*", "layer": "roads", "strategyId": "ro" }]
/// }"#).unwrap();
///
/// assert_eq!(table.resolve("topp", "roads").unwrap().binding_name, "read-only");
/// ```

mod loader;
mod table;
mod types;

pub use loader::{load_configuration, parse_document, read_configuration, to_document, ConfigDocument};
pub use table::RuleTable;
pub use types::{
    build_key, RuleEntry, StrategyConfig, ANY, DEFAULT_STRATEGY_BINDING, DEFAULT_STRATEGY_ID,
};
