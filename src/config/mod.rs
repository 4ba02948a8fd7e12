pub mod builtin;
pub mod loader;
pub mod schema;

pub use builtin::{builtin_rules, DEFAULT_TARGET};
pub use loader::{load_from_path, load_from_str, load_rule_sets, ConfigError};
pub use schema::{
    Metadata, RewriteSpec, RuleDefinition, RuleSetConfig, ValidationError, ValidationIssue,
};
