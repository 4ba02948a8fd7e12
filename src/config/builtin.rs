//! Rule sets compiled into the binary.
//!
//! The convocations service is repaired in two stages, always in this order:
//! type corrections first, then line breaks. The line-break stage matches the
//! setter calls as they read once their arguments have been corrected.

use crate::config::loader::{load_from_str, ConfigError};
use crate::config::schema::RuleSetConfig;

pub const TYPE_CORRECTIONS: &str = include_str!("../../rules/10-type-corrections.toml");
pub const LINE_BREAKS: &str = include_str!("../../rules/20-line-breaks.toml");

/// Default file the built-in rules are written against.
pub const DEFAULT_TARGET: &str = "internal/modules/convocations/service.go";

/// The built-in stages in application order.
pub const STAGES: [(&str, &str); 2] = [
    ("type-corrections", TYPE_CORRECTIONS),
    ("line-breaks", LINE_BREAKS),
];

/// Load and compose every built-in stage.
pub fn builtin_rules() -> Result<RuleSetConfig, ConfigError> {
    let (_, first) = STAGES[0];
    let mut combined = load_from_str(first)?;
    for (_, source) in &STAGES[1..] {
        let next = load_from_str(source)?;
        combined = combined
            .merge(next)
            .map_err(|source| ConfigError::Validation { path: None, source })?;
    }
    Ok(combined)
}
