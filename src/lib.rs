//! Sourcefix: deterministic rule-based source patching
//!
//! Reads one text file, runs an ordered list of rewrite rules over it, and
//! writes the result back. The target is never parsed; every rule works on
//! plain text.
//!
//! # Architecture
//!
//! Rules are data. A rule file (TOML) declares an ordered list of
//! [`RewriteRule`]s; each one is an exact substring replacement, a regex
//! replacement, a whole-line removal, or a missing-line-break insertion.
//! The [`engine`] applies them in declaration order, each rule seeing the
//! output of the previous one, and reports a [`RuleOutcome`] per rule.
//!
//! # Guarantees
//!
//! - A rule that matches nothing is a no-op, never an error
//! - Replacement output is never rescanned by the same rule
//! - The target is written once, at the end, or not at all
//! - The built-in rules are idempotent: a second run changes nothing
//!
//! # Example
//!
//! ```
//! use sourcefix::{apply_rules, RewriteRule};
//!
//! let rules = vec![
//!     RewriteRule::literal("fix-arg", "SetHistorique(historiqueJSON)", "SetHistorique(historique)")
//!         .unwrap(),
//!     RewriteRule::line_break("split", "}", r"updateBuilder\.", "\t").unwrap(),
//! ];
//!
//! let (text, outcomes) = apply_rules("}updateBuilder.SetHistorique(historiqueJSON)", &rules);
//! assert_eq!(text, "}\n\tupdateBuilder.SetHistorique(historique)");
//! assert!(outcomes.iter().all(|o| o.fired()));
//! ```

pub mod config;
pub mod engine;
pub mod rule;

// Re-exports
pub use config::{
    builtin_rules, load_from_path, load_from_str, load_rule_sets, ConfigError, RuleSetConfig,
    ValidationError,
};
pub use engine::{
    apply_rules, dry_run, run, Document, RuleOutcome, RunConfig, RunError, RunReport,
};
pub use rule::{Rewrite, RewriteRule, RuleError, Rewritten};
