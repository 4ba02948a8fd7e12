//! Patch engine - loads one target file, runs the rules over it, writes it back
//!
//! The pipeline is strictly linear:
//! - load the whole file into a [`Document`]
//! - apply every [`RewriteRule`] in declaration order
//! - overwrite the file once with the final text
//!
//! Nothing touches the disk between load and save, so a failed write leaves
//! the file exactly as it was before the run.

use crate::config::schema::RuleSetConfig;
use crate::rule::{RewriteRule, RuleError};
use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Everything a run needs: the file to patch and the ordered rules.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub target_path: PathBuf,
    pub rules: Vec<RewriteRule>,
}

impl RunConfig {
    pub fn new(target_path: impl Into<PathBuf>, rules: Vec<RewriteRule>) -> Self {
        Self {
            target_path: target_path.into(),
            rules,
        }
    }

    /// Compile a validated rule set against an explicit target.
    pub fn from_rule_set(
        config: &RuleSetConfig,
        target_path: impl Into<PathBuf>,
    ) -> Result<Self, RuleError> {
        let rules = config
            .rules
            .iter()
            .map(RewriteRule::from_definition)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(target_path, rules))
    }
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error("failed to read {}: {source}", .path.display())]
    ReadFailure {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    WriteFailure {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// What a single rule did to the document.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "RuleOutcome should be checked to see whether the rule fired"]
pub enum RuleOutcome {
    /// Rule matched and rewrote `occurrences` spots
    Applied { rule_id: String, occurrences: usize },
    /// Rule matched nothing; the document was left as is
    NoMatch { rule_id: String },
}

impl RuleOutcome {
    pub fn rule_id(&self) -> &str {
        match self {
            RuleOutcome::Applied { rule_id, .. } | RuleOutcome::NoMatch { rule_id } => rule_id,
        }
    }

    pub fn fired(&self) -> bool {
        matches!(self, RuleOutcome::Applied { .. })
    }
}

impl fmt::Display for RuleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleOutcome::Applied {
                rule_id,
                occurrences,
            } => {
                let noun = if *occurrences == 1 { "occurrence" } else { "occurrences" };
                write!(f, "{rule_id}: applied ({occurrences} {noun})")
            }
            RuleOutcome::NoMatch { rule_id } => write!(f, "{rule_id}: no match"),
        }
    }
}

/// Apply `rules` to `text` in order, returning the final text and one outcome per rule.
pub fn apply_rules(text: &str, rules: &[RewriteRule]) -> (String, Vec<RuleOutcome>) {
    let mut document = Document::from_text("<memory>", text);
    let outcomes = document.apply(rules);
    (document.text, outcomes)
}

/// The in-memory text of the target file for the duration of one run.
#[derive(Debug, Clone)]
pub struct Document {
    path: PathBuf,
    original: String,
    text: String,
}

impl Document {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RunError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| RunError::ReadFailure {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("loaded {} ({} bytes)", path.display(), text.len());
        Ok(Self::from_text(path, text))
    }

    pub fn from_text(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            path: path.into(),
            original: text.clone(),
            text,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn is_modified(&self) -> bool {
        self.text != self.original
    }

    /// Run every rule once, in order, each on the output of the previous one.
    pub fn apply(&mut self, rules: &[RewriteRule]) -> Vec<RuleOutcome> {
        rules.iter().map(|rule| self.apply_rule(rule)).collect()
    }

    fn apply_rule(&mut self, rule: &RewriteRule) -> RuleOutcome {
        let rewritten = rule.apply(&self.text);
        let occurrences = rewritten.occurrences;
        let replacement = match rewritten.text {
            Cow::Owned(text) => Some(text),
            Cow::Borrowed(_) => None,
        };
        if let Some(text) = replacement {
            self.text = text;
        }

        if occurrences == 0 {
            log::debug!("rule {} ({}): no match", rule.id, rule.rewrite.kind());
            RuleOutcome::NoMatch {
                rule_id: rule.id.clone(),
            }
        } else {
            log::debug!(
                "rule {} ({}): {} occurrence(s)",
                rule.id,
                rule.rewrite.kind(),
                occurrences
            );
            RuleOutcome::Applied {
                rule_id: rule.id.clone(),
                occurrences,
            }
        }
    }

    /// Overwrite the file with the current text in a single write.
    pub fn save(&self) -> Result<(), RunError> {
        fs::write(&self.path, &self.text).map_err(|source| RunError::WriteFailure {
            path: self.path.clone(),
            source,
        })?;
        log::info!("wrote {} ({} bytes)", self.path.display(), self.text.len());
        Ok(())
    }

    fn into_report(self, outcomes: Vec<RuleOutcome>, written: bool) -> RunReport {
        RunReport {
            target: self.path,
            outcomes,
            original: self.original,
            patched: self.text,
            written,
        }
    }
}

/// Result of a run: per-rule outcomes plus the text before and after.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub target: PathBuf,
    pub outcomes: Vec<RuleOutcome>,
    pub original: String,
    pub patched: String,
    /// False for dry runs
    pub written: bool,
}

impl RunReport {
    pub fn changed(&self) -> bool {
        self.original != self.patched
    }

    pub fn applied(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.outcomes.iter().filter(|o| o.fired())
    }

    pub fn applied_count(&self) -> usize {
        self.applied().count()
    }
}

/// Load, rewrite, and overwrite the target file.
pub fn run(config: &RunConfig) -> Result<RunReport, RunError> {
    let mut document = Document::load(&config.target_path)?;
    let outcomes = document.apply(&config.rules);
    document.save()?;
    Ok(document.into_report(outcomes, true))
}

/// Same as [`run`] but never writes; the report shows what would change.
pub fn dry_run(config: &RunConfig) -> Result<RunReport, RunError> {
    let mut document = Document::load(&config.target_path)?;
    let outcomes = document.apply(&config.rules);
    Ok(document.into_report(outcomes, false))
}
