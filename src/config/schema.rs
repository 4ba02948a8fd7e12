use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct RuleSetConfig {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

impl RuleSetConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.rules.is_empty() {
            issues.push(ValidationIssue::EmptyRuleList);
        }

        let mut seen = HashSet::new();
        for rule in &self.rules {
            if rule.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    rule_id: None,
                    field: "id",
                });
            } else if !seen.insert(rule.id.as_str()) {
                issues.push(ValidationIssue::DuplicateId {
                    rule_id: rule.id.clone(),
                });
            }

            match &rule.rewrite {
                RewriteSpec::Literal { search, .. } => {
                    if search.is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            rule_id: Some(rule.id.clone()),
                            field: "rewrite.search",
                        });
                    }
                }
                RewriteSpec::Regex { pattern, .. } | RewriteSpec::DeleteLine { pattern } => {
                    check_pattern(&mut issues, &rule.id, "rewrite.pattern", pattern);
                }
                RewriteSpec::LineBreak { after, before, .. } => {
                    if after.is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            rule_id: Some(rule.id.clone()),
                            field: "rewrite.after",
                        });
                    }
                    check_pattern(&mut issues, &rule.id, "rewrite.before", before);
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Append another rule set after this one.
    ///
    /// Rules keep their relative order, so `a.merge(b)` applies every rule
    /// of `a` before any rule of `b`. Both sets must agree on the target
    /// when both name one.
    pub fn merge(mut self, other: RuleSetConfig) -> Result<Self, ValidationError> {
        if let Some(theirs) = other.meta.target {
            if let Some(ours) = &self.meta.target {
                if *ours != theirs {
                    return Err(ValidationError {
                        issues: vec![ValidationIssue::ConflictingTargets {
                            first: ours.clone(),
                            second: theirs,
                        }],
                    });
                }
            } else {
                self.meta.target = Some(theirs);
            }
        }

        if self.meta.name.is_empty() {
            self.meta.name = other.meta.name;
        } else if !other.meta.name.is_empty() {
            self.meta.name = format!("{}+{}", self.meta.name, other.meta.name);
        }

        self.rules.extend(other.rules);
        self.validate()?;
        Ok(self)
    }
}

fn check_pattern(
    issues: &mut Vec<ValidationIssue>,
    rule_id: &str,
    field: &'static str,
    pattern: &str,
) {
    if pattern.is_empty() {
        issues.push(ValidationIssue::MissingField {
            rule_id: Some(rule_id.to_string()),
            field,
        });
        return;
    }
    if let Err(e) = regex::Regex::new(pattern) {
        issues.push(ValidationIssue::InvalidPattern {
            rule_id: rule_id.to_string(),
            field,
            message: e.to_string(),
        });
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// File the rules are written against
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RuleDefinition {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    pub rewrite: RewriteSpec,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RewriteSpec {
    /// Exact substring replacement
    Literal {
        search: String,
        #[serde(default)]
        replace: String,
    },
    /// Regex replacement with `$1` / `${name}` capture references
    Regex {
        pattern: String,
        #[serde(default)]
        replace: String,
    },
    /// Drop every line the pattern matches
    DeleteLine { pattern: String },
    /// Insert a missing line break between `after` and a `before` match
    LineBreak {
        after: String,
        before: String,
        #[serde(default)]
        indent: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    EmptyRuleList,
    MissingField {
        rule_id: Option<String>,
        field: &'static str,
    },
    DuplicateId {
        rule_id: String,
    },
    InvalidPattern {
        rule_id: String,
        field: &'static str,
        message: String,
    },
    ConflictingTargets {
        first: String,
        second: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyRuleList => write!(f, "rule set contains no rules"),
            ValidationIssue::MissingField { rule_id, field } => match rule_id {
                Some(id) => write!(f, "rule '{id}' missing required field '{field}'"),
                None => write!(f, "rule missing required field '{field}'"),
            },
            ValidationIssue::DuplicateId { rule_id } => {
                write!(f, "rule id '{rule_id}' is declared more than once")
            }
            ValidationIssue::InvalidPattern {
                rule_id,
                field,
                message,
            } => write!(f, "rule '{rule_id}' has invalid regex in '{field}': {message}"),
            ValidationIssue::ConflictingTargets { first, second } => {
                write!(f, "rule sets target different files: '{first}' and '{second}'")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(id: &str, search: &str) -> RuleDefinition {
        RuleDefinition {
            id: id.to_string(),
            description: None,
            rewrite: RewriteSpec::Literal {
                search: search.to_string(),
                replace: String::new(),
            },
        }
    }

    fn set(target: Option<&str>, rules: Vec<RuleDefinition>) -> RuleSetConfig {
        RuleSetConfig {
            meta: Metadata {
                name: String::new(),
                description: None,
                target: target.map(str::to_string),
            },
            rules,
        }
    }

    #[test]
    fn test_validate_empty_rule_list() {
        let err = set(None, vec![]).validate().unwrap_err();
        assert!(matches!(err.issues[0], ValidationIssue::EmptyRuleList));
    }

    #[test]
    fn test_validate_collects_all_issues() {
        let config = set(
            None,
            vec![
                literal("a", ""),
                literal("a", "x"),
                RuleDefinition {
                    id: "re".to_string(),
                    description: None,
                    rewrite: RewriteSpec::Regex {
                        pattern: "(".to_string(),
                        replace: String::new(),
                    },
                },
            ],
        );
        let err = config.validate().unwrap_err();
        assert_eq!(err.issues.len(), 3);
        let text = err.to_string();
        assert!(text.contains("rewrite.search"));
        assert!(text.contains("declared more than once"));
        assert!(text.contains("invalid regex"));
    }

    #[test]
    fn test_validate_line_break_fields() {
        let config = set(
            None,
            vec![RuleDefinition {
                id: "lb".to_string(),
                description: None,
                rewrite: RewriteSpec::LineBreak {
                    after: String::new(),
                    before: String::new(),
                    indent: None,
                },
            }],
        );
        let err = config.validate().unwrap_err();
        assert_eq!(err.issues.len(), 2);
    }

    #[test]
    fn test_merge_preserves_order_and_target() {
        let first = set(None, vec![literal("a", "x")]);
        let second = set(Some("svc.go"), vec![literal("b", "y")]);
        let merged = first.merge(second).unwrap();
        let ids: Vec<_> = merged.rules.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(merged.meta.target.as_deref(), Some("svc.go"));
    }

    #[test]
    fn test_merge_rejects_conflicting_targets() {
        let first = set(Some("a.go"), vec![literal("a", "x")]);
        let second = set(Some("b.go"), vec![literal("b", "y")]);
        let err = first.merge(second).unwrap_err();
        assert!(matches!(
            err.issues[0],
            ValidationIssue::ConflictingTargets { .. }
        ));
    }

    #[test]
    fn test_merge_rejects_duplicate_ids_across_sets() {
        let first = set(None, vec![literal("a", "x")]);
        let second = set(None, vec![literal("a", "y")]);
        assert!(first.merge(second).is_err());
    }
}
