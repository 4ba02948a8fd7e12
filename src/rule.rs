use crate::config::schema::{RewriteSpec, RuleDefinition};
use regex::{Captures, Regex};
use std::borrow::Cow;
use thiserror::Error;

/// A single compiled rewrite rule: an id plus the rewrite it performs.
///
/// Rules are immutable once compiled. The engine applies them in declaration
/// order, each one seeing the output of the rules before it.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    pub id: String,
    pub description: Option<String>,
    pub rewrite: Rewrite,
}

/// The matching strategy of a rule.
///
/// Every variant is applied through [`Rewrite::apply`]: left to right,
/// non-overlapping, and non-recursive. Replacement output is never rescanned
/// by the same rule.
#[derive(Debug, Clone)]
pub enum Rewrite {
    /// Exact substring replacement
    Literal { search: String, replace: String },
    /// Regex replacement; `replace` may reference captures as `$1` or `${name}`
    Regex { pattern: Regex, replace: String },
    /// Remove every whole line (terminator included) in which the pattern matches
    DeleteLine { pattern: Regex },
    /// Split a line after `after` when it is directly followed by `before`
    LineBreak {
        after: String,
        /// `after` escaped, then the separating whitespace as group 1, then `before`
        matcher: Regex,
        indent: String,
    },
}

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("rule '{rule_id}' has an empty {field}")]
    EmptyMatcher {
        rule_id: String,
        field: &'static str,
    },

    #[error("rule '{rule_id}' has an invalid pattern: {source}")]
    InvalidPattern {
        rule_id: String,
        #[source]
        source: regex::Error,
    },
}

/// Output of applying one rewrite to a text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten<'t> {
    pub text: Cow<'t, str>,
    pub occurrences: usize,
}

impl<'t> Rewritten<'t> {
    fn unchanged(text: &'t str) -> Self {
        Self {
            text: Cow::Borrowed(text),
            occurrences: 0,
        }
    }
}

impl RewriteRule {
    /// Exact substring rule.
    pub fn literal(
        id: impl Into<String>,
        search: impl Into<String>,
        replace: impl Into<String>,
    ) -> Result<Self, RuleError> {
        let id = id.into();
        let search = search.into();
        if search.is_empty() {
            return Err(RuleError::EmptyMatcher {
                rule_id: id,
                field: "search",
            });
        }
        Ok(Self {
            id,
            description: None,
            rewrite: Rewrite::Literal {
                search,
                replace: replace.into(),
            },
        })
    }

    /// Regex rule with a templated replacement.
    pub fn regex(
        id: impl Into<String>,
        pattern: &str,
        replace: impl Into<String>,
    ) -> Result<Self, RuleError> {
        let id = id.into();
        let pattern = compile_pattern(&id, "pattern", pattern)?;
        Ok(Self {
            id,
            description: None,
            rewrite: Rewrite::Regex {
                pattern,
                replace: replace.into(),
            },
        })
    }

    /// Whole-line removal rule.
    pub fn delete_line(id: impl Into<String>, pattern: &str) -> Result<Self, RuleError> {
        let id = id.into();
        let pattern = compile_pattern(&id, "pattern", pattern)?;
        Ok(Self {
            id,
            description: None,
            rewrite: Rewrite::DeleteLine { pattern },
        })
    }

    /// Missing line break rule. `before` is a regex, `after` a literal.
    pub fn line_break(
        id: impl Into<String>,
        after: impl Into<String>,
        before: &str,
        indent: impl Into<String>,
    ) -> Result<Self, RuleError> {
        let id = id.into();
        let after = after.into();
        if after.is_empty() {
            return Err(RuleError::EmptyMatcher {
                rule_id: id,
                field: "after",
            });
        }
        if before.is_empty() {
            return Err(RuleError::EmptyMatcher {
                rule_id: id,
                field: "before",
            });
        }
        let combined = format!("{}([ \\t]*)(?:{})", regex::escape(&after), before);
        let matcher = compile_pattern(&id, "before", &combined)?;
        Ok(Self {
            id,
            description: None,
            rewrite: Rewrite::LineBreak {
                after,
                matcher,
                indent: indent.into(),
            },
        })
    }

    /// Compile a rule definition loaded from a rule file.
    pub fn from_definition(def: &RuleDefinition) -> Result<Self, RuleError> {
        let rule = match &def.rewrite {
            RewriteSpec::Literal { search, replace } => {
                Self::literal(def.id.clone(), search.clone(), replace.clone())?
            }
            RewriteSpec::Regex { pattern, replace } => {
                Self::regex(def.id.clone(), pattern, replace.clone())?
            }
            RewriteSpec::DeleteLine { pattern } => Self::delete_line(def.id.clone(), pattern)?,
            RewriteSpec::LineBreak {
                after,
                before,
                indent,
            } => Self::line_break(
                def.id.clone(),
                after.clone(),
                before,
                indent.clone().unwrap_or_default(),
            )?,
        };
        Ok(rule.with_description(def.description.clone()))
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn apply<'t>(&self, text: &'t str) -> Rewritten<'t> {
        self.rewrite.apply(text)
    }
}

impl Rewrite {
    /// Short name of the variant, as spelled in rule files.
    pub fn kind(&self) -> &'static str {
        match self {
            Rewrite::Literal { .. } => "literal",
            Rewrite::Regex { .. } => "regex",
            Rewrite::DeleteLine { .. } => "delete-line",
            Rewrite::LineBreak { .. } => "line-break",
        }
    }

    pub fn apply<'t>(&self, text: &'t str) -> Rewritten<'t> {
        match self {
            Rewrite::Literal { search, replace } => apply_literal(text, search, replace),
            Rewrite::Regex { pattern, replace } => apply_regex(text, pattern, replace),
            Rewrite::DeleteLine { pattern } => apply_delete_line(text, pattern),
            Rewrite::LineBreak {
                after,
                matcher,
                indent,
            } => apply_line_break(text, after.len(), matcher, indent),
        }
    }
}

fn compile_pattern(rule_id: &str, field: &'static str, pattern: &str) -> Result<Regex, RuleError> {
    if pattern.is_empty() {
        return Err(RuleError::EmptyMatcher {
            rule_id: rule_id.to_string(),
            field,
        });
    }
    Regex::new(pattern).map_err(|source| RuleError::InvalidPattern {
        rule_id: rule_id.to_string(),
        source,
    })
}

fn apply_literal<'t>(text: &'t str, search: &str, replace: &str) -> Rewritten<'t> {
    let occurrences = text.matches(search).count();
    if occurrences == 0 {
        return Rewritten::unchanged(text);
    }
    Rewritten {
        text: Cow::Owned(text.replace(search, replace)),
        occurrences,
    }
}

fn apply_regex<'t>(text: &'t str, pattern: &Regex, replace: &str) -> Rewritten<'t> {
    let mut occurrences = 0;
    let text = pattern.replace_all(text, |caps: &Captures<'_>| {
        occurrences += 1;
        let mut expanded = String::new();
        caps.expand(replace, &mut expanded);
        expanded
    });
    Rewritten { text, occurrences }
}

fn apply_delete_line<'t>(text: &'t str, pattern: &Regex) -> Rewritten<'t> {
    let mut kept = String::with_capacity(text.len());
    let mut occurrences = 0;

    for line in text.split_inclusive('\n') {
        let body = line.trim_end_matches(['\n', '\r']);
        if pattern.is_match(body) {
            occurrences += 1;
        } else {
            kept.push_str(line);
        }
    }

    if occurrences == 0 {
        return Rewritten::unchanged(text);
    }
    Rewritten {
        text: Cow::Owned(kept),
        occurrences,
    }
}

fn apply_line_break<'t>(
    text: &'t str,
    after_len: usize,
    matcher: &Regex,
    fallback_indent: &str,
) -> Rewritten<'t> {
    let newline = if text.contains("\r\n") { "\r\n" } else { "\n" };
    let mut out = String::with_capacity(text.len());
    let mut copied_to = 0;
    let mut occurrences = 0;

    for caps in matcher.captures_iter(text) {
        let (Some(whole), Some(gap)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let split_at = whole.start() + after_len;

        let indent = if !gap.as_str().is_empty() {
            gap.as_str()
        } else {
            match leading_indent(text, whole.start()) {
                "" => fallback_indent,
                indent => indent,
            }
        };

        out.push_str(&text[copied_to..split_at]);
        out.push_str(newline);
        out.push_str(indent);
        copied_to = gap.end();
        occurrences += 1;
    }

    if occurrences == 0 {
        return Rewritten::unchanged(text);
    }
    out.push_str(&text[copied_to..]);
    Rewritten {
        text: Cow::Owned(out),
        occurrences,
    }
}

/// Leading spaces/tabs of the line containing byte offset `pos`, up to `pos`.
fn leading_indent(text: &str, pos: usize) -> &str {
    let line_start = text[..pos].rfind('\n').map_or(0, |i| i + 1);
    let prefix = &text[line_start..pos];
    let end = prefix
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(prefix.len());
    &prefix[..end]
}
