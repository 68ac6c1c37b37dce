//! Rule definitions and their compiled form.
//!
//! A [`Pattern`] is the immutable pairing of a match expression and a
//! replacement template. Construction compiles the expression and checks the
//! template, so a value that exists can always be applied:
//! - regex mode: `$1`, `$name`, `${name}` group references are validated
//!   against the compiled expression, `$$` is a literal `$`
//! - literal mode: the source is escaped and the replacement inserted verbatim
//!
//! Compiled expressions are memoized process-wide.

use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

use memchr::memchr;
use miette::Diagnostic;
use moka::sync::Cache;
use regex::{NoExpand, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Upper bound of memoized compiled expressions
const COMPILE_CACHE_CAPACITY: u64 = 4_096;

/// Process-lifetime memo of compiled expressions, keyed by flags + expression
static COMPILED: LazyLock<Cache<String, Regex>> =
    LazyLock::new(|| Cache::new(COMPILE_CACHE_CAPACITY));

/// One authored rewrite rule, as read from configuration or the command line
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleDefinition {
    /// Expression searched for in the name
    pub pattern: String,

    /// Replacement template (may reference groups and the `$d` token)
    #[serde(default)]
    pub replacement: String,

    /// Interpret `pattern` as a regular expression (otherwise literal text)
    #[serde(default = "default_regex")]
    pub regex: bool,

    /// Case-insensitive matching
    #[serde(default)]
    pub ignore_case: bool,
}

fn default_regex() -> bool {
    true
}

impl RuleDefinition {
    pub fn new(
        pattern: impl Into<String>,
        replacement: impl Into<String>,
        regex: bool,
        ignore_case: bool,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
            regex,
            ignore_case,
        }
    }
}

/// Rejection of a rule whose expression or template cannot be compiled
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Diagnostic)]
pub enum PatternCompileError {
    #[error("invalid expression `{expression}`: {reason}")]
    #[diagnostic(
        code(rendiff::pattern::expression),
        help("check the regular expression syntax, or mark the rule as literal")
    )]
    Expression { expression: String, reason: String },

    #[error("replacement `{replacement}` references unknown group `{group}` in `{expression}`")]
    #[diagnostic(
        code(rendiff::pattern::unknown_group),
        help("write `${{1}}_` instead of `$1_`, or `$$` for a literal dollar sign")
    )]
    UnknownGroup {
        expression: String,
        replacement: String,
        group: String,
    },

    #[error("replacement `{replacement}` has an unterminated `${{` group reference")]
    #[diagnostic(code(rendiff::pattern::unterminated_group))]
    UnterminatedGroup {
        expression: String,
        replacement: String,
    },
}

impl PatternCompileError {
    /// The expression the failing rule was built from
    pub fn expression(&self) -> &str {
        match self {
            Self::Expression { expression, .. }
            | Self::UnknownGroup { expression, .. }
            | Self::UnterminatedGroup { expression, .. } => expression,
        }
    }
}

/// Compiled, immutable rewrite rule.
///
/// Equality and hashing follow the four authored fields only; two patterns
/// built from the same definition are interchangeable.
#[derive(Debug, Clone)]
pub struct Pattern {
    definition: RuleDefinition,
    regex: Regex,
}

impl Pattern {
    pub fn new(
        source: &str,
        replacement: &str,
        is_regex: bool,
        ignore_case: bool,
    ) -> Result<Self, PatternCompileError> {
        Self::from_definition(&RuleDefinition::new(
            source,
            replacement,
            is_regex,
            ignore_case,
        ))
    }

    pub fn from_definition(definition: &RuleDefinition) -> Result<Self, PatternCompileError> {
        let expression = if definition.regex {
            definition.pattern.clone()
        } else {
            regex::escape(&definition.pattern)
        };

        let regex = compiled(&expression, definition.ignore_case)?;

        if definition.regex {
            check_replacement(&regex, &definition.replacement)?;
        }

        Ok(Self {
            definition: definition.clone(),
            regex,
        })
    }

    pub fn definition(&self) -> &RuleDefinition {
        &self.definition
    }

    pub fn source(&self) -> &str {
        &self.definition.pattern
    }

    pub fn replacement(&self) -> &str {
        &self.definition.replacement
    }

    pub fn is_regex(&self) -> bool {
        self.definition.regex
    }

    pub fn ignore_case(&self) -> bool {
        self.definition.ignore_case
    }

    /// The expression actually compiled (escaped in literal mode)
    pub fn expression(&self) -> &str {
        self.regex.as_str()
    }

    /// Replace every non-overlapping match, leftmost first
    pub fn apply(&self, input: &str) -> String {
        if self.definition.regex {
            self.regex
                .replace_all(input, self.definition.replacement.as_str())
                .into_owned()
        } else {
            self.regex
                .replace_all(input, NoExpand(&self.definition.replacement))
                .into_owned()
        }
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.definition == other.definition
    }
}

impl Eq for Pattern {}

impl Hash for Pattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.definition.hash(state);
    }
}

/// Compile `expression`, reusing a previously compiled instance when present.
///
/// Failures are never cached.
fn compiled(expression: &str, ignore_case: bool) -> Result<Regex, PatternCompileError> {
    let key = format!("{}\u{0}{expression}", u8::from(ignore_case));

    if let Some(hit) = COMPILED.get(&key) {
        return Ok(hit);
    }

    let regex = RegexBuilder::new(expression)
        .case_insensitive(ignore_case)
        .build()
        .map_err(|e| PatternCompileError::Expression {
            expression: expression.to_string(),
            reason: e.to_string(),
        })?;

    COMPILED.insert(key, regex.clone());
    Ok(regex)
}

/// Validate every group reference in a regex-mode replacement template.
///
/// Follows the `regex` crate's expansion grammar: `$$` escapes, `${...}` is
/// braced, and an unbraced name is the longest run of `[_0-9A-Za-z]`.
fn check_replacement(regex: &Regex, replacement: &str) -> Result<(), PatternCompileError> {
    let bytes = replacement.as_bytes();
    let mut i = 0usize;

    while let Some(off) = memchr(b'$', &bytes[i..]) {
        let at = i + off;
        let rest = &bytes[at + 1..];

        match rest.first() {
            Some(b'$') => {
                i = at + 2;
            }
            Some(b'{') => {
                let Some(close) = memchr(b'}', &rest[1..]) else {
                    return Err(PatternCompileError::UnterminatedGroup {
                        expression: regex.as_str().to_string(),
                        replacement: replacement.to_string(),
                    });
                };
                check_group(regex, replacement, &replacement[at + 2..at + 2 + close])?;
                i = at + 2 + close + 1;
            }
            _ => {
                let len = rest
                    .iter()
                    .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
                    .count();

                // A bare `$` is literal
                if len > 0 {
                    check_group(regex, replacement, &replacement[at + 1..at + 1 + len])?;
                }
                i = at + 1 + len;
            }
        }

        if i >= bytes.len() {
            break;
        }
    }

    Ok(())
}

fn check_group(regex: &Regex, replacement: &str, group: &str) -> Result<(), PatternCompileError> {
    let known = match group.parse::<usize>() {
        Ok(index) => index < regex.captures_len(),
        Err(_) => regex.capture_names().flatten().any(|name| name == group),
    };

    if known {
        Ok(())
    } else {
        Err(PatternCompileError::UnknownGroup {
            expression: regex.as_str().to_string(),
            replacement: replacement.to_string(),
            group: group.to_string(),
        })
    }
}
