//! Rule matchers: plain substitution and directory-name expansion.
//!
//! The directory token is `$d`. It is only a token when the byte before it is
//! not `$`, so `$$d` survives expansion untouched and later renders as a
//! literal `$d` through the regex `$$` escape.
//!
//! Expansion braces bare group references (`$1` becomes `${1}`), so a
//! directory name placed right after one cannot extend the group name.

use std::path::Path;

use memchr::{memchr, memmem};
use tracing::{debug, warn};

use crate::core::pattern::{Pattern, PatternCompileError, RuleDefinition};

/// Placeholder for the containing directory's name
pub const DIRECTORY_TOKEN: &str = "$d";

/// Per-item context handed to every rule of a chain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemContext<'a> {
    /// Name of the immediate containing directory; empty when unknown
    pub directory_name: &'a str,
}

impl<'a> ItemContext<'a> {
    pub fn new(directory_name: &'a str) -> Self {
        Self { directory_name }
    }

    /// Context for the item at `path`: its parent's final component.
    /// Roots and non-UTF-8 names yield an empty directory name.
    pub fn for_path(path: &'a Path) -> Self {
        let directory_name = path
            .parent()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
            .unwrap_or_default();

        Self { directory_name }
    }
}

/// Byte offsets of every unescaped `$d` in `template`
fn token_offsets(template: &str) -> impl Iterator<Item = usize> + '_ {
    let bytes = template.as_bytes();
    memmem::find_iter(bytes, DIRECTORY_TOKEN.as_bytes())
        .filter(move |&at| at == 0 || bytes[at - 1] != b'$')
}

/// True if `template` holds at least one unescaped directory token
pub fn contains_token(template: &str) -> bool {
    token_offsets(template).next().is_some()
}

/// Replace every unescaped `$d` with `directory` in a regex-mode template.
///
/// Bare `$name` / `$N` references are rewritten to `${name}` / `${N}`;
/// everything else is kept as written. The directory name is inserted as is.
pub fn expand_token(template: &str, directory: &str) -> String {
    expand(template, directory, false)
}

/// Build the regex-mode template for one item.
///
/// In literal mode every `$` outside a token or `$$d` escape is doubled, and
/// so is any `$` in the directory name, so the result always renders as text.
fn expand(template: &str, directory: &str, literal: bool) -> String {
    let bytes = template.as_bytes();
    let mut tokens = token_offsets(template).peekable();
    let mut out = String::with_capacity(template.len() + directory.len() + 4);
    let mut i = 0usize;

    while i < bytes.len() {
        // offsets skipped inside a `${...}` reference are not tokens
        while tokens.next_if(|&at| at < i).is_some() {}

        if tokens.next_if_eq(&i).is_some() {
            if literal {
                out.push_str(&directory.replace('$', "$$"));
            } else {
                out.push_str(directory);
            }
            i += DIRECTORY_TOKEN.len();
            continue;
        }

        if bytes[i] != b'$' {
            let end = memchr(b'$', &bytes[i..]).map_or(bytes.len(), |off| i + off);
            out.push_str(&template[i..end]);
            i = end;
            continue;
        }

        let rest = &bytes[i + 1..];

        if literal {
            if rest.starts_with(b"$d") {
                out.push_str("$$d");
                i += 3;
            } else {
                out.push_str("$$");
                i += 1;
            }
            continue;
        }

        match rest.first() {
            Some(b'$') => {
                out.push_str("$$");
                i += 2;
            }
            Some(b'{') => {
                let end = memchr(b'}', rest).map_or(bytes.len(), |off| i + 1 + off + 1);
                out.push_str(&template[i..end]);
                i = end;
            }
            _ => {
                let len = rest
                    .iter()
                    .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
                    .count();

                if len > 0 {
                    out.push_str("${");
                    out.push_str(&template[i + 1..i + 1 + len]);
                    out.push('}');
                } else {
                    out.push('$');
                }
                i += 1 + len;
            }
        }
    }

    out
}

/// A compiled rule, ready to rewrite names
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleMatcher {
    /// Context-independent substitution
    Plain(Pattern),

    /// Substitution whose template names the containing directory.
    ///
    /// `base` is the rule compiled in regex mode with the token expanded to
    /// nothing (the source already escaped for literal rules), which validates
    /// it up front; `template` is the raw template re-expanded for every item.
    DirectoryAware {
        base: Pattern,
        template: String,
        literal: bool,
    },
}

impl RuleMatcher {
    /// Compile an authored rule, choosing the variant from its template
    pub fn compile(definition: &RuleDefinition) -> Result<Self, PatternCompileError> {
        if !contains_token(&definition.replacement) {
            return Pattern::from_definition(definition).map(Self::Plain);
        }

        let literal = !definition.regex;
        let expression = if literal {
            regex::escape(&definition.pattern)
        } else {
            definition.pattern.clone()
        };

        let base = Pattern::new(
            &expression,
            &expand(&definition.replacement, "", literal),
            true,
            definition.ignore_case,
        )?;

        Ok(Self::DirectoryAware {
            base,
            template: definition.replacement.clone(),
            literal,
        })
    }

    pub fn is_directory_aware(&self) -> bool {
        matches!(self, Self::DirectoryAware { .. })
    }

    /// The authored replacement template
    pub fn template(&self) -> &str {
        match self {
            Self::Plain(pattern) => pattern.replacement(),
            Self::DirectoryAware { template, .. } => template,
        }
    }

    /// The wrapped pattern (for a directory-aware rule, the probe compilation)
    pub fn pattern(&self) -> &Pattern {
        match self {
            Self::Plain(pattern) | Self::DirectoryAware { base: pattern, .. } => pattern,
        }
    }

    /// Rewrite `input`, reporting a failed per-item recompilation
    pub fn rewrite(
        &self,
        input: &str,
        ctx: &ItemContext<'_>,
    ) -> Result<String, PatternCompileError> {
        match self {
            Self::Plain(pattern) => Ok(pattern.apply(input)),
            Self::DirectoryAware {
                base,
                template,
                literal,
            } => {
                let expanded = expand(template, ctx.directory_name, *literal);
                debug!(
                    directory = ctx.directory_name,
                    template = %expanded,
                    "expanding directory token"
                );

                let derived =
                    Pattern::new(base.expression(), &expanded, true, base.ignore_case())?;
                Ok(derived.apply(input))
            }
        }
    }

    /// Rewrite `input`, falling back to the unchanged input when the
    /// directory-derived pattern does not compile
    pub fn apply(&self, input: &str, ctx: &ItemContext<'_>) -> String {
        self.rewrite(input, ctx).unwrap_or_else(|err| {
            warn!(directory = ctx.directory_name, error = %err, "rule skipped for item");
            input.to_string()
        })
    }
}
