//! Assembling rule chains from configuration and the command line.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use tracing::info;

use crate::cli::{AppContext, CheckArgs, RuleArgs};
use crate::core::chain::RuleChain;
use crate::core::matcher::RuleMatcher;
use crate::core::pattern::RuleDefinition;
use crate::infra::config::{Config, load_config};

/// Configured rules (unless skipped) followed by command-line rules
pub fn definitions(config: &Config, args: &RuleArgs) -> Vec<RuleDefinition> {
    let configured = if args.no_config_rules {
        &[][..]
    } else {
        config.rules.as_slice()
    };

    let inline = args
        .rules
        .chunks_exact(2)
        .map(|pair| RuleDefinition::new(&pair[0], &pair[1], !args.literal, args.ignore_case));

    configured.iter().cloned().chain(inline).collect()
}

/// Compile definitions into a chain; an invalid rule is fatal
pub fn build_chain(definitions: &[RuleDefinition]) -> Result<RuleChain> {
    let mut chain = RuleChain::new();

    for (index, definition) in definitions.iter().enumerate() {
        chain
            .try_push(definition)
            .with_context(|| format!("rule #{} (`{}`) is invalid", index + 1, definition.pattern))?;
    }

    info!(rules = chain.len(), "rule chain compiled");
    Ok(chain)
}

/// `rendiff check`: compile every rule and report each one
pub fn run(args: CheckArgs, ctx: &AppContext) -> Result<()> {
    let config = load_config(ctx.config.as_deref())?;
    let definitions = definitions(&config, &args.rules);

    if definitions.is_empty() {
        if !ctx.quiet {
            println!("No rules configured.");
        }
        return Ok(());
    }

    let mut invalid = 0usize;

    for (index, definition) in definitions.iter().enumerate() {
        match RuleMatcher::compile(definition) {
            Ok(matcher) => {
                if ctx.quiet {
                    continue;
                }
                let kind = if matcher.is_directory_aware() {
                    "directory-aware"
                } else if definition.regex {
                    "regex"
                } else {
                    "literal"
                };
                let label = format!("#{:<3} ok", index + 1);
                let label = if ctx.no_color {
                    label
                } else {
                    label.green().to_string()
                };
                println!(
                    "{label}  {kind:<15}  `{}` -> `{}`",
                    definition.pattern, definition.replacement
                );
            }
            Err(err) => {
                invalid += 1;
                eprintln!("#{:<3} invalid", index + 1);
                eprintln!("{:?}", miette::Report::new(err));
            }
        }
    }

    if invalid > 0 {
        anyhow::bail!("{invalid} of {} rules are invalid", definitions.len());
    }
    Ok(())
}
