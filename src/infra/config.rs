use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, InitArgs};
use crate::core::conflict::PathComparison;
use crate::core::pattern::RuleDefinition;

/// Config files probed in the working directory, first match wins
const CONFIG_PATHS: [&str; 4] = ["rendiff.toml", "rendiff.yaml", "rendiff.json", ".rendiff.toml"];

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Glob patterns excluded from candidate enumeration (in addition to .gitignore)
    pub ignore_patterns: Vec<String>,

    /// Ordered rename rules
    pub rules: Vec<RuleDefinition>,

    /// Candidate enumeration settings
    pub preview: PreviewConfig,

    /// Collision analysis settings
    pub conflicts: ConflictConfig,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig
{
    pub include_dirs: bool,
    pub max_depth: Option<usize>,
    pub show_hidden: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflictConfig
{
    /// Path equality policy; defaults to the platform's
    pub comparison: PathComparison,

    /// Count pre-existing siblings outside the batch as occupied names
    pub include_existing: bool,
}

impl Config
{
    /// Starter configuration written by `rendiff init`
    pub fn sample() -> Self
    {
        Self {
            ignore_patterns: vec![
                "**/target/**".to_string(),
                "**/node_modules/**".to_string(),
                "**/.DS_Store".to_string(),
                "**/Thumbs.db".to_string(),
            ],
            rules: vec![
                RuleDefinition::new(r"\s+", "_", true, false),
                RuleDefinition::new(r"^(IMG|DSC)_?", "$d_", true, true),
            ],
            preview: PreviewConfig::default(),
            conflicts: ConflictConfig::default(),
        }
    }
}

/// Load configuration from `explicit`, or the first config file found in the
/// working directory, then overlay `RENDIFF_*` environment variables
/// (`__` separates nested keys, e.g. `RENDIFF_CONFLICTS__INCLUDE_EXISTING`).
pub fn load_config(explicit: Option<&Path>) -> Result<Config>
{
    let mut builder = config::Config::builder();

    match explicit
    {
        Some(path) =>
        {
            let path = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref());
            if !path.exists()
            {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            builder = builder.add_source(config::File::from(path));
        }
        None =>
        {
            if let Some(path) = CONFIG_PATHS
                .iter()
                .find(|p| Path::new(p).exists())
            {
                builder = builder.add_source(config::File::with_name(path));
            }
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("RENDIFF")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join("rendiff.toml");

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let toml_string =
        toml::to_string_pretty(&Config::sample()).context("Failed to serialize default config")?;

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_sample_round_trips_through_loader() -> Result<()>
    {
        let tmp = TempDir::new()?;
        init(
            InitArgs { path: tmp.path().to_path_buf(), force: false },
            &AppContext { quiet: true, ..AppContext::default() },
        )?;

        let loaded = load_config(Some(&tmp.path().join("rendiff.toml")))?;
        assert_eq!(loaded.rules, Config::sample().rules);
        assert!(loaded.rules[1].ignore_case);
        Ok(())
    }

    #[test]
    fn test_init_refuses_to_overwrite() -> Result<()>
    {
        let tmp = TempDir::new()?;
        std::fs::write(tmp.path().join("rendiff.toml"), "")?;

        let ctx = AppContext { quiet: true, ..AppContext::default() };
        let err = init(InitArgs { path: tmp.path().to_path_buf(), force: false }, &ctx);
        assert!(err.is_err());

        init(InitArgs { path: tmp.path().to_path_buf(), force: true }, &ctx)?;
        Ok(())
    }

    #[test]
    fn test_partial_file_uses_defaults() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("custom.toml");
        std::fs::write(
            &path,
            r#"
[[rules]]
pattern = "draft"
replacement = "final"
regex = false

[conflicts]
comparison = "case_insensitive"
"#,
        )?;

        let cfg = load_config(Some(&path))?;
        assert_eq!(cfg.rules, vec![RuleDefinition::new("draft", "final", false, false)]);
        assert_eq!(cfg.conflicts.comparison, PathComparison::CaseInsensitive);
        assert!(!cfg.conflicts.include_existing);
        assert!(!cfg.preview.include_dirs);
        Ok(())
    }

    #[test]
    fn test_missing_explicit_file_is_an_error()
    {
        assert!(load_config(Some(Path::new("/definitely/not/here.toml"))).is_err());
    }
}
