use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shared application context for global flags
#[derive(Clone, Debug, Default)]
pub struct AppContext {
    pub quiet: bool,            // global --quiet
    pub no_color: bool,         // global --no-color
    pub verbose: bool,          // global --verbose
    pub config: Option<PathBuf>, // global --config
}

#[derive(Parser)]
#[command(name = "rendiff")]
#[command(about = "Preview rule-based batch renames and the name collisions they would cause")]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress progress bars and non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Log engine decisions (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Read configuration from this file instead of ./rendiff.toml
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute new names for candidate files and report collisions
    Preview(PreviewArgs),

    /// Validate configured and command-line rules
    Check(CheckArgs),

    /// Initialize a rendiff.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Rules supplied on the command line, applied after configured rules
#[derive(Debug, Clone, Default, Args)]
pub struct RuleArgs {
    /// Add a rule (repeatable): PATTERN REPLACEMENT. `$d` in the replacement
    /// is the containing directory's name, `$$d` a literal `$d`
    #[arg(
        short = 'r',
        long = "rule",
        num_args = 2,
        value_names = ["PATTERN", "REPLACEMENT"],
        action = ArgAction::Append,
        allow_hyphen_values = true
    )]
    pub rules: Vec<String>,

    /// Match command-line rule patterns as literal text
    #[arg(long)]
    pub literal: bool,

    /// Match command-line rule patterns case-insensitively
    #[arg(short = 'i', long)]
    pub ignore_case: bool,

    /// Skip the rules from the configuration file
    #[arg(long)]
    pub no_config_rules: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Table,
    Json,
}

#[derive(Debug, Parser)]
pub struct PreviewArgs {
    /// Files, or directories whose contents are candidates
    #[arg(default_value = ".")]
    pub paths: Vec<PathBuf>,

    #[command(flatten)]
    pub rules: RuleArgs,

    /// Include directories as candidates
    #[arg(long)]
    pub dirs: bool,

    /// Additional glob patterns to ignore
    #[arg(long)]
    pub ignore: Vec<String>,

    /// Maximum depth to traverse (1 = direct children only)
    #[arg(short, long)]
    pub depth: Option<usize>,

    /// Include hidden files
    #[arg(long)]
    pub hidden: bool,

    /// Show only items whose name changes
    #[arg(long)]
    pub changed_only: bool,

    /// Show only items whose new path collides
    #[arg(long)]
    pub conflicted_only: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Compare resulting paths case-insensitively
    #[arg(long)]
    pub case_insensitive: bool,

    /// Also report collisions with existing files outside the batch
    #[arg(long)]
    pub check_existing: bool,

    /// Exit with an error when any collision is found
    #[arg(long)]
    pub strict: bool,
}

#[derive(Debug, Parser)]
pub struct CheckArgs {
    #[command(flatten)]
    pub rules: RuleArgs,
}

#[derive(Parser)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Parser)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output directory; if omitted and --stdout not set, prints error
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}
