//! **rendiff** - Rule-based batch rename previews
//!
//! Ordered regex rewrite rules (with a `$d` containing-directory token) are
//! applied to candidate file names; the resulting paths are checked for
//! collisions before anything is renamed. No file is ever modified.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Rename engine - patterns, matchers, chains and conflict analysis
pub mod core {
    /// Rule definitions, compiled patterns and the compile cache
    pub mod pattern;
    pub use pattern::{Pattern, PatternCompileError, RuleDefinition};

    /// Plain and directory-aware rule matchers
    pub mod matcher;
    pub use matcher::{DIRECTORY_TOKEN, ItemContext, RuleMatcher, contains_token, expand_token};

    /// Ordered rule chains with per-item fallback reporting
    pub mod chain;
    pub use chain::{ComputedName, RuleChain, RuleFallback, compute_name};

    /// Post-rename path collision analysis
    pub mod conflict;
    pub use conflict::{
        ConflictAnalyzer, ConflictReport, PathComparison, WorkingItem, analyze_conflicts,
    };

    /// Parallel batch pass and the `preview` command
    pub mod preview;
    pub use preview::{
        PreviewError, PreviewItem, PreviewPass, PreviewReport, RowFilter, run as preview_run,
    };

    /// Chain assembly from config + CLI and the `check` command
    pub mod rules;
    pub use rules::run as check_run;

    /// Text, table and JSON rendering
    pub mod render;
}

/// Infrastructure - Configuration and candidate enumeration
pub mod infra {
    /// Layered configuration (rendiff.toml + RENDIFF_* env)
    pub mod config;
    pub use config::{Config, init as config_init, load_config};

    /// Gitignore-aware candidate walking
    pub mod walk;
    pub use walk::FileWalker;
}

// Strategic re-exports for library consumers
pub use cli::{AppContext, Cli, Commands};
pub use core::{
    ConflictAnalyzer, ConflictReport, ItemContext, Pattern, PatternCompileError, RuleChain,
    RuleDefinition, RuleMatcher, WorkingItem, analyze_conflicts, check_run, compute_name,
    preview_run,
};
pub use infra::{Config, FileWalker, load_config};
