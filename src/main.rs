use anyhow::Result;
use clap::Parser;
use rendiff::cli::{AppContext, Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // --verbose wins over RUST_LOG; otherwise default to warnings only
    let filter = if cli.verbose {
        EnvFilter::new("rendiff=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!cli.no_color)
        .init();

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
        verbose: cli.verbose,
        config: cli.config,
    };

    match cli.command {
        Commands::Preview(args) => rendiff::preview_run(args, &ctx),
        Commands::Check(args) => rendiff::check_run(args, &ctx),
        Commands::Init(args) => rendiff::infra::config::init(args, &ctx),
        Commands::Completions(args) => rendiff::completion::run(args, &ctx),
    }
}
