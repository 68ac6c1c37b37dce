use clap::Parser;
use rendiff::cli::{CheckArgs, Cli, Commands, OutputFormat, PreviewArgs};

#[test]
fn preview_rule_pairs_are_collected_in_order() {
    let argv = vec![
        "rendiff",
        "preview",
        "--rule",
        r"^\d+_",
        "",
        "-r",
        "^",
        "$d_",
        "--format",
        "json",
        "Invoices",
    ];

    let cmd = Cli::parse_from(argv);

    match cmd.command {
        Commands::Preview(PreviewArgs { rules, format, paths, .. }) => {
            assert_eq!(rules.rules, vec![r"^\d+_", "", "^", "$d_"]);
            assert!(!rules.literal);
            assert_eq!(format, OutputFormat::Json);
            assert_eq!(paths.len(), 1);
            assert!(paths[0].ends_with("Invoices"));
        }
        _ => panic!("expected Preview command"),
    }
}

#[test]
fn preview_defaults_to_current_directory_and_text() {
    let cmd = Cli::parse_from(["rendiff", "preview"]);

    match cmd.command {
        Commands::Preview(args) => {
            assert_eq!(args.paths, vec![std::path::PathBuf::from(".")]);
            assert_eq!(args.format, OutputFormat::Text);
            assert!(args.rules.rules.is_empty());
            assert!(!args.strict && !args.check_existing && !args.case_insensitive);
        }
        _ => panic!("expected Preview command"),
    }
}

#[test]
fn rule_values_may_start_with_a_hyphen() {
    let cmd = Cli::parse_from(["rendiff", "check", "--rule", "-+", "-", "--literal", "-i"]);

    match cmd.command {
        Commands::Check(CheckArgs { rules }) => {
            assert_eq!(rules.rules, vec!["-+", "-"]);
            assert!(rules.literal);
            assert!(rules.ignore_case);
        }
        _ => panic!("expected Check command"),
    }
}

#[test]
fn rule_requires_a_replacement() {
    let res = Cli::try_parse_from(["rendiff", "preview", "--rule", "only-pattern"]);
    assert!(res.is_err(), "a rule without a replacement must be rejected");
}

#[test]
fn global_flags_after_subcommand() {
    let cmd = Cli::parse_from([
        "rendiff",
        "preview",
        "--quiet",
        "--no-color",
        "--config",
        "custom.toml",
    ]);

    assert!(cmd.quiet);
    assert!(cmd.no_color);
    assert!(cmd.config.is_some_and(|p| p.ends_with("custom.toml")));
}
