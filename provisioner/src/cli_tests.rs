//! Tests for CLI parsing and default behaviours.

use super::*;
use rstest::rstest;

#[test]
fn cli_parses_defaults() {
    let cli = Cli::parse_from(["envforge"]);
    assert!(cli.command.is_none());
    assert!(cli.config.is_none());
    assert_eq!(cli.verbosity, 0);
    assert!(!cli.quiet);
    assert_eq!(cli.effective_command(), Command::Exec(ExecArgs::default()));
}

#[test]
fn cli_parses_global_config_after_subcommand() {
    let cli = Cli::parse_from(["envforge", "provision", "--config", "/etc/envforge.toml"]);
    assert_eq!(cli.config, Some(Utf8PathBuf::from("/etc/envforge.toml")));
}

#[rstest]
#[case::x86("x86_64", Architecture::X86_64)]
#[case::amd64_alias("amd64", Architecture::X86_64)]
#[case::arm("aarch64", Architecture::Aarch64)]
#[case::arm64_alias("arm64", Architecture::Aarch64)]
fn cli_parses_arch_override(#[case] value: &str, #[case] expected: Architecture) {
    let cli = Cli::parse_from(["envforge", "provision", "--dry-run", "--arch", value]);
    assert_eq!(
        cli.command,
        Some(Command::Provision(ProvisionArgs {
            arch: ArchArgs {
                arch: Some(expected)
            },
            dry_run: true,
        }))
    );
}

#[test]
fn cli_rejects_unsupported_arch() {
    let result = Cli::try_parse_from(["envforge", "fetch", "--arch", "ppc64le"]);
    assert!(result.is_err());
}

#[test]
fn cli_parses_stage_subcommands() {
    let cli = Cli::parse_from(["envforge", "rewrite-repos"]);
    assert_eq!(cli.command, Some(Command::RewriteRepos(ArchArgs::default())));

    let cli = Cli::parse_from(["envforge", "fetch", "--arch", "aarch64"]);
    assert!(matches!(
        cli.command,
        Some(Command::Fetch(ArchArgs {
            arch: Some(Architecture::Aarch64)
        }))
    ));
}

#[rstest]
#[case::lines(&["envforge", "env"], false, false)]
#[case::json(&["envforge", "env", "--json"], true, false)]
#[case::profile(&["envforge", "env", "--profile"], false, true)]
fn cli_parses_env_formats(#[case] argv: &[&str], #[case] json: bool, #[case] profile: bool) {
    let cli = Cli::parse_from(argv);
    assert_eq!(cli.command, Some(Command::Env(EnvArgs { json, profile })));
}

#[test]
fn cli_rejects_conflicting_env_formats() {
    let result = Cli::try_parse_from(["envforge", "env", "--json", "--profile"]);
    assert!(result.is_err());
}

#[test]
fn cli_passes_hyphenated_arguments_to_entry_point() {
    let cli = Cli::parse_from(["envforge", "exec", "--foreground", "bucket", "/mnt"]);
    assert_eq!(
        cli.effective_command(),
        Command::Exec(ExecArgs {
            args: vec!["--foreground".to_owned(), "bucket".to_owned(), "/mnt".to_owned()],
        })
    );
}

#[rstest]
#[case::default(&["envforge"], log::LevelFilter::Info)]
#[case::verbose(&["envforge", "-v"], log::LevelFilter::Debug)]
#[case::very_verbose(&["envforge", "-vv"], log::LevelFilter::Trace)]
#[case::saturates(&["envforge", "-vvvv"], log::LevelFilter::Trace)]
#[case::quiet(&["envforge", "-q"], log::LevelFilter::Warn)]
fn cli_maps_verbosity_to_log_level(#[case] argv: &[&str], #[case] expected: log::LevelFilter) {
    assert_eq!(Cli::parse_from(argv).log_level(), expected);
}

#[test]
fn cli_rejects_quiet_with_verbose() {
    let result = Cli::try_parse_from(["envforge", "-q", "-v"]);
    assert!(result.is_err());
}
