//! CLI tests: argument parsing, plan input, exit codes, in-process routing

use axial::cli::{Cli, Commands, GateCommand, GitCommand, LedgerCommand, PlanCommand};
use axial::commands::{self, exit_code, read_plan};
use axial_core::config::{AxialConfig, ExecutorConfig, ExecutorKind};
use axial_core::{Error, PrivacyLevel};
use clap::{CommandFactory, Parser};
use std::io::Write;

fn echo_config() -> AxialConfig {
    let mut config = AxialConfig::default();
    config.router.executors = vec![ExecutorConfig {
        name: "echo".into(),
        kind: ExecutorKind::Echo,
        program: None,
        args: Vec::new(),
        base_url: None,
        model: None,
        capabilities: Vec::new(),
        privacy: PrivacyLevel::Local,
        max_concurrent: 1,
    }];
    config.daemon_url = "http://127.0.0.1:9".into();
    config
}

// ===========================================================================
// Parsing
// ===========================================================================

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn route_flags() {
    let cli = Cli::try_parse_from([
        "axial", "route", "--task", "refactor auth", "--strategy", "chain", "--explain", "--dry-run",
    ])
    .unwrap();
    match cli.command {
        Commands::Route(args) => {
            assert_eq!(args.task, "refactor auth");
            assert_eq!(args.strategy.as_deref(), Some("chain"));
            assert!(args.explain && args.dry_run && !args.via_daemon);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn git_fork_requires_id() {
    let cli = Cli::try_parse_from(["axial", "git", "fork", "--id", "debug-auth-bug"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Git { command: GitCommand::Fork { id } } if id == "debug-auth-bug"
    ));
    assert!(Cli::try_parse_from(["axial", "git", "fork"]).is_err());
}

#[test]
fn plan_submit_needs_exactly_one_source() {
    assert!(Cli::try_parse_from(["axial", "plan", "submit"]).is_err());
    assert!(Cli::try_parse_from(["axial", "plan", "submit", "--file", "a.json", "--json", "{}"]).is_err());
    let cli = Cli::try_parse_from(["axial", "plan", "submit", "--json", r#"{"goal":"x"}"#]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Plan { command: PlanCommand::Submit { json: Some(_), file: None } }
    ));
}

#[test]
fn ledger_export_and_gate_wait() {
    let cli = Cli::try_parse_from(["axial", "ledger", "export", "--out", "bundle"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Ledger { command: LedgerCommand::Export { out } } if out.to_str() == Some("bundle")
    ));
    assert!(Cli::try_parse_from(["axial", "ledger", "export"]).is_err());

    let cli = Cli::try_parse_from(["axial", "gate", "wait", "--id", "deploy"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Gate { command: GateCommand::Wait { id, timeout_secs: 30 } } if id == "deploy"
    ));
}

#[test]
fn global_config_flag() {
    let cli = Cli::try_parse_from(["axial", "ui", "--config", "/etc/axial.toml"]).unwrap();
    assert_eq!(cli.config.unwrap().to_str(), Some("/etc/axial.toml"));
}

// ===========================================================================
// Plan input
// ===========================================================================

#[test]
fn plan_from_file_and_inline() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"goal": "from file"}}"#).unwrap();
    let payload = read_plan(Some(file.path()), None).unwrap();
    assert_eq!(payload["goal"], "from file");

    let payload = read_plan(None, Some(r#"{"goal": "inline"}"#)).unwrap();
    assert_eq!(payload["goal"], "inline");
}

#[test]
fn unparseable_plan_is_invalid_plan() {
    assert!(matches!(read_plan(None, Some("{nope")), Err(Error::InvalidPlan(_))));
}

// ===========================================================================
// Exit codes and command runs
// ===========================================================================

#[test]
fn exit_codes_follow_error_kind() {
    assert_eq!(exit_code(&Error::DuplicateForkId("a".into()).into()), 2);
    assert_eq!(exit_code(&Error::already_resolved("g", "approved").into()), 3);
    assert_eq!(exit_code(&Error::routing_failed("x").into()), 4);
    assert_eq!(exit_code(&Error::Unavailable("down".into()).into()), 5);
    assert_eq!(exit_code(&anyhow::anyhow!("other")), 1);
}

#[tokio::test]
async fn route_runs_in_process() {
    let cli = Cli::try_parse_from(["axial", "route", "--task", "hello"]).unwrap();
    commands::run(cli.command, echo_config()).await.unwrap();
}

#[tokio::test]
async fn empty_route_exits_with_invalid_request() {
    let cli = Cli::try_parse_from(["axial", "route", "--task", "  "]).unwrap();
    let err = commands::run(cli.command, echo_config()).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::EmptyTask)));
    assert_eq!(exit_code(&err), 2);
}

#[tokio::test]
async fn daemon_commands_without_daemon_are_unavailable() {
    let cli = Cli::try_parse_from(["axial", "git", "fork", "--id", "x"]).unwrap();
    let err = commands::run(cli.command, echo_config()).await.unwrap_err();
    assert_eq!(exit_code(&err), 5);
}
