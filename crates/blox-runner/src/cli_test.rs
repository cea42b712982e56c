use super::{Cli, Commands, ModeArg, OutputFormat, SessionCommand};
use clap::{CommandFactory, Parser};

#[test]
fn help_lists_top_level_commands() {
    let mut command = Cli::command();
    let help = command.render_long_help().to_string();
    assert!(help.contains("generate"));
    assert!(help.contains("kinds"));
    assert!(help.contains("session"));
}

#[test]
fn parses_generate_with_global_config() {
    let cli = Cli::try_parse_from([
        "blox",
        "generate",
        "--graph",
        "sketch.json",
        "--config",
        "blox.yaml",
        "--format",
        "json",
    ])
    .expect("generate must parse");
    assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("blox.yaml")));
    match cli.command {
        Commands::Generate(command) => {
            assert_eq!(command.graph, std::path::PathBuf::from("sketch.json"));
            assert_eq!(command.format, OutputFormat::Json);
        }
        _ => panic!("expected generate"),
    }
}

#[test]
fn parses_session_new_with_defaults() {
    let cli = Cli::try_parse_from(["blox", "session", "new", "--mode", "text", "--out", "s.json"])
        .expect("session new must parse");
    match cli.command {
        Commands::Session(SessionCommand::New(command)) => {
            assert_eq!(command.mode, ModeArg::Text);
            assert_eq!(command.id, None);
            assert_eq!(command.format, OutputFormat::Text);
        }
        _ => panic!("expected session new"),
    }
}

#[test]
fn session_apply_needs_exactly_one_command_source() {
    let cli = Cli::try_parse_from([
        "blox",
        "session",
        "apply",
        "--session",
        "s.json",
        "--commands-stdin-jsonl",
        "--events-jsonl",
        "-",
        "--verbose",
    ])
    .expect("stdin apply must parse");
    assert!(cli.verbose);
    match cli.command {
        Commands::Session(SessionCommand::Apply(command)) => {
            assert!(command.commands_stdin_jsonl);
            assert_eq!(command.events_jsonl.as_deref(), Some("-"));
        }
        _ => panic!("expected session apply"),
    }

    assert!(Cli::try_parse_from(["blox", "session", "apply", "--session", "s.json"]).is_err());
    assert!(Cli::try_parse_from([
        "blox",
        "session",
        "apply",
        "--session",
        "s.json",
        "--command",
        "c.json",
        "--commands-stdin-jsonl",
    ])
    .is_err());
}

#[test]
fn parses_checkpoint_and_rollback() {
    let cli = Cli::try_parse_from([
        "blox",
        "session",
        "checkpoint",
        "--session",
        "s.json",
        "--message",
        "msg-2",
        "--summary",
        "circle added",
    ])
    .expect("checkpoint must parse");
    match cli.command {
        Commands::Session(SessionCommand::Checkpoint(command)) => {
            assert_eq!(command.message, "msg-2");
            assert_eq!(command.summary.as_deref(), Some("circle added"));
        }
        _ => panic!("expected session checkpoint"),
    }

    let cli = Cli::try_parse_from(["blox", "session", "rollback", "--session", "s.json", "--checkpoint", "cp-1"])
        .expect("rollback must parse");
    assert!(matches!(
        cli.command,
        Commands::Session(SessionCommand::Rollback(command)) if command.checkpoint == "cp-1"
    ));
}
