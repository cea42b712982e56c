use blox_codegen::Generator;
use blox_core::StructuredIssue;
use blox_engine::clock::now_ts;
use blox_engine::{
    encode_event_jsonl_line, ensure_monotonic_sequence, load_session_from_path, parse_event_jsonl_line,
    save_session_to_path, AgentCommand, ChatSession, CommandResult, EngineEventRecord, MessagePart, Role,
    SessionError, SessionMode, SessionRuntime, SessionStoreError,
};
use blox_graph::{GraphError, ProgramGraph};
use blox_schema::KindRegistry;
use serde_json::json;
use std::fs;
use std::io::{BufReader, Write};
use std::path::Path;
use std::sync::Arc;

use crate::cli::{
    GenerateCommand, KindsCommand, ModeArg, OutputFormat, SessionApplyCommand, SessionCheckpointCommand,
    SessionNewCommand, SessionRollbackCommand, SessionShowCommand,
};
use crate::config::{build_registry, load_runner_config, RunnerConfig, RunnerConfigError};
use crate::io::{read_command_file, read_command_jsonl, read_graph_value};

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("read file failed `{path}`: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("document parse failed `{path}`: {reason}")]
    DocumentParse { path: String, reason: String },
    #[error(transparent)]
    Config(#[from] RunnerConfigError),
    #[error("block kinds invalid: {0:?}")]
    Kinds(Vec<StructuredIssue>),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("session store failed `{path}`: {source}")]
    SessionStore {
        path: String,
        #[source]
        source: SessionStoreError,
    },
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("command decode failed at entry {line}: {reason}")]
    CommandDecode { line: usize, reason: String },
    #[error("read commands failed: {0}")]
    CommandIo(String),
    #[error("no commands to apply")]
    NoCommands,
    #[error("write events JSONL failed: {0}")]
    EventsIo(String),
    #[error("json encode failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Config from `--config`, or defaults when none is given.
pub fn resolve_config(path: Option<&Path>) -> Result<RunnerConfig, RunnerError> {
    match path {
        Some(path) => Ok(load_runner_config(path)?),
        None => Ok(RunnerConfig::default()),
    }
}

fn registry_for(config: &RunnerConfig) -> Result<Arc<KindRegistry>, RunnerError> {
    build_registry(config).map(Arc::new).map_err(RunnerError::Kinds)
}

pub fn execute_generate(command: &GenerateCommand, config: &RunnerConfig) -> Result<String, RunnerError> {
    let registry = registry_for(config)?;
    let value = read_graph_value(&command.graph)?;
    let graph = ProgramGraph::deserialize_value(Arc::clone(&registry), &value)?;
    let generated = Generator::new(&registry, config.generator_options()).generate(&graph);
    tracing::debug!(blocks = graph.len(), diagnostics = generated.diagnostics.len(), "generated");

    Ok(match command.format {
        OutputFormat::Json => serde_json::to_string_pretty(&json!({
            "schema": "blox-runner-generate/0.0.1",
            "code": generated.code,
            "diagnostics": generated.diagnostics,
        }))?,
        OutputFormat::Text => {
            let mut out = generated.code;
            for diagnostic in &generated.diagnostics {
                out.push_str(&format!("// {}: {}\n", diagnostic.block, diagnostic.message));
            }
            out.trim_end().to_string()
        }
    })
}

pub fn execute_kinds(command: &KindsCommand, config: &RunnerConfig) -> Result<String, RunnerError> {
    let registry = registry_for(config)?;
    Ok(match command.format {
        OutputFormat::Json => serde_json::to_string_pretty(&registry.kinds().collect::<Vec<_>>())?,
        OutputFormat::Text => registry
            .categories()
            .into_iter()
            .map(|(category, kinds)| format!("{category}: {}", kinds.join(", ")))
            .collect::<Vec<_>>()
            .join("\n"),
    })
}

pub fn execute_session_new(command: &SessionNewCommand, config: &RunnerConfig) -> Result<String, RunnerError> {
    let mode = match command.mode {
        ModeArg::Graph => SessionMode::Graph,
        ModeArg::Text => SessionMode::Text,
    };
    let id = command
        .id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let session = ChatSession::new(id, mode, &config.title_options(), &now_ts());
    save_session(&command.out, &session)?;
    tracing::info!(session = %session.id, mode = mode.as_str(), "session created");

    Ok(match command.format {
        OutputFormat::Json => serde_json::to_string_pretty(&json!({
            "session_id": session.id,
            "mode": mode,
            "path": command.out.display().to_string(),
        }))?,
        OutputFormat::Text => format!("created {} session {}", mode.as_str(), session.id),
    })
}

pub fn execute_session_apply(command: &SessionApplyCommand, config: &RunnerConfig) -> Result<String, RunnerError> {
    let commands = match &command.command {
        Some(path) => read_command_file(path)?,
        None => read_command_jsonl(BufReader::new(std::io::stdin().lock()))?,
    };
    if commands.is_empty() {
        return Err(RunnerError::NoCommands);
    }

    let runtime = open_runtime(&command.session, config)?;
    let message_id = command
        .user_message
        .as_deref()
        .map(|text| runtime.add_message(Role::User, vec![MessagePart::text(text)]));
    let results = commands
        .iter()
        .map(|agent_command| (agent_command, runtime.submit(agent_command)))
        .collect::<Vec<_>>();
    let events = runtime.drain_events();
    let code = runtime.code();
    let diagnostics = runtime.diagnostics();
    // A refused event log leaves the stored session as it was.
    let events_target = command.events_jsonl.as_deref();
    if let Some(target) = events_target.filter(|target| *target != "-") {
        append_events(Path::new(target), &events)?;
    }
    save_session(&command.session, &runtime.into_session())?;
    if events_target == Some("-") {
        return render_events(&events);
    }

    Ok(match command.format {
        OutputFormat::Json => serde_json::to_string_pretty(&json!({
            "schema": "blox-runner-apply/0.0.1",
            "message_id": message_id,
            "results": results.iter().map(|(_, result)| result).collect::<Vec<_>>(),
            "code": code,
            "diagnostics": diagnostics,
        }))?,
        OutputFormat::Text => {
            let mut lines = message_id
                .iter()
                .map(|id| format!("recorded {id}"))
                .collect::<Vec<_>>();
            lines.extend(
                results
                    .iter()
                    .map(|(agent_command, result)| describe_result(agent_command, result)),
            );
            lines.push(String::new());
            lines.push(code.trim_end().to_string());
            lines.join("\n")
        }
    })
}

pub fn execute_session_checkpoint(
    command: &SessionCheckpointCommand,
    config: &RunnerConfig,
) -> Result<String, RunnerError> {
    let runtime = open_runtime(&command.session, config)?;
    let checkpoint = runtime.create_checkpoint(&command.message, command.summary.clone())?;
    save_session(&command.session, &runtime.into_session())?;

    Ok(match command.format {
        OutputFormat::Json => serde_json::to_string_pretty(&json!({
            "checkpoint_id": checkpoint.id,
            "number": checkpoint.number,
            "message_id": checkpoint.message_id,
            "snapshot_hash": checkpoint.snapshot_hash,
        }))?,
        OutputFormat::Text => format!(
            "checkpoint {} (#{}) after {}",
            checkpoint.id, checkpoint.number, checkpoint.message_id
        ),
    })
}

pub fn execute_session_rollback(
    command: &SessionRollbackCommand,
    config: &RunnerConfig,
) -> Result<String, RunnerError> {
    let runtime = open_runtime(&command.session, config)?;
    runtime.rollback_to(&command.checkpoint)?;
    let code = runtime.code();
    let session = runtime.into_session();
    save_session(&command.session, &session)?;

    Ok(match command.format {
        OutputFormat::Json => serde_json::to_string_pretty(&json!({
            "checkpoint_id": command.checkpoint,
            "message_count": session.message_count,
            "checkpoints": session.checkpoints.len(),
            "code": code,
        }))?,
        OutputFormat::Text => format!(
            "rolled back to {}; {} message(s) remain",
            command.checkpoint, session.message_count
        ),
    })
}

pub fn execute_session_show(command: &SessionShowCommand, config: &RunnerConfig) -> Result<String, RunnerError> {
    let runtime = open_runtime(&command.session, config)?;
    let code = runtime.code();
    let diagnostics = runtime.diagnostics();
    let session = runtime.into_session();

    Ok(match command.format {
        OutputFormat::Json => serde_json::to_string_pretty(&json!({
            "session": session,
            "code": code,
            "diagnostics": diagnostics,
        }))?,
        OutputFormat::Text => {
            let status = match &session.status {
                blox_engine::SessionStatus::Active => "active".to_string(),
                blox_engine::SessionStatus::ArchivedFrom { checkpoint_id } => {
                    format!("archived from {checkpoint_id}")
                }
            };
            let checkpoints = session
                .checkpoints
                .iter()
                .map(|checkpoint| format!("#{} {} after {}", checkpoint.number, checkpoint.id, checkpoint.message_id))
                .collect::<Vec<_>>();
            format!(
                "session {}\ntitle: {}\nmode: {}\nstatus: {}\nmessages: {}\ncheckpoints: {}\n\n{}",
                session.id,
                session.title,
                session.mode.as_str(),
                status,
                session.message_count,
                if checkpoints.is_empty() {
                    "none".to_string()
                } else {
                    checkpoints.join(", ")
                },
                code.trim_end()
            )
        }
    })
}

fn open_runtime(path: &Path, config: &RunnerConfig) -> Result<SessionRuntime, RunnerError> {
    let registry = registry_for(config)?;
    let session = load_session_from_path(path).map_err(|source| RunnerError::SessionStore {
        path: path.display().to_string(),
        source,
    })?;
    Ok(SessionRuntime::new(registry, session, config.runtime_options()))
}

fn save_session(path: &Path, session: &ChatSession) -> Result<(), RunnerError> {
    save_session_to_path(path, session).map_err(|source| RunnerError::SessionStore {
        path: path.display().to_string(),
        source,
    })
}

fn describe_result(command: &AgentCommand, result: &CommandResult) -> String {
    let message = result.message.as_deref().unwrap_or("");
    match result.error {
        None => format!("ok {}: {message}", command.name()),
        Some(kind) => format!("error {} [{}]: {message}", command.name(), kind.as_str()),
    }
}

fn render_events(events: &[EngineEventRecord]) -> Result<String, RunnerError> {
    let mut out = String::new();
    for event in events {
        out.push_str(&encode_event_jsonl_line(event).map_err(|error| RunnerError::EventsIo(error.to_string()))?);
    }
    Ok(out.trim_end().to_string())
}

/// Appends `events` to a JSONL log. The records already in the file for the
/// same session must run straight into the new ones.
fn append_events(path: &Path, events: &[EngineEventRecord]) -> Result<(), RunnerError> {
    let Some(first) = events.first() else {
        return Ok(());
    };
    let mut sequence = match fs::read_to_string(path) {
        Ok(existing) => last_record_for(&existing, &first.session_id)?.into_iter().collect::<Vec<_>>(),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(error) => return Err(RunnerError::EventsIo(error.to_string())),
    };
    sequence.extend_from_slice(events);
    ensure_monotonic_sequence(&sequence)
        .map_err(|error| RunnerError::EventsIo(format!("`{}`: {error}", path.display())))?;

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|error| RunnerError::EventsIo(error.to_string()))?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|error| RunnerError::EventsIo(error.to_string()))?;
    for event in events {
        let line = encode_event_jsonl_line(event).map_err(|error| RunnerError::EventsIo(error.to_string()))?;
        file.write_all(line.as_bytes())
            .map_err(|error| RunnerError::EventsIo(error.to_string()))?;
    }
    Ok(())
}

fn last_record_for(log: &str, session_id: &str) -> Result<Option<EngineEventRecord>, RunnerError> {
    let mut last = None;
    for (index, line) in log.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record = parse_event_jsonl_line(line)
            .map_err(|error| RunnerError::EventsIo(format!("line {}: {error}", index + 1)))?;
        if record.session_id == session_id {
            last = Some(record);
        }
    }
    Ok(last)
}

#[cfg(test)]
#[path = "run_test.rs"]
mod tests;
