use blox_codegen::{GenerationDiagnostic, GeneratorOptions};
use blox_graph::{GraphError, ProgramGraph};
use blox_schema::KindRegistry;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::guard::{FlightToken, SingleFlight, TurnPhase};
use crate::clock::now_ts;
use crate::commands::{AgentCommand, CommandEffect, CommandResult, Interpreter, InterpreterError};
use crate::events::{EngineEvent, EngineEventRecord, EngineEventStream, EngineEventType};
use crate::session::{ChatSession, Checkpoint, Message, MessagePart, ProgramSnapshot, Role, SessionError, TitleOptions};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeOptions {
    #[serde(default)]
    pub generator: GeneratorOptions,
    #[serde(default)]
    pub titles: TitleOptions,
    #[serde(default = "default_max_commands_per_turn")]
    pub max_commands_per_turn: usize,
    #[serde(default = "default_checkpoint_on_change")]
    pub checkpoint_on_change: bool,
}

fn default_max_commands_per_turn() -> usize {
    16
}

fn default_checkpoint_on_change() -> bool {
    true
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            generator: GeneratorOptions::default(),
            titles: TitleOptions::default(),
            max_commands_per_turn: default_max_commands_per_turn(),
            checkpoint_on_change: default_checkpoint_on_change(),
        }
    }
}

struct RuntimeState {
    session: ChatSession,
    code: String,
    diagnostics: Vec<GenerationDiagnostic>,
    phase: TurnPhase,
    stream: EngineEventStream,
    events: Vec<EngineEventRecord>,
}

impl RuntimeState {
    fn emit(&mut self, event: EngineEvent) {
        let record = self.stream.next_record(now_ts(), event);
        self.session.next_event_seq = self.stream.next_seq();
        self.events.push(record);
    }
}

/// Owns one session and its program. The lock is only ever held for
/// synchronous sections; turns are serialized by the single-flight guard.
pub struct SessionRuntime {
    interpreter: Interpreter,
    options: RuntimeOptions,
    flight: SingleFlight,
    state: Mutex<RuntimeState>,
}

impl SessionRuntime {
    pub fn new(registry: Arc<KindRegistry>, session: ChatSession, options: RuntimeOptions) -> Self {
        let interpreter = Interpreter::new(registry, options.generator.clone());
        let (code, diagnostics) = match interpreter.render(&session.last_snapshot) {
            Ok(rendered) => rendered,
            Err(err) => {
                tracing::warn!(session = %session.id, error = %err, "stored snapshot does not load");
                (String::new(), Vec::new())
            }
        };
        let stream = EngineEventStream::with_start_seq(session.id.clone(), session.next_event_seq);
        Self {
            interpreter,
            options,
            flight: SingleFlight::new(),
            state: Mutex::new(RuntimeState {
                session,
                code,
                diagnostics,
                phase: TurnPhase::Idle,
                stream,
                events: Vec::new(),
            }),
        }
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    pub fn session(&self) -> ChatSession {
        self.state.lock().session.clone()
    }

    pub fn into_session(self) -> ChatSession {
        self.state.into_inner().session
    }

    pub fn snapshot(&self) -> ProgramSnapshot {
        self.state.lock().session.last_snapshot.clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state.lock().session.messages.clone()
    }

    pub fn code(&self) -> String {
        self.state.lock().code.clone()
    }

    pub fn diagnostics(&self) -> Vec<GenerationDiagnostic> {
        self.state.lock().diagnostics.clone()
    }

    pub fn phase(&self) -> TurnPhase {
        self.state.lock().phase
    }

    pub fn is_busy(&self) -> bool {
        self.flight.is_busy()
    }

    pub fn events(&self) -> Vec<EngineEventRecord> {
        self.state.lock().events.clone()
    }

    pub fn drain_events(&self) -> Vec<EngineEventRecord> {
        std::mem::take(&mut self.state.lock().events)
    }

    /// Claims the session for one turn, or fails with `Busy` without touching state.
    pub fn begin_turn(&self) -> Result<TurnPermit<'_>, InterpreterError> {
        let Some(token) = self.flight.try_acquire() else {
            tracing::debug!("turn rejected: another turn is in flight");
            return Err(InterpreterError::Busy);
        };
        let mut state = self.state.lock();
        state.phase = TurnPhase::Submitted;
        state.emit(EngineEvent::new(EngineEventType::TurnStarted));
        tracing::info!(session = %state.session.id, "turn started");
        drop(state);
        Ok(TurnPermit {
            runtime: self,
            _token: token,
            finished: false,
        })
    }

    /// One-command turn.
    pub fn submit(&self, command: &AgentCommand) -> CommandResult {
        match self.begin_turn() {
            Ok(mut permit) => {
                let result = permit.apply(command);
                permit.finish();
                result
            }
            Err(err) => CommandResult::failure(&err),
        }
    }

    /// Runs a graph operation from the rendering surface on a working copy and
    /// commits it with regenerated code, or leaves everything as it was.
    pub fn apply_direct_edit(&self, edit: impl FnOnce(&mut ProgramGraph) -> Result<(), GraphError>) -> CommandResult {
        let permit = match self.begin_turn() {
            Ok(permit) => permit,
            Err(err) => return CommandResult::failure(&err),
        };
        self.set_phase(TurnPhase::Validating);
        let outcome = match self.snapshot() {
            ProgramSnapshot::Graph { graph } => self.interpreter.edit_graph(&graph, edit),
            ProgramSnapshot::Text { .. } => Err(InterpreterError::Structure(
                "direct edits need a graph session".to_string(),
            )),
        };
        let result = permit.settle(
            "direct_edit",
            outcome,
            EngineEventType::DirectEditCommitted,
            EngineEventType::DirectEditRejected,
        );
        permit.finish();
        result
    }

    pub fn add_message(&self, role: Role, parts: Vec<MessagePart>) -> String {
        let mut state = self.state.lock();
        let id = state.session.add_message(role, parts, &now_ts(), &self.options.titles);
        let role_name = match role {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        };
        state.emit(
            EngineEvent::new(EngineEventType::MessageAdded)
                .with("message_id", id.as_str())
                .with("role", role_name),
        );
        id
    }

    /// Checkpoints the current program after `message_id`. Fails with `Busy`
    /// while a turn is in flight; the turn itself checkpoints through its permit.
    pub fn create_checkpoint(&self, message_id: &str, summary: Option<String>) -> Result<Checkpoint, SessionError> {
        let Some(_token) = self.flight.try_acquire() else {
            return Err(SessionError::Busy);
        };
        self.checkpoint_now(message_id, summary)
    }

    pub fn rollback_to(&self, checkpoint_id: &str) -> Result<ProgramSnapshot, SessionError> {
        let Some(_token) = self.flight.try_acquire() else {
            return Err(SessionError::Busy);
        };
        let mut state = self.state.lock();
        let snapshot = state.session.rollback_to(checkpoint_id, &now_ts())?.clone();
        let (code, diagnostics) = match self.interpreter.render(&snapshot) {
            Ok(rendered) => rendered,
            Err(err) => {
                tracing::warn!(checkpoint = checkpoint_id, error = %err, "restored snapshot does not load");
                (String::new(), Vec::new())
            }
        };
        state.code = code;
        state.diagnostics = diagnostics;
        let remaining = state.session.message_count;
        state.emit(
            EngineEvent::new(EngineEventType::RolledBack)
                .with("checkpoint_id", checkpoint_id)
                .with("message_count", remaining),
        );
        tracing::info!(session = %state.session.id, checkpoint = checkpoint_id, remaining, "rolled back");
        Ok(snapshot)
    }

    fn checkpoint_now(&self, message_id: &str, summary: Option<String>) -> Result<Checkpoint, SessionError> {
        let mut state = self.state.lock();
        let snapshot = state.session.last_snapshot.clone();
        let checkpoint = state.session.create_checkpoint(message_id, snapshot, summary, &now_ts())?;
        state.emit(
            EngineEvent::new(EngineEventType::CheckpointCreated)
                .with("checkpoint_id", checkpoint.id.as_str())
                .with("message_id", message_id)
                .with("number", checkpoint.number),
        );
        tracing::info!(checkpoint = %checkpoint.id, number = checkpoint.number, "checkpoint created");
        Ok(checkpoint)
    }

    fn set_phase(&self, phase: TurnPhase) {
        self.state.lock().phase = phase;
    }
}

/// Proof that the caller holds the session's single-flight guard. Dropping it
/// without `finish` abandons the turn and releases the guard.
pub struct TurnPermit<'a> {
    runtime: &'a SessionRuntime,
    _token: FlightToken<'a>,
    finished: bool,
}

impl<'a> TurnPermit<'a> {
    pub fn runtime(&self) -> &'a SessionRuntime {
        self.runtime
    }

    /// Validates `command` against the current program and commits it on success.
    pub fn apply(&mut self, command: &AgentCommand) -> CommandResult {
        let current = {
            let mut state = self.runtime.state.lock();
            state.phase = TurnPhase::Validating;
            state.emit(
                EngineEvent::new(EngineEventType::CommandAccepted)
                    .with("command", command.name())
                    .with("read_only", command.is_read_only()),
            );
            state.session.last_snapshot.clone()
        };
        tracing::debug!(command = command.name(), read_only = command.is_read_only(), "command accepted");
        let outcome = self.runtime.interpreter.apply(&current, command);
        self.settle(
            command.name(),
            outcome,
            EngineEventType::CommandCommitted,
            EngineEventType::CommandRejected,
        )
    }

    pub fn create_checkpoint(&self, message_id: &str, summary: Option<String>) -> Result<Checkpoint, SessionError> {
        self.runtime.checkpoint_now(message_id, summary)
    }

    pub fn finish(mut self) {
        self.finished = true;
        let mut state = self.runtime.state.lock();
        state.phase = TurnPhase::Idle;
        state.emit(EngineEvent::new(EngineEventType::TurnFinished));
    }

    fn settle(
        &self,
        name: &str,
        outcome: Result<CommandEffect, InterpreterError>,
        committed: EngineEventType,
        rejected: EngineEventType,
    ) -> CommandResult {
        let mut state = self.runtime.state.lock();
        let err = match outcome {
            Ok(CommandEffect::View(result)) => {
                state.phase = TurnPhase::Committed;
                state.emit(EngineEvent::new(committed).with("command", name).with("read_only", true));
                return result;
            }
            Ok(CommandEffect::Commit { snapshot, result }) => {
                state.phase = TurnPhase::Applying;
                match state.session.record_snapshot(snapshot, &now_ts()) {
                    Ok(()) => {
                        state.code = result.code.clone().unwrap_or_default();
                        state.diagnostics = result.diagnostics.clone();
                        state.phase = TurnPhase::Committed;
                        state.emit(
                            EngineEvent::new(committed)
                                .with("command", name)
                                .with("diagnostics", result.diagnostics.len()),
                        );
                        tracing::info!(command = name, diagnostics = result.diagnostics.len(), "command committed");
                        return result;
                    }
                    Err(err) => InterpreterError::Structure(err.to_string()),
                }
            }
            Err(err) => err,
        };

        state.phase = TurnPhase::Failed;
        state.emit(
            EngineEvent::new(rejected)
                .with("command", name)
                .with("error", err.kind().as_str())
                .with("message", err.to_string()),
        );
        tracing::warn!(command = name, error = %err, "command rejected");
        CommandResult::failure(&err)
    }
}

impl Drop for TurnPermit<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut state = self.runtime.state.lock();
        state.phase = TurnPhase::Idle;
        state.emit(EngineEvent::new(EngineEventType::TurnAbandoned));
        tracing::warn!(session = %state.session.id, "turn abandoned");
    }
}

#[cfg(test)]
#[path = "session_runtime_test.rs"]
mod tests;
