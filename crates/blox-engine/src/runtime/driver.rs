use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};

use super::session_runtime::SessionRuntime;
use crate::commands::{AgentCommand, CommandResult};
use crate::session::{Message, MessagePart, Role, SessionError, ToolState};

/// What the agent wants next: run a command, or end the turn with a reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum AgentStep {
    Command {
        tool_call_id: String,
        command: AgentCommand,
    },
    Reply {
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("agent transport failed: {0}")]
pub struct TransportError(pub String);

pub trait AgentTransport {
    fn next_step<'a>(
        &'a mut self,
        transcript: &'a [Message],
        last_result: Option<&'a CommandResult>,
    ) -> LocalBoxFuture<'a, Result<AgentStep, TransportError>>;
}

#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("session is busy with another turn")]
    Busy,
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnReport {
    pub user_message_id: String,
    pub assistant_message_id: String,
    pub commands_applied: usize,
    pub commands_failed: usize,
    pub hit_command_cap: bool,
    pub checkpoint_id: Option<String>,
    pub reply: String,
}

/// Drives one user turn against `transport`. The guard is taken before the
/// user message is recorded, so a busy session is left untouched.
pub async fn run_agent_turn<T>(
    runtime: &SessionRuntime,
    transport: &mut T,
    user_message: &str,
) -> Result<TurnReport, TurnError>
where
    T: AgentTransport + ?Sized,
{
    let mut permit = runtime.begin_turn().map_err(|_| TurnError::Busy)?;
    let user_message_id = runtime.add_message(Role::User, vec![MessagePart::text(user_message)]);
    let before = runtime.snapshot().hash()?;
    let cap = runtime.options().max_commands_per_turn;

    let mut parts = Vec::new();
    let mut last_result: Option<CommandResult> = None;
    let mut applied = 0;
    let mut failed = 0;
    let mut hit_command_cap = false;

    let reply = loop {
        if applied + failed >= cap {
            hit_command_cap = true;
            tracing::warn!(cap, "command cap reached; ending turn");
            break format!("Stopped after {cap} command(s) in one turn.");
        }
        let transcript = runtime.messages();
        let step = match transport.next_step(&transcript, last_result.as_ref()).await {
            Ok(step) => step,
            Err(err) => {
                // Commands already applied stay in the transcript before the turn is abandoned.
                parts.push(MessagePart::text(format!("Turn interrupted: {err}")));
                let assistant_message_id = runtime.add_message(Role::Assistant, parts);
                if runtime.snapshot().hash()? != before && runtime.options().checkpoint_on_change {
                    permit.create_checkpoint(&assistant_message_id, Some("Turn interrupted".to_string()))?;
                }
                tracing::warn!(applied, failed, error = %err, "agent transport failed mid-turn");
                return Err(err.into());
            }
        };
        match step {
            AgentStep::Reply { text } => break text,
            AgentStep::Command { tool_call_id, command } => {
                let result = permit.apply(&command);
                if result.success {
                    applied += 1;
                } else {
                    failed += 1;
                }
                parts.push(MessagePart::ToolInvocation {
                    tool_call_id,
                    input: serde_json::to_value(&command).unwrap_or_default(),
                    output: serde_json::to_value(&result).ok(),
                    state: if result.success {
                        ToolState::OutputAvailable
                    } else {
                        ToolState::OutputError
                    },
                });
                last_result = Some(result);
            }
        }
    };

    if !reply.trim().is_empty() {
        parts.push(MessagePart::text(reply.clone()));
    }
    let assistant_message_id = runtime.add_message(Role::Assistant, parts);

    let changed = runtime.snapshot().hash()? != before;
    let checkpoint_id = if changed && runtime.options().checkpoint_on_change {
        let summary = reply.lines().map(str::trim).find(|line| !line.is_empty()).map(str::to_string);
        Some(permit.create_checkpoint(&assistant_message_id, summary)?.id)
    } else {
        None
    };
    permit.finish();

    tracing::info!(applied, failed, changed, "agent turn finished");
    Ok(TurnReport {
        user_message_id,
        assistant_message_id,
        commands_applied: applied,
        commands_failed: failed,
        hit_command_cap,
        checkpoint_id,
        reply,
    })
}

#[cfg(test)]
#[path = "driver_test.rs"]
mod tests;
