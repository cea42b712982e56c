use blox_codegen::GenerationDiagnostic;
use blox_core::{LineRange, StructuredIssue, TextPatchError};
use blox_graph::{BlockEntry, GraphDocument, GraphError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::session::ProgramSnapshot;

/// One tool invocation from the agent, tagged by `command`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum AgentCommand {
    View {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        range: Option<LineRange>,
    },
    /// Raw JSON so the document is schema-checked before it is typed.
    Create {
        graph: Value,
    },
    StrReplace {
        target: GraphAddress,
        fragment: GraphFragment,
    },
    Replace {
        text: String,
    },
    Patch {
        old_text: String,
        new_text: String,
    },
}

impl AgentCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::View { .. } => "view",
            Self::Create { .. } => "create",
            Self::StrReplace { .. } => "str_replace",
            Self::Replace { .. } => "replace",
            Self::Patch { .. } => "patch",
        }
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::View { .. })
    }
}

/// Region of the current graph a fragment replaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphAddress {
    /// Body of the first entry point of this kind.
    EntryPoint { kind: String },
    Slot { block: String, slot: String },
    Block { block: String },
}

impl std::fmt::Display for GraphAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EntryPoint { kind } => write!(f, "entry point `{kind}`"),
            Self::Slot { block, slot } => write!(f, "slot `{slot}` of `{block}`"),
            Self::Block { block } => write!(f, "block `{block}`"),
        }
    }
}

/// Sub-graph with fragment-local ids. A `None` head empties the addressed region.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphFragment {
    #[serde(default)]
    pub head: Option<String>,
    #[serde(default)]
    pub blocks: BTreeMap<String, BlockEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownKind,
    TypeMismatch,
    StructureError,
    AddressNotFound,
    Busy,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnknownKind => "unknown_kind",
            Self::TypeMismatch => "type_mismatch",
            Self::StructureError => "structure_error",
            Self::AddressNotFound => "address_not_found",
            Self::Busy => "busy",
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InterpreterError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("address not found: {0}")]
    AddressNotFound(String),
    #[error("structure error: {0}")]
    Structure(String),
    #[error(transparent)]
    TextPatch(#[from] TextPatchError),
    #[error("session is busy with another turn")]
    Busy,
}

impl InterpreterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Graph(err) => match err.kind_name() {
                "unknown_kind" => ErrorKind::UnknownKind,
                "type_mismatch" => ErrorKind::TypeMismatch,
                _ => ErrorKind::StructureError,
            },
            Self::AddressNotFound(_) => ErrorKind::AddressNotFound,
            Self::Structure(_) => ErrorKind::StructureError,
            Self::TextPatch(TextPatchError::EmptyPattern) => ErrorKind::StructureError,
            Self::TextPatch(_) => ErrorKind::AddressNotFound,
            Self::Busy => ErrorKind::Busy,
        }
    }

    pub fn issues(&self) -> Vec<StructuredIssue> {
        match self {
            Self::Graph(err) => err.issues().to_vec(),
            _ => Vec::new(),
        }
    }
}

/// What the agent sees after each command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_graph: Option<GraphDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default)]
    pub diagnostics: Vec<GenerationDiagnostic>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<StructuredIssue>,
}

impl CommandResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
            new_graph: None,
            new_text: None,
            code: None,
            diagnostics: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn failure(err: &InterpreterError) -> Self {
        Self {
            success: false,
            message: Some(err.to_string()),
            error: Some(err.kind()),
            new_graph: None,
            new_text: None,
            code: None,
            diagnostics: Vec::new(),
            issues: err.issues(),
        }
    }
}

/// Outcome of a command that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandEffect {
    /// Read-only; nothing to commit.
    View(CommandResult),
    Commit {
        snapshot: ProgramSnapshot,
        result: CommandResult,
    },
}

impl CommandEffect {
    pub fn result(&self) -> &CommandResult {
        match self {
            Self::View(result) | Self::Commit { result, .. } => result,
        }
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
