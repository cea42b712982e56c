use blox_core::StructuredIssue;
use blox_schema::RegistryError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("unknown block kind `{0}`")]
    UnknownKind(String),
    #[error("type mismatch at {location}: expected {expected}, found {found}")]
    TypeMismatch {
        location: String,
        expected: String,
        found: String,
    },
    #[error("structure error: {0}")]
    Structure(String),
    #[error("invalid graph document: {}", summarize(.0))]
    Document(Vec<StructuredIssue>),
}

impl GraphError {
    /// Stable taxonomy name surfaced to agents and transcripts.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::UnknownKind(_) => "unknown_kind",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::Structure(_) => "structure_error",
            Self::Document(issues) => {
                if issues.iter().any(|issue| issue.kind == "unknown_kind") {
                    "unknown_kind"
                } else if issues.iter().any(|issue| issue.kind == "type_mismatch") {
                    "type_mismatch"
                } else {
                    "structure_error"
                }
            }
        }
    }

    pub fn issues(&self) -> &[StructuredIssue] {
        match self {
            Self::Document(issues) => issues,
            _ => &[],
        }
    }
}

impl From<RegistryError> for GraphError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownKind(id) => Self::UnknownKind(id),
            other => Self::Structure(other.to_string()),
        }
    }
}

fn summarize(issues: &[StructuredIssue]) -> String {
    match issues.first() {
        Some(first) if issues.len() == 1 => format!("{}: {}", first.field_path, first.message),
        Some(first) => format!("{}: {} (+{} more)", first.field_path, first.message, issues.len() - 1),
        None => "no issues recorded".to_string(),
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
