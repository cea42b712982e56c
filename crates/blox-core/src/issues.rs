use crate::field_path::FieldPath;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredIssue {
    pub kind: String,
    pub severity: IssueSeverity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,
    pub field_path: FieldPath,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related: Option<Value>,
}

impl StructuredIssue {
    pub fn error(kind: impl Into<String>, field_path: FieldPath, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            severity: IssueSeverity::Error,
            block_id: None,
            field_path,
            message: message.into(),
            reference: None,
            related: None,
        }
    }

    pub fn with_block(mut self, block_id: impl Into<String>) -> Self {
        self.block_id = Some(block_id.into());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == IssueSeverity::Error
    }

    pub fn sort_stable(issues: &mut [Self]) {
        issues.sort_by(|left, right| {
            (
                left.severity,
                &left.kind,
                &left.field_path,
                &left.message,
                &left.block_id,
            )
                .cmp(&(
                    right.severity,
                    &right.kind,
                    &right.field_path,
                    &right.message,
                    &right.block_id,
                ))
        });
    }
}

#[cfg(test)]
#[path = "issues_test.rs"]
mod tests;
