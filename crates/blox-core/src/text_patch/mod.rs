mod apply;

pub use apply::{patch_first_match, render_line_view, TextPatchAudit, TextPatchResult};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Inclusive, 1-based line window. A missing `end` runs to the last line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub start: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
}

impl LineRange {
    pub fn new(start: usize, end: Option<usize>) -> Self {
        Self { start, end }
    }

    /// Resolves against a buffer of `line_count` lines into zero-based `[from, to)`.
    pub(crate) fn resolve(&self, line_count: usize) -> Result<(usize, usize), TextPatchError> {
        let end = self.end.unwrap_or(line_count).min(line_count);
        if self.start == 0 || self.start > line_count || self.start > end {
            return Err(TextPatchError::InvalidRange {
                start: self.start,
                end: self.end,
                line_count,
            });
        }
        Ok((self.start - 1, end))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextPatchError {
    #[error("patch old_text must be non-empty")]
    EmptyPattern,
    #[error("old_text not found in buffer: `{snippet}`")]
    NotFound { snippet: String },
    #[error("line range {start}..{end:?} is outside a buffer of {line_count} line(s)")]
    InvalidRange {
        start: usize,
        end: Option<usize>,
        line_count: usize,
    },
}

pub fn text_hash_hex(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

pub(crate) fn line_of_offset(text: &str, offset: usize) -> usize {
    text[..offset].matches('\n').count() + 1
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
