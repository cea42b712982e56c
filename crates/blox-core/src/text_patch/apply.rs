use crate::text_patch::{line_of_offset, text_hash_hex, LineRange, TextPatchError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPatchAudit {
    pub start_line: usize,
    pub lines_removed: usize,
    pub lines_added: usize,
    pub occurrences: usize,
    pub before_hash: String,
    pub after_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPatchResult {
    pub text: String,
    pub audit: TextPatchAudit,
}

/// Replaces the first occurrence of `old_text`. The input buffer is never touched;
/// callers swap in `result.text` once they decide to commit.
pub fn patch_first_match(
    text: &str,
    old_text: &str,
    new_text: &str,
) -> Result<TextPatchResult, TextPatchError> {
    if old_text.is_empty() {
        return Err(TextPatchError::EmptyPattern);
    }
    let Some(offset) = text.find(old_text) else {
        return Err(TextPatchError::NotFound {
            snippet: old_text.chars().take(60).collect(),
        });
    };

    let mut patched = String::with_capacity(text.len() + new_text.len());
    patched.push_str(&text[..offset]);
    patched.push_str(new_text);
    patched.push_str(&text[offset + old_text.len()..]);

    let audit = TextPatchAudit {
        start_line: line_of_offset(text, offset),
        lines_removed: old_text.matches('\n').count() + 1,
        lines_added: new_text.matches('\n').count() + 1,
        occurrences: text.matches(old_text).count(),
        before_hash: text_hash_hex(text),
        after_hash: text_hash_hex(&patched),
    };
    Ok(TextPatchResult { text: patched, audit })
}

/// Renders the buffer (or a window of it) with right-aligned line numbers.
pub fn render_line_view(text: &str, range: Option<&LineRange>) -> Result<String, TextPatchError> {
    let lines = text.lines().collect::<Vec<_>>();
    let (from, to) = match range {
        Some(range) => range.resolve(lines.len())?,
        None => (0, lines.len()),
    };
    let width = to.to_string().len().max(3);

    let mut out = String::new();
    for (index, line) in lines[from..to].iter().enumerate() {
        out.push_str(&format!("{:>width$} | {line}\n", from + index + 1));
    }
    Ok(out)
}

#[cfg(test)]
#[path = "apply_test.rs"]
mod tests;
