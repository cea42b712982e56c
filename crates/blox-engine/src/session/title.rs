use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleOptions {
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

fn default_placeholder() -> String {
    "New Chat".to_string()
}

fn default_max_chars() -> usize {
    50
}

impl Default for TitleOptions {
    fn default() -> Self {
        Self {
            placeholder: default_placeholder(),
            max_chars: default_max_chars(),
        }
    }
}

/// Title from the first non-blank line of a user message, or `None` when the
/// message carries no visible text.
pub fn derive_title(text: &str, max_chars: usize) -> Option<String> {
    let line = text.lines().find(|line| !line.trim().is_empty())?;
    let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return Some(collapsed);
    }
    let keep = max_chars.saturating_sub(3);
    let truncated = collapsed.chars().take(keep).collect::<String>();
    Some(format!("{}...", truncated.trim_end()))
}

#[cfg(test)]
#[path = "title_test.rs"]
mod tests;
