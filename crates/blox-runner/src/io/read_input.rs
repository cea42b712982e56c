use blox_engine::{decode_command_jsonl_line, AgentCommand};
use serde_json::Value;
use std::fs;
use std::io::BufRead;
use std::path::Path;

use crate::run::RunnerError;

/// Reads a graph document as raw JSON so schema validation sees exactly what
/// was on disk. `.yaml`/`.yml` files are converted first.
pub fn read_graph_value(path: &Path) -> Result<Value, RunnerError> {
    let text = read_text(path)?;
    decode_by_extension(path, &text)
}

/// A command file holds one command object or an array of them.
pub fn read_command_file(path: &Path) -> Result<Vec<AgentCommand>, RunnerError> {
    let text = read_text(path)?;
    let value = decode_by_extension(path, &text)?;
    let items = match value {
        Value::Array(items) => items,
        single => vec![single],
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<AgentCommand>(item).map_err(|error| RunnerError::CommandDecode {
                line: index + 1,
                reason: error.to_string(),
            })
        })
        .collect()
}

pub fn read_command_jsonl(reader: impl BufRead) -> Result<Vec<AgentCommand>, RunnerError> {
    let mut commands = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|error| RunnerError::CommandIo(error.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let command = decode_command_jsonl_line(&line).map_err(|error| RunnerError::CommandDecode {
            line: index + 1,
            reason: error.to_string(),
        })?;
        commands.push(command);
    }
    Ok(commands)
}

fn read_text(path: &Path) -> Result<String, RunnerError> {
    fs::read_to_string(path).map_err(|source| RunnerError::ReadFile {
        path: path.display().to_string(),
        source,
    })
}

fn decode_by_extension(path: &Path, text: &str) -> Result<Value, RunnerError> {
    let decoded = match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str::<Value>(text).map_err(|error| error.to_string()),
        _ => serde_json::from_str::<Value>(text).map_err(|error| error.to_string()),
    };
    decoded.map_err(|reason| RunnerError::DocumentParse {
        path: path.display().to_string(),
        reason,
    })
}

#[cfg(test)]
#[path = "read_input_test.rs"]
mod tests;
