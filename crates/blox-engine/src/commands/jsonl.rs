use super::types::AgentCommand;

pub fn encode_command_jsonl_line(command: &AgentCommand) -> serde_json::Result<String> {
    let mut line = serde_json::to_string(command)?;
    line.push('\n');
    Ok(line)
}

pub fn decode_command_jsonl_line(line: &str) -> serde_json::Result<AgentCommand> {
    serde_json::from_str::<AgentCommand>(line.trim_end())
}
