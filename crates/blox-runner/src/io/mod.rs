mod read_input;

pub use read_input::{read_command_file, read_command_jsonl, read_graph_value};
