mod interpreter;
mod jsonl;
mod splice;
mod types;

pub use interpreter::Interpreter;
pub use jsonl::{decode_command_jsonl_line, encode_command_jsonl_line};
pub use splice::splice_fragment;
pub use types::{AgentCommand, CommandEffect, CommandResult, ErrorKind, GraphAddress, GraphFragment, InterpreterError};
