pub mod clock;
pub mod commands;
pub mod events;
pub mod runtime;
pub mod session;

pub use commands::{
    decode_command_jsonl_line, encode_command_jsonl_line, splice_fragment, AgentCommand, CommandEffect,
    CommandResult, ErrorKind, GraphAddress, GraphFragment, Interpreter, InterpreterError,
};
pub use events::{
    encode_event_jsonl_line, ensure_monotonic_sequence, parse_event_jsonl_line, EngineEvent, EngineEventRecord,
    EngineEventSequenceError, EngineEventStream, EngineEventType, ENGINE_EVENT_SCHEMA_0_0_1,
};
pub use runtime::{
    run_agent_turn, AgentStep, AgentTransport, RuntimeOptions, SessionRuntime, SingleFlight, TransportError,
    TurnError, TurnPermit, TurnPhase, TurnReport,
};
pub use session::{
    decode_session_json, derive_title, encode_session_json, load_session_from_path, save_session_to_path,
    ChatSession, Checkpoint, Message, MessagePart, ProgramSnapshot, Role, SessionError, SessionMode,
    SessionStatus, SessionStoreError, TitleOptions, ToolState, SESSION_SCHEMA_0_0_1,
};
