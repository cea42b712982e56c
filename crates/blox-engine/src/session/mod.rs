mod store;
mod title;
mod types;

pub use store::{
    decode_session_json, encode_session_json, load_session_from_path, save_session_to_path, SessionStoreError,
};
pub use title::{derive_title, TitleOptions};
pub use types::{
    ChatSession, Checkpoint, Message, MessagePart, ProgramSnapshot, Role, SessionError, SessionMode, SessionStatus,
    ToolState, SESSION_SCHEMA_0_0_1,
};
