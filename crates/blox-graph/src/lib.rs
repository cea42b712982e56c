pub mod document;
pub mod error;
pub mod model;

pub use document::{validate_document, BlockEntry, GraphDocument, SocketEntry};
pub use error::GraphError;
pub use model::{Attachment, BlockId, BlockInstance, ParentLink, ProgramGraph, SocketBinding};
