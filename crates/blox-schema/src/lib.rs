pub mod catalog;
pub mod embedded;
pub mod kind;
pub mod registry;
pub mod template;
pub mod validate;
pub mod versions;

pub use catalog::builtin_kinds;
pub use embedded::{get_json_schema, EmbeddedSchema};
pub use kind::{BlockKind, BlockShape, FieldSpec, FieldType, Literal, SocketDefault, SocketSpec, ValueType};
pub use registry::{KindRegistry, RegistryError};
pub use template::{AssignOperator, BinaryOperator, CodeTemplate, Operand, PrefixOperator};
pub use validate::validate_schema_instance;
pub use versions::{GRAPH_DOCUMENT_SCHEMA_0_0_1, GRAPH_FRAGMENT_SCHEMA_0_0_1};
