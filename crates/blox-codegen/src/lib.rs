pub mod generator;
pub mod literal;
pub mod precedence;

pub use generator::{CanvasSize, DiagnosticKind, GeneratedProgram, GenerationDiagnostic, Generator, GeneratorOptions};
pub use literal::{format_literal, format_number, sanitize_identifier};
pub use precedence::{Fragment, Precedence};
