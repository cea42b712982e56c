pub mod field_path;
pub mod issues;
pub mod stable;
pub mod text_patch;

pub use field_path::{FieldPath, FieldPathParseError, FieldPathSegment};
pub use issues::{IssueSeverity, StructuredIssue};
pub use stable::{stable_hash_hex, stable_hash_of, stable_json_bytes, StableJsonOptions};
pub use text_patch::{
    patch_first_match, render_line_view, text_hash_hex, LineRange, TextPatchAudit, TextPatchError,
    TextPatchResult,
};
