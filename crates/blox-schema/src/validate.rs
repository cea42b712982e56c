use blox_core::{FieldPath, FieldPathSegment, StructuredIssue};
use jsonschema::JSONSchema;
use serde_json::Value;

use crate::embedded::get_json_schema;

/// Structural validation of a serialized document against one of the embedded schemas.
/// Semantic checks (kinds, types, reachability) live with the graph model.
pub fn validate_schema_instance(schema_id: &str, instance: &Value) -> Vec<StructuredIssue> {
    let Some(schema) = get_json_schema(schema_id) else {
        return vec![schema_issue(
            FieldPath::root(),
            format!("unknown schema id: {schema_id}"),
            "schema_registry.unknown_schema",
        )];
    };

    let schema_json: Value = match serde_json::from_str(schema.json) {
        Ok(value) => value,
        Err(err) => {
            return vec![schema_issue(
                FieldPath::root(),
                format!("embedded schema json parse failed: {err}"),
                "schema_registry.invalid_embedded_schema",
            )];
        }
    };

    let compiled = match JSONSchema::options().compile(&schema_json) {
        Ok(compiled) => compiled,
        Err(err) => {
            return vec![schema_issue(
                FieldPath::root(),
                format!("schema compile failed for {schema_id}: {err}"),
                "schema_registry.compile_failed",
            )];
        }
    };

    let mut issues = Vec::new();
    if let Err(errors) = compiled.validate(instance) {
        for error in errors {
            issues.push(schema_issue(
                json_pointer_to_field_path(error.instance_path.to_string().as_str()),
                error.to_string(),
                "json_schema.validation",
            ));
        }
    }
    StructuredIssue::sort_stable(&mut issues);
    issues
}

fn schema_issue(field_path: FieldPath, message: String, reference: &str) -> StructuredIssue {
    StructuredIssue::error("schema_error", field_path, message).with_reference(reference)
}

fn json_pointer_to_field_path(pointer: &str) -> FieldPath {
    if pointer.is_empty() || pointer == "/" {
        return FieldPath::root();
    }

    let mut segments = Vec::new();
    for raw_segment in pointer.trim_start_matches('/').split('/') {
        if raw_segment.is_empty() {
            continue;
        }
        let decoded = raw_segment.replace("~1", "/").replace("~0", "~");
        match decoded.parse::<usize>() {
            Ok(index) => segments.push(FieldPathSegment::Index(index)),
            Err(_) => segments.push(FieldPathSegment::Key(decoded)),
        }
    }
    FieldPath::from_segments(segments)
}

#[cfg(test)]
#[path = "validate_test.rs"]
mod tests;
