use super::{patch_first_match, render_line_view};
use crate::text_patch::{text_hash_hex, LineRange, TextPatchError};

const SKETCH: &str = "function setup() {\n  createCanvas(400, 400);\n}\n\nfunction draw() {\n  circle(10, 10, 5);\n}\n";

#[test]
fn patch_replaces_only_first_occurrence() {
    let text = "fill(0);\nfill(0);\n";
    let result = patch_first_match(text, "fill(0);", "fill(255);").expect("must patch");
    assert_eq!(result.text, "fill(255);\nfill(0);\n");
    assert_eq!(result.audit.occurrences, 2);
    assert_eq!(result.audit.start_line, 1);
}

#[test]
fn patch_audit_reports_line_deltas_and_hashes() {
    let result = patch_first_match(SKETCH, "  circle(10, 10, 5);\n", "  fill(255);\n  circle(10, 10, 5);\n")
        .expect("must patch");
    assert_eq!(result.audit.start_line, 6);
    assert_eq!(result.audit.lines_removed, 2);
    assert_eq!(result.audit.lines_added, 3);
    assert_eq!(result.audit.before_hash, text_hash_hex(SKETCH));
    assert_eq!(result.audit.after_hash, text_hash_hex(&result.text));
    assert!(result.text.contains("  fill(255);\n  circle(10, 10, 5);"));
}

#[test]
fn missing_pattern_is_reported_with_snippet() {
    let err = patch_first_match(SKETCH, "rect(0, 0, 1, 1);", "").expect_err("must fail");
    assert_eq!(
        err,
        TextPatchError::NotFound {
            snippet: "rect(0, 0, 1, 1);".to_string()
        }
    );
}

#[test]
fn empty_pattern_is_rejected() {
    let err = patch_first_match(SKETCH, "", "x").expect_err("must fail");
    assert_eq!(err, TextPatchError::EmptyPattern);
}

#[test]
fn line_view_numbers_every_line() {
    let view = render_line_view("a\nb\n", None).expect("view");
    assert_eq!(view, "  1 | a\n  2 | b\n");
}

#[test]
fn line_view_honours_window() {
    let view = render_line_view(SKETCH, Some(&LineRange::new(5, Some(6)))).expect("view");
    assert_eq!(view, "  5 | function draw() {\n  6 |   circle(10, 10, 5);\n");
}

#[test]
fn line_view_of_empty_buffer_is_empty() {
    assert_eq!(render_line_view("", None).expect("view"), "");
    assert!(render_line_view("", Some(&LineRange::new(1, None))).is_err());
}
