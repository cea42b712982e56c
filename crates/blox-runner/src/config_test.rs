use super::{build_registry, expand_env_placeholders, load_runner_config, RunnerConfig, RunnerConfigError};
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

#[test]
fn loads_yaml_with_env_placeholders_and_extra_kinds() {
    std::env::set_var("BLOX_TEST_CANVAS_WIDTH", "640");
    let path = write_temp_file(
        "config-ok.yaml",
        r#"
schema: blox-runner/0.0.1
generator:
  canvas:
    width: ${BLOX_TEST_CANVAS_WIDTH}
    height: ${BLOX_TEST_CANVAS_HEIGHT_UNSET:-480}
  indent: 4
session:
  title_max_chars: 40
  max_commands_per_turn: 8
log:
  filter: blox_engine=debug
kinds:
  - id: draw_square
    category: drawing
    shape: statement
    sockets:
      - name: SIZE
        type: number
        default:
          literal: 20
    template:
      op: call
      function: square
      args:
        - socket: SIZE
"#,
    );

    let config = load_runner_config(&path).expect("config must load");
    let options = config.runtime_options();
    let canvas = options.generator.canvas.expect("canvas");
    assert_eq!((canvas.width, canvas.height), (640, 480));
    assert_eq!(options.generator.indent, 4);
    assert_eq!(options.titles.max_chars, 40);
    assert_eq!(options.titles.placeholder, "New Chat");
    assert_eq!(options.max_commands_per_turn, 8);
    assert!(options.checkpoint_on_change);

    let registry = build_registry(&config).expect("registry");
    assert!(registry.contains("draw_square"));
    assert!(registry.contains("draw_circle"));
}

#[test]
fn json_config_defaults_everything_but_schema() {
    let path = write_temp_file("config-min.json", r#"{"schema": "blox-runner/0.0.1"}"#);
    let config = load_runner_config(&path).expect("config must load");
    assert_eq!(config, RunnerConfig::default());
    assert_eq!(config.generator_options().canvas, None);
}

#[test]
fn invalid_values_are_reported_as_sorted_issues() {
    let path = write_temp_file(
        "config-bad.yaml",
        r#"
schema: blox-runner/9.9.9
generator:
  canvas:
    width: 0
session:
  title_max_chars: 2
  max_commands_per_turn: 0
kinds:
  - id: draw_circle
    category: drawing
    shape: statement
    template:
      op: atom
      code: noop()
"#,
    );
    let Err(RunnerConfigError::Validation(issues)) = load_runner_config(&path) else {
        panic!("expected validation failure");
    };
    let references = issues
        .iter()
        .filter_map(|issue| issue.reference.as_deref())
        .collect::<Vec<_>>();
    for expected in [
        "runner.config.schema",
        "runner.config.canvas",
        "runner.config.session.title_max_chars",
        "runner.config.session.max_commands_per_turn",
        "runner.config.kinds.duplicate",
    ] {
        assert!(references.contains(&expected), "missing {expected} in {references:?}");
    }
}

#[test]
fn unknown_keys_fail_to_parse() {
    let path = write_temp_file("config-typo.yaml", "schema: blox-runner/0.0.1\ngenerater: {}\n");
    assert!(matches!(load_runner_config(&path), Err(RunnerConfigError::Parse(_))));
}

#[test]
fn placeholders_need_a_value_or_fallback() {
    assert_eq!(
        expand_env_placeholders("a ${BLOX_TEST_NEVER_SET:-b} c").expect("fallback"),
        "a b c"
    );
    assert!(expand_env_placeholders("${BLOX_TEST_NEVER_SET}").is_err());
    assert!(expand_env_placeholders("${}").is_err());
    assert!(expand_env_placeholders("${OPEN").is_err());
}

#[test]
fn missing_file_is_read_error() {
    let path = std::env::temp_dir().join("blox-runner-config-missing.yaml");
    assert!(matches!(load_runner_config(&path), Err(RunnerConfigError::ReadFile { .. })));
}

fn write_temp_file(name: &str, content: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time must be monotonic")
        .as_nanos();
    let path = std::env::temp_dir().join(format!("blox-runner-{}-{nanos}-{name}", std::process::id()));
    fs::write(&path, content).expect("must write temp file");
    path
}
