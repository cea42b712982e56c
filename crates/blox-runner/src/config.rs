use blox_codegen::{CanvasSize, GeneratorOptions};
use blox_core::{FieldPath, StructuredIssue};
use blox_engine::{RuntimeOptions, TitleOptions};
use blox_schema::{BlockKind, KindRegistry};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const RUNNER_SCHEMA: &str = "blox-runner/0.0.1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    #[serde(default = "default_runner_schema")]
    pub schema: String,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub log: LogConfig,
    /// Extra block kinds registered on top of the built-in catalog.
    #[serde(default)]
    pub kinds: Vec<BlockKind>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            schema: default_runner_schema(),
            generator: GeneratorConfig::default(),
            session: SessionConfig::default(),
            log: LogConfig::default(),
            kinds: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub canvas: Option<CanvasConfig>,
    #[serde(default = "default_indent")]
    pub indent: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            canvas: None,
            indent: default_indent(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CanvasConfig {
    #[serde(default = "default_canvas_side")]
    pub width: u32,
    #[serde(default = "default_canvas_side")]
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    #[serde(default = "default_title_placeholder")]
    pub title_placeholder: String,
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,
    #[serde(default = "default_max_commands_per_turn")]
    pub max_commands_per_turn: usize,
    #[serde(default = "default_checkpoint_on_change")]
    pub checkpoint_on_change: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let runtime = RuntimeOptions::default();
        Self {
            title_placeholder: runtime.titles.placeholder,
            title_max_chars: runtime.titles.max_chars,
            max_commands_per_turn: runtime.max_commands_per_turn,
            checkpoint_on_change: runtime.checkpoint_on_change,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    #[serde(default)]
    pub filter: Option<String>,
}

impl RunnerConfig {
    pub fn generator_options(&self) -> GeneratorOptions {
        GeneratorOptions {
            canvas: self.generator.canvas.map(|canvas| CanvasSize {
                width: canvas.width,
                height: canvas.height,
            }),
            indent: self.generator.indent,
        }
    }

    pub fn runtime_options(&self) -> RuntimeOptions {
        RuntimeOptions {
            generator: self.generator_options(),
            titles: self.title_options(),
            max_commands_per_turn: self.session.max_commands_per_turn,
            checkpoint_on_change: self.session.checkpoint_on_change,
        }
    }

    pub fn title_options(&self) -> TitleOptions {
        TitleOptions {
            placeholder: self.session.title_placeholder.clone(),
            max_chars: self.session.title_max_chars,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunnerConfigError {
    #[error("read runner config failed `{path}`: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("runner config parse failed: {0}")]
    Parse(String),
    #[error("runner config validation failed: {0:?}")]
    Validation(Vec<StructuredIssue>),
}

pub fn load_runner_config(path: &Path) -> Result<RunnerConfig, RunnerConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| RunnerConfigError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    let expanded = expand_env_placeholders(&raw).map_err(RunnerConfigError::Parse)?;
    let config: RunnerConfig = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&expanded)
            .map_err(|error| RunnerConfigError::Parse(format!("json decode error: {error}")))?,
        _ => serde_yaml::from_str(&expanded)
            .map_err(|error| RunnerConfigError::Parse(format!("yaml decode error: {error}")))?,
    };

    let mut issues = validate_runner_config(&config);
    StructuredIssue::sort_stable(&mut issues);
    if !issues.is_empty() {
        return Err(RunnerConfigError::Validation(issues));
    }
    Ok(config)
}

pub fn validate_runner_config(config: &RunnerConfig) -> Vec<StructuredIssue> {
    let mut issues = Vec::new();
    let root = FieldPath::root();

    if config.schema != RUNNER_SCHEMA {
        issues.push(config_issue(
            "runner.config.schema",
            root.key("schema"),
            format!("unsupported runner config schema `{}` (expected `{RUNNER_SCHEMA}`)", config.schema),
        ));
    }
    if let Some(canvas) = config.generator.canvas {
        for (name, side) in [("width", canvas.width), ("height", canvas.height)] {
            if side == 0 {
                issues.push(config_issue(
                    "runner.config.canvas",
                    root.key("generator").key("canvas").key(name),
                    format!("canvas {name} must be > 0"),
                ));
            }
        }
    }
    if config.generator.indent > 8 {
        issues.push(config_issue(
            "runner.config.indent",
            root.key("generator").key("indent"),
            "indent must be at most 8 spaces",
        ));
    }
    if config.session.title_placeholder.trim().is_empty() {
        issues.push(config_issue(
            "runner.config.session.title_placeholder",
            root.key("session").key("title_placeholder"),
            "title placeholder must be non-empty",
        ));
    }
    if config.session.title_max_chars < 4 {
        issues.push(config_issue(
            "runner.config.session.title_max_chars",
            root.key("session").key("title_max_chars"),
            "title_max_chars must leave room for an ellipsis (>= 4)",
        ));
    }
    if config.session.max_commands_per_turn == 0 {
        issues.push(config_issue(
            "runner.config.session.max_commands_per_turn",
            root.key("session").key("max_commands_per_turn"),
            "max_commands_per_turn must be > 0",
        ));
    }
    if let Some(filter) = &config.log.filter {
        if let Err(error) = tracing_subscriber::EnvFilter::try_new(filter) {
            issues.push(config_issue(
                "runner.config.log.filter",
                root.key("log").key("filter"),
                format!("invalid log filter `{filter}`: {error}"),
            ));
        }
    }
    if let Err(kind_issues) = build_registry(config) {
        issues.extend(kind_issues);
    }

    issues
}

/// Built-in catalog plus the config's extra kinds. Extra kinds may not shadow
/// a built-in one.
pub fn build_registry(config: &RunnerConfig) -> Result<KindRegistry, Vec<StructuredIssue>> {
    let mut registry = KindRegistry::with_builtin_kinds();
    let mut issues = Vec::new();
    for (index, kind) in config.kinds.iter().enumerate() {
        let path = FieldPath::root().key("kinds").index(index);
        if registry.contains(&kind.id) {
            issues.push(config_issue(
                "runner.config.kinds.duplicate",
                path.key("id"),
                format!("kind `{}` is already registered", kind.id),
            ));
            continue;
        }
        if let Err(error) = registry.register_kind(kind.clone()) {
            issues.push(config_issue("runner.config.kinds.invalid", path, error.to_string()));
        }
    }
    if issues.is_empty() {
        Ok(registry)
    } else {
        StructuredIssue::sort_stable(&mut issues);
        Err(issues)
    }
}

fn config_issue(reference: &str, path: FieldPath, message: impl Into<String>) -> StructuredIssue {
    StructuredIssue::error("runner_config_error", path, message).with_reference(reference)
}

fn default_runner_schema() -> String {
    RUNNER_SCHEMA.to_string()
}

fn default_indent() -> usize {
    2
}

fn default_canvas_side() -> u32 {
    400
}

fn default_title_placeholder() -> String {
    TitleOptions::default().placeholder
}

fn default_title_max_chars() -> usize {
    TitleOptions::default().max_chars
}

fn default_max_commands_per_turn() -> usize {
    RuntimeOptions::default().max_commands_per_turn
}

fn default_checkpoint_on_change() -> bool {
    RuntimeOptions::default().checkpoint_on_change
}

/// Replaces `${NAME}` with the variable's value and `${NAME:-fallback}` with
/// the fallback when the variable is unset.
fn expand_env_placeholders(input: &str) -> Result<String, String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(open) = rest.find("${") {
        out.push_str(&rest[..open]);
        let body_start = open + 2;
        let Some(close) = rest[body_start..].find('}') else {
            return Err("unterminated env placeholder `${...`".to_string());
        };
        let body = &rest[body_start..body_start + close];
        let (name, fallback) = match body.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (body, None),
        };
        if name.is_empty() {
            return Err("empty env placeholder `${}`".to_string());
        }
        match (std::env::var(name), fallback) {
            (Ok(value), _) => out.push_str(&value),
            (Err(_), Some(fallback)) => out.push_str(fallback),
            (Err(_), None) => return Err(format!("missing env var for placeholder `${{{name}}}`")),
        }
        rest = &rest[body_start + close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
