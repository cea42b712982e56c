mod cli;
mod config;
mod io;
mod logging;
mod run;

pub use cli::{
    Cli, Commands, GenerateCommand, KindsCommand, ModeArg, OutputFormat, SessionApplyCommand,
    SessionCheckpointCommand, SessionCommand, SessionNewCommand, SessionRollbackCommand, SessionShowCommand,
};
pub use config::{
    build_registry, load_runner_config, validate_runner_config, CanvasConfig, GeneratorConfig, LogConfig,
    RunnerConfig, RunnerConfigError, SessionConfig,
};
pub use io::{read_command_file, read_command_jsonl, read_graph_value};
pub use logging::{init_tracing, resolve_log_filter, LOG_ENV};
pub use run::{
    execute_generate, execute_kinds, execute_session_apply, execute_session_checkpoint, execute_session_new,
    execute_session_rollback, execute_session_show, resolve_config, RunnerError,
};
