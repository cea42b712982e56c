use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV: &str = "BLOX_LOG";

const DEFAULT_FILTER: &str = "warn";

/// `--verbose` wins, then `BLOX_LOG`, then the config's `log.filter`.
pub fn resolve_log_filter(verbose: bool, env: Option<&str>, config: Option<&str>) -> String {
    if verbose {
        return "debug".to_string();
    }
    env.filter(|value| !value.trim().is_empty())
        .or(config)
        .unwrap_or(DEFAULT_FILTER)
        .to_string()
}

/// Installs the stderr subscriber. A second call is a no-op.
pub fn init_tracing(verbose: bool, config_filter: Option<&str>) {
    let env = std::env::var(LOG_ENV).ok();
    let directive = resolve_log_filter(verbose, env.as_deref(), config_filter);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
#[path = "logging_test.rs"]
mod tests;
