use super::resolve_log_filter;

#[test]
fn verbose_overrides_everything() {
    assert_eq!(resolve_log_filter(true, Some("error"), Some("info")), "debug");
}

#[test]
fn env_beats_config_and_blank_env_is_ignored() {
    assert_eq!(resolve_log_filter(false, Some("blox_engine=trace"), Some("info")), "blox_engine=trace");
    assert_eq!(resolve_log_filter(false, Some("  "), Some("info")), "info");
    assert_eq!(resolve_log_filter(false, None, None), "warn");
}
