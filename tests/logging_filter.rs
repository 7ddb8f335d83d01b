// tests/logging_filter.rs

use mailmerge::cli::LogLevel;
use mailmerge::logging::log_filter;
use tracing::level_filters::LevelFilter;

#[test]
fn cli_level_overrides_environment() {
    let filter = log_filter(Some(LogLevel::Warn), Some("trace"));
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
}

#[test]
fn environment_directives_are_used_without_a_flag() {
    let filter = log_filter(None, Some("debug"));
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
}

#[test]
fn missing_or_bad_environment_falls_back_to_info() {
    assert_eq!(log_filter(None, None).max_level_hint(), Some(LevelFilter::INFO));
    assert_eq!(log_filter(None, Some("  ")).max_level_hint(), Some(LevelFilter::INFO));
    assert_eq!(
        log_filter(None, Some("mailmerge=loud")).max_level_hint(),
        Some(LevelFilter::INFO)
    );
}
