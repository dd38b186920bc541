use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};

#[test]
fn init_logging_only_once_per_process() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_spans(false);

    init_logging(config.clone()).expect("first initialization succeeds");
    tracing::info!(target: "core_runtime", batch_id = "f00d", "logging initialized");

    let err = init_logging(config).unwrap_err();
    assert!(err.to_string().contains("Failed to initialize logging"));
}
