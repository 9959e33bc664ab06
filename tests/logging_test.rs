//! Logger installation. Lives in its own test binary because the global
//! subscriber can only be set once per process.

mod common;

use traffic_sync::domain::models::LoggingConfig;
use traffic_sync::infrastructure::logging::{LogConfig, LoggerImpl, LOG_FILE_NAME};

#[test]
fn test_logger_writes_json_file() {
    let dir = common::temp_dir();
    let settings = LoggingConfig {
        level: "debug".to_string(),
        format: "json".to_string(),
        log_dir: Some(dir.path().display().to_string()),
        rotation: "never".to_string(),
    };
    let config = LogConfig::try_from(&settings).unwrap();

    let logger = LoggerImpl::init(&config).unwrap();
    assert!(logger.has_file_output());
    tracing::info!(junction_id = 3u32, "file logging check");

    // A second install in the same process is refused, not a panic.
    assert!(LoggerImpl::init(&LogConfig::default()).is_err());

    drop(logger);
    let contents = std::fs::read_to_string(dir.path().join(LOG_FILE_NAME)).unwrap();
    let line = contents
        .lines()
        .find(|l| l.contains("file logging check"))
        .expect("log line written");
    let value: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(value["fields"]["junction_id"], 3);
}
