// Logging unit tests

use filigrane::config::{LogFormat, LoggingConfig};
use filigrane::logging::build_filter;

#[test]
fn test_filter_from_config() {
    let config = LoggingConfig {
        level: "filigrane=trace,info".to_string(),
        format: LogFormat::Json,
    };
    assert!(build_filter(&config).is_ok());
}

#[test]
fn test_log_format_names() {
    let format: LogFormat = serde_yaml::from_str("json").unwrap();
    assert_eq!(format, LogFormat::Json);
    assert_eq!(LogFormat::default(), LogFormat::Text);
}
