use opshub_domain::config::LoggingSettings;
use opshub_logger::{LevelFilter, Logger, LoggerError};
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn settings_install_a_json_file_layer_once() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempdir()?;
    let directory = tmp.path().join("logs");
    let settings = LoggingSettings {
        level: "debug".to_owned(),
        filter: None,
        directory: Some(directory.clone()),
        json: true,
    };

    let logger = Logger::from_settings("opshub-test", &settings)?;
    assert!(logger.writes_file());
    assert_eq!(logger.name(), "opshub-test");

    tracing::info!(module = "inventory", "module activated");

    let second = Logger::builder().name("opshub-again").level(LevelFilter::INFO).init();
    assert!(matches!(second, Err(LoggerError::Subscriber { .. })));

    std::thread::sleep(Duration::from_millis(30));
    drop(logger);

    let file = fs::read_dir(&directory)?
        .flatten()
        .map(|entry| entry.path())
        .find(|path| path.extension().and_then(|ext| ext.to_str()) == Some("log"))
        .expect("a log file is created");
    let contents = fs::read_to_string(file)?;
    let line = contents
        .lines()
        .find(|line| line.contains("module activated"))
        .expect("the event is written");
    let record: serde_json::Value = serde_json::from_str(line)?;
    assert_eq!(record["fields"]["module"], "inventory");

    Ok(())
}

#[test]
fn unknown_level_in_settings_is_rejected() {
    let settings = LoggingSettings { level: "chatty".to_owned(), ..LoggingSettings::default() };

    let err = Logger::from_settings("opshub-test", &settings).unwrap_err();
    assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
}
