/*!
 * Tests for application configuration functionality
 */

use anyhow::Result;
use std::time::Duration;
use subwatch::app_config::{Config, LogLevel, TranslationProvider, WriteMode, MAX_BATCH_SIZE, MIN_BATCH_SIZE};
use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.source_language, "en");
    assert_eq!(config.target_language, "ro");
    assert_eq!(config.translation.provider, TranslationProvider::Gemini);
    assert_eq!(config.translation.common.batch_size, 50);
    assert_eq!(config.translation.common.max_attempts, 3);
    assert_eq!(
        config.translation.retry_backoff(),
        vec![Duration::from_secs(2), Duration::from_secs(5), Duration::from_secs(5)]
    );
    assert_eq!(config.watcher.poll_interval(), Duration::from_secs(10));
    assert_eq!(config.watcher.min_file_bytes, 100);
    assert_eq!(config.watcher.max_file_age(), Duration::from_secs(600));
    assert_eq!(config.watcher.write_mode, WriteMode::Atomic);
    assert!(!config.subtitle.strip_sdh);
    assert_eq!(config.log_level, LogLevel::Info);
    assert_eq!(config.translation.get_timeout_secs(), 30);
}

#[test]
fn test_effective_batch_size_withOutOfRangeValues_shouldClamp() {
    let mut config = Config::default();

    config.translation.common.batch_size = 3;
    assert_eq!(config.translation.effective_batch_size(), MIN_BATCH_SIZE);

    config.translation.common.batch_size = 1000;
    assert_eq!(config.translation.effective_batch_size(), MAX_BATCH_SIZE);

    config.translation.common.batch_size = 75;
    assert_eq!(config.translation.effective_batch_size(), 75);
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::Ollama;
    assert!(config.validate().is_ok());

    config.source_language = "auto".to_string();
    assert!(config.validate().is_ok());

    config.source_language = "notalanguage".to_string();
    assert!(config.validate().is_err());
    config.source_language = "en".to_string();

    config.target_language = "".to_string();
    assert!(config.validate().is_err());
    config.target_language = "ro".to_string();

    config.translation.common.max_attempts = 0;
    assert!(config.validate().is_err());
    config.translation.common.max_attempts = 3;

    // Remote providers need a key
    config.translation.provider = TranslationProvider::Gemini;
    assert!(config.validate().is_err());
    config.translation.active_provider_config_mut().api_key = "key".to_string();
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_or_create_withMissingFile_shouldWriteDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("nested").join("conf.json");

    let created = Config::load_or_create(&path)?;
    assert!(path.exists());
    assert_eq!(created.target_language, "ro");

    let loaded = Config::load_or_create(&path)?;
    assert_eq!(loaded.translation.provider, created.translation.provider);
    Ok(())
}

#[test]
fn test_load_or_create_withPartialFile_shouldFillDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{
            "source_language": "auto",
            "target_language": "es",
            "translation": {
                "provider": "ollama",
                "available_providers": [{"type": "ollama", "model": "mistral"}]
            },
            "watcher": {"write_mode": "incremental", "watch_dir": "/tmp/subs"}
        }"#,
    )?;

    let config = Config::load_or_create(&path)?;
    assert_eq!(config.translation.provider, TranslationProvider::Ollama);
    assert_eq!(config.translation.get_model(), "mistral");
    assert_eq!(config.translation.get_endpoint(), "http://localhost:11434");
    assert_eq!(config.translation.common.batch_size, 50);
    assert_eq!(config.watcher.write_mode, WriteMode::Incremental);
    assert_eq!(config.watcher.poll_interval_secs, 10);
    Ok(())
}
