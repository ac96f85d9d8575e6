//! Tests for configuration validation

use specter_exec::config::{CoreConfig, PipelineConfig, SchedulerConfig};
use specter_exec::core::Level;

#[test]
fn test_pipeline_config_defaults() {
    let config = PipelineConfig::default();
    assert_eq!(config.file_prefix, "specter");
    assert_eq!(config.max_console_lines, 10_000);
    assert!(config.console_enabled);
    assert!(config.file_enabled);
    assert_eq!(config.min_level, Level::Trace);
    assert!(config.validate().is_ok());
}

#[test]
fn test_pipeline_config_invalid_capacity() {
    let invalid = PipelineConfig::new().with_queue_capacity(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_pipeline_config_invalid_prefix() {
    assert!(PipelineConfig::new().with_file_prefix("  ").validate().is_err());
    assert!(PipelineConfig::new().with_file_prefix("a/b").validate().is_err());
}

#[test]
fn test_scheduler_config_worker_count() {
    assert!(SchedulerConfig::new().effective_worker_count() >= 1);
    assert_eq!(SchedulerConfig::new().with_worker_count(3).effective_worker_count(), 3);
    assert!(SchedulerConfig::new().with_worker_count(0).validate().is_err());
}

#[test]
fn test_core_config_from_json() {
    let json = r#"{
        "pipeline": { "log_dir": "/var/log/specter", "min_level": "info" },
        "scheduler": { "worker_count": 2, "thread_name_prefix": "bg" }
    }"#;
    let config = CoreConfig::from_json_str(json).unwrap();
    assert_eq!(config.pipeline.log_dir.to_str(), Some("/var/log/specter"));
    assert_eq!(config.pipeline.min_level, Level::Info);
    assert_eq!(config.pipeline.queue_capacity, 4096);
    assert_eq!(config.scheduler.worker_count, Some(2));
    assert_eq!(config.scheduler.thread_name_prefix, "bg");
}

#[test]
fn test_core_config_rejects_invalid_section() {
    let err = CoreConfig::from_json_str(r#"{ "scheduler": { "worker_count": 0 } }"#).unwrap_err();
    assert!(err.starts_with("scheduler invalid"));

    let err = CoreConfig::from_json_str("{ not json").unwrap_err();
    assert!(err.starts_with("parse error"));
}

#[test]
fn test_builder_from_json_validates() {
    use specter_exec::builders::ExecutionCoreBuilder;
    use specter_exec::core::CoreError;

    assert!(ExecutionCoreBuilder::from_json_str(r#"{ "scheduler": { "worker_count": 1 } }"#).is_ok());
    let err = ExecutionCoreBuilder::from_json_str(r#"{ "pipeline": { "queue_capacity": 0 } }"#)
        .err()
        .unwrap();
    assert!(matches!(err, CoreError::InvalidConfig(_)));
}
