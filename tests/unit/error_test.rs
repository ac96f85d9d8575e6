//! Tests for error types

use std::io;
use std::path::PathBuf;

use specter_exec::core::{CoreError, FormatError, PipelineError, SchedulerError, SinkError};

#[test]
fn test_invalid_argument_error() {
    let err = SchedulerError::InvalidArgument("worker count must be positive".to_string());
    assert_eq!(format!("{}", err), "invalid argument: worker count must be positive");
}

#[test]
fn test_shutdown_error() {
    assert_eq!(format!("{}", SchedulerError::Shutdown), "scheduler has been shut down");
}

#[test]
fn test_sink_error_names_path() {
    let err = SinkError::Open {
        path: PathBuf::from("logs/specter-2024-05-01.log"),
        source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
    };
    assert_eq!(
        format!("{}", err),
        "cannot open log file logs/specter-2024-05-01.log: denied"
    );
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_format_error_display() {
    assert_eq!(format!("{}", FormatError::MissingArgument(2)), "missing argument 2");
    assert_eq!(
        format!("{}", FormatError::InvalidPlaceholder("name".into())),
        "invalid placeholder `{name}`"
    );
}

#[test]
fn test_core_error_is_transparent() {
    let err: CoreError = PipelineError::InvalidConfig("queue_capacity must be greater than 0".into()).into();
    assert_eq!(
        format!("{}", err),
        "invalid pipeline configuration: queue_capacity must be greater than 0"
    );

    let err: CoreError = SchedulerError::Shutdown.into();
    assert!(matches!(err, CoreError::Scheduler(SchedulerError::Shutdown)));
}
