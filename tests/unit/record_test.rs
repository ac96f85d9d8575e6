//! Tests for log records and captured failures

use chrono::NaiveDate;
use specter_exec::core::{CapturedError, Level, LogArg, LogRecord};

#[test]
fn test_level_ordering() {
    assert!(Level::Error > Level::Warn);
    assert!(Level::Warn > Level::Info);
    assert!(Level::Info > Level::Debug);
    assert!(Level::Debug > Level::Trace);
}

#[test]
fn test_level_parse() {
    assert_eq!("warning".parse::<Level>().unwrap(), Level::Warn);
    assert_eq!("ERROR".parse::<Level>().unwrap(), Level::Error);
    assert!("loud".parse::<Level>().is_err());
}

#[test]
fn test_captured_error_chain() {
    let error = CapturedError::new("HttpError", "status 503")
        .caused_by(CapturedError::new("IoError", "connection reset"));
    let kinds: Vec<&str> = error.chain().map(CapturedError::kind).collect();
    assert_eq!(kinds, vec!["HttpError", "IoError"]);
    assert_eq!(error.to_string(), "HttpError: status 503");
}

#[test]
fn test_captured_error_from_anyhow() {
    let err = anyhow::anyhow!("connection reset").context("inbox poll failed");
    let captured = CapturedError::from_anyhow(&err);
    let messages: Vec<&str> = captured.chain().map(CapturedError::message).collect();
    assert_eq!(messages, vec!["inbox poll failed", "connection reset"]);
}

#[test]
fn test_record_keeps_submission_values() {
    let ts = NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(8, 30, 0)
        .unwrap();
    let record = LogRecord::new(Level::Info, "{} hits", vec![LogArg::new(3)], None, ts);
    assert_eq!(record.level(), Level::Info);
    assert_eq!(record.message(), "{} hits");
    assert_eq!(record.args().len(), 1);
    assert_eq!(record.timestamp(), ts);
    assert!(record.error().is_none());
}
