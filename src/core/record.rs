//! Log record model.

use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Severity of a log record, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Very fine-grained diagnostics.
    Trace,
    /// Developer diagnostics.
    Debug,
    /// Normal operational messages.
    Info,
    /// Something unexpected that did not stop the operation.
    Warn,
    /// A failure.
    Error,
}

impl Level {
    /// Upper-case name as rendered in log output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `pad` so width/alignment flags work in record formatting.
        f.pad(self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level `{other}`")),
        }
    }
}

/// An opaque template argument.
///
/// The value is kept as-is and only rendered when the consumer thread formats
/// the record, so enqueueing never pays for `Display`.
#[derive(Clone)]
pub struct LogArg(Arc<dyn fmt::Display + Send + Sync>);

impl LogArg {
    /// Wrap any displayable value.
    pub fn new<T>(value: T) -> Self
    where
        T: fmt::Display + Send + Sync + 'static,
    {
        Self(Arc::new(value))
    }
}

impl fmt::Display for LogArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for LogArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LogArg(..)")
    }
}

/// A failure attached to a record: a kind, a message and an optional cause.
///
/// Causes form a singly linked chain which is rendered top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedError {
    kind: String,
    message: String,
    cause: Option<Box<CapturedError>>,
}

impl CapturedError {
    /// Create a failure with no cause.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            cause: None,
        }
    }

    /// Attach `cause` beneath this failure, replacing any existing cause.
    #[must_use]
    pub fn caused_by(mut self, cause: Self) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Capture a typed error and its `source()` chain.
    ///
    /// The outer kind is the error's type name; sources are type-erased by
    /// the time they are reachable and are labelled `Error`.
    pub fn from_error<E>(err: &E) -> Self
    where
        E: std::error::Error + 'static,
    {
        let mut captured = Self::new(short_type_name::<E>(), err.to_string());
        captured.cause = err.source().map(|source| Box::new(Self::from_dyn(source)));
        captured
    }

    /// Capture an `anyhow` error chain.
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let mut links = err.chain().map(|e| Self::new("Error", e.to_string()));
        let mut head = links.next().unwrap_or_else(|| Self::new("Error", err.to_string()));
        let rest: Vec<Self> = links.collect();
        // Fold from the innermost cause outwards.
        let tail = rest.into_iter().rev().reduce(|inner, outer| outer.caused_by(inner));
        head.cause = tail.map(Box::new);
        head
    }

    /// Capture a panic payload as returned by `catch_unwind`.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_owned());
        Self::new("Panic", message)
    }

    fn from_dyn(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut captured = Self::new("Error", err.to_string());
        captured.cause = err.source().map(|source| Box::new(Self::from_dyn(source)));
        captured
    }

    /// Failure kind, e.g. a type name.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Next link in the cause chain.
    #[must_use]
    pub fn cause(&self) -> Option<&Self> {
        self.cause.as_deref()
    }

    /// Iterate this failure and every cause, outermost first.
    pub fn chain(&self) -> impl Iterator<Item = &Self> {
        std::iter::successors(Some(self), |e| e.cause())
    }
}

impl fmt::Display for CapturedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    // Strip the module path but leave generic parameters alone.
    let base = full.split('<').next().unwrap_or(full);
    let start = base.rfind("::").map_or(0, |i| i + 2);
    &full[start..]
}

/// One immutable log submission.
///
/// The timestamp is taken when the record is created on the producer's
/// thread, so a record that waits in the queue still reports when it was
/// logged rather than when it was written.
#[derive(Debug, Clone)]
pub struct LogRecord {
    level: Level,
    message: String,
    args: Vec<LogArg>,
    error: Option<CapturedError>,
    timestamp: NaiveDateTime,
}

impl LogRecord {
    /// Assemble a record.
    pub fn new(
        level: Level,
        message: impl Into<String>,
        args: Vec<LogArg>,
        error: Option<CapturedError>,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            level,
            message: message.into(),
            args,
            error,
            timestamp,
        }
    }

    /// Severity.
    #[must_use]
    pub const fn level(&self) -> Level {
        self.level
    }

    /// Message template.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Template arguments, in order.
    #[must_use]
    pub fn args(&self) -> &[LogArg] {
        &self.args
    }

    /// Attached failure, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&CapturedError> {
        self.error.as_ref()
    }

    /// Moment the record was created.
    #[must_use]
    pub const fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered_by_severity() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
    }

    #[test]
    fn level_parses_case_insensitively() {
        assert_eq!("INFO".parse::<Level>().unwrap(), Level::Info);
        assert_eq!("warning".parse::<Level>().unwrap(), Level::Warn);
        assert!("severe".parse::<Level>().is_err());
    }

    #[test]
    fn level_display_honours_padding() {
        assert_eq!(format!("{:<5}|", Level::Info), "INFO |");
    }

    #[test]
    fn from_error_walks_io_source() {
        #[derive(Debug, thiserror::Error)]
        #[error("request failed")]
        struct RequestFailed(#[source] std::io::Error);

        let err = RequestFailed(std::io::Error::other("connection reset"));
        let captured = CapturedError::from_error(&err);

        let chain: Vec<_> = captured.chain().map(|e| (e.kind(), e.message())).collect();
        assert_eq!(
            chain,
            vec![("RequestFailed", "request failed"), ("Error", "connection reset")]
        );
    }

    #[test]
    fn from_anyhow_keeps_context_order() {
        let err = anyhow::anyhow!("socket closed")
            .context("fetch inbox")
            .context("poll cycle");
        let captured = CapturedError::from_anyhow(&err);
        let messages: Vec<_> = captured.chain().map(CapturedError::message).collect();
        assert_eq!(messages, vec!["poll cycle", "fetch inbox", "socket closed"]);
    }

    #[test]
    fn from_panic_reads_str_and_string_payloads() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(CapturedError::from_panic(payload.as_ref()).message(), "boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(CapturedError::from_panic(payload.as_ref()).message(), "owned boom");

        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(CapturedError::from_panic(payload.as_ref()).kind(), "Panic");
    }
}
