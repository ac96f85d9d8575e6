//! Logging macros that wrap each argument in a [`LogArg`](crate::LogArg).

/// Submit a record at an explicit level.
///
/// ```rust,ignore
/// log_at!(pipeline, Level::Info, "fetched {} items", count);
/// ```
#[macro_export]
macro_rules! log_at {
    ($pipeline:expr, $level:expr, $msg:expr $(, $arg:expr)* $(,)?) => {
        $pipeline.enqueue(
            $level,
            $msg,
            ::std::vec![$($crate::core::LogArg::new($arg)),*],
            ::std::option::Option::None,
        )
    };
}

/// Submit a TRACE record.
#[macro_export]
macro_rules! log_trace {
    ($pipeline:expr, $msg:expr $(, $arg:expr)* $(,)?) => {
        $crate::log_at!($pipeline, $crate::core::Level::Trace, $msg $(, $arg)*)
    };
}

/// Submit a DEBUG record.
#[macro_export]
macro_rules! log_debug {
    ($pipeline:expr, $msg:expr $(, $arg:expr)* $(,)?) => {
        $crate::log_at!($pipeline, $crate::core::Level::Debug, $msg $(, $arg)*)
    };
}

/// Submit an INFO record.
#[macro_export]
macro_rules! log_info {
    ($pipeline:expr, $msg:expr $(, $arg:expr)* $(,)?) => {
        $crate::log_at!($pipeline, $crate::core::Level::Info, $msg $(, $arg)*)
    };
}

/// Submit a WARN record.
#[macro_export]
macro_rules! log_warn {
    ($pipeline:expr, $msg:expr $(, $arg:expr)* $(,)?) => {
        $crate::log_at!($pipeline, $crate::core::Level::Warn, $msg $(, $arg)*)
    };
}

/// Submit an ERROR record.
#[macro_export]
macro_rules! log_error {
    ($pipeline:expr, $msg:expr $(, $arg:expr)* $(,)?) => {
        $crate::log_at!($pipeline, $crate::core::Level::Error, $msg $(, $arg)*)
    };
}
