//! Rendering of [`LogRecord`]s into sink text.
//!
//! Output shape:
//!
//! ```text
//! [2024-03-09 23:59:58.120] WARN  - inbox poll took 1830 ms
//! IoError: timed out
//! Caused by: Error: connection reset
//! ```

use std::fmt::Write as _;

use crate::core::error::FormatError;
use crate::core::record::{CapturedError, LogArg, LogRecord};

/// Timestamp layout of a rendered record.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Width the level name is right-padded to.
pub const LEVEL_WIDTH: usize = 5;

/// A rendered record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Full text, terminated by a newline.
    pub text: String,
    /// Set when template substitution failed and the raw template was used.
    pub template_error: Option<FormatError>,
}

/// Substitute `args` into `template`.
///
/// `{}` takes the next argument, `{N}` takes argument `N`, and `{{` / `}}`
/// are literal braces. Unused trailing arguments are ignored.
///
/// # Errors
///
/// Returns a [`FormatError`] for unbalanced braces, non-numeric placeholders,
/// references past the end of `args` or an argument whose `Display` fails.
pub fn substitute(template: &str, args: &[LogArg]) -> Result<String, FormatError> {
    let mut out = String::with_capacity(template.len() + args.len() * 8);
    let mut next = 0;
    let mut chars = template.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            '{' if chars.peek().is_some_and(|&(_, n)| n == '{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut placeholder = String::new();
                loop {
                    match chars.next() {
                        Some((_, '}')) => break,
                        Some((_, '{')) | None => return Err(FormatError::UnbalancedBrace(pos)),
                        Some((_, ch)) => placeholder.push(ch),
                    }
                }
                let index = if placeholder.is_empty() {
                    next += 1;
                    next - 1
                } else {
                    placeholder.trim()
                        .parse::<usize>()
                        .map_err(|_| FormatError::InvalidPlaceholder(placeholder.clone()))?
                };
                let arg = args.get(index).ok_or(FormatError::MissingArgument(index))?;
                write!(out, "{arg}").map_err(|_| FormatError::ArgumentDisplay(index))?;
            }
            '}' if chars.peek().is_some_and(|&(_, n)| n == '}') => {
                chars.next();
                out.push('}');
            }
            '}' => return Err(FormatError::UnbalancedBrace(pos)),
            other => out.push(other),
        }
    }

    Ok(out)
}

/// Render a record with its error chain.
///
/// A record without arguments is emitted verbatim, braces included.
#[must_use]
pub fn render(record: &LogRecord) -> Rendered {
    let (message, template_error) = if record.args().is_empty() {
        (record.message().to_owned(), None)
    } else {
        match substitute(record.message(), record.args()) {
            Ok(message) => (message, None),
            Err(err) => (record.message().to_owned(), Some(err)),
        }
    };

    let mut text = String::with_capacity(message.len() + 40);
    let _ = write!(
        text,
        "[{}] {:<width$} - {}",
        record.timestamp().format(TIMESTAMP_FORMAT),
        record.level(),
        message,
        width = LEVEL_WIDTH,
    );

    if let Some(error) = record.error() {
        text.push('\n');
        render_chain(&mut text, error);
    }
    text.push('\n');

    Rendered {
        text,
        template_error,
    }
}

fn render_chain(out: &mut String, error: &CapturedError) {
    for (depth, link) in error.chain().enumerate() {
        if depth > 0 {
            out.push_str("\nCaused by: ");
        }
        let _ = write!(out, "{link}");
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::core::record::Level;

    fn args(values: &[&'static str]) -> Vec<LogArg> {
        values.iter().map(|v| LogArg::new(*v)).collect()
    }

    fn record(level: Level, message: &str, args: Vec<LogArg>, error: Option<CapturedError>) -> LogRecord {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_milli_opt(23, 59, 58, 120)
            .unwrap();
        LogRecord::new(level, message, args, error, ts)
    }

    #[test]
    fn sequential_placeholders() {
        let out = substitute("found {} breaches for {}", &args(&["3", "alice@example.com"])).unwrap();
        assert_eq!(out, "found 3 breaches for alice@example.com");
    }

    #[test]
    fn positional_placeholders_and_escapes() {
        let out = substitute("{1} before {0} {{literal}}", &args(&["a", "b"])).unwrap();
        assert_eq!(out, "b before a {literal}");
    }

    #[test]
    fn extra_arguments_are_ignored() {
        assert_eq!(substitute("only {}", &args(&["one", "two"])).unwrap(), "only one");
    }

    #[test]
    fn substitution_errors() {
        assert_eq!(substitute("{} {}", &args(&["x"])), Err(FormatError::MissingArgument(1)));
        assert_eq!(substitute("open {", &args(&["x"])), Err(FormatError::UnbalancedBrace(5)));
        assert_eq!(substitute("close }", &args(&["x"])), Err(FormatError::UnbalancedBrace(6)));
        assert_eq!(
            substitute("{name}", &args(&["x"])),
            Err(FormatError::InvalidPlaceholder("name".into()))
        );
    }

    struct BrokenDisplay;

    impl std::fmt::Display for BrokenDisplay {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("PART")?;
            Err(std::fmt::Error)
        }
    }

    #[test]
    fn failing_argument_display_is_an_error() {
        let args = vec![LogArg::new("ok"), LogArg::new(BrokenDisplay)];
        assert_eq!(
            substitute("{} value={} end", &args),
            Err(FormatError::ArgumentDisplay(1))
        );

        let rendered = render(&record(Level::Info, "value={} end", vec![LogArg::new(BrokenDisplay)], None));
        assert_eq!(rendered.text, "[2024-03-09 23:59:58.120] INFO  - value={} end\n");
        assert_eq!(rendered.template_error, Some(FormatError::ArgumentDisplay(0)));
    }

    #[test]
    fn render_pads_level_and_stamps_time() {
        let rendered = render(&record(Level::Info, "polling {}", args(&["inbox"]), None));
        assert_eq!(rendered.text, "[2024-03-09 23:59:58.120] INFO  - polling inbox\n");
        assert!(rendered.template_error.is_none());
    }

    #[test]
    fn render_falls_back_to_raw_template() {
        let rendered = render(&record(Level::Warn, "{} of {}", args(&["1"]), None));
        assert_eq!(rendered.text, "[2024-03-09 23:59:58.120] WARN  - {} of {}\n");
        assert_eq!(rendered.template_error, Some(FormatError::MissingArgument(1)));
    }

    #[test]
    fn render_without_args_is_verbatim() {
        let rendered = render(&record(Level::Debug, "json: {\"a\": 1}", Vec::new(), None));
        assert!(rendered.text.ends_with("DEBUG - json: {\"a\": 1}\n"));
        assert!(rendered.template_error.is_none());
    }

    #[test]
    fn render_lists_every_cause_in_order() {
        let error = CapturedError::new("BreachLookupError", "lookup failed").caused_by(
            CapturedError::new("HttpError", "status 503")
                .caused_by(CapturedError::new("IoError", "connection reset")),
        );
        let rendered = render(&record(Level::Error, "breach check aborted", Vec::new(), Some(error)));
        assert_eq!(
            rendered.text,
            "[2024-03-09 23:59:58.120] ERROR - breach check aborted\n\
             BreachLookupError: lookup failed\n\
             Caused by: HttpError: status 503\n\
             Caused by: IoError: connection reset\n"
        );
    }
}
