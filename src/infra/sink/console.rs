//! In-memory console view with a bounded line history.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::ConsoleSink;

/// Retained-line cap of the console view.
pub const DEFAULT_MAX_LINES: usize = 10_000;

/// Console sink that keeps the most recent lines in memory.
///
/// Once more than `max_lines` lines are held, the oldest are dropped. UI
/// front ends can poll [`lines`](Self::lines) to repaint.
#[derive(Debug)]
pub struct RetainedConsole {
    max_lines: usize,
    lines: Mutex<VecDeque<String>>,
    disposed: AtomicBool,
}

impl RetainedConsole {
    /// Create a view retaining at most `max_lines` lines.
    #[must_use]
    pub fn new(max_lines: usize) -> Self {
        Self {
            max_lines: max_lines.max(1),
            lines: Mutex::new(VecDeque::new()),
            disposed: AtomicBool::new(false),
        }
    }

    /// Snapshot of the retained lines, oldest first.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().iter().cloned().collect()
    }

    /// Retained lines joined with newlines.
    #[must_use]
    pub fn contents(&self) -> String {
        let lines = self.lines.lock();
        let mut out = String::new();
        for line in lines.iter() {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// Number of retained lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    /// True when nothing is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    /// Whether [`ConsoleSink::dispose`] has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl Default for RetainedConsole {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINES)
    }
}

impl ConsoleSink for RetainedConsole {
    fn append(&self, text: &str) {
        let mut lines = self.lines.lock();
        lines.extend(text.lines().map(str::to_owned));
        let excess = lines.len().saturating_sub(self.max_lines);
        if excess > 0 {
            lines.drain(..excess);
        }
    }

    fn clear(&self) {
        self.lines.lock().clear();
    }

    fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_multiline_records() {
        let console = RetainedConsole::new(10);
        console.append("first\nCaused by: second\n");
        assert_eq!(console.lines(), vec!["first", "Caused by: second"]);
    }

    #[test]
    fn drops_oldest_lines_past_cap() {
        let console = RetainedConsole::new(3);
        for i in 0..5 {
            console.append(&format!("line {i}\n"));
        }
        assert_eq!(console.lines(), vec!["line 2", "line 3", "line 4"]);
    }

    #[test]
    fn clear_empties_view() {
        let console = RetainedConsole::default();
        console.append("something\n");
        console.clear();
        assert!(console.is_empty());
    }

    #[test]
    fn default_cap_is_ten_thousand() {
        let console = RetainedConsole::default();
        for i in 0..(DEFAULT_MAX_LINES + 25) {
            console.append(&format!("{i}\n"));
        }
        assert_eq!(console.len(), DEFAULT_MAX_LINES);
        assert_eq!(console.lines()[0], "25");
    }
}
