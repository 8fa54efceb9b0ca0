use std::collections::VecDeque;

/// Columns kept free to the right of every log line.
pub const LOG_MARGIN: usize = 5;

/// Bounded scrollback shown during execution. Oldest lines are evicted first.
#[derive(Debug, Clone)]
pub struct ProgressLog {
    lines: VecDeque<String>,
    capacity: usize,
}

impl ProgressLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Sanitizes `entry` for a terminal `width` columns wide and appends it.
    pub fn push(&mut self, entry: &str, width: usize) {
        let line = sanitize_line(entry, width.saturating_sub(LOG_MARGIN));
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// The last `n` lines, oldest first.
    pub fn tail(&self, n: usize) -> impl Iterator<Item = &str> {
        let skip = self.lines.len().saturating_sub(n);
        self.iter().skip(skip)
    }
}

/// Folds line breaks and other control characters into spaces, collapses
/// runs of spaces, trims, and cuts to `max_chars` with a `...` tail.
pub fn sanitize_line(msg: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(msg.len());
    let mut last_space = true;
    for ch in msg.chars() {
        let ch = if ch.is_control() || ch.is_whitespace() {
            ' '
        } else {
            ch
        };
        if ch == ' ' {
            if !last_space {
                out.push(' ');
            }
            last_space = true;
        } else {
            out.push(ch);
            last_space = false;
        }
    }
    let trimmed = out.trim_end();

    let len = trimmed.chars().count();
    if len <= max_chars {
        return trimmed.to_string();
    }
    if max_chars <= 3 {
        return trimmed.chars().take(max_chars).collect();
    }
    let mut cut: String = trimmed.chars().take(max_chars - 3).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_flattens_and_collapses() {
        assert_eq!(
            sanitize_line("  apt-get:\r\n  E: lock\theld   ", 80),
            "apt-get: E: lock held"
        );
        assert_eq!(sanitize_line("\n\n", 80), "");
    }

    #[test]
    fn sanitize_truncates_with_ellipsis() {
        assert_eq!(sanitize_line("abcdefghij", 8), "abcde...");
        assert_eq!(sanitize_line("abcdefghij", 3), "abc");
        assert_eq!(sanitize_line("abcdefghij", 0), "");
        assert_eq!(sanitize_line("abc", 3), "abc");
    }

    #[test]
    fn sanitize_counts_chars_not_bytes() {
        let line = sanitize_line("✓ Ünïcödé cleaner", 10);
        assert_eq!(line.chars().count(), 10);
        assert!(line.ends_with("..."));
    }

    #[test]
    fn every_entry_fits_width_and_has_no_breaks() {
        let mut log = ProgressLog::new(100);
        let inputs = [
            "short",
            "multi\nline\rerror output from a tool that goes on and on and on and on",
            &"x".repeat(500),
            "",
        ];
        for width in [0usize, 4, 6, 20, 80, 200] {
            for input in inputs {
                log.push(input, width);
                let last = log.iter().last().unwrap();
                assert!(last.chars().count() <= width.saturating_sub(LOG_MARGIN));
                assert!(!last.contains('\n') && !last.contains('\r'));
            }
        }
    }

    #[test]
    fn capacity_evicts_oldest() {
        let mut log = ProgressLog::new(3);
        for i in 0..5 {
            log.push(&format!("line {i}"), 80);
        }
        assert_eq!(log.len(), 3);
        assert_eq!(log.iter().collect::<Vec<_>>(), vec!["line 2", "line 3", "line 4"]);
        assert_eq!(log.tail(2).collect::<Vec<_>>(), vec!["line 3", "line 4"]);
        assert_eq!(log.tail(10).count(), 3);
    }
}
