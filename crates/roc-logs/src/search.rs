use regex::{Regex, RegexBuilder};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("invalid search pattern: {0}")]
    Invalid(#[from] regex::Error),
}

/// Summary handed to the presentation layer for the footer line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchStatus {
    pub pattern: String,
    pub match_count: usize,
    /// Zero-based position of the current match within the match list.
    pub current: Option<usize>,
}

/// Compiled search over a log buffer. Matching is case-insensitive by
/// construction. Holds ascending line indices; the pointer wraps on
/// navigation and both directions are no-ops with no matches.
#[derive(Debug)]
pub struct SearchIndex {
    pattern: String,
    regex: Regex,
    matches: Vec<usize>,
    pos: usize,
}

impl SearchIndex {
    pub fn compile<'a, I>(pattern: &str, lines: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        let mut index = SearchIndex {
            pattern: pattern.to_string(),
            regex,
            matches: Vec::new(),
            pos: 0,
        };
        index.rescan(lines);
        Ok(index)
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self) -> &[usize] {
        &self.matches
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn is_match_line(&self, line_idx: usize) -> bool {
        self.matches.binary_search(&line_idx).is_ok()
    }

    /// Buffer index of the current match, if any.
    pub fn current_line(&self) -> Option<usize> {
        self.matches.get(self.pos).copied()
    }

    /// Advance to the next match, wrapping past the end.
    pub fn next(&mut self) -> Option<usize> {
        if self.matches.is_empty() {
            return None;
        }
        self.pos = (self.pos + 1) % self.matches.len();
        self.current_line()
    }

    /// Step back to the previous match, wrapping past the start.
    pub fn prev(&mut self) -> Option<usize> {
        if self.matches.is_empty() {
            return None;
        }
        self.pos = (self.pos + self.matches.len() - 1) % self.matches.len();
        self.current_line()
    }

    /// Full rescan after the underlying buffer was replaced. The pointer is
    /// clamped so navigation stays valid.
    pub fn rescan<'a, I>(&mut self, lines: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.matches.clear();
        for (idx, line) in lines.into_iter().enumerate() {
            if self.regex.is_match(line) {
                self.matches.push(idx);
            }
        }
        if self.pos >= self.matches.len() {
            self.pos = 0;
        }
    }

    /// Merge matches from lines appended at buffer index `start`. Only the
    /// new lines are scanned; existing indices stay valid on pure append.
    pub fn extend<'a, I>(&mut self, new_lines: I, start: usize)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for (offset, line) in new_lines.into_iter().enumerate() {
            if self.regex.is_match(line) {
                self.matches.push(start + offset);
            }
        }
    }

    pub fn status(&self) -> SearchStatus {
        SearchStatus {
            pattern: self.pattern.clone(),
            match_count: self.matches.len(),
            current: if self.matches.is_empty() {
                None
            } else {
                Some(self.pos)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUFFER: [&str; 5] = [
        "startup complete",
        "request Timeout after 2s",
        "encode started",
        "TIMEOUT waiting for drive",
        "shutdown",
    ];

    #[test]
    fn invalid_pattern_is_an_error_not_a_panic() {
        let result = SearchIndex::compile("(unclosed", BUFFER);
        assert!(matches!(result, Err(PatternError::Invalid(_))));
    }

    #[test]
    fn matching_is_case_insensitive_by_construction() {
        let index = SearchIndex::compile("timeout", BUFFER).expect("compile");
        assert_eq!(index.matches(), &[1, 3]);
    }

    #[test]
    fn timeout_scenario_navigates_and_wraps() {
        let mut index = SearchIndex::compile("(?i)timeout", BUFFER).expect("compile");
        assert_eq!(index.current_line(), Some(1));
        assert_eq!(index.next(), Some(3));
        assert_eq!(index.next(), Some(1));
        assert_eq!(index.prev(), Some(3));
    }

    #[test]
    fn next_cycles_back_to_start_after_len_calls() {
        let mut index = SearchIndex::compile("e", BUFFER).expect("compile");
        let start = index.current_line();
        let count = index.matches().len();
        for _ in 0..count {
            index.next();
        }
        assert_eq!(index.current_line(), start);
    }

    #[test]
    fn navigation_is_a_noop_with_no_matches() {
        let mut index = SearchIndex::compile("nomatch", BUFFER).expect("compile");
        assert!(index.is_empty());
        assert_eq!(index.next(), None);
        assert_eq!(index.prev(), None);
        assert_eq!(index.status().current, None);
    }

    #[test]
    fn extend_merges_appended_lines_in_ascending_order() {
        let mut index = SearchIndex::compile("timeout", BUFFER).expect("compile");
        index.extend(["fine", "another timeout here"], BUFFER.len());
        assert_eq!(index.matches(), &[1, 3, 6]);
        assert!(index.is_match_line(6));
    }

    #[test]
    fn rescan_clamps_the_pointer() {
        let mut index = SearchIndex::compile("timeout", BUFFER).expect("compile");
        index.next(); // pointer at second match
        index.rescan(["only one timeout"]);
        assert_eq!(index.matches(), &[0]);
        assert_eq!(index.current_line(), Some(0));
    }
}
