pub mod search;

pub use search::{PatternError, SearchIndex, SearchStatus};

use roc_core::{LogEvent, LogFileChunk};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Minimum spacing between auto-refresh fetches for a source.
pub const REFRESH_DEBOUNCE: Duration = Duration::from_millis(400);

/// Filters applied to the shared daemon stream. Part of the source key, so a
/// filter change carries the same reset semantics as switching sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    pub level: Option<String>,
    pub component: Option<String>,
    pub lane: Option<String>,
    pub request_id: Option<String>,
}

impl LogFilter {
    pub fn is_empty(&self) -> bool {
        self.level.is_none()
            && self.component.is_none()
            && self.lane.is_none()
            && self.request_id.is_none()
    }

    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(level) = &self.level {
            parts.push(format!("level={level}"));
        }
        if let Some(component) = &self.component {
            parts.push(format!("component={component}"));
        }
        if let Some(lane) = &self.lane {
            parts.push(format!("lane={lane}"));
        }
        if let Some(request_id) = &self.request_id {
            parts.push(format!("request={request_id}"));
        }
        parts.join(" ")
    }
}

/// Identifies one log source: the shared daemon stream (sequence cursor) or a
/// per-item log file (byte-offset cursor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKey {
    Daemon { filter: LogFilter },
    Item { id: i64 },
}

impl SourceKey {
    pub fn daemon() -> Self {
        SourceKey::Daemon {
            filter: LogFilter::default(),
        }
    }

    pub fn label(&self) -> String {
        match self {
            SourceKey::Daemon { filter } if filter.is_empty() => "daemon".to_string(),
            SourceKey::Daemon { filter } => format!("daemon [{}]", filter.summary()),
            SourceKey::Item { id } => format!("item-{id}"),
        }
    }
}

/// One buffered line: formatted text plus its opaque ordering key (event
/// sequence number or file offset ordinal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub ordinal: u64,
    pub text: String,
}

impl LogLine {
    pub fn from_event(event: &LogEvent) -> Self {
        LogLine {
            ordinal: event.seq,
            text: event.render(),
        }
    }

    /// A chunk's `offset` is the resume position just past its last line, so
    /// ordinals count back from it.
    pub fn from_chunk(chunk: &LogFileChunk) -> Vec<LogLine> {
        let base = chunk.offset.saturating_sub(chunk.lines.len() as u64);
        chunk
            .lines
            .iter()
            .enumerate()
            .map(|(idx, text)| LogLine {
                ordinal: base.saturating_add(idx as u64),
                text: text.clone(),
            })
            .collect()
    }
}

/// What the next fetch should request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Most-recent-N request; used on first fetch and after source switches.
    Tail { limit: usize },
    /// Resume from the stored cursor.
    Resume { cursor: u64, limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    pub key: SourceKey,
    pub mode: FetchMode,
}

/// Transport result fed back into the store.
#[derive(Debug, Clone)]
pub enum BatchOutcome {
    Tail { lines: Vec<LogLine>, next: u64 },
    Resume { lines: Vec<LogLine>, next: u64 },
}

/// How a batch landed, so the caller knows whether to rescan or extend an
/// open search index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Buffer contents were replaced (tail fetch, or an append that evicted
    /// lines and shifted indices).
    Replaced,
    /// Lines were appended starting at this buffer index; prior indices are
    /// still valid.
    Appended { start: usize },
    /// Response was for a source that is no longer active; dropped.
    Stale,
}

/// Bounded, cursor-addressed line buffer for the active log source.
///
/// Single-mutator model: the view loop owns the store and the debounce plus
/// the in-flight flag are the only concurrency controls needed.
#[derive(Debug)]
pub struct LogTailStore {
    capacity: usize,
    source: SourceKey,
    buffer: VecDeque<LogLine>,
    cursor: u64,
    needs_tail: bool,
    last_fetch: Option<Instant>,
    in_flight: bool,
    suspended: bool,
    fetch_error: Option<String>,
}

impl LogTailStore {
    pub fn new(capacity: usize) -> Self {
        LogTailStore {
            capacity: capacity.max(1),
            source: SourceKey::daemon(),
            buffer: VecDeque::new(),
            cursor: 0,
            needs_tail: true,
            last_fetch: None,
            in_flight: false,
            suspended: false,
            fetch_error: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn source(&self) -> &SourceKey {
        &self.source
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn needs_tail(&self) -> bool {
        self.needs_tail
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogLine> {
        self.buffer.iter()
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.buffer.iter().map(|line| line.text.as_str())
    }

    pub fn line(&self, idx: usize) -> Option<&LogLine> {
        self.buffer.get(idx)
    }

    /// Single inline status line for the last failed fetch, if any.
    pub fn fetch_error(&self) -> Option<&str> {
        self.fetch_error.as_deref()
    }

    /// While a search is active or a filter edit is open, auto refresh must
    /// not replace the buffer out from under the in-progress indices.
    pub fn set_suspended(&mut self, suspended: bool) {
        self.suspended = suspended;
    }

    pub fn suspended(&self) -> bool {
        self.suspended
    }

    /// Make `key` the active source. Resets the cursor to zero so the next
    /// fetch requests a tail instead of resuming an unrelated source's
    /// history. No-op when the key is unchanged.
    pub fn switch_source(&mut self, key: SourceKey) {
        if key == self.source {
            return;
        }
        self.source = key;
        self.cursor = 0;
        self.needs_tail = true;
        self.buffer.clear();
        self.fetch_error = None;
        self.last_fetch = None;
        // Any response still in flight for the old key is discarded on
        // arrival by key comparison.
        self.in_flight = false;
    }

    /// Decide whether to fetch now. Applies the debounce and the one-in-flight
    /// rule unless `force` is set (view switches bypass the debounce but
    /// never double up an in-flight fetch).
    pub fn plan_fetch(&mut self, now: Instant, force: bool) -> Option<FetchPlan> {
        if self.in_flight {
            return None;
        }
        if !force {
            if self.suspended {
                return None;
            }
            if let Some(last) = self.last_fetch {
                if now.duration_since(last) < REFRESH_DEBOUNCE {
                    return None;
                }
            }
        }
        self.in_flight = true;
        self.last_fetch = Some(now);
        let mode = if self.needs_tail || self.cursor == 0 {
            FetchMode::Tail {
                limit: self.capacity,
            }
        } else {
            FetchMode::Resume {
                cursor: self.cursor,
                limit: self.capacity,
            }
        };
        Some(FetchPlan {
            key: self.source.clone(),
            mode,
        })
    }

    /// Fold a fetch result into the buffer. Responses for a stale key are
    /// silently discarded; the existing buffer is never corrupted.
    pub fn apply_batch(&mut self, key: &SourceKey, outcome: BatchOutcome) -> Applied {
        if *key != self.source {
            return Applied::Stale;
        }
        self.in_flight = false;
        self.fetch_error = None;
        match outcome {
            BatchOutcome::Tail { lines, next } => {
                self.buffer.clear();
                for line in lines {
                    self.push_evicting(line);
                }
                self.cursor = next;
                self.needs_tail = false;
                Applied::Replaced
            }
            BatchOutcome::Resume { lines, next } => {
                let start = self.buffer.len();
                let mut evicted = false;
                for line in lines {
                    if self.buffer.len() == self.capacity {
                        self.buffer.pop_front();
                        evicted = true;
                    }
                    self.buffer.push_back(line);
                }
                self.cursor = next;
                if evicted {
                    // Eviction shifted every retained index; for search
                    // purposes this append is a replacement.
                    Applied::Replaced
                } else {
                    Applied::Appended { start }
                }
            }
        }
    }

    /// Record a failed fetch as an inline status line. The buffer stays
    /// intact and the store is usable on the next tick.
    pub fn record_failure(&mut self, key: &SourceKey, message: impl Into<String>) {
        if *key != self.source {
            return;
        }
        self.in_flight = false;
        self.fetch_error = Some(message.into());
    }

    fn push_evicting(&mut self, line: LogLine) {
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(line);
    }
}
