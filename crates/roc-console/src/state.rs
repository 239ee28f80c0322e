use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::widgets::TableState;
use roc_client::TransportError;
use roc_core::QueueSnapshot;
use roc_logs::{Applied, BatchOutcome, LogFilter, LogTailStore, SearchIndex, SourceKey};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub poll_interval: Duration,
    pub log_capacity: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Queue,
    Logs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterField {
    #[default]
    Level,
    Component,
    Lane,
    Request,
}

impl FilterField {
    pub fn label(self) -> &'static str {
        match self {
            FilterField::Level => "level",
            FilterField::Component => "component",
            FilterField::Lane => "lane",
            FilterField::Request => "request",
        }
    }

    pub fn next(self) -> Self {
        match self {
            FilterField::Level => FilterField::Component,
            FilterField::Component => FilterField::Lane,
            FilterField::Lane => FilterField::Request,
            FilterField::Request => FilterField::Level,
        }
    }
}

/// In-progress edit of the daemon-stream filters. While open, the store's
/// auto refresh is suspended.
#[derive(Debug, Clone, Default)]
pub struct FilterDraft {
    pub field: FilterField,
    pub level: String,
    pub component: String,
    pub lane: String,
    pub request_id: String,
}

impl FilterDraft {
    pub fn from_filter(filter: &LogFilter) -> Self {
        FilterDraft {
            field: FilterField::Level,
            level: filter.level.clone().unwrap_or_default(),
            component: filter.component.clone().unwrap_or_default(),
            lane: filter.lane.clone().unwrap_or_default(),
            request_id: filter.request_id.clone().unwrap_or_default(),
        }
    }

    pub fn to_filter(&self) -> LogFilter {
        fn opt(value: &str) -> Option<String> {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        LogFilter {
            level: opt(&self.level),
            component: opt(&self.component),
            lane: opt(&self.lane),
            request_id: opt(&self.request_id),
        }
    }

    pub fn value(&self, field: FilterField) -> &str {
        match field {
            FilterField::Level => &self.level,
            FilterField::Component => &self.component,
            FilterField::Lane => &self.lane,
            FilterField::Request => &self.request_id,
        }
    }

    fn value_mut(&mut self) -> &mut String {
        match self.field {
            FilterField::Level => &mut self.level,
            FilterField::Component => &mut self.component,
            FilterField::Lane => &mut self.lane,
            FilterField::Request => &mut self.request_id,
        }
    }
}

/// Result message delivered from a spawned fetch task back onto the loop.
#[derive(Debug)]
pub enum FetchResult {
    Queue(Result<QueueSnapshot, TransportError>),
    Logs {
        key: SourceKey,
        result: Result<BatchOutcome, TransportError>,
    },
}

pub struct App {
    pub config: Config,
    pub items: Vec<roc_core::Item>,
    pub table_state: TableState,
    pub view: View,
    pub store: LogTailStore,
    pub filter: LogFilter,
    pub search: Option<SearchIndex>,
    pub search_input: Option<String>,
    pub search_error: Option<String>,
    pub filter_draft: Option<FilterDraft>,
    pub transport_banner: Option<String>,
    pub status_note: Option<String>,
    pub queue_in_flight: bool,
    force_log_fetch: bool,
    /// Lines scrolled up from the tail; zero follows new output.
    pub log_offset: usize,
    pub should_quit: bool,
}

impl App {
    pub fn new(config: Config) -> Self {
        let store = LogTailStore::new(config.log_capacity);
        App {
            config,
            items: Vec::new(),
            table_state: TableState::default(),
            view: View::Queue,
            store,
            filter: LogFilter::default(),
            search: None,
            search_input: None,
            search_error: None,
            filter_draft: None,
            transport_banner: None,
            status_note: None,
            queue_in_flight: false,
            force_log_fetch: false,
            log_offset: 0,
            should_quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn selected_item(&self) -> Option<&roc_core::Item> {
        self.items.get(self.table_state.selected()?)
    }

    pub fn take_force_log_fetch(&mut self) -> bool {
        std::mem::take(&mut self.force_log_fetch)
    }

    pub fn apply_fetch(&mut self, result: FetchResult) {
        match result {
            FetchResult::Queue(result) => self.apply_queue_result(result),
            FetchResult::Logs { key, result } => self.apply_log_result(key, result),
        }
    }

    /// Replace the queue snapshot wholesale, keeping the selection pinned to
    /// the same item id when it survives the refresh.
    fn apply_queue_result(&mut self, result: Result<QueueSnapshot, TransportError>) {
        self.queue_in_flight = false;
        match result {
            Ok(snapshot) => {
                self.transport_banner = None;
                let selected_id = self
                    .table_state
                    .selected()
                    .and_then(|idx| self.items.get(idx))
                    .map(|item| item.id);
                self.items = snapshot.items;
                let restored = selected_id
                    .and_then(|id| self.items.iter().position(|item| item.id == id));
                match restored {
                    Some(idx) => self.table_state.select(Some(idx)),
                    None if self.items.is_empty() => self.table_state.select(None),
                    None => {
                        let idx = self
                            .table_state
                            .selected()
                            .unwrap_or(0)
                            .min(self.items.len() - 1);
                        self.table_state.select(Some(idx));
                    }
                }
            }
            Err(err) => {
                warn!(event = "queue_fetch_failed", error = %err);
                self.transport_banner = Some(err.to_string());
            }
        }
    }

    fn apply_log_result(
        &mut self,
        key: SourceKey,
        result: Result<BatchOutcome, TransportError>,
    ) {
        match result {
            Ok(outcome) => match self.store.apply_batch(&key, outcome) {
                Applied::Replaced => {
                    if let Some(search) = self.search.as_mut() {
                        search.rescan(self.store.texts());
                    }
                }
                Applied::Appended { start } => {
                    if let Some(search) = self.search.as_mut() {
                        search.extend(self.store.texts().skip(start), start);
                    }
                }
                Applied::Stale => {
                    debug!(event = "stale_log_batch_dropped", key = %key.label());
                }
            },
            Err(err) => {
                warn!(event = "log_fetch_failed", key = %key.label(), error = %err);
                self.store.record_failure(&key, err.to_string());
            }
        }
    }

    pub fn handle_event(&mut self, event: Event) {
        if let Event::Key(key) = event {
            if key.kind == KeyEventKind::Press {
                self.handle_key(key);
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.search_input.is_some() {
            self.handle_search_input_key(key);
            return;
        }
        if self.filter_draft.is_some() {
            self.handle_filter_key(key);
            return;
        }
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
            }
            KeyCode::Tab => match self.view {
                View::Queue => self.open_logs_view(),
                View::Logs => self.view = View::Queue,
            },
            _ => match self.view {
                View::Queue => self.handle_queue_key(key),
                View::Logs => self.handle_logs_key(key),
            },
        }
    }

    fn handle_queue_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Enter => self.open_item_logs(),
            KeyCode::Char('L') => self.open_daemon_logs(),
            _ => {}
        }
    }

    fn handle_logs_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                if self.search.is_some() {
                    self.clear_search();
                } else {
                    self.view = View::Queue;
                }
            }
            KeyCode::Char('/') => {
                self.search_input = Some(String::new());
                self.search_error = None;
                self.update_suspension();
            }
            KeyCode::Char('n') => {
                if let Some(search) = self.search.as_mut() {
                    search.next();
                }
            }
            KeyCode::Char('N') => {
                if let Some(search) = self.search.as_mut() {
                    search.prev();
                }
            }
            KeyCode::Char('f') => {
                if matches!(self.store.source(), SourceKey::Daemon { .. }) {
                    self.filter_draft = Some(FilterDraft::from_filter(&self.filter));
                    self.update_suspension();
                }
            }
            KeyCode::Char('d') => self.open_daemon_logs(),
            KeyCode::Char('r') => {
                self.force_log_fetch = true;
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.log_offset = self.log_offset.saturating_sub(1);
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if self.log_offset + 1 < self.store.len() {
                    self.log_offset += 1;
                }
            }
            KeyCode::Char('G') => {
                self.log_offset = 0;
            }
            _ => {}
        }
    }

    fn handle_search_input_key(&mut self, key: KeyEvent) {
        let Some(input) = self.search_input.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => {
                self.search_input = None;
                self.search_error = None;
                self.update_suspension();
            }
            KeyCode::Enter => {
                let pattern = input.clone();
                match SearchIndex::compile(&pattern, self.store.texts()) {
                    Ok(index) => {
                        self.search = Some(index);
                        self.search_input = None;
                        self.search_error = None;
                    }
                    Err(err) => {
                        // input stays open so the pattern can be corrected
                        self.search_error = Some(err.to_string());
                    }
                }
                self.update_suspension();
            }
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char(ch) => {
                input.push(ch);
            }
            _ => {}
        }
    }

    fn handle_filter_key(&mut self, key: KeyEvent) {
        let Some(draft) = self.filter_draft.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => {
                self.filter_draft = None;
                self.update_suspension();
            }
            KeyCode::Tab | KeyCode::Down => {
                draft.field = draft.field.next();
            }
            KeyCode::Enter => {
                let filter = draft.to_filter();
                self.filter_draft = None;
                self.apply_filter(filter);
            }
            KeyCode::Backspace => {
                draft.value_mut().pop();
            }
            KeyCode::Char(ch) => {
                draft.value_mut().push(ch);
            }
            _ => {}
        }
    }

    /// Applying a filter is a source switch: cursor reset, tail fetch, and
    /// search invalidation all follow from the key change.
    fn apply_filter(&mut self, filter: LogFilter) {
        self.filter = filter.clone();
        self.clear_search();
        self.store.switch_source(SourceKey::Daemon { filter });
        self.force_log_fetch = true;
        self.log_offset = 0;
        self.update_suspension();
    }

    fn open_logs_view(&mut self) {
        self.view = View::Logs;
        self.force_log_fetch = true;
    }

    pub fn open_item_logs(&mut self) {
        let Some(item) = self.selected_item() else {
            self.status_note = Some("no item selected".to_string());
            return;
        };
        let key = SourceKey::Item { id: item.id };
        if &key != self.store.source() {
            self.clear_search();
            self.store.switch_source(key);
            self.log_offset = 0;
        }
        self.open_logs_view();
    }

    pub fn open_daemon_logs(&mut self) {
        let key = SourceKey::Daemon {
            filter: self.filter.clone(),
        };
        if &key != self.store.source() {
            self.clear_search();
            self.store.switch_source(key);
            self.log_offset = 0;
        }
        self.open_logs_view();
    }

    pub fn clear_search(&mut self) {
        self.search = None;
        self.search_input = None;
        self.search_error = None;
        self.update_suspension();
    }

    fn update_suspension(&mut self) {
        let suspended =
            self.search.is_some() || self.search_input.is_some() || self.filter_draft.is_some();
        self.store.set_suspended(suspended);
    }

    fn move_selection(&mut self, delta: isize) {
        if self.items.is_empty() {
            self.table_state.select(None);
            return;
        }
        let len = self.items.len() as isize;
        let current = self.table_state.selected().unwrap_or(0) as isize;
        let mut next = current + delta;
        if next < 0 {
            next = len - 1;
        }
        if next >= len {
            next = 0;
        }
        self.table_state.select(Some(next as usize));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roc_core::Item;

    fn config() -> Config {
        Config {
            base_url: "http://localhost:8724".to_string(),
            poll_interval: Duration::from_secs(2),
            log_capacity: 100,
        }
    }

    fn snapshot(ids: &[i64]) -> QueueSnapshot {
        QueueSnapshot {
            items: ids
                .iter()
                .map(|&id| Item {
                    id,
                    ..Item::default()
                })
                .collect(),
        }
    }

    #[test]
    fn snapshot_replacement_preserves_selection_by_id() {
        let mut app = App::new(config());
        app.apply_fetch(FetchResult::Queue(Ok(snapshot(&[1, 2, 3]))));
        app.table_state.select(Some(1));

        // item 1 drops out; item 2 should stay selected at its new index
        app.apply_fetch(FetchResult::Queue(Ok(snapshot(&[2, 3]))));
        assert_eq!(app.table_state.selected(), Some(0));
        assert_eq!(app.selected_item().map(|item| item.id), Some(2));
    }

    #[test]
    fn transport_failure_raises_banner_and_keeps_items() {
        let mut app = App::new(config());
        app.apply_fetch(FetchResult::Queue(Ok(snapshot(&[1]))));
        app.queue_in_flight = true;
        app.apply_fetch(FetchResult::Queue(Err(
            roc_client::TransportError::Status {
                status: 502,
                body: "bad gateway".to_string(),
            },
        )));
        assert!(app.transport_banner.is_some());
        assert_eq!(app.items.len(), 1);
        assert!(!app.queue_in_flight);
    }

    #[test]
    fn invalid_search_pattern_keeps_input_open() {
        let mut app = App::new(config());
        app.view = View::Logs;
        app.handle_key(KeyEvent::from(KeyCode::Char('/')));
        for ch in "(bad".chars() {
            app.handle_key(KeyEvent::from(KeyCode::Char(ch)));
        }
        app.handle_key(KeyEvent::from(KeyCode::Enter));
        assert!(app.search_input.is_some());
        assert!(app.search_error.is_some());
        assert!(app.search.is_none());
    }

    #[test]
    fn filter_apply_switches_source_and_invalidates_search() {
        let mut app = App::new(config());
        app.view = View::Logs;
        app.search = Some(
            SearchIndex::compile("x", std::iter::empty()).expect("compile"),
        );
        app.handle_key(KeyEvent::from(KeyCode::Char('f')));
        for ch in "warn".chars() {
            app.handle_key(KeyEvent::from(KeyCode::Char(ch)));
        }
        app.handle_key(KeyEvent::from(KeyCode::Enter));

        assert!(app.search.is_none());
        assert_eq!(
            app.store.source(),
            &SourceKey::Daemon {
                filter: LogFilter {
                    level: Some("warn".to_string()),
                    ..LogFilter::default()
                }
            }
        );
        assert!(app.store.needs_tail());
        assert!(app.take_force_log_fetch());
    }

    #[test]
    fn opening_item_logs_switches_source_key() {
        let mut app = App::new(config());
        app.apply_fetch(FetchResult::Queue(Ok(snapshot(&[7]))));
        app.table_state.select(Some(0));
        app.open_item_logs();
        assert_eq!(app.view, View::Logs);
        assert_eq!(app.store.source(), &SourceKey::Item { id: 7 });
        assert!(app.take_force_log_fetch());
    }
}
