mod state;
mod theme;
mod ui;

use crossterm::event::EventStream;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use roc_client::{DaemonClient, LogQuery};
use roc_logs::{BatchOutcome, FetchMode, FetchPlan, LogLine, SourceKey};
use state::{App, Config, FetchResult, View};
use std::error::Error;
use std::io;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

const DEFAULT_DAEMON_URL: &str = "http://127.0.0.1:8724";
const DEFAULT_POLL_SECS: u64 = 2;
const DEFAULT_LOG_CAPACITY: usize = 2000;
/// Log ticks run faster than the store's debounce; the store decides when a
/// tick actually turns into a fetch.
const LOG_TICK: Duration = Duration::from_millis(250);

fn load_config() -> Config {
    let base_url =
        std::env::var("ROC_DAEMON_URL").unwrap_or_else(|_| DEFAULT_DAEMON_URL.to_string());
    let poll_secs = std::env::var("ROC_POLL_SECS")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(DEFAULT_POLL_SECS);
    let log_capacity = std::env::var("ROC_LOG_CAPACITY")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(DEFAULT_LOG_CAPACITY);
    Config {
        base_url,
        poll_interval: Duration::from_secs(poll_secs.max(1)),
        log_capacity,
    }
}

/// Tracing output would corrupt the terminal while the alternate screen is
/// active, so it is sunk unless explicitly requested.
fn init_logging() {
    let filter = EnvFilter::try_from_env("ROC_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var_os("ROC_LOG_STDERR").is_some() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::sink)
            .init();
    }
}

fn spawn_queue_fetch(client: DaemonClient, tx: mpsc::Sender<FetchResult>) {
    tokio::spawn(async move {
        let result = client.fetch_queue().await;
        let _ = tx.send(FetchResult::Queue(result)).await;
    });
}

fn spawn_log_fetch(client: DaemonClient, plan: FetchPlan, tx: mpsc::Sender<FetchResult>) {
    tokio::spawn(async move {
        let key = plan.key.clone();
        let result = fetch_log_batch(&client, plan).await;
        let _ = tx.send(FetchResult::Logs { key, result }).await;
    });
}

async fn fetch_log_batch(
    client: &DaemonClient,
    plan: FetchPlan,
) -> Result<BatchOutcome, roc_client::TransportError> {
    match plan.key {
        SourceKey::Daemon { filter } => {
            let query = match plan.mode {
                FetchMode::Tail { limit } => LogQuery {
                    limit,
                    tail: true,
                    level: filter.level,
                    component: filter.component,
                    lane: filter.lane,
                    request_id: filter.request_id,
                    ..LogQuery::default()
                },
                FetchMode::Resume { cursor, limit } => LogQuery {
                    since: cursor,
                    limit,
                    level: filter.level,
                    component: filter.component,
                    lane: filter.lane,
                    request_id: filter.request_id,
                    ..LogQuery::default()
                },
            };
            let batch = client.fetch_logs(&query).await?;
            let lines = batch.events.iter().map(LogLine::from_event).collect();
            let outcome = match plan.mode {
                FetchMode::Tail { .. } => BatchOutcome::Tail {
                    lines,
                    next: batch.next,
                },
                FetchMode::Resume { .. } => BatchOutcome::Resume {
                    lines,
                    next: batch.next,
                },
            };
            Ok(outcome)
        }
        SourceKey::Item { id } => {
            let (offset, limit) = match plan.mode {
                FetchMode::Tail { limit } => (0, limit),
                FetchMode::Resume { cursor, limit } => (cursor, limit),
            };
            let chunk = client.fetch_log_tail(id, offset, limit).await?;
            let lines = LogLine::from_chunk(&chunk);
            let outcome = match plan.mode {
                FetchMode::Tail { .. } => BatchOutcome::Tail {
                    lines,
                    next: chunk.offset,
                },
                FetchMode::Resume { .. } => BatchOutcome::Resume {
                    lines,
                    next: chunk.offset,
                },
            };
            Ok(outcome)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_logging();
    let config = load_config();
    let client = DaemonClient::new(&config.base_url)?;
    let mut app = App::new(config);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut app, client).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    client: DaemonClient,
) -> Result<(), Box<dyn Error>> {
    let (tx, mut rx) = mpsc::channel::<FetchResult>(32);
    let mut events = EventStream::new();
    let mut queue_ticker = tokio::time::interval(app.config.poll_interval);
    let mut log_ticker = tokio::time::interval(LOG_TICK);

    loop {
        terminal.draw(|f| ui::render(f, app))?;

        tokio::select! {
            _ = queue_ticker.tick() => {
                if !app.queue_in_flight {
                    app.queue_in_flight = true;
                    spawn_queue_fetch(client.clone(), tx.clone());
                }
            }
            _ = log_ticker.tick() => {
                let force = app.take_force_log_fetch();
                if force || app.view == View::Logs {
                    if let Some(plan) = app.store.plan_fetch(Instant::now(), force) {
                        spawn_log_fetch(client.clone(), plan, tx.clone());
                    }
                }
            }
            Some(result) = rx.recv() => {
                app.apply_fetch(result);
            }
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(event)) => app.handle_event(event),
                    Some(Err(err)) => {
                        warn!(event = "terminal_event_error", error = %err);
                    }
                    None => break,
                }
            }
        }

        if app.should_quit() {
            break;
        }
    }

    Ok(())
}
