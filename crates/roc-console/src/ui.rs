use crate::state::{App, FilterField, View};
use crate::theme::{self, icons};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Table, Wrap},
    Frame,
};
use roc_core::{project, resolve_active_unit};

pub fn render(f: &mut Frame, app: &mut App) {
    let area = f.size();
    let banner_height = u16::from(app.transport_banner.is_some());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(banner_height),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area);

    if let Some(message) = &app.transport_banner {
        let banner = Paragraph::new(format!(" daemon unreachable: {message} (retrying)"))
            .style(theme::BANNER_STYLE);
        f.render_widget(banner, chunks[0]);
    }

    match app.view {
        View::Queue => render_queue(f, app, chunks[1]),
        View::Logs => render_logs(f, app, chunks[1]),
    }

    render_footer(f, app, chunks[2]);
}

fn render_queue(f: &mut Frame, app: &mut App, area: Rect) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    render_item_table(f, app, halves[0]);
    render_item_detail(f, app, halves[1]);
}

fn render_item_table(f: &mut Frame, app: &mut App, area: Rect) {
    if app.items.is_empty() {
        let block = Block::default().borders(Borders::ALL).title("Queue");
        let inner = block.inner(area);
        f.render_widget(block, area);
        let text = vec![
            Line::from(Span::styled("Queue is empty", theme::DIM_STYLE)),
            Line::from(""),
            Line::from(format!("daemon: {}", app.config.base_url)),
        ];
        f.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }), inner);
        return;
    }

    let rows: Vec<Row> = app
        .items
        .iter()
        .map(|item| {
            let stage = item.active_stage();
            let percent = if item.progress.percent > 0.0 {
                format!("{:>5.1}%", item.progress.percent)
            } else {
                String::new()
            };
            Row::new(vec![
                Cell::from(item.id.to_string()),
                Cell::from(item.title.clone()),
                Cell::from(Span::styled(
                    stage.as_str(),
                    Style::default().fg(theme::stage_color(stage)),
                )),
                Cell::from(percent),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(5),
        Constraint::Min(20),
        Constraint::Length(12),
        Constraint::Length(7),
    ];
    let table = Table::new(rows, widths)
        .header(Row::new(vec!["ID", "Title", "Stage", "%"]).style(theme::HEADER_STYLE))
        .block(Block::default().borders(Borders::ALL).title("Queue"))
        .highlight_style(theme::SELECTED_STYLE);
    f.render_stateful_widget(table, area, &mut app.table_state);
}

fn render_item_detail(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Pipeline");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(item) = app.selected_item() else {
        let placeholder = Paragraph::new(Span::styled(
            "No item selected",
            theme::DIM_STYLE,
        ))
        .wrap(Wrap { trim: true });
        f.render_widget(placeholder, inner);
        return;
    };

    let mut lines = Vec::new();
    lines.push(Line::from(Span::styled(
        item.title.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    if !item.progress.message.is_empty() {
        lines.push(Line::from(Span::styled(
            item.progress.message.clone(),
            theme::DIM_STYLE,
        )));
    }
    lines.push(Line::from(""));

    let view = project(item);
    for cell in &view.stages {
        let style = theme::cell_style(cell);
        let counts = if cell.planned > 1 {
            format!(" {}/{}", cell.count, cell.planned)
        } else {
            String::new()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{} ", theme::cell_icon(cell)), style),
            Span::styled(format!("{:<12}", cell.stage.as_str()), style),
            Span::styled(counts, style),
        ]));
    }

    if let Some(encoding) = &item.encoding {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(
                "encode: {} {} {:.1} fps",
                encoding.codec, encoding.preset, encoding.fps
            ),
            theme::DIM_STYLE,
        )));
    }
    if let Some(validation) = &item.validation {
        let (text, style) = if validation.passed {
            ("validation: passed".to_string(), theme::DIM_STYLE)
        } else {
            (
                format!("validation: {}", validation.messages.join("; ")),
                theme::ERROR_STYLE,
            )
        };
        lines.push(Line::from(Span::styled(text, style)));
    }

    if !item.episodes.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Episodes", theme::HEADER_STYLE)));
        let active = resolve_active_unit(item, &item.episodes);
        for (idx, unit) in item.episodes.iter().enumerate() {
            let is_active = active == Some(idx);
            let marker = if is_active { icons::ACTIVE_UNIT } else { " " };
            let stage = unit.normalized_stage();
            let style = if is_active {
                Style::default()
                    .fg(theme::stage_color(stage))
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme::stage_color(stage))
            };
            lines.push(Line::from(vec![
                Span::styled(format!("{marker} "), style),
                Span::styled(format!("{} {}", unit.label(), stage), style),
            ]));
        }
    }

    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

fn render_logs(f: &mut Frame, app: &mut App, area: Rect) {
    if app.filter_draft.is_some() {
        let halves = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(area);
        render_log_lines(f, app, halves[0]);
        render_filter_editor(f, app, halves[1]);
    } else {
        render_log_lines(f, app, area);
    }
}

fn render_log_lines(f: &mut Frame, app: &App, area: Rect) {
    let title = format!("Logs: {}", app.store.source().label());
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let visible = inner.height as usize;
    if visible == 0 {
        return;
    }

    let total = app.store.len();
    // Anchor on the current search match when there is one, otherwise follow
    // the tail minus the manual scroll offset.
    let end = match app.search.as_ref().and_then(|s| s.current_line()) {
        Some(line) => (line + visible / 2 + 1).min(total),
        None => total.saturating_sub(app.log_offset),
    };
    let start = end.saturating_sub(visible);

    let mut lines: Vec<Line> = Vec::with_capacity(visible);
    for idx in start..end {
        let Some(log_line) = app.store.line(idx) else {
            continue;
        };
        let style = match app.search.as_ref() {
            Some(search) if search.current_line() == Some(idx) => theme::CURRENT_MATCH_STYLE,
            Some(search) if search.is_match_line(idx) => theme::MATCH_STYLE,
            _ => Style::default(),
        };
        lines.push(Line::from(Span::styled(log_line.text.clone(), style)));
    }

    if let Some(error) = app.store.fetch_error() {
        lines.push(Line::from(Span::styled(
            format!("! log fetch failed: {error}"),
            theme::ERROR_STYLE,
        )));
    }
    if lines.is_empty() {
        lines.push(Line::from(Span::styled("(no log lines)", theme::DIM_STYLE)));
    }

    f.render_widget(Paragraph::new(lines), inner);
}

fn render_filter_editor(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Filter")
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(draft) = &app.filter_draft else {
        return;
    };

    let fields = [
        FilterField::Level,
        FilterField::Component,
        FilterField::Lane,
        FilterField::Request,
    ];
    let items: Vec<ListItem> = fields
        .iter()
        .map(|&field| {
            let marker = if field == draft.field { "> " } else { "  " };
            let label = format!("{marker}{:<10} {}", field.label(), draft.value(field));
            let style = if field == draft.field {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(Span::styled(label, style)))
        })
        .collect();
    f.render_widget(List::new(items), inner);
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let line = if let Some(input) = &app.search_input {
        let mut spans = vec![Span::raw(format!("/{input}"))];
        if let Some(error) = &app.search_error {
            spans.push(Span::styled(format!("  {error}"), theme::ERROR_STYLE));
        }
        Line::from(spans)
    } else if let Some(search) = &app.search {
        let status = search.status();
        let position = status
            .current
            .map(|pos| format!("{}/{}", pos + 1, status.match_count))
            .unwrap_or_else(|| "no matches".to_string());
        Line::from(Span::styled(
            format!("search '{}': {position}  (n/N navigate, Esc clear)", status.pattern),
            theme::MATCH_STYLE,
        ))
    } else if let Some(note) = &app.status_note {
        Line::from(Span::styled(note.clone(), theme::DIM_STYLE))
    } else {
        let hint = match app.view {
            View::Queue => "j/k select  Enter item logs  L daemon logs  Tab logs  q quit",
            View::Logs => "/ search  f filter  d daemon  r refresh  Esc back  q quit",
        };
        Line::from(Span::styled(hint, theme::DIM_STYLE))
    };
    f.render_widget(Paragraph::new(line), area);
}
