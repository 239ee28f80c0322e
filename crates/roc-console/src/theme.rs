use ratatui::style::{Color, Modifier, Style};
use roc_core::{Stage, StageCell};

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Rgb(142, 192, 124))
    .add_modifier(Modifier::BOLD);
pub const SELECTED_STYLE: Style = Style::new()
    .bg(Color::Rgb(131, 165, 152))
    .fg(Color::Black)
    .add_modifier(Modifier::BOLD);
pub const BANNER_STYLE: Style = Style::new()
    .bg(Color::Rgb(204, 36, 29))
    .fg(Color::Rgb(251, 241, 199))
    .add_modifier(Modifier::BOLD);
pub const MATCH_STYLE: Style = Style::new()
    .fg(Color::Rgb(250, 189, 47))
    .add_modifier(Modifier::BOLD);
pub const CURRENT_MATCH_STYLE: Style = Style::new()
    .bg(Color::Rgb(250, 189, 47))
    .fg(Color::Black)
    .add_modifier(Modifier::BOLD);
pub const DIM_STYLE: Style = Style::new().fg(Color::Rgb(146, 131, 116));
pub const ERROR_STYLE: Style = Style::new().fg(Color::Rgb(254, 128, 25));

pub mod icons {
    pub const COMPLETE: &str = "x";
    pub const CURRENT: &str = ">";
    pub const PARTIAL: &str = "~";
    pub const PENDING: &str = ".";
    pub const ACTIVE_UNIT: &str = "*";
}

pub fn stage_color(stage: Stage) -> Color {
    match stage {
        Stage::Planned => Color::Rgb(146, 131, 116),
        Stage::Identifying | Stage::Identified => Color::Rgb(69, 133, 136),
        Stage::Ripping | Stage::Ripped => Color::Rgb(131, 165, 152),
        Stage::Encoding | Stage::Encoded => Color::Rgb(250, 189, 47),
        Stage::Subtitling | Stage::Subtitled => Color::Rgb(211, 134, 155),
        Stage::Organizing => Color::Rgb(254, 128, 25),
        Stage::Final => Color::Rgb(184, 187, 38),
    }
}

/// Three-way stage state: complete, current/partial (in progress), pending.
pub fn cell_style(cell: &StageCell) -> Style {
    if cell.complete {
        Style::new().fg(Color::Rgb(184, 187, 38))
    } else if cell.current {
        Style::new()
            .fg(Color::Rgb(250, 189, 47))
            .add_modifier(Modifier::BOLD)
    } else if cell.partial() {
        Style::new().fg(Color::Rgb(254, 128, 25))
    } else {
        DIM_STYLE
    }
}

pub fn cell_icon(cell: &StageCell) -> &'static str {
    if cell.complete {
        icons::COMPLETE
    } else if cell.current {
        icons::CURRENT
    } else if cell.partial() {
        icons::PARTIAL
    } else {
        icons::PENDING
    }
}
