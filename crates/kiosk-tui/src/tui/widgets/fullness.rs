// Team fullness chart: share of checked-in members per team as horizontal
// text bars with the full team name on the left.

use kiosk_core::dashboard::fullness_by_team;
use kiosk_core::protocol::Snapshot;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

/// Widest team-name column before bars start.
const MAX_LABEL_WIDTH: usize = 32;
/// Room for " 100%".
const PERCENT_WIDTH: usize = 5;

pub fn render(frame: &mut Frame, area: Rect, snapshot: &Snapshot) {
    let teams = fullness_by_team(snapshot);
    let label_width = teams
        .iter()
        .map(|(name, _)| name.chars().count())
        .max()
        .unwrap_or(0)
        .min(MAX_LABEL_WIDTH);
    let inner = usize::from(area.width.saturating_sub(2));
    let bar_width = inner.saturating_sub(label_width + PERCENT_WIDTH + 2);

    let lines: Vec<Line> = teams
        .iter()
        .map(|(name, share)| {
            let (filled, empty) = bar_cells(*share, bar_width);
            Line::from(vec![
                Span::raw(format!("{name:<label_width$}  ")),
                Span::styled("█".repeat(filled), Style::default().fg(share_color(*share))),
                Span::styled("░".repeat(empty), Style::default().fg(Color::DarkGray)),
                Span::raw(format!("{:>4.0}%", share * 100.0)),
            ])
        })
        .collect();

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Заполненность команд "),
    );
    frame.render_widget(paragraph, area);
}

/// Split `width` cells into filled and empty parts for `share` in [0, 1].
pub fn bar_cells(share: f64, width: usize) -> (usize, usize) {
    let filled = ((share.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    (filled, width - filled)
}

pub fn share_color(share: f64) -> Color {
    if share >= 1.0 {
        Color::Green
    } else if share > 0.0 {
        Color::Yellow
    } else {
        Color::Red
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
