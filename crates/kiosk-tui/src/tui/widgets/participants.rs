// Participants table: every participant with team, school, class and check-in
// time. Checked-in rows are green, the rest red.

use kiosk_core::dashboard::{format_checked_time, participant_rows, ParticipantRow};
use kiosk_core::protocol::Snapshot;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Row, Table};
use ratatui::Frame;

use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState, snapshot: &Snapshot) {
    let rows = participant_rows(snapshot);

    let header = Row::new(vec![
        Cell::from("Команда"),
        Cell::from("ID"),
        Cell::from("Имя"),
        Cell::from("Фамилия"),
        Cell::from("Школа"),
        Cell::from("Класс"),
        Cell::from("Время"),
    ])
    .style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD));

    // Keep the last row visible however far the user scrolled.
    let first = state.scroll.min(rows.len().saturating_sub(1));
    let body: Vec<Row> = rows.iter().skip(first).map(table_row).collect();

    let widths = [
        Constraint::Min(14),
        Constraint::Length(8),
        Constraint::Length(14),
        Constraint::Length(16),
        Constraint::Length(16),
        Constraint::Length(6),
        Constraint::Length(19),
    ];

    let title = format!(
        " Участники ({}/{}) ",
        snapshot.checked_count(),
        snapshot.participants.len()
    );
    let table = Table::new(body, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title));

    frame.render_widget(table, area);
}

fn table_row(row: &ParticipantRow<'_>) -> Row<'static> {
    let p = row.participant;
    Row::new(vec![
        Cell::from(row.team_name().to_string()),
        Cell::from(row.team_tid().to_string()),
        Cell::from(p.first_name.clone()),
        Cell::from(p.last_name.clone()),
        Cell::from(p.school.clone()),
        Cell::from(p.classname.clone()),
        Cell::from(format_checked_time(p.time_checked)),
    ])
    .style(Style::default().fg(checked_color(p.is_checked())))
}

pub fn checked_color(checked: bool) -> Color {
    if checked {
        Color::Green
    } else {
        Color::Red
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
