// Teams table: one row per team with check-in count, schools, classes and
// members. Row color follows the team's status.

use kiosk_core::dashboard::{team_rows, TeamRow, TeamStatus};
use kiosk_core::protocol::Snapshot;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Row, Table};
use ratatui::Frame;

use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState, snapshot: &Snapshot) {
    let rows = team_rows(snapshot);
    let complete = rows
        .iter()
        .filter(|r| r.status() == TeamStatus::Complete)
        .count();

    let header = Row::new(vec![
        Cell::from("Команда"),
        Cell::from("ID"),
        Cell::from("Пришли"),
        Cell::from("Школы"),
        Cell::from("Классы"),
        Cell::from("Участники"),
    ])
    .style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD));

    // Keep the last row visible however far the user scrolled.
    let first = state.scroll.min(rows.len().saturating_sub(1));
    let body: Vec<Row> = rows.iter().skip(first).map(table_row).collect();

    let widths = [
        Constraint::Min(16),
        Constraint::Length(8),
        Constraint::Length(7),
        Constraint::Length(18),
        Constraint::Length(10),
        Constraint::Min(30),
    ];

    let title = format!(" Команды (в полном составе {complete}/{}) ", rows.len());
    let table = Table::new(body, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title));

    frame.render_widget(table, area);
}

fn table_row(row: &TeamRow<'_>) -> Row<'static> {
    let members: Vec<String> = row
        .participants
        .iter()
        .map(|p| {
            let mark = if p.is_checked() { "+" } else { "-" };
            format!("{mark}{} {}", p.last_name, p.first_name)
        })
        .collect();

    Row::new(vec![
        Cell::from(row.team.name.clone()),
        Cell::from(row.team.tid.clone().unwrap_or_default()),
        Cell::from(format!("{}/{}", row.checked(), row.participants.len())),
        Cell::from(row.schools.clone()),
        Cell::from(row.classnames.clone()),
        Cell::from(members.join(", ")),
    ])
    .style(Style::default().fg(status_color(row.status())))
}

pub fn status_color(status: TeamStatus) -> Color {
    match status {
        TeamStatus::Complete => Color::Green,
        TeamStatus::Partial => Color::Yellow,
        TeamStatus::Absent => Color::Red,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
