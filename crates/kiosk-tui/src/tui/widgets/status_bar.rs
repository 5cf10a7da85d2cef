// Status bar widget: data freshness, check-in progress, printer or tabs.

use kiosk_core::protocol::Snapshot;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::protocol::{DashTab, Screen};
use crate::tui::ViewState;

/// Render the status bar into the given area.
///
/// Layout: [data indicator] [checked/total] then the printer target on the
/// kiosk, or the tab bar and last export result on the dashboard.
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState, snapshot: &Snapshot) {
    let mut spans = Vec::new();

    let (dot, dot_color) = data_indicator(state.generation);
    spans.push(Span::styled(format!(" {dot} "), Style::default().fg(dot_color)));

    spans.push(Span::styled(
        progress_label(snapshot),
        Style::default().fg(Color::White),
    ));
    spans.push(Span::styled(" | ", Style::default().fg(Color::Gray)));

    match state.screen {
        Screen::Kiosk => {
            let printer = state.printer_target.as_deref().unwrap_or("нет принтера");
            spans.push(Span::styled(
                format!("Принтер: {printer}"),
                Style::default().fg(Color::White),
            ));
        }
        Screen::Dash => {
            spans.extend(tab_spans(state.dash_tab));
            if let Some(message) = &state.status_message {
                spans.push(Span::styled(" | ", Style::default().fg(Color::Gray)));
                spans.push(Span::styled(message.clone(), Style::default().fg(Color::Yellow)));
            }
        }
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

/// Green once a dataset has been loaded, red before that.
pub fn data_indicator(generation: u64) -> (&'static str, Color) {
    if generation > 0 {
        ("●", Color::Green)
    } else {
        ("●", Color::Red)
    }
}

pub fn progress_label(snapshot: &Snapshot) -> String {
    if snapshot.participants.is_empty() {
        return "Загрузка данных...".to_string();
    }
    format!(
        "Отмечено {}/{}",
        snapshot.checked_count(),
        snapshot.participants.len()
    )
}

/// Build tab indicator spans with the active tab highlighted, e.g.
/// "[1:Участники] [2:Команды] [3:Заполненность]".
pub fn tab_spans(active: DashTab) -> Vec<Span<'static>> {
    let tabs = [
        (DashTab::Participants, "1:Участники"),
        (DashTab::Teams, "2:Команды"),
        (DashTab::Fullness, "3:Заполненность"),
    ];

    let mut spans = Vec::new();
    for (tab, label) in tabs {
        let style = if tab == active {
            Style::default()
                .fg(Color::Black)
                .bg(Color::White)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        spans.push(Span::styled(format!("[{label}]"), style));
        spans.push(Span::raw(" "));
    }
    spans
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
