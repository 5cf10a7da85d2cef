// Namesake chooser: lists every participant sharing the typed surname so the
// visitor can pick themselves. Shows instructions while typing.

use kiosk_core::entry::{short_description, Mode};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let (title, lines) = match state.entry.mode() {
        Mode::Typing => (
            " Как пользоваться ",
            vec![
                Line::from("Набирайте фамилию на клавиатуре."),
                Line::from("Очевидные буквы допечатаются сами."),
                Line::from(""),
                Line::from("Когда рамка станет зелёной, нажмите Enter."),
            ],
        ),
        Mode::Choosing => (
            " Кто вы? ",
            state
                .entry
                .choices()
                .iter()
                .enumerate()
                .map(|(i, person)| choice_line(i, &short_description(person), i == state.selected_choice))
                .collect(),
        ),
    };

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(paragraph, area);
}

/// One numbered namesake row; the highlighted one is reversed.
pub fn choice_line(index: usize, description: &str, selected: bool) -> Line<'static> {
    let style = if selected {
        Style::default()
            .fg(Color::Black)
            .bg(Color::White)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };
    Line::from(vec![Span::styled(format!("{}. {description}", index + 1), style)])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
