// Typed surname panel. The border turns green once the typed text is a full
// surname and Enter will do something.

use kiosk_core::entry::{candidate_names, is_complete};
use kiosk_core::protocol::Snapshot;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState, snapshot: &Snapshot) {
    let typed = state.entry.typed();
    let complete = is_complete(typed, &candidate_names(snapshot));

    let (border, title) = if complete {
        (Color::Green, " Фамилия: Enter - далее ")
    } else {
        (Color::White, " Фамилия ")
    };

    let line = Line::from(vec![
        Span::styled(
            typed.to_string(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::styled("_", Style::default().fg(Color::Gray).add_modifier(Modifier::SLOW_BLINK)),
    ]);

    let paragraph = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(title),
    );
    frame.render_widget(paragraph, area);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
