// Keypad widget: the configured alphabet as a grid of keys. Only letters that
// can continue some surname are lit; the rest are dimmed and ignored. A space
// key is appended whenever a multi-word surname may continue with one.

use kiosk_core::entry::candidate_names;
use kiosk_core::protocol::Snapshot;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::tui::ViewState;

/// Rendered width of one key, "[ А ]", plus the gap after it.
const KEY_WIDTH: u16 = 6;

/// Shown on the space key; typed as ' ' (or '-').
const SPACE_LABEL: char = '␣';

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState, snapshot: &Snapshot) {
    let candidates = candidate_names(snapshot);
    let per_row = keys_per_row(area.width.saturating_sub(2));

    let mut keys = state.alphabet.clone();
    if state.entry.might_be_next(' ', &candidates) {
        keys.push(' ');
    }

    let lines: Vec<Line> = keys
        .chunks(per_row)
        .flat_map(|row| {
            let keys: Vec<Span> = row
                .iter()
                .flat_map(|&letter| {
                    let enabled = state.entry.might_be_next(letter, &candidates);
                    let label = if letter == ' ' { SPACE_LABEL } else { letter };
                    [
                        Span::styled(format!("[ {label} ]"), key_style(enabled)),
                        Span::raw(" "),
                    ]
                })
                .collect();
            // Blank line between key rows.
            [Line::from(keys), Line::default()]
        })
        .collect();

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Выберите букву "),
    );
    frame.render_widget(paragraph, area);
}

/// How many keys fit into `inner_width` columns; at least one.
pub fn keys_per_row(inner_width: u16) -> usize {
    usize::from(((inner_width + 1) / KEY_WIDTH).max(1))
}

pub fn key_style(enabled: bool) -> Style {
    if enabled {
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use kiosk_core::protocol::Participant;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    #[test]
    fn keys_per_row_bounds() {
        assert_eq!(keys_per_row(0), 1);
        assert_eq!(keys_per_row(5), 1);
        assert_eq!(keys_per_row(11), 2);
        assert_eq!(keys_per_row(58), 9);
    }

    #[test]
    fn key_style_dims_disabled_letters() {
        assert_eq!(key_style(false).fg, Some(Color::DarkGray));
        assert!(key_style(true).add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn only_possible_letters_are_lit() {
        let snap = Snapshot {
            teams: vec![],
            participants: vec![Participant {
                team: "T".into(),
                first_name: "Олег".into(),
                last_name: "Сидоров".into(),
                school: String::new(),
                classname: String::new(),
                time_checked: None,
            }],
        };
        let state = ViewState::default();
        let mut terminal = Terminal::new(TestBackend::new(62, 14)).unwrap();
        terminal
            .draw(|frame| render(frame, frame.area(), &state, &snap))
            .unwrap();

        let buffer = terminal.backend().buffer();
        let lit: String = buffer
            .content()
            .iter()
            .filter(|cell| cell.fg == Color::White && cell.modifier.contains(Modifier::BOLD))
            .map(|cell| cell.symbol())
            .collect::<String>()
            .replace(['[', ']', ' '], "");
        assert_eq!(lit, "С");
    }

    #[test]
    fn space_key_appears_when_a_word_may_follow() {
        let person = |last: &str| Participant {
            team: "T".into(),
            first_name: "Анна".into(),
            last_name: last.into(),
            school: String::new(),
            classname: String::new(),
            time_checked: None,
        };
        let snap = Snapshot {
            teams: vec![],
            participants: vec![person("Смит"), person("Смит-Джонс")],
        };
        let mut state = ViewState::default();
        state.entry.press('с', &candidate_names(&snap));
        assert_eq!(state.entry.typed(), "СМИТ");

        let mut terminal = Terminal::new(TestBackend::new(62, 14)).unwrap();
        terminal
            .draw(|frame| render(frame, frame.area(), &state, &snap))
            .unwrap();
        let lit: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .filter(|cell| cell.fg == Color::White && cell.modifier.contains(Modifier::BOLD))
            .map(|cell| cell.symbol())
            .collect::<String>()
            .replace(['[', ']', ' '], "");
        assert_eq!(lit, "␣");
    }

    #[test]
    fn no_space_key_while_a_single_word_is_typed() {
        let snap = Snapshot {
            teams: vec![],
            participants: vec![Participant {
                team: "T".into(),
                first_name: "Олег".into(),
                last_name: "Сидоров".into(),
                school: String::new(),
                classname: String::new(),
                time_checked: None,
            }],
        };
        let state = ViewState::default();
        let mut terminal = Terminal::new(TestBackend::new(62, 14)).unwrap();
        terminal
            .draw(|frame| render(frame, frame.area(), &state, &snap))
            .unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(!text.contains('␣'));
    }
}
