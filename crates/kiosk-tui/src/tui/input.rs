// Keyboard input handling and command dispatch.
//
// Translates crossterm key events into `UserCommand`s for the app
// orchestrator, or into local ViewState mutations (typing, tab switching,
// scrolling). Candidate surnames are re-derived from the snapshot passed in,
// so a key press always acts on the latest dataset.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use kiosk_core::entry::{candidate_names, Confirmation, Mode};
use kiosk_core::protocol::Snapshot;
use tracing::debug;

use super::ViewState;
use crate::protocol::{DashTab, Screen, UserCommand};

/// Handle a keyboard event.
///
/// Returns `Some(UserCommand)` when the key press should be forwarded to the
/// app orchestrator, `None` when it was handled locally.
pub fn handle_key(
    key_event: KeyEvent,
    view_state: &mut ViewState,
    snapshot: &Snapshot,
) -> Option<UserCommand> {
    // Only process key press events. On Windows, crossterm emits both
    // Press and Release events for each physical keypress.
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    // Ctrl+C always quits, on every screen.
    if key_event.modifiers.contains(KeyModifiers::CONTROL) && key_event.code == KeyCode::Char('c') {
        return Some(UserCommand::Quit);
    }

    match view_state.screen {
        Screen::Kiosk => match view_state.entry.mode() {
            Mode::Typing => handle_typing(key_event, view_state, snapshot),
            Mode::Choosing => handle_choosing(key_event, view_state, snapshot),
        },
        Screen::Dash => handle_dash(key_event, view_state),
    }
}

/// Keypad while typing a surname.
fn handle_typing(
    key_event: KeyEvent,
    view_state: &mut ViewState,
    snapshot: &Snapshot,
) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char(c) if c.is_alphabetic() || c == ' ' || c == '-' => {
            let candidates = candidate_names(snapshot);
            let letter = if c == '-' { ' ' } else { c };
            view_state.entry.press(letter, &candidates);
            None
        }
        KeyCode::Esc => {
            view_state.entry.reset(&candidate_names(snapshot));
            None
        }
        KeyCode::Enter => match view_state.entry.confirm(snapshot) {
            Confirmation::Register(participant) => Some(UserCommand::Register(participant)),
            Confirmation::Choose(n) => {
                debug!(namesakes = n, "showing namesake choice");
                view_state.selected_choice = 0;
                None
            }
            Confirmation::Incomplete => None,
        },
        _ => None,
    }
}

/// Namesake choice: digits pick directly, arrows + Enter pick the highlighted
/// row, Backspace returns to typing, Esc starts over.
fn handle_choosing(
    key_event: KeyEvent,
    view_state: &mut ViewState,
    snapshot: &Snapshot,
) -> Option<UserCommand> {
    let count = view_state.entry.choices().len();
    match key_event.code {
        KeyCode::Char(c @ '1'..='9') => {
            let index = c as usize - '1' as usize;
            view_state
                .entry
                .choose(index, &candidate_names(snapshot))
                .map(UserCommand::Register)
        }
        KeyCode::Up => {
            view_state.selected_choice = view_state.selected_choice.saturating_sub(1);
            None
        }
        KeyCode::Down => {
            if view_state.selected_choice + 1 < count {
                view_state.selected_choice += 1;
            }
            None
        }
        KeyCode::Enter => view_state
            .entry
            .choose(view_state.selected_choice, &candidate_names(snapshot))
            .map(UserCommand::Register),
        KeyCode::Backspace => {
            view_state.entry.cancel_choice();
            None
        }
        KeyCode::Esc => {
            view_state.entry.reset(&candidate_names(snapshot));
            None
        }
        _ => None,
    }
}

fn handle_dash(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Tab => {
            switch_tab(view_state, view_state.dash_tab.next());
            None
        }
        KeyCode::Char('1') => {
            switch_tab(view_state, DashTab::Participants);
            None
        }
        KeyCode::Char('2') => {
            switch_tab(view_state, DashTab::Teams);
            None
        }
        KeyCode::Char('3') => {
            switch_tab(view_state, DashTab::Fullness);
            None
        }
        KeyCode::Up | KeyCode::Char('k') => {
            view_state.scroll = view_state.scroll.saturating_sub(1);
            None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            view_state.scroll += 1;
            None
        }
        KeyCode::PageUp => {
            view_state.scroll = view_state.scroll.saturating_sub(page_size());
            None
        }
        KeyCode::PageDown => {
            view_state.scroll += page_size();
            None
        }
        KeyCode::Char('e') => Some(UserCommand::Export),
        KeyCode::Char('q') => Some(UserCommand::Quit),
        _ => None,
    }
}

fn switch_tab(view_state: &mut ViewState, tab: DashTab) {
    if view_state.dash_tab != tab {
        view_state.dash_tab = tab;
        view_state.scroll = 0;
    }
}

/// Rows moved by PageUp/PageDown.
fn page_size() -> usize {
    20
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
