// TUI: layout, input handling, and widget rendering for both the visitor
// keypad and the staff dashboard.
//
// The TUI owns a `ViewState` with everything that is purely local to the
// screen (typed surname, selected tab, transient notice). The dataset itself
// is never copied: each frame and each key press reads `store.current()`.

pub mod input;
pub mod layout;
pub mod widgets;

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use kiosk_core::config::DEFAULT_ALPHABET;
use kiosk_core::entry::{candidate_names, NameEntry};
use kiosk_core::protocol::Snapshot;
use kiosk_core::store::SnapshotStore;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::protocol::{DashTab, Screen, UiUpdate, UserCommand};

use layout::{build_dash_layout, build_kiosk_layout};

/// How long a notice stays on screen.
pub const NOTICE_TTL: Duration = Duration::from_secs(4);

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// A notice currently on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveNotice {
    pub text: String,
    pub shown_at: Instant,
}

/// TUI-local state.
pub struct ViewState {
    pub screen: Screen,
    /// Keypad state (kiosk screen).
    pub entry: NameEntry,
    /// Letters shown on the keypad, in display order.
    pub alphabet: Vec<char>,
    /// Highlighted namesake while choosing.
    pub selected_choice: usize,
    /// Active dashboard tab.
    pub dash_tab: DashTab,
    /// First visible row of the dashboard tables.
    pub scroll: usize,
    pub notice: Option<ActiveNotice>,
    /// Generation of the newest snapshot announced by the app; 0 until the
    /// first dataset arrives.
    pub generation: u64,
    pub printer_target: Option<String>,
    /// Result of the last dashboard action (export).
    pub status_message: Option<String>,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState::new(Screen::Kiosk, DEFAULT_ALPHABET, None)
    }
}

impl ViewState {
    pub fn new(screen: Screen, alphabet: &str, printer_target: Option<String>) -> Self {
        ViewState {
            screen,
            entry: NameEntry::new(),
            alphabet: alphabet.chars().filter(|c| !c.is_whitespace()).collect(),
            selected_choice: 0,
            dash_tab: DashTab::default(),
            scroll: 0,
            notice: None,
            generation: 0,
            printer_target,
            status_message: None,
        }
    }

    /// Drop the notice once it has been visible for [`NOTICE_TTL`].
    pub fn expire_notice(&mut self, now: Instant) {
        if self
            .notice
            .as_ref()
            .is_some_and(|n| now.saturating_duration_since(n.shown_at) >= NOTICE_TTL)
        {
            self.notice = None;
        }
    }
}

// ---------------------------------------------------------------------------
// UiUpdate processing
// ---------------------------------------------------------------------------

/// Apply a single UiUpdate to the ViewState. `snapshot` is the store's
/// current dataset.
pub fn apply_ui_update(state: &mut ViewState, update: UiUpdate, snapshot: &Snapshot, now: Instant) {
    match update {
        UiUpdate::SnapshotReplaced { generation } => {
            state.generation = generation;
            state.entry.refresh(&candidate_names(snapshot));
        }
        UiUpdate::Notice(notice) => {
            state.notice = Some(ActiveNotice {
                text: notice.text().to_string(),
                shown_at: now,
            });
        }
        UiUpdate::Exported(paths) => {
            let names: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
            state.status_message = Some(format!("Сохранено: {}", names.join(", ")));
        }
        UiUpdate::ExportFailed(message) => {
            state.status_message = Some(format!("Ошибка экспорта: {message}"));
        }
    }
}

// ---------------------------------------------------------------------------
// Render frame
// ---------------------------------------------------------------------------

/// Render the complete frame for the active screen.
pub fn render_frame(frame: &mut Frame, state: &ViewState, snapshot: &Snapshot) {
    match state.screen {
        Screen::Kiosk => {
            let layout = build_kiosk_layout(frame.area());
            widgets::status_bar::render(frame, layout.status_bar, state, snapshot);
            widgets::name_display::render(frame, layout.name, state, snapshot);
            widgets::keypad::render(frame, layout.keypad, state, snapshot);
            widgets::namesakes::render(frame, layout.side_panel, state);
            render_help_bar(frame, layout.help_bar, state.screen);
        }
        Screen::Dash => {
            let layout = build_dash_layout(frame.area());
            widgets::status_bar::render(frame, layout.status_bar, state, snapshot);
            match state.dash_tab {
                DashTab::Participants => {
                    widgets::participants::render(frame, layout.main_panel, state, snapshot)
                }
                DashTab::Teams => widgets::teams::render(frame, layout.main_panel, state, snapshot),
                DashTab::Fullness => widgets::fullness::render(frame, layout.main_panel, snapshot),
            }
            render_help_bar(frame, layout.help_bar, state.screen);
        }
    }

    if let Some(notice) = &state.notice {
        widgets::notice::render(frame, frame.area(), &notice.text);
    }
}

/// Keyboard hints for the active screen.
pub fn help_text(screen: Screen) -> &'static str {
    match screen {
        Screen::Kiosk => " Буквы:ввод | Enter:далее | Esc:сброс | 1-9:выбор | Backspace:отмена выбора",
        Screen::Dash => " Tab/1-3:вкладки | ↑↓:прокрутка | e:экспорт CSV | q:выход",
    }
}

fn render_help_bar(frame: &mut Frame, area: ratatui::layout::Rect, screen: Screen) {
    let paragraph = Paragraph::new(Line::from(vec![Span::styled(
        help_text(screen),
        Style::default().fg(Color::White).add_modifier(Modifier::DIM),
    )]))
    .style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}

// ---------------------------------------------------------------------------
// Main TUI loop
// ---------------------------------------------------------------------------

/// Run the TUI event loop.
///
/// 1. Initializes the terminal (enters raw mode, enables alternate screen).
/// 2. Installs a panic hook to restore the terminal on crash.
/// 3. Runs an async select loop: UI updates, keyboard input, render ticks.
/// 4. Restores the terminal on exit.
///
/// Returns when the user quits or the app closes `ui_rx`.
pub async fn run(
    store: Arc<SnapshotStore>,
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
    mut view_state: ViewState,
) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = ratatui::restore();
        original_hook(panic_info);
    }));

    let mut event_stream = EventStream::new();

    // ~30fps
    let mut render_tick = tokio::time::interval(Duration::from_millis(33));
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let result: anyhow::Result<()> = loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(update) => {
                        let snapshot = store.current();
                        apply_ui_update(&mut view_state, update, &snapshot, Instant::now());
                    }
                    None => {
                        debug!("UI channel closed, leaving TUI");
                        break Ok(());
                    }
                }
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        let snapshot = store.current();
                        if let Some(cmd) = input::handle_key(key_event, &mut view_state, &snapshot) {
                            let quit = cmd == UserCommand::Quit;
                            let _ = cmd_tx.send(cmd).await;
                            if quit {
                                break Ok(());
                            }
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("Terminal input error: {e}");
                        break Err(e.into());
                    }
                    None => break Ok(()),
                }
            }

            _ = render_tick.tick() => {
                view_state.expire_notice(Instant::now());
                let snapshot = store.current();
                if let Err(e) = terminal.draw(|frame| render_frame(frame, &view_state, &snapshot)) {
                    break Err(e.into());
                }
            }
        }
    };

    ratatui::restore();
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
