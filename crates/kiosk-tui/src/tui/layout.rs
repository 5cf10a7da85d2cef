// Screen layout: panel arrangement and sizing.
//
// Kiosk screen:
//
// +--------------------------------------------------+
// | Status Bar (1 row)                                |
// +--------------------------------------------------+
// | Typed surname (3 rows)                            |
// +-------------------------+------------------------+
// | Keypad (60%)             | Namesakes (40%)        |
// +-------------------------+------------------------+
// | Help Bar (1 row)                                  |
// +--------------------------------------------------+
//
// Dashboard screen: status bar, one tab-switched main panel, help bar.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Resolved screen areas for the visitor keypad.
#[derive(Debug, Clone)]
pub struct KioskLayout {
    pub status_bar: Rect,
    /// The surname typed so far.
    pub name: Rect,
    pub keypad: Rect,
    /// Namesake choice, or instructions while typing.
    pub side_panel: Rect,
    pub help_bar: Rect,
}

/// Resolved screen areas for the staff dashboard.
#[derive(Debug, Clone)]
pub struct DashLayout {
    pub status_bar: Rect,
    pub main_panel: Rect,
    pub help_bar: Rect,
}

pub fn build_kiosk_layout(area: Rect) -> KioskLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // status bar
            Constraint::Length(3), // typed surname
            Constraint::Min(8),    // keypad + namesakes
            Constraint::Length(1), // help bar
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(vertical[2]);

    KioskLayout {
        status_bar: vertical[0],
        name: vertical[1],
        keypad: horizontal[0],
        side_panel: horizontal[1],
        help_bar: vertical[3],
    }
}

pub fn build_dash_layout(area: Rect) -> DashLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(area);

    DashLayout {
        status_bar: vertical[0],
        main_panel: vertical[1],
        help_bar: vertical[2],
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
