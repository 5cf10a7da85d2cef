// Messages between the app orchestrator and the TUI.

use std::path::PathBuf;

use kiosk_core::protocol::{Notice, Participant};

/// Which front end the TUI is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Visitor-facing keypad.
    Kiosk,
    /// Staff dashboard.
    Dash,
}

/// Dashboard tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DashTab {
    #[default]
    Participants,
    Teams,
    Fullness,
}

impl DashTab {
    pub fn next(self) -> Self {
        match self {
            DashTab::Participants => DashTab::Teams,
            DashTab::Teams => DashTab::Fullness,
            DashTab::Fullness => DashTab::Participants,
        }
    }
}

/// Commands sent from the TUI to the app orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    /// Check this participant in and print their ticket.
    Register(Participant),
    /// Write the dashboard tables to CSV.
    Export,
    Quit,
}

/// Updates pushed from the app orchestrator to the TUI.
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    /// The store holds a new snapshot; the next frame will show it.
    SnapshotReplaced { generation: u64 },
    /// Transient message for the visitor.
    Notice(Notice),
    Exported(Vec<PathBuf>),
    ExportFailed(String),
}

/// Why the app loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppExit {
    Quit,
    /// The client build changed on the server; restart the process.
    Reload,
}

impl AppExit {
    /// Process exit code: `EX_TEMPFAIL` asks the supervisor for a restart.
    pub fn code(self) -> i32 {
        match self {
            AppExit::Quit => 0,
            AppExit::Reload => 75,
        }
    }
}
