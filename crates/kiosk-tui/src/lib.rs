// Library root: terminal front end for the check-in kiosk. Exposes the app
// orchestrator and the TUI so the binary and tests share one code path.

pub mod app;
pub mod protocol;
pub mod tui;
