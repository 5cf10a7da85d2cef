// App orchestrator: wires sync events, user commands and registration notices
// to the TUI.
//
// The orchestrator owns no copy of the dataset. It forwards "snapshot
// replaced" to the TUI, which reads `store.current()` on each frame, and it
// turns user commands into fire-and-forget registration tasks or CSV exports.

use std::path::PathBuf;
use std::sync::Arc;

use kiosk_core::dashboard;
use kiosk_core::protocol::{Notice, SyncEvent};
use kiosk_core::registration::RegistrationGuard;
use kiosk_core::store::SnapshotStore;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::protocol::{AppExit, UiUpdate, UserCommand};

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState {
    pub store: Arc<SnapshotStore>,
    /// `None` on the dashboard, which never registers anyone.
    pub guard: Option<RegistrationGuard>,
    /// Path prefix for CSV exports.
    pub export_stem: PathBuf,
    notice_tx: mpsc::Sender<Notice>,
}

impl AppState {
    pub fn new(
        store: Arc<SnapshotStore>,
        guard: Option<RegistrationGuard>,
        export_stem: PathBuf,
        notice_tx: mpsc::Sender<Notice>,
    ) -> Self {
        Self {
            store,
            guard,
            export_stem,
            notice_tx,
        }
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the app event loop until the user quits or a reload is requested.
///
/// Listens on three channels using `tokio::select!`:
/// 1. Sync events from the pollers
/// 2. Notices from registration tasks
/// 3. User commands from the TUI
///
/// Pushes UI updates through `ui_tx`. Dropping `ui_tx` on return tells the
/// TUI to shut down.
pub async fn run(
    mut sync_rx: mpsc::Receiver<SyncEvent>,
    mut notice_rx: mpsc::Receiver<Notice>,
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
    state: AppState,
) -> anyhow::Result<AppExit> {
    info!("Application event loop started");

    // Once the pollers are gone their channel stays closed; stop polling it
    // so select! does not spin.
    let mut sync_open = true;

    let exit = loop {
        tokio::select! {
            // --- Sync events ---
            event = sync_rx.recv(), if sync_open => {
                match event {
                    Some(SyncEvent::SnapshotReplaced { generation }) => {
                        let _ = ui_tx.send(UiUpdate::SnapshotReplaced { generation }).await;
                    }
                    Some(SyncEvent::ReloadRequested) => {
                        info!("Client build changed, exiting for reload");
                        break AppExit::Reload;
                    }
                    None => {
                        warn!("Sync event channel closed; dataset will no longer refresh");
                        sync_open = false;
                    }
                }
            }

            // --- Registration notices ---
            Some(notice) = notice_rx.recv() => {
                let _ = ui_tx.send(UiUpdate::Notice(notice)).await;
            }

            // --- User commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break AppExit::Quit;
                    }
                    Some(cmd) => {
                        handle_user_command(&state, cmd, &ui_tx).await;
                    }
                    None => {
                        info!("Command channel closed, shutting down");
                        break AppExit::Quit;
                    }
                }
            }
        }
    };

    info!(?exit, "Application event loop exiting");
    Ok(exit)
}

async fn handle_user_command(state: &AppState, cmd: UserCommand, ui_tx: &mpsc::Sender<UiUpdate>) {
    match cmd {
        UserCommand::Register(participant) => match &state.guard {
            Some(guard) => {
                info!(
                    last_name = %participant.last_name,
                    first_name = %participant.first_name,
                    "Registering participant"
                );
                // Fire and forget: the outcome is logged by the guard and the
                // only visible result arrives as a notice.
                let _ = guard.dispatch(participant, state.store.current(), state.notice_tx.clone());
            }
            None => warn!("Registration requested on a screen without a printer"),
        },
        UserCommand::Export => {
            let snapshot = state.store.current();
            match dashboard::export_all(&snapshot, &state.export_stem) {
                Ok(paths) => {
                    let _ = ui_tx.send(UiUpdate::Exported(paths)).await;
                }
                Err(e) => {
                    error!("Export failed: {e}");
                    let _ = ui_tx.send(UiUpdate::ExportFailed(e.to_string())).await;
                }
            }
        }
        UserCommand::Quit => {
            // Handled in the main loop
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
