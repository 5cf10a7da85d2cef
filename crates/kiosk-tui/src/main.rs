// Check-in kiosk entry point.
//
// Startup sequence:
// 1. Parse the command line
// 2. Initialize tracing (log to file, not terminal)
// 3. Load config
// 4. Build the API client and the snapshot store
// 5. `export`: fetch once, write CSV, exit
// 6. Otherwise start the sync pollers, the app loop and the TUI
// 7. Cleanup on exit; a reload request ends with a distinct exit code

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use kiosk_core::client::{CheckinApi, HttpApi};
use kiosk_core::config::{self, Config};
use kiosk_core::dashboard;
use kiosk_core::registration::{printer_target_from_url, RegistrationGuard};
use kiosk_core::store::SnapshotStore;
use kiosk_core::sync::{SyncService, SyncSettings};
use kiosk_tui::app;
use kiosk_tui::protocol::{AppExit, Screen};
use kiosk_tui::tui;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "kiosk", version, about = "Event check-in kiosk and staff dashboard")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Self-service check-in keypad with ticket printing.
    Kiosk {
        /// The kiosk's own URL; its last path segment names the printer.
        #[arg(long)]
        url: Option<String>,
    },
    /// Read-only staff dashboard.
    Dash,
    /// Fetch the dataset once and write both CSV tables.
    Export {
        /// File stem; `_participants.csv` and `_teams.csv` are appended.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing()?;
    info!(command = ?cli.command, "Check-in kiosk starting up");

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: server={}, polling every {}ms",
        config.server.base_url, config.polling.interval_ms
    );

    let http = HttpApi::from_config(&config).context("failed to build API client")?;
    let api: Arc<dyn CheckinApi> = Arc::new(http);

    let exit = match cli.command {
        Command::Export { out } => {
            let stem = out.unwrap_or_else(|| PathBuf::from(&config.export.path));
            return export_once(api.as_ref(), &stem).await;
        }
        Command::Kiosk { url } => {
            let printer_target = resolve_printer_target(url.as_deref(), config.printer_target())?;
            info!(printer_target = %printer_target, "Kiosk printer resolved");
            run_interactive(&config, api, Screen::Kiosk, Some(printer_target)).await?
        }
        Command::Dash => run_interactive(&config, api, Screen::Dash, None).await?,
    };

    info!(?exit, "Check-in kiosk shut down cleanly");
    if exit == AppExit::Reload {
        std::process::exit(exit.code());
    }
    Ok(())
}

/// The printer named by `--url`, else the one from the config. The kiosk
/// refuses to start without one.
fn resolve_printer_target(url: Option<&str>, configured: Option<String>) -> anyhow::Result<String> {
    if let Some(url) = url {
        return printer_target_from_url(url)
            .with_context(|| format!("--url {url} does not end in a printer segment"));
    }
    configured.context(
        "no printer target: pass --url or set kiosk.url / kiosk.printer_target in config/kiosk.toml",
    )
}

/// Run the pollers, the app loop and the TUI until the user quits or the
/// client build changes.
async fn run_interactive(
    config: &Config,
    api: Arc<dyn CheckinApi>,
    screen: Screen,
    printer_target: Option<String>,
) -> anyhow::Result<AppExit> {
    let store = Arc::new(SnapshotStore::new());

    let (sync_tx, sync_rx) = mpsc::channel(64);
    let (notice_tx, notice_rx) = mpsc::channel(64);
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    let service = SyncService::start(
        Arc::clone(&api),
        Arc::clone(&store),
        SyncSettings::from_config(&config.polling),
        sync_tx,
    );

    // Only the kiosk registers people; the dashboard never holds a guard.
    let guard = match (screen, &printer_target) {
        (Screen::Kiosk, Some(target)) => Some(RegistrationGuard::new(api, target.clone())),
        _ => None,
    };

    let app_state = app::AppState::new(
        Arc::clone(&store),
        guard,
        PathBuf::from(&config.export.path),
        notice_tx,
    );

    let app_handle = tokio::spawn(app::run(sync_rx, notice_rx, cmd_rx, ui_tx, app_state));

    let view_state = tui::ViewState::new(screen, &config.kiosk.alphabet, printer_target);
    if let Err(e) = tui::run(store, ui_rx, cmd_tx, view_state).await {
        error!("TUI error: {e}");
    }

    // Wait for the app task to finish (with timeout)
    let exit = match tokio::time::timeout(Duration::from_secs(5), app_handle).await {
        Ok(Ok(Ok(exit))) => exit,
        Ok(Ok(Err(e))) => {
            error!("Application loop error: {e}");
            AppExit::Quit
        }
        Ok(Err(e)) => {
            error!("Application task failed: {e}");
            AppExit::Quit
        }
        Err(_) => {
            warn!("Application loop did not stop in time");
            AppExit::Quit
        }
    };

    service.shutdown();
    Ok(exit)
}

async fn export_once(api: &dyn CheckinApi, stem: &std::path::Path) -> anyhow::Result<()> {
    let snapshot = api
        .fetch_dataset()
        .await
        .context("failed to fetch dataset")?;
    info!(
        teams = snapshot.teams.len(),
        participants = snapshot.participants.len(),
        "Dataset fetched for export"
    );

    let paths = dashboard::export_all(&snapshot, stem).context("failed to write CSV export")?;
    for path in paths {
        println!("{}", path.display());
    }
    Ok(())
}

/// Initialize tracing to log to a file (not the terminal, which is used by the TUI).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("kiosk.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("kiosk_core=info,kiosk_tui=info,kiosk=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["kiosk", "kiosk", "--url", "http://h/kiosk/p1"]).unwrap();
        assert!(matches!(cli.command, Command::Kiosk { url: Some(ref u) } if u == "http://h/kiosk/p1"));

        let cli = Cli::try_parse_from(["kiosk", "dash"]).unwrap();
        assert!(matches!(cli.command, Command::Dash));

        let cli = Cli::try_parse_from(["kiosk", "export", "--out", "out/x"]).unwrap();
        assert!(matches!(cli.command, Command::Export { out: Some(ref p) } if p == &PathBuf::from("out/x")));
    }

    #[test]
    fn printer_target_comes_from_url_then_config() {
        assert_eq!(
            resolve_printer_target(Some("http://h/kiosk/10.0.0.7"), Some("cfg".into())).unwrap(),
            "10.0.0.7"
        );
        assert_eq!(resolve_printer_target(None, Some("cfg".into())).unwrap(), "cfg");
    }

    #[test]
    fn kiosk_without_printer_target_is_refused() {
        let err = resolve_printer_target(None, None).unwrap_err();
        assert!(err.to_string().contains("no printer target"));
        assert!(resolve_printer_target(Some("http://h/"), None).is_err());
    }

    #[test]
    fn cli_requires_a_subcommand() {
        assert!(Cli::try_parse_from(["kiosk"]).is_err());
    }
}
