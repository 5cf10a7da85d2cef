// Integration tests for the kiosk core.
//
// These run the whole check-in flow through the public API against an
// in-memory server of record: pollers load the dataset into the store, the
// keypad resolves a surname, the registration guard checks the participant
// in, and the next poll brings the check-in back into the snapshot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;

use kiosk_core::client::{ApiError, CheckinApi};
use kiosk_core::config::load_config_from;
use kiosk_core::dashboard::{team_rows, TeamStatus};
use kiosk_core::entry::{candidate_names, Confirmation, Mode, NameEntry};
use kiosk_core::protocol::{Notice, Participant, PrintJob, Snapshot, SyncEvent, Team};
use kiosk_core::registration::{RegistrationGuard, RegistrationOutcome};
use kiosk_core::store::SnapshotStore;
use kiosk_core::sync::{RetryPolicy, SyncService, SyncSettings};

// ===========================================================================
// Test helpers
// ===========================================================================

const TICK: Duration = Duration::from_secs(5);

/// A server of record that behaves like the real one: a check-in stamps the
/// participant and bumps the data version; a repeat check-in is refused.
struct InMemoryServer {
    db: Mutex<Snapshot>,
    data_version: AtomicU64,
    assets_version: Mutex<String>,
    printed: Mutex<Vec<PrintJob>>,
}

impl InMemoryServer {
    fn new(db: Snapshot) -> Self {
        Self {
            db: Mutex::new(db),
            data_version: AtomicU64::new(1),
            assets_version: Mutex::new("build-1".into()),
            printed: Mutex::new(Vec::new()),
        }
    }

    fn redeploy(&self, build: &str) {
        *self.assets_version.lock().unwrap() = build.into();
    }
}

#[async_trait]
impl CheckinApi for InMemoryServer {
    async fn fetch_dataset(&self) -> Result<Snapshot, ApiError> {
        Ok(self.db.lock().unwrap().clone())
    }

    async fn data_version(&self) -> Result<String, ApiError> {
        Ok(self.data_version.load(Ordering::SeqCst).to_string())
    }

    async fn assets_version(&self) -> Result<String, ApiError> {
        Ok(self.assets_version.lock().unwrap().clone())
    }

    async fn register(&self, participant: &Participant) -> Result<(), ApiError> {
        let mut db = self.db.lock().unwrap();
        let row = db
            .participants
            .iter_mut()
            .find(|p| p.last_name == participant.last_name && p.first_name == participant.first_name)
            .ok_or(ApiError::Status(404))?;
        if row.time_checked.is_some() {
            return Err(ApiError::Conflict);
        }
        row.time_checked = Some(Utc::now());
        self.data_version.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn print(&self, job: &PrintJob) -> Result<(), ApiError> {
        self.printed.lock().unwrap().push(job.clone());
        Ok(())
    }
}

fn participant(team: &str, first: &str, last: &str) -> Participant {
    Participant {
        team: team.into(),
        first_name: first.into(),
        last_name: last.into(),
        school: "School 1".into(),
        classname: "9".into(),
        time_checked: None,
    }
}

fn event_dataset() -> Snapshot {
    Snapshot {
        teams: vec![
            Team { name: "Eagles".into(), tid: Some("E1".into()) },
            Team { name: "Owls".into(), tid: Some("O2".into()) },
        ],
        participants: vec![
            participant("Eagles", "Ivan", "Ivanov"),
            participant("Eagles", "Anna", "Smith"),
            participant("Owls", "Petr", "Smythe"),
            participant("Owls", "Olga", "Ivanova"),
            participant("Owls", "Oleg", "Smith"),
        ],
    }
}

fn settings() -> SyncSettings {
    SyncSettings {
        interval: TICK,
        retry: RetryPolicy { attempts: 2, backoff: Duration::from_millis(200) },
    }
}

fn drain(rx: &mut mpsc::Receiver<SyncEvent>) -> Vec<SyncEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

// ===========================================================================
// End-to-end flow
// ===========================================================================

#[tokio::test(start_paused = true)]
async fn check_in_round_trip() {
    let server = Arc::new(InMemoryServer::new(event_dataset()));
    let store = Arc::new(SnapshotStore::new());
    let (events_tx, mut events_rx) = mpsc::channel(32);
    let service = SyncService::start(server.clone(), store.clone(), settings(), events_tx);

    // First tick loads the dataset.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(drain(&mut events_rx), vec![SyncEvent::SnapshotReplaced { generation: 1 }]);
    let snapshot = store.current();
    assert_eq!(snapshot.participants.len(), 5);

    // "I" auto-types up to the IVANOV / IVANOVA fork; IVANOV is already a
    // full surname there.
    let candidates = candidate_names(&snapshot);
    let mut entry = NameEntry::new();
    assert!(entry.press('I', &candidates));
    assert_eq!(entry.typed(), "IVANOV");
    let picked = match entry.confirm(&snapshot) {
        Confirmation::Register(p) => p,
        other => panic!("expected a single match, got {other:?}"),
    };
    assert_eq!(entry.typed(), "");

    let guard = RegistrationGuard::new(server.clone(), "192.168.0.165");
    let (notice_tx, mut notice_rx) = mpsc::channel(4);
    let outcome = guard
        .dispatch(picked.clone(), snapshot.clone(), notice_tx.clone())
        .await
        .unwrap();
    assert_eq!(outcome, RegistrationOutcome::Printed);
    {
        let printed = server.printed.lock().unwrap();
        assert_eq!(printed.len(), 1);
        assert_eq!(printed[0].team.name, "Eagles");
        assert_eq!(printed[0].printer_ip, "192.168.0.165");
    }

    // The local snapshot is not patched; the next poll brings the check-in.
    assert!(!store.current().participants[0].is_checked());
    tokio::time::sleep(TICK).await;
    assert_eq!(drain(&mut events_rx), vec![SyncEvent::SnapshotReplaced { generation: 2 }]);
    let refreshed = store.current();
    assert!(refreshed.participants[0].is_checked());
    assert_eq!(team_rows(&refreshed)[0].status(), TeamStatus::Partial);

    // A second attempt is refused and surfaces the notice.
    let outcome = guard.dispatch(picked, refreshed, notice_tx).await.unwrap();
    assert_eq!(outcome, RegistrationOutcome::AlreadyRegistered);
    assert!(matches!(
        notice_rx.recv().await,
        Some(Notice::AlreadyRegistered { .. })
    ));
    assert_eq!(server.printed.lock().unwrap().len(), 1);

    service.shutdown();
}

#[tokio::test(start_paused = true)]
async fn namesakes_require_a_choice() {
    let server = Arc::new(InMemoryServer::new(event_dataset()));
    let store = Arc::new(SnapshotStore::new());
    let (events_tx, _events_rx) = mpsc::channel(32);
    let service = SyncService::start(server.clone(), store.clone(), settings(), events_tx);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let snapshot = store.current();
    let candidates = candidate_names(&snapshot);
    let mut entry = NameEntry::new();
    entry.press('S', &candidates);
    assert_eq!(entry.typed(), "SM");
    entry.press('I', &candidates);
    assert_eq!(entry.typed(), "SMITH");

    assert_eq!(entry.confirm(&snapshot), Confirmation::Choose(2));
    assert_eq!(entry.mode(), Mode::Choosing);
    let teams: Vec<&str> = entry.choices().iter().map(|p| p.team.as_str()).collect();
    assert_eq!(teams, vec!["Eagles", "Owls"]);

    let picked = entry.choose(1, &candidates).unwrap();
    assert_eq!(picked.first_name, "Oleg");
    assert_eq!(entry.mode(), Mode::Typing);
    assert_eq!(entry.typed(), "");

    service.shutdown();
}

#[tokio::test(start_paused = true)]
async fn redeploy_requests_exactly_one_reload() {
    let server = Arc::new(InMemoryServer::new(event_dataset()));
    let store = Arc::new(SnapshotStore::new());
    let (events_tx, mut events_rx) = mpsc::channel(32);
    let service = SyncService::start(server.clone(), store, settings(), events_tx);

    tokio::time::sleep(TICK * 2).await;
    assert!(!drain(&mut events_rx).contains(&SyncEvent::ReloadRequested));

    server.redeploy("build-2");
    tokio::time::sleep(TICK * 3).await;
    let reloads = drain(&mut events_rx)
        .into_iter()
        .filter(|e| *e == SyncEvent::ReloadRequested)
        .count();
    assert_eq!(reloads, 1);

    service.shutdown();
}

// ===========================================================================
// Shipped configuration
// ===========================================================================

#[test]
fn shipped_defaults_load_and_validate() {
    let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
    let dir = std::env::temp_dir().join("kiosk_integration_defaults");
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(dir.join("config")).unwrap();
    std::fs::copy(root.join("defaults/kiosk.toml"), dir.join("config/kiosk.toml")).unwrap();

    let config = load_config_from(&dir).unwrap();
    assert_eq!(config.polling.interval(), Duration::from_secs(5));
    assert!(config.credentials.api_login.is_none());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn credentials_example_is_valid_toml() {
    let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
    let content = std::fs::read_to_string(root.join("defaults/credentials.toml.example"))
        .expect("defaults/credentials.toml.example should exist");
    let parsed: Result<toml::Value, _> = toml::from_str(&content);
    assert!(parsed.is_ok(), "credentials example is not valid TOML: {:?}", parsed.err());
}
