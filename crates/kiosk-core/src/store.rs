// Snapshot store: the single owner of the locally held dataset.
//
// Readers get an `Arc<Snapshot>` and keep it for as long as they like; a
// replace swaps the pointer, so a reader sees either the old pair of
// (teams, participants) or the new one, never a mix.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::watch;
use tracing::debug;

use crate::protocol::Snapshot;

/// Holds the current [`Snapshot`] and notifies subscribers on replace.
pub struct SnapshotStore {
    current: ArcSwap<Snapshot>,
    /// Generation of the installed snapshot; 0 means "nothing fetched yet".
    generation_tx: watch::Sender<u64>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (generation_tx, _) = watch::channel(0);
        Self {
            current: ArcSwap::from_pointee(Snapshot::default()),
            generation_tx,
        }
    }

    /// The latest installed snapshot.
    pub fn current(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Atomically install `snapshot` and return its generation number.
    pub fn replace(&self, snapshot: Snapshot) -> u64 {
        let teams = snapshot.teams.len();
        let participants = snapshot.participants.len();
        self.current.store(Arc::new(snapshot));

        let mut generation = 0;
        self.generation_tx.send_modify(|g| {
            *g += 1;
            generation = *g;
        });
        debug!(generation, teams, participants, "snapshot replaced");
        generation
    }

    /// Number of replaces so far.
    pub fn generation(&self) -> u64 {
        *self.generation_tx.borrow()
    }

    /// Subscribe to replace notifications. The receiver always exposes the
    /// most recent generation; intermediate ones may be skipped.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation_tx.subscribe()
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
