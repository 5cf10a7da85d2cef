// Scripted in-memory `CheckinApi` for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::client::{ApiError, CheckinApi};
use crate::protocol::{Participant, PrintJob, Snapshot, Team};

/// One scripted reply, optionally delayed.
pub(crate) enum Reply<T> {
    Ok(T),
    Err(fn() -> ApiError),
    Delayed(Duration, Box<Reply<T>>),
}

impl<T> Reply<T> {
    fn resolve(self) -> (Duration, Result<T, ApiError>) {
        match self {
            Reply::Ok(v) => (Duration::ZERO, Ok(v)),
            Reply::Err(make) => (Duration::ZERO, Err(make())),
            Reply::Delayed(d, inner) => {
                let (extra, result) = inner.resolve();
                (d + extra, result)
            }
        }
    }
}

/// Replies are consumed front to back; an exhausted script answers 503.
#[derive(Default)]
pub(crate) struct ScriptedApi {
    pub datasets: Mutex<VecDeque<Reply<Snapshot>>>,
    pub data_versions: Mutex<VecDeque<Reply<String>>>,
    pub assets_versions: Mutex<VecDeque<Reply<String>>>,
    pub registrations: Mutex<VecDeque<Reply<()>>>,
    pub dataset_calls: AtomicUsize,
    pub data_version_calls: AtomicUsize,
    pub assets_version_calls: AtomicUsize,
    pub registered: Mutex<Vec<Participant>>,
    pub printed: Mutex<Vec<PrintJob>>,
    pub fail_print: bool,
}

impl ScriptedApi {
    pub fn push_dataset(&self, reply: Reply<Snapshot>) {
        self.datasets.lock().unwrap().push_back(reply);
    }

    pub fn push_data_version(&self, token: &str) {
        self.data_versions.lock().unwrap().push_back(Reply::Ok(token.to_string()));
    }

    pub fn push_assets_version(&self, token: &str) {
        self.assets_versions.lock().unwrap().push_back(Reply::Ok(token.to_string()));
    }

    pub fn push_registration(&self, reply: Reply<()>) {
        self.registrations.lock().unwrap().push_back(reply);
    }

    async fn next<T>(queue: &Mutex<VecDeque<Reply<T>>>) -> Result<T, ApiError> {
        let reply = queue.lock().unwrap().pop_front();
        match reply {
            Some(reply) => {
                let (delay, result) = reply.resolve();
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                result
            }
            None => Err(ApiError::Status(503)),
        }
    }
}

#[async_trait]
impl CheckinApi for ScriptedApi {
    async fn fetch_dataset(&self) -> Result<Snapshot, ApiError> {
        self.dataset_calls.fetch_add(1, Ordering::SeqCst);
        Self::next(&self.datasets).await
    }

    async fn data_version(&self) -> Result<String, ApiError> {
        self.data_version_calls.fetch_add(1, Ordering::SeqCst);
        Self::next(&self.data_versions).await
    }

    async fn assets_version(&self) -> Result<String, ApiError> {
        self.assets_version_calls.fetch_add(1, Ordering::SeqCst);
        Self::next(&self.assets_versions).await
    }

    async fn register(&self, participant: &Participant) -> Result<(), ApiError> {
        self.registered.lock().unwrap().push(participant.clone());
        Self::next(&self.registrations).await
    }

    async fn print(&self, job: &PrintJob) -> Result<(), ApiError> {
        if self.fail_print {
            return Err(ApiError::Status(500));
        }
        self.printed.lock().unwrap().push(job.clone());
        Ok(())
    }
}

pub(crate) fn person(team: &str, first: &str, last: &str) -> Participant {
    Participant {
        team: team.to_string(),
        first_name: first.to_string(),
        last_name: last.to_string(),
        school: String::new(),
        classname: String::new(),
        time_checked: None,
    }
}

pub(crate) fn team(name: &str, tid: &str) -> Team {
    Team {
        name: name.to_string(),
        tid: Some(tid.to_string()),
    }
}

/// A one-team snapshot whose team name carries `tag`.
pub(crate) fn tagged_snapshot(tag: usize) -> Snapshot {
    let name = format!("team-{tag}");
    Snapshot {
        teams: vec![team(&name, "T")],
        participants: vec![person(&name, "Ivan", "Ivanov")],
    }
}
