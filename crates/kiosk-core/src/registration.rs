// Registration guard: check a participant in, then print their ticket.
//
// From the keypad's point of view registration is fire-and-forget. The entry
// is reset as soon as a participant is picked, the request runs in the
// background, and the only failure the visitor ever hears about is "already
// registered". The check-in itself becomes visible when the next dataset
// refetch lands.

use std::sync::Arc;

use reqwest::Url;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::client::CheckinApi;
use crate::protocol::{Notice, Participant, PrintJob, Snapshot};

/// What happened to one registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// Checked in and the ticket was sent to the printer.
    Printed,
    /// Checked in, but the print request failed.
    PrintFailed,
    /// The server refused: the participant checked in recently.
    AlreadyRegistered,
    /// Transport or server error; nothing was printed.
    Failed,
    /// The participant references a team that is not in the snapshot. The
    /// attempt is refused before anything is sent.
    MissingTeam,
}

/// Submits registrations and print jobs for one kiosk.
#[derive(Clone)]
pub struct RegistrationGuard {
    api: Arc<dyn CheckinApi>,
    printer_target: String,
}

impl RegistrationGuard {
    pub fn new(api: Arc<dyn CheckinApi>, printer_target: impl Into<String>) -> Self {
        Self {
            api,
            printer_target: printer_target.into(),
        }
    }

    pub fn printer_target(&self) -> &str {
        &self.printer_target
    }

    /// Register `participant` and, on success, print their ticket.
    ///
    /// `snapshot` is the dataset the participant was picked from; it supplies
    /// the team printed on the ticket.
    pub async fn register(&self, participant: &Participant, snapshot: &Snapshot) -> RegistrationOutcome {
        let Some(team) = snapshot.team_of(participant) else {
            error!(
                last_name = %participant.last_name,
                first_name = %participant.first_name,
                team = %participant.team,
                "participant references an unknown team, refusing registration"
            );
            return RegistrationOutcome::MissingTeam;
        };

        match self.api.register(participant).await {
            Ok(()) => {
                info!(
                    last_name = %participant.last_name,
                    first_name = %participant.first_name,
                    "participant checked in"
                );
            }
            Err(e) if e.is_conflict() => {
                info!(
                    last_name = %participant.last_name,
                    first_name = %participant.first_name,
                    "participant already registered"
                );
                return RegistrationOutcome::AlreadyRegistered;
            }
            Err(e) => {
                warn!(
                    last_name = %participant.last_name,
                    first_name = %participant.first_name,
                    "registration failed: {e}"
                );
                return RegistrationOutcome::Failed;
            }
        }

        let job = PrintJob {
            person: participant.clone(),
            team: team.clone(),
            printer_ip: self.printer_target.clone(),
        };
        match self.api.print(&job).await {
            Ok(()) => {
                debug!(printer = %self.printer_target, "ticket sent");
                RegistrationOutcome::Printed
            }
            Err(e) => {
                warn!(printer = %self.printer_target, "print request failed: {e}");
                RegistrationOutcome::PrintFailed
            }
        }
    }

    /// Run [`register`](Self::register) in the background. An "already
    /// registered" outcome is forwarded to `notices`; everything else is only
    /// logged.
    pub fn dispatch(
        &self,
        participant: Participant,
        snapshot: Arc<Snapshot>,
        notices: mpsc::Sender<Notice>,
    ) -> JoinHandle<RegistrationOutcome> {
        let guard = self.clone();
        tokio::spawn(async move {
            let outcome = guard.register(&participant, &snapshot).await;
            if outcome == RegistrationOutcome::AlreadyRegistered {
                let _ = notices
                    .send(Notice::AlreadyRegistered {
                        last_name: participant.last_name,
                        first_name: participant.first_name,
                    })
                    .await;
            }
            outcome
        })
    }
}

/// The last non-empty path segment of the kiosk's access URL, e.g.
/// `http://host:9998/kiosk/192.168.0.165` gives `192.168.0.165`.
pub fn printer_target_from_url(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    url.path_segments()?
        .rfind(|segment| !segment.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ApiError;
    use crate::fake::{person, team, Reply, ScriptedApi};

    fn snapshot() -> Snapshot {
        Snapshot {
            teams: vec![team("Eagles", "E1")],
            participants: vec![
                person("Eagles", "Ivan", "Ivanov"),
                person("Ghosts", "Lost", "Orphan"),
            ],
        }
    }

    fn guard(api: &Arc<ScriptedApi>) -> RegistrationGuard {
        RegistrationGuard::new(api.clone(), "192.168.0.165")
    }

    #[test]
    fn printer_target_is_last_path_segment() {
        assert_eq!(
            printer_target_from_url("http://127.0.0.1:9998/kiosk/192.168.0.165").as_deref(),
            Some("192.168.0.165")
        );
        assert_eq!(
            printer_target_from_url("http://host/kiosk/hall-b/").as_deref(),
            Some("hall-b")
        );
        assert_eq!(printer_target_from_url("http://host/"), None);
        assert_eq!(printer_target_from_url("not a url"), None);
    }

    #[tokio::test]
    async fn success_prints_with_resolved_team() {
        let api = Arc::new(ScriptedApi::default());
        api.push_registration(Reply::Ok(()));
        let snap = snapshot();

        let outcome = guard(&api).register(&snap.participants[0], &snap).await;
        assert_eq!(outcome, RegistrationOutcome::Printed);

        let printed = api.printed.lock().unwrap();
        assert_eq!(printed.len(), 1);
        assert_eq!(printed[0].person.last_name, "Ivanov");
        assert_eq!(printed[0].team.tid.as_deref(), Some("E1"));
        assert_eq!(printed[0].printer_ip, "192.168.0.165");
    }

    #[tokio::test]
    async fn conflict_does_not_print() {
        let api = Arc::new(ScriptedApi::default());
        api.push_registration(Reply::Err(|| ApiError::Conflict));
        let snap = snapshot();

        let outcome = guard(&api).register(&snap.participants[0], &snap).await;
        assert_eq!(outcome, RegistrationOutcome::AlreadyRegistered);
        assert!(api.printed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn other_failure_is_silent() {
        let api = Arc::new(ScriptedApi::default());
        api.push_registration(Reply::Err(|| ApiError::Status(404)));
        let snap = snapshot();
        let (tx, mut rx) = mpsc::channel(4);

        let outcome = guard(&api)
            .dispatch(snap.participants[0].clone(), Arc::new(snap), tx)
            .await
            .unwrap();
        assert_eq!(outcome, RegistrationOutcome::Failed);
        assert!(api.printed.lock().unwrap().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn orphan_participant_is_refused_before_submitting() {
        let api = Arc::new(ScriptedApi::default());
        let snap = snapshot();

        let outcome = guard(&api).register(&snap.participants[1], &snap).await;
        assert_eq!(outcome, RegistrationOutcome::MissingTeam);
        assert!(api.registered.lock().unwrap().is_empty());
        assert!(api.printed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn print_failure_is_reported_but_not_raised() {
        let api = Arc::new(ScriptedApi {
            fail_print: true,
            ..Default::default()
        });
        api.push_registration(Reply::Ok(()));
        let snap = snapshot();
        let (tx, mut rx) = mpsc::channel(4);

        let outcome = guard(&api)
            .dispatch(snap.participants[0].clone(), Arc::new(snap), tx)
            .await
            .unwrap();
        assert_eq!(outcome, RegistrationOutcome::PrintFailed);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn dispatch_forwards_already_registered_notice() {
        let api = Arc::new(ScriptedApi::default());
        api.push_registration(Reply::Err(|| ApiError::Conflict));
        let snap = snapshot();
        let (tx, mut rx) = mpsc::channel(4);

        let handle = guard(&api).dispatch(snap.participants[0].clone(), Arc::new(snap), tx);
        let notice = rx.recv().await.unwrap();
        assert_eq!(
            notice,
            Notice::AlreadyRegistered {
                last_name: "Ivanov".into(),
                first_name: "Ivan".into(),
            }
        );
        assert_eq!(notice.text(), "Вы уже зарегистрированы");
        assert_eq!(handle.await.unwrap(), RegistrationOutcome::AlreadyRegistered);
    }
}
