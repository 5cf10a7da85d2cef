// Wire types exchanged with the server of record, plus the internal event
// types passed between the sync tasks, the registration guard and the UI.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Dataset
// ---------------------------------------------------------------------------

/// A team row. `name` is the unique key participants refer to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    /// Short team identifier printed on the ticket. Nullable server-side.
    #[serde(default)]
    pub tid: Option<String>,
}

/// A participant row.
///
/// `time_checked` is `None` until the server records a successful check-in.
/// The client never patches it locally; it only changes when a whole new
/// [`Snapshot`] is installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Foreign key into [`Team::name`].
    pub team: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub school: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub classname: String,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub time_checked: Option<DateTime<Utc>>,
}

impl Participant {
    pub fn is_checked(&self) -> bool {
        self.time_checked.is_some()
    }
}

/// The full dataset as returned by `GET /api/db`.
///
/// Teams and participants always travel together; the store never holds one
/// half of a snapshot from a different fetch than the other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub participants: Vec<Participant>,
}

impl Snapshot {
    /// Look up the team a participant belongs to.
    ///
    /// Returns `None` for orphaned participants; callers decide how to treat
    /// the broken reference.
    pub fn team_of(&self, participant: &Participant) -> Option<&Team> {
        self.teams.iter().find(|t| t.name == participant.team)
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty() && self.participants.is_empty()
    }

    pub fn checked_count(&self) -> usize {
        self.participants.iter().filter(|p| p.is_checked()).count()
    }
}

/// Response body of the version pings (`POST /api/db`, `POST /api/files`).
///
/// The token is opaque: it is only ever compared for inequality.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VersionStamp {
    #[serde(alias = "lastChanged", default)]
    pub last_changed: String,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Body of `POST /api/check`. The server identifies a participant by the
/// (last name, first name) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationRequest {
    pub last_name: String,
    pub first_name: String,
}

impl From<&Participant> for RegistrationRequest {
    fn from(p: &Participant) -> Self {
        RegistrationRequest {
            last_name: p.last_name.clone(),
            first_name: p.first_name.clone(),
        }
    }
}

/// Body of `POST /api/print`. Field names follow the server's ticket
/// template; `printer_ip` carries the kiosk's printer target unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrintJob {
    pub person: Participant,
    pub team: Team,
    pub printer_ip: String,
}

// ---------------------------------------------------------------------------
// Internal events
// ---------------------------------------------------------------------------

/// Events emitted by the background sync tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A freshly fetched snapshot was installed in the store.
    SnapshotReplaced { generation: u64 },
    /// The client build changed on the server; the process should restart.
    ReloadRequested,
}

/// Transient user-facing messages raised outside the UI thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    AlreadyRegistered { last_name: String, first_name: String },
}

impl Notice {
    pub fn text(&self) -> &'static str {
        match self {
            Notice::AlreadyRegistered { .. } => "Вы уже зарегистрированы",
        }
    }
}

// ---------------------------------------------------------------------------
// Serde helpers
// ---------------------------------------------------------------------------

/// Accept `"9"`, `9` or `null` for free-form text columns that the importer
/// sometimes fills with numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(s)) => s,
        Some(Raw::Int(n)) => n.to_string(),
        Some(Raw::Float(f)) => f.to_string(),
        None => String::new(),
    })
}

/// Parse an RFC 3339 timestamp, falling back to a naive ISO timestamp
/// interpreted as UTC. Empty strings and `null` mean "not checked in".
fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Option::<String>::deserialize(deserializer)? {
        Some(s) if !s.trim().is_empty() => s,
        _ => return Ok(None),
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw.trim()) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }
    NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Some(naive.and_utc()))
        .map_err(serde::de::Error::custom)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
