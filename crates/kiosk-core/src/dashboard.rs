// Staff dashboard views: participant and team tables, per-team fullness, and
// CSV export of both tables.
//
// Rows borrow from the snapshot they were built from, so a view always shows
// one consistent dataset even if the store is replaced mid-render.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, SecondsFormat, TimeZone, Utc};
use tracing::info;

use crate::protocol::{Participant, Snapshot, Team};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// One participant with the team it refers to. `team` is `None` when the
/// reference is broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticipantRow<'a> {
    pub participant: &'a Participant,
    pub team: Option<&'a Team>,
}

impl ParticipantRow<'_> {
    pub fn team_name(&self) -> &str {
        self.team.map(|t| t.name.as_str()).unwrap_or("")
    }

    pub fn team_tid(&self) -> &str {
        self.team.and_then(|t| t.tid.as_deref()).unwrap_or("")
    }
}

/// Check-in progress of a whole team.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamStatus {
    /// Every member has checked in.
    Complete,
    /// Some members have checked in.
    Partial,
    /// Nobody has checked in, or the team has no members.
    Absent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamRow<'a> {
    pub team: &'a Team,
    pub participants: Vec<&'a Participant>,
    /// Distinct schools of the members, joined by "; ".
    pub schools: String,
    /// Distinct class names of the members, joined by "; ".
    pub classnames: String,
}

impl TeamRow<'_> {
    pub fn checked(&self) -> usize {
        self.participants.iter().filter(|p| p.is_checked()).count()
    }

    pub fn status(&self) -> TeamStatus {
        let checked = self.checked();
        if checked == 0 {
            TeamStatus::Absent
        } else if checked == self.participants.len() {
            TeamStatus::Complete
        } else {
            TeamStatus::Partial
        }
    }
}

pub fn participant_rows(snapshot: &Snapshot) -> Vec<ParticipantRow<'_>> {
    snapshot
        .participants
        .iter()
        .map(|participant| ParticipantRow {
            participant,
            team: snapshot.team_of(participant),
        })
        .collect()
}

pub fn team_rows(snapshot: &Snapshot) -> Vec<TeamRow<'_>> {
    snapshot
        .teams
        .iter()
        .map(|team| {
            let participants: Vec<&Participant> = snapshot
                .participants
                .iter()
                .filter(|p| p.team == team.name)
                .collect();
            TeamRow {
                team,
                schools: join_distinct(participants.iter().map(|p| p.school.as_str())),
                classnames: join_distinct(participants.iter().map(|p| p.classname.as_str())),
                participants,
            }
        })
        .collect()
}

/// Size of the largest team; decides how many member columns the team
/// table needs.
pub fn max_team_size(rows: &[TeamRow<'_>]) -> usize {
    rows.iter().map(|r| r.participants.len()).max().unwrap_or(0)
}

/// Share of checked-in participants per team name, in order of first
/// appearance among participants. Teams without participants are omitted.
pub fn fullness_by_team(snapshot: &Snapshot) -> Vec<(String, f64)> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for p in &snapshot.participants {
        let entry = counts.entry(p.team.as_str()).or_insert_with(|| {
            order.push(p.team.as_str());
            (0, 0)
        });
        entry.1 += 1;
        if p.is_checked() {
            entry.0 += 1;
        }
    }
    order
        .into_iter()
        .map(|team| {
            let (checked, total) = counts[team];
            (team.to_string(), checked as f64 / total as f64)
        })
        .collect()
}

/// Check-in time for display, in the kiosk's local time zone. Empty when not
/// checked in.
pub fn format_checked_time(ts: Option<DateTime<Utc>>) -> String {
    format_checked_time_in(ts, &Local)
}

pub fn format_checked_time_in<Tz: TimeZone>(ts: Option<DateTime<Utc>>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match ts {
        Some(ts) => ts.with_timezone(tz).format("%d.%m.%Y %H:%M:%S").to_string(),
        None => String::new(),
    }
}

fn join_distinct<'a>(values: impl Iterator<Item = &'a str>) -> String {
    let mut seen: Vec<&str> = Vec::new();
    for v in values {
        if !seen.contains(&v) {
            seen.push(v);
        }
    }
    seen.join("; ")
}

// ---------------------------------------------------------------------------
// CSV export
// ---------------------------------------------------------------------------

const PARTICIPANT_HEADERS: [&str; 7] = [
    "Команда",
    "ID команды",
    "Имя",
    "Фамилия",
    "Школа",
    "Класс",
    "Время",
];

const TEAM_HEADERS: [&str; 4] = ["Команда", "ID команды", "Школы", "Классы"];

/// Exported timestamps are machine readable, unlike the on-screen ones.
fn export_time(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

/// Write the participant table (one row per participant) as CSV.
pub fn write_participants_csv<W: Write>(snapshot: &Snapshot, writer: W) -> Result<(), csv::Error> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(PARTICIPANT_HEADERS)?;
    for row in participant_rows(snapshot) {
        let p = row.participant;
        out.write_record([
            row.team_name(),
            row.team_tid(),
            &p.first_name,
            &p.last_name,
            &p.school,
            &p.classname,
            &export_time(p.time_checked),
        ])?;
    }
    out.flush()?;
    Ok(())
}

/// Write the team table as CSV: the team columns, then a
/// first name / last name / time group per member up to the largest team.
pub fn write_teams_csv<W: Write>(snapshot: &Snapshot, writer: W) -> Result<(), csv::Error> {
    let rows = team_rows(snapshot);
    let members = max_team_size(&rows);

    let mut header: Vec<String> = TEAM_HEADERS.iter().map(|h| h.to_string()).collect();
    for i in 1..=members {
        header.push(format!("Имя {i}"));
        header.push(format!("Фамилия {i}"));
        header.push(format!("Время {i}"));
    }

    let mut out = csv::Writer::from_writer(writer);
    out.write_record(&header)?;
    for row in &rows {
        let mut record = vec![
            row.team.name.clone(),
            row.team.tid.clone().unwrap_or_default(),
            row.schools.clone(),
            row.classnames.clone(),
        ];
        for i in 0..members {
            match row.participants.get(i) {
                Some(p) => {
                    record.push(p.first_name.clone());
                    record.push(p.last_name.clone());
                    record.push(export_time(p.time_checked));
                }
                None => record.extend([String::new(), String::new(), String::new()]),
            }
        }
        out.write_record(&record)?;
    }
    out.flush()?;
    Ok(())
}

/// Write `<stem>_participants.csv` and `<stem>_teams.csv`, creating the
/// parent directory if needed. Returns the written paths.
pub fn export_all(snapshot: &Snapshot, stem: &Path) -> Result<Vec<PathBuf>, ExportError> {
    if let Some(parent) = stem.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ExportError::Io {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let participants = with_suffix(stem, "_participants.csv");
    let teams = with_suffix(stem, "_teams.csv");
    write_file(&participants, |f| write_participants_csv(snapshot, f))?;
    write_file(&teams, |f| write_teams_csv(snapshot, f))?;

    info!(
        participants = %participants.display(),
        teams = %teams.display(),
        "exported check-in tables"
    );
    Ok(vec![participants, teams])
}

fn with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut name = stem.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn write_file(
    path: &Path,
    write: impl FnOnce(std::fs::File) -> Result<(), csv::Error>,
) -> Result<(), ExportError> {
    let file = std::fs::File::create(path).map_err(|e| ExportError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    write(file).map_err(|e| ExportError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{person, team};
    use chrono::FixedOffset;

    fn checked_at(mut p: Participant, ts: &str) -> Participant {
        p.time_checked = Some(DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc));
        p
    }

    fn school(mut p: Participant, school: &str, classname: &str) -> Participant {
        p.school = school.to_string();
        p.classname = classname.to_string();
        p
    }

    fn snapshot() -> Snapshot {
        Snapshot {
            teams: vec![team("Eagles", "E1"), team("Owls", "O2"), team("Empty", "X")],
            participants: vec![
                checked_at(
                    school(person("Eagles", "Ivan", "Ivanov"), "School 1", "9"),
                    "2018-05-10T09:30:00Z",
                ),
                checked_at(
                    school(person("Eagles", "Anna", "Petrova"), "School 1", "10"),
                    "2018-05-10T09:31:00Z",
                ),
                school(person("Owls", "Petr", "Sidorov"), "Lyceum", "9"),
                checked_at(
                    school(person("Owls", "Olga", "Smirnova"), "School 2", "9"),
                    "2018-05-10T09:40:00Z",
                ),
                person("Ghosts", "Lost", "Orphan"),
            ],
        }
    }

    #[test]
    fn participant_rows_resolve_teams() {
        let snap = snapshot();
        let rows = participant_rows(&snap);
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].team_name(), "Eagles");
        assert_eq!(rows[0].team_tid(), "E1");
        assert!(rows[4].team.is_none());
        assert_eq!(rows[4].team_name(), "");
    }

    #[test]
    fn team_rows_aggregate_members() {
        let snap = snapshot();
        let rows = team_rows(&snap);
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].schools, "School 1");
        assert_eq!(rows[0].classnames, "9; 10");
        assert_eq!(rows[0].status(), TeamStatus::Complete);

        assert_eq!(rows[1].schools, "Lyceum; School 2");
        assert_eq!(rows[1].classnames, "9");
        assert_eq!(rows[1].checked(), 1);
        assert_eq!(rows[1].status(), TeamStatus::Partial);

        assert!(rows[2].participants.is_empty());
        assert_eq!(rows[2].status(), TeamStatus::Absent);
        assert_eq!(max_team_size(&rows), 2);
    }

    #[test]
    fn fullness_follows_participant_order() {
        let snap = snapshot();
        let fullness = fullness_by_team(&snap);
        assert_eq!(
            fullness,
            vec![
                ("Eagles".to_string(), 1.0),
                ("Owls".to_string(), 0.5),
                ("Ghosts".to_string(), 0.0),
            ]
        );
    }

    #[test]
    fn checked_time_formatting() {
        let ts = Some(
            DateTime::parse_from_rfc3339("2018-05-10T09:30:05Z")
                .unwrap()
                .with_timezone(&Utc),
        );
        assert_eq!(format_checked_time_in(ts, &Utc), "10.05.2018 09:30:05");
        let msk = FixedOffset::east_opt(3 * 3600).unwrap();
        assert_eq!(format_checked_time_in(ts, &msk), "10.05.2018 12:30:05");
        assert_eq!(format_checked_time(None), "");
    }

    #[test]
    fn participants_csv_has_one_row_per_participant() {
        let snap = snapshot();
        let mut buf = Vec::new();
        write_participants_csv(&snap, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "Команда,ID команды,Имя,Фамилия,Школа,Класс,Время");
        assert_eq!(
            lines[1],
            "Eagles,E1,Ivan,Ivanov,School 1,9,2018-05-10T09:30:00Z"
        );
        assert_eq!(lines[5], ",,Lost,Orphan,,,");
    }

    #[test]
    fn teams_csv_pads_member_groups() {
        let snap = snapshot();
        let mut buf = Vec::new();
        write_teams_csv(&snap, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Команда,ID команды,Школы,Классы,Имя 1,Фамилия 1,Время 1,Имя 2,Фамилия 2,Время 2"
        );
        assert_eq!(
            lines[2],
            "Owls,O2,Lyceum; School 2,9,Petr,Sidorov,,Olga,Smirnova,2018-05-10T09:40:00Z"
        );
        assert_eq!(lines[3], "Empty,X,,,,,,,,");
    }

    #[test]
    fn export_all_writes_both_files() {
        let dir = std::env::temp_dir().join("kiosk_dashboard_export");
        let _ = std::fs::remove_dir_all(&dir);
        let stem = dir.join("nested").join("checkin");

        let written = export_all(&snapshot(), &stem).unwrap();
        assert_eq!(
            written,
            vec![
                dir.join("nested").join("checkin_participants.csv"),
                dir.join("nested").join("checkin_teams.csv"),
            ]
        );
        for path in &written {
            let text = std::fs::read_to_string(path).unwrap();
            assert!(text.starts_with("Команда,ID команды"));
        }
        let _ = std::fs::remove_dir_all(&dir);
    }
}
