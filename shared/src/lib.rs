use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Participant record as persisted in the roster snapshot.
///
/// Field names are camelCase on the wire so snapshots written by the
/// earlier browser tool load unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRecord {
    /// Participant ID in format: "participant::<uuid>" (older snapshots used numbers)
    #[serde(deserialize_with = "deserialize_record_id")]
    pub id: String,
    /// Display number assigned at creation
    pub number: u32,
    pub name: String,
    /// Canonical tag value ("student", "kol", "enterprise") or empty
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub is_winner: bool,
    #[serde(default)]
    pub is_checked_in: bool,
    /// Human-readable local check-in time, empty when not checked in
    #[serde(default)]
    pub checkin_time: String,
    #[serde(default)]
    pub note: String,
}

/// Accepts either a string id or the numeric ids (epoch millis, possibly with
/// a random fraction) that older snapshots stored.
fn deserialize_record_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Text(text) => Ok(text),
        RawId::Number(number) => Ok(number.to_string()),
    }
}

/// What the draw display currently shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayedCandidate {
    /// Zero-padded display number, e.g. "007"
    pub number: String,
    pub name: String,
}

impl DisplayedCandidate {
    pub fn new(number: u32, name: impl Into<String>) -> Self {
        Self {
            number: format_display_number(number),
            name: name.into(),
        }
    }

    /// The idle display before any draw has run.
    pub fn placeholder() -> Self {
        Self {
            number: "000".to_string(),
            name: "Waiting for draw".to_string(),
        }
    }

    /// Shown when a draw is requested but nobody is eligible.
    pub fn no_eligible() -> Self {
        Self {
            number: "000".to_string(),
            name: "No eligible participants".to_string(),
        }
    }
}

impl fmt::Display for DisplayedCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}  {}", self.number, self.name)
    }
}

/// Pads a participant number to at least three digits.
pub fn format_display_number(number: u32) -> String {
    format!("{:03}", number)
}

/// Notifications consumed by the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LotteryEvent {
    /// The roster was mutated and persisted
    RosterChanged,
    /// A draw entered the fast-cycling phase
    DrawStarted { pool_size: usize },
    /// The display moved to a new candidate
    CandidateUpdated { number: String, name: String },
    /// Stop was pressed; the slowdown animation is running
    DrawStopping,
    /// The winner flag was written back to the roster
    WinnerCommitted(ParticipantRecord),
    /// Emitted shortly after the commit to pop the result dialog
    WinnerRevealed(ParticipantRecord),
    /// A draw was requested while nobody was eligible
    NoEligibleParticipants,
}

/// Roster counters for headers and summaries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterStats {
    pub total: usize,
    pub checked_in: usize,
    pub winners: usize,
    pub eligible: usize,
}

/// Response containing generated CSV export content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDataResponse {
    /// CSV text including the leading byte-order mark
    pub csv_content: String,
    pub filename: String,
    pub participant_count: usize,
}

/// Response after writing an export file to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportToPathResponse {
    pub success: bool,
    pub message: String,
    pub file_path: String,
    pub participant_count: usize,
}
