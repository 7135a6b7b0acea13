//! lottery/src/backend/domain/models/participant.rs

use chrono::{DateTime, Local};
use uuid::Uuid;

use super::tag::Tag;

/// Domain model representing one attendee on the roster.
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub id: String,
    pub number: u32,
    pub name: String,
    pub tag: Option<Tag>,
    pub is_checked_in: bool,
    /// Local time of the most recent check-in, `None` while checked out
    pub checkin_time: Option<String>,
    pub is_winner: bool,
    pub note: String,
}

impl Participant {
    /// Generate a unique ID for a participant
    pub fn generate_id() -> String {
        format!("participant::{}", Uuid::new_v4())
    }

    /// Checked in and not yet a winner.
    pub fn is_eligible(&self) -> bool {
        self.is_checked_in && !self.is_winner
    }

    pub fn display_number(&self) -> String {
        shared::format_display_number(self.number)
    }

    /// Tag label, or an empty string when untagged
    pub fn tag_label(&self) -> &'static str {
        self.tag.map(|tag| tag.label()).unwrap_or("")
    }
}

/// Format used for `checkin_time`, e.g. "2025/1/15 14:30:00".
pub fn checkin_timestamp(now: DateTime<Local>) -> String {
    now.format("%Y/%-m/%-d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn participant(is_checked_in: bool, is_winner: bool) -> Participant {
        Participant {
            id: Participant::generate_id(),
            number: 1,
            name: "Alice".to_string(),
            tag: None,
            is_checked_in,
            checkin_time: None,
            is_winner,
            note: String::new(),
        }
    }

    #[test]
    fn test_generate_id_is_unique() {
        let a = Participant::generate_id();
        let b = Participant::generate_id();
        assert!(a.starts_with("participant::"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_eligibility() {
        assert!(participant(true, false).is_eligible());
        assert!(!participant(false, false).is_eligible());
        assert!(!participant(true, true).is_eligible());
        assert!(!participant(false, true).is_eligible());
    }

    #[test]
    fn test_checkin_timestamp_format() {
        let at = Local.with_ymd_and_hms(2025, 1, 5, 9, 3, 7).unwrap();
        assert_eq!(checkin_timestamp(at), "2025/1/5 09:03:07");
    }
}
