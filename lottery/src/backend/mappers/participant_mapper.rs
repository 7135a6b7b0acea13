//! lottery/src/backend/mappers/participant_mapper.rs

use log::warn;
use shared::{LotteryEvent, ParticipantRecord};

use crate::backend::domain::models::{Participant as DomainParticipant, Tag};

/// Mapper to convert between shared participant records and domain participants.
pub struct ParticipantMapper;

impl ParticipantMapper {
    /// Converts a stored record to a domain participant.
    ///
    /// A tag value outside the canonical set is dropped rather than failing
    /// the load.
    pub fn to_domain(record: ParticipantRecord) -> DomainParticipant {
        let tag = if record.tag.is_empty() {
            None
        } else {
            let tag = Tag::from_value(&record.tag);
            if tag.is_none() {
                warn!(
                    "Participant {} has unknown stored tag '{}', clearing it",
                    record.id, record.tag
                );
            }
            tag
        };

        DomainParticipant {
            id: record.id,
            number: record.number,
            name: record.name,
            tag,
            is_checked_in: record.is_checked_in,
            checkin_time: Some(record.checkin_time).filter(|time| !time.is_empty()),
            is_winner: record.is_winner,
            note: record.note,
        }
    }

    /// Converts a domain participant to its stored record.
    pub fn to_record(domain: &DomainParticipant) -> ParticipantRecord {
        ParticipantRecord {
            id: domain.id.clone(),
            number: domain.number,
            name: domain.name.clone(),
            tag: domain.tag.map(|tag| tag.value().to_string()).unwrap_or_default(),
            is_winner: domain.is_winner,
            is_checked_in: domain.is_checked_in,
            checkin_time: domain.checkin_time.clone().unwrap_or_default(),
            note: domain.note.clone(),
        }
    }

    pub fn to_domain_list(records: Vec<ParticipantRecord>) -> Vec<DomainParticipant> {
        records.into_iter().map(Self::to_domain).collect()
    }

    pub fn to_record_list(participants: &[DomainParticipant]) -> Vec<ParticipantRecord> {
        participants.iter().map(Self::to_record).collect()
    }

    pub fn to_winner_committed_event(domain: &DomainParticipant) -> LotteryEvent {
        LotteryEvent::WinnerCommitted(Self::to_record(domain))
    }

    pub fn to_winner_revealed_event(domain: &DomainParticipant) -> LotteryEvent {
        LotteryEvent::WinnerRevealed(Self::to_record(domain))
    }
}
