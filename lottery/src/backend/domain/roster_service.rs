use chrono::Local;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use shared::{LotteryEvent, RosterStats};
use std::sync::Arc;

use crate::backend::domain::commands::roster::{AddParticipantCommand, EditParticipantCommand};
use crate::backend::domain::models::{checkin_timestamp, Participant};
use crate::backend::domain::tag_resolver::TagResolver;
use crate::backend::events::EventSink;
use crate::backend::mappers::ParticipantMapper;
use crate::backend::storage::RosterStorage;

/// How display numbers are handed out to new participants
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberingPolicy {
    /// Next number is the current roster size + 1. After deletions this can
    /// repeat a number that is still on the roster.
    #[default]
    RosterLength,
    /// Next number is one past the highest number handed out or loaded in
    /// this session, so numbers are never repeated.
    Monotonic,
}

/// Service owning the event roster.
///
/// Every applied mutation persists the whole snapshot and emits
/// `LotteryEvent::RosterChanged`. Rejected input (blank names, unknown ids)
/// leaves the roster, the storage and the event stream untouched.
pub struct RosterService {
    participants: Vec<Participant>,
    storage: Arc<dyn RosterStorage>,
    resolver: TagResolver,
    numbering: NumberingPolicy,
    /// Highest number handed out or loaded, for `NumberingPolicy::Monotonic`
    high_water: u32,
    events: EventSink,
}

impl RosterService {
    /// Create the service and load the stored snapshot.
    ///
    /// An unreadable snapshot is logged and replaced by an empty roster.
    pub fn new(
        storage: Arc<dyn RosterStorage>,
        resolver: TagResolver,
        numbering: NumberingPolicy,
        events: EventSink,
    ) -> Self {
        let participants = match storage.load() {
            Ok(records) => ParticipantMapper::to_domain_list(records),
            Err(e) => {
                warn!("Failed to load roster snapshot, starting with an empty roster: {}", e);
                Vec::new()
            }
        };
        let high_water = participants.iter().map(|p| p.number).max().unwrap_or(0);

        info!("Roster loaded with {} participants", participants.len());

        Self {
            participants,
            storage,
            resolver,
            numbering,
            high_water,
            events,
        }
    }

    /// Add a participant entered at the door. They start checked in.
    pub fn add_participant(&mut self, command: AddParticipantCommand) -> Option<Participant> {
        let name = command.name.trim();
        if name.is_empty() {
            debug!("Ignoring add with blank name");
            return None;
        }

        let participant = Participant {
            id: Participant::generate_id(),
            number: self.allocate_number(),
            name: name.to_string(),
            tag: command.tag,
            is_checked_in: true,
            checkin_time: Some(checkin_timestamp(Local::now())),
            is_winner: false,
            note: String::new(),
        };
        self.participants.push(participant.clone());
        self.persist();

        info!(
            "Added participant #{} {} (tag: {:?})",
            participant.display_number(),
            participant.name,
            participant.tag
        );
        Some(participant)
    }

    /// Import one participant per non-blank line: `name [tag]`.
    ///
    /// Imported participants start checked out. Tokens after the tag are
    /// ignored and unknown tags are stored as no tag.
    pub fn import_batch(&mut self, text: &str) -> Vec<Participant> {
        let mut imported = Vec::new();

        for line in text.lines() {
            let mut tokens = line.split_whitespace();
            let Some(name) = tokens.next() else {
                continue;
            };
            let tag = tokens.next().and_then(|token| self.resolver.resolve(token));

            let participant = Participant {
                id: Participant::generate_id(),
                number: self.allocate_number(),
                name: name.to_string(),
                tag,
                is_checked_in: false,
                checkin_time: None,
                is_winner: false,
                note: String::new(),
            };
            self.participants.push(participant.clone());
            imported.push(participant);
        }

        if imported.is_empty() {
            debug!("Batch import contained no participants");
            return imported;
        }

        self.persist();
        info!("Imported {} participants", imported.len());
        imported
    }

    /// Flip a participant's check-in state, stamping or clearing the time.
    pub fn toggle_check_in(&mut self, participant_id: &str) -> Option<Participant> {
        let participant = self.find_mut(participant_id)?;

        participant.is_checked_in = !participant.is_checked_in;
        participant.checkin_time = if participant.is_checked_in {
            Some(checkin_timestamp(Local::now()))
        } else {
            None
        };
        let updated = participant.clone();
        self.persist();

        info!(
            "Participant #{} {} checked {}",
            updated.display_number(),
            updated.name,
            if updated.is_checked_in { "in" } else { "out" }
        );
        Some(updated)
    }

    /// Overwrite name and tag. Check-in, winner flag and note are untouched.
    pub fn edit_participant(&mut self, command: EditParticipantCommand) -> Option<Participant> {
        let name = command.name.trim();
        if name.is_empty() {
            debug!("Ignoring edit of {} with blank name", command.participant_id);
            return None;
        }

        let participant = self.find_mut(&command.participant_id)?;
        participant.name = name.to_string();
        participant.tag = command.tag;
        let updated = participant.clone();
        self.persist();

        info!("Edited participant #{} {}", updated.display_number(), updated.name);
        Some(updated)
    }

    /// Replace the note with the trimmed text; an empty note is allowed.
    pub fn set_note(&mut self, participant_id: &str, text: &str) -> Option<Participant> {
        let participant = self.find_mut(participant_id)?;
        participant.note = text.trim().to_string();
        let updated = participant.clone();
        self.persist();

        debug!("Updated note for participant {}", participant_id);
        Some(updated)
    }

    /// Remove a participant. Other participants keep their numbers.
    pub fn delete_participant(&mut self, participant_id: &str) -> Option<Participant> {
        let index = self.participants.iter().position(|p| p.id == participant_id)?;
        let removed = self.participants.remove(index);
        self.persist();

        info!("Deleted participant #{} {}", removed.display_number(), removed.name);
        Some(removed)
    }

    /// Clear the whole roster and restart numbering.
    pub fn reset(&mut self) {
        let count = self.participants.len();
        self.participants.clear();
        self.high_water = 0;
        self.persist();

        info!("Roster reset, removed {} participants", count);
    }

    /// Mark a participant as a draw winner.
    ///
    /// Returns `false` when the participant is no longer on the roster.
    /// Calling it again for the same participant changes nothing.
    pub fn commit_winner(&mut self, participant_id: &str) -> bool {
        let Some(participant) = self.find_mut(participant_id) else {
            warn!("Cannot commit winner {}: participant no longer on roster", participant_id);
            return false;
        };

        if participant.is_winner {
            debug!("Participant {} is already a winner", participant_id);
            return true;
        }
        participant.is_winner = true;
        let name = participant.name.clone();
        self.persist();

        info!("Committed winner {}", name);
        true
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn get(&self, participant_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == participant_id)
    }

    /// First participant (in roster order) carrying this display number
    pub fn find_by_number(&self, number: u32) -> Option<&Participant> {
        self.participants.iter().find(|p| p.number == number)
    }

    /// Case-insensitive substring search over names and tag labels.
    /// A blank query returns the whole roster.
    pub fn filter(&self, query: &str) -> Vec<&Participant> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.participants.iter().collect();
        }

        self.participants
            .iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&query)
                    || p.tag
                        .map(|tag| tag.label().to_lowercase().contains(&query))
                        .unwrap_or(false)
            })
            .collect()
    }

    /// Participants that may still win: checked in and not yet winners.
    pub fn eligible(&self) -> Vec<&Participant> {
        self.participants.iter().filter(|p| p.is_eligible()).collect()
    }

    pub fn winners(&self) -> Vec<&Participant> {
        self.participants.iter().filter(|p| p.is_winner).collect()
    }

    pub fn stats(&self) -> RosterStats {
        RosterStats {
            total: self.participants.len(),
            checked_in: self.participants.iter().filter(|p| p.is_checked_in).count(),
            winners: self.participants.iter().filter(|p| p.is_winner).count(),
            eligible: self.participants.iter().filter(|p| p.is_eligible()).count(),
        }
    }

    pub fn resolver(&self) -> &TagResolver {
        &self.resolver
    }

    fn find_mut(&mut self, participant_id: &str) -> Option<&mut Participant> {
        let found = self.participants.iter_mut().find(|p| p.id == participant_id);
        if found.is_none() {
            debug!("Participant not found: {}", participant_id);
        }
        found
    }

    fn allocate_number(&mut self) -> u32 {
        let number = match self.numbering {
            NumberingPolicy::RosterLength => self.participants.len() as u32 + 1,
            NumberingPolicy::Monotonic => self.high_water + 1,
        };
        self.high_water = self.high_water.max(number);
        number
    }

    /// Save the full snapshot. A failed save is logged; the in-memory
    /// roster stays authoritative.
    fn persist(&self) {
        let records = ParticipantMapper::to_record_list(&self.participants);
        if let Err(e) = self.storage.save(&records) {
            error!("Failed to persist roster snapshot: {}", e);
        }
        self.events.emit(LotteryEvent::RosterChanged);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::models::Tag;
    use crate::backend::storage::json::test_utils::TestEnvironment;
    use crate::backend::storage::{JsonRosterRepository, MemoryRosterStorage};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn setup_test() -> (RosterService, Arc<MemoryRosterStorage>) {
        setup_with_policy(NumberingPolicy::RosterLength)
    }

    fn setup_with_policy(numbering: NumberingPolicy) -> (RosterService, Arc<MemoryRosterStorage>) {
        let storage = Arc::new(MemoryRosterStorage::new());
        let service = RosterService::new(
            storage.clone(),
            TagResolver::new(),
            numbering,
            EventSink::detached(),
        );
        (service, storage)
    }

    fn add(service: &mut RosterService, name: &str, tag: Option<Tag>) -> Participant {
        service
            .add_participant(AddParticipantCommand {
                name: name.to_string(),
                tag,
            })
            .unwrap()
    }

    fn drain(rx: &mut UnboundedReceiver<LotteryEvent>) -> Vec<LotteryEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_add_participant_numbers_and_checks_in() {
        let (mut service, storage) = setup_test();

        for expected in 1..=3u32 {
            let before = service.participants().len() as u32;
            let participant = add(&mut service, &format!("  Guest {}  ", expected), None);
            assert_eq!(participant.number, before + 1);
            assert!(participant.is_checked_in);
            assert!(participant.checkin_time.is_some());
            assert!(!participant.is_winner);
        }

        assert_eq!(service.participants()[0].name, "Guest 1");
        assert_eq!(storage.snapshot().len(), 3);
    }

    #[test]
    fn test_add_participant_blank_name_is_noop() {
        let (mut service, storage) = setup_test();
        let (sink, mut rx) = EventSink::channel();
        service.events = sink;

        let result = service.add_participant(AddParticipantCommand {
            name: "   ".to_string(),
            tag: Some(Tag::Kol),
        });

        assert!(result.is_none());
        assert!(service.participants().is_empty());
        assert_eq!(storage.save_count(), 0);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_import_batch_parses_lines() {
        let (mut service, _storage) = setup_test();

        let imported = service.import_batch("Alice KOL\nBob\n");

        assert_eq!(imported.len(), 2);
        assert_eq!(imported[0].name, "Alice");
        assert_eq!(imported[0].tag, Some(Tag::Kol));
        assert!(!imported[0].is_checked_in);
        assert_eq!(imported[1].name, "Bob");
        assert_eq!(imported[1].tag, None);
        assert!(!imported[1].is_checked_in);
        assert_eq!(imported[1].checkin_time, None);
    }

    #[test]
    fn test_import_batch_blank_document_changes_nothing() {
        let (mut service, storage) = setup_test();
        add(&mut service, "Existing", None);
        let saves_before = storage.save_count();

        assert!(service.import_batch("").is_empty());
        assert!(service.import_batch("   \n\t\n  \n").is_empty());

        assert_eq!(service.participants().len(), 1);
        assert_eq!(storage.save_count(), saves_before);
    }

    #[test]
    fn test_import_batch_continues_numbering_and_keeps_order() {
        let (mut service, _storage) = setup_test();
        add(&mut service, "Door", None);

        let imported = service.import_batch("张三 学生\n\n  李四\t企业 extra words\n王五 vip\n");

        let numbers: Vec<u32> = imported.iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![2, 3, 4]);
        assert_eq!(imported[0].tag, Some(Tag::Student));
        assert_eq!(imported[1].name, "李四");
        assert_eq!(imported[1].tag, Some(Tag::Enterprise));
        assert_eq!(imported[2].tag, None);
    }

    #[test]
    fn test_import_batch_uses_injected_aliases() {
        let storage = Arc::new(MemoryRosterStorage::new());
        let mut service = RosterService::new(
            storage,
            TagResolver::new().with_alias("influencer", Tag::Kol),
            NumberingPolicy::RosterLength,
            EventSink::detached(),
        );

        let imported = service.import_batch("Carol Influencer");
        assert_eq!(imported[0].tag, Some(Tag::Kol));
    }

    #[test]
    fn test_toggle_check_in_is_its_own_inverse() {
        let (mut service, _storage) = setup_test();
        let imported = service.import_batch("Alice");
        let id = imported[0].id.clone();

        let checked_in = service.toggle_check_in(&id).unwrap();
        assert!(checked_in.is_checked_in);
        assert!(checked_in.checkin_time.is_some());

        let checked_out = service.toggle_check_in(&id).unwrap();
        assert!(!checked_out.is_checked_in);
        assert_eq!(checked_out.checkin_time, None);
        assert_eq!(service.get(&id).unwrap(), &imported[0]);
    }

    #[test]
    fn test_toggle_unknown_id_is_noop() {
        let (mut service, storage) = setup_test();
        assert!(service.toggle_check_in("participant::missing").is_none());
        assert_eq!(storage.save_count(), 0);
    }

    #[test]
    fn test_edit_participant_only_touches_name_and_tag() {
        let (mut service, _storage) = setup_test();
        let original = add(&mut service, "Alice", None);
        service.set_note(&original.id, "VIP seat").unwrap();
        service.commit_winner(&original.id);

        let edited = service
            .edit_participant(EditParticipantCommand {
                participant_id: original.id.clone(),
                name: "  Alicia ".to_string(),
                tag: Some(Tag::Enterprise),
            })
            .unwrap();

        assert_eq!(edited.name, "Alicia");
        assert_eq!(edited.tag, Some(Tag::Enterprise));
        assert_eq!(edited.number, original.number);
        assert!(edited.is_checked_in);
        assert!(edited.is_winner);
        assert_eq!(edited.note, "VIP seat");
        assert_eq!(edited.checkin_time, original.checkin_time);
    }

    #[test]
    fn test_edit_with_blank_name_is_rejected() {
        let (mut service, storage) = setup_test();
        let original = add(&mut service, "Alice", Some(Tag::Kol));
        let saves_before = storage.save_count();

        let result = service.edit_participant(EditParticipantCommand {
            participant_id: original.id.clone(),
            name: " ".to_string(),
            tag: None,
        });

        assert!(result.is_none());
        assert_eq!(service.get(&original.id).unwrap(), &original);
        assert_eq!(storage.save_count(), saves_before);
    }

    #[test]
    fn test_set_note_trims_and_allows_empty() {
        let (mut service, _storage) = setup_test();
        let participant = add(&mut service, "Alice", None);

        let noted = service.set_note(&participant.id, "  brought a guest ").unwrap();
        assert_eq!(noted.note, "brought a guest");

        let cleared = service.set_note(&participant.id, "   ").unwrap();
        assert_eq!(cleared.note, "");
    }

    #[test]
    fn test_delete_does_not_renumber() {
        let (mut service, _storage) = setup_test();
        let a = add(&mut service, "A", None);
        let b = add(&mut service, "B", None);
        let c = add(&mut service, "C", None);

        let removed = service.delete_participant(&b.id).unwrap();
        assert_eq!(removed.id, b.id);

        let numbers: Vec<u32> = service.participants().iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![a.number, c.number]);
        assert!(service.delete_participant(&b.id).is_none());
    }

    #[test]
    fn test_roster_length_numbering_can_repeat_after_delete() {
        let (mut service, _storage) = setup_test();
        let a = add(&mut service, "A", None);
        add(&mut service, "B", None);
        service.delete_participant(&a.id);

        // Size is 1 again, so the next number collides with B's
        let c = add(&mut service, "C", None);
        assert_eq!(c.number, 2);
    }

    #[test]
    fn test_monotonic_numbering_never_repeats() {
        let (mut service, _storage) = setup_with_policy(NumberingPolicy::Monotonic);
        let a = add(&mut service, "A", None);
        let b = add(&mut service, "B", None);
        service.delete_participant(&b.id);
        service.delete_participant(&a.id);

        let c = add(&mut service, "C", None);
        assert_eq!(c.number, 3);
        let imported = service.import_batch("D\nE");
        assert_eq!(imported[0].number, 4);
        assert_eq!(imported[1].number, 5);

        service.reset();
        assert_eq!(add(&mut service, "F", None).number, 1);
    }

    #[test]
    fn test_monotonic_numbering_continues_from_loaded_snapshot() {
        let storage = Arc::new(MemoryRosterStorage::new());
        {
            let mut first = RosterService::new(
                storage.clone(),
                TagResolver::new(),
                NumberingPolicy::RosterLength,
                EventSink::detached(),
            );
            first.import_batch("A\nB\nC");
            let b = first.find_by_number(2).unwrap().id.clone();
            first.delete_participant(&b);
        }

        let mut second = RosterService::new(
            storage,
            TagResolver::new(),
            NumberingPolicy::Monotonic,
            EventSink::detached(),
        );
        assert_eq!(add(&mut second, "D", None).number, 4);
    }

    #[test]
    fn test_reset_clears_everything() {
        let (mut service, storage) = setup_test();
        add(&mut service, "A", None);
        service.import_batch("B\nC");

        service.reset();

        assert!(service.participants().is_empty());
        assert!(storage.snapshot().is_empty());
        assert_eq!(service.stats(), RosterStats::default());
    }

    #[test]
    fn test_filter_matches_name_or_tag_label() {
        let (mut service, _storage) = setup_test();
        add(&mut service, "Nikola", None);
        add(&mut service, "Alice", Some(Tag::Kol));
        add(&mut service, "Bob", Some(Tag::Student));
        add(&mut service, "KOLLER", Some(Tag::Enterprise));
        add(&mut service, "Dana", None);

        let names: Vec<&str> = service.filter("kol").iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Nikola", "Alice", "KOLLER"]);

        let students: Vec<&str> = service.filter("学生").iter().map(|p| p.name.as_str()).collect();
        assert_eq!(students, vec!["Bob"]);

        // Canonical values are not labels
        assert!(service.filter("enterprise").is_empty());
    }

    #[test]
    fn test_filter_blank_query_returns_everything_in_order() {
        let (mut service, _storage) = setup_test();
        service.import_batch("C\nA\nB");

        let names: Vec<&str> = service.filter("  ").iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_eligible_excludes_winners_and_absent() {
        let (mut service, _storage) = setup_test();
        let present = add(&mut service, "Present", None);
        let winner = add(&mut service, "Winner", None);
        service.import_batch("Absent\nLate");
        let late = service.find_by_number(4).unwrap().id.clone();
        service.toggle_check_in(&late);
        service.commit_winner(&winner.id);

        let eligible: Vec<&str> = service.eligible().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(eligible, vec!["Present", "Late"]);
        assert!(service.eligible().iter().all(|p| p.is_checked_in && !p.is_winner));

        service.toggle_check_in(&present.id);
        let eligible: Vec<&str> = service.eligible().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(eligible, vec!["Late"]);
    }

    #[test]
    fn test_commit_winner_is_idempotent() {
        let (mut service, storage) = setup_test();
        let participant = add(&mut service, "Alice", None);

        assert!(service.commit_winner(&participant.id));
        let saves_after_first = storage.save_count();
        assert!(service.commit_winner(&participant.id));

        assert_eq!(storage.save_count(), saves_after_first);
        assert_eq!(service.winners().len(), 1);
        assert!(!service.commit_winner("participant::missing"));
    }

    #[test]
    fn test_stats() {
        let (mut service, _storage) = setup_test();
        let a = add(&mut service, "A", None);
        add(&mut service, "B", None);
        service.import_batch("C");
        service.commit_winner(&a.id);

        assert_eq!(
            service.stats(),
            RosterStats {
                total: 3,
                checked_in: 2,
                winners: 1,
                eligible: 1,
            }
        );
    }

    #[test]
    fn test_mutations_emit_roster_changed() {
        let (mut service, _storage) = setup_test();
        let (sink, mut rx) = EventSink::channel();
        service.events = sink;

        let participant = add(&mut service, "Alice", None);
        service.toggle_check_in(&participant.id);
        service.toggle_check_in("participant::missing");

        assert_eq!(
            drain(&mut rx),
            vec![LotteryEvent::RosterChanged, LotteryEvent::RosterChanged]
        );
    }

    #[test]
    fn test_corrupt_snapshot_starts_empty() {
        let storage = Arc::new(MemoryRosterStorage::corrupt());
        let service = RosterService::new(
            storage,
            TagResolver::new(),
            NumberingPolicy::RosterLength,
            EventSink::detached(),
        );
        assert!(service.participants().is_empty());
    }

    #[test]
    fn test_failed_save_keeps_in_memory_state() {
        let (mut service, storage) = setup_test();
        storage.set_fail_saves(true);

        let participant = add(&mut service, "Alice", None);

        assert_eq!(service.get(&participant.id).unwrap().name, "Alice");
        assert!(storage.snapshot().is_empty());
    }

    #[test]
    fn test_roster_survives_restart_with_file_storage() {
        let env = TestEnvironment::new().unwrap();
        let storage = Arc::new(JsonRosterRepository::new(env.connection.clone()));

        let id = {
            let mut service = RosterService::new(
                storage.clone(),
                TagResolver::new(),
                NumberingPolicy::RosterLength,
                EventSink::detached(),
            );
            let alice = add(&mut service, "Alice", Some(Tag::Kol));
            service.set_note(&alice.id, "speaker");
            service.import_batch("Bob 学生");
            alice.id
        };

        let reloaded = RosterService::new(
            storage,
            TagResolver::new(),
            NumberingPolicy::RosterLength,
            EventSink::detached(),
        );
        assert_eq!(reloaded.participants().len(), 2);
        let alice = reloaded.get(&id).unwrap();
        assert_eq!(alice.tag, Some(Tag::Kol));
        assert_eq!(alice.note, "speaker");
        assert_eq!(reloaded.participants()[1].tag, Some(Tag::Student));
    }

    #[test]
    fn test_corrupt_file_falls_back_to_empty_roster() {
        let env = TestEnvironment::new().unwrap();
        std::fs::write(env.base_directory().join("event-data.json"), "[{\"id\":").unwrap();

        let service = RosterService::new(
            Arc::new(JsonRosterRepository::new(env.connection.clone())),
            TagResolver::new(),
            NumberingPolicy::RosterLength,
            EventSink::detached(),
        );
        assert!(service.participants().is_empty());
    }
}
