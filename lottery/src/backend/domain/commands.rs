// lottery/src/backend/domain/commands.rs

//! Domain-level command types.
//! The console (or any other host) maps raw operator input to these before
//! calling into the services.

pub mod roster {
    use crate::backend::domain::models::Tag;

    /// Input for adding one participant at the door.
    #[derive(Debug, Clone)]
    pub struct AddParticipantCommand {
        pub name: String,
        pub tag: Option<Tag>,
    }

    /// Input for correcting a participant's name and tag.
    #[derive(Debug, Clone)]
    pub struct EditParticipantCommand {
        pub participant_id: String,
        pub name: String,
        pub tag: Option<Tag>,
    }
}
