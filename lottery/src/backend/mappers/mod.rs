//! Conversions between domain models and the `shared` DTOs used for
//! persistence and presentation events.

pub mod participant_mapper;

pub use participant_mapper::ParticipantMapper;
