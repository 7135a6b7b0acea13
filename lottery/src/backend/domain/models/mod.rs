pub mod participant;
pub mod tag;

pub use participant::{checkin_timestamp, Participant};
pub use tag::Tag;
