pub mod client;
pub mod error;
pub mod model;

pub use client::MeetingsApi;
pub use error::MeetingsError;
pub use model::{
    AttendanceCommand, AttendanceInterval, CalendarDate, Meeting, MeetingKey, MeetingPatch,
};
