pub mod attendance;
pub mod meeting;
