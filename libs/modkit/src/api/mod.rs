//! HTTP error surface shared by all modules.

pub mod problem;
