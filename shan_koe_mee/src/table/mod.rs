//! Table actors and their registry.

pub mod actor;
pub mod manager;
pub mod messages;
