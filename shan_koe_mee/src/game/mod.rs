//! Cards, seats, scoring and house rules.
//!
//! Everything in here is synchronous and deterministic (shuffling aside);
//! time and transport live in the `round` and `table` modules.

pub mod constants;
pub mod entities;
pub mod rules;
pub mod scoring;
