//! Shan Koe Mee table server core.
//!
//! The crate is split the way the runtime is split:
//!
//! - [`game`]: cards, seats, hand evaluation and house rules. Pure and
//!   synchronous.
//! - [`round`]: the phase orchestrator. Also synchronous; it records what
//!   should happen next in a single per-table timer slot instead of
//!   touching the clock.
//! - [`table`]: one actor task per table that owns the clock and the
//!   message inbox, plus the registry that spawns them.
//! - [`net`]: the wire message types shared with clients.
//!
//! Round safety rests on two numbers: the round id and the abort token.
//! Every scheduled callback captures both at phase entry and re-validates
//! them when it fires, so nothing from a dead round can touch a live table.

pub mod game;
pub mod net;
pub mod round;
pub mod table;

#[cfg(test)]
pub(crate) mod testing;

pub use game::entities::{
    Card, Chips, DealerAction, DrawAction, Player, SeatId, Suit, Table, TableId, Username,
};
pub use game::rules::{HouseRules, OutcomeRules};
pub use game::scoring::{HandEvaluator, ShanEvaluator};
pub use net::messages::{ClientCommand, GameSnapshot, ServerEvent, TableSummary};
pub use net::EventSender;
pub use round::snapshot::Phase;
pub use round::{NextRoundScheduler, PhaseTimings, RoundEngine};
pub use table::actor::TableHandle;
pub use table::manager::{TableConfig, TableManager};
pub use table::messages::{TableMessage, TableResponse};
