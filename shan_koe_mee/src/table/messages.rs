//! Messages understood by a table actor.

use tokio::sync::oneshot;

use crate::game::entities::{Chips, Username};
use crate::net::messages::{ClientCommand, TableSummary};
use crate::net::EventSender;

/// Inbox messages for one table actor. Everything that touches table state
/// goes through here; the actor is the only writer.
#[derive(Debug)]
pub enum TableMessage {
    Join {
        username: Username,
        connection: EventSender,
        buy_in: Chips,
        response: oneshot::Sender<TableResponse>,
    },
    Leave {
        username: Username,
        response: oneshot::Sender<TableResponse>,
    },
    /// Socket closed without a leave. The seat survives for a reconnect.
    Disconnect { username: Username },
    Command {
        username: Username,
        command: ClientCommand,
    },
    /// Start the next round if the table is idle and playable.
    StartRound,
    GetSummary {
        response: oneshot::Sender<TableSummary>,
    },
    /// Periodic zombie check from the manager.
    Sweep,
}

#[derive(Debug, Eq, PartialEq)]
pub enum TableResponse {
    Success,
    TableFull,
    Error(String),
}

impl TableResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, TableResponse::Success)
    }
}
