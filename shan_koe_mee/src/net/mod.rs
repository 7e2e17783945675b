//! Wire-facing components: event/command types and connection helpers.

pub mod messages;

use tokio::sync::mpsc;

use self::messages::ServerEvent;

/// Outbound half of a client connection. The receiving side lives with the
/// socket task; when that task dies the sender reports closed and the player
/// record survives without a connection.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// Send an event over a connection, reporting delivery instead of failing.
/// A closed connection is an expected condition, never an error.
pub fn safe_send(tx: &EventSender, event: &ServerEvent) -> bool {
    tx.send(event.clone()).is_ok()
}
