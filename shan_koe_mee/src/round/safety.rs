//! Round abort and the scheduled-callback validity guard.
//!
//! A table with no connected real players must not keep playing against
//! itself. Every entry point that resumes a round first runs the census
//! here; if nobody real is left, the round is aborted in one synchronous
//! step and the abort epoch is bumped so that already-scheduled callbacks
//! from the dead round can never run.

use crate::game::entities::Table;
use crate::net::messages::ServerEvent;

use super::RoundContext;

/// How many seats hold a real person with a live socket.
pub fn count_connected_real_players(table: &Table) -> usize {
    table
        .players
        .iter()
        .filter(|p| p.is_connected_human())
        .count()
}

/// Abort the current round if the census finds nobody. Returns true when an
/// abort happened, in which case the caller must stop immediately.
///
/// The abort is atomic from the actor's point of view: epoch bump, timer
/// clear, full table reset and the reset broadcast all happen before any
/// other message is processed.
pub fn abort_round_if_no_connected_real_players(table: &mut Table, reason: &str) -> bool {
    if count_connected_real_players(table) > 0 {
        return false;
    }

    table.abort_token += 1;
    table.round_aborted = true;
    log::warn!(
        "table {} aborting round {} ({reason}): no connected real players, token now {}",
        table.table_id,
        table.round_id,
        table.abort_token
    );

    table.timer = None;
    table.hard_reset();
    table.round_aborted = false;

    // AI seats are still listening in the sense that reconnecting clients
    // resync from the reset event.
    table.broadcast(&ServerEvent::TableReset {
        table_id: table.table_id.clone(),
    });
    true
}

/// Validate a scheduled callback's captured context against the table as it
/// is now. Returns false when the callback is stale and must not run.
///
/// The connectivity census runs last and has the abort side effect: a
/// callback from a live round that finds an empty table kills the round
/// itself rather than leaving it for a sweep.
pub fn is_round_context_valid(table: &mut Table, ctx: RoundContext, context: &str) -> bool {
    if ctx.round_id != table.round_id {
        log::debug!(
            "table {} drop {context} callback: round {} superseded by {}",
            table.table_id,
            ctx.round_id,
            table.round_id
        );
        return false;
    }
    if ctx.token != table.abort_token {
        log::debug!(
            "table {} drop {context} callback: token {} superseded by {}",
            table.table_id,
            ctx.token,
            table.abort_token
        );
        return false;
    }
    if abort_round_if_no_connected_real_players(table, context) {
        return false;
    }
    true
}
