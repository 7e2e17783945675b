//! Phase classification and the reconnect snapshot.
//!
//! A client that connects mid-round gets one snapshot describing what it
//! should be rendering right now. The phase is derived from the pending
//! timer first and the table flags second, so the snapshot can never claim
//! a phase whose timer already fired.

use serde::{Deserialize, Serialize};

use crate::game::entities::Table;
use crate::game::scoring::{evaluate_or_degraded, HandEvaluator};
use crate::net::messages::{GameSnapshot, SnapshotPlayer};

use super::TimerKind;

/// What a client should display for a table right now.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Countdown,
    Deal,
    Watch,
    Betting,
    Draw,
    Result,
    Payout,
    InRound,
}

/// Classify the table's current phase.
pub fn phase(table: &Table) -> Phase {
    match table.timer.map(|t| t.kind) {
        Some(TimerKind::PayoutPay | TimerKind::PayoutEnd) => Phase::Payout,
        Some(TimerKind::FindWinner { .. }) => Phase::Result,
        Some(
            TimerKind::DealerAction { .. }
            | TimerKind::DealerThink
            | TimerKind::CatchReveal
            | TimerKind::DealerDrawPause,
        ) => Phase::Draw,
        Some(TimerKind::Watch { .. } | TimerKind::WatchDelay { .. }) => Phase::Watch,
        Some(TimerKind::Betting { .. }) => Phase::Betting,
        Some(TimerKind::DealAck) => Phase::Deal,
        Some(TimerKind::Countdown { .. }) => Phase::Countdown,
        None => {
            if table.processing_result.is_some() {
                Phase::Result
            } else if table.round_in_progress && !table.deal_ack_received {
                Phase::Deal
            } else if table.round_in_progress {
                Phase::InRound
            } else {
                Phase::Idle
            }
        }
    }
}

/// Full table state for one connecting client. A malformed hand renders as
/// zero points rather than failing the snapshot.
pub fn build_snapshot(table: &Table, evaluator: &dyn HandEvaluator) -> GameSnapshot {
    let players = table
        .players
        .iter()
        .map(|p| {
            let value = evaluate_or_degraded(evaluator, &p.cards);
            SnapshotPlayer {
                seat_id: p.seat_id,
                username: p.username.clone(),
                waiting: p.waiting,
                leave_after_round: p.leave_after_round,
                is_dealer: p.is_dealer,
                cards: p.cards.clone(),
                points: value.points,
                multiplier: value.multiplier,
                current_bet: p.current_bet,
                balance: p.balance,
            }
        })
        .collect();

    GameSnapshot {
        table_id: table.table_id.clone(),
        round_id: table.round_id,
        phase: phase(table),
        game_in_progress: table.game_in_progress,
        join_locked: table.join_locked_for_round,
        players,
    }
}
