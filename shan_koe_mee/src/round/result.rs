//! Winner resolution and the payout choreography.
//!
//! The result phase is guarded by a per-round re-entrancy lock: whichever
//! path reaches it first (no draws, dealer skip, catch reveal) wins, and a
//! second entry for the same round is a logged no-op. Settlement runs in
//! three timed broadcasts: losers pay in, winners are paid out, then the
//! round closes.

use crate::game::entities::SeatId;
use crate::net::messages::ServerEvent;

use super::{safety, RoundEngine, TimerKind};

/// Seats taking part in the round right now.
fn active_seats(engine: &RoundEngine) -> Vec<SeatId> {
    let mut seats: Vec<SeatId> = engine
        .table
        .players
        .iter()
        .filter(|p| !p.waiting && p.is_active())
        .map(|p| p.seat_id)
        .collect();
    seats.sort_unstable();
    seats
}

/// Seats that settle this round: the dealer and AI seats always settle,
/// humans only while connected. Waiting seats pass through with a zero bet.
fn payable_seats(engine: &RoundEngine) -> Vec<SeatId> {
    engine
        .table
        .players
        .iter()
        .filter(|p| p.is_dealer || p.is_ai() || p.live_connection().is_some())
        .map(|p| p.seat_id)
        .collect()
}

pub(crate) fn start_find_winner(engine: &mut RoundEngine) {
    if safety::abort_round_if_no_connected_real_players(&mut engine.table, "find-winner") {
        return;
    }
    let round_id = engine.table.round_id;
    if engine.table.processing_result == Some(round_id) {
        log::info!(
            "table {} round {round_id} result already processing",
            engine.table.table_id
        );
        return;
    }
    engine.table.processing_result = Some(round_id);

    let ticks = engine.timings.find_winner_ticks;
    engine.table.broadcast(&ServerEvent::FindWinnerStart {
        seconds: ticks,
        round_id,
    });
    let tick = engine.timings.tick;
    engine.arm(TimerKind::FindWinner { remaining: ticks }, tick);
}

pub(crate) fn find_winner_tick(engine: &mut RoundEngine, remaining: u32) {
    let round_id = engine.table.round_id;
    let left = remaining.saturating_sub(1);
    if left > 0 {
        engine.table.broadcast(&ServerEvent::FindWinnerTick {
            seconds: left,
            round_id,
        });
        let tick = engine.timings.tick;
        engine.arm(TimerKind::FindWinner { remaining: left }, tick);
        return;
    }

    let rules = engine.rules.clone();
    let seats = active_seats(engine);

    // The dealer must still be part of the active set. A dealer whose
    // socket died mid-round leaves no hand to settle against; the round is
    // abandoned without an outcome.
    let Some(dealer) = engine
        .table
        .players
        .iter()
        .find(|p| p.is_dealer && !p.waiting && p.is_active())
    else {
        log::error!(
            "table {} round {round_id} has no active dealer at resolution",
            engine.table.table_id
        );
        engine.table.processing_result = None;
        engine.complete_round();
        return;
    };
    let opponents: Vec<&crate::game::entities::Player> = engine
        .table
        .players
        .iter()
        .filter(|p| !p.is_dealer && !p.waiting && p.is_active())
        .collect();
    let winners = rules.decide_winners(dealer, &opponents);
    log::info!(
        "table {} round {round_id} winners: {winners:?}",
        engine.table.table_id
    );
    engine.table.current_winners = winners;

    let payload = rules.build_result_payload(&engine.table, &seats);
    engine
        .table
        .broadcast(&ServerEvent::RoundResult { result: payload });
    start_payout(engine);
}

fn start_payout(engine: &mut RoundEngine) {
    let rules = engine.rules.clone();
    let round_id = engine.table.round_id;
    let payable = payable_seats(engine);
    let winners = engine.table.current_winners.clone();
    let entries = rules.compute_payouts(&mut engine.table, &payable, &winners);
    engine.table.pending_payouts = entries;

    let Some(dealer_seat_id) = engine.table.dealer().map(|d| d.seat_id) else {
        engine.table.processing_result = None;
        engine.complete_round();
        return;
    };
    let losers: Vec<_> = engine
        .table
        .pending_payouts
        .iter()
        .filter(|e| e.result_amount < 0 && !e.is_dealer)
        .cloned()
        .collect();
    engine.table.broadcast(&ServerEvent::PayoutCollect {
        round_id,
        dealer_seat_id,
        losers,
    });
    let hold = engine.timings.payout_collect_hold;
    engine.arm(TimerKind::PayoutPay, hold);
}

pub(crate) fn payout_pay_elapsed(engine: &mut RoundEngine) {
    let round_id = engine.table.round_id;
    let Some(dealer_seat_id) = engine.table.dealer().map(|d| d.seat_id) else {
        payout_end_elapsed(engine);
        return;
    };
    let winners: Vec<_> = engine
        .table
        .pending_payouts
        .iter()
        .filter(|e| e.result_amount > 0 && !e.is_dealer)
        .cloned()
        .collect();
    engine.table.broadcast(&ServerEvent::PayoutPay {
        round_id,
        dealer_seat_id,
        winners,
    });
    let hold = engine.timings.payout_pay_hold;
    engine.arm(TimerKind::PayoutEnd, hold);
}

pub(crate) fn payout_end_elapsed(engine: &mut RoundEngine) {
    let round_id = engine.table.round_id;
    engine.table.broadcast(&ServerEvent::PayoutEnd { round_id });
    engine.table.processing_result = None;
    engine.table.pending_payouts.clear();
    engine.table.current_winners.clear();
    engine.complete_round();
}
