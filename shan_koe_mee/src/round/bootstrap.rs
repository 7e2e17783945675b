//! Round start: countdown, deal, deal acknowledgement and betting.

use crate::game::entities::{Chips, DrawAction, Table, Username};
use crate::net::messages::{PlayerUpdate, ServerEvent};

use super::{safety, NextPhase, RoundEngine, TimerKind, WatchVariant};

/// Seats that can be dealt into the next round.
fn eligible_seats(table: &Table) -> Vec<u8> {
    table
        .players
        .iter()
        .filter(|p| p.is_active() && p.balance > 0)
        .map(|p| p.seat_id)
        .collect()
}

pub fn player_updates(table: &Table) -> Vec<PlayerUpdate> {
    table
        .players
        .iter()
        .map(|p| PlayerUpdate {
            username: p.username.clone(),
            seat_id: p.seat_id,
            current_bet: p.current_bet,
            balance: p.balance,
        })
        .collect()
}

/// Begin the pre-round countdown if the table is idle and playable. Called
/// after a completed round, and when a join brings an idle table up to
/// strength. A table with no connected real players never starts.
pub fn schedule_round_start(engine: &mut RoundEngine) {
    let table = &engine.table;
    if table.round_in_progress || table.timer.is_some() {
        return;
    }
    if safety::count_connected_real_players(table) == 0 {
        log::debug!(
            "table {} not starting: no connected real players",
            table.table_id
        );
        return;
    }
    if eligible_seats(table).len() < 2 {
        log::debug!("table {} not starting: not enough seats", table.table_id);
        return;
    }

    let ticks = engine.timings.countdown_ticks;
    engine.table.game_in_progress = true;
    engine.table.waiting_for_next_round = false;
    engine.table.broadcast(&ServerEvent::CountdownTick { seconds: ticks });
    let tick = engine.timings.tick;
    engine.arm(TimerKind::Countdown { remaining: ticks }, tick);
}

pub(crate) fn countdown_tick(engine: &mut RoundEngine, remaining: u32) {
    let left = remaining.saturating_sub(1);
    if left > 0 {
        engine
            .table
            .broadcast(&ServerEvent::CountdownTick { seconds: left });
        let tick = engine.timings.tick;
        engine.arm(TimerKind::Countdown { remaining: left }, tick);
    } else {
        begin_round(engine);
    }
}

/// Deal the next round: bump the round id, rotate the dealer button, take
/// default bets and push two cards to every participating seat.
pub(crate) fn begin_round(engine: &mut RoundEngine) {
    let eligible = eligible_seats(&engine.table);
    if eligible.len() < 2 {
        log::warn!(
            "table {} cannot deal: {} eligible seats",
            engine.table.table_id,
            eligible.len()
        );
        engine.table.game_in_progress = false;
        return;
    }

    let table = &mut engine.table;
    table.round_id += 1;
    table.round_in_progress = true;
    table.join_locked_for_round = true;
    table.deal_ack_received = false;
    table.waiting_for_next_round = false;
    table.current_winners.clear();
    table.pending_payouts.clear();

    let dealer_seat = eligible[(table.round_id as usize) % eligible.len()];
    for player in &mut table.players {
        player.reset_for_round();
        if eligible.contains(&player.seat_id) {
            player.waiting = false;
            player.is_dealer = player.seat_id == dealer_seat;
        } else {
            // Seats that joined mid-round or ran dry sit this one out.
            player.waiting = true;
        }
    }

    let default_bet = table.default_bet;
    for player in &mut table.players {
        if !player.waiting && !player.is_dealer {
            player.current_bet = default_bet.min(player.balance);
        }
    }

    table.deck = crate::game::entities::Deck::shuffled();
    for _ in 0..2 {
        for idx in 0..table.players.len() {
            if table.players[idx].waiting {
                continue;
            }
            if let Some(card) = table.deck.draw() {
                table.players[idx].cards.push(card);
            }
        }
    }

    let round_id = table.round_id;
    log::info!(
        "table {} dealing round {round_id}, dealer seat {dealer_seat}",
        table.table_id
    );
    table.broadcast(&ServerEvent::Deal {
        round_id,
        dealer_seat_id: dealer_seat,
    });
    table.broadcast(&ServerEvent::TableUpdate {
        players: player_updates(table),
    });
    for player in &table.players {
        if player.waiting || player.is_ai() {
            continue;
        }
        table.unicast(
            player,
            &ServerEvent::DealHand {
                round_id,
                cards: player.cards.clone(),
            },
            "deal",
        );
    }

    let delay = engine.timings.deal_ack;
    engine.arm(TimerKind::DealAck, delay);
}

/// A client confirmed its deal animation finished. The first ack releases
/// the round into the two-card watch; later acks are no-ops.
pub fn handle_deal_ack(engine: &mut RoundEngine) {
    if engine.table.deal_ack_received {
        return;
    }
    engine.table.deal_ack_received = true;
    if matches!(
        engine.table.timer,
        Some(super::PhaseTimer {
            kind: TimerKind::DealAck,
            ..
        })
    ) {
        engine.table.timer = None;
        super::watch::start_watch(engine, WatchVariant::TwoCard);
    }
}

/// No client acked in time; proceed anyway.
pub(crate) fn deal_ack_elapsed(engine: &mut RoundEngine) {
    engine.table.deal_ack_received = true;
    super::watch::start_watch(engine, WatchVariant::TwoCard);
}

pub(crate) fn start_betting(engine: &mut RoundEngine) {
    let ticks = engine.timings.betting_ticks;
    let round_id = engine.table.round_id;
    engine.table.broadcast(&ServerEvent::BettingStart {
        seconds: ticks,
        round_id,
    });
    let tick = engine.timings.tick;
    engine.arm(TimerKind::Betting { remaining: ticks }, tick);
}

pub(crate) fn betting_tick(engine: &mut RoundEngine, remaining: u32) {
    let round_id = engine.table.round_id;
    let left = remaining.saturating_sub(1);
    if left > 0 {
        engine.table.broadcast(&ServerEvent::BettingTick {
            seconds: left,
            round_id,
        });
        let tick = engine.timings.tick;
        engine.arm(TimerKind::Betting { remaining: left }, tick);
    } else {
        engine.table.broadcast(&ServerEvent::BettingEnd { round_id });
        engine.advance(NextPhase::Draw);
    }
}

/// Accept a bet while the betting window is open. Outside the window the
/// command is dropped with a log line, never an error back to the client.
pub fn handle_bet(engine: &mut RoundEngine, username: &Username, amount: Chips) {
    if !matches!(
        engine.table.timer,
        Some(super::PhaseTimer {
            kind: TimerKind::Betting { .. },
            ..
        })
    ) {
        log::debug!(
            "table {} ignore bet from {username}: no betting window",
            engine.table.table_id
        );
        return;
    }
    let table = &mut engine.table;
    let Some(player) = table.player_by_username_mut(username) else {
        return;
    };
    if player.is_dealer || player.waiting {
        return;
    }
    player.current_bet = amount.clamp(0, player.balance);
    let updates = player_updates(table);
    table.broadcast(&ServerEvent::TableUpdate { players: updates });
}

/// Record a human's draw/stand preference ahead of the draw phase.
pub fn handle_draw_preference(engine: &mut RoundEngine, username: &Username, action: DrawAction) {
    if !engine.table.round_in_progress {
        return;
    }
    if let Some(player) = engine.table.player_by_username_mut(username) {
        if !player.is_ai() && !player.waiting {
            player.set_draw_action(Some(action));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ai, drain, engine_with, human, table_with, wire_type};

    #[test]
    fn idle_table_with_players_schedules_a_countdown() {
        let (alice, mut rx) = human(0, "alice");
        let (mut engine, _sched) = engine_with(table_with(vec![alice, ai(1, "bot")]));

        schedule_round_start(&mut engine);

        assert!(engine.table.game_in_progress);
        let timer = engine.table.timer.unwrap();
        assert_eq!(timer.kind, TimerKind::Countdown { remaining: 5 });
        let events = drain(&mut rx);
        assert_eq!(wire_type(&events[0]), "game:countdown:tick");
    }

    #[test]
    fn table_without_humans_never_starts() {
        let (mut engine, _sched) = engine_with(table_with(vec![ai(0, "a"), ai(1, "b")]));
        schedule_round_start(&mut engine);
        assert!(engine.table.timer.is_none());
        assert!(!engine.table.game_in_progress);
    }

    #[test]
    fn countdown_ticks_down_then_deals() {
        let (alice, mut rx) = human(0, "alice");
        let (mut engine, _sched) = engine_with(table_with(vec![alice, ai(1, "bot")]));
        schedule_round_start(&mut engine);

        for _ in 0..5 {
            engine.fire_timer();
        }

        assert_eq!(engine.table.round_id, 1);
        assert!(engine.table.round_in_progress);
        assert!(engine.table.join_locked_for_round);
        let timer = engine.table.timer.unwrap();
        assert_eq!(timer.kind, TimerKind::DealAck);

        let events = drain(&mut rx);
        let types: Vec<String> = events.iter().map(wire_type).collect();
        // 4 countdown ticks after the initial one, then the deal burst.
        assert_eq!(types.iter().filter(|t| *t == "game:countdown:tick").count(), 4);
        assert!(types.contains(&"game:deal".to_string()));
        assert!(types.contains(&"game:deal:hand".to_string()));

        // Everyone dealt in got exactly two cards.
        for p in &engine.table.players {
            assert_eq!(p.cards.len(), 2);
        }
    }

    #[test]
    fn dealer_rotates_with_the_round_id() {
        let (alice, _rx) = human(0, "alice");
        let (mut engine, _sched) = engine_with(table_with(vec![alice, ai(1, "b"), ai(2, "c")]));
        engine.table.round_id = 3;
        begin_round(&mut engine);
        // Round id becomes 4; 4 % 3 seats = seat index 1.
        let dealer = engine.table.dealer().unwrap();
        assert_eq!(dealer.seat_id, 1);
    }

    #[test]
    fn non_dealers_get_the_default_bet_clamped_to_balance() {
        let (alice, _rx) = human(0, "alice");
        let mut short = ai(1, "short");
        short.balance = 20;
        let (mut engine, _sched) = engine_with(table_with(vec![alice, short, ai(2, "c")]));
        engine.table.default_bet = 50;
        begin_round(&mut engine);

        for p in &engine.table.players {
            if p.is_dealer {
                assert_eq!(p.current_bet, 0);
            } else if p.username.as_str() == "short" {
                assert_eq!(p.current_bet, 20);
            } else {
                assert_eq!(p.current_bet, 50);
            }
        }
    }

    #[test]
    fn deal_ack_releases_the_round_early() {
        let (alice, mut rx) = human(0, "alice");
        let (mut engine, _sched) = engine_with(table_with(vec![alice, ai(1, "bot")]));
        begin_round(&mut engine);
        drain(&mut rx);

        handle_deal_ack(&mut engine);

        assert!(engine.table.deal_ack_received);
        // The deal-ack timer was replaced by the two-card watch phase.
        let timer = engine.table.timer.unwrap();
        assert!(matches!(
            timer.kind,
            TimerKind::Watch {
                variant: WatchVariant::TwoCard,
                ..
            }
        ));
        // A second ack changes nothing.
        let seq = timer.seq;
        handle_deal_ack(&mut engine);
        assert_eq!(engine.table.timer.unwrap().seq, seq);
    }

    #[test]
    fn bets_are_accepted_only_inside_the_window() {
        let (alice, mut rx) = human(0, "alice");
        let name = alice.username.clone();
        let (mut engine, _sched) = engine_with(table_with(vec![alice, ai(1, "bot")]));
        begin_round(&mut engine);
        // Make the human a non-dealer regardless of rotation.
        for p in &mut engine.table.players {
            p.is_dealer = p.username.as_str() == "bot";
        }
        drain(&mut rx);

        // No betting window armed yet.
        handle_bet(&mut engine, &name, 300);
        assert_ne!(
            engine.table.player_by_username(&name).unwrap().current_bet,
            300
        );

        start_betting(&mut engine);
        handle_bet(&mut engine, &name, 300);
        assert_eq!(
            engine.table.player_by_username(&name).unwrap().current_bet,
            300
        );

        // Overbetting clamps to balance.
        handle_bet(&mut engine, &name, 99_999);
        assert_eq!(
            engine.table.player_by_username(&name).unwrap().current_bet,
            1000
        );
    }

    #[test]
    fn betting_window_runs_out_into_the_draw_phase() {
        let (alice, mut rx) = human(0, "alice");
        let (mut engine, _sched) = engine_with(table_with(vec![alice, ai(1, "bot")]));
        begin_round(&mut engine);
        engine.table.timer = None;
        start_betting(&mut engine);
        drain(&mut rx);

        for _ in 0..10 {
            engine.fire_timer();
        }

        let events = drain(&mut rx);
        let types: Vec<String> = events.iter().map(wire_type).collect();
        assert_eq!(types.iter().filter(|t| *t == "game:betting:tick").count(), 9);
        assert!(types.contains(&"game:betting:end".to_string()));
    }
}
