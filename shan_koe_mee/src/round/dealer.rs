//! Dealer decision window.
//!
//! After the three-card watch the dealer gets one action: catch a single
//! opponent, catch every three-card hand, catch the whole table, take a
//! late third card, or skip. A human dealer gets a ticking window and times
//! out into a skip; an AI dealer decides after a short think delay.

use crate::game::constants::DRAW_POINT_THRESHOLD;
use crate::game::entities::{DealerAction, HandValue, SeatId, Table, Username};
use crate::game::scoring::evaluate_or_degraded;
use crate::net::messages::{CaughtHand, RevealedHand, SeatRef, ServerEvent};

use super::{safety, NextPhase, PhaseTimer, RoundEngine, TimerKind};

/// Non-dealer seats participating in this round, in seat order.
fn opponent_seats(table: &Table) -> Vec<SeatId> {
    let mut seats: Vec<SeatId> = table
        .players
        .iter()
        .filter(|p| !p.is_dealer && !p.waiting && p.is_active())
        .map(|p| p.seat_id)
        .collect();
    seats.sort_unstable();
    seats
}

fn three_card_seats(table: &Table) -> Vec<SeatId> {
    opponent_seats(table)
        .into_iter()
        .filter(|seat| {
            table
                .player_by_seat(*seat)
                .map(|p| p.cards.len() == 3)
                .unwrap_or(false)
        })
        .collect()
}

/// House dealer heuristic: a weak two-card hand takes the late draw, a
/// table with three-card hands gets those caught, otherwise catch everyone.
pub(crate) fn ai_dealer_action(
    value: HandValue,
    card_count: usize,
    any_three_card_opponent: bool,
) -> DealerAction {
    if value.points < DRAW_POINT_THRESHOLD && card_count == 2 {
        DealerAction::Draw
    } else if any_three_card_opponent {
        DealerAction::Catch3Cards
    } else {
        DealerAction::CatchAll
    }
}

pub(crate) fn start_dealer_action(engine: &mut RoundEngine) {
    if safety::abort_round_if_no_connected_real_players(&mut engine.table, "dealer-action") {
        return;
    }
    let Some(dealer) = engine.table.dealer() else {
        log::error!(
            "table {} has no dealer at dealer-action start",
            engine.table.table_id
        );
        engine.advance(NextPhase::FindWinner);
        return;
    };
    let dealer_is_ai = dealer.is_ai();

    let round_id = engine.table.round_id;
    let ticks = engine.timings.dealer_window_ticks;
    let three_card_players: Vec<SeatRef> = three_card_seats(&engine.table)
        .into_iter()
        .filter_map(|seat| engine.table.player_by_seat(seat))
        .map(|p| SeatRef {
            username: p.username.clone(),
            seat_id: p.seat_id,
        })
        .collect();
    engine.table.broadcast(&ServerEvent::DealerActionStart {
        round_id,
        seconds: ticks,
        three_card_players,
    });

    if dealer_is_ai {
        let think = engine.timings.ai_think;
        engine.arm(TimerKind::DealerThink, think);
    } else {
        let tick = engine.timings.tick;
        engine.arm(TimerKind::DealerAction { remaining: ticks }, tick);
    }
}

pub(crate) fn dealer_think_elapsed(engine: &mut RoundEngine) {
    let Some(dealer) = engine.table.dealer() else {
        engine.advance(NextPhase::FindWinner);
        return;
    };
    let value = evaluate_or_degraded(engine.evaluator.as_ref(), &dealer.cards);
    let action = ai_dealer_action(
        value,
        dealer.cards.len(),
        !three_card_seats(&engine.table).is_empty(),
    );
    log::debug!(
        "table {} ai dealer picks {action:?}",
        engine.table.table_id
    );
    execute_dealer_action(engine, action, None);
}

pub(crate) fn dealer_action_tick(engine: &mut RoundEngine, remaining: u32) {
    let round_id = engine.table.round_id;
    let left = remaining.saturating_sub(1);
    if left > 0 {
        engine.table.broadcast(&ServerEvent::DealerActionTick {
            seconds: left,
            round_id,
        });
        let tick = engine.timings.tick;
        engine.arm(TimerKind::DealerAction { remaining: left }, tick);
    } else {
        log::info!(
            "table {} dealer window expired, skipping",
            engine.table.table_id
        );
        execute_dealer_action(engine, DealerAction::Skip, None);
    }
}

/// A dealer decision arriving over the wire. Ignored unless the decision
/// window is open and the sender holds the button; a catch naming a bad
/// target leaves the window running rather than stalling the round.
pub fn handle_dealer_decision(
    engine: &mut RoundEngine,
    username: &Username,
    action: DealerAction,
    target_seat_id: Option<SeatId>,
) {
    if safety::abort_round_if_no_connected_real_players(&mut engine.table, "dealer-decision") {
        return;
    }
    if !matches!(
        engine.table.timer,
        Some(PhaseTimer {
            kind: TimerKind::DealerAction { .. },
            ..
        })
    ) {
        log::debug!(
            "table {} ignore dealer decision from {username}: window closed",
            engine.table.table_id
        );
        return;
    }
    match engine.table.dealer() {
        Some(dealer) if &dealer.username == username => {}
        _ => {
            log::debug!(
                "table {} ignore dealer decision from non-dealer {username}",
                engine.table.table_id
            );
            return;
        }
    }

    let target = if action == DealerAction::Catch {
        let Some(seat) = target_seat_id else {
            log::debug!(
                "table {} catch without target from {username}",
                engine.table.table_id
            );
            return;
        };
        let resolvable = engine
            .table
            .player_by_seat(seat)
            .map(|p| !p.is_dealer)
            .unwrap_or(false);
        if !resolvable {
            log::debug!(
                "table {} catch target seat {seat} does not resolve",
                engine.table.table_id
            );
            return;
        }
        Some(seat)
    } else {
        None
    };

    engine.table.timer = None;
    execute_dealer_action(engine, action, target);
}

fn revealed_hands(engine: &RoundEngine, seats: &[SeatId]) -> Vec<RevealedHand> {
    seats
        .iter()
        .filter_map(|seat| engine.table.player_by_seat(*seat))
        .map(|p| {
            let value = evaluate_or_degraded(engine.evaluator.as_ref(), &p.cards);
            RevealedHand {
                username: p.username.clone(),
                seat_id: p.seat_id,
                cards: p.cards.clone(),
                points: value.points,
                multiplier: value.multiplier,
                is_shan: value.is_special,
            }
        })
        .collect()
}

fn caught_hand(table: &Table, seat: SeatId) -> Option<CaughtHand> {
    table.player_by_seat(seat).map(|p| CaughtHand {
        seat_id: p.seat_id,
        cards: p.cards.clone(),
    })
}

fn execute_dealer_action(
    engine: &mut RoundEngine,
    action: DealerAction,
    target: Option<SeatId>,
) {
    let round_id = engine.table.round_id;
    match action {
        DealerAction::Catch | DealerAction::Catch3Cards | DealerAction::CatchAll => {
            let caught: Vec<SeatId> = match action {
                DealerAction::Catch => target.into_iter().collect(),
                DealerAction::Catch3Cards => three_card_seats(&engine.table),
                _ => opponent_seats(&engine.table),
            };
            if caught.is_empty() {
                log::debug!(
                    "table {} {action:?} caught nobody, moving on",
                    engine.table.table_id
                );
                engine.advance(NextPhase::FindWinner);
                return;
            }

            let Some(dealer_seat) = engine.table.dealer().map(|d| d.seat_id) else {
                engine.advance(NextPhase::FindWinner);
                return;
            };
            // Only the caught hands go in the reveal; the dealer's own
            // cards appear solely in the catch overlay below.
            let players = revealed_hands(engine, &caught);
            engine.table.broadcast(&ServerEvent::CardsReveal { players });

            let dealer = caught_hand(&engine.table, dealer_seat)
                .unwrap_or(CaughtHand {
                    seat_id: dealer_seat,
                    cards: Vec::new(),
                });
            let (target_player, players) = match action {
                DealerAction::Catch => (target.and_then(|s| caught_hand(&engine.table, s)), None),
                _ => (
                    None,
                    Some(
                        caught
                            .iter()
                            .filter_map(|s| caught_hand(&engine.table, *s))
                            .collect(),
                    ),
                ),
            };
            engine.table.broadcast(&ServerEvent::DealerCatchShow {
                dealer,
                target_player,
                players,
                round_id,
            });
            let hold = engine.timings.catch_reveal;
            engine.arm(TimerKind::CatchReveal, hold);
        }
        DealerAction::Draw => {
            let table = &mut engine.table;
            let mut drew = None;
            if let Some(idx) = table.players.iter().position(|p| p.is_dealer) {
                if table.players[idx].cards.len() == 2 && !table.players[idx].has_drawn {
                    if let Some(card) = table.deck.draw() {
                        table.players[idx].cards.push(card);
                        table.players[idx].has_drawn = true;
                        drew = Some(card);
                    }
                }
            }
            match drew {
                Some(card) => {
                    engine.table.broadcast(&ServerEvent::DealerDraw {
                        card: card.code(),
                        round_id,
                    });
                    let pause = engine.timings.dealer_draw_pause;
                    engine.arm(TimerKind::DealerDrawPause, pause);
                }
                None => {
                    log::debug!(
                        "table {} dealer draw refused, moving on",
                        engine.table.table_id
                    );
                    engine.advance(NextPhase::FindWinner);
                }
            }
        }
        DealerAction::Skip | DealerAction::Unknown => {
            engine.advance(NextPhase::FindWinner);
        }
    }
}

pub(crate) fn catch_reveal_elapsed(engine: &mut RoundEngine) {
    let round_id = engine.table.round_id;
    engine
        .table
        .broadcast(&ServerEvent::DealerCatchHide { round_id });
    engine.advance(NextPhase::FindWinner);
}

pub(crate) fn dealer_draw_pause_elapsed(engine: &mut RoundEngine) {
    engine.advance(NextPhase::FindWinner);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::{Card, Deck, Player};
    use crate::testing::{ai, drain, engine_with, human, table_with, wire_type};

    fn cards(codes: &[&str]) -> Vec<Card> {
        codes.iter().map(|c| c.parse().unwrap()).collect()
    }

    fn value_of(codes: &[&str]) -> HandValue {
        use crate::game::scoring::{HandEvaluator, ShanEvaluator};
        ShanEvaluator.evaluate(&cards(codes)).unwrap()
    }

    #[test]
    fn heuristic_draws_catches_three_cards_or_catches_all() {
        // Two weak cards: take the late draw.
        let weak = value_of(&["13C", "2D"]);
        assert_eq!(ai_dealer_action(weak, 2, true), DealerAction::Draw);
        // Decent hand with a three-card opponent on the table.
        let mid = value_of(&["2C", "4D"]);
        assert_eq!(ai_dealer_action(mid, 2, true), DealerAction::Catch3Cards);
        // Strong hand, nobody drew: catch the whole table.
        let strong = value_of(&["4C", "5D"]);
        assert_eq!(ai_dealer_action(strong, 2, false), DealerAction::CatchAll);
        // Weak but already holding three cards cannot draw again.
        let weak3 = value_of(&["13C", "2D", "13H"]);
        assert_eq!(ai_dealer_action(weak3, 3, false), DealerAction::CatchAll);
    }

    fn seated(
        mut dealer: Player,
        opponent: Player,
    ) -> (
        crate::round::RoundEngine,
        tokio::sync::mpsc::UnboundedReceiver<crate::net::messages::ServerEvent>,
    ) {
        dealer.is_dealer = true;
        let (witness, rx) = human(9, "witness");
        let mut table = table_with(vec![dealer, opponent, witness]);
        table.round_id = 1;
        table.round_in_progress = true;
        table.deck = Deck::shuffled();
        let (engine, _sched) = engine_with(table);
        (engine, rx)
    }

    #[test]
    fn human_dealer_window_times_out_into_a_skip() {
        let (mut dealer, _dealer_rx) = human(0, "dealer");
        dealer.cards = cards(&["2C", "4D"]);
        let mut opp = ai(1, "opp");
        opp.cards = cards(&["2H", "3S", "4C"]);
        let (mut engine, mut rx) = seated(dealer, opp);

        start_dealer_action(&mut engine);
        assert!(matches!(
            engine.table.timer.unwrap().kind,
            TimerKind::DealerAction { remaining: 10 }
        ));
        for _ in 0..10 {
            engine.fire_timer();
        }

        let types: Vec<String> = drain(&mut rx).iter().map(wire_type).collect();
        assert_eq!(
            types
                .iter()
                .filter(|t| *t == "game:dealer:action:tick")
                .count(),
            9
        );
        // Timed out without revealing anything.
        assert!(!types.contains(&"table:cards:reveal".to_string()));
        assert!(types.contains(&"game:findwinner:start".to_string()));
    }

    #[test]
    fn ai_dealer_thinks_then_acts() {
        let mut dealer = ai(0, "dealer");
        dealer.cards = cards(&["2C", "4D"]); // 6 points
        let mut opp = ai(1, "opp");
        opp.cards = cards(&["2H", "3S", "4C"]);
        let (mut engine, mut rx) = seated(dealer, opp);

        start_dealer_action(&mut engine);
        assert_eq!(engine.table.timer.unwrap().kind, TimerKind::DealerThink);
        engine.fire_timer();

        // Catch3Cards: reveal and overlay, then the reveal hold.
        let types: Vec<String> = drain(&mut rx).iter().map(wire_type).collect();
        assert!(types.contains(&"table:cards:reveal".to_string()));
        assert!(types.contains(&"ui:dealercatchcardview:show".to_string()));
        assert_eq!(engine.table.timer.unwrap().kind, TimerKind::CatchReveal);

        engine.fire_timer();
        let types: Vec<String> = drain(&mut rx).iter().map(wire_type).collect();
        assert!(types.contains(&"ui:dealercatchcardview:hide".to_string()));
        assert!(types.contains(&"game:findwinner:start".to_string()));
    }

    #[test]
    fn decision_rejected_when_window_closed_or_sender_not_dealer() {
        let (mut dealer, _dealer_rx) = human(0, "dealer");
        dealer.cards = cards(&["2C", "4D"]);
        let mut opp = ai(1, "opp");
        opp.cards = cards(&["2H", "3S"]);
        let (mut engine, _rx) = seated(dealer, opp);

        // Window not armed yet.
        handle_dealer_decision(
            &mut engine,
            &Username::from("dealer"),
            DealerAction::CatchAll,
            None,
        );
        assert!(engine.table.timer.is_none());

        start_dealer_action(&mut engine);
        // Not the dealer.
        handle_dealer_decision(
            &mut engine,
            &Username::from("opp"),
            DealerAction::CatchAll,
            None,
        );
        assert!(matches!(
            engine.table.timer.unwrap().kind,
            TimerKind::DealerAction { .. }
        ));
    }

    #[test]
    fn catch_with_unresolvable_target_keeps_the_window_open() {
        let (mut dealer, _dealer_rx) = human(0, "dealer");
        dealer.cards = cards(&["4C", "5D"]);
        let mut opp = ai(1, "opp");
        opp.cards = cards(&["2H", "3S"]);
        let (mut engine, _rx) = seated(dealer, opp);
        start_dealer_action(&mut engine);

        // Nobody sits at seat 7.
        handle_dealer_decision(
            &mut engine,
            &Username::from("dealer"),
            DealerAction::Catch,
            Some(7),
        );
        assert!(matches!(
            engine.table.timer.unwrap().kind,
            TimerKind::DealerAction { .. }
        ));

        // Catch without a target at all.
        handle_dealer_decision(
            &mut engine,
            &Username::from("dealer"),
            DealerAction::Catch,
            None,
        );
        assert!(matches!(
            engine.table.timer.unwrap().kind,
            TimerKind::DealerAction { .. }
        ));

        // The dealer cannot catch its own seat.
        handle_dealer_decision(
            &mut engine,
            &Username::from("dealer"),
            DealerAction::Catch,
            Some(0),
        );
        assert!(matches!(
            engine.table.timer.unwrap().kind,
            TimerKind::DealerAction { .. }
        ));
    }

    #[test]
    fn catch_resolves_a_two_card_target() {
        let (mut dealer, _dealer_rx) = human(0, "dealer");
        dealer.cards = cards(&["4C", "5D"]);
        let mut opp = ai(1, "opp");
        opp.cards = cards(&["2H", "3S"]); // never drew, still catchable
        let (mut engine, mut rx) = seated(dealer, opp);
        start_dealer_action(&mut engine);

        handle_dealer_decision(
            &mut engine,
            &Username::from("dealer"),
            DealerAction::Catch,
            Some(1),
        );

        let events = drain(&mut rx);
        let types: Vec<String> = events.iter().map(wire_type).collect();
        assert!(types.contains(&"table:cards:reveal".to_string()));
        assert_eq!(engine.table.timer.unwrap().kind, TimerKind::CatchReveal);
    }

    #[test]
    fn catch_single_target_reveals_target_and_overlays_dealer() {
        let (mut dealer, _dealer_rx) = human(0, "dealer");
        dealer.cards = cards(&["4C", "5D"]);
        let mut opp = ai(1, "opp");
        opp.cards = cards(&["2H", "3S", "4C"]);
        let (mut engine, mut rx) = seated(dealer, opp);
        start_dealer_action(&mut engine);

        handle_dealer_decision(
            &mut engine,
            &Username::from("dealer"),
            DealerAction::Catch,
            Some(1),
        );

        let events = drain(&mut rx);
        // The reveal carries only the caught hand, never the dealer's.
        let reveal = events
            .iter()
            .find(|e| wire_type(e) == "table:cards:reveal")
            .unwrap();
        let json = serde_json::to_value(reveal).unwrap();
        let revealed = json["players"].as_array().unwrap();
        assert_eq!(revealed.len(), 1);
        assert_eq!(revealed[0]["seatId"], 1);

        let show = events
            .iter()
            .find(|e| wire_type(e) == "ui:dealercatchcardview:show")
            .unwrap();
        let json = serde_json::to_value(show).unwrap();
        assert_eq!(json["dealer"]["seatId"], 0);
        assert_eq!(json["targetPlayer"]["seatId"], 1);
        assert!(json.get("players").is_none());
        assert_eq!(engine.table.timer.unwrap().kind, TimerKind::CatchReveal);
    }

    #[test]
    fn late_dealer_draw_broadcasts_and_pauses() {
        let (mut dealer, _dealer_rx) = human(0, "dealer");
        dealer.cards = cards(&["13C", "2D"]);
        let mut opp = ai(1, "opp");
        opp.cards = cards(&["2H", "3S", "4C"]);
        let (mut engine, mut rx) = seated(dealer, opp);
        start_dealer_action(&mut engine);

        handle_dealer_decision(
            &mut engine,
            &Username::from("dealer"),
            DealerAction::Draw,
            None,
        );

        assert_eq!(engine.table.dealer().unwrap().cards.len(), 3);
        let types: Vec<String> = drain(&mut rx).iter().map(wire_type).collect();
        assert!(types.contains(&"game:dealer:draw".to_string()));
        assert_eq!(engine.table.timer.unwrap().kind, TimerKind::DealerDrawPause);

        engine.fire_timer();
        let types: Vec<String> = drain(&mut rx).iter().map(wire_type).collect();
        assert!(types.contains(&"game:findwinner:start".to_string()));
    }

    #[test]
    fn refused_late_draw_still_advances() {
        let (mut dealer, _dealer_rx) = human(0, "dealer");
        dealer.cards = cards(&["13C", "2D", "5H"]); // already three cards
        let mut opp = ai(1, "opp");
        opp.cards = cards(&["2H", "3S"]);
        let (mut engine, mut rx) = seated(dealer, opp);
        start_dealer_action(&mut engine);

        handle_dealer_decision(
            &mut engine,
            &Username::from("dealer"),
            DealerAction::Draw,
            None,
        );

        assert_eq!(engine.table.dealer().unwrap().cards.len(), 3);
        let types: Vec<String> = drain(&mut rx).iter().map(wire_type).collect();
        assert!(!types.contains(&"game:dealer:draw".to_string()));
        assert!(types.contains(&"game:findwinner:start".to_string()));
    }
}
