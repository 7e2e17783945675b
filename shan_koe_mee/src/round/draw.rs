//! Third-card draws.
//!
//! Runs once per round after betting closes. The dealer's weak two-card
//! hand draws unconditionally; every other participating seat consults its
//! own draw policy. Hands at the stand-pat ceiling never draw no matter
//! what was requested.

use crate::game::entities::DrawPolicy;
use crate::game::scoring::{evaluate_or_degraded, stands_pat};
use crate::net::messages::ServerEvent;

use super::{safety, NextPhase, RoundEngine, WatchVariant};

pub(crate) fn process_draws(engine: &mut RoundEngine) {
    if safety::abort_round_if_no_connected_real_players(&mut engine.table, "draw") {
        return;
    }

    let evaluator = engine.evaluator.clone();
    let round_id = engine.table.round_id;
    let mut events: Vec<ServerEvent> = Vec::new();
    let mut anyone_drew = false;

    let table = &mut engine.table;
    if let Some(idx) = table.players.iter().position(|p| p.is_dealer) {
        let value = evaluate_or_degraded(evaluator.as_ref(), &table.players[idx].cards);
        if table.players[idx].cards.len() == 2
            && !table.players[idx].has_drawn
            && value.points < crate::game::constants::DRAW_POINT_THRESHOLD
        {
            if let Some(card) = table.deck.draw() {
                table.players[idx].cards.push(card);
                table.players[idx].has_drawn = true;
                anyone_drew = true;
                events.push(ServerEvent::DealerAutoDraw {
                    card: card.code(),
                    round_id,
                });
            }
        }
    }

    for idx in 0..table.players.len() {
        let player = &table.players[idx];
        if player.is_dealer || player.waiting || !player.is_active() {
            continue;
        }
        if player.cards.len() != 2 {
            continue;
        }
        let value = evaluate_or_degraded(evaluator.as_ref(), &player.cards);
        if stands_pat(value) || !player.kind.wants_third_card(value) {
            continue;
        }
        if let Some(card) = table.deck.draw() {
            let player = &mut table.players[idx];
            player.cards.push(card);
            player.has_drawn = true;
            anyone_drew = true;
            events.push(ServerEvent::PlayerDraw {
                username: player.username.clone(),
                card: card.code(),
            });
        }
    }

    for event in &events {
        table.broadcast(event);
    }

    if anyone_drew {
        super::watch::start_watch(engine, WatchVariant::ThreeCard);
    } else {
        engine.advance(NextPhase::FindWinner);
    }
}
