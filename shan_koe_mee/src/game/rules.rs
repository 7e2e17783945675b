//! Outcome rules: winner decision, result formatting and payout amounts.
//!
//! Like hand evaluation, these are collaborator contracts from the round
//! orchestrator's point of view. [`HouseRules`] is the default table policy;
//! the phase controllers never look inside it.

use serde_json::json;
use std::sync::Arc;

use super::entities::{Player, SeatId, Table, Username};
use super::scoring::{evaluate_or_degraded, HandEvaluator};
use crate::net::messages::PayoutEntry;

/// Winner decision, result payload and payout computation for one table.
///
/// `compute_payouts` both returns the per-player deltas and applies them to
/// balances; by the time the payout choreography broadcasts run, the money
/// has already moved.
pub trait OutcomeRules: Send + Sync {
    /// Which of the dealer's opponents beat the dealer this round.
    fn decide_winners(&self, dealer: &Player, opponents: &[&Player]) -> Vec<Username>;

    /// The outcome payload broadcast verbatim as the round result.
    fn build_result_payload(&self, table: &Table, active_seats: &[SeatId]) -> serde_json::Value;

    /// Settle every payable seat against the dealer and return the deltas.
    fn compute_payouts(
        &self,
        table: &mut Table,
        payable_seats: &[SeatId],
        winners: &[Username],
    ) -> Vec<PayoutEntry>;
}

/// Default rules: a hand beats the dealer on points, then multiplier, with
/// ties going to the dealer. Losers pay their bet times the dealer's
/// multiplier; winners collect their bet times their own multiplier.
pub struct HouseRules {
    evaluator: Arc<dyn HandEvaluator>,
}

impl HouseRules {
    pub fn new(evaluator: Arc<dyn HandEvaluator>) -> Self {
        Self { evaluator }
    }
}

impl OutcomeRules for HouseRules {
    fn decide_winners(&self, dealer: &Player, opponents: &[&Player]) -> Vec<Username> {
        let dealer_value = evaluate_or_degraded(self.evaluator.as_ref(), &dealer.cards);
        let dealer_key = (dealer_value.points, dealer_value.multiplier);
        opponents
            .iter()
            .filter(|p| {
                let value = evaluate_or_degraded(self.evaluator.as_ref(), &p.cards);
                (value.points, value.multiplier) > dealer_key
            })
            .map(|p| p.username.clone())
            .collect()
    }

    fn build_result_payload(&self, table: &Table, active_seats: &[SeatId]) -> serde_json::Value {
        let dealer_seat = table.dealer().map(|d| d.seat_id);
        let players: Vec<serde_json::Value> = active_seats
            .iter()
            .filter_map(|seat| table.player_by_seat(*seat))
            .map(|p| {
                let value = evaluate_or_degraded(self.evaluator.as_ref(), &p.cards);
                json!({
                    "username": p.username,
                    "seatId": p.seat_id,
                    "isDealer": p.is_dealer,
                    "cards": p.cards.iter().map(|c| c.code()).collect::<Vec<_>>(),
                    "points": value.points,
                    "multiplier": value.multiplier,
                    "isShan": value.is_special,
                    "isWinner": table.current_winners.contains(&p.username),
                })
            })
            .collect();

        json!({
            "roundId": table.round_id,
            "dealerSeatId": dealer_seat,
            "winners": table.current_winners,
            "players": players,
        })
    }

    fn compute_payouts(
        &self,
        table: &mut Table,
        payable_seats: &[SeatId],
        winners: &[Username],
    ) -> Vec<PayoutEntry> {
        let dealer_value = table
            .dealer()
            .map(|d| evaluate_or_degraded(self.evaluator.as_ref(), &d.cards))
            .unwrap_or_default();

        let mut entries = Vec::with_capacity(payable_seats.len());
        let mut dealer_delta: i64 = 0;

        for seat in payable_seats {
            let Some(idx) = table.players.iter().position(|p| p.seat_id == *seat) else {
                continue;
            };
            if table.players[idx].is_dealer {
                continue;
            }
            let value = evaluate_or_degraded(self.evaluator.as_ref(), &table.players[idx].cards);
            let player = &mut table.players[idx];
            let delta = if winners.contains(&player.username) {
                player.current_bet * i64::from(value.multiplier)
            } else {
                -(player.current_bet * i64::from(dealer_value.multiplier))
            };
            player.balance += delta;
            dealer_delta -= delta;
            entries.push(PayoutEntry {
                username: player.username.clone(),
                seat_id: player.seat_id,
                is_dealer: false,
                result_amount: delta,
            });
        }

        if let Some(dealer) = table.dealer_mut() {
            dealer.balance += dealer_delta;
            entries.push(PayoutEntry {
                username: dealer.username.clone(),
                seat_id: dealer.seat_id,
                is_dealer: true,
                result_amount: dealer_delta,
            });
        }

        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::Card;
    use crate::game::scoring::ShanEvaluator;
    use crate::testing::{ai, table_with};

    fn rules() -> HouseRules {
        HouseRules::new(Arc::new(ShanEvaluator))
    }

    fn cards(codes: &[&str]) -> Vec<Card> {
        codes.iter().map(|c| c.parse().unwrap()).collect()
    }

    #[test]
    fn winners_must_strictly_beat_the_dealer() {
        let mut dealer = ai(0, "dealer");
        dealer.is_dealer = true;
        dealer.cards = cards(&["13C", "6D"]); // 6 points
        let mut beats = ai(1, "beats");
        beats.cards = cards(&["4C", "5D"]); // 9 points
        let mut ties = ai(2, "ties");
        ties.cards = cards(&["2C", "4H"]); // 6 points, same multiplier
        let mut loses = ai(3, "loses");
        loses.cards = cards(&["2C", "3H"]); // 5 points

        let winners = rules().decide_winners(&dealer, &[&beats, &ties, &loses]);
        assert_eq!(winners, vec![Username::from("beats")]);
    }

    #[test]
    fn payouts_balance_to_zero_and_exclude_nobody_payable() {
        let mut table = table_with(vec![
            {
                let mut d = ai(0, "dealer");
                d.is_dealer = true;
                d.cards = cards(&["13C", "6D"]); // 6 points, x1
                d
            },
            {
                let mut w = ai(1, "winner");
                w.cards = cards(&["4D", "5D"]); // 9 points, flush
                w.current_bet = 100;
                w
            },
            {
                let mut l = ai(2, "loser");
                l.cards = cards(&["2C", "3H"]); // 5 points
                l.current_bet = 50;
                l
            },
        ]);

        let winners = vec![Username::from("winner")];
        let entries = rules().compute_payouts(&mut table, &[0, 1, 2], &winners);

        let total: i64 = entries.iter().map(|e| e.result_amount).sum();
        assert_eq!(total, 0);

        let winner = entries.iter().find(|e| e.username.as_str() == "winner").unwrap();
        assert_eq!(winner.result_amount, 200); // flush hand pays x2
        let loser = entries.iter().find(|e| e.username.as_str() == "loser").unwrap();
        assert_eq!(loser.result_amount, -50);
        let dealer = entries.iter().find(|e| e.is_dealer).unwrap();
        assert_eq!(dealer.result_amount, -150);

        assert_eq!(table.players[1].balance, 1200);
        assert_eq!(table.players[2].balance, 950);
        assert_eq!(table.players[0].balance, 850);
    }

    #[test]
    fn zero_bet_yields_zero_delta_entry() {
        let mut table = table_with(vec![
            {
                let mut d = ai(0, "dealer");
                d.is_dealer = true;
                d.cards = cards(&["13C", "6D"]);
                d
            },
            {
                let mut p = ai(1, "idle");
                p.cards = cards(&["2C", "3H"]);
                p.current_bet = 0;
                p
            },
        ]);

        let entries = rules().compute_payouts(&mut table, &[0, 1], &[]);
        let idle = entries.iter().find(|e| e.username.as_str() == "idle").unwrap();
        assert_eq!(idle.result_amount, 0);
    }

    #[test]
    fn result_payload_carries_winner_flags() {
        let mut table = table_with(vec![
            {
                let mut d = ai(0, "dealer");
                d.is_dealer = true;
                d.cards = cards(&["13C", "6D"]);
                d
            },
            {
                let mut w = ai(1, "winner");
                w.cards = cards(&["4C", "5D"]);
                w
            },
        ]);
        table.round_id = 7;
        table.current_winners = vec![Username::from("winner")];

        let payload = rules().build_result_payload(&table, &[0, 1]);
        assert_eq!(payload["roundId"], 7);
        assert_eq!(payload["dealerSeatId"], 0);
        assert_eq!(payload["players"][1]["isWinner"], true);
        assert_eq!(payload["players"][0]["isWinner"], false);
        assert_eq!(payload["players"][1]["cards"][0], "4C");
    }
}
