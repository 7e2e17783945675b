//! Hand evaluation.
//!
//! The orchestrator only consumes the [`HandEvaluator`] contract; the exact
//! scoring table is house policy and can be swapped without touching any
//! phase logic. An evaluation failure degrades the one affected hand to zero
//! points, it never aborts a phase.

use thiserror::Error;

use super::constants::{SHAN_POINTS, STAND_PAT_POINTS};
use super::entities::{Card, HandValue};

#[derive(Debug, Error, Eq, PartialEq)]
pub enum EvalError {
    #[error("hand has {0} cards, expected 2 or 3")]
    WrongCardCount(usize),
}

/// Maps a hand to points, payout multiplier and the special-hand flag.
/// Implementations must be deterministic and side-effect free.
pub trait HandEvaluator: Send + Sync {
    fn evaluate(&self, cards: &[Card]) -> Result<HandValue, EvalError>;
}

/// House evaluator: baccarat-style points (sum of card values modulo ten,
/// faces counting ten), a shan on a two-card eight or nine, and a small
/// multiplier ladder for triples, pairs and flush hands.
#[derive(Clone, Copy, Debug, Default)]
pub struct ShanEvaluator;

impl HandEvaluator for ShanEvaluator {
    fn evaluate(&self, cards: &[Card]) -> Result<HandValue, EvalError> {
        if cards.len() != 2 && cards.len() != 3 {
            return Err(EvalError::WrongCardCount(cards.len()));
        }

        let points = cards.iter().map(Card::point_value).sum::<u8>() % 10;
        let is_special = cards.len() == 2 && points >= SHAN_POINTS;

        let same_rank = cards.windows(2).all(|w| w[0].rank == w[1].rank);
        let same_suit = cards.windows(2).all(|w| w[0].suit == w[1].suit);
        let multiplier = if cards.len() == 3 && same_rank {
            5
        } else if same_suit {
            2
        } else if cards.len() == 2 && same_rank {
            2
        } else {
            1
        };

        Ok(HandValue {
            points,
            multiplier,
            is_special,
        })
    }
}

/// Evaluate a hand, degrading instead of propagating failure.
pub fn evaluate_or_degraded(evaluator: &dyn HandEvaluator, cards: &[Card]) -> HandValue {
    evaluator.evaluate(cards).unwrap_or_else(|err| {
        log::debug!("hand evaluation degraded: {err}");
        HandValue::degraded()
    })
}

/// Whether a hand is already maximal and must never draw.
pub fn stands_pat(value: HandValue) -> bool {
    value.points >= STAND_PAT_POINTS
}
