//! Core entities: cards, decks, players and the table record.

use enum_dispatch::enum_dispatch;
use rand::seq::SliceRandom;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::constants::{DECK_SIZE, DRAW_POINT_THRESHOLD, RANKS_PER_SUIT};
use crate::net::messages::{PayoutEntry, ServerEvent};
use crate::net::{safe_send, EventSender};
use crate::round::PhaseTimer;

/// Stable position at a table, distinct from the occupant's identity.
pub type SeatId = u8;

/// Monetary amounts (bets, balances, payout deltas).
pub type Chips = i64;

/// Process-wide table identifier.
pub type TableId = String;

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Username {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Username {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Card suit. The numeric values are part of the data model and the wire
/// letters are part of the codec; both mappings must stay bit-exact.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Suit {
    Club = 1,
    Diamond = 2,
    Heart = 3,
    Spade = 4,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Club, Suit::Diamond, Suit::Heart, Suit::Spade];

    pub const fn letter(self) -> char {
        match self {
            Suit::Club => 'C',
            Suit::Diamond => 'D',
            Suit::Heart => 'H',
            Suit::Spade => 'S',
        }
    }

    pub const fn from_letter(letter: char) -> Option<Suit> {
        match letter {
            'C' => Some(Suit::Club),
            'D' => Some(Suit::Diamond),
            'H' => Some(Suit::Heart),
            'S' => Some(Suit::Spade),
            _ => None,
        }
    }
}

impl From<Suit> for u8 {
    fn from(suit: Suit) -> u8 {
        suit as u8
    }
}

impl TryFrom<u8> for Suit {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Suit::Club),
            2 => Ok(Suit::Diamond),
            3 => Ok(Suit::Heart),
            4 => Ok(Suit::Spade),
            other => Err(format!("invalid suit {other}")),
        }
    }
}

/// A playing card. Rank runs 1 (ace) through 13 (king). On the wire a card
/// is a two/three-character code: the rank digits followed by the suit
/// letter, e.g. `"7H"` or `"10S"`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Card {
    pub rank: u8,
    pub suit: Suit,
}

impl Card {
    pub const fn new(rank: u8, suit: Suit) -> Self {
        Self { rank, suit }
    }

    /// Wire code for this card.
    pub fn code(&self) -> String {
        format!("{}{}", self.rank, self.suit.letter())
    }

    /// Point contribution toward a hand total: face cards count ten.
    pub fn point_value(&self) -> u8 {
        self.rank.min(10)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Card {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() < 2 {
            return Err(format!("card code too short: {s:?}"));
        }
        let (digits, letter) = s.split_at(s.len() - 1);
        let rank: u8 = digits
            .parse()
            .map_err(|_| format!("invalid card rank in {s:?}"))?;
        if rank == 0 || rank > RANKS_PER_SUIT {
            return Err(format!("card rank {rank} out of range"));
        }
        let suit_char = letter.chars().next().ok_or_else(|| "empty suit".to_string())?;
        let suit = Suit::from_letter(suit_char).ok_or_else(|| format!("invalid suit in {s:?}"))?;
        Ok(Card::new(rank, suit))
    }
}

impl Serialize for Card {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.code())
    }
}

impl<'de> Deserialize<'de> for Card {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        code.parse().map_err(serde::de::Error::custom)
    }
}

/// A shuffled deck owned by one table. Drawing advances an index and never
/// removes cards, so a finished round can be audited from the full order.
#[derive(Clone, Debug, Default)]
pub struct Deck {
    cards: Vec<Card>,
    index: usize,
}

impl Deck {
    /// A freshly shuffled 52-card deck.
    pub fn shuffled() -> Self {
        let mut cards = Vec::with_capacity(DECK_SIZE);
        for suit in Suit::ALL {
            for rank in 1..=RANKS_PER_SUIT {
                cards.push(Card::new(rank, suit));
            }
        }
        let mut rng = rand::rng();
        cards.shuffle(&mut rng);
        Self { cards, index: 0 }
    }

    /// Next undealt card, advancing the index.
    pub fn draw(&mut self) -> Option<Card> {
        let card = self.cards.get(self.index).copied();
        if card.is_some() {
            self.index += 1;
        }
        card
    }

    pub fn dealt(&self) -> usize {
        self.index
    }

    pub fn remaining(&self) -> usize {
        self.cards.len() - self.index
    }
}

/// Output of hand evaluation: comparison points, payout multiplier and
/// whether the hand is a special (shan) hand.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct HandValue {
    pub points: u8,
    pub multiplier: u8,
    pub is_special: bool,
}

impl HandValue {
    /// The value shown when evaluation fails: never propagates, only
    /// degrades the one affected hand.
    pub const fn degraded() -> Self {
        Self {
            points: 0,
            multiplier: 1,
            is_special: false,
        }
    }
}

impl Default for HandValue {
    fn default() -> Self {
        Self::degraded()
    }
}

/// Explicit draw/stand preference a human may submit before the draw phase.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawAction {
    Draw,
    Stand,
}

/// Actions a dealer may take once all draws are settled. `Unknown` absorbs
/// unrecognized wire values; it executes as a skip.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DealerAction {
    Catch,
    Catch3Cards,
    CatchAll,
    Draw,
    Skip,
    #[serde(other)]
    Unknown,
}

/// Shared decision contract for the human/AI seat variants.
#[enum_dispatch]
pub trait DrawPolicy {
    /// Whether this seat takes a third card given its current hand value.
    /// Callers have already ruled out stand-pat hands and 3-card hands.
    fn wants_third_card(&self, value: HandValue) -> bool;
}

/// A seat occupied by a live person. Holds the transport handle and any
/// submitted draw preference; both reset between rounds.
#[derive(Debug, Default)]
pub struct HumanSeat {
    pub connection: Option<EventSender>,
    pub draw_action: Option<DrawAction>,
}

impl DrawPolicy for HumanSeat {
    fn wants_third_card(&self, value: HandValue) -> bool {
        match self.draw_action {
            Some(DrawAction::Draw) => true,
            Some(DrawAction::Stand) => false,
            None => value.points < DRAW_POINT_THRESHOLD,
        }
    }
}

/// A seat occupied by the house AI. Never holds a connection and always
/// auto-decides.
#[derive(Debug, Default)]
pub struct AiSeat;

impl DrawPolicy for AiSeat {
    fn wants_third_card(&self, value: HandValue) -> bool {
        value.points < DRAW_POINT_THRESHOLD
    }
}

/// Capability-tagged seat occupant. Connectivity and decision behavior
/// dispatch on the variant instead of a scattered boolean flag.
#[enum_dispatch(DrawPolicy)]
#[derive(Debug)]
pub enum PlayerKind {
    Human(HumanSeat),
    Ai(AiSeat),
}

/// One seat's full state at a table. The record outlives disconnects:
/// connectivity, not identity, determines participation.
#[derive(Debug)]
pub struct Player {
    pub seat_id: SeatId,
    pub username: Username,
    pub kind: PlayerKind,
    pub is_dealer: bool,
    pub waiting: bool,
    pub leave_after_round: bool,
    pub cards: Vec<Card>,
    pub has_drawn: bool,
    pub current_bet: Chips,
    pub balance: Chips,
}

impl Player {
    pub fn human(seat_id: SeatId, username: Username, balance: Chips, connection: EventSender) -> Self {
        Self {
            seat_id,
            username,
            kind: PlayerKind::Human(HumanSeat {
                connection: Some(connection),
                draw_action: None,
            }),
            is_dealer: false,
            waiting: false,
            leave_after_round: false,
            cards: Vec::with_capacity(3),
            has_drawn: false,
            current_bet: 0,
            balance,
        }
    }

    pub fn ai(seat_id: SeatId, username: Username, balance: Chips) -> Self {
        Self {
            seat_id,
            username,
            kind: PlayerKind::Ai(AiSeat),
            is_dealer: false,
            waiting: false,
            leave_after_round: false,
            cards: Vec::with_capacity(3),
            has_drawn: false,
            current_bet: 0,
            balance,
        }
    }

    pub fn is_ai(&self) -> bool {
        matches!(self.kind, PlayerKind::Ai(_))
    }

    /// The transport handle, if this is a human seat with an open channel.
    pub fn live_connection(&self) -> Option<&EventSender> {
        match &self.kind {
            PlayerKind::Human(seat) => seat.connection.as_ref().filter(|tx| !tx.is_closed()),
            PlayerKind::Ai(_) => None,
        }
    }

    /// A real person with a live socket.
    pub fn is_connected_human(&self) -> bool {
        !self.is_ai() && self.live_connection().is_some()
    }

    /// Participates in the current round: AI seats always do, humans only
    /// while their socket is live.
    pub fn is_active(&self) -> bool {
        self.is_ai() || self.live_connection().is_some()
    }

    pub fn set_connection(&mut self, connection: Option<EventSender>) {
        if let PlayerKind::Human(seat) = &mut self.kind {
            seat.connection = connection;
        }
    }

    pub fn draw_action(&self) -> Option<DrawAction> {
        match &self.kind {
            PlayerKind::Human(seat) => seat.draw_action,
            PlayerKind::Ai(_) => None,
        }
    }

    /// Records a draw preference. Ignored for AI seats, which derive their
    /// decision instead of submitting one.
    pub fn set_draw_action(&mut self, action: Option<DrawAction>) {
        if let PlayerKind::Human(seat) = &mut self.kind {
            seat.draw_action = action;
        }
    }

    /// Per-round state reset; identity, seat and balance survive.
    pub fn reset_for_round(&mut self) {
        self.cards.clear();
        self.has_drawn = false;
        self.is_dealer = false;
        self.current_bet = 0;
        self.set_draw_action(None);
    }
}

/// One table's complete mutable state. The actor that owns it is the only
/// writer; every scheduled callback re-validates its round context before
/// touching it.
#[derive(Debug)]
pub struct Table {
    pub table_id: TableId,
    pub table_name: String,
    pub max_players: usize,
    pub min_buy_in: Chips,
    pub max_buy_in: Chips,
    pub default_bet: Chips,

    pub players: Vec<Player>,
    pub deck: Deck,

    /// Monotonically increasing round identifier; changes only on deal.
    pub round_id: u64,
    /// Epoch incremented exactly once per forced abort; never decreases.
    pub abort_token: u64,
    /// True only inside the synchronous abort routine.
    pub round_aborted: bool,

    pub round_in_progress: bool,
    pub game_in_progress: bool,
    pub join_locked_for_round: bool,
    pub waiting_for_next_round: bool,
    pub deal_ack_received: bool,

    /// Re-entrancy lock for the result phase: holds the round id being
    /// processed, not a mutex.
    pub processing_result: Option<u64>,
    /// Valid only between winner computation and payout completion.
    pub current_winners: Vec<Username>,
    /// Computed payout deltas awaiting choreography broadcast.
    pub pending_payouts: Vec<PayoutEntry>,

    /// The single active phase timer. One slot structurally enforces the
    /// at-most-one-live-timer invariant.
    pub timer: Option<PhaseTimer>,
    timer_seq: u64,
}

impl Table {
    pub fn new(
        table_id: TableId,
        table_name: String,
        max_players: usize,
        min_buy_in: Chips,
        max_buy_in: Chips,
        default_bet: Chips,
    ) -> Self {
        Self {
            table_id,
            table_name,
            max_players,
            min_buy_in,
            max_buy_in,
            default_bet,
            players: Vec::new(),
            deck: Deck::default(),
            round_id: 0,
            abort_token: 0,
            round_aborted: false,
            round_in_progress: false,
            game_in_progress: false,
            join_locked_for_round: false,
            waiting_for_next_round: false,
            deal_ack_received: false,
            processing_result: None,
            current_winners: Vec::new(),
            pending_payouts: Vec::new(),
            timer: None,
            timer_seq: 0,
        }
    }

    /// Next timer arm generation; used by the actor to detect re-arms.
    pub(crate) fn next_timer_seq(&mut self) -> u64 {
        self.timer_seq += 1;
        self.timer_seq
    }

    pub fn dealer(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_dealer)
    }

    pub fn dealer_mut(&mut self) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.is_dealer)
    }

    pub fn player_by_seat(&self, seat_id: SeatId) -> Option<&Player> {
        self.players.iter().find(|p| p.seat_id == seat_id)
    }

    pub fn player_by_username(&self, username: &Username) -> Option<&Player> {
        self.players.iter().find(|p| &p.username == username)
    }

    pub fn player_by_username_mut(&mut self, username: &Username) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| &p.username == username)
    }

    /// Deliver an event to every seat with a live connection. Per-recipient
    /// failure is swallowed; the broadcast continues.
    pub fn broadcast(&self, event: &ServerEvent) {
        for player in &self.players {
            if let Some(tx) = player.live_connection() {
                let _ = safe_send(tx, event);
            }
        }
    }

    /// Deliver an event to a single seat. A dead connection is skipped and
    /// logged, never treated as an error.
    pub fn unicast(&self, player: &Player, event: &ServerEvent, context: &str) -> bool {
        match player.live_connection() {
            Some(tx) if safe_send(tx, event) => true,
            _ => {
                log::debug!(
                    "skip closed connection seat={} username={} during {}",
                    player.seat_id,
                    player.username,
                    context
                );
                false
            }
        }
    }

    /// Whether any per-round state survived past its round. Used by the
    /// zombie sweep to catch tables no guard callback will ever visit again.
    pub fn has_stale_round_state(&self) -> bool {
        self.round_in_progress
            || self.game_in_progress
            || self.join_locked_for_round
            || self.waiting_for_next_round
            || self.deal_ack_received
            || self.processing_result.is_some()
            || self.timer.is_some()
            || !self.current_winners.is_empty()
    }

    /// Return the table to its pre-round shape: cards, bets, flags and the
    /// timer slot cleared; seats and balances kept. Seats marked to leave,
    /// and human seats with no connection, are released.
    pub fn hard_reset(&mut self) {
        self.players
            .retain(|p| !p.leave_after_round && (p.is_ai() || p.live_connection().is_some()));
        for player in &mut self.players {
            player.reset_for_round();
            player.waiting = false;
        }
        self.deck = Deck::default();
        self.round_in_progress = false;
        self.game_in_progress = false;
        self.join_locked_for_round = false;
        self.waiting_for_next_round = false;
        self.deal_ack_received = false;
        self.processing_result = None;
        self.current_winners.clear();
        self.pending_payouts.clear();
        self.timer = None;
    }
}
