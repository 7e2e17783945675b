//! Wire message types.
//!
//! Outbound events are a tagged enum whose `type` strings and camelCase
//! fields are the protocol: clients key their animations off the exact
//! names, so renames here are breaking changes.

use serde::{Deserialize, Serialize};

use crate::game::entities::{Card, Chips, DealerAction, DrawAction, SeatId, TableId, Username};
use crate::round::snapshot::Phase;

/// Events pushed from server to clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    #[serde(rename = "connected")]
    Connected { message: String },

    #[serde(rename = "table:reset")]
    TableReset { table_id: TableId },

    #[serde(rename = "table:update")]
    TableUpdate { players: Vec<PlayerUpdate> },

    #[serde(rename = "tables:list:res")]
    TableList { result: Vec<TableSummary> },

    #[serde(rename = "game:countdown:tick")]
    CountdownTick { seconds: u32 },

    #[serde(rename = "game:deal")]
    Deal { round_id: u64, dealer_seat_id: SeatId },

    /// Unicast: the recipient's own freshly dealt hand.
    #[serde(rename = "game:deal:hand")]
    DealHand { round_id: u64, cards: Vec<Card> },

    #[serde(rename = "game:betting:start")]
    BettingStart { seconds: u32, round_id: u64 },

    #[serde(rename = "game:betting:tick")]
    BettingTick { seconds: u32, round_id: u64 },

    #[serde(rename = "game:betting:end")]
    BettingEnd { round_id: u64 },

    #[serde(rename = "ui:cardview:show")]
    CardViewShow { round_id: u64 },

    #[serde(rename = "ui:cardview:hide")]
    CardViewHide { round_id: u64 },

    #[serde(rename = "game:watch2card:start")]
    WatchTwoStart { seconds: u32, round_id: u64 },

    #[serde(rename = "game:watch2card:tick")]
    WatchTwoTick { seconds: u32, round_id: u64 },

    #[serde(rename = "game:watch2card:end")]
    WatchTwoEnd { round_id: u64 },

    #[serde(rename = "game:watch3card:start")]
    WatchThreeStart { seconds: u32, round_id: u64 },

    #[serde(rename = "game:watch3card:tick")]
    WatchThreeTick { seconds: u32, round_id: u64 },

    #[serde(rename = "game:watch3card:end")]
    WatchThreeEnd { round_id: u64 },

    #[serde(rename = "game:dealer:auto_draw")]
    DealerAutoDraw { card: String, round_id: u64 },

    #[serde(rename = "game:player:draw")]
    PlayerDraw { username: Username, card: String },

    #[serde(rename = "game:dealer:action:start")]
    DealerActionStart {
        round_id: u64,
        seconds: u32,
        three_card_players: Vec<SeatRef>,
    },

    #[serde(rename = "game:dealer:action:tick")]
    DealerActionTick { seconds: u32, round_id: u64 },

    #[serde(rename = "game:dealer:draw")]
    DealerDraw { card: String, round_id: u64 },

    #[serde(rename = "table:cards:reveal")]
    CardsReveal { players: Vec<RevealedHand> },

    #[serde(rename = "ui:dealercatchcardview:show")]
    DealerCatchShow {
        dealer: CaughtHand,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_player: Option<CaughtHand>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        players: Option<Vec<CaughtHand>>,
        round_id: u64,
    },

    #[serde(rename = "ui:dealercatchcardview:hide")]
    DealerCatchHide { round_id: u64 },

    #[serde(rename = "game:findwinner:start")]
    FindWinnerStart { seconds: u32, round_id: u64 },

    #[serde(rename = "game:findwinner:tick")]
    FindWinnerTick { seconds: u32, round_id: u64 },

    /// The outcome payload is built by the result-formatting rules and
    /// broadcast verbatim.
    #[serde(rename = "game:round:result")]
    RoundResult {
        #[serde(flatten)]
        result: serde_json::Value,
    },

    #[serde(rename = "game:payout:collect")]
    PayoutCollect {
        round_id: u64,
        dealer_seat_id: SeatId,
        losers: Vec<PayoutEntry>,
    },

    #[serde(rename = "game:payout:pay")]
    PayoutPay {
        round_id: u64,
        dealer_seat_id: SeatId,
        winners: Vec<PayoutEntry>,
    },

    #[serde(rename = "game:payout:end")]
    PayoutEnd { round_id: u64 },

    #[serde(rename = "game:state:snapshot")]
    Snapshot(GameSnapshot),

    #[serde(rename = "error")]
    Error { message: String },
}

/// Commands consumed from clients. Unknown shapes fail to parse and are
/// dropped with a log line; the connection stays open.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ClientCommand {
    #[serde(rename = "table:join")]
    Join {
        table_id: TableId,
        username: Username,
        buy_in: Chips,
    },

    #[serde(rename = "table:leave")]
    Leave,

    #[serde(rename = "tables:list")]
    ListTables,

    #[serde(rename = "game:bet")]
    Bet { bet_amount: Chips },

    #[serde(rename = "game:draw:action")]
    DrawPreference { action: DrawAction },

    #[serde(rename = "game:dealer:action")]
    DealerDecision {
        action: DealerAction,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_seat_id: Option<SeatId>,
    },

    #[serde(rename = "game:deal:ack")]
    DealAck,

    #[serde(rename = "game:state:request")]
    SnapshotRequest,
}

/// A seat reference inside announcement events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatRef {
    pub username: Username,
    pub seat_id: SeatId,
}

/// A hand revealed by a dealer catch, with its evaluated display values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealedHand {
    pub username: Username,
    pub seat_id: SeatId,
    pub cards: Vec<Card>,
    pub points: u8,
    pub multiplier: u8,
    pub is_shan: bool,
}

/// A bare seat-and-cards pair for the catch animation overlay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaughtHand {
    pub seat_id: SeatId,
    pub cards: Vec<Card>,
}

/// One player's settled delta for the payout choreography.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutEntry {
    pub username: Username,
    pub seat_id: SeatId,
    pub is_dealer: bool,
    pub result_amount: Chips,
}

/// Per-player bet/balance refresh.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerUpdate {
    pub username: Username,
    pub seat_id: SeatId,
    pub current_bet: Chips,
    pub balance: Chips,
}

/// Table directory entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSummary {
    pub table_id: TableId,
    pub table_name: String,
    pub min_buy_in: Chips,
    pub max_buy_in: Chips,
    pub default_bet: Chips,
    pub current_players: usize,
    pub max_players: usize,
}

/// Full table state for a client that (re)connects mid-round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub table_id: TableId,
    pub round_id: u64,
    pub phase: Phase,
    pub game_in_progress: bool,
    pub join_locked: bool,
    pub players: Vec<SnapshotPlayer>,
}

/// One seat inside a snapshot, with freshly recomputed display values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPlayer {
    pub seat_id: SeatId,
    pub username: Username,
    pub waiting: bool,
    pub leave_after_round: bool,
    pub is_dealer: bool,
    pub cards: Vec<Card>,
    pub points: u8,
    pub multiplier: u8,
    pub current_bet: Chips,
    pub balance: Chips,
}
