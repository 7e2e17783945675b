//! Game-wide constants.

/// Number of ranks in a suit (ace low, king high).
pub const RANKS_PER_SUIT: u8 = 13;

/// Number of cards in a fresh deck.
pub const DECK_SIZE: usize = 52;

/// Hands strictly below this many points draw a third card by default.
/// The same threshold drives the dealer's unconditional draw, the AI draw
/// policy and the human default when no preference was submitted.
pub const DRAW_POINT_THRESHOLD: u8 = 4;

/// A hand at or above this many points never draws; there is no benefit.
pub const STAND_PAT_POINTS: u8 = 8;

/// A two-card hand with at least this many points is a shan (special hand).
pub const SHAN_POINTS: u8 = 8;

/// Default seat capacity per table.
pub const DEFAULT_MAX_PLAYERS: usize = 6;

/// Names used when seeding a table with AI seats.
pub const AI_SEAT_NAMES: [&str; 8] = [
    "Aung", "Hla", "Kyaw", "Mya", "Nanda", "Soe", "Thiri", "Zaw",
];
