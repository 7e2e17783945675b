//! Round orchestration.
//!
//! A round is a chain of short phases, each ended by a timer. The engine is
//! deliberately time-free: arming a timer only fills the table's single
//! timer slot with a [`PhaseTimer`] describing what should happen and when.
//! The table actor owns the clock, sleeps until the recorded delay elapses
//! and calls [`RoundEngine::fire_timer`]. Tests drive rounds the same way,
//! firing timers by hand.
//!
//! Every timer captures the [`RoundContext`] of the phase that armed it.
//! When it fires, the context is re-validated against the table; a callback
//! whose round has ended, aborted or been replaced is discarded without
//! touching table state.

use std::sync::Arc;
use std::time::Duration;

use crate::game::entities::{Table, TableId};
use crate::game::rules::OutcomeRules;
use crate::game::scoring::HandEvaluator;

pub mod bootstrap;
pub mod dealer;
pub mod draw;
pub mod result;
pub mod safety;
pub mod snapshot;
pub mod watch;

/// Identity of one round attempt: the round id plus the abort epoch that was
/// current when the phase began. Both must still match for a scheduled
/// callback to run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RoundContext {
    pub round_id: u64,
    pub token: u64,
}

/// Which card-watching window is running.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WatchVariant {
    /// After the deal, everyone studies their two cards.
    TwoCard,
    /// After draws, only three-card hands get the private look.
    ThreeCard,
}

/// What a pending timer will do when it fires. Countdown-style kinds carry
/// their remaining whole seconds; the final fire runs the phase's end
/// behavior instead of another tick.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TimerKind {
    Countdown { remaining: u32 },
    DealAck,
    Betting { remaining: u32 },
    WatchDelay { variant: WatchVariant },
    Watch { variant: WatchVariant, remaining: u32 },
    DealerThink,
    DealerAction { remaining: u32 },
    CatchReveal,
    DealerDrawPause,
    FindWinner { remaining: u32 },
    PayoutPay,
    PayoutEnd,
}

impl TimerKind {
    /// Short label used in guard log lines.
    pub fn label(self) -> &'static str {
        match self {
            TimerKind::Countdown { .. } => "countdown",
            TimerKind::DealAck => "deal-ack",
            TimerKind::Betting { .. } => "betting",
            TimerKind::WatchDelay { .. } => "watch-delay",
            TimerKind::Watch { .. } => "watch",
            TimerKind::DealerThink => "dealer-think",
            TimerKind::DealerAction { .. } => "dealer-action",
            TimerKind::CatchReveal => "catch-reveal",
            TimerKind::DealerDrawPause => "dealer-draw-pause",
            TimerKind::FindWinner { .. } => "find-winner",
            TimerKind::PayoutPay => "payout-pay",
            TimerKind::PayoutEnd => "payout-end",
        }
    }
}

/// The single pending phase callback for a table.
#[derive(Clone, Copy, Debug)]
pub struct PhaseTimer {
    pub kind: TimerKind,
    pub ctx: RoundContext,
    /// How long after arming the timer should fire.
    pub delay: Duration,
    /// Arm generation; lets the actor tell a re-arm from the timer it is
    /// already sleeping on.
    pub seq: u64,
}

/// Every delay and tick count in the round choreography. Tests shrink these
/// freely; the engine never reads the clock, so the values only matter to
/// the actor.
#[derive(Clone, Copy, Debug)]
pub struct PhaseTimings {
    /// Base interval for all per-second tick phases.
    pub tick: Duration,
    pub countdown_ticks: u32,
    pub deal_ack: Duration,
    pub betting_ticks: u32,
    pub watch_ticks: u32,
    /// Pause before the three-card watch window opens.
    pub watch3_grace: Duration,
    pub dealer_window_ticks: u32,
    /// How long an AI dealer pretends to think.
    pub ai_think: Duration,
    /// How long caught hands stay on screen.
    pub catch_reveal: Duration,
    /// Pause after a dealer draw before moving on.
    pub dealer_draw_pause: Duration,
    pub find_winner_ticks: u32,
    /// Hold between the collect and pay broadcasts.
    pub payout_collect_hold: Duration,
    /// Hold between the pay and end broadcasts.
    pub payout_pay_hold: Duration,
}

impl Default for PhaseTimings {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            countdown_ticks: 5,
            deal_ack: Duration::from_secs(5),
            betting_ticks: 10,
            watch_ticks: 7,
            watch3_grace: Duration::from_millis(1500),
            dealer_window_ticks: 10,
            ai_think: Duration::from_millis(1500),
            catch_reveal: Duration::from_secs(5),
            dealer_draw_pause: Duration::from_millis(1500),
            find_winner_ticks: 5,
            payout_collect_hold: Duration::from_millis(2500),
            payout_pay_hold: Duration::from_secs(3),
        }
    }
}

/// Hands control back to whatever starts the next round once this one has
/// fully completed. The table actor implements this by posting a message to
/// its own inbox.
pub trait NextRoundScheduler: Send + Sync {
    fn schedule_next_round(&self, table_id: &TableId);
}

/// The phase a finished step hands control to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum NextPhase {
    Betting,
    Draw,
    WatchThree,
    DealerAction,
    FindWinner,
}

/// Owns one table's state and runs its round phases. Single-threaded by
/// construction; the owning actor is the only caller.
pub struct RoundEngine {
    pub table: Table,
    pub timings: PhaseTimings,
    pub(crate) evaluator: Arc<dyn HandEvaluator>,
    pub(crate) rules: Arc<dyn OutcomeRules>,
    pub(crate) scheduler: Arc<dyn NextRoundScheduler>,
}

impl RoundEngine {
    pub fn new(
        table: Table,
        timings: PhaseTimings,
        evaluator: Arc<dyn HandEvaluator>,
        rules: Arc<dyn OutcomeRules>,
        scheduler: Arc<dyn NextRoundScheduler>,
    ) -> Self {
        Self {
            table,
            timings,
            evaluator,
            rules,
            scheduler,
        }
    }

    /// The context new timers capture.
    pub(crate) fn round_ctx(&self) -> RoundContext {
        RoundContext {
            round_id: self.table.round_id,
            token: self.table.abort_token,
        }
    }

    /// Arm the table's timer slot. Replaces whatever was pending; there is
    /// never more than one live timer per table.
    pub(crate) fn arm(&mut self, kind: TimerKind, delay: Duration) {
        let ctx = self.round_ctx();
        let seq = self.table.next_timer_seq();
        self.table.timer = Some(PhaseTimer {
            kind,
            ctx,
            delay,
            seq,
        });
    }

    /// Fire the pending timer, if any. The timer is taken out of the slot
    /// first, then its round context is validated; a stale callback is
    /// dropped here and never reaches phase logic.
    pub fn fire_timer(&mut self) {
        let Some(timer) = self.table.timer.take() else {
            return;
        };
        if !safety::is_round_context_valid(&mut self.table, timer.ctx, timer.kind.label()) {
            return;
        }
        match timer.kind {
            TimerKind::Countdown { remaining } => bootstrap::countdown_tick(self, remaining),
            TimerKind::DealAck => bootstrap::deal_ack_elapsed(self),
            TimerKind::Betting { remaining } => bootstrap::betting_tick(self, remaining),
            TimerKind::WatchDelay { variant } => watch::watch_delay_elapsed(self, variant),
            TimerKind::Watch { variant, remaining } => watch::watch_tick(self, variant, remaining),
            TimerKind::DealerThink => dealer::dealer_think_elapsed(self),
            TimerKind::DealerAction { remaining } => dealer::dealer_action_tick(self, remaining),
            TimerKind::CatchReveal => dealer::catch_reveal_elapsed(self),
            TimerKind::DealerDrawPause => dealer::dealer_draw_pause_elapsed(self),
            TimerKind::FindWinner { remaining } => result::find_winner_tick(self, remaining),
            TimerKind::PayoutPay => result::payout_pay_elapsed(self),
            TimerKind::PayoutEnd => result::payout_end_elapsed(self),
        }
    }

    /// Move to the phase a finished step selected.
    pub(crate) fn advance(&mut self, next: NextPhase) {
        match next {
            NextPhase::Betting => bootstrap::start_betting(self),
            NextPhase::Draw => draw::process_draws(self),
            NextPhase::WatchThree => watch::start_watch(self, WatchVariant::ThreeCard),
            NextPhase::DealerAction => dealer::start_dealer_action(self),
            NextPhase::FindWinner => result::start_find_winner(self),
        }
    }

    /// Close out a completed round and hand off to the scheduler. Seats
    /// flagged to leave, and human seats whose socket died, are released.
    pub(crate) fn complete_round(&mut self) {
        let table = &mut self.table;
        table.round_in_progress = false;
        table.join_locked_for_round = false;
        table.deal_ack_received = false;
        table.waiting_for_next_round = true;
        table
            .players
            .retain(|p| !p.leave_after_round && (p.is_ai() || p.live_connection().is_some()));
        log::info!(
            "table {} round {} complete, {} seats remain",
            table.table_id,
            table.round_id,
            table.players.len()
        );
        let table_id = table.table_id.clone();
        self.scheduler.schedule_next_round(&table_id);
    }
}
