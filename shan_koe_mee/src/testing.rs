//! Shared unit-test fixtures: tables, seats and a recording scheduler.

use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::game::entities::{Player, SeatId, Table, TableId};
use crate::game::rules::HouseRules;
use crate::game::scoring::{HandEvaluator, ShanEvaluator};
use crate::net::messages::ServerEvent;
use crate::round::{NextRoundScheduler, PhaseTimings, RoundEngine};

pub(crate) fn table() -> Table {
    Table::new("t1".to_string(), "Table One".to_string(), 6, 100, 5000, 50)
}

pub(crate) fn table_with(players: Vec<Player>) -> Table {
    let mut table = table();
    table.players = players;
    table
}

pub(crate) fn ai(seat_id: SeatId, name: &str) -> Player {
    Player::ai(seat_id, name.into(), 1000)
}

/// A connected human seat plus the receiving end of its event channel.
/// Keep the receiver alive for as long as the seat should count as live.
pub(crate) fn human(seat_id: SeatId, name: &str) -> (Player, UnboundedReceiver<ServerEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Player::human(seat_id, name.into(), 1000, tx), rx)
}

/// A human seat whose socket is gone.
pub(crate) fn offline_human(seat_id: SeatId, name: &str) -> Player {
    let (mut player, _rx) = human(seat_id, name);
    player.set_connection(None);
    player
}

#[derive(Default)]
pub(crate) struct RecordingScheduler {
    calls: Mutex<Vec<TableId>>,
}

impl RecordingScheduler {
    pub(crate) fn scheduled(&self) -> Vec<TableId> {
        self.calls.lock().unwrap().clone()
    }
}

impl NextRoundScheduler for RecordingScheduler {
    fn schedule_next_round(&self, table_id: &TableId) {
        self.calls.lock().unwrap().push(table_id.clone());
    }
}

pub(crate) fn engine_with(table: Table) -> (RoundEngine, Arc<RecordingScheduler>) {
    let evaluator: Arc<dyn HandEvaluator> = Arc::new(ShanEvaluator);
    let rules = Arc::new(HouseRules::new(evaluator.clone()));
    let scheduler = Arc::new(RecordingScheduler::default());
    let engine = RoundEngine::new(
        table,
        PhaseTimings::default(),
        evaluator,
        rules,
        scheduler.clone(),
    );
    (engine, scheduler)
}

/// Everything currently queued on a connection, oldest first.
pub(crate) fn drain(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

/// Wire `type` tag of an event, for ordering assertions.
pub(crate) fn wire_type(event: &ServerEvent) -> String {
    serde_json::to_value(event).unwrap()["type"]
        .as_str()
        .unwrap()
        .to_string()
}
