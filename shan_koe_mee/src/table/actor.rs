//! The table actor: one task per table, owning all of its state.
//!
//! The actor owns the clock. The round engine only records what should
//! happen next in the table's timer slot; the actor sleeps until the
//! recorded delay elapses, fires the timer and re-reads the slot. A re-arm
//! is detected by the timer's sequence number, so replacing a pending phase
//! never leaves a stale wakeup behind.

use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::game::entities::{Chips, Player, SeatId, Table, TableId, Username};
use crate::game::rules::OutcomeRules;
use crate::game::scoring::HandEvaluator;
use crate::net::messages::{ClientCommand, ServerEvent, TableSummary};
use crate::net::{safe_send, EventSender};
use crate::round::{bootstrap, dealer, safety, snapshot, NextRoundScheduler, PhaseTimings, RoundEngine};

use super::messages::{TableMessage, TableResponse};

/// Cheap cloneable handle to a running table actor.
#[derive(Clone, Debug)]
pub struct TableHandle {
    sender: UnboundedSender<TableMessage>,
    pub table_id: TableId,
}

impl TableHandle {
    pub fn send(&self, message: TableMessage) -> bool {
        self.sender.send(message).is_ok()
    }

    pub async fn join(
        &self,
        username: Username,
        connection: EventSender,
        buy_in: Chips,
    ) -> TableResponse {
        let (response, rx) = oneshot::channel();
        if !self.send(TableMessage::Join {
            username,
            connection,
            buy_in,
            response,
        }) {
            return TableResponse::Error("table is gone".to_string());
        }
        rx.await
            .unwrap_or_else(|_| TableResponse::Error("table is gone".to_string()))
    }

    pub async fn leave(&self, username: Username) -> TableResponse {
        let (response, rx) = oneshot::channel();
        if !self.send(TableMessage::Leave { username, response }) {
            return TableResponse::Error("table is gone".to_string());
        }
        rx.await
            .unwrap_or_else(|_| TableResponse::Error("table is gone".to_string()))
    }

    pub fn disconnect(&self, username: Username) {
        self.send(TableMessage::Disconnect { username });
    }

    pub fn command(&self, username: Username, command: ClientCommand) {
        self.send(TableMessage::Command { username, command });
    }

    pub async fn summary(&self) -> Option<TableSummary> {
        let (response, rx) = oneshot::channel();
        if !self.send(TableMessage::GetSummary { response }) {
            return None;
        }
        rx.await.ok()
    }

    pub fn sweep(&self) {
        self.send(TableMessage::Sweep);
    }
}

/// Schedules the next round by posting to the actor's own inbox, which
/// keeps round completion a plain synchronous step inside the engine.
struct ActorScheduler {
    sender: UnboundedSender<TableMessage>,
}

impl NextRoundScheduler for ActorScheduler {
    fn schedule_next_round(&self, table_id: &TableId) {
        if self.sender.send(TableMessage::StartRound).is_err() {
            log::debug!("table {table_id} actor gone, next round dropped");
        }
    }
}

pub struct TableActor {
    engine: RoundEngine,
    inbox: UnboundedReceiver<TableMessage>,
    seen_timer_seq: u64,
    next_fire: Option<Instant>,
}

/// Start an actor for the given table and return its handle.
pub fn spawn(
    table: Table,
    timings: PhaseTimings,
    evaluator: Arc<dyn HandEvaluator>,
    rules: Arc<dyn OutcomeRules>,
) -> TableHandle {
    let (sender, inbox) = mpsc::unbounded_channel();
    let table_id = table.table_id.clone();
    let scheduler = Arc::new(ActorScheduler {
        sender: sender.clone(),
    });
    let engine = RoundEngine::new(table, timings, evaluator, rules, scheduler);
    let actor = TableActor {
        engine,
        inbox,
        seen_timer_seq: 0,
        next_fire: None,
    };
    tokio::spawn(actor.run());
    TableHandle { sender, table_id }
}

impl TableActor {
    async fn run(mut self) {
        log::info!("table {} actor started", self.engine.table.table_id);
        loop {
            self.sync_timer();
            let next_fire = self.next_fire;
            tokio::select! {
                message = self.inbox.recv() => {
                    match message {
                        Some(message) => self.handle_message(message),
                        None => break,
                    }
                }
                _ = async {
                    match next_fire {
                        Some(at) => tokio::time::sleep_until(at).await,
                        None => std::future::pending::<()>().await,
                    }
                } => {
                    self.next_fire = None;
                    self.engine.fire_timer();
                }
            }
        }
        log::info!("table {} actor stopped", self.engine.table.table_id);
    }

    /// Track the engine's timer slot. A new sequence number means the slot
    /// was re-armed since the last look and the deadline must be recomputed.
    fn sync_timer(&mut self) {
        match self.engine.table.timer {
            Some(timer) if timer.seq != self.seen_timer_seq => {
                self.seen_timer_seq = timer.seq;
                self.next_fire = Some(Instant::now() + timer.delay);
            }
            Some(_) => {}
            None => {
                self.next_fire = None;
            }
        }
    }

    fn handle_message(&mut self, message: TableMessage) {
        match message {
            TableMessage::Join {
                username,
                connection,
                buy_in,
                response,
            } => self.handle_join(username, connection, buy_in, response),
            TableMessage::Leave { username, response } => self.handle_leave(username, response),
            TableMessage::Disconnect { username } => self.handle_disconnect(username),
            TableMessage::Command { username, command } => self.handle_command(username, command),
            TableMessage::StartRound => bootstrap::schedule_round_start(&mut self.engine),
            TableMessage::GetSummary { response } => {
                let _ = response.send(self.summary());
            }
            TableMessage::Sweep => self.handle_sweep(),
        }
    }

    fn summary(&self) -> TableSummary {
        let table = &self.engine.table;
        TableSummary {
            table_id: table.table_id.clone(),
            table_name: table.table_name.clone(),
            min_buy_in: table.min_buy_in,
            max_buy_in: table.max_buy_in,
            default_bet: table.default_bet,
            current_players: table.players.len(),
            max_players: table.max_players,
        }
    }

    fn free_seat(&self) -> Option<SeatId> {
        (0..self.engine.table.max_players as SeatId)
            .find(|seat| self.engine.table.player_by_seat(*seat).is_none())
    }

    fn greet(&self, connection: &EventSender) {
        let _ = safe_send(
            connection,
            &ServerEvent::Connected {
                message: format!("welcome to {}", self.engine.table.table_name),
            },
        );
        let snapshot = snapshot::build_snapshot(&self.engine.table, self.engine.evaluator.as_ref());
        let _ = safe_send(connection, &ServerEvent::Snapshot(snapshot));
    }

    fn handle_join(
        &mut self,
        username: Username,
        connection: EventSender,
        buy_in: Chips,
        response: oneshot::Sender<TableResponse>,
    ) {
        if let Some(player) = self.engine.table.player_by_username_mut(&username) {
            if player.is_ai() {
                let _ = response.send(TableResponse::Error("username is taken".to_string()));
                return;
            }
            // Reconnect: reattach the socket to the surviving seat.
            player.set_connection(Some(connection.clone()));
            player.leave_after_round = false;
            log::info!(
                "table {} reconnect {username}",
                self.engine.table.table_id
            );
            let _ = response.send(TableResponse::Success);
            self.greet(&connection);
            return;
        }

        if self.engine.table.players.len() >= self.engine.table.max_players {
            let _ = response.send(TableResponse::TableFull);
            return;
        }
        if buy_in < self.engine.table.min_buy_in || buy_in > self.engine.table.max_buy_in {
            let _ = response.send(TableResponse::Error(format!(
                "buy-in must be between {} and {}",
                self.engine.table.min_buy_in, self.engine.table.max_buy_in
            )));
            return;
        }
        let Some(seat_id) = self.free_seat() else {
            let _ = response.send(TableResponse::TableFull);
            return;
        };

        let mut player = Player::human(seat_id, username.clone(), buy_in, connection.clone());
        // Joins during a locked round spectate until the next deal.
        player.waiting =
            self.engine.table.round_in_progress || self.engine.table.join_locked_for_round;
        self.engine.table.players.push(player);
        log::info!(
            "table {} seat {seat_id} joined by {username}",
            self.engine.table.table_id
        );
        let _ = response.send(TableResponse::Success);
        self.greet(&connection);
        self.engine.table.broadcast(&ServerEvent::TableUpdate {
            players: bootstrap::player_updates(&self.engine.table),
        });
        bootstrap::schedule_round_start(&mut self.engine);
    }

    fn handle_leave(&mut self, username: Username, response: oneshot::Sender<TableResponse>) {
        let in_round = self.engine.table.round_in_progress;
        match self.engine.table.player_by_username_mut(&username) {
            Some(player) if in_round && !player.waiting => {
                // Mid-round leavers finish the round, then their seat goes.
                player.leave_after_round = true;
                player.set_connection(None);
            }
            Some(_) => {
                self.engine.table.players.retain(|p| p.username != username);
            }
            None => {
                let _ = response.send(TableResponse::Error("not seated here".to_string()));
                return;
            }
        }
        let _ = response.send(TableResponse::Success);
        self.engine.table.broadcast(&ServerEvent::TableUpdate {
            players: bootstrap::player_updates(&self.engine.table),
        });
        if in_round {
            safety::abort_round_if_no_connected_real_players(&mut self.engine.table, "leave");
        }
    }

    fn handle_disconnect(&mut self, username: Username) {
        let in_round = self.engine.table.round_in_progress;
        match self.engine.table.player_by_username_mut(&username) {
            Some(player) if in_round && !player.waiting => {
                player.set_connection(None);
                log::info!(
                    "table {} {username} disconnected mid-round, seat kept",
                    self.engine.table.table_id
                );
            }
            Some(_) => {
                self.engine.table.players.retain(|p| p.username != username);
                self.engine.table.broadcast(&ServerEvent::TableUpdate {
                    players: bootstrap::player_updates(&self.engine.table),
                });
            }
            None => return,
        }
        if in_round {
            safety::abort_round_if_no_connected_real_players(&mut self.engine.table, "disconnect");
        }
    }

    fn handle_command(&mut self, username: Username, command: ClientCommand) {
        match command {
            ClientCommand::Bet { bet_amount } => {
                bootstrap::handle_bet(&mut self.engine, &username, bet_amount)
            }
            ClientCommand::DrawPreference { action } => {
                bootstrap::handle_draw_preference(&mut self.engine, &username, action)
            }
            ClientCommand::DealerDecision {
                action,
                target_seat_id,
            } => dealer::handle_dealer_decision(&mut self.engine, &username, action, target_seat_id),
            ClientCommand::DealAck => bootstrap::handle_deal_ack(&mut self.engine),
            ClientCommand::SnapshotRequest => {
                let table = &self.engine.table;
                if let Some(player) = table.player_by_username(&username) {
                    let snapshot =
                        snapshot::build_snapshot(table, self.engine.evaluator.as_ref());
                    table.unicast(player, &ServerEvent::Snapshot(snapshot), "snapshot request");
                }
            }
            // Join, leave and the table directory are routed before they
            // reach a table actor.
            ClientCommand::Join { .. } | ClientCommand::Leave | ClientCommand::ListTables => {
                log::debug!(
                    "table {} unexpected routed command from {username}",
                    self.engine.table.table_id
                );
            }
        }
    }

    /// Drop round state that no timer or guard will ever clean up. Only
    /// fires on tables that lost every human while holding stale state.
    fn handle_sweep(&mut self) {
        let table = &mut self.engine.table;
        if safety::count_connected_real_players(table) > 0 || !table.has_stale_round_state() {
            return;
        }
        log::warn!("table {} sweeping stale round state", table.table_id);
        table.hard_reset();
        table.broadcast(&ServerEvent::TableReset {
            table_id: table.table_id.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::DEFAULT_MAX_PLAYERS;
    use crate::game::rules::HouseRules;
    use crate::game::scoring::ShanEvaluator;
    use std::time::Duration;
    use tokio::time::timeout;

    fn test_table() -> Table {
        let mut table = Table::new(
            "t1".to_string(),
            "Table One".to_string(),
            DEFAULT_MAX_PLAYERS,
            100,
            5000,
            50,
        );
        table.players.push(Player::ai(1, "Aung".into(), 1000));
        table.players.push(Player::ai(2, "Hla".into(), 1000));
        table
    }

    fn spawn_test_table() -> TableHandle {
        let evaluator: Arc<dyn HandEvaluator> = Arc::new(ShanEvaluator);
        let rules = Arc::new(HouseRules::new(evaluator.clone()));
        spawn(test_table(), PhaseTimings::default(), evaluator, rules)
    }

    #[tokio::test(start_paused = true)]
    async fn join_validates_capacity_and_buy_in() {
        let handle = spawn_test_table();
        let (tx, _rx) = mpsc::unbounded_channel();

        let resp = handle.join("alice".into(), tx.clone(), 10).await;
        assert_eq!(
            resp,
            TableResponse::Error("buy-in must be between 100 and 5000".to_string())
        );

        let resp = handle.join("Aung".into(), tx.clone(), 500).await;
        assert_eq!(
            resp,
            TableResponse::Error("username is taken".to_string())
        );

        let resp = handle.join("alice".into(), tx.clone(), 500).await;
        assert!(resp.is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn joining_human_drives_a_full_round_to_payout() {
        let handle = spawn_test_table();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let resp = handle.join("alice".into(), tx, 1000).await;
        assert!(resp.is_success());

        // Virtual time runs the whole choreography; collect until the round
        // closes out.
        let mut saw_deal = false;
        let mut saw_result = false;
        let outcome = timeout(Duration::from_secs(300), async {
            while let Some(event) = rx.recv().await {
                match &event {
                    ServerEvent::Deal { .. } => saw_deal = true,
                    ServerEvent::RoundResult { .. } => saw_result = true,
                    ServerEvent::PayoutEnd { .. } => return,
                    _ => {}
                }
            }
        })
        .await;

        assert!(outcome.is_ok(), "round never reached payout end");
        assert!(saw_deal);
        assert!(saw_result);
    }

    #[tokio::test(start_paused = true)]
    async fn summary_reflects_seated_players() {
        let handle = spawn_test_table();
        let summary = handle.summary().await.unwrap();
        assert_eq!(summary.current_players, 2);
        assert_eq!(summary.max_players, DEFAULT_MAX_PLAYERS);

        let (tx, _rx) = mpsc::unbounded_channel();
        handle.join("alice".into(), tx, 500).await;
        let summary = handle.summary().await.unwrap();
        assert_eq!(summary.current_players, 3);
    }
}
