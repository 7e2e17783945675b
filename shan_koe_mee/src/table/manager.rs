//! The table registry: spawns one actor per configured table and runs the
//! periodic zombie sweep over all of them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::game::constants::{AI_SEAT_NAMES, DEFAULT_MAX_PLAYERS};
use crate::game::entities::{Chips, Player, Table, TableId};
use crate::game::rules::OutcomeRules;
use crate::game::scoring::HandEvaluator;
use crate::net::messages::TableSummary;
use crate::round::PhaseTimings;

use super::actor::{self, TableHandle};

/// Everything needed to stand up one table.
#[derive(Clone, Debug)]
pub struct TableConfig {
    pub table_id: TableId,
    pub table_name: String,
    pub max_players: usize,
    pub min_buy_in: Chips,
    pub max_buy_in: Chips,
    pub default_bet: Chips,
    /// House AI seats seeded at startup so tables are never empty.
    pub ai_seats: usize,
    pub ai_balance: Chips,
    pub timings: PhaseTimings,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            table_id: "table-1".to_string(),
            table_name: "Table 1".to_string(),
            max_players: DEFAULT_MAX_PLAYERS,
            min_buy_in: 100,
            max_buy_in: 10_000,
            default_bet: 50,
            ai_seats: 2,
            ai_balance: 10_000,
            timings: PhaseTimings::default(),
        }
    }
}

impl TableConfig {
    fn build_table(&self) -> Table {
        let mut table = Table::new(
            self.table_id.clone(),
            self.table_name.clone(),
            self.max_players,
            self.min_buy_in,
            self.max_buy_in,
            self.default_bet,
        );
        for seat in 0..self.ai_seats.min(self.max_players) {
            let name = AI_SEAT_NAMES[seat % AI_SEAT_NAMES.len()];
            table
                .players
                .push(Player::ai(seat as u8, name.into(), self.ai_balance));
        }
        table
    }
}

/// Cheap cloneable registry of running tables. The table set is fixed at
/// startup; handles never disappear while the manager lives.
#[derive(Clone)]
pub struct TableManager {
    tables: Arc<HashMap<TableId, TableHandle>>,
}

impl TableManager {
    /// Spawn an actor per config plus one sweep task over all of them.
    pub fn new(
        configs: Vec<TableConfig>,
        evaluator: Arc<dyn HandEvaluator>,
        rules: Arc<dyn OutcomeRules>,
        sweep_interval: Duration,
    ) -> Self {
        let mut tables = HashMap::with_capacity(configs.len());
        for config in configs {
            let handle = actor::spawn(
                config.build_table(),
                config.timings,
                evaluator.clone(),
                rules.clone(),
            );
            tables.insert(config.table_id, handle);
        }
        let tables = Arc::new(tables);

        let sweep_targets = tables.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                for handle in sweep_targets.values() {
                    handle.sweep();
                }
            }
        });

        Self { tables }
    }

    pub fn get(&self, table_id: &str) -> Option<TableHandle> {
        self.tables.get(table_id).cloned()
    }

    /// Directory of all tables, in table-id order.
    pub async fn summaries(&self) -> Vec<TableSummary> {
        let mut summaries = Vec::with_capacity(self.tables.len());
        for handle in self.tables.values() {
            if let Some(summary) = handle.summary().await {
                summaries.push(summary);
            }
        }
        summaries.sort_by(|a, b| a.table_id.cmp(&b.table_id));
        summaries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::rules::HouseRules;
    use crate::game::scoring::ShanEvaluator;

    fn manager(configs: Vec<TableConfig>) -> TableManager {
        let evaluator: Arc<dyn HandEvaluator> = Arc::new(ShanEvaluator);
        let rules = Arc::new(HouseRules::new(evaluator.clone()));
        TableManager::new(configs, evaluator, rules, Duration::from_secs(30))
    }

    #[tokio::test(start_paused = true)]
    async fn registry_lists_all_configured_tables() {
        let configs = vec![
            TableConfig {
                table_id: "low".to_string(),
                table_name: "Low Stakes".to_string(),
                ..TableConfig::default()
            },
            TableConfig {
                table_id: "high".to_string(),
                table_name: "High Stakes".to_string(),
                min_buy_in: 1000,
                ..TableConfig::default()
            },
        ];
        let manager = manager(configs);

        assert!(manager.get("low").is_some());
        assert!(manager.get("missing").is_none());

        let summaries = manager.summaries().await;
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].table_id, "high");
        assert_eq!(summaries[0].min_buy_in, 1000);
        // AI seats count toward occupancy.
        assert_eq!(summaries[0].current_players, 2);
    }
}
