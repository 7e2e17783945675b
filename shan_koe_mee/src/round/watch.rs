//! Card-watching windows.
//!
//! Twice per round the table pauses so people can study cards: once after
//! the deal (everyone, two cards) and once after draws (only seats holding
//! three cards). The two-card window shows to the whole table; the
//! three-card window is private to the seats it concerns.

use crate::net::messages::ServerEvent;

use super::{NextPhase, RoundEngine, TimerKind, WatchVariant};

pub(crate) fn start_watch(engine: &mut RoundEngine, variant: WatchVariant) {
    match variant {
        WatchVariant::TwoCard => {
            let round_id = engine.table.round_id;
            let ticks = engine.timings.watch_ticks;
            engine.table.broadcast(&ServerEvent::CardViewShow { round_id });
            engine.table.broadcast(&ServerEvent::WatchTwoStart {
                seconds: ticks,
                round_id,
            });
            let tick = engine.timings.tick;
            engine.arm(
                TimerKind::Watch {
                    variant,
                    remaining: ticks,
                },
                tick,
            );
        }
        WatchVariant::ThreeCard => {
            // Short grace so the third-card animation lands before the
            // private view opens.
            let grace = engine.timings.watch3_grace;
            engine.arm(TimerKind::WatchDelay { variant }, grace);
        }
    }
}

pub(crate) fn watch_delay_elapsed(engine: &mut RoundEngine, variant: WatchVariant) {
    let round_id = engine.table.round_id;
    let ticks = engine.timings.watch_ticks;
    for player in &engine.table.players {
        if player.cards.len() == 3 {
            engine.table.unicast(
                player,
                &ServerEvent::CardViewShow { round_id },
                "watch3 show",
            );
        }
    }
    engine.table.broadcast(&ServerEvent::WatchThreeStart {
        seconds: ticks,
        round_id,
    });
    let tick = engine.timings.tick;
    engine.arm(
        TimerKind::Watch {
            variant,
            remaining: ticks,
        },
        tick,
    );
}

pub(crate) fn watch_tick(engine: &mut RoundEngine, variant: WatchVariant, remaining: u32) {
    let round_id = engine.table.round_id;
    let left = remaining.saturating_sub(1);
    if left > 0 {
        let tick_event = match variant {
            WatchVariant::TwoCard => ServerEvent::WatchTwoTick {
                seconds: left,
                round_id,
            },
            WatchVariant::ThreeCard => ServerEvent::WatchThreeTick {
                seconds: left,
                round_id,
            },
        };
        engine.table.broadcast(&tick_event);
        let tick = engine.timings.tick;
        engine.arm(
            TimerKind::Watch {
                variant,
                remaining: left,
            },
            tick,
        );
        return;
    }

    match variant {
        WatchVariant::TwoCard => {
            engine.table.broadcast(&ServerEvent::WatchTwoEnd { round_id });
            engine.table.broadcast(&ServerEvent::CardViewHide { round_id });
            engine.advance(NextPhase::Betting);
        }
        WatchVariant::ThreeCard => {
            engine
                .table
                .broadcast(&ServerEvent::WatchThreeEnd { round_id });
            for player in &engine.table.players {
                if player.cards.len() == 3 {
                    engine.table.unicast(
                        player,
                        &ServerEvent::CardViewHide { round_id },
                        "watch3 hide",
                    );
                }
            }
            engine.advance(NextPhase::DealerAction);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ai, drain, engine_with, human, table_with, wire_type};

    #[test]
    fn two_card_watch_runs_seven_ticks_then_betting() {
        let (alice, mut rx) = human(0, "alice");
        let (mut engine, _sched) = engine_with(table_with(vec![alice, ai(1, "bot")]));
        engine.table.round_id = 1;
        engine.table.round_in_progress = true;

        start_watch(&mut engine, WatchVariant::TwoCard);
        for _ in 0..7 {
            engine.fire_timer();
        }

        let types: Vec<String> = drain(&mut rx).iter().map(wire_type).collect();
        assert_eq!(types[0], "ui:cardview:show");
        assert_eq!(types[1], "game:watch2card:start");
        assert_eq!(
            types.iter().filter(|t| *t == "game:watch2card:tick").count(),
            6
        );
        assert!(types.contains(&"game:watch2card:end".to_string()));
        assert!(types.contains(&"ui:cardview:hide".to_string()));
        assert!(types.contains(&"game:betting:start".to_string()));
        // Hide comes after end, betting after hide.
        let end = types.iter().position(|t| t == "game:watch2card:end").unwrap();
        let hide = types.iter().position(|t| t == "ui:cardview:hide").unwrap();
        let betting = types.iter().position(|t| t == "game:betting:start").unwrap();
        assert!(end < hide && hide < betting);
    }

    #[test]
    fn three_card_watch_shows_privately_to_three_card_seats() {
        let (mut alice, mut alice_rx) = human(0, "alice");
        alice.cards = vec!["2C".parse().unwrap(), "3D".parse().unwrap(), "4H".parse().unwrap()];
        let (mut bob, mut bob_rx) = human(1, "bob");
        bob.cards = vec!["9C".parse().unwrap(), "9D".parse().unwrap()];
        let mut bot = ai(2, "bot");
        bot.is_dealer = true;
        bot.cards = vec!["9H".parse().unwrap(), "9S".parse().unwrap()];
        let (mut engine, _sched) = engine_with(table_with(vec![alice, bob, bot]));
        engine.table.round_id = 2;
        engine.table.round_in_progress = true;

        start_watch(&mut engine, WatchVariant::ThreeCard);
        assert!(matches!(
            engine.table.timer.unwrap().kind,
            TimerKind::WatchDelay {
                variant: WatchVariant::ThreeCard
            }
        ));
        engine.fire_timer();

        let alice_types: Vec<String> = drain(&mut alice_rx).iter().map(wire_type).collect();
        let bob_types: Vec<String> = drain(&mut bob_rx).iter().map(wire_type).collect();
        assert!(alice_types.contains(&"ui:cardview:show".to_string()));
        assert!(!bob_types.contains(&"ui:cardview:show".to_string()));
        // The start announcement still goes to everyone.
        assert!(bob_types.contains(&"game:watch3card:start".to_string()));

        for _ in 0..7 {
            engine.fire_timer();
        }
        let alice_types: Vec<String> = drain(&mut alice_rx).iter().map(wire_type).collect();
        let bob_types: Vec<String> = drain(&mut bob_rx).iter().map(wire_type).collect();
        assert!(alice_types.contains(&"ui:cardview:hide".to_string()));
        assert!(!bob_types.contains(&"ui:cardview:hide".to_string()));
        assert!(bob_types.contains(&"game:watch3card:end".to_string()));
    }
}
