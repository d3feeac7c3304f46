//! Fan-out of goal alerts to every configured channel
//!
//! Goals are dispatched in feed order. For a single goal all channels run
//! concurrently and the next goal starts only after every channel has
//! finished the current one. A failing channel never stops the others.

use crate::error::NotifyError;
use crate::models::{Game, Goal};
use crate::notifiers::Notifier;
use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Outcome of one dispatch call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub goals: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Hue lights left in alert state after a failed restore
    pub stuck_devices: usize,
}

impl DispatchReport {
    fn record(&mut self, result: &Result<(), NotifyError>) {
        match result {
            Ok(()) => self.delivered += 1,
            Err(e) => {
                self.failed += 1;
                if e.is_stuck_device() {
                    self.stuck_devices += 1;
                }
            }
        }
    }
}

pub struct Dispatcher {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl Dispatcher {
    pub fn new(notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        Self { notifiers }
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.notifiers.iter().map(|n| n.name()).collect()
    }

    pub async fn dispatch(
        &self,
        game: &Game,
        goals: &[Goal],
        tracked_team_id: u32,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();

        for goal in goals {
            report.goals += 1;
            let followed = game.is_followed_goal(goal, tracked_team_id);
            info!(
                "Goal in game {}: {} ({}) at {} of period {}",
                game.id, goal.scorer.name, goal.team_abbrev, goal.time_in_period, goal.period
            );

            let results = join_all(
                self.notifiers
                    .iter()
                    .map(|n| n.notify(game, goal, tracked_team_id, followed)),
            )
            .await;

            for (notifier, result) in self.notifiers.iter().zip(results.iter()) {
                match result {
                    Ok(()) => {}
                    Err(e) if e.is_stuck_device() => error!(
                        "[{}] goal by {} in game {}: {} (manual reset needed)",
                        notifier.name(),
                        goal.scorer.name,
                        game.id,
                        e
                    ),
                    Err(e) => warn!(
                        "[{}] failed to deliver goal by {} in game {}: {}",
                        notifier.name(),
                        goal.scorer.name,
                        game.id,
                        e
                    ),
                }
                report.record(result);
            }
        }

        report
    }

    /// Wait for background notifier work to finish.
    pub async fn drain(&self) {
        join_all(self.notifiers.iter().map(|n| n.drain())).await;
    }

    /// Stuck devices reported by background work since the last call.
    pub fn take_background_stuck(&self) -> usize {
        self.notifiers
            .iter()
            .map(|n| n.take_background_stuck())
            .sum()
    }
}
