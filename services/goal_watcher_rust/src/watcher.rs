//! The poll loop
//!
//! Each cycle: fetch today's games, find the followed team's game, feed it to
//! the tracker and dispatch whatever new goals come out. A failed fetch skips
//! the cycle and leaves the tracker untouched.
//!
//! Dispatch runs inline, so a slow channel delays the next poll. With the Hue
//! light in attached mode each goal holds the loop for the 15 second dwell;
//! `HUE_DETACHED=true` moves the dwell to a background task.

use anyhow::{Context, Result};
use goalhorn_rust_core::formatters::format_game_end;
use goalhorn_rust_core::{
    find_team_game, DispatchReport, Dispatcher, GameTracker, ScoreSource, Transition,
};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WatcherMetrics {
    pub polls: u64,
    pub fetch_errors: u64,
    pub goals_notified: u64,
    pub deliveries: u64,
    pub delivery_failures: u64,
    pub stuck_devices: u64,
    pub games_finished: u64,
}

impl WatcherMetrics {
    fn record_dispatch(&mut self, report: &DispatchReport) {
        self.goals_notified += report.goals as u64;
        self.deliveries += report.delivered as u64;
        self.delivery_failures += report.failed as u64;
        self.stuck_devices += report.stuck_devices as u64;
    }
}

pub struct GoalWatcher<S: ScoreSource> {
    source: S,
    tracker: GameTracker,
    dispatcher: Dispatcher,
    poll_interval: Duration,
    metrics: WatcherMetrics,
}

impl<S: ScoreSource> GoalWatcher<S> {
    pub fn new(source: S, team_id: u32, dispatcher: Dispatcher, poll_interval: Duration) -> Self {
        Self {
            source,
            tracker: GameTracker::new(team_id),
            dispatcher,
            poll_interval,
            metrics: WatcherMetrics::default(),
        }
    }

    pub fn metrics(&self) -> &WatcherMetrics {
        &self.metrics
    }

    pub fn tracker(&self) -> &GameTracker {
        &self.tracker
    }

    /// One poll. Errors only when the score source fails.
    pub async fn run_cycle(&mut self) -> Result<DispatchReport> {
        self.metrics.polls += 1;
        self.collect_background_stuck();
        let team_id = self.tracker.team_id();

        let games = match self
            .source
            .fetch_games()
            .await
            .with_context(|| format!("Failed to fetch games from {}", self.source.source_name()))
        {
            Ok(games) => games,
            Err(e) => {
                self.metrics.fetch_errors += 1;
                return Err(e);
            }
        };

        let candidate = find_team_game(&games, team_id);
        let observation = self.tracker.observe(candidate);

        match observation.transition {
            Transition::Idle => debug!("No game today for team {}", team_id),
            Transition::Discovered { game_id } | Transition::Switched { to: game_id, .. } => {
                if let Transition::Switched { from, .. } = observation.transition {
                    info!("Team {} moved from game {} to game {}", team_id, from, game_id);
                }
                if let Some(game) = candidate {
                    info!(
                        "Found game {} for team {}: {} ({})",
                        game_id,
                        team_id,
                        game.scoreline(),
                        game.state
                    );
                }
            }
            Transition::Unchanged { .. } => {}
            Transition::Lost { game_id } => {
                info!("Game {} no longer listed for team {}", game_id, team_id)
            }
        }

        if observation.absorbed > 0 {
            info!(
                "Skipping {} goals already scored before watching started",
                observation.absorbed
            );
        }

        let mut report = DispatchReport::default();
        if let Some(game) = candidate {
            if !observation.new_goals.is_empty() {
                report = self
                    .dispatcher
                    .dispatch(game, observation.new_goals, team_id)
                    .await;
                self.metrics.record_dispatch(&report);
                if report.stuck_devices > 0 {
                    error!(
                        "{} light(s) may be stuck in alert state after game {}",
                        report.stuck_devices, game.id
                    );
                }
            }

            if observation.game_ended {
                self.metrics.games_finished += 1;
                info!("Game ended: {}", format_game_end(game));
            }
        }

        Ok(report)
    }

    /// Detached Hue sequences finish after their dispatch returned; their
    /// stuck lights are folded in here.
    fn collect_background_stuck(&mut self) {
        let late = self.dispatcher.take_background_stuck();
        if late > 0 {
            error!("{} light(s) stuck in alert state by background sequences", late);
            self.metrics.stuck_devices += late as u64;
        }
    }

    /// Poll until `shutdown` resolves, then wait for background notifier work.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!(
            "Watching team {} every {}s via {} -> [{}]",
            self.tracker.team_id(),
            self.poll_interval.as_secs(),
            self.source.source_name(),
            self.dispatcher.channel_names().join(", ")
        );

        tokio::pin!(shutdown);
        loop {
            // A cycle always runs to completion so no Hue sequence is cut
            // short between alert and restore.
            if let Err(e) = self.run_cycle().await {
                warn!("Poll failed: {:#}", e);
            }

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Received shutdown signal");
                    break;
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        self.dispatcher.drain().await;
        self.collect_background_stuck();
        info!("Goal watcher stopped: {:?}", self.metrics);
        Ok(())
    }

    pub async fn run(&mut self) -> Result<()> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("Unable to listen for shutdown signal: {}", err);
                std::future::pending::<()>().await;
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use goalhorn_rust_core::{Game, GameState, Goal, Notifier, NotifyError, Player, Team};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const BRUINS: u32 = 6;

    struct ScriptedSource {
        polls: Mutex<VecDeque<Result<Vec<Game>>>>,
    }

    impl ScriptedSource {
        fn new(polls: Vec<Result<Vec<Game>>>) -> Self {
            Self {
                polls: Mutex::new(polls.into()),
            }
        }
    }

    #[async_trait]
    impl ScoreSource for ScriptedSource {
        async fn fetch_games(&self) -> Result<Vec<Game>> {
            self.polls
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        fn source_name(&self) -> &str {
            "scripted"
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        scorers: Mutex<Vec<String>>,
        background_stuck: AtomicUsize,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        fn name(&self) -> &str {
            "recording"
        }

        async fn notify(
            &self,
            _game: &Game,
            goal: &Goal,
            _tracked_team_id: u32,
            _followed: bool,
        ) -> Result<(), NotifyError> {
            self.scorers.lock().unwrap().push(goal.scorer.name.clone());
            Ok(())
        }

        fn take_background_stuck(&self) -> usize {
            self.background_stuck.swap(0, Ordering::SeqCst)
        }
    }

    fn team(id: u32, name: &str, abbrev: &str) -> Team {
        Team {
            id,
            name: name.to_string(),
            abbrev: abbrev.to_string(),
            score: 0,
        }
    }

    fn goal(abbrev: &str, scorer: &str) -> Goal {
        Goal {
            period: 1,
            time_in_period: "10:00".to_string(),
            team_abbrev: abbrev.to_string(),
            scorer: Player {
                id: 1,
                name: scorer.to_string(),
            },
            assists: vec![],
        }
    }

    fn bruins_game(state: GameState, scorers: &[&str]) -> Game {
        Game {
            id: 2023020001,
            date: "2024-01-15".to_string(),
            state,
            home_team: team(BRUINS, "Bruins", "BOS"),
            away_team: team(10, "Maple Leafs", "TOR"),
            goals: scorers.iter().map(|s| goal("BOS", s)).collect(),
        }
    }

    fn watcher(
        polls: Vec<Result<Vec<Game>>>,
    ) -> (GoalWatcher<ScriptedSource>, Arc<RecordingNotifier>) {
        let recorder = Arc::new(RecordingNotifier::default());
        let dispatcher = Dispatcher::new(vec![recorder.clone()]);
        (
            GoalWatcher::new(
                ScriptedSource::new(polls),
                BRUINS,
                dispatcher,
                Duration::from_secs(30),
            ),
            recorder,
        )
    }

    #[tokio::test]
    async fn test_first_observation_fires_nothing() {
        let (mut w, recorder) = watcher(vec![Ok(vec![bruins_game(
            GameState::Live,
            &["Pastrnak", "Marchand"],
        )])]);

        let report = w.run_cycle().await.unwrap();

        assert_eq!(report.goals, 0);
        assert!(recorder.scorers.lock().unwrap().is_empty());
        assert_eq!(w.tracker().state().cursor, 2);
    }

    #[tokio::test]
    async fn test_new_goals_fire_in_order() {
        let (mut w, recorder) = watcher(vec![
            Ok(vec![bruins_game(GameState::Live, &["Pastrnak"])]),
            Ok(vec![bruins_game(
                GameState::Live,
                &["Pastrnak", "Marchand", "McAvoy"],
            )]),
            Ok(vec![bruins_game(
                GameState::Live,
                &["Pastrnak", "Marchand", "McAvoy"],
            )]),
        ]);

        w.run_cycle().await.unwrap();
        let report = w.run_cycle().await.unwrap();
        assert_eq!(report.goals, 2);
        w.run_cycle().await.unwrap();

        assert_eq!(
            *recorder.scorers.lock().unwrap(),
            vec!["Marchand".to_string(), "McAvoy".to_string()]
        );
        assert_eq!(w.metrics().goals_notified, 2);
        assert_eq!(w.metrics().deliveries, 2);
    }

    #[tokio::test]
    async fn test_fetch_error_leaves_tracker_untouched() {
        let (mut w, recorder) = watcher(vec![
            Ok(vec![bruins_game(GameState::Live, &["Pastrnak"])]),
            Err(anyhow!("connection reset")),
            Ok(vec![bruins_game(GameState::Live, &["Pastrnak", "Marchand"])]),
        ]);

        w.run_cycle().await.unwrap();
        let before = w.tracker().state().clone();

        assert!(w.run_cycle().await.is_err());
        assert_eq!(w.tracker().state(), &before);
        assert_eq!(w.metrics().fetch_errors, 1);

        w.run_cycle().await.unwrap();
        assert_eq!(*recorder.scorers.lock().unwrap(), vec!["Marchand".to_string()]);
    }

    #[tokio::test]
    async fn test_game_end_counted_once() {
        let (mut w, _recorder) = watcher(vec![
            Ok(vec![bruins_game(GameState::Live, &[])]),
            Ok(vec![bruins_game(GameState::Final, &[])]),
            Ok(vec![bruins_game(GameState::Off, &[])]),
        ]);

        for _ in 0..3 {
            w.run_cycle().await.unwrap();
        }
        assert_eq!(w.metrics().games_finished, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_stops_on_shutdown() {
        let (mut w, recorder) = watcher(vec![
            Ok(vec![bruins_game(GameState::Live, &[])]),
            Ok(vec![bruins_game(GameState::Live, &["Pastrnak"])]),
        ]);

        // Two polls happen before the shutdown at t=45s.
        w.run_until(tokio::time::sleep(Duration::from_secs(45)))
            .await
            .unwrap();

        assert_eq!(w.metrics().polls, 2);
        assert_eq!(*recorder.scorers.lock().unwrap(), vec!["Pastrnak".to_string()]);
    }

    #[tokio::test]
    async fn test_background_stuck_devices_reach_metrics() {
        let (mut w, recorder) = watcher(vec![
            Ok(vec![bruins_game(GameState::Live, &[])]),
            Ok(vec![bruins_game(GameState::Live, &[])]),
        ]);

        recorder.background_stuck.store(1, Ordering::SeqCst);
        w.run_cycle().await.unwrap();
        assert_eq!(w.metrics().stuck_devices, 1);

        w.run_cycle().await.unwrap();
        assert_eq!(w.metrics().stuck_devices, 1);
    }
}
