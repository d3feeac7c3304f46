//! Game tracking and goal diffing for the followed team
//!
//! The tracker owns the only mutable state of the watch loop:
//! - which game (if any) is being watched
//! - how many of its goals have been processed (the cursor)
//! - whether the game has been seen at least once (the initialized gate)
//! - the last lifecycle state, to catch the end-of-game edge once
//!
//! Nothing here performs I/O; the watcher feeds it one observation per poll.

use crate::models::{Game, GameState, Goal};
use tracing::warn;

/// Compute the goals that appeared since `cursor`.
///
/// Returns `goals[cursor..]` and the new cursor (`goals.len()`). A cursor past
/// the end yields nothing.
pub fn diff(goals: &[Goal], cursor: usize) -> (&[Goal], usize) {
    let start = cursor.min(goals.len());
    (&goals[start..], goals.len())
}

/// Mutable tracking state, created empty at startup and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerState {
    pub watched_game: Option<u64>,
    pub cursor: usize,
    pub initialized: bool,
    pub last_state: Option<GameState>,
}

/// How the watched identity changed during an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// No game before, no game now
    Idle,
    /// First game picked up from NoGame
    Discovered { game_id: u64 },
    /// Followed team shows up in a different game than before
    Switched { from: u64, to: u64 },
    /// Same game as last poll
    Unchanged { game_id: u64 },
    /// Was watching a game, the feed no longer has one for the team
    Lost { game_id: u64 },
}

/// Result of feeding one poll into the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation<'a> {
    pub transition: Transition,
    /// Goals to notify, in feed order
    pub new_goals: &'a [Goal],
    /// Goals already on the board when the game was first seen
    pub absorbed: usize,
    /// Set exactly once, on the poll where the game reaches FINAL/OFF
    pub game_ended: bool,
}

impl Observation<'_> {
    fn idle(transition: Transition) -> Self {
        Self {
            transition,
            new_goals: &[],
            absorbed: 0,
            game_ended: false,
        }
    }
}

/// Tracks the followed team's game across polls.
#[derive(Debug)]
pub struct GameTracker {
    team_id: u32,
    state: TrackerState,
}

impl GameTracker {
    pub fn new(team_id: u32) -> Self {
        Self {
            team_id,
            state: TrackerState::default(),
        }
    }

    pub fn team_id(&self) -> u32 {
        self.team_id
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    /// Feed the followed team's game for this poll (or `None` if it has none).
    pub fn observe<'a>(&mut self, candidate: Option<&'a Game>) -> Observation<'a> {
        let game = match candidate {
            Some(game) => game,
            None => {
                return match self.state.watched_game.take() {
                    Some(game_id) => {
                        self.state = TrackerState::default();
                        Observation::idle(Transition::Lost { game_id })
                    }
                    None => Observation::idle(Transition::Idle),
                };
            }
        };

        let transition = match self.state.watched_game {
            Some(current) if current == game.id => Transition::Unchanged { game_id: game.id },
            previous => {
                self.state = TrackerState {
                    watched_game: Some(game.id),
                    ..TrackerState::default()
                };
                match previous {
                    Some(from) => Transition::Switched { from, to: game.id },
                    None => Transition::Discovered { game_id: game.id },
                }
            }
        };

        let previous_state = self.state.last_state.replace(game.state.clone());
        let game_ended = game.state.is_finished()
            && previous_state.map_or(false, |prev| !prev.is_finished());

        if self.state.cursor > game.goals.len() {
            warn!(
                "Goal list for game {} shrank from {} to {}; clamping cursor",
                game.id,
                self.state.cursor,
                game.goals.len()
            );
            self.state.cursor = game.goals.len();
        }

        // Initialized gate: goals present at discovery are absorbed silently.
        if !self.state.initialized {
            let (_, cursor) = diff(&game.goals, self.state.cursor);
            self.state.cursor = cursor;
            self.state.initialized = true;
            return Observation {
                transition,
                new_goals: &[],
                absorbed: cursor,
                game_ended,
            };
        }

        if !game.state.is_in_progress() {
            return Observation {
                transition,
                new_goals: &[],
                absorbed: 0,
                game_ended,
            };
        }

        let (new_goals, cursor) = diff(&game.goals, self.state.cursor);
        self.state.cursor = cursor;

        Observation {
            transition,
            new_goals,
            absorbed: 0,
            game_ended,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{game, goal};

    fn goals(n: usize) -> Vec<Goal> {
        (0..n)
            .map(|i| goal("BOS", &format!("Scorer {}", i), &[]))
            .collect()
    }

    #[test]
    fn test_diff_returns_suffix() {
        let g = goals(5);
        for cursor in 0..=g.len() {
            let (new, next) = diff(&g, cursor);
            assert_eq!(new, &g[cursor..]);
            assert_eq!(next, 5);

            let (again, next_again) = diff(&g, next);
            assert!(again.is_empty());
            assert_eq!(next_again, 5);
        }
    }

    #[test]
    fn test_diff_cursor_past_end() {
        let g = goals(2);
        let (new, next) = diff(&g, 7);
        assert!(new.is_empty());
        assert_eq!(next, 2);
    }

    #[test]
    fn test_first_observation_absorbs_existing_goals() {
        let mut tracker = GameTracker::new(6);
        let live = game(100, GameState::Live, goals(3));

        let obs = tracker.observe(Some(&live));
        assert_eq!(obs.transition, Transition::Discovered { game_id: 100 });
        assert!(obs.new_goals.is_empty());
        assert_eq!(obs.absorbed, 3);
        assert_eq!(tracker.state().cursor, 3);
        assert!(tracker.state().initialized);
    }

    #[test]
    fn test_new_goals_after_discovery() {
        let mut tracker = GameTracker::new(6);
        let mut live = game(100, GameState::Live, goals(1));
        tracker.observe(Some(&live));

        live.goals.push(goal("TOR", "Matthews", &["Marner"]));
        live.goals.push(goal("BOS", "Marchand", &[]));

        let obs = tracker.observe(Some(&live));
        assert_eq!(obs.transition, Transition::Unchanged { game_id: 100 });
        assert_eq!(obs.new_goals.len(), 2);
        assert_eq!(obs.new_goals[0].scorer.name, "Matthews");
        assert_eq!(obs.new_goals[1].scorer.name, "Marchand");
        assert_eq!(tracker.state().cursor, 3);

        let obs = tracker.observe(Some(&live));
        assert!(obs.new_goals.is_empty());
    }

    #[test]
    fn test_switching_game_resets_cursor_and_suppresses_replay() {
        let mut tracker = GameTracker::new(6);
        let mut first = game(100, GameState::Live, goals(2));
        tracker.observe(Some(&first));
        first.goals.push(goal("BOS", "Pastrnak", &[]));
        tracker.observe(Some(&first));
        assert_eq!(tracker.state().cursor, 3);

        let second = game(200, GameState::Live, goals(4));
        let obs = tracker.observe(Some(&second));
        assert_eq!(obs.transition, Transition::Switched { from: 100, to: 200 });
        assert!(obs.new_goals.is_empty());
        assert_eq!(obs.absorbed, 4);
        assert_eq!(tracker.state().watched_game, Some(200));
        assert_eq!(tracker.state().cursor, 4);
    }

    #[test]
    fn test_lost_game_reported_once() {
        let mut tracker = GameTracker::new(6);
        let live = game(100, GameState::Live, goals(2));
        tracker.observe(Some(&live));

        let obs = tracker.observe(None);
        assert_eq!(obs.transition, Transition::Lost { game_id: 100 });
        assert_eq!(tracker.state(), &TrackerState::default());

        let obs = tracker.observe(None);
        assert_eq!(obs.transition, Transition::Idle);
    }

    #[test]
    fn test_rediscovered_game_does_not_replay() {
        let mut tracker = GameTracker::new(6);
        let live = game(100, GameState::Live, goals(2));
        tracker.observe(Some(&live));
        tracker.observe(None);

        let obs = tracker.observe(Some(&live));
        assert_eq!(obs.transition, Transition::Discovered { game_id: 100 });
        assert!(obs.new_goals.is_empty());
    }

    #[test]
    fn test_suspended_states_do_not_diff() {
        let mut tracker = GameTracker::new(6);
        let mut preview = game(100, GameState::Preview, vec![]);
        tracker.observe(Some(&preview));

        // Goal appears while the feed still says PRE
        preview.goals.push(goal("BOS", "Pastrnak", &[]));
        let obs = tracker.observe(Some(&preview));
        assert!(obs.new_goals.is_empty());
        assert_eq!(tracker.state().cursor, 0);

        // Picked up once the game reports LIVE
        preview.state = GameState::Live;
        let obs = tracker.observe(Some(&preview));
        assert_eq!(obs.new_goals.len(), 1);
    }

    #[test]
    fn test_first_goal_after_pregame_discovery_fires() {
        let mut tracker = GameTracker::new(6);
        let mut g = game(100, GameState::Preview, vec![]);
        tracker.observe(Some(&g));

        g.state = GameState::Live;
        tracker.observe(Some(&g));
        g.goals.push(goal("TOR", "Nylander", &[]));

        let obs = tracker.observe(Some(&g));
        assert_eq!(obs.new_goals.len(), 1);
    }

    #[test]
    fn test_game_end_edge_fires_once() {
        let mut tracker = GameTracker::new(6);
        let mut g = game(100, GameState::Live, goals(3));
        assert!(!tracker.observe(Some(&g)).game_ended);

        g.state = GameState::Final;
        assert!(tracker.observe(Some(&g)).game_ended);
        assert!(!tracker.observe(Some(&g)).game_ended);

        g.state = GameState::Off;
        assert!(!tracker.observe(Some(&g)).game_ended);
    }

    #[test]
    fn test_game_first_seen_final_has_no_end_edge() {
        let mut tracker = GameTracker::new(6);
        let g = game(100, GameState::Final, goals(5));
        let obs = tracker.observe(Some(&g));
        assert!(!obs.game_ended);
        assert!(obs.new_goals.is_empty());
    }

    #[test]
    fn test_shrinking_goal_list_clamps_cursor() {
        let mut tracker = GameTracker::new(6);
        let mut g = game(100, GameState::Live, goals(3));
        tracker.observe(Some(&g));

        g.goals.truncate(1);
        let obs = tracker.observe(Some(&g));
        assert!(obs.new_goals.is_empty());
        assert_eq!(tracker.state().cursor, 1);

        g.goals.push(goal("BOS", "Zacha", &[]));
        let obs = tracker.observe(Some(&g));
        assert_eq!(obs.new_goals.len(), 1);
        assert_eq!(obs.new_goals[0].scorer.name, "Zacha");
    }
}
