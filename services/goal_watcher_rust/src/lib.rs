//! goal_watcher_rust - polls the NHL scoreboard and alerts on every goal in
//! the followed team's game

pub mod config;
pub mod watcher;

pub use config::Config;
pub use watcher::{GoalWatcher, WatcherMetrics};
