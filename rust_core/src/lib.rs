//! Goalhorn Core - follow one NHL team and fan goal alerts out to many channels.
//!
//! This crate provides:
//! - NHL score feed client and the `ScoreSource` abstraction
//! - Game tracking and goal diffing across polls
//! - Console, email, webhook and Philips Hue notifiers
//! - Concurrent dispatch of each new goal to every channel

pub mod clients;
pub mod dispatcher;
pub mod error;
pub mod formatters;
pub mod models;
pub mod notifiers;
pub mod providers;
pub mod tracker;

pub use dispatcher::{DispatchReport, Dispatcher};
pub use error::{ConfigError, NotifyError};
pub use models::{find_team_game, Game, GameState, Goal, Player, Team};
pub use notifiers::{build_notifiers, parse_channels, ChannelKind, ChannelSettings, Notifier};
pub use providers::ScoreSource;
pub use tracker::{GameTracker, Observation, Transition};
