//! Score source abstraction
//!
//! The watcher only needs "today's games, right now". Keeping that behind a
//! trait lets the loop run against the live NHL feed or a scripted fake.

use crate::models::Game;
use anyhow::Result;
use async_trait::async_trait;

pub mod nhl;

/// Supplies the current day's games, with scores and ordered goal lists.
#[async_trait]
pub trait ScoreSource: Send + Sync {
    async fn fetch_games(&self) -> Result<Vec<Game>>;

    /// Source name for logging
    fn source_name(&self) -> &str;
}
