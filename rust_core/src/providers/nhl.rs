//! NHL score source
//!
//! Adapts the NHL API client to the `ScoreSource` trait, always asking for
//! the scoreboard of the current local date.

use super::ScoreSource;
use crate::clients::nhl::NhlClient;
use crate::models::Game;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Local;
use tracing::debug;

#[async_trait]
impl ScoreSource for NhlClient {
    async fn fetch_games(&self) -> Result<Vec<Game>> {
        let today = Local::now().date_naive();
        let games = self.get_scores(today).await?;
        debug!("NHL feed returned {} games for {}", games.len(), today);
        Ok(games)
    }

    fn source_name(&self) -> &str {
        "nhl"
    }
}
