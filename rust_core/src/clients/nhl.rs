//! NHL score feed client
//!
//! Fetches the day's scoreboard from `api-web.nhle.com` and maps it onto the
//! shared game models. Only the fields the tracker and notifiers read are
//! deserialized; everything else in the feed is ignored.

use crate::models::{Game, GameState, Goal, Player, Team};
use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api-web.nhle.com";

#[derive(Clone, Debug)]
pub struct NhlClient {
    client: Client,
    base_url: String,
}

// ============================================================================
// Feed schema
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ScoreResponse {
    #[serde(default)]
    pub games: Vec<FeedGame>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedGame {
    pub id: u64,
    #[serde(default)]
    pub game_date: String,
    pub game_state: String,
    pub home_team: FeedTeam,
    pub away_team: FeedTeam,
    #[serde(default)]
    pub goals: Vec<FeedGoal>,
}

#[derive(Debug, Deserialize)]
pub struct FeedTeam {
    pub id: u32,
    #[serde(default)]
    pub name: LocalizedName,
    #[serde(default)]
    pub abbrev: String,
    /// Absent until the game starts
    #[serde(default)]
    pub score: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct LocalizedName {
    #[serde(default)]
    pub default: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedGoal {
    pub period: u8,
    #[serde(default)]
    pub time_in_period: String,
    pub team_abbrev: String,
    pub player_id: u64,
    #[serde(default)]
    pub name: LocalizedName,
    #[serde(default)]
    pub first_name: LocalizedName,
    #[serde(default)]
    pub last_name: LocalizedName,
    #[serde(default)]
    pub assists: Vec<FeedAssist>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedAssist {
    pub player_id: u64,
    #[serde(default)]
    pub name: LocalizedName,
}

impl From<FeedTeam> for Team {
    fn from(team: FeedTeam) -> Self {
        Team {
            id: team.id,
            name: team.name.default,
            abbrev: team.abbrev,
            score: team.score,
        }
    }
}

impl From<FeedGoal> for Goal {
    fn from(goal: FeedGoal) -> Self {
        // Prefer the full first + last name; `name` is the abbreviated "D. Pastrnak"
        let full_name = format!("{} {}", goal.first_name.default, goal.last_name.default)
            .trim()
            .to_string();
        let scorer_name = if full_name.is_empty() {
            goal.name.default
        } else {
            full_name
        };

        Goal {
            period: goal.period,
            time_in_period: goal.time_in_period,
            team_abbrev: goal.team_abbrev,
            scorer: Player {
                id: goal.player_id,
                name: scorer_name,
            },
            assists: goal
                .assists
                .into_iter()
                .map(|a| Player {
                    id: a.player_id,
                    name: a.name.default,
                })
                .collect(),
        }
    }
}

impl From<FeedGame> for Game {
    fn from(game: FeedGame) -> Self {
        Game {
            id: game.id,
            date: game.game_date,
            state: GameState::from_feed(&game.game_state),
            home_team: game.home_team.into(),
            away_team: game.away_team.into(),
            goals: game.goals.into_iter().map(Goal::from).collect(),
        }
    }
}

/// Parse a raw scoreboard body into games.
pub fn parse_scores(body: &str) -> Result<Vec<Game>> {
    let response: ScoreResponse =
        serde_json::from_str(body).context("NHL score feed returned malformed JSON")?;
    Ok(response.games.into_iter().map(Game::from).collect())
}

// ============================================================================
// Client
// ============================================================================

impl NhlClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build NHL HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn score_url(&self, date: NaiveDate) -> String {
        format!("{}/v1/score/{}", self.base_url, date.format("%Y-%m-%d"))
    }

    /// Fetch all games scheduled on `date`.
    pub async fn get_scores(&self, date: NaiveDate) -> Result<Vec<Game>> {
        let url = self.score_url(date);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("NHL score request failed: {url}"))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("NHL score API returned {status} for {url}"));
        }

        let body = resp
            .text()
            .await
            .with_context(|| format!("Failed to read NHL score body: {url}"))?;
        parse_scores(&body)
    }
}
