// Shared models for Goalhorn services
use serde::{Deserialize, Serialize};

// ============================================================================
// Game Lifecycle
// ============================================================================

/// Lifecycle state reported by the score feed (`gameState`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    /// Scheduled, not yet in pregame (`FUT`)
    Future,
    /// Pregame window (`PRE`)
    Preview,
    /// Puck is in play (`LIVE`)
    Live,
    /// Late-game critical window (`CRIT`)
    Critical,
    /// Game over, result not yet official (`FINAL`)
    Final,
    /// Game over and official (`OFF`)
    Off,
    /// Any state code the feed adds later
    Other(String),
}

impl GameState {
    pub fn from_feed(code: &str) -> Self {
        match code.trim().to_uppercase().as_str() {
            "FUT" => GameState::Future,
            "PRE" | "PREVIEW" => GameState::Preview,
            "LIVE" => GameState::Live,
            "CRIT" => GameState::Critical,
            "FINAL" => GameState::Final,
            "OFF" => GameState::Off,
            _ => GameState::Other(code.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            GameState::Future => "FUT",
            GameState::Preview => "PRE",
            GameState::Live => "LIVE",
            GameState::Critical => "CRIT",
            GameState::Final => "FINAL",
            GameState::Off => "OFF",
            GameState::Other(code) => code,
        }
    }

    /// Goals can still be scored. Unknown codes count as in progress so a new
    /// live-ish state never silences alerts.
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            GameState::Live | GameState::Critical | GameState::Other(_)
        )
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, GameState::Final | GameState::Off)
    }
}

impl std::fmt::Display for GameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Teams, Players, Goals
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: u32,
    pub name: String,
    pub abbrev: String,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: u64,
    pub name: String,
}

/// A single scoring event, in the order the feed reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub period: u8,
    /// Elapsed clock within the period, e.g. "12:34"
    pub time_in_period: String,
    pub team_abbrev: String,
    pub scorer: Player,
    /// At most two, primary assist first
    pub assists: Vec<Player>,
}

impl Goal {
    pub fn assist_names(&self) -> Vec<String> {
        self.assists.iter().map(|a| a.name.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: u64,
    pub date: String,
    pub state: GameState,
    pub home_team: Team,
    pub away_team: Team,
    /// Append-only; the feed never reorders goals it already reported
    pub goals: Vec<Goal>,
}

impl Game {
    pub fn involves(&self, team_id: u32) -> bool {
        self.home_team.id == team_id || self.away_team.id == team_id
    }

    /// Team credited with `goal`, matched by abbreviation against the home side.
    pub fn scoring_team(&self, goal: &Goal) -> &Team {
        if goal.team_abbrev == self.home_team.abbrev {
            &self.home_team
        } else {
            &self.away_team
        }
    }

    pub fn scoring_team_id(&self, goal: &Goal) -> u32 {
        self.scoring_team(goal).id
    }

    /// Whether `goal` was scored by the followed team.
    pub fn is_followed_goal(&self, goal: &Goal, tracked_team_id: u32) -> bool {
        self.scoring_team_id(goal) == tracked_team_id
    }

    pub fn scoreline(&self) -> String {
        format!(
            "{} {} - {} {}",
            self.home_team.name, self.home_team.score, self.away_team.name, self.away_team.score
        )
    }
}

/// First game of the day involving `team_id`.
pub fn find_team_game(games: &[Game], team_id: u32) -> Option<&Game> {
    games.iter().find(|g| g.involves(team_id))
}
