use super::Notifier;
use crate::error::NotifyError;
use crate::formatters::format_goal;
use crate::models::{Game, Goal};
use async_trait::async_trait;

/// Prints goal summaries to stdout.
#[derive(Debug, Default, Clone)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    fn name(&self) -> &str {
        "console"
    }

    async fn notify(
        &self,
        game: &Game,
        goal: &Goal,
        _tracked_team_id: u32,
        _followed: bool,
    ) -> Result<(), NotifyError> {
        println!("\n{}", format_goal(game, goal));
        Ok(())
    }
}
