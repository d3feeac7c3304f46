use crate::models::{Game, Goal};

/// Ordinal period label: 1st, 2nd, 3rd, OT, 2OT...
pub fn period_label(period: u8) -> String {
    match period {
        1 => "1st".to_string(),
        2 => "2nd".to_string(),
        3 => "3rd".to_string(),
        4 => "OT".to_string(),
        n => format!("{}OT", n.saturating_sub(3)),
    }
}

/// Multi-line goal summary shared by the console and email channels.
pub fn format_goal(game: &Game, goal: &Goal) -> String {
    let team = game.scoring_team(goal);

    let mut out = String::new();
    out.push_str("🚨 GOAL! 🚨\n");
    out.push_str(&format!(
        "{}: {} scores at {} of the {} period!\n",
        team.name,
        goal.scorer.name,
        goal.time_in_period,
        period_label(goal.period)
    ));
    if !goal.assists.is_empty() {
        out.push_str(&format!("Assisted by: {}\n", goal.assist_names().join(", ")));
    }
    out.push_str(&format!("Score: {}", game.scoreline()));
    out
}

pub fn format_email_subject(game: &Game, goal: &Goal) -> String {
    format!("Goal Alert: {} scores!", game.scoring_team(goal).name)
}

pub fn format_game_end(game: &Game) -> String {
    format!("🏁 FINAL: {}", game.scoreline())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{game, goal};
    use crate::models::GameState;

    #[test]
    fn test_period_label() {
        assert_eq!(period_label(1), "1st");
        assert_eq!(period_label(3), "3rd");
        assert_eq!(period_label(4), "OT");
        assert_eq!(period_label(5), "2OT");
    }

    #[test]
    fn test_format_goal_with_assists() {
        let g = game(1, GameState::Live, vec![]);
        let scored = goal("TOR", "Auston Matthews", &["M. Marner", "W. Nylander"]);
        let text = format_goal(&g, &scored);

        assert!(text.starts_with("🚨 GOAL! 🚨\n"));
        assert!(text.contains("Maple Leafs: Auston Matthews scores at 05:12 of the 2nd period!"));
        assert!(text.contains("Assisted by: M. Marner, W. Nylander"));
        assert!(text.ends_with("Score: Bruins 3 - Maple Leafs 2"));
    }

    #[test]
    fn test_format_goal_unassisted() {
        let g = game(1, GameState::Live, vec![]);
        let text = format_goal(&g, &goal("BOS", "David Pastrnak", &[]));
        assert!(text.contains("Bruins: David Pastrnak"));
        assert!(!text.contains("Assisted by"));
    }

    #[test]
    fn test_email_subject_and_game_end() {
        let g = game(1, GameState::Final, vec![]);
        assert_eq!(
            format_email_subject(&g, &goal("BOS", "Pastrnak", &[])),
            "Goal Alert: Bruins scores!"
        );
        assert_eq!(format_game_end(&g), "🏁 FINAL: Bruins 3 - Maple Leafs 2");
    }
}
