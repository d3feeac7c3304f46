//! Goal notification channels
//!
//! Every channel implements `Notifier`. Channels are picked by name from a
//! comma-separated list (`console,email,webhook,hue`); unknown names fall
//! back to the console channel rather than failing startup.

use crate::error::{ConfigError, NotifyError};
use crate::models::{Game, Goal};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub mod console;
pub mod email;
pub mod hue;
pub mod webhook;

pub use console::ConsoleNotifier;
pub use email::{EmailConfig, EmailNotifier};
pub use hue::{FlashType, HttpHueBridge, HueBridge, HueConfig, HueNotifier, LightState};
pub use webhook::{WebhookConfig, WebhookNotifier};

/// One delivery channel for goal alerts.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Channel name for logging
    fn name(&self) -> &str;

    /// Deliver one alert. `followed` is true when the followed team scored.
    async fn notify(
        &self,
        game: &Game,
        goal: &Goal,
        tracked_team_id: u32,
        followed: bool,
    ) -> Result<(), NotifyError>;

    /// Wait for any background work started by `notify` to finish.
    async fn drain(&self) {}

    /// Stuck devices left by background work since the last call; resets.
    fn take_background_stuck(&self) -> usize {
        0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Console,
    Email,
    Webhook,
    Hue,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Console => "console",
            ChannelKind::Email => "email",
            ChannelKind::Webhook => "webhook",
            ChannelKind::Hue => "hue",
        }
    }

    /// Unknown names resolve to `Console`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "email" => ChannelKind::Email,
            "webhook" => ChannelKind::Webhook,
            "hue" => ChannelKind::Hue,
            "console" => ChannelKind::Console,
            other => {
                warn!("Unknown notification channel '{}', using console", other);
                ChannelKind::Console
            }
        }
    }
}

/// Parse a channel list such as `"email, hue"`, keeping list order.
pub fn parse_channels(list: &str) -> Vec<ChannelKind> {
    let channels: Vec<ChannelKind> = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ChannelKind::from_name)
        .collect();

    if channels.is_empty() {
        vec![ChannelKind::Console]
    } else {
        channels
    }
}

/// Per-channel settings; only the enabled channels need to be present.
#[derive(Debug, Clone, Default)]
pub struct ChannelSettings {
    pub email: Option<EmailConfig>,
    pub webhook: Option<WebhookConfig>,
    pub hue: Option<HueConfig>,
}

/// Build one notifier per channel, in order.
pub fn build_notifiers(
    channels: &[ChannelKind],
    settings: &ChannelSettings,
    http_timeout: Duration,
) -> Result<Vec<Arc<dyn Notifier>>, ConfigError> {
    let mut notifiers: Vec<Arc<dyn Notifier>> = Vec::with_capacity(channels.len());

    for channel in channels {
        info!("Creating notifier for {}", channel.as_str());
        let notifier: Arc<dyn Notifier> = match channel {
            ChannelKind::Console => Arc::new(ConsoleNotifier::new()),
            ChannelKind::Email => {
                let cfg = settings
                    .email
                    .clone()
                    .ok_or(ConfigError::MissingSettings("email"))?;
                Arc::new(EmailNotifier::new(cfg, http_timeout)?)
            }
            ChannelKind::Webhook => {
                let cfg = settings
                    .webhook
                    .clone()
                    .ok_or(ConfigError::MissingSettings("webhook"))?;
                Arc::new(WebhookNotifier::new(cfg, http_timeout)?)
            }
            ChannelKind::Hue => {
                let cfg = settings
                    .hue
                    .clone()
                    .ok_or(ConfigError::MissingSettings("hue"))?;
                let bridge = HttpHueBridge::new(&cfg, http_timeout)?;
                Arc::new(HueNotifier::new(cfg, Arc::new(bridge)))
            }
        };
        notifiers.push(notifier);
    }

    Ok(notifiers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_channels_order_and_fallback() {
        assert_eq!(
            parse_channels("hue, email,sms,webhook"),
            vec![
                ChannelKind::Hue,
                ChannelKind::Email,
                ChannelKind::Console,
                ChannelKind::Webhook
            ]
        );
    }

    #[test]
    fn test_parse_channels_case_and_empty() {
        assert_eq!(parse_channels("HUE"), vec![ChannelKind::Hue]);
        assert_eq!(parse_channels(""), vec![ChannelKind::Console]);
        assert_eq!(parse_channels(" , "), vec![ChannelKind::Console]);
    }

    #[test]
    fn test_build_notifiers_in_order() {
        let settings = ChannelSettings {
            webhook: Some(WebhookConfig {
                url: "https://hooks.example.com/goal".to_string(),
                method: "POST".to_string(),
                headers: HashMap::new(),
            }),
            ..ChannelSettings::default()
        };

        let notifiers = build_notifiers(
            &parse_channels("webhook,pager"),
            &settings,
            Duration::from_secs(5),
        )
        .unwrap();

        let names: Vec<&str> = notifiers.iter().map(|n| n.name()).collect();
        assert_eq!(names, vec!["webhook", "console"]);
    }

    #[test]
    fn test_build_notifiers_missing_settings() {
        let err = build_notifiers(
            &[ChannelKind::Email],
            &ChannelSettings::default(),
            Duration::from_secs(5),
        )
        .err()
        .unwrap();
        assert!(matches!(err, ConfigError::MissingSettings("email")));
    }
}
