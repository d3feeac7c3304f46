//! SMTP email channel

use super::Notifier;
use crate::error::{ConfigError, NotifyError};
use crate::formatters::{format_email_subject, format_goal};
use crate::models::{Game, Goal};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use tracing::debug;

/// Port that expects TLS from the first byte; every other port upgrades
/// with STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub to: Vec<String>,
}

pub struct EmailNotifier {
    config: EmailConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig, timeout: Duration) -> Result<Self, ConfigError> {
        if config.to.is_empty() {
            return Err(ConfigError::Invalid {
                channel: "email",
                reason: "no recipients configured".to_string(),
            });
        }

        let builder = if config.smtp_port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_server)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)
        }
        .map_err(|e| ConfigError::Invalid {
            channel: "email",
            reason: e.to_string(),
        })?;

        let transport = builder
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .authentication(vec![Mechanism::Plain, Mechanism::Login])
            .timeout(Some(timeout))
            .build();

        Ok(Self { config, transport })
    }

    /// Single message addressed to every recipient.
    pub fn build_message(&self, game: &Game, goal: &Goal) -> Result<Message, NotifyError> {
        build_message(&self.config, game, goal)
    }
}

pub fn build_message(
    config: &EmailConfig,
    game: &Game,
    goal: &Goal,
) -> Result<Message, NotifyError> {
    let from: Mailbox = config.from.parse()?;
    let mut builder = Message::builder()
        .from(from)
        .subject(format_email_subject(game, goal))
        .header(ContentType::TEXT_PLAIN);

    for recipient in &config.to {
        let mailbox: Mailbox = recipient.parse()?;
        builder = builder.to(mailbox);
    }

    Ok(builder.body(format_goal(game, goal))?)
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &str {
        "email"
    }

    async fn notify(
        &self,
        game: &Game,
        goal: &Goal,
        _tracked_team_id: u32,
        _followed: bool,
    ) -> Result<(), NotifyError> {
        let message = self.build_message(game, goal)?;
        let response = self.transport.send(message).await?;
        debug!(
            "SMTP accepted goal alert for {} recipients: {:?}",
            self.config.to.len(),
            response.code()
        );
        Ok(())
    }
}
