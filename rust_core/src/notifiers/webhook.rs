//! Generic JSON webhook channel

use super::Notifier;
use crate::error::{ConfigError, NotifyError};
use crate::models::{Game, Goal};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, Url};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub url: String,
    pub method: String,
    pub headers: HashMap<String, String>,
}

/// Body posted for every goal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookPayload {
    pub event: &'static str,
    pub team: String,
    pub scorer: String,
    pub period: u8,
    pub time: String,
    pub assists: Vec<String>,
    pub home_team: String,
    pub home_score: u32,
    pub away_team: String,
    pub away_score: u32,
}

impl WebhookPayload {
    pub fn from_goal(game: &Game, goal: &Goal) -> Self {
        Self {
            event: "goal",
            team: game.scoring_team(goal).name.clone(),
            scorer: goal.scorer.name.clone(),
            period: goal.period,
            time: goal.time_in_period.clone(),
            assists: goal.assist_names(),
            home_team: game.home_team.name.clone(),
            home_score: game.home_team.score,
            away_team: game.away_team.name.clone(),
            away_score: game.away_team.score,
        }
    }
}

pub struct WebhookNotifier {
    client: Client,
    url: Url,
    method: Method,
    headers: HeaderMap,
}

impl WebhookNotifier {
    pub fn new(config: WebhookConfig, timeout: Duration) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid {
            channel: "webhook",
            reason,
        };

        let url = Url::parse(&config.url).map_err(|e| invalid(format!("url: {}", e)))?;
        // Method tokens are case-sensitive; send exactly what was configured.
        let method = Method::from_bytes(config.method.trim().as_bytes())
            .map_err(|e| invalid(format!("method '{}': {}", config.method, e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| invalid(format!("header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| invalid(format!("header value for '{}': {}", name, e)))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| invalid(format!("http client: {}", e)))?;

        Ok(Self {
            client,
            url,
            method,
            headers,
        })
    }

    pub fn build_request(
        &self,
        game: &Game,
        goal: &Goal,
    ) -> Result<reqwest::Request, NotifyError> {
        let payload = WebhookPayload::from_goal(game, goal);
        let body = serde_json::to_vec(&payload)
            .map_err(|e| NotifyError::Config(format!("webhook payload: {}", e)))?;

        Ok(self
            .client
            .request(self.method.clone(), self.url.clone())
            .headers(self.headers.clone())
            .body(body)
            .build()?)
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn notify(
        &self,
        game: &Game,
        goal: &Goal,
        _tracked_team_id: u32,
        _followed: bool,
    ) -> Result<(), NotifyError> {
        let request = self.build_request(game, goal)?;
        let response = self.client.execute(request).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Status {
                endpoint: self.url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        debug!("Webhook {} {} -> {}", self.method, self.url, status);
        Ok(())
    }
}
