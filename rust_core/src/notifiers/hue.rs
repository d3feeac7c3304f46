//! Philips Hue goal light
//!
//! A goal alert is a capture-alert-restore sequence against one light:
//!
//! 1. GET the light and keep `{on, bri, hue, sat}` as a snapshot
//! 2. PUT an alert state in the scoring side's color
//! 3. dwell for `HUE_DWELL`
//! 4. PUT the snapshot back with `alert: "none"`
//!
//! Once the snapshot exists the light is armed, and the restore is attempted
//! on every exit path, including a failed alert PUT. A failed restore is
//! reported as `StuckDevice` since the light may be left in goal colors.
//!
//! Sequences against the light are serialized by a one-permit semaphore; the
//! permit is taken before the snapshot so a snapshot never sees alert colors
//! from a previous goal. In detached mode steps 2-4 run on a background task
//! holding that permit, and `drain()` waits for it. Their `StuckDevice`
//! outcomes are counted and handed over through `take_background_stuck()`.

use super::Notifier;
use crate::error::{ConfigError, NotifyError};
use crate::models::{Game, Goal};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// How long the alert stays on before the light is restored.
pub const HUE_DWELL: Duration = Duration::from_secs(15);

pub const DEFAULT_HUE: u16 = 0;
pub const DEFAULT_OPPONENT_HUE: u16 = 25500;
pub const DEFAULT_SAT: u8 = 254;
pub const DEFAULT_BRI: u8 = 254;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashType {
    /// One breathe cycle (`select`)
    Select,
    /// Breathe cycles for ~15 seconds (`lselect`)
    LSelect,
}

impl FlashType {
    /// `short`/`select` flash once; anything else, including empty, is long.
    pub fn from_setting(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "short" | "select" => FlashType::Select,
            _ => FlashType::LSelect,
        }
    }

    pub fn alert_value(&self) -> &'static str {
        match self {
            FlashType::Select => "select",
            FlashType::LSelect => "lselect",
        }
    }
}

#[derive(Debug, Clone)]
pub struct HueConfig {
    pub bridge_ip: String,
    pub username: String,
    pub light_id: u32,
    pub flash_type: FlashType,
    /// Hue used when the followed team scores
    pub hue: u16,
    /// Hue used when the opponent scores
    pub opponent_hue: u16,
    pub sat: u8,
    pub bri: u8,
    /// Run alert, dwell and restore on a background task
    pub detached: bool,
}

/// Light attributes captured before an alert and written back afterwards.
///
/// White-only bulbs report no `hue`/`sat` and plugs report no `bri`; absent
/// attributes stay absent in every patch sent to that light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightState {
    pub on: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bri: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hue: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sat: Option<u8>,
}

/// Body of a `PUT .../state` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatePatch {
    pub on: bool,
    pub alert: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hue: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sat: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bri: Option<u8>,
}

impl StatePatch {
    /// Alert colors, limited to the attributes `snapshot` says the light has.
    pub fn alert(flash: FlashType, hue: u16, sat: u8, bri: u8, snapshot: &LightState) -> Self {
        Self {
            on: true,
            alert: flash.alert_value(),
            hue: snapshot.hue.map(|_| hue),
            sat: snapshot.sat.map(|_| sat),
            bri: snapshot.bri.map(|_| bri),
        }
    }

    pub fn restore(snapshot: &LightState) -> Self {
        Self {
            on: snapshot.on,
            alert: "none",
            hue: snapshot.hue,
            sat: snapshot.sat,
            bri: snapshot.bri,
        }
    }
}

/// Minimal bridge surface the goal light needs.
#[async_trait]
pub trait HueBridge: Send + Sync {
    async fn get_light(&self, light_id: u32) -> Result<LightState, NotifyError>;
    async fn put_state(&self, light_id: u32, patch: &StatePatch) -> Result<(), NotifyError>;
}

/// Hue bridge REST API (v1) over plain HTTP on the local network.
pub struct HttpHueBridge {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct LightResponse {
    state: LightState,
}

impl HttpHueBridge {
    pub fn new(config: &HueConfig, timeout: Duration) -> Result<Self, ConfigError> {
        if config.bridge_ip.trim().is_empty() || config.username.trim().is_empty() {
            return Err(ConfigError::Invalid {
                channel: "hue",
                reason: "bridge ip and username are required".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::Invalid {
                channel: "hue",
                reason: format!("http client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: format!(
                "http://{}/api/{}",
                config.bridge_ip.trim(),
                config.username.trim()
            ),
        })
    }

    pub fn light_url(&self, light_id: u32) -> String {
        format!("{}/lights/{}", self.base_url, light_id)
    }

    pub fn state_url(&self, light_id: u32) -> String {
        format!("{}/lights/{}/state", self.base_url, light_id)
    }

    async fn read_json(endpoint: &str, response: reqwest::Response) -> Result<Value, NotifyError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(NotifyError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| NotifyError::Bridge(format!("unreadable response: {}", e)))?;
        check_bridge_errors(&value)?;
        Ok(value)
    }
}

/// The bridge answers 200 even when it rejects a request; rejections come
/// back as `[{"error": {"type": .., "description": ..}}]`.
pub fn check_bridge_errors(value: &Value) -> Result<(), NotifyError> {
    if let Some(items) = value.as_array() {
        let errors: Vec<String> = items
            .iter()
            .filter_map(|item| item.get("error"))
            .map(|err| {
                err.get("description")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown bridge error")
                    .to_string()
            })
            .collect();

        if !errors.is_empty() {
            return Err(NotifyError::Bridge(errors.join("; ")));
        }
    }
    Ok(())
}

#[async_trait]
impl HueBridge for HttpHueBridge {
    async fn get_light(&self, light_id: u32) -> Result<LightState, NotifyError> {
        let url = self.light_url(light_id);
        let response = self.client.get(&url).send().await?;
        let value = Self::read_json(&url, response).await?;

        let light: LightResponse = serde_json::from_value(value)
            .map_err(|e| NotifyError::Bridge(format!("unexpected light payload: {}", e)))?;
        Ok(light.state)
    }

    async fn put_state(&self, light_id: u32, patch: &StatePatch) -> Result<(), NotifyError> {
        let url = self.state_url(light_id);
        let response = self.client.put(&url).json(patch).send().await?;
        Self::read_json(&url, response).await?;
        Ok(())
    }
}

/// A light whose state has been captured; it owes a restore.
struct ArmedLight {
    bridge: Arc<dyn HueBridge>,
    light_id: u32,
    snapshot: LightState,
}

impl ArmedLight {
    async fn run(self, alert: StatePatch, dwell: Duration) -> Result<(), NotifyError> {
        let alert_result = self.bridge.put_state(self.light_id, &alert).await;
        if alert_result.is_ok() {
            tokio::time::sleep(dwell).await;
        }

        // Reverting
        let restore = self
            .bridge
            .put_state(self.light_id, &StatePatch::restore(&self.snapshot))
            .await;

        match (alert_result, restore) {
            (_, Err(e)) => Err(NotifyError::StuckDevice {
                light_id: self.light_id,
                source: Box::new(e),
            }),
            (Err(e), Ok(())) => Err(NotifyError::HueAlert {
                light_id: self.light_id,
                source: Box::new(e),
            }),
            (Ok(()), Ok(())) => Ok(()),
        }
    }
}

pub struct HueNotifier {
    config: HueConfig,
    bridge: Arc<dyn HueBridge>,
    permit: Arc<Semaphore>,
    dwell: Duration,
    /// Stuck lights from detached sequences not yet reported
    background_stuck: Arc<AtomicUsize>,
}

impl HueNotifier {
    pub fn new(config: HueConfig, bridge: Arc<dyn HueBridge>) -> Self {
        Self {
            config,
            bridge,
            permit: Arc::new(Semaphore::new(1)),
            dwell: HUE_DWELL,
            background_stuck: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn alert_patch(&self, followed: bool, snapshot: &LightState) -> StatePatch {
        let hue = if followed {
            self.config.hue
        } else {
            self.config.opponent_hue
        };
        StatePatch::alert(
            self.config.flash_type,
            hue,
            self.config.sat,
            self.config.bri,
            snapshot,
        )
    }
}

#[async_trait]
impl Notifier for HueNotifier {
    fn name(&self) -> &str {
        "hue"
    }

    async fn notify(
        &self,
        _game: &Game,
        _goal: &Goal,
        _tracked_team_id: u32,
        followed: bool,
    ) -> Result<(), NotifyError> {
        let light_id = self.config.light_id;
        let permit = self
            .permit
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| NotifyError::Bridge("hue sequence lock closed".to_string()))?;

        let snapshot =
            self.bridge
                .get_light(light_id)
                .await
                .map_err(|e| NotifyError::HueSnapshot {
                    light_id,
                    source: Box::new(e),
                })?;
        debug!("Captured light {} state: {:?}", light_id, snapshot);

        let armed = ArmedLight {
            bridge: self.bridge.clone(),
            light_id,
            snapshot,
        };
        let alert = self.alert_patch(followed, &snapshot);

        if !self.config.detached {
            let result = armed.run(alert, self.dwell).await;
            drop(permit);
            return result;
        }

        let dwell = self.dwell;
        let background_stuck = self.background_stuck.clone();
        tokio::spawn(async move {
            let _permit = permit;
            match armed.run(alert, dwell).await {
                Ok(()) => info!("Light {} alert sequence complete", light_id),
                Err(e) if e.is_stuck_device() => {
                    background_stuck.fetch_add(1, Ordering::SeqCst);
                    error!("{}", e)
                }
                Err(e) => warn!("Light {} alert failed: {}", light_id, e),
            }
        });
        Ok(())
    }

    async fn drain(&self) {
        // Taking and releasing the permit means no sequence is in flight.
        let _ = self.permit.acquire().await;
    }

    fn take_background_stuck(&self) -> usize {
        self.background_stuck.swap(0, Ordering::SeqCst)
    }
}
