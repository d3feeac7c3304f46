//! Error types shared by the notifier implementations

use thiserror::Error;

/// Failure delivering one alert through one channel.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} returned non-2xx status {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("hue bridge rejected request: {0}")]
    Bridge(String),

    #[error("invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to build email: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("smtp delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("invalid notifier configuration: {0}")]
    Config(String),

    /// Could not read the light before alerting; nothing was changed.
    #[error("could not capture state of light {light_id}: {source}")]
    HueSnapshot {
        light_id: u32,
        #[source]
        source: Box<NotifyError>,
    },

    /// The alert PUT failed but the light was restored.
    #[error("could not apply alert to light {light_id}: {source}")]
    HueAlert {
        light_id: u32,
        #[source]
        source: Box<NotifyError>,
    },

    /// Restore failed after an alert was attempted; the light may still be
    /// flashing in goal colors and needs a manual reset.
    #[error("light {light_id} stuck in alert state, restore failed: {source}")]
    StuckDevice {
        light_id: u32,
        #[source]
        source: Box<NotifyError>,
    },
}

impl NotifyError {
    pub fn is_stuck_device(&self) -> bool {
        matches!(self, NotifyError::StuckDevice { .. })
    }
}

/// Problems turning configuration into notifiers. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("channel '{0}' is enabled but has no settings")]
    MissingSettings(&'static str),

    #[error("invalid {channel} setting: {reason}")]
    Invalid {
        channel: &'static str,
        reason: String,
    },
}
