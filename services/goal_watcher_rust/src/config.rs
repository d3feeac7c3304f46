use anyhow::{anyhow, Context, Result};
use goalhorn_rust_core::clients::nhl::DEFAULT_BASE_URL;
use goalhorn_rust_core::notifiers::hue::{
    DEFAULT_BRI, DEFAULT_HUE, DEFAULT_OPPONENT_HUE, DEFAULT_SAT,
};
use goalhorn_rust_core::notifiers::{
    parse_channels, ChannelKind, ChannelSettings, EmailConfig, FlashType, HueConfig,
    WebhookConfig,
};
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SMTP_PORT: u16 = 587;

#[derive(Debug, Clone)]
pub struct Config {
    /// NHL team id to follow
    pub team_id: u32,
    pub poll_interval: Duration,
    pub channels: Vec<ChannelKind>,
    pub nhl_api_base_url: String,
    /// Applied to every outbound call: score feed, webhook, Hue bridge, SMTP
    pub http_timeout: Duration,
    pub channel_settings: ChannelSettings,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let team_id_raw = env::var("TEAM_ID").context("TEAM_ID must be set (NHL team id)")?;
        let team_id = team_id_raw
            .trim()
            .parse::<u32>()
            .with_context(|| format!("Invalid TEAM_ID: {team_id_raw} (expected integer)"))?;

        let poll_interval = Duration::from_secs(parse_env(
            "POLL_INTERVAL_SECS",
            DEFAULT_POLL_INTERVAL_SECS,
        )?);
        if poll_interval.is_zero() {
            return Err(anyhow!("POLL_INTERVAL_SECS must be greater than zero"));
        }

        let http_timeout = Duration::from_secs(parse_env(
            "HTTP_TIMEOUT_SECS",
            DEFAULT_HTTP_TIMEOUT_SECS,
        )?);

        let channel_list =
            env::var("NOTIFICATION_TYPE").unwrap_or_else(|_| "console".to_string());
        let channels = parse_channels(&channel_list);

        let nhl_api_base_url =
            env::var("NHL_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let mut channel_settings = ChannelSettings::default();
        if channels.contains(&ChannelKind::Email) {
            channel_settings.email = Some(email_from_env().context("email notifier settings")?);
        }
        if channels.contains(&ChannelKind::Webhook) {
            channel_settings.webhook =
                Some(webhook_from_env().context("webhook notifier settings")?);
        }
        if channels.contains(&ChannelKind::Hue) {
            channel_settings.hue = Some(hue_from_env().context("hue notifier settings")?);
        }

        Ok(Self {
            team_id,
            poll_interval,
            channels,
            nhl_api_base_url,
            http_timeout,
            channel_settings,
        })
    }
}

fn email_from_env() -> Result<EmailConfig> {
    Ok(EmailConfig {
        smtp_server: required_env("SMTP_SERVER")?,
        smtp_port: parse_env("SMTP_PORT", DEFAULT_SMTP_PORT)?,
        username: required_env("SMTP_USERNAME")?,
        password: required_env("SMTP_PASSWORD")?,
        from: required_env("SMTP_FROM")?,
        to: {
            let to = parse_csv(&required_env("SMTP_TO")?);
            if to.is_empty() {
                return Err(anyhow!("SMTP_TO must contain at least one recipient"));
            }
            to
        },
    })
}

fn webhook_from_env() -> Result<WebhookConfig> {
    Ok(WebhookConfig {
        url: required_env("WEBHOOK_URL")?,
        method: env::var("WEBHOOK_METHOD").unwrap_or_else(|_| "POST".to_string()),
        headers: parse_headers(&env::var("WEBHOOK_HEADERS").unwrap_or_default())
            .context("WEBHOOK_HEADERS")?,
    })
}

fn hue_from_env() -> Result<HueConfig> {
    Ok(HueConfig {
        bridge_ip: required_env("HUE_BRIDGE_IP")?,
        username: required_env("HUE_USERNAME")?,
        light_id: {
            let raw = required_env("HUE_LIGHT_ID")?;
            raw.trim()
                .parse::<u32>()
                .with_context(|| format!("Invalid HUE_LIGHT_ID: {raw} (expected integer)"))?
        },
        flash_type: FlashType::from_setting(
            &env::var("HUE_FLASH_TYPE").unwrap_or_else(|_| "long".to_string()),
        ),
        hue: parse_env("HUE_HUE", DEFAULT_HUE)?,
        opponent_hue: parse_env("HUE_OPPONENT_HUE", DEFAULT_OPPONENT_HUE)?,
        sat: parse_env("HUE_SAT", DEFAULT_SAT)?,
        bri: parse_env("HUE_BRI", DEFAULT_BRI)?,
        detached: parse_bool_env("HUE_DETACHED", false),
    })
}

fn required_env(key: &str) -> Result<String> {
    let value = env::var(key).with_context(|| format!("{key} must be set"))?;
    if value.trim().is_empty() {
        return Err(anyhow!("{key} must not be empty"));
    }
    Ok(value.trim().to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr + ToString,
{
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|_| anyhow!("Invalid {key}: {raw} (expected {})", std::any::type_name::<T>()))
}

fn parse_bool_env(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| parse_bool(&v))
        .unwrap_or(default)
}

pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

pub fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// `Authorization:Bearer abc,X-Source:goalhorn` -> header map.
///
/// A comma only starts a new header when the text after it looks like
/// `Name:`; otherwise it belongs to the current value, so
/// `Accept:text/html, application/json` stays one header. Values keep any
/// further colons (`X-Url:http://x`). A value segment that itself looks like
/// `token:rest` after a comma is read as a new header.
pub fn parse_headers(raw: &str) -> Result<HashMap<String, String>> {
    let mut entries: Vec<(String, String)> = Vec::new();

    for segment in raw.split(',') {
        match segment.split_once(':') {
            Some((name, value)) if is_header_name(name.trim()) => {
                entries.push((name.trim().to_string(), value.to_string()));
            }
            _ => match entries.last_mut() {
                Some((_, value)) => {
                    value.push(',');
                    value.push_str(segment);
                }
                None if segment.trim().is_empty() => {}
                None => {
                    return Err(anyhow!(
                        "header '{}' is not in Name:Value form",
                        segment.trim()
                    ))
                }
            },
        }
    }

    Ok(entries
        .into_iter()
        .map(|(name, value)| (name, value.trim().trim_end_matches(',').trim().to_string()))
        .collect())
}

/// RFC 7230 token characters.
fn is_header_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}
