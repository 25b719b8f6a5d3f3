use std::time::Duration;

use inkwire_shared::WireFormat;
use serde::Deserialize;

use crate::error::ClientError;
use crate::state::DEFAULT_BACKGROUND;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackoffConfig {
    pub initial_ms: u64,
    pub max_ms: u64,
    pub factor: f64,
    /// Reconnect attempts before giving up. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_ms: 500,
            max_ms: 10_000,
            factor: 2.0,
            max_attempts: None,
        }
    }
}

impl BackoffConfig {
    /// Delay before reconnect attempt `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let factor = if self.factor.is_finite() && self.factor >= 1.0 {
            self.factor
        } else {
            1.0
        };
        let millis = (self.initial_ms as f64) * factor.powi(exponent);
        let millis = millis.min(self.max_ms as f64).max(0.0);
        Duration::from_millis(millis as u64)
    }

    pub fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt > max)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct BoardConfig {
    /// Undo snapshots kept. `None` never evicts.
    pub history_capacity: Option<usize>,
    pub background_color: String,
    pub wire_format: WireFormat,
    pub reconnect: BackoffConfig,
    pub room: Option<String>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            history_capacity: None,
            background_color: DEFAULT_BACKGROUND.to_string(),
            wire_format: WireFormat::Json,
            reconnect: BackoffConfig::default(),
            room: None,
        }
    }
}

impl BoardConfig {
    pub fn from_json(text: &str) -> Result<Self, ClientError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Applies `room`, `history`, `format` and `background` from a URL query
    /// string. Values are percent-decoded. Unknown keys are ignored.
    pub fn apply_query(&mut self, query: &str) -> Result<(), ClientError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (key, raw) = pair.split_once('=').unwrap_or((pair, ""));
            let key = match key {
                "room" => "room",
                "history" => "history",
                "format" => "format",
                "background" => "background",
                _ => continue,
            };
            let value = decode_query_value(raw).ok_or_else(|| ClientError::ConfigValue {
                key,
                value: raw.to_string(),
            })?;
            let invalid = || ClientError::ConfigValue {
                key,
                value: value.clone(),
            };
            match key {
                "room" if !value.is_empty() => self.room = Some(value.clone()),
                "history" => {
                    self.history_capacity = match value.as_str() {
                        "" | "unbounded" => None,
                        other => Some(other.parse().map_err(|_| invalid())?),
                    }
                }
                "format" => self.wire_format = value.parse().map_err(|_| invalid())?,
                "background" if !value.is_empty() => self.background_color = value.clone(),
                _ => {}
            }
        }
        Ok(())
    }
}

/// `+` is a space in query strings; everything else is a percent escape.
fn decode_query_value(raw: &str) -> Option<String> {
    urlencoding::decode(&raw.replace('+', " "))
        .ok()
        .map(|value| value.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps() {
        let backoff = BackoffConfig::default();
        assert_eq!(backoff.delay(1), Duration::from_millis(500));
        assert_eq!(backoff.delay(2), Duration::from_millis(1000));
        assert_eq!(backoff.delay(3), Duration::from_millis(2000));
        assert_eq!(backoff.delay(10), Duration::from_millis(10_000));
        assert_eq!(backoff.delay(u32::MAX), Duration::from_millis(10_000));
        assert!(!backoff.exhausted(1_000));
    }

    #[test]
    fn attempt_limit() {
        let backoff = BackoffConfig {
            max_attempts: Some(3),
            ..BackoffConfig::default()
        };
        assert!(!backoff.exhausted(3));
        assert!(backoff.exhausted(4));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = BoardConfig::from_json(r#"{"history_capacity": 20, "wire_format": "binary"}"#)
            .unwrap();
        assert_eq!(config.history_capacity, Some(20));
        assert_eq!(config.wire_format, WireFormat::Binary);
        assert_eq!(config.background_color, DEFAULT_BACKGROUND);
        assert_eq!(config.reconnect, BackoffConfig::default());
    }

    #[test]
    fn query_overrides() {
        let mut config = BoardConfig::default();
        config
            .apply_query("?room=team&history=5&format=binary&background=%23eeeeee&x=1")
            .unwrap();
        assert_eq!(config.room.as_deref(), Some("team"));
        assert_eq!(config.history_capacity, Some(5));
        assert_eq!(config.wire_format, WireFormat::Binary);
        assert_eq!(config.background_color, "#eeeeee");

        assert!(config.apply_query("history=lots").is_err());
    }

    #[test]
    fn query_values_are_percent_decoded() {
        let mut config = BoardConfig::default();
        config
            .apply_query("room=design%20review&background=rgb(1%2C2%2C3)")
            .unwrap();
        assert_eq!(config.room.as_deref(), Some("design review"));
        assert_eq!(config.background_color, "rgb(1,2,3)");

        config.apply_query("background=light+gray").unwrap();
        assert_eq!(config.background_color, "light gray");

        assert!(config.apply_query("room=%FF").is_err());
        config.apply_query("utm=%FF").unwrap();
    }
}
