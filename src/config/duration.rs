//! Duration parsing utilities.

use super::ConfigError;
use std::time::Duration;

/// Parse a duration string like "1h", "5m", "300s", "300".
/// Supports:
/// - Plain numbers (interpreted as seconds): "300"
/// - Seconds suffix: "300s"
/// - Minutes suffix: "5m"
/// - Hours suffix: "1h"
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(invalid("Empty duration string".to_string()));
    }

    let (num_str, unit, multiplier) = if let Some(num_str) = s.strip_suffix('h') {
        (num_str, "hours", 3600)
    } else if let Some(num_str) = s.strip_suffix('m') {
        (num_str, "minutes", 60)
    } else if let Some(num_str) = s.strip_suffix('s') {
        (num_str, "seconds", 1)
    } else {
        (s, "duration", 1)
    };

    let value: u64 = num_str
        .trim()
        .parse()
        .map_err(|_| invalid(format!("Invalid {unit} value: {num_str}")))?;
    let secs = value
        .checked_mul(multiplier)
        .ok_or_else(|| invalid(format!("Duration out of range: {s}")))?;

    Ok(Duration::from_secs(secs))
}

fn invalid(message: String) -> ConfigError {
    ConfigError::InvalidValue {
        key: "api.timeout",
        message,
    }
}
