//! Setting value validation.

use regex::Regex;
use std::sync::LazyLock;

static RE_USER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_\-]{1,64}$").unwrap());
static RE_ASSET_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_\-]{1,64}$").unwrap());

/// Validate a setting value. Returns `Ok(())` if valid, or an error message.
pub fn validate_setting(key: &str, value: &str) -> Result<(), String> {
    match key {
        "API_BASE_URL" => validate_http_url(value)?,
        "SOCKET_URL" => {
            if !value.is_empty() {
                validate_http_url(value)?;
            }
        }
        "USER_ID" => {
            if !value.is_empty() && !RE_USER_ID.is_match(value) {
                return Err("user id must be 1-64 letters, digits, '-' or '_'".into());
            }
        }
        "SOUND_SELECTED" => {
            if !value.is_empty() && !RE_ASSET_ID.is_match(value) {
                return Err("sound id must be a file stem (letters, digits, '-' or '_')".into());
            }
        }
        "SOUND_VOLUME" => {
            let v: f64 = value.parse().map_err(|_| "must be a float")?;
            if !(0.0..=1.0).contains(&v) {
                return Err("must be between 0.0 and 1.0".into());
            }
        }
        "RECONNECT_ATTEMPTS" => validate_int_range(value, 0, 50)?,
        "RECONNECT_DELAY_MS" => validate_int_range(value, 100, 60_000)?,
        // Boolean settings
        k if is_boolean_setting(k) => {
            if value != "true" && value != "false" {
                return Err("must be 'true' or 'false'".into());
            }
        }
        _ => {}
    }
    Ok(())
}

fn validate_http_url(value: &str) -> Result<(), String> {
    let url = url::Url::parse(value).map_err(|e| format!("invalid URL: {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme '{other}' (expected http or https)")),
    }
}

fn validate_int_range(value: &str, min: i64, max: i64) -> Result<(), String> {
    let v: i64 = value.parse().map_err(|_| "must be an integer")?;
    if v < min || v > max {
        return Err(format!("must be between {min} and {max}"));
    }
    Ok(())
}

fn is_boolean_setting(key: &str) -> bool {
    matches!(
        key,
        "SOUND_ENABLED" | "SOUND_REQUIRE_INTERACTION" | "DESKTOP_NOTIFICATIONS_ENABLED" | "START_VISIBLE"
    )
}
