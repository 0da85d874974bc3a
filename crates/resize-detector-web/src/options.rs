#![forbid(unsafe_code)]

//! Detector options supplied from JavaScript as JSON.
//!
//! Keys use the JS property names (`handleWidth`, `refreshRate`, ...). Every
//! key is optional and unknown keys are ignored, so an options object written
//! for a newer version still parses. `null` is the same as `{}`.
//!
//! Values are read the way the component reads its props: flags use JS
//! truthiness, `refreshRate` is coerced to a number and a rate that is not a
//! usable delay becomes 0. Only JSON that does not parse is an error.
//!
//! Parsing lives outside the `wasm32`-only modules so it can be tested
//! natively.

use resize_detector::{DetectorConfig, RefreshMode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

/// Errors from parsing detector options.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionsError {
    /// The input is not JSON.
    Json(String),
}

impl core::fmt::Display for OptionsError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Json(msg) => write!(f, "JSON parse error: {msg}"),
        }
    }
}

impl std::error::Error for OptionsError {}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOptions {
    #[serde(default)]
    handle_width: Option<Value>,
    #[serde(default)]
    handle_height: Option<Value>,
    #[serde(default)]
    skip_on_mount: Option<Value>,
    #[serde(default)]
    refresh_rate: Option<Value>,
    #[serde(default)]
    refresh_mode: Option<Value>,
    #[serde(default)]
    resizable_element_id: Option<Value>,
}

/// Parse a JSON options object into a [`DetectorConfig`].
///
/// An unrecognized `refreshMode` disables rate limiting rather than failing,
/// matching how the component treats unknown modes.
pub fn parse_detector_options(json: &str) -> Result<DetectorConfig, OptionsError> {
    let raw: Option<RawOptions> =
        serde_json::from_str(json).map_err(|e| OptionsError::Json(e.to_string()))?;
    let raw = raw.unwrap_or_default();

    let mut config = DetectorConfig::default()
        .with_handle_width(raw.handle_width.as_ref().is_some_and(truthy))
        .with_handle_height(raw.handle_height.as_ref().is_some_and(truthy))
        .with_skip_on_mount(raw.skip_on_mount.as_ref().is_some_and(truthy));

    if let Some(value) = &raw.refresh_rate {
        config = config.with_refresh_rate(refresh_rate(value));
    }

    if let Some(value) = &raw.refresh_mode {
        let mode = match value {
            Value::String(name) => match name.parse::<RefreshMode>() {
                Ok(mode) => Some(mode),
                Err(err) => {
                    warn!(%err, "refresh mode ignored");
                    None
                }
            },
            Value::Null => None,
            other => {
                warn!(mode = %other, "refresh mode is not a name, ignored");
                None
            }
        };
        config = config.with_refresh_mode(mode);
    }

    if let Some(id) = raw.resizable_element_id.as_ref().and_then(element_id) {
        config = config.with_resizable_element_id(id);
    }

    Ok(config)
}

/// JS truthiness of a JSON value.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Numeric coercion of a JSON value, `NaN` when there is no number.
fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse().unwrap_or(f64::NAN)
            }
        }
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

/// Delay for a `refreshRate` value. Anything that is not a finite,
/// non-negative number of milliseconds becomes zero.
fn refresh_rate(value: &Value) -> Duration {
    let ms = to_number(value);
    if ms.is_finite() && ms >= 0.0 {
        if let Ok(rate) = Duration::try_from_secs_f64(ms / 1000.0) {
            return rate;
        }
    }
    warn!(refresh_rate = %value, "refresh rate is not a usable delay, using 0 ms");
    Duration::ZERO
}

/// Element id from a truthy `resizableElementId`.
fn element_id(value: &Value) -> Option<String> {
    if !truthy(value) {
        return None;
    }
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => {
            warn!(id = %other, "resizable element id is not a string, ignored");
            None
        }
    }
}
