/*
 * Configuration surfaces of the toolkit: `OverlayConfig` tunes the overlay's
 * update loops and tracking policy, `Settings` is the persisted key/value
 * store controls read their user-bound values from (e.g. the key captured by
 * a `KeyButton`). Both are JSON documents.
 */
use crate::error::{PlatformError, Result as PlatformResult};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

pub const DEFAULT_UPDATE_RATE_HZ: u32 = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Target rate of the logic loop (`Overlay::on_tick`).
    pub logic_rate_hz: u32,
    /// Target rate of the draw loop (`Overlay::on_draw`).
    pub draw_rate_hz: u32,
    /// Skip drawing while the tracked window is not the foreground window.
    pub draw_only_when_foreground: bool,
    /// Keep the overlay glued to the tracked window's client rectangle.
    pub track_target_window: bool,
    /// Sample input and update the root controls on every logic tick.
    pub update_controls_on_tick: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            logic_rate_hz: DEFAULT_UPDATE_RATE_HZ,
            draw_rate_hz: DEFAULT_UPDATE_RATE_HZ,
            draw_only_when_foreground: true,
            track_target_window: true,
            update_controls_on_tick: true,
        }
    }
}

impl OverlayConfig {
    pub fn from_json_str(json: &str) -> PlatformResult<Self> {
        let config: OverlayConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PlatformResult<()> {
        if self.logic_rate_hz == 0 || self.draw_rate_hz == 0 {
            return Err(PlatformError::Settings(format!(
                "update rates must be positive (logic {} Hz, draw {} Hz)",
                self.logic_rate_hz, self.draw_rate_hz
            )));
        }
        Ok(())
    }
}

/*
 * Flat JSON object keyed by setting name. Values are decoded on demand into
 * whatever type the caller asks for, so a control only needs to know its own
 * key and the type it stores.
 */
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    values: Map<String, Value>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> PlatformResult<Self> {
        match serde_json::from_str::<Value>(json)? {
            Value::Object(values) => Ok(Self { values }),
            other => Err(PlatformError::Settings(format!(
                "settings document must be a JSON object, found {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> PlatformResult<Self> {
        let path = path.as_ref();
        log::debug!("Settings: loading {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> PlatformResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.values)?;
        fs::write(path, json)?;
        log::debug!("Settings: saved {} keys to {}", self.values.len(), path.display());
        Ok(())
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get_value<T: DeserializeOwned>(&self, key: &str) -> PlatformResult<T> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| PlatformError::Settings(format!("no setting named '{key}'")))?;
        serde_json::from_value(value.clone()).map_err(|e| {
            PlatformError::Settings(format!("setting '{key}' has an unexpected type: {e}"))
        })
    }

    pub fn set_value<T: Serialize>(&mut self, key: &str, value: T) -> PlatformResult<()> {
        let value = serde_json::to_value(value)?;
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
