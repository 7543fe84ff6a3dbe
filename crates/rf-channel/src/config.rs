//! Channel Configuration
//!
//! Permissive construction options (`ChannelOptions`) and the validated,
//! mutable `ChannelConfig` owned by a channel for its whole lifetime.
//!
//! Options arrive from loosely typed sources (UI bindings, JSON presets), so
//! trim and fade fields accept either a boolean sentinel or a number. Invalid
//! values never fail: they are normalized and logged.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ChannelError, ChannelResult};

// ═══════════════════════════════════════════════════════════════════════════════
// DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default number of random re-triggers per interval window
pub const DEFAULT_RANDOM_COUNT: u32 = 1;

/// Default random interval window (ms)
pub const DEFAULT_RANDOM_INTERVAL_MS: u64 = 60_000;

/// Default fade length used by crossfade cycles when fades are disabled (ms)
pub const DEFAULT_CROSSFADE_OVERLAP_MS: u64 = 1000;

/// Default UI element selector template
pub const DEFAULT_ELEMENT_FORMAT: &str = "#channels-{id}-{name}";

// ═══════════════════════════════════════════════════════════════════════════════
// PARAM VALUE
// ═══════════════════════════════════════════════════════════════════════════════

/// Boolean-or-number parameter input
///
/// `true`/`false` are sentinels whose meaning depends on the parameter
/// (full duration, reset to zero, disabled).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Flag(bool),
    Millis(f64),
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Flag(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Millis(value)
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        ParamValue::Millis(value as f64)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Millis(value as f64)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Millis(value as f64)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Millis(value as f64)
    }
}

/// Normalize a fade setting: `None` means disabled (falls back to the
/// caller-supplied minimum), `Some(0)` means no fade at all.
pub fn fade_setting(value: ParamValue) -> Option<u64> {
    match value {
        ParamValue::Flag(_) => None,
        ParamValue::Millis(ms) if ms.is_nan() => {
            log::warn!("[Channel] fade value is NaN, disabling fade");
            None
        }
        ParamValue::Millis(ms) if ms < 0.0 => {
            log::warn!("[Channel] negative fade {}ms clamped to 0", ms);
            Some(0)
        }
        ParamValue::Millis(ms) => Some(ms as u64),
    }
}

/// Normalize a pause time. Booleans and non-positive values disable it.
pub fn pausetime_setting(value: ParamValue) -> Option<u64> {
    match value {
        ParamValue::Flag(_) => None,
        ParamValue::Millis(ms) if ms.is_nan() || ms < 0.0 => {
            log::warn!("[Channel] invalid pausetime {}, disabling", ms);
            None
        }
        ParamValue::Millis(ms) => Some(ms as u64),
    }
}

/// Normalize a skip-front value against the source duration.
///
/// Booleans reset to zero. The upper clamp applies only once the duration is
/// known (`duration_ms > 0`).
pub fn skip_front_ms(value: ParamValue, duration_ms: u64) -> u64 {
    let ms = match value {
        ParamValue::Flag(_) => return 0,
        ParamValue::Millis(ms) if ms.is_nan() => {
            log::warn!("[Channel] skipFront is NaN, reset to 0");
            return 0;
        }
        ParamValue::Millis(ms) if ms < 0.0 => {
            log::warn!("[Channel] negative skipFront {}ms clamped to 0", ms);
            return 0;
        }
        ParamValue::Millis(ms) => ms as u64,
    };
    clamp_to_duration(ms, duration_ms)
}

/// Normalize a play-for value against the source duration.
///
/// Booleans select the full duration. NaN and non-positive values leave the
/// play length undefined so region derivation falls back to the remainder of
/// the source.
pub fn play_for_ms(value: ParamValue, duration_ms: u64) -> Option<u64> {
    match value {
        ParamValue::Flag(_) => (duration_ms > 0).then_some(duration_ms),
        ParamValue::Millis(ms) if ms.is_nan() || ms <= 0.0 => {
            if ms.is_nan() || ms < 0.0 {
                log::warn!("[Channel] invalid playFor {}, using full duration", ms);
            }
            None
        }
        ParamValue::Millis(ms) => Some(clamp_to_duration(ms as u64, duration_ms)),
    }
}

#[inline]
fn clamp_to_duration(ms: u64, duration_ms: u64) -> u64 {
    if duration_ms > 0 { ms.min(duration_ms) } else { ms }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHANNEL ID
// ═══════════════════════════════════════════════════════════════════════════════

/// Opaque channel identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHANNEL OPTIONS (permissive input)
// ═══════════════════════════════════════════════════════════════════════════════

/// Construction options, every field optional
///
/// ```rust
/// use rf_channel::ChannelOptions;
///
/// let options = ChannelOptions::from_json(
///     r#"{ "id": "rain", "crossfade": true, "fadeIn": 500, "fadeOut": false }"#,
/// ).unwrap();
/// assert_eq!(options.id.as_deref(), Some("rain"));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelOptions {
    pub id: Option<String>,
    pub random: Option<bool>,
    pub random_count: Option<u32>,
    pub random_interval: Option<u64>,
    pub crossfade: Option<bool>,
    pub crossfade_overlap: Option<u64>,
    pub fade_in: Option<ParamValue>,
    pub fade_out: Option<ParamValue>,
    pub play_for: Option<ParamValue>,
    pub skip_front: Option<ParamValue>,
    pub pausetime: Option<ParamValue>,
    pub offset: Option<u64>,
    /// Seed for the random schedule generator (OS entropy when unset)
    pub seed: Option<u64>,
    pub element_format: Option<String>,
}

impl ChannelOptions {
    /// Options with only an id set
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Parse options from a JSON object
    pub fn from_json(json: &str) -> ChannelResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_random(mut self, count: u32, interval_ms: u64) -> Self {
        self.random = Some(true);
        self.random_count = Some(count);
        self.random_interval = Some(interval_ms);
        self
    }

    pub fn with_crossfade(mut self, overlap_ms: u64) -> Self {
        self.crossfade = Some(true);
        self.crossfade_overlap = Some(overlap_ms);
        self
    }

    pub fn with_fades(
        mut self,
        fade_in: impl Into<ParamValue>,
        fade_out: impl Into<ParamValue>,
    ) -> Self {
        self.fade_in = Some(fade_in.into());
        self.fade_out = Some(fade_out.into());
        self
    }

    pub fn with_trim(
        mut self,
        skip_front: impl Into<ParamValue>,
        play_for: impl Into<ParamValue>,
    ) -> Self {
        self.skip_front = Some(skip_front.into());
        self.play_for = Some(play_for.into());
        self
    }

    pub fn with_pausetime(mut self, pausetime: impl Into<ParamValue>) -> Self {
        self.pausetime = Some(pausetime.into());
        self
    }

    pub fn with_offset(mut self, offset_ms: u64) -> Self {
        self.offset = Some(offset_ms);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHANNEL CONFIG (validated)
// ═══════════════════════════════════════════════════════════════════════════════

/// Validated channel configuration
///
/// Durations are milliseconds. `None` fades are disabled and fall back to the
/// mode's minimum; `None` play length is undefined (rest of the source).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub id: ChannelId,
    pub random: bool,
    pub random_count: u32,
    pub random_interval_ms: u64,
    pub crossfade: bool,
    /// Fade length used by crossfade cycles when a fade is disabled
    pub crossfade_overlap_ms: u64,
    pub fade_in_ms: Option<u64>,
    pub fade_out_ms: Option<u64>,
    pub play_for_ms: Option<u64>,
    pub skip_front_ms: u64,
    pub pausetime_ms: Option<u64>,
    pub offset_ms: u64,
    pub seed: Option<u64>,
    pub element_format: String,
}

impl ChannelConfig {
    /// Validate construction options
    ///
    /// A missing or empty id is fatal: it is reported and no configuration
    /// is produced.
    pub fn from_options(options: ChannelOptions) -> ChannelResult<Self> {
        let id = match options.id {
            Some(id) if !id.is_empty() => ChannelId(id),
            _ => {
                log::error!("[Channel] Require an id for the channel");
                return Err(ChannelError::MissingId);
            }
        };

        let random_count = options.random_count.unwrap_or(DEFAULT_RANDOM_COUNT);
        let random_interval_ms = options
            .random_interval
            .unwrap_or(DEFAULT_RANDOM_INTERVAL_MS);

        Ok(Self {
            random: options.random.unwrap_or(false),
            random_count: normalize_random_count(&id, random_count),
            random_interval_ms: normalize_random_interval(&id, random_interval_ms),
            crossfade: options.crossfade.unwrap_or(false),
            crossfade_overlap_ms: options
                .crossfade_overlap
                .unwrap_or(DEFAULT_CROSSFADE_OVERLAP_MS),
            fade_in_ms: options.fade_in.and_then(fade_setting),
            fade_out_ms: options.fade_out.and_then(fade_setting),
            // Duration is unknown until the source loads; clamped on load.
            play_for_ms: options.play_for.and_then(|v| play_for_ms(v, 0)),
            skip_front_ms: options.skip_front.map_or(0, |v| skip_front_ms(v, 0)),
            pausetime_ms: options.pausetime.and_then(pausetime_setting),
            offset_ms: options.offset.unwrap_or(0),
            seed: options.seed,
            element_format: options
                .element_format
                .unwrap_or_else(|| DEFAULT_ELEMENT_FORMAT.to_string()),
            id,
        })
    }

    /// Resolve the UI element selector for a property of this channel
    pub fn element_selector(&self, name: &str) -> String {
        self.element_format
            .replace("{id}", self.id.as_str())
            .replace("{name}", name)
    }
}

pub(crate) fn normalize_random_count(id: &ChannelId, count: u32) -> u32 {
    if count == 0 {
        log::warn!("[Channel {}] randomCount must be at least 1", id);
        1
    } else {
        count
    }
}

pub(crate) fn normalize_random_interval(id: &ChannelId, interval_ms: u64) -> u64 {
    if interval_ms == 0 {
        log::warn!("[Channel {}] randomInterval must be positive", id);
        1
    } else {
        interval_ms
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_id_is_fatal() {
        let err = ChannelConfig::from_options(ChannelOptions::default()).unwrap_err();
        assert!(matches!(err, ChannelError::MissingId));

        let err = ChannelConfig::from_options(ChannelOptions::new("")).unwrap_err();
        assert!(matches!(err, ChannelError::MissingId));
    }

    #[test]
    fn test_defaults() {
        let config = ChannelConfig::from_options(ChannelOptions::new("birds")).unwrap();
        assert_eq!(config.id.as_str(), "birds");
        assert!(!config.random);
        assert_eq!(config.random_count, DEFAULT_RANDOM_COUNT);
        assert_eq!(config.random_interval_ms, DEFAULT_RANDOM_INTERVAL_MS);
        assert!(!config.crossfade);
        assert_eq!(config.fade_in_ms, None);
        assert_eq!(config.fade_out_ms, None);
        assert_eq!(config.play_for_ms, None);
        assert_eq!(config.skip_front_ms, 0);
        assert_eq!(config.pausetime_ms, None);
        assert_eq!(config.offset_ms, 0);
    }

    #[test]
    fn test_from_json_mixed_values() {
        let options = ChannelOptions::from_json(
            r#"{
                "id": "wind",
                "random": true,
                "randomCount": 0,
                "randomInterval": 4000,
                "fadeIn": 250,
                "fadeOut": false,
                "skipFront": -20,
                "playFor": true,
                "pausetime": 1500
            }"#,
        )
        .unwrap();
        let config = ChannelConfig::from_options(options).unwrap();

        assert!(config.random);
        assert_eq!(config.random_count, 1);
        assert_eq!(config.random_interval_ms, 4000);
        assert_eq!(config.fade_in_ms, Some(250));
        assert_eq!(config.fade_out_ms, None);
        assert_eq!(config.skip_front_ms, 0);
        // Full duration is unknown before load
        assert_eq!(config.play_for_ms, None);
        assert_eq!(config.pausetime_ms, Some(1500));
    }

    #[test]
    fn test_malformed_json() {
        let err = ChannelOptions::from_json("{ \"id\": ").unwrap_err();
        assert!(matches!(err, ChannelError::Options(_)));
    }

    #[test]
    fn test_trim_normalization() {
        assert_eq!(skip_front_ms(ParamValue::Millis(-5.0), 10_000), 0);
        assert_eq!(skip_front_ms(ParamValue::Millis(f64::NAN), 10_000), 0);
        assert_eq!(skip_front_ms(true.into(), 10_000), 0);
        assert_eq!(skip_front_ms(12_000u64.into(), 10_000), 10_000);
        assert_eq!(skip_front_ms(12_000u64.into(), 0), 12_000);

        assert_eq!(play_for_ms(10_500u64.into(), 10_000), Some(10_000));
        assert_eq!(play_for_ms(true.into(), 10_000), Some(10_000));
        assert_eq!(play_for_ms(false.into(), 10_000), Some(10_000));
        assert_eq!(play_for_ms(0u64.into(), 10_000), None);
        assert_eq!(play_for_ms(ParamValue::Millis(f64::NAN), 10_000), None);
    }

    #[test]
    fn test_fade_normalization() {
        assert_eq!(fade_setting(false.into()), None);
        assert_eq!(fade_setting(0u64.into()), Some(0));
        assert_eq!(fade_setting((-10i32).into()), Some(0));
        assert_eq!(fade_setting(750.0.into()), Some(750));
        assert_eq!(pausetime_setting(false.into()), None);
        assert_eq!(pausetime_setting(2000u64.into()), Some(2000));
    }

    #[test]
    fn test_element_selector() {
        let config = ChannelConfig::from_options(ChannelOptions::new("rain")).unwrap();
        assert_eq!(config.element_selector("volume"), "#channels-rain-volume");

        let mut options = ChannelOptions::new("rain");
        options.element_format = Some("[data-channel={id}] .{name}".to_string());
        let config = ChannelConfig::from_options(options).unwrap();
        assert_eq!(config.element_selector("fade"), "[data-channel=rain] .fade");
    }
}
