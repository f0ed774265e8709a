//! # Detector Settings
//!
//! All user-adjustable parameters of the detection pipeline live in one
//! plain `Copy` struct. The pipeline takes a copy at the start of every frame,
//! so a parameter change is picked up on the next frame boundary.
//!
//! Settings are persisted as newline-delimited `key=value` pairs. Any subset
//! of keys may be present; missing keys fall back to the defaults below.

use crate::error::{Error, Result};

/// Lowest frequency accepted for the band-pass edges.
pub const MIN_CUTOFF_HZ: f32 = 20.0;
/// Highest frequency accepted for the band-pass edges.
pub const MAX_CUTOFF_HZ: f32 = 20000.0;
/// Shortest hysteresis window accepted.
pub const MIN_PERSISTENCE_MS: u64 = 50;

pub const DEFAULT_GAIN_DB: f32 = 0.0;
pub const DEFAULT_PERSISTENCE_MS: u64 = 100;
pub const DEFAULT_SQUELCH_THRESHOLD: f32 = 0.1;

const KEY_GAIN: &str = "gain_db";
const KEY_LOW: &str = "low_cut_hz";
const KEY_HIGH: &str = "high_cut_hz";
const KEY_PERSISTENCE: &str = "persistence_ms";
const KEY_AVERAGING: &str = "averaging";
const KEY_SQUELCH: &str = "squelch";
const KEY_SQUELCH_THRESHOLD: &str = "squelch_threshold";

/// User-adjustable pipeline parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    /// Linear gain applied before windowing, in decibels.
    pub gain_db: f32,
    /// Lower band-pass edge in Hz.
    pub low_cut_hz: f32,
    /// Upper band-pass edge in Hz.
    pub high_cut_hz: f32,
    /// Hysteresis window for both track activation and release.
    pub persistence_ms: u64,
    /// Exponential smoothing of the power spectrum across frames.
    pub averaging: bool,
    /// Noise gate on the normalized magnitude.
    pub squelch: bool,
    /// Squelch level in [0, 1], relative to a full-scale windowed sine.
    pub squelch_threshold: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gain_db: DEFAULT_GAIN_DB,
            low_cut_hz: MIN_CUTOFF_HZ,
            high_cut_hz: MAX_CUTOFF_HZ,
            persistence_ms: DEFAULT_PERSISTENCE_MS,
            averaging: false,
            squelch: false,
            squelch_threshold: DEFAULT_SQUELCH_THRESHOLD,
        }
    }
}

impl Settings {
    /// Linear amplitude factor for `gain_db`.
    pub fn linear_gain(&self) -> f32 {
        10.0_f32.powf(self.gain_db / 20.0)
    }

    /// Sets the gain. Any finite value is accepted.
    pub fn set_gain_db(&mut self, gain_db: f32) -> Result<()> {
        if !gain_db.is_finite() {
            return Err(Error::InvalidGain);
        }
        self.gain_db = gain_db;
        Ok(())
    }

    /// Sets both band-pass edges.
    ///
    /// Edges are clamped to [`MIN_CUTOFF_HZ`, `MAX_CUTOFF_HZ`]; after clamping
    /// `low` must still be strictly below `high`, otherwise nothing changes.
    pub fn set_band(&mut self, low: f32, high: f32) -> Result<()> {
        if !low.is_finite() || !high.is_finite() {
            return Err(Error::InvalidBand { low, high });
        }
        let low = low.clamp(MIN_CUTOFF_HZ, MAX_CUTOFF_HZ);
        let high = high.clamp(MIN_CUTOFF_HZ, MAX_CUTOFF_HZ);
        if low >= high {
            return Err(Error::InvalidBand { low, high });
        }
        self.low_cut_hz = low;
        self.high_cut_hz = high;
        Ok(())
    }

    /// Sets the hysteresis window, clamped up to [`MIN_PERSISTENCE_MS`].
    pub fn set_persistence_ms(&mut self, persistence_ms: u64) {
        self.persistence_ms = persistence_ms.max(MIN_PERSISTENCE_MS);
    }

    /// Sets the squelch level, clamped to [0, 1]. NaN resets it to the default.
    pub fn set_squelch_threshold(&mut self, threshold: f32) {
        self.squelch_threshold = if threshold.is_nan() {
            DEFAULT_SQUELCH_THRESHOLD
        } else {
            threshold.clamp(0.0, 1.0)
        };
    }

    /// Brings a settings value assembled field by field into range.
    ///
    /// Persistence and squelch level are clamped as their setters clamp them.
    /// A non-finite gain or an empty band is rejected.
    pub fn validate(&mut self) -> Result<()> {
        if !self.gain_db.is_finite() {
            return Err(Error::InvalidGain);
        }
        self.set_band(self.low_cut_hz, self.high_cut_hz)?;
        self.set_persistence_ms(self.persistence_ms);
        self.set_squelch_threshold(self.squelch_threshold);
        Ok(())
    }

    /// Parses a `key=value` document.
    ///
    /// Blank lines and `#` comments are skipped. Unknown keys, malformed lines
    /// and out-of-range values are logged and ignored, leaving the default in
    /// place. This never fails: a damaged file degrades to defaults.
    pub fn from_kv_str(input: &str) -> Self {
        let mut settings = Settings::default();
        let mut low = settings.low_cut_hz;
        let mut high = settings.high_cut_hz;

        for (line_no, raw_line) in input.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                log::warn!("settings line {}: expected key=value, got {:?}", line_no + 1, line);
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            let applied = match key {
                KEY_GAIN => value
                    .parse::<f32>()
                    .ok()
                    .and_then(|v| settings.set_gain_db(v).ok()),
                KEY_LOW => value.parse::<f32>().ok().map(|v| low = v),
                KEY_HIGH => value.parse::<f32>().ok().map(|v| high = v),
                KEY_PERSISTENCE => value
                    .parse::<u64>()
                    .ok()
                    .map(|v| settings.set_persistence_ms(v)),
                KEY_AVERAGING => parse_bool(value).map(|v| settings.averaging = v),
                KEY_SQUELCH => parse_bool(value).map(|v| settings.squelch = v),
                KEY_SQUELCH_THRESHOLD => value
                    .parse::<f32>()
                    .ok()
                    .map(|v| settings.set_squelch_threshold(v)),
                _ => {
                    log::warn!("settings line {}: unknown key {:?}", line_no + 1, key);
                    continue;
                }
            };

            if applied.is_none() {
                log::warn!(
                    "settings line {}: invalid value {:?} for {}",
                    line_no + 1,
                    value,
                    key
                );
            }
        }

        // The band edges are validated as a pair once both are known.
        if let Err(e) = settings.set_band(low, high) {
            log::warn!("settings: {}; keeping default band", e);
        }

        settings
    }

    /// Writes every key as a `key=value` line.
    pub fn to_kv_string(&self) -> String {
        format!(
            "{KEY_GAIN}={}\n{KEY_LOW}={}\n{KEY_HIGH}={}\n{KEY_PERSISTENCE}={}\n{KEY_AVERAGING}={}\n{KEY_SQUELCH}={}\n{KEY_SQUELCH_THRESHOLD}={}\n",
            self.gain_db,
            self.low_cut_hz,
            self.high_cut_hz,
            self.persistence_ms,
            self.averaging,
            self.squelch,
            self.squelch_threshold,
        )
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}
