//! # Spectral Filter Stage
//!
//! Band-pass masking, optional exponential smoothing across frames and an
//! optional squelch on the normalized magnitude. The smoothed spectrum is the
//! only state carried from one frame to the next.
//!
//! A frame holding any non-finite power (a NaN sample from the device, or a
//! gain large enough to overflow) is filtered as silence, so it never reaches
//! the smoothed state.

use crate::settings::Settings;

/// Weight of the newest frame when averaging is enabled.
pub const SMOOTHING_ALPHA: f32 = 0.1;

/// Converts a frequency to the nearest bin index, clamped to `0..bins`.
pub fn hz_to_bin(freq_hz: f32, freq_resolution: f32, bins: usize) -> usize {
    if bins == 0 || !(freq_resolution > 0.0) || !freq_hz.is_finite() || freq_hz <= 0.0 {
        return 0;
    }
    ((freq_hz / freq_resolution).round() as usize).min(bins - 1)
}

/// Owns the per-bin buffers of the filter stage.
pub struct SpectralFilter {
    freq_resolution: f32,
    max_power: f32,
    smoothed: Vec<f32>,
    power: Vec<f32>,
    magnitudes: Vec<f32>,
    total_power: f32,
}

impl SpectralFilter {
    /// Creates the stage for `bins` bins of width `freq_resolution`.
    ///
    /// `max_power` is the power of a full-scale windowed sine, `(N/4)²` for a
    /// Hann-windowed frame of N samples.
    pub fn new(bins: usize, freq_resolution: f32, max_power: f32) -> Self {
        Self {
            freq_resolution,
            max_power,
            smoothed: vec![0.0; bins],
            power: vec![0.0; bins],
            magnitudes: vec![0.0; bins],
            total_power: 0.0,
        }
    }

    /// Filters one frame of raw bin powers.
    pub fn process(&mut self, raw: &[f32], settings: &Settings) {
        let mut total = 0.0;
        let squelch = settings.squelch.then_some(settings.squelch_threshold);

        let corrupt = raw.iter().any(|p| !p.is_finite());
        if corrupt {
            log::warn!("Dropping frame with non-finite spectrum power");
        }

        let iter = raw
            .iter()
            .zip(self.smoothed.iter_mut())
            .zip(self.power.iter_mut())
            .zip(self.magnitudes.iter_mut())
            .enumerate();

        for (i, (((&raw_power, smoothed), power), magnitude)) in iter {
            let freq = i as f32 * self.freq_resolution;
            let in_band = freq >= settings.low_cut_hz && freq <= settings.high_cut_hz;
            let masked = if in_band && !corrupt { raw_power } else { 0.0 };

            *smoothed = if settings.averaging {
                SMOOTHING_ALPHA * masked + (1.0 - SMOOTHING_ALPHA) * *smoothed
            } else {
                masked
            };
            if !smoothed.is_finite() {
                *smoothed = 0.0;
            }

            let mut p = *smoothed;
            let mut m = if self.max_power > 0.0 {
                (p / self.max_power).min(1.0)
            } else {
                0.0
            };
            if let Some(threshold) = squelch {
                if m <= threshold {
                    m = 0.0;
                    p = 0.0;
                }
            }

            *power = p;
            *magnitude = m;
            total += p;
        }

        self.total_power = total;
    }

    /// Power used for detection.
    pub fn power(&self) -> &[f32] {
        &self.power
    }

    /// Normalized magnitudes in [0, 1], for display.
    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }

    /// Sum of detection power over all bins.
    pub fn total_power(&self) -> f32 {
        self.total_power
    }
}
