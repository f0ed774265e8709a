//! # Peak Extraction
//!
//! Finds up to K non-overlapping local maxima in the filtered power spectrum
//! and scores each one by its purity, the share of power concentrated in the
//! ±1 bin neighbourhood of the peak.
//!
//! ## Algorithm
//! 1. Pick the strongest unused bin that is a local maximum
//!    (strictly above its left neighbour, not below its right one)
//! 2. Mark every bin within ±R as used so one tone's skirt cannot
//!    produce a second peak
//! 3. Repeat until K peaks are found or no candidate is left
//!
//! Purity is measured against the total power minus the neighbourhoods of
//! the *other* recorded peaks, so two clean tones each score close to 1.

/// Minimum purity for a peak to be handed to the tracker.
pub const DETECT_THRESHOLD: f32 = 0.7;

/// A spectral peak found in a single frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub bin: usize,
    pub frequency: f32,
    /// Fraction of reference power in the ±1 bin neighbourhood, in [0, 1].
    pub purity: f32,
}

/// Reusable peak finder for a fixed number of bins.
pub struct PeakExtractor {
    max_peaks: usize,
    radius: usize,
    used: Vec<bool>,
    found: Vec<Peak>,
    qualified: Vec<Peak>,
}

impl PeakExtractor {
    pub fn new(bins: usize, max_peaks: usize, radius: usize) -> Self {
        Self {
            max_peaks,
            radius,
            used: vec![false; bins],
            found: Vec::with_capacity(max_peaks),
            qualified: Vec::with_capacity(max_peaks),
        }
    }

    /// Extracts peaks from `power` and returns those that qualify for tracking.
    ///
    /// A peak qualifies when its purity exceeds [`DETECT_THRESHOLD`] and its
    /// frequency lies within `[low_hz, high_hz]`.
    pub fn extract(
        &mut self,
        power: &[f32],
        total_power: f32,
        freq_resolution: f32,
        low_hz: f32,
        high_hz: f32,
    ) -> &[Peak] {
        self.found.clear();
        self.qualified.clear();

        let bins = power.len().min(self.used.len());
        if bins < 3 || !(total_power > 0.0) {
            return &self.qualified;
        }
        self.used[..bins].fill(false);

        for _ in 0..self.max_peaks {
            let Some(bin) = self.strongest_local_max(&power[..bins]) else {
                break;
            };
            let start = bin.saturating_sub(self.radius);
            let end = (bin + self.radius).min(bins - 1);
            self.used[start..=end].fill(true);
            self.found.push(Peak {
                bin,
                frequency: bin as f32 * freq_resolution,
                purity: 0.0,
            });
        }

        let claimed: f32 = self.found.iter().map(|p| neighbourhood(power, p.bin)).sum();

        for peak in self.found.iter_mut() {
            let local = neighbourhood(power, peak.bin);
            let reference = total_power - (claimed - local);
            peak.purity = if reference > 0.0 {
                (local / reference).clamp(0.0, 1.0)
            } else {
                0.0
            };

            if peak.purity > DETECT_THRESHOLD
                && peak.frequency >= low_hz
                && peak.frequency <= high_hz
            {
                self.qualified.push(*peak);
            }
        }

        &self.qualified
    }

    /// All peaks recorded by the last call to [`extract`](Self::extract),
    /// qualifying or not.
    pub fn all_peaks(&self) -> &[Peak] {
        &self.found
    }

    fn strongest_local_max(&self, power: &[f32]) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for i in 1..power.len() - 1 {
            if self.used[i] {
                continue;
            }
            let p = power[i];
            if p > power[i - 1] && p >= power[i + 1] && best.is_none_or(|(_, b)| p > b) {
                best = Some((i, p));
            }
        }
        best.map(|(i, _)| i)
    }
}

/// Power in bins `bin-1..=bin+1`.
fn neighbourhood(power: &[f32], bin: usize) -> f32 {
    let start = bin.saturating_sub(1);
    let end = (bin + 1).min(power.len() - 1);
    power[start..=end].iter().sum()
}
