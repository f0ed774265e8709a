//! # Frame Pipeline and Shared State
//!
//! [`Detector`] owns every stage buffer and runs one frame at a time on the
//! audio worker thread. [`DetectorHandle`] is the cloneable, lock-guarded
//! view shared with the UI thread.
//!
//! ## Locking
//! - The worker copies the settings at the start of a frame
//! - All transform, filter, peak and tracking work runs without the lock
//! - Results are published under the lock in one short critical section
//! - The UI copies a [`Snapshot`] and releases the lock before drawing

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::decoder::{Symbol, SymbolDecoder};
use crate::error::Result;
use crate::fft::SpectralTransform;
use crate::filter::SpectralFilter;
use crate::peaks::PeakExtractor;
use crate::settings::Settings;
use crate::tracker::{Track, TrackEvent, TrackManager};
use crate::{FRAME_SIZE, MAX_TRACKS, SUPPRESSION_RADIUS};

/// Number of spectrum bins exposed per frame.
pub const SPECTRUM_BINS: usize = FRAME_SIZE / 2;

/// State shared between the audio worker and the UI.
#[derive(Debug)]
struct SharedState {
    settings: Settings,
    freq_resolution: f32,
    tracks: Vec<Track>,
    magnitudes: Vec<f32>,
    decoder: SymbolDecoder,
    frames: u64,
}

/// A consistent copy of the shared state, taken once per redraw.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub settings: Settings,
    /// Bin width in Hz; zero until a detector is attached.
    pub freq_resolution: f32,
    pub tracks: Vec<Track>,
    /// Normalized magnitudes in [0, 1], one per bin.
    pub magnitudes: Vec<f32>,
    /// Decoded symbols, oldest first.
    pub symbols: Vec<Symbol>,
    pub dot_ms: f32,
    /// Frames processed since start.
    pub frames: u64,
}

impl Snapshot {
    pub fn active_tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter().filter(|t| t.is_active())
    }

    pub fn transcript(&self) -> String {
        self.symbols.iter().map(|s| s.as_char()).collect()
    }
}

/// Cloneable handle to the detector's shared state.
#[derive(Debug, Clone)]
pub struct DetectorHandle {
    shared: Arc<Mutex<SharedState>>,
}

impl Default for DetectorHandle {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl DetectorHandle {
    /// Creates the shared state. Settings that fail validation are replaced
    /// by the defaults.
    pub fn new(mut settings: Settings) -> Self {
        if let Err(e) = settings.validate() {
            log::warn!("Initial settings rejected ({}); using defaults", e);
            settings = Settings::default();
        }
        Self {
            shared: Arc::new(Mutex::new(SharedState {
                settings,
                freq_resolution: 0.0,
                tracks: vec![Track::default(); MAX_TRACKS],
                magnitudes: vec![0.0; SPECTRUM_BINS],
                decoder: SymbolDecoder::new(),
                frames: 0,
            })),
        }
    }

    // The state is plain data, so a panic elsewhere never leaves it unusable.
    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copies tracks, magnitudes, symbols and settings under the lock.
    pub fn snapshot(&self) -> Snapshot {
        let state = self.lock();
        Snapshot {
            settings: state.settings,
            freq_resolution: state.freq_resolution,
            tracks: state.tracks.clone(),
            magnitudes: state.magnitudes.clone(),
            symbols: state.decoder.symbols().iter().copied().collect(),
            dot_ms: state.decoder.dot_ms(),
            frames: state.frames,
        }
    }

    pub fn settings(&self) -> Settings {
        self.lock().settings
    }

    /// Installs a complete settings value after validating it.
    pub fn replace_settings(&self, mut settings: Settings) -> Result<()> {
        settings.validate()?;
        self.lock().settings = settings;
        Ok(())
    }

    /// Runs `f` on a copy of the live settings and installs the result if it
    /// validates. On error the live settings are left unchanged.
    pub fn update_settings<R>(&self, f: impl FnOnce(&mut Settings) -> R) -> Result<R> {
        let mut state = self.lock();
        let mut next = state.settings;
        let out = f(&mut next);
        next.validate()?;
        state.settings = next;
        Ok(out)
    }

    // The per-field setters keep their own invariants.
    fn with_settings<R>(&self, f: impl FnOnce(&mut Settings) -> R) -> R {
        f(&mut self.lock().settings)
    }

    pub fn set_gain_db(&self, gain_db: f32) -> Result<()> {
        self.with_settings(|s| s.set_gain_db(gain_db))
    }

    pub fn set_band(&self, low_hz: f32, high_hz: f32) -> Result<()> {
        self.with_settings(|s| s.set_band(low_hz, high_hz))
    }

    pub fn set_persistence_ms(&self, persistence_ms: u64) {
        self.with_settings(|s| s.set_persistence_ms(persistence_ms))
    }

    pub fn set_averaging(&self, enabled: bool) {
        self.with_settings(|s| s.averaging = enabled)
    }

    pub fn set_squelch(&self, enabled: bool) {
        self.with_settings(|s| s.squelch = enabled)
    }

    pub fn set_squelch_threshold(&self, threshold: f32) {
        self.with_settings(|s| s.set_squelch_threshold(threshold))
    }
}

/// The per-frame analysis pipeline.
pub struct Detector {
    handle: DetectorHandle,
    transform: SpectralTransform,
    filter: SpectralFilter,
    peaks: PeakExtractor,
    tracker: TrackManager,
    released: Vec<u64>,
}

impl Detector {
    /// Builds the pipeline for [`FRAME_SIZE`]-sample frames at `sample_rate`
    /// and attaches it to `handle`.
    pub fn new(sample_rate: u32, handle: DetectorHandle) -> Result<Self> {
        let transform = SpectralTransform::new(FRAME_SIZE, sample_rate)?;
        let freq_resolution = transform.freq_resolution();
        let max_power = (FRAME_SIZE as f32 / 4.0).powi(2);

        log::info!(
            "Detector ready: {} Hz, {} samples per frame, {:.2} Hz per bin",
            sample_rate,
            FRAME_SIZE,
            freq_resolution
        );
        handle.lock().freq_resolution = freq_resolution;

        Ok(Self {
            handle,
            transform,
            filter: SpectralFilter::new(SPECTRUM_BINS, freq_resolution, max_power),
            peaks: PeakExtractor::new(SPECTRUM_BINS, MAX_TRACKS, SUPPRESSION_RADIUS),
            tracker: TrackManager::new(MAX_TRACKS),
            released: Vec::with_capacity(MAX_TRACKS),
        })
    }

    pub fn freq_resolution(&self) -> f32 {
        self.transform.freq_resolution()
    }

    /// Processes one frame captured at `timestamp_ms`.
    ///
    /// Fails when `samples` is not exactly [`FRAME_SIZE`] long or the FFT
    /// rejects its buffers; nothing is published then. A silent or corrupt
    /// frame is not an error; it simply matches no tracks.
    pub fn process_frame(&mut self, samples: &[f32], timestamp_ms: u64) -> Result<()> {
        let settings = self.handle.settings();
        let freq_resolution = self.transform.freq_resolution();

        let power = self.transform.process(samples, settings.linear_gain())?;
        self.filter.process(power, &settings);

        let peaks = self.peaks.extract(
            self.filter.power(),
            self.filter.total_power(),
            freq_resolution,
            settings.low_cut_hz,
            settings.high_cut_hz,
        );

        self.released.clear();
        let released = &mut self.released;
        self.tracker
            .update(peaks, timestamp_ms, settings.persistence_ms, |event| match event {
                TrackEvent::Activated { slot, frequency } => {
                    log::debug!("track {} active at {:.1} Hz", slot, frequency);
                }
                TrackEvent::Released {
                    slot,
                    frequency,
                    duration_ms,
                } => {
                    log::debug!(
                        "track {} released at {:.1} Hz after {} ms",
                        slot,
                        frequency,
                        duration_ms
                    );
                    released.push(duration_ms);
                }
            });

        let mut state = self.handle.lock();
        state.tracks.copy_from_slice(self.tracker.tracks());
        state.magnitudes.copy_from_slice(self.filter.magnitudes());
        for &duration_ms in &self.released {
            let symbol = state.decoder.push_tone(duration_ms);
            log::debug!(
                "symbol {} from {} ms tone, dot now {:.1} ms",
                symbol,
                duration_ms,
                state.decoder.dot_ms()
            );
        }
        state.frames += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn handle_starts_empty() {
        let snap = DetectorHandle::default().snapshot();
        assert_eq!(snap.tracks.len(), MAX_TRACKS);
        assert_eq!(snap.magnitudes.len(), SPECTRUM_BINS);
        assert!(snap.symbols.is_empty());
        assert_eq!(snap.freq_resolution, 0.0);
        assert_eq!(snap.frames, 0);
    }

    #[test]
    fn attaching_detector_publishes_resolution() {
        let handle = DetectorHandle::default();
        let detector = Detector::new(44100, handle.clone()).unwrap();
        let snap = handle.snapshot();
        assert_eq!(snap.freq_resolution, detector.freq_resolution());
        assert!((snap.freq_resolution - 21.533).abs() < 1e-3);
    }

    #[test]
    fn setters_go_through_validation() {
        let handle = DetectorHandle::default();
        assert!(handle.set_band(500.0, 400.0).is_err());
        handle.set_band(400.0, 900.0).unwrap();
        handle.set_persistence_ms(1);
        handle.set_squelch(true);
        handle.set_squelch_threshold(4.0);
        handle.set_averaging(true);
        handle.set_gain_db(-3.0).unwrap();
        let s = handle.settings();
        assert_eq!((s.low_cut_hz, s.high_cut_hz), (400.0, 900.0));
        assert_eq!(s.persistence_ms, crate::settings::MIN_PERSISTENCE_MS);
        assert!(s.squelch && s.averaging);
        assert_eq!(s.squelch_threshold, 1.0);
        assert_eq!(s.gain_db, -3.0);
    }

    #[test]
    fn bulk_updates_are_validated() {
        let handle = DetectorHandle::default();
        handle.update_settings(|s| s.squelch_threshold = 3.0).unwrap();
        assert_eq!(handle.settings().squelch_threshold, 1.0);

        let before = handle.settings();
        let err = handle
            .update_settings(|s| {
                s.low_cut_hz = 3000.0;
                s.high_cut_hz = 500.0;
            })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidBand { .. }));
        assert_eq!(handle.settings(), before);

        let wild = Settings {
            gain_db: f32::INFINITY,
            ..Settings::default()
        };
        assert_eq!(handle.replace_settings(wild), Err(Error::InvalidGain));
        assert_eq!(handle.settings(), before);

        let inverted = Settings {
            low_cut_hz: 3000.0,
            high_cut_hz: 500.0,
            ..Settings::default()
        };
        assert_eq!(DetectorHandle::new(inverted).settings(), Settings::default());
    }

    #[test]
    fn wrong_frame_length_is_rejected_without_side_effects() {
        let handle = DetectorHandle::default();
        let mut detector = Detector::new(44100, handle.clone()).unwrap();
        assert!(detector.process_frame(&[0.0; 100], 0).is_err());
        assert_eq!(handle.snapshot().frames, 0);
    }

    #[test]
    fn silence_produces_no_tracks() {
        let handle = DetectorHandle::default();
        let mut detector = Detector::new(44100, handle.clone()).unwrap();
        for i in 0..10 {
            detector.process_frame(&[0.0; FRAME_SIZE], i * 46).unwrap();
        }
        let snap = handle.snapshot();
        assert_eq!(snap.frames, 10);
        assert!(snap.tracks.iter().all(Track::is_empty));
        assert!(snap.magnitudes.iter().all(|&m| m == 0.0));
    }
}
