// sinewatch-core/src/lib.rs

//! The core logic for the Sinewatch tone tracker.
//! This crate is responsible for audio capture, the per-frame spectral
//! pipeline, multi-tone tracking and keyed-tone decoding. It is completely
//! headless and contains no GUI code.
//!
//! Frame flow: gain and window → FFT → band-pass, averaging and squelch →
//! peak extraction → track hysteresis → short/long symbol decoding.

pub mod audio;
pub mod decoder;
pub mod detector;
pub mod error;
pub mod fft;
pub mod filter;
pub mod peaks;
pub mod settings;
pub mod tracker;

/// Samples per analysis frame. Fixes the FFT size and the bin width
/// (`sample_rate / FRAME_SIZE`).
pub const FRAME_SIZE: usize = 2048;

/// Maximum number of simultaneously tracked tones.
pub const MAX_TRACKS: usize = 4;

/// Bins on either side of a peak that cannot produce another peak.
pub const SUPPRESSION_RADIUS: usize = 4;

pub use decoder::Symbol;
pub use detector::{Detector, DetectorHandle, Snapshot};
pub use error::{Error, Result};
pub use settings::Settings;
pub use tracker::{Track, TrackPhase};
