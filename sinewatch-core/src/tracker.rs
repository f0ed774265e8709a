//! # Track Manager
//!
//! Keeps up to K persistent tone hypotheses and applies the same hysteresis
//! window to activation and release.
//!
//! ## Per-frame update
//! 1. **Matching**: each qualifying peak updates the first non-empty track
//!    within [`FREQUENCY_TOLERANCE`], or claims the first empty slot as pending
//! 2. **Activation**: a pending track matched this frame goes active once it
//!    has been pending for the persistence window
//! 3. **Release**: an active track unmatched for the persistence window emits
//!    its on-duration and is emptied; an unmatched pending track is emptied
//!    silently

use crate::peaks::Peak;

/// Maximum distance between a peak and a track for them to match.
pub const FREQUENCY_TOLERANCE: f32 = 5.0;
/// Weight kept from the previous frequency when a track is matched.
pub const FREQUENCY_SMOOTHING: f32 = 0.9;

/// Lifecycle of a track slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackPhase {
    #[default]
    Empty,
    /// Accumulating matches toward activation.
    Pending { since: u64 },
    /// Confirmed tone, on since `tone_start`.
    Active { tone_start: u64 },
}

/// One tone hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Track {
    pub phase: TrackPhase,
    /// Smoothed frequency in Hz.
    pub frequency: f32,
    /// Purity of the latest matched peak, as a percentage.
    pub purity: f32,
    pub last_seen: u64,
}

impl Track {
    pub fn is_empty(&self) -> bool {
        self.phase == TrackPhase::Empty
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, TrackPhase::Active { .. })
    }

    fn reset(&mut self) {
        *self = Track::default();
    }
}

/// Something reported by a frame update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackEvent {
    Activated { slot: usize, frequency: f32 },
    /// A tone ended after being on for `duration_ms`.
    Released { slot: usize, frequency: f32, duration_ms: u64 },
}

/// Fixed-capacity set of track slots.
#[derive(Debug, Clone)]
pub struct TrackManager {
    tracks: Vec<Track>,
    matched: Vec<bool>,
}

impl TrackManager {
    pub fn new(max_tracks: usize) -> Self {
        Self {
            tracks: vec![Track::default(); max_tracks],
            matched: vec![false; max_tracks],
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Applies one frame of qualifying peaks at time `now` (ms).
    ///
    /// `on_event` is called for every activation and release, in slot order.
    pub fn update<F>(&mut self, peaks: &[Peak], now: u64, persistence_ms: u64, mut on_event: F)
    where
        F: FnMut(TrackEvent),
    {
        self.matched.fill(false);

        for peak in peaks {
            let existing = self.tracks.iter().position(|t| {
                !t.is_empty() && (t.frequency - peak.frequency).abs() <= FREQUENCY_TOLERANCE
            });

            match existing {
                Some(slot) => {
                    let track = &mut self.tracks[slot];
                    track.frequency = FREQUENCY_SMOOTHING * track.frequency
                        + (1.0 - FREQUENCY_SMOOTHING) * peak.frequency;
                    track.purity = peak.purity * 100.0;
                    track.last_seen = now;
                    self.matched[slot] = true;
                }
                None => {
                    // With every slot busy the peak is dropped for this frame.
                    if let Some(slot) = self.tracks.iter().position(Track::is_empty) {
                        self.tracks[slot] = Track {
                            phase: TrackPhase::Pending { since: now },
                            frequency: peak.frequency,
                            purity: peak.purity * 100.0,
                            last_seen: now,
                        };
                        self.matched[slot] = true;
                    }
                }
            }
        }

        for (slot, track) in self.tracks.iter_mut().enumerate() {
            let unseen_for = now.saturating_sub(track.last_seen);
            match track.phase {
                TrackPhase::Empty => {}
                TrackPhase::Pending { since } => {
                    if self.matched[slot] && now.saturating_sub(since) >= persistence_ms {
                        track.phase = TrackPhase::Active { tone_start: now };
                        on_event(TrackEvent::Activated {
                            slot,
                            frequency: track.frequency,
                        });
                    } else if unseen_for >= persistence_ms {
                        track.reset();
                    }
                }
                TrackPhase::Active { tone_start } => {
                    if unseen_for >= persistence_ms {
                        let event = TrackEvent::Released {
                            slot,
                            frequency: track.frequency,
                            duration_ms: track.last_seen.saturating_sub(tone_start),
                        };
                        track.reset();
                        on_event(event);
                    }
                }
            }
        }
    }
}
