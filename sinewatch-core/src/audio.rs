//! # Audio Capture Module
//!
//! This module handles real-time audio capture using CPAL (Cross-Platform Audio Library).
//! The device stream is sliced into fixed-size frames, each stamped with the
//! capture time derived from the running sample count, and handed to the
//! analysis thread over a channel.
//!
//! ## Features
//! - Automatic input device selection
//! - Mono 32-bit float or signed 16-bit input
//! - Sample-clock timestamps, independent of callback jitter

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SupportedStreamConfigRange};
use crossbeam_channel::Sender;
use anyhow::{Context, Result, anyhow};

use crate::FRAME_SIZE;
use crate::fft::samples_from_i16;

/// Preferred capture rate in Hz.
pub const TARGET_SAMPLE_RATE: u32 = 44100;

/// One analysis frame and the time of its first sample.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
    /// Milliseconds since capture started.
    pub timestamp_ms: u64,
}

/// Accumulates arbitrarily sized device buffers into [`FRAME_SIZE`] frames.
#[derive(Debug)]
pub struct FrameAssembler {
    sample_rate: u32,
    pending: Vec<f32>,
    samples_emitted: u64,
}

impl FrameAssembler {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            pending: Vec::with_capacity(FRAME_SIZE * 2),
            samples_emitted: 0,
        }
    }

    /// Appends `data` and calls `emit` for every complete frame.
    pub fn push(&mut self, data: &[f32], mut emit: impl FnMut(AudioFrame)) {
        self.pending.extend_from_slice(data);

        while self.pending.len() >= FRAME_SIZE {
            let timestamp_ms = self.samples_emitted * 1000 / self.sample_rate as u64;
            let samples = self.pending[..FRAME_SIZE].to_vec();
            self.pending.drain(..FRAME_SIZE);
            self.samples_emitted += FRAME_SIZE as u64;
            emit(AudioFrame {
                samples,
                timestamp_ms,
            });
        }
    }
}

/// Starts audio capture from the default input device.
///
/// Frames are sent with `try_send`; when the analysis thread falls behind,
/// frames are dropped instead of blocking the device callback.
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Audio stream handle and sample rate
/// * `Err(e)` - Error if audio setup fails
pub fn start_audio_capture(sender: Sender<AudioFrame>) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    log::info!("Using audio input device: {}", device.name()?);

    let configs = device
        .supported_input_configs()
        .context("querying input configurations")?
        .collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, TARGET_SAMPLE_RATE)
        .ok_or_else(|| anyhow!("No mono f32 or i16 input format found"))?;

    let rate = TARGET_SAMPLE_RATE.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    );
    let sample_format = supported_config.sample_format();
    let config: cpal::StreamConfig = supported_config
        .with_sample_rate(cpal::SampleRate(rate))
        .into();

    log::info!("Selected {:?} input at {} Hz", sample_format, rate);

    let err_fn = |err| log::error!("An error occurred on the audio stream: {}", err);
    let mut assembler = FrameAssembler::new(rate);

    let stream = match sample_format {
        SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                assembler.push(data, |frame| {
                    let _ = sender.try_send(frame);
                });
            },
            err_fn,
            None,
        )?,
        SampleFormat::I16 => {
            let mut converted = Vec::with_capacity(FRAME_SIZE);
            device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    converted.resize(data.len(), 0.0);
                    samples_from_i16(data, &mut converted);
                    assembler.push(&converted, |frame| {
                        let _ = sender.try_send(frame);
                    });
                },
                err_fn,
                None,
            )?
        }
        other => return Err(anyhow!("Unsupported sample format {:?}", other)),
    };

    stream.play()?;

    Ok((stream, rate))
}

/// Picks a mono configuration, preferring f32 over i16 and then the
/// range closest to `target_rate`.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| {
            c.channels() == 1
                && matches!(c.sample_format(), SampleFormat::F32 | SampleFormat::I16)
        })
        .min_by_key(|c| {
            let format_rank = if c.sample_format() == SampleFormat::F32 { 0 } else { 1 };
            let rate_distance = if (c.min_sample_rate().0..=c.max_sample_rate().0).contains(&target_rate) {
                0
            } else {
                let min_diff = (c.min_sample_rate().0 as i64 - target_rate as i64).abs();
                let max_diff = (c.max_sample_rate().0 as i64 - target_rate as i64).abs();
                min_diff.min(max_diff)
            };
            (format_rank, rate_distance)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembler_emits_whole_frames_only() {
        let mut assembler = FrameAssembler::new(44100);
        let mut frames = Vec::new();
        assembler.push(&vec![0.5; FRAME_SIZE - 1], |f| frames.push(f));
        assert!(frames.is_empty());
        assembler.push(&vec![0.25; FRAME_SIZE + 10], |f| frames.push(f));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].samples.len(), FRAME_SIZE);
        assert_eq!(frames[0].samples[0], 0.5);
        assert_eq!(frames[0].samples[FRAME_SIZE - 1], 0.25);
    }

    #[test]
    fn timestamps_follow_the_sample_clock() {
        let mut assembler = FrameAssembler::new(48000);
        let mut stamps = Vec::new();
        assembler.push(&vec![0.0; FRAME_SIZE * 3], |f| stamps.push(f.timestamp_ms));
        // 2048 samples at 48 kHz is 42.67 ms.
        assert_eq!(stamps, vec![0, 42, 85]);
    }
}
