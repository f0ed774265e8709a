//! # Windowing and Spectral Transform
//!
//! Turns one frame of time-domain samples into a per-bin power spectrum.
//!
//! ## Stages
//! - Gain and Hann windowing into a preallocated buffer
//! - Real-to-complex FFT via RealFFT (planned once, fixed size)
//! - Power (`re² + im²`) for the lower `N/2` bins
//!
//! Every buffer is sized at construction; [`SpectralTransform::process`]
//! does not allocate.

use std::sync::Arc;

use realfft::{RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;

use crate::error::{Error, Result};

/// Normalization factor for signed 16-bit capture.
pub const I16_FULL_SCALE: f32 = 32768.0;

/// Builds the symmetric Hann window of length `n`.
///
/// `w[i] = 0.5 * (1 - cos(2πi / (n - 1)))`
pub fn hann_window(n: usize) -> Vec<f32> {
    if n < 2 {
        return vec![1.0; n];
    }
    let n_minus_1 = (n - 1) as f32;
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / n_minus_1).cos()))
        .collect()
}

/// Converts signed 16-bit samples into the `[-1, 1]` amplitude domain.
pub fn samples_from_i16(input: &[i16], output: &mut [f32]) {
    for (out, &s) in output.iter_mut().zip(input) {
        *out = s as f32 / I16_FULL_SCALE;
    }
}

/// Applies `gain` and the analysis window, writing into `out`.
///
/// No clamping: a boosted frame may exceed full scale.
pub fn apply_gain_and_window(samples: &[f32], window: &[f32], gain: f32, out: &mut [f32]) {
    for ((o, &s), &w) in out.iter_mut().zip(samples).zip(window) {
        *o = s * gain * w;
    }
}

/// Fixed-size real FFT with its window and working buffers.
pub struct SpectralTransform {
    frame_size: usize,
    freq_resolution: f32,
    window: Vec<f32>,
    fft: Arc<dyn RealToComplex<f32>>,
    input: Vec<f32>,
    output: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    power: Vec<f32>,
}

impl SpectralTransform {
    /// Plans the transform for `frame_size` samples at `sample_rate`.
    pub fn new(frame_size: usize, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(Error::InvalidSampleRate(sample_rate));
        }
        if frame_size < 4 || frame_size % 2 != 0 {
            return Err(Error::FrameSize {
                expected: frame_size.max(4).next_multiple_of(2),
                actual: frame_size,
            });
        }

        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(frame_size);
        let input = fft.make_input_vec();
        let output = fft.make_output_vec();
        let scratch = fft.make_scratch_vec();

        Ok(Self {
            frame_size,
            freq_resolution: sample_rate as f32 / frame_size as f32,
            window: hann_window(frame_size),
            fft,
            input,
            output,
            scratch,
            power: vec![0.0; frame_size / 2],
        })
    }

    /// Width of one bin in Hz (`sample_rate / N`).
    pub fn freq_resolution(&self) -> f32 {
        self.freq_resolution
    }

    /// Windows `samples` with `gain` applied and returns the `N/2` bin powers.
    pub fn process(&mut self, samples: &[f32], gain: f32) -> Result<&[f32]> {
        if samples.len() != self.frame_size {
            return Err(Error::FrameSize {
                expected: self.frame_size,
                actual: samples.len(),
            });
        }

        apply_gain_and_window(samples, &self.window, gain, &mut self.input);

        self.fft
            .process_with_scratch(&mut self.input, &mut self.output, &mut self.scratch)
            .map_err(|e| Error::Transform(e.to_string()))?;

        for (p, c) in self.power.iter_mut().zip(&self.output) {
            *p = c.norm_sqr();
        }
        Ok(&self.power)
    }
}
