use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("Frame has {actual} samples, expected {expected}")]
    FrameSize { expected: usize, actual: usize },

    #[error("Invalid sample rate: {0} Hz")]
    InvalidSampleRate(u32),

    #[error("Invalid band-pass range: low {low} Hz must be below high {high} Hz")]
    InvalidBand { low: f32, high: f32 },

    #[error("Gain must be a finite number of decibels")]
    InvalidGain,

    #[error("FFT failed: {0}")]
    Transform(String),
}

pub type Result<T> = std::result::Result<T, Error>;
