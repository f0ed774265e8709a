//! # Tone-Duration Decoder
//!
//! Classifies finished keyed tones as short or long symbols against an
//! adaptively estimated unit ("dot") duration.
//!
//! ## Rules
//! - `duration < 2 × dot` is a short symbol, anything longer is a long one
//! - The dot estimate follows an exponential moving average (α = 0.2); a long
//!   symbol counts as three units
//! - The symbol buffer holds [`SYMBOL_CAPACITY`] entries and evicts the oldest
//!   symbol when full

use std::collections::VecDeque;
use std::fmt;

/// Initial unit duration in milliseconds.
pub const INITIAL_DOT_MS: f32 = 120.0;
/// EMA weight of a newly observed tone.
pub const DOT_EMA_ALPHA: f32 = 0.2;
/// Number of symbols retained.
pub const SYMBOL_CAPACITY: usize = 128;

/// One decoded keyed-tone symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Short,
    Long,
}

impl Symbol {
    pub fn as_char(self) -> char {
        match self {
            Symbol::Short => '.',
            Symbol::Long => '-',
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Bounded symbol log plus the running unit-duration estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolDecoder {
    dot_ms: f32,
    symbols: VecDeque<Symbol>,
}

impl Default for SymbolDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolDecoder {
    pub fn new() -> Self {
        Self {
            dot_ms: INITIAL_DOT_MS,
            symbols: VecDeque::with_capacity(SYMBOL_CAPACITY),
        }
    }

    /// Current unit-duration estimate in milliseconds.
    pub fn dot_ms(&self) -> f32 {
        self.dot_ms
    }

    pub fn symbols(&self) -> &VecDeque<Symbol> {
        &self.symbols
    }

    /// Classifies a finished tone of `duration_ms`, records it and updates
    /// the dot estimate.
    pub fn push_tone(&mut self, duration_ms: u64) -> Symbol {
        let duration = duration_ms as f32;
        let (symbol, unit_sample) = if duration < 2.0 * self.dot_ms {
            (Symbol::Short, duration)
        } else {
            (Symbol::Long, duration / 3.0)
        };
        self.dot_ms = (1.0 - DOT_EMA_ALPHA) * self.dot_ms + DOT_EMA_ALPHA * unit_sample;

        if self.symbols.len() == SYMBOL_CAPACITY {
            self.symbols.pop_front();
        }
        self.symbols.push_back(symbol);
        symbol
    }
}
