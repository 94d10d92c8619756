//! Momentum indicators.

use ats_core::traits::{Indicator, MultiOutputIndicator};
use serde::{Deserialize, Serialize};

use crate::moving_average::ema_series;

/// Relative Strength Index (RSI).
///
/// Uses simple (unweighted) averages of the gains and losses over the last
/// `period` day-over-day changes. When the average loss is exactly zero the
/// RSI is 100, including for a completely flat window.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
}

impl Rsi {
    /// Create a new RSI indicator.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }

    fn from_window(deltas: &[f64]) -> f64 {
        let n = deltas.len() as f64;
        let avg_gain = deltas.iter().filter(|d| **d > 0.0).sum::<f64>() / n;
        let avg_loss = deltas.iter().filter(|d| **d < 0.0).map(|d| -d).sum::<f64>() / n;

        if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
        }
    }
}

impl Indicator for Rsi {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        if data.len() <= self.period {
            return vec![];
        }

        let deltas: Vec<f64> = data.windows(2).map(|w| w[1] - w[0]).collect();

        // Each window is averaged from scratch: an all-gain window must yield exactly 100.
        deltas.windows(self.period).map(Self::from_window).collect()
    }

    fn lookback(&self) -> usize {
        self.period + 1 // Need period+1 data points
    }

    fn label(&self) -> String {
        format!("RSI({})", self.period)
    }
}

/// MACD (Moving Average Convergence Divergence) output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdOutput {
    /// MACD line (fast EMA - slow EMA)
    pub macd: f64,
    /// Signal line (EMA of MACD)
    pub signal: f64,
    /// Histogram (MACD - Signal)
    pub histogram: f64,
}

/// MACD indicator.
///
/// The fast and slow EMAs and the signal EMA are all seeded with their
/// first input point, so the output has one entry per close once the slow
/// period is reached.
#[derive(Debug, Clone)]
pub struct Macd {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
}

impl Macd {
    /// Create a new MACD with default parameters (12, 26, 9).
    pub fn new() -> Self {
        Self::with_periods(12, 26, 9)
    }

    /// Create a MACD with custom periods.
    pub fn with_periods(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(fast > 0 && slow > 0 && signal > 0);
        assert!(fast < slow, "Fast period must be less than slow period");
        Self {
            fast_period: fast,
            slow_period: slow,
            signal_period: signal,
        }
    }

    fn multiplier(period: usize) -> f64 {
        2.0 / (period as f64 + 1.0)
    }
}

impl Default for Macd {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiOutputIndicator for Macd {
    type Output = MacdOutput;

    fn calculate(&self, data: &[f64]) -> Vec<MacdOutput> {
        if data.len() < self.slow_period {
            return vec![];
        }

        let fast_ema = ema_series(data, Self::multiplier(self.fast_period));
        let slow_ema = ema_series(data, Self::multiplier(self.slow_period));

        // Both series start at the first close, so they align index by index.
        let macd_line: Vec<f64> = fast_ema
            .iter()
            .zip(slow_ema.iter())
            .map(|(f, s)| f - s)
            .collect();

        let signal_line = ema_series(&macd_line, Self::multiplier(self.signal_period));

        macd_line
            .iter()
            .zip(signal_line.iter())
            .map(|(&macd, &signal)| MacdOutput {
                macd,
                signal,
                histogram: macd - signal,
            })
            .collect()
    }

    fn lookback(&self) -> usize {
        self.slow_period
    }

    fn label(&self) -> String {
        format!(
            "MACD({},{},{})",
            self.fast_period, self.slow_period, self.signal_period
        )
    }
}
