//! Moving average indicators.

use ats_core::traits::Indicator;

/// Simple Moving Average (SMA).
///
/// Calculates the arithmetic mean of the last N values.
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
}

impl Sma {
    /// Create a new SMA with the specified period.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }
}

impl Indicator for Sma {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        if data.len() < self.period {
            return vec![];
        }

        let period_f64 = self.period as f64;

        // Each window is summed on its own so a constant series averages
        // back to exactly that constant.
        data.windows(self.period)
            .map(|window| window.iter().sum::<f64>() / period_f64)
            .collect()
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn label(&self) -> String {
        format!("SMA({})", self.period)
    }
}

/// Exponential Moving Average (EMA).
///
/// `ema[i] = close[i] * a + ema[i-1] * (1 - a)` with `a = 2 / (n + 1)`.
/// The recurrence is seeded with the first point of the supplied history,
/// not an initial SMA, and runs across the whole history.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    multiplier: f64,
}

impl Ema {
    /// Create a new EMA with the specified period.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        let multiplier = 2.0 / (period as f64 + 1.0);
        Self { period, multiplier }
    }
}

impl Indicator for Ema {
    type Output = f64;

    /// One value per input point; empty below `period` points.
    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        if data.len() < self.period {
            return vec![];
        }
        ema_series(data, self.multiplier)
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn label(&self) -> String {
        format!("EMA({})", self.period)
    }
}

/// First-point-seeded EMA over the whole input, one output per point.
pub(crate) fn ema_series(data: &[f64], multiplier: f64) -> Vec<f64> {
    let Some(&first) = data.first() else {
        return vec![];
    };

    let mut result = Vec::with_capacity(data.len());
    let mut ema = first;
    result.push(ema);

    // Incremental form keeps a constant input exactly constant.
    for &price in &data[1..] {
        ema += multiplier * (price - ema);
        result.push(ema);
    }

    result
}
