//! Indicator set computation for one instrument as of one date.

use ats_core::error::IndicatorError;
use ats_core::traits::{Indicator, MultiOutputIndicator};
use ats_core::types::{CrossType, IndicatorSet};
use num_traits::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::momentum::{Macd, Rsi};
use crate::moving_average::{Ema, Sma};

/// Minimum number of closes at or before the target date.
pub const MIN_HISTORY: usize = 30;

/// Wilder's overbought level for RSI(14). A Golden cross is only
/// recommended while momentum is still below it.
const OVERBOUGHT_RSI: f64 = 70.0;

/// Computes the fixed indicator set from an ordered closing-price history.
///
/// A call either returns a fully populated set or an error; nothing is
/// partially computed. Values are rounded to two decimals, half away from
/// zero.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    sma20: Sma,
    sma50: Sma,
    ema9: Ema,
    ema12: Ema,
    ema26: Ema,
    rsi14: Rsi,
    macd: Macd,
    min_history: usize,
}

impl IndicatorEngine {
    /// Create an engine with the standard periods.
    pub fn new() -> Self {
        Self::with_min_history(MIN_HISTORY)
    }

    /// Create an engine with a custom look-back minimum.
    pub fn with_min_history(min_history: usize) -> Self {
        Self {
            sma20: Sma::new(20),
            sma50: Sma::new(50),
            ema9: Ema::new(9),
            ema12: Ema::new(12),
            ema26: Ema::new(26),
            rsi14: Rsi::new(14),
            macd: Macd::new(),
            min_history,
        }
    }

    /// Compute the indicator set.
    ///
    /// # Arguments
    /// * `closes` - Closing prices ordered oldest to newest, ending at the target date
    pub fn compute(&self, closes: &[f64]) -> Result<IndicatorSet, IndicatorError> {
        if closes.len() < self.min_history {
            return Err(IndicatorError::InsufficientData {
                required: self.min_history,
                available: closes.len(),
            });
        }
        if let Some(bad) = closes.iter().find(|c| !c.is_finite()) {
            return Err(IndicatorError::CalculationError(format!(
                "non-finite close {}",
                bad
            )));
        }

        let rsi = self.rsi14.latest(closes);

        let macd_series = self.macd.calculate(closes);
        let (macd, macd_signal, cross_type) = match macd_series.as_slice() {
            [.., prev, curr] => (
                Some(curr.macd),
                Some(curr.signal),
                CrossType::classify(prev.macd, prev.signal, curr.macd, curr.signal),
            ),
            _ => (None, None, CrossType::None),
        };

        let recommend = is_recommended(cross_type, rsi);

        Ok(IndicatorSet {
            sma20: round2(self.sma20.latest(closes))?,
            sma50: round2(self.sma50.latest(closes))?,
            ema9: round2(self.ema9.latest(closes))?,
            ema12: round2(self.ema12.latest(closes))?,
            ema26: round2(self.ema26.latest(closes))?,
            rsi14: round2(rsi)?,
            macd: round2(macd)?,
            macd_signal: round2(macd_signal)?,
            cross_type,
            recommend,
        })
    }
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Buy recommendation: a Golden cross that is not yet overbought. Without
/// an RSI there is no recommendation.
fn is_recommended(cross_type: CrossType, rsi: Option<f64>) -> bool {
    cross_type == CrossType::Golden && rsi.is_some_and(|value| value < OVERBOUGHT_RSI)
}

/// Round to two fractional digits, half away from zero.
fn round2(value: Option<f64>) -> Result<Option<Decimal>, IndicatorError> {
    value
        .map(|v| {
            Decimal::from_f64(v)
                .map(|d| d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
                .ok_or_else(|| IndicatorError::CalculationError(format!("cannot represent {}", v)))
        })
        .transpose()
}
