//! Indicator traits over closing-price histories.

/// A single-series indicator.
///
/// Input closes are ordered oldest to newest. The output series is aligned
/// to the end of the input: its last element is the value as of the last
/// close. An input shorter than [`Indicator::lookback`] yields nothing.
pub trait Indicator: Send + Sync {
    type Output;

    /// Derived series for `closes`.
    fn calculate(&self, closes: &[f64]) -> Vec<Self::Output>;

    /// Closes needed before the first value is defined.
    fn lookback(&self) -> usize;

    /// Short display label, e.g. `SMA(20)`.
    fn label(&self) -> String;

    /// The value as of the last close.
    fn latest(&self, closes: &[f64]) -> Option<Self::Output> {
        if closes.len() < self.lookback() {
            return None;
        }
        self.calculate(closes).pop()
    }
}

/// An indicator producing several lines per point, such as MACD and its
/// signal.
pub trait MultiOutputIndicator: Send + Sync {
    type Output;

    fn calculate(&self, closes: &[f64]) -> Vec<Self::Output>;

    fn lookback(&self) -> usize;

    fn label(&self) -> String;
}
