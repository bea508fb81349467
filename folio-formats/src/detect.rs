//! Confidence scoring for format sniffing
//!
//! A sniffer adds up independent structural signals. The sum is capped at 1.0, and a sniffer
//! where no signal fired abstains (`None`) rather than reporting zero.

use serde::Serialize;
use std::fmt;

/// A confidence in `(0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct Confidence(f64);

impl Confidence {
    pub const CERTAIN: Confidence = Confidence(1.0);

    /// Clamp a raw score. Zero, negative and NaN scores are not confidences.
    pub fn new(score: f64) -> Option<Confidence> {
        if score.is_nan() || score <= 0.0 {
            None
        } else {
            Some(Confidence(score.min(1.0)))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Sniffer signature. Pure so detection can run against many inputs at once.
pub type DetectFn = fn(&str) -> Option<Confidence>;

/// Weighted-signal accumulator
#[derive(Debug, Default, Clone, Copy)]
pub struct Signals {
    score: f64,
}

impl Signals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, fired: bool, weight: f64) -> &mut Self {
        if fired {
            self.score += weight;
        }
        self
    }

    pub fn finish(&self) -> Option<Confidence> {
        Confidence::new(self.score)
    }
}

/// A detection outcome: which format, how sure
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub format_id: String,
    pub confidence: Confidence,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn no_signal_abstains() {
        let mut signals = Signals::new();
        signals.add(false, 0.5);
        assert_eq!(signals.finish(), None);
    }

    #[test]
    fn sum_is_capped() {
        let mut signals = Signals::new();
        signals.add(true, 0.5).add(true, 0.3).add(true, 0.2).add(true, 0.1);
        assert_eq!(signals.finish(), Some(Confidence::CERTAIN));
    }

    proptest! {
        #[test]
        fn confidence_always_in_unit_interval(score in proptest::num::f64::ANY) {
            if let Some(confidence) = Confidence::new(score) {
                prop_assert!(confidence.value() > 0.0);
                prop_assert!(confidence.value() <= 1.0);
            }
        }
    }
}
