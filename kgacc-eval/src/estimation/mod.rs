//! Survey-sampling accuracy estimators
//!
//! `TwcsEstimator` estimates one stratum from its clusters; `StwcsEstimator`
//! combines the per-stratum results with fixed population weights. Both are
//! stateless apart from the confidence level.

pub mod stwcs;
pub mod twcs;

pub use stwcs::StwcsEstimator;
pub use twcs::TwcsEstimator;

use kgacc_common::{Error, Result};
use statrs::distribution::{ContinuousCDF, Normal};

/// Default significance level (95% confidence)
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Standard normal critical value with right-tail probability α/2
///
/// # Errors
///
/// `InvalidInput` unless 0 < α < 1
pub fn critical_value(alpha: f64) -> Result<f64> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(Error::InvalidInput(format!(
            "alpha must lie in (0, 1), got {}",
            alpha
        )));
    }
    let normal = Normal::new(0.0, 1.0).map_err(|e| Error::InvalidInput(e.to_string()))?;
    Ok(normal.inverse_cdf(1.0 - alpha / 2.0))
}

/// z · √var; an infinite variance gives an infinite margin
pub fn margin_of_error(z: f64, variance: f64) -> f64 {
    z * variance.sqrt()
}

/// Point estimate with its variance and margin of error
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub accuracy: f64,
    pub variance: f64,
    pub margin_of_error: f64,
}

impl Estimate {
    /// Estimate of a stratum without observations
    pub fn undefined() -> Self {
        Self {
            accuracy: f64::NAN,
            variance: f64::INFINITY,
            margin_of_error: f64::INFINITY,
        }
    }

    /// Whether the point estimate exists
    pub fn is_defined(&self) -> bool {
        !self.accuracy.is_nan()
    }

    /// Confidence interval bounds (accuracy ± margin)
    pub fn interval(&self) -> (f64, f64) {
        (
            self.accuracy - self.margin_of_error,
            self.accuracy + self.margin_of_error,
        )
    }

    /// Whether the margin of error is bounded
    pub fn is_bounded(&self) -> bool {
        self.margin_of_error.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_critical_value_95() {
        let z = critical_value(0.05).unwrap();
        assert!((z - 1.959964).abs() < 1e-5, "z = {z}");
    }

    #[test]
    fn test_critical_value_99() {
        let z = critical_value(0.01).unwrap();
        assert!((z - 2.575829).abs() < 1e-5, "z = {z}");
    }

    #[test]
    fn test_invalid_alpha() {
        assert!(critical_value(0.0).is_err());
        assert!(critical_value(1.0).is_err());
        assert!(critical_value(f64::NAN).is_err());
    }

    #[test]
    fn test_undefined_estimate() {
        let est = Estimate::undefined();
        assert!(!est.is_defined());
        assert!(!est.is_bounded());
        assert!(est.variance.is_infinite());

        let defined = Estimate {
            accuracy: 0.5,
            variance: f64::INFINITY,
            margin_of_error: f64::INFINITY,
        };
        assert!(defined.is_defined());
    }

    #[test]
    fn test_infinite_margin() {
        let moe = margin_of_error(1.96, f64::INFINITY);
        assert!(moe.is_infinite());
        assert_eq!(margin_of_error(1.96, 0.0), 0.0);
    }
}
