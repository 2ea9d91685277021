//! River and analysis parameters for a morphological impact run.
use crate::celerity::CelerityResolver;
use crate::discharge::QFit;
use crate::errors::{MiError, Result};
use serde::{Deserialize, Serialize};

fn default_u_critical() -> f64 {
    0.3
}

fn default_dzmin() -> f64 {
    0.01
}

/// Parameters of the river reach and of the analysis.
///
/// Create a config with [new](#method.new) and adjust it with the builder methods.
///
/// # Examples
///
/// ```rust
/// use morphimpact::prelude::*;
///
/// let config = Config::new(
///     QFit { q0: 800.0, dq: 1200.0 },
///     340.0,
///     CelerityResolver::ByFixedRates { low: 0.3, high: 1.2 },
/// )
/// .q_stagnant(1000.0) // Discharge below which the river is considered stagnant.
/// .u_critical(0.3) // Velocity below which the bed does not respond.
/// .dzmin(0.005); // Smallest yearly change counted in a region.
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Fit of the discharge exceedance curve.
    pub q_fit: QFit,
    /// Discharge at or below which the flow is stagnant.
    #[serde(default)]
    pub q_stagnant: f64,
    /// Discharge above which the measure is morphologically active.
    #[serde(default)]
    pub q_threshold: Option<f64>,
    /// Normal width of the main channel.
    pub normal_width: f64,
    /// Source of the bed celerity.
    pub celerity: CelerityResolver,
    /// Critical flow velocity.
    #[serde(default = "default_u_critical")]
    pub u_critical: f64,
    /// Minimum yearly bed-level change of a region cell.
    #[serde(default = "default_dzmin")]
    pub dzmin: f64,
}

impl Config {
    /// Config with the required parameters; the stagnant discharge starts at zero, the
    /// critical velocity at 0.3 and the minimum change at 0.01.
    pub fn new(q_fit: QFit, normal_width: f64, celerity: CelerityResolver) -> Self {
        Config {
            q_fit,
            q_stagnant: 0.0,
            q_threshold: None,
            normal_width,
            celerity,
            u_critical: default_u_critical(),
            dzmin: default_dzmin(),
        }
    }

    /// Set the stagnant discharge.
    pub fn q_stagnant(mut self, q: f64) -> Self {
        self.q_stagnant = q;
        self
    }

    /// Set the discharge above which the measure is active.
    pub fn q_threshold(mut self, q: f64) -> Self {
        self.q_threshold = Some(q);
        self
    }

    /// Set the critical flow velocity.
    pub fn u_critical(mut self, u: f64) -> Self {
        self.u_critical = u;
        self
    }

    /// Set the minimum yearly change of a region cell.
    pub fn dzmin(mut self, dz: f64) -> Self {
        self.dzmin = dz;
        self
    }

    /// Check every parameter is within its domain.
    pub fn validate(&self) -> Result<()> {
        self.q_fit.validate()?;
        self.celerity.validate()?;
        if !(self.normal_width > 0.0) {
            return Err(MiError::invalid(
                "normal_width",
                self.normal_width,
                "must be positive",
            ));
        }
        if !(self.u_critical >= 0.0) {
            return Err(MiError::invalid(
                "u_critical",
                self.u_critical,
                "must not be negative",
            ));
        }
        if !(self.dzmin >= 0.0) {
            return Err(MiError::invalid("dzmin", self.dzmin, "must not be negative"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::new(
            QFit {
                q0: 800.0,
                dq: 1200.0,
            },
            340.0,
            CelerityResolver::ByFixedRates {
                low: 0.3,
                high: 1.2,
            },
        )
    }

    #[test]
    fn builder_sets_fields() {
        let c = config().q_stagnant(1000.0).q_threshold(2500.0).dzmin(0.02);
        assert_eq!(c.q_stagnant, 1000.0);
        assert_eq!(c.q_threshold, Some(2500.0));
        assert_eq!(c.dzmin, 0.02);
        assert_eq!(c.u_critical, 0.3);
    }

    #[test]
    fn invalid_parameters_rejected() {
        assert!(config().validate().is_ok());
        let mut c = config();
        c.normal_width = 0.0;
        assert!(c.validate().is_err());
        assert!(config().u_critical(-0.1).validate().is_err());
        assert!(config().dzmin(f64::NAN).validate().is_err());
        let mut c = config();
        c.q_fit.dq = -1.0;
        assert!(c.validate().is_err());
    }
}
