//! Discharge exceedance curve and the share of the year covered by each characteristic discharge.
//!
//! The exceedance curve is the two-parameter exponential fit `P(q) = exp(min(0, (q0 - q) / dq))`.
//! Each characteristic discharge represents the band of discharges between the geometric means
//! of its sorted neighbours; its duration is the drop in exceedance probability across that band.
use crate::errors::{MiError, Result};
use crate::utils;
use log::debug;
use serde::{Deserialize, Serialize};

/// Days per year used when converting duration fractions to whole days.
pub const DAYS_PER_YEAR: i64 = 365;

/// Exponential fit of the discharge exceedance curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QFit {
    /// Discharge at or below which the exceedance probability is one.
    pub q0: f64,
    /// Discharge scale of the exponential decay.
    pub dq: f64,
}

impl QFit {
    /// Create a fit, rejecting a non-positive decay scale.
    pub fn new(q0: f64, dq: f64) -> Result<Self> {
        let fit = QFit { q0, dq };
        fit.validate()?;
        Ok(fit)
    }

    /// Check that the decay scale is positive.
    pub fn validate(&self) -> Result<()> {
        if self.dq > 0.0 {
            Ok(())
        } else {
            Err(MiError::invalid("dq", self.dq, "exceedance decay scale must be positive"))
        }
    }

    /// Probability that discharge `q` is exceeded.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use morphimpact::discharge::QFit;
    /// let fit = QFit { q0: 1000.0, dq: 1000.0 };
    /// assert_eq!(fit.exceedance(500.0), 1.0);
    /// assert!((fit.exceedance(2000.0) - (-1.0f64).exp()).abs() < 1e-12);
    /// ```
    pub fn exceedance(&self, q: f64) -> f64 {
        ((self.q0 - q) / self.dq).min(0.0).exp()
    }
}

/// Share of the year spent in each characteristic discharge period.
#[derive(Debug, Clone, PartialEq)]
pub struct Durations {
    /// Fraction of the year below the stagnant discharge.
    pub t_stagnant: f64,
    /// Fraction of the year per period, in input order.
    pub fractions: Vec<f64>,
    /// Fraction of the year per period during which the measure is morphologically active.
    pub active: Vec<f64>,
    /// Index of the highest discharge, which absorbs the rounding residual.
    pub highest: usize,
}

/// Duration of each period expressed in whole days.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Days {
    /// Days below the stagnant discharge.
    pub stagnant: i64,
    /// Days per period, in input order.
    pub periods: Vec<i64>,
}

/// Compute the duration fractions of the characteristic discharges.
///  - `q_fit` is the exceedance curve.
///  - `q_stagnant` is the discharge below which the flow is considered stagnant.
///  - `discharges` are the characteristic discharges, in any order.
///  - `q_threshold` is the discharge above which the measure is active, `None` if it always is.
///
/// The period with the highest discharge gets the residual `1 - others - t_stagnant` so the
/// fractions sum to one exactly.  Duplicate discharges are allowed; the later one gets a
/// zero-width band.
///
/// # Examples
///
/// ```rust
/// use morphimpact::discharge::{duration_fractions, QFit};
/// let fit = QFit { q0: 1000.0, dq: 1000.0 };
/// let dur = duration_fractions(&fit, 500.0, &[4000.0, 1000.0], None)?;
/// assert_eq!(dur.t_stagnant, 0.0);
/// assert!((dur.fractions[1] - (1.0 - (-1.0f64).exp())).abs() < 1e-12);
/// assert!((dur.fractions.iter().sum::<f64>() - 1.0).abs() < 1e-12);
/// # Ok::<(), morphimpact::errors::MiError>(())
/// ```
pub fn duration_fractions(
    q_fit: &QFit,
    q_stagnant: f64,
    discharges: &[f64],
    q_threshold: Option<f64>,
) -> Result<Durations> {
    if discharges.is_empty() {
        return Err(MiError::NoConditions);
    }
    q_fit.validate()?;
    for q in discharges {
        if !(*q > 0.0) {
            return Err(MiError::invalid("discharge", *q, "must be positive"));
        }
    }

    let t_stagnant = if q_stagnant > q_fit.q0 {
        1.0 - q_fit.exceedance(q_stagnant)
    } else {
        0.0
    };
    let p_threshold = q_threshold.map(|q| q_fit.exceedance(q));

    let order = utils::argsort(discharges);
    let n = order.len();
    let highest = order[n - 1];
    let mut fractions = vec![0.0; n];
    let mut active = vec![0.0; n];
    let mut p_low = 1.0 - t_stagnant;
    let mut total = 0.0;
    for (rank, &i) in order.iter().enumerate() {
        let p_high = if rank + 1 < n {
            let boundary = (discharges[i] * discharges[order[rank + 1]]).sqrt();
            q_fit.exceedance(boundary).min(p_low)
        } else {
            0.0
        };
        fractions[i] = if rank + 1 < n {
            p_low - p_high
        } else {
            (1.0 - total - t_stagnant).max(0.0)
        };
        active[i] = match p_threshold {
            Some(pt) => (p_low.min(pt) - p_high).max(0.0).min(fractions[i]),
            None => fractions[i],
        };
        total += fractions[i];
        p_low = p_high;
    }
    debug!(
        "durations: stagnant {:.4}, periods {:?}, active {:?}",
        t_stagnant, fractions, active
    );

    Ok(Durations {
        t_stagnant,
        fractions,
        active,
        highest,
    })
}

impl Durations {
    /// Convert the fractions to whole days, the highest period taking the residual.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use morphimpact::discharge::{duration_fractions, QFit, DAYS_PER_YEAR};
    /// let fit = QFit { q0: 800.0, dq: 1200.0 };
    /// let dur = duration_fractions(&fit, 1000.0, &[1500.0, 3000.0, 6000.0], None)?;
    /// let days = dur.to_days();
    /// assert_eq!(days.stagnant + days.periods.iter().sum::<i64>(), DAYS_PER_YEAR);
    /// # Ok::<(), morphimpact::errors::MiError>(())
    /// ```
    pub fn to_days(&self) -> Days {
        let year = DAYS_PER_YEAR as f64;
        let mut stagnant = (self.t_stagnant * year).round() as i64;
        let mut periods: Vec<i64> = self
            .fractions
            .iter()
            .map(|t| (t * year).round() as i64)
            .collect();
        let others: i64 = periods
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != self.highest)
            .map(|(_, d)| d)
            .sum();
        let mut residual = DAYS_PER_YEAR - others - stagnant;
        // rounding up overshot the year, take the days back from the longest spans
        while residual < 0 {
            let longest = (0..periods.len())
                .filter(|i| *i != self.highest)
                .max_by_key(|i| periods[*i]);
            match longest {
                Some(i) if periods[i] >= stagnant => periods[i] -= 1,
                _ => stagnant -= 1,
            }
            residual += 1;
        }
        periods[self.highest] = residual;
        Days { stagnant, periods }
    }
}
