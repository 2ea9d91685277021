//! Bed celerity per characteristic discharge.
use crate::errors::{MiError, Result};
use crate::utils;
use log::debug;
use serde::{Deserialize, Serialize};

/// One breakpoint of a celerity table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CelerityPoint {
    /// Upper discharge of the step.
    pub discharge: f64,
    /// Celerity for discharges up to `discharge`.
    pub celerity: f64,
}

/// Source of the bed celerity of each discharge period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum CelerityResolver {
    /// Step function over a table sorted ascending by discharge.
    ByDischargeTable {
        /// Breakpoints, strictly ascending in discharge.
        table: Vec<CelerityPoint>,
    },
    /// Low-flow celerity for the lowest period, high-flow celerity for all others.
    ByFixedRates {
        /// Celerity of the lowest discharge period.
        low: f64,
        /// Celerity of every other period.
        high: f64,
    },
}

impl CelerityResolver {
    /// Build a table resolver, checking the breakpoints are non-empty and strictly ascending.
    pub fn from_table(table: Vec<CelerityPoint>) -> Result<Self> {
        let res = CelerityResolver::ByDischargeTable { table };
        res.validate()?;
        Ok(res)
    }

    /// Read a table resolver from a csv file with `discharge` and `celerity` columns.
    pub fn read_table(path: &str) -> Result<Self> {
        let table: Vec<CelerityPoint> = utils::read(path)?;
        CelerityResolver::from_table(table)
    }

    /// Check a table is non-empty and ascending.  Fixed rates are always well formed.
    pub fn validate(&self) -> Result<()> {
        if let CelerityResolver::ByDischargeTable { table } = self {
            if table.is_empty() {
                return Err(MiError::CelerityTable("table is empty".to_string()));
            }
            if table.windows(2).any(|w| !(w[0].discharge < w[1].discharge)) {
                return Err(MiError::CelerityTable(
                    "discharges must be strictly ascending".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Celerity for a single discharge.  `lowest` marks the lowest discharge period,
    /// which only matters for fixed rates.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use morphimpact::celerity::{CelerityPoint, CelerityResolver};
    /// let res = CelerityResolver::from_table(vec![
    ///     CelerityPoint { discharge: 1000.0, celerity: 0.5 },
    ///     CelerityPoint { discharge: 3000.0, celerity: 1.5 },
    /// ])?;
    /// assert_eq!(res.celerity_for(800.0, false), 0.5);
    /// assert_eq!(res.celerity_for(1000.0, false), 0.5);
    /// assert_eq!(res.celerity_for(2000.0, false), 1.5);
    /// assert_eq!(res.celerity_for(9000.0, false), 1.5);
    /// # Ok::<(), morphimpact::errors::MiError>(())
    /// ```
    pub fn celerity_for(&self, discharge: f64, lowest: bool) -> f64 {
        match self {
            CelerityResolver::ByDischargeTable { table } => table
                .iter()
                .find(|p| discharge <= p.discharge)
                .or_else(|| table.last())
                .map_or(0.0, |p| p.celerity),
            CelerityResolver::ByFixedRates { low, high } => {
                if lowest {
                    *low
                } else {
                    *high
                }
            }
        }
    }

    /// Resolve the celerity of every period.
    ///  - periods at or below `q_stagnant` get celerity zero.
    ///  - fails on a negative celerity or when every period ends up at zero.
    pub fn resolve(&self, discharges: &[f64], q_stagnant: f64) -> Result<Vec<f64>> {
        self.validate()?;
        let lowest = utils::argsort(discharges).first().copied();
        let mut celerities = Vec::with_capacity(discharges.len());
        for (i, q) in discharges.iter().enumerate() {
            let c = self.celerity_for(*q, Some(i) == lowest);
            if c < 0.0 {
                return Err(MiError::NegativeCelerity {
                    discharge: *q,
                    celerity: c,
                });
            }
            celerities.push(if *q <= q_stagnant { 0.0 } else { c });
        }
        if celerities.iter().all(|c| *c == 0.0) {
            return Err(MiError::ZeroCelerities);
        }
        debug!("celerities {:?} for discharges {:?}", celerities, discharges);
        Ok(celerities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CelerityResolver {
        CelerityResolver::from_table(vec![
            CelerityPoint {
                discharge: 1000.0,
                celerity: 0.2,
            },
            CelerityPoint {
                discharge: 2000.0,
                celerity: 0.8,
            },
            CelerityPoint {
                discharge: 4000.0,
                celerity: 1.6,
            },
        ])
        .unwrap()
    }

    #[test]
    fn table_is_a_step_function() {
        let res = table();
        assert_eq!(res.celerity_for(1500.0, false), 0.8);
        assert_eq!(res.celerity_for(2000.0, false), 0.8);
        assert_eq!(res.celerity_for(2000.1, false), 1.6);
        assert_eq!(res.celerity_for(10.0, true), 0.2);
        assert_eq!(res.celerity_for(50000.0, false), 1.6);
    }

    #[test]
    fn fixed_rates_low_for_lowest_period() {
        let res = CelerityResolver::ByFixedRates {
            low: 0.3,
            high: 1.1,
        };
        let c = res.resolve(&[3000.0, 1200.0, 5000.0], 800.0).unwrap();
        assert_eq!(c, vec![1.1, 0.3, 1.1]);
    }

    #[test]
    fn stagnant_periods_forced_to_zero() {
        let c = table().resolve(&[900.0, 1500.0, 3000.0], 1000.0).unwrap();
        assert_eq!(c, vec![0.0, 0.8, 1.6]);
    }

    #[test]
    fn all_zero_is_an_error() {
        let res = CelerityResolver::ByFixedRates {
            low: 0.0,
            high: 0.0,
        };
        match res.resolve(&[1000.0, 2000.0], 500.0) {
            Err(MiError::ZeroCelerities) => {}
            other => panic!("unexpected {:?}", other),
        }
        match table().resolve(&[500.0, 900.0], 1000.0) {
            Err(e) => assert_eq!(e.to_string(), "celerities can't all be zero"),
            Ok(c) => panic!("unexpected {:?}", c),
        }
    }

    #[test]
    fn negative_is_an_error() {
        let res = CelerityResolver::ByFixedRates {
            low: 0.5,
            high: -1.0,
        };
        assert!(matches!(
            res.resolve(&[1000.0, 2000.0], 500.0),
            Err(MiError::NegativeCelerity { .. })
        ));
    }

    #[test]
    fn unsorted_table_rejected() {
        let bad = CelerityResolver::from_table(vec![
            CelerityPoint {
                discharge: 2000.0,
                celerity: 0.2,
            },
            CelerityPoint {
                discharge: 1000.0,
                celerity: 0.8,
            },
        ]);
        assert!(bad.is_err());
        assert!(CelerityResolver::from_table(vec![]).is_err());
    }
}
