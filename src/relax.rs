//! Relaxation of the bed towards the equilibrium of each discharge period.
//!
//! Over one period the bed moves from its state `z` towards the equilibrium change `dz` as
//! `z' = s * z + (1 - s) * dz`, with `s` the relaxation factor of the period.  Repeating the
//! periods every year gives a cyclic linear recurrence whose steady state is solved in closed
//! form for every period start.
use crate::errors::{MiError, Result};
use crate::utils;
use log::{debug, warn};
use rayon::prelude::*;

/// Scale of the exponent in [`relax_factor`].
pub const RELAXATION_SCALE: f64 = 500.0;

/// Relaxation factor `exp(-500 * celerity * duration / width)` of a single period.
///
/// Equals one when either the celerity or the duration is zero.  The width must be positive;
/// use [`relax_factors`] for a checked version.
///
/// # Examples
///
/// ```rust
/// use morphimpact::relax::relax_factor;
/// assert_eq!(relax_factor(0.0, 0.4, 300.0), 1.0);
/// assert!((relax_factor(1.2, 0.5, 300.0) - (-1.0f64).exp()).abs() < 1e-12);
/// ```
pub fn relax_factor(celerity: f64, duration: f64, width: f64) -> f64 {
    (-RELAXATION_SCALE * celerity * duration / width).exp()
}

/// Relaxation factors of all periods for a channel of normal `width`.
pub fn relax_factors(celerities: &[f64], durations: &[f64], width: f64) -> Result<Vec<f64>> {
    if !(width > 0.0) {
        return Err(MiError::invalid("normal_width", width, "must be positive"));
    }
    MiError::check_len("durations", celerities.len(), durations.len())?;
    Ok(celerities
        .iter()
        .zip(durations)
        .map(|(c, t)| relax_factor(*c, *t, width))
        .collect())
}

/// Bed-level change over the year for every cell.
#[derive(Debug, Clone, PartialEq)]
pub struct BedLevelChange {
    /// Bed-level change at the start of each period.
    pub at_period_start: Vec<Vec<f64>>,
    /// Duration weighted yearly mean.
    pub mean: Vec<f64>,
    /// Yearly maximum.
    pub max: Vec<f64>,
    /// Yearly minimum.
    pub min: Vec<f64>,
    /// Number of cells without a valid equilibrium in at least one period.
    pub masked: usize,
}

/// Steady cyclic bed-level change for a sequence of periods.
///  - `fields` holds the equilibrium change of each period, NaN where undefined.
///  - `sigma` holds the relaxation factor of each period.
///  - `durations` holds the fraction of the year of each period.
///
/// A cell with NaN in any period relaxes with factor one in every period, which yields zero
/// change for that cell.
///
/// # Examples
///
/// ```rust
/// use morphimpact::relax::bed_level_changes;
/// let fields = vec![vec![0.4, f64::NAN], vec![0.4, 0.2]];
/// let blc = bed_level_changes(&fields, &[0.5, 0.8], &[0.5, 0.5])?;
/// assert!((blc.mean[0] - 0.4).abs() < 1e-12);
/// assert_eq!(blc.mean[1], 0.0);
/// assert_eq!(blc.masked, 1);
/// # Ok::<(), morphimpact::errors::MiError>(())
/// ```
pub fn bed_level_changes(
    fields: &[Vec<f64>],
    sigma: &[f64],
    durations: &[f64],
) -> Result<BedLevelChange> {
    let n = fields.len();
    if n == 0 {
        return Err(MiError::NoConditions);
    }
    MiError::check_len("relaxation factors", n, sigma.len())?;
    MiError::check_len("durations", n, durations.len())?;
    let m = fields[0].len();
    for field in fields {
        MiError::check_len("equilibrium field", m, field.len())?;
    }

    let mut mask = vec![false; m];
    for field in fields {
        mask.iter_mut()
            .zip(field)
            .for_each(|(k, z)| *k = *k || z.is_nan());
    }
    let masked = mask.iter().filter(|k| **k).count();
    if masked > 0 {
        warn!(
            "{} of {} cells lack a valid equilibrium in some period, relaxing them with factor one",
            masked, m
        );
    }

    let cell_sigma: Vec<Vec<f64>> = sigma
        .iter()
        .map(|s| mask.iter().map(|k| if *k { 1.0 } else { *s }).collect())
        .collect();

    let mut prod = vec![1.0; m];
    for s in &cell_sigma {
        prod.iter_mut().zip(s).for_each(|(p, s)| *p *= s);
    }
    let den: Vec<f64> = prod.iter().map(|p| 1.0 - p).collect();

    let mut at_period_start = Vec::with_capacity(n);
    for i in 0..n {
        let mut num = vec![0.0; m];
        for j in 0..n {
            let jr = (i + j) % n;
            let mut term: Vec<f64> = fields[jr]
                .par_iter()
                .zip(cell_sigma[jr].par_iter())
                .map(|(z, s)| z * (1.0 - s))
                .collect();
            for k in (j + 1)..n {
                let kr = (i + k) % n;
                term.par_iter_mut()
                    .zip(cell_sigma[kr].par_iter())
                    .for_each(|(t, s)| *t *= s);
            }
            num.par_iter_mut()
                .zip(term.par_iter())
                .for_each(|(a, t)| *a += t);
        }
        let dzb: Vec<f64> = num
            .par_iter()
            .zip(den.par_iter())
            .map(|(a, d)| if *d == 0.0 { 0.0 } else { a / d })
            .collect();
        at_period_start.push(dzb);
    }

    let mean = weighted_average(durations, &at_period_start)?;
    let max = utils::field_max(&at_period_start);
    let min = utils::field_min(&at_period_start);
    debug!("relaxed {} periods over {} cells", n, m);

    Ok(BedLevelChange {
        at_period_start,
        mean,
        max,
        min,
        masked,
    })
}

/// Duration weighted yearly mean of the bed-level change at the period starts.
///
/// The change at the start of period `i` is weighted by half the duration of the period it
/// starts plus half the duration of the period it ends, cyclically.
pub fn weighted_average(durations: &[f64], at_period_start: &[Vec<f64>]) -> Result<Vec<f64>> {
    let n = at_period_start.len();
    MiError::check_len("durations", n, durations.len())?;
    let m = at_period_start.first().map_or(0, |f| f.len());
    let mut mean = vec![0.0; m];
    for (i, dzb) in at_period_start.iter().enumerate() {
        MiError::check_len("bed-level field", m, dzb.len())?;
        let weight = durations[i] + durations[(i + n - 1) % n];
        mean.par_iter_mut()
            .zip(dzb.par_iter())
            .for_each(|(a, z)| *a += z * weight / 2.0);
    }
    Ok(mean)
}

/// Ordered set of periods making up one year, ready for relaxation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cycle {
    /// Equilibrium change per period.
    pub fields: Vec<Vec<f64>>,
    /// Relaxation factor per period.
    pub sigma: Vec<f64>,
    /// Fraction of the year per period.
    pub durations: Vec<f64>,
}

impl Cycle {
    /// Create an empty cycle.
    pub fn new() -> Self {
        Cycle::default()
    }

    /// Append a period.
    pub fn push(&mut self, field: Vec<f64>, sigma: f64, duration: f64) {
        self.fields.push(field);
        self.sigma.push(sigma);
        self.durations.push(duration);
    }

    /// Number of periods.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the cycle holds no periods.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Insert the stagnant period at position `slot`, normally right after the first period.
    ///
    /// The stagnant period has zero equilibrium change and relaxation factor one, so the bed
    /// keeps its state while it lasts.  Nothing is inserted when `t_stagnant` is zero.
    pub fn insert_stagnant(&mut self, slot: usize, t_stagnant: f64) {
        if t_stagnant <= 0.0 || self.is_empty() {
            return;
        }
        let m = self.fields[0].len();
        let slot = slot.min(self.len());
        self.fields.insert(slot, vec![0.0; m]);
        self.sigma.insert(slot, 1.0);
        self.durations.insert(slot, t_stagnant);
    }

    /// Relax the bed over the cycle.
    pub fn relax(&self) -> Result<BedLevelChange> {
        bed_level_changes(&self.fields, &self.sigma, &self.durations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Iterate the recurrence until it settles, returning the state at each period start.
    fn brute_force(dz: &[f64], sigma: &[f64]) -> Vec<f64> {
        let n = dz.len();
        let mut z = 0.0;
        let mut starts = vec![0.0; n];
        for _ in 0..2000 {
            for i in 0..n {
                starts[i] = z;
                z = sigma[i] * z + (1.0 - sigma[i]) * dz[i];
            }
        }
        starts
    }

    #[test]
    fn factor_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1000 {
            let s = relax_factor(
                rng.gen_range(0.0..2.0),
                rng.gen_range(0.0..1.0),
                rng.gen_range(100.0..1000.0),
            );
            assert!(s > 0.0 && s <= 1.0);
        }
        assert_eq!(relax_factor(0.0, 0.7, 150.0), 1.0);
        assert_eq!(relax_factor(2.0, 0.0, 150.0), 1.0);
    }

    #[test]
    fn non_positive_width_rejected() {
        assert!(relax_factors(&[1.0], &[0.5], 0.0).is_err());
        assert!(relax_factors(&[1.0], &[0.5], -10.0).is_err());
        assert!(relax_factors(&[1.0, 2.0], &[0.5], 10.0).is_err());
        let s = relax_factors(&[0.0, 1.0], &[0.5, 0.5], 250.0).unwrap();
        assert_eq!(s[0], 1.0);
        assert_relative_eq!(s[1], (-1.0f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn matches_iterated_recurrence() {
        let mut rng = StdRng::seed_from_u64(11);
        for n in 1..6 {
            let dz: Vec<f64> = (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect();
            let sigma: Vec<f64> = (0..n).map(|_| rng.gen_range(0.05..0.95)).collect();
            let fields: Vec<Vec<f64>> = dz.iter().map(|z| vec![*z]).collect();
            let durations = vec![1.0 / n as f64; n];
            let blc = bed_level_changes(&fields, &sigma, &durations).unwrap();
            let expected = brute_force(&dz, &sigma);
            for i in 0..n {
                assert_relative_eq!(blc.at_period_start[i][0], expected[i], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn single_period_reaches_equilibrium() {
        let blc = bed_level_changes(&[vec![0.3, -0.2]], &[0.4], &[1.0]).unwrap();
        assert_relative_eq!(blc.mean[0], 0.3, epsilon = 1e-12);
        assert_relative_eq!(blc.max[1], -0.2, epsilon = 1e-12);
        assert_relative_eq!(blc.min[1], -0.2, epsilon = 1e-12);
    }

    #[test]
    fn no_relaxation_gives_zero() {
        let fields = vec![vec![1.0, -3.0, 0.5], vec![2.0, 7.0, -0.5], vec![0.1, 0.2, 0.3]];
        let blc = bed_level_changes(&fields, &[1.0, 1.0, 1.0], &[0.3, 0.3, 0.4]).unwrap();
        for field in &[&blc.mean, &blc.max, &blc.min] {
            assert!(field.iter().all(|z| *z == 0.0));
        }
        assert_eq!(blc.masked, 0);
    }

    #[test]
    fn nan_masks_whole_cell() {
        let fields = vec![vec![0.5, f64::NAN, 0.5], vec![0.1, 0.1, 0.1]];
        let blc = bed_level_changes(&fields, &[0.3, 0.6], &[0.5, 0.5]).unwrap();
        assert_eq!(blc.masked, 1);
        assert_eq!(blc.at_period_start[0][1], 0.0);
        assert_eq!(blc.at_period_start[1][1], 0.0);
        assert_eq!(blc.mean[1], 0.0);
        assert_eq!(blc.mean[0], blc.mean[2]);
        assert!(blc.mean[0] > 0.1 && blc.mean[0] < 0.5);
    }

    #[test]
    fn max_and_min_bound_the_mean() {
        let fields = vec![vec![0.8, -0.4], vec![-0.2, 0.6], vec![0.1, 0.0]];
        let blc = bed_level_changes(&fields, &[0.2, 0.5, 0.9], &[0.2, 0.3, 0.5]).unwrap();
        for c in 0..2 {
            assert!(blc.min[c] <= blc.mean[c] && blc.mean[c] <= blc.max[c]);
        }
    }

    #[test]
    fn weighted_average_uses_neighbouring_durations() {
        let starts = vec![vec![1.0], vec![2.0], vec![4.0]];
        let mean = weighted_average(&[0.2, 0.3, 0.5], &starts).unwrap();
        // weights (0.2 + 0.5) / 2, (0.3 + 0.2) / 2, (0.5 + 0.3) / 2
        assert_relative_eq!(mean[0], 0.35 + 0.5 + 1.6, epsilon = 1e-12);
        assert!(weighted_average(&[0.5], &starts).is_err());
    }

    #[test]
    fn stagnant_slot_holds_the_bed() {
        let mut cycle = Cycle::new();
        cycle.push(vec![0.5, 0.2], 0.4, 0.3);
        cycle.push(vec![-0.1, 0.3], 0.7, 0.3);
        cycle.push(vec![0.2, 0.0], 0.5, 0.2);
        cycle.insert_stagnant(1, 0.2);
        assert_eq!(cycle.len(), 4);
        assert_eq!(cycle.sigma[1], 1.0);
        assert_eq!(cycle.fields[1], vec![0.0, 0.0]);
        assert_relative_eq!(cycle.durations.iter().sum::<f64>(), 1.0, epsilon = 1e-12);

        let blc = cycle.relax().unwrap();
        for c in 0..2 {
            assert_relative_eq!(
                blc.at_period_start[1][c],
                blc.at_period_start[2][c],
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn zero_stagnant_not_inserted() {
        let mut cycle = Cycle::new();
        cycle.push(vec![0.5], 0.4, 1.0);
        cycle.insert_stagnant(1, 0.0);
        assert_eq!(cycle.len(), 1);
    }

    #[test]
    fn inconsistent_inputs_rejected() {
        assert!(bed_level_changes(&[], &[], &[]).is_err());
        assert!(bed_level_changes(&[vec![0.0], vec![0.0, 1.0]], &[0.5, 0.5], &[0.5, 0.5]).is_err());
        assert!(bed_level_changes(&[vec![0.0]], &[0.5, 0.5], &[1.0]).is_err());
    }
}
