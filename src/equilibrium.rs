//! Equilibrium bed-level change from reference and with-measure flow fields.
use crate::errors::{MiError, Result};
use rayon::prelude::*;

/// Reference velocities at or above this magnitude are treated as model artifacts.
pub const MAX_REFERENCE_VELOCITY: f64 = 100.0;

/// Equilibrium bed-level change per cell for one discharge period.
///  - `u_ref` and `h_ref` are the reference velocity and water depth.
///  - `u_measure` is the velocity with the measure in place.
///  - `u_critical` is the velocity below which the bed does not respond.
///
/// Returns `h_ref * (u_ref - u_measure) / u_ref` where both velocities exceed `u_critical`
/// in magnitude and the reference velocity is plausible, NaN elsewhere.
///
/// # Examples
///
/// ```rust
/// use morphimpact::equilibrium::equilibrium_change;
/// let dz = equilibrium_change(&[1.0, 0.1, 2.0], &[4.0, 4.0, 5.0], &[0.8, 0.1, 2.5], 0.3)?;
/// assert!((dz[0] - 0.8).abs() < 1e-12);
/// assert!(dz[1].is_nan());
/// assert!((dz[2] + 1.25).abs() < 1e-12);
/// # Ok::<(), morphimpact::errors::MiError>(())
/// ```
pub fn equilibrium_change(
    u_ref: &[f64],
    h_ref: &[f64],
    u_measure: &[f64],
    u_critical: f64,
) -> Result<Vec<f64>> {
    MiError::check_len("h_ref", u_ref.len(), h_ref.len())?;
    MiError::check_len("u_measure", u_ref.len(), u_measure.len())?;
    let dz = u_ref
        .par_iter()
        .zip(h_ref.par_iter())
        .zip(u_measure.par_iter())
        .map(|((u0, h0), u1)| {
            if u0.abs() > u_critical && u1.abs() > u_critical && u0.abs() < MAX_REFERENCE_VELOCITY
            {
                h0 * (u0 - u1) / u0
            } else {
                f64::NAN
            }
        })
        .collect();
    Ok(dz)
}
