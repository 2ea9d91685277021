/*!
* # Morphimpact - A library for estimating the morphological impact of river measures.
* A river engineering measure, such as a groyne lowering or a side channel, changes the flow velocity
* in the main channel.  Where the flow slows down the bed rises, where it speeds up the bed erodes.
* This crate estimates the yearly bed-level change caused by a measure from hydraulic simulations of the
* reference situation and the situation with the measure, following the WAQMORF approach used for the
* Dutch rivers.
*
* The year is split into a handful of characteristic discharges.  For each discharge the crate
*  - derives the share of the year it represents from an exponential fit of the exceedance curve,
*  - computes the equilibrium bed-level change `h * (u_ref - u_measure) / u_ref` per cell,
*  - and relaxes the bed towards that equilibrium at a rate set by the bed celerity.
*
* Repeating the periods every year gives a steady cycle, from which the yearly mean, maximum and
* minimum bed-level change follow.  Contiguous areas of sedimentation and erosion are then delineated on
* the mesh and their volumes estimated.
*
*  ## Quick Start
*
* To use morphimpact, add it to your `Cargo.toml`
* ```toml
* [dependencies]
* morphimpact = "^0.1.0"
* ```
*
*  - Load the crate prelude in the preamble of your `main.rs`.
*  - Describe the river, the hydraulic results per discharge and the mesh, then run the analysis:
* ```rust
* use morphimpact::prelude::*;
*
* fn main() -> Result<(), MiError> {
*     let config = Config::new(
*         QFit { q0: 800.0, dq: 1200.0 }, // exceedance curve
*         150.0,                          // normal width of the main channel
*         CelerityResolver::ByFixedRates { low: 0.5, high: 1.0 },
*     )
*     .q_stagnant(1000.0);
*
*     // three cells in a row, the measure slows the flow in the middle one
*     let field = |u: f64| HydraulicField {
*         u_ref: vec![u, u, u],
*         h_ref: vec![3.0, 3.0, 3.0],
*         u_measure: vec![u, 0.9 * u, u],
*     };
*     let conditions = vec![
*         Condition::new(1500.0, field(0.6)),
*         Condition::new(3000.0, field(0.9)),
*         Condition::new(6000.0, field(1.2)),
*     ];
*     let mesh = Mesh {
*         area: vec![500.0; 3],
*         adjacency: vec![[0, 1], [1, 2]],
*         bins: None,
*     };
*
*     let impact = analysis::run(&config, &conditions, &mesh)?;
*     assert!(impact.bed_level.mean[1] > 0.0);
*     assert_eq!(impact.sedimentation.len(), 1);
*     Ok(())
* }
* ```
*
* The building blocks are available on their own as well:
* [duration_fractions](discharge/fn.duration_fractions.html),
* [equilibrium_change](equilibrium/fn.equilibrium_change.html),
* [bed_level_changes](relax/fn.bed_level_changes.html),
* [detect](regions/fn.detect.html) and
* [threshold_volume](volume/fn.threshold_volume.html).
*/

#![warn(missing_docs)]
pub mod analysis;
pub mod celerity;
pub mod config;
pub mod discharge;
pub mod equilibrium;
pub mod errors;
pub mod regions;
pub mod relax;
pub mod utils;
pub mod volume;

/// Commonly used types and functions.
pub mod prelude {
    pub use crate::analysis::{self, Condition, HydraulicField, Impact, Mesh};
    pub use crate::celerity::{CelerityPoint, CelerityResolver};
    pub use crate::config::Config;
    pub use crate::discharge::{duration_fractions, QFit};
    pub use crate::errors::MiError;
    pub use crate::volume::{Binning, Polarity};
}
