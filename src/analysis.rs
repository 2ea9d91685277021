//! Full morphological impact analysis of a measure.
//!
//! Takes the river configuration, the hydraulic results of every characteristic discharge and
//! the mesh description, and produces the yearly bed-level change together with the
//! sedimentation and erosion regions and their volumes.
use crate::config::Config;
use crate::discharge::{duration_fractions, Days};
use crate::equilibrium::equilibrium_change;
use crate::errors::{MiError, Result};
use crate::regions;
use crate::relax::{relax_factor, relax_factors, BedLevelChange, Cycle};
use crate::utils;
use crate::volume::{self, Binning, Polarity, VolumeEstimate, VolumeParams};
use log::{debug, info};
use serde::Serialize;

/// Flow velocity and depth of one simulation, reference and with measure, per cell.
#[derive(Debug, Clone, PartialEq)]
pub struct HydraulicField {
    /// Reference velocity magnitude.
    pub u_ref: Vec<f64>,
    /// Reference water depth.
    pub h_ref: Vec<f64>,
    /// Velocity magnitude with the measure in place.
    pub u_measure: Vec<f64>,
}

/// Hydraulic results for one characteristic discharge.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Characteristic discharge.
    pub discharge: f64,
    /// Whether the condition is a tidal cycle sampled by several fields.
    pub tide: bool,
    /// One field, or one per tidal phase.
    pub fields: Vec<HydraulicField>,
}

impl Condition {
    /// Steady condition with a single field.
    pub fn new(discharge: f64, field: HydraulicField) -> Self {
        Condition {
            discharge,
            tide: false,
            fields: vec![field],
        }
    }

    /// Tidal condition sampled at several phases of equal duration.
    pub fn tidal(discharge: f64, fields: Vec<HydraulicField>) -> Self {
        Condition {
            discharge,
            tide: true,
            fields,
        }
    }

    fn validate(&self) -> Result<()> {
        let nfields = self.fields.len();
        let consistent = if self.tide { nfields > 1 } else { nfields == 1 };
        if consistent {
            Ok(())
        } else {
            Err(MiError::NFields {
                discharge: self.discharge,
                nfields,
                tide: self.tide,
            })
        }
    }
}

/// Mesh information needed beyond the hydraulic fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    /// Area of each cell.
    pub area: Vec<f64>,
    /// Pairs of cells sharing an edge.
    pub adjacency: Vec<[usize; 2]>,
    /// Width and chainage bins, when available.
    pub bins: Option<Binning>,
}

/// Derived characteristics of one discharge period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DischargePeriod {
    /// Characteristic discharge.
    pub discharge: f64,
    /// Fraction of the year.
    pub duration: f64,
    /// Bed celerity.
    pub celerity: f64,
    /// Relaxation factor over the whole period.
    pub relax_factor: f64,
    /// Whether the bed responds during the period.
    pub active: bool,
    /// Fraction of the year during which the measure is active.
    pub active_duration: f64,
}

/// Outcome of an analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct Impact {
    /// Characteristics of each discharge period, in input order.
    pub periods: Vec<DischargePeriod>,
    /// Fraction of the year below the stagnant discharge.
    pub t_stagnant: f64,
    /// Period durations in whole days.
    pub days: Days,
    /// Bed-level change over the year, one entry per slot of the relaxation cycle.
    pub bed_level: BedLevelChange,
    /// Yearly impacted streamwise length.
    pub sedimentation_length: f64,
    /// Sedimentation regions, largest first.
    pub sedimentation: Vec<VolumeEstimate>,
    /// Erosion regions, largest first, with volumes as positive numbers.
    pub erosion: Vec<VolumeEstimate>,
}

/// One row of the region summary.
#[derive(Debug, Clone, Serialize)]
pub struct RegionSummary {
    /// Sedimentation or erosion.
    pub polarity: Polarity,
    /// Position in the area ranking.
    pub rank: usize,
    /// Number of cells in the region.
    pub cells: usize,
    /// Area above the threshold.
    pub area: f64,
    /// Binned volume.
    pub binned_volume: f64,
    /// Threshold volume.
    pub threshold_volume: f64,
    /// Equilibrium volume.
    pub equilibrium_volume: f64,
}

impl Impact {
    /// Regions of one polarity.
    pub fn regions(&self, polarity: Polarity) -> &[VolumeEstimate] {
        match polarity {
            Polarity::Sedimentation => &self.sedimentation,
            Polarity::Erosion => &self.erosion,
        }
    }

    /// Volumes of the regions of one polarity as rows binned, threshold and equilibrium.
    pub fn volume_matrix(&self, polarity: Polarity) -> [Vec<f64>; 3] {
        volume::volume_matrix(self.regions(polarity))
    }

    /// One summary row per region, sedimentation first.
    pub fn summary(&self) -> Vec<RegionSummary> {
        let mut rows = Vec::new();
        for polarity in &[Polarity::Sedimentation, Polarity::Erosion] {
            for (rank, e) in self.regions(*polarity).iter().enumerate() {
                let [binned, threshold, equilibrium] = e.volumes();
                rows.push(RegionSummary {
                    polarity: *polarity,
                    rank,
                    cells: e.mask.iter().filter(|k| **k).count(),
                    area: e.area(),
                    binned_volume: binned,
                    threshold_volume: threshold,
                    equilibrium_volume: equilibrium,
                });
            }
        }
        rows
    }

    /// Write the region summary to a csv file.
    pub fn record(&self, path: &str) -> Result<()> {
        utils::record(&self.summary(), path)
    }
}

/// Run the analysis.
///  - `config` holds the river and analysis parameters.
///  - `conditions` holds the hydraulic results per characteristic discharge, in the order of
///    the yearly cycle; the lowest discharge is followed by the stagnant period.
///  - `mesh` holds the cell areas, the adjacency and optionally the bins.
pub fn run(config: &Config, conditions: &[Condition], mesh: &Mesh) -> Result<Impact> {
    config.validate()?;
    if conditions.is_empty() {
        return Err(MiError::NoConditions);
    }
    for c in conditions {
        c.validate()?;
    }
    let ncells = mesh.area.len();

    let discharges: Vec<f64> = conditions.iter().map(|c| c.discharge).collect();
    let durations = duration_fractions(
        &config.q_fit,
        config.q_stagnant,
        &discharges,
        config.q_threshold,
    )?;
    let celerities = config.celerity.resolve(&discharges, config.q_stagnant)?;
    let sigma = relax_factors(&celerities, &durations.fractions, config.normal_width)?;

    let mut cycle = Cycle::new();
    let mut periods = Vec::with_capacity(conditions.len());
    for (i, condition) in conditions.iter().enumerate() {
        let nfields = condition.fields.len();
        let sub_duration = durations.fractions[i] / nfields as f64;
        let sub_sigma = if nfields == 1 {
            sigma[i]
        } else {
            relax_factor(celerities[i], sub_duration, config.normal_width)
        };
        for field in &condition.fields {
            MiError::check_len("u_ref", ncells, field.u_ref.len())?;
            let dz = equilibrium_change(
                &field.u_ref,
                &field.h_ref,
                &field.u_measure,
                config.u_critical,
            )?;
            cycle.push(dz, sub_sigma, sub_duration);
        }
        debug!(
            "period {}: q {:.1}, duration {:.4}, celerity {:.3}, sigma {:.4}",
            i, condition.discharge, durations.fractions[i], celerities[i], sigma[i]
        );
        periods.push(DischargePeriod {
            discharge: condition.discharge,
            duration: durations.fractions[i],
            celerity: celerities[i],
            relax_factor: sigma[i],
            active: sigma[i] < 1.0,
            active_duration: durations.active[i],
        });
    }
    let lowest = utils::argsort(&discharges)[0];
    let slot: usize = conditions[..=lowest].iter().map(|c| c.fields.len()).sum();
    cycle.insert_stagnant(slot, durations.t_stagnant);

    let bed_level = cycle.relax()?;
    let sedimentation_length = volume::sedimentation_length(&celerities, &durations.active)?;

    let params = VolumeParams {
        dzmin: config.dzmin,
        area: &mesh.area,
        slength: sedimentation_length,
        normal_width: config.normal_width,
        bins: mesh.bins.as_ref(),
    };
    let sedimentation = detect_and_estimate(&bed_level.mean, Polarity::Sedimentation, mesh, &params)?;
    let erosion = detect_and_estimate(&bed_level.mean, Polarity::Erosion, mesh, &params)?;
    info!(
        "{} periods, {} slots, sedimentation length {:.1}, {} sedimentation and {} erosion regions",
        periods.len(),
        cycle.len(),
        sedimentation_length,
        sedimentation.len(),
        erosion.len()
    );

    Ok(Impact {
        periods,
        t_stagnant: durations.t_stagnant,
        days: durations.to_days(),
        bed_level,
        sedimentation_length,
        sedimentation,
        erosion,
    })
}

fn detect_and_estimate(
    mean: &[f64],
    polarity: Polarity,
    mesh: &Mesh,
    params: &VolumeParams,
) -> Result<Vec<VolumeEstimate>> {
    let dz = polarity.orient(mean);
    let condition: Vec<bool> = dz.iter().map(|z| *z > params.dzmin).collect();
    let labels = regions::detect(&condition, &mesh.adjacency)?;
    volume::estimate_regions(&dz, &labels, params)
}
