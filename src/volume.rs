//! Sedimentation and erosion volumes of the regions affected by a measure.
//!
//! Two estimates are made per region.  The binned estimate walks each width bin downstream
//! over the chainage bins and only counts the first sedimentation length worth of cells.  The
//! threshold estimate caps the equilibrium volume at the area reached in one year.
use crate::errors::{MiError, Result};
use crate::regions::Labels;
use crate::utils;
use log::debug;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};

/// Yearly impacted streamwise length in metres from the celerity and the active duration of
/// each period.
///
/// # Examples
///
/// ```rust
/// use morphimpact::volume::sedimentation_length;
/// let l = sedimentation_length(&[0.5, 1.5], &[0.2, 0.1])?;
/// assert!((l - 250.0).abs() < 1e-9);
/// # Ok::<(), morphimpact::errors::MiError>(())
/// ```
pub fn sedimentation_length(celerities: &[f64], active: &[f64]) -> Result<f64> {
    MiError::check_len("active durations", celerities.len(), active.len())?;
    let km: f64 = celerities.iter().zip(active).map(|(c, t)| c * t).sum();
    Ok(1000.0 * km)
}

/// Whether a region gains or loses bed level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Polarity {
    /// Bed rises.
    Sedimentation,
    /// Bed lowers.
    Erosion,
}

impl Polarity {
    /// Orient a bed-level change so the regions of this polarity are positive.
    pub fn orient(self, dz: &[f64]) -> Vec<f64> {
        match self {
            Polarity::Sedimentation => dz.to_vec(),
            Polarity::Erosion => dz.iter().map(|z| -z).collect(),
        }
    }
}

/// Intersection of the mesh cells with the width and chainage bins.
///
/// Each piece is the part of one cell that falls in one width bin and one chainage bin.
#[derive(Debug, Clone, PartialEq)]
pub struct Binning {
    /// Source cell of each piece.
    pub siface: Vec<usize>,
    /// Fraction of the source cell area in each piece.
    pub afrac: Vec<f64>,
    /// Width bin of each piece.
    pub wbin: Vec<usize>,
    /// Chainage bin of each piece.
    pub sbin: Vec<usize>,
    /// Width bin edges.
    pub wthresh: Vec<f64>,
    /// Chainage bin edges, ascending.
    pub sthresh: Vec<f64>,
}

impl Binning {
    /// Number of width bins.
    pub fn n_width_bins(&self) -> usize {
        self.wthresh.len().saturating_sub(1)
    }

    /// Number of chainage bins.
    pub fn n_chainage_bins(&self) -> usize {
        self.sthresh.len().saturating_sub(1)
    }

    /// Length of chainage bin `s`.
    pub fn sbin_length(&self, s: usize) -> f64 {
        self.sthresh[s + 1] - self.sthresh[s]
    }

    /// Check the piece arrays are aligned and every index is in range for a mesh of `ncells`.
    pub fn validate(&self, ncells: usize) -> Result<()> {
        let npieces = self.siface.len();
        MiError::check_len("afrac", npieces, self.afrac.len())?;
        MiError::check_len("wbin", npieces, self.wbin.len())?;
        MiError::check_len("sbin", npieces, self.sbin.len())?;
        if self.n_width_bins() == 0 {
            return Err(MiError::invalid(
                "wthresh",
                self.wthresh.len() as f64,
                "needs at least two edges",
            ));
        }
        if self.n_chainage_bins() == 0 {
            return Err(MiError::invalid(
                "sthresh",
                self.sthresh.len() as f64,
                "needs at least two edges",
            ));
        }
        for s in 0..self.n_chainage_bins() {
            let length = self.sbin_length(s);
            if !(length > 0.0) {
                return Err(MiError::invalid("sbin_length", length, "must be positive"));
            }
        }
        if let Some(c) = self.siface.iter().find(|c| **c >= ncells) {
            return Err(MiError::invalid("siface", *c as f64, "cell index out of range"));
        }
        if let Some(w) = self.wbin.iter().find(|w| **w >= self.n_width_bins()) {
            return Err(MiError::invalid("wbin", *w as f64, "width bin out of range"));
        }
        if let Some(s) = self.sbin.iter().find(|s| **s >= self.n_chainage_bins()) {
            return Err(MiError::invalid("sbin", *s as f64, "chainage bin out of range"));
        }
        Ok(())
    }
}

/// Result of the binned volume estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct BinnedVolume {
    /// Weighted volume per width bin.
    pub per_width_bin: Vec<f64>,
    /// Total weighted volume.
    pub total: f64,
    /// Weight of each piece.
    pub weights: Vec<f64>,
    /// Area weighted share of each cell that is counted.
    pub cell_weights: Vec<f64>,
    /// Weighted volume per chainage bin and width bin.
    pub profile: VolumeProfile,
}

/// Binned, distance-decayed volume of the cells where `dz` exceeds `dzmin`.
///  - `area` is the cell area.
///  - `slength` is the sedimentation length available in each width bin.
///
/// Within a width bin the pieces are visited by ascending chainage bin.  Each new chainage
/// bin consumes its length from the sedimentation length; its pieces count with the share of
/// the bin still covered.
pub fn binned_volume(
    dz: &[f64],
    dzmin: f64,
    area: &[f64],
    bins: &Binning,
    slength: f64,
) -> Result<BinnedVolume> {
    let ncells = dz.len();
    MiError::check_len("area", ncells, area.len())?;
    bins.validate(ncells)?;
    let npieces = bins.siface.len();
    let nwidth = bins.n_width_bins();

    let mut weights = vec![0.0; npieces];
    for iw in 0..nwidth {
        let pieces: Vec<usize> = (0..npieces)
            .filter(|p| bins.wbin[*p] == iw && dz[bins.siface[*p]] > dzmin)
            .collect();
        let chainage: Vec<f64> = pieces.iter().map(|p| bins.sbin[*p] as f64).collect();
        let mut remaining = slength;
        let mut previous = None;
        let mut frac = 0.0;
        for k in utils::argsort(&chainage) {
            let p = pieces[k];
            let s = bins.sbin[p];
            if previous != Some(s) {
                let length = bins.sbin_length(s);
                frac = (remaining / length).max(0.0).min(1.0);
                remaining -= length;
                previous = Some(s);
            }
            weights[p] = frac;
        }
    }

    let volumes: Vec<f64> = (0..npieces)
        .map(|p| {
            let c = bins.siface[p];
            weights[p] * dz[c] * area[c] * bins.afrac[p]
        })
        .collect();
    let per_width_bin = utils::bincount(&bins.wbin, &volumes, nwidth);
    let total: f64 = per_width_bin.iter().sum();

    let shares: Vec<f64> = (0..npieces).map(|p| weights[p] * bins.afrac[p]).collect();
    let cell_weights = utils::bincount(&bins.siface, &shares, ncells);

    let mut profile = VolumeProfile::empty(bins);
    for p in 0..npieces {
        profile.volumes[bins.sbin[p]][bins.wbin[p]] += volumes[p];
    }

    Ok(BinnedVolume {
        per_width_bin,
        total,
        weights,
        cell_weights,
        profile,
    })
}

/// Volumes tabulated by chainage bin (rows) and width bin (columns).
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeProfile {
    /// Centre of each chainage bin.
    pub chainage: Vec<f64>,
    /// Label of each width bin.
    pub labels: Vec<String>,
    /// Volume per chainage bin, per width bin.
    pub volumes: Vec<Vec<f64>>,
}

impl VolumeProfile {
    fn empty(bins: &Binning) -> Self {
        let chainage = bins
            .sthresh
            .windows(2)
            .map(|w| (w[0] + w[1]) / 2.0)
            .collect();
        let labels = bins
            .wthresh
            .windows(2)
            .map(|w| format!("{:.1}-{:.1}", w[0], w[1]))
            .collect();
        VolumeProfile {
            chainage,
            labels,
            volumes: vec![vec![0.0; bins.n_width_bins()]; bins.n_chainage_bins()],
        }
    }

    /// Write the profile as an xyz table: a header of quoted labels, then one row per
    /// chainage bin.
    pub fn write_xyz<W: Write>(&self, out: &mut W) -> Result<()> {
        let mut header = vec!["\"chainage\"".to_string()];
        header.extend(self.labels.iter().map(|l| format!("\"{}\"", l)));
        writeln!(out, "{}", header.join(" "))?;
        for (s, row) in self.chainage.iter().zip(&self.volumes) {
            let mut line = format!("{:8.2}", s);
            for v in row {
                line.push_str(&format!(" {:8.2}", v));
            }
            writeln!(out, "{}", line)?;
        }
        Ok(())
    }

    /// Write the xyz table to `path`.
    pub fn save_xyz(&self, path: &str) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.write_xyz(&mut out)?;
        out.flush()?;
        Ok(())
    }
}

/// Result of the threshold volume estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdVolume {
    /// Reported volume.
    pub dvol: f64,
    /// Area of the cells above the threshold.
    pub area_eq: f64,
    /// Equilibrium volume of the cells above the threshold.
    pub dvol_eq: f64,
}

/// Equilibrium volume of the cells where `dz` exceeds `dzmin`, capped at the mean equilibrium
/// change times the area `slength * normal_width` reached within a year.
///
/// # Examples
///
/// ```rust
/// use morphimpact::volume::threshold_volume;
/// let dz = [0.1, 0.2, 0.3, 0.4, 0.5];
/// let area = [100.0, 200.0, 300.0, 400.0, 500.0];
/// let vol = threshold_volume(&dz, 0.2, &area, 10.0, 5.0)?;
/// assert!((vol.dvol - 20.8333).abs() < 1e-4);
/// assert!((vol.area_eq - 1200.0).abs() < 1e-9);
/// assert!((vol.dvol_eq - 500.0).abs() < 1e-9);
/// # Ok::<(), morphimpact::errors::MiError>(())
/// ```
pub fn threshold_volume(
    dz: &[f64],
    dzmin: f64,
    area: &[f64],
    slength: f64,
    normal_width: f64,
) -> Result<ThresholdVolume> {
    MiError::check_len("area", dz.len(), area.len())?;
    let mut area_eq = 0.0;
    let mut dvol_eq = 0.0;
    for (z, a) in dz.iter().zip(area) {
        if *z > dzmin {
            area_eq += a;
            dvol_eq += a * z;
        }
    }
    if area_eq == 0.0 {
        return Ok(ThresholdVolume {
            dvol: 0.0,
            area_eq,
            dvol_eq,
        });
    }
    let dz_eq = dvol_eq / area_eq;
    let area_1y = slength * normal_width;
    let dvol = if area_eq < area_1y {
        dvol_eq
    } else {
        debug!(
            "equilibrium area {:.1} exceeds one-year area {:.1}, capping volume",
            area_eq, area_1y
        );
        dz_eq * area_1y
    };
    Ok(ThresholdVolume {
        dvol,
        area_eq,
        dvol_eq,
    })
}

/// Volume estimates of a single region.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeEstimate {
    /// Label of the region in the detected partition.
    pub label: usize,
    /// Cells belonging to the region.
    pub mask: Vec<bool>,
    /// Threshold estimate.
    pub threshold: ThresholdVolume,
    /// Binned estimate, when the mesh is binned.
    pub binned: Option<BinnedVolume>,
}

impl VolumeEstimate {
    /// Area of the region above the threshold.
    pub fn area(&self) -> f64 {
        self.threshold.area_eq
    }

    /// Binned, threshold and equilibrium volume.
    pub fn volumes(&self) -> [f64; 3] {
        [
            self.binned.as_ref().map_or(0.0, |b| b.total),
            self.threshold.dvol,
            self.threshold.dvol_eq,
        ]
    }
}

/// Parameters shared by the volume estimates of all regions.
#[derive(Debug, Clone, Copy)]
pub struct VolumeParams<'a> {
    /// Minimum change counted.
    pub dzmin: f64,
    /// Cell area.
    pub area: &'a [f64],
    /// Yearly sedimentation length.
    pub slength: f64,
    /// Normal channel width.
    pub normal_width: f64,
    /// Width and chainage binning, if available.
    pub bins: Option<&'a Binning>,
}

/// Estimate the volumes of every region in `labels`, largest area first.
///  - `dz` is the yearly mean bed-level change oriented so the regions are positive.
pub fn estimate_regions(
    dz: &[f64],
    labels: &Labels,
    params: &VolumeParams,
) -> Result<Vec<VolumeEstimate>> {
    MiError::check_len("region labels", dz.len(), labels.labels.len())?;
    let mut estimates = Vec::with_capacity(labels.count);
    for r in 0..labels.count {
        let mask = labels.mask(r);
        let masked: Vec<f64> = dz
            .iter()
            .zip(&mask)
            .map(|(z, k)| if *k { *z } else { 0.0 })
            .collect();
        let threshold = threshold_volume(
            &masked,
            params.dzmin,
            params.area,
            params.slength,
            params.normal_width,
        )?;
        let binned = match params.bins {
            Some(bins) => Some(binned_volume(
                &masked,
                params.dzmin,
                params.area,
                bins,
                params.slength,
            )?),
            None => None,
        };
        debug!(
            "region {}: area {:.1}, volume {:.1}",
            r, threshold.area_eq, threshold.dvol
        );
        estimates.push(VolumeEstimate {
            label: r,
            mask,
            threshold,
            binned,
        });
    }
    estimates.sort_by(|a, b| {
        b.area()
            .partial_cmp(&a.area())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(estimates)
}

/// Stack the volumes of the regions as three rows: binned, threshold and equilibrium.
pub fn volume_matrix(estimates: &[VolumeEstimate]) -> [Vec<f64>; 3] {
    let mut matrix = [Vec::new(), Vec::new(), Vec::new()];
    for e in estimates {
        for (row, v) in matrix.iter_mut().zip(e.volumes().iter()) {
            row.push(*v);
        }
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regions;
    use approx::assert_relative_eq;

    /// Five cells in a single row, one piece per cell, chainage bins of 10 m.
    fn strip() -> Binning {
        Binning {
            siface: vec![0, 1, 2, 3, 4],
            afrac: vec![1.0; 5],
            wbin: vec![0; 5],
            sbin: vec![0, 1, 2, 3, 4],
            wthresh: vec![-5.0, 5.0],
            sthresh: vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0],
        }
    }

    #[test]
    fn threshold_volume_caps() {
        let dz = [0.1, 0.2, 0.3, 0.4, 0.5];
        let area = [100.0, 200.0, 300.0, 400.0, 500.0];
        let vol = threshold_volume(&dz, 0.2, &area, 10.0, 5.0).unwrap();
        assert_relative_eq!(vol.dvol, 500.0 / 1200.0 * 50.0, epsilon = 1e-9);
        assert_relative_eq!(vol.dvol, 20.8333, epsilon = 1e-4);
        assert_relative_eq!(vol.area_eq, 1200.0, epsilon = 1e-9);
        assert_relative_eq!(vol.dvol_eq, 500.0, epsilon = 1e-9);
    }

    #[test]
    fn threshold_volume_uncapped() {
        let dz = [0.3, 0.4];
        let area = [10.0, 20.0];
        let vol = threshold_volume(&dz, 0.2, &area, 100.0, 5.0).unwrap();
        assert_relative_eq!(vol.dvol, vol.dvol_eq, epsilon = 1e-12);
        assert_relative_eq!(vol.dvol_eq, 11.0, epsilon = 1e-12);
    }

    #[test]
    fn threshold_volume_empty_region() {
        let vol = threshold_volume(&[0.0, 0.1], 0.2, &[1.0, 1.0], 0.0, 0.0).unwrap();
        assert_eq!(vol.dvol, 0.0);
        assert_eq!(vol.area_eq, 0.0);
    }

    #[test]
    fn sedimentation_length_budget_decays() {
        let dz = [1.0; 5];
        let area = [2.0; 5];
        let vol = binned_volume(&dz, 0.0, &area, &strip(), 25.0).unwrap();
        assert_eq!(vol.weights, vec![1.0, 1.0, 0.5, 0.0, 0.0]);
        assert_relative_eq!(vol.total, 5.0, epsilon = 1e-12);
        assert_eq!(vol.cell_weights, vec![1.0, 1.0, 0.5, 0.0, 0.0]);
        assert_relative_eq!(vol.profile.volumes[2][0], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn same_chainage_bin_shares_weight() {
        let mut bins = strip();
        bins.sbin = vec![3, 0, 0, 1, 1];
        let dz = [1.0; 5];
        let area = [1.0; 5];
        let vol = binned_volume(&dz, 0.0, &area, &bins, 15.0).unwrap();
        // bin 0 full, bin 1 half, bin 3 beyond the budget
        assert_eq!(vol.weights, vec![0.0, 1.0, 1.0, 0.5, 0.5]);
    }

    #[test]
    fn width_bins_have_own_budget() {
        let bins = Binning {
            siface: vec![0, 1, 2, 3],
            afrac: vec![1.0; 4],
            wbin: vec![0, 0, 1, 1],
            sbin: vec![0, 1, 0, 1],
            wthresh: vec![0.0, 5.0, 10.0],
            sthresh: vec![0.0, 10.0, 20.0],
        };
        let vol = binned_volume(&[1.0, 1.0, 2.0, 2.0], 0.5, &[1.0; 4], &bins, 10.0).unwrap();
        assert_eq!(vol.per_width_bin, vec![1.0, 2.0]);
        assert_eq!(vol.total, 3.0);
    }

    #[test]
    fn cells_below_threshold_skip_budget() {
        let dz = [0.0, 1.0, 1.0, 1.0, 1.0];
        let vol = binned_volume(&dz, 0.1, &[1.0; 5], &strip(), 10.0).unwrap();
        assert_eq!(vol.weights, vec![0.0, 1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn zero_chainage_bin_rejected() {
        let mut bins = strip();
        bins.sthresh = vec![0.0, 10.0, 10.0, 30.0, 40.0, 50.0];
        assert!(binned_volume(&[1.0; 5], 0.0, &[1.0; 5], &bins, 10.0).is_err());
        let mut bins = strip();
        bins.siface[4] = 9;
        assert!(bins.validate(5).is_err());
    }

    #[test]
    fn xyz_table_layout() {
        let dz = [1.0; 5];
        let vol = binned_volume(&dz, 0.0, &[2.0; 5], &strip(), 25.0).unwrap();
        let mut out = Vec::new();
        vol.profile.write_xyz(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "\"chainage\" \"-5.0-5.0\"");
        assert_eq!(lines[1], "    5.00     2.00");
        assert_eq!(lines[3], "   25.00     1.00");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn regions_sorted_by_area() {
        let dz = vec![0.5, 0.5, 0.0, 0.3, 0.3, 0.3];
        let condition: Vec<bool> = dz.iter().map(|z| *z > 0.1).collect();
        let adjacency = [[0, 1], [1, 2], [2, 3], [3, 4], [4, 5]];
        let labels = regions::detect(&condition, &adjacency).unwrap();
        let area = vec![1.0; 6];
        let params = VolumeParams {
            dzmin: 0.1,
            area: &area,
            slength: 100.0,
            normal_width: 10.0,
            bins: None,
        };
        let estimates = estimate_regions(&dz, &labels, &params).unwrap();
        assert_eq!(estimates.len(), 2);
        assert_eq!(estimates[0].label, 1);
        assert_relative_eq!(estimates[0].area(), 3.0);
        assert_relative_eq!(estimates[1].threshold.dvol, 1.0, epsilon = 1e-12);

        let matrix = volume_matrix(&estimates);
        assert_eq!(matrix[0], vec![0.0, 0.0]);
        assert_relative_eq!(matrix[1][0], 0.9, epsilon = 1e-12);
        assert_relative_eq!(matrix[2][1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn erosion_oriented_positive() {
        assert_eq!(Polarity::Erosion.orient(&[0.2, -0.3]), vec![-0.2, 0.3]);
        assert_eq!(Polarity::Sedimentation.orient(&[0.2]), vec![0.2]);
    }
}
