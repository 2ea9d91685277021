//! Contiguous areas of changed cells on an unstructured mesh.
//!
//! Cells are linked through a face adjacency list, one row per shared edge.  Labels spread
//! along the edges by repeated minimum passes until nothing changes.
use crate::errors::{MiError, Result};
use log::debug;

/// Connected components of the cells meeting a condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    /// Region index per cell, -1 where the condition fails.
    pub labels: Vec<i64>,
    /// Number of regions.
    pub count: usize,
}

impl Labels {
    /// Boolean mask of region `r`.
    pub fn mask(&self, r: usize) -> Vec<bool> {
        self.labels.iter().map(|l| *l == r as i64).collect()
    }
}

/// Label the connected regions of the cells where `condition` holds.
///  - `condition` flags the cells of interest.
///  - `adjacency` lists pairs of cells sharing an edge.
///
/// Regions are numbered in order of their first cell.
///
/// # Examples
///
/// ```rust
/// use morphimpact::regions::detect;
/// let condition = [true, false, true, true, false];
/// let adjacency = [[0, 1], [1, 2], [3, 4], [4, 0], [2, 3]];
/// let regions = detect(&condition, &adjacency)?;
/// assert_eq!(regions.labels, vec![0, -1, 1, 1, -1]);
/// assert_eq!(regions.count, 2);
/// # Ok::<(), morphimpact::errors::MiError>(())
/// ```
pub fn detect(condition: &[bool], adjacency: &[[usize; 2]]) -> Result<Labels> {
    let nfaces = condition.len();
    for (row, pair) in adjacency.iter().enumerate() {
        for face in pair {
            if *face >= nfaces {
                return Err(MiError::FaceIndex {
                    row,
                    face: *face,
                    nfaces,
                });
            }
        }
    }

    let mut labels = vec![-1i64; nfaces];
    let mut ncells = 0i64;
    for (label, flag) in labels.iter_mut().zip(condition) {
        if *flag {
            *label = ncells;
            ncells += 1;
        }
    }

    let edges: Vec<[usize; 2]> = adjacency
        .iter()
        .filter(|pair| condition[pair[0]] && condition[pair[1]])
        .cloned()
        .collect();

    // every pass that changes something lowers a label, so a pass per cell is plenty
    let max_passes = ncells as usize + 1;
    let mut passes = 0;
    let mut changed = true;
    while changed {
        if passes == max_passes {
            return Err(MiError::NoConvergence(passes));
        }
        passes += 1;
        changed = false;
        for [a, b] in &edges {
            let (la, lb) = (labels[*a], labels[*b]);
            if la != lb {
                let low = la.min(lb);
                labels[*a] = low;
                labels[*b] = low;
                changed = true;
            }
        }
    }

    let mut survivors: Vec<i64> = labels.iter().cloned().filter(|l| *l >= 0).collect();
    survivors.sort_unstable();
    survivors.dedup();
    let mut dense = vec![-1i64; ncells as usize];
    for (i, l) in survivors.iter().enumerate() {
        dense[*l as usize] = i as i64;
    }
    for label in labels.iter_mut().filter(|l| **l >= 0) {
        *label = dense[*label as usize];
    }
    debug!(
        "{} regions among {} cells after {} passes",
        survivors.len(),
        ncells,
        passes
    );

    Ok(Labels {
        labels,
        count: survivors.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isolated_cell_and_pair() {
        let regions = detect(
            &[true, false, true, true, false],
            &[[0, 1], [1, 2], [3, 4], [4, 0], [2, 3]],
        )
        .unwrap();
        assert_eq!(regions.labels, vec![0, -1, 1, 1, -1]);
        assert_eq!(regions.count, 2);
        assert_eq!(regions.mask(1), vec![false, false, true, true, false]);
    }

    #[test]
    fn chain_in_reverse_order_settles() {
        // edges listed against the labelling direction need several passes
        let n = 8;
        let adjacency: Vec<[usize; 2]> = (1..n).rev().map(|i| [i, i - 1]).collect();
        let regions = detect(&vec![true; n], &adjacency).unwrap();
        assert_eq!(regions.count, 1);
        assert!(regions.labels.iter().all(|l| *l == 0));
    }

    #[test]
    fn regions_numbered_by_first_cell() {
        let condition = [false, true, true, false, true, true, true];
        let adjacency = [[1, 2], [2, 3], [3, 4], [5, 6], [4, 5]];
        let regions = detect(&condition, &adjacency).unwrap();
        assert_eq!(regions.labels, vec![-1, 0, 0, -1, 1, 1, 1]);
        assert_eq!(regions.count, 2);
    }

    #[test]
    fn nothing_selected() {
        let regions = detect(&[false, false], &[[0, 1]]).unwrap();
        assert_eq!(regions.labels, vec![-1, -1]);
        assert_eq!(regions.count, 0);
        let empty = detect(&[], &[]).unwrap();
        assert_eq!(empty.count, 0);
    }

    #[test]
    fn out_of_range_face_rejected() {
        match detect(&[true, true], &[[0, 1], [1, 2]]) {
            Err(MiError::FaceIndex { row, face, nfaces }) => {
                assert_eq!((row, face, nfaces), (1, 2, 2));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
