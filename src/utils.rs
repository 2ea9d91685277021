//! Small array helpers shared by the kernel, plus csv import and export.
use crate::errors;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cmp::Ordering;

/// Indices that sort `x` ascending.  The sort is stable, so ties keep their input order.
///
/// # Examples
///
/// ```rust
/// let order = morphimpact::utils::argsort(&[3.0, 1.0, 2.0, 1.0]);
/// assert_eq!(order, vec![1, 3, 2, 0]);
/// ```
pub fn argsort(x: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..x.len()).collect();
    order.sort_by(|a, b| x[*a].partial_cmp(&x[*b]).unwrap_or(Ordering::Equal));
    order
}

/// Sum `weights` into `len` bins addressed by `index`, like a weighted bincount.
///  - `index` and `weights` are aligned; indices at or beyond `len` are ignored.
pub fn bincount(index: &[usize], weights: &[f64], len: usize) -> Vec<f64> {
    let mut bins = vec![0.0; len];
    for (i, w) in index.iter().zip(weights) {
        if let Some(bin) = bins.get_mut(*i) {
            *bin += w;
        }
    }
    bins
}

/// Elementwise maximum across a set of equally long fields.
pub fn field_max(fields: &[Vec<f64>]) -> Vec<f64> {
    fold_fields(fields, f64::max)
}

/// Elementwise minimum across a set of equally long fields.
pub fn field_min(fields: &[Vec<f64>]) -> Vec<f64> {
    fold_fields(fields, f64::min)
}

fn fold_fields(fields: &[Vec<f64>], f: fn(f64, f64) -> f64) -> Vec<f64> {
    match fields.split_first() {
        Some((first, rest)) => {
            let mut acc = first.clone();
            for field in rest {
                acc.iter_mut().zip(field).for_each(|(a, b)| *a = f(*a, *b));
            }
            acc
        }
        None => Vec::new(),
    }
}

/// Read rows of a csv file into a vector of records.
pub fn read<T: DeserializeOwned>(path: &str) -> Result<Vec<T>, errors::MiError> {
    let mut dat = Vec::new();
    let var = std::fs::File::open(path)?;
    let mut rdr = csv::Reader::from_reader(var);
    for result in rdr.deserialize() {
        let row: T = result?;
        dat.push(row);
    }
    Ok(dat)
}

/// Write records to a csv file.
pub fn record<T: Serialize>(rec: &[T], path: &str) -> Result<(), errors::MiError> {
    let mut wtr = csv::Writer::from_path(path)?;
    for i in rec {
        wtr.serialize(i)?;
    }
    wtr.flush()?;
    Ok(())
}
