//! Error type for the morphimpact crate.
use thiserror::Error;

/// Custom error type for the morphimpact crate.
#[derive(Debug, Error)]
pub enum MiError {
    /// Error type from csv crate.
    #[error("Could not serialize/deserialize csv file: {0}")]
    Csv(#[from] csv::Error),
    /// Error type from std::io.
    #[error("Could not read or write file: {0}")]
    Io(#[from] std::io::Error),
    /// A resolved celerity is below zero.
    #[error("invalid negative celerity {celerity} for discharge {discharge}")]
    NegativeCelerity {
        /// Discharge of the offending period.
        discharge: f64,
        /// Celerity resolved for that period.
        celerity: f64,
    },
    /// Every period resolved to a zero celerity.
    #[error("celerities can't all be zero")]
    ZeroCelerities,
    /// Celerity table is empty or not ascending in discharge.
    #[error("invalid celerity table: {0}")]
    CelerityTable(String),
    /// Number of hydraulic fields does not match the tidal flag of a condition.
    #[error("condition at discharge {discharge} has {nfields} field(s), inconsistent with tide = {tide}")]
    NFields {
        /// Discharge of the condition.
        discharge: f64,
        /// Number of fields supplied.
        nfields: usize,
        /// Whether the condition is tidal.
        tide: bool,
    },
    /// Two arrays that must be aligned have different lengths.
    #[error("length mismatch for {name}: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Name of the offending array.
        name: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },
    /// A scalar parameter is outside its valid domain.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f64,
        /// Why the value is rejected.
        reason: &'static str,
    },
    /// An adjacency row references a face outside the mesh.
    #[error("adjacency row {row} references face {face}, mesh has {nfaces} faces")]
    FaceIndex {
        /// Row of the adjacency list.
        row: usize,
        /// Offending face index.
        face: usize,
        /// Number of faces in the mesh.
        nfaces: usize,
    },
    /// Region labelling did not settle within its pass bound.
    #[error("region labelling did not converge after {0} passes")]
    NoConvergence(usize),
    /// No discharge conditions supplied.
    #[error("at least one discharge condition is required")]
    NoConditions,
}

/// Result alias for morphimpact operations.
pub type Result<T> = std::result::Result<T, MiError>;

impl MiError {
    pub(crate) fn invalid(name: &'static str, value: f64, reason: &'static str) -> Self {
        MiError::InvalidParameter {
            name,
            value,
            reason,
        }
    }

    /// Fails with [`MiError::LengthMismatch`] unless `actual == expected`.
    pub(crate) fn check_len(name: &'static str, expected: usize, actual: usize) -> Result<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(MiError::LengthMismatch {
                name,
                expected,
                actual,
            })
        }
    }
}
