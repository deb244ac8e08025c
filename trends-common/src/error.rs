/*
This code is part of the Trends land-cover change analysis tools.
License: MIT
*/

use std::io;
use thiserror::Error;

/// Error type shared by the Trends library crates.
///
/// `Domain` failures come from validating the sampling design or the
/// workspace contents (mismatched block counts, missing ecoregion data,
/// zero pixel totals); the remaining variants wrap lower-level failures.
#[derive(Error, Debug)]
pub enum TrendsError {
    #[error("Trends error: {0}")]
    Domain(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("table error: {0}")]
    Table(String),
}

pub type TrendsResult<T> = Result<T, TrendsError>;

// Tool entry points keep the `Result<(), std::io::Error>` signature, so
// library errors are folded into an io::Error at that boundary.
impl From<TrendsError> for io::Error {
    fn from(err: TrendsError) -> io::Error {
        match err {
            TrendsError::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
        }
    }
}

impl TrendsError {
    /// True for validation failures as opposed to wrapped system errors.
    pub fn is_domain(&self) -> bool {
        matches!(self, TrendsError::Domain(_))
    }
}
