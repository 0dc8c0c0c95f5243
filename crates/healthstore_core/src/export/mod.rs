//! Health record interchange formats.
//!
//! # Responsibility
//! - Convert health records to and from the `Date,SBP,DBP,HR,Weight` CSV
//!   layout shared with spreadsheet exports.
//!
//! # Invariants
//! - Missing measurements are written as empty cells and read back as `None`.
//! - Import never assigns identities; parsed records are always new.

use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod csv;

/// Failure while exporting or importing records.
#[derive(Debug)]
pub enum TransferError {
    Csv(::csv::Error),
    Io(std::io::Error),
    /// Input header lacks a required column.
    MissingColumn(&'static str),
    Repo(RepoError),
}

impl Display for TransferError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csv(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::MissingColumn(column) => write!(f, "csv header is missing column `{column}`"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Csv(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::MissingColumn(_) => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<::csv::Error> for TransferError {
    fn from(value: ::csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<std::io::Error> for TransferError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<RepoError> for TransferError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}
