#![warn(missing_docs)]
//! NMO tracer specific error structures
use std::{error::Error, fmt::Display};

/// Application specific Result type
pub type NmoResult<T> = std::result::Result<T, NmoError>;

/// Errors that can be returned by the NMO tracer.
///
/// All of these errors occur while setting up a simulation (assembly construction, scene building,
/// reading configuration files). Problems of individual particles during tracing are never reported
/// as errors but tallied as [`Anomaly`](crate::tracer::Anomaly).
#[derive(Debug, PartialEq, Eq)]
pub enum NmoError {
    /// invalid or non-physical configuration parameter (e.g. non-positive mirror count, coinciding foci)
    Configuration(String),
    /// too many surfaces for the capacity of a [`Scene`](crate::scene::Scene)
    CapacityExceeded(String),
    /// inconsistent input geometry detected during the conic algebra (e.g. negative discriminant)
    NumericDegeneracy(String),
    /// a result buffer could not be allocated
    Allocation(String),
    /// errors while reading or writing files
    Io(String),
    /// errors not falling in one of the categories above
    Other(String),
}

impl Display for NmoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(m) => {
                write!(f, "Configuration:{m}")
            }
            Self::CapacityExceeded(m) => {
                write!(f, "CapacityExceeded:{m}")
            }
            Self::NumericDegeneracy(m) => {
                write!(f, "NumericDegeneracy:{m}")
            }
            Self::Allocation(m) => {
                write!(f, "Allocation:{m}")
            }
            Self::Io(m) => {
                write!(f, "Io:{m}")
            }
            Self::Other(m) => write!(f, "NMO Error:Other:{m}"),
        }
    }
}
impl Error for NmoError {}

impl std::convert::From<String> for NmoError {
    fn from(msg: String) -> Self {
        Self::Other(msg)
    }
}
impl std::convert::From<std::io::Error> for NmoError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
