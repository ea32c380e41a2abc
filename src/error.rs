//! Error types for leaf construction.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for leaf construction.
pub type LeafResult<T> = Result<T, LeafError>;

/// Which table of [`LeafConfiguration`](crate::LeafConfiguration) a parameter lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParameterKind {
    Double,
    Integer,
}

impl std::fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Double => write!(f, "double"),
            Self::Integer => write!(f, "integer"),
        }
    }
}

/// Errors that abort a leaf build.
///
/// Recoverable conditions (degenerate triangles, polygons closed with too few
/// vertices) are not errors; they are counted in
/// [`BuildDiagnostics`](crate::BuildDiagnostics) and logged.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LeafError {
    /// A parameter the grammar or extruder needs is not defined.
    #[error("{kind} parameter \"{name}\" does not exist")]
    MissingParameter {
        /// Parameter name.
        name: String,
        /// Table the lookup was made in.
        kind: ParameterKind,
    },

    /// A parameter value lies outside its allowed interval.
    #[error("parameter \"{name}\" = {value} is outside [{min}, {max}]")]
    ParameterOutOfRange {
        /// Parameter name.
        name: String,
        /// Offending value.
        value: f64,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },

    /// The configuration is inconsistent in a way not covered above.
    #[error("invalid leaf configuration: {0}")]
    InvalidConfiguration(String),

    /// The backend does not know a material the layer stack refers to.
    #[error("material \"{0}\" is not provided by the geometry backend")]
    UnknownMaterial(String),

    /// Error reading a configuration file.
    #[error("failed to read leaf configuration from {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error parsing a configuration document.
    #[error("failed to parse leaf configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// A join symbol was found with no matching branch.
    #[error("turtle stack underflow: join at symbol {index} has no matching branch")]
    TurtleStackUnderflow {
        /// Position of the offending join in the interpreted sequence.
        index: usize,
    },
}

impl LeafError {
    /// True for errors detected while checking inputs, before any geometry is traced.
    pub fn is_configuration_error(&self) -> bool {
        !matches!(self, Self::TurtleStackUnderflow { .. })
    }
}
