use thiserror::Error;

/// Error type for invalid configurations and inputs.
///
/// Only configuration problems are reported through this type. Numerical degeneracies,
/// infeasible stock targets and mass-balance residues are recovered locally and surface
/// as diagnostics instead.
#[derive(Error, Debug)]
pub enum RECCError {
    #[error("{0}")]
    Error(String),
    #[error("Classification '{classification}' has no item '{item}'")]
    MissingClassificationItem {
        classification: String,
        item: String,
    },
    #[error("No classification registered for aspect '{0}'")]
    MissingClassification(String),
    #[error("Required parameter '{0}' was not supplied")]
    MissingParameter(String),
    #[error("Parameter '{name}' has shape {found:?}, expected {expected:?} from index structure '{structure}'")]
    ShapeMismatch {
        name: String,
        structure: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    #[error("Invalid index structure '{0}'")]
    InvalidIndexStructure(String),
    #[error("Inconsistent selection: {0}")]
    InconsistentSelection(String),
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience type for `Result<T, RECCError>`.
pub type RECCResult<T> = Result<T, RECCError>;
