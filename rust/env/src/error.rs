use crate::Continous;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("action '{action}' is not applicable in state '{state}'")]
    ActionNotApplicable { state: String, action: String },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Malformed graph detected at construction. Fatal: no learning starts.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("no transition facts were supplied")]
    Empty,

    #[error("absorbing state '{0}' does not appear in any transition")]
    MissingAbsorbingState(String),

    #[error("state '{0}' has no actions")]
    NoActions(String),

    #[error("transition {from}/{action}/{to} has invalid probability {probability}")]
    InvalidProbability {
        from: String,
        action: String,
        to: String,
        probability: Continous,
    },

    #[error("probabilities of action '{action}' in state '{state}' sum to {sum}, expected 1")]
    ProbabilitySum {
        state: String,
        action: String,
        sum: Continous,
    },
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line {line}: expected 'from/action/to/probability', got {fields} field(s)")]
    FieldCount { line: usize, fields: usize },

    #[error("line {line}: field {field} is empty")]
    EmptyField { line: usize, field: usize },

    #[error("line {line}: '{value}' is not a probability")]
    Probability { line: usize, value: String },

    #[error("cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
