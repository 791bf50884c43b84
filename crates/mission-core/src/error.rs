use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of every [`MissionError`].
///
/// Callers that only care about the category of a failure (exit codes,
/// retry decisions, JSON error envelopes) match on this instead of the
/// individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    Malformed,
    Io,
    Conflict,
}

#[derive(Debug, Error)]
pub enum MissionError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(
        "invalid backlog item type '{0}': must be one of feature, bugfix, decomposed, refactor, future"
    )]
    InvalidItemType(String),

    #[error("invalid diagnosis status '{0}': must be investigating, confirmed, or inconclusive")]
    InvalidStatus(String),

    #[error("invalid confidence '{0}': must be low, medium, or high")]
    InvalidConfidence(String),

    #[error("invalid transition from {from} to {to}: {reason}")]
    InvalidTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("invalid mission id '{0}': must be alphanumeric with '.', '_' or '-'")]
    InvalidMissionId(String),

    #[error("backlog item not found: {0}")]
    ItemNotFound(String),

    #[error("checkpoint not found: {0}")]
    CheckpointNotFound(String),

    #[error("no diagnosis found: run 'mission diagnosis create' first")]
    DiagnosisNotFound,

    #[error("no active mission: .mission/mission.md is missing")]
    MissionNotFound,

    #[error("malformed document {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("pattern marker '{0}' appears more than once in the backlog")]
    DuplicatePattern(String),

    #[error("counter of '{0}' cannot be incremented any further")]
    CounterOverflow(String),

    #[error("repository has no commits yet: create an initial commit before checkpointing")]
    NoHead,

    #[error("git {args} failed: {stderr}")]
    Git { args: String, stderr: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl MissionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MissionError::InvalidArgument(_)
            | MissionError::InvalidItemType(_)
            | MissionError::InvalidStatus(_)
            | MissionError::InvalidConfidence(_)
            | MissionError::InvalidTransition { .. }
            | MissionError::InvalidMissionId(_) => ErrorKind::InvalidArgument,
            MissionError::ItemNotFound(_)
            | MissionError::CheckpointNotFound(_)
            | MissionError::DiagnosisNotFound
            | MissionError::MissionNotFound => ErrorKind::NotFound,
            MissionError::Malformed { .. } | MissionError::Yaml(_) => ErrorKind::Malformed,
            MissionError::DuplicatePattern(_) | MissionError::CounterOverflow(_) => {
                ErrorKind::Conflict
            }
            MissionError::NoHead
            | MissionError::Git { .. }
            | MissionError::Io(_)
            | MissionError::Json(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        MissionError::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MissionError>;
