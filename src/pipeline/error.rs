//! Pipeline-specific error types.
//!
//! Two families live here. [`PipelineError`] is returned directly from
//! coordinator calls that fail before anything runs (bad connections,
//! unknown ids). Failures *during* an update are data: each one becomes an
//! [`ErrorRecord`] collected into the update report and stored on the port
//! that was asked for.

use crate::pipeline::id::{AlgorithmId, ConnectionId, InputPortId, PortId};
use crate::pipeline::data::DataKind;
use crate::pipeline::report::UpdateStatus;
use crate::types::Extent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from typed information record access.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InfoError {
    #[error("Information key {key} is not set")]
    Missing { key: &'static str },

    #[error("Information key {key} holds {found}, expected {expected}")]
    KeyTypeMismatch {
        key: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}

/// Errors from building or combining data objects.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("Image over {extent} needs {expected} values, got {found}")]
    LengthMismatch {
        extent: Extent,
        expected: usize,
        found: usize,
    },

    #[error("Cannot combine pieces: {0}")]
    IncompatiblePieces(String),
}

/// Classification of a failure inside an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InputMissing,
    InputTypeMismatch,
    BadRequest,
    CannotSatisfyRequest,
    AlgorithmFailure,
    Cancelled,
    Internal,
    ReentrantUpdate,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InputMissing => "input missing",
            ErrorKind::InputTypeMismatch => "input type mismatch",
            ErrorKind::BadRequest => "bad request",
            ErrorKind::CannotSatisfyRequest => "cannot satisfy request",
            ErrorKind::AlgorithmFailure => "algorithm failure",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Internal => "internal error",
            ErrorKind::ReentrantUpdate => "re-entrant update",
        };
        f.write_str(name)
    }
}

/// Which pass of the update protocol a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pass {
    Information,
    RequestUpdateExtent,
    Execute,
    /// Coordinator-level checks outside any algorithm callback.
    Control,
}

/// Error returned by algorithm callbacks.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}: {message}")]
pub struct AlgorithmError {
    pub kind: ErrorKind,
    pub message: String,
}

impl AlgorithmError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn input_missing(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InputMissing, message)
    }

    pub fn input_type_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InputTypeMismatch, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn cannot_satisfy(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CannotSatisfyRequest, message)
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlgorithmFailure, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "update was cancelled")
    }
}

impl From<InfoError> for AlgorithmError {
    fn from(err: InfoError) -> Self {
        match err {
            InfoError::Missing { .. } => Self::cannot_satisfy(err.to_string()),
            InfoError::KeyTypeMismatch { .. } => Self::internal(err.to_string()),
        }
    }
}

impl From<DataError> for AlgorithmError {
    fn from(err: DataError) -> Self {
        Self::failure(err.to_string())
    }
}

pub type AlgorithmResult<T = ()> = std::result::Result<T, AlgorithmError>;

/// A failure observed during an update, attributed to one algorithm.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub algorithm: AlgorithmId,
    pub algorithm_name: String,
    pub pass: Pass,
    pub kind: ErrorKind,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(
        algorithm: AlgorithmId,
        algorithm_name: impl Into<String>,
        pass: Pass,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            algorithm,
            algorithm_name: algorithm_name.into(),
            pass,
            kind,
            message: message.into(),
            occurred_at: Utc::now(),
        }
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) during {:?}: {}: {}",
            self.algorithm_name, self.algorithm, self.pass, self.kind, self.message
        )
    }
}

/// Errors that can occur within the pipeline system.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Connecting {from:?} to {to:?} would create a cycle")]
    WouldCreateCycle { from: PortId, to: InputPortId },

    #[error("Input {to:?} accepts {accepts:?} but {from:?} produces {produces:?}")]
    TypeIncompatible {
        from: PortId,
        to: InputPortId,
        accepts: DataKind,
        produces: DataKind,
    },

    #[error("Input {0:?} already has a connection")]
    PortFull(InputPortId),

    #[error("No such port: {0}")]
    NoSuchPort(String),

    #[error("No such algorithm: {0}")]
    NoSuchAlgorithm(AlgorithmId),

    #[error("No such connection: {0:?}")]
    NoSuchConnection(ConnectionId),

    #[error("{from:?} is not connected to {to:?}")]
    NotConnected { from: PortId, to: InputPortId },

    #[error("Algorithm {0} is not a {1}")]
    WrongAlgorithmType(AlgorithmId, &'static str),

    #[error("Update re-entered the coordinator from the updating thread")]
    ReentrantUpdate,

    #[error("Update of {port:?} ended {status:?} with {} error(s)", .errors.len())]
    UpdateFailed {
        port: PortId,
        status: UpdateStatus,
        errors: Vec<ErrorRecord>,
    },

    #[error(transparent)]
    Info(#[from] InfoError),

    #[error(transparent)]
    Data(#[from] DataError),
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
