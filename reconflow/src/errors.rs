//! Error types for reconflow operations.
//!
//! Errors are layered: store access failures ([`StoreError`]), artifact
//! file problems ([`ParamError`]), configuration resolution failures
//! ([`ResolveError`]), pipeline assembly failures ([`BuildError`]), and a
//! top-level [`WorkflowError`] that unifies them.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::{EntityKind, ResourceId, StageKind};

/// Errors returned by a resource store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested record does not exist.
    #[error("{entity} record {id} not found")]
    NotFound {
        /// The record's entity kind.
        entity: EntityKind,
        /// The identifier that was requested.
        id: ResourceId,
    },

    /// The storage backend rejected the operation.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(entity: EntityKind, id: ResourceId) -> Self {
        Self::NotFound { entity, id }
    }

    /// Creates a backend error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// Errors raised while reading or writing stage parameter files.
#[derive(Debug, Error)]
pub enum ParamError {
    /// The file could not be opened, read, or written.
    #[error("failed to access parameter file {path}: {source}")]
    Io {
        /// The offending path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The file content is not valid for its expected schema.
    #[error("failed to parse parameter file {path}: {source}")]
    Parse {
        /// The offending path.
        path: PathBuf,
        /// The underlying parse error.
        source: serde_json::Error,
    },
}

impl ParamError {
    /// Creates an I/O access error for `path`.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a parse error for `path`.
    #[must_use]
    pub fn parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised while resolving a stage entry into a runnable
/// configuration.
///
/// Any of these aborts the owning pipeline; a stage never starts with a
/// partially populated configuration.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A store read required by the stage failed.
    #[error("resolving {kind} stage {id}: {source}")]
    Store {
        /// The stage being resolved.
        kind: StageKind,
        /// The stage record identifier.
        id: ResourceId,
        /// The store failure.
        source: StoreError,
    },

    /// An upstream artifact file could not be read or parsed.
    #[error("{0}")]
    Artifact(#[from] ParamError),

    /// An extrinsic entry references calibration parameters that are not
    /// present in the intrinsic set.
    #[error("extrinsic entry references unknown intrinsic {intrinsic_id}")]
    DanglingIntrinsic {
        /// The missing calibration identifier.
        intrinsic_id: ResourceId,
    },
}

impl ResolveError {
    /// Wraps a store failure with the stage it occurred for.
    #[must_use]
    pub fn store(kind: StageKind, id: ResourceId, source: StoreError) -> Self {
        Self::Store { kind, id, source }
    }
}

/// Errors raised while assembling a pipeline.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The requested stage range is inverted.
    #[error("invalid stage range: {start} does not precede {end}")]
    InvalidRange {
        /// The requested first stage.
        start: StageKind,
        /// The requested last stage.
        end: StageKind,
    },

    /// No stage record could be registered, so there is nothing to run.
    #[error("could not register any stage starting from {start}: {reason}")]
    NothingRegistered {
        /// The requested first stage.
        start: StageKind,
        /// Why registration failed.
        reason: String,
    },
}

/// The unified error type for reconflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A store operation failed.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// A parameter file operation failed.
    #[error("{0}")]
    Param(#[from] ParamError),

    /// Stage configuration resolution failed.
    #[error("{0}")]
    Resolve(#[from] ResolveError),

    /// Pipeline assembly failed.
    #[error("{0}")]
    Build(#[from] BuildError),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
