//! Error types for the frame pipeline
//!
//! Triangulation never fails: degenerate input is absorbed by the engines.
//! Errors only come from configuration and from the mesh collaborator.

use thiserror::Error;

/// Errors that can occur while configuring the pipeline or loading a mesh
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DelaunayError {
    /// Configuration validation failed
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The background mesh load failed or panicked
    #[error("mesh load failed: {0}")]
    MeshLoad(String),
    /// The mesh source has no vertices to sample
    #[error("mesh has no vertices")]
    EmptyMesh,
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, DelaunayError>;
