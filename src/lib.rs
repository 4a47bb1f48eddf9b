//! Per-frame Delaunay triangulation of subsampled mesh point clouds
//!
//! Every frame a mesh is sampled at a user-tunable percentage, the sampled
//! point cloud is re-triangulated and the resulting vertex and index buffers
//! are handed to a renderer. Two interchangeable engines are provided:
//!
//! - [`DelaunayTriangulator`]: incremental Bowyer-Watson insertion on the CPU
//! - [`ComputeTriangulator`]: a compute-kernel pass writing into a fixed-size
//!   index buffer with an atomic triangle counter
//!
//! # Quick Start
//!
//! ```rust
//! use cloud_delaunay::*;
//! use cloud_delaunay::mesh::sphere_mesh;
//!
//! let config = FrameConfigBuilder::new()
//!     .percentage(0.5)
//!     .unwrap()
//!     .base_density(1000.0)
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! let mut driver = FrameDriver::new(sphere_mesh(5000, 10.0, 42));
//! let mut renderer = RecordingRenderer::new();
//!
//! let stats = driver.run_frame(&config, &mut renderer);
//! println!("{} points, {} triangles", stats.sampled_points, stats.triangle_count);
//! ```
//!
//! # Features
//!
//! - `spatial-index` (default): KD-tree emptiness queries in the compute kernel
//! - `serde`: Serialization support for configuration and points

// Modules
pub mod error;
pub mod config;
pub mod point;
pub mod triangulation;
pub mod mesh;
pub mod frame;

#[cfg(feature = "spatial-index")]
pub mod spatial;

// Re-export core types for convenience
pub use error::{DelaunayError, Result};
pub use config::{
    ColoringMode, EngineMode, FrameConfig, FrameConfigBuilder, MAX_PERCENTAGE, MIN_PERCENTAGE,
};
pub use point::{Point, PointSet};
pub use triangulation::{
    ComputeTriangulator, DelaunayTriangulator, KernelOptions, KernelReadback, ProjectionPlane,
    Triangulate, TriangulationOutput, TriangulatorOptions,
};
pub use mesh::{MeshData, MeshSource};
pub use frame::{DrawPass, FrameDriver, FrameStats, RecordingRenderer, Renderer};

// Re-export glam vector types used in the public API
pub use glam::{Vec3, Vec4};
