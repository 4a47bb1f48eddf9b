//! Triangulation engines
//!
//! Two interchangeable engines implement the [`Triangulate`] capability:
//!
//! - [`DelaunayTriangulator`]: sequential Bowyer-Watson insertion on the CPU
//! - [`ComputeTriangulator`]: a compute-kernel style pass that writes into a
//!   fixed-capacity index buffer and counts triangles with an atomic counter
//!
//! Both triangulate the 2D projection of the input positions selected by
//! [`ProjectionPlane`], and both are checked with [`validate::check_delaunay`].

pub mod predicates;
mod incremental;
mod kernel;
pub mod validate;

pub use incremental::{DelaunayTriangulator, TriangulatorOptions};
pub use kernel::{ComputeTriangulator, KernelBuffers, KernelOptions, KernelReadback};

use glam::{DVec2, Vec3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::point::PointSet;

/// Plane the 3D positions are projected onto before triangulating
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectionPlane {
    /// Drop z
    #[default]
    XY,
    /// Drop y
    XZ,
    /// Drop x
    YZ,
}

impl ProjectionPlane {
    /// Project a position onto this plane, widening to `f64`
    #[inline]
    pub fn project(self, p: Vec3) -> DVec2 {
        match self {
            ProjectionPlane::XY => DVec2::new(p.x as f64, p.y as f64),
            ProjectionPlane::XZ => DVec2::new(p.x as f64, p.z as f64),
            ProjectionPlane::YZ => DVec2::new(p.y as f64, p.z as f64),
        }
    }
}

/// Pick the projection plane with the largest spread
///
/// Drops the axis along which the positions vary least.
pub fn best_projection_plane(positions: &[Vec3]) -> ProjectionPlane {
    if positions.is_empty() {
        return ProjectionPlane::XY;
    }

    let mut min = Vec3::splat(f32::MAX);
    let mut max = Vec3::splat(f32::MIN);
    for pos in positions {
        min = min.min(*pos);
        max = max.max(*pos);
    }
    let extent = max - min;

    if extent.z <= extent.x && extent.z <= extent.y {
        ProjectionPlane::XY
    } else if extent.y <= extent.x && extent.y <= extent.z {
        ProjectionPlane::XZ
    } else {
        ProjectionPlane::YZ
    }
}

/// Index buffer published by an engine for one pass
///
/// `indices` is the whole buffer the engine owns. Only the first `count`
/// entries are valid; anything past it may be stale data from an earlier
/// pass and must never be drawn.
#[derive(Debug, Clone, Copy)]
pub struct TriangulationOutput<'a> {
    pub indices: &'a [u32],
    pub count: usize,
}

impl<'a> TriangulationOutput<'a> {
    /// The valid prefix of the index buffer
    #[inline]
    pub fn valid_indices(&self) -> &'a [u32] {
        &self.indices[..self.count.min(self.indices.len())]
    }

    /// Number of complete triangles in the valid prefix
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.count / 3
    }
}

/// A triangulation engine: points in, grouped index triples out
pub trait Triangulate {
    /// Short engine name for logs
    fn name(&self) -> &'static str;

    /// Triangulate the given points from scratch
    fn triangulate(&mut self, points: &PointSet) -> TriangulationOutput<'_>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::Point;

    #[test]
    fn test_projection() {
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(ProjectionPlane::XY.project(p), DVec2::new(1.0, 2.0));
        assert_eq!(ProjectionPlane::XZ.project(p), DVec2::new(1.0, 3.0));
        assert_eq!(ProjectionPlane::YZ.project(p), DVec2::new(2.0, 3.0));
    }

    #[test]
    fn test_best_projection_plane() {
        let flat_z = [Vec3::new(0.0, 0.0, 0.0), Vec3::new(5.0, 4.0, 0.1)];
        assert_eq!(best_projection_plane(&flat_z), ProjectionPlane::XY);

        let flat_y = [Vec3::new(0.0, 0.0, 0.0), Vec3::new(5.0, 0.1, 4.0)];
        assert_eq!(best_projection_plane(&flat_y), ProjectionPlane::XZ);

        let flat_x = [Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.1, 5.0, 4.0)];
        assert_eq!(best_projection_plane(&flat_x), ProjectionPlane::YZ);

        assert_eq!(best_projection_plane(&[]), ProjectionPlane::XY);
    }

    #[test]
    fn test_output_valid_prefix() {
        let buffer = [0, 1, 2, 9, 9, 9];
        let output = TriangulationOutput { indices: &buffer, count: 3 };
        assert_eq!(output.valid_indices(), &[0, 1, 2]);
        assert_eq!(output.triangle_count(), 1);
    }

    #[test]
    fn test_engines_are_interchangeable() {
        let points: PointSet = [
            (0.0, 0.0),
            (1.0, 0.0),
            (0.0, 1.0),
            (1.0, 1.0),
            (0.3, 0.6),
        ]
        .iter()
        .map(|&(x, y)| Point::from_xyz(x, y, 0.0))
        .collect();

        let mut engines: Vec<Box<dyn Triangulate>> = vec![
            Box::new(DelaunayTriangulator::new()),
            Box::new(ComputeTriangulator::new(KernelOptions::default())),
        ];

        for engine in engines.iter_mut() {
            let name = engine.name();
            let output = engine.triangulate(&points);
            assert!(output.count > 0, "{} produced no triangles", name);
            assert_eq!(output.count % 3, 0);

            let report = validate::check_delaunay(
                points.as_slice(),
                output.valid_indices(),
                ProjectionPlane::XY,
                1e-9,
            );
            assert!(report.is_valid(), "{} failed validation: {:?}", name, report);
        }
    }
}
