//! Mesh source collaborator
//!
//! The frame pipeline only reads a mesh through [`MeshSource`]. File formats
//! and model loading stay with the host application; [`MeshData`] is the
//! plain in-memory form and [`sphere_mesh`] builds a procedural one.

mod colors;
mod fibonacci;
pub mod loader;

pub use colors::{HueColors, SourceColors, UniformColor, VertexColor, VertexColoring};
pub use fibonacci::fibonacci_sphere;
pub use loader::{MeshLoader, PendingMesh};

use glam::{Vec3, Vec4};
use parry3d::math::Point;
use parry3d::transformation;

/// Read-only access to a mesh's vertices and indices
pub trait MeshSource {
    /// Number of vertices
    fn vertex_count(&self) -> usize;

    /// Position of vertex `i`
    fn vertex(&self, i: usize) -> Vec3;

    /// RGBA colour of vertex `i`
    fn color(&self, i: usize) -> Vec4;

    /// Normal of vertex `i`
    fn normal(&self, i: usize) -> Vec3;

    /// Number of entries in the index list
    fn index_count(&self) -> usize;

    /// Entry `i` of the index list
    fn index(&self, i: usize) -> u32;
}

/// Engine-agnostic mesh data
///
/// Attribute vectors may be shorter than `positions`; missing colours read as
/// opaque white and missing normals as zero.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    /// Vertex positions (3D coordinates)
    pub positions: Vec<[f32; 3]>,
    /// Vertex normals
    pub normals: Vec<[f32; 3]>,
    /// Vertex colors (RGBA)
    pub colors: Vec<[f32; 4]>,
    /// Triangle indices
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Get the number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check if mesh is empty
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl MeshSource for MeshData {
    fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    fn vertex(&self, i: usize) -> Vec3 {
        Vec3::from_array(self.positions[i])
    }

    fn color(&self, i: usize) -> Vec4 {
        self.colors.get(i).map_or(Vec4::ONE, |c| Vec4::from_array(*c))
    }

    fn normal(&self, i: usize) -> Vec3 {
        self.normals.get(i).map_or(Vec3::ZERO, |n| Vec3::from_array(*n))
    }

    fn index_count(&self) -> usize {
        self.indices.len()
    }

    fn index(&self, i: usize) -> u32 {
        self.indices[i]
    }
}

/// Build a closed sphere mesh from `count` jittered Fibonacci points
///
/// Faces come from the convex hull of the points. Normals point outwards and
/// colours map the normal to RGB.
///
/// # Arguments
///
/// * `count` - Number of vertices
/// * `radius` - Sphere radius
/// * `seed` - Seed for the jitter
///
/// # Example
///
/// ```rust
/// use cloud_delaunay::mesh::{sphere_mesh, MeshSource};
///
/// let mesh = sphere_mesh(500, 10.0, 42);
/// assert_eq!(mesh.vertex_count(), 500);
/// assert_eq!(mesh.index_count(), 3 * (2 * 500 - 4));
/// ```
pub fn sphere_mesh(count: usize, radius: f32, seed: u64) -> MeshData {
    let points = fibonacci_sphere(count, radius, seed);

    let (positions, indices): (Vec<Vec3>, Vec<u32>) = if points.len() >= 4 {
        let hull_input: Vec<Point<f32>> = points.iter().map(|p| Point::new(p.x, p.y, p.z)).collect();
        let (vertices, triangles) = transformation::convex_hull(&hull_input);
        (
            vertices.iter().map(|p| Vec3::new(p.x, p.y, p.z)).collect(),
            triangles.into_iter().flatten().collect(),
        )
    } else {
        (points, Vec::new())
    };

    let normals: Vec<Vec3> = positions.iter().map(|p| p.normalize_or_zero()).collect();

    MeshData {
        positions: positions.iter().map(|p| p.to_array()).collect(),
        colors: normals
            .iter()
            .map(|n| [n.x * 0.5 + 0.5, n.y * 0.5 + 0.5, n.z * 0.5 + 0.5, 1.0])
            .collect(),
        normals: normals.iter().map(|n| n.to_array()).collect(),
        indices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_mesh() {
        let mesh = sphere_mesh(1000, 5.0, 42);

        assert!(!mesh.is_empty());
        assert_eq!(mesh.vertex_count(), 1000);
        // closed triangulated sphere: F = 2V - 4
        assert_eq!(mesh.triangle_count(), 2 * 1000 - 4);
        assert_eq!(mesh.positions.len(), mesh.normals.len());
        assert_eq!(mesh.positions.len(), mesh.colors.len());
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertex_count()));
    }

    #[test]
    fn test_sphere_mesh_attributes() {
        let mesh = sphere_mesh(200, 3.0, 7);
        for i in 0..mesh.vertex_count() {
            let p = MeshSource::vertex(&mesh, i);
            let n = MeshSource::normal(&mesh, i);
            assert!((p.length() - 3.0).abs() < 1e-3);
            assert!((n.length() - 1.0).abs() < 1e-4);
            assert!(n.dot(p) > 0.0, "normal {} points inwards", i);
            assert_eq!(MeshSource::color(&mesh, i).w, 1.0);
        }
    }

    #[test]
    fn test_sphere_mesh_consistency() {
        let a = sphere_mesh(300, 1.0, 9);
        let b = sphere_mesh(300, 1.0, 9);
        assert_eq!(a.positions, b.positions);
        assert_eq!(a.indices, b.indices);
    }

    #[test]
    fn test_tiny_sphere_has_no_faces() {
        let mesh = sphere_mesh(3, 1.0, 1);
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.index_count(), 0);
        assert!(sphere_mesh(0, 1.0, 1).is_empty());
    }

    #[test]
    fn test_missing_attributes_have_defaults() {
        let mesh = MeshData {
            positions: vec![[1.0, 2.0, 3.0]],
            ..Default::default()
        };
        assert_eq!(MeshSource::vertex(&mesh, 0), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(MeshSource::color(&mesh, 0), Vec4::ONE);
        assert_eq!(MeshSource::normal(&mesh, 0), Vec3::ZERO);
        assert_eq!(mesh.index_count(), 0);
    }
}
