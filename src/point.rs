//! Point records and the per-frame point set
//!
//! A [`Point`] is laid out exactly like one record of the interleaved vertex
//! buffer the renderer consumes (position, color, normal), so a `&[Point]`
//! can be uploaded as-is via [`bytemuck::cast_slice`].

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single sampled vertex
///
/// Only the position takes part in triangulation. Color and normal are
/// carried through untouched for rendering.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Point {
    /// Homogeneous position, `w` is always 1
    pub position: Vec4,
    /// RGBA color
    pub color: Vec4,
    /// Vertex normal, `w` is 0
    pub normal: Vec4,
}

impl Point {
    /// Create a point from a 3D position, color and normal
    pub fn new(position: Vec3, color: Vec4, normal: Vec3) -> Self {
        Self {
            position: position.extend(1.0),
            color,
            normal: normal.extend(0.0),
        }
    }

    /// White point with a zero normal, handy for plain coordinates
    pub fn from_xyz(x: f32, y: f32, z: f32) -> Self {
        Self::new(Vec3::new(x, y, z), Vec4::ONE, Vec3::ZERO)
    }

    /// Position without the homogeneous coordinate
    #[inline]
    pub fn xyz(&self) -> Vec3 {
        self.position.truncate()
    }
}

/// Working set of points for the current frame
///
/// Indices returned by [`PointSet::add_point`] are stable until the next
/// [`PointSet::clear`]. No deduplication is performed.
#[derive(Debug, Clone, Default)]
pub struct PointSet {
    points: Vec<Point>,
}

impl PointSet {
    /// Create an empty point set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty point set with room for `capacity` points
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    /// Remove all points, keeping the allocation
    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Append a point and return its index, valid until the next clear
    pub fn add_point(&mut self, point: Point) -> usize {
        self.points.push(point);
        self.points.len() - 1
    }

    /// Number of points
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the set is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get a point by index
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Point> {
        self.points.get(index)
    }

    /// All points in insertion order
    #[inline]
    pub fn as_slice(&self) -> &[Point] {
        &self.points
    }

    /// Iterate over the points in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, Point> {
        self.points.iter()
    }

    /// 3D positions in insertion order
    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.points.iter().map(Point::xyz)
    }

    /// Raw bytes of the interleaved vertex buffer
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.points)
    }
}

impl FromIterator<Point> for PointSet {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a PointSet {
    type Item = &'a Point;
    type IntoIter = std::slice::Iter<'a, Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
