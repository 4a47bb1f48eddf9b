//! Spatial indexing for nearest-point queries on projected positions
//!
//! This module is only available with the `spatial-index` feature. The
//! compute kernel uses it to test circumcircles for emptiness without
//! scanning every point.

#[cfg(feature = "spatial-index")]
use glam::DVec2;
#[cfg(feature = "spatial-index")]
use kiddo::immutable::float::kdtree::ImmutableKdTree;
#[cfg(feature = "spatial-index")]
use kiddo::SquaredEuclidean;

/// Wrapper around an immutable 2D KD-tree
///
/// Built once per dispatch from the projected point positions. Items are
/// point indices.
///
/// # Performance
///
/// - Construction: O(n log n)
/// - Query: O(log n)
#[cfg(feature = "spatial-index")]
#[derive(Clone)]
pub struct PointIndex {
    tree: ImmutableKdTree<f64, usize, 2, 32>,
}

#[cfg(feature = "spatial-index")]
impl PointIndex {
    /// Build the index from projected positions
    ///
    /// # Example
    ///
    /// ```
    /// # #[cfg(feature = "spatial-index")]
    /// # {
    /// use cloud_delaunay::spatial::PointIndex;
    /// use glam::DVec2;
    ///
    /// let index = PointIndex::new(&[DVec2::new(0.0, 0.0), DVec2::new(5.0, 5.0)]);
    /// let (nearest, _) = index.nearest(DVec2::new(4.0, 4.5));
    /// assert_eq!(nearest, 1);
    /// # }
    /// ```
    pub fn new(positions: &[DVec2]) -> Self {
        let points: Vec<[f64; 2]> = positions.iter().map(|p| [p.x, p.y]).collect();

        Self {
            tree: ImmutableKdTree::new_from_slice(&points),
        }
    }

    /// Index of the point nearest to `position` and its squared distance
    pub fn nearest(&self, position: DVec2) -> (usize, f64) {
        let result = self.tree.nearest_one::<SquaredEuclidean>(&[position.x, position.y]);
        (result.item, result.distance)
    }
}
