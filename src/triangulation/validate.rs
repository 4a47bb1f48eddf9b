//! Delaunay property checker shared by both engines
//!
//! Brute force on purpose: every triangle is tested against every point, so
//! the checker does not depend on any of the engines' data structures.

use glam::DVec2;

use super::predicates::{in_circumcircle, orient2d, orientation, Orientation};
use super::ProjectionPlane;
use crate::point::Point;

/// Result of [`check_delaunay`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DelaunayReport {
    /// Number of complete index triples checked
    pub triangle_count: usize,
    /// Triangles referencing a point that does not exist
    pub out_of_range: Vec<usize>,
    /// Triangles that are collinear or clockwise
    pub degenerate: Vec<usize>,
    /// `(triangle, point)` pairs where the point is strictly inside the circumcircle
    pub violations: Vec<(usize, usize)>,
    /// Sum of the projected triangle areas
    pub total_area: f64,
    /// The index buffer length was not a multiple of three
    pub ragged: bool,
}

impl DelaunayReport {
    /// True when no check failed
    pub fn is_valid(&self) -> bool {
        self.out_of_range.is_empty()
            && self.degenerate.is_empty()
            && self.violations.is_empty()
            && !self.ragged
    }
}

/// Check an index buffer against the empty-circumcircle property
///
/// `epsilon` is the relative tolerance handed to the predicates. Points on a
/// circumcircle (cocircular input) are accepted.
pub fn check_delaunay(
    points: &[Point],
    indices: &[u32],
    projection: ProjectionPlane,
    epsilon: f64,
) -> DelaunayReport {
    let projected: Vec<DVec2> = points.iter().map(|p| projection.project(p.xyz())).collect();
    let mut report = DelaunayReport {
        ragged: indices.len() % 3 != 0,
        ..Default::default()
    };

    for (t, tri) in indices.chunks_exact(3).enumerate() {
        report.triangle_count += 1;

        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if a >= projected.len() || b >= projected.len() || c >= projected.len() {
            report.out_of_range.push(t);
            continue;
        }

        let (pa, pb, pc) = (projected[a], projected[b], projected[c]);
        if orientation(pa, pb, pc, epsilon) != Orientation::CounterClockwise {
            report.degenerate.push(t);
            continue;
        }
        report.total_area += orient2d(pa, pb, pc) * 0.5;

        for (i, &p) in projected.iter().enumerate() {
            if i == a || i == b || i == c || !p.is_finite() {
                continue;
            }
            if in_circumcircle(pa, pb, pc, p, epsilon) {
                report.violations.push((t, i));
            }
        }
    }

    report
}

/// Strict convex hull (no collinear points), counter-clockwise
pub fn convex_hull(points: &[DVec2]) -> Vec<DVec2> {
    let mut sorted: Vec<DVec2> = points.iter().copied().filter(|p| p.is_finite()).collect();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    sorted.dedup();

    if sorted.len() < 3 {
        return sorted;
    }

    let mut hull: Vec<DVec2> = Vec::with_capacity(sorted.len() * 2);
    for pass in 0..2 {
        let start = hull.len();
        let iter: Box<dyn Iterator<Item = &DVec2>> = if pass == 0 {
            Box::new(sorted.iter())
        } else {
            Box::new(sorted.iter().rev())
        };
        for &p in iter {
            while hull.len() >= start + 2
                && orient2d(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0
            {
                hull.pop();
            }
            hull.push(p);
        }
        // the last point of each chain starts the next one
        hull.pop();
    }

    hull
}

/// Area of the convex hull of `points`
pub fn convex_hull_area(points: &[DVec2]) -> f64 {
    let hull = convex_hull(points);
    if hull.len() < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    for i in 0..hull.len() {
        let a = hull[i];
        let b = hull[(i + 1) % hull.len()];
        twice += a.perp_dot(b);
    }
    twice * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point> {
        [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)]
            .iter()
            .map(|&(x, y)| Point::from_xyz(x, y, 0.0))
            .collect()
    }

    #[test]
    fn test_valid_square() {
        let report = check_delaunay(&square(), &[0, 1, 2, 2, 1, 3], ProjectionPlane::XY, 1e-9);
        assert!(report.is_valid(), "{:?}", report);
        assert_eq!(report.triangle_count, 2);
        assert!((report.total_area - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_detects_violation() {
        let mut points = square();
        points.push(Point::from_xyz(0.4, 0.4, 0.0));

        let report = check_delaunay(&points, &[0, 1, 2], ProjectionPlane::XY, 1e-9);
        assert_eq!(report.violations, vec![(0, 4)]);
        assert!(!report.is_valid());
    }

    #[test]
    fn test_detects_degenerate_and_out_of_range() {
        let points = square();
        let report = check_delaunay(&points, &[0, 2, 1, 0, 1, 7], ProjectionPlane::XY, 1e-9);
        assert_eq!(report.degenerate, vec![0]);
        assert_eq!(report.out_of_range, vec![1]);
    }

    #[test]
    fn test_detects_ragged_buffer() {
        let report = check_delaunay(&square(), &[0, 1, 2, 3], ProjectionPlane::XY, 1e-9);
        assert!(report.ragged);
        assert_eq!(report.triangle_count, 1);
    }

    #[test]
    fn test_convex_hull() {
        let points = vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(2.0, 0.0),
            DVec2::new(1.0, 0.0), // on an edge
            DVec2::new(2.0, 2.0),
            DVec2::new(0.0, 2.0),
            DVec2::new(1.0, 1.0), // interior
        ];
        let hull = convex_hull(&points);
        assert_eq!(hull.len(), 4);
        assert!((convex_hull_area(&points) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_convex_hull_degenerate() {
        assert_eq!(convex_hull_area(&[DVec2::ZERO, DVec2::X]), 0.0);
        let line = [DVec2::ZERO, DVec2::X, DVec2::new(2.0, 0.0)];
        assert_eq!(convex_hull_area(&line), 0.0);
    }
}
