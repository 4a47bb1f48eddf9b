//! Incremental Delaunay triangulation (Bowyer-Watson)
//!
//! Points are inserted one at a time. Each insertion locates a triangle that
//! conflicts with the new point by walking the adjacency graph, grows the
//! cavity of all triangles whose circumcircle contains the point, and fans the
//! cavity boundary to the new point.
//!
//! # Hull handling
//!
//! Instead of a finite super-triangle the mesh is closed with a single
//! symbolic vertex at infinity. Every hull edge `a -> b` carries a ghost
//! triangle `(a, b, ∞)` whose "circumcircle" is the open half-plane left of
//! `a -> b` plus the open segment itself. The real triangles therefore always
//! cover exactly the convex hull of the inserted points.
//!
//! # Degenerate input
//!
//! Nothing here returns an error. Until three non-collinear points exist,
//! points are parked and no triangles exist. Duplicate points and cavities
//! that cannot be repaired numerically are skipped and counted.

use glam::DVec2;
use tracing::{debug, trace, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::predicates::{coincident, in_circumcircle, orientation, strictly_between, Orientation};
use super::{ProjectionPlane, Triangulate, TriangulationOutput};
use crate::point::{Point, PointSet};

/// Vertex id of the point at infinity
const GHOST: usize = usize::MAX;

/// How many times a non star-shaped cavity is grown before the point is dropped
const MAX_CAVITY_REPAIRS: usize = 8;

/// Options for the incremental triangulator
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangulatorOptions {
    /// Relative tolerance of the orientation and in-circle predicates
    pub epsilon: f64,
    /// Relative distance under which two points count as the same point
    pub duplicate_tolerance: f64,
    /// Plane the positions are projected onto
    pub projection: ProjectionPlane,
}

impl Default for TriangulatorOptions {
    fn default() -> Self {
        Self {
            epsilon: 1e-12,
            duplicate_tolerance: 1e-9,
            projection: ProjectionPlane::XY,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Triangle {
    /// Vertex ids, counter-clockwise. May contain `GHOST` once.
    v: [usize; 3],
    /// `n[i]` is the triangle across the edge opposite `v[i]`
    n: [usize; 3],
    alive: bool,
}

impl Triangle {
    #[inline]
    fn is_ghost(&self) -> bool {
        self.v.contains(&GHOST)
    }

    /// Directed edge opposite vertex slot `i`
    #[inline]
    fn edge(&self, i: usize) -> (usize, usize) {
        (self.v[(i + 1) % 3], self.v[(i + 2) % 3])
    }
}

/// Cavity boundary edge `u -> w`, seen from inside the cavity
#[derive(Debug, Clone, Copy)]
struct BoundaryEdge {
    u: usize,
    w: usize,
    outer: usize,
}

/// Incremental Delaunay triangulation engine
///
/// # Example
///
/// ```
/// use cloud_delaunay::{DelaunayTriangulator, Point};
///
/// let mut triangulator = DelaunayTriangulator::new();
/// for (x, y) in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)] {
///     triangulator.add_point(&Point::from_xyz(x, y, 0.0));
/// }
///
/// let indices = triangulator.triangulated_indices();
/// assert_eq!(indices.len(), 6); // two triangles
/// ```
#[derive(Debug, Clone)]
pub struct DelaunayTriangulator {
    options: TriangulatorOptions,
    /// Projected positions by insertion index
    points: Vec<DVec2>,
    triangles: Vec<Triangle>,
    free: Vec<usize>,
    /// First two distinct points seen before the mesh exists
    anchor: Option<(usize, Option<usize>)>,
    /// Points waiting for a non-collinear third point
    parked: Vec<usize>,
    /// Walk start, always a live real triangle once the mesh exists
    hint: Option<usize>,
    skipped: usize,
    // scratch, reused across insertions
    cavity: Vec<usize>,
    boundary: Vec<BoundaryEdge>,
    created: Vec<usize>,
    marks: Vec<u32>,
    epoch: u32,
    published: Vec<u32>,
}

impl Default for DelaunayTriangulator {
    fn default() -> Self {
        Self::new()
    }
}

impl DelaunayTriangulator {
    /// Create an empty triangulator with default options
    pub fn new() -> Self {
        Self::with_options(TriangulatorOptions::default())
    }

    /// Create an empty triangulator with custom options
    pub fn with_options(options: TriangulatorOptions) -> Self {
        Self {
            options,
            points: Vec::new(),
            triangles: Vec::new(),
            free: Vec::new(),
            anchor: None,
            parked: Vec::new(),
            hint: None,
            skipped: 0,
            cavity: Vec::new(),
            boundary: Vec::new(),
            created: Vec::new(),
            marks: Vec::new(),
            epoch: 0,
            published: Vec::new(),
        }
    }

    /// Options this triangulator was built with
    #[inline]
    pub fn options(&self) -> &TriangulatorOptions {
        &self.options
    }

    /// Discard all points and triangles
    ///
    /// Allocations are kept, so a per-frame reset does not reallocate.
    pub fn reset(&mut self) {
        self.points.clear();
        self.triangles.clear();
        self.free.clear();
        self.anchor = None;
        self.parked.clear();
        self.hint = None;
        self.skipped = 0;
        self.cavity.clear();
        self.boundary.clear();
        self.created.clear();
        self.marks.clear();
        self.epoch = 0;
    }

    /// Number of points passed to [`add_point`](Self::add_point) since the last reset
    #[inline]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Number of points that were ignored (duplicates, non-finite, unrepairable)
    #[inline]
    pub fn skipped_count(&self) -> usize {
        self.skipped
    }

    /// Insert one point
    ///
    /// Returns the point's insertion index. Indices are assigned to every
    /// call, including points that end up skipped, so they line up with the
    /// caller's vertex buffer.
    pub fn add_point(&mut self, point: &Point) -> usize {
        let projected = self.options.projection.project(point.xyz());
        self.add_projected(projected)
    }

    /// Insert an already projected 2D position
    pub fn add_projected(&mut self, p: DVec2) -> usize {
        let id = self.points.len();
        self.points.push(p);

        if !p.is_finite() {
            trace!(id, "skipping non-finite point");
            self.skipped += 1;
            return id;
        }

        if self.hint.is_none() {
            self.park(id);
        } else {
            self.insert(id);
        }
        id
    }

    /// Number of real (non-degenerate) triangles
    pub fn triangle_count(&self) -> usize {
        self.triangles().count()
    }

    /// Iterate the real triangles as counter-clockwise index triples
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        let epsilon = self.options.epsilon;
        self.triangles
            .iter()
            .filter(|t| t.alive && !t.is_ghost())
            .filter(move |t| {
                let [a, b, c] = t.v;
                orientation(self.points[a], self.points[b], self.points[c], epsilon)
                    == Orientation::CounterClockwise
            })
            .map(|t| t.v)
    }

    /// Flatten the current triangles into an index buffer, three entries per triangle
    pub fn triangulated_indices(&self) -> Vec<u32> {
        let mut indices = Vec::new();
        self.write_indices(&mut indices);
        indices
    }

    /// Like [`triangulated_indices`](Self::triangulated_indices) but reuses `out`
    pub fn write_indices(&self, out: &mut Vec<u32>) {
        out.clear();
        for [a, b, c] in self.triangles() {
            out.extend_from_slice(&[a as u32, b as u32, c as u32]);
        }
    }

    /// Hold points back until the first non-collinear triple shows up
    fn park(&mut self, id: usize) {
        let eps = self.options.epsilon;
        let tol = self.options.duplicate_tolerance;
        let p = self.points[id];

        match self.anchor {
            None => {
                self.anchor = Some((id, None));
                self.parked.push(id);
            }
            Some((a, None)) => {
                if !coincident(self.points[a], p, tol) {
                    self.anchor = Some((a, Some(id)));
                }
                self.parked.push(id);
            }
            Some((a, Some(b))) => {
                let pa = self.points[a];
                let pb = self.points[b];
                match orientation(pa, pb, p, eps) {
                    Orientation::Collinear => self.parked.push(id),
                    turn => {
                        let first = if turn == Orientation::CounterClockwise {
                            [a, b, id]
                        } else {
                            [a, id, b]
                        };
                        self.bootstrap(first);

                        let parked = std::mem::take(&mut self.parked);
                        for &q in parked.iter().filter(|&&q| q != a && q != b) {
                            self.insert(q);
                        }
                        self.parked = parked;
                        self.parked.clear();
                    }
                }
            }
        }
    }

    /// Build the first triangle and the three ghosts closing it
    fn bootstrap(&mut self, [v0, v1, v2]: [usize; 3]) {
        debug!(v0, v1, v2, "bootstrapping triangulation");

        let real = self.alloc([v0, v1, v2]);
        let g0 = self.alloc([v2, v1, GHOST]);
        let g1 = self.alloc([v0, v2, GHOST]);
        let g2 = self.alloc([v1, v0, GHOST]);
        self.link_by_edges(&[real, g0, g1, g2]);
        self.hint = Some(real);
    }

    fn alloc(&mut self, v: [usize; 3]) -> usize {
        let triangle = Triangle {
            v,
            n: [usize::MAX; 3],
            alive: true,
        };
        match self.free.pop() {
            Some(t) => {
                self.triangles[t] = triangle;
                t
            }
            None => {
                self.triangles.push(triangle);
                self.triangles.len() - 1
            }
        }
    }

    /// Pair up opposite directed edges among the given triangles
    fn link_by_edges(&mut self, ids: &[usize]) {
        for (k, &t) in ids.iter().enumerate() {
            for i in 0..3 {
                let (a, b) = self.triangles[t].edge(i);
                for &s in &ids[k + 1..] {
                    if let Some(j) = (0..3).find(|&j| self.triangles[s].edge(j) == (b, a)) {
                        self.triangles[t].n[i] = s;
                        self.triangles[s].n[j] = t;
                    }
                }
            }
        }
    }

    /// Does point `p` lie inside the (generalised) circumcircle of triangle `t`?
    fn in_conflict(&self, t: usize, p: DVec2) -> bool {
        let v = self.triangles[t].v;
        let eps = self.options.epsilon;

        match v.iter().position(|&x| x == GHOST) {
            Some(g) => {
                let a = self.points[v[(g + 1) % 3]];
                let b = self.points[v[(g + 2) % 3]];
                match orientation(a, b, p, eps) {
                    Orientation::CounterClockwise => true,
                    Orientation::Collinear => strictly_between(a, b, p),
                    Orientation::Clockwise => false,
                }
            }
            None => in_circumcircle(
                self.points[v[0]],
                self.points[v[1]],
                self.points[v[2]],
                p,
                eps,
            ),
        }
    }

    /// Walk from the hint towards `p`
    ///
    /// Returns a real triangle containing `p` or a ghost triangle whose hull
    /// edge sees `p`. Falls back to a linear scan if the walk does not settle.
    fn locate(&self, p: DVec2) -> Option<usize> {
        let eps = self.options.epsilon;
        let mut t = self.hint?;

        for step in 0..self.triangles.len() + 3 {
            let tri = &self.triangles[t];
            if tri.is_ghost() {
                return Some(t);
            }

            let crossed = (0..3).map(|k| (k + step) % 3).find(|&i| {
                let (a, b) = tri.edge(i);
                orientation(self.points[a], self.points[b], p, eps) == Orientation::Clockwise
            });

            match crossed {
                Some(i) => t = tri.n[i],
                None => return Some(t),
            }
        }

        warn!("point location walk did not settle, scanning all triangles");
        (0..self.triangles.len()).find(|&t| self.triangles[t].alive && self.in_conflict(t, p))
    }

    fn next_epoch(&mut self) {
        if self.marks.len() < self.triangles.len() {
            self.marks.resize(self.triangles.len(), 0);
        }
        self.epoch = self.epoch.wrapping_add(1);
        if self.epoch == 0 {
            self.marks.iter_mut().for_each(|m| *m = 0);
            self.epoch = 1;
        }
    }

    /// Breadth-first search of all triangles in conflict with `p`, starting at `seed`
    fn gather_cavity(&mut self, seed: usize, p: DVec2) {
        self.next_epoch();
        self.cavity.clear();
        self.marks[seed] = self.epoch;
        self.cavity.push(seed);

        let mut head = 0;
        while head < self.cavity.len() {
            let t = self.cavity[head];
            head += 1;
            for i in 0..3 {
                let nb = self.triangles[t].n[i];
                if self.marks[nb] != self.epoch && self.in_conflict(nb, p) {
                    self.marks[nb] = self.epoch;
                    self.cavity.push(nb);
                }
            }
        }
    }

    fn collect_boundary(&mut self) {
        self.boundary.clear();
        for &t in &self.cavity {
            let tri = &self.triangles[t];
            for i in 0..3 {
                let nb = tri.n[i];
                if self.marks[nb] != self.epoch {
                    let (u, w) = tri.edge(i);
                    self.boundary.push(BoundaryEdge { u, w, outer: nb });
                }
            }
        }
    }

    /// First real boundary edge that `p` does not see from inside the cavity
    fn reflex_edge(&self, p: DVec2) -> Option<usize> {
        let eps = self.options.epsilon;
        self.boundary
            .iter()
            .find(|e| {
                e.u != GHOST
                    && e.w != GHOST
                    && orientation(self.points[e.u], self.points[e.w], p, eps)
                        != Orientation::CounterClockwise
            })
            .map(|e| e.outer)
    }

    /// The boundary must be a single closed loop for the fan to be manifold
    fn boundary_is_cycle(&self) -> bool {
        self.boundary.iter().all(|e| {
            let starts = self.boundary.iter().filter(|o| o.u == e.u).count();
            let continues = self.boundary.iter().any(|o| o.u == e.w);
            starts == 1 && continues
        })
    }

    /// A cavity vertex missing from the boundary would drop out of the mesh
    fn cavity_hides_vertex(&self) -> bool {
        self.cavity.iter().any(|&t| {
            self.triangles[t]
                .v
                .iter()
                .any(|&v| v != GHOST && !self.boundary.iter().any(|e| e.u == v))
        })
    }

    fn insert(&mut self, id: usize) {
        let p = self.points[id];
        let tol = self.options.duplicate_tolerance;

        let Some(seed) = self.locate(p) else {
            trace!(id, "no conflicting triangle found");
            self.skipped += 1;
            return;
        };

        // an exact repeat sits on a vertex of the located triangle; catch it
        // before the cavity can grow over that vertex's whole star
        let located = self.triangles[seed].v;
        if located
            .iter()
            .any(|&v| v != GHOST && coincident(self.points[v], p, tol))
        {
            trace!(id, "skipping duplicate point");
            self.skipped += 1;
            return;
        }

        self.gather_cavity(seed, p);

        let mut repairs = 0;
        loop {
            self.collect_boundary();
            match self.reflex_edge(p) {
                None => break,
                Some(_) if repairs == MAX_CAVITY_REPAIRS => {
                    trace!(id, "cavity is not star-shaped, skipping point");
                    self.skipped += 1;
                    return;
                }
                Some(outer) => {
                    self.marks[outer] = self.epoch;
                    self.cavity.push(outer);
                    repairs += 1;
                }
            }
        }

        let duplicate = self.boundary.iter().any(|e| {
            (e.u != GHOST && coincident(self.points[e.u], p, tol))
                || (e.w != GHOST && coincident(self.points[e.w], p, tol))
        });
        if duplicate {
            trace!(id, "skipping duplicate point");
            self.skipped += 1;
            return;
        }

        if !self.boundary_is_cycle() || self.cavity_hides_vertex() {
            trace!(id, "cavity boundary is not a simple loop, skipping point");
            self.skipped += 1;
            return;
        }

        self.commit(id);
    }

    /// Replace the cavity with a fan of triangles around point `id`
    fn commit(&mut self, id: usize) {
        for k in 0..self.cavity.len() {
            let t = self.cavity[k];
            self.triangles[t].alive = false;
            self.free.push(t);
        }

        self.created.clear();
        for k in 0..self.boundary.len() {
            let BoundaryEdge { u, w, outer } = self.boundary[k];
            let t = self.alloc([u, w, id]);
            self.triangles[t].n[2] = outer;

            // the outer triangle sees the same edge reversed
            if let Some(j) = (0..3).find(|&j| self.triangles[outer].edge(j) == (w, u)) {
                self.triangles[outer].n[j] = t;
            }
            self.created.push(t);
        }

        // [u, w, p] meets [w, x, p] across the edge (w, p)
        for k in 0..self.created.len() {
            let t = self.created[k];
            let w = self.triangles[t].v[1];
            if let Some(&next) = self
                .created
                .iter()
                .find(|&&s| self.triangles[s].v[0] == w)
            {
                self.triangles[t].n[0] = next;
                self.triangles[next].n[1] = t;
            }
        }

        self.hint = self
            .created
            .iter()
            .copied()
            .find(|&t| !self.triangles[t].is_ghost())
            .or(self.hint);
    }
}

impl Triangulate for DelaunayTriangulator {
    fn name(&self) -> &'static str {
        "cpu-incremental"
    }

    fn triangulate(&mut self, points: &PointSet) -> TriangulationOutput<'_> {
        self.reset();
        for point in points {
            self.add_point(point);
        }

        let mut published = std::mem::take(&mut self.published);
        self.write_indices(&mut published);
        self.published = published;

        debug!(
            points = points.len(),
            triangles = self.published.len() / 3,
            skipped = self.skipped,
            "cpu triangulation finished"
        );

        TriangulationOutput {
            indices: &self.published,
            count: self.published.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triangulation::validate::{check_delaunay, convex_hull, convex_hull_area};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn insert_all(tri: &mut DelaunayTriangulator, coords: &[(f32, f32)]) {
        for &(x, y) in coords {
            tri.add_point(&Point::from_xyz(x, y, 0.0));
        }
    }

    fn random_points(count: usize, seed: u64) -> Vec<Point> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..count)
            .map(|_| Point::from_xyz(rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0), 0.0))
            .collect()
    }

    #[test]
    fn test_fewer_than_three_points() {
        let mut tri = DelaunayTriangulator::new();
        assert!(tri.triangulated_indices().is_empty());

        insert_all(&mut tri, &[(0.0, 0.0)]);
        assert!(tri.triangulated_indices().is_empty());

        insert_all(&mut tri, &[(1.0, 0.0)]);
        assert!(tri.triangulated_indices().is_empty());
    }

    #[test]
    fn test_collinear_points() {
        let mut tri = DelaunayTriangulator::new();
        insert_all(&mut tri, &[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]);
        assert!(tri.triangulated_indices().is_empty());

        // still collinear with many more points
        let more: Vec<(f32, f32)> = (3..50).map(|i| (i as f32, i as f32)).collect();
        insert_all(&mut tri, &more);
        assert!(tri.triangulated_indices().is_empty());
    }

    #[test]
    fn test_single_triangle() {
        let mut tri = DelaunayTriangulator::new();
        insert_all(&mut tri, &[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]);

        let mut indices = tri.triangulated_indices();
        assert_eq!(indices.len(), 3);
        indices.sort();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_clockwise_input_is_emitted_counter_clockwise() {
        let mut tri = DelaunayTriangulator::new();
        insert_all(&mut tri, &[(0.0, 0.0), (0.0, 1.0), (1.0, 0.0)]);

        let t: Vec<[usize; 3]> = tri.triangles().collect();
        assert_eq!(t.len(), 1);
        let [a, b, c] = t[0];
        let pts = [DVec2::new(0.0, 0.0), DVec2::new(0.0, 1.0), DVec2::new(1.0, 0.0)];
        assert!(crate::triangulation::predicates::orient2d(pts[a], pts[b], pts[c]) > 0.0);
    }

    #[test]
    fn test_unit_square() {
        let mut tri = DelaunayTriangulator::new();
        insert_all(&mut tri, &[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)]);

        let triangles: Vec<[usize; 3]> = tri.triangles().collect();
        assert_eq!(triangles.len(), 2);

        // the two triangles share exactly one edge (the diagonal)
        let shared: Vec<usize> = triangles[0]
            .iter()
            .copied()
            .filter(|v| triangles[1].contains(v))
            .collect();
        assert_eq!(shared.len(), 2);
        let mut diagonal = shared.clone();
        diagonal.sort();
        assert!(diagonal == vec![0, 3] || diagonal == vec![1, 2]);

        let points: Vec<Point> = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)]
            .iter()
            .map(|&(x, y)| Point::from_xyz(x, y, 0.0))
            .collect();
        let report = check_delaunay(&points, &tri.triangulated_indices(), ProjectionPlane::XY, 1e-9);
        assert!(report.is_valid(), "{:?}", report);
        assert!((report.total_area - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_points_parked_before_bootstrap_are_inserted() {
        let mut tri = DelaunayTriangulator::new();
        // four collinear points, then one off the line
        insert_all(
            &mut tri,
            &[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0), (1.5, 1.0)],
        );

        // fan from the apex over the three segments of the base
        assert_eq!(tri.triangle_count(), 3);
        let used: std::collections::HashSet<u32> = tri.triangulated_indices().into_iter().collect();
        assert_eq!(used.len(), 5);
    }

    #[test]
    fn test_duplicate_points_are_ignored() {
        let base = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0), (0.4, 0.3)];

        let mut reference = DelaunayTriangulator::new();
        insert_all(&mut reference, &base);

        let mut tri = DelaunayTriangulator::new();
        insert_all(&mut tri, &base);
        insert_all(&mut tri, &base);
        insert_all(&mut tri, &[(0.0, 0.0), (0.4, 0.3)]);

        assert_eq!(tri.triangle_count(), reference.triangle_count());
        assert_eq!(tri.skipped_count(), base.len() + 2);
        assert_eq!(tri.point_count(), base.len() * 2 + 2);
    }

    #[test]
    fn test_duplicates_before_bootstrap() {
        let mut tri = DelaunayTriangulator::new();
        insert_all(&mut tri, &[(0.0, 0.0), (0.0, 0.0), (1.0, 0.0), (0.0, 0.0), (0.0, 1.0)]);
        assert_eq!(tri.triangle_count(), 1);
        assert_eq!(tri.skipped_count(), 2);
    }

    #[test]
    fn test_duplicate_of_interior_vertex_keeps_original() {
        let base = [
            (0.0, 0.0),
            (4.0, 0.0),
            (0.0, 4.0),
            (4.0, 4.0),
            (2.0, 2.1),
            (1.0, 3.0),
            (3.0, 1.0),
        ];
        let mut tri = DelaunayTriangulator::new();
        insert_all(&mut tri, &base);
        let before = tri.triangle_count();
        let star = tri.triangulated_indices().iter().filter(|&&v| v == 4).count();
        assert!(star >= 3);

        insert_all(&mut tri, &[(2.0, 2.1)]);

        let indices = tri.triangulated_indices();
        assert_eq!(tri.triangle_count(), before);
        assert_eq!(tri.skipped_count(), 1);
        assert!(!indices.contains(&7));
        assert_eq!(indices.iter().filter(|&&v| v == 4).count(), star);
    }

    #[test]
    fn test_quantized_duplicates_are_counted() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let mut tri = DelaunayTriangulator::new();
        let mut points = Vec::new();
        let mut first_seen = std::collections::HashMap::new();

        for id in 0..2000u32 {
            let cell = (rng.gen_range(0..30u32), rng.gen_range(0..30u32));
            first_seen.entry(cell).or_insert(id);
            let p = Point::from_xyz(cell.0 as f32, cell.1 as f32, 0.0);
            tri.add_point(&p);
            points.push(p);
        }

        let unique = first_seen.len();
        assert_eq!(tri.skipped_count(), points.len() - unique);

        // only the first point of each cell is referenced
        let indices = tri.triangulated_indices();
        let used: std::collections::HashSet<u32> = indices.iter().copied().collect();
        let firsts: std::collections::HashSet<u32> = first_seen.values().copied().collect();
        assert_eq!(used, firsts);

        let report = check_delaunay(&points, &indices, ProjectionPlane::XY, 1e-9);
        assert!(report.is_valid(), "{:?}", report);
    }

    #[test]
    fn test_non_finite_point_is_skipped() {
        let mut tri = DelaunayTriangulator::new();
        insert_all(&mut tri, &[(0.0, 0.0), (1.0, 0.0), (f32::NAN, 0.5), (0.0, 1.0)]);
        assert_eq!(tri.triangle_count(), 1);
        assert_eq!(tri.skipped_count(), 1);
        // indices still line up with the caller's buffer
        let mut indices = tri.triangulated_indices();
        indices.sort();
        assert_eq!(indices, vec![0, 1, 3]);
    }

    #[test]
    fn test_point_on_hull_edge() {
        let mut tri = DelaunayTriangulator::new();
        insert_all(&mut tri, &[(0.0, 0.0), (2.0, 0.0), (1.0, 2.0), (1.0, 0.0)]);
        assert_eq!(tri.triangle_count(), 2);
    }

    #[test]
    fn test_point_outside_hull_on_edge_line() {
        let mut tri = DelaunayTriangulator::new();
        insert_all(&mut tri, &[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (2.0, 0.0)]);
        // hull is (0,0) (2,0) (0,1) with (1,0) on its edge
        assert_eq!(tri.triangle_count(), 2);
    }

    #[test]
    fn test_euler_count_random() {
        let points = random_points(1000, 7);
        let mut tri = DelaunayTriangulator::new();
        for p in &points {
            tri.add_point(p);
        }

        let projected: Vec<DVec2> = points.iter().map(|p| ProjectionPlane::XY.project(p.xyz())).collect();
        let hull = convex_hull(&projected);
        let h = hull.len();
        let n = points.len();

        assert_eq!(tri.triangle_count(), 2 * n - 2 - h);
        assert!(tri.triangle_count() <= 1998);
        assert!(tri.triangle_count() >= 1998 - 2 * h);
    }

    #[test]
    fn test_delaunay_property_and_area_random() {
        let points = random_points(1000, 99);
        let mut tri = DelaunayTriangulator::new();
        for p in &points {
            tri.add_point(p);
        }

        let indices = tri.triangulated_indices();
        let report = check_delaunay(&points, &indices, ProjectionPlane::XY, 1e-9);
        assert!(report.is_valid(), "{:?}", report);

        let projected: Vec<DVec2> = points.iter().map(|p| ProjectionPlane::XY.project(p.xyz())).collect();
        let hull_area = convex_hull_area(&projected);
        assert!(
            (report.total_area - hull_area).abs() < 1e-9 * hull_area.max(1.0),
            "triangulated area {} != hull area {}",
            report.total_area,
            hull_area
        );
    }

    #[test]
    fn test_reset_is_idempotent() {
        let points = random_points(300, 3);
        let mut tri = DelaunayTriangulator::new();

        for p in &points {
            tri.add_point(p);
        }
        let first = tri.triangle_count();

        tri.reset();
        assert_eq!(tri.point_count(), 0);
        assert!(tri.triangulated_indices().is_empty());

        for p in &points {
            tri.add_point(p);
        }
        assert_eq!(tri.triangle_count(), first);
    }

    #[test]
    fn test_grid_points() {
        // cocircular everywhere: any diagonal choice is valid
        let mut tri = DelaunayTriangulator::new();
        let mut points = Vec::new();
        for y in 0..10 {
            for x in 0..10 {
                let p = Point::from_xyz(x as f32, y as f32, 0.0);
                tri.add_point(&p);
                points.push(p);
            }
        }

        assert_eq!(tri.triangle_count(), 2 * 9 * 9);
        let report = check_delaunay(&points, &tri.triangulated_indices(), ProjectionPlane::XY, 1e-9);
        assert!(report.is_valid(), "{:?}", report);
        assert!((report.total_area - 81.0).abs() < 1e-9);
    }

    #[test]
    fn test_projection_plane_option() {
        let options = TriangulatorOptions {
            projection: ProjectionPlane::XZ,
            ..Default::default()
        };
        let mut tri = DelaunayTriangulator::with_options(options);
        // collinear in XY, a proper triangle in XZ
        tri.add_point(&Point::from_xyz(0.0, 0.0, 0.0));
        tri.add_point(&Point::from_xyz(1.0, 0.0, 0.0));
        tri.add_point(&Point::from_xyz(0.0, 0.0, 1.0));
        assert_eq!(tri.triangle_count(), 1);
    }

    #[test]
    fn test_triangulate_trait_resets_between_calls() {
        let set: PointSet = random_points(200, 11).into_iter().collect();
        let mut tri = DelaunayTriangulator::new();

        let first = tri.triangulate(&set).count;
        let second = tri.triangulate(&set).count;
        assert_eq!(first, second);
        assert_eq!(tri.point_count(), set.len());
    }
}
