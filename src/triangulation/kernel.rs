//! Compute-kernel triangulation
//!
//! Mirrors the contract of the GPU path: one invocation per point, a shared
//! fixed-capacity index buffer, and a single 32-bit atomic counter that is
//! reset before every dispatch. Invocations run on the rayon pool in at most
//! `workgroups` ranges, and only talk to each other through the atomics, the
//! way shader invocations would.
//!
//! # Algorithm
//!
//! 1. Duplicate pass: an invocation marks its point as shadowed if an
//!    earlier point coincides with it.
//! 2. Emit pass: invocation `i` takes its nearest candidates from a uniform
//!    grid and, for every pair `j < k` with `i < j`, emits the triangle
//!    `(i, j, k)` when it is non-degenerate and no point lies strictly inside
//!    its circumcircle.
//!
//! In general position every emitted triangle is a true Delaunay triangle,
//! but triangles whose vertices are not mutual near neighbours (long hull
//! slivers) can be missed, and cocircular input may emit overlapping
//! triangles. The kernel is a fast variant, not an exact replica of
//! [`DelaunayTriangulator`](super::DelaunayTriangulator).

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use glam::DVec2;
use rayon::prelude::*;
use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::predicates::{circumcircle, coincident, in_circumcircle, orientation, Orientation};
use super::{ProjectionPlane, Triangulate, TriangulationOutput};
use crate::point::PointSet;

#[cfg(feature = "spatial-index")]
use crate::spatial::PointIndex;

/// Target number of points per grid cell
const POINTS_PER_CELL: f64 = 2.0;

/// Options for the compute kernel
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelOptions {
    /// Index buffer capacity in indices (not triangles)
    pub capacity: usize,
    /// Upper bound on the ranges the invocations are split into
    pub workgroups: usize,
    /// Nearest neighbours each invocation pairs up
    pub candidates: usize,
    /// Relative tolerance of the predicates
    pub epsilon: f64,
    /// Relative distance under which two points count as the same point
    pub duplicate_tolerance: f64,
    /// Plane the positions are projected onto
    pub projection: ProjectionPlane,
}

impl Default for KernelOptions {
    fn default() -> Self {
        Self {
            capacity: 3 * 32_768,
            workgroups: rayon::current_num_threads(),
            candidates: 12,
            epsilon: 1e-12,
            duplicate_tolerance: 1e-9,
            projection: ProjectionPlane::XY,
        }
    }
}

/// Counter state read back after a dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KernelReadback {
    /// Indices the invocations tried to write (raw counter value)
    pub requested: usize,
    /// Indices actually stored and safe to draw
    pub valid: usize,
    /// The counter ran past the buffer capacity
    pub overflowed: bool,
}

/// Device-side buffers shared by all invocations
///
/// The index buffer is never cleared: entries past the counter keep whatever
/// an earlier dispatch wrote there.
#[derive(Debug)]
pub struct KernelBuffers {
    indices: Vec<AtomicU32>,
    counter: AtomicU32,
}

impl KernelBuffers {
    /// Allocate an index buffer holding `capacity` indices
    pub fn new(capacity: usize) -> Self {
        Self {
            indices: (0..capacity).map(|_| AtomicU32::new(0)).collect(),
            counter: AtomicU32::new(0),
        }
    }

    /// Buffer capacity in indices
    #[inline]
    pub fn capacity(&self) -> usize {
        self.indices.len()
    }

    /// Zero the counter before a dispatch
    pub fn reset_counter(&self) {
        self.counter.store(0, Ordering::Release);
    }

    /// Raw counter value
    pub fn counter(&self) -> u32 {
        self.counter.load(Ordering::Acquire)
    }

    /// Reserve three slots and write one triangle
    ///
    /// One atomic add per triangle. The counter saturates instead of
    /// wrapping. Returns false when the triangle did not fit.
    pub fn emit_triangle(&self, triangle: [u32; 3]) -> bool {
        let slot = self
            .counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| Some(c.saturating_add(3)))
            .unwrap_or(u32::MAX) as usize;

        if slot + 3 > self.indices.len() {
            return false;
        }
        for (offset, &index) in triangle.iter().enumerate() {
            self.indices[slot + offset].store(index, Ordering::Relaxed);
        }
        true
    }

    /// Read the counter and clamp it to what the buffer can hold
    pub fn readback(&self) -> KernelReadback {
        let requested = self.counter() as usize;
        let clamped = requested.min(self.capacity());
        KernelReadback {
            requested,
            valid: clamped - clamped % 3,
            overflowed: requested > self.capacity(),
        }
    }

    /// Copy the whole buffer, stale tail included, into `out`
    pub fn map_into(&self, out: &mut Vec<u32>) {
        out.clear();
        out.extend(self.indices.iter().map(|i| i.load(Ordering::Acquire)));
    }
}

/// Uniform grid over the projected points, stored compactly:
/// `items[starts[c]..starts[c + 1]]` are the points of cell `c`
#[derive(Debug)]
struct CandidateGrid {
    origin: DVec2,
    cell: f64,
    cols: usize,
    rows: usize,
    starts: Vec<usize>,
    items: Vec<usize>,
}

impl CandidateGrid {
    /// Bucket `positions` into cells. Non-finite positions go to cell 0.
    fn new(positions: &[DVec2]) -> Self {
        let mut min = DVec2::splat(f64::MAX);
        let mut max = DVec2::splat(f64::MIN);
        let mut finite = 0usize;
        for p in positions.iter().filter(|p| p.is_finite()) {
            min = min.min(*p);
            max = max.max(*p);
            finite += 1;
        }
        if finite == 0 {
            min = DVec2::ZERO;
            max = DVec2::ZERO;
        }
        let extent = (max - min).max(DVec2::splat(f64::MIN_POSITIVE));

        let area = (extent.x * extent.y).max(extent.max_element().powi(2) * 1e-6);
        let cell = (area * POINTS_PER_CELL / finite.max(1) as f64)
            .sqrt()
            .max(f64::MIN_POSITIVE);
        let cols = ((extent.x / cell) as usize + 1).min(4096);
        let rows = ((extent.y / cell) as usize + 1).min(4096);

        let mut grid = Self {
            origin: min,
            cell,
            cols,
            rows,
            starts: vec![0; cols * rows + 1],
            items: vec![0; positions.len()],
        };

        // counting sort into cells
        let cells: Vec<usize> = positions
            .iter()
            .map(|p| if p.is_finite() { grid.cell_of(*p) } else { 0 })
            .collect();
        for &c in &cells {
            grid.starts[c + 1] += 1;
        }
        for c in 0..cols * rows {
            grid.starts[c + 1] += grid.starts[c];
        }
        let mut fill = grid.starts.clone();
        for (i, &c) in cells.iter().enumerate() {
            grid.items[fill[c]] = i;
            fill[c] += 1;
        }
        grid
    }

    fn coords(&self, p: DVec2) -> (usize, usize) {
        let local = (p - self.origin) / self.cell;
        let x = (local.x.max(0.0) as usize).min(self.cols - 1);
        let y = (local.y.max(0.0) as usize).min(self.rows - 1);
        (x, y)
    }

    fn cell_of(&self, p: DVec2) -> usize {
        let (x, y) = self.coords(p);
        y * self.cols + x
    }

    /// Visit every point in the square ring at Chebyshev distance `ring`
    fn for_each_in_ring(&self, center: (usize, usize), ring: usize, mut f: impl FnMut(usize)) {
        let (cx, cy) = (center.0 as isize, center.1 as isize);
        let r = ring as isize;
        for y in cy - r..=cy + r {
            if y < 0 || y >= self.rows as isize {
                continue;
            }
            for x in cx - r..=cx + r {
                if x < 0 || x >= self.cols as isize {
                    continue;
                }
                if (x - cx).abs() != r && (y - cy).abs() != r {
                    continue;
                }
                let c = y as usize * self.cols + x as usize;
                for &item in &self.items[self.starts[c]..self.starts[c + 1]] {
                    f(item);
                }
            }
        }
    }

    /// Up to `count` nearest points to `positions[i]`, excluding `i` and shadowed points
    fn nearest(&self, positions: &[DVec2], shadowed: &[bool], i: usize, count: usize) -> Vec<usize> {
        let p = positions[i];
        let center = self.coords(p);
        let max_ring = self.cols.max(self.rows);

        let mut found = Vec::with_capacity(count * 2);
        let mut ring = 0;
        let mut extra_ring = false;
        while ring <= max_ring {
            self.for_each_in_ring(center, ring, |j| {
                if j != i && !shadowed[j] {
                    found.push(j);
                }
            });
            if extra_ring {
                break;
            }
            // one more ring so points just across a cell border are considered
            if found.len() >= count {
                extra_ring = true;
            }
            ring += 1;
        }

        found.sort_by(|&a, &b| {
            positions[a]
                .distance_squared(p)
                .total_cmp(&positions[b].distance_squared(p))
        });
        found.truncate(count);
        found
    }
}

/// Read-only state shared by all invocations of one dispatch
struct DispatchContext<'a> {
    positions: &'a [DVec2],
    grid: &'a CandidateGrid,
    #[cfg(feature = "spatial-index")]
    index: &'a PointIndex,
    /// Maps kd-tree items back to point indices
    #[cfg(feature = "spatial-index")]
    finite_ids: &'a [usize],
    options: &'a KernelOptions,
}

impl DispatchContext<'_> {
    /// Duplicate pass for invocation `i`
    fn is_shadowed(&self, i: usize) -> bool {
        let p = self.positions[i];
        if !p.is_finite() {
            return true;
        }
        let mut shadowed = false;
        let center = self.grid.coords(p);
        for ring in 0..=1 {
            self.grid.for_each_in_ring(center, ring, |j| {
                if j < i && coincident(self.positions[j], p, self.options.duplicate_tolerance) {
                    shadowed = true;
                }
            });
        }
        shadowed
    }

    /// No point strictly inside the circumcircle of counter-clockwise `abc`
    #[cfg(feature = "spatial-index")]
    fn is_empty_circle(&self, tri: [usize; 3]) -> bool {
        let [a, b, c] = tri.map(|v| self.positions[v]);
        let Some((center, _)) = circumcircle(a, b, c) else {
            return false;
        };
        // anything strictly inside would be nearer to the centre than the vertices
        let (item, _) = self.index.nearest(center);
        let nearest = self.finite_ids[item];
        if tri.contains(&nearest) {
            return true;
        }
        !in_circumcircle(a, b, c, self.positions[nearest], self.options.epsilon)
    }

    #[cfg(not(feature = "spatial-index"))]
    fn is_empty_circle(&self, tri: [usize; 3]) -> bool {
        let [a, b, c] = tri.map(|v| self.positions[v]);
        if circumcircle(a, b, c).is_none() {
            return false;
        }
        self.positions.iter().enumerate().all(|(q, &p)| {
            tri.contains(&q) || !p.is_finite() || !in_circumcircle(a, b, c, p, self.options.epsilon)
        })
    }

    /// Emit pass for invocation `i`
    fn invoke(&self, i: usize, shadowed: &[bool], buffers: &KernelBuffers) {
        if shadowed[i] {
            return;
        }
        let eps = self.options.epsilon;
        let neighbours: Vec<usize> = self
            .grid
            .nearest(self.positions, shadowed, i, self.options.candidates)
            .into_iter()
            .filter(|&j| j > i)
            .collect();

        for (n, &j) in neighbours.iter().enumerate() {
            for &k in &neighbours[n + 1..] {
                let tri = match orientation(self.positions[i], self.positions[j], self.positions[k], eps) {
                    Orientation::CounterClockwise => [i, j, k],
                    Orientation::Clockwise => [i, k, j],
                    Orientation::Collinear => continue,
                };
                if self.is_empty_circle(tri) {
                    buffers.emit_triangle(tri.map(|v| v as u32));
                }
            }
        }
    }
}

/// Triangulation engine following the compute-kernel contract
#[derive(Debug)]
pub struct ComputeTriangulator {
    options: KernelOptions,
    buffers: KernelBuffers,
    /// Host-side copy of the index buffer after the last dispatch
    mapped: Vec<u32>,
    last: KernelReadback,
}

impl ComputeTriangulator {
    /// Allocate the device buffers for the given options
    pub fn new(options: KernelOptions) -> Self {
        Self {
            buffers: KernelBuffers::new(options.capacity),
            options,
            mapped: Vec::new(),
            last: KernelReadback::default(),
        }
    }

    /// Options the buffers were allocated for
    #[inline]
    pub fn options(&self) -> &KernelOptions {
        &self.options
    }

    /// Device buffers, for inspecting the raw counter
    #[inline]
    pub fn buffers(&self) -> &KernelBuffers {
        &self.buffers
    }

    /// Readback of the most recent dispatch
    #[inline]
    pub fn last_readback(&self) -> KernelReadback {
        self.last
    }

    /// Run both kernel passes over `points` and read the counter back
    pub fn dispatch(&mut self, points: &PointSet) -> KernelReadback {
        let start = Instant::now();
        self.buffers.reset_counter();

        let positions: Vec<DVec2> = points
            .iter()
            .map(|p| self.options.projection.project(p.xyz()))
            .collect();

        if positions.len() >= 3 {
            self.run_passes(&positions);
        }

        let readback = self.buffers.readback();
        if readback.overflowed {
            warn!(
                requested = readback.requested,
                capacity = self.buffers.capacity(),
                "kernel index buffer overflowed, clamping draw count"
            );
        }

        self.buffers.map_into(&mut self.mapped);
        self.last = readback;

        debug!(
            points = positions.len(),
            triangles = readback.valid / 3,
            elapsed = ?start.elapsed(),
            "kernel dispatch finished"
        );
        readback
    }

    fn run_passes(&self, positions: &[DVec2]) {
        let finite_ids: Vec<usize> = (0..positions.len())
            .filter(|&i| positions[i].is_finite())
            .collect();
        if finite_ids.len() < 3 {
            return;
        }
        let grid = CandidateGrid::new(positions);

        #[cfg(feature = "spatial-index")]
        let index = {
            let finite: Vec<DVec2> = finite_ids.iter().map(|&i| positions[i]).collect();
            PointIndex::new(&finite)
        };

        let ctx = DispatchContext {
            positions,
            grid: &grid,
            #[cfg(feature = "spatial-index")]
            index: &index,
            #[cfg(feature = "spatial-index")]
            finite_ids: &finite_ids,
            options: &self.options,
        };

        let invocations = positions.len();
        let per_group = invocations.div_ceil(self.options.workgroups.max(1));

        let mut shadowed = vec![false; invocations];
        shadowed
            .par_iter_mut()
            .enumerate()
            .with_min_len(per_group)
            .for_each(|(i, flag)| *flag = ctx.is_shadowed(i));

        let buffers = &self.buffers;
        let shadowed = &shadowed;
        (0..invocations)
            .into_par_iter()
            .with_min_len(per_group)
            .for_each(|i| ctx.invoke(i, shadowed, buffers));
    }
}

impl Triangulate for ComputeTriangulator {
    fn name(&self) -> &'static str {
        "compute-kernel"
    }

    fn triangulate(&mut self, points: &PointSet) -> TriangulationOutput<'_> {
        let readback = self.dispatch(points);
        TriangulationOutput {
            indices: &self.mapped,
            count: readback.valid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::Point;
    use crate::triangulation::validate::check_delaunay;
    use crate::triangulation::DelaunayTriangulator;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    fn point_set(coords: &[(f32, f32)]) -> PointSet {
        coords.iter().map(|&(x, y)| Point::from_xyz(x, y, 0.0)).collect()
    }

    fn random_set(count: usize, seed: u64) -> PointSet {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..count)
            .map(|_| Point::from_xyz(rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0), 0.0))
            .collect()
    }

    fn triangle_set(indices: &[u32]) -> HashSet<[u32; 3]> {
        indices
            .chunks_exact(3)
            .map(|t| {
                let mut sorted = [t[0], t[1], t[2]];
                sorted.sort();
                sorted
            })
            .collect()
    }

    #[test]
    fn test_degenerate_inputs() {
        let mut kernel = ComputeTriangulator::new(KernelOptions::default());

        assert_eq!(kernel.dispatch(&PointSet::new()).valid, 0);
        assert_eq!(kernel.dispatch(&point_set(&[(0.0, 0.0), (1.0, 0.0)])).valid, 0);
        assert_eq!(
            kernel.dispatch(&point_set(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)])).valid,
            0
        );
    }

    #[test]
    fn test_single_triangle() {
        let mut kernel = ComputeTriangulator::new(KernelOptions::default());
        let points = point_set(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]);

        let output = kernel.triangulate(&points);
        let mut indices = output.valid_indices().to_vec();
        assert_eq!(indices.len(), 3);
        indices.sort();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_duplicates_do_not_add_triangles() {
        let mut kernel = ComputeTriangulator::new(KernelOptions::default());
        let points = point_set(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 0.0), (0.0, 0.0)]);

        let readback = kernel.dispatch(&points);
        assert_eq!(readback.valid, 3);
    }

    #[test]
    fn test_random_points_pass_delaunay_check() {
        let points = random_set(500, 21);
        let mut kernel = ComputeTriangulator::new(KernelOptions::default());

        let output = kernel.triangulate(&points);
        assert!(output.count > 0);
        let report = check_delaunay(
            points.as_slice(),
            output.valid_indices(),
            ProjectionPlane::XY,
            1e-9,
        );
        assert!(report.is_valid(), "{:?}", report);
    }

    #[test]
    fn test_kernel_triangles_are_delaunay_triangles() {
        let points = random_set(500, 5);

        let mut cpu = DelaunayTriangulator::new();
        let cpu_triangles = triangle_set(cpu.triangulate(&points).valid_indices());

        let mut kernel = ComputeTriangulator::new(KernelOptions::default());
        let kernel_triangles = triangle_set(kernel.triangulate(&points).valid_indices());

        assert!(kernel_triangles.is_subset(&cpu_triangles));
        assert!(
            kernel_triangles.len() * 10 >= cpu_triangles.len() * 8,
            "kernel found {} of {} triangles",
            kernel_triangles.len(),
            cpu_triangles.len()
        );
    }

    #[test]
    fn test_single_workgroup_matches_many() {
        let points = random_set(200, 8);

        let mut serial = ComputeTriangulator::new(KernelOptions {
            workgroups: 1,
            ..Default::default()
        });
        let mut parallel = ComputeTriangulator::new(KernelOptions {
            workgroups: 7,
            ..Default::default()
        });

        let a = triangle_set(serial.triangulate(&points).valid_indices());
        let b = triangle_set(parallel.triangulate(&points).valid_indices());
        assert_eq!(a, b);
    }

    #[test]
    fn test_options_are_kept() {
        let options = KernelOptions {
            capacity: 30,
            candidates: 6,
            ..Default::default()
        };
        let kernel = ComputeTriangulator::new(options);
        assert_eq!(kernel.options(), &options);
        assert_eq!(kernel.buffers().capacity(), 30);
    }

    #[test]
    fn test_dispatch_inside_small_pool() {
        let points = random_set(300, 13);
        let mut reference = ComputeTriangulator::new(KernelOptions::default());
        let expected = triangle_set(reference.triangulate(&points).valid_indices());

        let pool = rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap();
        let mut kernel = ComputeTriangulator::new(KernelOptions {
            workgroups: 16,
            ..Default::default()
        });
        let found = pool.install(|| triangle_set(kernel.triangulate(&points).valid_indices()));
        assert_eq!(found, expected);
        assert_eq!(kernel.last_readback().valid, expected.len() * 3);
    }

    #[test]
    fn test_counter_saturation_clamps_count() {
        let points = random_set(100, 2);
        let mut kernel = ComputeTriangulator::new(KernelOptions {
            capacity: 10,
            ..Default::default()
        });

        let readback = kernel.dispatch(&points);
        assert!(readback.overflowed);
        assert!(readback.requested > 10);
        assert_eq!(readback.valid, 9);

        let output = kernel.triangulate(&points);
        assert_eq!(output.count, 9);
        assert_eq!(output.indices.len(), 10);
    }

    #[test]
    fn test_stale_entries_past_counter() {
        let mut kernel = ComputeTriangulator::new(KernelOptions::default());
        kernel.dispatch(&random_set(100, 4));

        let output = kernel.triangulate(&point_set(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]));
        assert_eq!(output.count, 3);
        // the previous dispatch's triangles are still sitting in the buffer
        assert!(output.indices[3..].iter().any(|&i| i != 0));
        assert_eq!(output.valid_indices().len(), 3);
    }

    #[test]
    fn test_counter_reset_each_dispatch() {
        let points = random_set(50, 9);
        let mut kernel = ComputeTriangulator::new(KernelOptions::default());

        let first = kernel.dispatch(&points);
        let second = kernel.dispatch(&points);
        assert_eq!(first.requested, second.requested);
        assert_eq!(kernel.buffers().counter() as usize, second.requested);
    }

    #[test]
    fn test_buffers_emit_and_readback() {
        let buffers = KernelBuffers::new(7);
        assert!(buffers.emit_triangle([0, 1, 2]));
        assert!(buffers.emit_triangle([3, 4, 5]));
        assert!(!buffers.emit_triangle([6, 7, 8]));

        let readback = buffers.readback();
        assert_eq!(readback.requested, 9);
        assert_eq!(readback.valid, 6);
        assert!(readback.overflowed);

        let mut mapped = Vec::new();
        buffers.map_into(&mut mapped);
        assert_eq!(&mapped[..6], &[0, 1, 2, 3, 4, 5]);

        buffers.reset_counter();
        assert_eq!(buffers.readback(), KernelReadback::default());
    }

    #[test]
    fn test_non_finite_points_are_ignored() {
        let mut points = point_set(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]);
        points.add_point(Point::from_xyz(f32::NAN, 0.5, 0.0));

        let mut kernel = ComputeTriangulator::new(KernelOptions::default());
        assert_eq!(kernel.dispatch(&points).valid, 3);
    }
}
