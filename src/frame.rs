//! Per-frame sampling, triangulation and draw submission
//!
//! Every frame the driver walks the mesh at a stride derived from the
//! configured percentage, rebuilds the point set, re-triangulates it with the
//! selected engine and hands both buffers to the renderer.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::{EngineMode, FrameConfig};
use crate::mesh::{MeshSource, VertexColoring};
use crate::point::{Point, PointSet};
use crate::triangulation::{ComputeTriangulator, DelaunayTriangulator, Triangulate};

/// Draw passes issued each frame, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawPass {
    /// Filled triangles with alpha blending
    AlphaFill,
    /// Triangle edges with additive blending
    AdditiveWireframe,
}

impl DrawPass {
    /// Both passes in submission order
    pub const ALL: [DrawPass; 2] = [DrawPass::AlphaFill, DrawPass::AdditiveWireframe];
}

/// Renderer collaborator
///
/// Receives the interleaved vertex buffer, the index buffer and indexed draw
/// calls. `count` never exceeds the number of valid indices, even when the
/// uploaded index buffer is longer.
pub trait Renderer {
    fn upload_vertices(&mut self, vertices: &[Point]);

    fn upload_indices(&mut self, indices: &[u32]);

    /// Draw the first `count` indices
    fn draw_elements(&mut self, count: usize, pass: DrawPass);
}

/// Renderer that keeps the last frame's buffers and draw calls
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    pub vertices: Vec<Point>,
    pub indices: Vec<u32>,
    /// Draw calls since the last vertex upload
    pub draws: Vec<(usize, DrawPass)>,
}

impl RecordingRenderer {
    /// Create a renderer with nothing recorded
    pub fn new() -> Self {
        Self::default()
    }

    /// Indices covered by the most recent draw call
    pub fn drawn_indices(&self) -> &[u32] {
        let count = self.draws.last().map_or(0, |&(count, _)| count);
        &self.indices[..count.min(self.indices.len())]
    }
}

impl Renderer for RecordingRenderer {
    fn upload_vertices(&mut self, vertices: &[Point]) {
        self.vertices.clear();
        self.vertices.extend_from_slice(vertices);
        self.draws.clear();
    }

    fn upload_indices(&mut self, indices: &[u32]) {
        self.indices.clear();
        self.indices.extend_from_slice(indices);
    }

    fn draw_elements(&mut self, count: usize, pass: DrawPass) {
        self.draws.push((count, pass));
    }
}

/// Summary of one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    /// Frame number, starting at 0
    pub frame: u64,
    /// Mesh vertices available for sampling
    pub mesh_vertices: usize,
    /// Sampling stride used this frame
    pub stride: f64,
    pub sampled_points: usize,
    /// Valid indices drawn
    pub index_count: usize,
    pub triangle_count: usize,
    pub mode: EngineMode,
    pub elapsed: Duration,
}

/// Drives the sample, triangulate and draw loop over a mesh
///
/// # Example
///
/// ```rust
/// use cloud_delaunay::*;
/// use cloud_delaunay::mesh::sphere_mesh;
///
/// let mut driver = FrameDriver::new(sphere_mesh(2000, 10.0, 42));
/// let mut renderer = RecordingRenderer::new();
///
/// let config = FrameConfigBuilder::new()
///     .percentage(1.0)
///     .unwrap()
///     .base_density(500.0)
///     .unwrap()
///     .build()
///     .unwrap();
///
/// let stats = driver.run_frame(&config, &mut renderer);
/// assert_eq!(stats.sampled_points, 500);
/// assert_eq!(renderer.draws.len(), 2);
/// ```
#[derive(Debug)]
pub struct FrameDriver<M: MeshSource> {
    mesh: M,
    points: PointSet,
    cpu: DelaunayTriangulator,
    /// Created on the first GPU frame, rebuilt when its options change
    kernel: Option<ComputeTriangulator>,
    frame: u64,
}

impl<M: MeshSource> FrameDriver<M> {
    /// Create a driver over a loaded mesh
    pub fn new(mesh: M) -> Self {
        Self {
            mesh,
            points: PointSet::new(),
            cpu: DelaunayTriangulator::new(),
            kernel: None,
            frame: 0,
        }
    }

    #[inline]
    pub fn mesh(&self) -> &M {
        &self.mesh
    }

    /// Points sampled by the most recent frame
    #[inline]
    pub fn points(&self) -> &PointSet {
        &self.points
    }

    /// Number of frames run so far
    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Rebuild the point set from the mesh
    ///
    /// Walks the mesh with a float accumulator `k += stride` and takes vertex
    /// `⌊k⌋`, so fractional strides still cover the whole mesh. Returns the
    /// stride used.
    pub fn sample(&mut self, config: &FrameConfig) -> f64 {
        let vertex_count = self.mesh.vertex_count();
        let stride = config.stride(vertex_count);

        self.points.clear();
        let total = vertex_count as f64;
        let mut k = 0.0f64;
        while k < total {
            let i = k as usize;
            let color = config
                .coloring
                .color(self.mesh.color(i), (k / total) as f32);
            self.points
                .add_point(Point::new(self.mesh.vertex(i), color, self.mesh.normal(i)));
            k += stride;
        }

        stride
    }

    /// Run one frame: sample, triangulate with the configured engine, draw
    ///
    /// Both draw passes are restricted to the engine's valid index count.
    pub fn run_frame<R: Renderer>(&mut self, config: &FrameConfig, renderer: &mut R) -> FrameStats {
        let start = Instant::now();

        let stride = self.sample(config);
        renderer.upload_vertices(self.points.as_slice());

        let engine: &mut dyn Triangulate = match config.mode {
            EngineMode::Cpu => {
                if self.cpu.options() != &config.triangulator {
                    self.cpu = DelaunayTriangulator::with_options(config.triangulator);
                }
                &mut self.cpu
            }
            EngineMode::Gpu => {
                if self
                    .kernel
                    .as_ref()
                    .is_some_and(|kernel| kernel.options() != &config.kernel)
                {
                    self.kernel = None;
                }
                self.kernel
                    .get_or_insert_with(|| ComputeTriangulator::new(config.kernel))
            }
        };

        let output = engine.triangulate(&self.points);
        let index_count = output.count.min(output.indices.len());
        renderer.upload_indices(output.indices);
        for pass in DrawPass::ALL {
            renderer.draw_elements(index_count, pass);
        }

        let stats = FrameStats {
            frame: self.frame,
            mesh_vertices: self.mesh.vertex_count(),
            stride,
            sampled_points: self.points.len(),
            index_count,
            triangle_count: index_count / 3,
            mode: config.mode,
            elapsed: start.elapsed(),
        };
        self.frame += 1;

        debug!(
            frame = stats.frame,
            mode = stats.mode.name(),
            vertices = stats.mesh_vertices,
            points = stats.sampled_points,
            indices = stats.index_count,
            elapsed = ?stats.elapsed,
            "frame finished"
        );
        stats
    }
}
