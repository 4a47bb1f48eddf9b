//! Frame configuration and builder
//!
//! One explicit configuration value is handed to every frame. The parameter
//! UI owns a `FrameConfig` and edits it between frames; the frame driver
//! only reads it.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{DelaunayError, Result};
use crate::triangulation::{KernelOptions, ProjectionPlane, TriangulatorOptions};

/// Smallest accepted sampling percentage
pub const MIN_PERCENTAGE: f32 = 0.1;

/// Largest accepted sampling percentage
pub const MAX_PERCENTAGE: f32 = 2.0;

/// Which engine triangulates the sampled points
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineMode {
    /// Sequential incremental insertion
    #[default]
    Cpu,
    /// Compute kernel with an atomic triangle counter
    Gpu,
}

impl EngineMode {
    /// Get a human-readable name for this mode
    pub fn name(self) -> &'static str {
        match self {
            EngineMode::Cpu => "CPU",
            EngineMode::Gpu => "GPU",
        }
    }
}

/// How sampled points are coloured
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ColoringMode {
    /// Keep the mesh vertex colour
    #[default]
    Source,
    /// Hue cycles with the sample position
    Hue,
    /// One colour for every point
    Uniform([f32; 4]),
}

/// Per-frame pipeline configuration
///
/// # Example
///
/// ```rust
/// use cloud_delaunay::*;
///
/// let config = FrameConfigBuilder::new()
///     .percentage(0.5)
///     .unwrap()
///     .mode(EngineMode::Gpu)
///     .build()
///     .unwrap();
///
/// assert_eq!(config.percentage, 0.5);
///
/// # #[cfg(feature = "serde")]
/// # {
/// let json = serde_json::to_string(&config).unwrap();
/// let restored: FrameConfig = serde_json::from_str(&json).unwrap();
/// assert_eq!(config.mode, restored.mode);
/// # }
/// ```
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameConfig {
    /// Sampling knob in `[MIN_PERCENTAGE, MAX_PERCENTAGE]`
    ///
    /// Higher values sample more points. At 1.0 the frame samples roughly
    /// `base_density` points.
    pub percentage: f32,

    /// Points sampled at a percentage of 1.0
    pub base_density: f32,

    /// CPU or GPU triangulation
    pub mode: EngineMode,

    /// Colour applied to the sampled points
    pub coloring: ColoringMode,

    /// Options for the CPU engine
    pub triangulator: TriangulatorOptions,

    /// Options for the compute kernel
    pub kernel: KernelOptions,
}

impl FrameConfig {
    /// Sampling stride for a mesh with `vertex_count` vertices
    ///
    /// `vertex_count / (base_density * percentage)`, never below 1.
    pub fn stride(&self, vertex_count: usize) -> f64 {
        let target = self.base_density as f64 * self.percentage as f64;
        if target <= 0.0 {
            return 1.0;
        }
        (vertex_count as f64 / target).max(1.0)
    }

    /// Projection plane shared by both engines
    #[inline]
    pub fn projection(&self) -> ProjectionPlane {
        self.triangulator.projection
    }

    /// Set the sampling percentage, clamped to the accepted range
    ///
    /// For UI sliders that must never fail mid-frame.
    pub fn set_percentage(&mut self, percentage: f32) {
        if percentage.is_finite() {
            self.percentage = percentage.clamp(MIN_PERCENTAGE, MAX_PERCENTAGE);
        }
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            percentage: MAX_PERCENTAGE,
            base_density: 2000.0,
            mode: EngineMode::default(),
            coloring: ColoringMode::default(),
            triangulator: TriangulatorOptions::default(),
            kernel: KernelOptions::default(),
        }
    }
}

/// Builder for creating FrameConfig with validation
///
/// # Example
///
/// ```rust
/// use cloud_delaunay::*;
///
/// // Use defaults
/// let config = FrameConfigBuilder::new().build().unwrap();
/// assert_eq!(config.mode, EngineMode::Cpu);
///
/// // Out of range percentages are rejected
/// assert!(FrameConfigBuilder::new().percentage(5.0).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct FrameConfigBuilder {
    config: FrameConfig,
}

impl FrameConfigBuilder {
    /// Create a new builder with default values
    ///
    /// Defaults:
    /// - percentage: 2.0
    /// - base_density: 2000
    /// - mode: Cpu
    /// - coloring: Source
    /// - projection: XY
    pub fn new() -> Self {
        Self {
            config: FrameConfig::default(),
        }
    }

    /// Set the sampling percentage
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the percentage is outside `[0.1, 2.0]`
    pub fn percentage(mut self, percentage: f32) -> Result<Self> {
        if !(MIN_PERCENTAGE..=MAX_PERCENTAGE).contains(&percentage) {
            return Err(DelaunayError::InvalidConfig(format!(
                "percentage must be in [{}, {}] (got {})",
                MIN_PERCENTAGE, MAX_PERCENTAGE, percentage
            )));
        }
        self.config.percentage = percentage;
        Ok(self)
    }

    /// Set the number of points sampled at a percentage of 1.0
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the density is not positive
    pub fn base_density(mut self, density: f32) -> Result<Self> {
        if !(density > 0.0 && density.is_finite()) {
            return Err(DelaunayError::InvalidConfig(format!(
                "base density must be positive (got {})",
                density
            )));
        }
        self.config.base_density = density;
        Ok(self)
    }

    /// Select the triangulation engine
    pub fn mode(mut self, mode: EngineMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Select the point colouring
    pub fn coloring(mut self, coloring: ColoringMode) -> Self {
        self.config.coloring = coloring;
        self
    }

    /// Set the projection plane for both engines
    pub fn projection(mut self, projection: ProjectionPlane) -> Self {
        self.config.triangulator.projection = projection;
        self.config.kernel.projection = projection;
        self
    }

    /// Set the CPU engine options
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if a tolerance is negative or not finite
    pub fn triangulator(mut self, options: TriangulatorOptions) -> Result<Self> {
        validate_tolerance("epsilon", options.epsilon)?;
        validate_tolerance("duplicate tolerance", options.duplicate_tolerance)?;
        self.config.triangulator = options;
        Ok(self)
    }

    /// Set the compute kernel options
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the capacity cannot hold one triangle, there
    /// are no workgroups, fewer than two candidates, or a tolerance is invalid
    pub fn kernel(mut self, options: KernelOptions) -> Result<Self> {
        if options.capacity < 3 || options.capacity > u32::MAX as usize {
            return Err(DelaunayError::InvalidConfig(format!(
                "kernel capacity must be in [3, {}] (got {})",
                u32::MAX,
                options.capacity
            )));
        }
        if options.workgroups == 0 {
            return Err(DelaunayError::InvalidConfig(
                "kernel needs at least one workgroup".into(),
            ));
        }
        if options.candidates < 2 {
            return Err(DelaunayError::InvalidConfig(format!(
                "kernel needs at least 2 candidates (got {})",
                options.candidates
            )));
        }
        validate_tolerance("kernel epsilon", options.epsilon)?;
        validate_tolerance("kernel duplicate tolerance", options.duplicate_tolerance)?;
        self.config.kernel = options;
        Ok(self)
    }

    /// Build the configuration
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the two engines were given different
    /// projection planes; use [`projection`](Self::projection) to set both
    pub fn build(self) -> Result<FrameConfig> {
        let cpu = self.config.triangulator.projection;
        let kernel = self.config.kernel.projection;
        if cpu != kernel {
            return Err(DelaunayError::InvalidConfig(format!(
                "kernel projects onto {:?} but the triangulator onto {:?}",
                kernel, cpu
            )));
        }
        Ok(self.config)
    }
}

impl Default for FrameConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_tolerance(name: &str, value: f64) -> Result<()> {
    if value < 0.0 || !value.is_finite() {
        return Err(DelaunayError::InvalidConfig(format!(
            "{} must be finite and >= 0 (got {})",
            name, value
        )));
    }
    Ok(())
}
