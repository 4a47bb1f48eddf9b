//! Colouring of sampled points

use glam::Vec4;

use crate::config::ColoringMode;

/// RGBA color type
pub type VertexColor = [f32; 4];

/// Trait for choosing the colour of a sampled point
pub trait VertexColoring {
    /// Colour for a point sampled from a vertex with colour `source`
    ///
    /// `position` is the sample's place along the mesh, in `[0, 1)`.
    fn color(&self, source: Vec4, position: f32) -> Vec4;
}

/// Keeps the colour stored in the mesh
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceColors;

impl VertexColoring for SourceColors {
    fn color(&self, source: Vec4, _position: f32) -> Vec4 {
        source
    }
}

/// Hue follows the sample position along the mesh
#[derive(Debug, Clone, Copy)]
pub struct HueColors {
    pub saturation: f32,
    pub brightness: f32,
}

impl Default for HueColors {
    fn default() -> Self {
        Self {
            saturation: 0.7,
            brightness: 0.9,
        }
    }
}

impl VertexColoring for HueColors {
    fn color(&self, _source: Vec4, position: f32) -> Vec4 {
        let [r, g, b] = hsv_to_rgb(position, self.saturation, self.brightness);
        Vec4::new(r, g, b, 1.0)
    }
}

/// One colour for every point
#[derive(Debug, Clone, Copy)]
pub struct UniformColor(pub VertexColor);

impl Default for UniformColor {
    fn default() -> Self {
        UniformColor([1.0, 1.0, 1.0, 1.0])
    }
}

impl VertexColoring for UniformColor {
    fn color(&self, _source: Vec4, _position: f32) -> Vec4 {
        Vec4::from_array(self.0)
    }
}

impl VertexColoring for ColoringMode {
    fn color(&self, source: Vec4, position: f32) -> Vec4 {
        match *self {
            ColoringMode::Source => SourceColors.color(source, position),
            ColoringMode::Hue => HueColors::default().color(source, position),
            ColoringMode::Uniform(color) => UniformColor(color).color(source, position),
        }
    }
}

/// HSV to RGB, all components in `[0, 1]`; hue wraps
fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> [f32; 3] {
    let h = hue.rem_euclid(1.0) * 6.0;
    let sector = h.floor();
    let f = h - sector;

    let p = value * (1.0 - saturation);
    let q = value * (1.0 - saturation * f);
    let t = value * (1.0 - saturation * (1.0 - f));

    match sector as u32 % 6 {
        0 => [value, t, p],
        1 => [q, value, p],
        2 => [p, value, t],
        3 => [p, q, value],
        4 => [t, p, value],
        _ => [value, p, q],
    }
}
