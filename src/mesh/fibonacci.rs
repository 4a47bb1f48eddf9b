//! Jittered Fibonacci sphere points
//!
//! Points are placed along the golden spiral and pushed a little along the
//! tangent plane, so the procedural test mesh has no regular rows that would
//! make its projection cocircular.

use glam::Vec3;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::f32::consts::PI;

/// Golden ratio φ = (1 + √5) / 2
const PHI: f32 = 1.618033988749895;

/// Jitter as a fraction of the average point spacing
const JITTER_STRENGTH: f32 = 0.3;

/// Offset of the first and last point from the poles
fn pole_offset(n: usize) -> f32 {
    match n {
        0..=23 => 0.33,
        24..=176 => 1.33,
        177..=889 => 3.33,
        890..=10999 => 10.0,
        _ => 27.5,
    }
}

/// Generate `count` points on a sphere of `radius`
///
/// Deterministic for a given `seed`.
pub fn fibonacci_sphere(count: usize, radius: f32, seed: u64) -> Vec<Vec3> {
    if count == 0 {
        return Vec::new();
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let offset = pole_offset(count);
    let n = count as f32;
    let jitter_amount = (4.0 * PI / n).sqrt() * JITTER_STRENGTH;

    (0..count)
        .map(|i| {
            let i_f = i as f32;
            let theta = 2.0 * PI * i_f / PHI;
            let cos_phi = 1.0 - 2.0 * (i_f + offset) / (n - 1.0 + 2.0 * offset);
            let sin_phi = (1.0 - cos_phi * cos_phi).max(0.0).sqrt();
            let base = Vec3::new(sin_phi * theta.cos(), sin_phi * theta.sin(), cos_phi);

            let jitter_theta: f32 = rng.gen_range(0.0..2.0 * PI);
            let jitter_mag: f32 = rng.gen_range(0.0..jitter_amount);

            let up = if base.z.abs() < 0.9 { Vec3::Z } else { Vec3::X };
            let tangent1 = base.cross(up).normalize();
            let tangent2 = base.cross(tangent1).normalize();

            let jittered = base
                + tangent1 * jitter_mag * jitter_theta.cos()
                + tangent2 * jitter_mag * jitter_theta.sin();

            jittered.normalize() * radius
        })
        .collect()
}
