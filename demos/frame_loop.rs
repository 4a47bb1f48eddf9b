//! Frame loop demonstration for cloud_delaunay
//!
//! Loads a procedural sphere in the background, then runs a handful of
//! frames while sweeping the percentage knob and toggling the engine.
//! Run with `RUST_LOG=debug` to see the per-frame events.

use cloud_delaunay::mesh::{sphere_mesh, MeshLoader};
use cloud_delaunay::triangulation::validate::check_delaunay;
use cloud_delaunay::*;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("=== cloud_delaunay Frame Loop Demo ===\n");

    // Step 1: Load the mesh off the main thread
    println!("Step 1: Loading mesh...");
    let mesh = MeshLoader::spawn(|| Ok(sphere_mesh(20_000, 10.0, 42))).wait()?;
    println!("  Vertices: {}", mesh.vertex_count());
    println!("  Triangles: {}", mesh.triangle_count());

    // Step 2: Configure
    let mut config = FrameConfigBuilder::new()
        .base_density(2000.0)?
        .coloring(ColoringMode::Hue)
        .build()?;

    let mut driver = FrameDriver::new(mesh);
    let mut renderer = RecordingRenderer::new();

    // Step 3: Run frames
    println!("\nStep 2: Running frames...");
    println!("  frame  mode  percentage  points  indices  time");
    for (frame, percentage) in [2.0, 1.5, 1.0, 0.5, 0.1, 0.5, 1.0, 2.0].into_iter().enumerate() {
        config.set_percentage(percentage);
        config.mode = if frame % 2 == 0 { EngineMode::Cpu } else { EngineMode::Gpu };

        let stats = driver.run_frame(&config, &mut renderer);

        let report = check_delaunay(
            &renderer.vertices,
            renderer.drawn_indices(),
            config.projection(),
            1e-9,
        );
        println!(
            "  {:>5}  {:<4}  {:>10.1}  {:>6}  {:>7}  {:?}{}",
            stats.frame,
            stats.mode.name(),
            config.percentage,
            stats.sampled_points,
            stats.index_count,
            stats.elapsed,
            if report.is_valid() { "" } else { "  (invalid!)" }
        );
    }

    println!("\n=== Demo Complete ===");
    Ok(())
}
