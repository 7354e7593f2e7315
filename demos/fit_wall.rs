//! Fits a wall around a synthetic settlement and prints the diagnostics.
//!
//! Options can be supplied as a TOML file path in the first argument.

use std::f64::consts::TAU;

use rampart::geometry::{Bastion, BastionDescriptor, District, DistrictRole};
use rampart::math::{direction, from_polar, Point2};
use rampart::{WallInput, WarpOptions, WarpWall};

#[allow(clippy::cast_precision_loss)]
fn ring(n: usize, radius: impl Fn(f64) -> f64) -> Vec<Point2> {
    (0..n)
        .map(|i| {
            let theta = TAU * i as f64 / n as f64;
            from_polar(&Point2::origin(), radius(theta), theta)
        })
        .collect()
}

fn bastion(theta: f64, radius: f64, depth: f64) -> BastionDescriptor {
    let normal = direction(theta);
    let tangent = direction(theta + TAU / 4.0);
    let anchor = Point2::origin() + normal * radius;
    let local = [(-9.0, 0.0), (-10.5, 0.55), (0.0, 1.0), (10.5, 0.55), (9.0, 0.0)];
    BastionDescriptor::from_polygon(Bastion::new(
        local.map(|(u, v)| anchor + tangent * u + normal * (v * depth)),
    ))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Default: WARN for everything, DEBUG for rampart.
    // Override with RUST_LOG (e.g. RUST_LOG=rampart=trace).
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        .add_directive("rampart=debug".parse().unwrap_or_default());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let options = match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            WarpOptions::from_toml_str(&text)?
        }
        None => WarpOptions::default(),
    };

    let lumpy = |theta: f64| 100.0 + 8.0 * (3.0 * theta).sin();
    let input = WallInput {
        center: Point2::origin(),
        curtain: ring(60, lumpy),
        target: Some(ring(60, |theta| lumpy(theta) + 15.0)),
        inner_hull: ring(40, |theta| 78.0 + 6.0 * (3.0 * theta).sin()),
        outer_hull: ring(80, |theta| 150.0 + 10.0 * (2.0 * theta).cos()),
        districts: vec![
            District::new(0.0, 1.5, DistrictRole::Castle),
            District::new(1.5, 4.0, DistrictRole::Craftsmen),
            District::new(4.0, TAU, DistrictRole::Slum),
        ],
        bastions: (0..6)
            .map(|i| {
                let theta = TAU * f64::from(i) / 6.0 + 0.3;
                bastion(theta, lumpy(theta), if i == 2 { 60.0 } else { 16.0 })
            })
            .collect(),
    };

    let output = WarpWall::new(input, options).execute()?;
    let d = &output.diagnostics;
    println!("curtain vertices: {}", output.curtain.len());
    println!("wall vertices:    {}", output.wall.len());
    println!(
        "candidates:       {} ({} clearance misses)",
        output.candidates.len(),
        d.candidates.clearance_misses
    );
    println!("curtain clamps:   {:?}", d.curtain_clamps);
    println!("base clamps:      {:?}", d.bastion_base_clamps);
    for report in &d.bastions {
        println!(
            "bastion {}: ok={} iterations={} placement={:?} shrink={:?}",
            report.index,
            report.ok(),
            report.repair.iterations,
            report.placement,
            report.shrink.map(|s| s.t),
        );
    }
    if let Some(violations) = &d.containment {
        println!("containment violations: {}", violations.len());
    }
    Ok(())
}
