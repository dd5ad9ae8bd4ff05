//! Basic demonstration of radiation propagation.
//!
//! Run with: cargo run --example basic_demo
//! Set `RUST_LOG=radsim=debug` to see unresolved sources.

use radsim::{load_radiation_config_from_env, GridId, RadiationSim, TileIndex};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Radiation Propagation - Demo ===\n");

    let (config, path) = load_radiation_config_from_env();
    match path {
        Some(path) => println!("Config: {}", path.display()),
        None => println!("Config: builtin"),
    }

    let mut sim = RadiationSim::new_demo_world();
    sim.set_config(config);
    sim.run_tick();

    print_field(&sim);

    // Turn the strongest source off and run another second of ticks.
    println!("\n--- Disabling source 1 ---\n");
    sim.set_source_enabled(1, false);
    for _ in 0..30 {
        sim.step(1.0 / 30.0);
    }
    print_field(&sim);

    println!("\n=== Final State (JSON) ===\n");
    match sim.snapshot().to_json_pretty() {
        Ok(json) => println!("{}", json),
        Err(err) => eprintln!("failed to serialize snapshot: {}", err),
    }
}

fn print_field(sim: &RadiationSim) {
    let field = sim.field();
    println!("Tick {} ({} fills)", field.tick(), field.len());

    let mut fills: Vec<_> = field.fills().collect();
    fills.sort_by_key(|f| f.source);
    for fill in fills {
        println!(
            "  Source {}: origin=({}, {}) intensity={:.1} tiles={}",
            fill.source.0,
            fill.origin.x,
            fill.origin.y,
            fill.intensity,
            fill.tile_count()
        );
    }
    for id in field.unresolved() {
        println!("  Source {}: no grid under epicenter", id.0);
    }

    // Coarse dose map around the room center.
    let Some(grid) = sim.grids().get(GridId(1)) else {
        return;
    };
    let combined = field.combined(grid.id);
    for y in (4..60).rev().step_by(4) {
        let row: String = (4..60)
            .step_by(2)
            .map(|x| {
                let rads = combined.get(&TileIndex::new(x, y)).copied().unwrap_or(0.0);
                match rads {
                    r if r >= 6.0 => '#',
                    r if r >= 3.0 => '+',
                    r if r > 0.0 => '.',
                    _ => ' ',
                }
            })
            .collect();
        println!("  |{}|", row);
    }
}
