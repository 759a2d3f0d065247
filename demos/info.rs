//! Print the effective tracking configuration and what the simulated runtime reports.
//!
//! Usage: cargo run --example info [-- path/to/config.toml]

use boardtrack::{AnchorDimensions, SimulatedProvider, TrackingConfig, TrackingProvider};

fn main() {
    env_logger::init();

    let mut config = match std::env::args().nth(1) {
        Some(path) => match TrackingConfig::load(&path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => TrackingConfig::default(),
    };
    config.apply_env_overrides();

    let scale = &config.scale;
    println!(
        "Scale:      1 unit = {} {:?} ({:.4} m)",
        scale.ratio(),
        scale.content_scale_unit,
        scale.physical_meters_per_world_unit()
    );
    println!(
        "Gameboard:  at {:?}, scale {}",
        config.anchor.position.as_slice(),
        config.anchor.effective_scale()
    );
    for (name, tracking) in [
        ("Glasses", config.glasses.as_ref().map(|g| g.tracking)),
        ("Primary", config.primary_wand.as_ref().map(|w| w.tracking)),
        ("Secondary", config.secondary_wand.as_ref().map(|w| w.tracking)),
    ] {
        match tracking {
            Some(t) => println!(
                "{:<11} {:?}, reject untracked: {}",
                format!("{}:", name),
                t.failure_mode,
                t.reject_untracked_position_data
            ),
            None => println!("{:<11} not configured", format!("{}:", name)),
        }
    }

    let provider = SimulatedProvider::default();
    let anchor_type = provider.anchor_type().unwrap_or_default();
    println!("Board:      {:?}", anchor_type);
    match AnchorDimensions::query(&provider, anchor_type) {
        Ok(dims) => println!(
            "Dimensions: {:.3} x {:.3} m (with border {:.3} x {:.3} m)",
            dims.playable_x.to_meters(),
            dims.playable_y.to_meters(),
            dims.total_x().to_meters(),
            dims.total_y().to_meters()
        ),
        Err(e) => println!("Dimensions: {}", e),
    }
    match provider.glasses_ipd() {
        Ok(ipd) => println!("IPD:        {:.1} mm", ipd * 1000.0),
        Err(e) => println!("IPD:        {}", e),
    }
}
