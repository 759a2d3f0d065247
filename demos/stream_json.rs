//! Stream simulated head and wand poses as JSON lines.
//!
//! The glasses orbit the gameboard and the wands sweep in front of them. Every
//! fourth second the primary wand drops out so the failure mode can be seen.
//!
//! {"t":12,"head":[0.0,10.0,-10.0],"head_tracked":true,"primary":[...],"primary_tracked":false}
//!
//! Usage: cargo run --example stream_json [-- frames]

use boardtrack::{
    AnchorType, ControllerIndex, ControllerPosition, Pose, RigTargets, SimulatedProvider,
    TrackingConfig, TrackingContext,
};
use nalgebra::{UnitQuaternion, Vector3};
use std::io::{self, Write};

const FRAME_RATE: u32 = 60;

fn main() {
    env_logger::init();

    let frames: u32 = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(FRAME_RATE * 10);

    let mut config = TrackingConfig::default();
    config.apply_env_overrides();
    let mut provider = SimulatedProvider::default();
    let mut context = TrackingContext::new();

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    for t in 0..frames {
        let seconds = t as f64 / FRAME_RATE as f64;
        animate(&mut provider, seconds);

        if let Err(e) = context.update(&provider, &mut config, &mut RigTargets::default()) {
            eprintln!("Frame {}: {}", t, e);
        }

        let head = context.glasses().pose_world().position;
        let primary = context.wand(ControllerIndex::Primary);
        let grip = primary.position(ControllerPosition::Grip);
        let written = writeln!(
            out,
            "{{\"t\":{},\"head\":[{:.4},{:.4},{:.4}],\"head_tracked\":{},\"primary\":[{:.4},{:.4},{:.4}],\"primary_tracked\":{},\"state\":\"{:?}\"}}",
            t,
            head.x,
            head.y,
            head.z,
            context.glasses().is_tracked(),
            grip.x,
            grip.y,
            grip.z,
            primary.is_tracked(),
            primary.tracking_state(),
        )
        .and_then(|()| out.flush());
        if let Err(e) = written {
            eprintln!("Output closed: {}", e);
            break;
        }
    }
}

fn animate(provider: &mut SimulatedProvider, seconds: f64) {
    let angle = seconds * 0.5;
    let head = Pose::new(
        Vector3::new(0.5 * angle.sin(), 0.5, -0.5 * angle.cos()),
        UnitQuaternion::from_euler_angles(45f64.to_radians(), -angle, 0.0),
    );
    provider.set_glasses_pose(&head, AnchorType::Le);

    let sweep = (seconds * 2.0).sin() * 0.1;
    for (index, side) in [(ControllerIndex::Primary, 0.15), (ControllerIndex::Secondary, -0.15)] {
        let grip = Pose::new(
            Vector3::new(side + sweep, 0.1, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), sweep),
        );
        provider.set_wand_pose(index, &grip);
    }
    if (seconds as u32) % 4 == 3 {
        provider.invalidate_wand(ControllerIndex::Primary);
    }
}
