//! Walk a wand through a tracking dropout under each failure mode.
//!
//! Usage: cargo run --example simulate

use boardtrack::{
    ControllerIndex, ControllerPosition, FailureMode, Pose, RigTargets, SimulatedProvider,
    TrackingConfig, TrackingContext,
};
use nalgebra::{UnitQuaternion, Vector3};

fn main() {
    env_logger::init();

    for mode in [
        FailureMode::FreezePosition,
        FailureMode::FreezePositionAndRotation,
        FailureMode::SnapToDefault,
    ] {
        println!("== {:?} ==", mode);
        run(mode);
        println!();
    }
}

fn run(mode: FailureMode) {
    let mut config = TrackingConfig::default();
    if let Some(wand) = config.primary_wand.as_mut() {
        wand.tracking.failure_mode = mode;
    }
    let mut provider = SimulatedProvider::default();
    let mut context = TrackingContext::new();
    let mut aim = Pose::identity();

    for frame in 0..6 {
        let yaw = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), frame as f64 * 0.2);
        provider.set_wand_pose(
            ControllerIndex::Primary,
            &Pose::new(Vector3::new(0.1 * frame as f64, 0.1, 0.0), yaw),
        );
        if (2..5).contains(&frame) {
            provider.invalidate_wand(ControllerIndex::Primary);
        }

        let mut targets = RigTargets::default();
        targets.primary_wand.aim = Some(&mut aim);
        if let Err(e) = context.update(&provider, &mut config, &mut targets) {
            eprintln!("Frame {}: {}", frame, e);
            continue;
        }

        let wand = context.wand(ControllerIndex::Primary);
        let grip = wand.position(ControllerPosition::Grip);
        println!(
            "frame {}  {:<9}  grip [{:7.3} {:7.3} {:7.3}]  aim [{:7.3} {:7.3} {:7.3}]",
            frame,
            format!("{:?}", wand.tracking_state()),
            grip.x,
            grip.y,
            grip.z,
            aim.position.x,
            aim.position.y,
            aim.position.z,
        );
    }
}
