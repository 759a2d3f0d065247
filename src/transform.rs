//! Coordinate conversions between provider, gameboard and world frames.
//!
//! Frames:
//! - provider gameboard space: +x right, +y forward, +z up (right-handed)
//! - gameboard space: +x right, +y up, +z forward, origin at the board center
//! - world space: the application's frame, reached through [`AnchorConfig`]
//!
//! All functions here are pure.

use crate::settings::{AnchorConfig, ScaleSettings};
use crate::types::Pose;
use nalgebra::{Quaternion, UnitQuaternion, Vector3};

/// Norm below which a provider quaternion carries no usable rotation.
///
/// The runtime zeroes invalid samples out entirely.
const DEGENERATE_QUATERNION_NORM: f64 = 1e-6;

pub fn anchor_to_world(pose: &Pose, scale: &ScaleSettings, anchor: &AnchorConfig) -> Pose {
    Pose::new(
        anchor_to_world_position(&pose.position, scale, anchor),
        anchor_to_world_rotation(&pose.rotation, anchor),
    )
}

pub fn anchor_to_world_position(
    position: &Vector3<f64>,
    scale: &ScaleSettings,
    anchor: &AnchorConfig,
) -> Vector3<f64> {
    let scale_to_world = scale.scale_to_world(anchor.effective_scale());
    anchor.rotation * (position * scale_to_world) + anchor.position
}

pub fn anchor_to_world_rotation(
    rotation: &UnitQuaternion<f64>,
    anchor: &AnchorConfig,
) -> UnitQuaternion<f64> {
    anchor.rotation * rotation
}

/// Inverse of [`anchor_to_world`].
pub fn world_to_anchor(pose: &Pose, scale: &ScaleSettings, anchor: &AnchorConfig) -> Pose {
    let scale_to_anchor = scale.scale_to_anchor(anchor.effective_scale());
    let to_anchor = anchor.rotation.inverse();
    Pose::new(
        to_anchor * (pose.position - anchor.position) * scale_to_anchor,
        to_anchor * pose.rotation,
    )
}

/// Swap y and z to move between provider and gameboard axes. Self-inverse.
pub fn provider_to_anchor_position(position: &Vector3<f64>) -> Vector3<f64> {
    Vector3::new(position.x, position.z, position.y)
}

/// Glasses orientation in gameboard space from the provider's glasses rotation.
///
/// The provider reports the rotation into the glasses frame (+x right, +y down,
/// +z forward) from provider gameboard space. Realigning by -90° about x and
/// negating x/y yields the rotation into the glasses frame from gameboard
/// space; the orientation is its inverse. Returns `None` for a zeroed sample.
pub fn glasses_rotation_to_anchor(raw: &Quaternion<f64>) -> Option<UnitQuaternion<f64>> {
    let realigned = realign(raw, -90.0)?;
    let to_glasses = Quaternion::new(realigned.w, -realigned.i, -realigned.j, realigned.k);
    UnitQuaternion::try_new(to_glasses, DEGENERATE_QUATERNION_NORM).map(|q| q.inverse())
}

/// Wand orientation in gameboard space from the provider's wand rotation.
///
/// Same construction as the glasses with a +90° realignment, and the wand
/// frame flips x/z instead of x/y.
pub fn wand_rotation_to_anchor(raw: &Quaternion<f64>) -> Option<UnitQuaternion<f64>> {
    let realigned = realign(raw, 90.0)?;
    let to_wand = Quaternion::new(realigned.w, -realigned.i, realigned.j, -realigned.k);
    UnitQuaternion::try_new(to_wand, DEGENERATE_QUATERNION_NORM).map(|q| q.inverse())
}

/// Provider glasses rotation that [`glasses_rotation_to_anchor`] maps to `orientation`.
pub fn glasses_rotation_to_provider(orientation: &UnitQuaternion<f64>) -> Quaternion<f64> {
    let to_glasses = orientation.inverse();
    let realigned = Quaternion::new(to_glasses.w, -to_glasses.i, -to_glasses.j, to_glasses.k);
    realigned * device_axes(-90.0).into_inner()
}

/// Provider wand rotation that [`wand_rotation_to_anchor`] maps to `orientation`.
pub fn wand_rotation_to_provider(orientation: &UnitQuaternion<f64>) -> Quaternion<f64> {
    let to_wand = orientation.inverse();
    let realigned = Quaternion::new(to_wand.w, -to_wand.i, to_wand.j, -to_wand.k);
    realigned * device_axes(90.0).into_inner()
}

fn device_axes(degrees: f64) -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::x_axis(), degrees.to_radians())
}

/// `raw * conj(AngleAxis(degrees, x))`, or `None` if `raw` is unusable.
fn realign(raw: &Quaternion<f64>, degrees: f64) -> Option<Quaternion<f64>> {
    if !raw.coords.iter().all(|c| c.is_finite()) || raw.norm() < DEGENERATE_QUATERNION_NORM {
        return None;
    }
    Some(raw * device_axes(degrees).conjugate().into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::length::LengthUnit;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_2};

    fn meter_scale() -> ScaleSettings {
        ScaleSettings::new(1.0, LengthUnit::Meters)
    }

    #[test]
    fn test_identity_anchor_is_identity() {
        let pose = Pose::new(
            Vector3::new(0.3, -1.2, 4.0),
            UnitQuaternion::from_euler_angles(0.1, 0.7, -0.4),
        );
        let world = anchor_to_world(&pose, &meter_scale(), &AnchorConfig::default());
        assert_abs_diff_eq!(world.position, pose.position, epsilon = 1e-12);
        assert_abs_diff_eq!(world.rotation, pose.rotation, epsilon = 1e-12);
    }

    #[test]
    fn test_glasses_default_scenario() {
        let pose = Pose::from_position(Vector3::new(0.0, 0.5, -0.5));
        let world = anchor_to_world(&pose, &meter_scale(), &AnchorConfig::default());
        assert_abs_diff_eq!(world.position, Vector3::new(0.0, 0.5, -0.5), epsilon = 1e-12);
        assert_abs_diff_eq!(world.rotation, UnitQuaternion::identity(), epsilon = 1e-12);
    }

    #[test]
    fn test_anchor_transform_and_scale() {
        // 1 world unit = 10 cm, board zoomed 2x: 1 m of board space is 5 world units.
        let scale = ScaleSettings::new(10.0, LengthUnit::Centimeters);
        let yaw = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), FRAC_PI_2);
        let anchor = AnchorConfig::new(Vector3::new(10.0, 0.0, 0.0), yaw, 2.0);

        let pose = Pose::from_position(Vector3::new(0.0, 0.0, 1.0));
        let world = anchor_to_world(&pose, &scale, &anchor);
        assert_abs_diff_eq!(world.position, Vector3::new(15.0, 0.0, 0.0), epsilon = 1e-9);
        assert_abs_diff_eq!(world.rotation, yaw, epsilon = 1e-12);

        let back = world_to_anchor(&world, &scale, &anchor);
        assert_abs_diff_eq!(back.position, pose.position, epsilon = 1e-9);
        assert_abs_diff_eq!(back.rotation, pose.rotation, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_scale_stays_finite() {
        let scale = ScaleSettings::new(0.0, LengthUnit::Meters);
        let pose = Pose::from_position(Vector3::new(0.1, 0.2, 0.3));
        let world = anchor_to_world(&pose, &scale, &AnchorConfig::default());
        assert!(world.is_finite());
    }

    #[test]
    fn test_axis_swap_is_self_inverse() {
        let p = Vector3::new(1.0, 2.0, 3.0);
        assert_eq!(provider_to_anchor_position(&p), Vector3::new(1.0, 3.0, 2.0));
        assert_eq!(provider_to_anchor_position(&provider_to_anchor_position(&p)), p);
    }

    #[test]
    fn test_glasses_rotation_components() {
        // Provider reporting the device-axes rotation itself maps to identity.
        let device_axes = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -FRAC_PI_2);
        let q = glasses_rotation_to_anchor(device_axes.quaternion()).unwrap();
        assert_abs_diff_eq!(q, UnitQuaternion::identity(), epsilon = 1e-12);

        // Identity from the provider: realigned = (x: +s, w: s), flipped x -> (-s, s),
        // orientation is the inverse: (x: +s, w: s).
        let q = glasses_rotation_to_anchor(&Quaternion::identity()).unwrap();
        assert_abs_diff_eq!(q.i, FRAC_1_SQRT_2, epsilon = 1e-12);
        assert_abs_diff_eq!(q.j, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(q.k, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(q.w, FRAC_1_SQRT_2, epsilon = 1e-12);
    }

    #[test]
    fn test_glasses_rotation_handedness_flip() {
        // Realigned quaternion (x, y, z, w) = (0.1, 0.2, 0.3, w) before the flip.
        let realigned = Quaternion::new(0.927_361_849_549_570_3, 0.1, 0.2, 0.3);
        let device_axes = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -FRAC_PI_2);
        let raw = realigned * device_axes.into_inner();
        let q = glasses_rotation_to_anchor(&raw).unwrap();
        // Inverse of (-0.1, -0.2, 0.3, w) is (0.1, 0.2, -0.3, w).
        assert_abs_diff_eq!(q.i, 0.1, epsilon = 1e-9);
        assert_abs_diff_eq!(q.j, 0.2, epsilon = 1e-9);
        assert_abs_diff_eq!(q.k, -0.3, epsilon = 1e-9);
        assert_abs_diff_eq!(q.w, 0.927_361_849_549_570_3, epsilon = 1e-9);
    }

    #[test]
    fn test_wand_rotation_handedness_flip() {
        let realigned = Quaternion::new(0.927_361_849_549_570_3, 0.1, 0.2, 0.3);
        let device_axes = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), FRAC_PI_2);
        let raw = realigned * device_axes.into_inner();
        let q = wand_rotation_to_anchor(&raw).unwrap();
        // Flip gives (-0.1, 0.2, -0.3, w); its inverse is (0.1, -0.2, 0.3, w).
        assert_abs_diff_eq!(q.i, 0.1, epsilon = 1e-9);
        assert_abs_diff_eq!(q.j, -0.2, epsilon = 1e-9);
        assert_abs_diff_eq!(q.k, 0.3, epsilon = 1e-9);
        assert_abs_diff_eq!(q.w, 0.927_361_849_549_570_3, epsilon = 1e-9);
    }

    #[test]
    fn test_provider_rotation_inverts_conversion() {
        let orientation = UnitQuaternion::from_euler_angles(0.3, -0.2, 1.1);
        let raw = glasses_rotation_to_provider(&orientation);
        assert_abs_diff_eq!(glasses_rotation_to_anchor(&raw).unwrap(), orientation, epsilon = 1e-12);
        let raw = wand_rotation_to_provider(&orientation);
        assert_abs_diff_eq!(wand_rotation_to_anchor(&raw).unwrap(), orientation, epsilon = 1e-12);
    }

    #[test]
    fn test_zeroed_rotation_is_rejected() {
        let zero = Quaternion::new(0.0, 0.0, 0.0, 0.0);
        assert!(glasses_rotation_to_anchor(&zero).is_none());
        assert!(wand_rotation_to_anchor(&zero).is_none());
        let nan = Quaternion::new(f64::NAN, 0.0, 0.0, 0.0);
        assert!(wand_rotation_to_anchor(&nan).is_none());
    }
}
