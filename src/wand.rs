use crate::settings::WandSettings;
use crate::trackable::{self, write_target, Frame, PoseTarget, Rig, Sample, Trackable, TrackableCore};
use crate::transform;
use crate::types::{ControllerIndex, ControllerPosition, DeviceId, FailureMode, Pose};
use crate::{Result, TrackingError};
use nalgebra::{UnitQuaternion, Vector3};

/// Optional sinks for a wand's world-space poses.
#[derive(Default)]
pub struct WandTargets<'o> {
    pub grip: Option<&'o mut dyn PoseTarget>,
    pub fingertips: Option<&'o mut dyn PoseTarget>,
    pub aim: Option<&'o mut dyn PoseTarget>,
}

/// Three points along a wand sharing a single orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WandPoses {
    pub grip: Vector3<f64>,
    pub fingertips: Vector3<f64>,
    pub aim: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
}

impl WandPoses {
    /// All three points at `pose.position`.
    pub fn coincident(pose: &Pose) -> Self {
        Self {
            grip: pose.position,
            fingertips: pose.position,
            aim: pose.position,
            rotation: pose.rotation,
        }
    }

    pub fn position(&self, point: ControllerPosition) -> Vector3<f64> {
        match point {
            ControllerPosition::Grip => self.grip,
            ControllerPosition::Fingertips => self.fingertips,
            ControllerPosition::Aim => self.aim,
        }
    }

    pub fn pose(&self, point: ControllerPosition) -> Pose {
        Pose::new(self.position(point), self.rotation)
    }
}

impl Rig for WandPoses {
    /// The grip holds still. Fingertips and aim swing around it with the new
    /// rotation, at whichever offset is longer: the incoming one or the last.
    fn freeze_position(stale: &Self, incoming: Option<&Self>) -> Self {
        let rotation = incoming.map_or(stale.rotation, |wand| wand.rotation);
        let forward = rotation * Vector3::z();
        let reach = |point: ControllerPosition| {
            let stale_distance = (stale.position(point) - stale.grip).norm();
            let incoming_distance =
                incoming.map_or(0.0, |wand| (wand.position(point) - wand.grip).norm());
            stale.grip + forward * stale_distance.max(incoming_distance)
        };
        Self {
            grip: stale.grip,
            fingertips: reach(ControllerPosition::Fingertips),
            aim: reach(ControllerPosition::Aim),
            rotation,
        }
    }
}

/// How much of a wand's pose can be trusted.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WandTrackingState {
    Tracking = 0,
    /// Position frozen, rotation still live.
    Limited = 1,
    None = 2,
}

/// Tracks one hand-held wand.
#[derive(Debug, Clone)]
pub struct WandTracker {
    index: ControllerIndex,
    core: TrackableCore<WandPoses>,
    tracking_state: WandTrackingState,
}

impl WandTracker {
    /// Sideways offset of the default pose; positive toward the primary hand.
    pub const DEFAULT_LATERAL_OFFSET: f64 = 0.125;

    pub fn new(index: ControllerIndex) -> Self {
        Self {
            index,
            core: TrackableCore::new(Self::default_anchor_pose(index)),
            tracking_state: WandTrackingState::None,
        }
    }

    /// Gameboard-space pose held while snapped to default: in front of the
    /// default head position, off to the wand's side, pitched down 33°.
    pub fn default_anchor_pose(index: ControllerIndex) -> WandPoses {
        let side = match index {
            ControllerIndex::Primary => Self::DEFAULT_LATERAL_OFFSET,
            ControllerIndex::Secondary => -Self::DEFAULT_LATERAL_OFFSET,
        };
        WandPoses::coincident(&Pose::new(
            Vector3::new(side, 0.25, -0.25),
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 33f64.to_radians()),
        ))
    }

    pub fn update(
        &mut self,
        settings: Option<&WandSettings>,
        frame: &Frame<'_>,
        targets: &mut WandTargets<'_>,
    ) -> Result<()> {
        trackable::update(self, settings, frame, targets)
    }

    pub fn reset(&mut self) {
        trackable::reset(self);
        self.tracking_state = WandTrackingState::None;
    }

    pub fn index(&self) -> ControllerIndex {
        self.index
    }

    pub fn is_tracked(&self) -> bool {
        self.core.is_tracked()
    }

    pub fn tracking_state(&self) -> WandTrackingState {
        self.tracking_state
    }

    pub fn poses_anchor(&self) -> &WandPoses {
        self.core.pose_anchor()
    }

    pub fn poses_world(&self) -> &WandPoses {
        self.core.pose_world()
    }

    /// World-space pose of one point on the wand.
    pub fn pose(&self, point: ControllerPosition) -> Pose {
        self.core.pose_world().pose(point)
    }

    pub fn position(&self, point: ControllerPosition) -> Vector3<f64> {
        self.core.pose_world().position(point)
    }

    fn query(&self, what: &str, result: Result<bool>) -> bool {
        result.unwrap_or_else(|e| {
            log::debug!("{}: {} query failed: {}", self.label(), what, e);
            false
        })
    }
}

impl Trackable for WandTracker {
    const SETTINGS_NAME: &'static str = "WandSettings";

    type Settings = WandSettings;
    type Rig = WandPoses;
    type Outputs<'o> = WandTargets<'o>;

    fn label(&self) -> &'static str {
        match self.index {
            ControllerIndex::Primary => "primary wand",
            ControllerIndex::Secondary => "secondary wand",
        }
    }

    fn core(&self) -> &TrackableCore<WandPoses> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TrackableCore<WandPoses> {
        &mut self.core
    }

    fn default_pose(&self) -> WandPoses {
        Self::default_anchor_pose(self.index)
    }

    fn validate(&self, settings: &WandSettings) -> Result<()> {
        if settings.controller_index != self.index {
            return Err(TrackingError::InvalidConfig(format!(
                "{:?} wand settings given to the {:?} wand tracker",
                settings.controller_index, self.index
            )));
        }
        Ok(())
    }

    /// Wands are tracked through the glasses, so they also need the glasses
    /// present and a board in view.
    fn is_available(&mut self, _settings: &WandSettings, frame: &Frame<'_>) -> bool {
        let provider = frame.provider;
        self.query("glasses", provider.is_device_available(DeviceId::Glasses))
            && self.query(
                "gameboard",
                provider.anchor_type().map(|anchor| anchor.is_tracked()),
            )
            && self.query("wand", provider.is_device_available(DeviceId::Wand(self.index)))
    }

    fn try_fetch_pose(&mut self, _settings: &WandSettings, frame: &Frame<'_>) -> Result<Sample<WandPoses>> {
        let state = frame.provider.wand_state(self.index)?;
        let rotation = transform::wand_rotation_to_anchor(&state.rotation)
            .unwrap_or(self.core.pose_anchor().rotation);
        Ok(Sample {
            rig: WandPoses {
                grip: transform::provider_to_anchor_position(&state.grip),
                fingertips: transform::provider_to_anchor_position(&state.fingertips),
                aim: transform::provider_to_anchor_position(&state.aim),
                rotation,
            },
            tracked: state.pose_valid,
        })
    }

    fn set_world_pose(&mut self, settings: &WandSettings, frame: &Frame<'_>) {
        let anchor = self.core.pose_anchor();
        let to_world = |p: &Vector3<f64>| transform::anchor_to_world_position(p, frame.scale, frame.anchor);
        let world = WandPoses {
            grip: to_world(&anchor.grip),
            fingertips: to_world(&anchor.fingertips),
            aim: to_world(&anchor.aim),
            rotation: transform::anchor_to_world_rotation(&anchor.rotation, frame.anchor),
        };
        self.core.set_pose_world(world);

        self.tracking_state = if self.core.is_tracked() {
            WandTrackingState::Tracking
        } else if settings.tracking.failure_mode == FailureMode::FreezePosition {
            WandTrackingState::Limited
        } else {
            WandTrackingState::None
        };
    }

    fn apply_to_outputs(&self, outputs: &mut WandTargets<'_>) {
        let world = self.core.pose_world();
        write_target(&mut outputs.grip, &world.pose(ControllerPosition::Grip));
        write_target(&mut outputs.fingertips, &world.pose(ControllerPosition::Fingertips));
        write_target(&mut outputs.aim, &world.pose(ControllerPosition::Aim));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::length::LengthUnit;
    use crate::provider::{RawWandState, SimulatedProvider};
    use crate::settings::{AnchorConfig, ScaleSettings};
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    fn settings(index: ControllerIndex, failure_mode: FailureMode) -> WandSettings {
        let mut settings = WandSettings::for_controller(index);
        settings.tracking.failure_mode = failure_mode;
        settings
    }

    fn step(wand: &mut WandTracker, provider: &SimulatedProvider, settings: &WandSettings) -> Result<()> {
        let scale = ScaleSettings::new(1.0, LengthUnit::Meters);
        let anchor = AnchorConfig::default();
        let frame = Frame {
            provider,
            scale: &scale,
            anchor: &anchor,
        };
        wand.update(Some(settings), &frame, &mut WandTargets::default())
    }

    #[test]
    fn test_tracked_wand_reaches_world() {
        let provider = SimulatedProvider::default();
        let mut wand = WandTracker::new(ControllerIndex::Primary);
        let mut grip = Pose::identity();
        let mut aim = Pose::identity();
        {
            let scale = ScaleSettings::new(1.0, LengthUnit::Meters);
            let anchor = AnchorConfig::default();
            let frame = Frame {
                provider: &provider,
                scale: &scale,
                anchor: &anchor,
            };
            let mut targets = WandTargets {
                grip: Some(&mut grip),
                aim: Some(&mut aim),
                ..Default::default()
            };
            wand.update(
                Some(&WandSettings::for_controller(ControllerIndex::Primary)),
                &frame,
                &mut targets,
            )
            .unwrap();
        }
        assert!(wand.is_tracked());
        assert_eq!(wand.tracking_state(), WandTrackingState::Tracking);
        assert_abs_diff_eq!(grip.position, Vector3::new(0.15, 0.1, 0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(
            aim.position - grip.position,
            Vector3::new(0.0, 0.0, SimulatedProvider::AIM_DISTANCE),
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(grip.rotation, aim.rotation);
    }

    #[test]
    fn test_freeze_position_over_lost_frames() {
        let mut provider = SimulatedProvider::default();
        provider.wands[0].state = Some(RawWandState::from_anchor_pose(
            &Pose::from_position(Vector3::new(1.0, 0.0, 0.0)),
            0.1,
            0.2,
        ));
        let settings = settings(ControllerIndex::Primary, FailureMode::FreezePosition);
        let mut wand = WandTracker::new(ControllerIndex::Primary);
        step(&mut wand, &provider, &settings).unwrap();
        assert!(wand.is_tracked());

        provider.invalidate_wand(ControllerIndex::Primary);
        for _ in 0..3 {
            step(&mut wand, &provider, &settings).unwrap();
            assert!(!wand.is_tracked());
            assert_eq!(wand.tracking_state(), WandTrackingState::Limited);
            let grip = wand.position(ControllerPosition::Grip);
            let fingertips = wand.position(ControllerPosition::Fingertips);
            assert_abs_diff_eq!(grip, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
            assert_abs_diff_eq!((fingertips - grip).norm(), 0.1, epsilon = 1e-12);
            assert_abs_diff_eq!((wand.position(ControllerPosition::Aim) - grip).norm(), 0.2, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_freeze_position_follows_live_rotation_while_untracked() {
        let mut provider = SimulatedProvider::default();
        provider.wands[0].state = Some(RawWandState::from_anchor_pose(
            &Pose::from_position(Vector3::new(1.0, 0.0, 0.0)),
            0.1,
            0.2,
        ));
        let settings = settings(ControllerIndex::Primary, FailureMode::FreezePosition);
        let mut wand = WandTracker::new(ControllerIndex::Primary);
        step(&mut wand, &provider, &settings).unwrap();

        for frame in 1..=3 {
            // Position data is garbage while untracked, but rotation keeps arriving.
            let yaw = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.4 * frame as f64);
            let mut state = RawWandState::from_anchor_pose(
                &Pose::new(Vector3::new(9.0, 9.0, 9.0), yaw),
                0.0,
                0.0,
            );
            state.pose_valid = false;
            provider.wands[0].state = Some(state);
            step(&mut wand, &provider, &settings).unwrap();

            assert!(!wand.is_tracked());
            let grip = wand.position(ControllerPosition::Grip);
            assert_abs_diff_eq!(grip, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
            assert_abs_diff_eq!(wand.poses_world().rotation, yaw, epsilon = 1e-9);
            let forward = yaw * Vector3::z();
            assert_abs_diff_eq!(
                wand.position(ControllerPosition::Fingertips),
                grip + forward * 0.1,
                epsilon = 1e-9
            );
            assert_abs_diff_eq!(
                wand.position(ControllerPosition::Aim),
                grip + forward * 0.2,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_freeze_position_swings_points_with_rotation() {
        let stale = WandPoses {
            grip: Vector3::new(1.0, 0.0, 0.0),
            fingertips: Vector3::new(1.0, 0.0, 0.1),
            aim: Vector3::new(1.0, 0.0, 0.2),
            rotation: UnitQuaternion::identity(),
        };
        // Untracked, but with a usable rotation: a quarter turn to the right.
        let yaw = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), FRAC_PI_2);
        let incoming = WandPoses {
            rotation: yaw,
            ..WandPoses::coincident(&Pose::new(Vector3::new(7.0, 7.0, 7.0), yaw))
        };
        let frozen = WandPoses::freeze_position(&stale, Some(&incoming));
        assert_eq!(frozen.grip, stale.grip);
        assert_eq!(frozen.rotation, yaw);
        assert_abs_diff_eq!(frozen.fingertips, Vector3::new(1.1, 0.0, 0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(frozen.aim, Vector3::new(1.2, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_snap_to_default_sides() {
        let mut provider = SimulatedProvider::default();
        provider.invalidate_wand(ControllerIndex::Primary);
        provider.invalidate_wand(ControllerIndex::Secondary);

        let mut primary = WandTracker::new(ControllerIndex::Primary);
        let mut secondary = WandTracker::new(ControllerIndex::Secondary);
        step(&mut primary, &provider, &settings(ControllerIndex::Primary, FailureMode::SnapToDefault)).unwrap();
        step(&mut secondary, &provider, &settings(ControllerIndex::Secondary, FailureMode::SnapToDefault)).unwrap();

        assert_eq!(primary.tracking_state(), WandTrackingState::None);
        let p = primary.position(ControllerPosition::Grip);
        let s = secondary.position(ControllerPosition::Grip);
        assert_abs_diff_eq!(p.x - s.x, 2.0 * WandTracker::DEFAULT_LATERAL_OFFSET, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, s.y, epsilon = 1e-12);
        assert_abs_diff_eq!(p.z, s.z, epsilon = 1e-12);
        assert_eq!(
            primary.position(ControllerPosition::Aim),
            primary.position(ControllerPosition::Grip)
        );
    }

    #[test]
    fn test_untracked_data_accepted_when_not_rejecting() {
        let mut provider = SimulatedProvider::default();
        let mut settings = settings(ControllerIndex::Secondary, FailureMode::SnapToDefault);
        settings.tracking.reject_untracked_position_data = false;
        let mut wand = WandTracker::new(ControllerIndex::Secondary);
        step(&mut wand, &provider, &settings).unwrap();

        let mut state = RawWandState::from_anchor_pose(&Pose::from_position(Vector3::new(0.3, 0.3, 0.3)), 0.05, 0.1);
        state.pose_valid = false;
        provider.wands[1].state = Some(state);
        step(&mut wand, &provider, &settings).unwrap();
        assert!(!wand.is_tracked());
        assert_abs_diff_eq!(wand.position(ControllerPosition::Grip), Vector3::new(0.3, 0.3, 0.3), epsilon = 1e-12);
    }

    #[test]
    fn test_lost_board_makes_wand_unavailable() {
        let mut provider = SimulatedProvider::default();
        let settings = settings(ControllerIndex::Primary, FailureMode::FreezePositionAndRotation);
        let mut wand = WandTracker::new(ControllerIndex::Primary);
        step(&mut wand, &provider, &settings).unwrap();
        let held = *wand.poses_world();

        provider.glasses_pose = None;
        provider.set_wand_pose(ControllerIndex::Primary, &Pose::from_position(Vector3::new(5.0, 5.0, 5.0)));
        step(&mut wand, &provider, &settings).unwrap();
        assert!(!wand.is_tracked());
        assert_eq!(*wand.poses_world(), held);
    }

    #[test]
    fn test_mismatched_controller_index_is_rejected() {
        let provider = SimulatedProvider::default();
        let mut wand = WandTracker::new(ControllerIndex::Primary);
        let err = step(
            &mut wand,
            &provider,
            &WandSettings::for_controller(ControllerIndex::Secondary),
        )
        .unwrap_err();
        assert!(matches!(err, TrackingError::InvalidConfig(_)));
        assert!(!wand.is_tracked());
        assert_eq!(*wand.poses_anchor(), WandTracker::default_anchor_pose(ControllerIndex::Primary));
    }

    #[test]
    fn test_missing_settings() {
        let provider = SimulatedProvider::default();
        let scale = ScaleSettings::default();
        let anchor = AnchorConfig::default();
        let frame = Frame {
            provider: &provider,
            scale: &scale,
            anchor: &anchor,
        };
        let mut wand = WandTracker::new(ControllerIndex::Secondary);
        let err = wand.update(None, &frame, &mut WandTargets::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "WandSettings configuration required for tracking updates"
        );
        assert_eq!(wand.tracking_state(), WandTrackingState::None);
    }
}
