//! The tracking runtime boundary.
//!
//! A [`TrackingProvider`] answers synchronous per-frame queries. Every call is
//! fallible; trackers treat any error as "no data this frame".

use crate::anchor::AnchorDimensions;
use crate::transform;
use crate::types::{AnchorType, ControllerIndex, DeviceId, Pose, ServiceCompatibility};
use crate::{Result, TrackingError};
use nalgebra::{Quaternion, Vector3};

/// Glasses pose as reported by the runtime, in provider axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawGlassesPose {
    /// Glasses position in provider gameboard space (+y forward, +z up), meters.
    pub position: Vector3<f64>,
    /// Rotation into the glasses frame from provider gameboard space.
    pub rotation: Quaternion<f64>,
    /// Board the pose is relative to; `None` means the pose is untracked.
    pub anchor_type: AnchorType,
}

impl RawGlassesPose {
    /// Encode a gameboard-space pose the way the runtime would report it.
    pub fn from_anchor_pose(pose: &Pose, anchor_type: AnchorType) -> Self {
        Self {
            position: transform::provider_to_anchor_position(&pose.position),
            rotation: transform::glasses_rotation_to_provider(&pose.rotation),
            anchor_type,
        }
    }
}

/// Wand tracking state as reported by the runtime, in provider axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawWandState {
    /// False when the runtime has no valid pose; positions and rotation are
    /// then typically zeroed.
    pub pose_valid: bool,
    pub grip: Vector3<f64>,
    pub fingertips: Vector3<f64>,
    pub aim: Vector3<f64>,
    /// Rotation into the wand frame from provider gameboard space.
    pub rotation: Quaternion<f64>,
}

impl RawWandState {
    /// A wand at `grip` with fingertips and aim points along its forward axis.
    pub fn from_anchor_pose(grip: &Pose, fingertips_distance: f64, aim_distance: f64) -> Self {
        let forward = grip.forward();
        let fingertips = grip.position + forward * fingertips_distance;
        let aim = grip.position + forward * aim_distance;
        Self {
            pose_valid: true,
            grip: transform::provider_to_anchor_position(&grip.position),
            fingertips: transform::provider_to_anchor_position(&fingertips),
            aim: transform::provider_to_anchor_position(&aim),
            rotation: transform::wand_rotation_to_provider(&grip.rotation),
        }
    }

    /// What the runtime reports for a wand it has lost: everything zeroed.
    pub fn invalid() -> Self {
        Self {
            pose_valid: false,
            grip: Vector3::zeros(),
            fingertips: Vector3::zeros(),
            aim: Vector3::zeros(),
            rotation: Quaternion::new(0.0, 0.0, 0.0, 0.0),
        }
    }
}

/// Source of raw device data, queried once per trackable per frame.
pub trait TrackingProvider {
    /// Whether the device is physically present and connected.
    fn is_device_available(&self, device: DeviceId) -> Result<bool>;

    fn glasses_pose(&self) -> Result<RawGlassesPose>;

    fn wand_state(&self, index: ControllerIndex) -> Result<RawWandState>;

    /// Board currently seen by the glasses; `None` when nothing is tracked.
    fn anchor_type(&self) -> Result<AnchorType>;

    fn anchor_dimensions(&self, anchor_type: AnchorType) -> Result<AnchorDimensions>;

    /// Interpupillary distance in meters.
    fn glasses_ipd(&self) -> Result<f64>;

    fn glasses_friendly_name(&self) -> Result<String> {
        Err(TrackingError::Unsupported("glasses_friendly_name"))
    }

    fn service_compatibility(&self) -> Result<ServiceCompatibility> {
        Ok(ServiceCompatibility::Unknown)
    }
}

/// One simulated wand slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedWand {
    pub connected: bool,
    /// `None` makes `wand_state` fail.
    pub state: Option<RawWandState>,
}

/// In-memory provider whose answers are set directly by its owner.
///
/// Used for tests, demos, and hosts without a runtime attached.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedProvider {
    pub glasses_available: bool,
    /// `None` makes `glasses_pose` fail.
    pub glasses_pose: Option<RawGlassesPose>,
    pub glasses_ipd: Option<f64>,
    pub friendly_name: Option<String>,
    pub anchor_dimensions: Option<AnchorDimensions>,
    pub wands: [SimulatedWand; 2],
    pub compatibility: Option<ServiceCompatibility>,
}

impl SimulatedProvider {
    pub const FINGERTIPS_DISTANCE: f64 = 0.05;
    pub const AIM_DISTANCE: f64 = 0.1;
    const ERROR_CODE: i32 = 1;

    pub fn set_glasses_pose(&mut self, pose: &Pose, anchor_type: AnchorType) {
        self.glasses_pose = Some(RawGlassesPose::from_anchor_pose(pose, anchor_type));
    }

    pub fn set_wand_pose(&mut self, index: ControllerIndex, grip: &Pose) {
        self.wands[index.slot()].state = Some(RawWandState::from_anchor_pose(
            grip,
            Self::FINGERTIPS_DISTANCE,
            Self::AIM_DISTANCE,
        ));
    }

    /// Report the wand as present but untracked, with zeroed data.
    pub fn invalidate_wand(&mut self, index: ControllerIndex) {
        self.wands[index.slot()].state = Some(RawWandState::invalid());
    }

    /// Make `wand_state` fail for this slot.
    pub fn drop_wand(&mut self, index: ControllerIndex) {
        self.wands[index.slot()].state = None;
    }

    fn failed(call: &'static str) -> TrackingError {
        TrackingError::Provider {
            call,
            code: Self::ERROR_CODE,
        }
    }
}

impl Default for SimulatedProvider {
    fn default() -> Self {
        let glasses = Pose::new(
            Vector3::new(0.0, 0.5, -0.5),
            nalgebra::UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 45f64.to_radians()),
        );
        let mut provider = Self {
            glasses_available: true,
            glasses_pose: Some(RawGlassesPose::from_anchor_pose(&glasses, AnchorType::Le)),
            glasses_ipd: Some(0.063),
            friendly_name: Some("Simulated Glasses".to_string()),
            anchor_dimensions: Some(AnchorDimensions::from_meters(0.7, 0.7, 0.05)),
            wands: [
                SimulatedWand {
                    connected: true,
                    state: None,
                },
                SimulatedWand {
                    connected: true,
                    state: None,
                },
            ],
            compatibility: Some(ServiceCompatibility::Compatible),
        };
        for index in ControllerIndex::ALL {
            let side = match index {
                ControllerIndex::Primary => 0.15,
                ControllerIndex::Secondary => -0.15,
            };
            provider.set_wand_pose(index, &Pose::from_position(Vector3::new(side, 0.1, 0.0)));
        }
        provider
    }
}

impl TrackingProvider for SimulatedProvider {
    fn is_device_available(&self, device: DeviceId) -> Result<bool> {
        Ok(match device {
            DeviceId::Glasses => self.glasses_available,
            DeviceId::Wand(index) => self.wands[index.slot()].connected,
        })
    }

    fn glasses_pose(&self) -> Result<RawGlassesPose> {
        if !self.glasses_available {
            return Err(Self::failed("glasses_pose"));
        }
        self.glasses_pose.ok_or_else(|| Self::failed("glasses_pose"))
    }

    fn wand_state(&self, index: ControllerIndex) -> Result<RawWandState> {
        let wand = &self.wands[index.slot()];
        if !wand.connected {
            return Err(Self::failed("wand_state"));
        }
        wand.state.ok_or_else(|| Self::failed("wand_state"))
    }

    fn anchor_type(&self) -> Result<AnchorType> {
        // The board type rides along with the glasses pose.
        match self.glasses_pose() {
            Ok(pose) => Ok(pose.anchor_type),
            Err(_) => Ok(AnchorType::None),
        }
    }

    fn anchor_dimensions(&self, _anchor_type: AnchorType) -> Result<AnchorDimensions> {
        self.anchor_dimensions
            .ok_or_else(|| Self::failed("anchor_dimensions"))
    }

    fn glasses_ipd(&self) -> Result<f64> {
        self.glasses_ipd.ok_or_else(|| Self::failed("glasses_ipd"))
    }

    fn glasses_friendly_name(&self) -> Result<String> {
        self.friendly_name
            .clone()
            .ok_or_else(|| Self::failed("glasses_friendly_name"))
    }

    fn service_compatibility(&self) -> Result<ServiceCompatibility> {
        self.compatibility
            .ok_or_else(|| Self::failed("service_compatibility"))
    }
}
