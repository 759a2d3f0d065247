use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Position and orientation in one named reference frame.
///
/// Axis convention: +x right, +y up, +z forward. `rotation` is the orientation
/// of the posed entity within the frame, so `frame_rotation * rotation` lifts
/// it into the parent frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
}

impl Pose {
    pub fn new(position: Vector3<f64>, rotation: UnitQuaternion<f64>) -> Self {
        Self { position, rotation }
    }

    pub fn identity() -> Self {
        Self::new(Vector3::zeros(), UnitQuaternion::identity())
    }

    pub fn from_position(position: Vector3<f64>) -> Self {
        Self::new(position, UnitQuaternion::identity())
    }

    /// Local +z rotated into the pose's frame.
    pub fn forward(&self) -> Vector3<f64> {
        self.rotation * Vector3::z()
    }

    /// Local +x rotated into the pose's frame.
    pub fn right(&self) -> Vector3<f64> {
        self.rotation * Vector3::x()
    }

    /// Local +y rotated into the pose's frame.
    pub fn up(&self) -> Vector3<f64> {
        self.rotation * Vector3::y()
    }

    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
            && self.rotation.coords.iter().all(|v| v.is_finite())
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// Wands carry no physical handedness; they are addressed by hand dominance.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerIndex {
    /// The wand held in the player's dominant hand.
    #[default]
    Primary = 0,
    /// The wand held in the player's non-dominant hand.
    Secondary = 1,
}

impl ControllerIndex {
    pub const ALL: [ControllerIndex; 2] = [ControllerIndex::Primary, ControllerIndex::Secondary];

    pub fn slot(self) -> usize {
        self as usize
    }

    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(ControllerIndex::Primary),
            1 => Some(ControllerIndex::Secondary),
            _ => None,
        }
    }
}

/// Named reference points along a wand's long axis.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerPosition {
    Grip = 0,
    Fingertips = 1,
    Aim = 2,
}

/// Devices the tracking provider can report on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceId {
    Glasses,
    Wand(ControllerIndex),
}

/// Gameboard variant the glasses pose is reported against.
///
/// Discriminants match the native runtime's encoding.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorType {
    /// No gameboard in view; poses are not relative to any board.
    #[default]
    None = 1,
    /// The LE gameboard.
    Le = 2,
    /// The XE gameboard, laid flat.
    Xe = 3,
    /// The XE gameboard, folded upward on its kickstand.
    XeRaised = 4,
}

impl AnchorType {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            2 => AnchorType::Le,
            3 => AnchorType::Xe,
            4 => AnchorType::XeRaised,
            _ => AnchorType::None,
        }
    }

    pub fn is_tracked(self) -> bool {
        self != AnchorType::None
    }
}

/// What a trackable reports while the provider cannot supply fresh data.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Hold position, keep following rotation when any is reported.
    #[default]
    FreezePosition = 0,
    /// Hold the last pose entirely.
    FreezePositionAndRotation = 1,
    /// Jump to the entity's default pose.
    SnapToDefault = 2,
}

impl std::str::FromStr for FailureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "freeze_position" | "0" => Ok(FailureMode::FreezePosition),
            "freeze_position_and_rotation" | "1" => Ok(FailureMode::FreezePositionAndRotation),
            "snap_to_default" | "2" => Ok(FailureMode::SnapToDefault),
            other => Err(format!("unknown failure mode '{}'", other)),
        }
    }
}

/// Whether the installed tracking service matches this client.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceCompatibility {
    Compatible = 0,
    Incompatible = 1,
    Unknown = 2,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eye {
    Left = 0,
    Right = 1,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_pose_basis_vectors() {
        let yaw = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), FRAC_PI_2);
        let pose = Pose::new(Vector3::zeros(), yaw);
        // Quarter turn about +y carries forward onto +x.
        assert_abs_diff_eq!(pose.forward(), Vector3::x(), epsilon = 1e-12);
        assert_abs_diff_eq!(pose.right(), -Vector3::z(), epsilon = 1e-12);
        assert_abs_diff_eq!(pose.up(), Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn test_anchor_type_from_raw() {
        assert_eq!(AnchorType::from_raw(1), AnchorType::None);
        assert_eq!(AnchorType::from_raw(3), AnchorType::Xe);
        assert_eq!(AnchorType::from_raw(42), AnchorType::None);
        assert!(!AnchorType::None.is_tracked());
        assert!(AnchorType::XeRaised.is_tracked());
    }

    #[test]
    fn test_failure_mode_parse() {
        assert_eq!("snap-to-default".parse::<FailureMode>(), Ok(FailureMode::SnapToDefault));
        assert_eq!(" Freeze_Position ".parse::<FailureMode>(), Ok(FailureMode::FreezePosition));
        assert_eq!("1".parse::<FailureMode>(), Ok(FailureMode::FreezePositionAndRotation));
        assert!("wobble".parse::<FailureMode>().is_err());
    }
}
