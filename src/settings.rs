//! Runtime configuration for the trackers.
//!
//! Every settings struct is plain data: serde-loadable, immutable for the
//! duration of a frame update.

use crate::length::{Length, LengthUnit};
use crate::types::{AnchorType, ControllerIndex, FailureMode, Pose};
use crate::{Result, TrackingError};
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Relates world-space units to physical distances in the user's space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleSettings {
    /// How many `content_scale_unit`s one world-space unit represents.
    pub content_scale_ratio: f64,
    pub content_scale_unit: LengthUnit,
}

impl ScaleSettings {
    pub const MIN_CONTENT_SCALE_RATIO: f64 = 1e-7;

    pub fn new(content_scale_ratio: f64, content_scale_unit: LengthUnit) -> Self {
        Self {
            content_scale_ratio,
            content_scale_unit,
        }
    }

    /// The configured ratio, clamped to a positive finite value.
    pub fn ratio(&self) -> f64 {
        let ratio = self.content_scale_ratio;
        if ratio.is_finite() && ratio >= Self::MIN_CONTENT_SCALE_RATIO {
            ratio
        } else {
            Self::MIN_CONTENT_SCALE_RATIO
        }
    }

    pub fn physical_meters_per_world_unit(&self) -> f64 {
        Length::new(self.ratio(), self.content_scale_unit).to_meters()
    }

    pub fn world_units_per_physical_meter(&self) -> f64 {
        1.0 / self.physical_meters_per_world_unit().max(f64::EPSILON)
    }

    pub fn one_unit_length_in_meters(&self) -> f64 {
        Length::new(1.0, self.content_scale_unit).to_meters()
    }

    /// Physical meters per world unit, folding in the gameboard's own scale.
    pub fn scale_to_anchor(&self, anchor_scale: f64) -> f64 {
        let scale = self.physical_meters_per_world_unit() * anchor_scale;
        if scale > f64::EPSILON {
            scale
        } else {
            f64::EPSILON
        }
    }

    /// World units per physical meter of gameboard space.
    pub fn scale_to_world(&self, anchor_scale: f64) -> f64 {
        1.0 / self.scale_to_anchor(anchor_scale)
    }
}

impl Default for ScaleSettings {
    fn default() -> Self {
        Self::new(5.0, LengthUnit::Centimeters)
    }
}

/// The gameboard's placement in world space.
///
/// The gameboard is the origin glasses and wands are tracked against. Moving,
/// rotating or scaling it here moves every tracked pose with it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorConfig {
    pub position: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
    /// Uniform zoom applied on top of the content scale.
    pub scale: f64,
    /// Board variant last observed by the glasses. Written between frames.
    #[serde(skip)]
    pub anchor_type: AnchorType,
    /// Board variant to display regardless of what is tracked; `None` disables.
    pub type_override: AnchorType,
}

impl AnchorConfig {
    pub const MIN_ANCHOR_SCALE: f64 = 1e-5;
    /// Largest accepted deviation of the rotation's norm from 1.
    pub const ROTATION_NORM_TOLERANCE: f64 = 1e-6;

    pub fn new(position: Vector3<f64>, rotation: UnitQuaternion<f64>, scale: f64) -> Self {
        Self {
            position,
            rotation,
            scale,
            ..Self::default()
        }
    }

    pub fn effective_scale(&self) -> f64 {
        if self.scale.is_finite() {
            self.scale.max(Self::MIN_ANCHOR_SCALE)
        } else {
            1.0
        }
    }

    pub fn world_pose(&self) -> Pose {
        Pose::new(self.position, self.rotation)
    }

    pub fn is_tracked(&self) -> bool {
        self.anchor_type.is_tracked()
    }

    pub fn validate(&self) -> Result<()> {
        if !self.world_pose().is_finite() {
            return Err(TrackingError::InvalidConfig(format!(
                "gameboard transform is not finite: {:?}",
                self.world_pose()
            )));
        }
        let norm = self.rotation.quaternion().norm();
        if (norm - 1.0).abs() > Self::ROTATION_NORM_TOLERANCE {
            return Err(TrackingError::InvalidConfig(format!(
                "gameboard rotation is not a unit quaternion (norm {})",
                norm
            )));
        }
        Ok(())
    }
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: 1.0,
            anchor_type: AnchorType::None,
            type_override: AnchorType::None,
        }
    }
}

/// Settings shared by every trackable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackableSettings {
    /// When false, untracked samples are applied as-is and `failure_mode` is ignored.
    pub reject_untracked_position_data: bool,
    pub failure_mode: FailureMode,
}

impl Default for TrackableSettings {
    fn default() -> Self {
        Self {
            reject_untracked_position_data: true,
            failure_mode: FailureMode::FreezePosition,
        }
    }
}

impl AsRef<TrackableSettings> for TrackableSettings {
    fn as_ref(&self) -> &TrackableSettings {
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlassesSettings {
    #[serde(flatten)]
    pub tracking: TrackableSettings,
    /// Near clip plane in physical meters.
    pub near_clip_plane: f64,
    /// Far clip plane in physical meters.
    pub far_clip_plane: f64,
    pub override_fov: bool,
    pub custom_fov: f64,
    /// World-space pose the head snaps to under `SnapToDefault`.
    pub preview_pose: Option<Pose>,
}

impl GlassesSettings {
    pub const MIN_FOV: f64 = 35.0;
    pub const MAX_FOV: f64 = 64.0;
    pub const DEFAULT_FOV: f64 = 48.0;
    /// Interpupillary distance used when the runtime cannot report one, in meters.
    pub const DEFAULT_IPD: f64 = 0.059;
    pub const MIN_NEAR_CLIP_DISTANCE_IN_METERS: f64 = 0.1;
    pub const DEFAULT_FRIENDLY_NAME: &'static str = "AR Glasses";

    /// Vertical field of view in degrees.
    pub fn field_of_view(&self) -> f64 {
        if self.override_fov {
            self.custom_fov.clamp(Self::MIN_FOV, Self::MAX_FOV)
        } else {
            Self::DEFAULT_FOV
        }
    }

    pub fn near_clip(&self) -> f64 {
        self.near_clip_plane.max(Self::MIN_NEAR_CLIP_DISTANCE_IN_METERS)
    }

    pub fn far_clip(&self) -> f64 {
        self.far_clip_plane.max(self.near_clip())
    }
}

impl Default for GlassesSettings {
    fn default() -> Self {
        Self {
            tracking: TrackableSettings::default(),
            near_clip_plane: Self::MIN_NEAR_CLIP_DISTANCE_IN_METERS,
            far_clip_plane: 100.0,
            override_fov: false,
            custom_fov: Self::DEFAULT_FOV,
            preview_pose: None,
        }
    }
}

impl AsRef<TrackableSettings> for GlassesSettings {
    fn as_ref(&self) -> &TrackableSettings {
        &self.tracking
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WandSettings {
    #[serde(flatten)]
    pub tracking: TrackableSettings,
    pub controller_index: ControllerIndex,
}

impl WandSettings {
    pub fn for_controller(controller_index: ControllerIndex) -> Self {
        Self {
            tracking: TrackableSettings::default(),
            controller_index,
        }
    }
}

impl Default for WandSettings {
    fn default() -> Self {
        Self::for_controller(ControllerIndex::Primary)
    }
}

impl AsRef<TrackableSettings> for WandSettings {
    fn as_ref(&self) -> &TrackableSettings {
        &self.tracking
    }
}

/// Everything a [`TrackingContext`](crate::TrackingContext) needs per frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub scale: ScaleSettings,
    pub anchor: AnchorConfig,
    pub glasses: Option<GlassesSettings>,
    pub primary_wand: Option<WandSettings>,
    pub secondary_wand: Option<WandSettings>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            scale: ScaleSettings::default(),
            anchor: AnchorConfig::default(),
            glasses: Some(GlassesSettings::default()),
            primary_wand: Some(WandSettings::for_controller(ControllerIndex::Primary)),
            secondary_wand: Some(WandSettings::for_controller(ControllerIndex::Secondary)),
        }
    }
}

impl TrackingConfig {
    /// Parse a TOML document. Missing tables fall back to defaults; a gameboard
    /// transform that fails [`AnchorConfig::validate`] is rejected.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let mut config: TrackingConfig = toml::from_str(text)?;
        config.normalize();
        config.anchor.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        log::info!("Loaded tracking configuration from {}", path.display());
        Ok(config)
    }

    pub fn wand(&self, index: ControllerIndex) -> Option<&WandSettings> {
        match index {
            ControllerIndex::Primary => self.primary_wand.as_ref(),
            ControllerIndex::Secondary => self.secondary_wand.as_ref(),
        }
    }

    /// Apply `BOARDTRACK_*` environment overrides.
    ///
    /// - `BOARDTRACK_SCALE_RATIO`: content scale ratio
    /// - `BOARDTRACK_SCALE_UNIT`: content scale unit (e.g. `cm`, `inches`)
    /// - `BOARDTRACK_FAILURE_MODE`: failure mode for every trackable
    /// - `BOARDTRACK_REJECT_UNTRACKED`: reject untracked position data
    pub fn apply_env_overrides(&mut self) {
        self.scale.content_scale_ratio =
            read_env_f64("BOARDTRACK_SCALE_RATIO", self.scale.content_scale_ratio);

        if let Some(unit) = read_env_parsed::<LengthUnit>("BOARDTRACK_SCALE_UNIT") {
            self.scale.content_scale_unit = unit;
        }

        let failure_mode = read_env_parsed::<FailureMode>("BOARDTRACK_FAILURE_MODE");
        let reject = std::env::var("BOARDTRACK_REJECT_UNTRACKED")
            .ok()
            .and_then(|v| parse_bool(&v));

        for tracking in self.trackable_settings_mut() {
            if let Some(mode) = failure_mode {
                tracking.failure_mode = mode;
            }
            if let Some(reject) = reject {
                tracking.reject_untracked_position_data = reject;
            }
        }
    }

    fn trackable_settings_mut(&mut self) -> impl Iterator<Item = &mut TrackableSettings> {
        let glasses = self.glasses.as_mut().map(|g| &mut g.tracking);
        let primary = self.primary_wand.as_mut().map(|w| &mut w.tracking);
        let secondary = self.secondary_wand.as_mut().map(|w| &mut w.tracking);
        glasses.into_iter().chain(primary).chain(secondary)
    }

    /// Wand slots decide the controller index; a conflicting value is overwritten.
    fn normalize(&mut self) {
        for (slot, wand) in [
            (ControllerIndex::Primary, self.primary_wand.as_mut()),
            (ControllerIndex::Secondary, self.secondary_wand.as_mut()),
        ] {
            if let Some(wand) = wand {
                if wand.controller_index != slot {
                    log::warn!(
                        "Wand settings in the {:?} slot named {:?}; using {:?}",
                        slot,
                        wand.controller_index,
                        slot
                    );
                    wand.controller_index = slot;
                }
            }
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn read_env_f64(name: &str, default: f64) -> f64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(default)
}

fn read_env_parsed<T>(name: &str) -> Option<T>
where
    T: std::str::FromStr<Err = String>,
{
    let value = std::env::var(name).ok()?;
    match value.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            log::warn!("Ignoring {}: {}", name, e);
            None
        }
    }
}
