use crate::settings::GlassesSettings;
use crate::trackable::{self, write_target, Frame, PoseTarget, Sample, Trackable, TrackableCore};
use crate::transform;
use crate::types::{AnchorType, DeviceId, Eye, FailureMode, Pose};
use crate::Result;
use nalgebra::{UnitQuaternion, Vector3};

/// Optional sinks for the glasses' world-space poses.
#[derive(Default)]
pub struct GlassesTargets<'o> {
    pub head: Option<&'o mut dyn PoseTarget>,
    pub left_eye: Option<&'o mut dyn PoseTarget>,
    pub right_eye: Option<&'o mut dyn PoseTarget>,
}

/// Camera parameters for the current frame, in world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Vertical field of view in degrees.
    pub field_of_view: f64,
    pub near_clip: f64,
    pub far_clip: f64,
}

/// Tracks the head-mounted glasses and the two eye cameras derived from them.
#[derive(Debug, Clone)]
pub struct GlassesTracker {
    core: TrackableCore<Pose>,
    available: bool,
    anchor_type: AnchorType,
    ipd: f64,
    ipd_fallback_logged: bool,
    eyes: [Pose; 2],
    projection: Projection,
    friendly_name: String,
}

impl GlassesTracker {
    pub fn new() -> Self {
        let default = Self::default_anchor_pose();
        Self {
            core: TrackableCore::new(default),
            available: false,
            anchor_type: AnchorType::None,
            ipd: GlassesSettings::DEFAULT_IPD,
            ipd_fallback_logged: false,
            eyes: [default; 2],
            projection: Projection {
                field_of_view: GlassesSettings::DEFAULT_FOV,
                near_clip: GlassesSettings::MIN_NEAR_CLIP_DISTANCE_IN_METERS,
                far_clip: GlassesSettings::MIN_NEAR_CLIP_DISTANCE_IN_METERS,
            },
            friendly_name: GlassesSettings::DEFAULT_FRIENDLY_NAME.to_string(),
        }
    }

    /// Gameboard-space pose held while snapped to default: half a meter up and
    /// back from the board center, looking down at it.
    pub fn default_anchor_pose() -> Pose {
        Pose::new(
            Vector3::new(0.0, 0.5, -0.5),
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 45f64.to_radians()),
        )
    }

    pub fn update(
        &mut self,
        settings: Option<&GlassesSettings>,
        frame: &Frame<'_>,
        targets: &mut GlassesTargets<'_>,
    ) -> Result<()> {
        trackable::update(self, settings, frame, targets)
    }

    pub fn reset(&mut self) {
        trackable::reset(self);
        let default = *self.core.pose_world();
        self.eyes = [default; 2];
        self.anchor_type = AnchorType::None;
    }

    pub fn is_tracked(&self) -> bool {
        self.core.is_tracked()
    }

    /// Whether the runtime reported the glasses as connected last frame.
    pub fn available(&self) -> bool {
        self.available
    }

    /// Board the glasses were tracking last frame.
    pub fn anchor_type(&self) -> AnchorType {
        self.anchor_type
    }

    pub fn pose_anchor(&self) -> &Pose {
        self.core.pose_anchor()
    }

    pub fn pose_world(&self) -> &Pose {
        self.core.pose_world()
    }

    pub fn eye_pose(&self, eye: Eye) -> &Pose {
        &self.eyes[eye as usize]
    }

    /// Interpupillary distance in physical meters.
    pub fn ipd(&self) -> f64 {
        self.ipd
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    fn refresh_friendly_name(&mut self, frame: &Frame<'_>) {
        self.friendly_name = match frame.provider.glasses_friendly_name() {
            Ok(name) if !name.is_empty() => name,
            Ok(_) => GlassesSettings::DEFAULT_FRIENDLY_NAME.to_string(),
            Err(e) => {
                log::debug!("Glasses name unavailable: {}", e);
                GlassesSettings::DEFAULT_FRIENDLY_NAME.to_string()
            }
        };
    }

    fn refresh_ipd(&mut self, frame: &Frame<'_>) {
        match frame.provider.glasses_ipd() {
            Ok(ipd) if ipd.is_finite() && ipd > 0.0 => {
                self.ipd = ipd;
                self.ipd_fallback_logged = false;
            }
            result => {
                if !self.ipd_fallback_logged {
                    match result {
                        Err(e) => log::warn!(
                            "Glasses IPD unavailable ({}); using {} m",
                            e,
                            GlassesSettings::DEFAULT_IPD
                        ),
                        Ok(ipd) => log::warn!(
                            "Glasses reported IPD {}; using {} m",
                            ipd,
                            GlassesSettings::DEFAULT_IPD
                        ),
                    }
                    self.ipd_fallback_logged = true;
                }
                self.ipd = GlassesSettings::DEFAULT_IPD;
            }
        }
    }
}

impl Default for GlassesTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Trackable for GlassesTracker {
    const SETTINGS_NAME: &'static str = "GlassesSettings";

    type Settings = GlassesSettings;
    type Rig = Pose;
    type Outputs<'o> = GlassesTargets<'o>;

    fn label(&self) -> &'static str {
        "glasses"
    }

    fn core(&self) -> &TrackableCore<Pose> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TrackableCore<Pose> {
        &mut self.core
    }

    fn default_pose(&self) -> Pose {
        Self::default_anchor_pose()
    }

    fn is_available(&mut self, _settings: &GlassesSettings, frame: &Frame<'_>) -> bool {
        let available = match frame.provider.is_device_available(DeviceId::Glasses) {
            Ok(available) => available,
            Err(e) => {
                log::debug!("Glasses availability query failed: {}", e);
                false
            }
        };

        if available != self.available {
            log::info!("Glasses {}", if available { "connected" } else { "disconnected" });
            if available {
                self.refresh_friendly_name(frame);
            }
        }
        self.available = available;
        if !available {
            self.anchor_type = AnchorType::None;
        }
        available
    }

    fn try_fetch_pose(&mut self, _settings: &GlassesSettings, frame: &Frame<'_>) -> Result<Sample<Pose>> {
        let raw = match frame.provider.glasses_pose() {
            Ok(raw) => raw,
            Err(e) => {
                self.anchor_type = AnchorType::None;
                return Err(e);
            }
        };
        self.anchor_type = raw.anchor_type;

        let rotation = transform::glasses_rotation_to_anchor(&raw.rotation)
            .unwrap_or(self.core.pose_anchor().rotation);
        Ok(Sample {
            rig: Pose::new(transform::provider_to_anchor_position(&raw.position), rotation),
            tracked: raw.anchor_type.is_tracked(),
        })
    }

    fn set_world_pose(&mut self, settings: &GlassesSettings, frame: &Frame<'_>) {
        let snapped = !self.core.is_tracked()
            && settings.tracking.reject_untracked_position_data
            && settings.tracking.failure_mode == FailureMode::SnapToDefault;
        let head = match settings.preview_pose {
            Some(preview) if snapped => preview,
            _ => transform::anchor_to_world(self.core.pose_anchor(), frame.scale, frame.anchor),
        };
        self.core.set_pose_world(head);

        if self.available {
            self.refresh_ipd(frame);
        }

        let scale_to_world = frame.scale.scale_to_world(frame.anchor.effective_scale());
        let half_ipd = head.right() * (scale_to_world * self.ipd / 2.0);
        self.eyes = [
            Pose::new(head.position - half_ipd, head.rotation),
            Pose::new(head.position + half_ipd, head.rotation),
        ];

        self.projection = Projection {
            field_of_view: settings.field_of_view(),
            near_clip: settings.near_clip() * scale_to_world,
            far_clip: settings.far_clip() * scale_to_world,
        };
    }

    fn apply_to_outputs(&self, outputs: &mut GlassesTargets<'_>) {
        write_target(&mut outputs.head, self.core.pose_world());
        write_target(&mut outputs.left_eye, &self.eyes[Eye::Left as usize]);
        write_target(&mut outputs.right_eye, &self.eyes[Eye::Right as usize]);
    }
}
