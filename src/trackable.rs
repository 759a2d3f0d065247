//! Per-frame tracking state machine shared by every tracked entity.
//!
//! Each frame a trackable either adopts a fresh provider sample or degrades
//! according to its [`FailureMode`]. The decision is made from that frame's
//! data alone; there is no hysteresis between the tracked and untracked states.

use crate::provider::TrackingProvider;
use crate::settings::{AnchorConfig, ScaleSettings, TrackableSettings};
use crate::types::{FailureMode, Pose};
use crate::{Result, TrackingError};

/// Sink for a world-space pose produced by a tracker.
pub trait PoseTarget {
    fn set_pose(&mut self, pose: &Pose);
}

impl PoseTarget for Pose {
    fn set_pose(&mut self, pose: &Pose) {
        *self = *pose;
    }
}

/// Write `pose` to `target` if one is attached.
pub(crate) fn write_target(target: &mut Option<&mut dyn PoseTarget>, pose: &Pose) {
    if let Some(target) = target {
        target.set_pose(pose);
    }
}

/// Read-only inputs shared by every trackable during one frame.
#[derive(Clone, Copy)]
pub struct Frame<'a> {
    pub provider: &'a dyn TrackingProvider,
    pub scale: &'a ScaleSettings,
    pub anchor: &'a AnchorConfig,
}

/// Poses a trackable carries between frames.
pub trait Rig: Clone + std::fmt::Debug {
    /// Hold `stale`'s position while following `incoming`'s rotation, if any.
    fn freeze_position(stale: &Self, incoming: Option<&Self>) -> Self;
}

impl Rig for Pose {
    fn freeze_position(stale: &Self, incoming: Option<&Self>) -> Self {
        Pose::new(
            stale.position,
            incoming.map_or(stale.rotation, |pose| pose.rotation),
        )
    }
}

/// A pose fetched from the provider this frame.
#[derive(Debug, Clone)]
pub struct Sample<R> {
    pub rig: R,
    /// False when the provider returned data it does not vouch for.
    pub tracked: bool,
}

/// State owned by every trackable: the rig in gameboard and world space.
#[derive(Debug, Clone)]
pub struct TrackableCore<R> {
    pose_anchor: R,
    pose_world: R,
    is_tracked: bool,
    provider_error_logged: bool,
}

impl<R: Rig> TrackableCore<R> {
    /// Start at `default`, untracked. The world pose equals the default until
    /// the first update places it.
    pub fn new(default: R) -> Self {
        Self {
            pose_anchor: default.clone(),
            pose_world: default,
            is_tracked: false,
            provider_error_logged: false,
        }
    }

    pub fn reset(&mut self, default: R) {
        *self = Self::new(default);
    }

    pub fn pose_anchor(&self) -> &R {
        &self.pose_anchor
    }

    pub fn pose_world(&self) -> &R {
        &self.pose_world
    }

    pub fn is_tracked(&self) -> bool {
        self.is_tracked
    }

    pub fn set_pose_world(&mut self, pose: R) {
        self.pose_world = pose;
    }

    /// Decide this frame's gameboard-space rig.
    ///
    /// `default` is only used under [`FailureMode::SnapToDefault`].
    pub fn resolve(&mut self, sample: Option<Sample<R>>, settings: &TrackableSettings, default: R) {
        let reject = settings.reject_untracked_position_data;
        match sample {
            Some(sample) if sample.tracked => {
                self.pose_anchor = sample.rig;
                self.is_tracked = true;
            }
            Some(sample) if !reject => {
                self.pose_anchor = sample.rig;
                self.is_tracked = false;
            }
            None if !reject => {
                self.is_tracked = false;
            }
            incoming => {
                self.is_tracked = false;
                self.pose_anchor = match settings.failure_mode {
                    FailureMode::FreezePosition => R::freeze_position(
                        &self.pose_anchor,
                        incoming.as_ref().map(|sample| &sample.rig),
                    ),
                    FailureMode::FreezePositionAndRotation => self.pose_anchor.clone(),
                    FailureMode::SnapToDefault => default,
                };
            }
        }
    }

    fn provider_failed(&mut self, label: &str, err: &TrackingError) {
        if self.provider_error_logged {
            log::debug!("{}: {}", label, err);
        } else {
            log::warn!("{}: no tracking data: {}", label, err);
            self.provider_error_logged = true;
        }
    }

    fn provider_recovered(&mut self, label: &str) {
        if self.provider_error_logged {
            log::info!("{}: tracking data restored", label);
            self.provider_error_logged = false;
        }
    }
}

/// Hooks a tracked entity supplies to the shared [`update`] driver.
pub trait Trackable {
    /// Settings type name reported when settings are missing.
    const SETTINGS_NAME: &'static str;

    type Settings: AsRef<TrackableSettings>;
    type Rig: Rig;
    type Outputs<'o>;

    /// Name used in log messages.
    fn label(&self) -> &'static str;

    fn core(&self) -> &TrackableCore<Self::Rig>;

    fn core_mut(&mut self) -> &mut TrackableCore<Self::Rig>;

    /// Gameboard-space rig adopted under [`FailureMode::SnapToDefault`].
    fn default_pose(&self) -> Self::Rig;

    /// Reject settings this trackable cannot run with.
    fn validate(&self, _settings: &Self::Settings) -> Result<()> {
        Ok(())
    }

    fn is_available(&mut self, settings: &Self::Settings, frame: &Frame<'_>) -> bool;

    /// Fetch this frame's sample. Called only when available.
    fn try_fetch_pose(
        &mut self,
        settings: &Self::Settings,
        frame: &Frame<'_>,
    ) -> Result<Sample<Self::Rig>>;

    /// Convert the resolved gameboard-space rig into world space.
    fn set_world_pose(&mut self, settings: &Self::Settings, frame: &Frame<'_>);

    fn apply_to_outputs(&self, outputs: &mut Self::Outputs<'_>);
}

/// Run one frame for `trackable`.
///
/// Missing or invalid settings are logged and returned without touching any
/// state. Provider failures never surface as errors; they count as a frame
/// without data.
pub fn update<T: Trackable>(
    trackable: &mut T,
    settings: Option<&T::Settings>,
    frame: &Frame<'_>,
    outputs: &mut T::Outputs<'_>,
) -> Result<()> {
    let Some(settings) = settings else {
        let err = TrackingError::MissingSettings(T::SETTINGS_NAME);
        log::error!("{}: {}", trackable.label(), err);
        return Err(err);
    };

    if let Err(err) = frame
        .anchor
        .validate()
        .and_then(|()| trackable.validate(settings))
    {
        log::error!("{}: {}", trackable.label(), err);
        return Err(err);
    }

    let sample = if trackable.is_available(settings, frame) {
        match trackable.try_fetch_pose(settings, frame) {
            Ok(sample) => {
                let label = trackable.label();
                trackable.core_mut().provider_recovered(label);
                Some(sample)
            }
            Err(err) => {
                let label = trackable.label();
                trackable.core_mut().provider_failed(label, &err);
                None
            }
        }
    } else {
        None
    };

    let default = trackable.default_pose();
    trackable
        .core_mut()
        .resolve(sample, settings.as_ref(), default);
    log::trace!(
        "{}: tracked={} anchor={:?}",
        trackable.label(),
        trackable.core().is_tracked(),
        trackable.core().pose_anchor()
    );

    trackable.set_world_pose(settings, frame);
    trackable.apply_to_outputs(outputs);
    Ok(())
}

/// Return `trackable` to its default pose, untracked.
pub fn reset<T: Trackable>(trackable: &mut T) {
    let default = trackable.default_pose();
    trackable.core_mut().reset(default);
}
