//! Frame pump driving the glasses and both wands in a fixed order.

use crate::glasses::{GlassesTargets, GlassesTracker};
use crate::provider::TrackingProvider;
use crate::settings::TrackingConfig;
use crate::trackable::Frame;
use crate::types::{ControllerIndex, ServiceCompatibility};
use crate::wand::{WandTargets, WandTracker};
use crate::Result;

/// Output targets for every tracked entity. Leave a field `None` to skip it.
#[derive(Default)]
pub struct RigTargets<'o> {
    pub glasses: GlassesTargets<'o>,
    pub primary_wand: WandTargets<'o>,
    pub secondary_wand: WandTargets<'o>,
}

impl<'o> RigTargets<'o> {
    pub fn wand(&mut self, index: ControllerIndex) -> &mut WandTargets<'o> {
        match index {
            ControllerIndex::Primary => &mut self.primary_wand,
            ControllerIndex::Secondary => &mut self.secondary_wand,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompatibilityCheck {
    Pending,
    Warned,
    /// The provider could not answer; stop asking.
    Disabled,
}

/// Owns one glasses tracker and a tracker per wand slot.
#[derive(Debug, Clone)]
pub struct TrackingContext {
    glasses: GlassesTracker,
    wands: [WandTracker; 2],
    compatibility: CompatibilityCheck,
}

impl TrackingContext {
    pub fn new() -> Self {
        Self {
            glasses: GlassesTracker::new(),
            wands: ControllerIndex::ALL.map(WandTracker::new),
            compatibility: CompatibilityCheck::Pending,
        }
    }

    /// Return every tracker to its default pose.
    pub fn reset(&mut self) {
        self.glasses.reset();
        for wand in &mut self.wands {
            wand.reset();
        }
    }

    pub fn glasses(&self) -> &GlassesTracker {
        &self.glasses
    }

    pub fn wand(&self, index: ControllerIndex) -> &WandTracker {
        &self.wands[index.slot()]
    }

    /// Run one frame: glasses first, then the primary and secondary wands.
    ///
    /// Every tracker is updated even if an earlier one rejected its settings;
    /// the first such error is returned. The board type observed by the glasses
    /// is written to `config.anchor.anchor_type` once all trackers are done.
    pub fn update(
        &mut self,
        provider: &dyn TrackingProvider,
        config: &mut TrackingConfig,
        targets: &mut RigTargets<'_>,
    ) -> Result<()> {
        self.check_compatibility(provider);

        let frame = Frame {
            provider,
            scale: &config.scale,
            anchor: &config.anchor,
        };
        let mut results = vec![self
            .glasses
            .update(config.glasses.as_ref(), &frame, &mut targets.glasses)];
        for (wand, index) in self.wands.iter_mut().zip(ControllerIndex::ALL) {
            results.push(wand.update(config.wand(index), &frame, targets.wand(index)));
        }

        let observed = self.glasses.anchor_type();
        if observed != config.anchor.anchor_type {
            log::info!(
                "Gameboard changed: {:?} -> {:?}",
                config.anchor.anchor_type,
                observed
            );
            config.anchor.anchor_type = observed;
        }

        results.into_iter().collect()
    }

    fn check_compatibility(&mut self, provider: &dyn TrackingProvider) {
        if self.compatibility == CompatibilityCheck::Disabled {
            return;
        }
        match provider.service_compatibility() {
            Ok(ServiceCompatibility::Incompatible) => {
                if self.compatibility == CompatibilityCheck::Pending {
                    log::warn!("Tracking service is incompatible with this client; update the service");
                    self.compatibility = CompatibilityCheck::Warned;
                }
            }
            Ok(_) => self.compatibility = CompatibilityCheck::Pending,
            Err(e) => {
                log::warn!("Tracking service compatibility unknown: {}", e);
                self.compatibility = CompatibilityCheck::Disabled;
            }
        }
    }
}

impl Default for TrackingContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::SimulatedProvider;
    use crate::types::{AnchorType, ControllerPosition, Pose};
    use crate::wand::WandTrackingState;
    use crate::TrackingError;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_full_frame_updates_everything() {
        let provider = SimulatedProvider::default();
        let mut config = TrackingConfig::default();
        let mut context = TrackingContext::new();
        let mut head = Pose::identity();
        let mut secondary_aim = Pose::identity();
        {
            let mut targets = RigTargets::default();
            targets.glasses.head = Some(&mut head);
            targets.secondary_wand.aim = Some(&mut secondary_aim);
            context.update(&provider, &mut config, &mut targets).unwrap();
        }

        assert!(context.glasses().is_tracked());
        assert!(context.wand(ControllerIndex::Primary).is_tracked());
        assert!(context.wand(ControllerIndex::Secondary).is_tracked());
        assert_eq!(config.anchor.anchor_type, AnchorType::Le);
        assert_eq!(head, *context.glasses().pose_world());
        assert_eq!(
            secondary_aim,
            context.wand(ControllerIndex::Secondary).pose(ControllerPosition::Aim)
        );
    }

    #[test]
    fn test_anchor_type_follows_glasses() {
        let mut provider = SimulatedProvider::default();
        let mut config = TrackingConfig::default();
        let mut context = TrackingContext::new();
        context.update(&provider, &mut config, &mut RigTargets::default()).unwrap();
        assert!(config.anchor.is_tracked());

        provider.glasses_pose = None;
        context.update(&provider, &mut config, &mut RigTargets::default()).unwrap();
        assert!(!config.anchor.is_tracked());
        assert_eq!(
            context.wand(ControllerIndex::Primary).tracking_state(),
            WandTrackingState::Limited
        );
    }

    #[test]
    fn test_missing_settings_do_not_stop_other_trackers() {
        let provider = SimulatedProvider::default();
        let mut config = TrackingConfig::default();
        config.glasses = None;
        let mut context = TrackingContext::new();
        let err = context
            .update(&provider, &mut config, &mut RigTargets::default())
            .unwrap_err();
        assert!(matches!(err, TrackingError::MissingSettings("GlassesSettings")));
        assert!(!context.glasses().is_tracked());
        assert!(context.wand(ControllerIndex::Primary).is_tracked());
        assert!(context.wand(ControllerIndex::Secondary).is_tracked());
        // Glasses never ran this frame, so no board has been observed.
        assert_eq!(config.anchor.anchor_type, AnchorType::None);
    }

    #[test]
    fn test_compatibility_check_latches() {
        let mut provider = SimulatedProvider::default();
        provider.compatibility = Some(ServiceCompatibility::Incompatible);
        let mut config = TrackingConfig::default();
        let mut context = TrackingContext::new();
        context.update(&provider, &mut config, &mut RigTargets::default()).unwrap();
        assert_eq!(context.compatibility, CompatibilityCheck::Warned);

        provider.compatibility = None;
        context.update(&provider, &mut config, &mut RigTargets::default()).unwrap();
        assert_eq!(context.compatibility, CompatibilityCheck::Disabled);

        provider.compatibility = Some(ServiceCompatibility::Incompatible);
        context.update(&provider, &mut config, &mut RigTargets::default()).unwrap();
        assert_eq!(context.compatibility, CompatibilityCheck::Disabled);
    }

    #[test]
    fn test_reset_returns_to_defaults() {
        let provider = SimulatedProvider::default();
        let mut config = TrackingConfig::default();
        let mut context = TrackingContext::new();
        context.update(&provider, &mut config, &mut RigTargets::default()).unwrap();
        context.reset();
        assert!(!context.glasses().is_tracked());
        assert_eq!(*context.glasses().pose_anchor(), GlassesTracker::default_anchor_pose());
        assert_abs_diff_eq!(
            context.wand(ControllerIndex::Secondary).poses_anchor().grip,
            WandTracker::default_anchor_pose(ControllerIndex::Secondary).grip
        );
    }
}
