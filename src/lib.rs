//! # boardtrack - gameboard-relative pose tracking for AR glasses and wands
//!
//! Turns raw poses from an AR tracking runtime into application world space.
//! Provides:
//! - Length units and content scale (physical meters per world unit)
//! - Gameboard (anchor) space to world space conversion
//! - A per-frame tracking state machine with configurable failure modes
//! - Glasses (head + eyes) and wand (grip/fingertips/aim) trackers
//! - C FFI for integration with C/C++/Unity hosts
//!
//! ## Quick Start
//! ```no_run
//! use boardtrack::{RigTargets, SimulatedProvider, TrackingConfig, TrackingContext};
//!
//! let mut config = TrackingConfig::default();
//! let provider = SimulatedProvider::default();
//! let mut context = TrackingContext::new();
//!
//! for _ in 0..3 {
//!     let mut targets = RigTargets::default();
//!     context.update(&provider, &mut config, &mut targets).unwrap();
//!     println!("head: {:?}", context.glasses().pose_world().position);
//! }
//! ```

pub mod error;
pub mod types;
pub mod length;
pub mod settings;
pub mod anchor;
pub mod transform;
pub mod provider;
pub mod trackable;
pub mod glasses;
pub mod wand;
pub mod context;
pub mod ffi;

pub use error::TrackingError;
pub use types::*;
pub use length::{Length, LengthUnit};
pub use settings::{
    AnchorConfig, GlassesSettings, ScaleSettings, TrackableSettings, TrackingConfig, WandSettings,
};
pub use anchor::AnchorDimensions;
pub use provider::{RawGlassesPose, RawWandState, SimulatedProvider, TrackingProvider};
pub use trackable::{Frame, PoseTarget, Rig, Sample, Trackable, TrackableCore};
pub use glasses::{GlassesTargets, GlassesTracker, Projection};
pub use wand::{WandPoses, WandTargets, WandTracker, WandTrackingState};
pub use context::{RigTargets, TrackingContext};

/// Result type alias for boardtrack operations.
pub type Result<T> = std::result::Result<T, TrackingError>;
