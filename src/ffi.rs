//! C FFI layer for boardtrack.
//!
//! Provides an opaque handle-based API for C/C++ consumers. The host supplies
//! tracking data through a table of callbacks each frame.
//! The generated C header is written to `include/boardtrack.h` by cbindgen.

use crate::anchor::AnchorDimensions;
use crate::context::{RigTargets, TrackingContext};
use crate::error::LastError;
use crate::length::LengthUnit;
use crate::provider::{RawGlassesPose, RawWandState, TrackingProvider};
use crate::settings::{AnchorConfig, TrackingConfig};
use crate::types::{
    AnchorType, ControllerIndex, ControllerPosition, DeviceId, Eye, Pose, ServiceCompatibility,
};
use crate::{Result, TrackingError};
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use std::ffi::{c_char, c_int, c_void, CStr};

/// Last error message for C consumers.
static LAST_ERROR: LastError = LastError::new();

/// Device codes used by `is_device_available` and `bt_is_tracked`.
pub const BT_DEVICE_GLASSES: c_int = 0;
pub const BT_DEVICE_PRIMARY_WAND: c_int = 1;
pub const BT_DEVICE_SECONDARY_WAND: c_int = 2;

/// Opaque tracking context handle for C consumers.
pub struct BtContext {
    context: TrackingContext,
    config: TrackingConfig,
}

/// Pose in C-compatible layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct BtPose {
    /// Position [x, y, z] in world units.
    pub position: [f64; 3],
    /// Orientation quaternion [qx, qy, qz, qw].
    pub rotation: [f64; 4],
}

impl From<&Pose> for BtPose {
    fn from(pose: &Pose) -> Self {
        let q = pose.rotation.quaternion();
        Self {
            position: [pose.position.x, pose.position.y, pose.position.z],
            rotation: [q.i, q.j, q.k, q.w],
        }
    }
}

/// Raw glasses pose as the runtime reports it (+y forward, +z up).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct BtRawGlassesPose {
    pub position: [f64; 3],
    /// Rotation into the glasses frame [qx, qy, qz, qw].
    pub rotation: [f64; 4],
    /// 1 = none, 2 = LE, 3 = XE, 4 = XE raised.
    pub anchor_type: c_int,
}

/// Raw wand state as the runtime reports it (+y forward, +z up).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct BtRawWandState {
    pub pose_valid: bool,
    pub grip: [f64; 3],
    pub fingertips: [f64; 3],
    pub aim: [f64; 3],
    /// Rotation into the wand frame [qx, qy, qz, qw].
    pub rotation: [f64; 4],
}

/// Gameboard dimensions in meters.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct BtAnchorDimensions {
    pub playable_x: f64,
    pub playable_y: f64,
    pub border_width: f64,
}

/// Host callbacks supplying tracking data.
///
/// Each callback receives `user_data`, writes its answer through the out
/// pointer and returns 0 on success or a nonzero runtime error code. A null
/// callback is treated as unsupported.
#[repr(C)]
pub struct BtProviderCallbacks {
    pub user_data: *mut c_void,
    pub is_device_available:
        Option<unsafe extern "C" fn(user_data: *mut c_void, device: c_int, out: *mut bool) -> c_int>,
    pub glasses_pose:
        Option<unsafe extern "C" fn(user_data: *mut c_void, out: *mut BtRawGlassesPose) -> c_int>,
    pub wand_state: Option<
        unsafe extern "C" fn(user_data: *mut c_void, index: c_int, out: *mut BtRawWandState) -> c_int,
    >,
    pub anchor_type: Option<unsafe extern "C" fn(user_data: *mut c_void, out: *mut c_int) -> c_int>,
    pub anchor_dimensions: Option<
        unsafe extern "C" fn(
            user_data: *mut c_void,
            anchor_type: c_int,
            out: *mut BtAnchorDimensions,
        ) -> c_int,
    >,
    pub glasses_ipd: Option<unsafe extern "C" fn(user_data: *mut c_void, out: *mut f64) -> c_int>,
    /// Writes a null-terminated name into `buf` of `len` bytes.
    pub glasses_friendly_name:
        Option<unsafe extern "C" fn(user_data: *mut c_void, buf: *mut c_char, len: usize) -> c_int>,
    /// Writes 0 = compatible, 1 = incompatible, 2 = unknown.
    pub service_compatibility:
        Option<unsafe extern "C" fn(user_data: *mut c_void, out: *mut c_int) -> c_int>,
}

/// [`TrackingProvider`] over a borrowed callback table.
struct CallbackProvider<'a>(&'a BtProviderCallbacks);

impl CallbackProvider<'_> {
    fn check(call: &'static str, code: c_int) -> Result<()> {
        if code == 0 {
            Ok(())
        } else {
            Err(TrackingError::Provider { call, code })
        }
    }
}

fn device_code(device: DeviceId) -> c_int {
    match device {
        DeviceId::Glasses => BT_DEVICE_GLASSES,
        DeviceId::Wand(ControllerIndex::Primary) => BT_DEVICE_PRIMARY_WAND,
        DeviceId::Wand(ControllerIndex::Secondary) => BT_DEVICE_SECONDARY_WAND,
    }
}

fn vector(v: [f64; 3]) -> Vector3<f64> {
    Vector3::new(v[0], v[1], v[2])
}

fn quaternion(q: [f64; 4]) -> Quaternion<f64> {
    Quaternion::new(q[3], q[0], q[1], q[2])
}

// Safety for every call below: `bt_context_update` requires the table and its
// callbacks to be valid for the duration of the update.
impl TrackingProvider for CallbackProvider<'_> {
    fn is_device_available(&self, device: DeviceId) -> Result<bool> {
        let f = self
            .0
            .is_device_available
            .ok_or(TrackingError::Unsupported("is_device_available"))?;
        let mut available = false;
        let code = unsafe { f(self.0.user_data, device_code(device), &mut available) };
        Self::check("is_device_available", code)?;
        Ok(available)
    }

    fn glasses_pose(&self) -> Result<RawGlassesPose> {
        let f = self
            .0
            .glasses_pose
            .ok_or(TrackingError::Unsupported("glasses_pose"))?;
        let mut raw = BtRawGlassesPose::default();
        let code = unsafe { f(self.0.user_data, &mut raw) };
        Self::check("glasses_pose", code)?;
        Ok(RawGlassesPose {
            position: vector(raw.position),
            rotation: quaternion(raw.rotation),
            anchor_type: AnchorType::from_raw(raw.anchor_type),
        })
    }

    fn wand_state(&self, index: ControllerIndex) -> Result<RawWandState> {
        let f = self
            .0
            .wand_state
            .ok_or(TrackingError::Unsupported("wand_state"))?;
        let mut raw = BtRawWandState::default();
        let code = unsafe { f(self.0.user_data, index as c_int, &mut raw) };
        Self::check("wand_state", code)?;
        Ok(RawWandState {
            pose_valid: raw.pose_valid,
            grip: vector(raw.grip),
            fingertips: vector(raw.fingertips),
            aim: vector(raw.aim),
            rotation: quaternion(raw.rotation),
        })
    }

    fn anchor_type(&self) -> Result<AnchorType> {
        let f = self
            .0
            .anchor_type
            .ok_or(TrackingError::Unsupported("anchor_type"))?;
        let mut raw = AnchorType::None as c_int;
        let code = unsafe { f(self.0.user_data, &mut raw) };
        Self::check("anchor_type", code)?;
        Ok(AnchorType::from_raw(raw))
    }

    fn anchor_dimensions(&self, anchor_type: AnchorType) -> Result<AnchorDimensions> {
        let f = self
            .0
            .anchor_dimensions
            .ok_or(TrackingError::Unsupported("anchor_dimensions"))?;
        let mut raw = BtAnchorDimensions::default();
        let code = unsafe { f(self.0.user_data, anchor_type as c_int, &mut raw) };
        Self::check("anchor_dimensions", code)?;
        Ok(AnchorDimensions::from_meters(
            raw.playable_x,
            raw.playable_y,
            raw.border_width,
        ))
    }

    fn glasses_ipd(&self) -> Result<f64> {
        let f = self
            .0
            .glasses_ipd
            .ok_or(TrackingError::Unsupported("glasses_ipd"))?;
        let mut ipd = 0.0;
        let code = unsafe { f(self.0.user_data, &mut ipd) };
        Self::check("glasses_ipd", code)?;
        Ok(ipd)
    }

    fn glasses_friendly_name(&self) -> Result<String> {
        let f = self
            .0
            .glasses_friendly_name
            .ok_or(TrackingError::Unsupported("glasses_friendly_name"))?;
        let mut buf = [0 as c_char; 128];
        let code = unsafe { f(self.0.user_data, buf.as_mut_ptr(), buf.len()) };
        Self::check("glasses_friendly_name", code)?;
        Ok(c_char_to_string(&buf))
    }

    fn service_compatibility(&self) -> Result<ServiceCompatibility> {
        let Some(f) = self.0.service_compatibility else {
            return Ok(ServiceCompatibility::Unknown);
        };
        let mut raw = ServiceCompatibility::Unknown as c_int;
        let code = unsafe { f(self.0.user_data, &mut raw) };
        Self::check("service_compatibility", code)?;
        Ok(match raw {
            0 => ServiceCompatibility::Compatible,
            1 => ServiceCompatibility::Incompatible,
            _ => ServiceCompatibility::Unknown,
        })
    }
}

fn c_char_to_string(buf: &[c_char]) -> String {
    let end = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    let bytes: Vec<u8> = buf[..end].iter().map(|&c| c as u8).collect();
    String::from_utf8_lossy(&bytes).to_string()
}

unsafe fn path_arg(path: *const c_char) -> Option<String> {
    if path.is_null() {
        None
    } else {
        Some(CStr::from_ptr(path).to_string_lossy().into_owned())
    }
}

fn fail(err: TrackingError) -> c_int {
    LAST_ERROR.set(&err);
    -1
}

/// Create a tracking context.
///
/// `config_path` names a TOML configuration file; NULL uses defaults.
/// `BOARDTRACK_*` environment overrides are applied either way.
/// Returns NULL on error (check bt_last_error()).
///
/// # Safety
/// `config_path` must be a valid null-terminated string, or null.
#[no_mangle]
pub unsafe extern "C" fn bt_context_new(config_path: *const c_char) -> *mut BtContext {
    let config = match path_arg(config_path) {
        Some(path) => TrackingConfig::load(path),
        None => Ok(TrackingConfig::default()),
    };
    match config {
        Ok(mut config) => {
            config.apply_env_overrides();
            Box::into_raw(Box::new(BtContext {
                context: TrackingContext::new(),
                config,
            }))
        }
        Err(e) => {
            LAST_ERROR.set(&e);
            std::ptr::null_mut()
        }
    }
}

/// Free a context.
///
/// # Safety
/// `ctx` must be a pointer returned by `bt_context_new`, or null.
#[no_mangle]
pub unsafe extern "C" fn bt_context_free(ctx: *mut BtContext) {
    if !ctx.is_null() {
        drop(Box::from_raw(ctx));
    }
}

/// Replace the configuration from a TOML file, keeping the gameboard
/// placement and tracker state. Returns 0 on success, -1 on error.
///
/// # Safety
/// `ctx` must be a valid context pointer and `path` a valid null-terminated
/// string, or either may be null.
#[no_mangle]
pub unsafe extern "C" fn bt_context_load_config(ctx: *mut BtContext, path: *const c_char) -> c_int {
    if ctx.is_null() {
        return -1;
    }
    let Some(path) = path_arg(path) else {
        return -1;
    };
    let ctx = &mut *ctx;
    match TrackingConfig::load(path) {
        Ok(mut config) => {
            config.apply_env_overrides();
            config.anchor.anchor_type = ctx.config.anchor.anchor_type;
            ctx.config = config;
            0
        }
        Err(e) => fail(e),
    }
}

/// Place the gameboard in world space. A rejected transform leaves the
/// previous placement in effect.
/// `position` is [x, y, z], `rotation` is [qx, qy, qz, qw].
/// Returns 0 on success, -1 on error.
///
/// # Safety
/// `ctx` must be a valid context pointer, `position` must point to 3 doubles
/// and `rotation` to 4 doubles, or any of them may be null.
#[no_mangle]
pub unsafe extern "C" fn bt_context_set_anchor(
    ctx: *mut BtContext,
    position: *const f64,
    rotation: *const f64,
    scale: f64,
) -> c_int {
    if ctx.is_null() || position.is_null() || rotation.is_null() {
        return -1;
    }
    let ctx = &mut *ctx;
    let p = std::slice::from_raw_parts(position, 3);
    let q = std::slice::from_raw_parts(rotation, 4);
    // A zero quaternion would normalize to NaN; keep it raw so validation names it.
    let candidate = AnchorConfig {
        position: Vector3::new(p[0], p[1], p[2]),
        rotation: UnitQuaternion::new_unchecked(quaternion([q[0], q[1], q[2], q[3]])),
        scale,
        ..ctx.config.anchor
    };
    match candidate.validate() {
        Ok(()) => {
            ctx.config.anchor = AnchorConfig {
                rotation: UnitQuaternion::new_normalize(*candidate.rotation.quaternion()),
                ..candidate
            };
            0
        }
        Err(e) => fail(e),
    }
}

/// Set the content scale: one world unit equals `ratio` `unit`s.
/// `unit` is a unit name such as "meters", "cm" or "inches".
/// Returns 0 on success, -1 on error.
///
/// # Safety
/// `ctx` must be a valid context pointer and `unit` a valid null-terminated
/// string, or either may be null.
#[no_mangle]
pub unsafe extern "C" fn bt_context_set_scale(
    ctx: *mut BtContext,
    ratio: f64,
    unit: *const c_char,
) -> c_int {
    if ctx.is_null() {
        return -1;
    }
    let Some(unit) = path_arg(unit) else {
        return -1;
    };
    let ctx = &mut *ctx;
    match unit.parse::<LengthUnit>() {
        Ok(unit) => {
            ctx.config.scale.content_scale_ratio = ratio;
            ctx.config.scale.content_scale_unit = unit;
            0
        }
        Err(e) => fail(TrackingError::InvalidConfig(e)),
    }
}

/// Run one tracking frame against the host's callbacks.
/// Returns 0 on success, -1 if any tracker rejected its configuration.
/// Trackers with valid configuration are updated either way.
///
/// # Safety
/// `ctx` must be a valid context pointer and `callbacks` a valid callback
/// table whose functions are safe to call with its `user_data` for the
/// duration of this call, or either may be null.
#[no_mangle]
pub unsafe extern "C" fn bt_context_update(
    ctx: *mut BtContext,
    callbacks: *const BtProviderCallbacks,
) -> c_int {
    if ctx.is_null() || callbacks.is_null() {
        return -1;
    }
    let ctx = &mut *ctx;
    let provider = CallbackProvider(&*callbacks);
    match ctx
        .context
        .update(&provider, &mut ctx.config, &mut RigTargets::default())
    {
        Ok(()) => 0,
        Err(e) => fail(e),
    }
}

/// Reset every tracker to its default pose.
///
/// # Safety
/// `ctx` must be a valid context pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn bt_context_reset(ctx: *mut BtContext) {
    if !ctx.is_null() {
        (*ctx).context.reset();
    }
}

/// World-space head pose. Returns 0 on success, -1 on error.
///
/// # Safety
/// `ctx` and `out` must be valid pointers, or null.
#[no_mangle]
pub unsafe extern "C" fn bt_glasses_pose(ctx: *const BtContext, out: *mut BtPose) -> c_int {
    if ctx.is_null() || out.is_null() {
        return -1;
    }
    let ctx = &*ctx;
    out.write(BtPose::from(ctx.context.glasses().pose_world()));
    0
}

/// World-space eye pose. `eye`: 0 = left, 1 = right.
/// Returns 0 on success, -1 on error.
///
/// # Safety
/// `ctx` and `out` must be valid pointers, or null.
#[no_mangle]
pub unsafe extern "C" fn bt_eye_pose(ctx: *const BtContext, eye: c_int, out: *mut BtPose) -> c_int {
    if ctx.is_null() || out.is_null() {
        return -1;
    }
    let eye = match eye {
        0 => Eye::Left,
        1 => Eye::Right,
        _ => return -1,
    };
    let ctx = &*ctx;
    out.write(BtPose::from(ctx.context.glasses().eye_pose(eye)));
    0
}

/// World-space pose of a point on a wand.
/// `index`: 0 = primary, 1 = secondary. `position`: 0 = grip,
/// 1 = fingertips, 2 = aim. Returns 0 on success, -1 on error.
///
/// # Safety
/// `ctx` and `out` must be valid pointers, or null.
#[no_mangle]
pub unsafe extern "C" fn bt_wand_pose(
    ctx: *const BtContext,
    index: c_int,
    position: c_int,
    out: *mut BtPose,
) -> c_int {
    if ctx.is_null() || out.is_null() {
        return -1;
    }
    let Some(index) = ControllerIndex::from_raw(index) else {
        return -1;
    };
    let point = match position {
        0 => ControllerPosition::Grip,
        1 => ControllerPosition::Fingertips,
        2 => ControllerPosition::Aim,
        _ => return -1,
    };
    let ctx = &*ctx;
    out.write(BtPose::from(&ctx.context.wand(index).pose(point)));
    0
}

/// Whether a device was tracked last frame. `device` uses the
/// `BT_DEVICE_*` codes.
///
/// # Safety
/// `ctx` must be a valid context pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn bt_is_tracked(ctx: *const BtContext, device: c_int) -> bool {
    if ctx.is_null() {
        return false;
    }
    let ctx = &*ctx;
    match device {
        BT_DEVICE_GLASSES => ctx.context.glasses().is_tracked(),
        BT_DEVICE_PRIMARY_WAND => ctx.context.wand(ControllerIndex::Primary).is_tracked(),
        BT_DEVICE_SECONDARY_WAND => ctx.context.wand(ControllerIndex::Secondary).is_tracked(),
        _ => false,
    }
}

/// Gameboard type observed last frame: 1 = none, 2 = LE, 3 = XE, 4 = XE raised.
///
/// # Safety
/// `ctx` must be a valid context pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn bt_anchor_type(ctx: *const BtContext) -> c_int {
    if ctx.is_null() {
        return AnchorType::None as c_int;
    }
    (*ctx).config.anchor.anchor_type as c_int
}

/// Get the last error message. Returns NULL if no error.
/// The returned pointer is valid until the next boardtrack API call.
#[no_mangle]
pub extern "C" fn bt_last_error() -> *const c_char {
    LAST_ERROR.as_ptr()
}
