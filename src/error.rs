use std::fmt;

/// Errors that can occur while configuring or updating the trackers.
#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("{0} configuration required for tracking updates")]
    MissingSettings(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Provider call {call} failed with code {code}")]
    Provider { call: &'static str, code: i32 },

    #[error("Provider does not support {0}")]
    Unsupported(&'static str),

    #[error("No gameboard is currently tracked")]
    NoAnchor,

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Thread-safe last-error storage for the C FFI layer.
pub(crate) struct LastError {
    message: std::sync::Mutex<String>,
}

impl LastError {
    pub const fn new() -> Self {
        Self {
            message: std::sync::Mutex::new(String::new()),
        }
    }

    pub fn set(&self, err: &TrackingError) {
        if let Ok(mut msg) = self.message.lock() {
            *msg = fmt::format(format_args!("{}\0", err));
        }
    }

    pub fn as_ptr(&self) -> *const std::ffi::c_char {
        match self.message.lock() {
            Ok(msg) if !msg.is_empty() => msg.as_ptr() as *const std::ffi::c_char,
            _ => std::ptr::null(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_error_keeps_latest_message() {
        let slot = LastError::new();
        assert!(slot.as_ptr().is_null());

        slot.set(&TrackingError::MissingSettings("WandSettings"));
        let msg = unsafe { std::ffi::CStr::from_ptr(slot.as_ptr()) };
        assert_eq!(
            msg.to_str().unwrap(),
            "WandSettings configuration required for tracking updates"
        );

        slot.set(&TrackingError::NoAnchor);
        let msg = unsafe { std::ffi::CStr::from_ptr(slot.as_ptr()) };
        assert_eq!(msg.to_str().unwrap(), "No gameboard is currently tracked");
    }
}
