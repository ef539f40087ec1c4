/*
 * Error type shared by every layer of the overlay toolkit. Portable code only
 * ever sees `PlatformError`; Windows builds additionally convert
 * `windows::core::Error` so native calls can be chained with `?`.
 */
use std::fmt;

use crate::types::WindowHandle;

#[derive(Debug)]
pub enum PlatformError {
    InitializationFailed(String),
    InvalidHandle(String),
    OperationFailed(String),
    /// A render primitive was invoked while no device exists.
    DeviceNotInitialized,
    /// Information about a foreign window could not be retrieved.
    WindowQueryFailed {
        handle: WindowHandle,
        reason: String,
    },
    /// The native device must be recreated. Recovered inside `Renderer::end_draw`.
    DeviceLost(String),
    FontNotFound(String),
    DuplicateFont(String),
    Settings(String),
    AlreadyTerminated,
    #[cfg(target_os = "windows")]
    Win32(windows::core::Error),
}

impl PlatformError {
    pub fn is_device_lost(&self) -> bool {
        matches!(self, PlatformError::DeviceLost(_))
    }
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformError::InitializationFailed(msg) => write!(f, "initialization failed: {msg}"),
            PlatformError::InvalidHandle(msg) => write!(f, "invalid handle: {msg}"),
            PlatformError::OperationFailed(msg) => write!(f, "operation failed: {msg}"),
            PlatformError::DeviceNotInitialized => {
                write!(f, "the device was not initialized yet")
            }
            PlatformError::WindowQueryFailed { handle, reason } => {
                write!(f, "could not query window {handle:?}: {reason}")
            }
            PlatformError::DeviceLost(msg) => write!(f, "render device lost: {msg}"),
            PlatformError::FontNotFound(name) => write!(f, "font '{name}' is not registered"),
            PlatformError::DuplicateFont(name) => {
                write!(f, "font '{name}' is already registered")
            }
            PlatformError::Settings(msg) => write!(f, "settings error: {msg}"),
            PlatformError::AlreadyTerminated => {
                write!(f, "overlay was killed and cannot be attached again")
            }
            #[cfg(target_os = "windows")]
            PlatformError::Win32(err) => write!(f, "win32 error: {err}"),
        }
    }
}

impl std::error::Error for PlatformError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            #[cfg(target_os = "windows")]
            PlatformError::Win32(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(target_os = "windows")]
impl From<windows::core::Error> for PlatformError {
    fn from(err: windows::core::Error) -> Self {
        PlatformError::Win32(err)
    }
}

impl From<serde_json::Error> for PlatformError {
    fn from(err: serde_json::Error) -> Self {
        PlatformError::Settings(err.to_string())
    }
}

impl From<std::io::Error> for PlatformError {
    fn from(err: std::io::Error) -> Self {
        PlatformError::Settings(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PlatformError>;
