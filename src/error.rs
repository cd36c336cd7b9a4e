//! Error types for the browser-facing layers
//!
//! The simulation itself is infallible. Storage errors are logged and the
//! caller falls back to defaults; render errors abort startup.

use thiserror::Error;

/// Failure while reading or writing persisted data
#[derive(Debug, Error)]
pub enum StorageError {
    /// No storage backend is available (private browsing, no window, ...)
    #[error("storage backend unavailable")]
    Unavailable,

    /// The backend rejected a read or write
    #[error("storage access failed for key `{key}`: {reason}")]
    Access { key: String, reason: String },

    /// Stored data could not be (de)serialized
    #[error("malformed data: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Failure while bringing up the GPU
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no compatible graphics adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
}
