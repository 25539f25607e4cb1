//! Central error type for the ocean spectrum / FFT core.
//!
//! Mirrors the failure taxonomy of the simulation: configuration errors stop
//! a simulation from starting, invariant violations are programming errors,
//! resource exhaustion is a hard failure. Parameter-domain problems are never
//! errors; they are clamped (see [`crate::params::OceanParams::sanitized`]).

use crate::backend::Kernel;

/// Error type for all simulation operations
#[derive(thiserror::Error, Debug)]
pub enum OceanError {
    /// Invalid construction-time configuration (e.g. non power-of-two size)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Shader module or compute pipeline could not be created
    #[error("kernel compilation failed for {kernel:?}: {message}")]
    KernelCompilation { kernel: Kernel, message: String },

    /// Broken internal invariant (pass plan mismatch, missing barrier, ...)
    #[error("invariant violation: {0}")]
    Invariant(String),

    /// Surface or buffer allocation failed
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Adapter/device acquisition or readback failure
    #[error("device error: {0}")]
    Device(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parameter file error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OceanError {
    pub fn configuration<T: ToString>(msg: T) -> Self {
        OceanError::Configuration(msg.to_string())
    }

    pub fn invariant<T: ToString>(msg: T) -> Self {
        OceanError::Invariant(msg.to_string())
    }

    pub fn device<T: ToString>(msg: T) -> Self {
        OceanError::Device(msg.to_string())
    }

    /// True for errors that mean "the simulation does not start"
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            OceanError::Configuration(_) | OceanError::KernelCompilation { .. }
        )
    }
}

/// Result alias for simulation operations
pub type OceanResult<T> = Result<T, OceanError>;

/// Validate a texture side length: power of two and at least 4 texels.
pub fn validate_texture_size(size: u32) -> OceanResult<()> {
    if !size.is_power_of_two() {
        return Err(OceanError::configuration(format!(
            "texture size must be a power of 2, got {}",
            size
        )));
    }
    if size < 4 {
        return Err(OceanError::configuration(format!(
            "texture size must be at least 4, got {}",
            size
        )));
    }
    Ok(())
}
