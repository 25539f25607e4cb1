//! Parameter definitions with physical units and documented semantics.
//!
//! - Physical units (meters, seconds, radians)
//! - Documented ranges, with clamping for out-of-domain values
//! - Explicit CPU/GPU parameter records

mod ocean;
mod simulation;
mod uniforms;

// Re-export all types
pub use ocean::{Clamp, OceanParams, SpectrumModel};
pub use simulation::SimulationConfig;
pub use uniforms::{FftPassUniform, OceanUniforms, FLAG_WAVELENGTH_BOUNDS, UNIFORM_LAYOUT_VERSION};
