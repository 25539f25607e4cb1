//! oceanfft library - FFT ocean spectrum engine
//!
//! Builds a wind-driven wave spectrum, evolves it with the dispersion
//! relation and inverse-transforms it into height, displacement, normal and
//! foam maps, on the CPU or through wgpu compute.

pub mod backend;
pub mod combine;
pub mod error;
pub mod fft;
pub mod ocean;
pub mod params;
pub mod spectrum;

pub use backend::{ComputeBackend, CpuBackend, GpuBackend, GpuContext, SurfaceId, Texel};
pub use error::{OceanError, OceanResult};
pub use ocean::{cascade_wavelength_bounds, DerivedField, OceanCascades, OceanSimulation};
pub use params::{OceanParams, SimulationConfig, SpectrumModel};
