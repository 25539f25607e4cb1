//! Ocean simulation cycle: orchestrates spectrum, propagation, FFT and
//! combine work once per tick.

mod cascade;
mod simulation;

// Re-export public types
pub use cascade::{cascade_wavelength_bounds, OceanCascades};
pub use simulation::{DerivedField, OceanSimulation};
