//! Frequency-domain ocean: noise, initial spectrum and time propagation.

pub mod generator;
mod noise;
pub mod propagation;

// Re-export public types
pub use generator::{dispersion, generate_spectrum, initial_amplitude, wave_vector};
pub use noise::NoiseField;
pub use propagation::{evolve, evolved_height, propagate_texel, propagate_waves, SpectralFields};
