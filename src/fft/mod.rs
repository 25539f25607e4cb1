//! 2D inverse/forward Cooley-Tukey FFT over square power-of-two surfaces.

mod engine;
pub mod kernels;
mod ping_pong;
mod plan;

// Re-export public types
pub use engine::FftEngine;
pub use ping_pong::{next_binding_set, FieldOwner, PingPongState};
pub use plan::{FftDirection, FftPassDescriptor, FftPlan, FftStage, PassAxis};
