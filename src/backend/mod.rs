//! Compute backends: the surface/dispatch/barrier primitives the simulation
//! records its work against.
//!
//! A backend owns opaque square surfaces of RGBA32F texels, a parameter
//! record, and FFT pass tables. Work is recorded as an ordered sequence of
//! [`Dispatch`]es separated by explicit [`ComputeBackend::barrier`] calls.

mod cpu;
pub mod gpu;
mod hazard;

pub use cpu::CpuBackend;
pub use gpu::{GpuBackend, GpuContext};
pub use hazard::HazardTracker;

use crate::error::OceanResult;
use crate::params::{FftPassUniform, OceanUniforms};

/// One complex-packed texel: two complex samples (x + iy, z + iw)
pub type Texel = [f32; 4];

/// Opaque handle to a square N×N surface owned by a backend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u32);

/// Opaque handle to an uploaded FFT pass table
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PassTableId(pub u32);

/// Reference to one row of a pass table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PassRef {
    pub table: PassTableId,
    pub index: u32,
}

/// Compute kernels available on every backend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kernel {
    /// noise -> H₀
    GenerateSpectrum,
    /// H₀ -> packed displacement spectrum, packed derivative spectrum
    PropagateWaves,
    /// Quadrant swap (DC between corner and center)
    FftShift,
    /// Bit-reversal permutation of both axes
    BitReverse,
    /// One radix-2 butterfly pass along one axis
    Butterfly,
    /// displacement, derivatives, previous foam -> height, displacement, normal, foam
    CombineFields,
}

impl Kernel {
    /// Number of (read, write) surface bindings the kernel expects
    pub fn arity(self) -> (usize, usize) {
        match self {
            Kernel::GenerateSpectrum => (1, 1),
            Kernel::PropagateWaves => (1, 2),
            Kernel::FftShift | Kernel::BitReverse | Kernel::Butterfly => (1, 1),
            Kernel::CombineFields => (3, 4),
        }
    }

    /// Whether the kernel consumes an FFT pass table row
    pub fn uses_pass_table(self) -> bool {
        matches!(
            self,
            Kernel::FftShift | Kernel::BitReverse | Kernel::Butterfly
        )
    }

    /// WGSL entry point name
    pub fn entry_point(self) -> &'static str {
        match self {
            Kernel::GenerateSpectrum => "generate_spectrum",
            Kernel::PropagateWaves => "propagate_waves",
            Kernel::FftShift => "fft_shift",
            Kernel::BitReverse => "bit_reverse",
            Kernel::Butterfly => "butterfly",
            Kernel::CombineFields => "combine_fields",
        }
    }

    pub const ALL: [Kernel; 6] = [
        Kernel::GenerateSpectrum,
        Kernel::PropagateWaves,
        Kernel::FftShift,
        Kernel::BitReverse,
        Kernel::Butterfly,
        Kernel::CombineFields,
    ];
}

/// One recorded compute dispatch
#[derive(Clone, Debug)]
pub struct Dispatch<'a> {
    pub kernel: Kernel,
    pub reads: &'a [SurfaceId],
    pub writes: &'a [SurfaceId],
    pub pass: Option<PassRef>,
    /// Invocation count per axis (one invocation per texel)
    pub threads: [u32; 3],
}

impl<'a> Dispatch<'a> {
    /// A dispatch with one invocation per texel of an N×N surface
    pub fn per_texel(
        kernel: Kernel,
        size: u32,
        reads: &'a [SurfaceId],
        writes: &'a [SurfaceId],
    ) -> Self {
        Self {
            kernel,
            reads,
            writes,
            pass: None,
            threads: [size, size, 1],
        }
    }

    pub fn with_pass(mut self, pass: PassRef) -> Self {
        self.pass = Some(pass);
        self
    }
}

/// Resource creation, dispatch and synchronization primitives.
///
/// Recording is strictly sequential on the calling thread. A barrier must
/// separate any dispatch from a later one that reads what it wrote.
pub trait ComputeBackend {
    /// Allocate an N×N surface initialized to zero
    fn create_surface(&mut self, size: u32, label: &str) -> OceanResult<SurfaceId>;

    fn destroy_surface(&mut self, surface: SurfaceId);

    /// Upload texel data (row-major, `size * size` texels)
    fn write_surface(&mut self, surface: SurfaceId, texels: &[Texel]) -> OceanResult<()>;

    /// Read a surface back to host memory, flushing recorded work first
    fn read_surface(&mut self, surface: SurfaceId) -> OceanResult<Vec<Texel>>;

    /// Upload an immutable table of FFT pass descriptors
    fn create_pass_table(&mut self, passes: &[FftPassUniform]) -> OceanResult<PassTableId>;

    fn destroy_pass_table(&mut self, table: PassTableId);

    /// Replace the parameter record used by spectrum/propagate/combine kernels
    fn write_uniforms(&mut self, uniforms: &OceanUniforms) -> OceanResult<()>;

    fn dispatch(&mut self, dispatch: &Dispatch<'_>) -> OceanResult<()>;

    /// Make every write recorded so far visible to later dispatches
    fn barrier(&mut self);

    /// Hand recorded work to the device
    fn submit(&mut self);
}
