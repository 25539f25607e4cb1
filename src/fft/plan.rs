//! FFT pass descriptors and the ordered plan consumed by the engine.

use crate::error::{validate_texture_size, OceanError, OceanResult};
use crate::params::FftPassUniform;

/// Transform direction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FftDirection {
    /// Frequency -> spatial, positive twiddle exponent
    Inverse,
    /// Spatial -> frequency, negative twiddle exponent
    Forward,
}

/// Axis a butterfly pass runs along
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassAxis {
    Horizontal,
    Vertical,
}

/// One butterfly pass: index i ∈ [0, log₂N), axis, total size N
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FftPassDescriptor {
    pub index: u32,
    pub axis: PassAxis,
    pub size: u32,
}

/// One step of a transform
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FftStage {
    Shift,
    BitReverse,
    Butterfly(FftPassDescriptor),
}

/// Ordered stage sequence for one direction and size.
///
/// Inverse: shift, bit-reversal, log₂N horizontal, log₂N vertical passes.
/// Forward runs the same passes with the shift moved last, which undoes the
/// inverse sequence up to a factor N².
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FftPlan {
    size: u32,
    direction: FftDirection,
    stages: Vec<FftStage>,
}

impl FftPlan {
    pub fn new(size: u32, direction: FftDirection) -> OceanResult<Self> {
        validate_texture_size(size)?;
        let passes = size.trailing_zeros();

        let mut stages = Vec::with_capacity(2 + 2 * passes as usize);
        if direction == FftDirection::Inverse {
            stages.push(FftStage::Shift);
        }
        stages.push(FftStage::BitReverse);
        for axis in [PassAxis::Horizontal, PassAxis::Vertical] {
            for index in 0..passes {
                stages.push(FftStage::Butterfly(FftPassDescriptor { index, axis, size }));
            }
        }
        if direction == FftDirection::Forward {
            stages.push(FftStage::Shift);
        }

        let plan = Self {
            size,
            direction,
            stages,
        };
        plan.validate()?;
        Ok(plan)
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn direction(&self) -> FftDirection {
        self.direction
    }

    pub fn stages(&self) -> &[FftStage] {
        &self.stages
    }

    /// Total dispatch count: 2 + 2·log₂N
    pub fn expected_stage_count(size: u32) -> usize {
        2 + 2 * size.trailing_zeros() as usize
    }

    /// Check stage count and strict pass ordering against the size
    pub fn validate(&self) -> OceanResult<()> {
        let expected = Self::expected_stage_count(self.size);
        if self.stages.len() != expected {
            return Err(OceanError::invariant(format!(
                "FFT plan for size {} has {} stages, expected {}",
                self.size,
                self.stages.len(),
                expected
            )));
        }

        let passes = self.size.trailing_zeros();
        let butterflies: Vec<&FftPassDescriptor> = self
            .stages
            .iter()
            .filter_map(|stage| match stage {
                FftStage::Butterfly(pass) => Some(pass),
                _ => None,
            })
            .collect();

        for (i, pass) in butterflies.iter().enumerate() {
            let i = i as u32;
            let axis = if i < passes {
                PassAxis::Horizontal
            } else {
                PassAxis::Vertical
            };
            if pass.index != i % passes || pass.axis != axis || pass.size != self.size {
                return Err(OceanError::invariant(format!(
                    "FFT pass {} out of order: {:?}",
                    i, pass
                )));
            }
        }

        let shape_ok = match self.direction {
            FftDirection::Inverse => {
                self.stages[0] == FftStage::Shift && self.stages[1] == FftStage::BitReverse
            }
            FftDirection::Forward => {
                self.stages[0] == FftStage::BitReverse
                    && self.stages[expected - 1] == FftStage::Shift
            }
        };
        if !shape_ok {
            return Err(OceanError::invariant(format!(
                "FFT plan {:?} has misplaced shift/bit-reversal stages",
                self.direction
            )));
        }
        Ok(())
    }

    /// One uniform row per stage, in stage order
    pub fn pass_table(&self) -> Vec<FftPassUniform> {
        let inverse = (self.direction == FftDirection::Inverse) as u32;
        self.stages
            .iter()
            .map(|stage| match stage {
                FftStage::Butterfly(pass) => FftPassUniform {
                    pass_index: pass.index,
                    vertical: (pass.axis == PassAxis::Vertical) as u32,
                    size: self.size,
                    inverse,
                },
                FftStage::Shift | FftStage::BitReverse => FftPassUniform {
                    pass_index: 0,
                    vertical: 0,
                    size: self.size,
                    inverse,
                },
            })
            .collect()
    }
}
