use super::ping_pong::{next_binding_set, FieldOwner, PingPongState};
use super::plan::{FftDirection, FftPlan, FftStage};
use crate::backend::{ComputeBackend, Dispatch, Kernel, PassRef, PassTableId, SurfaceId};
use crate::error::OceanResult;

/// 2D radix-2 transform of one N×N field.
///
/// Owns a private scratch surface, so two engines never race on shared
/// scratch storage. Pass tables for both directions are uploaded once at
/// construction.
#[derive(Debug)]
pub struct FftEngine {
    size: u32,
    scratch: SurfaceId,
    inverse: (FftPlan, PassTableId),
    forward: (FftPlan, PassTableId),
}

impl FftEngine {
    pub fn new<B: ComputeBackend>(backend: &mut B, size: u32) -> OceanResult<Self> {
        let inverse_plan = FftPlan::new(size, FftDirection::Inverse)?;
        let forward_plan = FftPlan::new(size, FftDirection::Forward)?;

        let scratch = backend.create_surface(size, "fft scratch")?;
        let inverse_table = backend.create_pass_table(&inverse_plan.pass_table())?;
        let forward_table = backend.create_pass_table(&forward_plan.pass_table())?;

        log::debug!(
            "FFT engine {}x{}: {} stages per transform",
            size,
            size,
            inverse_plan.stages().len()
        );

        Ok(Self {
            size,
            scratch,
            inverse: (inverse_plan, inverse_table),
            forward: (forward_plan, forward_table),
        })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn scratch(&self) -> SurfaceId {
        self.scratch
    }

    pub fn plan(&self, direction: FftDirection) -> &FftPlan {
        match direction {
            FftDirection::Inverse => &self.inverse.0,
            FftDirection::Forward => &self.forward.0,
        }
    }

    /// Record every stage of `direction` on `field`, each followed by a
    /// barrier. Returns which surface holds the result.
    pub fn transform<B: ComputeBackend>(
        &self,
        backend: &mut B,
        field: SurfaceId,
        direction: FftDirection,
    ) -> OceanResult<FieldOwner> {
        let (plan, table) = match direction {
            FftDirection::Inverse => (&self.inverse.0, self.inverse.1),
            FftDirection::Forward => (&self.forward.0, self.forward.1),
        };
        plan.validate()?;

        let mut state = PingPongState::new(field, self.scratch);
        for (index, stage) in plan.stages().iter().enumerate() {
            let kernel = match stage {
                FftStage::Shift => Kernel::FftShift,
                FftStage::BitReverse => Kernel::BitReverse,
                FftStage::Butterfly(_) => Kernel::Butterfly,
            };
            let (read, write, next) = next_binding_set(state);
            let reads = [read];
            let writes = [write];
            let pass = PassRef {
                table,
                index: index as u32,
            };
            let dispatch = Dispatch::per_texel(kernel, self.size, &reads, &writes).with_pass(pass);
            backend.dispatch(&dispatch)?;
            backend.barrier();
            state = next;
        }

        Ok(state.owner)
    }

    /// Handle of the surface that `owner` names for `field`
    pub fn resolve(&self, field: SurfaceId, owner: FieldOwner) -> SurfaceId {
        match owner {
            FieldOwner::Primary => field,
            FieldOwner::Scratch => self.scratch,
        }
    }

    pub fn destroy<B: ComputeBackend>(self, backend: &mut B) {
        backend.destroy_surface(self.scratch);
        backend.destroy_pass_table(self.inverse.1);
        backend.destroy_pass_table(self.forward.1);
    }
}

impl FieldOwner {
    /// Surface holding `field` after a transform run by `engine`
    pub fn surface(self, field: SurfaceId, engine: &FftEngine) -> SurfaceId {
        engine.resolve(field, self)
    }
}
