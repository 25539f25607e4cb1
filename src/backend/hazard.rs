//! Read-after-write hazard tracking between barriers.

use std::collections::HashSet;

use super::{Dispatch, SurfaceId};
use crate::error::{OceanError, OceanResult};

/// Tracks which surfaces were written since the last barrier.
///
/// Any dispatch that reads one of them is rejected: GPU writes are not
/// visible to the next dispatch without a barrier.
#[derive(Debug, Default)]
pub struct HazardTracker {
    pending_writes: HashSet<SurfaceId>,
}

impl HazardTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate binding arity and hazards, then record the dispatch's writes
    pub fn check(&mut self, dispatch: &Dispatch<'_>) -> OceanResult<()> {
        let (reads, writes) = dispatch.kernel.arity();
        if dispatch.reads.len() != reads || dispatch.writes.len() != writes {
            return Err(OceanError::invariant(format!(
                "{:?} expects {} reads and {} writes, got {} and {}",
                dispatch.kernel,
                reads,
                writes,
                dispatch.reads.len(),
                dispatch.writes.len()
            )));
        }
        if dispatch.kernel.uses_pass_table() && dispatch.pass.is_none() {
            return Err(OceanError::invariant(format!(
                "{:?} dispatched without a pass table row",
                dispatch.kernel
            )));
        }

        for (i, write) in dispatch.writes.iter().enumerate() {
            if dispatch.writes[..i].contains(write) {
                return Err(OceanError::invariant(format!(
                    "{:?} binds {:?} as two outputs",
                    dispatch.kernel, write
                )));
            }
        }

        for read in dispatch.reads {
            if dispatch.writes.contains(read) {
                return Err(OceanError::invariant(format!(
                    "{:?} reads and writes {:?} in one dispatch",
                    dispatch.kernel, read
                )));
            }
            if self.pending_writes.contains(read) {
                return Err(OceanError::invariant(format!(
                    "{:?} reads {:?} without a barrier after its last write",
                    dispatch.kernel, read
                )));
            }
        }

        self.pending_writes.extend(dispatch.writes.iter().copied());
        Ok(())
    }

    pub fn barrier(&mut self) {
        self.pending_writes.clear();
    }

    /// Forget a destroyed surface
    pub fn release(&mut self, surface: SurfaceId) {
        self.pending_writes.remove(&surface);
    }

    pub fn has_pending_writes(&self) -> bool {
        !self.pending_writes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Kernel, PassRef, PassTableId};

    const A: SurfaceId = SurfaceId(1);
    const B: SurfaceId = SurfaceId(2);
    const C: SurfaceId = SurfaceId(3);

    fn pass() -> PassRef {
        PassRef {
            table: PassTableId(0),
            index: 0,
        }
    }

    #[test]
    fn test_read_after_write_requires_barrier() {
        let mut tracker = HazardTracker::new();
        tracker
            .check(&Dispatch::per_texel(Kernel::FftShift, 8, &[A], &[B]).with_pass(pass()))
            .unwrap();

        let dependent = Dispatch::per_texel(Kernel::BitReverse, 8, &[B], &[C]).with_pass(pass());
        assert!(tracker.check(&dependent).is_err());

        tracker.barrier();
        assert!(tracker.check(&dependent).is_ok());
    }

    #[test]
    fn test_aliased_read_write_rejected() {
        let mut tracker = HazardTracker::new();
        let aliased = Dispatch::per_texel(Kernel::GenerateSpectrum, 8, &[A], &[A]);
        assert!(tracker.check(&aliased).is_err());
    }

    #[test]
    fn test_duplicate_outputs_rejected() {
        let mut tracker = HazardTracker::new();
        let twice = Dispatch::per_texel(Kernel::PropagateWaves, 8, &[A], &[B, B]);
        assert!(tracker.check(&twice).is_err());
    }

    #[test]
    fn test_arity_and_pass_checked() {
        let mut tracker = HazardTracker::new();
        let wrong = Dispatch::per_texel(Kernel::PropagateWaves, 8, &[A], &[B]);
        assert!(tracker.check(&wrong).is_err());

        let no_pass = Dispatch::per_texel(Kernel::Butterfly, 8, &[A], &[B]);
        assert!(tracker.check(&no_pass).is_err());
    }

    #[test]
    fn test_independent_dispatches_need_no_barrier() {
        let mut tracker = HazardTracker::new();
        tracker
            .check(&Dispatch::per_texel(Kernel::GenerateSpectrum, 8, &[A], &[B]))
            .unwrap();
        tracker
            .check(&Dispatch::per_texel(Kernel::GenerateSpectrum, 8, &[A], &[C]))
            .unwrap();
        assert!(tracker.has_pending_writes());
    }
}
