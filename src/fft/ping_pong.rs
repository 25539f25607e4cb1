//! Ping-pong role tracking between a field's surface and its scratch twin.

use crate::backend::SurfaceId;

/// Which surface currently holds the logical field
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldOwner {
    Primary,
    Scratch,
}

impl FieldOwner {
    fn flipped(self) -> Self {
        match self {
            FieldOwner::Primary => FieldOwner::Scratch,
            FieldOwner::Scratch => FieldOwner::Primary,
        }
    }
}

/// {current owner, scratch} state threaded through a transform
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PingPongState {
    pub primary: SurfaceId,
    pub scratch: SurfaceId,
    pub owner: FieldOwner,
}

impl PingPongState {
    pub fn new(primary: SurfaceId, scratch: SurfaceId) -> Self {
        Self {
            primary,
            scratch,
            owner: FieldOwner::Primary,
        }
    }

    /// Surface holding the field right now
    pub fn current(&self) -> SurfaceId {
        match self.owner {
            FieldOwner::Primary => self.primary,
            FieldOwner::Scratch => self.scratch,
        }
    }
}

/// Surfaces to read and write for the next pass, and the state after it
pub fn next_binding_set(state: PingPongState) -> (SurfaceId, SurfaceId, PingPongState) {
    let next = PingPongState {
        owner: state.owner.flipped(),
        ..state
    };
    (state.current(), next.current(), next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_alternate() {
        let state = PingPongState::new(SurfaceId(1), SurfaceId(2));

        let (read, write, state) = next_binding_set(state);
        assert_eq!((read, write), (SurfaceId(1), SurfaceId(2)));
        assert_eq!(state.owner, FieldOwner::Scratch);

        let (read, write, state) = next_binding_set(state);
        assert_eq!((read, write), (SurfaceId(2), SurfaceId(1)));
        assert_eq!(state.owner, FieldOwner::Primary);
    }

    #[test]
    fn test_odd_pass_count_ends_in_scratch() {
        let mut state = PingPongState::new(SurfaceId(1), SurfaceId(2));
        for _ in 0..5 {
            state = next_binding_set(state).2;
        }
        assert_eq!(state.current(), SurfaceId(2));
    }
}
