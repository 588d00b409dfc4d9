//! src/common.rs

use crate::ir::state_machine::StateId;

/// Default bound on parse tree nesting, shared by the validator and the tree
/// writer.
pub const MAX_NESTING_DEPTH: usize = 512;

const RED_ZONE: usize = 100 * 1024;
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Runs `f`, first moving to a fresh stack segment if less than the red zone
/// is left. Every recursive walk over a tree goes through this, so nesting
/// depth is bounded by heap, not by the thread's stack.
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// Hands out state ids for one function body's lowering.
///
/// Ids are never reused and strictly increase in allocation order. The
/// allocator is owned by a single compilation unit; the transformer borrows
/// it mutably, so two units can never share one.
#[derive(Debug, Default)]
pub struct StateAllocator {
    next_state: StateId,
}

impl StateAllocator {
    pub fn new() -> Self {
        StateAllocator { next_state: 0 }
    }

    /// Continues numbering from a counter the driver already advanced.
    pub fn starting_at(next_state: StateId) -> Self {
        StateAllocator { next_state }
    }

    /// 获取下一个唯一的状态 ID。
    pub fn allocate_state(&mut self) -> StateId {
        let id = self.next_state;
        self.next_state += 1;
        id
    }

    /// The id the next call to [`allocate_state`](Self::allocate_state) returns.
    pub fn peek(&self) -> StateId {
        self.next_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_increase_from_zero() {
        let mut allocator = StateAllocator::new();
        assert_eq!(allocator.allocate_state(), 0);
        assert_eq!(allocator.allocate_state(), 1);
        assert_eq!(allocator.peek(), 2);
    }

    #[test]
    fn starting_at_continues_driver_counter() {
        let mut allocator = StateAllocator::starting_at(40);
        assert_eq!(allocator.allocate_state(), 40);
        assert_eq!(allocator.allocate_state(), 41);
    }

    #[test]
    fn deep_recursion_grows_the_stack() {
        fn count_down(n: usize) -> usize {
            let padding = [0u8; 512];
            if n == 0 {
                return padding.len() - 512;
            }
            ensure_sufficient_stack(|| count_down(n - 1)) + usize::from(padding[n % 512] == 0)
        }
        assert_eq!(count_down(20_000), 20_000);
    }
}
