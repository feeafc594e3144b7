use crate::{memory::Memory, stack::Stack};

/// Recycled stack and memory buffers for call frames.
///
/// Entering a call borrows a pair, returning releases it; the borrow depth
/// mirrors the call depth so the pool never holds more pairs than the
/// deepest call chain seen. This keeps the hot path free of large
/// allocations: a stack is 32 KiB that would otherwise be allocated and
/// zeroed on every CALL.
#[derive(Debug, Default)]
pub struct FramePool {
    stacks: Vec<Stack>,
    memories: Vec<Memory>,
}

impl FramePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrows a cleared stack/memory pair.
    pub fn acquire(&mut self) -> (Stack, Memory) {
        (
            self.stacks.pop().unwrap_or_default(),
            self.memories.pop().unwrap_or_default(),
        )
    }

    /// Returns a pair to the pool.
    pub fn release(&mut self, mut stack: Stack, mut memory: Memory) {
        stack.clear();
        memory.clear();
        self.stacks.push(stack);
        self.memories.push(memory);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethereum_types::U256;

    #[test]
    fn released_buffers_come_back_cleared() {
        let mut pool = FramePool::new();
        let (mut stack, mut memory) = pool.acquire();
        stack.push(U256::one()).unwrap();
        memory.expand(0, 32);
        pool.release(stack, memory);

        let (stack, memory) = pool.acquire();
        assert!(stack.is_empty());
        assert!(memory.is_empty());
    }
}
