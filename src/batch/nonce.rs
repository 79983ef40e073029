//! Nonce Allocation
//!
//! Position `i` of a batch always uses `starting_nonce + i`. The nonce is
//! fixed for every retry of that position and never reassigned.

/// Maps batch positions to account nonces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonceAllocator {
    starting_nonce: u64,
}

impl NonceAllocator {
    pub fn new(starting_nonce: u64) -> Self {
        Self { starting_nonce }
    }

    /// Nonce for the transaction at `index`
    pub fn nonce_at(&self, index: usize) -> u64 {
        self.starting_nonce + index as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonce_is_start_plus_index() {
        let allocator = NonceAllocator::new(5);
        assert_eq!(allocator.nonce_at(0), 5);
        assert_eq!(allocator.nonce_at(1), 6);
        assert_eq!(allocator.nonce_at(10), 15);
    }

    #[test]
    fn test_nonce_is_stable() {
        let allocator = NonceAllocator::new(42);
        assert_eq!(allocator.nonce_at(3), allocator.nonce_at(3));
        assert_eq!(allocator.nonce_at(0), 42);
    }
}
