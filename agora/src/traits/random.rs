//! Random source abstraction for testable random number generation.

use rand::RngCore;

/// Trait for providing random bytes.
///
/// Everything random in a participant (salt, IDs, auction choice, bid
/// values) is drawn from here so tests can pin it down.
pub trait RandomSource: Send + Sync {
    /// Fill the destination buffer with random bytes.
    fn fill_bytes(&self, dest: &mut [u8]);

    /// Generate a random 32-byte array (salts and key seeds).
    fn random_bytes_32(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        self.fill_bytes(&mut bytes);
        bytes
    }

    /// Uniform-ish value in `[0, bound)`. Returns 0 when `bound` is 0.
    fn below(&self, bound: u64) -> u64 {
        if bound == 0 {
            return 0;
        }
        let mut bytes = [0u8; 8];
        self.fill_bytes(&mut bytes);
        u64::from_le_bytes(bytes) % bound
    }

    /// Index into a collection of `len` elements, `None` when empty.
    fn pick_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        usize::try_from(self.below(len as u64)).ok()
    }
}

/// Production implementation using the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRng;

impl RandomSource for ThreadRng {
    fn fill_bytes(&self, dest: &mut [u8]) {
        rand::thread_rng().fill_bytes(dest);
    }
}

impl ThreadRng {
    pub fn new() -> Self {
        Self
    }
}
