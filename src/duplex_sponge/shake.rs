//! SHAKE-based duplex sponge implementation
//!
//! This module implements a duplex sponge construction using SHAKE128.

use alloc::vec;
use alloc::vec::Vec;

use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake128;

use crate::duplex_sponge::DuplexSpongeInterface;

/// Duplex sponge construction using SHAKE128.
///
/// Squeezing reads the XOF stream of everything absorbed so far; consecutive
/// squeezes continue that stream, and absorbing restarts it.
#[derive(Clone, Debug)]
pub struct ShakeDuplexSponge {
    hasher: Shake128,
    squeezed: usize,
}

impl DuplexSpongeInterface for ShakeDuplexSponge {
    fn new(iv: [u8; 32]) -> Self {
        let mut hasher = Shake128::default();
        let initial_block = [iv.to_vec(), vec![0u8; 168 - 32]].concat();
        hasher.update(&initial_block);
        Self {
            hasher,
            squeezed: 0,
        }
    }

    fn absorb(&mut self, input: &[u8]) {
        self.hasher.update(input);
        self.squeezed = 0;
    }

    fn squeeze(&mut self, length: usize) -> Vec<u8> {
        let mut reader = self.hasher.clone().finalize_xof();
        let mut skipped = vec![0u8; self.squeezed];
        reader.read(&mut skipped);
        let mut output = vec![0u8; length];
        reader.read(&mut output);
        self.squeezed += length;
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squeezes_continue_the_stream() {
        let mut once = ShakeDuplexSponge::new([3u8; 32]);
        once.absorb(b"announcement");
        let long = once.squeeze(64);

        let mut twice = ShakeDuplexSponge::new([3u8; 32]);
        twice.absorb(b"announcement");
        let mut split = twice.squeeze(16);
        split.extend(twice.squeeze(48));
        assert_eq!(long, split);
    }
}
