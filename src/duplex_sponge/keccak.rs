//! Keccak-based duplex sponge.
//!
//! Keccak-f\[1600\] in overwrite mode with a rate of 136 bytes; the initialization
//! vector is written into the first 32 bytes of the capacity.

use alloc::vec::Vec;

use zerocopy::IntoBytes;

use crate::duplex_sponge::DuplexSpongeInterface;

const RATE: usize = 136;
const WIDTH: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Absorbing,
    Squeezing,
}

/// Duplex sponge construction using Keccak-f\[1600\].
#[derive(Clone)]
pub struct KeccakDuplexSponge {
    lanes: [u64; WIDTH / 8],
    phase: Phase,
    /// Next byte of the rate to write or read.
    position: usize,
}

impl KeccakDuplexSponge {
    fn bytes_mut(&mut self) -> &mut [u8] {
        self.lanes.as_mut_bytes()
    }

    fn permute(&mut self) {
        keccak::f1600(&mut self.lanes);
        self.position = 0;
    }
}

impl DuplexSpongeInterface for KeccakDuplexSponge {
    fn new(iv: [u8; 32]) -> Self {
        let mut sponge = Self {
            lanes: [0; WIDTH / 8],
            phase: Phase::Absorbing,
            position: 0,
        };
        sponge.bytes_mut()[RATE..RATE + 32].copy_from_slice(&iv);
        sponge
    }

    fn absorb(&mut self, mut input: &[u8]) {
        if self.phase == Phase::Squeezing {
            // squeezing always permutes first, so the rate is fresh output here
            self.phase = Phase::Absorbing;
            self.position = 0;
        }
        while !input.is_empty() {
            if self.position == RATE {
                self.permute();
            }
            let (start, len) = (self.position, usize::min(RATE - self.position, input.len()));
            self.bytes_mut()[start..start + len].copy_from_slice(&input[..len]);
            self.position += len;
            input = &input[len..];
        }
    }

    fn squeeze(&mut self, length: usize) -> Vec<u8> {
        let mut output = Vec::with_capacity(length);
        while output.len() < length {
            if self.phase == Phase::Absorbing {
                self.phase = Phase::Squeezing;
                self.permute();
            } else if self.position == RATE {
                self.permute();
            }
            let start = self.position;
            let len = usize::min(RATE - start, length - output.len());
            output.extend_from_slice(&self.lanes.as_bytes()[start..start + len]);
            self.position += len;
        }
        output
    }
}
