//! Duplex sponges used to derive Fiat-Shamir challenges.
//!
//! A sponge is seeded with a 32-byte initialization vector (a digest of the protocol
//! identifier), absorbs the public transcript and squeezes challenge bytes.
//! Two instantiations are provided: [`keccak::KeccakDuplexSponge`], the default,
//! and [`shake::ShakeDuplexSponge`].

use alloc::vec::Vec;

pub mod keccak;
pub mod shake;

/// A cryptographic sponge that can alternate between absorbing and squeezing.
pub trait DuplexSpongeInterface {
    fn new(iv: [u8; 32]) -> Self;

    fn absorb(&mut self, input: &[u8]);

    /// Squeezes `length` bytes; consecutive squeezes continue the same output stream.
    fn squeeze(&mut self, length: usize) -> Vec<u8>;
}
