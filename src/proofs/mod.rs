//! Zero-knowledge proofs
//!
//! The proof machinery comes in three layers: the message-level engines
//! ([`sigma`], [`pos`], [`ccpos`]) that compute and check individual
//! commitments and replies, the session layer ([`session`]) that runs one
//! complete proof against a bulletin board and persists its artifacts, and
//! the sequential drivers ([`sequential`]) that rotate the prover role
//! across all parties of a mix-net.

#![allow(clippy::many_single_char_names)]

pub mod ccpos;
pub mod challenger;
pub mod pos;
pub mod sequential;
pub mod session;
pub mod sigma;

use crate::crypto::{self, prg::HashPrg};
use curve25519_dalek::scalar::Scalar;
use sha2::Sha256;

/// Bit length of PRG seeds exchanged for batching, one digest output wide
pub const SEED_BITS: usize = 256;

/// Security parameters shared by a proof instance
///
/// The challenge bit length bounds the soundness error by `2^-challenge`,
/// the batch bit length bounds the additional error introduced by replacing
/// parallel instances with a random linear combination, and the statistical
/// distance controls how much wider than their bound the blinding exponents
/// are sampled.
#[derive(Copy, Clone, Debug)]
pub struct ProofParams {
    /// Bit length of challenges
    pub challenge_bits: usize,
    /// Bit length of each batching vector component
    pub batch_bits: usize,
    /// Statistical distance parameter
    pub stat_dist: usize,
}

impl ProofParams {
    /// Creates a parameter set
    ///
    /// Panics if the blinding exponents (batch + challenge + statistical
    /// distance bits) would not fit the scalar field.
    pub fn new(challenge_bits: usize, batch_bits: usize, stat_dist: usize) -> Self {
        assert!(challenge_bits > 0 && challenge_bits <= 252);
        assert!(batch_bits > 0);
        assert!(
            batch_bits + challenge_bits + stat_dist <= 252,
            "blinding exponents exceed the scalar field"
        );
        Self {
            challenge_bits,
            batch_bits,
            stat_dist,
        }
    }

    /// Bit length of the blinding exponents for batching-vector components
    pub fn blinder_bits(&self) -> usize {
        self.batch_bits + self.challenge_bits + self.stat_dist
    }
}

/// A challenge: a non-negative integer of fixed bit length
///
/// The bit length is fixed per protocol instance and checked on every use;
/// constructing a challenge wider than declared is a contract violation and
/// panics.
#[derive(Clone, Debug)]
pub struct Challenge {
    scalar: Scalar,
    bits: usize,
}

impl Challenge {
    /// Interprets big-endian challenge bytes
    pub fn from_bytes(bytes: &[u8], bits: usize) -> Self {
        assert!(bits <= 252, "challenge bit length out of range");
        assert!(
            bit_length(bytes) <= bits,
            "challenge exceeds its declared bit length"
        );
        Self {
            scalar: crypto::scalar_from_be_bytes(bytes),
            bits,
        }
    }

    /// The challenge as a scalar
    pub fn scalar(&self) -> &Scalar {
        &self.scalar
    }

    /// The declared bit length
    pub fn bits(&self) -> usize {
        self.bits
    }
}

fn bit_length(bytes: &[u8]) -> usize {
    for (i, &b) in bytes.iter().enumerate() {
        if b != 0 {
            return 8 * (bytes.len() - i - 1) + (8 - b.leading_zeros() as usize);
        }
    }
    0
}

/// Expands a shared seed into a batching vector of bounded exponents
pub fn batch_vector(seed: &[u8], n: usize, bit_len: usize) -> Vec<Scalar> {
    let mut prg = HashPrg::<Sha256>::new(seed);
    crypto::random_bounded_scalars(n, bit_len, &mut prg)
}

#[cfg(test)]
mod tests {
    use super::{batch_vector, bit_length, Challenge};

    #[test]
    fn bit_lengths_are_computed_on_the_leading_byte() {
        assert_eq!(bit_length(&[]), 0);
        assert_eq!(bit_length(&[0, 0]), 0);
        assert_eq!(bit_length(&[1]), 1);
        assert_eq!(bit_length(&[0, 0x80]), 8);
        assert_eq!(bit_length(&[0x13, 0, 0]), 21);
    }

    #[test]
    fn challenges_within_bound_are_accepted() {
        let c = Challenge::from_bytes(&[0x0f, 0xff], 12);
        assert_eq!(c.bits(), 12);
    }

    #[test]
    #[should_panic(expected = "declared bit length")]
    fn oversized_challenges_panic() {
        Challenge::from_bytes(&[0x1f, 0xff], 12);
    }

    #[test]
    fn batch_vectors_are_reproducible() {
        let a = batch_vector(b"seed", 20, 100);
        let b = batch_vector(b"seed", 20, 100);
        assert_eq!(a, b);
        assert_ne!(a, batch_vector(b"other", 20, 100));
    }
}
