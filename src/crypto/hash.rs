//! Random oracle construction
//!
//! A random oracle with an exact output bit length, built from any
//! fixed-length hash function: the seed is the digest of the big-endian
//! output bit length followed by the actual input, the output is that seed
//! stretched through the counter-mode hash PRG and truncated to the
//! requested number of bits. Non-interactive proofs depend on this exact
//! construction being reproduced bit for bit by independent verifiers.

use super::prg::HashPrg;
use digest::Digest;
use std::marker::PhantomData;

/// Zeroes the excess high bits of the first byte of a big-endian string
pub fn mask_top_byte(bytes: &mut [u8], bit_len: usize) {
    if bit_len % 8 != 0 && !bytes.is_empty() {
        bytes[0] &= 0xffu8 >> (8 - bit_len % 8);
    }
}

/// A random oracle with a fixed output bit length
pub struct RandomOracle<D: Digest> {
    bit_len: usize,
    _hash: PhantomData<D>,
}

impl<D: Digest> RandomOracle<D> {
    /// Creates a random oracle producing `bit_len` output bits
    pub fn new(bit_len: usize) -> Self {
        Self {
            bit_len,
            _hash: PhantomData,
        }
    }

    /// Starts an incremental evaluation
    pub fn digest(&self) -> RoDigest<D> {
        let mut inner = D::new();
        inner.input(&(self.bit_len as u32).to_be_bytes());
        RoDigest {
            inner,
            bit_len: self.bit_len,
        }
    }

    /// Evaluates the oracle on a single input
    pub fn hash(&self, data: &[u8]) -> Vec<u8> {
        let mut d = self.digest();
        d.update(data);
        d.finish()
    }
}

/// Incremental random oracle evaluation
pub struct RoDigest<D: Digest> {
    inner: D,
    bit_len: usize,
}

impl<D: Digest> RoDigest<D> {
    /// Absorbs input bytes
    pub fn update(&mut self, data: &[u8]) {
        self.inner.input(data);
    }

    /// Absorbs a byte tree with its injective framing
    pub fn update_tree(&mut self, tree: &crate::bytetree::ByteTree) {
        tree.update(&mut self.inner);
    }

    /// Produces exactly `bit_len` output bits, top-byte masked
    pub fn finish(self) -> Vec<u8> {
        let seed = self.inner.result();
        let mut prg = HashPrg::<D>::new(&seed);
        let mut out = vec![0u8; (self.bit_len + 7) / 8];
        prg.fill(&mut out);
        mask_top_byte(&mut out, self.bit_len);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::RandomOracle;
    use sha2::Sha256;

    #[test]
    fn output_is_deterministic() {
        let a = RandomOracle::<Sha256>::new(1000).hash(b"instance");
        let b = RandomOracle::<Sha256>::new(1000).hash(b"instance");
        assert_eq!(a, b);
        assert_eq!(a.len(), 125);
    }

    #[test]
    fn output_length_is_part_of_the_seed() {
        // Same input, different requested lengths: the shorter output must
        // not be a prefix of the longer one.
        let short = RandomOracle::<Sha256>::new(64).hash(b"x");
        let long = RandomOracle::<Sha256>::new(128).hash(b"x");
        assert_ne!(short[..], long[..8]);
    }

    #[test]
    fn unaligned_lengths_mask_the_top_byte() {
        for &bits in &[1usize, 7, 9, 13, 127] {
            let out = RandomOracle::<Sha256>::new(bits).hash(b"y");
            assert_eq!(out.len(), (bits + 7) / 8);
            assert_eq!(out[0] >> (bits % 8), 0, "bits = {}", bits);
        }
    }

    #[test]
    fn outputs_longer_than_one_digest_are_supported() {
        let out = RandomOracle::<Sha256>::new(8 * 100).hash(b"z");
        assert_eq!(out.len(), 100);
        // The second PRG block must differ from the first.
        assert_ne!(out[..32], out[32..64]);
    }
}
