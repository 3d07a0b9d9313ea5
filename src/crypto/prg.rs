//! Hash-based pseudo-random generator
//!
//! The natural construction of a PRG from a pseudo-random function: output
//! block `i` is the hash of the seed buffer with a big-endian 32-bit counter
//! appended. A seed longer than the buffer is XOR-folded in circularly.
//! Both parties of a proof derive batching vectors from a shared seed
//! through this generator, so its exact behavior is part of the protocol.

use digest::Digest;
use rand::{CryptoRng, RngCore};
use std::marker::PhantomData;

/// Counter-mode PRG over a hash function
pub struct HashPrg<D: Digest> {
    seed: Vec<u8>,
    counter: u32,
    block: Vec<u8>,
    pos: usize,
    _hash: PhantomData<D>,
}

impl<D: Digest> HashPrg<D> {
    /// Creates a generator from a seed
    ///
    /// The effective seed buffer is one digest output wide; longer seeds are
    /// XOR-folded into it circularly, shorter ones are zero-padded.
    pub fn new(seed: &[u8]) -> Self {
        let width = D::output_size();
        let mut folded = vec![0u8; width];
        for (i, &b) in seed.iter().enumerate() {
            folded[i % width] ^= b;
        }
        Self {
            seed: folded,
            counter: 0,
            block: Vec::new(),
            pos: 0,
            _hash: PhantomData,
        }
    }

    fn refill(&mut self) {
        let mut d = D::new();
        d.input(&self.seed);
        d.input(&self.counter.to_be_bytes());
        self.block = d.result().to_vec();
        self.pos = 0;
        self.counter = self.counter.wrapping_add(1);
    }

    /// Fills a buffer with output bytes
    pub fn fill(&mut self, out: &mut [u8]) {
        let mut index = 0;
        while index < out.len() {
            if self.pos == self.block.len() {
                self.refill();
            }
            let len = (out.len() - index).min(self.block.len() - self.pos);
            out[index..index + len].copy_from_slice(&self.block[self.pos..self.pos + len]);
            self.pos += len;
            index += len;
        }
    }

    /// Produces `n` output bytes
    pub fn bytes(&mut self, n: usize) -> Vec<u8> {
        let mut out = vec![0u8; n];
        self.fill(&mut out);
        out
    }
}

impl<D: Digest> RngCore for HashPrg<D> {
    fn next_u32(&mut self) -> u32 {
        let mut buf = [0u8; 4];
        self.fill(&mut buf);
        u32::from_be_bytes(buf)
    }

    fn next_u64(&mut self) -> u64 {
        let mut buf = [0u8; 8];
        self.fill(&mut buf);
        u64::from_be_bytes(buf)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.fill(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill(dest);
        Ok(())
    }
}

impl<D: Digest> CryptoRng for HashPrg<D> {}

#[cfg(test)]
mod tests {
    use super::HashPrg;
    use sha2::Sha256;

    #[test]
    fn same_seed_same_stream() {
        let a = HashPrg::<Sha256>::new(b"seed").bytes(100);
        let b = HashPrg::<Sha256>::new(b"seed").bytes(100);
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_diverge() {
        let a = HashPrg::<Sha256>::new(b"seed-a").bytes(64);
        let b = HashPrg::<Sha256>::new(b"seed-b").bytes(64);
        assert_ne!(a, b);
    }

    #[test]
    fn chunked_reads_match_one_shot_reads() {
        let whole = HashPrg::<Sha256>::new(b"chunks").bytes(90);
        let mut prg = HashPrg::<Sha256>::new(b"chunks");
        let mut pieces = prg.bytes(1);
        pieces.extend(prg.bytes(31));
        pieces.extend(prg.bytes(58));
        assert_eq!(whole, pieces);
    }

    #[test]
    fn long_seeds_fold_rather_than_truncate() {
        let mut long = vec![0u8; 40];
        long[35] = 0xaa;
        let folded = HashPrg::<Sha256>::new(&long).bytes(32);
        let trunc = HashPrg::<Sha256>::new(&long[..32]).bytes(32);
        assert_ne!(folded, trunc);
    }
}
