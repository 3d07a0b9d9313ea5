//! Challenge generation
//!
//! A proof engine never decides where its challenges come from; it hands a
//! byte tree of everything exchanged so far to a [`Challenger`] and gets
//! challenge bytes back. The random-oracle challenger makes proofs
//! non-interactive and reproducible offline; the coin-flipping challenger
//! stands in for a jointly generated random source in interactive runs.

use crate::{bytetree::ByteTree, crypto::hash::RandomOracle};
use digest::Digest;
use std::marker::PhantomData;

/// A source of challenge bytes
pub trait Challenger {
    /// Produces `bit_len` challenge bits bound to the given data
    ///
    /// The data tree must contain every message on which the challenge is
    /// supposed to depend. The statistical distance parameter is carried for
    /// sources that sample rather than hash; oracle-based implementations
    /// ignore it.
    fn challenge(&mut self, data: &ByteTree, bit_len: usize, stat_dist: usize) -> Vec<u8>;
}

/// Random-oracle challenger
///
/// Every query is prefixed with a fixed byte string derived from the public
/// protocol configuration, so that oracles of unrelated executions are
/// independent even on identical messages.
pub struct RandomOracleChallenger<D: Digest> {
    prefix: Vec<u8>,
    _hash: PhantomData<D>,
}

impl<D: Digest> RandomOracleChallenger<D> {
    /// Creates a challenger with the given global prefix
    pub fn new(prefix: Vec<u8>) -> Self {
        Self {
            prefix,
            _hash: PhantomData,
        }
    }

    /// Derives the global prefix by hashing a public configuration tree
    pub fn from_config(config: &ByteTree) -> Self {
        let mut d = D::new();
        config.update(&mut d);
        Self::new(d.result().to_vec())
    }
}

impl<D: Digest> Challenger for RandomOracleChallenger<D> {
    fn challenge(&mut self, data: &ByteTree, bit_len: usize, _stat_dist: usize) -> Vec<u8> {
        let mut d = RandomOracle::<D>::new(bit_len).digest();
        d.update(&self.prefix);
        d.update_tree(data);
        d.finish()
    }
}

/// A supply of jointly generated random bits
pub trait CoinSource {
    /// Produces at least `bit_len` bits as big-endian bytes
    fn coins(&mut self, bit_len: usize) -> Vec<u8>;
}

/// Challenger drawing fresh coins from a shared source
///
/// Used in interactive executions where the parties run a coin-flipping
/// protocol instead of hashing the transcript. The data tree is ignored;
/// binding to the transcript is the source's responsibility.
pub struct CoinFlippingChallenger<S: CoinSource> {
    source: S,
}

impl<S: CoinSource> CoinFlippingChallenger<S> {
    /// Creates a challenger over a coin source
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S: CoinSource> Challenger for CoinFlippingChallenger<S> {
    fn challenge(&mut self, _data: &ByteTree, bit_len: usize, _stat_dist: usize) -> Vec<u8> {
        let mut bytes = self.source.coins(bit_len);
        bytes.truncate((bit_len + 7) / 8);
        crate::crypto::hash::mask_top_byte(&mut bytes, bit_len);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::{Challenger, CoinFlippingChallenger, CoinSource, RandomOracleChallenger};
    use crate::bytetree::ByteTree;
    use rand::{rngs::StdRng, RngCore, SeedableRng};
    use sha2::Sha256;

    struct TestCoins(StdRng);

    impl CoinSource for TestCoins {
        fn coins(&mut self, bit_len: usize) -> Vec<u8> {
            let mut out = vec![0u8; (bit_len + 7) / 8];
            self.0.fill_bytes(&mut out);
            out
        }
    }

    #[test]
    fn oracle_challenges_are_reproducible() {
        let data = ByteTree::node(vec![ByteTree::leaf(vec![1, 2, 3])]);
        let mut a = RandomOracleChallenger::<Sha256>::new(b"run".to_vec());
        let mut b = RandomOracleChallenger::<Sha256>::new(b"run".to_vec());
        assert_eq!(a.challenge(&data, 100, 50), b.challenge(&data, 100, 50));
    }

    #[test]
    fn oracle_challenges_depend_on_prefix_and_data() {
        let data = ByteTree::leaf(vec![9]);
        let other = ByteTree::leaf(vec![8]);
        let mut a = RandomOracleChallenger::<Sha256>::new(b"one".to_vec());
        let mut b = RandomOracleChallenger::<Sha256>::new(b"two".to_vec());
        let base = a.challenge(&data, 128, 50);
        assert_ne!(base, a.challenge(&other, 128, 50));
        assert_ne!(base, b.challenge(&data, 128, 50));
    }

    #[test]
    fn config_prefix_is_deterministic() {
        let config = ByteTree::node(vec![ByteTree::from_u32(5)]);
        let data = ByteTree::leaf(vec![0]);
        let mut a = RandomOracleChallenger::<Sha256>::from_config(&config);
        let mut b = RandomOracleChallenger::<Sha256>::from_config(&config);
        assert_eq!(a.challenge(&data, 64, 50), b.challenge(&data, 64, 50));
    }

    #[test]
    fn coin_challenges_respect_the_bit_length() {
        let mut c = CoinFlippingChallenger::new(TestCoins(StdRng::seed_from_u64(7)));
        for &bits in &[1usize, 9, 100] {
            let out = c.challenge(&ByteTree::leaf(vec![]), bits, 50);
            assert_eq!(out.len(), (bits + 7) / 8);
            if bits % 8 != 0 {
                assert_eq!(out[0] >> (bits % 8), 0);
            }
        }
    }
}
