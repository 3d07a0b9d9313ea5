//! Permutation commitments and independent generators

use super::{hash::RandomOracle, perm::Permutation, prg::HashPrg};
use curve25519_dalek::{
    constants::RISTRETTO_BASEPOINT_TABLE,
    ristretto::{RistrettoBasepointTable, RistrettoPoint},
    scalar::Scalar,
};
use rand::{CryptoRng, Rng};
use sha2::Sha256;

const G: &RistrettoBasepointTable = &RISTRETTO_BASEPOINT_TABLE;

/// Derives a list of independent generators from a context string
///
/// A random-oracle construction: the oracle output seeds the hash PRG, and
/// each generator is a 64-byte block mapped uniformly onto the group. Nobody
/// knows discrete logarithm relations among the results, which is what the
/// permutation commitments below rely on.
pub fn derive_generators(count: usize, context: &[u8]) -> Vec<RistrettoPoint> {
    let mut d = RandomOracle::<Sha256>::new(8 * 32).digest();
    d.update(b"independent generators");
    d.update(context);
    let mut prg = HashPrg::<Sha256>::new(&d.finish());

    (0..count)
        .map(|_| {
            let mut block = [0u8; 64];
            prg.fill(&mut block);
            RistrettoPoint::from_uniform_bytes(&block)
        })
        .collect()
}

/// Commits to a permutation under a list of independent generators
///
/// Returns the commitment `u` with `u[pi[i]] = g^{r_i} * h_i` together with
/// the commitment exponents `r`. The committer can open `u` to `(r, pi)`;
/// everyone else only ever sees `u`.
pub fn commit<R: Rng + CryptoRng>(
    h: &[RistrettoPoint],
    pi: &Permutation,
    rng: &mut R,
) -> (Vec<RistrettoPoint>, Vec<Scalar>) {
    assert_eq!(h.len(), pi.len());
    let r: Vec<Scalar> = (0..h.len()).map(|_| Scalar::random(rng)).collect();
    let t: Vec<RistrettoPoint> = h
        .iter()
        .zip(r.iter())
        .map(|(hi, ri)| G * ri + hi)
        .collect();
    (pi.inverse().permute(&t), r)
}

/// The trivial commitment to the identity permutation with zero exponents
///
/// Substituted when a party's published commitment is malformed or absent:
/// the pipeline keeps a valid-shaped commitment for every index, at the cost
/// of that party's shuffle step contributing no privacy.
pub fn trivial(h: &[RistrettoPoint]) -> Vec<RistrettoPoint> {
    h.to_vec()
}

#[cfg(test)]
mod tests {
    use super::{commit, derive_generators, trivial, G};
    use crate::crypto::perm::Shuffles;
    use rand::{thread_rng, Rng};

    #[test]
    fn generator_derivation_is_deterministic() {
        let a = derive_generators(10, b"session 1");
        let b = derive_generators(10, b"session 1");
        let c = derive_generators(10, b"session 2");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn commitment_opens_at_permuted_positions() {
        let mut rng = thread_rng();
        let h = derive_generators(8, b"t");
        let pi = rng.sample(&Shuffles(8));
        let (u, r) = commit(&h, &pi, &mut rng);
        for i in 0..8 {
            assert_eq!(u[pi[i]], G * &r[i] + h[i]);
        }
    }

    #[test]
    fn trivial_commitment_is_the_generator_list() {
        let h = derive_generators(5, b"t");
        assert_eq!(trivial(&h), h);
    }
}
