//! Re-encryption shuffles

use crate::crypto::{
    elgamal::{Ciphertext, PublicKey},
    perm::{Permutation, Shuffles},
};
use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar};
use rand::{CryptoRng, Rng};

/// Re-encrypts and permutes a ciphertext list with a given permutation
///
/// Output position `j` holds the re-encryption of input `pi[j]`; the
/// re-encryption exponents are returned in input order, matching the
/// witness layout the shuffle proofs expect.
pub fn shuffle_with<R: Rng + CryptoRng>(
    pk: &PublicKey,
    w: &[Ciphertext],
    pi: &Permutation,
    rng: &mut R,
) -> (Vec<Ciphertext>, Vec<Scalar>) {
    let s: Vec<Scalar> = (0..w.len()).map(|_| Scalar::random(rng)).collect();
    let t: Vec<Ciphertext> = w
        .iter()
        .zip(s.iter())
        .map(|(w, s)| w + &pk.reencryption_term(s))
        .collect();
    (pi.permute(&t), s)
}

/// Re-encrypts and permutes a ciphertext list with a fresh permutation
pub fn shuffle<R: Rng + CryptoRng>(
    pk: &PublicKey,
    w: &[Ciphertext],
    rng: &mut R,
) -> (Vec<Ciphertext>, Vec<Scalar>, Permutation) {
    let pi = rng.sample(&Shuffles(w.len()));
    let (wp, s) = shuffle_with(pk, w, &pi, rng);
    (wp, s, pi)
}

/// Recombines a mixed list with all parties' decryption factors
pub fn recombine(last: &[Ciphertext], factors: &[Vec<RistrettoPoint>]) -> Vec<RistrettoPoint> {
    last.iter()
        .enumerate()
        .map(|(i, c)| c.1 - factors.iter().map(|f| f[i]).sum::<RistrettoPoint>())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{recombine, shuffle};
    use crate::crypto::elgamal::{keygen, Ciphertext};
    use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar};
    use rand::thread_rng;

    #[test]
    fn shuffling_permutes_the_plaintexts() {
        let mut rng = thread_rng();
        let (pk, sk) = keygen(&mut rng);
        let msgs: Vec<RistrettoPoint> =
            (0..12).map(|_| RistrettoPoint::random(&mut rng)).collect();
        let w: Vec<Ciphertext> = msgs
            .iter()
            .map(|m| pk.encrypt(m, &Scalar::random(&mut rng)))
            .collect();

        let (wp, _, pi) = shuffle(&pk, &w, &mut rng);
        for j in 0..12 {
            assert_eq!(sk.decrypt(&wp[j]), msgs[pi[j]]);
        }
    }

    #[test]
    fn recombination_matches_direct_decryption() {
        let mut rng = thread_rng();
        let (pk1, sk1) = keygen(&mut rng);
        let (pk2, sk2) = keygen(&mut rng);
        let pk = crate::crypto::elgamal::PublicKey(pk1.0 + pk2.0);
        let msgs: Vec<RistrettoPoint> =
            (0..5).map(|_| RistrettoPoint::random(&mut rng)).collect();
        let w: Vec<Ciphertext> = msgs
            .iter()
            .map(|m| pk.encrypt(m, &Scalar::random(&mut rng)))
            .collect();

        let f1: Vec<RistrettoPoint> = w.iter().map(|c| sk1.decryption_factor(&c.0)).collect();
        let f2: Vec<RistrettoPoint> = w.iter().map(|c| sk2.decryption_factor(&c.0)).collect();
        assert_eq!(recombine(&w, &[f1, f2]), msgs);
    }
}
