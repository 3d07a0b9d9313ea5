//! Commitment-consistent proof of a shuffle
//!
//! The companion of the permutation-commitment argument: given a
//! permutation commitment `u` that has already been proven well-formed, a
//! prover shows that an output ciphertext list is the input list
//! re-encrypted and permuted by the committed permutation. Only two
//! equations are checked here; the heavy lifting lives in [`super::pos`].

use crate::{
    bytetree::{ByteTree, ByteTreeReader},
    crypto::{
        self,
        elgamal::{Ciphertext, PublicKey},
        perm::Permutation,
    },
    Result,
};
use curve25519_dalek::{
    ristretto::RistrettoPoint,
    scalar::Scalar,
    traits::{Identity, MultiscalarMul, VartimeMultiscalarMul},
};
use rand::{CryptoRng, Rng};

use super::{batch_vector, Challenge, ProofParams};

fn ciphertext_msm(e: &[Scalar], cs: &[Ciphertext]) -> Ciphertext {
    Ciphertext(
        RistrettoPoint::vartime_multiscalar_mul(e.iter(), cs.iter().map(|c| &c.0)),
        RistrettoPoint::vartime_multiscalar_mul(e.iter(), cs.iter().map(|c| &c.1)),
    )
}

fn ciphertext_msm_ct(e: &[Scalar], cs: &[Ciphertext]) -> Ciphertext {
    Ciphertext(
        RistrettoPoint::multiscalar_mul(e.iter(), cs.iter().map(|c| &c.0)),
        RistrettoPoint::multiscalar_mul(e.iter(), cs.iter().map(|c| &c.1)),
    )
}

/// Prover state before the commitment message
pub struct CCPoSProver {
    g: RistrettoPoint,
    h: Vec<RistrettoPoint>,
    pk: PublicKey,
    wp: Vec<Ciphertext>,
    r: Vec<Scalar>,
    pi: Permutation,
    s: Vec<Scalar>,
    params: ProofParams,
}

impl CCPoSProver {
    /// Creates a prover for output list `wp`, opening the permutation
    /// commitment with `(r, pi)` and the re-encryption with exponents `s`
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        g: RistrettoPoint,
        h: &[RistrettoPoint],
        pk: &PublicKey,
        wp: &[Ciphertext],
        r: &[Scalar],
        pi: &Permutation,
        s: &[Scalar],
        params: ProofParams,
    ) -> Self {
        assert!(!h.is_empty());
        assert_eq!(h.len(), wp.len());
        assert_eq!(h.len(), r.len());
        assert_eq!(h.len(), pi.len());
        assert_eq!(h.len(), s.len());
        Self {
            g,
            h: h.to_vec(),
            pk: *pk,
            wp: wp.to_vec(),
            r: r.to_vec(),
            pi: pi.clone(),
            s: s.to_vec(),
            params,
        }
    }

    fn reenc(&self, t: &Scalar) -> Ciphertext {
        Ciphertext(self.g * t, self.pk.0 * t)
    }

    /// Derives the batching vector from `seed` and produces the commitment
    /// message
    pub fn commit<R: Rng + CryptoRng>(
        self,
        seed: &[u8],
        rng: &mut R,
    ) -> (CCPoSProverCommitted, ByteTree) {
        let n = self.h.len();
        let e = batch_vector(seed, n, self.params.batch_bits);
        let ipe = self.pi.permute(&e);

        let alpha = Scalar::random(rng);
        let beta = Scalar::random(rng);
        let eps = crypto::random_bounded_scalars(n, self.params.blinder_bits(), rng);

        let ap = self.g * alpha + RistrettoPoint::multiscalar_mul(eps.iter(), self.h.iter());
        let bp = self.reenc(&-beta) + ciphertext_msm_ct(&eps, &self.wp);

        let tree = ByteTree::node(vec![crypto::point_to_tree(&ap), bp.to_tree()]);
        (
            CCPoSProverCommitted {
                r: self.r,
                s: self.s,
                e,
                ipe,
                alpha,
                beta,
                eps,
            },
            tree,
        )
    }
}

/// Prover state after the commitment message
pub struct CCPoSProverCommitted {
    r: Vec<Scalar>,
    s: Vec<Scalar>,
    e: Vec<Scalar>,
    ipe: Vec<Scalar>,
    alpha: Scalar,
    beta: Scalar,
    eps: Vec<Scalar>,
}

impl CCPoSProverCommitted {
    /// Produces the reply message for a challenge
    pub fn reply(self, v: &Challenge) -> ByteTree {
        let v = v.scalar();
        let a: Scalar = self.r.iter().zip(self.ipe.iter()).map(|(r, e)| r * e).sum();
        let b: Scalar = self.s.iter().zip(self.e.iter()).map(|(s, e)| s * e).sum();

        let ka = a * v + self.alpha;
        let kb = b * v + self.beta;
        let ke: Vec<Scalar> = self
            .ipe
            .iter()
            .zip(self.eps.iter())
            .map(|(e, eps)| e * v + eps)
            .collect();

        ByteTree::node(vec![
            crypto::scalar_to_tree(&ka),
            crypto::scalar_to_tree(&kb),
            crypto::scalars_to_tree(&ke),
        ])
    }
}

/// Verifier state before the commitment message
pub struct CCPoSVerifier {
    g: RistrettoPoint,
    h: Vec<RistrettoPoint>,
    u: Vec<RistrettoPoint>,
    pk: PublicKey,
    w: Vec<Ciphertext>,
    wp: Vec<Ciphertext>,
    params: ProofParams,
}

impl CCPoSVerifier {
    /// Creates a verifier for the claim that `wp` re-encrypts and permutes
    /// `w` consistently with the permutation commitment `u`
    pub fn new(
        g: RistrettoPoint,
        h: &[RistrettoPoint],
        u: &[RistrettoPoint],
        pk: &PublicKey,
        w: &[Ciphertext],
        wp: &[Ciphertext],
        params: ProofParams,
    ) -> Self {
        assert!(!h.is_empty());
        assert_eq!(h.len(), u.len());
        assert_eq!(h.len(), w.len());
        assert_eq!(h.len(), wp.len());
        Self {
            g,
            h: h.to_vec(),
            u: u.to_vec(),
            pk: *pk,
            w: w.to_vec(),
            wp: wp.to_vec(),
            params,
        }
    }

    /// Derives the batching vector from `seed` and accepts the prover's
    /// commitment message, substituting identities when it is malformed
    pub fn commitment(
        self,
        seed: &[u8],
        r: &mut ByteTreeReader<'_>,
    ) -> (CCPoSVerifierCommitted, ByteTree) {
        let n = self.h.len();
        let e = batch_vector(seed, n, self.params.batch_bits);
        let (ap, bp) = parse_commitment(r).unwrap_or_else(|_| {
            (
                <RistrettoPoint as Identity>::identity(),
                <Ciphertext as Identity>::identity(),
            )
        });

        let canonical = ByteTree::node(vec![crypto::point_to_tree(&ap), bp.to_tree()]);
        (
            CCPoSVerifierCommitted {
                g: self.g,
                h: self.h,
                u: self.u,
                pk: self.pk,
                w: self.w,
                wp: self.wp,
                e,
                ap,
                bp,
            },
            canonical,
        )
    }
}

fn parse_commitment(r: &mut ByteTreeReader<'_>) -> Result<(RistrettoPoint, Ciphertext)> {
    if r.remaining() != 2 {
        return Err(crate::Error::Format("commitment is not a pair"));
    }
    let ap = crypto::point_from_tree(&mut r.next_child()?)?;
    let bp = Ciphertext::from_tree(&mut r.next_child()?)?;
    Ok((ap, bp))
}

fn parse_reply(r: &mut ByteTreeReader<'_>, n: usize) -> Result<(Scalar, Scalar, Vec<Scalar>)> {
    if r.remaining() != 3 {
        return Err(crate::Error::Format("reply is not a triple"));
    }
    let ka = crypto::scalar_from_tree(&mut r.next_child()?)?;
    let kb = crypto::scalar_from_tree(&mut r.next_child()?)?;
    let ke = crypto::scalars_from_tree(&mut r.next_child()?, n)?;
    Ok((ka, kb, ke))
}

/// Verifier state after the commitment message
pub struct CCPoSVerifierCommitted {
    g: RistrettoPoint,
    h: Vec<RistrettoPoint>,
    u: Vec<RistrettoPoint>,
    pk: PublicKey,
    w: Vec<Ciphertext>,
    wp: Vec<Ciphertext>,
    e: Vec<Scalar>,
    ap: RistrettoPoint,
    bp: Ciphertext,
}

impl CCPoSVerifierCommitted {
    /// Checks the reply against the challenge
    pub fn verify(self, v: &Challenge, reply: &mut ByteTreeReader<'_>) -> bool {
        let n = self.h.len();
        let (ka, kb, ke) = match parse_reply(reply, n) {
            Ok(t) => t,
            Err(_) => return false,
        };
        let v = v.scalar();

        let a = RistrettoPoint::vartime_multiscalar_mul(self.e.iter(), self.u.iter());
        let b = ciphertext_msm(&self.e, &self.w);

        if a * v + self.ap
            != self.g * ka + RistrettoPoint::vartime_multiscalar_mul(ke.iter(), self.h.iter())
        {
            return false;
        }
        let reenc = Ciphertext(self.g * -kb, self.pk.0 * -kb);
        &b * v + self.bp == reenc + ciphertext_msm(&ke, &self.wp)
    }
}
