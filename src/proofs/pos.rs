//! Proof of a shuffle of commitments
//!
//! The Terelius-Wikström argument: a prover who published a permutation
//! commitment `u` under independent generators `h` shows that `u` really
//! commits to a permutation, without revealing which one. The heart of the
//! argument is a chain of bridging commitments whose final element pins the
//! product of the batching-vector components; together with a batched
//! opening this forces the committed exponent matrix to be a permutation
//! matrix.
//!
//! Both sides derive the batching vector from a shared seed through the
//! hash PRG, so the seed (not the vector) is what travels.

use crate::{
    bytetree::{ByteTree, ByteTreeReader},
    crypto::{self, perm::Permutation},
    Result,
};
use curve25519_dalek::{
    ristretto::RistrettoPoint,
    scalar::Scalar,
    traits::{MultiscalarMul, VartimeMultiscalarMul},
};
use rand::{CryptoRng, Rng};

use super::{batch_vector, Challenge, ProofParams};

/// Prover state before the commitment message
pub struct PoSProver {
    g: RistrettoPoint,
    h: Vec<RistrettoPoint>,
    r: Vec<Scalar>,
    pi: Permutation,
    params: ProofParams,
}

impl PoSProver {
    /// Creates a prover opening the permutation commitment built from
    /// exponents `r` and permutation `pi` under generators `h`
    pub fn new(
        g: RistrettoPoint,
        h: &[RistrettoPoint],
        r: &[Scalar],
        pi: &Permutation,
        params: ProofParams,
    ) -> Self {
        assert!(!h.is_empty());
        assert_eq!(h.len(), r.len());
        assert_eq!(h.len(), pi.len());
        Self {
            g,
            h: h.to_vec(),
            r: r.to_vec(),
            pi: pi.clone(),
            params,
        }
    }

    /// Derives the batching vector from `seed` and produces the commitment
    /// message
    pub fn commit<R: Rng + CryptoRng>(
        self,
        seed: &[u8],
        rng: &mut R,
    ) -> (PoSProverCommitted, ByteTree) {
        let n = self.h.len();
        let e = batch_vector(seed, n, self.params.batch_bits);
        let ipe = self.pi.permute(&e);

        // Bridging chain B_i = g^{b_i} * B_{i-1}^{e'_i} with B_{-1} = h_0,
        // maintained in flattened form B_i = g^{x_i} * h_0^{y_i}.
        let b: Vec<Scalar> = (0..n).map(|_| Scalar::random(rng)).collect();
        let mut x = Vec::with_capacity(n);
        let mut y = Vec::with_capacity(n);
        x.push(b[0]);
        y.push(ipe[0]);
        for i in 1..n {
            x.push(x[i - 1] * ipe[i] + b[i]);
            y.push(y[i - 1] * ipe[i]);
        }
        let cb: Vec<RistrettoPoint> = x
            .iter()
            .zip(y.iter())
            .map(|(xi, yi)| RistrettoPoint::multiscalar_mul(&[*xi, *yi], &[self.g, self.h[0]]))
            .collect();

        let alpha = Scalar::random(rng);
        let beta: Vec<Scalar> = (0..n).map(|_| Scalar::random(rng)).collect();
        let gamma = Scalar::random(rng);
        let delta = Scalar::random(rng);
        let eps = crypto::random_bounded_scalars(n, self.params.blinder_bits(), rng);

        let ap = self.g * alpha + RistrettoPoint::multiscalar_mul(eps.iter(), self.h.iter());
        let bp: Vec<RistrettoPoint> = (0..n)
            .map(|i| {
                let prev = if i == 0 { self.h[0] } else { cb[i - 1] };
                RistrettoPoint::multiscalar_mul(&[beta[i], eps[i]], &[self.g, prev])
            })
            .collect();
        let cp = self.g * gamma;
        let dp = self.g * delta;

        let tree = ByteTree::node(vec![
            crypto::points_to_tree(&cb),
            crypto::point_to_tree(&ap),
            crypto::points_to_tree(&bp),
            crypto::point_to_tree(&cp),
            crypto::point_to_tree(&dp),
        ]);

        let d = x[n - 1];
        (
            PoSProverCommitted {
                r: self.r,
                ipe,
                b,
                d,
                alpha,
                beta,
                gamma,
                delta,
                eps,
            },
            tree,
        )
    }
}

/// Prover state after the commitment message
pub struct PoSProverCommitted {
    r: Vec<Scalar>,
    ipe: Vec<Scalar>,
    b: Vec<Scalar>,
    d: Scalar,
    alpha: Scalar,
    beta: Vec<Scalar>,
    gamma: Scalar,
    delta: Scalar,
    eps: Vec<Scalar>,
}

impl PoSProverCommitted {
    /// Produces the reply message for a challenge
    pub fn reply(self, v: &Challenge) -> ByteTree {
        let v = v.scalar();
        let a: Scalar = self.r.iter().zip(self.ipe.iter()).map(|(r, e)| r * e).sum();
        let c: Scalar = self.r.iter().sum();

        let ka = a * v + self.alpha;
        let kb: Vec<Scalar> = self
            .b
            .iter()
            .zip(self.beta.iter())
            .map(|(b, beta)| b * v + beta)
            .collect();
        let kc = c * v + self.gamma;
        let kd = self.d * v + self.delta;
        let ke: Vec<Scalar> = self
            .ipe
            .iter()
            .zip(self.eps.iter())
            .map(|(e, eps)| e * v + eps)
            .collect();

        ByteTree::node(vec![
            crypto::scalar_to_tree(&ka),
            crypto::scalars_to_tree(&kb),
            crypto::scalar_to_tree(&kc),
            crypto::scalar_to_tree(&kd),
            crypto::scalars_to_tree(&ke),
        ])
    }
}

/// Verifier state before the commitment message
pub struct PoSVerifier {
    g: RistrettoPoint,
    h: Vec<RistrettoPoint>,
    u: Vec<RistrettoPoint>,
    params: ProofParams,
}

impl PoSVerifier {
    /// Creates a verifier for the permutation commitment `u` under
    /// generators `h`
    pub fn new(
        g: RistrettoPoint,
        h: &[RistrettoPoint],
        u: &[RistrettoPoint],
        params: ProofParams,
    ) -> Self {
        assert!(!h.is_empty());
        assert_eq!(h.len(), u.len());
        Self {
            g,
            h: h.to_vec(),
            u: u.to_vec(),
            params,
        }
    }

    /// Derives the batching vector from `seed` and accepts the prover's
    /// commitment message
    ///
    /// A malformed message is replaced by all-identity commitments, which
    /// cannot verify against an honest reply. Returns the canonical
    /// re-encoding of the commitment actually used.
    pub fn commitment(
        self,
        seed: &[u8],
        r: &mut ByteTreeReader<'_>,
    ) -> (PoSVerifierCommitted, ByteTree) {
        let n = self.h.len();
        let e = batch_vector(seed, n, self.params.batch_bits);
        let id = <RistrettoPoint as curve25519_dalek::traits::Identity>::identity();
        let (cb, ap, bp, cp, dp) = parse_commitment(r, n)
            .unwrap_or_else(|_| (vec![id; n], id, vec![id; n], id, id));

        let canonical = ByteTree::node(vec![
            crypto::points_to_tree(&cb),
            crypto::point_to_tree(&ap),
            crypto::points_to_tree(&bp),
            crypto::point_to_tree(&cp),
            crypto::point_to_tree(&dp),
        ]);
        (
            PoSVerifierCommitted {
                g: self.g,
                h: self.h,
                u: self.u,
                e,
                cb,
                ap,
                bp,
                cp,
                dp,
            },
            canonical,
        )
    }
}

fn parse_commitment(
    r: &mut ByteTreeReader<'_>,
    n: usize,
) -> Result<(
    Vec<RistrettoPoint>,
    RistrettoPoint,
    Vec<RistrettoPoint>,
    RistrettoPoint,
    RistrettoPoint,
)> {
    if r.remaining() != 5 {
        return Err(crate::Error::Format("commitment is not a quintuple"));
    }
    let cb = crypto::points_from_tree(&mut r.next_child()?, n)?;
    let ap = crypto::point_from_tree(&mut r.next_child()?)?;
    let bp = crypto::points_from_tree(&mut r.next_child()?, n)?;
    let cp = crypto::point_from_tree(&mut r.next_child()?)?;
    let dp = crypto::point_from_tree(&mut r.next_child()?)?;
    Ok((cb, ap, bp, cp, dp))
}

fn parse_reply(
    r: &mut ByteTreeReader<'_>,
    n: usize,
) -> Result<(Scalar, Vec<Scalar>, Scalar, Scalar, Vec<Scalar>)> {
    if r.remaining() != 5 {
        return Err(crate::Error::Format("reply is not a quintuple"));
    }
    let ka = crypto::scalar_from_tree(&mut r.next_child()?)?;
    let kb = crypto::scalars_from_tree(&mut r.next_child()?, n)?;
    let kc = crypto::scalar_from_tree(&mut r.next_child()?)?;
    let kd = crypto::scalar_from_tree(&mut r.next_child()?)?;
    let ke = crypto::scalars_from_tree(&mut r.next_child()?, n)?;
    Ok((ka, kb, kc, kd, ke))
}

/// Verifier state after the commitment message
pub struct PoSVerifierCommitted {
    g: RistrettoPoint,
    h: Vec<RistrettoPoint>,
    u: Vec<RistrettoPoint>,
    e: Vec<Scalar>,
    cb: Vec<RistrettoPoint>,
    ap: RistrettoPoint,
    bp: Vec<RistrettoPoint>,
    cp: RistrettoPoint,
    dp: RistrettoPoint,
}

impl PoSVerifierCommitted {
    /// Checks the reply against the challenge
    ///
    /// A malformed reply verifies as false.
    pub fn verify(self, v: &Challenge, reply: &mut ByteTreeReader<'_>) -> bool {
        let n = self.h.len();
        let (ka, kb, kc, kd, ke) = match parse_reply(reply, n) {
            Ok(t) => t,
            Err(_) => return false,
        };
        let v = v.scalar();

        let a = RistrettoPoint::vartime_multiscalar_mul(self.e.iter(), self.u.iter());
        let c: RistrettoPoint =
            self.u.iter().sum::<RistrettoPoint>() - self.h.iter().sum::<RistrettoPoint>();
        let prod_e: Scalar = self.e.iter().product();
        let d = self.cb[n - 1] - self.h[0] * prod_e;

        if a * v + self.ap
            != self.g * ka + RistrettoPoint::vartime_multiscalar_mul(ke.iter(), self.h.iter())
        {
            return false;
        }
        for i in 0..n {
            let prev = if i == 0 { self.h[0] } else { self.cb[i - 1] };
            if self.cb[i] * v + self.bp[i] != self.g * kb[i] + prev * ke[i] {
                return false;
            }
        }
        if c * v + self.cp != self.g * kc {
            return false;
        }
        d * v + self.dp == self.g * kd
    }
}

#[cfg(test)]
mod tests {
    use super::{PoSProver, PoSVerifier};
    use crate::{
        bytetree::ByteTree,
        crypto::{commit, perm::Shuffles},
        proofs::{Challenge, ProofParams},
    };
    use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
    use rand::{thread_rng, Rng};

    const N: usize = 100;

    fn params() -> ProofParams {
        ProofParams::new(100, 100, 50)
    }

    fn challenge() -> Challenge {
        Challenge::from_bytes(&[0x5a; 12], 100)
    }

    #[test]
    fn honest_shuffle_proof_verifies() {
        let mut rng = thread_rng();
        let g = RISTRETTO_BASEPOINT_POINT;
        let h = commit::derive_generators(N, b"pos test");
        let pi = rng.sample(&Shuffles(N));
        let (u, r) = commit::commit(&h, &pi, &mut rng);

        let prover = PoSProver::new(g, &h, &r, &pi, params());
        let (prover, commitment) = prover.commit(b"shared seed", &mut rng);
        let verifier = PoSVerifier::new(g, &h, &u, params());
        let (verifier, _) = verifier.commitment(b"shared seed", &mut commitment.reader());
        let reply = prover.reply(&challenge());
        assert!(verifier.verify(&challenge(), &mut reply.reader()));
    }

    #[test]
    fn bit_flipped_commitment_is_rejected() {
        let mut rng = thread_rng();
        let g = RISTRETTO_BASEPOINT_POINT;
        let h = commit::derive_generators(N, b"pos test");
        let pi = rng.sample(&Shuffles(N));
        let (u, r) = commit::commit(&h, &pi, &mut rng);

        let (prover, commitment) =
            PoSProver::new(g, &h, &r, &pi, params()).commit(b"shared seed", &mut rng);
        let mut bytes = commitment.to_bytes();
        // Flip one bit inside the first bridging commitment's payload.
        bytes[20] ^= 0x01;
        let flipped = ByteTree::parse(&bytes).unwrap();

        let (verifier, _) =
            PoSVerifier::new(g, &h, &u, params()).commitment(b"shared seed", &mut flipped.reader());
        let reply = prover.reply(&challenge());
        assert!(!verifier.verify(&challenge(), &mut reply.reader()));
    }

    #[test]
    fn mismatched_seed_fails() {
        let mut rng = thread_rng();
        let g = RISTRETTO_BASEPOINT_POINT;
        let h = commit::derive_generators(N, b"pos test");
        let pi = rng.sample(&Shuffles(N));
        let (u, r) = commit::commit(&h, &pi, &mut rng);

        let (prover, commitment) =
            PoSProver::new(g, &h, &r, &pi, params()).commit(b"seed one", &mut rng);
        let (verifier, _) = PoSVerifier::new(g, &h, &u, params())
            .commitment(b"seed two", &mut commitment.reader());
        let reply = prover.reply(&challenge());
        assert!(!verifier.verify(&challenge(), &mut reply.reader()));
    }

    #[test]
    fn commitment_to_a_non_permutation_fails() {
        let mut rng = thread_rng();
        let g = RISTRETTO_BASEPOINT_POINT;
        let h = commit::derive_generators(N, b"pos test");
        let pi = rng.sample(&Shuffles(N));
        let (mut u, r) = commit::commit(&h, &pi, &mut rng);
        // Duplicate one commitment entry: no longer a permutation matrix.
        u[7] = u[8];

        let (prover, commitment) =
            PoSProver::new(g, &h, &r, &pi, params()).commit(b"seed", &mut rng);
        let (verifier, _) =
            PoSVerifier::new(g, &h, &u, params()).commitment(b"seed", &mut commitment.reader());
        let reply = prover.reply(&challenge());
        assert!(!verifier.verify(&challenge(), &mut reply.reader()));
    }

    #[test]
    fn malformed_messages_fail_closed() {
        let mut rng = thread_rng();
        let g = RISTRETTO_BASEPOINT_POINT;
        let h = commit::derive_generators(N, b"pos test");
        let pi = rng.sample(&Shuffles(N));
        let (u, r) = commit::commit(&h, &pi, &mut rng);
        let garbage = ByteTree::leaf(vec![1, 2, 3]);

        let (prover, commitment) =
            PoSProver::new(g, &h, &r, &pi, params()).commit(b"seed", &mut rng);
        let (verifier, _) =
            PoSVerifier::new(g, &h, &u, params()).commitment(b"seed", &mut garbage.reader());
        let reply = prover.reply(&challenge());
        assert!(!verifier.verify(&challenge(), &mut reply.reader()));

        let (verifier, _) =
            PoSVerifier::new(g, &h, &u, params()).commitment(b"seed", &mut commitment.reader());
        assert!(!verifier.verify(&challenge(), &mut garbage.reader()));
    }
}
