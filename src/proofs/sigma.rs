//! Generic sigma protocols for homomorphism preimages
//!
//! A single three-move engine proves knowledge of `x` with `phi(x) = y` for
//! any homomorphism `phi` between a scalar-module domain and a group range.
//! Concrete proofs (knowledge of a discrete logarithm, equality of discrete
//! logarithms, knowledge of a decryption key share) are obtained purely by
//! choosing `phi`. Parallel instances collapse into a single run through
//! random-linear-combination batching before the protocol starts.
//!
//! The prover and verifier are typestate machines: committing consumes the
//! initial state and yields a state that can only reply to or verify exactly
//! one challenge, so a transcript cannot be reused or replayed by
//! construction.

use crate::{
    bytetree::{ByteTree, ByteTreeReader},
    crypto::{self, elgamal::Ciphertext},
    Result,
};
use curve25519_dalek::{
    ristretto::RistrettoPoint,
    scalar::Scalar,
    traits::{Identity, VartimeMultiscalarMul},
};
use rand::{CryptoRng, RngCore};

use super::Challenge;

/// Range-side values: elements of a group with an encoding
pub trait Element: Clone + PartialEq {
    /// The group identity
    fn identity() -> Self;
    /// The group operation
    fn combine(&self, other: &Self) -> Self;
    /// Exponentiation by a scalar
    fn pow(&self, e: &Scalar) -> Self;
    /// Encodes as a byte tree
    fn to_tree(&self) -> ByteTree;
    /// Decodes from a byte tree
    fn from_tree(r: &mut ByteTreeReader<'_>) -> Result<Self>;
}

/// Domain-side values: elements of a module over the scalar ring
pub trait Exponent: Clone {
    /// The zero element
    fn zero() -> Self;
    /// Addition
    fn add(&self, other: &Self) -> Self;
    /// Multiplication by a scalar
    fn scale(&self, v: &Scalar) -> Self;
    /// Samples a uniform element
    fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self;
    /// Encodes as a byte tree
    fn to_tree(&self) -> ByteTree;
    /// Decodes from a byte tree
    fn from_tree(r: &mut ByteTreeReader<'_>) -> Result<Self>;
}

impl Element for RistrettoPoint {
    fn identity() -> Self {
        Identity::identity()
    }
    fn combine(&self, other: &Self) -> Self {
        self + other
    }
    fn pow(&self, e: &Scalar) -> Self {
        self * e
    }
    fn to_tree(&self) -> ByteTree {
        crypto::point_to_tree(self)
    }
    fn from_tree(r: &mut ByteTreeReader<'_>) -> Result<Self> {
        crypto::point_from_tree(r)
    }
}

impl Element for Ciphertext {
    fn identity() -> Self {
        Identity::identity()
    }
    fn combine(&self, other: &Self) -> Self {
        self + other
    }
    fn pow(&self, e: &Scalar) -> Self {
        self * e
    }
    fn to_tree(&self) -> ByteTree {
        Ciphertext::to_tree(self)
    }
    fn from_tree(r: &mut ByteTreeReader<'_>) -> Result<Self> {
        Ciphertext::from_tree(r)
    }
}

impl Exponent for Scalar {
    fn zero() -> Self {
        Scalar::zero()
    }
    fn add(&self, other: &Self) -> Self {
        self + other
    }
    fn scale(&self, v: &Scalar) -> Self {
        self * v
    }
    fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Scalar::random(rng)
    }
    fn to_tree(&self) -> ByteTree {
        crypto::scalar_to_tree(self)
    }
    fn from_tree(r: &mut ByteTreeReader<'_>) -> Result<Self> {
        crypto::scalar_from_tree(r)
    }
}

/// A homomorphism from a scalar module into a group, with everything the
/// sigma engine needs to operate on both sides
pub trait Homomorphism {
    /// Domain of the map
    type Domain: Clone;
    /// Range of the map
    type Range: Clone + PartialEq;

    /// Evaluates the map
    fn map(&self, x: &Self::Domain) -> Self::Range;
    /// Samples a uniform domain element
    fn random_domain<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Self::Domain;
    /// The domain zero
    fn identity_domain(&self) -> Self::Domain;
    /// The range identity
    fn identity_range(&self) -> Self::Range;
    /// Computes `x * v + t` in the domain
    fn mul_add(&self, x: &Self::Domain, v: &Scalar, t: &Self::Domain) -> Self::Domain;
    /// Computes `y^v * a` in the range
    fn exp_combine(&self, y: &Self::Range, v: &Scalar, a: &Self::Range) -> Self::Range;
    /// Encodes a domain element
    fn domain_to_tree(&self, x: &Self::Domain) -> ByteTree;
    /// Decodes a domain element
    fn domain_from_tree(&self, r: &mut ByteTreeReader<'_>) -> Result<Self::Domain>;
    /// Encodes a range element
    fn range_to_tree(&self, y: &Self::Range) -> ByteTree;
    /// Decodes a range element
    fn range_from_tree(&self, r: &mut ByteTreeReader<'_>) -> Result<Self::Range>;
}

/// The common case: an [`Exponent`] domain mapped into an [`Element`] range
///
/// Implementors only provide the map itself; the rest of [`Homomorphism`]
/// follows from the component traits.
pub trait SimpleHomomorphism {
    /// Domain of the map
    type Domain: Exponent;
    /// Range of the map
    type Range: Element;

    /// Evaluates the map
    fn map(&self, x: &Self::Domain) -> Self::Range;
}

impl<H: SimpleHomomorphism> Homomorphism for H {
    type Domain = H::Domain;
    type Range = H::Range;

    fn map(&self, x: &Self::Domain) -> Self::Range {
        SimpleHomomorphism::map(self, x)
    }
    fn random_domain<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Self::Domain {
        Exponent::random(rng)
    }
    fn identity_domain(&self) -> Self::Domain {
        Exponent::zero()
    }
    fn identity_range(&self) -> Self::Range {
        Element::identity()
    }
    fn mul_add(&self, x: &Self::Domain, v: &Scalar, t: &Self::Domain) -> Self::Domain {
        x.scale(v).add(t)
    }
    fn exp_combine(&self, y: &Self::Range, v: &Scalar, a: &Self::Range) -> Self::Range {
        y.pow(v).combine(a)
    }
    fn domain_to_tree(&self, x: &Self::Domain) -> ByteTree {
        x.to_tree()
    }
    fn domain_from_tree(&self, r: &mut ByteTreeReader<'_>) -> Result<Self::Domain> {
        Exponent::from_tree(r)
    }
    fn range_to_tree(&self, y: &Self::Range) -> ByteTree {
        y.to_tree()
    }
    fn range_from_tree(&self, r: &mut ByteTreeReader<'_>) -> Result<Self::Range> {
        Element::from_tree(r)
    }
}

/// Exponentiation of a fixed base, `x -> b^x`
///
/// Yields the classic proof of knowledge of a discrete logarithm.
#[derive(Clone)]
pub struct ExpHom {
    /// The base
    pub base: RistrettoPoint,
}

impl SimpleHomomorphism for ExpHom {
    type Domain = Scalar;
    type Range = RistrettoPoint;

    fn map(&self, x: &Scalar) -> RistrettoPoint {
        self.base * x
    }
}

/// Simultaneous exponentiation of two fixed bases, `x -> (g^x, h^x)`
///
/// Yields equality-of-discrete-logarithm proofs; with `h` a public key this
/// is exactly the knowledge-of-randomizer relation for re-encryption.
#[derive(Clone)]
pub struct DualExpHom {
    /// The first base
    pub g: RistrettoPoint,
    /// The second base
    pub h: RistrettoPoint,
}

impl SimpleHomomorphism for DualExpHom {
    type Domain = Scalar;
    type Range = Ciphertext;

    fn map(&self, x: &Scalar) -> Ciphertext {
        Ciphertext(self.g * x, self.h * x)
    }
}

/// A homomorphism of parallel instances that a random linear combination can
/// collapse into a single batched instance
pub trait Batchable: Homomorphism {
    /// The homomorphism after batching
    type Batched: Homomorphism;

    /// Number of parallel instances
    fn width(&self) -> usize;
    /// The batched homomorphism under a batching vector
    fn batched(&self, e: &[Scalar]) -> Self::Batched;
    /// Folds a range element through the batching vector
    fn batch_image(&self, y: &Self::Range, e: &[Scalar]) -> <Self::Batched as Homomorphism>::Range;
    /// Folds a domain element through the batching vector
    fn batch_preimage(
        &self,
        x: &Self::Domain,
        e: &[Scalar],
    ) -> <Self::Batched as Homomorphism>::Domain;
}

/// `width` independent copies of one homomorphism
///
/// Each instance has its own witness; batching takes the inner product of
/// the witnesses with the batching vector.
#[derive(Clone)]
pub struct Parallel<H> {
    /// The component homomorphism
    pub hom: H,
    /// Number of instances
    pub width: usize,
}

impl<H: SimpleHomomorphism + Clone> Homomorphism for Parallel<H> {
    type Domain = Vec<H::Domain>;
    type Range = Vec<H::Range>;

    fn map(&self, x: &Self::Domain) -> Self::Range {
        assert_eq!(x.len(), self.width);
        x.iter().map(|xi| self.hom.map(xi)).collect()
    }
    fn random_domain<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Self::Domain {
        (0..self.width).map(|_| H::Domain::random(rng)).collect()
    }
    fn identity_domain(&self) -> Self::Domain {
        vec![H::Domain::zero(); self.width]
    }
    fn identity_range(&self) -> Self::Range {
        vec![H::Range::identity(); self.width]
    }
    fn mul_add(&self, x: &Self::Domain, v: &Scalar, t: &Self::Domain) -> Self::Domain {
        x.iter()
            .zip(t.iter())
            .map(|(xi, ti)| xi.scale(v).add(ti))
            .collect()
    }
    fn exp_combine(&self, y: &Self::Range, v: &Scalar, a: &Self::Range) -> Self::Range {
        y.iter()
            .zip(a.iter())
            .map(|(yi, ai)| yi.pow(v).combine(ai))
            .collect()
    }
    fn domain_to_tree(&self, x: &Self::Domain) -> ByteTree {
        ByteTree::node(x.iter().map(Exponent::to_tree).collect())
    }
    fn domain_from_tree(&self, r: &mut ByteTreeReader<'_>) -> Result<Self::Domain> {
        if r.remaining() != self.width {
            return Err(crate::Error::Format("wrong instance count"));
        }
        (0..self.width)
            .map(|_| H::Domain::from_tree(&mut r.next_child()?))
            .collect()
    }
    fn range_to_tree(&self, y: &Self::Range) -> ByteTree {
        ByteTree::node(y.iter().map(Element::to_tree).collect())
    }
    fn range_from_tree(&self, r: &mut ByteTreeReader<'_>) -> Result<Self::Range> {
        if r.remaining() != self.width {
            return Err(crate::Error::Format("wrong instance count"));
        }
        (0..self.width)
            .map(|_| H::Range::from_tree(&mut r.next_child()?))
            .collect()
    }
}

impl<H: SimpleHomomorphism + Clone> Batchable for Parallel<H> {
    type Batched = H;

    fn width(&self) -> usize {
        self.width
    }
    fn batched(&self, e: &[Scalar]) -> H {
        assert_eq!(e.len(), self.width);
        self.hom.clone()
    }
    fn batch_image(&self, y: &Self::Range, e: &[Scalar]) -> H::Range {
        y.iter()
            .zip(e.iter())
            .fold(H::Range::identity(), |acc, (yi, ei)| {
                acc.combine(&yi.pow(ei))
            })
    }
    fn batch_preimage(&self, x: &Self::Domain, e: &[Scalar]) -> H::Domain {
        x.iter()
            .zip(e.iter())
            .fold(H::Domain::zero(), |acc, (xi, ei)| acc.add(&xi.scale(ei)))
    }
}

/// One witness, many statements: `x -> (g^x, b_i^x)` for a vector of bases
///
/// This is the relation behind a decryption-factor proof, where one secret
/// key share produces a factor for every ciphertext. Batching folds the base
/// vector instead of the witness.
#[derive(Clone)]
pub struct DecryptionHom {
    /// The key base
    pub g: RistrettoPoint,
    /// The per-statement bases
    pub bases: Vec<RistrettoPoint>,
}

impl Homomorphism for DecryptionHom {
    type Domain = Scalar;
    type Range = Vec<Ciphertext>;

    fn map(&self, x: &Scalar) -> Self::Range {
        let gx = self.g * x;
        self.bases.iter().map(|b| Ciphertext(gx, b * x)).collect()
    }
    fn random_domain<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Scalar {
        Scalar::random(rng)
    }
    fn identity_domain(&self) -> Scalar {
        Scalar::zero()
    }
    fn identity_range(&self) -> Self::Range {
        vec![<Ciphertext as Identity>::identity(); self.bases.len()]
    }
    fn mul_add(&self, x: &Scalar, v: &Scalar, t: &Scalar) -> Scalar {
        x * v + t
    }
    fn exp_combine(&self, y: &Self::Range, v: &Scalar, a: &Self::Range) -> Self::Range {
        y.iter()
            .zip(a.iter())
            .map(|(yi, ai)| &(yi * v) + ai)
            .collect()
    }
    fn domain_to_tree(&self, x: &Scalar) -> ByteTree {
        crypto::scalar_to_tree(x)
    }
    fn domain_from_tree(&self, r: &mut ByteTreeReader<'_>) -> Result<Scalar> {
        crypto::scalar_from_tree(r)
    }
    fn range_to_tree(&self, y: &Self::Range) -> ByteTree {
        ByteTree::node(y.iter().map(Ciphertext::to_tree).collect())
    }
    fn range_from_tree(&self, r: &mut ByteTreeReader<'_>) -> Result<Self::Range> {
        crypto::elgamal::ciphertexts_from_tree(r, self.bases.len())
    }
}

impl Batchable for DecryptionHom {
    type Batched = DualExpHom;

    fn width(&self) -> usize {
        self.bases.len()
    }
    fn batched(&self, e: &[Scalar]) -> DualExpHom {
        assert_eq!(e.len(), self.bases.len());
        let total: Scalar = e.iter().sum();
        DualExpHom {
            g: self.g * total,
            h: RistrettoPoint::vartime_multiscalar_mul(e.iter(), self.bases.iter()),
        }
    }
    fn batch_image(&self, y: &Self::Range, e: &[Scalar]) -> Ciphertext {
        Ciphertext(
            RistrettoPoint::vartime_multiscalar_mul(e.iter(), y.iter().map(|c| &c.0)),
            RistrettoPoint::vartime_multiscalar_mul(e.iter(), y.iter().map(|c| &c.1)),
        )
    }
    fn batch_preimage(&self, x: &Scalar, _e: &[Scalar]) -> Scalar {
        *x
    }
}

/// Prover before committing
pub struct SigmaProver<H: Homomorphism> {
    hom: H,
    witness: H::Domain,
    challenge_bits: usize,
}

impl<H: Homomorphism> SigmaProver<H> {
    /// Creates a prover for `hom(witness)`
    pub fn new(hom: H, witness: H::Domain, challenge_bits: usize) -> Self {
        assert!(challenge_bits <= 252, "challenge bit length out of range");
        Self {
            hom,
            witness,
            challenge_bits,
        }
    }

    /// Produces the commitment message and the committed state
    pub fn commit<R: RngCore + CryptoRng>(
        self,
        rng: &mut R,
    ) -> (SigmaProverCommitted<H>, ByteTree) {
        let blinder = self.hom.random_domain(rng);
        let tree = self.hom.range_to_tree(&self.hom.map(&blinder));
        (
            SigmaProverCommitted {
                hom: self.hom,
                witness: self.witness,
                blinder,
                challenge_bits: self.challenge_bits,
            },
            tree,
        )
    }
}

impl<H: Batchable> SigmaProver<H> {
    /// Collapses parallel instances under a batching vector
    pub fn batch(self, e: &[Scalar]) -> SigmaProver<H::Batched> {
        SigmaProver {
            witness: self.hom.batch_preimage(&self.witness, e),
            hom: self.hom.batched(e),
            challenge_bits: self.challenge_bits,
        }
    }
}

/// Prover after committing; replies to exactly one challenge
pub struct SigmaProverCommitted<H: Homomorphism> {
    hom: H,
    witness: H::Domain,
    blinder: H::Domain,
    challenge_bits: usize,
}

impl<H: Homomorphism> SigmaProverCommitted<H> {
    /// Produces the reply message for a challenge
    ///
    /// Panics if the challenge's bit length disagrees with the protocol
    /// instance; that is a composition bug, not a runtime condition.
    pub fn reply(self, v: &Challenge) -> ByteTree {
        assert_eq!(
            v.bits(),
            self.challenge_bits,
            "challenge bit length mismatch"
        );
        let k = self.hom.mul_add(&self.witness, v.scalar(), &self.blinder);
        self.hom.domain_to_tree(&k)
    }
}

/// Verifier before receiving the commitment
pub struct SigmaVerifier<H: Homomorphism> {
    hom: H,
    common: H::Range,
    challenge_bits: usize,
}

impl<H: Homomorphism> SigmaVerifier<H> {
    /// Creates a verifier for the statement `hom(?) = common`
    pub fn new(hom: H, common: H::Range, challenge_bits: usize) -> Self {
        assert!(challenge_bits <= 252, "challenge bit length out of range");
        Self {
            hom,
            common,
            challenge_bits,
        }
    }

    /// Accepts the prover's commitment message
    ///
    /// A malformed message is replaced by the range identity, which makes
    /// the final check fail against any honestly computed reply. Returns the
    /// canonical re-encoding of the commitment actually used, which is what
    /// challenge derivation and artifact files must contain.
    pub fn commitment(self, r: &mut ByteTreeReader<'_>) -> (SigmaVerifierCommitted<H>, ByteTree) {
        let commitment = self
            .hom
            .range_from_tree(r)
            .unwrap_or_else(|_| self.hom.identity_range());
        let canonical = self.hom.range_to_tree(&commitment);
        (
            SigmaVerifierCommitted {
                hom: self.hom,
                common: self.common,
                commitment,
                challenge_bits: self.challenge_bits,
            },
            canonical,
        )
    }
}

impl<H: Batchable> SigmaVerifier<H> {
    /// Collapses parallel instances under a batching vector
    pub fn batch(self, e: &[Scalar]) -> SigmaVerifier<H::Batched> {
        SigmaVerifier {
            common: self.hom.batch_image(&self.common, e),
            hom: self.hom.batched(e),
            challenge_bits: self.challenge_bits,
        }
    }
}

/// Verifier after the commitment; checks exactly one reply
pub struct SigmaVerifierCommitted<H: Homomorphism> {
    hom: H,
    common: H::Range,
    commitment: H::Range,
    challenge_bits: usize,
}

impl<H: Homomorphism> SigmaVerifierCommitted<H> {
    /// Checks the reply against the challenge
    ///
    /// A malformed reply verifies as false. Panics on a challenge bit length
    /// mismatch, as for the prover.
    pub fn verify(self, v: &Challenge, reply: &mut ByteTreeReader<'_>) -> bool {
        assert_eq!(
            v.bits(),
            self.challenge_bits,
            "challenge bit length mismatch"
        );
        let k = match self.hom.domain_from_tree(reply) {
            Ok(k) => k,
            Err(_) => return false,
        };
        self.hom.exp_combine(&self.common, v.scalar(), &self.commitment) == self.hom.map(&k)
    }
}
