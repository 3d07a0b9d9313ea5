//! ElGamal encryption over the Ristretto group

use super::{point_from_tree, point_to_tree};
use crate::{
    bytetree::{ByteTree, ByteTreeReader},
    Error, Result,
};
use curve25519_dalek::{
    constants::RISTRETTO_BASEPOINT_TABLE,
    ristretto::{RistrettoBasepointTable, RistrettoPoint},
    scalar::Scalar,
    traits::Identity,
};
use rand::{CryptoRng, Rng};
use std::{
    borrow::Borrow,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub},
};

const G: &RistrettoBasepointTable = &RISTRETTO_BASEPOINT_TABLE;

/// An ElGamal ciphertext
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Ciphertext(pub RistrettoPoint, pub RistrettoPoint);

/// An ElGamal public key
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PublicKey(pub RistrettoPoint);

/// An ElGamal secret key
#[derive(Clone, Debug)]
pub struct SecretKey(pub Scalar);

impl PublicKey {
    /// Encrypts a group element with the given randomizer
    pub fn encrypt(&self, m: &RistrettoPoint, r: &Scalar) -> Ciphertext {
        Ciphertext(G * r, self.0 * r + m)
    }

    /// Encrypts the group identity; adding the result to a ciphertext
    /// re-encrypts it without changing the plaintext
    pub fn reencryption_term(&self, s: &Scalar) -> Ciphertext {
        Ciphertext(G * s, self.0 * s)
    }

    /// Encodes this key as a byte tree
    pub fn to_tree(&self) -> ByteTree {
        point_to_tree(&self.0)
    }

    /// Decodes a key from a byte tree
    pub fn from_tree(r: &mut ByteTreeReader<'_>) -> Result<Self> {
        Ok(Self(point_from_tree(r)?))
    }
}

impl SecretKey {
    /// Derives the matching public key
    pub fn public(&self) -> PublicKey {
        PublicKey(G * &self.0)
    }

    /// Decrypts a ciphertext
    pub fn decrypt(&self, c: &Ciphertext) -> RistrettoPoint {
        c.1 - c.0 * self.0
    }

    /// Computes this key's decryption factor for a ciphertext, i.e. the
    /// share `c_0^x` that is divided out of `c_1` when recombining
    pub fn decryption_factor(&self, c0: &RistrettoPoint) -> RistrettoPoint {
        c0 * self.0
    }
}

/// Generates a fresh key pair
pub fn keygen<R: Rng + CryptoRng>(rng: &mut R) -> (PublicKey, SecretKey) {
    let x = Scalar::random(rng);
    let sk = SecretKey(x);
    (sk.public(), sk)
}

impl Ciphertext {
    /// Encodes this ciphertext as a two-leaf node
    pub fn to_tree(&self) -> ByteTree {
        ByteTree::node(vec![point_to_tree(&self.0), point_to_tree(&self.1)])
    }

    /// Decodes a ciphertext from a two-leaf node
    pub fn from_tree(r: &mut ByteTreeReader<'_>) -> Result<Self> {
        if r.remaining() != 2 {
            return Err(Error::Format("ciphertext is not a pair"));
        }
        let a = point_from_tree(&mut r.next_child()?)?;
        let b = point_from_tree(&mut r.next_child()?)?;
        Ok(Self(a, b))
    }
}

/// Encodes a ciphertext list as a byte tree
pub fn ciphertexts_to_tree(cs: &[Ciphertext]) -> ByteTree {
    ByteTree::node(cs.iter().map(Ciphertext::to_tree).collect())
}

/// Decodes a ciphertext list, requiring an exact count
pub fn ciphertexts_from_tree(r: &mut ByteTreeReader<'_>, n: usize) -> Result<Vec<Ciphertext>> {
    if r.remaining() != n {
        return Err(Error::Format("wrong number of ciphertexts"));
    }
    (0..n)
        .map(|_| Ciphertext::from_tree(&mut r.next_child()?))
        .collect()
}

impl Identity for Ciphertext {
    fn identity() -> Self {
        Ciphertext(RistrettoPoint::identity(), RistrettoPoint::identity())
    }
}

impl<'a, 'b> Add<&'b Ciphertext> for &'a Ciphertext {
    type Output = Ciphertext;

    fn add(self, rhs: &'b Ciphertext) -> Ciphertext {
        Ciphertext(self.0 + rhs.0, self.1 + rhs.1)
    }
}

impl Add<Ciphertext> for Ciphertext {
    type Output = Ciphertext;

    #[allow(clippy::op_ref)]
    fn add(self, rhs: Ciphertext) -> Ciphertext {
        &self + &rhs
    }
}

impl<'a, 'b> Sub<&'b Ciphertext> for &'a Ciphertext {
    type Output = Ciphertext;

    fn sub(self, rhs: &'b Ciphertext) -> Ciphertext {
        Ciphertext(self.0 - rhs.0, self.1 - rhs.1)
    }
}

impl Sub<Ciphertext> for Ciphertext {
    type Output = Ciphertext;

    #[allow(clippy::op_ref)]
    fn sub(self, rhs: Ciphertext) -> Ciphertext {
        &self - &rhs
    }
}

impl<'a, 'b> Mul<&'b Scalar> for &'a Ciphertext {
    type Output = Ciphertext;

    fn mul(self, rhs: &'b Scalar) -> Ciphertext {
        Ciphertext(self.0 * rhs, self.1 * rhs)
    }
}

impl Mul<Scalar> for Ciphertext {
    type Output = Ciphertext;

    #[allow(clippy::op_ref)]
    fn mul(self, rhs: Scalar) -> Ciphertext {
        &self * &rhs
    }
}

impl<'a> Neg for &'a Ciphertext {
    type Output = Ciphertext;

    fn neg(self) -> Ciphertext {
        Ciphertext(-self.0, -self.1)
    }
}

impl Neg for Ciphertext {
    type Output = Ciphertext;

    #[allow(clippy::op_ref)]
    fn neg(self) -> Ciphertext {
        -&self
    }
}

impl<T> Sum<T> for Ciphertext
where
    T: Borrow<Ciphertext>,
{
    fn sum<I>(iter: I) -> Self
    where
        I: Iterator<Item = T>,
    {
        iter.fold(Ciphertext::identity(), |acc, c| &acc + c.borrow())
    }
}
