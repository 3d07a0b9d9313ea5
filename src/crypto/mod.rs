//! Cryptographic tools
//!
//! The algebra is the Ristretto group with its scalar field: group elements
//! play the role of commitment and ciphertext components, scalars the role
//! of exponents. Everything else in the crate treats these as an opaque
//! group/ring pair.

pub mod commit;
pub mod elgamal;
pub mod hash;
pub mod perm;
pub mod prg;

use crate::{
    bytetree::{ByteTree, ByteTreeReader},
    Error, Result,
};
use curve25519_dalek::{ristretto::CompressedRistretto, ristretto::RistrettoPoint, scalar::Scalar};
use rand::RngCore;

/// Encodes a group element as a 32-byte leaf
pub fn point_to_tree(p: &RistrettoPoint) -> ByteTree {
    ByteTree::leaf(p.compress().to_bytes().to_vec())
}

/// Decodes a group element from a 32-byte leaf
pub fn point_from_tree(r: &mut ByteTreeReader<'_>) -> Result<RistrettoPoint> {
    let bytes = r.read_exact(32)?;
    CompressedRistretto::from_slice(bytes)
        .decompress()
        .ok_or(Error::Format("invalid group element encoding"))
}

/// Encodes a scalar as a 32-byte leaf
pub fn scalar_to_tree(s: &Scalar) -> ByteTree {
    ByteTree::leaf(s.to_bytes().to_vec())
}

/// Decodes a canonical scalar from a 32-byte leaf
pub fn scalar_from_tree(r: &mut ByteTreeReader<'_>) -> Result<Scalar> {
    let bytes = r.read_exact(32)?;
    let mut buf = [0u8; 32];
    buf.copy_from_slice(bytes);
    Scalar::from_canonical_bytes(buf).ok_or(Error::Format("non-canonical scalar encoding"))
}

/// Encodes a vector of group elements as a node of leaves
pub fn points_to_tree(ps: &[RistrettoPoint]) -> ByteTree {
    ByteTree::node(ps.iter().map(point_to_tree).collect())
}

/// Decodes a vector of group elements, requiring an exact count
pub fn points_from_tree(r: &mut ByteTreeReader<'_>, n: usize) -> Result<Vec<RistrettoPoint>> {
    if r.remaining() != n {
        return Err(Error::Format("wrong number of group elements"));
    }
    (0..n).map(|_| point_from_tree(&mut r.next_child()?)).collect()
}

/// Encodes a vector of scalars as a node of leaves
pub fn scalars_to_tree(ss: &[Scalar]) -> ByteTree {
    ByteTree::node(ss.iter().map(scalar_to_tree).collect())
}

/// Decodes a vector of scalars, requiring an exact count
pub fn scalars_from_tree(r: &mut ByteTreeReader<'_>, n: usize) -> Result<Vec<Scalar>> {
    if r.remaining() != n {
        return Err(Error::Format("wrong number of scalars"));
    }
    (0..n).map(|_| scalar_from_tree(&mut r.next_child()?)).collect()
}

/// Interprets big-endian bytes as a scalar
///
/// The value must fit in 252 bits so the conversion is exact (no modular
/// reduction); challenge and batching derivations guarantee this by masking.
/// A wider input is a contract violation and panics.
pub fn scalar_from_be_bytes(bytes: &[u8]) -> Scalar {
    let bytes = strip_leading_zeros(bytes);
    assert!(
        bytes.len() < 32 || (bytes.len() == 32 && bytes[0] <= 0x0f),
        "integer exceeds 252 bits"
    );
    let mut le = [0u8; 32];
    for (i, &b) in bytes.iter().rev().enumerate() {
        le[i] = b;
    }
    Scalar::from_bytes_mod_order(le)
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

/// Samples a uniform integer of the given bit length as a scalar
pub fn random_bounded_scalar<R: RngCore>(bit_len: usize, rng: &mut R) -> Scalar {
    assert!(0 < bit_len && bit_len <= 252, "bit length out of range");
    let mut bytes = vec![0u8; (bit_len + 7) / 8];
    rng.fill_bytes(&mut bytes);
    hash::mask_top_byte(&mut bytes, bit_len);
    scalar_from_be_bytes(&bytes)
}

/// Samples a vector of uniform integers of the given bit length
pub fn random_bounded_scalars<R: RngCore>(
    n: usize,
    bit_len: usize,
    rng: &mut R,
) -> Vec<Scalar> {
    (0..n).map(|_| random_bounded_scalar(bit_len, rng)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
    use rand::thread_rng;

    #[test]
    fn point_codec_round_trips() {
        let p = RISTRETTO_BASEPOINT_POINT * Scalar::from(417u64);
        let tree = point_to_tree(&p);
        let q = point_from_tree(&mut tree.reader()).unwrap();
        assert_eq!(p, q);
    }

    #[test]
    fn invalid_point_encoding_is_a_format_error() {
        let tree = crate::bytetree::ByteTree::leaf(vec![0xff; 32]);
        assert!(point_from_tree(&mut tree.reader()).is_err());
    }

    #[test]
    fn scalar_codec_rejects_non_canonical_bytes() {
        let tree = crate::bytetree::ByteTree::leaf(vec![0xff; 32]);
        assert!(scalar_from_tree(&mut tree.reader()).is_err());
    }

    #[test]
    fn be_conversion_matches_small_integers() {
        assert_eq!(scalar_from_be_bytes(&[1, 0]), Scalar::from(256u64));
        assert_eq!(scalar_from_be_bytes(&[0, 0, 7]), Scalar::from(7u64));
        assert_eq!(scalar_from_be_bytes(&[]), Scalar::zero());
    }

    #[test]
    fn bounded_scalars_respect_the_bound() {
        let mut rng = thread_rng();
        for s in random_bounded_scalars(32, 9, &mut rng) {
            // A 9-bit integer has its high 31 bytes zero and second byte 0 or 1.
            let bytes = s.to_bytes();
            assert!(bytes[2..].iter().all(|&b| b == 0));
            assert!(bytes[1] <= 1);
        }
    }
}
