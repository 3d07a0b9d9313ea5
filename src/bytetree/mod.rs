//! Byte tree serialization
//!
//! A byte tree is either a leaf holding a raw byte string or a node holding
//! an ordered sequence of byte trees. Serialized depth-first, a tree becomes
//! a tag byte (`0` for a node, `1` for a leaf), a 4-byte big-endian count
//! (children for a node, payload bytes for a leaf), and then the children or
//! payload in order. The format is deliberately trivial so that independent
//! implementations produce bit-identical artifacts; every proof message and
//! every persisted file in this crate is a byte tree.

mod file;
mod reader;

pub use self::{
    file::{Entry, FileReader},
    reader::ByteTreeReader,
};

use crate::{Error, Result};
use digest::Digest;
use std::io::Write;

/// Tag byte labelling a node
pub const NODE: u8 = 0;
/// Tag byte labelling a leaf
pub const LEAF: u8 = 1;

/// Maximum nesting depth accepted when parsing
///
/// Every legitimate artifact in this crate nests a handful of levels; the
/// bound keeps a crafted chain of single-child nodes from exhausting the
/// stack through parser recursion.
pub const MAX_DEPTH: usize = 64;

/// A recursively defined tree of byte strings
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ByteTree {
    /// A raw byte string
    Leaf(Vec<u8>),
    /// An ordered sequence of subtrees
    Node(Vec<ByteTree>),
}

impl ByteTree {
    /// Creates a leaf holding the given bytes
    pub fn leaf<B: Into<Vec<u8>>>(bytes: B) -> Self {
        ByteTree::Leaf(bytes.into())
    }

    /// Creates a node holding the given subtrees
    pub fn node(children: Vec<ByteTree>) -> Self {
        ByteTree::Node(children)
    }

    /// Returns a depth-first reader over this tree
    pub fn reader(&self) -> ByteTreeReader<'_> {
        ByteTreeReader::new(self)
    }

    /// Total size of the serialized form in bytes
    pub fn total_size(&self) -> usize {
        match self {
            ByteTree::Leaf(bytes) => 5 + bytes.len(),
            ByteTree::Node(children) => {
                5 + children.iter().map(ByteTree::total_size).sum::<usize>()
            }
        }
    }

    /// Serializes this tree
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_size());
        self.write_to(&mut out)
            .unwrap_or_else(|_| unreachable!("writing to a Vec cannot fail"));
        out
    }

    /// Writes the serialized form of this tree depth-first
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        match self {
            ByteTree::Leaf(bytes) => {
                w.write_all(&[LEAF])?;
                w.write_all(&be32(bytes.len())?)?;
                w.write_all(bytes)?;
            }
            ByteTree::Node(children) => {
                w.write_all(&[NODE])?;
                w.write_all(&be32(children.len())?)?;
                for child in children {
                    child.write_to(w)?;
                }
            }
        }
        Ok(())
    }

    /// Parses a serialized tree, requiring that the input is consumed exactly
    pub fn parse(bytes: &[u8]) -> Result<ByteTree> {
        let mut cursor = Cursor { bytes, pos: 0 };
        let tree = cursor.parse_tree(0)?;
        if cursor.pos != bytes.len() {
            return Err(Error::Format("trailing bytes after tree"));
        }
        Ok(tree)
    }

    /// Feeds this tree into a hash digest
    ///
    /// The framing is the same tag and big-endian length prefix as the
    /// serialized form, so the mapping from trees to digest inputs is
    /// injective on both structure and contents.
    pub fn update<D: Digest>(&self, digest: &mut D) {
        match self {
            ByteTree::Leaf(bytes) => {
                digest.input(&[LEAF]);
                digest.input(&(bytes.len() as u32).to_be_bytes());
                digest.input(bytes);
            }
            ByteTree::Node(children) => {
                digest.input(&[NODE]);
                digest.input(&(children.len() as u32).to_be_bytes());
                for child in children {
                    child.update(digest);
                }
            }
        }
    }
}

fn be32(n: usize) -> Result<[u8; 4]> {
    if n > u32::max_value() as usize {
        return Err(Error::Format("length exceeds 32 bits"));
    }
    Ok((n as u32).to_be_bytes())
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.bytes.len() - self.pos < n {
            return Err(Error::Format("truncated input"));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn header(&mut self) -> Result<(u8, usize)> {
        let tag = self.take(1)?[0];
        if tag != LEAF && tag != NODE {
            return Err(Error::Format("unrecognized tag byte"));
        }
        let mut len = [0u8; 4];
        len.copy_from_slice(self.take(4)?);
        Ok((tag, u32::from_be_bytes(len) as usize))
    }

    fn parse_tree(&mut self, depth: usize) -> Result<ByteTree> {
        if depth == MAX_DEPTH {
            return Err(Error::Format("nesting too deep"));
        }
        let (tag, len) = self.header()?;
        if tag == LEAF {
            Ok(ByteTree::Leaf(self.take(len)?.to_vec()))
        } else {
            // Each child occupies at least a header, which bounds a
            // well-formed count by the remaining input.
            if len > (self.bytes.len() - self.pos) / 5 {
                return Err(Error::Format("child count overruns input"));
            }
            let mut children = Vec::with_capacity(len);
            for _ in 0..len {
                children.push(self.parse_tree(depth + 1)?);
            }
            Ok(ByteTree::Node(children))
        }
    }
}

// Primitive conversions. Integers are stored big-endian in fixed-width
// leaves, matching the header byte order.

impl ByteTree {
    /// Creates a leaf holding a 32-bit integer
    pub fn from_u32(n: u32) -> Self {
        ByteTree::Leaf(n.to_be_bytes().to_vec())
    }

    /// Creates a leaf holding a 16-bit integer
    pub fn from_u16(n: u16) -> Self {
        ByteTree::Leaf(n.to_be_bytes().to_vec())
    }

    /// Creates a leaf holding a boolean
    pub fn from_bool(b: bool) -> Self {
        ByteTree::Leaf(vec![b as u8])
    }

    /// Creates a leaf holding a UTF-8 string
    pub fn from_str(s: &str) -> Self {
        ByteTree::Leaf(s.as_bytes().to_vec())
    }

    /// Creates a node holding an array of 32-bit integers
    pub fn from_u32_array(ns: &[u32]) -> Self {
        ByteTree::Node(ns.iter().map(|&n| ByteTree::from_u32(n)).collect())
    }

    /// Reads back a 32-bit integer leaf
    pub fn as_u32(&self) -> Result<u32> {
        let bytes = self.as_leaf()?;
        if bytes.len() != 4 {
            return Err(Error::Format("leaf is not 4 bytes"));
        }
        let mut buf = [0u8; 4];
        buf.copy_from_slice(bytes);
        Ok(u32::from_be_bytes(buf))
    }

    /// Reads back a 16-bit integer leaf
    pub fn as_u16(&self) -> Result<u16> {
        let bytes = self.as_leaf()?;
        if bytes.len() != 2 {
            return Err(Error::Format("leaf is not 2 bytes"));
        }
        let mut buf = [0u8; 2];
        buf.copy_from_slice(bytes);
        Ok(u16::from_be_bytes(buf))
    }

    /// Reads back a boolean leaf
    pub fn as_bool(&self) -> Result<bool> {
        match self.as_leaf()? {
            [0] => Ok(false),
            [1] => Ok(true),
            _ => Err(Error::Format("leaf is not a boolean")),
        }
    }

    /// Reads back a UTF-8 string leaf
    pub fn as_string(&self) -> Result<String> {
        String::from_utf8(self.as_leaf()?.to_vec())
            .map_err(|_| Error::Format("leaf is not valid utf-8"))
    }

    /// Reads back an array of 32-bit integers
    pub fn as_u32_array(&self) -> Result<Vec<u32>> {
        self.as_node()?.iter().map(ByteTree::as_u32).collect()
    }

    /// Returns the payload if this tree is a leaf
    pub fn as_leaf(&self) -> Result<&[u8]> {
        match self {
            ByteTree::Leaf(bytes) => Ok(bytes),
            ByteTree::Node(_) => Err(Error::Format("expected a leaf")),
        }
    }

    /// Returns the children if this tree is a node
    pub fn as_node(&self) -> Result<&[ByteTree]> {
        match self {
            ByteTree::Node(children) => Ok(children),
            ByteTree::Leaf(_) => Err(Error::Format("expected a node")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ByteTree;
    use sha2::{Digest, Sha256};

    fn sample() -> ByteTree {
        ByteTree::node(vec![
            ByteTree::leaf(vec![1, 2, 3]),
            ByteTree::node(vec![ByteTree::leaf(vec![]), ByteTree::from_u32(7)]),
            ByteTree::from_str("shuffle"),
        ])
    }

    #[test]
    fn round_trips_through_bytes() {
        let tree = sample();
        let bytes = tree.to_bytes();
        let parsed = ByteTree::parse(&bytes).unwrap();
        assert_eq!(tree, parsed);
    }

    #[test]
    fn serialized_form_matches_the_wire_format() {
        let tree = ByteTree::node(vec![ByteTree::leaf(vec![0xab, 0xcd])]);
        assert_eq!(
            tree.to_bytes(),
            vec![0, 0, 0, 0, 1, 1, 0, 0, 0, 2, 0xab, 0xcd]
        );
    }

    #[test]
    fn truncated_prefixes_fail_to_parse() {
        let bytes = sample().to_bytes();
        for n in 0..bytes.len() {
            assert!(ByteTree::parse(&bytes[..n]).is_err(), "prefix {}", n);
        }
    }

    #[test]
    fn trailing_bytes_fail_to_parse() {
        let mut bytes = sample().to_bytes();
        bytes.push(0);
        assert!(ByteTree::parse(&bytes).is_err());
    }

    #[test]
    fn bad_tag_fails_to_parse() {
        assert!(ByteTree::parse(&[2, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn overrunning_count_fails_to_parse() {
        // A node claiming four billion children.
        assert!(ByteTree::parse(&[0, 0xff, 0xff, 0xff, 0xff]).is_err());
    }

    #[test]
    fn excessive_nesting_fails_to_parse() {
        // A chain of single-child nodes far deeper than any artifact; the
        // parser must report a format error rather than recurse into it.
        let mut bytes = Vec::new();
        for _ in 0..100_000 {
            bytes.extend_from_slice(&[0, 0, 0, 0, 1]);
        }
        bytes.extend_from_slice(&[1, 0, 0, 0, 0]);
        assert!(ByteTree::parse(&bytes).is_err());
    }

    #[test]
    fn moderate_nesting_parses() {
        let mut tree = ByteTree::leaf(vec![7]);
        for _ in 0..32 {
            tree = ByteTree::node(vec![tree]);
        }
        let bytes = tree.to_bytes();
        assert_eq!(ByteTree::parse(&bytes).unwrap(), tree);
    }

    #[test]
    fn primitives_round_trip() {
        assert_eq!(ByteTree::from_u32(0xdead_beef).as_u32().unwrap(), 0xdead_beef);
        assert_eq!(ByteTree::from_u16(517).as_u16().unwrap(), 517);
        assert_eq!(ByteTree::from_bool(true).as_bool().unwrap(), true);
        assert_eq!(ByteTree::from_str("π").as_string().unwrap(), "π");
        let ns = vec![1, 2, 3, 0xffff_ffff];
        assert_eq!(ByteTree::from_u32_array(&ns).as_u32_array().unwrap(), ns);
    }

    #[test]
    fn primitive_read_back_checks_width() {
        assert!(ByteTree::leaf(vec![0, 1, 2]).as_u32().is_err());
        assert!(ByteTree::leaf(vec![5]).as_bool().is_err());
        assert!(ByteTree::node(vec![]).as_leaf().is_err());
        assert!(ByteTree::leaf(vec![]).as_node().is_err());
    }

    #[test]
    fn digest_update_distinguishes_structure() {
        // A leaf of five bytes vs. a node of one five-byte leaf: same
        // contents, different structure, different digests.
        let a = ByteTree::leaf(vec![1, 2, 3, 4, 5]);
        let b = ByteTree::node(vec![ByteTree::leaf(vec![1, 2, 3, 4, 5])]);

        let mut da = Sha256::new();
        a.update(&mut da);
        let mut db = Sha256::new();
        b.update(&mut db);
        assert_ne!(da.result(), db.result());
    }
}
