//! Depth-first byte tree reader

use super::ByteTree;
use crate::{Error, Result};

/// A stateful cursor over a byte tree
///
/// Traversal is strictly sequential and single-pass: each child is handed
/// out exactly once, in order, and a leaf's payload can be taken exactly
/// once. Attempting to read past the end, or to read a node as a leaf,
/// surfaces a format error so that verifiers parsing untrusted messages can
/// fail closed.
pub struct ByteTreeReader<'a> {
    tree: &'a ByteTree,
    next: usize,
    consumed: bool,
}

impl<'a> ByteTreeReader<'a> {
    pub(super) fn new(tree: &'a ByteTree) -> Self {
        Self {
            tree,
            next: 0,
            consumed: false,
        }
    }

    /// Whether the underlying tree is a leaf
    pub fn is_leaf(&self) -> bool {
        matches!(self.tree, ByteTree::Leaf(_))
    }

    /// Number of children (or payload bytes, for a leaf) not yet consumed
    pub fn remaining(&self) -> usize {
        match self.tree {
            ByteTree::Leaf(bytes) => {
                if self.consumed {
                    0
                } else {
                    bytes.len()
                }
            }
            ByteTree::Node(children) => children.len() - self.next,
        }
    }

    /// Returns a reader over the next unconsumed child
    pub fn next_child(&mut self) -> Result<ByteTreeReader<'a>> {
        let children = self.tree.as_node()?;
        let child = children
            .get(self.next)
            .ok_or(Error::Format("no more children"))?;
        self.next += 1;
        Ok(ByteTreeReader::new(child))
    }

    /// Takes the payload of a leaf, consuming it
    pub fn read_bytes(&mut self) -> Result<&'a [u8]> {
        let bytes = self.tree.as_leaf()?;
        if self.consumed {
            return Err(Error::Format("leaf already consumed"));
        }
        self.consumed = true;
        Ok(bytes)
    }

    /// Takes the payload of a leaf, requiring an exact byte count
    pub fn read_exact(&mut self, len: usize) -> Result<&'a [u8]> {
        let bytes = self.read_bytes()?;
        if bytes.len() != len {
            return Err(Error::Format("leaf has unexpected length"));
        }
        Ok(bytes)
    }

    /// Reads the next child as a 32-bit integer leaf
    pub fn read_u32(&mut self) -> Result<u32> {
        self.next_child()?.tree.as_u32()
    }

    /// Reads the next child as a string leaf
    pub fn read_string(&mut self) -> Result<String> {
        self.next_child()?.tree.as_string()
    }
}

#[cfg(test)]
mod tests {
    use super::super::ByteTree;

    #[test]
    fn children_are_handed_out_in_order_exactly_once() {
        let tree = ByteTree::node(vec![
            ByteTree::leaf(vec![1]),
            ByteTree::leaf(vec![2]),
        ]);
        let mut r = tree.reader();
        assert_eq!(r.remaining(), 2);
        assert_eq!(r.next_child().unwrap().read_bytes().unwrap(), &[1]);
        assert_eq!(r.next_child().unwrap().read_bytes().unwrap(), &[2]);
        assert_eq!(r.remaining(), 0);
        assert!(r.next_child().is_err());
    }

    #[test]
    fn leaves_cannot_be_read_twice() {
        let tree = ByteTree::leaf(vec![1, 2, 3]);
        let mut r = tree.reader();
        assert_eq!(r.read_bytes().unwrap(), &[1, 2, 3]);
        assert!(r.read_bytes().is_err());
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn kind_confusion_is_a_format_error() {
        let leaf = ByteTree::leaf(vec![1]);
        assert!(leaf.reader().next_child().is_err());
        let node = ByteTree::node(vec![]);
        assert!(node.reader().read_bytes().is_err());
    }
}
