//! File-backed byte trees
//!
//! Proof artifacts are persisted as serialized byte trees (`*.bt` files).
//! Writing streams the tree depth-first through a buffered writer, and
//! [`FileReader`] traverses headers incrementally, so a leaf larger than
//! comfortable memory only ever needs to be materialized if its payload is
//! actually requested (it can be copied to a sink instead).

use super::{ByteTree, LEAF, NODE};
use crate::{Error, Result};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

impl ByteTree {
    /// Writes the serialized form of this tree to a file
    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        self.write_to(&mut w)?;
        w.flush()?;
        Ok(())
    }

    /// Reads a tree from a file written by [`ByteTree::write_to_path`]
    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<ByteTree> {
        let mut reader = FileReader::open(path)?;
        let tree = reader.read_tree()?;
        if !reader.at_end()? {
            return Err(Error::Format("trailing bytes after tree"));
        }
        Ok(tree)
    }
}

/// Header of the next entry in a serialized stream
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Entry {
    /// An inner node with the given child count
    Node(u32),
    /// A leaf with the given payload byte length
    Leaf(u32),
}

/// Incremental reader over a serialized byte tree file
pub struct FileReader {
    src: BufReader<File>,
}

impl FileReader {
    /// Opens a serialized byte tree file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            src: BufReader::new(File::open(path)?),
        })
    }

    /// Reads the next tag-and-length header
    pub fn read_header(&mut self) -> Result<Entry> {
        let mut header = [0u8; 5];
        self.src
            .read_exact(&mut header)
            .map_err(|_| Error::Format("truncated input"))?;
        let mut len = [0u8; 4];
        len.copy_from_slice(&header[1..]);
        let len = u32::from_be_bytes(len);
        match header[0] {
            NODE => Ok(Entry::Node(len)),
            LEAF => Ok(Entry::Leaf(len)),
            _ => Err(Error::Format("unrecognized tag byte")),
        }
    }

    /// Reads a leaf payload into memory
    pub fn read_leaf(&mut self, len: u32) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; len as usize];
        self.src
            .read_exact(&mut bytes)
            .map_err(|_| Error::Format("truncated input"))?;
        Ok(bytes)
    }

    /// Streams a leaf payload into a sink without materializing it
    pub fn copy_leaf<W: Write>(&mut self, len: u32, sink: &mut W) -> Result<()> {
        let copied = std::io::copy(&mut (&mut self.src).take(len as u64), sink)?;
        if copied != len as u64 {
            return Err(Error::Format("truncated input"));
        }
        Ok(())
    }

    /// Reads and materializes one complete subtree
    pub fn read_tree(&mut self) -> Result<ByteTree> {
        self.read_tree_at(0)
    }

    fn read_tree_at(&mut self, depth: usize) -> Result<ByteTree> {
        if depth == super::MAX_DEPTH {
            return Err(Error::Format("nesting too deep"));
        }
        match self.read_header()? {
            Entry::Leaf(len) => Ok(ByteTree::Leaf(self.read_leaf(len)?)),
            Entry::Node(count) => {
                let mut children = Vec::with_capacity(count.min(1 << 16) as usize);
                for _ in 0..count {
                    children.push(self.read_tree_at(depth + 1)?);
                }
                Ok(ByteTree::Node(children))
            }
        }
    }

    /// Whether the underlying file is exhausted
    pub fn at_end(&mut self) -> Result<bool> {
        let mut probe = [0u8; 1];
        match self.src.read(&mut probe)? {
            0 => Ok(true),
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{super::ByteTree, Entry, FileReader};
    use std::{fs, path::PathBuf};

    fn scratch(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("mixkit-bytetree-{}-{}", std::process::id(), name));
        path
    }

    #[test]
    fn file_round_trip() {
        let tree = ByteTree::node(vec![
            ByteTree::leaf(vec![9; 1000]),
            ByteTree::node(vec![ByteTree::from_u32(42)]),
        ]);
        let path = scratch("roundtrip.bt");
        tree.write_to_path(&path).unwrap();
        let read = ByteTree::read_from_path(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(tree, read);
    }

    #[test]
    fn leaf_can_be_streamed_without_materializing_the_tree() {
        let payload: Vec<u8> = (0..255u8).cycle().take(10_000).collect();
        let tree = ByteTree::node(vec![ByteTree::leaf(payload.clone())]);
        let path = scratch("stream.bt");
        tree.write_to_path(&path).unwrap();

        let mut reader = FileReader::open(&path).unwrap();
        assert_eq!(reader.read_header().unwrap(), Entry::Node(1));
        let len = match reader.read_header().unwrap() {
            Entry::Leaf(len) => len,
            e => panic!("expected leaf, got {:?}", e),
        };
        let mut sink = Vec::new();
        reader.copy_leaf(len, &mut sink).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(sink, payload);
    }

    #[test]
    fn excessively_nested_file_fails_to_parse() {
        let path = scratch("nested.bt");
        let mut bytes = Vec::new();
        for _ in 0..100_000 {
            bytes.extend_from_slice(&[0, 0, 0, 0, 1]);
        }
        bytes.extend_from_slice(&[1, 0, 0, 0, 0]);
        fs::write(&path, &bytes).unwrap();
        let res = ByteTree::read_from_path(&path);
        fs::remove_file(&path).unwrap();
        assert!(res.is_err());
    }

    #[test]
    fn truncated_file_fails_to_parse() {
        let tree = ByteTree::leaf(vec![1, 2, 3, 4]);
        let path = scratch("truncated.bt");
        let bytes = tree.to_bytes();
        fs::write(&path, &bytes[..bytes.len() - 1]).unwrap();
        let res = ByteTree::read_from_path(&path);
        fs::remove_file(&path).unwrap();
        assert!(res.is_err());
    }
}
