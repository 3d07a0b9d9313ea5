//! Bulletin board abstraction
//!
//! Proof sessions never talk to each other directly; every message is
//! published on an authenticated append-only board and read back by label.
//! The in-memory board here backs tests and single-process executions;
//! a networked implementation plugs in through the same trait.

use crate::{bytetree::ByteTree, Error, Result};
use std::collections::HashMap;

/// An authenticated bulletin board
pub trait BulletinBoard {
    /// Publishes a message under this party's identity
    fn publish(&mut self, label: &str, tree: &ByteTree) -> Result<()>;

    /// Retrieves the message another party published under a label
    ///
    /// Fails with [`Error::Absent`] when the party never published it.
    fn wait_for(&mut self, party: usize, label: &str) -> Result<ByteTree>;
}

/// In-memory bulletin board
///
/// Holds all parties' messages in one map; the local party index selects
/// whose identity [`BulletinBoard::publish`] writes under, and can be
/// switched to drive several parties from a single thread.
pub struct LocalBoard {
    local: usize,
    messages: HashMap<(usize, String), ByteTree>,
}

impl LocalBoard {
    /// Creates an empty board acting for the given party
    pub fn new(local: usize) -> Self {
        Self {
            local,
            messages: HashMap::new(),
        }
    }

    /// Switches the party that subsequent publishes are attributed to
    pub fn act_as(&mut self, party: usize) {
        self.local = party;
    }

    /// Posts a message under an arbitrary party's identity
    pub fn post_as(&mut self, party: usize, label: &str, tree: &ByteTree) {
        self.messages
            .insert((party, label.to_string()), tree.clone());
    }

    /// Removes a party's message, if present
    pub fn retract(&mut self, party: usize, label: &str) -> Option<ByteTree> {
        self.messages.remove(&(party, label.to_string()))
    }
}

impl BulletinBoard for LocalBoard {
    fn publish(&mut self, label: &str, tree: &ByteTree) -> Result<()> {
        self.post_as(self.local, label, tree);
        Ok(())
    }

    fn wait_for(&mut self, party: usize, label: &str) -> Result<ByteTree> {
        self.messages
            .get(&(party, label.to_string()))
            .cloned()
            .ok_or_else(|| Error::Absent {
                party,
                label: label.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::{BulletinBoard, LocalBoard};
    use crate::bytetree::ByteTree;

    #[test]
    fn published_messages_can_be_read_back() {
        let mut board = LocalBoard::new(1);
        let tree = ByteTree::leaf(vec![1, 2, 3]);
        board.publish("greeting", &tree).unwrap();
        assert_eq!(board.wait_for(1, "greeting").unwrap(), tree);
    }

    #[test]
    fn absent_messages_are_an_error() {
        let mut board = LocalBoard::new(1);
        assert!(board.wait_for(2, "nothing").is_err());
    }

    #[test]
    fn identities_are_separate() {
        let mut board = LocalBoard::new(1);
        board.publish("x", &ByteTree::leaf(vec![1])).unwrap();
        board.act_as(2);
        board.publish("x", &ByteTree::leaf(vec![2])).unwrap();
        assert_eq!(board.wait_for(1, "x").unwrap(), ByteTree::leaf(vec![1]));
        assert_eq!(board.wait_for(2, "x").unwrap(), ByteTree::leaf(vec![2]));
    }

    #[test]
    fn retracted_messages_become_absent() {
        let mut board = LocalBoard::new(3);
        board.publish("m", &ByteTree::leaf(vec![7])).unwrap();
        board.retract(3, "m");
        assert!(board.wait_for(3, "m").is_err());
    }
}
