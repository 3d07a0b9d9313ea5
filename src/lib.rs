#![warn(missing_docs)]
#![deny(clippy::correctness)]

//! Verifiable mix-net toolbox
//!
//! A mix-net shuffles and re-encrypts a batch of ElGamal ciphertexts while
//! producing a zero-knowledge proof that the shuffle was performed correctly,
//! without revealing the permutation. This crate implements the
//! honest-verifier zero-knowledge proof-of-shuffle machinery (the
//! Terelius-Wikstrom argument and its commitment-consistent variant), a
//! generic sigma-protocol engine with homomorphism batching, and the
//! challenge-generation abstraction that lets the same proof code run
//! interactively or as a non-interactive Fiat-Shamir proof.
//!
//! All proof messages share a single recursive binary format, the byte tree,
//! which doubles as the canonical hashing input for challenge derivation and
//! as the persisted artifact format for after-the-fact audits.

pub mod board;
pub mod bytetree;
pub mod crypto;
pub mod mix;
pub mod proofs;

mod error;
pub use self::error::{Error, Result};
