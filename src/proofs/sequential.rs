//! Sequential composition of proofs across parties
//!
//! A mix-net runs the same proof once per party, with the prover role
//! rotating. The drivers here walk the party indices in order, run the
//! local party's prover session at its slot and the verifier session for
//! everyone else, and collect a verdict per party. They never stop early:
//! a failed proof marks its party and the remaining parties are still
//! checked, so one dishonest mix server cannot suppress the evidence
//! against another.
//!
//! Party indices are 1-based, as they are in every artifact file name;
//! slot 0 of a verdict vector is unused and always false.

use crate::{
    board::BulletinBoard,
    crypto::{
        elgamal::{Ciphertext, PublicKey},
        perm::Permutation,
    },
    Result,
};
use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar};
use rand::{CryptoRng, Rng};
use std::path::PathBuf;
use tracing::info;

use super::{
    challenger::Challenger,
    session::{CCPoSSession, PoSSession, SigmaSession},
    sigma::Batchable,
    ProofParams,
};

/// Drives proofs of shuffles of commitments for all parties
pub struct PoSSequential {
    /// Number of parties
    pub parties: usize,
    /// Index of the local party, in `1..=parties`
    pub local: usize,
    /// Proof parameters
    pub params: ProofParams,
    /// Artifact directory, if artifacts are exported
    pub export: Option<PathBuf>,
}

impl PoSSequential {
    /// Runs one proof per party and returns the verdict vector
    ///
    /// `commitments[l]` is party `l`'s permutation commitment; the local
    /// party's slot is vouched for by its own proof and needs `witness`.
    #[allow(clippy::too_many_arguments)]
    pub fn execute<B: BulletinBoard, R: Rng + CryptoRng>(
        &self,
        board: &mut B,
        challenger: &mut dyn Challenger,
        g: &RistrettoPoint,
        h: &[RistrettoPoint],
        commitments: &[Vec<RistrettoPoint>],
        witness: Option<(&[Scalar], &Permutation)>,
        rng: &mut R,
    ) -> Result<Vec<bool>> {
        assert_eq!(commitments.len(), self.parties + 1);
        let mut verdicts = vec![false; self.parties + 1];
        for l in 1..=self.parties {
            let session = PoSSession {
                sid: format!("PoS{}", l),
                params: self.params,
                export: self.export.clone(),
            };
            if l == self.local {
                let (r, pi) = match witness {
                    Some(w) => w,
                    None => panic!("the local party must supply its opening"),
                };
                session.prove(board, challenger, l, g, h, &commitments[l], r, pi, rng)?;
                verdicts[l] = true;
            } else {
                verdicts[l] =
                    session.verify(board, challenger, l, g, h, &commitments[l])?;
            }
            info!(party = l, ok = verdicts[l], "shuffle commitment proof");
        }
        Ok(verdicts)
    }
}

/// Drives commitment-consistent shuffle proofs for all parties
pub struct CCPoSSequential {
    /// Number of parties
    pub parties: usize,
    /// Index of the local party, in `1..=parties`
    pub local: usize,
    /// Proof parameters
    pub params: ProofParams,
    /// Artifact directory, if artifacts are exported
    pub export: Option<PathBuf>,
}

impl CCPoSSequential {
    /// Runs one proof per party and returns the verdict vector
    ///
    /// `lists[0]` is the mix-net input; `lists[l]` is party `l`'s output,
    /// claimed to shuffle `lists[l - 1]` under `commitments[l]`.
    #[allow(clippy::too_many_arguments)]
    pub fn execute<B: BulletinBoard, R: Rng + CryptoRng>(
        &self,
        board: &mut B,
        challenger: &mut dyn Challenger,
        g: &RistrettoPoint,
        h: &[RistrettoPoint],
        pk: &PublicKey,
        lists: &[Vec<Ciphertext>],
        commitments: &[Vec<RistrettoPoint>],
        witness: Option<(&[Scalar], &Permutation, &[Scalar])>,
        rng: &mut R,
    ) -> Result<Vec<bool>> {
        assert_eq!(lists.len(), self.parties + 1);
        assert_eq!(commitments.len(), self.parties + 1);
        let mut verdicts = vec![false; self.parties + 1];
        for l in 1..=self.parties {
            let session = CCPoSSession {
                sid: format!("CCPoS{}", l),
                params: self.params,
                export: self.export.clone(),
            };
            let w = &lists[l - 1];
            let wp = &lists[l];
            if l == self.local {
                let (r, pi, s) = match witness {
                    Some(w) => w,
                    None => panic!("the local party must supply its opening"),
                };
                session.prove(
                    board,
                    challenger,
                    l,
                    g,
                    h,
                    &commitments[l],
                    pk,
                    w,
                    wp,
                    r,
                    pi,
                    s,
                    rng,
                )?;
                verdicts[l] = true;
            } else {
                verdicts[l] = session.verify(
                    board,
                    challenger,
                    l,
                    g,
                    h,
                    &commitments[l],
                    pk,
                    w,
                    wp,
                )?;
            }
            info!(party = l, ok = verdicts[l], "commitment-consistent proof");
        }
        Ok(verdicts)
    }
}

/// Drives a generic batched sigma proof for all parties
pub struct SigmaSequential {
    /// Number of parties
    pub parties: usize,
    /// Index of the local party, in `1..=parties`
    pub local: usize,
    /// Proof parameters
    pub params: ProofParams,
    /// Artifact directory, if artifacts are exported
    pub export: Option<PathBuf>,
    /// Artifact file stem
    pub artifact: String,
}

impl SigmaSequential {
    /// Runs one proof per party and returns the verdict vector
    ///
    /// Each party proves its own statement `homs[l](?) = commons[l]` bound
    /// to `instances[l]`.
    #[allow(clippy::too_many_arguments)]
    pub fn execute<H, B, R>(
        &self,
        board: &mut B,
        challenger: &mut dyn Challenger,
        homs: &[H],
        instances: &[crate::bytetree::ByteTree],
        commons: &[H::Range],
        witness: Option<H::Domain>,
        rng: &mut R,
    ) -> Result<Vec<bool>>
    where
        H: Batchable + Clone,
        B: BulletinBoard,
        R: Rng + CryptoRng,
    {
        assert_eq!(homs.len(), self.parties + 1);
        assert_eq!(instances.len(), self.parties + 1);
        assert_eq!(commons.len(), self.parties + 1);
        let mut verdicts = vec![false; self.parties + 1];
        let mut witness = witness;
        for l in 1..=self.parties {
            let session = SigmaSession {
                sid: format!("Sigma{}", l),
                params: self.params,
                export: self.export.clone(),
                artifact: self.artifact.clone(),
            };
            if l == self.local {
                let w = match witness.take() {
                    Some(w) => w,
                    None => panic!("the local party must supply its witness"),
                };
                session.prove(board, challenger, l, homs[l].clone(), &instances[l], w, rng)?;
                verdicts[l] = true;
            } else {
                verdicts[l] = session.verify(
                    board,
                    challenger,
                    l,
                    homs[l].clone(),
                    &instances[l],
                    commons[l].clone(),
                )?;
            }
            info!(party = l, ok = verdicts[l], "sigma proof");
        }
        Ok(verdicts)
    }
}
