//! Proof sessions
//!
//! A session runs one complete proof for one prover: it derives the
//! batching seed and the challenge from a [`Challenger`], moves the
//! commitment and reply over a [`BulletinBoard`], and optionally writes
//! every artifact to an export directory in the exact form an offline
//! verifier replays. File contents are always the canonical re-encoding of
//! the message the verifier actually used, and a reply file only appears
//! once the proof has been accepted.

use crate::{
    board::BulletinBoard,
    bytetree::ByteTree,
    crypto::{
        self,
        elgamal::{Ciphertext, PublicKey},
        perm::Permutation,
    },
    Result,
};
use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar};
use rand::{CryptoRng, Rng};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{
    ccpos::{CCPoSProver, CCPoSVerifier},
    challenger::Challenger,
    pos::{PoSProver, PoSVerifier},
    sigma::{Batchable, Homomorphism, SigmaProver, SigmaVerifier},
    Challenge, ProofParams, SEED_BITS,
};

fn indexed_file(dir: &Path, stem: &str, party: usize) -> PathBuf {
    dir.join(format!("{}{:02}.bt", stem, party))
}

/// A session of the proof of a shuffle of commitments
pub struct PoSSession {
    /// Session identifier, namespacing board labels
    pub sid: String,
    /// Proof parameters
    pub params: ProofParams,
    /// Artifact directory, if artifacts are exported
    pub export: Option<PathBuf>,
}

impl PoSSession {
    fn label(&self, msg: &str) -> String {
        format!("{}:{}", self.sid, msg)
    }

    fn instance(
        g: &RistrettoPoint,
        h: &[RistrettoPoint],
        u: &[RistrettoPoint],
    ) -> ByteTree {
        ByteTree::node(vec![
            crypto::point_to_tree(g),
            crypto::points_to_tree(h),
            crypto::points_to_tree(u),
        ])
    }

    /// Runs the prover role
    #[allow(clippy::too_many_arguments)]
    pub fn prove<B: BulletinBoard, R: Rng + CryptoRng>(
        &self,
        board: &mut B,
        challenger: &mut dyn Challenger,
        party: usize,
        g: &RistrettoPoint,
        h: &[RistrettoPoint],
        u: &[RistrettoPoint],
        r: &[Scalar],
        pi: &Permutation,
        rng: &mut R,
    ) -> Result<()> {
        let seed = challenger.challenge(&Self::instance(g, h, u), SEED_BITS, self.params.stat_dist);
        debug!(sid = %self.sid, party, "proving shuffle of commitments");

        let prover = PoSProver::new(*g, h, r, pi, self.params);
        let (prover, commitment) = prover.commit(&seed, rng);
        if let Some(dir) = &self.export {
            commitment.write_to_path(indexed_file(dir, "PoSCommitment", party))?;
        }
        board.publish(&self.label("PoSCommitment"), &commitment)?;

        let data = ByteTree::node(vec![ByteTree::leaf(seed), commitment]);
        let bytes = challenger.challenge(&data, self.params.challenge_bits, self.params.stat_dist);
        let v = Challenge::from_bytes(&bytes, self.params.challenge_bits);

        let reply = prover.reply(&v);
        if let Some(dir) = &self.export {
            reply.write_to_path(indexed_file(dir, "PoSReply", party))?;
        }
        board.publish(&self.label("PoSReply"), &reply)
    }

    /// Runs the verifier role against one prover
    ///
    /// I/O failures are errors; a proof that merely fails to convince is an
    /// `Ok(false)` verdict.
    pub fn verify<B: BulletinBoard>(
        &self,
        board: &mut B,
        challenger: &mut dyn Challenger,
        party: usize,
        g: &RistrettoPoint,
        h: &[RistrettoPoint],
        u: &[RistrettoPoint],
    ) -> Result<bool> {
        let seed = challenger.challenge(&Self::instance(g, h, u), SEED_BITS, self.params.stat_dist);

        // An absent commitment degrades to a malformed one; the engine then
        // substitutes identities and the proof cannot verify.
        let received = board
            .wait_for(party, &self.label("PoSCommitment"))
            .unwrap_or_else(|_| ByteTree::node(vec![]));
        let verifier = PoSVerifier::new(*g, h, u, self.params);
        let (verifier, commitment) = verifier.commitment(&seed, &mut received.reader());
        if let Some(dir) = &self.export {
            commitment.write_to_path(indexed_file(dir, "PoSCommitment", party))?;
        }

        let data = ByteTree::node(vec![ByteTree::leaf(seed), commitment]);
        let bytes = challenger.challenge(&data, self.params.challenge_bits, self.params.stat_dist);
        let v = Challenge::from_bytes(&bytes, self.params.challenge_bits);

        let reply = match board.wait_for(party, &self.label("PoSReply")) {
            Ok(t) => t,
            Err(_) => return Ok(false),
        };
        let ok = verifier.verify(&v, &mut reply.reader());
        if ok {
            if let Some(dir) = &self.export {
                reply.write_to_path(indexed_file(dir, "PoSReply", party))?;
            }
        }
        debug!(sid = %self.sid, party, ok, "verified shuffle of commitments");
        Ok(ok)
    }
}

/// A session of the commitment-consistent proof of a shuffle
pub struct CCPoSSession {
    /// Session identifier, namespacing board labels
    pub sid: String,
    /// Proof parameters
    pub params: ProofParams,
    /// Artifact directory, if artifacts are exported
    pub export: Option<PathBuf>,
}

impl CCPoSSession {
    fn label(&self, msg: &str) -> String {
        format!("{}:{}", self.sid, msg)
    }

    fn instance(
        g: &RistrettoPoint,
        h: &[RistrettoPoint],
        u: &[RistrettoPoint],
        pk: &PublicKey,
        w: &[Ciphertext],
        wp: &[Ciphertext],
    ) -> ByteTree {
        ByteTree::node(vec![
            crypto::point_to_tree(g),
            crypto::points_to_tree(h),
            crypto::points_to_tree(u),
            pk.to_tree(),
            crypto::elgamal::ciphertexts_to_tree(w),
            crypto::elgamal::ciphertexts_to_tree(wp),
        ])
    }

    /// Runs the prover role
    #[allow(clippy::too_many_arguments)]
    pub fn prove<B: BulletinBoard, R: Rng + CryptoRng>(
        &self,
        board: &mut B,
        challenger: &mut dyn Challenger,
        party: usize,
        g: &RistrettoPoint,
        h: &[RistrettoPoint],
        u: &[RistrettoPoint],
        pk: &PublicKey,
        w: &[Ciphertext],
        wp: &[Ciphertext],
        r: &[Scalar],
        pi: &Permutation,
        s: &[Scalar],
        rng: &mut R,
    ) -> Result<()> {
        let instance = Self::instance(g, h, u, pk, w, wp);
        let seed = challenger.challenge(&instance, SEED_BITS, self.params.stat_dist);
        debug!(sid = %self.sid, party, "proving commitment-consistent shuffle");

        let prover = CCPoSProver::new(*g, h, pk, wp, r, pi, s, self.params);
        let (prover, commitment) = prover.commit(&seed, rng);
        if let Some(dir) = &self.export {
            commitment.write_to_path(indexed_file(dir, "CCPoSCommitment", party))?;
        }
        board.publish(&self.label("CCPoSCommitment"), &commitment)?;

        let data = ByteTree::node(vec![ByteTree::leaf(seed), commitment]);
        let bytes = challenger.challenge(&data, self.params.challenge_bits, self.params.stat_dist);
        let v = Challenge::from_bytes(&bytes, self.params.challenge_bits);

        let reply = prover.reply(&v);
        if let Some(dir) = &self.export {
            reply.write_to_path(indexed_file(dir, "CCPoSReply", party))?;
        }
        board.publish(&self.label("CCPoSReply"), &reply)
    }

    /// Runs the verifier role against one prover
    #[allow(clippy::too_many_arguments)]
    pub fn verify<B: BulletinBoard>(
        &self,
        board: &mut B,
        challenger: &mut dyn Challenger,
        party: usize,
        g: &RistrettoPoint,
        h: &[RistrettoPoint],
        u: &[RistrettoPoint],
        pk: &PublicKey,
        w: &[Ciphertext],
        wp: &[Ciphertext],
    ) -> Result<bool> {
        let instance = Self::instance(g, h, u, pk, w, wp);
        let seed = challenger.challenge(&instance, SEED_BITS, self.params.stat_dist);

        let received = board
            .wait_for(party, &self.label("CCPoSCommitment"))
            .unwrap_or_else(|_| ByteTree::node(vec![]));
        let verifier = CCPoSVerifier::new(*g, h, u, pk, w, wp, self.params);
        let (verifier, commitment) = verifier.commitment(&seed, &mut received.reader());
        if let Some(dir) = &self.export {
            commitment.write_to_path(indexed_file(dir, "CCPoSCommitment", party))?;
        }

        let data = ByteTree::node(vec![ByteTree::leaf(seed), commitment]);
        let bytes = challenger.challenge(&data, self.params.challenge_bits, self.params.stat_dist);
        let v = Challenge::from_bytes(&bytes, self.params.challenge_bits);

        let reply = match board.wait_for(party, &self.label("CCPoSReply")) {
            Ok(t) => t,
            Err(_) => return Ok(false),
        };
        let ok = verifier.verify(&v, &mut reply.reader());
        if ok {
            if let Some(dir) = &self.export {
                reply.write_to_path(indexed_file(dir, "CCPoSReply", party))?;
            }
        }
        debug!(sid = %self.sid, party, ok, "verified commitment-consistent shuffle");
        Ok(ok)
    }
}

/// A session of a generic sigma proof
///
/// The homomorphism is supplied by the caller, along with an instance tree
/// binding whatever public data the statement depends on. When the
/// homomorphism is [`Batchable`], parallel instances are collapsed under a
/// seed-derived batching vector before the protocol runs.
pub struct SigmaSession {
    /// Session identifier, namespacing board labels
    pub sid: String,
    /// Proof parameters
    pub params: ProofParams,
    /// Artifact directory, if artifacts are exported
    pub export: Option<PathBuf>,
    /// Artifact file stem, e.g. `"DecrFact"`
    pub artifact: String,
}

impl SigmaSession {
    fn label(&self, msg: &str) -> String {
        format!("{}:{}", self.sid, msg)
    }

    fn file(&self, dir: &Path, kind: &str, party: usize) -> PathBuf {
        if self.artifact.is_empty() {
            // Bare sessions use the short names of a single proof directory.
            match kind {
                "Commitment" => dir.join("C.bt"),
                _ => dir.join("R.bt"),
            }
        } else {
            indexed_file(dir, &format!("{}{}", self.artifact, kind), party)
        }
    }

    /// Runs the prover role for a batchable homomorphism
    #[allow(clippy::too_many_arguments)]
    pub fn prove<H, B, R>(
        &self,
        board: &mut B,
        challenger: &mut dyn Challenger,
        party: usize,
        hom: H,
        instance: &ByteTree,
        witness: H::Domain,
        rng: &mut R,
    ) -> Result<()>
    where
        H: Batchable,
        B: BulletinBoard,
        R: Rng + CryptoRng,
    {
        let seed = challenger.challenge(instance, SEED_BITS, self.params.stat_dist);
        let e = super::batch_vector(&seed, hom.width(), self.params.batch_bits);
        debug!(sid = %self.sid, party, "proving sigma statement");

        let prover = SigmaProver::new(hom, witness, self.params.challenge_bits).batch(&e);
        let (prover, commitment) = prover.commit(rng);
        if let Some(dir) = &self.export {
            commitment.write_to_path(self.file(dir, "Commitment", party))?;
        }
        board.publish(&self.label("SigmaCommitment"), &commitment)?;

        let data = ByteTree::node(vec![ByteTree::leaf(seed), commitment]);
        let bytes = challenger.challenge(&data, self.params.challenge_bits, self.params.stat_dist);
        let v = Challenge::from_bytes(&bytes, self.params.challenge_bits);

        let reply = prover.reply(&v);
        if let Some(dir) = &self.export {
            reply.write_to_path(self.file(dir, "Reply", party))?;
        }
        board.publish(&self.label("SigmaReply"), &reply)
    }

    /// Runs the verifier role against one prover
    #[allow(clippy::too_many_arguments)]
    pub fn verify<H, B>(
        &self,
        board: &mut B,
        challenger: &mut dyn Challenger,
        party: usize,
        hom: H,
        instance: &ByteTree,
        common: H::Range,
    ) -> Result<bool>
    where
        H: Batchable,
        B: BulletinBoard,
    {
        let seed = challenger.challenge(instance, SEED_BITS, self.params.stat_dist);
        let e = super::batch_vector(&seed, hom.width(), self.params.batch_bits);

        let received = board
            .wait_for(party, &self.label("SigmaCommitment"))
            .unwrap_or_else(|_| ByteTree::node(vec![]));
        let verifier = SigmaVerifier::new(hom, common, self.params.challenge_bits).batch(&e);
        let (verifier, commitment) = verifier.commitment(&mut received.reader());
        if let Some(dir) = &self.export {
            commitment.write_to_path(self.file(dir, "Commitment", party))?;
        }

        let data = ByteTree::node(vec![ByteTree::leaf(seed), commitment]);
        let bytes = challenger.challenge(&data, self.params.challenge_bits, self.params.stat_dist);
        let v = Challenge::from_bytes(&bytes, self.params.challenge_bits);

        let reply = match board.wait_for(party, &self.label("SigmaReply")) {
            Ok(t) => t,
            Err(_) => return Ok(false),
        };
        let ok = verifier.verify(&v, &mut reply.reader());
        if ok {
            if let Some(dir) = &self.export {
                reply.write_to_path(self.file(dir, "Reply", party))?;
            }
        }
        debug!(sid = %self.sid, party, ok, "verified sigma statement");
        Ok(ok)
    }

    /// Runs the prover role without batching
    ///
    /// With no batching seed in play, the challenge binds the instance tree
    /// directly alongside the commitment.
    #[allow(clippy::too_many_arguments)]
    pub fn prove_unbatched<H, B, R>(
        &self,
        board: &mut B,
        challenger: &mut dyn Challenger,
        party: usize,
        hom: H,
        instance: &ByteTree,
        witness: H::Domain,
        rng: &mut R,
    ) -> Result<()>
    where
        H: Homomorphism,
        B: BulletinBoard,
        R: Rng + CryptoRng,
    {
        debug!(sid = %self.sid, party, "proving sigma statement");
        let prover = SigmaProver::new(hom, witness, self.params.challenge_bits);
        let (prover, commitment) = prover.commit(rng);
        if let Some(dir) = &self.export {
            commitment.write_to_path(self.file(dir, "Commitment", party))?;
        }
        board.publish(&self.label("SigmaCommitment"), &commitment)?;

        let data = ByteTree::node(vec![instance.clone(), commitment]);
        let bytes = challenger.challenge(&data, self.params.challenge_bits, self.params.stat_dist);
        let v = Challenge::from_bytes(&bytes, self.params.challenge_bits);

        let reply = prover.reply(&v);
        if let Some(dir) = &self.export {
            reply.write_to_path(self.file(dir, "Reply", party))?;
        }
        board.publish(&self.label("SigmaReply"), &reply)
    }

    /// Runs the verifier role against one prover, without batching
    pub fn verify_unbatched<H, B>(
        &self,
        board: &mut B,
        challenger: &mut dyn Challenger,
        party: usize,
        hom: H,
        instance: &ByteTree,
        common: H::Range,
    ) -> Result<bool>
    where
        H: Homomorphism,
        B: BulletinBoard,
    {
        let received = board
            .wait_for(party, &self.label("SigmaCommitment"))
            .unwrap_or_else(|_| ByteTree::node(vec![]));
        let verifier = SigmaVerifier::new(hom, common, self.params.challenge_bits);
        let (verifier, commitment) = verifier.commitment(&mut received.reader());
        if let Some(dir) = &self.export {
            commitment.write_to_path(self.file(dir, "Commitment", party))?;
        }

        let data = ByteTree::node(vec![instance.clone(), commitment]);
        let bytes = challenger.challenge(&data, self.params.challenge_bits, self.params.stat_dist);
        let v = Challenge::from_bytes(&bytes, self.params.challenge_bits);

        let reply = match board.wait_for(party, &self.label("SigmaReply")) {
            Ok(t) => t,
            Err(_) => return Ok(false),
        };
        let ok = verifier.verify(&v, &mut reply.reader());
        if ok {
            if let Some(dir) = &self.export {
                reply.write_to_path(self.file(dir, "Reply", party))?;
            }
        }
        debug!(sid = %self.sid, party, ok, "verified sigma statement");
        Ok(ok)
    }
}

#[cfg(test)]
mod tests {
    use super::{CCPoSSession, PoSSession, SigmaSession};
    use crate::{
        board::LocalBoard,
        crypto::{
            commit,
            elgamal::{keygen, Ciphertext},
            perm::Shuffles,
        },
        proofs::{challenger::RandomOracleChallenger, sigma::DecryptionHom, ProofParams},
    };
    use curve25519_dalek::{
        constants::RISTRETTO_BASEPOINT_POINT, ristretto::RistrettoPoint, scalar::Scalar,
    };
    use rand::{thread_rng, Rng};
    use sha2::Sha256;
    use std::{env, fs};

    const N: usize = 30;

    fn params() -> ProofParams {
        ProofParams::new(100, 100, 50)
    }

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let dir = env::temp_dir().join(format!("mixkit-session-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn pos_session_round_trips_over_a_board() {
        let mut rng = thread_rng();
        let g = RISTRETTO_BASEPOINT_POINT;
        let h = commit::derive_generators(N, b"session");
        let pi = rng.sample(&Shuffles(N));
        let (u, r) = commit::commit(&h, &pi, &mut rng);
        let dir = scratch_dir("pos");

        let session = PoSSession {
            sid: "1".into(),
            params: params(),
            export: Some(dir.clone()),
        };
        let mut board = LocalBoard::new(1);
        let mut challenger = RandomOracleChallenger::<Sha256>::new(b"cfg".to_vec());
        session
            .prove(&mut board, &mut challenger, 1, &g, &h, &u, &r, &pi, &mut rng)
            .unwrap();

        let mut challenger = RandomOracleChallenger::<Sha256>::new(b"cfg".to_vec());
        let ok = session
            .verify(&mut board, &mut challenger, 1, &g, &h, &u)
            .unwrap();
        assert!(ok);
        assert!(dir.join("PoSCommitment01.bt").exists());
        assert!(dir.join("PoSReply01.bt").exists());
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn pos_session_rejects_a_missing_reply() {
        let mut rng = thread_rng();
        let g = RISTRETTO_BASEPOINT_POINT;
        let h = commit::derive_generators(N, b"session");
        let pi = rng.sample(&Shuffles(N));
        let (u, r) = commit::commit(&h, &pi, &mut rng);

        let session = PoSSession {
            sid: "1".into(),
            params: params(),
            export: None,
        };
        let mut board = LocalBoard::new(1);
        let mut challenger = RandomOracleChallenger::<Sha256>::new(b"cfg".to_vec());
        session
            .prove(&mut board, &mut challenger, 1, &g, &h, &u, &r, &pi, &mut rng)
            .unwrap();
        board.retract(1, "1:PoSReply");

        let mut challenger = RandomOracleChallenger::<Sha256>::new(b"cfg".to_vec());
        let ok = session
            .verify(&mut board, &mut challenger, 1, &g, &h, &u)
            .unwrap();
        assert!(!ok);
    }

    #[test]
    fn ccpos_session_round_trips_over_a_board() {
        let mut rng = thread_rng();
        let g = RISTRETTO_BASEPOINT_POINT;
        let h = commit::derive_generators(N, b"session");
        let (pk, _) = keygen(&mut rng);
        let pi = rng.sample(&Shuffles(N));
        let (u, r) = commit::commit(&h, &pi, &mut rng);
        let w: Vec<Ciphertext> = (0..N)
            .map(|_| pk.encrypt(&RistrettoPoint::random(&mut rng), &Scalar::random(&mut rng)))
            .collect();
        let s: Vec<Scalar> = (0..N).map(|_| Scalar::random(&mut rng)).collect();
        let t: Vec<Ciphertext> = w
            .iter()
            .zip(s.iter())
            .map(|(w, s)| w + &pk.reencryption_term(s))
            .collect();
        let wp = pi.permute(&t);

        let session = CCPoSSession {
            sid: "2".into(),
            params: params(),
            export: None,
        };
        let mut board = LocalBoard::new(1);
        let mut challenger = RandomOracleChallenger::<Sha256>::new(b"cfg".to_vec());
        session
            .prove(
                &mut board,
                &mut challenger,
                1,
                &g,
                &h,
                &u,
                &pk,
                &w,
                &wp,
                &r,
                &pi,
                &s,
                &mut rng,
            )
            .unwrap();

        let mut challenger = RandomOracleChallenger::<Sha256>::new(b"cfg".to_vec());
        let ok = session
            .verify(&mut board, &mut challenger, 1, &g, &h, &u, &pk, &w, &wp)
            .unwrap();
        assert!(ok);
    }

    #[test]
    fn sigma_session_proves_decryption_factors() {
        let mut rng = thread_rng();
        let g = RISTRETTO_BASEPOINT_POINT;
        let x = Scalar::random(&mut rng);
        let bases: Vec<RistrettoPoint> =
            (0..N).map(|_| RistrettoPoint::random(&mut rng)).collect();
        let hom = DecryptionHom {
            g,
            bases: bases.clone(),
        };
        let common = crate::proofs::sigma::Homomorphism::map(&hom, &x);
        let instance = crate::crypto::points_to_tree(&bases);

        let session = SigmaSession {
            sid: "3".into(),
            params: params(),
            export: None,
            artifact: "DecrFact".into(),
        };
        let mut board = LocalBoard::new(1);
        let mut challenger = RandomOracleChallenger::<Sha256>::new(b"cfg".to_vec());
        session
            .prove(&mut board, &mut challenger, 1, hom.clone(), &instance, x, &mut rng)
            .unwrap();

        let mut challenger = RandomOracleChallenger::<Sha256>::new(b"cfg".to_vec());
        let ok = session
            .verify(&mut board, &mut challenger, 1, hom, &instance, common)
            .unwrap();
        assert!(ok);
    }

    #[test]
    fn bare_sigma_session_uses_short_artifact_names() {
        let mut rng = thread_rng();
        let g = RISTRETTO_BASEPOINT_POINT;
        let x = Scalar::random(&mut rng);
        let y = g * x;
        let hom = crate::proofs::sigma::ExpHom { base: g };
        let instance = crate::crypto::point_to_tree(&y);
        let dir = scratch_dir("bare");

        let session = SigmaSession {
            sid: "4".into(),
            params: params(),
            export: Some(dir.clone()),
            artifact: String::new(),
        };
        let mut board = LocalBoard::new(1);
        let mut challenger = RandomOracleChallenger::<Sha256>::new(b"cfg".to_vec());
        session
            .prove_unbatched(&mut board, &mut challenger, 1, hom.clone(), &instance, x, &mut rng)
            .unwrap();

        let mut challenger = RandomOracleChallenger::<Sha256>::new(b"cfg".to_vec());
        let ok = session
            .verify_unbatched(&mut board, &mut challenger, 1, hom, &instance, y)
            .unwrap();
        assert!(ok);
        assert!(dir.join("C.bt").exists());
        assert!(dir.join("R.bt").exists());
        fs::remove_dir_all(dir).unwrap();
    }
}
