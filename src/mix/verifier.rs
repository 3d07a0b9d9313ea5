//! Standalone run verifier
//!
//! Replays an exported artifact directory from scratch: every challenge is
//! re-derived from the public configuration, every proof re-checked from
//! the files alone. No mix server participates; a run that was honestly
//! produced verifies on any machine that has the directory.
//!
//! The verifier halts at the first unrecoverable mismatch and reports the
//! step that failed. A malformed or absent permutation commitment is the
//! one exception: it degrades to the trivial commitment first, and the
//! failure then surfaces as a rejected proof of shuffle.

use crate::{
    board::BulletinBoard,
    bytetree::ByteTree,
    crypto::{
        self, commit,
        elgamal::{Ciphertext, PublicKey},
    },
    proofs::{
        challenger::RandomOracleChallenger,
        session::{CCPoSSession, PoSSession, SigmaSession},
        sigma::DecryptionHom,
        ProofParams,
    },
    Error, Result,
};
use curve25519_dalek::{
    constants::RISTRETTO_BASEPOINT_POINT, ristretto::RistrettoPoint, traits::Identity,
};
use sha2::Sha256;
use std::path::Path;
use tracing::{error, info, warn};

use super::{config_tree, decryption_instance, indexed_path, FULL_PUBLIC_KEY, PLAINTEXTS};

/// A read-only board view of an artifact directory
///
/// Session labels map onto the file names the exporting run wrote, so the
/// exact session code that ran online replays offline.
struct FileBoard<'a> {
    dir: &'a Path,
}

impl BulletinBoard for FileBoard<'_> {
    fn publish(&mut self, _label: &str, _tree: &ByteTree) -> Result<()> {
        Ok(())
    }

    fn wait_for(&mut self, party: usize, label: &str) -> Result<ByteTree> {
        let msg = label.rsplit(':').next().unwrap_or(label);
        let stem = match msg {
            "PoSCommitment" | "PoSReply" | "CCPoSCommitment" | "CCPoSReply" => msg,
            "SigmaCommitment" => "DecrFactCommitment",
            "SigmaReply" => "DecrFactReply",
            _ => {
                return Err(Error::Absent {
                    party,
                    label: label.to_string(),
                })
            }
        };
        ByteTree::read_from_path(indexed_path(self.dir, stem, party)).map_err(|_| Error::Absent {
            party,
            label: label.to_string(),
        })
    }
}

fn read_points(dir: &Path, stem: &str, party: usize, n: usize) -> Result<Vec<RistrettoPoint>> {
    let tree = ByteTree::read_from_path(indexed_path(dir, stem, party))?;
    crypto::points_from_tree(&mut tree.reader(), n)
}

fn read_ciphertexts(dir: &Path, party: usize, n: usize) -> Result<Vec<Ciphertext>> {
    let tree = ByteTree::read_from_path(indexed_path(dir, "CiphertextList", party))?;
    crypto::elgamal::ciphertexts_from_tree(&mut tree.reader(), n)
}

/// Verifies a complete exported mix-net run
pub fn verify_run(dir: &Path, parties: usize, params: ProofParams) -> Result<()> {
    assert!(parties > 0);
    let g = RISTRETTO_BASEPOINT_POINT;
    info!(dir = %dir.display(), parties, "verifying mix-net run");

    // Keys: the published shares must multiply to the joint key.
    let pk_tree = ByteTree::read_from_path(dir.join(FULL_PUBLIC_KEY))?;
    let pk = PublicKey::from_tree(&mut pk_tree.reader())?;
    let mut shares = Vec::new();
    for l in 1..=parties {
        let tree = ByteTree::read_from_path(indexed_path(dir, "PublicKey", l))?;
        shares.push(PublicKey::from_tree(&mut tree.reader())?);
    }
    if shares.iter().map(|s| s.0).sum::<RistrettoPoint>() != pk.0 {
        error!("public key shares do not combine to the joint key");
        return Err(Error::Mismatch("joint public key"));
    }
    info!("joint public key verified");

    // Ciphertext lists; the input list fixes the batch size.
    let input_tree = ByteTree::read_from_path(indexed_path(dir, "CiphertextList", 0))?;
    let n = input_tree.reader().remaining();
    if n == 0 {
        return Err(Error::Format("empty ciphertext list"));
    }
    let mut lists =
        vec![crypto::elgamal::ciphertexts_from_tree(&mut input_tree.reader(), n)?];
    for l in 1..=parties {
        lists.push(read_ciphertexts(dir, l, n)?);
    }

    let h = commit::derive_generators(n, &pk.to_tree().to_bytes());
    let mut challenger = RandomOracleChallenger::<Sha256>::from_config(&config_tree(parties, &pk));
    let mut board = FileBoard { dir };

    // Shuffle proofs per party.
    for l in 1..=parties {
        let u = match read_points(dir, "PermutationCommitment", l, n) {
            Ok(u) => u,
            Err(_) => {
                warn!(party = l, "permutation commitment unusable, substituting trivial");
                commit::trivial(&h)
            }
        };

        let pos = PoSSession {
            sid: format!("PoS{}", l),
            params,
            export: None,
        };
        if !pos.verify(&mut board, &mut challenger, l, &g, &h, &u)? {
            error!(party = l, "proof of shuffle rejected");
            return Err(Error::Mismatch("proof of shuffle"));
        }

        let ccpos = CCPoSSession {
            sid: format!("CCPoS{}", l),
            params,
            export: None,
        };
        if !ccpos.verify(
            &mut board,
            &mut challenger,
            l,
            &g,
            &h,
            &u,
            &pk,
            &lists[l - 1],
            &lists[l],
        )? {
            error!(party = l, "commitment-consistent proof rejected");
            return Err(Error::Mismatch("commitment-consistent proof"));
        }

        let keep = ByteTree::read_from_path(indexed_path(dir, "KeepList", l))?;
        let kept = keep.reader().read_bytes()?.to_vec();
        if kept.len() != n || kept.iter().any(|&b| b == 0) {
            error!(party = l, "keep list drops ciphertexts");
            return Err(Error::Mismatch("keep list"));
        }
        info!(party = l, "shuffle proofs verified");
    }

    // Decryption factors and their proofs.
    let last = &lists[parties];
    let bases: Vec<RistrettoPoint> = last.iter().map(|c| c.0).collect();
    let mut factor_sum = vec![<RistrettoPoint as Identity>::identity(); n];
    for l in 1..=parties {
        let factors = read_points(dir, "DecryptionFactors", l, n)?;
        let common: Vec<Ciphertext> = factors
            .iter()
            .map(|f| Ciphertext(shares[l - 1].0, *f))
            .collect();
        let session = SigmaSession {
            sid: format!("Decrypt{}", l),
            params,
            export: None,
            artifact: "DecrFact".into(),
        };
        let hom = DecryptionHom {
            g,
            bases: bases.clone(),
        };
        if !session.verify(
            &mut board,
            &mut challenger,
            l,
            hom,
            &decryption_instance(&bases, &common),
            common,
        )? {
            error!(party = l, "decryption factor proof rejected");
            return Err(Error::Mismatch("decryption factors"));
        }
        for (acc, f) in factor_sum.iter_mut().zip(factors.iter()) {
            *acc += f;
        }
        info!(party = l, "decryption factors verified");
    }

    // The published plaintexts must be the recombination of the last list.
    let expected: Vec<RistrettoPoint> = last
        .iter()
        .zip(factor_sum.iter())
        .map(|(c, f)| c.1 - f)
        .collect();
    let ptree = ByteTree::read_from_path(dir.join(PLAINTEXTS))?;
    if crypto::points_from_tree(&mut ptree.reader(), n)? != expected {
        error!("published plaintexts do not match the recombination");
        return Err(Error::Mismatch("plaintext elements"));
    }
    info!("mix-net run verified");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::verify_run;
    use crate::{
        bytetree::ByteTree,
        crypto,
        mix::{execute_run, indexed_path},
        proofs::ProofParams,
    };
    use curve25519_dalek::{constants::RISTRETTO_BASEPOINT_POINT, ristretto::RistrettoPoint};
    use rand::thread_rng;
    use std::{env, fs};

    const N: usize = 8;
    const K: usize = 3;

    fn params() -> ProofParams {
        ProofParams::new(100, 100, 50)
    }

    fn exported_run(name: &str) -> std::path::PathBuf {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let mut rng = thread_rng();
        let dir = env::temp_dir().join(format!("mixkit-verify-{}-{}", name, std::process::id()));
        let messages: Vec<RistrettoPoint> =
            (0..N).map(|_| RistrettoPoint::random(&mut rng)).collect();
        execute_run(&dir, K, params(), &messages, &mut rng).unwrap();
        dir
    }

    #[test]
    fn honest_runs_verify() {
        let dir = exported_run("honest");
        verify_run(&dir, K, params()).unwrap();
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn tampered_ciphertext_lists_are_rejected() {
        let dir = exported_run("tampered");
        let path = indexed_path(&dir, "CiphertextList", 2);
        let tree = ByteTree::read_from_path(&path).unwrap();
        let mut cs = crypto::elgamal::ciphertexts_from_tree(&mut tree.reader(), N).unwrap();
        cs[0].1 += RISTRETTO_BASEPOINT_POINT;
        crypto::elgamal::ciphertexts_to_tree(&cs)
            .write_to_path(&path)
            .unwrap();

        assert!(verify_run(&dir, K, params()).is_err());
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn missing_proof_files_are_rejected() {
        let dir = exported_run("missing");
        fs::remove_file(indexed_path(&dir, "PoSReply", 1)).unwrap();
        assert!(verify_run(&dir, K, params()).is_err());
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn corrupt_permutation_commitments_degrade_and_reject() {
        let dir = exported_run("badcommitment");
        ByteTree::leaf(vec![0xde, 0xad])
            .write_to_path(indexed_path(&dir, "PermutationCommitment", 1))
            .unwrap();
        assert!(verify_run(&dir, K, params()).is_err());
        fs::remove_dir_all(dir).unwrap();
    }
}
