//! Re-encryption mix-net
//!
//! Ties the proof machinery into a complete mixing pipeline: joint key
//! setup, per-party re-encryption shuffles with permutation commitments and
//! both shuffle proofs, joint decryption with proven decryption factors,
//! and a flat directory of byte-tree artifacts that [`verifier`] replays
//! offline without any cooperation from the mix servers.

pub mod interface;
pub mod shuffle;
pub mod verifier;

use crate::{
    board::LocalBoard,
    bytetree::ByteTree,
    crypto::{
        self, commit,
        elgamal::{keygen, Ciphertext, PublicKey, SecretKey},
        perm::Shuffles,
    },
    proofs::{
        challenger::RandomOracleChallenger,
        session::{CCPoSSession, PoSSession, SigmaSession},
        sigma::DecryptionHom,
        ProofParams,
    },
    Result,
};
use curve25519_dalek::{
    constants::RISTRETTO_BASEPOINT_POINT, ristretto::RistrettoPoint, scalar::Scalar,
};
use rand::{CryptoRng, Rng};
use sha2::Sha256;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

pub(crate) const FULL_PUBLIC_KEY: &str = "FullPublicKey.bt";
pub(crate) const PLAINTEXTS: &str = "PlaintextElements.bt";

pub(crate) fn indexed_path(dir: &Path, stem: &str, party: usize) -> PathBuf {
    dir.join(format!("{}{:02}.bt", stem, party))
}

/// Builds the public configuration tree that seeds the random oracles
///
/// Everything a proof transcript implicitly depends on but never re-sends
/// goes in here: the party count and the joint public key.
pub(crate) fn config_tree(parties: usize, pk: &PublicKey) -> ByteTree {
    ByteTree::node(vec![ByteTree::from_u32(parties as u32), pk.to_tree()])
}

/// Instance tree for a decryption-factor proof
pub(crate) fn decryption_instance(bases: &[RistrettoPoint], common: &[Ciphertext]) -> ByteTree {
    ByteTree::node(vec![
        crypto::points_to_tree(bases),
        crypto::elgamal::ciphertexts_to_tree(common),
    ])
}

/// Executes a complete mix-net run in one process and exports every
/// artifact the standalone verifier needs
///
/// All parties are simulated locally: keys are generated, the messages are
/// encrypted under the joint key, each party shuffles with a proof of a
/// shuffle and a commitment-consistent proof, and the final list is jointly
/// decrypted with proven decryption factors. The artifact layout is exactly
/// what [`verifier::verify_run`] consumes.
pub fn execute_run<R: Rng + CryptoRng>(
    dir: &Path,
    parties: usize,
    params: ProofParams,
    messages: &[RistrettoPoint],
    rng: &mut R,
) -> Result<()> {
    assert!(parties > 0);
    assert!(!messages.is_empty());
    let g = RISTRETTO_BASEPOINT_POINT;
    let n = messages.len();
    fs::create_dir_all(dir)?;

    // Joint key setup.
    let mut secrets: Vec<SecretKey> = Vec::new();
    let mut shares: Vec<PublicKey> = Vec::new();
    for l in 1..=parties {
        let (pk, sk) = keygen(rng);
        pk.to_tree()
            .write_to_path(indexed_path(dir, "PublicKey", l))?;
        shares.push(pk);
        secrets.push(sk);
    }
    let pk = PublicKey(shares.iter().map(|s| s.0).sum());
    pk.to_tree().write_to_path(dir.join(FULL_PUBLIC_KEY))?;
    info!(parties, n, "mix-net run started");

    // Input list.
    let input: Vec<Ciphertext> = messages
        .iter()
        .map(|m| pk.encrypt(m, &Scalar::random(rng)))
        .collect();
    crypto::elgamal::ciphertexts_to_tree(&input)
        .write_to_path(indexed_path(dir, "CiphertextList", 0))?;

    let h = commit::derive_generators(n, &pk.to_tree().to_bytes());
    let mut challenger = RandomOracleChallenger::<Sha256>::from_config(&config_tree(parties, &pk));
    let mut board = LocalBoard::new(0);

    // Shuffling: commitments, output lists, and both proofs per party.
    let mut lists = vec![input];
    for l in 1..=parties {
        let pi = rng.sample(&Shuffles(n));
        let (u, r) = commit::commit(&h, &pi, rng);
        crypto::points_to_tree(&u)
            .write_to_path(indexed_path(dir, "PermutationCommitment", l))?;
        let (wp, s) = shuffle::shuffle_with(&pk, &lists[l - 1], &pi, rng);
        crypto::elgamal::ciphertexts_to_tree(&wp)
            .write_to_path(indexed_path(dir, "CiphertextList", l))?;

        board.act_as(l);
        let pos = PoSSession {
            sid: format!("PoS{}", l),
            params,
            export: Some(dir.to_path_buf()),
        };
        pos.prove(&mut board, &mut challenger, l, &g, &h, &u, &r, &pi, rng)?;
        let ccpos = CCPoSSession {
            sid: format!("CCPoS{}", l),
            params,
            export: Some(dir.to_path_buf()),
        };
        ccpos.prove(
            &mut board,
            &mut challenger,
            l,
            &g,
            &h,
            &u,
            &pk,
            &lists[l - 1],
            &wp,
            &r,
            &pi,
            &s,
            rng,
        )?;
        // No ciphertexts are filtered out in this pipeline.
        ByteTree::leaf(vec![1u8; n]).write_to_path(indexed_path(dir, "KeepList", l))?;
        info!(party = l, "shuffle and proofs exported");
        lists.push(wp);
    }

    // Joint decryption with proven factors.
    let last = &lists[parties];
    let bases: Vec<RistrettoPoint> = last.iter().map(|c| c.0).collect();
    let mut factor_sum = vec![<RistrettoPoint as curve25519_dalek::traits::Identity>::identity(); n];
    for l in 1..=parties {
        let sk = &secrets[l - 1];
        let factors: Vec<RistrettoPoint> =
            bases.iter().map(|b| sk.decryption_factor(b)).collect();
        crypto::points_to_tree(&factors)
            .write_to_path(indexed_path(dir, "DecryptionFactors", l))?;
        for (acc, f) in factor_sum.iter_mut().zip(factors.iter()) {
            *acc += f;
        }

        let hom = DecryptionHom {
            g,
            bases: bases.clone(),
        };
        let common: Vec<Ciphertext> = factors
            .iter()
            .map(|f| Ciphertext(shares[l - 1].0, *f))
            .collect();
        board.act_as(l);
        let session = SigmaSession {
            sid: format!("Decrypt{}", l),
            params,
            export: Some(dir.to_path_buf()),
            artifact: "DecrFact".into(),
        };
        session.prove(
            &mut board,
            &mut challenger,
            l,
            hom,
            &decryption_instance(&bases, &common),
            sk.0,
            rng,
        )?;
        info!(party = l, "decryption factors exported");
    }

    let plaintexts: Vec<RistrettoPoint> = last
        .iter()
        .zip(factor_sum.iter())
        .map(|(c, f)| c.1 - f)
        .collect();
    crypto::points_to_tree(&plaintexts).write_to_path(dir.join(PLAINTEXTS))?;
    info!("mix-net run complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::execute_run;
    use crate::{crypto, proofs::ProofParams};
    use curve25519_dalek::ristretto::RistrettoPoint;
    use rand::thread_rng;
    use std::{env, fs};

    #[test]
    fn run_outputs_the_input_messages_in_some_order() {
        let mut rng = thread_rng();
        let dir = env::temp_dir().join(format!("mixkit-run-{}", std::process::id()));
        let messages: Vec<RistrettoPoint> =
            (0..10).map(|_| RistrettoPoint::random(&mut rng)).collect();

        execute_run(
            &dir,
            3,
            ProofParams::new(100, 100, 50),
            &messages,
            &mut rng,
        )
        .unwrap();

        let tree = crate::bytetree::ByteTree::read_from_path(dir.join("PlaintextElements.bt"))
            .unwrap();
        let out = crypto::points_from_tree(&mut tree.reader(), 10).unwrap();
        for m in &messages {
            assert!(out.contains(m));
        }
        fs::remove_dir_all(dir).unwrap();
    }
}
