//! External data formats
//!
//! A mix-net is only useful to systems that do not speak its native byte
//! trees. An interface translates the three outward-facing data kinds,
//! public keys, ciphertext lists, and plaintext lists, between the internal
//! representation and an external format. The JSON interface follows the
//! Helios conventions of one object per ciphertext with hex-encoded
//! components; the comma-separated interface suits tabulation systems that
//! ingest plain numeric text.

use crate::{
    bytetree::ByteTree,
    crypto::{
        self,
        elgamal::{Ciphertext, PublicKey},
    },
    Error, Result,
};
use curve25519_dalek::{ristretto::CompressedRistretto, ristretto::RistrettoPoint};
use serde_derive::{Deserialize, Serialize};

/// Translation between internal values and an external byte format
pub trait MixnetInterface {
    /// Encodes a public key
    fn export_public_key(&self, pk: &PublicKey) -> Result<Vec<u8>>;
    /// Decodes a public key
    fn import_public_key(&self, bytes: &[u8]) -> Result<PublicKey>;
    /// Encodes a ciphertext list
    fn export_ciphertexts(&self, cs: &[Ciphertext]) -> Result<Vec<u8>>;
    /// Decodes a ciphertext list
    fn import_ciphertexts(&self, bytes: &[u8]) -> Result<Vec<Ciphertext>>;
    /// Encodes a plaintext list
    fn export_plaintexts(&self, ms: &[RistrettoPoint]) -> Result<Vec<u8>>;
    /// Decodes a plaintext list
    fn import_plaintexts(&self, bytes: &[u8]) -> Result<Vec<RistrettoPoint>>;
}

fn point_to_hex(p: &RistrettoPoint) -> String {
    hex::encode(p.compress().to_bytes())
}

fn point_from_hex(s: &str) -> Result<RistrettoPoint> {
    let bytes = hex::decode(s.trim()).map_err(|_| Error::Format("invalid hex"))?;
    if bytes.len() != 32 {
        return Err(Error::Format("group element is not 32 bytes"));
    }
    CompressedRistretto::from_slice(&bytes)
        .decompress()
        .ok_or(Error::Format("invalid group element encoding"))
}

/// The native format: raw byte tree bytes
pub struct RawInterface;

impl MixnetInterface for RawInterface {
    fn export_public_key(&self, pk: &PublicKey) -> Result<Vec<u8>> {
        Ok(pk.to_tree().to_bytes())
    }
    fn import_public_key(&self, bytes: &[u8]) -> Result<PublicKey> {
        PublicKey::from_tree(&mut ByteTree::parse(bytes)?.reader())
    }
    fn export_ciphertexts(&self, cs: &[Ciphertext]) -> Result<Vec<u8>> {
        Ok(crypto::elgamal::ciphertexts_to_tree(cs).to_bytes())
    }
    fn import_ciphertexts(&self, bytes: &[u8]) -> Result<Vec<Ciphertext>> {
        let tree = ByteTree::parse(bytes)?;
        let n = tree.reader().remaining();
        crypto::elgamal::ciphertexts_from_tree(&mut tree.reader(), n)
    }
    fn export_plaintexts(&self, ms: &[RistrettoPoint]) -> Result<Vec<u8>> {
        Ok(crypto::points_to_tree(ms).to_bytes())
    }
    fn import_plaintexts(&self, bytes: &[u8]) -> Result<Vec<RistrettoPoint>> {
        let tree = ByteTree::parse(bytes)?;
        let n = tree.reader().remaining();
        crypto::points_from_tree(&mut tree.reader(), n)
    }
}

/// Hex-armored byte trees, one value per file
pub struct NativeHexInterface;

impl MixnetInterface for NativeHexInterface {
    fn export_public_key(&self, pk: &PublicKey) -> Result<Vec<u8>> {
        Ok(hex::encode(RawInterface.export_public_key(pk)?).into_bytes())
    }
    fn import_public_key(&self, bytes: &[u8]) -> Result<PublicKey> {
        RawInterface.import_public_key(&unhex(bytes)?)
    }
    fn export_ciphertexts(&self, cs: &[Ciphertext]) -> Result<Vec<u8>> {
        Ok(hex::encode(RawInterface.export_ciphertexts(cs)?).into_bytes())
    }
    fn import_ciphertexts(&self, bytes: &[u8]) -> Result<Vec<Ciphertext>> {
        RawInterface.import_ciphertexts(&unhex(bytes)?)
    }
    fn export_plaintexts(&self, ms: &[RistrettoPoint]) -> Result<Vec<u8>> {
        Ok(hex::encode(RawInterface.export_plaintexts(ms)?).into_bytes())
    }
    fn import_plaintexts(&self, bytes: &[u8]) -> Result<Vec<RistrettoPoint>> {
        RawInterface.import_plaintexts(&unhex(bytes)?)
    }
}

fn unhex(bytes: &[u8]) -> Result<Vec<u8>> {
    let s = std::str::from_utf8(bytes).map_err(|_| Error::Format("not utf-8"))?;
    hex::decode(s.trim()).map_err(|_| Error::Format("invalid hex"))
}

/// Line-oriented hex: one hex string per value, components concatenated
pub struct HexInterface;

impl MixnetInterface for HexInterface {
    fn export_public_key(&self, pk: &PublicKey) -> Result<Vec<u8>> {
        Ok(point_to_hex(&pk.0).into_bytes())
    }
    fn import_public_key(&self, bytes: &[u8]) -> Result<PublicKey> {
        let s = std::str::from_utf8(bytes).map_err(|_| Error::Format("not utf-8"))?;
        Ok(PublicKey(point_from_hex(s)?))
    }
    fn export_ciphertexts(&self, cs: &[Ciphertext]) -> Result<Vec<u8>> {
        let lines: Vec<String> = cs
            .iter()
            .map(|c| format!("{}{}", point_to_hex(&c.0), point_to_hex(&c.1)))
            .collect();
        Ok(lines.join("\n").into_bytes())
    }
    fn import_ciphertexts(&self, bytes: &[u8]) -> Result<Vec<Ciphertext>> {
        let s = std::str::from_utf8(bytes).map_err(|_| Error::Format("not utf-8"))?;
        s.lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| {
                let l = l.trim();
                if l.len() != 128 {
                    return Err(Error::Format("ciphertext line is not 128 hex digits"));
                }
                Ok(Ciphertext(point_from_hex(&l[..64])?, point_from_hex(&l[64..])?))
            })
            .collect()
    }
    fn export_plaintexts(&self, ms: &[RistrettoPoint]) -> Result<Vec<u8>> {
        let lines: Vec<String> = ms.iter().map(point_to_hex).collect();
        Ok(lines.join("\n").into_bytes())
    }
    fn import_plaintexts(&self, bytes: &[u8]) -> Result<Vec<RistrettoPoint>> {
        let s = std::str::from_utf8(bytes).map_err(|_| Error::Format("not utf-8"))?;
        s.lines()
            .filter(|l| !l.trim().is_empty())
            .map(point_from_hex)
            .collect()
    }
}

/// Comma-separated numeric: one line per value, each a list of decimal
/// byte values, ciphertext components concatenated
pub struct CsvInterface;

fn point_to_csv(p: &RistrettoPoint) -> String {
    let bytes = p.compress().to_bytes();
    let values: Vec<String> = bytes.iter().map(u8::to_string).collect();
    values.join(",")
}

fn bytes_from_csv(s: &str) -> Result<Vec<u8>> {
    s.split(',')
        .map(|v| {
            v.trim()
                .parse::<u8>()
                .map_err(|_| Error::Format("invalid decimal value"))
        })
        .collect()
}

fn point_from_csv_bytes(bytes: &[u8]) -> Result<RistrettoPoint> {
    if bytes.len() != 32 {
        return Err(Error::Format("group element is not 32 bytes"));
    }
    CompressedRistretto::from_slice(bytes)
        .decompress()
        .ok_or(Error::Format("invalid group element encoding"))
}

impl MixnetInterface for CsvInterface {
    fn export_public_key(&self, pk: &PublicKey) -> Result<Vec<u8>> {
        Ok(point_to_csv(&pk.0).into_bytes())
    }
    fn import_public_key(&self, bytes: &[u8]) -> Result<PublicKey> {
        let s = std::str::from_utf8(bytes).map_err(|_| Error::Format("not utf-8"))?;
        Ok(PublicKey(point_from_csv_bytes(&bytes_from_csv(s.trim())?)?))
    }
    fn export_ciphertexts(&self, cs: &[Ciphertext]) -> Result<Vec<u8>> {
        let lines: Vec<String> = cs
            .iter()
            .map(|c| format!("{},{}", point_to_csv(&c.0), point_to_csv(&c.1)))
            .collect();
        Ok(lines.join("\n").into_bytes())
    }
    fn import_ciphertexts(&self, bytes: &[u8]) -> Result<Vec<Ciphertext>> {
        let s = std::str::from_utf8(bytes).map_err(|_| Error::Format("not utf-8"))?;
        s.lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| {
                let values = bytes_from_csv(l)?;
                if values.len() != 64 {
                    return Err(Error::Format("ciphertext line is not 64 values"));
                }
                Ok(Ciphertext(
                    point_from_csv_bytes(&values[..32])?,
                    point_from_csv_bytes(&values[32..])?,
                ))
            })
            .collect()
    }
    fn export_plaintexts(&self, ms: &[RistrettoPoint]) -> Result<Vec<u8>> {
        let lines: Vec<String> = ms.iter().map(point_to_csv).collect();
        Ok(lines.join("\n").into_bytes())
    }
    fn import_plaintexts(&self, bytes: &[u8]) -> Result<Vec<RistrettoPoint>> {
        let s = std::str::from_utf8(bytes).map_err(|_| Error::Format("not utf-8"))?;
        s.lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| point_from_csv_bytes(&bytes_from_csv(l)?))
            .collect()
    }
}

#[derive(Serialize, Deserialize)]
struct JsonKey {
    y: String,
}

#[derive(Serialize, Deserialize)]
struct JsonCiphertext {
    alpha: String,
    beta: String,
}

/// Helios-style JSON
pub struct JsonInterface;

impl MixnetInterface for JsonInterface {
    fn export_public_key(&self, pk: &PublicKey) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&JsonKey {
            y: point_to_hex(&pk.0),
        })?)
    }
    fn import_public_key(&self, bytes: &[u8]) -> Result<PublicKey> {
        let key: JsonKey = serde_json::from_slice(bytes)?;
        Ok(PublicKey(point_from_hex(&key.y)?))
    }
    fn export_ciphertexts(&self, cs: &[Ciphertext]) -> Result<Vec<u8>> {
        let out: Vec<JsonCiphertext> = cs
            .iter()
            .map(|c| JsonCiphertext {
                alpha: point_to_hex(&c.0),
                beta: point_to_hex(&c.1),
            })
            .collect();
        Ok(serde_json::to_vec(&out)?)
    }
    fn import_ciphertexts(&self, bytes: &[u8]) -> Result<Vec<Ciphertext>> {
        let parsed: Vec<JsonCiphertext> = serde_json::from_slice(bytes)?;
        parsed
            .iter()
            .map(|c| Ok(Ciphertext(point_from_hex(&c.alpha)?, point_from_hex(&c.beta)?)))
            .collect()
    }
    fn export_plaintexts(&self, ms: &[RistrettoPoint]) -> Result<Vec<u8>> {
        let out: Vec<String> = ms.iter().map(point_to_hex).collect();
        Ok(serde_json::to_vec(&out)?)
    }
    fn import_plaintexts(&self, bytes: &[u8]) -> Result<Vec<RistrettoPoint>> {
        let parsed: Vec<String> = serde_json::from_slice(bytes)?;
        parsed.iter().map(|s| point_from_hex(s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CsvInterface, HexInterface, JsonInterface, MixnetInterface, NativeHexInterface,
        RawInterface,
    };
    use crate::crypto::elgamal::{keygen, Ciphertext};
    use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar};
    use rand::thread_rng;

    fn sample() -> (crate::crypto::elgamal::PublicKey, Vec<Ciphertext>, Vec<RistrettoPoint>) {
        let mut rng = thread_rng();
        let (pk, _) = keygen(&mut rng);
        let ms: Vec<RistrettoPoint> = (0..4).map(|_| RistrettoPoint::random(&mut rng)).collect();
        let cs: Vec<Ciphertext> = ms
            .iter()
            .map(|m| pk.encrypt(m, &Scalar::random(&mut rng)))
            .collect();
        (pk, cs, ms)
    }

    fn round_trip(iface: &dyn MixnetInterface) {
        let (pk, cs, ms) = sample();
        let pk2 = iface
            .import_public_key(&iface.export_public_key(&pk).unwrap())
            .unwrap();
        assert_eq!(pk, pk2);
        let cs2 = iface
            .import_ciphertexts(&iface.export_ciphertexts(&cs).unwrap())
            .unwrap();
        assert_eq!(cs, cs2);
        let ms2 = iface
            .import_plaintexts(&iface.export_plaintexts(&ms).unwrap())
            .unwrap();
        assert_eq!(ms, ms2);
    }

    #[test]
    fn raw_round_trips() {
        round_trip(&RawInterface);
    }

    #[test]
    fn native_hex_round_trips() {
        round_trip(&NativeHexInterface);
    }

    #[test]
    fn hex_round_trips() {
        round_trip(&HexInterface);
    }

    #[test]
    fn json_round_trips() {
        round_trip(&JsonInterface);
    }

    #[test]
    fn csv_round_trips() {
        round_trip(&CsvInterface);
    }

    #[test]
    fn csv_lines_are_decimal_values() {
        let (_, cs, _) = sample();
        let bytes = CsvInterface.export_ciphertexts(&cs).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        for line in text.lines() {
            assert_eq!(line.split(',').count(), 64);
        }
    }

    #[test]
    fn json_is_helios_shaped() {
        let (_, cs, _) = sample();
        let bytes = JsonInterface.export_ciphertexts(&cs).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\"alpha\""));
        assert!(text.contains("\"beta\""));
    }

    #[test]
    fn malformed_inputs_are_format_errors() {
        assert!(HexInterface.import_public_key(b"zz").is_err());
        assert!(HexInterface.import_ciphertexts(b"abcd").is_err());
        assert!(JsonInterface.import_public_key(b"{").is_err());
        assert!(RawInterface.import_ciphertexts(&[1, 2, 3]).is_err());
        assert!(CsvInterface.import_public_key(b"1,2,3").is_err());
        assert!(CsvInterface.import_ciphertexts(b"300,1").is_err());
    }
}
