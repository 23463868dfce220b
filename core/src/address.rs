//! Factom address key pairs and their human-readable encodings.
//!
//! Both address kinds wrap an ed25519 key. They differ in the public payload:
//! a Factoid address commits to the hash of its RCD (`0x01 || public_key`),
//! an Entry Credit address exposes the public key itself.
//!
//! Every string form is base58check: `base58(prefix || payload || checksum)`
//! where the checksum is the first 4 bytes of `sha256d(prefix || payload)`.

use crate::error::{Error, Result};
use crate::storage::{EC_ADDRESSES_BUCKET, FCT_ADDRESSES_BUCKET};
use anyhow::{Context, bail, ensure};
use ed25519_dalek::SigningKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

/// Length of an address private key.
pub const SECRET_KEY_LEN: usize = 32;

const FCT_PUBLIC_PREFIX: [u8; 2] = [0x5f, 0xb1];
const FCT_SECRET_PREFIX: [u8; 2] = [0x64, 0x78];
const EC_PUBLIC_PREFIX: [u8; 2] = [0x59, 0x2a];
const EC_SECRET_PREFIX: [u8; 2] = [0x5d, 0xb6];

const RCD_TYPE_1: u8 = 0x01;
const CHECKSUM_LEN: usize = 4;

/// Serde module for serializing `[u8; 32]` as hex strings.
mod hex_bytes32 {
    use super::*;

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 32 bytes"))
    }
}

/// The two disjoint address kinds a wallet holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressKind {
    /// Factoid address, holds the native value unit.
    Factoid,
    /// Entry Credit address, holds purchased entry credits.
    EntryCredit,
}

impl AddressKind {
    /// Storage bucket of the address index for this kind.
    pub fn bucket(self) -> &'static str {
        match self {
            AddressKind::Factoid => FCT_ADDRESSES_BUCKET,
            AddressKind::EntryCredit => EC_ADDRESSES_BUCKET,
        }
    }
}

impl std::fmt::Display for AddressKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddressKind::Factoid => write!(f, "factoid"),
            AddressKind::EntryCredit => write!(f, "entry-credit"),
        }
    }
}

/// Common interface of the wallet's address kinds.
pub trait WalletAddress: Sized {
    /// Which index bucket this address type lives in.
    const KIND: AddressKind;

    /// Build the key pair from raw private key bytes.
    ///
    /// Fails with [`Error::KeyDerivation`] unless exactly 32 bytes are given.
    fn from_secret_bytes(bytes: &[u8]) -> Result<Self>;

    /// Parse the human-readable private key string.
    fn from_secret_string(s: &str) -> Result<Self>;

    /// Raw private key bytes.
    fn secret_bytes(&self) -> [u8; SECRET_KEY_LEN];

    /// Raw ed25519 public key.
    fn public_key(&self) -> [u8; 32];

    /// Human-readable public address, the key of the address index.
    fn public_string(&self) -> String;

    /// Human-readable private key.
    fn secret_string(&self) -> String;
}

/// Factoid (spending) address.
#[derive(Clone)]
pub struct FactoidAddress {
    key: SigningKey,
}

impl FactoidAddress {
    /// The type-1 RCD: `0x01 || public_key`.
    pub fn rcd(&self) -> [u8; 33] {
        let mut rcd = [0u8; 33];
        rcd[0] = RCD_TYPE_1;
        rcd[1..].copy_from_slice(&self.public_key());
        rcd
    }

    /// `sha256d` of the RCD; this is what the public address encodes.
    pub fn rcd_hash(&self) -> [u8; 32] {
        sha256d(&self.rcd())
    }
}

impl WalletAddress for FactoidAddress {
    const KIND: AddressKind = AddressKind::Factoid;

    fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            key: signing_key(bytes)?,
        })
    }

    fn from_secret_string(s: &str) -> Result<Self> {
        let secret = decode_base58check(s, &FCT_SECRET_PREFIX, SECRET_KEY_LEN)
            .map_err(|e| Error::InvalidAddress(format!("{:#}", e)))?;
        Self::from_secret_bytes(&secret)
    }

    fn secret_bytes(&self) -> [u8; SECRET_KEY_LEN] {
        self.key.to_bytes()
    }

    fn public_key(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }

    fn public_string(&self) -> String {
        encode_base58check(&FCT_PUBLIC_PREFIX, &self.rcd_hash())
    }

    fn secret_string(&self) -> String {
        encode_base58check(&FCT_SECRET_PREFIX, &self.secret_bytes())
    }
}

/// Entry Credit (credit) address.
#[derive(Clone)]
pub struct EcAddress {
    key: SigningKey,
}

impl WalletAddress for EcAddress {
    const KIND: AddressKind = AddressKind::EntryCredit;

    fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            key: signing_key(bytes)?,
        })
    }

    fn from_secret_string(s: &str) -> Result<Self> {
        let secret = decode_base58check(s, &EC_SECRET_PREFIX, SECRET_KEY_LEN)
            .map_err(|e| Error::InvalidAddress(format!("{:#}", e)))?;
        Self::from_secret_bytes(&secret)
    }

    fn secret_bytes(&self) -> [u8; SECRET_KEY_LEN] {
        self.key.to_bytes()
    }

    fn public_key(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }

    fn public_string(&self) -> String {
        encode_base58check(&EC_PUBLIC_PREFIX, &self.public_key())
    }

    fn secret_string(&self) -> String {
        encode_base58check(&EC_SECRET_PREFIX, &self.secret_bytes())
    }
}

// Secrets stay out of debug output.
impl std::fmt::Debug for FactoidAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FactoidAddress")
            .field(&self.public_string())
            .finish()
    }
}

impl std::fmt::Debug for EcAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("EcAddress").field(&self.public_string()).finish()
    }
}

impl PartialEq for FactoidAddress {
    fn eq(&self, other: &Self) -> bool {
        self.public_key() == other.public_key()
    }
}

impl Eq for FactoidAddress {}

impl PartialEq for EcAddress {
    fn eq(&self, other: &Self) -> bool {
        self.public_key() == other.public_key()
    }
}

impl Eq for EcAddress {}

/// Value stored in the address index under the public address string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAddress {
    #[serde(with = "hex_bytes32")]
    pub secret: [u8; SECRET_KEY_LEN],
    pub public: String,
}

impl StoredAddress {
    pub fn from_address<A: WalletAddress>(address: &A) -> Self {
        Self {
            secret: address.secret_bytes(),
            public: address.public_string(),
        }
    }

    /// Rebuild the key pair, checking it still matches the cached public string.
    pub fn to_address<A: WalletAddress>(&self) -> Result<A> {
        let address = A::from_secret_bytes(&self.secret)?;
        if address.public_string() != self.public {
            return Err(Error::InvalidAddress(format!(
                "stored key does not match {} address {}",
                A::KIND,
                self.public
            )));
        }
        Ok(address)
    }
}

fn signing_key(bytes: &[u8]) -> Result<SigningKey> {
    let secret: [u8; SECRET_KEY_LEN] = bytes.try_into().map_err(|_| {
        Error::KeyDerivation(format!(
            "expected {} bytes of key material, got {}",
            SECRET_KEY_LEN,
            bytes.len()
        ))
    })?;
    Ok(SigningKey::from_bytes(&secret))
}

/// Double SHA-256.
pub(crate) fn sha256d(data: &[u8]) -> [u8; 32] {
    Sha256::digest(Sha256::digest(data)).into()
}

pub(crate) fn encode_base58check(prefix: &[u8], payload: &[u8]) -> String {
    let mut buf = Vec::with_capacity(prefix.len() + payload.len() + CHECKSUM_LEN);
    buf.extend_from_slice(prefix);
    buf.extend_from_slice(payload);
    let checksum = sha256d(&buf);
    buf.extend_from_slice(&checksum[..CHECKSUM_LEN]);
    bs58::encode(buf).into_string()
}

/// Decode a base58check string and return its payload.
pub(crate) fn decode_base58check(
    s: &str,
    prefix: &[u8],
    payload_len: usize,
) -> anyhow::Result<Vec<u8>> {
    let raw = bs58::decode(s.trim())
        .into_vec()
        .context("not valid base58")?;

    let expected = prefix.len() + payload_len + CHECKSUM_LEN;
    ensure!(
        raw.len() == expected,
        "expected {} decoded bytes, got {}",
        expected,
        raw.len()
    );

    let (body, checksum) = raw.split_at(prefix.len() + payload_len);
    if !body.starts_with(prefix) {
        bail!("wrong prefix {}", hex::encode(&body[..prefix.len()]));
    }
    ensure!(
        sha256d(body)[..CHECKSUM_LEN] == *checksum,
        "checksum mismatch"
    );

    Ok(body[prefix.len()..].to_vec())
}
