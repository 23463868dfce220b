//! Wallet seed chain.
//!
//! A wallet owns a 64-byte root seed (`current`) and a frontier (`next`).
//! Every derived address consumes one step of the chain: the frontier is
//! replaced by its SHA-512 hash and the first 32 bytes of that hash become
//! the address key. Given the root seed, every derived address can be
//! regenerated by replaying the chain from the start.

use crate::address::{decode_base58check, encode_base58check};
use crate::error::{Error, Result};
use crate::storage::{SEEDS_BUCKET, Storage, WriteBatch};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha512};
use std::str::FromStr;

/// Length of a wallet seed.
pub const SEED_LEN: usize = 64;

const CURRENT_SEED_KEY: &[u8] = b"current";
const NEXT_SEED_KEY: &[u8] = b"next";
const SEED_PREFIX: [u8; 2] = [0x13, 0xdd];
const KEY_MATERIAL_LEN: usize = 32;

/// A 64-byte wallet seed.
#[derive(Clone, PartialEq, Eq)]
pub struct Seed([u8; SEED_LEN]);

impl Seed {
    /// Generate a new seed from the OS random number generator.
    pub fn random() -> Result<Self> {
        let mut bytes = [0u8; SEED_LEN];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| Error::Other(format!("Failed to generate seed: {}", e)))?;
        Ok(Self(bytes))
    }

    /// Build a seed from raw bytes; exactly 64 bytes are required.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; SEED_LEN] = bytes.try_into().map_err(|_| {
            Error::InvalidSeed(format!("expected {} bytes, got {}", SEED_LEN, bytes.len()))
        })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; SEED_LEN] {
        &self.0
    }

    /// The following link of the chain: `sha512(self)`.
    pub fn next(&self) -> Seed {
        let mut bytes = [0u8; SEED_LEN];
        bytes.copy_from_slice(&Sha512::digest(self.0));
        Seed(bytes)
    }

    /// Human-readable seed string, as shown to users for backup.
    pub fn to_seed_string(&self) -> String {
        encode_base58check(&SEED_PREFIX, &self.0)
    }
}

impl FromStr for Seed {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = decode_base58check(s, &SEED_PREFIX, SEED_LEN)
            .map_err(|e| Error::InvalidSeed(format!("{:#}", e)))?;
        Seed::from_bytes(&bytes)
    }
}

impl std::fmt::Debug for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Seed(..)")
    }
}

/// One step of the seed chain.
#[derive(Debug)]
pub struct SeedStep {
    /// Frontier before the step.
    pub previous: Seed,
    /// Frontier after the step.
    pub next: Seed,
}

impl SeedStep {
    /// Private key material for the address derived at this step.
    pub fn key_material(&self) -> &[u8] {
        &self.next.as_bytes()[..KEY_MATERIAL_LEN]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ChainState {
    #[default]
    Uninitialized,
    Initialized,
}

/// Seed chain state machine.
///
/// Storage is passed into every operation rather than held, so the wallet
/// can release its storage handle independently of the chain.
#[derive(Debug, Default)]
pub struct SeedChain {
    state: ChainState,
}

impl SeedChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.state == ChainState::Initialized
    }

    /// Restore the chain from storage, or create a fresh random root seed.
    pub fn init(&mut self, store: &dyn Storage) -> Result<()> {
        if store.get(SEEDS_BUCKET, CURRENT_SEED_KEY)?.is_some() {
            log::debug!("Restoring existing wallet seed");
        } else {
            let seed = Seed::random()?;
            write_root(store, &seed)?;
            log::info!("Generated new wallet seed");
        }
        self.verify(store)
    }

    /// Initialize the chain from a known root seed (wallet recovery).
    ///
    /// Re-importing the seed a store already holds only restores it; any
    /// other seed is rejected so the root is never overwritten.
    pub fn import(&mut self, store: &dyn Storage, seed: &Seed) -> Result<()> {
        match store.get(SEEDS_BUCKET, CURRENT_SEED_KEY)? {
            Some(existing) if existing.as_slice() == seed.as_bytes().as_slice() => {
                log::debug!("Imported seed matches the stored one");
            }
            Some(_) => return Err(Error::AlreadyInitialized),
            None => {
                write_root(store, seed)?;
                log::info!("Imported wallet seed");
            }
        }
        self.verify(store)
    }

    fn verify(&mut self, store: &dyn Storage) -> Result<()> {
        if store.get(SEEDS_BUCKET, NEXT_SEED_KEY)?.is_none() {
            return Err(Error::InitializationIncomplete);
        }
        self.state = ChainState::Initialized;
        Ok(())
    }

    /// Current frontier of the chain.
    pub fn next_seed(&self, store: &dyn Storage) -> Result<Seed> {
        self.ensure_initialized()?;
        let bytes = store
            .get(SEEDS_BUCKET, NEXT_SEED_KEY)?
            .ok_or(Error::InitializationIncomplete)?;
        Seed::from_bytes(&bytes)
    }

    /// Advance the chain by one step and persist the new frontier.
    ///
    /// Key material for the step comes from `next`, not from `previous`.
    pub fn advance_seed(&mut self, store: &dyn Storage) -> Result<SeedStep> {
        let step = self.prepare(store)?;
        self.commit(store, &step, WriteBatch::new())?;
        Ok(step)
    }

    /// Compute the next step without writing anything.
    pub(crate) fn prepare(&self, store: &dyn Storage) -> Result<SeedStep> {
        let previous = self.next_seed(store)?;
        let next = previous.next();
        Ok(SeedStep { previous, next })
    }

    /// Persist `step` together with `batch` in one atomic write.
    pub(crate) fn commit(
        &mut self,
        store: &dyn Storage,
        step: &SeedStep,
        mut batch: WriteBatch,
    ) -> Result<()> {
        self.ensure_initialized()?;
        batch.put(SEEDS_BUCKET, NEXT_SEED_KEY, step.next.as_bytes());
        store.write_batch(batch)?;
        log::debug!("Advanced wallet seed chain");
        Ok(())
    }

    /// Export the root seed as a human-readable string. Never exposes `next`.
    pub fn export_seed(&self, store: &dyn Storage) -> Result<String> {
        self.ensure_initialized()?;
        let bytes = store
            .get(SEEDS_BUCKET, CURRENT_SEED_KEY)?
            .ok_or(Error::NotInitialized)?;
        Ok(Seed::from_bytes(&bytes)?.to_seed_string())
    }

    fn ensure_initialized(&self) -> Result<()> {
        match self.state {
            ChainState::Initialized => Ok(()),
            ChainState::Uninitialized => Err(Error::NotInitialized),
        }
    }
}

/// Write root and initial frontier together.
fn write_root(store: &dyn Storage, seed: &Seed) -> Result<()> {
    let mut batch = WriteBatch::new();
    batch.put(SEEDS_BUCKET, CURRENT_SEED_KEY, seed.as_bytes());
    batch.put(SEEDS_BUCKET, NEXT_SEED_KEY, seed.as_bytes());
    store.write_batch(batch)
}
