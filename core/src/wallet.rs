//! Main wallet struct with dependency-injected storage.
//!
//! This module provides the high-level wallet API: seed chain lifecycle,
//! deterministic address generation, the address index and seed export, on
//! top of any [`Storage`] backend.

use crate::address::{AddressKind, EcAddress, FactoidAddress, StoredAddress, WalletAddress};
use crate::error::{Error, Result};
use crate::seed::{Seed, SeedChain};
use crate::storage::{Backend, Storage, WriteBatch};
use std::sync::{Mutex, MutexGuard, RwLock};

/// Version of this SDK.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Version of the wallet JSON-RPC API this SDK speaks.
pub const API_VERSION: &str = "2.0";

/// Every address held by a wallet, grouped by kind.
///
/// No ordering is guaranteed within either list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressIndex {
    pub fct: Vec<FactoidAddress>,
    pub ec: Vec<EcAddress>,
}

/// Main wallet struct with injected storage.
///
/// Address generation is serialized by the seed chain mutex; listing,
/// lookups and imports only need the storage handle. The lock order is
/// always seed chain first, then storage.
///
/// # Example
///
/// ```rust,ignore
/// use factom_core::{Backend, Wallet};
///
/// let wallet = Wallet::open(&Backend::Memory)?;
/// let address = wallet.generate_fct_address()?;
/// let backup = wallet.export_seed()?;
/// wallet.close()?;
/// ```
pub struct Wallet {
    storage: RwLock<Option<Box<dyn Storage>>>,
    seeds: Mutex<SeedChain>,
}

impl Wallet {
    /// Wrap a storage handle. The seed chain stays uninitialized until
    /// [`Wallet::init`] runs.
    pub fn new(storage: Box<dyn Storage>) -> Self {
        Self {
            storage: RwLock::new(Some(storage)),
            seeds: Mutex::new(SeedChain::new()),
        }
    }

    /// Open or create the selected backend and initialize the wallet.
    pub fn open(backend: &Backend) -> Result<Self> {
        let storage = backend.open()?;
        Self::open_with(storage)
    }

    /// Initialize a wallet over an already opened storage handle.
    ///
    /// A fresh storage gets a new random seed; an existing one is restored.
    /// The handle is released if initialization fails.
    pub fn open_with(storage: Box<dyn Storage>) -> Result<Self> {
        let wallet = Self::new(storage);
        if let Err(e) = wallet.init() {
            wallet.release_after_failed_open();
            return Err(e);
        }
        Ok(wallet)
    }

    /// Initialize a wallet from a known root seed (recovery).
    ///
    /// Fails with [`Error::AlreadyInitialized`] if the storage already holds
    /// a different seed.
    pub fn open_with_seed(storage: Box<dyn Storage>, seed: &Seed) -> Result<Self> {
        let wallet = Self::new(storage);
        let imported = wallet.lock_seeds().and_then(|mut chain| {
            wallet.with_storage(|storage| chain.import(storage, seed))
        });
        if let Err(e) = imported {
            wallet.release_after_failed_open();
            return Err(e);
        }
        Ok(wallet)
    }

    /// Run seed chain initialization: restore the stored seed or generate one.
    pub fn init(&self) -> Result<()> {
        let mut chain = self.lock_seeds()?;
        self.with_storage(|storage| chain.init(storage))
    }

    /// Whether the seed chain has been initialized.
    pub fn is_initialized(&self) -> Result<bool> {
        Ok(self.lock_seeds()?.is_initialized())
    }

    /// Generate, store and return a new Factoid address.
    ///
    /// The address can be reproduced in the future from the wallet seed.
    pub fn generate_fct_address(&self) -> Result<FactoidAddress> {
        self.generate()
    }

    /// Generate, store and return a new Entry Credit address.
    ///
    /// The address can be reproduced in the future from the wallet seed.
    pub fn generate_ec_address(&self) -> Result<EcAddress> {
        self.generate()
    }

    fn generate<A: WalletAddress>(&self) -> Result<A> {
        let mut chain = self.lock_seeds()?;
        self.with_storage(|storage| {
            let step = chain.prepare(storage)?;

            let address = match A::from_secret_bytes(step.key_material()) {
                Ok(address) => address,
                Err(e) => {
                    // The step is spent anyway so its seed is never reused.
                    chain.commit(storage, &step, WriteBatch::new())?;
                    log::warn!("Skipped a seed step after failed {} key derivation", A::KIND);
                    return Err(e);
                }
            };

            // Seed advance and index entry land in the same atomic batch.
            let mut batch = WriteBatch::new();
            stage_address(&mut batch, &address)?;
            chain.commit(storage, &step, batch)?;

            log::info!("Generated {} address {}", A::KIND, address.public_string());
            Ok(address)
        })
    }

    /// Import a Factoid address from its private key string (`Fs...`).
    ///
    /// Imported addresses cannot be regenerated from the wallet seed.
    pub fn import_fct_address(&self, secret: &str) -> Result<FactoidAddress> {
        self.import(secret)
    }

    /// Import an Entry Credit address from its private key string (`Es...`).
    ///
    /// Imported addresses cannot be regenerated from the wallet seed.
    pub fn import_ec_address(&self, secret: &str) -> Result<EcAddress> {
        self.import(secret)
    }

    fn import<A: WalletAddress>(&self, secret: &str) -> Result<A> {
        let address = A::from_secret_string(secret)?;
        let mut batch = WriteBatch::new();
        stage_address(&mut batch, &address)?;
        self.with_storage(|storage| storage.write_batch(batch))?;
        log::info!("Imported {} address {}", A::KIND, address.public_string());
        Ok(address)
    }

    /// Look up a Factoid address by its public string.
    pub fn get_fct_address(&self, public: &str) -> Result<Option<FactoidAddress>> {
        self.get(public)
    }

    /// Look up an Entry Credit address by its public string.
    pub fn get_ec_address(&self, public: &str) -> Result<Option<EcAddress>> {
        self.get(public)
    }

    fn get<A: WalletAddress>(&self, public: &str) -> Result<Option<A>> {
        self.with_storage(|storage| {
            match storage.get(A::KIND.bucket(), public.as_bytes())? {
                Some(value) => Ok(Some(decode_address(&value)?)),
                None => Ok(None),
            }
        })
    }

    /// All Factoid and Entry Credit addresses in the wallet.
    pub fn get_all_addresses(&self) -> Result<AddressIndex> {
        Ok(AddressIndex {
            fct: self.list()?,
            ec: self.list()?,
        })
    }

    fn list<A: WalletAddress>(&self) -> Result<Vec<A>> {
        self.with_storage(|storage| {
            let mut addresses = Vec::new();
            for (_, value) in storage.list(A::KIND.bucket())? {
                addresses.push(decode_address(&value)?);
            }
            Ok(addresses)
        })
    }

    /// Human-readable root seed. Every generated (not imported) address can
    /// be regenerated from it.
    pub fn export_seed(&self) -> Result<String> {
        let chain = self.lock_seeds()?;
        self.with_storage(|storage| chain.export_seed(storage))
    }

    /// Flush and release the storage handle.
    ///
    /// Calling `close` again is a no-op. Every other operation on a closed
    /// wallet fails with [`Error::Closed`].
    pub fn close(&self) -> Result<()> {
        let mut guard = self
            .storage
            .write()
            .map_err(|e| Error::Storage(format!("wallet storage lock poisoned: {}", e)))?;

        match guard.take() {
            Some(storage) => {
                storage.flush()?;
                log::debug!("Closed wallet storage");
            }
            None => log::debug!("Wallet storage already closed"),
        }
        Ok(())
    }

    fn release_after_failed_open(&self) {
        if let Err(e) = self.close() {
            log::warn!("Failed to release wallet storage after failed open: {}", e);
        }
    }

    fn lock_seeds(&self) -> Result<MutexGuard<'_, SeedChain>> {
        self.seeds
            .lock()
            .map_err(|e| Error::Other(format!("seed chain lock poisoned: {}", e)))
    }

    fn with_storage<T>(&self, f: impl FnOnce(&dyn Storage) -> Result<T>) -> Result<T> {
        let guard = self
            .storage
            .read()
            .map_err(|e| Error::Storage(format!("wallet storage lock poisoned: {}", e)))?;
        let storage = guard.as_deref().ok_or(Error::Closed)?;
        f(storage)
    }
}

fn stage_address<A: WalletAddress>(batch: &mut WriteBatch, address: &A) -> Result<()> {
    let value = serde_json::to_vec(&StoredAddress::from_address(address))?;
    batch.put(A::KIND.bucket(), address.public_string(), value);
    Ok(())
}

fn decode_address<A: WalletAddress>(value: &[u8]) -> Result<A> {
    let stored: StoredAddress = serde_json::from_slice(value)?;
    stored.to_address()
}

impl AddressIndex {
    /// Number of addresses of the given kind.
    pub fn count(&self, kind: AddressKind) -> usize {
        match kind {
            AddressKind::Factoid => self.fct.len(),
            AddressKind::EntryCredit => self.ec.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::SEED_LEN;
    use crate::storage::{FCT_ADDRESSES_BUCKET, MemoryStorage, SEEDS_BUCKET};
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Memory storage shared with the test, with switchable batch failures.
    #[derive(Clone, Default)]
    struct FlakyStorage {
        inner: Arc<MemoryStorage>,
        fail_batches: Arc<AtomicBool>,
    }

    impl Storage for FlakyStorage {
        fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
            self.inner.get(bucket, key)
        }

        fn put(&self, bucket: &str, key: &[u8], value: &[u8]) -> Result<()> {
            self.inner.put(bucket, key, value)
        }

        fn write_batch(&self, batch: WriteBatch) -> Result<()> {
            if self.fail_batches.load(Ordering::SeqCst) {
                return Err(Error::Storage("disk unavailable".to_string()));
            }
            self.inner.write_batch(batch)
        }

        fn list(&self, bucket: &str) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
            self.inner.list(bucket)
        }

        fn flush(&self) -> Result<()> {
            Ok(())
        }
    }

    fn counting_seed() -> Seed {
        let bytes: Vec<u8> = (0..SEED_LEN as u8).collect();
        Seed::from_bytes(&bytes).unwrap()
    }

    fn seeded_wallet() -> Wallet {
        Wallet::open_with_seed(Box::new(MemoryStorage::new()), &counting_seed()).unwrap()
    }

    /// Address type whose key construction always rejects the material.
    struct RejectingAddress;

    impl WalletAddress for RejectingAddress {
        const KIND: AddressKind = AddressKind::Factoid;

        fn from_secret_bytes(_bytes: &[u8]) -> Result<Self> {
            Err(Error::KeyDerivation("rejected".to_string()))
        }

        fn from_secret_string(_s: &str) -> Result<Self> {
            Err(Error::InvalidAddress("rejected".to_string()))
        }

        fn secret_bytes(&self) -> [u8; crate::address::SECRET_KEY_LEN] {
            unreachable!()
        }

        fn public_key(&self) -> [u8; 32] {
            unreachable!()
        }

        fn public_string(&self) -> String {
            unreachable!()
        }

        fn secret_string(&self) -> String {
            unreachable!()
        }
    }

    #[test]
    fn test_generate_two_fct_addresses() {
        let wallet = Wallet::open(&Backend::Memory).unwrap();

        let first = wallet.generate_fct_address().unwrap();
        let second = wallet.generate_fct_address().unwrap();
        assert!(!first.public_string().is_empty());
        assert_ne!(first.public_string(), second.public_string());

        let index = wallet.get_all_addresses().unwrap();
        assert!(index.ec.is_empty());
        let listed: HashSet<String> = index.fct.iter().map(|a| a.public_string()).collect();
        let expected: HashSet<String> = [first.public_string(), second.public_string()]
            .into_iter()
            .collect();
        assert_eq!(listed, expected);
    }

    #[test]
    fn test_export_seed_requires_init() {
        let storage = FlakyStorage::default();
        let wallet = Wallet::new(Box::new(storage.clone()));

        assert!(matches!(wallet.export_seed(), Err(Error::NotInitialized)));
        assert!(matches!(
            wallet.generate_fct_address(),
            Err(Error::NotInitialized)
        ));
        assert!(storage.inner.list(SEEDS_BUCKET).unwrap().is_empty());

        wallet.init().unwrap();
        let seed = wallet.export_seed().unwrap();
        assert!(seed.parse::<Seed>().is_ok());
    }

    #[test]
    fn test_generated_addresses_are_unique() {
        let wallet = Wallet::open(&Backend::Memory).unwrap();

        let mut seen = HashSet::new();
        for _ in 0..25 {
            let address = wallet.generate_fct_address().unwrap();
            assert!(seen.insert(address.public_string()));
        }

        let index = wallet.get_all_addresses().unwrap();
        assert_eq!(index.count(AddressKind::Factoid), 25);
        assert_eq!(index.count(AddressKind::EntryCredit), 0);
    }

    #[test]
    fn test_known_seed_chain_addresses() {
        let wallet = seeded_wallet();

        assert_eq!(
            wallet.generate_fct_address().unwrap().public_string(),
            "FA33UtM56HWncEUPkXmojyENe8RYtUFxC9JTgny9H14bwBuD5Ji1"
        );
        assert_eq!(
            wallet.generate_fct_address().unwrap().public_string(),
            "FA3mfL8a9c3dkcc4785QBrkzXB8b9gWpkBZryuDJn6FkT7SPVTLK"
        );
        // Both kinds share one chain.
        assert_eq!(
            wallet.generate_ec_address().unwrap().public_string(),
            "EC1xJCXiS9GArnFbAxWkC92DcH67pLa1ndR5ZZ7VHvYgKcSBant4"
        );
    }

    #[test]
    fn test_generation_is_reproducible() {
        let a = seeded_wallet();
        let b = seeded_wallet();

        for i in 0..6 {
            if i % 2 == 0 {
                assert_eq!(
                    a.generate_fct_address().unwrap(),
                    b.generate_fct_address().unwrap()
                );
            } else {
                assert_eq!(
                    a.generate_ec_address().unwrap(),
                    b.generate_ec_address().unwrap()
                );
            }
        }
        assert_eq!(a.export_seed().unwrap(), b.export_seed().unwrap());
    }

    #[test]
    fn test_failed_write_leaves_state_unchanged() {
        let storage = FlakyStorage::default();
        let wallet = Wallet::open_with_seed(Box::new(storage.clone()), &counting_seed()).unwrap();
        wallet.generate_fct_address().unwrap();
        let seeds_before = storage.inner.list(SEEDS_BUCKET).unwrap();

        storage.fail_batches.store(true, Ordering::SeqCst);
        assert!(matches!(
            wallet.generate_fct_address(),
            Err(Error::Storage(_))
        ));
        assert!(matches!(
            wallet.generate_ec_address(),
            Err(Error::Storage(_))
        ));

        assert_eq!(storage.inner.list(SEEDS_BUCKET).unwrap(), seeds_before);
        let index = wallet.get_all_addresses().unwrap();
        assert_eq!(index.fct.len(), 1);
        assert!(index.ec.is_empty());

        // Once storage recovers, the chain continues where it stopped.
        storage.fail_batches.store(false, Ordering::SeqCst);
        assert_eq!(
            wallet.generate_fct_address().unwrap().public_string(),
            "FA3mfL8a9c3dkcc4785QBrkzXB8b9gWpkBZryuDJn6FkT7SPVTLK"
        );
    }

    #[test]
    fn test_failed_derivation_consumes_a_step() {
        let storage = FlakyStorage::default();
        let seed = counting_seed();
        let wallet = Wallet::open_with_seed(Box::new(storage.clone()), &seed).unwrap();

        assert!(matches!(
            wallet.generate::<RejectingAddress>(),
            Err(Error::KeyDerivation(_))
        ));

        // The frontier moved on, but nothing was indexed.
        assert_eq!(
            storage.inner.get(SEEDS_BUCKET, b"next").unwrap(),
            Some(seed.next().as_bytes().to_vec())
        );
        assert!(storage.inner.list(FCT_ADDRESSES_BUCKET).unwrap().is_empty());

        // The spent step is skipped: the next address is the chain's second.
        assert_eq!(
            wallet.generate_fct_address().unwrap().public_string(),
            "FA3mfL8a9c3dkcc4785QBrkzXB8b9gWpkBZryuDJn6FkT7SPVTLK"
        );
        assert_eq!(wallet.get_all_addresses().unwrap().fct.len(), 1);
    }

    #[test]
    fn test_concurrent_generation_never_reuses_a_step() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 10;

        let wallet = Arc::new(seeded_wallet());
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let wallet = Arc::clone(&wallet);
                std::thread::spawn(move || {
                    (0..PER_THREAD)
                        .map(|_| wallet.generate_fct_address().unwrap().public_string())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut generated = HashSet::new();
        for handle in handles {
            for address in handle.join().unwrap() {
                assert!(generated.insert(address), "address generated twice");
            }
        }
        assert_eq!(generated.len(), THREADS * PER_THREAD);

        // Exactly the first N steps of the chain were used, none skipped.
        let reference = seeded_wallet();
        let expected: HashSet<String> = (0..THREADS * PER_THREAD)
            .map(|_| reference.generate_fct_address().unwrap().public_string())
            .collect();
        assert_eq!(generated, expected);
        assert_eq!(
            wallet.get_all_addresses().unwrap().fct.len(),
            THREADS * PER_THREAD
        );
    }

    #[test]
    fn test_import_and_lookup() {
        let wallet = Wallet::open(&Backend::Memory).unwrap();

        let fct = wallet
            .import_fct_address("Fs3E9gV6DXsYzf7Fqx1fVBQPQXV695eP3k5XbmHEZVRLkMdD9qCK")
            .unwrap();
        assert_eq!(
            fct.public_string(),
            "FA2jK2HcLnRdS94dEcU27rF3meoJfpUcZPSinpb7AwQvPRY6RL1Q"
        );
        let ec = wallet
            .import_ec_address("Es2Rf7iM6PdsqfYCo3D1tnAR65SkLENyWJG1deUzpRMQmbh9F3eG")
            .unwrap();

        // Importing twice keeps a single entry.
        wallet
            .import_fct_address("Fs3E9gV6DXsYzf7Fqx1fVBQPQXV695eP3k5XbmHEZVRLkMdD9qCK")
            .unwrap();

        let index = wallet.get_all_addresses().unwrap();
        assert_eq!(index.fct, vec![fct.clone()]);
        assert_eq!(index.ec, vec![ec.clone()]);

        assert_eq!(
            wallet
                .get_fct_address("FA2jK2HcLnRdS94dEcU27rF3meoJfpUcZPSinpb7AwQvPRY6RL1Q")
                .unwrap(),
            Some(fct)
        );
        assert_eq!(
            wallet
                .get_ec_address("FA2jK2HcLnRdS94dEcU27rF3meoJfpUcZPSinpb7AwQvPRY6RL1Q")
                .unwrap(),
            None
        );

        assert!(matches!(
            wallet.import_fct_address("Es2Rf7iM6PdsqfYCo3D1tnAR65SkLENyWJG1deUzpRMQmbh9F3eG"),
            Err(Error::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_close_is_idempotent() {
        let wallet = Wallet::open(&Backend::Memory).unwrap();
        wallet.generate_ec_address().unwrap();

        wallet.close().unwrap();
        wallet.close().unwrap();

        assert!(matches!(wallet.generate_ec_address(), Err(Error::Closed)));
        assert!(matches!(wallet.get_all_addresses(), Err(Error::Closed)));
        assert!(matches!(wallet.export_seed(), Err(Error::Closed)));
    }

    #[test]
    fn test_open_with_seed_rejects_foreign_seed() {
        let storage = FlakyStorage::default();
        let wallet = Wallet::open_with(Box::new(storage.clone())).unwrap();
        let exported = wallet.export_seed().unwrap();
        wallet.close().unwrap();

        let result = Wallet::open_with_seed(Box::new(storage.clone()), &counting_seed());
        assert!(matches!(result, Err(Error::AlreadyInitialized)));

        let reopened = Wallet::open_with(Box::new(storage)).unwrap();
        assert_eq!(reopened.export_seed().unwrap(), exported);
    }
}
