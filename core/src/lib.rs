//! Factom Client SDK - Core Library
//!
//! Wallet functionality for deterministic address generation, plus a JSON-RPC
//! client for the factomd and factom-walletd daemons.
//!
//! The wallet derives every address from a seed chain: a 64-byte root seed
//! whose frontier is re-hashed with SHA-512 for each new address. Seed state
//! and the address index are persisted through the [`Storage`] trait, which
//! can be implemented for any bucketed key-value backend. An in-memory and a
//! `sled` backend are included.
//!
//! # Example
//!
//! ```rust,ignore
//! use factom_core::{Backend, Wallet, WalletAddress};
//!
//! // Open (or create) a wallet on disk
//! let wallet = Wallet::open(&Backend::Sled { path: "wallet.db".into() })?;
//!
//! // Derive new addresses
//! let fct = wallet.generate_fct_address()?;
//! let ec = wallet.generate_ec_address()?;
//! println!("{} {}", fct.public_string(), ec.public_string());
//!
//! // Back up the seed
//! let seed = wallet.export_seed()?;
//! wallet.close()?;
//! ```

pub mod address;
pub mod api;
pub mod config;
pub mod error;
pub mod seed;
pub mod storage;
pub mod wallet;

pub use address::{AddressKind, EcAddress, FactoidAddress, WalletAddress};
pub use api::RpcClient;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use seed::{Seed, SeedChain, SeedStep};
pub use storage::{Backend, MemoryStorage, SledStorage, Storage, StorageExt, WriteBatch};
pub use wallet::{API_VERSION, AddressIndex, VERSION, Wallet};
