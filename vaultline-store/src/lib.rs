//! Persistence for Vaultline.
//!
//! - [`Catalog`]: accounts, visibility groups and storage configurations,
//!   in one SQLite database owned by the host.
//! - [`backend`]: concrete storage backends, selected by [`BackendKind`].
//! - [`VaultStore`]: the box → template → entry operations. Every record is
//!   sealed under the key of the storage's visibility group, or under the
//!   account key for storages in the public group.
//!
//! [`BackendKind`]: vaultline_types::BackendKind

mod account;
pub mod backend;
mod catalog;
mod error;
mod vault;

pub use account::{AccountRecord, AccountSession};
pub use backend::{BackendDefaults, BackendParams, BackendRegistry};
pub use catalog::{Catalog, StorageConfig};
pub use error::{StoreError, StoreResult};
pub use vault::{KeyContext, NewStorage, VaultStore};
