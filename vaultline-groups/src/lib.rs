//! Visibility groups for Vaultline.
//!
//! A visibility group is a password-protected scope. Storages bound to a
//! group can only be read while the group is open, meaning while its
//! derived key sits in the [`GroupKeyring`]. Derived keys are never
//! persisted; only the verifier, the key salt and a key-check token are.

mod error;
mod group;
mod keyring;

pub use error::{GroupError, GroupResult};
pub use group::{GroupSource, ProvisionedGroup, VisibilityGroup, provision_group};
pub use keyring::GroupKeyring;
