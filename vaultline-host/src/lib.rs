//! The Vaultline host service.
//!
//! The host owns every secret: the catalog, open group keys, the signed-in
//! account session and the transport keypair. The display process talks to
//! it exclusively through sealed [`VaultRequest`]s and receives
//! [`VaultResponse`]s that only ever carry info projections.

pub mod config;
mod error;
pub mod logging;
pub mod protocol;
mod state;

pub use config::{ConfigError, HostConfig};
pub use error::{DispatchError, DispatchResult};
pub use protocol::{ErrorKind, Reply, VaultRequest, VaultResponse};
pub use state::HostState;
