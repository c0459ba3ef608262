//! Host-side state and request dispatch.

use crate::config::HostConfig;
use crate::error::{DispatchError, DispatchResult};
use crate::protocol::{Reply, VaultRequest, VaultResponse};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};
use vaultline_crypto::KdfParams;
use vaultline_groups::{GroupKeyring, provision_group};
use vaultline_store::{
    AccountSession, BackendDefaults, BackendRegistry, Catalog, KeyContext, NewStorage,
    StoreResult, VaultStore,
};
use vaultline_transport::RequestHandler;
use vaultline_types::{BackendKind, Changed, Diff, GroupId, Username};

/// Everything the host holds for the lifetime of the process: the store,
/// the keyring of open groups and the signed-in account.
pub struct HostState {
    store: VaultStore,
    keyring: GroupKeyring,
    kdf: KdfParams,
    session: Mutex<Option<AccountSession>>,
}

impl HostState {
    pub fn new(store: VaultStore, kdf: KdfParams) -> Self {
        Self {
            store,
            keyring: GroupKeyring::new(),
            kdf,
            session: Mutex::new(None),
        }
    }

    /// Opens the catalog named by `config`, creating it if needed.
    pub fn open(config: &HostConfig) -> StoreResult<Self> {
        let catalog = Catalog::open(&config.catalog_path())?;
        let store = VaultStore::new(
            catalog,
            BackendRegistry::with_defaults(),
            config.backend_defaults(),
        );
        info!(data_dir = %config.data_dir.display(), "host state opened");
        Ok(Self::new(store, config.kdf))
    }

    /// A throwaway host: in-memory catalog and memory-backed storages.
    pub fn in_memory(kdf: KdfParams) -> StoreResult<Self> {
        let store = VaultStore::new(
            Catalog::open_in_memory()?,
            BackendRegistry::with_defaults(),
            BackendDefaults {
                kind: BackendKind::Memory,
                directory: PathBuf::new(),
            },
        );
        Ok(Self::new(store, kdf))
    }

    pub fn store(&self) -> &VaultStore {
        &self.store
    }

    pub fn keyring(&self) -> &GroupKeyring {
        &self.keyring
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<AccountSession>> {
        self.session.lock().unwrap_or_else(|poisoned| {
            warn!("recovering from poisoned session mutex");
            poisoned.into_inner()
        })
    }

    /// Runs one request. Failures become error responses; nothing here
    /// panics or tears down the session.
    pub fn dispatch(&self, request: VaultRequest) -> VaultResponse {
        let op = request.op();
        match self.execute(request) {
            Ok(reply) => {
                tracing::debug!(op, "request handled");
                VaultResponse::ok(reply)
            }
            Err(err) => {
                warn!(op, kind = ?err.kind(), error = %err, "request failed");
                err.into_response()
            }
        }
    }

    fn execute(&self, request: VaultRequest) -> DispatchResult<Reply> {
        match request {
            VaultRequest::SignUp { username, password } => {
                let username = parse_username(&username)?;
                let info = self
                    .store
                    .catalog()
                    .sign_up(&username, &password, &self.kdf)?;
                Ok(Reply::Account(info))
            }
            VaultRequest::SignIn { username, password } => {
                let username = parse_username(&username)?;
                self.sign_out()?;
                let session = self.store.catalog().sign_in(&username, &password)?;
                let info = session.as_ref().map(|s| s.info.clone());
                *self.lock_session() = session;
                Ok(Reply::SignIn(info))
            }
            VaultRequest::SignOut => {
                self.sign_out()?;
                Ok(Reply::SignedOut)
            }
            other => {
                let guard = self.lock_session();
                let session = guard.as_ref().ok_or(DispatchError::NotSignedIn)?;
                let ctx = KeyContext::new(session, &self.keyring);
                self.execute_signed_in(&ctx, other)
            }
        }
    }

    /// Closes everything the signed-in account holds open and forgets it.
    fn sign_out(&self) -> DispatchResult<()> {
        let mut guard = self.lock_session();
        if let Some(session) = guard.as_ref() {
            let ctx = KeyContext::new(session, &self.keyring);
            let storages = self.store.close_account_storages(&ctx)?;
            let groups = self.keyring.close_all();
            info!(
                account_id = %session.account_id(),
                storages = storages.len(),
                groups = groups.len(),
                "signed out"
            );
        }
        *guard = None;
        Ok(())
    }

    fn execute_signed_in(&self, ctx: &KeyContext<'_>, request: VaultRequest) -> DispatchResult<Reply> {
        let store = &self.store;
        let catalog = store.catalog();
        let owner = ctx.owner();

        let reply = match request {
            VaultRequest::SignUp { .. } | VaultRequest::SignIn { .. } | VaultRequest::SignOut => {
                return Err(DispatchError::InvalidInput(
                    "account requests are handled before sign-in".into(),
                ));
            }

            VaultRequest::CreateGroup {
                name,
                description,
                password,
            } => {
                let provisioned = provision_group(owner, &name, description, &password, &self.kdf)?;
                catalog.insert_group(&provisioned.group)?;
                let id = provisioned.group.id;
                self.keyring.admit(id, provisioned.key);
                Reply::CreatedGroup(Changed {
                    info: provisioned.group.info(true),
                    diff: Diff::added(id),
                })
            }
            VaultRequest::DeleteGroup { group_id } => {
                catalog.delete_group(&owner, &group_id)?;
                self.keyring.close(&[group_id]);
                Reply::Removed(Diff::removed([group_id]))
            }
            VaultRequest::ListGroups => Reply::Groups(
                catalog
                    .groups_of(&owner)?
                    .iter()
                    .map(|g| g.info(self.keyring.is_open(&g.id)))
                    .collect(),
            ),
            VaultRequest::OpenGroup { group_id, password } => {
                // Groups of other accounts read as unknown.
                let opened = match catalog.get_group(&group_id)? {
                    Some(group) if group.owner == owner => {
                        self.keyring.open(catalog, &group_id, &password)?
                    }
                    _ => false,
                };
                Reply::GroupOpened(opened)
            }
            VaultRequest::OpenGroupsByPassword { password } => {
                Reply::GroupsOpened(self.keyring.open_by_password(catalog, &owner, &password)?)
            }
            VaultRequest::CloseGroups { group_ids } => {
                for id in &group_ids {
                    self.owned_group(ctx, id)?;
                }
                let groups = self.keyring.close(&group_ids);
                let storages = store.close_group_storages(&groups)?;
                Reply::Closed { groups, storages }
            }
            VaultRequest::CloseAllGroups => {
                let groups = self.keyring.close_all();
                let storages = store.close_group_storages(&groups)?;
                Reply::Closed { groups, storages }
            }

            VaultRequest::CreateStorage {
                name,
                description,
                visibility_group_id,
            } => Reply::CreatedStorage(store.create_storage(
                ctx,
                NewStorage {
                    name,
                    description,
                    visibility_group_id,
                    backend: None,
                },
            )?),
            VaultRequest::InitialiseStorage { storage_id } => {
                Reply::StorageChanged(store.initialise_storage(ctx, &storage_id)?)
            }
            VaultRequest::CloseStorage { storage_id } => {
                Reply::StorageChanged(store.close_storage(ctx, &storage_id)?)
            }
            VaultRequest::TerminateStorage { storage_id } => {
                Reply::StorageChanged(store.terminate_storage(ctx, &storage_id)?)
            }
            VaultRequest::GetStorage { storage_id } => {
                Reply::Storage(store.storage_info(ctx, &storage_id)?)
            }
            VaultRequest::ListStorages => Reply::Storages(store.list_storages_info(ctx)?),

            VaultRequest::CreateBox {
                storage_id,
                name,
                description,
            } => Reply::CreatedBox(store.create_box(ctx, &storage_id, &name, description)?),
            VaultRequest::DeleteBox { storage_id, box_id } => {
                Reply::Removed(store.delete_box(ctx, &storage_id, &box_id)?)
            }
            VaultRequest::ListBoxes { storage_id } => {
                Reply::Boxes(store.list_boxes(ctx, &storage_id)?)
            }

            VaultRequest::CreateTemplate {
                storage_id,
                box_id,
                name,
                description,
                fields,
            } => Reply::CreatedTemplate(store.create_template(
                ctx,
                &storage_id,
                &box_id,
                &name,
                description,
                fields,
            )?),
            VaultRequest::DeleteTemplate {
                storage_id,
                template_id,
            } => Reply::Removed(store.delete_template(ctx, &storage_id, &template_id)?),
            VaultRequest::ListTemplates { storage_id, box_id } => {
                Reply::Templates(store.list_templates(ctx, &storage_id, box_id.as_ref())?)
            }

            VaultRequest::CreateEntry {
                storage_id,
                template_id,
                values,
            } => Reply::CreatedEntry(store.create_entry(ctx, &storage_id, &template_id, values)?),
            VaultRequest::UpdateEntry {
                storage_id,
                entry_id,
                values,
            } => Reply::UpdatedEntry(store.update_entry(ctx, &storage_id, &entry_id, values)?),
            VaultRequest::GetEntry {
                storage_id,
                entry_id,
            } => Reply::Entry(store.get_entry(ctx, &storage_id, &entry_id)?),
            VaultRequest::DeleteEntry {
                storage_id,
                entry_id,
            } => Reply::Removed(store.delete_entry(ctx, &storage_id, &entry_id)?),
            VaultRequest::ListEntries {
                storage_id,
                template_id,
            } => Reply::Entries(store.list_entries(ctx, &storage_id, template_id.as_ref())?),
        };
        Ok(reply)
    }

    /// Hides groups of other accounts behind `NotFound`.
    fn owned_group(&self, ctx: &KeyContext<'_>, id: &GroupId) -> DispatchResult<()> {
        match self.store.catalog().get_group(id)? {
            Some(group) if group.owner == ctx.owner() => Ok(()),
            _ => Err(DispatchError::Group(vaultline_groups::GroupError::NotFound(*id))),
        }
    }
}

fn parse_username(raw: &str) -> DispatchResult<Username> {
    Username::parse(raw).map_err(|e| DispatchError::InvalidInput(e.to_string()))
}

#[async_trait]
impl RequestHandler for HostState {
    type Request = VaultRequest;
    type Response = VaultResponse;

    async fn handle(&self, request: VaultRequest) -> VaultResponse {
        self.dispatch(request)
    }
}

impl std::fmt::Debug for HostState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostState")
            .field("store", &self.store)
            .field("keyring", &self.keyring)
            .field("signed_in", &self.lock_session().is_some())
            .finish()
    }
}
