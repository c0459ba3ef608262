use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::PathBuf;
use vaultline_crypto::KdfParams;
use vaultline_groups::{GroupKeyring, provision_group};
use vaultline_store::{
    AccountSession, BackendDefaults, BackendParams, BackendRegistry, Catalog, KeyContext,
    NewStorage, StoreError, VaultStore,
};
use vaultline_types::{
    BackendKind, Bound, FieldSpec, GroupId, NumericField, StorageId, StorageState, TextField,
    Username,
};

struct Fixture {
    store: VaultStore,
    keyring: GroupKeyring,
    session: AccountSession,
}

impl Fixture {
    fn new() -> Self {
        Self::with_defaults(BackendDefaults {
            kind: BackendKind::Memory,
            directory: PathBuf::new(),
        })
    }

    fn with_defaults(defaults: BackendDefaults) -> Self {
        let catalog = Catalog::open_in_memory().unwrap();
        let username = Username::parse("alice").unwrap();
        catalog
            .sign_up(&username, "alice-pw", &KdfParams::low_cost())
            .unwrap();
        let session = catalog.sign_in(&username, "alice-pw").unwrap().unwrap();
        Self {
            store: VaultStore::new(catalog, BackendRegistry::with_defaults(), defaults),
            keyring: GroupKeyring::new(),
            session,
        }
    }

    fn ctx(&self) -> KeyContext<'_> {
        KeyContext::new(&self.session, &self.keyring)
    }

    fn storage(&self, name: &str) -> StorageId {
        let created = self
            .store
            .create_storage(
                &self.ctx(),
                NewStorage {
                    name: name.into(),
                    ..Default::default()
                },
            )
            .unwrap();
        self.store
            .initialise_storage(&self.ctx(), &created.info.id)
            .unwrap();
        created.info.id
    }

    fn group(&self, name: &str, password: &str) -> GroupId {
        let provisioned = provision_group(
            self.session.account_id(),
            name,
            None,
            password,
            &KdfParams::low_cost(),
        )
        .unwrap();
        self.store.catalog().insert_group(&provisioned.group).unwrap();
        provisioned.group.id
    }
}

fn reading_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::Text(TextField::named("label")),
        FieldSpec::Integer(
            NumericField::named("count")
                .with_minimum(Bound::inclusive(0))
                .with_maximum(Bound::inclusive(10))
                .with_multiple_of(2),
        ),
    ]
}

// ── Storages ────────────────────────────────────────────────────

#[test]
fn create_storage_is_unique_per_account() {
    let fx = Fixture::new();
    let created = fx
        .store
        .create_storage(
            &fx.ctx(),
            NewStorage {
                name: "Vault1".into(),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(created.info.name, "Vault1");
    assert_eq!(created.info.state, StorageState::Configured);
    assert_eq!(created.diff.added, vec![created.info.id.as_uuid()]);

    let err = fx
        .store
        .create_storage(
            &fx.ctx(),
            NewStorage {
                name: "Vault1".into(),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::NotUnique { scope: "storage", .. }));

    // A second account may reuse the name.
    let bob = Username::parse("bob").unwrap();
    fx.store
        .catalog()
        .sign_up(&bob, "bob-pw", &KdfParams::low_cost())
        .unwrap();
    let bob_session = fx.store.catalog().sign_in(&bob, "bob-pw").unwrap().unwrap();
    let bob_keyring = GroupKeyring::new();
    let bob_ctx = KeyContext::new(&bob_session, &bob_keyring);
    fx.store
        .create_storage(
            &bob_ctx,
            NewStorage {
                name: "Vault1".into(),
                ..Default::default()
            },
        )
        .unwrap();

    assert_eq!(fx.store.list_storages_info(&fx.ctx()).unwrap().len(), 1);
    assert_eq!(fx.store.list_storages_info(&bob_ctx).unwrap().len(), 1);
}

#[test]
fn group_storage_requires_open_group() {
    let fx = Fixture::new();
    let group = fx.group("work", "work-pw");
    let new = NewStorage {
        name: "Work".into(),
        visibility_group_id: Some(group),
        ..Default::default()
    };

    let err = fx.store.create_storage(&fx.ctx(), new.clone()).unwrap_err();
    assert!(matches!(err, StoreError::GroupLocked(id) if id == group));

    assert!(fx.keyring.open(fx.store.catalog(), &group, "work-pw").unwrap());
    let created = fx.store.create_storage(&fx.ctx(), new).unwrap();
    let id = created.info.id;

    fx.keyring.close(&[group]);
    let err = fx.store.initialise_storage(&fx.ctx(), &id).unwrap_err();
    assert!(matches!(err, StoreError::GroupLocked(_)));

    let listed = fx.store.list_storages_info(&fx.ctx()).unwrap();
    assert!(listed[0].locked);

    fx.keyring.open(fx.store.catalog(), &group, "work-pw").unwrap();
    let initialised = fx.store.initialise_storage(&fx.ctx(), &id).unwrap();
    assert_eq!(initialised.info.state, StorageState::Initialised);
    assert!(initialised.diff.is_empty());
}

#[test]
fn closing_a_group_closes_its_storages() {
    let fx = Fixture::new();
    let group = fx.group("work", "pw");
    fx.keyring.open(fx.store.catalog(), &group, "pw").unwrap();
    let created = fx
        .store
        .create_storage(
            &fx.ctx(),
            NewStorage {
                name: "Work".into(),
                visibility_group_id: Some(group),
                ..Default::default()
            },
        )
        .unwrap();
    let id = created.info.id;
    fx.store.initialise_storage(&fx.ctx(), &id).unwrap();
    let public = fx.storage("Public");

    let closed = fx.store.close_group_storages(&fx.keyring.close(&[group])).unwrap();
    assert_eq!(closed, vec![id]);
    assert_eq!(fx.store.storage_state(&id), StorageState::Closed);
    assert_eq!(fx.store.storage_state(&public), StorageState::Initialised);

    assert!(matches!(
        fx.store.list_boxes(&fx.ctx(), &id),
        Err(StoreError::GroupLocked(_))
    ));
}

#[test]
fn lifecycle_moves_through_states() {
    let fx = Fixture::new();
    let id = fx.storage("Main");
    assert_eq!(fx.store.storage_state(&id), StorageState::Initialised);

    fx.store.list_boxes(&fx.ctx(), &id).unwrap();
    assert_eq!(fx.store.storage_state(&id), StorageState::Active);

    let closed = fx.store.close_storage(&fx.ctx(), &id).unwrap();
    assert_eq!(closed.info.state, StorageState::Closed);
    assert!(closed.diff.is_empty());
    assert!(matches!(
        fx.store.list_boxes(&fx.ctx(), &id),
        Err(StoreError::InvalidState(_))
    ));
    assert!(matches!(
        fx.store.close_storage(&fx.ctx(), &id),
        Err(StoreError::InvalidState(_))
    ));

    fx.store.initialise_storage(&fx.ctx(), &id).unwrap();
    let terminated = fx.store.terminate_storage(&fx.ctx(), &id).unwrap();
    assert_eq!(terminated.info.state, StorageState::Terminated);
    assert_eq!(terminated.diff.removed, vec![id.as_uuid()]);
    assert!(matches!(
        fx.store.storage_info(&fx.ctx(), &id),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn memory_contents_survive_close_and_reopen() {
    let fx = Fixture::new();
    let id = fx.storage("Main");
    fx.store.create_box(&fx.ctx(), &id, "inbox", None).unwrap();
    fx.store.close_storage(&fx.ctx(), &id).unwrap();
    fx.store.initialise_storage(&fx.ctx(), &id).unwrap();
    assert_eq!(fx.store.list_boxes(&fx.ctx(), &id).unwrap()[0].name, "inbox");
}

// ── Boxes and templates ─────────────────────────────────────────

#[test]
fn box_and_template_names_are_unique_per_storage() {
    let fx = Fixture::new();
    let id = fx.storage("Main");
    let a = fx.store.create_box(&fx.ctx(), &id, "a", None).unwrap();
    assert!(matches!(
        fx.store.create_box(&fx.ctx(), &id, "a", None),
        Err(StoreError::NotUnique { scope: "box", .. })
    ));
    let b = fx.store.create_box(&fx.ctx(), &id, "b", None).unwrap();

    fx.store
        .create_template(&fx.ctx(), &id, &a.info.id, "reading", None, reading_fields())
        .unwrap();
    assert!(matches!(
        fx.store
            .create_template(&fx.ctx(), &id, &b.info.id, "reading", None, vec![]),
        Err(StoreError::NotUnique { scope: "template", .. })
    ));

    let in_b = fx
        .store
        .list_templates(&fx.ctx(), &id, Some(&b.info.id))
        .unwrap();
    assert!(in_b.is_empty());
    assert_eq!(fx.store.list_templates(&fx.ctx(), &id, None).unwrap().len(), 1);
}

#[test]
fn template_with_impossible_constraints_is_rejected() {
    let fx = Fixture::new();
    let id = fx.storage("Main");
    let b = fx.store.create_box(&fx.ctx(), &id, "b", None).unwrap();
    let bad = vec![FieldSpec::Integer(
        NumericField::named("n").with_multiple_of(0),
    )];
    assert!(matches!(
        fx.store.create_template(&fx.ctx(), &id, &b.info.id, "t", None, bad),
        Err(StoreError::InvalidTemplate(_))
    ));
}

// ── Entries ─────────────────────────────────────────────────────

#[test]
fn entry_validation_reports_offending_field() {
    let fx = Fixture::new();
    let id = fx.storage("Main");
    let b = fx.store.create_box(&fx.ctx(), &id, "b", None).unwrap();
    let t = fx
        .store
        .create_template(&fx.ctx(), &id, &b.info.id, "reading", None, reading_fields())
        .unwrap();

    let err = fx
        .store
        .create_entry(&fx.ctx(), &id, &t.info.id, vec![json!("x"), json!(12)])
        .unwrap_err();
    match err {
        StoreError::ValidationFailure { index, field, .. } => {
            assert_eq!((index, field.as_str()), (1, "count"));
        }
        other => panic!("expected ValidationFailure, got {other:?}"),
    }

    let err = fx
        .store
        .create_entry(&fx.ctx(), &id, &t.info.id, vec![json!("x"), json!(3)])
        .unwrap_err();
    assert!(matches!(err, StoreError::ValidationFailure { index: 1, .. }));
    assert!(fx.store.list_entries(&fx.ctx(), &id, None).unwrap().is_empty());

    let created = fx
        .store
        .create_entry(&fx.ctx(), &id, &t.info.id, vec![json!("x"), json!(4)])
        .unwrap();
    let fetched = fx.store.get_entry(&fx.ctx(), &id, &created.info.id).unwrap();
    assert_eq!(fetched.values, vec![json!("x"), json!(4)]);
    assert_eq!(fetched.box_id, b.info.id);
}

#[test]
fn update_entry_revalidates() {
    let fx = Fixture::new();
    let id = fx.storage("Main");
    let b = fx.store.create_box(&fx.ctx(), &id, "b", None).unwrap();
    let t = fx
        .store
        .create_template(&fx.ctx(), &id, &b.info.id, "reading", None, reading_fields())
        .unwrap();
    let e = fx
        .store
        .create_entry(&fx.ctx(), &id, &t.info.id, vec![json!("x"), json!(2)])
        .unwrap();

    assert!(matches!(
        fx.store
            .update_entry(&fx.ctx(), &id, &e.info.id, vec![json!("x"), json!(-2)]),
        Err(StoreError::ValidationFailure { index: 1, .. })
    ));
    let updated = fx
        .store
        .update_entry(&fx.ctx(), &id, &e.info.id, vec![json!("y"), json!(8)])
        .unwrap();
    assert_eq!(updated.info.values, vec![json!("y"), json!(8)]);
    assert!(updated.diff.is_empty());
    assert_eq!(
        fx.store.get_entry(&fx.ctx(), &id, &e.info.id).unwrap().values,
        vec![json!("y"), json!(8)]
    );
}

#[test]
fn deleting_a_box_cascades() {
    let fx = Fixture::new();
    let id = fx.storage("Main");
    let b = fx.store.create_box(&fx.ctx(), &id, "b", None).unwrap();
    let keep = fx.store.create_box(&fx.ctx(), &id, "keep", None).unwrap();
    let t = fx
        .store
        .create_template(&fx.ctx(), &id, &b.info.id, "reading", None, reading_fields())
        .unwrap();
    let e1 = fx
        .store
        .create_entry(&fx.ctx(), &id, &t.info.id, vec![json!("a"), json!(0)])
        .unwrap();
    let e2 = fx
        .store
        .create_entry(&fx.ctx(), &id, &t.info.id, vec![json!("b"), json!(10)])
        .unwrap();

    let diff = fx.store.delete_box(&fx.ctx(), &id, &b.info.id).unwrap();
    assert!(diff.added.is_empty());
    assert_eq!(
        diff.removed,
        vec![
            e1.info.id.as_uuid(),
            e2.info.id.as_uuid(),
            t.info.id.as_uuid(),
            b.info.id.as_uuid()
        ]
    );

    let boxes = fx.store.list_boxes(&fx.ctx(), &id).unwrap();
    assert_eq!(boxes.len(), 1);
    assert_eq!(boxes[0].id, keep.info.id);
    assert!(fx.store.list_templates(&fx.ctx(), &id, None).unwrap().is_empty());
    assert!(fx.store.list_entries(&fx.ctx(), &id, None).unwrap().is_empty());
}

#[test]
fn deleting_a_template_removes_its_entries() {
    let fx = Fixture::new();
    let id = fx.storage("Main");
    let b = fx.store.create_box(&fx.ctx(), &id, "b", None).unwrap();
    let t = fx
        .store
        .create_template(&fx.ctx(), &id, &b.info.id, "reading", None, reading_fields())
        .unwrap();
    let e = fx
        .store
        .create_entry(&fx.ctx(), &id, &t.info.id, vec![json!("a"), json!(6)])
        .unwrap();

    let diff = fx.store.delete_template(&fx.ctx(), &id, &t.info.id).unwrap();
    assert_eq!(diff.removed, vec![e.info.id.as_uuid(), t.info.id.as_uuid()]);
    assert!(matches!(
        fx.store.get_entry(&fx.ctx(), &id, &e.info.id),
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        fx.store.delete_entry(&fx.ctx(), &id, &e.info.id),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn other_accounts_cannot_see_a_storage() {
    let fx = Fixture::new();
    let id = fx.storage("Main");

    let mallory = Username::parse("mallory").unwrap();
    fx.store
        .catalog()
        .sign_up(&mallory, "m", &KdfParams::low_cost())
        .unwrap();
    let session = fx.store.catalog().sign_in(&mallory, "m").unwrap().unwrap();
    let keyring = GroupKeyring::new();
    let ctx = KeyContext::new(&session, &keyring);

    assert!(matches!(
        fx.store.list_boxes(&ctx, &id),
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        fx.store.terminate_storage(&ctx, &id),
        Err(StoreError::NotFound(_))
    ));
}

// ── Local SQLite backend ────────────────────────────────────────

#[test]
fn local_sqlite_storage_persists_and_terminates() {
    let dir = tempfile::tempdir().unwrap();
    let fx = Fixture::with_defaults(BackendDefaults {
        kind: BackendKind::LocalSqlite,
        directory: dir.path().to_path_buf(),
    });
    let id = fx.storage("Disk");
    let file = dir.path().join(format!("{id}.sqlite"));
    assert!(file.exists());

    let b = fx.store.create_box(&fx.ctx(), &id, "b", None).unwrap();
    let t = fx
        .store
        .create_template(&fx.ctx(), &id, &b.info.id, "reading", None, reading_fields())
        .unwrap();
    fx.store
        .create_entry(&fx.ctx(), &id, &t.info.id, vec![json!("disk"), json!(2)])
        .unwrap();

    // Plaintext never reaches the file.
    let raw = std::fs::read(&file).unwrap();
    assert!(!raw.windows(b"reading".len()).any(|w| w == b"reading"));

    fx.store.close_storage(&fx.ctx(), &id).unwrap();
    fx.store.initialise_storage(&fx.ctx(), &id).unwrap();
    let entries = fx.store.list_entries(&fx.ctx(), &id, Some(&t.info.id)).unwrap();
    assert_eq!(entries[0].values, vec![json!("disk"), json!(2)]);

    fx.store.terminate_storage(&fx.ctx(), &id).unwrap();
    assert!(!file.exists());
}

#[test]
fn explicit_backend_params_are_honoured() {
    let fx = Fixture::new();
    let created = fx
        .store
        .create_storage(
            &fx.ctx(),
            NewStorage {
                name: "Named".into(),
                backend: Some(BackendParams::Memory {
                    name: "scratch".into(),
                }),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(created.info.backend_kind, BackendKind::Memory);
    fx.store
        .initialise_storage(&fx.ctx(), &created.info.id)
        .unwrap();
}
