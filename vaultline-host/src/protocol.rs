//! Requests and responses carried inside the sealed envelopes.
//!
//! Requests are tagged by `"op"`, responses by `"status"`. Field names are
//! camelCase on the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use vaultline_types::{
    AccountInfo, BoxId, BoxInfo, Changed, Diff, EntryId, EntryInfo, FieldSpec, GroupId,
    GroupInfo, StorageId, StorageInfo, TemplateId, TemplateInfo,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum VaultRequest {
    // Accounts
    SignUp {
        username: String,
        password: String,
    },
    SignIn {
        username: String,
        password: String,
    },
    SignOut,

    // Visibility groups
    CreateGroup {
        name: String,
        description: Option<String>,
        password: String,
    },
    DeleteGroup {
        group_id: GroupId,
    },
    ListGroups,
    OpenGroup {
        group_id: GroupId,
        password: String,
    },
    OpenGroupsByPassword {
        password: String,
    },
    CloseGroups {
        group_ids: Vec<GroupId>,
    },
    CloseAllGroups,

    // Storages
    CreateStorage {
        name: String,
        description: Option<String>,
        visibility_group_id: Option<GroupId>,
    },
    InitialiseStorage {
        storage_id: StorageId,
    },
    CloseStorage {
        storage_id: StorageId,
    },
    TerminateStorage {
        storage_id: StorageId,
    },
    GetStorage {
        storage_id: StorageId,
    },
    ListStorages,

    // Boxes
    CreateBox {
        storage_id: StorageId,
        name: String,
        description: Option<String>,
    },
    DeleteBox {
        storage_id: StorageId,
        box_id: BoxId,
    },
    ListBoxes {
        storage_id: StorageId,
    },

    // Templates
    CreateTemplate {
        storage_id: StorageId,
        box_id: BoxId,
        name: String,
        description: Option<String>,
        fields: Vec<FieldSpec>,
    },
    DeleteTemplate {
        storage_id: StorageId,
        template_id: TemplateId,
    },
    ListTemplates {
        storage_id: StorageId,
        box_id: Option<BoxId>,
    },

    // Entries
    CreateEntry {
        storage_id: StorageId,
        template_id: TemplateId,
        values: Vec<Value>,
    },
    UpdateEntry {
        storage_id: StorageId,
        entry_id: EntryId,
        values: Vec<Value>,
    },
    GetEntry {
        storage_id: StorageId,
        entry_id: EntryId,
    },
    DeleteEntry {
        storage_id: StorageId,
        entry_id: EntryId,
    },
    ListEntries {
        storage_id: StorageId,
        template_id: Option<TemplateId>,
    },
}

impl VaultRequest {
    /// Operation name for logs. Never includes arguments.
    pub fn op(&self) -> &'static str {
        match self {
            Self::SignUp { .. } => "signUp",
            Self::SignIn { .. } => "signIn",
            Self::SignOut => "signOut",
            Self::CreateGroup { .. } => "createGroup",
            Self::DeleteGroup { .. } => "deleteGroup",
            Self::ListGroups => "listGroups",
            Self::OpenGroup { .. } => "openGroup",
            Self::OpenGroupsByPassword { .. } => "openGroupsByPassword",
            Self::CloseGroups { .. } => "closeGroups",
            Self::CloseAllGroups => "closeAllGroups",
            Self::CreateStorage { .. } => "createStorage",
            Self::InitialiseStorage { .. } => "initialiseStorage",
            Self::CloseStorage { .. } => "closeStorage",
            Self::TerminateStorage { .. } => "terminateStorage",
            Self::GetStorage { .. } => "getStorage",
            Self::ListStorages => "listStorages",
            Self::CreateBox { .. } => "createBox",
            Self::DeleteBox { .. } => "deleteBox",
            Self::ListBoxes { .. } => "listBoxes",
            Self::CreateTemplate { .. } => "createTemplate",
            Self::DeleteTemplate { .. } => "deleteTemplate",
            Self::ListTemplates { .. } => "listTemplates",
            Self::CreateEntry { .. } => "createEntry",
            Self::UpdateEntry { .. } => "updateEntry",
            Self::GetEntry { .. } => "getEntry",
            Self::DeleteEntry { .. } => "deleteEntry",
            Self::ListEntries { .. } => "listEntries",
        }
    }
}

/// Successful results, tagged by `"kind"` with the value under `"data"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "kind",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Reply {
    Account(AccountInfo),
    /// `None` for an unknown user or a wrong password.
    SignIn(Option<AccountInfo>),
    SignedOut,
    CreatedGroup(Changed<GroupInfo>),
    Groups(Vec<GroupInfo>),
    /// Whether the password opened the group.
    GroupOpened(bool),
    /// Number of groups the password opened.
    GroupsOpened(usize),
    Closed {
        groups: Vec<GroupId>,
        storages: Vec<StorageId>,
    },
    CreatedStorage(Changed<StorageInfo>),
    /// Initialise, close or terminate. A terminated storage reports the
    /// `terminated` state and its id under `diff.removed`.
    StorageChanged(Changed<StorageInfo>),
    Storage(StorageInfo),
    Storages(Vec<StorageInfo>),
    CreatedBox(Changed<BoxInfo>),
    Boxes(Vec<BoxInfo>),
    CreatedTemplate(Changed<TemplateInfo>),
    Templates(Vec<TemplateInfo>),
    CreatedEntry(Changed<EntryInfo>),
    UpdatedEntry(Changed<EntryInfo>),
    Entry(EntryInfo),
    Entries(Vec<EntryInfo>),
    /// Result of a delete.
    Removed(Diff),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    AuthFailure,
    GroupLocked,
    ValidationFailure,
    NotUnique,
    NotFound,
    InvalidState,
    InvalidInput,
    InvalidTemplate,
    NotSignedIn,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum VaultResponse {
    Ok {
        result: Reply,
    },
    Error {
        kind: ErrorKind,
        message: String,
        /// Index of the offending value for `validationFailure`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field_index: Option<usize>,
    },
}

impl VaultResponse {
    pub fn ok(result: Reply) -> Self {
        Self::Ok { result }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn create_storage_parses_with_null_group() {
        let request: VaultRequest = serde_json::from_value(json!({
            "op": "createStorage",
            "name": "Vault1",
            "visibilityGroupId": null
        }))
        .unwrap();
        assert_eq!(
            request,
            VaultRequest::CreateStorage {
                name: "Vault1".into(),
                description: None,
                visibility_group_id: None,
            }
        );
        assert_eq!(request.op(), "createStorage");
    }

    #[test]
    fn unit_requests_need_only_op() {
        let request: VaultRequest = serde_json::from_value(json!({ "op": "signOut" })).unwrap();
        assert_eq!(request, VaultRequest::SignOut);
    }

    #[test]
    fn unknown_op_is_rejected() {
        assert!(serde_json::from_value::<VaultRequest>(json!({ "op": "dropAll" })).is_err());
    }

    #[test]
    fn response_wire_shape() {
        let ok = VaultResponse::ok(Reply::GroupsOpened(2));
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({ "status": "ok", "result": { "kind": "groupsOpened", "data": 2 } })
        );

        let err = VaultResponse::Error {
            kind: ErrorKind::ValidationFailure,
            message: "value 1 ('count'): above maximum".into(),
            field_index: Some(1),
        };
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({
                "status": "error",
                "kind": "validationFailure",
                "message": "value 1 ('count'): above maximum",
                "fieldIndex": 1
            })
        );
    }

    #[test]
    fn signed_out_roundtrips() {
        let ok = VaultResponse::ok(Reply::SignedOut);
        let json = serde_json::to_string(&ok).unwrap();
        assert_eq!(serde_json::from_str::<VaultResponse>(&json).unwrap(), ok);
    }
}
