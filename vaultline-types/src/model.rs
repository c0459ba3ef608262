//! Plaintext content model shared by the store and its backends.

use crate::field::FieldSpec;
use crate::ids::{BoxId, StorageId, TemplateId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum username length in characters.
pub const USERNAME_MAX_LEN: usize = 50;

/// A validated account name: 1–50 characters of `[a-zA-Z0-9_]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidUsername {
    #[error("username must not be empty")]
    Empty,
    #[error("username longer than {USERNAME_MAX_LEN} characters")]
    TooLong,
    #[error("username may only contain letters, digits and underscores")]
    IllegalCharacter,
}

impl Username {
    pub fn parse(raw: &str) -> Result<Self, InvalidUsername> {
        if raw.is_empty() {
            return Err(InvalidUsername::Empty);
        }
        if raw.chars().count() > USERNAME_MAX_LEN {
            return Err(InvalidUsername::TooLong);
        }
        if !raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(InvalidUsername::IllegalCharacter);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Username {
    type Error = InvalidUsername;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Username> for String {
    fn from(name: Username) -> String {
        name.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which concrete backend a storage uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BackendKind {
    LocalSqlite,
    Memory,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LocalSqlite => "localSqlite",
            Self::Memory => "memory",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "localSqlite" => Some(Self::LocalSqlite),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Runtime lifecycle of a data storage.
///
/// `Configured → Initialised → Active ⇄ Closed → Terminated`. Only the
/// configuration is persisted; the state itself is process-local.
/// `Terminated` is reported once, by the terminate call that deletes the
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StorageState {
    Configured,
    Initialised,
    Active,
    Closed,
    Terminated,
}

impl StorageState {
    /// Whether box/template/entry operations may run.
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Initialised | Self::Active)
    }
}

/// A namespace inside one storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataBox {
    pub id: BoxId,
    pub storage_id: StorageId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// An ordered field schema for entries in one box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataTemplate {
    pub id: TemplateId,
    pub storage_id: StorageId,
    pub box_id: BoxId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<FieldSpec>,
}
