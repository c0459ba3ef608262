//! Core types for Vaultline.
//!
//! Everything that crosses a crate boundary without carrying secrets lives
//! here: strongly-typed identifiers, the box → template → entry content
//! model, template field specifications, and the non-secret "info"
//! projections the display process is allowed to see.

mod diff;
mod field;
mod ids;
mod info;
mod model;

pub use diff::{Changed, Diff};
pub use field::{Bound, FieldKind, FieldSpec, NumericField, TextField};
pub use ids::{AccountId, BoxId, EntryId, GroupId, StorageId, TemplateId};
pub use info::{AccountInfo, BoxInfo, EntryInfo, GroupInfo, StorageInfo, TemplateInfo};
pub use model::{BackendKind, DataBox, DataTemplate, InvalidUsername, StorageState, Username};
