//! Data models for gateway rows.
//!
//! - `Group`: a kindergarten group with its enrollment years and study dates
//! - `GroupDraft`: validated fields for creating or updating a group
//! - `RosterEntry`: one child and the group currently holding it

pub mod child;
pub mod group;

pub use child::RosterEntry;
pub use group::{Group, GroupDraft};
