//! Group transfer console state.
//!
//! - `directory`: the group list behind the source and target selectors
//! - `cache`: the roster, children partitioned by their current group
//! - `transfer`: moving children to another group, one remote call each
//! - `manage`: the group management modal (create, edit, delete groups)
//! - `console`: the state object tying the above together
//!
//! Nothing here renders; the TUI turns these views into widgets.

pub mod cache;
pub mod console;
pub mod directory;
pub mod error;
pub mod manage;
pub mod transfer;

pub use cache::{Checklist, RosterCache, RosterRow};
pub use console::{Console, MoveScope, Snapshot};
pub use directory::{GroupDirectory, GroupOption, Selector, Side};
pub use error::ValidationError;
pub use manage::{FormField, GroupForm, GroupManager, SaveAction};
pub use transfer::{TransferItem, TransferOutcome, TransferPolicy, TransferReport, TransferRequest};

use futures::try_join;

use crate::api::{Gateway, GatewayError};

/// Fetch the directory and the roster concurrently.
pub async fn fetch_snapshot<G: Gateway + ?Sized>(gateway: &G) -> Result<Snapshot, GatewayError> {
    let (groups, roster) = try_join!(gateway.fetch_groups(), gateway.fetch_roster())?;
    Ok(Snapshot { groups, roster })
}
