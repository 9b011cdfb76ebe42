use async_trait::async_trait;

use crate::models::{Group, GroupDraft, RosterEntry};

use super::GatewayError;

/// Table reads and remote procedures the transfer console depends on.
///
/// `GatewayClient` is the HTTP implementation; tests use an in-memory one.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// All groups ordered by year, then name
    async fn fetch_groups(&self) -> Result<Vec<Group>, GatewayError>;

    /// Every `child -> current group` row in one call
    async fn fetch_roster(&self) -> Result<Vec<RosterEntry>, GatewayError>;

    /// `transfer_child_to_group(p_child_id, p_group_id)`
    async fn transfer_child(&self, child_id: &str, group_id: &str) -> Result<(), GatewayError>;

    /// `groups_create(...)`
    async fn create_group(&self, draft: &GroupDraft) -> Result<(), GatewayError>;

    /// `groups_update(p_group_id, ...)`
    async fn update_group(&self, group_id: &str, draft: &GroupDraft) -> Result<(), GatewayError>;

    /// `groups_delete_if_empty(p_group_id)`; refused while the group has members
    async fn delete_group_if_empty(&self, group_id: &str) -> Result<(), GatewayError>;
}
