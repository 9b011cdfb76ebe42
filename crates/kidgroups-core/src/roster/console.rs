//! The state object behind the transfer view.

use crate::models::{Group, RosterEntry};

use super::{
    Checklist, GroupDirectory, GroupManager, RosterCache, RosterRow, Side, TransferRequest,
    ValidationError,
};

/// Directory and roster fetched together
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub groups: Vec<Group>,
    pub roster: Vec<RosterEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveScope {
    /// Only the checked children
    Selected,
    /// Every child in the source group
    All,
}

#[derive(Debug, Default)]
pub struct Console {
    pub directory: GroupDirectory,
    pub roster: RosterCache,
    pub checked: Checklist,
    pub manager: GroupManager,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a fresh snapshot, then re-derive everything that depends on it
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        self.directory.replace(snapshot.groups);
        self.roster.replace(snapshot.roster);
        self.prune_checked();
        if self.manager.is_open() {
            self.manager.refresh_years(&self.directory);
        }
    }

    pub fn source_ids(&self) -> Vec<String> {
        self.directory
            .selected(Side::Source)
            .map(|id| self.roster.child_ids(id))
            .unwrap_or_default()
    }

    pub fn source_rows(&self) -> Vec<RosterRow> {
        self.roster
            .rows(self.directory.selected(Side::Source), Some(&self.checked))
    }

    pub fn target_rows(&self) -> Vec<RosterRow> {
        self.roster.rows(self.directory.selected(Side::Target), None)
    }

    pub fn select(&mut self, side: Side, id: Option<&str>) {
        self.directory.select(side, id);
        self.prune_checked();
    }

    pub fn set_filter(&mut self, side: Side, filter: &str) {
        self.directory.set_filter(side, filter);
        self.prune_checked();
    }

    /// Toggle a child on the source list; ids outside it are ignored
    pub fn toggle_child(&mut self, child_id: &str) {
        if self.source_ids().iter().any(|id| id == child_id) {
            self.checked.toggle(child_id);
        }
    }

    pub fn transfer_request(&self, scope: MoveScope) -> Result<TransferRequest, ValidationError> {
        let visible = self.source_ids();
        let ids = match scope {
            MoveScope::Selected => self.checked.in_order(&visible),
            MoveScope::All => visible,
        };
        TransferRequest::new(
            self.directory.selected(Side::Source),
            self.directory.selected(Side::Target),
            ids,
        )
    }

    pub fn open_manager(&mut self) {
        self.manager.open(&self.directory);
    }

    /// Display name for a child id, falling back to the id itself
    pub fn child_name(&self, child_id: &str) -> String {
        self.roster
            .find(child_id)
            .map(RosterEntry::full_name)
            .unwrap_or_else(|| child_id.to_string())
    }

    pub fn group_label(&self, group_id: &str) -> String {
        self.directory
            .get(group_id)
            .map(Group::label)
            .unwrap_or_else(|| group_id.to_string())
    }

    fn prune_checked(&mut self) {
        let visible = self.source_ids();
        self.checked.retain_visible(&visible);
    }
}
