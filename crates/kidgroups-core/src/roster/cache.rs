//! Roster cache: every child keyed by the group currently holding it.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::api::{Gateway, GatewayError};
use crate::models::RosterEntry;

pub const NO_GROUP_SELECTED: &str = "Select a group";
pub const EMPTY_GROUP: &str = "No children in this group";

/// One rendered line of a roster list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterRow {
    Child {
        child_id: String,
        label: String,
        /// Checkbox state; `None` on the read-only (target) side
        checked: Option<bool>,
    },
    Placeholder(&'static str),
}

impl RosterRow {
    pub fn child_id(&self) -> Option<&str> {
        match self {
            RosterRow::Child { child_id, .. } => Some(child_id),
            RosterRow::Placeholder(_) => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct RosterCache {
    by_group: HashMap<String, Vec<RosterEntry>>,
    loaded_at: Option<DateTime<Utc>>,
}

impl RosterCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the whole `child -> current group` view and repartition it.
    /// On error the previous mapping stays in place.
    pub async fn load_children<G: Gateway + ?Sized>(&mut self, gateway: &G) -> Result<(), GatewayError> {
        let entries = gateway.fetch_roster().await?;
        self.replace(entries);
        Ok(())
    }

    /// Partition rows by group id; each bucket keeps gateway order
    pub fn replace(&mut self, entries: Vec<RosterEntry>) {
        let total = entries.len();
        let mut by_group: HashMap<String, Vec<RosterEntry>> = HashMap::new();
        for entry in entries {
            by_group.entry(entry.group_id.clone()).or_default().push(entry);
        }
        debug!(children = total, groups = by_group.len(), "Roster replaced");
        self.by_group = by_group;
        self.loaded_at = Some(Utc::now());
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    pub fn children(&self, group_id: &str) -> &[RosterEntry] {
        self.by_group.get(group_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn child_ids(&self, group_id: &str) -> Vec<String> {
        self.children(group_id)
            .iter()
            .map(|c| c.child_id.clone())
            .collect()
    }

    /// Look a child up in any bucket
    pub fn find(&self, child_id: &str) -> Option<&RosterEntry> {
        self.by_group
            .values()
            .flat_map(|bucket| bucket.iter())
            .find(|c| c.child_id == child_id)
    }

    pub fn total(&self) -> usize {
        self.by_group.values().map(Vec::len).sum()
    }

    /// Rows for one list. Pass `checked` for the selectable (source) side.
    /// Always at least one row: a placeholder stands in for "no group" and
    /// for an empty group.
    pub fn rows(&self, group_id: Option<&str>, checked: Option<&Checklist>) -> Vec<RosterRow> {
        let Some(group_id) = group_id else {
            return vec![RosterRow::Placeholder(NO_GROUP_SELECTED)];
        };
        let children = self.children(group_id);
        if children.is_empty() {
            return vec![RosterRow::Placeholder(EMPTY_GROUP)];
        }
        children
            .iter()
            .map(|child| RosterRow::Child {
                child_id: child.child_id.clone(),
                label: child.label(),
                checked: checked.map(|c| c.contains(&child.child_id)),
            })
            .collect()
    }
}

/// Checked child ids on the source list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checklist {
    ids: HashSet<String>,
}

impl Checklist {
    pub fn contains(&self, child_id: &str) -> bool {
        self.ids.contains(child_id)
    }

    pub fn toggle(&mut self, child_id: &str) {
        if !self.ids.remove(child_id) {
            self.ids.insert(child_id.to_string());
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Forget ids that are no longer in `visible`
    pub fn retain_visible(&mut self, visible: &[String]) {
        self.ids.retain(|id| visible.contains(id));
    }

    /// Checked ids in list order
    pub fn in_order(&self, visible: &[String]) -> Vec<String> {
        visible
            .iter()
            .filter(|id| self.ids.contains(*id))
            .cloned()
            .collect()
    }
}
