//! Group directory cache behind the two group selectors.

use tracing::debug;

use crate::api::{Gateway, GatewayError};
use crate::models::Group;
use crate::utils::contains_ignore_case;

/// Which of the two selectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Children are moved from here
    Source,
    /// Children are moved to here
    Target,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    pub filter: String,
    pub selected: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOption {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Default)]
pub struct GroupDirectory {
    groups: Vec<Group>,
    source: Selector,
    target: Selector,
}

impl GroupDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch all groups and reconcile both selectors.
    /// On error the previous list and selections stay as they were.
    pub async fn load_groups<G: Gateway + ?Sized>(&mut self, gateway: &G) -> Result<(), GatewayError> {
        let groups = gateway.fetch_groups().await?;
        self.replace(groups);
        Ok(())
    }

    /// Install a freshly fetched group list (in gateway order)
    pub fn replace(&mut self, groups: Vec<Group>) {
        debug!(count = groups.len(), "Group directory replaced");
        self.groups = groups;
        self.reconcile();
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn get(&self, id: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn selector(&self, side: Side) -> &Selector {
        match side {
            Side::Source => &self.source,
            Side::Target => &self.target,
        }
    }

    fn selector_mut(&mut self, side: Side) -> &mut Selector {
        match side {
            Side::Source => &mut self.source,
            Side::Target => &mut self.target,
        }
    }

    pub fn selected(&self, side: Side) -> Option<&str> {
        self.selector(side).selected.as_deref()
    }

    /// Groups matching the side's filter, in directory order
    pub fn options(&self, side: Side) -> Vec<GroupOption> {
        let filter = &self.selector(side).filter;
        self.groups
            .iter()
            .map(|g| GroupOption {
                id: g.id.clone(),
                label: g.label(),
            })
            .filter(|opt| contains_ignore_case(&opt.label, filter))
            .collect()
    }

    fn option_ids(&self, side: Side) -> Vec<String> {
        self.options(side).into_iter().map(|o| o.id).collect()
    }

    /// Change a selector's filter text and re-pick selections
    pub fn set_filter(&mut self, side: Side, filter: &str) {
        self.selector_mut(side).filter = filter.to_string();
        self.reconcile();
    }

    /// Explicit user choice. Ids missing from the side's options are ignored.
    /// A new source moves the target off it; an explicit target pick equal
    /// to the source stands and moves refuse it.
    pub fn select(&mut self, side: Side, id: Option<&str>) {
        let id = id.filter(|id| self.option_ids(side).iter().any(|o| o == id));
        if side == Side::Target && id.is_none() && !self.option_ids(side).is_empty() {
            // The target selector has no placeholder entry
            return;
        }
        self.selector_mut(side).selected = id.map(str::to_string);
        if side == Side::Source {
            self.resolve_collision();
        }
    }

    /// Move the target to its first option that differs from the source
    fn resolve_collision(&mut self) {
        if self.target.selected.is_some() && self.target.selected == self.source.selected {
            let source = self.source.selected.clone();
            self.target.selected = self
                .option_ids(Side::Target)
                .into_iter()
                .find(|id| Some(id) != source.as_ref());
        }
    }

    /// Keep selections that survived, fall back otherwise (source to the
    /// placeholder, target to its first option), then move the target off
    /// the source group if they collide.
    pub fn reconcile(&mut self) {
        let source_ids = self.option_ids(Side::Source);
        if !self
            .source
            .selected
            .as_ref()
            .is_some_and(|id| source_ids.contains(id))
        {
            self.source.selected = None;
        }

        let target_ids = self.option_ids(Side::Target);
        if !self
            .target
            .selected
            .as_ref()
            .is_some_and(|id| target_ids.contains(id))
        {
            self.target.selected = target_ids.first().cloned();
        }

        self.resolve_collision();
    }

    /// Distinct academic years (`2024-2025`), sorted
    pub fn year_keys(&self) -> Vec<String> {
        let mut years: Vec<String> = self.groups.iter().map(Group::year_key).collect();
        years.sort();
        years.dedup();
        years
    }
}
