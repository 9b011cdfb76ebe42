//! In-memory gateway for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::{Gateway, GatewayError};
use crate::models::{Group, GroupDraft, RosterEntry};

pub(crate) fn group(id: &str, name: &str, year_start: i32) -> Group {
    Group {
        id: id.to_string(),
        name: name.to_string(),
        year_start,
        year_end: year_start + 1,
        study_start_date: None,
        study_end_date: None,
    }
}

pub(crate) fn child(child_id: &str, group_id: &str, last: &str, first: &str) -> RosterEntry {
    RosterEntry {
        child_id: child_id.to_string(),
        group_id: group_id.to_string(),
        last_name: Some(last.to_string()),
        first_name: Some(first.to_string()),
        middle_name: None,
        birth_date: None,
    }
}

#[derive(Default)]
struct FakeState {
    groups: Vec<Group>,
    roster: Vec<RosterEntry>,
    query_error: Option<String>,
    transfer_failures: HashMap<String, String>,
    calls: Vec<String>,
    next_id: u32,
}

/// Behaves like the hosted gateway: sorted group reads, per-child transfer
/// procedure, delete refused while a group has members. Records every call.
pub(crate) struct FakeGateway {
    state: Mutex<FakeState>,
}

impl FakeGateway {
    pub(crate) fn new(groups: Vec<Group>, roster: Vec<RosterEntry>) -> Self {
        Self {
            state: Mutex::new(FakeState {
                groups,
                roster,
                next_id: 100,
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake gateway lock")
    }

    pub(crate) fn fail_queries(&self, message: &str) {
        self.state().query_error = Some(message.to_string());
    }

    pub(crate) fn fail_transfer(&self, child_id: &str, message: &str) {
        self.state()
            .transfer_failures
            .insert(child_id.to_string(), message.to_string());
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub(crate) fn groups(&self) -> Vec<Group> {
        self.state().groups.clone()
    }

    fn query_guard(&self, call: &str) -> Result<(), GatewayError> {
        let mut state = self.state();
        state.calls.push(call.to_string());
        match state.query_error {
            Some(ref message) => Err(GatewayError::ServerError(message.clone())),
            None => Ok(()),
        }
    }
}

fn apply_draft(group: &mut Group, draft: &GroupDraft) {
    group.name = draft.name.clone();
    group.year_start = draft.year_start;
    group.year_end = draft.year_end;
    group.study_start_date = draft.study_start_date;
    group.study_end_date = draft.study_end_date;
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn fetch_groups(&self) -> Result<Vec<Group>, GatewayError> {
        self.query_guard("fetch_groups")?;
        let mut groups = self.state().groups.clone();
        groups.sort_by(|a, b| a.year_start.cmp(&b.year_start).then_with(|| a.name.cmp(&b.name)));
        Ok(groups)
    }

    async fn fetch_roster(&self) -> Result<Vec<RosterEntry>, GatewayError> {
        self.query_guard("fetch_roster")?;
        Ok(self.state().roster.clone())
    }

    async fn transfer_child(&self, child_id: &str, group_id: &str) -> Result<(), GatewayError> {
        let mut state = self.state();
        state.calls.push(format!("transfer {} -> {}", child_id, group_id));
        if let Some(message) = state.transfer_failures.get(child_id) {
            return Err(GatewayError::Rejected {
                code: Some("P0001".to_string()),
                message: message.clone(),
            });
        }
        match state.roster.iter_mut().find(|c| c.child_id == child_id) {
            Some(entry) => {
                entry.group_id = group_id.to_string();
                Ok(())
            }
            None => Err(GatewayError::Rejected {
                code: None,
                message: format!("Child {} not found", child_id),
            }),
        }
    }

    async fn create_group(&self, draft: &GroupDraft) -> Result<(), GatewayError> {
        let mut state = self.state();
        state.calls.push(format!("groups_create {}", draft.name));
        state.next_id += 1;
        let mut created = group(&state.next_id.to_string(), "", 0);
        apply_draft(&mut created, draft);
        state.groups.push(created);
        Ok(())
    }

    async fn update_group(&self, group_id: &str, draft: &GroupDraft) -> Result<(), GatewayError> {
        let mut state = self.state();
        state.calls.push(format!("groups_update {}", group_id));
        match state.groups.iter_mut().find(|g| g.id == group_id) {
            Some(existing) => {
                apply_draft(existing, draft);
                Ok(())
            }
            None => Err(GatewayError::NotFound(group_id.to_string())),
        }
    }

    async fn delete_group_if_empty(&self, group_id: &str) -> Result<(), GatewayError> {
        let mut state = self.state();
        state.calls.push(format!("groups_delete_if_empty {}", group_id));
        if state.roster.iter().any(|c| c.group_id == group_id) {
            return Err(GatewayError::Rejected {
                code: Some("P0001".to_string()),
                message: "Group still has children".to_string(),
            });
        }
        state.groups.retain(|g| g.id != group_id);
        Ok(())
    }
}
