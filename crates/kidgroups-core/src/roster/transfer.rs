//! Moving children between groups.
//!
//! The gateway offers one procedure per child, so a move of N children is N
//! sequential round trips. Each call is atomic on its own; a run as a whole
//! is not, and nothing is rolled back. The report says exactly which
//! children moved.

use tracing::{error, info};

use crate::api::Gateway;

use super::ValidationError;

/// What to do after a child fails to move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferPolicy {
    /// Skip the remaining children after the first failure
    #[default]
    StopOnFirstError,
    /// Attempt every child and report each failure
    BestEffort,
}

impl TransferPolicy {
    pub fn label(&self) -> &'static str {
        match self {
            TransferPolicy::StopOnFirstError => "stop on error",
            TransferPolicy::BestEffort => "best effort",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            TransferPolicy::StopOnFirstError => TransferPolicy::BestEffort,
            TransferPolicy::BestEffort => TransferPolicy::StopOnFirstError,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Moved,
    Failed { reason: String },
    /// Not attempted because an earlier child failed
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferItem {
    pub child_id: String,
    pub outcome: TransferOutcome,
}

/// Validated move: both groups chosen, distinct, at least one child
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub source_group_id: String,
    pub target_group_id: String,
    pub child_ids: Vec<String>,
}

impl TransferRequest {
    pub fn new(
        source: Option<&str>,
        target: Option<&str>,
        child_ids: Vec<String>,
    ) -> Result<Self, ValidationError> {
        let source = source.ok_or(ValidationError::NoSourceGroup)?;
        let target = target.ok_or(ValidationError::NoTargetGroup)?;
        if source == target {
            return Err(ValidationError::SameGroup);
        }
        if child_ids.is_empty() {
            return Err(ValidationError::NothingSelected);
        }
        Ok(Self {
            source_group_id: source.to_string(),
            target_group_id: target.to_string(),
            child_ids,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub target_group_id: String,
    pub items: Vec<TransferItem>,
}

impl TransferReport {
    pub fn moved(&self) -> impl Iterator<Item = &str> {
        self.items
            .iter()
            .filter(|i| i.outcome == TransferOutcome::Moved)
            .map(|i| i.child_id.as_str())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().filter_map(|i| match &i.outcome {
            TransferOutcome::Failed { reason } => Some((i.child_id.as_str(), reason.as_str())),
            _ => None,
        })
    }

    pub fn skipped_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.outcome == TransferOutcome::Skipped)
            .count()
    }

    pub fn is_complete(&self) -> bool {
        self.items.iter().all(|i| i.outcome == TransferOutcome::Moved)
    }

    /// One-paragraph summary for an alert. `name_of` turns ids into names.
    pub fn summary(&self, name_of: impl Fn(&str) -> String) -> String {
        let moved = self.moved().count();
        let total = self.items.len();
        if self.is_complete() {
            return format!("Moved {} of {} children.", moved, total);
        }

        let mut text = format!("Moved {} of {} children.", moved, total);
        for (child_id, reason) in self.failures() {
            text.push_str(&format!(" Failed: {}: {}.", name_of(child_id), reason));
        }
        let skipped = self.skipped_count();
        if skipped > 0 {
            text.push_str(&format!(" Not attempted: {}.", skipped));
        }
        text
    }
}

/// Call the transfer procedure once per child, in order, awaiting each call.
pub async fn move_children<G: Gateway + ?Sized>(
    gateway: &G,
    request: &TransferRequest,
    policy: TransferPolicy,
) -> TransferReport {
    let target = &request.target_group_id;
    let mut items = Vec::with_capacity(request.child_ids.len());
    let mut halted = false;

    for child_id in &request.child_ids {
        if halted {
            items.push(TransferItem {
                child_id: child_id.clone(),
                outcome: TransferOutcome::Skipped,
            });
            continue;
        }

        let outcome = match gateway.transfer_child(child_id, target).await {
            Ok(()) => TransferOutcome::Moved,
            Err(e) => {
                error!(child_id = %child_id, group_id = %target, error = %e, "Transfer failed");
                halted = policy == TransferPolicy::StopOnFirstError;
                TransferOutcome::Failed {
                    reason: e.user_message(),
                }
            }
        };
        items.push(TransferItem {
            child_id: child_id.clone(),
            outcome,
        });
    }

    let report = TransferReport {
        target_group_id: target.clone(),
        items,
    };
    info!(
        from = %request.source_group_id,
        to = %target,
        moved = report.moved().count(),
        requested = request.child_ids.len(),
        "Transfer finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::{fetch_snapshot, Console, Side};
    use crate::testing::{child, group, FakeGateway};

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn gateway() -> FakeGateway {
        FakeGateway::new(
            vec![group("g1", "Сонечко", 2024), group("g2", "Ромашка", 2024)],
            vec![
                child("c1", "g1", "Шевченко", "Тарас"),
                child("c2", "g1", "Коваль", "Олена"),
                child("c3", "g1", "Бойко", "Іван"),
            ],
        )
    }

    #[test]
    fn test_request_preconditions() {
        assert_eq!(
            TransferRequest::new(None, Some("g2"), ids(&["c1"])),
            Err(ValidationError::NoSourceGroup)
        );
        assert_eq!(
            TransferRequest::new(Some("g1"), None, ids(&["c1"])),
            Err(ValidationError::NoTargetGroup)
        );
        assert_eq!(
            TransferRequest::new(Some("g1"), Some("g1"), ids(&["c1"])),
            Err(ValidationError::SameGroup)
        );
        assert_eq!(
            TransferRequest::new(Some("g1"), Some("g2"), vec![]),
            Err(ValidationError::NothingSelected)
        );
        assert!(TransferRequest::new(Some("g1"), Some("g2"), ids(&["c1"])).is_ok());
    }

    #[tokio::test]
    async fn test_moves_each_child_sequentially() {
        let gw = gateway();
        let request = TransferRequest::new(Some("g1"), Some("g2"), ids(&["c1", "c2"])).unwrap();
        let report = move_children(&gw, &request, TransferPolicy::default()).await;

        assert!(report.is_complete());
        assert_eq!(report.moved().collect::<Vec<_>>(), vec!["c1", "c2"]);
        assert_eq!(gw.calls(), vec!["transfer c1 -> g2", "transfer c2 -> g2"]);
        assert_eq!(report.summary(|id| id.to_string()), "Moved 2 of 2 children.");
    }

    #[tokio::test]
    async fn test_first_failure_stops_remaining_children() {
        let gw = gateway();
        gw.fail_transfer("c2", "Child is archived");
        let request =
            TransferRequest::new(Some("g1"), Some("g2"), ids(&["c1", "c2", "c3"])).unwrap();
        let report = move_children(&gw, &request, TransferPolicy::StopOnFirstError).await;

        assert_eq!(
            report.items.iter().map(|i| i.outcome.clone()).collect::<Vec<_>>(),
            vec![
                TransferOutcome::Moved,
                TransferOutcome::Failed {
                    reason: "Child is archived".to_string()
                },
                TransferOutcome::Skipped,
            ]
        );
        // c3 was never sent
        assert_eq!(gw.calls().len(), 2);
        assert_eq!(
            report.summary(|id| format!("<{}>", id)),
            "Moved 1 of 3 children. Failed: <c2>: Child is archived. Not attempted: 1."
        );
    }

    #[tokio::test]
    async fn test_best_effort_attempts_every_child() {
        let gw = gateway();
        gw.fail_transfer("c2", "Child is archived");
        let request =
            TransferRequest::new(Some("g1"), Some("g2"), ids(&["c1", "c2", "c3"])).unwrap();
        let report = move_children(&gw, &request, TransferPolicy::BestEffort).await;

        assert_eq!(report.moved().collect::<Vec<_>>(), vec!["c1", "c3"]);
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.skipped_count(), 0);
        assert_eq!(gw.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_partial_failure_is_visible_after_reload() {
        let gw = FakeGateway::new(
            vec![group("g1", "Сонечко", 2024), group("g2", "Ромашка", 2024)],
            vec![
                child("c1", "g1", "Шевченко", "Тарас"),
                child("c2", "g1", "Коваль", "Олена"),
            ],
        );
        gw.fail_transfer("c2", "Child is archived");

        let mut console = Console::new();
        console.apply_snapshot(fetch_snapshot(&gw).await.unwrap());
        console.directory.select(Side::Source, Some("g1"));
        console.directory.select(Side::Target, Some("g2"));

        let request = TransferRequest::new(
            console.directory.selected(Side::Source),
            console.directory.selected(Side::Target),
            ids(&["c1", "c2"]),
        )
        .unwrap();
        let report = move_children(&gw, &request, TransferPolicy::default()).await;
        let message = report.summary(|id| {
            console
                .roster
                .find(id)
                .map(|c| c.full_name())
                .unwrap_or_else(|| id.to_string())
        });
        assert!(message.contains("Коваль Олена: Child is archived"));

        console.apply_snapshot(fetch_snapshot(&gw).await.unwrap());
        assert_eq!(console.roster.child_ids("g1"), vec!["c2"]);
        assert_eq!(console.roster.child_ids("g2"), vec!["c1"]);
    }
}
