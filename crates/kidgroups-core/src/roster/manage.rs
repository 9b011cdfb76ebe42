//! Group management modal: browse groups by academic year, create, edit
//! and delete them.
//!
//! The modal is either closed or open. Opening always starts from a blank
//! form and a year filter rebuilt from the loaded directory.

use chrono::NaiveDate;
use tracing::info;

use crate::api::{Gateway, GatewayError};
use crate::models::{Group, GroupDraft};

use super::{GroupDirectory, ValidationError};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormField {
    #[default]
    Name,
    YearStart,
    YearEnd,
    StudyStart,
    StudyEnd,
}

impl FormField {
    pub const ALL: [FormField; 5] = [
        FormField::Name,
        FormField::YearStart,
        FormField::YearEnd,
        FormField::StudyStart,
        FormField::StudyEnd,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FormField::Name => "Name",
            FormField::YearStart => "Start year",
            FormField::YearEnd => "End year",
            FormField::StudyStart => "Study start",
            FormField::StudyEnd => "Study end",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            FormField::Name => FormField::YearStart,
            FormField::YearStart => FormField::YearEnd,
            FormField::YearEnd => FormField::StudyStart,
            FormField::StudyStart => FormField::StudyEnd,
            FormField::StudyEnd => FormField::Name,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            FormField::Name => FormField::StudyEnd,
            FormField::YearStart => FormField::Name,
            FormField::YearEnd => FormField::YearStart,
            FormField::StudyStart => FormField::YearEnd,
            FormField::StudyEnd => FormField::StudyStart,
        }
    }
}

/// Plain text form; an id means "update", no id means "create"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupForm {
    pub group_id: Option<String>,
    pub name: String,
    pub year_start: String,
    pub year_end: String,
    pub study_start: String,
    pub study_end: String,
}

impl GroupForm {
    pub fn from_group(group: &Group) -> Self {
        Self {
            group_id: Some(group.id.clone()),
            name: group.name.clone(),
            year_start: group.year_start.to_string(),
            year_end: group.year_end.to_string(),
            study_start: group
                .study_start_date
                .map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_default(),
            study_end: group
                .study_end_date
                .map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_default(),
        }
    }

    pub fn field(&self, field: FormField) -> &str {
        match field {
            FormField::Name => &self.name,
            FormField::YearStart => &self.year_start,
            FormField::YearEnd => &self.year_end,
            FormField::StudyStart => &self.study_start,
            FormField::StudyEnd => &self.study_end,
        }
    }

    pub fn field_mut(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::Name => &mut self.name,
            FormField::YearStart => &mut self.year_start,
            FormField::YearEnd => &mut self.year_end,
            FormField::StudyStart => &mut self.study_start,
            FormField::StudyEnd => &mut self.study_end,
        }
    }

    pub fn is_edit(&self) -> bool {
        self.group_id.is_some()
    }

    /// Client-side checks, in the order the user should fix them
    pub fn validate(&self) -> Result<GroupDraft, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::NameRequired);
        }

        let (start, end) = (self.year_start.trim(), self.year_end.trim());
        if start.is_empty() || end.is_empty() {
            return Err(ValidationError::YearRequired);
        }
        let year_start = parse_year(start)?;
        let year_end = parse_year(end)?;
        if year_end < year_start {
            return Err(ValidationError::YearOrder);
        }

        let study_start_date = parse_date(FormField::StudyStart.label(), &self.study_start)?;
        let study_end_date = parse_date(FormField::StudyEnd.label(), &self.study_end)?;
        if let (Some(s), Some(e)) = (study_start_date, study_end_date) {
            if e < s {
                return Err(ValidationError::DateOrder);
            }
        }

        Ok(GroupDraft {
            name: name.to_string(),
            year_start,
            year_end,
            study_start_date,
            study_end_date,
        })
    }

    pub fn save_action(&self) -> Result<SaveAction, ValidationError> {
        let draft = self.validate()?;
        Ok(match self.group_id {
            Some(ref id) => SaveAction::Update {
                group_id: id.clone(),
                draft,
            },
            None => SaveAction::Create(draft),
        })
    }
}

fn parse_year(value: &str) -> Result<i32, ValidationError> {
    value
        .parse::<i32>()
        .map_err(|_| ValidationError::InvalidYear(value.to_string()))
}

fn parse_date(field: &'static str, value: &str) -> Result<Option<NaiveDate>, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map(Some)
        .map_err(|_| ValidationError::InvalidDate {
            field,
            value: value.to_string(),
        })
}

/// A validated save, ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveAction {
    Create(GroupDraft),
    Update { group_id: String, draft: GroupDraft },
}

impl SaveAction {
    /// `groups_create` or `groups_update`
    pub async fn apply<G: Gateway + ?Sized>(&self, gateway: &G) -> Result<(), GatewayError> {
        match self {
            SaveAction::Create(draft) => {
                gateway.create_group(draft).await?;
                info!(name = %draft.name, "Group created");
            }
            SaveAction::Update { group_id, draft } => {
                gateway.update_group(group_id, draft).await?;
                info!(group_id = %group_id, "Group updated");
            }
        }
        Ok(())
    }

    pub fn done_message(&self) -> String {
        match self {
            SaveAction::Create(draft) => format!("Group \"{}\" created", draft.name),
            SaveAction::Update { draft, .. } => format!("Group \"{}\" saved", draft.name),
        }
    }
}

/// `groups_delete_if_empty`; the gateway refuses groups that still have children
pub async fn delete_group<G: Gateway + ?Sized>(gateway: &G, group_id: &str) -> Result<(), GatewayError> {
    gateway.delete_group_if_empty(group_id).await?;
    info!(group_id = %group_id, "Group deleted");
    Ok(())
}

#[derive(Debug, Default)]
pub struct GroupManager {
    open: bool,
    years: Vec<String>,
    year: Option<String>,
    /// Cursor in the visible group list
    pub selection: usize,
    pub form: GroupForm,
    pub field: FormField,
}

impl GroupManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, directory: &GroupDirectory) {
        self.open = true;
        self.clear_form();
        self.years = directory.year_keys();
        self.year = None;
        self.selection = 0;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn years(&self) -> &[String] {
        &self.years
    }

    /// `None` while the "choose a year" placeholder is selected
    pub fn selected_year(&self) -> Option<&str> {
        self.year.as_deref()
    }

    pub fn choose_year(&mut self, year: Option<&str>) {
        self.year = year
            .filter(|y| self.years.iter().any(|known| known == y))
            .map(str::to_string);
        self.selection = 0;
    }

    /// Step through placeholder + years, wrapping around
    pub fn cycle_year(&mut self, forward: bool) {
        let slots = self.years.len() + 1;
        let current = match self.year {
            Some(ref y) => self.years.iter().position(|known| known == y).map_or(0, |i| i + 1),
            None => 0,
        };
        let next = if forward {
            (current + 1) % slots
        } else {
            (current + slots - 1) % slots
        };
        let year = if next == 0 {
            None
        } else {
            Some(self.years[next - 1].clone())
        };
        self.choose_year(year.as_deref());
    }

    /// Rebuild the year filter after the directory changed, keeping the
    /// chosen year when it still exists
    pub fn refresh_years(&mut self, directory: &GroupDirectory) {
        self.years = directory.year_keys();
        if let Some(ref y) = self.year {
            if !self.years.contains(y) {
                self.year = None;
            }
        }
        let visible = self.visible_groups(directory).len();
        self.selection = self.selection.min(visible.saturating_sub(1));
    }

    /// Groups of the chosen year; none while no year is chosen
    pub fn visible_groups<'a>(&self, directory: &'a GroupDirectory) -> Vec<&'a Group> {
        match self.year {
            Some(ref year) => directory
                .groups()
                .iter()
                .filter(|g| &g.year_key() == year)
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn selected_group<'a>(&self, directory: &'a GroupDirectory) -> Option<&'a Group> {
        self.visible_groups(directory).get(self.selection).copied()
    }

    pub fn move_selection(&mut self, directory: &GroupDirectory, down: bool) {
        let count = self.visible_groups(directory).len();
        if count == 0 {
            self.selection = 0;
        } else if down {
            self.selection = (self.selection + 1).min(count - 1);
        } else {
            self.selection = self.selection.saturating_sub(1);
        }
    }

    pub fn edit(&mut self, group: &Group) {
        self.form = GroupForm::from_group(group);
        self.field = FormField::Name;
    }

    pub fn clear_form(&mut self) {
        self.form = GroupForm::default();
        self.field = FormField::Name;
    }

    /// Called once a create/update/delete went through and the directory
    /// has been reloaded
    pub fn after_mutation(&mut self, directory: &GroupDirectory) {
        self.refresh_years(directory);
        self.clear_form();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::fetch_snapshot;
    use crate::roster::Console;
    use crate::testing::{child, group, FakeGateway};

    fn form(name: &str, start: &str, end: &str) -> GroupForm {
        GroupForm {
            name: name.to_string(),
            year_start: start.to_string(),
            year_end: end.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_required_fields() {
        assert_eq!(form("  ", "2024", "2025").validate(), Err(ValidationError::NameRequired));
        assert_eq!(form("Сонечко", "", "2025").validate(), Err(ValidationError::YearRequired));
        assert_eq!(
            form("Сонечко", "20x4", "2025").validate(),
            Err(ValidationError::InvalidYear("20x4".to_string()))
        );
    }

    #[test]
    fn test_validate_year_order() {
        assert_eq!(form("Сонечко", "2024", "2023").validate(), Err(ValidationError::YearOrder));
        assert!(form("Сонечко", "2024", "2024").validate().is_ok());
    }

    #[test]
    fn test_validate_study_dates() {
        let mut f = form("Сонечко", "2024", "2025");
        f.study_start = "2024-09-01".to_string();
        f.study_end = "2024-05-31".to_string();
        assert_eq!(f.validate(), Err(ValidationError::DateOrder));

        f.study_end = "31.05.2025".to_string();
        assert!(matches!(f.validate(), Err(ValidationError::InvalidDate { .. })));

        // A single date is fine; blanks become null
        f.study_end = String::new();
        let draft = f.validate().expect("valid");
        assert_eq!(draft.study_start_date, NaiveDate::from_ymd_opt(2024, 9, 1));
        assert_eq!(draft.study_end_date, None);
        assert_eq!(draft.name, "Сонечко");
    }

    #[test]
    fn test_save_action_depends_on_group_id() {
        let f = form("Сонечко", "2024", "2025");
        assert!(matches!(f.save_action(), Ok(SaveAction::Create(_))));

        let edit = GroupForm::from_group(&group("g7", "Сонечко", 2024));
        assert!(edit.is_edit());
        match edit.save_action() {
            Ok(SaveAction::Update { group_id, draft }) => {
                assert_eq!(group_id, "g7");
                assert_eq!(draft.year_end, 2025);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_form_field_cycle_visits_every_field() {
        let mut field = FormField::default();
        for expected in FormField::ALL {
            assert_eq!(field, expected);
            field = field.next();
        }
        assert_eq!(field, FormField::Name);
        assert_eq!(FormField::Name.prev(), FormField::StudyEnd);
    }

    #[test]
    fn test_open_resets_form_and_year_filter() {
        let mut dir = GroupDirectory::new();
        dir.replace(vec![group("1", "A", 2024), group("2", "B", 2023), group("3", "C", 2024)]);

        let mut manager = GroupManager::new();
        manager.open(&dir);
        manager.cycle_year(true);
        assert_eq!(manager.selected_year(), Some("2023-2024"));
        manager.edit(&dir.groups()[0]);
        assert!(manager.form.is_edit());

        manager.close();
        manager.open(&dir);
        assert!(manager.is_open());
        assert_eq!(manager.form, GroupForm::default());
        assert_eq!(manager.selected_year(), None);
        assert_eq!(manager.years(), ["2023-2024", "2024-2025"]);
        assert!(manager.visible_groups(&dir).is_empty());
    }

    #[test]
    fn test_year_filter_lists_matching_groups() {
        let mut dir = GroupDirectory::new();
        dir.replace(vec![group("1", "A", 2024), group("2", "B", 2023), group("3", "C", 2024)]);
        let mut manager = GroupManager::new();
        manager.open(&dir);

        manager.choose_year(Some("2024-2025"));
        let ids: Vec<&str> = manager.visible_groups(&dir).iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);

        manager.move_selection(&dir, true);
        manager.move_selection(&dir, true);
        assert_eq!(manager.selected_group(&dir).map(|g| g.id.as_str()), Some("3"));

        manager.cycle_year(true);
        assert_eq!(manager.selected_year(), None);
        manager.cycle_year(false);
        assert_eq!(manager.selected_year(), Some("2024-2025"));

        manager.choose_year(Some("1999-2000"));
        assert_eq!(manager.selected_year(), None);
    }

    #[tokio::test]
    async fn test_invalid_years_make_no_gateway_call() {
        let gw = FakeGateway::new(vec![], vec![]);
        let f = form("Сонечко", "2024", "2023");
        assert_eq!(f.save_action(), Err(ValidationError::YearOrder));
        assert!(gw.calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_then_reload_refreshes_year_filter() {
        let gw = FakeGateway::new(vec![group("1", "A", 2024)], vec![]);
        let mut console = Console::new();
        console.apply_snapshot(fetch_snapshot(&gw).await.unwrap());
        console.open_manager();
        console.manager.choose_year(Some("2024-2025"));

        *console.manager.form.field_mut(FormField::Name) = "Ромашка".to_string();
        *console.manager.form.field_mut(FormField::YearStart) = "2025".to_string();
        *console.manager.form.field_mut(FormField::YearEnd) = "2026".to_string();
        let action = console.manager.form.save_action().expect("valid form");
        action.apply(&gw).await.expect("create");
        assert_eq!(action.done_message(), "Group \"Ромашка\" created");

        console.apply_snapshot(fetch_snapshot(&gw).await.unwrap());
        console.manager.after_mutation(&console.directory);
        assert_eq!(console.manager.years(), ["2024-2025", "2025-2026"]);
        assert_eq!(console.manager.selected_year(), Some("2024-2025"));
        assert_eq!(console.manager.form, GroupForm::default());
    }

    #[tokio::test]
    async fn test_update_group_sends_id() {
        let gw = FakeGateway::new(vec![group("g1", "A", 2024)], vec![]);
        let mut f = GroupForm::from_group(&gw.groups()[0]);
        f.name = "Бджілка".to_string();
        f.save_action().unwrap().apply(&gw).await.expect("update");
        assert_eq!(gw.calls(), vec!["groups_update g1"]);
        assert_eq!(gw.groups()[0].name, "Бджілка");
    }

    #[tokio::test]
    async fn test_delete_refused_for_non_empty_group() {
        let gw = FakeGateway::new(
            vec![group("g1", "A", 2024), group("g2", "B", 2024)],
            vec![child("c1", "g1", "Шевченко", "Тарас")],
        );
        let err = delete_group(&gw, "g1").await.unwrap_err();
        assert_eq!(err.user_message(), "Group still has children");
        assert_eq!(gw.groups().len(), 2);

        delete_group(&gw, "g2").await.expect("empty group deletes");
        assert_eq!(gw.groups().len(), 1);
    }
}
