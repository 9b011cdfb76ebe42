//! Application state for the kidgroups console.
//!
//! `App` owns the gateway client, the session and the `Console` state from
//! `kidgroups-core`. Gateway work runs on spawned tasks that report back over
//! an mpsc channel; `check_background_tasks` applies the results on the UI
//! task, so rendering never waits on the network.

use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use kidgroups_core::api::{GatewayClient, GatewayError};
use kidgroups_core::auth::{self, AuthStatus, CredentialStore, Session};
use kidgroups_core::config::{Config, ENV_EMAIL, ENV_PASSWORD};
use kidgroups_core::roster::{
    fetch_snapshot, manage, transfer, Console, MoveScope, RosterRow, SaveAction, Side, Snapshot,
    TransferPolicy, TransferReport,
};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task channel. At most one load and one
/// mutation are in flight at a time.
const CHANNEL_BUFFER_SIZE: usize = 8;

const MAX_EMAIL_LENGTH: usize = 254;
const MAX_PASSWORD_LENGTH: usize = 128;
const MAX_FILTER_LENGTH: usize = 64;
pub const MAX_FORM_FIELD_LENGTH: usize = 80;

/// Number of rows to jump on page up/down
pub const PAGE_SCROLL_SIZE: usize = 10;

/// Wait before retrying a token refresh that failed on the network
const REFRESH_RETRY_SECS: u64 = 30;

// ============================================================================
// UI enums
// ============================================================================

/// Which pane of the transfer view has the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    SourceGroups,
    SourceChildren,
    TargetGroups,
    TargetChildren,
}

impl Focus {
    pub fn next(&self) -> Self {
        match self {
            Focus::SourceGroups => Focus::SourceChildren,
            Focus::SourceChildren => Focus::TargetGroups,
            Focus::TargetGroups => Focus::TargetChildren,
            Focus::TargetChildren => Focus::SourceGroups,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            Focus::SourceGroups => Focus::TargetChildren,
            Focus::SourceChildren => Focus::SourceGroups,
            Focus::TargetGroups => Focus::SourceChildren,
            Focus::TargetChildren => Focus::TargetGroups,
        }
    }

    pub fn side(&self) -> Side {
        match self {
            Focus::SourceGroups | Focus::SourceChildren => Side::Source,
            Focus::TargetGroups | Focus::TargetChildren => Side::Target,
        }
    }
}

/// Section of the group management modal with the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerFocus {
    Years,
    List,
    Form,
}

impl ManagerFocus {
    pub fn next(&self) -> Self {
        match self {
            ManagerFocus::Years => ManagerFocus::List,
            ManagerFocus::List => ManagerFocus::Form,
            ManagerFocus::Form => ManagerFocus::Years,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            ManagerFocus::Years => ManagerFocus::Form,
            ManagerFocus::List => ManagerFocus::Years,
            ManagerFocus::Form => ManagerFocus::List,
        }
    }
}

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    EditingFilter(Side),
    ManagingGroups,
    ShowingHelp,
    LoggingIn,
    ConfirmingQuit,
    Quitting,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFocus {
    Email,
    Password,
    Button,
}

/// An action waiting for a yes/no answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    DeleteGroup { group_id: String, label: String },
}

impl PendingAction {
    pub fn prompt(&self) -> String {
        match self {
            PendingAction::DeleteGroup { label, .. } => format!("Delete group {}?", label),
        }
    }
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Results sent from spawned gateway tasks back to the UI task.
///
/// Mutations carry the snapshot reloaded right after them, so the console is
/// only marked idle once the caches reflect the change.
enum TaskResult {
    /// Directory and roster fetched together
    Loaded(Result<Snapshot, GatewayError>),
    /// A transfer ran; the roster is always reloaded afterwards
    Transferred {
        report: TransferReport,
        reload: Result<Snapshot, GatewayError>,
    },
    /// A group was created, updated or deleted (or the gateway refused)
    GroupChanged {
        outcome: Result<String, GatewayError>,
        reload: Option<Result<Snapshot, GatewayError>>,
    },
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    // Core services
    pub config: Config,
    pub session: Session,
    pub client: GatewayClient,

    // Transfer view and group manager state
    pub console: Console,
    pub policy: TransferPolicy,

    // UI state
    pub state: AppState,
    pub focus: Focus,
    pub manager_focus: ManagerFocus,
    pub source_cursor: usize,
    pub target_cursor: usize,

    // Login form state
    pub login_email: String,
    pub login_password: String,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,
    pub user_email: Option<String>,

    // Overlays drawn on top of whatever state is active
    pub alert: Option<String>,
    pub pending: Option<PendingAction>,

    /// Label of the mutation in flight; blocks further mutations
    pub busy: Option<&'static str>,
    pub loading: bool,
    pub status_message: Option<String>,

    // Token renewal: a refused call asks for one refresh before login
    reauth_pending: bool,
    reauth_tried: bool,
    refresh_backoff: Option<Instant>,

    task_rx: mpsc::Receiver<TaskResult>,
    task_tx: mpsc::Sender<TaskResult>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let (url, key) = config.gateway()?;
        let client = GatewayClient::new(url, key)?;

        let cache_dir = config.cache_dir()?;
        let mut session = Session::new(cache_dir);
        match session.load() {
            Ok(found) => debug!(found, "Session loaded"),
            Err(e) => warn!(error = %e, "Failed to read session file"),
        }

        let login_email = std::env::var(ENV_EMAIL)
            .ok()
            .or_else(|| config.last_email.clone())
            .unwrap_or_default();
        let login_password = std::env::var(ENV_PASSWORD)
            .ok()
            .or_else(|| {
                if login_email.is_empty() {
                    None
                } else {
                    CredentialStore::get_password(&login_email).ok()
                }
            })
            .unwrap_or_default();

        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        Ok(Self {
            config,
            session,
            client,

            console: Console::new(),
            policy: TransferPolicy::default(),

            state: AppState::Normal,
            focus: Focus::SourceGroups,
            manager_focus: ManagerFocus::Years,
            source_cursor: 0,
            target_cursor: 0,

            login_email,
            login_password,
            login_focus: LoginFocus::Email,
            login_error: None,
            user_email: None,

            alert: None,
            pending: None,

            busy: None,
            loading: false,
            status_message: None,

            reauth_pending: false,
            reauth_tried: false,
            refresh_backoff: None,

            task_rx: rx,
            task_tx: tx,
        })
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Run the auth guard; load data when the session holds, else show login
    pub async fn authenticate(&mut self) {
        match auth::require_session(&mut self.session, &mut self.client).await {
            Ok(AuthStatus::Authenticated { email }) => {
                info!(email = ?email, "Session verified");
                self.user_email = email;
                self.reload();
            }
            Ok(AuthStatus::NeedsLogin) => self.start_login(),
            Err(e) => {
                error!(error = %e, "Session check failed");
                self.start_login();
                self.login_error = Some(e.user_message());
            }
        }
    }

    /// Show the login overlay
    pub fn start_login(&mut self) {
        self.state = AppState::LoggingIn;
        self.login_focus = if self.login_email.is_empty() {
            LoginFocus::Email
        } else {
            LoginFocus::Password
        };
        self.login_error = None;
    }

    /// Sign in with the credentials from the login form
    pub async fn attempt_login(&mut self) {
        let email = self.login_email.trim().to_string();
        let password = self.login_password.clone();

        if email.is_empty() || password.is_empty() {
            self.login_error = Some("Email and password required".to_string());
            return;
        }
        self.login_error = None;

        match auth::sign_in(&mut self.session, &mut self.client, &email, &password).await {
            Ok(data) => {
                if let Err(e) = CredentialStore::store(&email, &password) {
                    warn!(error = %e, "Failed to store credentials");
                }
                self.config.last_email = Some(email);
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }
                self.user_email = data.email;
                self.login_password.clear();
                self.reauth_tried = false;
                self.state = AppState::Normal;
                info!("Login successful");
                self.reload();
            }
            Err(e) => {
                error!(error = %e, "Login failed");
                self.login_error = Some(e.user_message());
            }
        }
    }

    /// Renew the access token when it is about to expire, or when a call was
    /// refused and one refresh has been requested. Runs on every loop tick;
    /// without either condition it returns without touching the network.
    pub async fn keep_session_fresh(&mut self) {
        if self.state == AppState::LoggingIn {
            return;
        }
        let backing_off = self.refresh_backoff.is_some_and(|until| Instant::now() < until);
        let expiring = self.session.needs_refresh() && !backing_off;
        if !self.reauth_pending && !expiring {
            return;
        }
        let retry = std::mem::take(&mut self.reauth_pending);

        match auth::refresh(&mut self.session, &mut self.client).await {
            Ok(()) => {
                info!(retry, "Session renewed");
                self.refresh_backoff = None;
                if retry {
                    self.reload();
                }
            }
            Err(GatewayError::NetworkError(e)) => {
                warn!(error = %e, "Session refresh failed, will retry");
                self.refresh_backoff =
                    Some(Instant::now() + Duration::from_secs(REFRESH_RETRY_SECS));
                if retry {
                    self.show_alert(GatewayError::NetworkError(e).user_message());
                }
            }
            Err(e) => {
                info!(error = %e, "Session refresh refused");
                self.start_login();
                self.login_error = Some(GatewayError::Unauthorized.user_message());
            }
        }
    }

    /// Revoke the session and go back to the login overlay
    pub async fn logout(&mut self) {
        if let Some(label) = self.busy {
            self.status_message = Some(format!("Wait for {} to finish", label));
            return;
        }
        auth::sign_out(&mut self.session, &mut self.client).await;
        self.console = Console::new();
        self.user_email = None;
        self.source_cursor = 0;
        self.target_cursor = 0;
        self.status_message = None;
        info!("Signed out");
        self.start_login();
    }

    // =========================================================================
    // Background tasks
    // =========================================================================

    async fn send_result(tx: &mpsc::Sender<TaskResult>, result: TaskResult) {
        if let Err(e) = tx.send(result).await {
            error!(error = %e, "Failed to send task result - channel closed");
        }
    }

    /// Refetch directory and roster. A running mutation reloads on its own,
    /// so a manual reload waits for it.
    pub fn reload(&mut self) {
        if self.loading {
            return;
        }
        if let Some(running) = self.busy {
            self.status_message = Some(format!("Wait for {} to finish", running));
            return;
        }
        self.loading = true;
        self.status_message = Some("Loading...".to_string());

        let client = self.client.clone();
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let result = fetch_snapshot(&client).await;
            Self::send_result(&tx, TaskResult::Loaded(result)).await;
        });
    }

    /// Refuse a mutation while another is running or a reload is in flight
    fn claim_busy(&mut self, label: &'static str) -> bool {
        let running = self.busy.or(self.loading.then_some("the reload"));
        if let Some(running) = running {
            self.status_message = Some(format!("Wait for {} to finish", running));
            return false;
        }
        self.busy = Some(label);
        true
    }

    /// "Move selected" or "Move all"
    pub fn start_transfer(&mut self, scope: MoveScope) {
        let request = match self.console.transfer_request(scope) {
            Ok(request) => request,
            Err(e) => {
                self.show_alert(e.to_string());
                return;
            }
        };
        if !self.claim_busy("the transfer") {
            return;
        }
        self.status_message = Some(format!("Moving {} children...", request.child_ids.len()));

        let client = self.client.clone();
        let tx = self.task_tx.clone();
        let policy = self.policy;
        tokio::spawn(async move {
            let report = transfer::move_children(&client, &request, policy).await;
            let reload = fetch_snapshot(&client).await;
            Self::send_result(&tx, TaskResult::Transferred { report, reload }).await;
        });
    }

    /// Validate the modal form and send create or update
    pub fn save_group(&mut self) {
        let action = match self.console.manager.form.save_action() {
            Ok(action) => action,
            Err(e) => {
                self.show_alert(e.to_string());
                return;
            }
        };
        if !self.claim_busy("the group save") {
            return;
        }
        self.spawn_group_change(GroupChange::Save(action));
    }

    /// Ask before deleting the group under the modal cursor
    pub fn request_delete(&mut self) {
        let Some(group) = self.console.manager.selected_group(&self.console.directory) else {
            return;
        };
        self.pending = Some(PendingAction::DeleteGroup {
            group_id: group.id.clone(),
            label: group.label(),
        });
    }

    pub fn confirm_pending(&mut self) {
        if let Some(PendingAction::DeleteGroup { group_id, .. }) = self.pending.take() {
            if self.claim_busy("the group delete") {
                self.spawn_group_change(GroupChange::Delete(group_id));
            }
        }
    }

    fn spawn_group_change(&mut self, change: GroupChange) {
        let client = self.client.clone();
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let outcome = match change {
                GroupChange::Save(action) => action
                    .apply(&client)
                    .await
                    .map(|()| action.done_message()),
                GroupChange::Delete(group_id) => manage::delete_group(&client, &group_id)
                    .await
                    .map(|()| "Group deleted".to_string()),
            };
            let reload = match outcome {
                Ok(_) => Some(fetch_snapshot(&client).await),
                Err(_) => None,
            };
            Self::send_result(&tx, TaskResult::GroupChanged { outcome, reload }).await;
        });
    }

    /// Apply every finished task result
    pub fn check_background_tasks(&mut self) {
        while let Ok(result) = self.task_rx.try_recv() {
            self.process_task_result(result);
        }
    }

    fn process_task_result(&mut self, result: TaskResult) {
        match result {
            TaskResult::Loaded(result) => {
                self.loading = false;
                if self.apply_reload(result) {
                    self.status_message = None;
                }
            }
            TaskResult::Transferred { report, reload } => {
                self.busy = None;
                let summary = report.summary(|id| self.console.child_name(id));
                self.apply_reload(reload);
                if self.state == AppState::LoggingIn {
                    // The login overlay owns the keys; no alert on top of it
                    self.status_message = Some(summary);
                } else if report.is_complete() {
                    self.status_message = Some(format!(
                        "{} Now in {}.",
                        summary,
                        self.console.group_label(&report.target_group_id)
                    ));
                } else {
                    let text = match self.alert.take() {
                        Some(reload_error) => format!("{} {}", summary, reload_error),
                        None => summary,
                    };
                    self.show_alert(text);
                }
            }
            TaskResult::GroupChanged { outcome, reload } => {
                self.busy = None;
                match outcome {
                    Ok(message) => {
                        info!(%message, "Group change applied");
                        if let Some(reload) = reload {
                            self.apply_reload(reload);
                        }
                        self.console.manager.after_mutation(&self.console.directory);
                        self.status_message = Some(message);
                    }
                    Err(e) => self.handle_gateway_error(e),
                }
            }
        }
    }

    /// Install a reloaded snapshot; returns false when the reload failed
    fn apply_reload(&mut self, result: Result<Snapshot, GatewayError>) -> bool {
        match result {
            Ok(snapshot) => {
                debug!(
                    groups = snapshot.groups.len(),
                    children = snapshot.roster.len(),
                    "Snapshot applied"
                );
                self.console.apply_snapshot(snapshot);
                self.clamp_cursors();
                self.reauth_tried = false;
                true
            }
            Err(e) => {
                self.handle_gateway_error(e);
                false
            }
        }
    }

    fn handle_gateway_error(&mut self, e: GatewayError) {
        error!(error = %e, "Gateway call failed");
        if matches!(e, GatewayError::Unauthorized) {
            if self.session.data.is_some() && !self.reauth_tried {
                self.reauth_tried = true;
                self.reauth_pending = true;
                self.status_message = Some("Session expired, renewing...".to_string());
            } else {
                self.start_login();
                self.login_error = Some(e.user_message());
            }
        } else {
            self.status_message = None;
            self.show_alert(e.user_message());
        }
    }

    pub fn show_alert(&mut self, message: impl Into<String>) {
        self.alert = Some(message.into());
    }

    // =========================================================================
    // Transfer view helpers
    // =========================================================================

    pub fn rows(&self, side: Side) -> Vec<RosterRow> {
        match side {
            Side::Source => self.console.source_rows(),
            Side::Target => self.console.target_rows(),
        }
    }

    pub fn cursor(&self, side: Side) -> usize {
        match side {
            Side::Source => self.source_cursor,
            Side::Target => self.target_cursor,
        }
    }

    pub fn move_cursor(&mut self, side: Side, delta: isize) {
        let len = self.rows(side).len();
        let cursor = match side {
            Side::Source => &mut self.source_cursor,
            Side::Target => &mut self.target_cursor,
        };
        *cursor = step(*cursor, delta, len);
    }

    fn clamp_cursors(&mut self) {
        let source_len = self.rows(Side::Source).len();
        let target_len = self.rows(Side::Target).len();
        self.source_cursor = self.source_cursor.min(source_len.saturating_sub(1));
        self.target_cursor = self.target_cursor.min(target_len.saturating_sub(1));
    }

    /// Group choices for one side as the list shows them. The source side
    /// starts with the "no group" placeholder.
    pub fn group_choices(&self, side: Side) -> Vec<(Option<String>, String)> {
        let options = self.console.directory.options(side);
        let mut choices = Vec::with_capacity(options.len() + 1);
        if side == Side::Source {
            choices.push((None, "(choose a group)".to_string()));
        }
        choices.extend(options.into_iter().map(|o| (Some(o.id), o.label)));
        choices
    }

    pub fn group_cursor(&self, side: Side) -> Option<usize> {
        let selected = self.console.directory.selected(side);
        self.group_choices(side)
            .iter()
            .position(|(id, _)| id.as_deref() == selected)
    }

    /// Step a side's group selection up or down its list
    pub fn step_group(&mut self, side: Side, delta: isize) {
        let choices = self.group_choices(side);
        if choices.is_empty() {
            return;
        }
        let next = match self.group_cursor(side) {
            Some(current) => step(current, delta, choices.len()),
            None => 0,
        };
        let id = choices[next].0.clone();
        self.console.select(side, id.as_deref());
        match side {
            Side::Source => self.source_cursor = 0,
            Side::Target => self.target_cursor = 0,
        }
    }

    pub fn toggle_under_cursor(&mut self) {
        let rows = self.rows(Side::Source);
        if let Some(child_id) = rows.get(self.source_cursor).and_then(RosterRow::child_id) {
            let child_id = child_id.to_string();
            self.console.toggle_child(&child_id);
        }
    }

    /// Check every child in the source list, or clear them all if already checked
    pub fn toggle_all(&mut self) {
        let ids = self.console.source_ids();
        if !ids.is_empty() && ids.iter().all(|id| self.console.checked.contains(id)) {
            self.console.checked.clear();
        } else {
            for id in &ids {
                if !self.console.checked.contains(id) {
                    self.console.checked.toggle(id);
                }
            }
        }
    }

    pub fn filter_push(&mut self, side: Side, c: char) {
        let mut filter = self.console.directory.selector(side).filter.clone();
        if filter.chars().count() < MAX_FILTER_LENGTH && is_valid_input_char(c) {
            filter.push(c);
            self.console.set_filter(side, &filter);
            self.clamp_cursors();
        }
    }

    pub fn filter_pop(&mut self, side: Side) {
        let mut filter = self.console.directory.selector(side).filter.clone();
        if filter.pop().is_some() {
            self.console.set_filter(side, &filter);
            self.clamp_cursors();
        }
    }

    pub fn filter_clear(&mut self, side: Side) {
        self.console.set_filter(side, "");
        self.clamp_cursors();
    }

    // =========================================================================
    // Group manager helpers
    // =========================================================================

    pub fn open_manager(&mut self) {
        self.console.open_manager();
        self.manager_focus = ManagerFocus::Years;
        self.state = AppState::ManagingGroups;
    }

    pub fn close_manager(&mut self) {
        self.console.manager.close();
        self.state = AppState::Normal;
    }

    pub fn edit_selected_group(&mut self) {
        if let Some(group) = self
            .console
            .manager
            .selected_group(&self.console.directory)
            .cloned()
        {
            self.console.manager.edit(&group);
            self.manager_focus = ManagerFocus::Form;
        }
    }
}

enum GroupChange {
    Save(SaveAction),
    Delete(String),
}

/// Move `current` by `delta` within `0..len`, clamping at both ends
fn step(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let next = current as isize + delta;
    next.clamp(0, len as isize - 1) as usize
}

// ============================================================================
// Input validation helpers (exported for use in input.rs)
// ============================================================================

fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

pub fn can_add_email_char(current_len: usize, c: char) -> bool {
    current_len < MAX_EMAIL_LENGTH && is_valid_input_char(c) && !c.is_whitespace()
}

pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

pub fn can_add_form_char(current_len: usize, c: char) -> bool {
    current_len < MAX_FORM_FIELD_LENGTH && is_valid_input_char(c)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use kidgroups_core::api::{AuthResponse, AuthUser};
    use kidgroups_core::auth::SessionData;
    use kidgroups_core::models::{Group, RosterEntry};
    use kidgroups_core::roster::{TransferItem, TransferOutcome};

    fn group(id: &str, name: &str) -> Group {
        Group {
            id: id.to_string(),
            name: name.to_string(),
            year_start: 2024,
            year_end: 2025,
            study_start_date: None,
            study_end_date: None,
        }
    }

    fn child(child_id: &str, group_id: &str, last: &str) -> RosterEntry {
        RosterEntry {
            child_id: child_id.to_string(),
            group_id: group_id.to_string(),
            last_name: Some(last.to_string()),
            first_name: Some("Олена".to_string()),
            middle_name: None,
            birth_date: None,
        }
    }

    fn snapshot(groups: Vec<Group>, roster: Vec<RosterEntry>) -> Snapshot {
        Snapshot { groups, roster }
    }

    fn fresh_session() -> SessionData {
        SessionData::from_auth(&AuthResponse {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_in: 3600,
            expires_at: None,
            user: AuthUser {
                id: "u-1".to_string(),
                email: Some("head@sadok.ua".to_string()),
            },
        })
    }

    /// App pointed at a closed local port, with its session in a temp dir
    fn test_app(dir: &tempfile::TempDir) -> App {
        let config = Config {
            gateway_url: Some("http://127.0.0.1:9".to_string()),
            anon_key: Some("anon".to_string()),
            last_email: None,
        };
        let mut app = App::new(config).expect("app");
        app.session = Session::new(dir.path().to_path_buf());
        app
    }

    /// Loaded app: source g1 holds c1 and c2, target defaults away from it
    fn loaded_app(dir: &tempfile::TempDir) -> App {
        let mut app = test_app(dir);
        app.process_task_result(TaskResult::Loaded(Ok(snapshot(
            vec![group("g1", "Сонечко"), group("g2", "Ромашка")],
            vec![child("c1", "g1", "Бойко"), child("c2", "g1", "Коваль")],
        ))));
        app.step_group(Side::Source, 1);
        app
    }

    fn report(target: &str, outcomes: Vec<(&str, TransferOutcome)>) -> TransferReport {
        TransferReport {
            target_group_id: target.to_string(),
            items: outcomes
                .into_iter()
                .map(|(child_id, outcome)| TransferItem {
                    child_id: child_id.to_string(),
                    outcome,
                })
                .collect(),
        }
    }

    #[test]
    fn test_stepping_source_onto_default_target_moves_target() {
        let dir = tempfile::tempdir().expect("temp dir");
        let app = loaded_app(&dir);
        assert_eq!(app.console.directory.selected(Side::Source), Some("g1"));
        assert_eq!(app.console.directory.selected(Side::Target), Some("g2"));
        assert!(app.console.transfer_request(MoveScope::All).is_ok());
    }

    #[test]
    fn test_mutations_refused_while_busy() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut app = loaded_app(&dir);
        app.busy = Some("the transfer");

        app.start_transfer(MoveScope::All);
        assert_eq!(app.busy, Some("the transfer"));
        assert_eq!(
            app.status_message.as_deref(),
            Some("Wait for the transfer to finish")
        );

        app.pending = Some(PendingAction::DeleteGroup {
            group_id: "g2".to_string(),
            label: "Ромашка (2024–2025)".to_string(),
        });
        app.confirm_pending();
        assert!(app.pending.is_none());
        assert_eq!(app.busy, Some("the transfer"));

        app.status_message = None;
        app.reload();
        assert!(!app.loading);
        assert_eq!(
            app.status_message.as_deref(),
            Some("Wait for the transfer to finish")
        );
    }

    #[test]
    fn test_mutation_refused_while_reload_in_flight() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut app = loaded_app(&dir);
        app.loading = true;
        app.start_transfer(MoveScope::All);
        assert_eq!(app.busy, None);
        assert_eq!(
            app.status_message.as_deref(),
            Some("Wait for the reload to finish")
        );
    }

    #[test]
    fn test_transfer_result_reloads_before_reporting() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut app = loaded_app(&dir);
        app.busy = Some("the transfer");

        // The target group only exists in the reloaded snapshot
        app.process_task_result(TaskResult::Transferred {
            report: report("g3", vec![("c1", TransferOutcome::Moved)]),
            reload: Ok(snapshot(
                vec![group("g1", "Сонечко"), group("g3", "Бджілка")],
                vec![child("c1", "g3", "Бойко"), child("c2", "g1", "Коваль")],
            )),
        });

        assert_eq!(app.busy, None);
        assert!(app.alert.is_none());
        assert_eq!(
            app.status_message.as_deref(),
            Some("Moved 1 of 1 children. Now in Бджілка (2024–2025).")
        );
        assert_eq!(app.console.source_ids(), vec!["c2"]);
    }

    #[test]
    fn test_partial_transfer_raises_alert() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut app = loaded_app(&dir);
        app.busy = Some("the transfer");

        app.process_task_result(TaskResult::Transferred {
            report: report(
                "g2",
                vec![
                    ("c1", TransferOutcome::Moved),
                    (
                        "c2",
                        TransferOutcome::Failed {
                            reason: "Child is archived".to_string(),
                        },
                    ),
                ],
            ),
            reload: Ok(snapshot(
                vec![group("g1", "Сонечко"), group("g2", "Ромашка")],
                vec![child("c1", "g2", "Бойко"), child("c2", "g1", "Коваль")],
            )),
        });

        assert_eq!(app.busy, None);
        let alert = app.alert.as_deref().expect("alert");
        assert!(alert.starts_with("Moved 1 of 2 children."));
        assert!(alert.contains("Child is archived"));
    }

    #[test]
    fn test_refused_reload_after_transfer_keeps_login_uncovered() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut app = loaded_app(&dir);
        app.busy = Some("the transfer");

        app.process_task_result(TaskResult::Transferred {
            report: report(
                "g2",
                vec![(
                    "c1",
                    TransferOutcome::Failed {
                        reason: "JWT expired".to_string(),
                    },
                )],
            ),
            reload: Err(GatewayError::Unauthorized),
        });

        assert_eq!(app.state, AppState::LoggingIn);
        assert!(app.alert.is_none());
        assert!(app
            .status_message
            .as_deref()
            .is_some_and(|m| m.starts_with("Moved 0 of 1 children.")));
    }

    #[test]
    fn test_group_change_clears_busy() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut app = loaded_app(&dir);

        app.busy = Some("the group save");
        app.process_task_result(TaskResult::GroupChanged {
            outcome: Ok("Group created".to_string()),
            reload: Some(Ok(snapshot(
                vec![
                    group("g1", "Сонечко"),
                    group("g2", "Ромашка"),
                    group("g3", "Бджілка"),
                ],
                vec![],
            ))),
        });
        assert_eq!(app.busy, None);
        assert_eq!(app.status_message.as_deref(), Some("Group created"));
        assert_eq!(app.console.directory.groups().len(), 3);

        app.busy = Some("the group delete");
        app.process_task_result(TaskResult::GroupChanged {
            outcome: Err(GatewayError::Rejected {
                code: Some("P0001".to_string()),
                message: "Group still has children".to_string(),
            }),
            reload: None,
        });
        assert_eq!(app.busy, None);
        assert_eq!(app.alert.as_deref(), Some("Group still has children"));
    }

    #[test]
    fn test_refused_call_requests_one_refresh_before_login() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut app = loaded_app(&dir);
        app.session.update(fresh_session());

        app.handle_gateway_error(GatewayError::Unauthorized);
        assert_eq!(app.state, AppState::Normal);
        assert!(app.reauth_pending);

        // Still refused after the refresh: log in again
        app.reauth_pending = false;
        app.handle_gateway_error(GatewayError::Unauthorized);
        assert_eq!(app.state, AppState::LoggingIn);
    }

    #[test]
    fn test_refused_call_without_session_goes_to_login() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut app = loaded_app(&dir);
        app.session.data = None;
        app.handle_gateway_error(GatewayError::Unauthorized);
        assert_eq!(app.state, AppState::LoggingIn);
        assert!(!app.reauth_pending);
    }

    #[tokio::test]
    async fn test_keep_session_fresh_skips_valid_token() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut app = loaded_app(&dir);
        app.session.update(fresh_session());
        app.keep_session_fresh().await;
        assert_eq!(app.state, AppState::Normal);
        assert!(app.refresh_backoff.is_none());
        assert!(app.alert.is_none());
    }

    #[tokio::test]
    async fn test_requested_refresh_without_token_routes_to_login() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut app = loaded_app(&dir);
        app.session.data = None;
        app.reauth_pending = true;
        app.keep_session_fresh().await;
        assert_eq!(app.state, AppState::LoggingIn);
        assert!(!app.reauth_pending);
        assert_eq!(
            app.login_error.as_deref(),
            Some("Session expired. Please log in again.")
        );
    }

    #[test]
    fn test_focus_cycle() {
        let mut focus = Focus::SourceGroups;
        for _ in 0..4 {
            focus = focus.next();
        }
        assert_eq!(focus, Focus::SourceGroups);
        assert_eq!(Focus::SourceGroups.prev(), Focus::TargetChildren);
        assert_eq!(Focus::TargetGroups.side(), Side::Target);
        assert_eq!(Focus::SourceChildren.side(), Side::Source);
    }

    #[test]
    fn test_manager_focus_cycle() {
        assert_eq!(ManagerFocus::Years.next(), ManagerFocus::List);
        assert_eq!(ManagerFocus::Form.next(), ManagerFocus::Years);
        assert_eq!(ManagerFocus::Years.prev(), ManagerFocus::Form);
    }

    #[test]
    fn test_step_clamps() {
        assert_eq!(step(0, -1, 5), 0);
        assert_eq!(step(4, 1, 5), 4);
        assert_eq!(step(2, PAGE_SCROLL_SIZE as isize, 5), 4);
        assert_eq!(step(3, 1, 0), 0);
    }

    #[test]
    fn test_can_add_email_char() {
        assert!(can_add_email_char(0, 'a'));
        assert!(can_add_email_char(0, '@'));
        assert!(!can_add_email_char(0, ' '));
        assert!(!can_add_email_char(MAX_EMAIL_LENGTH, 'a'));
    }

    #[test]
    fn test_can_add_password_char() {
        assert!(can_add_password_char(0, ' '));
        assert!(!can_add_password_char(0, '\n'));
        assert!(!can_add_password_char(MAX_PASSWORD_LENGTH, 'a'));
    }

    #[test]
    fn test_can_add_form_char() {
        assert!(can_add_form_char(0, 'Р'));
        assert!(!can_add_form_char(MAX_FORM_FIELD_LENGTH, '1'));
        assert!(!can_add_form_char(0, '\t'));
    }

    #[test]
    fn test_delete_prompt_names_group() {
        let pending = PendingAction::DeleteGroup {
            group_id: "g1".to_string(),
            label: "Сонечко (2024–2025)".to_string(),
        };
        assert_eq!(pending.prompt(), "Delete group Сонечко (2024–2025)?");
    }
}
