//! Keyboard input handling for the TUI.
//!
//! Overlays are checked first (login, alert, confirm, help, quit), then the
//! group modal, then the transfer view.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use kidgroups_core::roster::{MoveScope, Side};

use crate::app::{
    can_add_email_char, can_add_form_char, can_add_password_char, App, AppState, Focus,
    LoginFocus, ManagerFocus, PAGE_SCROLL_SIZE,
};

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    if matches!(app.state, AppState::LoggingIn) {
        return handle_login_input(app, key).await;
    }

    if app.alert.is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
            app.alert = None;
        }
        return Ok(false);
    }

    if app.pending.is_some() {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.confirm_pending(),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.pending = None,
            _ => {}
        }
        return Ok(false);
    }

    match app.state {
        AppState::ShowingHelp => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.state = AppState::Normal;
            }
            return Ok(false);
        }
        AppState::ConfirmingQuit => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    app.state = AppState::Quitting;
                    return Ok(true);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            return Ok(false);
        }
        AppState::EditingFilter(side) => {
            handle_filter_input(app, side, key);
            return Ok(false);
        }
        AppState::ManagingGroups => {
            handle_manager_input(app, key);
            return Ok(false);
        }
        AppState::Normal | AppState::LoggingIn | AppState::Quitting => {}
    }

    match key.code {
        KeyCode::Char('q') => {
            if let Some(label) = app.busy {
                app.status_message = Some(format!("Wait for {} to finish", label));
            } else {
                app.state = AppState::ConfirmingQuit;
            }
        }
        KeyCode::Char('?') => app.state = AppState::ShowingHelp,
        KeyCode::Tab => app.focus = app.focus.next(),
        KeyCode::BackTab => app.focus = app.focus.prev(),
        KeyCode::Left | KeyCode::Right => {
            app.focus = match app.focus {
                Focus::SourceGroups => Focus::TargetGroups,
                Focus::TargetGroups => Focus::SourceGroups,
                Focus::SourceChildren => Focus::TargetChildren,
                Focus::TargetChildren => Focus::SourceChildren,
            };
        }
        KeyCode::Up => step_focused(app, -1),
        KeyCode::Down => step_focused(app, 1),
        KeyCode::PageUp => step_focused(app, -(PAGE_SCROLL_SIZE as isize)),
        KeyCode::PageDown => step_focused(app, PAGE_SCROLL_SIZE as isize),
        KeyCode::Enter => {
            app.focus = match app.focus {
                Focus::SourceGroups => Focus::SourceChildren,
                Focus::TargetGroups => Focus::TargetChildren,
                other => other,
            };
        }
        KeyCode::Char('/') => app.state = AppState::EditingFilter(app.focus.side()),
        KeyCode::Char(' ') => {
            if app.focus == Focus::SourceChildren {
                app.toggle_under_cursor();
            }
        }
        KeyCode::Char('a') => app.toggle_all(),
        KeyCode::Char('m') => app.start_transfer(MoveScope::Selected),
        KeyCode::Char('M') => app.start_transfer(MoveScope::All),
        KeyCode::Char('g') => app.open_manager(),
        KeyCode::Char('r') => app.reload(),
        KeyCode::Char('p') => {
            app.policy = app.policy.toggled();
            app.status_message = Some(format!("Transfer policy: {}", app.policy.label()));
        }
        KeyCode::Char('o') => app.logout().await,
        _ => {}
    }
    Ok(false)
}

/// Up/down in a group pane changes that side's group; in a children pane it
/// moves the cursor
fn step_focused(app: &mut App, delta: isize) {
    match app.focus {
        Focus::SourceGroups => app.step_group(Side::Source, delta),
        Focus::TargetGroups => app.step_group(Side::Target, delta),
        Focus::SourceChildren => app.move_cursor(Side::Source, delta),
        Focus::TargetChildren => app.move_cursor(Side::Target, delta),
    }
}

fn handle_filter_input(app: &mut App, side: Side, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.filter_clear(side);
            app.state = AppState::Normal;
        }
        KeyCode::Enter => {
            // Keep the filter active
            app.state = AppState::Normal;
        }
        KeyCode::Backspace => app.filter_pop(side),
        KeyCode::Char(c) => app.filter_push(side, c),
        _ => {}
    }
}

fn handle_manager_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.close_manager();
            return;
        }
        KeyCode::Tab => {
            app.manager_focus = app.manager_focus.next();
            return;
        }
        KeyCode::BackTab => {
            app.manager_focus = app.manager_focus.prev();
            return;
        }
        _ => {}
    }

    match app.manager_focus {
        ManagerFocus::Years => match key.code {
            KeyCode::Left | KeyCode::Up => app.console.manager.cycle_year(false),
            KeyCode::Right | KeyCode::Down => app.console.manager.cycle_year(true),
            KeyCode::Enter => app.manager_focus = ManagerFocus::List,
            _ => {}
        },
        ManagerFocus::List => match key.code {
            KeyCode::Up => app.console.manager.move_selection(&app.console.directory, false),
            KeyCode::Down => app.console.manager.move_selection(&app.console.directory, true),
            KeyCode::Enter | KeyCode::Char('e') => app.edit_selected_group(),
            KeyCode::Char('d') | KeyCode::Delete => app.request_delete(),
            KeyCode::Char('n') => {
                app.console.manager.clear_form();
                app.manager_focus = ManagerFocus::Form;
            }
            _ => {}
        },
        ManagerFocus::Form => handle_form_input(app, key),
    }
}

fn handle_form_input(app: &mut App, key: KeyEvent) {
    let manager = &mut app.console.manager;
    match key.code {
        KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            manager.clear_form();
        }
        KeyCode::Up => manager.field = manager.field.prev(),
        KeyCode::Down => manager.field = manager.field.next(),
        KeyCode::Enter => app.save_group(),
        KeyCode::Backspace => {
            let field = manager.field;
            manager.form.field_mut(field).pop();
        }
        KeyCode::Char(c) => {
            let field = manager.field;
            let value = manager.form.field_mut(field);
            if can_add_form_char(value.chars().count(), c) {
                value.push(c);
            }
        }
        _ => {}
    }
}

async fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Down | KeyCode::Tab => {
            app.login_focus = match app.login_focus {
                LoginFocus::Email => LoginFocus::Password,
                LoginFocus::Password => LoginFocus::Button,
                LoginFocus::Button => LoginFocus::Email,
            };
        }
        KeyCode::Up | KeyCode::BackTab => {
            app.login_focus = match app.login_focus {
                LoginFocus::Email => LoginFocus::Button,
                LoginFocus::Password => LoginFocus::Email,
                LoginFocus::Button => LoginFocus::Password,
            };
        }
        KeyCode::Enter => match app.login_focus {
            LoginFocus::Email => app.login_focus = LoginFocus::Password,
            LoginFocus::Password | LoginFocus::Button => app.attempt_login().await,
        },
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::Email => {
                app.login_email.pop();
            }
            LoginFocus::Password => {
                app.login_password.pop();
            }
            LoginFocus::Button => {}
        },
        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::Email => {
                if can_add_email_char(app.login_email.chars().count(), c) {
                    app.login_email.push(c);
                }
            }
            LoginFocus::Password => {
                if can_add_password_char(app.login_password.chars().count(), c) {
                    app.login_password.push(c);
                }
            }
            LoginFocus::Button => {}
        },
        _ => {}
    }
    Ok(false)
}
