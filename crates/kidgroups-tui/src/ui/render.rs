use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use kidgroups_core::utils::{age_display, truncate_string};

use crate::app::{App, AppState, LoginFocus};

use super::styles;
use super::{groups, transfer};

const TITLE: &str = "  kidgroups · group transfer";

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Title bar
            Constraint::Min(10),   // Transfer view
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    transfer::render(frame, app, chunks[1]);
    render_status_bar(frame, app, chunks[2]);

    // Overlays, bottom to top
    match app.state {
        AppState::ManagingGroups => groups::render(frame, app),
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::LoggingIn => render_login_overlay(frame, app),
        AppState::ConfirmingQuit => render_quit_overlay(frame),
        _ => {}
    }

    if let Some(ref pending) = app.pending {
        render_confirm_overlay(frame, &pending.prompt());
    }
    if let Some(ref message) = app.alert {
        render_alert_overlay(frame, message);
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let right = match app.user_email {
        Some(ref email) => format!("{}  [?] Help", email),
        None => "[?] Help".to_string(),
    };

    let title_line = Line::from(vec![
        Span::styled(TITLE, styles::title_style()),
        Span::raw(" ".repeat(
            (area.width as usize)
                .saturating_sub(TITLE.chars().count() + right.chars().count() + 2),
        )),
        Span::styled(right, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(title_line).block(block), area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let left_text = if let Some(label) = app.busy {
        format!(" Running {}... ", label)
    } else if let Some(ref msg) = app.status_message {
        format!(" {} ", msg)
    } else if let Some(loaded) = app.console.roster.loaded_at() {
        format!(
            " {} children, updated {} ",
            app.console.roster.total(),
            age_display(loaded)
        )
    } else {
        " Not loaded ".to_string()
    };
    let left_style = if app.busy.is_some() {
        styles::highlight_style()
    } else {
        styles::muted_style()
    };

    let right_text = format!(
        " policy: {} | [m]ove [M]ove all [g]roups [r]eload [q]uit ",
        app.policy.label()
    );

    let width = area.width as usize;
    let left_text = truncate_string(
        &left_text,
        width.saturating_sub(right_text.chars().count()).max(4),
    );
    let padding_len = width
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.chars().count());

    let status_line = Line::from(vec![
        Span::styled(left_text, left_style),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    frame.render_widget(
        Paragraph::new(status_line).style(styles::status_bar_style()),
        area,
    );
}

fn help_line(key: &str, desc: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", key), styles::help_key_style()),
        Span::styled(desc.to_string(), styles::help_desc_style()),
    ])
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(54, 26, frame.area());
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");

    let help_text = vec![
        Line::from(Span::styled(" kidgroups", styles::title_style())),
        Line::from(Span::styled(
            format!(" version {}", version),
            styles::muted_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(" Navigation", styles::highlight_style())),
        help_line("Tab", "Next pane"),
        help_line("←/→", "Switch between source and target"),
        help_line("↑/↓", "Choose group / move in list"),
        help_line("/", "Filter the focused side's groups"),
        Line::from(""),
        Line::from(Span::styled(" Transfer", styles::highlight_style())),
        help_line("Space", "Check child"),
        help_line("a", "Check all / none"),
        help_line("m", "Move checked children"),
        help_line("M", "Move every child in the group"),
        help_line("p", "Toggle stop-on-error / best effort"),
        Line::from(""),
        Line::from(Span::styled(" Other", styles::highlight_style())),
        help_line("g", "Manage groups"),
        help_line("r", "Reload"),
        help_line("o", "Sign out"),
        help_line("q", "Quit"),
        Line::from(""),
        Line::from(vec![
            Span::styled("        Press ", styles::muted_style()),
            Span::styled("?", styles::help_key_style()),
            Span::styled(" or ", styles::muted_style()),
            Span::styled("Esc", styles::help_key_style()),
            Span::styled(" to close", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

fn render_login_overlay(frame: &mut Frame, app: &App) {
    let height = if app.login_error.is_some() { 12 } else { 10 };
    let area = centered_rect_fixed(52, height, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(Span::styled("  Sign in to kidgroups", styles::title_style())),
        Line::from(""),
    ];

    let email_focused = app.login_focus == LoginFocus::Email;
    let email_style = if email_focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    let cursor = if email_focused { "▌" } else { "" };
    lines.push(Line::from(vec![
        Span::styled("  Email:    [", styles::muted_style()),
        Span::styled(
            format!("{:<28}{}", truncate_string(&app.login_email, 28), cursor),
            email_style,
        ),
        Span::styled("]", styles::muted_style()),
    ]));

    let password_focused = app.login_focus == LoginFocus::Password;
    let password_style = if password_focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    let masked = "*".repeat(app.login_password.chars().count().min(28));
    let cursor = if password_focused { "▌" } else { "" };
    lines.push(Line::from(vec![
        Span::styled("  Password: [", styles::muted_style()),
        Span::styled(format!("{:<28}{}", masked, cursor), password_style),
        Span::styled("]", styles::muted_style()),
    ]));

    lines.push(Line::from(""));
    let button = if app.login_focus == LoginFocus::Button {
        Span::styled(" ▶ Sign in ◀ ", styles::selected_style())
    } else {
        Span::styled("   Sign in   ", styles::list_item_style())
    };
    lines.push(Line::from(vec![
        Span::raw("                  ["),
        button,
        Span::raw("]"),
    ]));

    if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("  {}", error),
            styles::error_style(),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 7, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "   Are you sure you want to quit?",
            styles::highlight_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to quit, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_confirm_overlay(frame: &mut Frame, prompt: &str) {
    let area = centered_rect_fixed(56, 7, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(format!("   {}", prompt), styles::highlight_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to confirm, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .title(" Confirm ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_alert_overlay(frame: &mut Frame, message: &str) {
    let width: u16 = 60;
    // Rough wrap estimate: interior width minus padding
    let text_lines = (message.chars().count() / (width as usize - 6)) as u16 + 1;
    let area = centered_rect_fixed(width, text_lines + 5, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(message.to_string(), styles::list_item_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled("Press ", styles::muted_style()),
            Span::styled("Enter", styles::help_key_style()),
            Span::styled(" to close", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .title(" Notice ")
        .title_style(styles::error_style())
        .borders(Borders::ALL)
        .border_style(styles::error_style());

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

/// Create a centered rectangle with fixed dimensions
pub fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}
