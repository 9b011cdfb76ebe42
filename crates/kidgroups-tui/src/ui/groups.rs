//! Group management modal.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

use kidgroups_core::models::Group;
use kidgroups_core::roster::FormField;
use kidgroups_core::utils::format_date;

use crate::app::{App, ManagerFocus};
use crate::ui::render::centered_rect_fixed;
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App) {
    let area = centered_rect_fixed(72, 28, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(" Groups ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(7),
            Constraint::Length(1),
        ])
        .split(inner);

    render_year_filter(frame, app, chunks[0]);
    render_group_list(frame, app, chunks[1]);
    render_form(frame, app, chunks[2]);
    render_hints(frame, app, chunks[3]);
}

fn render_year_filter(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.manager_focus == ManagerFocus::Years;
    let year = match app.console.manager.selected_year() {
        Some(year) => Span::styled(year.to_string(), styles::highlight_style()),
        None => Span::styled("(choose a year)", styles::muted_style()),
    };
    let line = Line::from(vec![
        Span::styled(" Academic year: ", styles::muted_style()),
        Span::styled("◀ ", styles::muted_style()),
        year,
        Span::styled(" ▶", styles::muted_style()),
    ]);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_group_list(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.manager_focus == ManagerFocus::List;
    let manager = &app.console.manager;
    let groups = manager.visible_groups(&app.console.directory);

    let items: Vec<ListItem> = if manager.selected_year().is_none() {
        vec![ListItem::new(Span::styled(
            " Choose an academic year",
            styles::muted_style(),
        ))]
    } else if groups.is_empty() {
        vec![ListItem::new(Span::styled(
            " No groups in this year",
            styles::muted_style(),
        ))]
    } else {
        groups
            .iter()
            .enumerate()
            .map(|(i, group)| {
                let style = if focused && i == manager.selection {
                    styles::selected_style()
                } else {
                    styles::list_item_style()
                };
                ListItem::new(Line::from(vec![
                    Span::raw(format!(" {:<24}", group.name)),
                    Span::styled(study_period(group), styles::muted_style()),
                ]))
                .style(style)
            })
            .collect()
    };

    let block = Block::default()
        .title(format!(" Groups ({}) ", groups.len()))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));

    let mut state = ListState::default();
    if focused && !groups.is_empty() {
        state.select(Some(manager.selection));
    }
    frame.render_stateful_widget(List::new(items).block(block), area, &mut state);
}

fn study_period(group: &Group) -> String {
    match (group.study_start_date, group.study_end_date) {
        (Some(start), Some(end)) => format!("{} – {}", format_date(start), format_date(end)),
        (Some(start), None) => format!("from {}", format_date(start)),
        (None, Some(end)) => format!("until {}", format_date(end)),
        (None, None) => String::new(),
    }
}

fn render_form(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.manager_focus == ManagerFocus::Form;
    let manager = &app.console.manager;

    let lines: Vec<Line> = FormField::ALL
        .iter()
        .map(|&field| {
            let active = focused && manager.field == field;
            let value = manager.form.field(field);
            let cursor = if active { "▌" } else { "" };
            let hint = match field {
                FormField::StudyStart | FormField::StudyEnd if value.is_empty() && !active => {
                    "YYYY-MM-DD"
                }
                _ => "",
            };
            Line::from(vec![
                Span::styled(format!(" {:<12} ", field.label()), styles::muted_style()),
                Span::styled(
                    format!("{}{}", value, cursor),
                    if active {
                        styles::selected_style()
                    } else {
                        styles::list_item_style()
                    },
                ),
                Span::styled(hint, styles::muted_style()),
            ])
        })
        .collect();

    let title = if manager.form.is_edit() {
        " Edit group "
    } else {
        " New group "
    };
    let block = Block::default()
        .title(title)
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_hints(frame: &mut Frame, app: &App, area: Rect) {
    let hints: &[(&str, &str)] = match app.manager_focus {
        ManagerFocus::Years => &[("←/→", "year"), ("Tab", "next"), ("Esc", "close")],
        ManagerFocus::List => &[
            ("↑/↓", "move"),
            ("e", "edit"),
            ("d", "delete"),
            ("n", "new"),
            ("Esc", "close"),
        ],
        ManagerFocus::Form => &[
            ("↑/↓", "field"),
            ("Enter", "save"),
            ("Ctrl+L", "clear"),
            ("Esc", "close"),
        ],
    };

    let mut spans = vec![Span::raw(" ")];
    for (key, desc) in hints {
        spans.push(Span::styled(*key, styles::help_key_style()));
        spans.push(Span::styled(format!(" {}  ", desc), styles::help_desc_style()));
    }
    if let Some(label) = app.busy {
        spans.push(Span::styled(format!("Running {}...", label), styles::highlight_style()));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
