//! Two-column transfer view: source group on the left, target on the right.
//! Each column stacks a filter line, the group selector and the children list.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use kidgroups_core::roster::{RosterRow, Side};

use crate::app::{App, AppState, Focus};
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    render_side(frame, app, Side::Source, chunks[0]);
    render_side(frame, app, Side::Target, chunks[1]);
}

fn render_side(frame: &mut Frame, app: &App, side: Side, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Percentage(35),
            Constraint::Min(5),
        ])
        .split(area);

    render_filter(frame, app, side, chunks[0]);
    render_groups(frame, app, side, chunks[1]);
    render_children(frame, app, side, chunks[2]);
}

fn render_filter(frame: &mut Frame, app: &App, side: Side, area: Rect) {
    let editing = app.state == AppState::EditingFilter(side);
    let filter = &app.console.directory.selector(side).filter;

    let line = if editing {
        Line::from(vec![
            Span::styled(" / ", styles::search_style()),
            Span::styled(format!("{}▌", filter), styles::search_style()),
        ])
    } else if filter.is_empty() {
        Line::from(Span::styled(" [/] filter groups", styles::muted_style()))
    } else {
        Line::from(vec![
            Span::styled(" / ", styles::muted_style()),
            Span::styled(filter.clone(), styles::highlight_style()),
        ])
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(editing));
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_groups(frame: &mut Frame, app: &App, side: Side, area: Rect) {
    let focused = app.focus == groups_focus(side);
    let choices = app.group_choices(side);
    let cursor = app.group_cursor(side);

    let items: Vec<ListItem> = choices
        .iter()
        .enumerate()
        .map(|(i, (id, label))| {
            let style = if Some(i) == cursor {
                if focused {
                    styles::selected_style()
                } else {
                    styles::chosen_style()
                }
            } else if id.is_none() {
                styles::muted_style()
            } else {
                styles::list_item_style()
            };
            ListItem::new(Line::from(format!(" {}", label))).style(style)
        })
        .collect();

    let title = match side {
        Side::Source => " From group ",
        Side::Target => " To group ",
    };
    let block = Block::default()
        .title(title)
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));

    let items = if items.is_empty() {
        vec![ListItem::new(Span::styled(
            " No groups match the filter",
            styles::muted_style(),
        ))]
    } else {
        items
    };
    let list = List::new(items).block(block);

    let mut state = ListState::default();
    state.select(cursor);
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_children(frame: &mut Frame, app: &App, side: Side, area: Rect) {
    let focused = app.focus == children_focus(side);
    let rows = app.rows(side);
    let cursor = app.cursor(side);

    let count = rows.iter().filter(|r| r.child_id().is_some()).count();
    let items: Vec<ListItem> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let line = match row {
                RosterRow::Child { label, checked, .. } => {
                    let mark = match checked {
                        Some(true) => "[x] ",
                        Some(false) => "[ ] ",
                        None => "",
                    };
                    Line::from(format!(" {}{}", mark, label))
                }
                RosterRow::Placeholder(text) => {
                    Line::from(Span::styled(format!(" {}", text), styles::muted_style()))
                }
            };
            let style = if focused && i == cursor {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            ListItem::new(line).style(style)
        })
        .collect();

    let title = match side {
        Side::Source if !app.console.checked.is_empty() => format!(
            " Children ({}) · {} checked ",
            count,
            app.console.checked.len()
        ),
        _ => format!(" Children ({}) ", count),
    };
    let block = Block::default()
        .title(title)
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));

    let mut state = ListState::default();
    if focused {
        state.select(Some(cursor));
    }
    frame.render_stateful_widget(List::new(items).block(block), area, &mut state);
}

fn groups_focus(side: Side) -> Focus {
    match side {
        Side::Source => Focus::SourceGroups,
        Side::Target => Focus::TargetGroups,
    }
}

fn children_focus(side: Side) -> Focus {
    match side {
        Side::Source => Focus::SourceChildren,
        Side::Target => Focus::TargetChildren,
    }
}
