//! UI rendering

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use devlinks_core::preview::AvatarDisplay;
use devlinks_core::Platform;

use super::app::{App, InputMode, Mode};

/// Main UI rendering function
pub fn draw(frame: &mut Frame, app: &App) {
    let outer_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    match app.mode {
        Mode::Edit => draw_links_pane(frame, app, outer_chunks[0]),
        Mode::Preview => draw_preview_pane(frame, app, outer_chunks[0]),
    }

    match app.input_mode {
        InputMode::Normal => draw_status_bar(frame, app, outer_chunks[1]),
        InputMode::Url => draw_url_input(frame, app, outer_chunks[1]),
    }

    if app.show_help {
        draw_help_overlay(frame);
    }
}

/// Parse `#rgb` / `#rrggbb` brand colors
fn hex_color(hex: &str) -> Option<Color> {
    let digits = hex.strip_prefix('#')?;
    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        _ => return None,
    };
    let value = u32::from_str_radix(&expanded, 16).ok()?;
    Some(Color::Rgb(
        (value >> 16) as u8,
        (value >> 8) as u8,
        value as u8,
    ))
}

fn platform_style(platform: Platform) -> Style {
    Style::default()
        .fg(hex_color(platform.color()).unwrap_or(Color::Gray))
        .add_modifier(Modifier::BOLD)
}

fn pane_block(title: String) -> Block<'static> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().add_modifier(Modifier::BOLD))
}

/// Draw the link list with inline issues
fn draw_links_pane(frame: &mut Frame, app: &App, area: Rect) {
    let dim = Style::default().add_modifier(Modifier::DIM);
    let error = Style::default().fg(Color::Red);

    let items: Vec<ListItem> = app
        .entries()
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let platform = match entry.link_type {
                Some(p) => Span::styled(format!("{} {:<10}", p.icon(), p.name()), platform_style(p)),
                None => Span::styled(format!("  {:<10}", "(platform)"), dim),
            };
            let url = if entry.url.is_empty() {
                Span::styled("(url)", dim)
            } else {
                Span::raw(entry.url.clone())
            };
            let marker = if entry.is_persisted() { " " } else { "+" };

            let mut lines = vec![Line::from(vec![
                Span::styled(format!("{}{:>2}. ", marker, i + 1), dim),
                platform,
                Span::raw(" "),
                url,
            ])];
            for issue in app.issues_for(i) {
                lines.push(Line::from(Span::styled(
                    format!("      {}", issue.message()),
                    error,
                )));
            }
            ListItem::new(lines)
        })
        .collect();

    let dirty = if app.has_changes() { " *" } else { "" };
    let block = pane_block(format!(" Links ({}){} ", app.entries().len(), dirty));

    if items.is_empty() {
        let empty = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled("No links yet. Press a to add one.", dim)),
        ])
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let list = List::new(items).block(block).highlight_style(
        Style::default()
            .add_modifier(Modifier::BOLD)
            .add_modifier(Modifier::REVERSED),
    );

    let mut state = ListState::default();
    state.select(Some(app.link_index));

    frame.render_stateful_widget(list, area, &mut state);
}

/// Draw the public page as visitors see it
fn draw_preview_pane(frame: &mut Frame, app: &App, area: Rect) {
    let dim = Style::default().add_modifier(Modifier::DIM);
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let block = pane_block(" Preview ".to_string());

    let Some(preview) = &app.preview else {
        let loading = Paragraph::new(Span::styled("Loading preview...", dim)).block(block);
        frame.render_widget(loading, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(1)])
        .split(area);

    let name_style = if preview.placeholder_name().is_some() {
        dim
    } else {
        bold
    };
    let email_style = if preview.placeholder_email().is_some() {
        dim
    } else {
        Style::default()
    };
    let avatar = match &preview.avatar {
        AvatarDisplay::Image(url) => Span::raw(format!("Avatar: {}", url)),
        AvatarDisplay::Placeholder => Span::styled("Avatar: (placeholder)", dim),
    };

    let header = Paragraph::new(vec![
        Line::from(Span::styled(preview.display_name(), name_style)),
        Line::from(Span::styled(preview.display_email(), email_style)),
        Line::from(avatar),
    ])
    .block(block)
    .wrap(Wrap { trim: true });
    frame.render_widget(header, chunks[0]);

    let items: Vec<ListItem> = preview
        .links
        .iter()
        .map(|link| {
            let style = Style::default()
                .fg(hex_color(link.display_color()).unwrap_or(Color::Gray))
                .add_modifier(Modifier::BOLD);
            ListItem::new(Line::from(vec![
                Span::styled(format!(" {} {:<10}", link.link_type.icon(), link.link_type.name()), style),
                Span::styled(format!(" {}  →", link.url), dim),
            ]))
        })
        .collect();

    let links_block = Block::default()
        .title(format!(" Links ({}) ", preview.links.len()))
        .borders(Borders::ALL);

    if items.is_empty() {
        let empty = Paragraph::new(Span::styled("No links to show.", dim)).block(links_block);
        frame.render_widget(empty, chunks[1]);
        return;
    }

    let list = List::new(items)
        .block(links_block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut state = ListState::default();
    state.select(Some(app.preview_index));
    frame.render_stateful_widget(list, chunks[1], &mut state);
}

/// Draw the status bar at the bottom
fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let dim = Style::default().add_modifier(Modifier::DIM);

    let line = if app.is_loading {
        Line::from(Span::styled("Working...", dim))
    } else if let Some(msg) = &app.status_message {
        Line::from(Span::styled(msg.clone(), dim))
    } else if app.mode == Mode::Preview {
        Line::from(Span::styled(
            "p:edit  o:open  r:refresh  ?:help  q:quit",
            dim,
        ))
    } else {
        // Save is only offered when the changes are valid
        let save = if app.is_dirty() {
            Span::styled("s:save  ", Style::default().fg(Color::Green))
        } else {
            Span::styled("s:save  ", dim.add_modifier(Modifier::CROSSED_OUT))
        };
        Line::from(vec![
            Span::styled("a:add  t:type  e:url  d:del  ", dim),
            save,
            Span::styled("r:reload  p:preview  ?:help  q:quit", dim),
        ])
    };

    frame.render_widget(Paragraph::new(line), area);
}

/// Draw URL input at the bottom
fn draw_url_input(frame: &mut Frame, app: &App, area: Rect) {
    let prefix = "URL: ";

    let line = Line::from(vec![
        Span::styled(prefix, Style::default().fg(Color::Yellow)),
        Span::raw(app.url_input.as_str()),
    ]);

    frame.render_widget(Paragraph::new(line), area);

    let cursor_x = area.x + prefix.len() as u16 + app.url_cursor as u16;
    frame.set_cursor_position((cursor_x, area.y));
}

/// Draw help overlay
fn draw_help_overlay(frame: &mut Frame) {
    let area = frame.area();

    let popup_width = 46.min(area.width.saturating_sub(4));
    let popup_height = 19.min(area.height.saturating_sub(4));
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("  j/k, ↑/↓    Move up/down"),
        Line::from("  a           Add link"),
        Line::from("  t           Cycle platform"),
        Line::from("  e           Edit URL"),
        Line::from("  d           Remove link (immediately)"),
        Line::from("  s           Save changes"),
        Line::from("  r           Reload / refresh preview"),
        Line::from("  p           Toggle edit / preview"),
        Line::from("  o, Enter    Open link in browser"),
        Line::from("  q           Quit"),
        Line::from(""),
        Line::from("  + marks links not saved yet"),
        Line::from("  * marks unsaved changes"),
        Line::from(""),
        Line::from(Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )),
    ];

    let paragraph = Paragraph::new(help_text).block(
        Block::default()
            .title(" Help ")
            .borders(Borders::ALL)
            .border_style(Style::default().add_modifier(Modifier::BOLD)),
    );
    frame.render_widget(paragraph, popup_area);
}
