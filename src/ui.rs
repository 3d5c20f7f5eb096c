use crate::app::{App, Mode, NoticeKind};
use crate::braille::BrailleCanvas;
use crate::compose::{CounterLevel, FeedbackField, TextInput, MAX_TEXT_LEN, PLACE_FIELDS};
use crate::map::{GlyphKind, MapLayers, MarkerStyle, Overlays};
use crate::place::{Place, VoteKind};
use crate::sync::DetailView;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Widget, Wrap},
    Frame,
};

const SIDEBAR_WIDTH: u16 = 38;

/// Screen regions for one frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Areas {
    /// Map area inside its border
    pub map: Rect,
    pub list: Rect,
    pub detail: Option<Rect>,
    pub status: Rect,
}

/// Split the terminal; the detail panel takes the lower part of the sidebar when open
pub fn layout(area: Rect, detail_open: bool) -> Areas {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Map and sidebar
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    let sidebar = SIDEBAR_WIDTH.min(area.width / 2);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(sidebar)])
        .split(rows[0]);

    let (list, detail) = if detail_open {
        let split = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
            .split(cols[1]);
        (split[0], Some(split[1]))
    } else {
        (cols[1], None)
    };

    Areas {
        map: map_block().inner(cols[0]),
        list,
        detail,
        status: rows[1],
    }
}

fn map_block() -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " Places ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let screen = frame.area();
    let areas = layout(screen, app.detail.is_open());

    let outer = Rect {
        x: areas.map.x.saturating_sub(1),
        y: areas.map.y.saturating_sub(1),
        width: areas.map.width + 2,
        height: areas.map.height + 2,
    };
    frame.render_widget(map_block(), outer);
    render_map(frame, app, areas.map);
    render_list(frame, app, areas.list);
    if let Some(detail) = areas.detail {
        render_detail(frame, app, detail);
    }

    match &app.mode {
        Mode::Search(input) => render_prompt(frame, "Search location", input, None, areas.status),
        Mode::Filter(input) => render_prompt(frame, "Filter", input, None, areas.status),
        Mode::Comment(input) => {
            render_prompt(frame, "Comment", input, Some(MAX_TEXT_LEN), areas.status)
        }
        _ => render_status_bar(frame, app, areas.status),
    }

    match &app.mode {
        Mode::Feedback(_) | Mode::Submit(_) => render_form(frame, app, screen),
        _ => {}
    }

    if let Some(notice) = &app.notice {
        let color = match notice.kind {
            NoticeKind::Success => Color::Green,
            NoticeKind::Error => Color::Red,
            NoticeKind::Info => Color::Cyan,
        };
        let width = (notice.message.chars().count() as u16 + 4).min(areas.map.width);
        let area = Rect {
            x: areas.map.x + areas.map.width.saturating_sub(width),
            y: areas.map.y,
            width,
            height: 3u16.min(areas.map.height),
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color));
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(notice.message.as_str())
                .style(Style::default().fg(color))
                .block(block),
            area,
        );
    }
}

fn render_map(frame: &mut Frame, app: &App, inner: Rect) {
    let overlays = Overlays {
        boundary: app.boundary.as_ref(),
        user: app.user_position,
        search: app.search_marker.map(|(c, _)| c),
        selected: app.detail.open_id(),
    };
    let layers = app.map_renderer.render(
        inner.width as usize,
        inner.height as usize,
        &app.viewport,
        &app.markers,
        &overlays,
    );
    let borders_color = if app.is_close_up() { Color::Yellow } else { Color::DarkGray };
    frame.render_widget(MapWidget { layers, borders_color }, inner);
}

/// Custom widget that renders braille map with markers overlaid
struct MapWidget {
    layers: MapLayers,
    borders_color: Color,
}

impl MapWidget {
    /// Render a braille canvas layer with a specific color
    fn render_layer(canvas: &BrailleCanvas, color: Color, area: Rect, buf: &mut Buffer) {
        for (col, row, ch) in canvas.inked() {
            if col >= area.width as usize || row >= area.height as usize {
                continue;
            }
            buf[(area.x + col as u16, area.y + row as u16)]
                .set_char(ch)
                .set_fg(color);
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Back to front
        Self::render_layer(&self.layers.coastlines, Color::Cyan, area, buf);
        Self::render_layer(&self.layers.borders, self.borders_color, area, buf);
        Self::render_layer(&self.layers.boundary, Color::Magenta, area, buf);

        for glyph in &self.layers.glyphs {
            if glyph.x >= area.width || glyph.y >= area.height {
                continue;
            }
            let x = area.x + glyph.x;
            let y = area.y + glyph.y;
            match &glyph.kind {
                GlyphKind::Place { style, selected } => {
                    let (ch, color) = match style {
                        MarkerStyle::Verified => ('●', Color::Green),
                        MarkerStyle::Unverified => ('●', Color::Yellow),
                        MarkerStyle::Hidden => ('○', Color::DarkGray),
                    };
                    let mut style = Style::default().fg(color);
                    if *selected {
                        style = style.bg(Color::White).add_modifier(Modifier::BOLD);
                    }
                    buf[(x, y)].set_char(ch).set_style(style);
                }
                GlyphKind::Label(text) => {
                    let max_len = area.width.saturating_sub(glyph.x) as usize;
                    for (i, ch) in text.chars().take(max_len.min(24)).enumerate() {
                        buf[(x + i as u16, y)].set_char(ch).set_fg(Color::White);
                    }
                }
                GlyphKind::User => {
                    buf[(x, y)].set_char('◎').set_fg(Color::Blue);
                }
                GlyphKind::Search => {
                    buf[(x, y)]
                        .set_char('✚')
                        .set_fg(Color::Magenta)
                        .set_style(Style::default().add_modifier(Modifier::BOLD));
                }
            }
        }
    }
}

fn render_list(frame: &mut Frame, app: &App, area: Rect) {
    let cards = app.list.cards();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" {} places ", cards.len()));

    if let Some(message) = app.list.empty_message() {
        let text = if app.is_loading() && app.places.is_empty() {
            "Loading places..."
        } else {
            message
        };
        frame.render_widget(
            Paragraph::new(text)
                .style(Style::default().fg(Color::DarkGray))
                .wrap(Wrap { trim: true })
                .block(block),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = cards
        .iter()
        .map(|card| {
            let mut title = vec![Span::styled(
                card.name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )];
            if card.verified {
                title.push(Span::styled(" ✓", Style::default().fg(Color::Green)));
            }
            if card.hidden {
                title.push(Span::styled(" hidden", Style::default().fg(Color::DarkGray)));
            }
            let meta = Line::from(vec![
                Span::styled(card.category.clone(), Style::default().fg(Color::Cyan)),
                Span::styled(
                    format!("  {:+}  {} comments", card.score, card.comments),
                    Style::default().fg(Color::DarkGray),
                ),
            ]);
            let mut lines = vec![Line::from(title), meta];
            if !card.address.is_empty() {
                lines.push(Line::styled(card.address.clone(), Style::default().fg(Color::Gray)));
            }
            ListItem::new(lines)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("▌");
    let mut state = ListState::default().with_selected(Some(app.list.selected_index()));
    frame.render_stateful_widget(list, area, &mut state);
}

fn detail_lines(place: &Place, cursor: usize, loading: bool) -> Vec<Line<'_>> {
    let dim = Style::default().fg(Color::DarkGray);
    let mut lines = vec![
        Line::from(Span::styled(
            place.name.as_str(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::raw(place.category.as_str()),
            Span::styled(
                if place.verified { "  verified" } else { "  unverified" },
                Style::default().fg(if place.verified { Color::Green } else { Color::Yellow }),
            ),
        ]),
    ];
    if place.rating > 0.0 {
        lines.push(Line::raw(format!("Rating {:.1}", place.rating)));
    }
    let (up, down) = match place.user_vote {
        Some(VoteKind::Upvote) => (Color::Green, Color::Reset),
        Some(VoteKind::Downvote) => (Color::Reset, Color::Red),
        None => (Color::Reset, Color::Reset),
    };
    lines.push(Line::from(vec![
        Span::styled(format!("▲ {}", place.upvotes), Style::default().fg(up)),
        Span::raw("  "),
        Span::styled(format!("▼ {}", place.downvotes), Style::default().fg(down)),
    ]));
    lines.push(Line::raw(""));
    if !place.description.is_empty() {
        lines.push(Line::raw(place.description.as_str()));
        lines.push(Line::raw(""));
    }
    if !place.address.is_empty() {
        lines.push(Line::from(vec![Span::styled("Address  ", dim), Span::raw(place.address.as_str())]));
    }
    if let Some(contact) = place.contact() {
        lines.push(Line::from(vec![Span::styled("Contact  ", dim), Span::raw(contact)]));
    }
    if let Some(hours) = place.opening_hours() {
        lines.push(Line::from(vec![Span::styled("Hours    ", dim), Span::raw(hours)]));
    }
    if !place.tags.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("Tags     ", dim),
            Span::raw(place.tags.join(", ")),
        ]));
    }
    lines.push(Line::styled(
        format!("Added by {} {}", place.added_by, place.added_date),
        dim,
    ));
    lines.push(Line::raw(""));

    if loading {
        lines.push(Line::styled("Loading...", dim));
    }
    lines.push(Line::styled(
        format!("Comments ({})", place.comments.len()),
        Style::default().add_modifier(Modifier::BOLD),
    ));
    if place.comments.is_empty() {
        lines.push(Line::styled("No comments yet", dim));
    }
    for (i, comment) in place.comments.iter().enumerate() {
        let marker = if i == cursor { "▌" } else { " " };
        let mut header = vec![
            Span::styled(marker, Style::default().fg(Color::Cyan)),
            Span::styled(comment.author.as_str(), Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(format!(" {}", comment.created_at), dim),
        ];
        if comment.reported {
            header.push(Span::styled(" reported", Style::default().fg(Color::Red)));
        }
        lines.push(Line::from(header));
        let text = if comment.flagged {
            Span::styled(" [hidden pending review]", dim)
        } else {
            Span::raw(format!(" {}", comment.text))
        };
        lines.push(Line::from(text));
    }
    lines
}

fn render_detail(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Details ")
        .title_bottom(Line::styled(
            " u/d vote  c comment  r report  Esc close ",
            Style::default().fg(Color::DarkGray),
        ));

    let Some(place) = app.detail.place() else {
        let text = if app.detail.is_loading() {
            "Loading..."
        } else {
            "Could not load this place"
        };
        frame.render_widget(Paragraph::new(text).block(block), area);
        return;
    };

    let cursor = app.detail.comment_cursor();
    let lines = detail_lines(place, cursor, app.detail.is_loading());
    // Keep the selected comment in view
    let comments_start = lines.len().saturating_sub(place.comments.len() * 2);
    let cursor_line = (comments_start + cursor * 2 + 2) as u16;
    let visible = area.height.saturating_sub(2);
    let scroll = cursor_line.saturating_sub(visible);
    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0)),
        area,
    );
}

fn counter_style(len: usize) -> Style {
    match CounterLevel::for_len(len) {
        CounterLevel::Normal => Style::default().fg(Color::DarkGray),
        CounterLevel::Warning => Style::default().fg(Color::Yellow),
        CounterLevel::Critical => Style::default().fg(Color::Red),
    }
}

fn render_prompt(frame: &mut Frame, label: &str, input: &TextInput, max: Option<usize>, area: Rect) {
    let mut spans = vec![
        Span::styled(format!(" {label}: "), Style::default().fg(Color::Yellow)),
        Span::raw(input.value()),
        Span::styled("█", Style::default().fg(Color::Gray)),
    ];
    if let Some(max) = max {
        spans.push(Span::styled(format!("  {}/{max}", input.len()), counter_style(input.len())));
    }
    spans.push(Span::styled("  Enter:ok Esc:cancel", Style::default().fg(Color::DarkGray)));
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let dim = Style::default().fg(Color::DarkGray);
    let mut spans = vec![
        Span::styled(" ", dim),
        Span::styled(app.filter.category.label(), Style::default().fg(Color::Green)),
    ];
    if app.filter.bounds.is_some() {
        spans.push(Span::styled(" [area]", Style::default().fg(Color::Magenta)));
    }
    if !app.filter.query.is_empty() {
        spans.push(Span::styled(
            format!(" \"{}\"", app.filter.query),
            Style::default().fg(Color::Yellow),
        ));
    }
    spans.extend([
        Span::styled(" | Zoom: ", dim),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" (", dim),
        Span::styled(app.lod_level(), Style::default().fg(Color::Magenta)),
        Span::styled(") ", dim),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
    ]);
    if app.is_loading() {
        spans.push(Span::styled(" ⟳", Style::default().fg(Color::Yellow)));
    }
    let controls = app.setup.controls;
    let mut help = String::from(" | hjkl:pan");
    if controls.zoom {
        help.push_str(" +/-:zoom");
    }
    if controls.search {
        help.push_str(" /:search x:clear");
    }
    help.push_str(" f:category s:filter J/K:select ⏎:open");
    if controls.submit {
        help.push_str(" n:new");
    }
    help.push_str(" i:feedback m:me q:quit");
    spans.push(Span::styled(help, dim));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Centered rectangle of the given size, clamped to `area`
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn field_line<'a>(label: &'a str, value: &'a str, focused: bool) -> Line<'a> {
    let label_style = if focused {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let mut spans = vec![Span::styled(format!("{label:>14}: "), label_style), Span::raw(value)];
    if focused {
        spans.push(Span::styled("█", Style::default().fg(Color::Gray)));
    }
    Line::from(spans)
}

fn render_form(frame: &mut Frame, app: &App, screen: Rect) {
    let (title, mut lines) = match &app.mode {
        Mode::Submit(form) => {
            let mut lines: Vec<Line> = PLACE_FIELDS
                .iter()
                .enumerate()
                .map(|(i, label)| {
                    if i == 1 {
                        field_line(label, form.category(), form.focus == i)
                    } else {
                        field_line(label, form.inputs[i].value(), form.focus == i)
                    }
                })
                .collect();
            lines.push(Line::raw(""));
            lines.push(Line::styled(
                format!("At {:.5}, {:.5}", form.at.lat, form.at.lon),
                Style::default().fg(Color::DarkGray),
            ));
            (" Add a place ", lines)
        }
        Mode::Feedback(form) => {
            let stars: String = (1..=5)
                .map(|n| if form.rating.is_some_and(|r| r.stars() >= n) { '★' } else { '☆' })
                .collect();
            let len = form.text.len();
            let lines = vec![
                Line::from(vec![
                    Span::styled(stars, Style::default().fg(Color::Yellow)),
                    Span::styled(format!("  {}", form.rating_label()), Style::default().fg(Color::Gray)),
                ]),
                Line::raw(""),
                field_line("Feedback", form.text.value(), form.focus == FeedbackField::Text),
                Line::styled(format!("{len}/{MAX_TEXT_LEN}"), counter_style(len)),
                field_line("Email", form.email.value(), form.focus == FeedbackField::Email),
            ];
            (" Feedback ", lines)
        }
        _ => return,
    };

    lines.push(Line::raw(""));
    let hint = if app.sending {
        "Sending..."
    } else {
        "Tab:next field  Enter:send  Esc:cancel"
    };
    lines.push(Line::styled(hint, Style::default().fg(Color::DarkGray)));

    let area = centered(screen, 64, lines.len() as u16 + 2);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(title);
    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), area);
}
