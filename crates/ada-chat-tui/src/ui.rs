use ada_chat_core::{ChatRole, ChatSession, SegmentCache, SegmentKind, SidebarState, ThoughtId, ThoughtOpenMap};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Borders, Clear, Padding, Paragraph, Wrap},
};

use crate::app::{App, BackendStatus};
use crate::markdown::render_markdown;
use crate::metrics::{cursor_position, wrap_chars};

const SIDEBAR_WIDTH: u16 = 30;
/// Composer rows before it starts scrolling internally.
const MAX_COMPOSER_ROWS: usize = 8;
/// Columns kept for the send/stop button inside the composer border.
const BUTTON_COLUMNS: u16 = 4;

/// Transcript projected to lines, plus where the thought toggles landed.
pub struct TranscriptView {
    pub lines: Vec<Line<'static>>,
    /// (line index, thought) for every "Show/Hide thoughts" line
    pub toggles: Vec<(usize, ThoughtId)>,
}

/// Build the transcript lines. Thoughts render as a toggle line, followed by
/// their content only when open.
pub fn transcript_lines(
    session: &ChatSession,
    segments: &mut SegmentCache,
    thoughts: &ThoughtOpenMap,
    animation_frame: u8,
) -> TranscriptView {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut toggles = Vec::new();

    if session.transcript().is_empty() && !session.is_awaiting_response() {
        lines.push(Line::from(Span::styled(
            "No messages yet. Start a conversation!",
            Style::default().fg(Color::DarkGray),
        )));
        return TranscriptView { lines, toggles };
    }

    for (index, message) in session.transcript().iter().enumerate() {
        lines.push(role_line(message.role));

        for segment in segments.segments(index, message) {
            match (segment.kind, segment.id) {
                (SegmentKind::Thought, Some(id)) => {
                    let open = thoughts.is_open(id);
                    toggles.push((lines.len(), id));
                    lines.push(thought_toggle_line(open));

                    if open {
                        let quiet = Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC);
                        let mut body = render_markdown(&segment.content, quiet);
                        if body.is_empty() {
                            body.push(Line::from(Span::styled("(empty)", quiet)));
                        }
                        for line in body {
                            let mut spans = vec![Span::styled("  │ ", Style::default().fg(Color::Magenta))];
                            spans.extend(line.spans);
                            lines.push(Line::from(spans));
                        }
                    }
                }
                _ => lines.extend(render_markdown(&segment.content, Style::default())),
            }
        }

        lines.push(Line::default());
    }

    if session.is_awaiting_response() {
        lines.push(role_line(ChatRole::Assistant));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    TranscriptView { lines, toggles }
}

fn role_line(role: ChatRole) -> Line<'static> {
    let color = match role {
        ChatRole::User => Color::Cyan,
        ChatRole::Assistant => Color::Yellow,
    };
    Line::from(Span::styled(
        format!("{}:", role.display_name()),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
}

fn thought_toggle_line(open: bool) -> Line<'static> {
    let (chevron, label) = if open {
        ("▼", "Hide Thoughts")
    } else {
        ("▶", "Show Thoughts")
    };
    Line::from(vec![
        Span::styled(format!(" {} ", chevron), Style::default().fg(Color::Magenta)),
        Span::styled(label, Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)),
    ])
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    let sidebar_width = SIDEBAR_WIDTH.min(body_area.width);
    let (sidebar_area, chat_area) = match app.layout_state() {
        SidebarState::Pinned => {
            let [side, chat] = Layout::horizontal([
                Constraint::Length(sidebar_width),
                Constraint::Min(0),
            ])
            .areas(body_area);
            (Some(side), chat)
        }
        // Unpinned sidebar floats over the chat
        SidebarState::Visible => (
            Some(Rect { width: sidebar_width, ..body_area }),
            body_area,
        ),
        SidebarState::Hidden => (None, body_area),
    };

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);

    app.sidebar_area = sidebar_area;
    if let Some(side) = sidebar_area {
        frame.render_widget(Clear, side);
        render_sidebar(app, frame, side);
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &mut App, frame: &mut Frame, area: Rect) {
    let status = match &app.backend {
        BackendStatus::Checking => Span::styled("○ connecting", Style::default().fg(Color::Gray)),
        BackendStatus::Online { health, .. } if health.is_healthy() => {
            Span::styled("● online", Style::default().fg(Color::Green))
        }
        BackendStatus::Online { .. } => Span::styled("● degraded", Style::default().fg(Color::Yellow)),
        BackendStatus::Offline(_) => Span::styled("● offline", Style::default().fg(Color::Red)),
    };

    let hamburger_style = if app.layout_state().is_pinned() {
        Style::default().fg(Color::Black).bg(Color::Cyan).bold()
    } else {
        Style::default().fg(Color::White).bold()
    };

    let title = Line::from(vec![
        Span::raw(" "),
        Span::styled("☰", hamburger_style),
        Span::raw("  "),
        Span::styled("Ada Chat ", Style::default().fg(Color::Cyan).bold()),
        status,
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);

    app.hamburger_area = Some(Rect { x: area.x, width: 3.min(area.width), ..area });
    app.title_area = Some(Rect { width: SIDEBAR_WIDTH.min(area.width), ..area });
}

fn render_sidebar(app: &App, frame: &mut Frame, area: Rect) {
    let state = app.layout_state();
    let border_color = if state.is_pinned() { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" Message Ada · {} ", state.as_str()));

    let dim = Style::default().fg(Color::Gray);
    let mut lines = vec![
        Line::from(Span::styled("Backend", Style::default().bold())),
        Line::from(Span::styled(app.client.base_url().to_string(), dim)),
    ];

    match &app.backend {
        BackendStatus::Checking => lines.push(Line::from(Span::styled("checking…", dim))),
        BackendStatus::Offline(reason) => {
            lines.push(Line::from(Span::styled("offline", Style::default().fg(Color::Red))));
            lines.push(Line::from(Span::styled(reason.clone(), dim)));
        }
        BackendStatus::Online { health, models } => {
            let loaded = if health.model_loaded { "model loaded" } else { "no model loaded" };
            lines.push(Line::from(Span::styled(
                format!("{} · {}", health.status, loaded),
                Style::default().fg(Color::Green),
            )));
            if !models.is_empty() {
                lines.push(Line::default());
                lines.push(Line::from(Span::styled("Models", Style::default().bold())));
                for model in models {
                    let marker = if model.loaded { "●" } else { "○" };
                    lines.push(Line::from(format!("{} {}", marker, model.name)));
                }
            }
        }
    }

    let options = app.session.options();
    lines.push(Line::default());
    lines.push(Line::from(Span::styled("Generation", Style::default().bold())));
    lines.push(Line::from(Span::styled(
        format!("max_tokens {} · temp {:.1}", options.max_tokens, options.temperature),
        dim,
    )));

    lines.push(Line::default());
    let hint = if state.is_pinned() {
        "Ctrl+B or ☰ to hide"
    } else {
        "Ctrl+B or ☰ again to pin"
    };
    lines.push(Line::from(Span::styled(hint, dim)));

    let sidebar = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(sidebar, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let composer_height = composer_height(app, area);
    let [transcript_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(composer_height),
    ])
    .areas(area);

    render_transcript(app, frame, transcript_area);
    render_composer(app, frame, input_area);
}

fn composer_height(app: &App, area: Rect) -> u16 {
    let composer = app.session.composer();
    if !composer.is_expanded() {
        return 3;
    }

    let text_width = area.width.saturating_sub(2 + BUTTON_COLUMNS) as usize;
    let rows = wrap_chars(composer.text(), text_width).len();
    let (cursor_row, _) = cursor_position(composer.text(), composer.cursor(), text_width);
    let rows = rows.max(cursor_row + 1).clamp(1, MAX_COMPOSER_ROWS);
    rows as u16 + 2
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default().padding(Padding::horizontal(1));
    let inner = block.inner(area);
    app.transcript_area = Some(inner);

    let view = transcript_lines(&app.session, &mut app.segments, &app.thoughts, app.animation_frame);

    // Wrapped row where each logical line starts; lines wrap independently
    let wrap = Wrap { trim: false };
    let mut row_starts = Vec::with_capacity(view.lines.len());
    let mut total_rows: usize = 0;
    for line in &view.lines {
        row_starts.push(total_rows);
        total_rows += Paragraph::new(line.clone()).wrap(wrap).line_count(inner.width);
    }

    let total = u16::try_from(total_rows).unwrap_or(u16::MAX);
    app.scroll.update_layout(total, inner.height);
    let offset = app.scroll.offset;

    app.thought_toggles = view
        .toggles
        .iter()
        .filter_map(|&(line_index, id)| {
            let row = u16::try_from(row_starts[line_index]).ok()?;
            if row < offset || row >= offset.saturating_add(inner.height) {
                return None;
            }
            Some((Rect::new(inner.x, inner.y + (row - offset), inner.width, 1), id))
        })
        .collect();

    let transcript = Paragraph::new(Text::from(view.lines))
        .block(block)
        .wrap(wrap)
        .scroll((offset, 0));
    frame.render_widget(transcript, area);

    // New-message indicator when the user has scrolled away from the bottom
    app.indicator_area = None;
    if app.scroll.scrolled_up && inner.height > 0 {
        let label = " ⬇ newer ";
        let width = (label.chars().count() as u16).min(inner.width);
        let rect = Rect::new(
            inner.x + inner.width.saturating_sub(width),
            inner.y + inner.height - 1,
            width,
            1,
        );
        let indicator = Paragraph::new(label).style(Style::default().bg(Color::Blue).fg(Color::White).bold());
        frame.render_widget(indicator, rect);
        app.indicator_area = Some(rect);
    }
}

fn render_composer(app: &mut App, frame: &mut Frame, area: Rect) {
    let awaiting = app.session.is_awaiting_response();
    let composer = app.session.composer();

    // Rounded "pill" while single-line, square once expanded
    let border_type = if composer.is_expanded() {
        BorderType::Plain
    } else {
        BorderType::Rounded
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let text_width = inner.width.saturating_sub(BUTTON_COLUMNS);
    let text_area = Rect { width: text_width, ..inner };

    if composer.is_empty() {
        let placeholder = Paragraph::new(Span::styled("Message Ada", Style::default().fg(Color::DarkGray)));
        frame.render_widget(placeholder, text_area);
    } else {
        let rows = wrap_chars(composer.text(), text_width as usize);
        let (cursor_row, _) = cursor_position(composer.text(), composer.cursor(), text_width as usize);
        let visible = text_area.height.max(1) as usize;
        let first = (cursor_row + 1).saturating_sub(visible);

        let lines: Vec<Line> = rows
            .into_iter()
            .skip(first)
            .take(visible)
            .map(Line::from)
            .collect();
        let input = Paragraph::new(lines).style(Style::default().fg(Color::Cyan));
        frame.render_widget(input, text_area);
    }

    // Send / stop button in the bottom-right corner of the pill
    let button = if awaiting {
        Span::styled(" ■ ", Style::default().fg(Color::White).bg(Color::Red).bold())
    } else if composer.has_content() {
        Span::styled(" ➤ ", Style::default().fg(Color::Black).bg(Color::Cyan).bold())
    } else {
        Span::styled(" ➤ ", Style::default().fg(Color::DarkGray))
    };
    let button_area = Rect::new(
        inner.x + inner.width.saturating_sub(3),
        inner.y + inner.height.saturating_sub(1),
        3.min(inner.width),
        1.min(inner.height),
    );
    frame.render_widget(Paragraph::new(button), button_area);
    app.send_area = Some(button_area);

    // Cursor
    let (cursor_row, cursor_col) = cursor_position(composer.text(), composer.cursor(), text_width as usize);
    let visible = text_area.height.max(1) as usize;
    let first = (cursor_row + 1).saturating_sub(visible);
    frame.set_cursor_position((
        text_area.x + cursor_col as u16,
        text_area.y + (cursor_row - first) as u16,
    ));

    // Width changes (resize, sidebar pin) can flip the expand decision
    if app.composer_width != inner.width {
        app.composer_width = inner.width;
        app.refresh_composer_layout();
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let awaiting = app.session.is_awaiting_response();
    let (mode_text, mode_style) = if awaiting {
        (" WAITING ", Style::default().bg(Color::Yellow).fg(Color::Black))
    } else {
        (" CHAT ", Style::default().bg(Color::Blue).fg(Color::White))
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = vec![("Enter", "send"), ("Shift+Enter", "newline")];
    if awaiting {
        hints.push(("Esc", "stop"));
    }
    hints.extend([
        ("Ctrl+B", "sidebar"),
        ("Ctrl+T", "thoughts"),
        ("PgUp/PgDn", "scroll"),
        ("Ctrl+C", "quit"),
    ]);

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    for (key, label) in hints {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!(" {} ", label), label_style));
        spans.push(Span::raw(" "));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ada_chat_core::ChatReply;

    fn plain(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn session_with_reply(reply: &str) -> ChatSession {
        let mut session = ChatSession::default();
        let pending = session.begin("Hi");
        session.complete(pending.ticket, Ok(ChatReply::text(reply)));
        session
    }

    #[test]
    fn test_empty_transcript_shows_hint() {
        let view = transcript_lines(&ChatSession::default(), &mut SegmentCache::new(), &ThoughtOpenMap::new(), 0);
        assert_eq!(view.lines.len(), 1);
        assert!(plain(&view.lines[0]).starts_with("No messages yet"));
        assert!(view.toggles.is_empty());
    }

    #[test]
    fn test_closed_thought_hides_content() {
        let session = session_with_reply("before<think>secret plan</think>after");
        let view = transcript_lines(&session, &mut SegmentCache::new(), &ThoughtOpenMap::new(), 0);

        let text: Vec<String> = view.lines.iter().map(plain).collect();
        assert_eq!(view.toggles, vec![(5, ThoughtId { message: 1, offset: 6 })]);
        assert_eq!(text[4], "before");
        assert!(text[5].contains("Show Thoughts"));
        assert!(!text.iter().any(|l| l.contains("secret plan")));
        assert!(text.iter().any(|l| l == "after"));
    }

    #[test]
    fn test_open_thought_shows_content() {
        let session = session_with_reply("before<think>secret plan</think>after");
        let mut thoughts = ThoughtOpenMap::new();
        thoughts.toggle(ThoughtId { message: 1, offset: 6 });

        let view = transcript_lines(&session, &mut SegmentCache::new(), &thoughts, 0);
        let text: Vec<String> = view.lines.iter().map(plain).collect();
        assert!(text[5].contains("Hide Thoughts"));
        assert_eq!(text[6], "  │ secret plan");
    }

    #[test]
    fn test_user_think_tags_render_literally() {
        let mut session = ChatSession::default();
        session.begin("what is <think>x</think>?");
        let view = transcript_lines(&session, &mut SegmentCache::new(), &ThoughtOpenMap::new(), 1);

        assert!(view.toggles.is_empty());
        let text: Vec<String> = view.lines.iter().map(plain).collect();
        assert!(text.iter().any(|l| l.contains("<think>x</think>")));
        assert_eq!(text.last().map(String::as_str), Some("Thinking.."));
    }
}
