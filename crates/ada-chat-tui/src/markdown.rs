//! Markdown to styled terminal lines.
//!
//! Covers what chat replies actually use: paragraphs, headings, emphasis,
//! inline code, fenced code blocks, lists, rules and links. Anything else
//! degrades to its plain text.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

struct Renderer {
    base: Style,
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    styles: Vec<Style>,
    // One entry per open list: Some(next number) for ordered lists
    lists: Vec<Option<u64>>,
    in_code_block: bool,
    pending_prefix: Option<String>,
}

impl Renderer {
    fn new(base: Style) -> Self {
        Self {
            base,
            lines: Vec::new(),
            current: Vec::new(),
            styles: vec![base],
            lists: Vec::new(),
            in_code_block: false,
            pending_prefix: None,
        }
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or(self.base)
    }

    fn push_style(&mut self, patch: Style) {
        let next = self.style().patch(patch);
        self.styles.push(next);
    }

    fn pop_style(&mut self) {
        if self.styles.len() > 1 {
            self.styles.pop();
        }
    }

    fn push_text(&mut self, text: &str, style: Style) {
        if let Some(prefix) = self.pending_prefix.take() {
            self.current.push(Span::styled(prefix, self.base));
        }
        self.current.push(Span::styled(text.to_string(), style));
    }

    fn flush_line(&mut self) {
        if let Some(prefix) = self.pending_prefix.take() {
            self.current.push(Span::styled(prefix, self.base));
        }
        let spans = std::mem::take(&mut self.current);
        self.lines.push(Line::from(spans));
    }

    fn blank_line(&mut self) {
        if self.lines.last().is_some_and(|l| l.spans.is_empty()) || self.lines.is_empty() {
            return;
        }
        self.lines.push(Line::default());
    }

    fn indent(&self) -> String {
        "  ".repeat(self.lists.len().saturating_sub(1))
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {}
            Tag::Heading { .. } => {
                self.push_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
            }
            Tag::Emphasis => self.push_style(Style::default().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_style(Style::default().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => self.push_style(Style::default().add_modifier(Modifier::CROSSED_OUT)),
            Tag::Link { .. } => {
                self.push_style(Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED));
            }
            Tag::CodeBlock(kind) => {
                if !self.current.is_empty() {
                    self.flush_line();
                }
                self.in_code_block = true;
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        self.lines.push(Line::from(Span::styled(
                            format!("  {}", lang),
                            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                        )));
                    }
                }
            }
            Tag::HtmlBlock => {
                if !self.current.is_empty() {
                    self.flush_line();
                }
            }
            Tag::List(start) => {
                if !self.current.is_empty() {
                    self.flush_line();
                }
                self.lists.push(start);
            }
            Tag::Item => {
                let indent = self.indent();
                let bullet = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let bullet = format!("{}{}. ", indent, n);
                        *n += 1;
                        bullet
                    }
                    _ => format!("{}• ", indent),
                };
                self.pending_prefix = Some(bullet);
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.flush_line();
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::Heading(_) => {
                self.pop_style();
                self.flush_line();
                self.blank_line();
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link => self.pop_style(),
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                self.blank_line();
            }
            TagEnd::HtmlBlock => {
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::Item => {
                if !self.current.is_empty() || self.pending_prefix.is_some() {
                    self.flush_line();
                }
            }
            TagEnd::List(_) => {
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_code_block {
            let code_style = Style::default().fg(Color::Green);
            for line in text.lines() {
                self.lines.push(Line::from(vec![
                    Span::styled("  │ ", Style::default().fg(Color::DarkGray)),
                    Span::styled(line.to_string(), code_style),
                ]));
            }
            return;
        }
        let style = self.style();
        self.push_text(text, style);
    }

    /// Block-level HTML keeps its source lines; an unclosed `<think>` from a
    /// truncated reply lands here.
    fn html_block(&mut self, html: &str) {
        let style = self.style();
        for line in html.lines() {
            self.push_text(line, style);
            self.flush_line();
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        if !self.current.is_empty() || self.pending_prefix.is_some() {
            self.flush_line();
        }
        while self.lines.last().is_some_and(|l| l.spans.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }
}

/// Render markdown into lines, layering element styles over `base`.
pub fn render_markdown(source: &str, base: Style) -> Vec<Line<'static>> {
    let mut renderer = Renderer::new(base);
    let parser = Parser::new_ext(source, Options::ENABLE_STRIKETHROUGH);

    for event in parser {
        match event {
            Event::Start(tag) => renderer.start(tag),
            Event::End(tag) => renderer.end(tag),
            Event::Text(text) => renderer.text(&text),
            Event::Code(code) => {
                let style = renderer.style().patch(Style::default().fg(Color::Green));
                renderer.push_text(&code, style);
            }
            Event::Html(html) => renderer.html_block(&html),
            Event::InlineHtml(html) => renderer.text(&html),
            Event::SoftBreak => {
                let style = renderer.style();
                renderer.push_text(" ", style);
            }
            Event::HardBreak => renderer.flush_line(),
            Event::Rule => {
                renderer.lines.push(Line::from(Span::styled(
                    "─".repeat(24),
                    Style::default().fg(Color::DarkGray),
                )));
                renderer.blank_line();
            }
            _ => {}
        }
    }

    renderer.finish()
}
