//! Message composer: input buffer, cursor, and the expanded/collapsed layout flag.

use crate::state::ChatMessage;

/// Text measurement provided by whatever surface renders the composer.
///
/// Units are the host's own (pixels in a browser, cells in a terminal); the
/// composer only compares them against each other.
pub trait TextMetrics {
    /// Height of a single rendered line.
    fn line_height(&self) -> f32;

    /// Rendered height of `text` wrapped into `width`.
    fn content_height(&self, text: &str, width: f32) -> f32;

    /// Rendered width of a single line with no wrapping.
    fn text_width(&self, line: &str) -> f32;
}

/// Fixed slack used when deciding whether the composer should expand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpandRules {
    /// How far past one line's height content may grow before expanding.
    pub height_tolerance: f32,
    /// Width kept free for the trailing controls (attach, send/stop).
    pub reserved_width: f32,
}

impl ExpandRules {
    /// Browser-style measurements.
    pub const PIXELS: ExpandRules = ExpandRules {
        height_tolerance: 2.0,
        reserved_width: 92.0,
    };

    /// Terminal cell measurements.
    pub const CELLS: ExpandRules = ExpandRules {
        height_tolerance: 0.0,
        reserved_width: 4.0,
    };
}

impl Default for ExpandRules {
    fn default() -> Self {
        Self::CELLS
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[derive(Debug, Clone, Default)]
pub struct Composer {
    text: String,
    cursor: usize, // char index into text
    expanded: bool,
    rules: ExpandRules,
}

impl Composer {
    pub fn new(rules: ExpandRules) -> Self {
        Self {
            rules,
            ..Self::default()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// True when the send control should look active.
    pub fn has_content(&self) -> bool {
        !self.text.trim().is_empty()
    }

    pub fn rules(&self) -> ExpandRules {
        self.rules
    }

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.text, self.cursor);
        self.text.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn insert_newline(&mut self) {
        self.insert_char('\n');
        self.expanded = true;
    }

    /// Insert pasted text at the cursor. CRLF and lone CR become `\n`.
    pub fn insert_str(&mut self, text: &str) {
        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        if normalized.is_empty() {
            return;
        }
        let byte_pos = char_to_byte_index(&self.text, self.cursor);
        self.text.insert_str(byte_pos, &normalized);
        self.cursor += normalized.chars().count();
        if normalized.contains('\n') {
            self.expanded = true;
        }
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
        if self.text.is_empty() {
            self.expanded = false;
        }
    }

    pub fn delete(&mut self) {
        let char_count = self.text.chars().count();
        if self.cursor < char_count {
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
        if self.text.is_empty() {
            self.expanded = false;
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        let char_count = self.text.chars().count();
        self.cursor = (self.cursor + 1).min(char_count);
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.text.chars().count();
    }

    /// Replace the whole buffer, cursor at the end.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.cursor = self.text.chars().count();
        if self.text.is_empty() {
            self.expanded = false;
        }
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
        self.expanded = false;
    }

    pub fn reset_layout(&mut self) {
        self.expanded = false;
    }

    /// Recompute `expanded` against the host's measurements.
    ///
    /// `control_width` is the full inner width of the input control; the
    /// reserved trailing width is subtracted here.
    pub fn evaluate_expanded(&mut self, metrics: &dyn TextMetrics, control_width: f32) -> bool {
        self.expanded = self.should_expand(metrics, control_width);
        self.expanded
    }

    fn should_expand(&self, metrics: &dyn TextMetrics, control_width: f32) -> bool {
        if self.text.is_empty() {
            return false;
        }
        if self.text.contains('\n') {
            return true;
        }

        let available = (control_width - self.rules.reserved_width).max(0.0);
        let one_line = metrics.line_height().ceil();
        if metrics.content_height(&self.text, available) > one_line + self.rules.height_tolerance {
            return true;
        }

        let first_line = self.text.split('\n').next().unwrap_or_default();
        metrics.text_width(first_line) > available
    }

    /// Take the trimmed text as an outgoing user message.
    ///
    /// Silently does nothing when the trimmed text is empty or a reply is
    /// still pending.
    pub fn submit(&mut self, awaiting_response: bool) -> Option<ChatMessage> {
        let trimmed = self.text.trim();
        if trimmed.is_empty() || awaiting_response {
            return None;
        }

        let message = ChatMessage::user(trimmed);
        self.clear();
        Some(message)
    }
}
