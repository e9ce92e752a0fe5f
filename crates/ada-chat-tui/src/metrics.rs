//! Terminal text measurement for the composer.

use ada_chat_core::TextMetrics;
use unicode_width::UnicodeWidthChar;
use unicode_width::UnicodeWidthStr;

/// Hard-wrap `text` into rows of at most `width` cells, breaking on
/// characters. Explicit newlines always start a new row, and an empty
/// line still takes a row.
pub fn wrap_chars(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();

    for line in text.split('\n') {
        let mut row = String::new();
        let mut row_width = 0;
        for c in line.chars() {
            let w = c.width().unwrap_or(0);
            if row_width + w > width && !row.is_empty() {
                rows.push(std::mem::take(&mut row));
                row_width = 0;
            }
            row.push(c);
            row_width += w;
        }
        rows.push(row);
    }

    rows
}

/// Row and column of the char-indexed `cursor` within [`wrap_chars`] output.
pub fn cursor_position(text: &str, cursor: usize, width: usize) -> (usize, usize) {
    let width = width.max(1);
    let mut row = 0;
    let mut col = 0;

    for c in text.chars().take(cursor) {
        if c == '\n' {
            row += 1;
            col = 0;
            continue;
        }
        let w = c.width().unwrap_or(0);
        if col + w > width && col > 0 {
            row += 1;
            col = 0;
        }
        col += w;
    }

    // A cursor sitting exactly on the right edge shows at the start of the next row
    if col >= width {
        row += 1;
        col = 0;
    }

    (row, col)
}

/// One cell per column, one row per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalMetrics;

impl TextMetrics for TerminalMetrics {
    fn line_height(&self) -> f32 {
        1.0
    }

    fn content_height(&self, text: &str, width: f32) -> f32 {
        wrap_chars(text, width as usize).len() as f32
    }

    fn text_width(&self, line: &str) -> f32 {
        line.width() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_chars_breaks_long_lines() {
        assert_eq!(wrap_chars("abcdef", 4), vec!["abcd", "ef"]);
        assert_eq!(wrap_chars("ab\n\ncd", 4), vec!["ab", "", "cd"]);
        assert_eq!(wrap_chars("", 4), vec![""]);
    }

    #[test]
    fn test_wrap_chars_counts_wide_chars() {
        // Each CJK char is two cells wide
        assert_eq!(wrap_chars("日本語", 4), vec!["日本", "語"]);
    }

    #[test]
    fn test_cursor_position_follows_wrapping() {
        assert_eq!(cursor_position("abcdef", 0, 4), (0, 0));
        assert_eq!(cursor_position("abcdef", 3, 4), (0, 3));
        assert_eq!(cursor_position("abcdef", 4, 4), (1, 0));
        assert_eq!(cursor_position("abcdef", 6, 4), (1, 2));
        assert_eq!(cursor_position("ab\ncd", 4, 4), (1, 1));
    }

    #[test]
    fn test_terminal_metrics() {
        let metrics = TerminalMetrics;
        assert_eq!(metrics.content_height("abcdef", 4.0), 2.0);
        assert_eq!(metrics.content_height("abc", 4.0), 1.0);
        assert_eq!(metrics.text_width("héllo"), 5.0);
    }
}
