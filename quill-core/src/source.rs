//! Immutable source buffers with a precomputed line index.

use std::sync::Arc;
use std::fmt;

use crate::span::TextSpan;

/// A single line of a [`SourceText`], excluding or including its line break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextLine {
    pub start: usize,
    pub length: usize,
    pub length_including_line_break: usize,
}

impl TextLine {
    pub fn end(&self) -> usize {
        self.start + self.length
    }

    pub fn span(&self) -> TextSpan {
        TextSpan::new(self.start, self.length)
    }

    pub fn span_including_line_break(&self) -> TextSpan {
        TextSpan::new(self.start, self.length_including_line_break)
    }
}

/// Source code of one submission or file.
///
/// Built once from raw text; the line table always holds at least one
/// line, and a buffer ending in a line break gets a trailing empty line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    file_name: String,
    text: String,
    lines: Vec<TextLine>,
}

impl SourceText {
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_file_name(text, "")
    }

    pub fn with_file_name(text: impl Into<String>, file_name: impl Into<String>) -> Self {
        let text = text.into();
        let lines = parse_lines(&text);
        SourceText {
            file_name: file_name.into(),
            text,
            lines,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn lines(&self) -> &[TextLine] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Zero-based index of the line containing `position`.
    pub fn line_index(&self, position: usize) -> usize {
        // The first line always starts at 0, so the partition point is >= 1.
        self.lines
            .partition_point(|line| line.start <= position)
            .saturating_sub(1)
    }

    pub fn slice(&self, span: TextSpan) -> &str {
        let end = span.end().min(self.text.len());
        let start = span.start.min(end);
        &self.text[start..end]
    }
}

impl fmt::Display for SourceText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn parse_lines(text: &str) -> Vec<TextLine> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut position = 0;
    let mut line_start = 0;

    while position < bytes.len() {
        let width = line_break_width(bytes, position);
        if width == 0 {
            position += 1;
            continue;
        }
        lines.push(TextLine {
            start: line_start,
            length: position - line_start,
            length_including_line_break: position + width - line_start,
        });
        position += width;
        line_start = position;
    }

    lines.push(TextLine {
        start: line_start,
        length: position - line_start,
        length_including_line_break: position - line_start,
    });
    lines
}

/// `\r\n` and `\n\r` each count as one break, as do lone `\r` and `\n`.
fn line_break_width(bytes: &[u8], position: usize) -> usize {
    let current = bytes[position];
    let next = bytes.get(position + 1).copied();
    match (current, next) {
        (b'\r', Some(b'\n')) | (b'\n', Some(b'\r')) => 2,
        (b'\r', _) | (b'\n', _) => 1,
        _ => 0,
    }
}

/// A span inside a particular source text, resolvable to line/column.
#[derive(Debug, Clone)]
pub struct TextLocation {
    pub text: Arc<SourceText>,
    pub span: TextSpan,
}

impl TextLocation {
    pub fn new(text: Arc<SourceText>, span: TextSpan) -> Self {
        TextLocation { text, span }
    }

    pub fn file_name(&self) -> &str {
        self.text.file_name()
    }

    pub fn start_line(&self) -> usize {
        self.text.line_index(self.span.start)
    }

    pub fn end_line(&self) -> usize {
        self.text.line_index(self.span.end())
    }

    pub fn start_character(&self) -> usize {
        self.span.start - self.text.lines()[self.start_line()].start
    }

    pub fn end_character(&self) -> usize {
        self.span.end() - self.text.lines()[self.end_line()].start
    }
}

impl PartialEq for TextLocation {
    fn eq(&self, other: &Self) -> bool {
        self.span == other.span && self.file_name() == other.file_name()
    }
}

impl Eq for TextLocation {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_lines() {
        assert_eq!(SourceText::new(".").line_count(), 1);
        assert_eq!(SourceText::new("").line_count(), 1);
        assert_eq!(SourceText::new("\n\r").line_count(), 2);
        assert_eq!(SourceText::new("\n\r\r\n").line_count(), 3);
        assert_eq!(SourceText::new(".\r\n").line_count(), 2);
        assert_eq!(SourceText::new("a\nb\nc").line_count(), 3);
        assert_eq!(SourceText::new("\n\n").line_count(), 3);
    }

    #[test]
    fn finds_line_of_position() {
        let text = SourceText::new("ab\ncd\r\nef");
        assert_eq!(text.line_index(0), 0);
        assert_eq!(text.line_index(2), 0);
        assert_eq!(text.line_index(3), 1);
        assert_eq!(text.line_index(7), 2);
        assert_eq!(text.line_index(9), 2);
        assert_eq!(text.lines()[1].length, 2);
        assert_eq!(text.lines()[1].length_including_line_break, 4);
    }

    #[test]
    fn location_reports_line_and_column() {
        let text = Arc::new(SourceText::with_file_name("var x = 1\n  x = y", "demo.ql"));
        let location = TextLocation::new(text, TextSpan::new(16, 1));
        assert_eq!(location.file_name(), "demo.ql");
        assert_eq!(location.start_line(), 1);
        assert_eq!(location.start_character(), 6);
        assert_eq!(location.end_character(), 7);
    }
}
