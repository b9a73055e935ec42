use std::io::{self, Write};

use quill_core::Diagnostic;

/// Print each diagnostic followed by its source line with the span
/// underlined.
pub fn write_diagnostics(out: &mut impl Write, diagnostics: &[Diagnostic]) -> io::Result<()> {
    for diagnostic in diagnostics {
        writeln!(out, "{diagnostic}")?;

        let location = &diagnostic.location;
        let Some(line) = location.text.lines().get(location.start_line()) else {
            continue;
        };
        let line_text = location.text.slice(line.span());
        let span = diagnostic.span();
        let column = span.start.saturating_sub(line.start).min(line_text.len());
        let underline_end = span.end().min(line.end()).max(span.start + 1);

        let indent = line_text.get(..column).map_or(column, |prefix| prefix.chars().count());
        let width = location
            .text
            .as_str()
            .get(span.start..underline_end)
            .map_or(1, |marked| marked.chars().count().max(1));

        writeln!(out, "    {line_text}")?;
        writeln!(out, "    {}{}", " ".repeat(indent), "^".repeat(width))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::{Compilation, SyntaxTree};

    #[test]
    fn underlines_the_reported_span() {
        let compilation = Compilation::new(vec![SyntaxTree::parse("var a = 1\nvar b = a + nope")]);
        let mut out = Vec::new();
        write_diagnostics(&mut out, &compilation.diagnostics()).expect("write");
        let text = String::from_utf8(out).expect("utf-8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("(2,13,2,17): error Q0203"), "{}", lines[0]);
        assert_eq!(lines[1], "    var b = a + nope");
        assert_eq!(lines[2], "                ^^^^");
    }

    #[test]
    fn marks_missing_tokens_at_end_of_line() {
        let compilation = Compilation::new(vec![SyntaxTree::parse("print(\"a\"")]);
        let mut out = Vec::new();
        write_diagnostics(&mut out, &compilation.diagnostics()).expect("write");
        let text = String::from_utf8(out).expect("utf-8");
        assert!(text.contains("Q0100"), "{text}");
        assert!(text.ends_with("    print(\"a\"\n             ^\n"), "{text:?}");
    }
}
