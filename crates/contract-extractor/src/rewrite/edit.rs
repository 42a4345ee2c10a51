//! Byte-range text edits computed from a syntax tree.

use std::ops::Range;

use crate::diagnostic::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Edit {
    range: Range<usize>,
    replacement: String,
}

/// A set of non-overlapping edits against one source text.
///
/// Ranges refer to the original text; [`EditSet::apply`] applies them back to
/// front so earlier offsets stay valid. An edit overlapping one already
/// recorded is dropped.
#[derive(Debug, Clone, Default)]
pub struct EditSet {
    edits: Vec<Edit>,
}

impl EditSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Records a replacement. Returns false if it overlaps an existing edit.
    pub fn replace(&mut self, range: Range<usize>, replacement: impl Into<String>) -> bool {
        let overlaps = self.edits.iter().any(|e| {
            let both_inserts = e.range.is_empty() && range.is_empty();
            !both_inserts && range.start < e.range.end.max(e.range.start + 1) && e.range.start < range.end.max(range.start + 1)
        });
        if overlaps {
            return false;
        }
        self.edits.push(Edit {
            range,
            replacement: replacement.into(),
        });
        true
    }

    pub fn insert(&mut self, at: usize, text: impl Into<String>) -> bool {
        self.replace(at..at, text)
    }

    pub fn delete(&mut self, range: Range<usize>) -> bool {
        self.replace(range, "")
    }

    /// Deletes a whole statement together with the line break that follows it.
    pub fn delete_statement(&mut self, source: &str, span: Span) -> bool {
        let range = extend_over_line_end(source, span.range());
        self.delete(range)
    }

    /// Deletes a decorator and the whitespace that separates it from what follows.
    pub fn delete_decorator(&mut self, source: &str, span: Span) -> bool {
        let mut end = span.end;
        let bytes = source.as_bytes();
        while end < bytes.len() && matches!(bytes[end], b' ' | b'\t' | b'\r' | b'\n') {
            end += 1;
        }
        // keep the indentation of the next line
        let mut start = span.start;
        while start > 0 && matches!(bytes[start - 1], b' ' | b'\t') {
            start -= 1;
        }
        let line_start = start == 0 || bytes[start - 1] == b'\n';
        if line_start {
            let indent = &source[start..span.start];
            return self.replace(start..end, indent.to_string());
        }
        self.delete(span.start..end)
    }

    pub fn apply(mut self, source: &str) -> String {
        self.edits.sort_by(|a, b| b.range.start.cmp(&a.range.start).then(b.range.end.cmp(&a.range.end)));
        let mut out = source.to_string();
        for edit in self.edits {
            if edit.range.end <= out.len() && out.is_char_boundary(edit.range.start) && out.is_char_boundary(edit.range.end) {
                out.replace_range(edit.range, &edit.replacement);
            }
        }
        out
    }
}

/// Extends a range over trailing spaces and one line break.
fn extend_over_line_end(source: &str, range: Range<usize>) -> Range<usize> {
    let bytes = source.as_bytes();
    let mut end = range.end;
    while end < bytes.len() && matches!(bytes[end], b' ' | b'\t') {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'\r' {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'\n' {
        end += 1;
    }
    range.start..end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_back_to_front() {
        let mut edits = EditSet::new();
        edits.replace(0..3, "let");
        edits.insert(4, "_");
        edits.replace(8..9, "2");
        assert_eq!(edits.apply("var x = 1;"), "let _x = 2;");
    }

    #[test]
    fn test_overlapping_edit_is_rejected() {
        let mut edits = EditSet::new();
        assert!(edits.replace(2..6, "a"));
        assert!(!edits.replace(4..8, "b"));
        assert!(!edits.insert(3, "c"));
        assert!(edits.insert(6, "d"));
        assert_eq!(edits.len(), 2);
    }

    #[test]
    fn test_delete_statement_consumes_newline() {
        let source = "import a from \"a\";\nimport b from \"b\";\n";
        let mut edits = EditSet::new();
        edits.delete_statement(source, Span::new(0, 18, 0));
        assert_eq!(edits.apply(source), "import b from \"b\";\n");
    }

    #[test]
    fn test_delete_decorator_keeps_indentation() {
        let source = "  @PublicEvent()\n  export class A {}\n";
        let mut edits = EditSet::new();
        edits.delete_decorator(source, Span::new(2, 16, 0));
        assert_eq!(edits.apply(source), "  export class A {}\n");

        let inline = "export @PublicEvent() class A {}";
        let mut edits = EditSet::new();
        edits.delete_decorator(inline, Span::new(7, 21, 0));
        assert_eq!(edits.apply(inline), "export class A {}");
    }
}
