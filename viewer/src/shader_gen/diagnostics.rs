//! Compiler messages in user-source coordinates

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// 1-based line and column in the user's document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourcePos {
    pub line: u32,
    pub column: u32,
}

impl SourcePos {
    /// Byte offset of this position in `text`, for placing an editor caret.
    ///
    /// Columns past the end of the line clamp to the line end.
    pub fn byte_offset(&self, text: &str) -> Option<usize> {
        let line_index = usize::try_from(self.line.checked_sub(1)?).ok()?;
        let mut start = 0;
        for (i, line) in text.split('\n').enumerate() {
            if i == line_index {
                let column = self.column.saturating_sub(1) as usize;
                let within = line
                    .char_indices()
                    .nth(column)
                    .map_or(line.len(), |(offset, _)| offset);
                return Some(start + within);
            }
            start += line.len() + 1;
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// `None` when the compiler pointed outside the user's code
    pub location: Option<SourcePos>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, location: Option<SourcePos>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            location,
        }
    }

    pub fn warning(message: impl Into<String>, location: Option<SourcePos>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            location,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(pos) => write!(f, "{}:{}: {}: {}", pos.line, pos.column, self.severity, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// First error with a position, the one the editor should highlight.
pub fn first_error(diagnostics: &[Diagnostic]) -> Option<&Diagnostic> {
    diagnostics
        .iter()
        .find(|d| d.is_error() && d.location.is_some())
        .or_else(|| diagnostics.iter().find(|d| d.is_error()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_offset() {
        let text = "abc\ndef\n\nxyz";
        assert_eq!(SourcePos { line: 1, column: 1 }.byte_offset(text), Some(0));
        assert_eq!(SourcePos { line: 2, column: 3 }.byte_offset(text), Some(6));
        assert_eq!(SourcePos { line: 3, column: 9 }.byte_offset(text), Some(8));
        assert_eq!(SourcePos { line: 4, column: 2 }.byte_offset(text), Some(10));
        assert_eq!(SourcePos { line: 5, column: 1 }.byte_offset(text), None);
        assert_eq!(SourcePos { line: 0, column: 1 }.byte_offset(text), None);
    }

    #[test]
    fn test_first_error_prefers_located() {
        let diagnostics = vec![
            Diagnostic::warning("unused", Some(SourcePos { line: 1, column: 1 })),
            Diagnostic::error("in prelude", None),
            Diagnostic::error("bad token", Some(SourcePos { line: 7, column: 4 })),
        ];
        assert_eq!(first_error(&diagnostics).map(|d| d.message.as_str()), Some("bad token"));
        assert_eq!(first_error(&diagnostics[..2]).map(|d| d.message.as_str()), Some("in prelude"));
        assert!(first_error(&diagnostics[..1]).is_none());
    }

    #[test]
    fn test_display() {
        let d = Diagnostic::error("expected `;`", Some(SourcePos { line: 3, column: 12 }));
        assert_eq!(d.to_string(), "3:12: error: expected `;`");
    }
}
