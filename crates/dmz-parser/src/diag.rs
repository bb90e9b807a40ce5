//! Diagnostic collection and rendering.
//!
//! Components report into a [`DiagnosticEngine`] passed down by the driver;
//! nothing is printed until the driver flushes a phase. Output is one line
//! per diagnostic: `<file>:<line>:<col>: error: <message>`.

use crate::source::{SourceMap, Span};
use serde::Serialize;
use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub span: Span,
    pub severity: Severity,
    pub message: String,
}

/// Accumulates diagnostics across a compilation.
#[derive(Debug, Default)]
pub struct DiagnosticEngine {
    diagnostics: Vec<Diagnostic>,
    errors: usize,
    flushed: usize,
}

impl DiagnosticEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, span: Span, message: impl Into<String>) {
        self.errors += 1;
        self.diagnostics.push(Diagnostic {
            span,
            severity: Severity::Error,
            message: message.into(),
        });
    }

    pub fn warning(&mut self, span: Span, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            span,
            severity: Severity::Warning,
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Writes the not-yet-flushed diagnostics to stderr in source order.
    pub fn flush(&mut self, map: &SourceMap) {
        let stream = StandardStream::stderr(ColorChoice::Auto);
        let mut stream = stream.lock();
        for diag in &self.diagnostics[self.flushed..] {
            let (word, color) = match diag.severity {
                Severity::Error => ("error", Color::Red),
                Severity::Warning => ("warning", Color::Yellow),
            };
            let _ = write!(stream, "{}: ", diag.span.display(map));
            let _ = stream.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
            let _ = write!(stream, "{word}");
            let _ = stream.reset();
            let _ = writeln!(stream, ": {}", diag.message);
        }
        self.flushed = self.diagnostics.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FileId;

    #[test]
    fn counts_errors_not_warnings() {
        let mut engine = DiagnosticEngine::new();
        let span = Span::new(FileId(0), 1, 1);
        engine.warning(span, "unreachable statement");
        assert!(!engine.has_errors());
        engine.error(span, "symbol 'x' not found");
        assert!(engine.has_errors());
        assert_eq!(engine.diagnostics().len(), 2);
    }
}
