//! Styled status lines on stderr.

use std::fmt::Display;

use console::{Style, Term};

/// How a status line is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Plain,
    Heading,
    Done,
    Attention,
    Failure,
    Unchanged,
}

impl Tone {
    fn style(self) -> Style {
        let style = Style::new().for_stderr();
        match self {
            Tone::Plain => style,
            Tone::Heading => style.bold(),
            Tone::Done => style.green(),
            Tone::Attention => style.yellow(),
            Tone::Failure => style.red(),
            Tone::Unchanged => style.dim(),
        }
    }
}

/// Writes command feedback to stderr, leaving stdout free.
pub(crate) struct Output {
    term: Term,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    fn line(&self, tone: Tone, msg: impl Display) {
        // Write errors on stderr are ignored
        let _ = self.term.write_line(&tone.style().apply_to(msg).to_string());
    }

    pub(crate) fn info(&self, msg: impl Display) {
        self.line(Tone::Plain, msg);
    }

    /// Section title for a report.
    pub(crate) fn heading(&self, msg: impl Display) {
        self.line(Tone::Heading, msg);
    }

    pub(crate) fn success(&self, msg: impl Display) {
        self.line(Tone::Done, msg);
    }

    pub(crate) fn warning(&self, msg: impl Display) {
        self.line(Tone::Attention, msg);
    }

    pub(crate) fn error(&self, msg: impl Display) {
        self.line(Tone::Failure, msg);
    }

    /// Resources a run left alone.
    pub(crate) fn muted(&self, msg: impl Display) {
        self.line(Tone::Unchanged, msg);
    }
}
