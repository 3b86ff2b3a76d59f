//! Error types.
//!
//! There are two families of failure.
//! [ParseError] is produced while turning source text into a tree; it is
//!     fatal, precedes any execution, and renders as an
//!     [ariadne](https://docs.rs/ariadne) report with a labeled span.
//! [Error] is produced while executing a tree.
//! It carries the chain of dynamic call frames that were active when it
//!     was raised, so the runtime can print a multi-frame stack trace
//!     pointing into the document source.

use crate::ast::{Ast, NodeId, Span};

/// Error encountered while parsing Press source.
#[derive(Debug, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A character that cannot start any token.
    UnexpectedCharacter { found: char },
    /// A string literal with no closing quote.
    UnterminatedString,
    /// A `/*` comment with no closing `*/`.
    UnterminatedComment,
    /// An insertion or template argument with no closing bracket.
    UnterminatedTemplate,
    /// A `]` with no matching `[`.
    UnmatchedBracket,
    /// Some other token than the one the grammar requires.
    UnexpectedToken {
        found: String,
        expected: &'static str,
    },
    /// Input ended where the grammar requires more.
    UnexpectedEndOfInput { expected: &'static str },
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span) -> ParseError {
        ParseError { kind, span }
    }

    /// Shift the span by `delta` bytes.
    ///
    /// Used when a block was parsed as a slice of a larger file and the
    /// error should be reported in file coordinates.
    pub fn with_offset(mut self, delta: usize) -> ParseError {
        self.span.start += delta;
        self.span.end += delta;
        self
    }

    pub fn message(&self) -> String {
        use ParseErrorKind::*;
        match &self.kind {
            UnexpectedCharacter { found } => {
                format!("the character `{found}` cannot appear here")
            }
            UnterminatedString => "this string is never closed".into(),
            UnterminatedComment => "this comment is never closed".into(),
            UnterminatedTemplate => "this template is never closed".into(),
            UnmatchedBracket => "there is no `[` for this `]` to close".into(),
            UnexpectedToken { found, expected } => {
                format!("expected {expected}, found `{found}`")
            }
            UnexpectedEndOfInput { expected } => {
                format!("expected {expected}, but the input ended")
            }
        }
    }

    pub fn ariadne_report(
        &self,
        file_name: &str,
    ) -> ariadne::Report<'static, (String, std::ops::Range<usize>)> {
        ariadne::Report::build(
            ariadne::ReportKind::Error,
            (file_name.to_string(), self.span.range()),
        )
        .with_message("syntax error")
        .with_label(
            ariadne::Label::new((file_name.to_string(), self.span.range()))
                .with_message(self.message())
                .with_color(ariadne::Color::BrightRed),
        )
        .finish()
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "syntax error at bytes {}..{}: {}",
            self.span.start,
            self.span.end,
            self.message()
        )
    }
}

impl std::error::Error for ParseError {}

/// One element of the dynamic call chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Frame {
    /// A call written in the document.
    Script(NodeId),
    /// A native call site that re-entered the interpreter, for example a
    /// styling builtin evaluating a deferred template argument.
    Host { file: &'static str, line: u32 },
}

/// What went wrong during execution.
#[derive(Clone, Debug, PartialEq)]
pub enum ErrorKind {
    /// A call subject or `get` lookup that is bound nowhere on the scope
    /// stack.
    UndefinedName { name: String },
    /// A failure inside an invoked builtin.
    BuiltinFailed { message: String },
    /// A column index not covered by the current `columns` declaration.
    UndeclaredColumn { index: i64, declared: usize },
    /// More than one fragment where a single line is required.
    AmbiguousLineValue { count: usize },
}

impl ErrorKind {
    pub fn title(&self) -> String {
        use ErrorKind::*;
        match self {
            UndefinedName { name } => format!("undefined name `{name}`"),
            BuiltinFailed { message } => message.clone(),
            UndeclaredColumn { index, declared } => format!(
                "column {index} is not declared by the current `columns` call ({declared} declared)"
            ),
            AmbiguousLineValue { count } => format!(
                "{count} fragments for a `line` call is ambiguous, use `output`"
            ),
        }
    }
}

/// A runtime error with the dynamic call chain captured at raise time.
///
/// `frames` is innermost-first: the first element points at the failing
///     node and the rest walk outward through the call sites that were
///     active.
/// An error raised inside a builtin starts out with no frames at all; the
///     call dispatch wraps it with the frame chain of the calling node
///     before propagating it further.
#[derive(Clone, Debug, PartialEq)]
pub struct Error {
    pub kind: ErrorKind,
    pub frames: Vec<Frame>,
}

impl Error {
    /// An untraced builtin failure with the given message.
    pub fn message(message: impl Into<String>) -> Error {
        Error {
            kind: ErrorKind::BuiltinFailed {
                message: message.into(),
            },
            frames: vec![],
        }
    }

    /// An untraced error of the given kind.
    pub fn untraced(kind: ErrorKind) -> Error {
        Error {
            kind,
            frames: vec![],
        }
    }

    /// An error raised at `node` with the given chain of outer call
    /// frames (outermost-first, as the runtime stores them).
    pub fn traced(kind: ErrorKind, node: NodeId, outer: &[Frame]) -> Error {
        Error {
            kind,
            frames: std::iter::once(Frame::Script(node))
                .chain(outer.iter().rev().copied())
                .collect(),
        }
    }

    pub fn is_traced(&self) -> bool {
        !self.frames.is_empty()
    }

    /// Attach the frame chain of the calling node to an untraced error.
    pub(crate) fn trace_at(mut self, node: NodeId, outer: &[Frame]) -> Error {
        debug_assert!(self.frames.is_empty());
        self.frames = std::iter::once(Frame::Script(node))
            .chain(outer.iter().rev().copied())
            .collect();
        self
    }

    /// Render the full stack trace against the tree the error came from.
    pub fn report(&self, ast: &Ast) -> String {
        crate::trace::report(ast, self)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind.title())
    }
}

impl std::error::Error for Error {}
