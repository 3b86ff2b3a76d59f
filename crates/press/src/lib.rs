//! # Press
//!
//! Press turns a small scripting+templating language into paginated,
//!     styled text.
//! A document is an optional header script that establishes bindings,
//!     followed by a body template that mixes literal text with
//!     bracket-delimited script insertions.
//! Executing the body yields a stream of text fragments that the
//!     `press-typeset` crate wraps, columnizes and paginates.
//!
//! The usual entry point is [Document]:
//!
//! ```
//! use press::{builtins, Document};
//!
//! let source = "greeting = \"hello\"\n--------------------\n[output get \"greeting\"]";
//! let mut doc = Document::parse("demo.press", source, builtins::built_ins()).unwrap();
//! let fragments = doc.run().unwrap();
//! assert_eq!(fragments[0].text, "hello");
//! ```

pub mod ast;
pub mod builtins;
mod document;
pub mod error;
mod exec;
mod lexer;
pub mod parse;
pub mod runtime;
pub mod trace;

pub use document::{split_source, Document};
pub use error::{Error, ErrorKind, Frame, ParseError};
pub use exec::ExecutionInput;
pub use runtime::{BuiltIn, Runtime, Value};
