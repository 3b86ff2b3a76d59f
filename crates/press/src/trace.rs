//! Reconstructing stack traces from the dynamic call chain.
//!
//! A runtime error carries a chain of frames, innermost first.
//! Script frames point at arena nodes; this module turns each node's byte
//!     offset back into a file, a 1-based line number, the literal text of
//!     that line, and a column.
//! Line numbers account for the `prefix_lines` of the node's source
//!     block, so a failure in a document body is reported with the header
//!     lines above it counted in.
//!
//! The report prints the chain outermost first; the innermost frame also
//!     gets a caret under the failing token's column.

use colored::Colorize;

use crate::ast::{Ast, NodeId};
use crate::error::{Error, Frame};

/// A frame resolved against the source it came from.
#[derive(Debug, PartialEq, Eq)]
pub enum ResolvedFrame {
    Script {
        path: String,
        /// 1-based, counting the source block's prefix lines.
        line_number: usize,
        /// The literal text of the line.
        line: String,
        /// 0-based character offset of the failing token within the line.
        column: usize,
    },
    Host {
        file: &'static str,
        line: u32,
    },
}

/// Resolve a script frame to its source line.
pub fn resolve(ast: &Ast, node: NodeId) -> ResolvedFrame {
    let node = ast.node(node);
    let source = ast.source(node.source);
    let text = &source.text;
    let start = node.span.start.min(text.len());

    let mut line_number = 1;
    let mut line_start = 0;
    for (i, c) in text.char_indices() {
        if i >= start {
            break;
        }
        if c == '\n' {
            line_number += 1;
            line_start = i + c.len_utf8();
        }
    }
    let tail = &text[line_start..];
    let line = match tail.split_once('\n') {
        Some((line, _)) => line,
        None => tail,
    };
    let column = text[line_start..start].chars().count();
    ResolvedFrame::Script {
        path: source.path.display().to_string(),
        line_number: source.prefix_lines + line_number,
        line: line.to_string(),
        column,
    }
}

/// Render the full report for an error: title, then the frame chain
/// outermost first, with a caret under the innermost frame's token.
pub fn report(ast: &Ast, error: &Error) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    let _ = writeln!(out, "{} {}", "Error:".bright_red().bold(), error.kind.title());
    for (i, frame) in error.frames.iter().enumerate().rev() {
        let innermost = i == 0;
        match frame {
            Frame::Script(node) => {
                let ResolvedFrame::Script {
                    path,
                    line_number,
                    line,
                    column,
                } = resolve(ast, *node)
                else {
                    unreachable!("script frames resolve to script locations");
                };
                let _ = writeln!(out, ">>> {path}:{line_number}");
                let gutter = format!("{line_number} | ");
                let _ = writeln!(out, "  {}{}", gutter.dimmed(), line);
                if innermost {
                    let padding = " ".repeat(2 + gutter.chars().count() + column);
                    let _ = writeln!(out, "{padding}{}", "^".bright_yellow().bold());
                }
            }
            Frame::Host { file, line } => {
                let _ = writeln!(out, ">>> {file}:{line} (builtin)");
            }
        }
    }
    out
}
