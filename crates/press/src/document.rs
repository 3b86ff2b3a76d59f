//! Loading and running whole documents.
//!
//! A document is an optional header of statements, terminated by a line
//!     of twenty or more `-` characters, followed by the body template.
//! The header executes first and its bindings are visible to every
//!     insertion in the body.

use std::collections::HashMap;
use std::path::Path;

use press_typeset::Fragment;

use crate::ast::{Ast, NodeId};
use crate::error::{Error, ParseError};
use crate::exec::ExecutionInput;
use crate::parse;
use crate::runtime::{BuiltIn, Runtime, Value};

/// Split a document into its header and body.
///
/// Returns the header text (if there is a separator line), the body text,
///     and the number of source lines preceding the body.
pub fn split_source(source: &str) -> (Option<&str>, &str, usize) {
    let mut offset = 0;
    let mut line_number = 0;
    for line in source.split_inclusive('\n') {
        line_number += 1;
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.len() >= 20 && trimmed.bytes().all(|b| b == b'-') {
            let header = &source[..offset];
            let body = &source[offset + line.len()..];
            return (Some(header), body, line_number);
        }
        offset += line.len();
    }
    (None, source, 0)
}

/// A parsed document, ready to run.
#[derive(Debug)]
pub struct Document {
    pub ast: Ast,
    pub runtime: Runtime,
    header: Option<NodeId>,
    body: NodeId,
    body_offset: usize,
}

impl Document {
    /// Parse a document.
    ///
    /// Parse errors are reported in whole-file coordinates, so their
    /// spans can be printed against `source` directly.
    pub fn parse(
        path: impl AsRef<Path>,
        source: &str,
        built_ins: HashMap<&'static str, BuiltIn>,
    ) -> Result<Document, ParseError> {
        let path = path.as_ref();
        let (header_text, body_text, prefix_lines) = split_source(source);
        let mut ast = Ast::default();

        let header = match header_text {
            Some(text) => {
                let source_id = ast.add_source(path, text, 0);
                let root = parse::parse_script(&mut ast, source_id)?;
                ast.attach(root);
                Some(root)
            }
            None => None,
        };

        let body_offset = source.len() - body_text.len();
        let source_id = ast.add_source(path, body_text, prefix_lines);
        let body = parse::parse_template(&mut ast, source_id)
            .map_err(|err| err.with_offset(body_offset))?;
        ast.attach(body);

        Ok(Document {
            ast,
            runtime: Runtime::new(built_ins),
            header,
            body,
            body_offset,
        })
    }

    /// Byte offset of the body within the file.
    pub fn body_offset(&self) -> usize {
        self.body_offset
    }

    /// Execute the header and then the body template.
    ///
    /// The returned fragments are anything the header emitted followed by
    /// the body's output, in emission order.
    pub fn run(&mut self) -> Result<Vec<Fragment>, Error> {
        let mut input = ExecutionInput::new(&self.ast, &mut self.runtime);
        if let Some(header) = self.header {
            input.execute(header)?;
        }
        let body_value = input.execute(self.body)?;
        let mut fragments = self.runtime.take_base_fragments();
        if let Value::Fragments(body_fragments) = body_value {
            fragments.extend(body_fragments);
        }
        Ok(fragments)
    }
}
