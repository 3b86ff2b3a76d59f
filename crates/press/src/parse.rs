//! Recursive-descent parser for the Press script and template grammars.
//!
//! The script grammar covers header code and the insides of insertions:
//!     literals, assignments, calls, function literals, lists and objects,
//!     separated by `;` or newlines.
//! The template grammar covers the document body and template-valued call
//!     arguments: literal text interleaved with bracket-delimited
//!     insertions.
//!
//! The two grammars reference each other. An insertion contains
//!     statements; inside those statements a call may take template
//!     arguments, written `name[...]`, which recurse back into the
//!     template grammar. Template arguments only exist in template
//!     context: in header code a bracket always opens a list.

use crate::ast::{Ast, Expr, NodeId, SourceId, Span, TemplatePart};
use crate::error::{ParseError, ParseErrorKind};
use crate::lexer::{decode_string, Lexer, Token, TokenValue};

/// Parse a block of statements, e.g. a document header.
pub fn parse_script(ast: &mut Ast, source: SourceId) -> Result<NodeId, ParseError> {
    let text = ast.source(source).text.clone();
    let mut parser = Parser {
        lexer: Lexer::new(&text),
        ast,
        source,
        in_template: false,
    };
    parser.statements(Terminator::EndOfInput)
}

/// Parse a template, e.g. a document body.
pub fn parse_template(ast: &mut Ast, source: SourceId) -> Result<NodeId, ParseError> {
    let text = ast.source(source).text.clone();
    let mut parser = Parser {
        lexer: Lexer::new(&text),
        ast,
        source,
        in_template: true,
    };
    parser.template(false, false)
}

#[derive(Clone, Copy, PartialEq)]
enum Terminator {
    EndOfInput,
    /// Stop at `]` (insertion statements).
    Bracket,
    /// Stop at `}` (function bodies).
    Brace,
}

struct Parser<'a, 's> {
    lexer: Lexer<'s>,
    ast: &'a mut Ast,
    source: SourceId,
    in_template: bool,
}

impl<'a, 's> Parser<'a, 's> {
    fn alloc(&mut self, span: Span, expr: Expr) -> NodeId {
        self.ast.alloc(self.source, span, expr)
    }

    fn end_of(&self, node: NodeId) -> usize {
        self.ast.node(node).span.end
    }

    fn unexpected(token: &Token, expected: &'static str) -> ParseError {
        ParseError::new(
            ParseErrorKind::UnexpectedToken {
                found: token.value.describe(),
                expected,
            },
            token.span,
        )
    }

    fn end_of_input(&self, expected: &'static str) -> ParseError {
        let pos = self.lexer.pos();
        ParseError::new(
            ParseErrorKind::UnexpectedEndOfInput { expected },
            Span::new(pos, pos),
        )
    }

    /// Consume statement separators: newlines and semicolons.
    fn skip_separators(&mut self) -> Result<(), ParseError> {
        while let Some(token) = self.lexer.peek()? {
            match token.value {
                TokenValue::Newline | TokenValue::Semicolon => {
                    self.lexer.next()?;
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Consume newlines, which are insignificant inside brackets.
    fn skip_newlines(&mut self) -> Result<(), ParseError> {
        while let Some(token) = self.lexer.peek()? {
            match token.value {
                TokenValue::Newline => {
                    self.lexer.next()?;
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn statements(&mut self, terminator: Terminator) -> Result<NodeId, ParseError> {
        let start = self.lexer.pos();
        let mut children = vec![];
        loop {
            self.skip_separators()?;
            let Some(token) = self.lexer.peek()? else {
                match terminator {
                    Terminator::EndOfInput => break,
                    Terminator::Bracket => return Err(self.end_of_input("`]`")),
                    Terminator::Brace => return Err(self.end_of_input("`}`")),
                }
            };
            match (terminator, &token.value) {
                (Terminator::Bracket, TokenValue::BracketClose)
                | (Terminator::Brace, TokenValue::BraceClose) => break,
                _ => {}
            }
            children.push(self.expr()?);
        }
        let span = Span::new(start, self.lexer.pos());
        Ok(self.alloc(span, Expr::Statements { children }))
    }

    fn expr(&mut self) -> Result<NodeId, ParseError> {
        let Some(token) = self.lexer.next()? else {
            return Err(self.end_of_input("an expression"));
        };
        match token.value {
            TokenValue::Number(raw) => {
                Ok(self.alloc(token.span, Expr::Number { raw: raw.into() }))
            }
            TokenValue::Str(raw) => Ok(self.alloc(token.span, Expr::Str { raw: raw.into() })),
            TokenValue::True => Ok(self.alloc(token.span, Expr::Bool(true))),
            TokenValue::False => Ok(self.alloc(token.span, Expr::Bool(false))),
            TokenValue::Null => Ok(self.alloc(token.span, Expr::Null)),
            TokenValue::BracketOpen => self.list(token.span.start),
            TokenValue::BraceOpen => self.object(token.span.start),
            TokenValue::Name("function") => self.function(token.span.start),
            TokenValue::Name(name) => self.name_expr(name, token.span),
            _ => Err(Self::unexpected(&token, "an expression")),
        }
    }

    /// An expression that starts with a name: an assignment, one of the
    /// call forms, or a bare reference.
    fn name_expr(&mut self, name: &str, span: Span) -> Result<NodeId, ParseError> {
        let name = name.to_string();
        let next = self.lexer.peek()?;
        match next.as_ref().map(|t| &t.value) {
            Some(TokenValue::Equals) => {
                self.lexer.next()?;
                let value = self.expr()?;
                let span = Span::new(span.start, self.end_of(value));
                Ok(self.alloc(span, Expr::Assign { name, value }))
            }
            Some(TokenValue::ParenOpen) => {
                self.lexer.next()?;
                let args = self.paren_args()?;
                let span = Span::new(span.start, self.lexer.pos());
                Ok(self.alloc(span, Expr::Call { subject: name, args }))
            }
            Some(TokenValue::BracketOpen) if self.in_template => {
                let mut args = vec![];
                while let Some(Token {
                    value: TokenValue::BracketOpen,
                    ..
                }) = self.lexer.peek()?
                {
                    self.lexer.next()?;
                    args.push(self.template(true, true)?);
                }
                let span = Span::new(span.start, self.lexer.pos());
                Ok(self.alloc(span, Expr::Call { subject: name, args }))
            }
            Some(
                TokenValue::Number(_)
                | TokenValue::Str(_)
                | TokenValue::True
                | TokenValue::False
                | TokenValue::Null
                | TokenValue::Name(_)
                | TokenValue::BraceOpen
                | TokenValue::BracketOpen,
            ) => {
                let arg = self.expr()?;
                let span = Span::new(span.start, self.end_of(arg));
                Ok(self.alloc(
                    span,
                    Expr::Call {
                        subject: name,
                        args: vec![arg],
                    },
                ))
            }
            _ => Ok(self.alloc(
                span,
                Expr::Call {
                    subject: name,
                    args: vec![],
                },
            )),
        }
    }

    fn paren_args(&mut self) -> Result<Vec<NodeId>, ParseError> {
        let mut args = vec![];
        loop {
            self.skip_newlines()?;
            match self.lexer.peek()? {
                Some(Token {
                    value: TokenValue::ParenClose,
                    ..
                }) => {
                    self.lexer.next()?;
                    return Ok(args);
                }
                Some(_) => {}
                None => return Err(self.end_of_input("`)`")),
            }
            args.push(self.expr()?);
            self.skip_newlines()?;
            match self.lexer.next()? {
                Some(Token {
                    value: TokenValue::Comma,
                    ..
                }) => continue,
                Some(Token {
                    value: TokenValue::ParenClose,
                    ..
                }) => return Ok(args),
                Some(token) => return Err(Self::unexpected(&token, "`,` or `)`")),
                None => return Err(self.end_of_input("`)`")),
            }
        }
    }

    fn list(&mut self, start: usize) -> Result<NodeId, ParseError> {
        let mut items = vec![];
        loop {
            self.skip_newlines()?;
            match self.lexer.peek()? {
                Some(Token {
                    value: TokenValue::BracketClose,
                    ..
                }) => {
                    self.lexer.next()?;
                    break;
                }
                Some(_) => {}
                None => return Err(self.end_of_input("`]`")),
            }
            items.push(self.expr()?);
            self.skip_newlines()?;
            match self.lexer.next()? {
                Some(Token {
                    value: TokenValue::Comma,
                    ..
                }) => continue,
                Some(Token {
                    value: TokenValue::BracketClose,
                    ..
                }) => break,
                Some(token) => return Err(Self::unexpected(&token, "`,` or `]`")),
                None => return Err(self.end_of_input("`]`")),
            }
        }
        let span = Span::new(start, self.lexer.pos());
        Ok(self.alloc(span, Expr::List { items }))
    }

    fn object(&mut self, start: usize) -> Result<NodeId, ParseError> {
        let mut pairs = vec![];
        loop {
            self.skip_newlines()?;
            let key = match self.lexer.next()? {
                Some(Token {
                    value: TokenValue::BraceClose,
                    ..
                }) => break,
                Some(Token {
                    value: TokenValue::Name(name),
                    ..
                }) => name.to_string(),
                Some(Token {
                    value: TokenValue::Str(raw),
                    ..
                }) => decode_string(raw),
                Some(token) => return Err(Self::unexpected(&token, "a key or `}`")),
                None => return Err(self.end_of_input("`}`")),
            };
            self.skip_newlines()?;
            match self.lexer.next()? {
                Some(Token {
                    value: TokenValue::Colon,
                    ..
                }) => {}
                Some(token) => return Err(Self::unexpected(&token, "`:`")),
                None => return Err(self.end_of_input("`:`")),
            }
            pairs.push((key, self.expr()?));
            self.skip_newlines()?;
            match self.lexer.next()? {
                Some(Token {
                    value: TokenValue::Comma,
                    ..
                }) => continue,
                Some(Token {
                    value: TokenValue::BraceClose,
                    ..
                }) => break,
                Some(token) => return Err(Self::unexpected(&token, "`,` or `}`")),
                None => return Err(self.end_of_input("`}`")),
            }
        }
        let span = Span::new(start, self.lexer.pos());
        Ok(self.alloc(span, Expr::Object { pairs }))
    }

    fn function(&mut self, start: usize) -> Result<NodeId, ParseError> {
        match self.lexer.next()? {
            Some(Token {
                value: TokenValue::ParenOpen,
                ..
            }) => {}
            Some(token) => return Err(Self::unexpected(&token, "`(`")),
            None => return Err(self.end_of_input("`(`")),
        }
        let mut params = vec![];
        loop {
            self.skip_newlines()?;
            match self.lexer.next()? {
                Some(Token {
                    value: TokenValue::ParenClose,
                    ..
                }) => break,
                Some(Token {
                    value: TokenValue::Name(name),
                    ..
                }) => params.push(name.to_string()),
                Some(token) => return Err(Self::unexpected(&token, "a parameter name or `)`")),
                None => return Err(self.end_of_input("`)`")),
            }
            self.skip_newlines()?;
            match self.lexer.next()? {
                Some(Token {
                    value: TokenValue::Comma,
                    ..
                }) => continue,
                Some(Token {
                    value: TokenValue::ParenClose,
                    ..
                }) => break,
                Some(token) => return Err(Self::unexpected(&token, "`,` or `)`")),
                None => return Err(self.end_of_input("`)`")),
            }
        }
        self.skip_newlines()?;
        match self.lexer.next()? {
            Some(Token {
                value: TokenValue::BraceOpen,
                ..
            }) => {}
            Some(token) => return Err(Self::unexpected(&token, "`{`")),
            None => return Err(self.end_of_input("`{`")),
        }
        let body = self.statements(Terminator::Brace)?;
        match self.lexer.next()? {
            Some(Token {
                value: TokenValue::BraceClose,
                ..
            }) => {}
            Some(token) => return Err(Self::unexpected(&token, "`}`")),
            None => return Err(self.end_of_input("`}`")),
        }
        let span = Span::new(start, self.lexer.pos());
        Ok(self.alloc(span, Expr::Function { params, body }))
    }

    /// Parse a template: literal text interleaved with insertions.
    ///
    /// With `closing` set the template ends at an unbalanced `]`, which is
    /// consumed; otherwise it ends at the end of the input.
    fn template(&mut self, lazy: bool, closing: bool) -> Result<NodeId, ParseError> {
        let start = self.lexer.pos();
        let mut parts = vec![];
        let (text, _) = self.lexer.take_text();
        // The leading run is always kept, even when empty; execution skips
        // an empty one. Later empty runs between adjacent insertions are
        // dropped here.
        parts.push(TemplatePart::Text(text.into()));
        loop {
            match self.lexer.peek_raw() {
                Some('[') => {
                    self.lexer.next()?;
                    let insertion = self.statements(Terminator::Bracket)?;
                    match self.lexer.next()? {
                        Some(Token {
                            value: TokenValue::BracketClose,
                            ..
                        }) => {}
                        Some(token) => return Err(Self::unexpected(&token, "`]`")),
                        None => return Err(self.end_of_input("`]`")),
                    }
                    parts.push(TemplatePart::Insertion(insertion));
                    let (text, _) = self.lexer.take_text();
                    if !text.is_empty() {
                        parts.push(TemplatePart::Text(text.into()));
                    }
                }
                Some(_) => {
                    // take_text only stops at brackets or the end.
                    if closing {
                        self.lexer.next()?;
                        break;
                    }
                    let pos = self.lexer.pos();
                    return Err(ParseError::new(
                        ParseErrorKind::UnmatchedBracket,
                        Span::new(pos, pos + 1),
                    ));
                }
                None => {
                    if closing {
                        return Err(ParseError::new(
                            ParseErrorKind::UnterminatedTemplate,
                            Span::new(start, self.lexer.pos()),
                        ));
                    }
                    break;
                }
            }
        }
        let span = Span::new(start, self.lexer.pos());
        Ok(self.alloc(span, Expr::Template { parts, lazy }))
    }
}
