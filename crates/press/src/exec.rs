//! Tree-walking execution.
//!
//! Every node executes against an [ExecutionInput], which pairs the tree
//!     with the runtime.
//! Call dispatch resolves the subject on the scope stack and then either
//!     invokes a builtin, invokes a document function with a fresh binding
//!     frame, or returns the bound value unchanged (which is how plain
//!     constants bound by assignment are read back).
//!
//! While a call is being dispatched, argument preparation included, its
//!     node sits on the runtime's frame stack.
//! That stack is the dynamic call chain: when an error is raised anywhere
//!     below, the chain is captured onto the error, giving diagnostics the
//!     run of call sites that actually led to the failure rather than the
//!     lexical nesting.

use crate::ast::{Ast, Expr, NodeId, TemplatePart};
use crate::error::{Error, ErrorKind, Frame};
use crate::lexer::decode_string;
use crate::runtime::{Runtime, Value};

/// The tree and runtime a node executes against.
pub struct ExecutionInput<'a> {
    pub ast: &'a Ast,
    pub runtime: &'a mut Runtime,
}

impl<'a> ExecutionInput<'a> {
    pub fn new(ast: &'a Ast, runtime: &'a mut Runtime) -> ExecutionInput<'a> {
        ExecutionInput { ast, runtime }
    }

    /// Execute a node and return its value.
    pub fn execute(&mut self, node: NodeId) -> Result<Value, Error> {
        let ast = self.ast;
        match ast.expr(node) {
            Expr::Number { raw } => number_value(raw),
            Expr::Str { raw } => Ok(Value::Str(decode_string(raw))),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Function { .. } => Ok(Value::Function(node)),
            Expr::Assign { name, value } => {
                let bound = match ast.expr(*value) {
                    // Function literals are bound unevaluated; calling one
                    // later opens a fresh frame.
                    Expr::Function { .. } => Value::Function(*value),
                    _ => self.execute(*value)?,
                };
                self.runtime.set(name.clone(), bound);
                Ok(Value::Null)
            }
            Expr::Statements { children } => {
                for child in children {
                    self.execute(*child)?;
                }
                Ok(Value::Null)
            }
            Expr::List { .. } | Expr::Object { .. } => self.prepare(node),
            Expr::Template { parts, .. } => {
                self.runtime.push_buffer();
                let mut failure = None;
                for (i, part) in parts.iter().enumerate() {
                    match part {
                        TemplatePart::Text(text) => {
                            if i == 0 && text.is_empty() {
                                continue;
                            }
                            self.runtime.add_text(text);
                        }
                        TemplatePart::Insertion(statements) => {
                            if let Err(err) = self.execute(*statements) {
                                failure = Some(err);
                                break;
                            }
                        }
                    }
                }
                let fragments = self.runtime.pop_buffer();
                match failure {
                    Some(err) => Err(err),
                    None => Ok(Value::Fragments(fragments)),
                }
            }
            Expr::Call { subject, args } => self.execute_call(node, subject, args),
        }
    }

    fn execute_call(
        &mut self,
        node: NodeId,
        subject: &str,
        args: &[NodeId],
    ) -> Result<Value, Error> {
        let Some(bound) = self.runtime.lookup(subject).cloned() else {
            return Err(Error::traced(
                ErrorKind::UndefinedName {
                    name: subject.into(),
                },
                node,
                self.runtime.frames(),
            ));
        };
        self.runtime.push_frame(Frame::Script(node));
        let result = self.dispatch(node, bound, args);
        self.runtime.pop_frame();
        // A failure inside a builtin arrives untraced; wrap it here so it
        // is reported at the node of the call that invoked the builtin.
        // Everything already traced keeps the chain captured at its own
        // raise site.
        result.map_err(|err| {
            if err.is_traced() {
                err
            } else {
                err.trace_at(node, self.runtime.frames())
            }
        })
    }

    fn dispatch(&mut self, node: NodeId, bound: Value, args: &[NodeId]) -> Result<Value, Error> {
        match bound {
            Value::Builtin(builtin) => {
                let mut prepared = Vec::with_capacity(args.len());
                for arg in args {
                    prepared.push(self.prepare(*arg)?);
                }
                builtin.call(node, self, prepared)
            }
            Value::Function(function) => {
                let mut prepared = Vec::with_capacity(args.len());
                for arg in args {
                    prepared.push(self.prepare(*arg)?);
                }
                self.invoke_function(function, prepared)
            }
            // Any other bound value is returned unchanged; the arguments,
            // if any, stay unevaluated.
            other => Ok(other),
        }
    }

    /// Call a document function: a fresh frame with the parameters bound
    /// positionally. Unfilled trailing parameters stay unbound, and the
    /// frame is popped on every exit path.
    fn invoke_function(&mut self, function: NodeId, args: Vec<Value>) -> Result<Value, Error> {
        let Expr::Function { params, body } = self.ast.expr(function) else {
            return Err(Error::message("only functions can be invoked"));
        };
        self.runtime.push_scope();
        for (param, value) in params.iter().zip(args) {
            self.runtime.set(param.clone(), value);
        }
        let result = self.execute(*body);
        self.runtime.pop_scope();
        result
    }

    /// Prepare an argument expression into a value.
    ///
    /// Literals are decoded, collections are prepared element-wise, a
    ///     not-yet-offered lazy template is passed through unevaluated,
    ///     and anything else is executed.
    pub fn prepare(&mut self, node: NodeId) -> Result<Value, Error> {
        let ast = self.ast;
        match ast.expr(node) {
            Expr::Number { raw } => number_value(raw),
            Expr::Str { raw } => Ok(Value::Str(decode_string(raw))),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::List { items } => {
                let mut prepared = Vec::with_capacity(items.len());
                for item in items {
                    prepared.push(self.prepare(*item)?);
                }
                Ok(Value::List(prepared))
            }
            Expr::Object { pairs } => {
                let mut prepared: Vec<(String, Value)> = Vec::with_capacity(pairs.len());
                for (key, value) in pairs {
                    let value = self.prepare(*value)?;
                    // Duplicate keys resolve last-wins.
                    match prepared.iter_mut().find(|(k, _)| k == key) {
                        Some(pair) => pair.1 = value,
                        None => prepared.push((key.clone(), value)),
                    }
                }
                Ok(Value::Object(prepared))
            }
            Expr::Template { lazy: true, .. } if !self.runtime.spend_lazy(node) => {
                Ok(Value::Template(node))
            }
            _ => self.execute(node),
        }
    }

    /// Re-offer an already-prepared value from native code.
    ///
    /// A deferred template evaluates now; everything else passes through.
    /// The native call site is recorded on the dynamic call chain so that
    ///     a failure inside the template is reported with a frame pointing
    ///     at the builtin that forced the evaluation.
    #[track_caller]
    pub fn prepare_value(&mut self, value: Value) -> Result<Value, Error> {
        match value {
            Value::Template(template) => {
                let location = std::panic::Location::caller();
                self.runtime.push_frame(Frame::Host {
                    file: location.file(),
                    line: location.line(),
                });
                let result = self.execute(template);
                self.runtime.pop_frame();
                result
            }
            other => Ok(other),
        }
    }
}

/// Convert a numeric literal: an integer unless the raw text has a
/// decimal point.
fn number_value(raw: &str) -> Result<Value, Error> {
    if raw.contains('.') {
        raw.parse::<f64>()
            .map(Value::Float)
            .map_err(|_| Error::message(format!("malformed number literal `{raw}`")))
    } else {
        raw.parse::<i64>()
            .map(Value::Int)
            .map_err(|_| Error::message(format!("malformed number literal `{raw}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Ast, Span};
    use crate::builtins;
    use std::collections::HashMap;

    fn parse_script(input: &str) -> (Ast, NodeId) {
        let mut ast = Ast::default();
        let source = ast.add_source("test.press", input, 0);
        let root = crate::parse::parse_script(&mut ast, source).expect("parse should succeed");
        ast.attach(root);
        (ast, root)
    }

    fn parse_template(input: &str) -> (Ast, NodeId) {
        let mut ast = Ast::default();
        let source = ast.add_source("test.press", input, 0);
        let root = crate::parse::parse_template(&mut ast, source).expect("parse should succeed");
        ast.attach(root);
        (ast, root)
    }

    fn bare_runtime() -> Runtime {
        Runtime::new(HashMap::new())
    }

    fn prepare_literal(input: &str) -> Value {
        let (ast, root) = parse_script(input);
        let mut rt = bare_runtime();
        let mut input = ExecutionInput::new(&ast, &mut rt);
        let children = ast.children(root);
        input.prepare(children[0]).unwrap()
    }

    #[test]
    fn literals_prepare_to_values() {
        assert_eq!(prepare_literal("123"), Value::Int(123));
        assert_eq!(prepare_literal("1.5"), Value::Float(1.5));
        assert_eq!(prepare_literal(r#""abc""#), Value::Str("abc".into()));
        assert_eq!(prepare_literal(r#""a\nb""#), Value::Str("a\nb".into()));
        assert_eq!(prepare_literal("true"), Value::Bool(true));
        assert_eq!(prepare_literal("null"), Value::Null);
    }

    #[test]
    fn lists_and_objects_prepare_recursively() {
        assert_eq!(
            prepare_literal(r#"[1, "x"]"#),
            Value::List(vec![Value::Int(1), Value::Str("x".into())])
        );
        assert_eq!(
            prepare_literal("{a: 1, b: 2}"),
            Value::Object(vec![
                ("a".into(), Value::Int(1)),
                ("b".into(), Value::Int(2)),
            ])
        );
    }

    #[test]
    fn duplicate_object_keys_resolve_last_wins() {
        assert_eq!(
            prepare_literal("{a: 1, a: 2}"),
            Value::Object(vec![("a".into(), Value::Int(2))])
        );
    }

    #[test]
    fn assignment_binds_and_reads_back() {
        let (ast, root) = parse_script("a = 1; b = a");
        let mut rt = bare_runtime();
        ExecutionInput::new(&ast, &mut rt).execute(root).unwrap();
        assert_eq!(rt.lookup("a"), Some(&Value::Int(1)));
        assert_eq!(rt.lookup("b"), Some(&Value::Int(1)));
    }

    #[test]
    fn function_frame_is_invisible_after_the_call() {
        let (ast, root) = parse_script("f = function() { a = 1 }; f()");
        let mut rt = bare_runtime();
        ExecutionInput::new(&ast, &mut rt).execute(root).unwrap();
        assert!(!rt.has("a"));
    }

    #[test]
    fn top_level_assignment_is_visible_inside_functions() {
        let (ast, root) = parse_script("a = 1; f = function() { b = a }; f()");
        let mut rt = bare_runtime();
        let mut input = ExecutionInput::new(&ast, &mut rt);
        input.execute(root).unwrap();
        // `b` was bound in the call frame and is gone, but binding it
        // proves `a` resolved through the outer frame.
        assert!(!rt.has("b"));
        assert_eq!(rt.lookup("a"), Some(&Value::Int(1)));
    }

    #[test]
    fn unfilled_trailing_parameters_stay_unbound() {
        // Arity is not enforced: the call succeeds as long as the body
        // never reads the missing parameter.
        let (ast, root) = parse_script("f = function(x, y) { r = x }; f(1)");
        let mut rt = bare_runtime();
        ExecutionInput::new(&ast, &mut rt).execute(root).unwrap();

        // Reading the unfilled parameter is an ordinary unresolved name.
        let (ast, root) = parse_script("f = function(x, y) { r = y }; f(1)");
        let mut rt = bare_runtime();
        let err = ExecutionInput::new(&ast, &mut rt).execute(root).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndefinedName { name: "y".into() });
    }

    #[test]
    fn calling_an_undefined_name_fails_with_its_offset() {
        let (ast, root) = parse_script("nope()");
        let mut rt = bare_runtime();
        let err = ExecutionInput::new(&ast, &mut rt).execute(root).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::UndefinedName {
                name: "nope".into()
            }
        );
        let Frame::Script(node) = err.frames[0] else {
            panic!("expected a script frame");
        };
        assert_eq!(ast.node(node).span, Span::new(0, 6));
    }

    #[test]
    fn failure_in_a_function_has_two_script_frames() {
        let (ast, root) = parse_script("f = function() { nope() }; f()");
        let mut rt = bare_runtime();
        let err = ExecutionInput::new(&ast, &mut rt).execute(root).unwrap_err();
        assert_eq!(err.frames.len(), 2);
        let Frame::Script(inner) = err.frames[0] else {
            panic!("expected a script frame");
        };
        let Frame::Script(outer) = err.frames[1] else {
            panic!("expected a script frame");
        };
        let inner_span = ast.node(inner).span;
        let outer_span = ast.node(outer).span;
        assert_eq!(&"f = function() { nope() }; f()"[inner_span.range()], "nope()");
        assert_eq!(&"f = function() { nope() }; f()"[outer_span.range()], "f()");
    }

    #[test]
    fn template_evaluation_returns_fragments() {
        let (ast, root) = parse_template("hello [output \"world\"]");
        let mut rt = Runtime::new(builtins::built_ins());
        let value = ExecutionInput::new(&ast, &mut rt).execute(root).unwrap();
        let Value::Fragments(fragments) = value else {
            panic!("expected fragments");
        };
        assert_eq!(fragments[0].text, "hello ");
        assert_eq!(fragments[1].text, "world");
    }

    #[test]
    fn empty_leading_text_run_is_skipped() {
        let (ast, root) = parse_template("[output \"x\"]");
        let mut rt = Runtime::new(builtins::built_ins());
        let value = ExecutionInput::new(&ast, &mut rt).execute(root).unwrap();
        let Value::Fragments(fragments) = value else {
            panic!("expected fragments");
        };
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].text, "x");
    }

    #[test]
    fn lazy_template_is_deferred_once_then_evaluates() {
        let (ast, root) = parse_template("[f = function(t) {}; f[inner]]");
        let mut rt = bare_runtime();
        let mut input = ExecutionInput::new(&ast, &mut rt);
        input.execute(root).unwrap();

        // Find the template argument node and offer it twice more.
        let mut template = None;
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if matches!(ast.expr(id), Expr::Template { lazy: true, .. }) {
                template = Some(id);
            }
            stack.extend(ast.children(id));
        }
        let template = template.expect("the source contains a lazy template");

        // The first offer during execution above consumed the deferral,
        // so preparing again evaluates to fragments.
        let mut input = ExecutionInput::new(&ast, &mut rt);
        let value = input.prepare(template).unwrap();
        let Value::Fragments(fragments) = value else {
            panic!("expected fragments on the second offer");
        };
        assert_eq!(fragments[0].text, "inner");
    }

    #[test]
    fn first_offer_of_a_lazy_template_produces_no_fragments() {
        let (ast, root) = parse_template("[f = function(t) { out = get \"t\" }; f[inner]]");
        let mut rt = Runtime::new(builtins::built_ins());
        let value = ExecutionInput::new(&ast, &mut rt).execute(root).unwrap();
        // The template was bound to `t` unevaluated, so the body's `get`
        // observed a template value and the surrounding template produced
        // no text for it.
        let Value::Fragments(fragments) = value else {
            panic!("expected fragments");
        };
        assert!(fragments.is_empty());
    }

    #[test]
    fn template_reexecution_is_legal() {
        let (ast, root) = parse_template("x[output \"y\"]");
        let mut rt = Runtime::new(builtins::built_ins());
        let first = ExecutionInput::new(&ast, &mut rt).execute(root).unwrap();
        let second = ExecutionInput::new(&ast, &mut rt).execute(root).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn constants_bound_by_assignment_return_unchanged() {
        let (ast, root) = parse_script("a = 5; b = a");
        let mut rt = bare_runtime();
        ExecutionInput::new(&ast, &mut rt).execute(root).unwrap();
        assert_eq!(rt.lookup("b"), Some(&Value::Int(5)));
    }
}
