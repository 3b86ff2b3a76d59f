//! The execution runtime: scope stack, output buffers and values.

use std::collections::{HashMap, HashSet};

use press_typeset::{Fragment, State};

use crate::ast::NodeId;
use crate::error::{Error, Frame};
use crate::exec::ExecutionInput;

/// The Rust type of builtin functions.
///
/// A builtin receives the node of the call that invoked it, the execution
///     input (through which it can reach the runtime and, for builtins
///     that style deferred arguments, re-enter evaluation), and its
///     prepared arguments.
pub type BuiltinFn = fn(NodeId, &mut ExecutionInput<'_>, Vec<Value>) -> Result<Value, Error>;

/// A builtin command provided at runtime construction.
#[derive(Clone, Copy)]
pub struct BuiltIn {
    name: &'static str,
    f: BuiltinFn,
}

impl BuiltIn {
    pub fn new(name: &'static str, f: BuiltinFn) -> BuiltIn {
        BuiltIn { name, f }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn call(
        &self,
        node: NodeId,
        input: &mut ExecutionInput<'_>,
        args: Vec<Value>,
    ) -> Result<Value, Error> {
        (self.f)(node, input, args)
    }
}

impl std::fmt::Debug for BuiltIn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BuiltIn({})", self.name)
    }
}

impl PartialEq for BuiltIn {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// A runtime value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    /// Ordered key/value pairs. Duplicate keys were already resolved
    /// last-wins during preparation.
    Object(Vec<(String, Value)>),
    /// The output of evaluating a template.
    Fragments(Vec<Fragment>),
    /// A function literal, bound unevaluated.
    Function(NodeId),
    /// A template argument that was deferred rather than evaluated.
    Template(NodeId),
    /// A checkpointed graphics state.
    State(Box<State>),
    Builtin(BuiltIn),
}

impl Value {
    /// Short description used in error messages.
    pub fn type_name(&self) -> &'static str {
        use Value::*;
        match self {
            Null => "null",
            Bool(_) => "a boolean",
            Int(_) => "an integer",
            Float(_) => "a float",
            Str(_) => "a string",
            List(_) => "a list",
            Object(_) => "an object",
            Fragments(_) => "fragments",
            Function(_) => "a function",
            Template(_) => "a template",
            State(_) => "a state",
            Builtin(_) => "a builtin",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Value::*;
        match self {
            Null => write!(f, "null"),
            Bool(b) => write!(f, "{b}"),
            Int(n) => write!(f, "{n}"),
            Float(x) => write!(f, "{x}"),
            Str(s) => write!(f, "{s}"),
            List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Object(pairs) => {
                write!(f, "{{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
            Fragments(fragments) => {
                for fragment in fragments {
                    write!(f, "{}", fragment.text)?;
                }
                Ok(())
            }
            Function(_) => write!(f, "<function>"),
            Template(_) => write!(f, "<template>"),
            State(_) => write!(f, "<state>"),
            Builtin(b) => write!(f, "<builtin {}>", b.name()),
        }
    }
}

/// Per-render-pass execution state.
///
/// A runtime owns the scope stack, the stack of output buffers, and the
///     current graphics state.
/// One runtime serves one render pass; concurrent renders need their own
///     instances.
#[derive(Debug)]
pub struct Runtime {
    scopes: Vec<HashMap<String, Value>>,
    buffers: Vec<Vec<Fragment>>,
    pub state: State,
    frames: Vec<Frame>,
    lazy_spent: HashSet<NodeId>,
}

impl Runtime {
    /// Create a runtime with the given builtins bound in the outermost
    /// frame.
    ///
    /// Builtins are ordinary bindings and can be shadowed by any inner
    /// assignment.
    pub fn new(built_ins: HashMap<&'static str, BuiltIn>) -> Runtime {
        let globals = built_ins
            .into_iter()
            .map(|(name, b)| (name.to_string(), Value::Builtin(b)))
            .collect();
        Runtime {
            scopes: vec![globals],
            buffers: vec![vec![]],
            state: State::default(),
            frames: vec![],
            lazy_spent: HashSet::new(),
        }
    }

    /// Look up a name, innermost frame first.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|frame| frame.get(name))
    }

    /// Bind a name in the innermost frame.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.scopes
            .last_mut()
            .expect("the scope stack always has at least one frame")
            .insert(name.into(), value);
    }

    /// Whether a name is bound in any frame.
    pub fn has(&self, name: &str) -> bool {
        self.scopes.iter().any(|frame| frame.contains_key(name))
    }

    pub(crate) fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub(crate) fn pop_scope(&mut self) {
        self.scopes.pop();
        debug_assert!(!self.scopes.is_empty(), "popped the global frame");
    }

    pub(crate) fn push_buffer(&mut self) {
        self.buffers.push(vec![]);
    }

    pub(crate) fn pop_buffer(&mut self) -> Vec<Fragment> {
        debug_assert!(self.buffers.len() > 1, "popped the base buffer");
        self.buffers.pop().unwrap_or_default()
    }

    fn buffer(&mut self) -> &mut Vec<Fragment> {
        self.buffers
            .last_mut()
            .expect("the buffer stack always has at least one buffer")
    }

    /// Emit a text fragment carrying a snapshot of the current state.
    ///
    /// A single trailing newline is dropped: the literal runs of a
    ///     template end with the newline that precedes the next insertion,
    ///     and that newline belongs to the template syntax, not the text.
    pub fn add_text(&mut self, text: &str) {
        let text = text.strip_suffix('\n').unwrap_or(text);
        let fragment = Fragment::text(text, self.state.clone());
        self.buffer().push(fragment);
        self.state.reset();
    }

    /// Emit a line fragment carrying a snapshot of the current state.
    pub fn add_line(&mut self, text: &str) {
        let fragment = Fragment::line(text, self.state.clone());
        self.buffer().push(fragment);
        self.state.reset();
    }

    /// Append an already-built fragment to the current buffer.
    pub fn append_fragment(&mut self, fragment: Fragment) {
        self.buffer().push(fragment);
    }

    /// The fragments emitted outside any template, e.g. by header code.
    pub fn take_base_fragments(&mut self) -> Vec<Fragment> {
        std::mem::take(&mut self.buffers[0])
    }

    pub(crate) fn push_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub(crate) fn pop_frame(&mut self) {
        self.frames.pop();
    }

    /// The dynamic call chain, outermost first.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Whether the given lazy template has already been offered as an
    /// argument; marks it as offered.
    pub(crate) fn spend_lazy(&mut self, template: NodeId) -> bool {
        !self.lazy_spent.insert(template)
    }
}
