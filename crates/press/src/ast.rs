//! The syntax tree.
//!
//! Nodes live in an index-addressed arena ([Ast]) and refer to each other
//!     with [NodeId] values.
//! Each node records the byte span it was parsed from and which
//!     [source block](Source) that span points into, which is all the
//!     diagnostics machinery needs to reconstruct file, line and column.
//! The `parent` and `root` back-references are assigned exactly once, in
//!     the [attach](Ast::attach) pass that runs after parsing.
//!
//! Note that there is no `caller` field here: the dynamic call chain is a
//!     property of a particular execution, not of the tree, and is tracked
//!     by the runtime so that a node reused by several call sites can be
//!     reported correctly.

use std::path::PathBuf;

/// Index of a node in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

/// Index of a source block in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceId(u16);

/// A byte range into a source block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Span {
        Span { start, end }
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

/// A block of source code registered with the arena.
///
/// A document usually registers two blocks: the header script and the body
///     template.
/// `prefix_lines` counts the lines that logically precede the block in the
///     file it came from, so that line numbers reported for the body
///     account for the header above it.
#[derive(Debug)]
pub struct Source {
    pub path: PathBuf,
    pub text: String,
    pub prefix_lines: usize,
}

/// A part of a template: either a literal text run or an insertion.
#[derive(Clone, Debug, PartialEq)]
pub enum TemplatePart {
    Text(String),
    /// A bracket-delimited statements block executed for its side effects
    /// on the surrounding template's output buffer.
    Insertion(NodeId),
}

/// The closed set of expression forms.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// A numeric literal. The raw source text is retained; whether it is
    /// an integer or a float is decided at argument-preparation time by
    /// the presence of a decimal point.
    Number { raw: String },
    /// A string literal, retained in quoted source form. Escape decoding
    /// is deferred to argument preparation.
    Str { raw: String },
    Bool(bool),
    Null,
    /// A call of a bound name. The subject is unevaluated; so are the
    /// arguments, which are prepared only when the call is dispatched.
    Call { subject: String, args: Vec<NodeId> },
    /// `name = expr`. Function-valued expressions are bound unevaluated;
    /// everything else is evaluated eagerly.
    Assign { name: String, value: NodeId },
    /// A function literal. Calling one pushes a fresh binding frame; there
    /// is no capture of the defining environment.
    Function { params: Vec<String>, body: NodeId },
    /// An expression sequence executed for side effects.
    Statements { children: Vec<NodeId> },
    List { items: Vec<NodeId> },
    /// Ordered key/value pairs; duplicate keys resolve last-wins when the
    /// object is prepared.
    Object { pairs: Vec<(String, NodeId)> },
    /// Literal text interleaved with insertions. `lazy` is set on
    /// templates that appear as call arguments: the first time such a
    /// template is offered to argument preparation it is passed
    /// unevaluated.
    Template { parts: Vec<TemplatePart>, lazy: bool },
}

/// A node in the arena.
#[derive(Debug)]
pub struct Node {
    pub source: SourceId,
    pub span: Span,
    pub parent: Option<NodeId>,
    pub root: Option<NodeId>,
    pub expr: Expr,
}

/// The node arena and the source blocks the nodes were parsed from.
#[derive(Debug, Default)]
pub struct Ast {
    sources: Vec<Source>,
    nodes: Vec<Node>,
}

impl Ast {
    /// Register a block of source code.
    pub fn add_source(
        &mut self,
        path: impl Into<PathBuf>,
        text: impl Into<String>,
        prefix_lines: usize,
    ) -> SourceId {
        self.sources.push(Source {
            path: path.into(),
            text: text.into(),
            prefix_lines,
        });
        SourceId((self.sources.len() - 1) as u16)
    }

    pub fn source(&self, id: SourceId) -> &Source {
        &self.sources[id.0 as usize]
    }

    /// Allocate a node.
    pub fn alloc(&mut self, source: SourceId, span: Span, expr: Expr) -> NodeId {
        self.nodes.push(Node {
            source,
            span,
            parent: None,
            root: None,
            expr,
        });
        NodeId((self.nodes.len() - 1) as u32)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn expr(&self, id: NodeId) -> &Expr {
        &self.nodes[id.0 as usize].expr
    }

    /// The direct children of a node, in source order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        match self.expr(id) {
            Expr::Number { .. } | Expr::Str { .. } | Expr::Bool(_) | Expr::Null => vec![],
            Expr::Call { args, .. } => args.clone(),
            Expr::Assign { value, .. } => vec![*value],
            Expr::Function { body, .. } => vec![*body],
            Expr::Statements { children } => children.clone(),
            Expr::List { items } => items.clone(),
            Expr::Object { pairs } => pairs.iter().map(|(_, v)| *v).collect(),
            Expr::Template { parts, .. } => parts
                .iter()
                .filter_map(|part| match part {
                    TemplatePart::Insertion(id) => Some(*id),
                    TemplatePart::Text(_) => None,
                })
                .collect(),
        }
    }

    /// Assign `parent` and `root` throughout the tree rooted at `root`.
    ///
    /// Must be called exactly once per parsed tree, before execution.
    pub fn attach(&mut self, root: NodeId) {
        debug_assert!(
            self.node(root).root.is_none(),
            "tree attached more than once"
        );
        self.nodes[root.0 as usize].root = Some(root);
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            for child in self.children(id) {
                let node = &mut self.nodes[child.0 as usize];
                debug_assert!(node.parent.is_none(), "node attached more than once");
                node.parent = Some(id);
                node.root = Some(root);
                stack.push(child);
            }
        }
    }
}
