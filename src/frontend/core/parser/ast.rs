//! Abstract Syntax Tree
//!
//! Nodes live in an arena owned by [`Ast`]; a node refers to its children
//! and its parent by [`NodeId`]. The parent link is for navigation only,
//! ownership always flows from the arena. Once the parser hands the tree
//! out it is read-only.

use std::fmt;

use crate::frontend::core::lexer::Token;

/// Index of a node in its [`Ast`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Syntactic role of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Root of every tree
    Input,
    Info,
    CountFormat,
    CountProcess,
    Definition,
    Object,
    Composite,
    TableDef,
    Region,
    HistoList,
    HistoListHistogram,
    ObjectSelect,
    ObjectReject,
    RegionSelect,
    RegionReject,
    RegionUse,
    /// `CONDITION [? ACTION : ACTION]`
    IfStatement,
    VariableList,
    WeightCmd,
    BinsCmd,
    BinCmd,
    SortCmd,
    Histogram,
    HistoUse,
    ParticleList,
    ParticleSum,
    /// Alternating `PARTICLE ID` pairs of a composite
    NamedParticleList,
    Index,
    Expression,
    Condition,
    Interval,
    Negate,
    UserFunction,
    Count,
    /// Node whose meaning is its token; operators keep their operands as children
    Terminal,
}

impl NodeKind {
    /// Upper-case name used in graph dumps and diagnostics
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Input => "INPUT",
            NodeKind::Info => "INFO",
            NodeKind::CountFormat => "COUNT_FORMAT",
            NodeKind::CountProcess => "COUNT_PROCESS",
            NodeKind::Definition => "DEFINITION",
            NodeKind::Object => "OBJECT",
            NodeKind::Composite => "COMPOSITE",
            NodeKind::TableDef => "TABLE_DEF",
            NodeKind::Region => "REGION",
            NodeKind::HistoList => "HISTOLIST",
            NodeKind::HistoListHistogram => "HISTOLIST_HISTOGRAM",
            NodeKind::ObjectSelect => "OBJECT_SELECT",
            NodeKind::ObjectReject => "OBJECT_REJECT",
            NodeKind::RegionSelect => "REGION_SELECT",
            NodeKind::RegionReject => "REGION_REJECT",
            NodeKind::RegionUse => "REGION_USE",
            NodeKind::IfStatement => "IF_STATEMENT",
            NodeKind::VariableList => "VARIABLE_LIST",
            NodeKind::WeightCmd => "WEIGHT_CMD",
            NodeKind::BinsCmd => "BINS_CMD",
            NodeKind::BinCmd => "BIN_CMD",
            NodeKind::SortCmd => "SORT_CMD",
            NodeKind::Histogram => "HISTOGRAM",
            NodeKind::HistoUse => "HISTO_USE",
            NodeKind::ParticleList => "PARTICLE_LIST",
            NodeKind::ParticleSum => "PARTICLE_SUM",
            NodeKind::NamedParticleList => "NAMED_PARTICLE_LIST",
            NodeKind::Index => "INDEX",
            NodeKind::Expression => "EXPRESSION",
            NodeKind::Condition => "CONDITION",
            NodeKind::Interval => "INTERVAL",
            NodeKind::Negate => "NEGATE",
            NodeKind::UserFunction => "USER_FUNCTION",
            NodeKind::Count => "COUNT",
            NodeKind::Terminal => "TERMINAL",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One tree node
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub token: Option<Token>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl Node {
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// Arena-backed syntax tree
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Ast {
    fn default() -> Self {
        Self::new()
    }
}

impl Ast {
    /// Tree with a lone `Input` root
    pub(crate) fn new() -> Self {
        let mut ast = Self {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        ast.root = ast.push(NodeKind::Input, None);
        ast
    }

    /// Add a detached node
    pub(crate) fn push(
        &mut self,
        kind: NodeKind,
        token: Option<Token>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            token,
            children: Vec::new(),
            parent: None,
        });
        id
    }

    /// Add a detached terminal; terminals always carry their token
    pub(crate) fn terminal(
        &mut self,
        token: Token,
    ) -> NodeId {
        self.push(NodeKind::Terminal, Some(token))
    }

    /// Append `child` to `parent`'s children
    pub(crate) fn attach(
        &mut self,
        parent: NodeId,
        child: NodeId,
    ) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Create a node of `kind` owning `children`
    pub(crate) fn wrap(
        &mut self,
        kind: NodeKind,
        token: Option<Token>,
        children: &[NodeId],
    ) -> NodeId {
        let id = self.push(kind, token);
        for &child in children {
            self.attach(id, child);
        }
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(
        &self,
        id: NodeId,
    ) -> &Node {
        &self.nodes[id.0]
    }

    pub fn kind(
        &self,
        id: NodeId,
    ) -> NodeKind {
        self.nodes[id.0].kind
    }

    pub fn token(
        &self,
        id: NodeId,
    ) -> Option<&Token> {
        self.nodes[id.0].token.as_ref()
    }

    pub fn children(
        &self,
        id: NodeId,
    ) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// The `n`th child, if present
    pub fn child(
        &self,
        id: NodeId,
        n: usize,
    ) -> Option<NodeId> {
        self.nodes[id.0].children.get(n).copied()
    }

    pub fn parent(
        &self,
        id: NodeId,
    ) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Number of nodes in the arena
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[self.root.0].children.is_empty()
    }

    /// Nodes reachable from the root, parents before children
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        order
    }

    /// Render the tree as a Graphviz `digraph`
    ///
    /// Nodes are numbered in pre-order starting at 1 and labelled with their
    /// lexeme (quotes stripped), or `ID:KIND` when they have no token.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph G {\n");
        let mut next = 1;
        self.write_dot(self.root, &mut next, &mut out);
        out.push_str("}\n");
        out
    }

    fn write_dot(
        &self,
        id: NodeId,
        next: &mut usize,
        out: &mut String,
    ) {
        let me = *next;
        *next += 1;

        let label = match self.token(id) {
            Some(token) => token.lexeme.replace('"', ""),
            None => format!("ID:{}", self.kind(id)),
        };
        out.push_str(&format!("    {} [label=\"{}\"]\n", me, label));

        for &child in self.children(id) {
            out.push_str(&format!("    {} -> {}\n", me, *next));
            self.write_dot(child, next, out);
        }
    }
}
