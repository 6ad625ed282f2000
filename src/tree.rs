use std::fmt::Display;

/// Index of a node inside its [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Value-type tag used when matching arguments against command signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Int,
    Float,
    String,
    Call,
}

impl Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Kind::Int => write!(f, "int"),
            Kind::Float => write!(f, "float"),
            Kind::String => write!(f, "string"),
            Kind::Call => write!(f, "call"),
        }
    }
}

/// A fully reduced value: the kind plus its raw text.
///
/// Numbers keep the text they were written with (`-7`, `3.14`) and strings are
/// stored without their quotes.
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub kind: Kind,
    pub text: String,
}

impl Literal {
    pub fn new(kind: Kind, text: impl Into<String>) -> Self {
        debug_assert!(kind != Kind::Call, "a literal cannot be a call");
        Literal {
            kind,
            text: text.into(),
        }
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// `Kind::Call` for calls, otherwise the literal's kind.
    pub kind: Kind,
    /// Call name, or the literal's raw text.
    pub text: String,
    pub children: Vec<NodeId>,
    /// Character offset of the first character of the token. For calls this is
    /// the first character of the name.
    pub offset: usize,
}

impl Node {
    pub fn call(name: impl Into<String>, offset: usize) -> Self {
        Node {
            kind: Kind::Call,
            text: name.into(),
            children: Vec::new(),
            offset,
        }
    }

    pub fn literal(kind: Kind, text: impl Into<String>, offset: usize) -> Self {
        Node {
            kind,
            text: text.into(),
            children: Vec::new(),
            offset,
        }
    }

    pub fn is_call(&self) -> bool {
        self.kind == Kind::Call
    }

    pub fn as_literal(&self) -> Option<Literal> {
        (!self.is_call()).then(|| Literal::new(self.kind, self.text.clone()))
    }
}

/// One parsed expression, stored as an arena of nodes.
///
/// Nodes are allocated in source order, so the first node is always the root
/// and offsets never decrease with the node index. Nodes dropped by
/// [`Tree::collapse`] stay in the arena but are no longer reachable.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub(crate) fn new() -> Self {
        Tree { nodes: Vec::new() }
    }

    pub(crate) fn push(&mut self, node: Node) -> NodeId {
        debug_assert!(
            self.nodes.last().is_none_or(|last| last.offset <= node.offset),
            "nodes must be pushed in source order"
        );
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub(crate) fn push_child(&mut self, parent: NodeId, node: Node) -> NodeId {
        let id = self.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Number of allocated nodes, reachable or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Replaces a call node with a literal in place, keeping its offset and
    /// discarding its children.
    pub fn collapse(&mut self, id: NodeId, literal: Literal) {
        let node = &mut self.nodes[id.0];
        node.kind = literal.kind;
        node.text = literal.text;
        node.children.clear();
    }
}

/// One pending piece of output while rendering a [`Tree`].
enum Render {
    Node { id: NodeId, spaced: bool },
    Close,
}

impl Display for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        let mut pending = vec![Render::Node {
            id: self.root(),
            spaced: false,
        }];
        while let Some(step) = pending.pop() {
            let Render::Node { id, spaced } = step else {
                write!(f, ")")?;
                continue;
            };
            if spaced {
                write!(f, " ")?;
            }
            let node = self.node(id);
            match node.kind {
                Kind::Call => {
                    write!(f, "({}", node.text)?;
                    pending.push(Render::Close);
                    pending.extend(
                        node.children
                            .iter()
                            .rev()
                            .map(|&id| Render::Node { id, spaced: true }),
                    );
                }
                Kind::String => write!(f, "\"{}\"", node.text)?,
                Kind::Int | Kind::Float => write!(f, "{}", node.text)?,
            }
        }
        Ok(())
    }
}
