use crate::ast::{NodeKind, Num, Str};
use crate::token::Token;

/// Handle into the node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One tree node. Child order is the only positional record of a node's
/// sub-structure; `token_stop`/`char_stop` are one past the end, unlike the
/// inclusive offsets on tokens.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub parenthesized: bool,
    pub line: usize,
    pub column: usize,
    pub token_start: usize,
    pub token_stop: usize,
    pub char_start: usize,
    pub char_stop: usize,
}

#[derive(Debug, Default)]
pub struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    pub fn new() -> Arena {
        Arena { nodes: Vec::new() }
    }

    pub fn add(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
            parenthesized: false,
            line: 0,
            column: 0,
            token_start: 0,
            token_stop: 0,
            char_start: 0,
            char_stop: 0,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn name_text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.index()].kind {
            NodeKind::Name { id } => Some(id),
            _ => None,
        }
    }

    pub fn num_value(&self, id: NodeId) -> Option<&Num> {
        match &self.nodes[id.index()].kind {
            NodeKind::NumLit { value } => Some(value),
            _ => None,
        }
    }

    pub fn str_value(&self, id: NodeId) -> Option<&Str> {
        match &self.nodes[id.index()].kind {
            NodeKind::StrLit { value } => Some(value),
            _ => None,
        }
    }

    /// Declared name of a `def` or `class` node.
    pub fn def_name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.index()].kind {
            NodeKind::FunctionDef { name } | NodeKind::ClassDef { name } => Some(name),
            _ => None,
        }
    }

    /// Preorder listing of `root` and everything below it.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            for child in self.nodes[id.index()].children.iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    pub fn set_parenthesized(&mut self, id: NodeId) {
        self.nodes[id.index()].parenthesized = true;
    }

    pub fn is_parenthesized(&self, id: NodeId) -> bool {
        self.nodes[id.index()].parenthesized
    }

    /// Appends `child` and makes `parent` its structural parent.
    pub fn push_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.index()].children.push(child);
        self.nodes[child.index()].parent = Some(parent);
    }

    /// Appends a sibling group in order. The empty group is a no-op; a
    /// construction may legitimately contribute zero statements.
    pub fn splice_children(&mut self, parent: NodeId, group: &[NodeId]) {
        for child in group {
            self.push_child(parent, *child);
        }
    }

    /// Replaces the inclusive child range `start..=stop` with `replacement`,
    /// re-parenting both sides. Indices past the child list or an empty
    /// child list are contract violations and panic.
    pub fn replace_children(
        &mut self,
        parent: NodeId,
        start: usize,
        stop: usize,
        replacement: &[NodeId],
    ) {
        let count = self.nodes[parent.index()].children.len();
        assert!(count > 0, "replace_children on a node without children");
        assert!(
            start <= stop && stop < count,
            "child range {start}..={stop} out of bounds for {count} children"
        );
        let removed: Vec<NodeId> = self.nodes[parent.index()].children[start..=stop].to_vec();
        self.nodes[parent.index()]
            .children
            .splice(start..=stop, replacement.iter().copied());
        for child in removed {
            self.nodes[child.index()].parent = None;
        }
        for child in replacement {
            self.nodes[child.index()].parent = Some(parent);
        }
    }

    /// Records the covering token range (inclusive indices in) and derives
    /// the character range and anchor position. Stops are stored one past
    /// the end; `last < first` marks a node covering no tokens.
    pub fn set_boundaries(&mut self, id: NodeId, first: usize, last: usize, tokens: &[Token]) {
        let (line, column, char_start, char_stop) = if last < first {
            match tokens.get(first) {
                Some(tok) => (tok.line, tok.column, tok.start, tok.start),
                None => (0, 0, 0, 0),
            }
        } else {
            match (tokens.get(first), tokens.get(last)) {
                (Some(first_tok), Some(last_tok)) => (
                    first_tok.line,
                    first_tok.column,
                    first_tok.start,
                    last_tok.stop + 1,
                ),
                _ => (0, 0, 0, 0),
            }
        };
        let node = &mut self.nodes[id.index()];
        node.token_start = first;
        node.token_stop = if last < first { first } else { last + 1 };
        node.line = line;
        node.column = column;
        node.char_start = char_start;
        node.char_stop = char_stop;
    }

    /// Compact single-line rendering of a subtree, used by tests and
    /// debugging. Payloads render in brackets, children in parentheses.
    pub fn dump(&self, id: NodeId) -> String {
        let node = &self.nodes[id.index()];
        let head = match &node.kind {
            NodeKind::Name { id } => return format!("Name({id})"),
            NodeKind::NumLit { value } => return format!("Num({})", render_num(value)),
            NodeKind::StrLit { value } => return format!("Str({})", render_str(value)),
            NodeKind::Global { names } => return format!("Global[{}]", names.join(",")),
            NodeKind::Param { name } => format!("Param[{name}]"),
            NodeKind::BinOp { op } => format!("BinOp[{op:?}]"),
            NodeKind::BoolOp { op } => format!("BoolOp[{op:?}]"),
            NodeKind::UnaryOp { op } => format!("UnaryOp[{op:?}]"),
            NodeKind::AugAssign { op } => format!("AugAssign[{op:?}]"),
            NodeKind::Compare { ops } => {
                let ops: Vec<String> = ops.iter().map(|op| format!("{op:?}")).collect();
                format!("Compare[{}]", ops.join(","))
            }
            NodeKind::Attribute { attr } => format!("Attribute[{attr}]"),
            NodeKind::Keyword { name } => format!("Keyword[{name}]"),
            NodeKind::FunctionDef { name } => format!("FunctionDef[{name}]"),
            NodeKind::ClassDef { name } => format!("ClassDef[{name}]"),
            NodeKind::Call {
                has_star,
                has_dstar,
            } => {
                let mut marks = Vec::new();
                if *has_star {
                    marks.push("star");
                }
                if *has_dstar {
                    marks.push("dstar");
                }
                if marks.is_empty() {
                    "Call".to_string()
                } else {
                    format!("Call[{}]", marks.join(","))
                }
            }
            NodeKind::Print { has_dest, newline } => {
                let mut marks = Vec::new();
                if *has_dest {
                    marks.push("dest");
                }
                if !*newline {
                    marks.push("nonl");
                }
                if marks.is_empty() {
                    "Print".to_string()
                } else {
                    format!("Print[{}]", marks.join(","))
                }
            }
            other => {
                let mut label = format!("{other:?}");
                if let Some(brace) = label.find(" {") {
                    label.truncate(brace);
                }
                label
            }
        };
        if node.children.is_empty() {
            head
        } else {
            let children: Vec<String> = node.children.iter().map(|c| self.dump(*c)).collect();
            format!("{head}({})", children.join(", "))
        }
    }
}

fn render_num(value: &Num) -> String {
    match value {
        Num::Int(v) => v.to_string(),
        Num::Long(v) => format!("{v}L"),
        Num::Float(v) => v.to_string(),
        Num::Complex(v) => format!("{}j", v.im),
    }
}

fn render_str(value: &Str) -> String {
    match value {
        Str::Bytes(bytes) => format!("'{}'", String::from_utf8_lossy(bytes)),
        Str::Unicode(text) => format!("u'{text}'"),
    }
}
