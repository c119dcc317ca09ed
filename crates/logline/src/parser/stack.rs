//! Stack: the parse engine that folds tokens into nested nodes.
//!
//! Nodes live in an arena owned by the stack; `path` holds the arena
//! indices from the root to the node currently being filled. A fresh
//! stack is built for every line and dropped once rendered.

use tracing::trace;

use super::grammar::{Grammar, NodeKind};

const ROOT: usize = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry<'a> {
    Token(&'a str),
    Decoded(char),
    Node(usize),
}

#[derive(Debug)]
struct Node<'a> {
    kind: NodeKind,
    entries: Vec<Entry<'a>>,
}

/// Live parse state for one log line.
#[derive(Debug)]
pub struct NodeStack<'g, 'a> {
    grammar: &'g Grammar,
    nodes: Vec<Node<'a>>,
    path: Vec<usize>,
}

impl<'g, 'a> NodeStack<'g, 'a> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self {
            grammar,
            nodes: vec![Node {
                kind: NodeKind::Root,
                entries: Vec::new(),
            }],
            path: vec![ROOT],
        }
    }

    /// Kind of the innermost open node.
    pub fn current_kind(&self) -> NodeKind {
        self.nodes[self.current()].kind
    }

    /// Number of open nodes, the root included.
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Feed one token into the state machine.
    pub fn push(&mut self, token: &'a str) {
        let kind = self.current_kind();
        trace!(?kind, token, "node stack push");

        if kind == NodeKind::Escape {
            self.push_escaped(token);
            return;
        }

        let rule = self.grammar.rule(kind);
        if rule.end_tag.matches(token) {
            self.pop();
        } else if let Some(child) = self.grammar.child_for(kind, token) {
            self.open(child);
        } else if kind == NodeKind::Field && self.grammar.child_for(NodeKind::Root, token).is_some() {
            self.pop();
            self.push(token);
        } else if rule.ignore.matches(token) {
            // dropped
        } else {
            if kind == NodeKind::Root {
                self.open(NodeKind::Field);
            }
            self.append(Entry::Token(token));
        }
    }

    /// Render the top-level fields, left to right.
    pub fn to_fields(&self) -> Vec<String> {
        self.nodes[ROOT]
            .entries
            .iter()
            .map(|entry| {
                let mut out = String::new();
                self.render_entry(entry, &mut out);
                out
            })
            .collect()
    }

    fn push_escaped(&mut self, token: &'a str) {
        let (decoded, rest) = self.grammar.unescape(token);
        if let Some(c) = decoded {
            self.append(Entry::Decoded(c));
        }
        self.pop();
        if !rest.is_empty() {
            self.append(Entry::Token(rest));
        }
    }

    fn current(&self) -> usize {
        self.path.last().copied().unwrap_or(ROOT)
    }

    fn append(&mut self, entry: Entry<'a>) {
        let current = self.current();
        self.nodes[current].entries.push(entry);
    }

    fn open(&mut self, kind: NodeKind) {
        let id = self.nodes.len();
        self.nodes.push(Node {
            kind,
            entries: Vec::new(),
        });
        self.append(Entry::Node(id));
        self.path.push(id);
    }

    fn pop(&mut self) {
        if self.path.len() > 1 {
            self.path.pop();
        }
    }

    fn render_entry(&self, entry: &Entry<'a>, out: &mut String) {
        match entry {
            Entry::Token(token) => out.push_str(token),
            Entry::Decoded(c) => out.push(*c),
            Entry::Node(id) => {
                for child in &self.nodes[*id].entries {
                    self.render_entry(child, out);
                }
            }
        }
    }
}
