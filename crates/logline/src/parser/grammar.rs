//! Grammar: node kinds of the access-log line and their static rules.

use super::token::is_whitespace_token;

/// Syntactic region of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// The whole line
    Root,
    /// Implicit field opened by the root for bare text (IP, dash, status, ...)
    Field,
    /// `[...]`
    Time,
    /// `"..."`
    Quoted,
    /// `\x` inside a quoted string
    Escape,
}

/// How a node recognises a token (end tag or ignored token).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenMatch {
    Nothing,
    Exact(&'static str),
    Whitespace,
}

impl TokenMatch {
    pub fn matches(&self, token: &str) -> bool {
        match self {
            TokenMatch::Nothing => false,
            TokenMatch::Exact(tag) => *tag == token,
            TokenMatch::Whitespace => is_whitespace_token(token),
        }
    }
}

/// Static rule for one node kind.
#[derive(Debug, Clone, Copy)]
pub struct NodeRule {
    pub start_tag: Option<&'static str>,
    pub end_tag: TokenMatch,
    pub ignore: TokenMatch,
    /// Kinds that may open beneath this one, keyed by their start tag.
    pub children: &'static [NodeKind],
    /// Escape spellings and their decoded characters (escape kind only).
    pub escapes: &'static [(&'static str, char)],
}

/// Immutable set of node rules shared by every [`NodeStack`](super::stack::NodeStack).
#[derive(Debug)]
pub struct Grammar {
    root: NodeRule,
    field: NodeRule,
    time: NodeRule,
    quoted: NodeRule,
    escape: NodeRule,
}

const STRING_ESCAPES: &[(&str, char)] = &[
    ("\\", '\\'),
    ("\"", '"'),
    ("t", '\t'),
    ("n", '\n'),
    ("r", '\r'),
];

/// Grammar of Apache/NCSA access log lines.
pub static ACCESS_LOG: Grammar = Grammar {
    root: NodeRule {
        start_tag: None,
        end_tag: TokenMatch::Nothing,
        ignore: TokenMatch::Whitespace,
        children: &[NodeKind::Time, NodeKind::Quoted],
        escapes: &[],
    },
    field: NodeRule {
        start_tag: None,
        end_tag: TokenMatch::Whitespace,
        ignore: TokenMatch::Nothing,
        children: &[],
        escapes: &[],
    },
    time: NodeRule {
        start_tag: Some("["),
        end_tag: TokenMatch::Exact("]"),
        ignore: TokenMatch::Nothing,
        children: &[],
        escapes: &[],
    },
    quoted: NodeRule {
        start_tag: Some("\""),
        end_tag: TokenMatch::Exact("\""),
        ignore: TokenMatch::Nothing,
        children: &[NodeKind::Escape],
        escapes: &[],
    },
    escape: NodeRule {
        start_tag: Some("\\"),
        end_tag: TokenMatch::Nothing,
        ignore: TokenMatch::Nothing,
        children: &[],
        escapes: STRING_ESCAPES,
    },
};

impl Grammar {
    pub fn access_log() -> &'static Grammar {
        &ACCESS_LOG
    }

    pub fn rule(&self, kind: NodeKind) -> &NodeRule {
        match kind {
            NodeKind::Root => &self.root,
            NodeKind::Field => &self.field,
            NodeKind::Time => &self.time,
            NodeKind::Quoted => &self.quoted,
            NodeKind::Escape => &self.escape,
        }
    }

    /// Child kind of `parent` opened by `token`, if any.
    pub fn child_for(&self, parent: NodeKind, token: &str) -> Option<NodeKind> {
        self.rule(parent)
            .children
            .iter()
            .copied()
            .find(|child| self.rule(*child).start_tag == Some(token))
    }

    /// Decode the payload of an escape node.
    ///
    /// Returns the decoded character (`None` for an unknown spelling) and the
    /// remainder of the token that is plain text again. An unknown spelling
    /// consumes only its first character and keeps the rest as text, so
    /// `\xyz` decodes to `yz` rather than dropping the whole token.
    pub fn unescape<'a>(&self, token: &'a str) -> (Option<char>, &'a str) {
        let known = self
            .escape
            .escapes
            .iter()
            .filter(|(spelling, _)| token.starts_with(spelling))
            .max_by_key(|(spelling, _)| spelling.len());
        match known {
            Some((spelling, decoded)) => (Some(*decoded), &token[spelling.len()..]),
            None => {
                let skip = token.chars().next().map(char::len_utf8).unwrap_or(0);
                (None, &token[skip..])
            }
        }
    }
}
