// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The compiled command tree.
//!
//! The reference implementation links nodes with raw `parent` /
//! `children` / `sibling` pointers. Per the REDESIGN FLAGS this
//! is re-architected as an arena of [`Node`]s addressed by
//! [`NodeId`], with ordered `Vec<NodeId>` standing in for the
//! sibling chain — `parent` becomes a lookup into the same arena
//! rather than a pointer, so the tree has no lifetimes to fight and
//! frees trivially when the arena is dropped.

use crate::control::Control;
use crate::error::Result;
use crate::frame::MatchFrame;
use crate::options::ErasedBinder;
use crate::stream::Stream;
use crate::token::Token;
use std::any::Any;
use std::sync::Arc;

pub type NodeId = usize;

/// A registered command's handler: given the populated match frame,
/// the type-erased bound options (if the command declared a
/// [`crate::options::Binder`]), the command's output stream, and the
/// borrowed per-dispatch [`Control`] (tree/history access plus a
/// quit-request latch for the `quit`/`exit` builtins), produces an
/// exit status (`0` is success, mirroring `system(3)` conventions).
pub type Handler = Arc<
    dyn Fn(&MatchFrame, Option<&(dyn Any + Send)>, &mut Stream, &mut Control<'_>) -> Result<i32>
        + Send
        + Sync,
>;

/// One grammar position. Carries one token if it is a plain element,
/// or several if it is an alternation group's shared node.
pub struct Node {
    pub tokens: Vec<Token>,
    pub children: Vec<NodeId>,
    pub keyword_children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    pub handler: Option<Handler>,
    pub binder: Option<ErasedBinder>,
    /// The full syntax string of the command this node terminates,
    /// set alongside `handler`; used by the `list` builtin.
    pub terminal_syntax: Option<String>,
}

impl Node {
    fn new(tokens: Vec<Token>, parent: Option<NodeId>) -> Self {
        Node {
            tokens,
            children: Vec::new(),
            keyword_children: Vec::new(),
            parent,
            handler: None,
            binder: None,
            terminal_syntax: None,
        }
    }

    /// `true` iff every token at this node has the given key (the
    /// common case of a single-token node).
    pub fn has_key(&self, key: &str) -> bool {
        self.tokens.iter().any(|t| t.key == key)
    }

    /// Key-set equality used to dedupe alternation-group nodes: two multi-token nodes are the same node iff
    /// their token-key sets are equal, order-insensitive.
    pub fn key_set_eq(&self, keys: &[String]) -> bool {
        if self.tokens.len() != keys.len() {
            return false;
        }
        keys.iter().all(|k| self.has_key(k))
    }

    pub fn is_terminal(&self) -> bool {
        self.handler.is_some()
    }
}

/// An arena of [`Node`]s, shared read-only across sessions once
/// built.
pub struct CommandTree {
    nodes: Vec<Node>,
}

impl CommandTree {
    pub const ROOT: NodeId = 0;

    pub(crate) fn new() -> Self {
        CommandTree { nodes: vec![Node::new(Vec::new(), None)] }
    }

    pub fn root(&self) -> NodeId {
        Self::ROOT
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub(crate) fn alloc(&mut self, tokens: Vec<Token>, parent: NodeId) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::new(tokens, Some(parent)));
        id
    }

    /// Finds an existing single-key child under `parent.children`
    /// whose sole token's key equals `key`.
    pub(crate) fn find_child_by_key(&self, parent: NodeId, key: &str) -> Option<NodeId> {
        self.nodes[parent]
            .children
            .iter()
            .copied()
            .find(|&id| self.nodes[id].tokens.len() == 1 && self.nodes[id].has_key(key))
    }

    /// Finds an existing alternation-group child whose token-key set
    /// equals `keys`.
    pub(crate) fn find_child_by_key_set(
        &self,
        parent: NodeId,
        keys: &[String],
    ) -> Option<NodeId> {
        self.nodes[parent]
            .children
            .iter()
            .copied()
            .find(|&id| self.nodes[id].key_set_eq(keys))
    }

    /// Finds an existing keyword-branch child under
    /// `parent.keyword_children` whose sole token's key equals `key`.
    pub(crate) fn find_keyword_child_by_key(
        &self,
        parent: NodeId,
        key: &str,
    ) -> Option<NodeId> {
        self.nodes[parent]
            .keyword_children
            .iter()
            .copied()
            .find(|&id| self.nodes[id].has_key(key))
    }

    pub(crate) fn push_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent].children.push(child);
    }

    pub(crate) fn push_keyword_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent].keyword_children.push(child);
    }

    /// All command syntax strings registered in this tree, in the
    /// deterministic (sorted) registration order.
    pub fn syntaxes(&self) -> Vec<&str> {
        let mut v: Vec<&str> = self
            .nodes
            .iter()
            .filter_map(|n| n.terminal_syntax.as_deref())
            .collect();
        v.sort_unstable();
        v.dedup();
        v
    }

    /// Renders an ASCII-art dump of the tree for the `show cmdtree`
    /// builtin: one line per node, children indented two
    /// spaces under their parent, keyword children marked with `{}`.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_node(Self::ROOT, 0, &mut out);
        out
    }

    fn dump_node(&self, id: NodeId, depth: usize, out: &mut String) {
        let node = &self.nodes[id];
        if id != Self::ROOT {
            let indent = "  ".repeat(depth);
            let keys: Vec<&str> = node.tokens.iter().map(|t| t.key.as_str()).collect();
            let label = keys.join("|");
            let marker = if node.is_terminal() { " <cr>" } else { "" };
            out.push_str(&format!("{indent}{label}{marker}\n"));
        }
        let next_depth = if id == Self::ROOT { depth } else { depth + 1 };
        for &child in &node.children {
            self.dump_node(child, next_depth, out);
        }
        for &child in &node.keyword_children {
            let indent = "  ".repeat(next_depth);
            let keys: Vec<&str> =
                self.nodes[child].tokens.iter().map(|t| t.key.as_str()).collect();
            out.push_str(&format!("{indent}{{{}}}\n", keys.join("|")));
            for &grandchild in &self.nodes[child].children {
                self.dump_node(grandchild, next_depth + 1, out);
            }
        }
    }

    /// Validates the invariant that every allocated node (other than
    /// the root) is reachable from exactly one parent edge. Used by
    /// tests; not required for normal operation since the builder
    /// never double-links a node.
    #[cfg(test)]
    fn single_owner_invariant(&self) -> bool {
        let mut owners = vec![0u32; self.nodes.len()];
        for node in &self.nodes {
            for &c in node.children.iter().chain(node.keyword_children.iter()) {
                owners[c] += 1;
            }
        }
        owners[Self::ROOT] == 0 && owners[1..].iter().all(|&n| n == 1)
    }
}

impl std::fmt::Debug for CommandTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CommandTree({} nodes)", self.nodes.len())
    }
}
