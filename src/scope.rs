//! Lexical scope tree built during synthesis.
//!
//! Nodes live in an arena and refer to their parent by [`ContextId`], so the
//! tree has no ownership cycles. A context is never removed once created;
//! closed scopes stay in the tree for diagnostics.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Index of a context in its [`ScopeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContextId(pub usize);

impl ContextId {
    pub const ROOT: ContextId = ContextId(0);
}

/// A scope node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    /// Opening keyword of the block, or `global`.
    pub name: String,
    /// Creation order, unique across the tree.
    pub order: usize,
    pub parent: Option<ContextId>,
    pub declarations: BTreeSet<String>,
    pub children: Vec<ContextId>,
}

/// Arena of contexts rooted at the global scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeTree {
    nodes: Vec<Context>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Context {
                name: "global".to_string(),
                order: 0,
                parent: None,
                declarations: BTreeSet::new(),
                children: Vec::new(),
            }],
        }
    }

    pub fn get(&self, id: ContextId) -> &Context {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Create a child of `parent` and return its id.
    pub fn open(&mut self, parent: ContextId, name: &str) -> ContextId {
        let id = ContextId(self.nodes.len());
        self.nodes.push(Context {
            name: name.to_string(),
            order: id.0,
            parent: Some(parent),
            declarations: BTreeSet::new(),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn parent(&self, id: ContextId) -> Option<ContextId> {
        self.nodes[id.0].parent
    }

    /// `id` followed by each of its ancestors up to the root.
    pub fn ancestry(&self, id: ContextId) -> impl Iterator<Item = ContextId> + '_ {
        std::iter::successors(Some(id), move |&c| self.parent(c))
    }

    /// Whether `name` is declared in `id` or any ancestor.
    pub fn is_visible(&self, id: ContextId, name: &str) -> bool {
        self.ancestry(id).any(|c| self.nodes[c.0].declarations.contains(name))
    }

    /// Record a declaration. Returns false if the name is already visible.
    pub fn declare(&mut self, id: ContextId, name: &str) -> bool {
        if self.is_visible(id, name) {
            return false;
        }
        self.nodes[id.0].declarations.insert(name.to_string());
        true
    }

    pub fn depth(&self, id: ContextId) -> usize {
        self.ancestry(id).count() - 1
    }
}
