//! Dependency discovery
//!
//! Walks a node tree and collects every animated value its props reference,
//! descending into children and into list/struct props. Signals and derived
//! values are treated alike: anything stored as [`Prop::Value`] counts.
//!
//! The walk is read-only. The accumulator is threaded through the recursion
//! by value and handed back to the caller; shared subtrees are walked once.

use indexmap::IndexSet;
use rustc_hash::FxHashSet;
use skein_core::ValueId;

use crate::tree::{Node, Prop};

/// Distinct values referenced by a node tree, in first-seen order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DependencySet {
    values: IndexSet<ValueId>,
}

impl DependencySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value. Returns `false` if it was already present.
    pub fn insert(&mut self, value: ValueId) -> bool {
        self.values.insert(value)
    }

    pub fn contains(&self, value: ValueId) -> bool {
        self.values.contains(&value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = ValueId> + '_ {
        self.values.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<ValueId> {
        self.iter().collect()
    }
}

impl FromIterator<ValueId> for DependencySet {
    fn from_iter<I: IntoIterator<Item = ValueId>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

struct Walk {
    values: DependencySet,
    visited: FxHashSet<*const Node>,
}

/// Collect the animated values used anywhere in `root`'s subtree
pub fn discover(root: &Node) -> DependencySet {
    let walk = Walk {
        values: DependencySet::new(),
        visited: FxHashSet::default(),
    };
    let walk = walk_node(root, walk);
    tracing::trace!(kind = root.kind(), values = walk.values.len(), "discovered values");
    walk.values
}

/// Collect the animated values referenced by a single prop
pub fn discover_prop(prop: &Prop) -> DependencySet {
    walk_prop(prop, DependencySet::new())
}

fn walk_node(node: &Node, mut walk: Walk) -> Walk {
    if !walk.visited.insert(node as *const Node) {
        return walk;
    }
    for prop in node.props().values() {
        walk.values = walk_prop(prop, walk.values);
    }
    for child in node.child_nodes() {
        walk = walk_node(child, walk);
    }
    walk
}

fn walk_prop(prop: &Prop, mut values: DependencySet) -> DependencySet {
    match prop {
        Prop::Literal(_) => values,
        Prop::Value(id) => {
            values.insert(*id);
            values
        }
        Prop::List(items) => items.iter().fold(values, |acc, item| walk_prop(item, acc)),
        Prop::Struct(fields) => fields.values().fold(values, |acc, field| walk_prop(field, acc)),
    }
}
