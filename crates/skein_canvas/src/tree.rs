//! Drawing node tree
//!
//! A [`Node`] describes one drawing primitive: its kind (`"rect"`, `"image"`,
//! `"path"`, ...), an ordered map of props and its children. Props are either
//! literals or animated values (signals and derived values, stored by
//! [`ValueId`]) and may nest as lists or structs, e.g. a patch whose
//! `cubics` prop lists control-point handles, each holding animated positions.
//!
//! Children are reference counted so one subtree can appear under several
//! parents. Trees are acyclic.
//!
//! ```
//! use skein_canvas::node;
//! use skein_core::ReactiveGraph;
//!
//! let mut graph = ReactiveGraph::new();
//! let x = graph.create_signal(0.0f32);
//! let radius = graph.create_derived((x,), |(x,)| x / 10.0 + 4.0).unwrap();
//!
//! let scene = node("group")
//!     .child(node("rect").prop("x", x).prop("y", 100.0f32).prop("width", 10.0f32))
//!     .child(node("circle").prop("c", (200.0f32, 200.0f32)).prop("r", radius));
//! assert_eq!(scene.child_nodes().len(), 2);
//! ```

use indexmap::IndexMap;
use skein_core::{Derived, Observable, Signal, ValueId};
use std::rc::Rc;

/// A literal prop value
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Bool(bool),
    Number(f64),
    Text(String),
    Point { x: f32, y: f32 },
    /// Linear RGBA
    Color([f32; 4]),
}

/// A node prop
#[derive(Clone, Debug, PartialEq)]
pub enum Prop {
    Literal(Literal),
    /// An animated value, read at draw time
    Value(ValueId),
    List(Vec<Prop>),
    Struct(IndexMap<String, Prop>),
}

impl Prop {
    /// Prop bound to an observable value
    pub fn value<O: Observable>(value: O) -> Self {
        Prop::Value(value.value_id())
    }

    pub fn list<I, P>(items: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Prop>,
    {
        Prop::List(items.into_iter().map(Into::into).collect())
    }

    pub fn structure<I, K, P>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, P)>,
        K: Into<String>,
        P: Into<Prop>,
    {
        Prop::Struct(
            fields
                .into_iter()
                .map(|(k, p)| (k.into(), p.into()))
                .collect(),
        )
    }

    /// The animated value behind this prop, if it is one
    pub fn as_value(&self) -> Option<ValueId> {
        match self {
            Prop::Value(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Prop::Literal(literal) => Some(literal),
            _ => None,
        }
    }
}

impl From<Literal> for Prop {
    fn from(literal: Literal) -> Self {
        Prop::Literal(literal)
    }
}

impl From<bool> for Prop {
    fn from(v: bool) -> Self {
        Prop::Literal(Literal::Bool(v))
    }
}

impl From<f32> for Prop {
    fn from(v: f32) -> Self {
        Prop::Literal(Literal::Number(f64::from(v)))
    }
}

impl From<f64> for Prop {
    fn from(v: f64) -> Self {
        Prop::Literal(Literal::Number(v))
    }
}

impl From<i32> for Prop {
    fn from(v: i32) -> Self {
        Prop::Literal(Literal::Number(f64::from(v)))
    }
}

impl From<&str> for Prop {
    fn from(v: &str) -> Self {
        Prop::Literal(Literal::Text(v.to_string()))
    }
}

impl From<String> for Prop {
    fn from(v: String) -> Self {
        Prop::Literal(Literal::Text(v))
    }
}

impl From<(f32, f32)> for Prop {
    fn from((x, y): (f32, f32)) -> Self {
        Prop::Literal(Literal::Point { x, y })
    }
}

impl From<[f32; 4]> for Prop {
    fn from(rgba: [f32; 4]) -> Self {
        Prop::Literal(Literal::Color(rgba))
    }
}

impl From<Vec<Prop>> for Prop {
    fn from(items: Vec<Prop>) -> Self {
        Prop::List(items)
    }
}

impl From<ValueId> for Prop {
    fn from(id: ValueId) -> Self {
        Prop::Value(id)
    }
}

impl<T> From<Signal<T>> for Prop {
    fn from(signal: Signal<T>) -> Self {
        Prop::Value(signal.into())
    }
}

impl<T> From<Derived<T>> for Prop {
    fn from(derived: Derived<T>) -> Self {
        Prop::Value(derived.into())
    }
}

/// One drawing primitive and its subtree
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Node {
    kind: String,
    props: IndexMap<String, Prop>,
    children: Vec<Rc<Node>>,
}

/// Start building a node of the given kind
pub fn node(kind: impl Into<String>) -> Node {
    Node {
        kind: kind.into(),
        props: IndexMap::new(),
        children: Vec::new(),
    }
}

impl Node {
    /// Set a prop, replacing any previous value under `name`
    pub fn prop(mut self, name: impl Into<String>, value: impl Into<Prop>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    /// Append a child. Pass an `Rc<Node>` to share it with other parents.
    pub fn child(mut self, child: impl Into<Rc<Node>>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I, C>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Rc<Node>>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn props(&self) -> &IndexMap<String, Prop> {
        &self.props
    }

    pub fn get(&self, name: &str) -> Option<&Prop> {
        self.props.get(name)
    }

    pub fn child_nodes(&self) -> &[Rc<Node>] {
        &self.children
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skein_core::ReactiveGraph;

    #[test]
    fn test_builder() {
        let mut graph = ReactiveGraph::new();
        let x = graph.create_signal(0.0f32);

        let rect = node("rect")
            .prop("x", x)
            .prop("y", 100.0f32)
            .prop("color", "red")
            .prop("y", 120.0f32);

        assert_eq!(rect.kind(), "rect");
        assert_eq!(rect.props().len(), 3);
        assert_eq!(rect.get("x").and_then(Prop::as_value), Some(x.into()));
        assert_eq!(
            rect.get("y").and_then(Prop::as_literal),
            Some(&Literal::Number(120.0))
        );
        // Insertion order survives replacement
        let names: Vec<_> = rect.props().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["x", "y", "color"]);
    }

    #[test]
    fn test_shared_child() {
        let shared = Rc::new(node("circle").prop("r", 4.0f32));
        let group = node("group").child(shared.clone()).child(shared.clone());

        assert_eq!(group.child_nodes().len(), 2);
        assert!(Rc::ptr_eq(&group.child_nodes()[0], &group.child_nodes()[1]));
    }

    #[test]
    fn test_composite_props() {
        let mut graph = ReactiveGraph::new();
        let p = graph.create_signal((1.0f32, 2.0f32));

        let handle = Prop::structure([("pos", Prop::value(p)), ("c1", Prop::from((0.0f32, 0.0f32)))]);
        let Prop::Struct(fields) = &handle else {
            panic!("expected struct prop");
        };
        assert_eq!(fields["pos"], Prop::Value(p.into()));

        let list = Prop::list([1.0f32, 2.0]);
        assert_eq!(
            list,
            Prop::List(vec![
                Prop::Literal(Literal::Number(1.0)),
                Prop::Literal(Literal::Number(2.0)),
            ])
        );
    }
}
