//! Observable values
//!
//! Every value the graph can hand out, signals and derived values alike,
//! implements [`Observable`]. Consumers that only care about identity (the
//! renderer's dependency tracking, canvas surfaces) work with the type-erased
//! [`ValueId`] instead, so a node tree can hold values of any type side by side.
//!
//! [`Sources`] describes the ordered input list of a derived value: a tuple of
//! up to six observables of mixed types, or a `Vec` of observables of one type.

use smallvec::{smallvec, SmallVec};

use crate::error::Result;
use crate::reactive::{Derived, DerivedId, ReactiveGraph, Signal, SignalId, Subscriber, SubscriptionId};

/// Type-erased identity of an observable value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueId {
    /// A mutable value cell
    Signal(SignalId),
    /// A memoized derived value
    Derived(DerivedId),
}

impl ValueId {
    pub fn is_signal(&self) -> bool {
        matches!(self, ValueId::Signal(_))
    }

    pub fn is_derived(&self) -> bool {
        matches!(self, ValueId::Derived(_))
    }
}

impl From<SignalId> for ValueId {
    fn from(id: SignalId) -> Self {
        ValueId::Signal(id)
    }
}

impl From<DerivedId> for ValueId {
    fn from(id: DerivedId) -> Self {
        ValueId::Derived(id)
    }
}

impl<T> From<Signal<T>> for ValueId {
    fn from(signal: Signal<T>) -> Self {
        ValueId::Signal(signal.id())
    }
}

impl<T> From<Derived<T>> for ValueId {
    fn from(derived: Derived<T>) -> Self {
        ValueId::Derived(derived.id())
    }
}

/// A value that can be read and observed through a [`ReactiveGraph`]
///
/// Subscribers receive no payload; they re-read the value through the graph
/// they are handed.
pub trait Observable: Copy + 'static {
    /// The type produced by [`read`](Observable::read)
    type Output: Clone + 'static;

    /// Identity of this value inside its graph
    fn value_id(&self) -> ValueId;

    /// Current contents, or `None` if the value no longer exists
    fn read(&self, graph: &ReactiveGraph) -> Option<Self::Output>;

    /// Register `callback` to run whenever this value changes
    fn subscribe(&self, graph: &mut ReactiveGraph, callback: Subscriber) -> Result<SubscriptionId> {
        graph.subscribe(self.value_id(), callback)
    }

    /// Remove a subscription; unknown ids are ignored
    fn unsubscribe(&self, graph: &mut ReactiveGraph, subscription: SubscriptionId) {
        graph.unsubscribe(subscription);
    }
}

impl<T: Clone + 'static> Observable for Signal<T> {
    type Output = T;

    fn value_id(&self) -> ValueId {
        ValueId::Signal(self.id())
    }

    fn read(&self, graph: &ReactiveGraph) -> Option<T> {
        graph.get(*self)
    }
}

impl<T: Clone + PartialEq + 'static> Observable for Derived<T> {
    type Output = T;

    fn value_id(&self) -> ValueId {
        ValueId::Derived(self.id())
    }

    fn read(&self, graph: &ReactiveGraph) -> Option<T> {
        graph.get_derived(*self)
    }
}

/// Ordered input list of a derived value
pub trait Sources: 'static {
    /// The values handed to the compute function, in source order
    type Values;

    /// Identities of the sources, in order (duplicates allowed)
    fn ids(&self) -> SmallVec<[ValueId; 4]>;

    /// Read every source; `None` if any of them is gone
    fn read(&self, graph: &ReactiveGraph) -> Option<Self::Values>;
}

macro_rules! impl_sources_for_tuple {
    ($($ty:ident $var:ident),+) => {
        impl<$($ty: Observable),+> Sources for ($($ty,)+) {
            type Values = ($($ty::Output,)+);

            fn ids(&self) -> SmallVec<[ValueId; 4]> {
                let ($($var,)+) = self;
                smallvec![$($var.value_id()),+]
            }

            fn read(&self, graph: &ReactiveGraph) -> Option<Self::Values> {
                let ($($var,)+) = self;
                Some(($($var.read(graph)?,)+))
            }
        }
    };
}

impl_sources_for_tuple!(A a);
impl_sources_for_tuple!(A a, B b);
impl_sources_for_tuple!(A a, B b, C c);
impl_sources_for_tuple!(A a, B b, C c, D d);
impl_sources_for_tuple!(A a, B b, C c, D d, E e);
impl_sources_for_tuple!(A a, B b, C c, D d, E e, F f);

impl<O: Observable> Sources for Vec<O> {
    type Values = Vec<O::Output>;

    fn ids(&self) -> SmallVec<[ValueId; 4]> {
        self.iter().map(Observable::value_id).collect()
    }

    fn read(&self, graph: &ReactiveGraph) -> Option<Self::Values> {
        self.iter().map(|source| source.read(graph)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_id_from_handles() {
        let mut graph = ReactiveGraph::new();
        let x = graph.create_signal(1.0f32);
        let y = graph.create_derived((x,), |(x,)| x + 1.0).unwrap();

        assert_eq!(ValueId::from(x), x.value_id());
        assert!(ValueId::from(x).is_signal());
        assert!(ValueId::from(y).is_derived());
        assert_ne!(ValueId::from(x), ValueId::from(y));
    }

    #[test]
    fn test_tuple_sources_mixed_types() {
        let mut graph = ReactiveGraph::new();
        let label = graph.create_signal(String::from("x"));
        let pos = graph.create_signal((1.0f32, 2.0f32));
        let sources = (label, pos);

        assert_eq!(sources.ids().as_slice(), &[label.value_id(), pos.value_id()]);
        assert_eq!(
            sources.read(&graph),
            Some((String::from("x"), (1.0, 2.0)))
        );
    }

    #[test]
    fn test_vec_sources_missing_value() {
        let mut graph = ReactiveGraph::new();
        let a = graph.create_signal(1i32);
        let b = graph.create_signal(2i32);
        let sources = vec![a, b];
        assert_eq!(sources.read(&graph), Some(vec![1, 2]));

        graph.dispose_signal(b).unwrap();
        assert_eq!(sources.read(&graph), None);
    }

    #[test]
    fn test_observable_subscribe_through_trait() {
        use crate::reactive::subscriber;
        use std::cell::Cell;
        use std::rc::Rc;

        let mut graph = ReactiveGraph::new();
        let x = graph.create_signal(0u8);
        let hits = Rc::new(Cell::new(0));
        let hits_clone = hits.clone();

        let sub = x
            .subscribe(&mut graph, subscriber(move |_| hits_clone.set(hits_clone.get() + 1)))
            .unwrap();
        graph.set(x, 1).unwrap();
        x.unsubscribe(&mut graph, sub);
        graph.set(x, 2).unwrap();

        assert_eq!(hits.get(), 1);
    }
}
