//! Value effects
//!
//! Side effects that run whenever an observable value changes, typically a
//! clock tick driving another signal.

use skein_core::{subscriber, Observable, ReactiveGraph, Result, SubscriptionId};

/// Run `effect` after every change of `value`
///
/// The effect receives the graph and may write other signals. Writing
/// `value` itself (or anything upstream of it) is rejected by the graph.
/// Remove the effect with [`ReactiveGraph::unsubscribe`].
pub fn value_effect<O, F>(graph: &mut ReactiveGraph, value: O, effect: F) -> Result<SubscriptionId>
where
    O: Observable,
    F: Fn(&mut ReactiveGraph) + 'static,
{
    value.subscribe(graph, subscriber(effect))
}
