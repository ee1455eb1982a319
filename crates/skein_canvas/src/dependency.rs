//! Dependency manager
//!
//! Binds one canvas component instance to its surface. On every render the
//! host calls, in order:
//!
//! 1. [`unsubscribe`](DependencyManager::unsubscribe) to drop the previous
//!    render's registration,
//! 2. [`visit`](DependencyManager::visit) with the new node tree,
//! 3. [`subscribe`](DependencyManager::subscribe) to register what was found.
//!
//! and [`unsubscribe`](DependencyManager::unsubscribe) once more on unmount.
//! [`render`](DependencyManager::render) performs the first three in one call.
//!
//! ```text
//!  Idle ──visit──▶ Collecting ──subscribe──▶ Registered
//!   ▲                  ▲                          │
//!   └──unsubscribe─────┴───────────visit──────────┘
//! ```
//!
//! The surface is injected; until one is attached `subscribe` fails with
//! [`CanvasError::SurfaceNotReady`].

use skein_core::ReactiveGraph;
use std::rc::Rc;

use crate::discovery::{discover, DependencySet};
use crate::error::{CanvasError, Result};
use crate::surface::{CanvasSurface, Unregister};
use crate::tree::Node;

/// Lifecycle state of a [`DependencyManager`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManagerState {
    /// Nothing pending, nothing registered
    Idle,
    /// A tree was visited; its values wait for `subscribe`
    Collecting,
    /// At least one registration is live on the surface
    Registered,
}

/// Per-canvas coordinator between dependency discovery and the surface
pub struct DependencyManager<S: CanvasSurface> {
    surface: Option<Rc<S>>,
    pending: DependencySet,
    registrations: Vec<Unregister>,
    state: ManagerState,
}

impl<S: CanvasSurface> DependencyManager<S> {
    /// A manager with no surface yet
    pub fn new() -> Self {
        Self {
            surface: None,
            pending: DependencySet::new(),
            registrations: Vec::new(),
            state: ManagerState::Idle,
        }
    }

    pub fn with_surface(surface: Rc<S>) -> Self {
        let mut manager = Self::new();
        manager.surface = Some(surface);
        manager
    }

    /// Attach (or replace) the surface once it is available
    pub fn attach_surface(&mut self, surface: Rc<S>) {
        self.surface = Some(surface);
    }

    /// Detach the surface. Live registrations stay until `unsubscribe`.
    pub fn detach_surface(&mut self) -> Option<Rc<S>> {
        self.surface.take()
    }

    pub fn is_ready(&self) -> bool {
        self.surface.is_some()
    }

    pub fn state(&self) -> ManagerState {
        self.state
    }

    /// Values found by the last `visit` and not yet registered
    pub fn pending(&self) -> &DependencySet {
        &self.pending
    }

    /// Registrations not yet revoked
    pub fn registration_count(&self) -> usize {
        self.registrations.len()
    }

    /// Discover the values used by `tree`, replacing any pending set
    pub fn visit(&mut self, tree: &Node) {
        self.pending = discover(tree);
        self.state = ManagerState::Collecting;
    }

    /// Register the pending values with the surface in one call
    ///
    /// No-op when nothing is pending.
    pub fn subscribe(&mut self, graph: &mut ReactiveGraph) -> Result<()> {
        let Some(surface) = self.surface.as_ref() else {
            tracing::warn!("subscribe called before the canvas surface was attached");
            return Err(CanvasError::SurfaceNotReady);
        };
        if self.pending.is_empty() {
            self.state = self.settled_state();
            return Ok(());
        }

        let values = self.pending.to_vec();
        let unregister = surface.register_values(graph, &values)?;
        self.registrations.push(unregister);
        self.pending.clear();
        self.state = ManagerState::Registered;
        tracing::debug!(values = values.len(), "dependencies registered");
        Ok(())
    }

    /// Revoke every live registration. No-op when there are none.
    pub fn unsubscribe(&mut self, graph: &mut ReactiveGraph) {
        if self.registrations.is_empty() {
            return;
        }
        let count = self.registrations.len();
        for unregister in self.registrations.drain(..) {
            unregister(graph);
        }
        self.state = if self.pending.is_empty() {
            ManagerState::Idle
        } else {
            ManagerState::Collecting
        };
        tracing::debug!(registrations = count, "dependencies unregistered");
    }

    /// One render pass: tear down, rediscover, register
    pub fn render(&mut self, graph: &mut ReactiveGraph, tree: &Node) -> Result<()> {
        self.unsubscribe(graph);
        self.visit(tree);
        self.subscribe(graph)
    }

    fn settled_state(&self) -> ManagerState {
        if self.registrations.is_empty() {
            ManagerState::Idle
        } else {
            ManagerState::Registered
        }
    }
}

impl<S: CanvasSurface> Default for DependencyManager<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: CanvasSurface> Drop for DependencyManager<S> {
    fn drop(&mut self) {
        if !self.registrations.is_empty() {
            tracing::warn!(
                registrations = self.registrations.len(),
                "dependency manager dropped without unsubscribe; subscriptions leak"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::RedrawSurface;
    use crate::tree::node;
    use skein_core::ValueId;
    use std::cell::RefCell;

    /// Surface that records every registration it receives
    #[derive(Default)]
    struct RecordingSurface {
        inner: RedrawSurface,
        calls: RefCell<Vec<Vec<ValueId>>>,
    }

    impl CanvasSurface for RecordingSurface {
        fn register_values(&self, graph: &mut ReactiveGraph, values: &[ValueId]) -> Result<Unregister> {
            self.calls.borrow_mut().push(values.to_vec());
            self.inner.register_values(graph, values)
        }
    }

    #[test]
    fn test_subscribe_without_surface() {
        let mut graph = ReactiveGraph::new();
        let x = graph.create_signal(0i32);
        let mut manager = DependencyManager::<RedrawSurface>::new();

        manager.visit(&node("rect").prop("x", x));
        assert_eq!(manager.subscribe(&mut graph), Err(CanvasError::SurfaceNotReady));
        assert_eq!(graph.subscriber_count(x.into()), 0);

        manager.attach_surface(Rc::new(RedrawSurface::new()));
        manager.subscribe(&mut graph).unwrap();
        assert_eq!(graph.subscriber_count(x.into()), 1);
        manager.unsubscribe(&mut graph);
    }

    #[test]
    fn test_lifecycle_states() {
        let mut graph = ReactiveGraph::new();
        let x = graph.create_signal(0i32);
        let mut manager = DependencyManager::with_surface(Rc::new(RedrawSurface::new()));
        assert_eq!(manager.state(), ManagerState::Idle);

        manager.visit(&node("rect").prop("x", x));
        assert_eq!(manager.state(), ManagerState::Collecting);
        assert_eq!(manager.pending().len(), 1);

        manager.subscribe(&mut graph).unwrap();
        assert_eq!(manager.state(), ManagerState::Registered);
        assert!(manager.pending().is_empty());

        manager.unsubscribe(&mut graph);
        assert_eq!(manager.state(), ManagerState::Idle);
    }

    #[test]
    fn test_visit_rebuilds_pending() {
        let mut graph = ReactiveGraph::new();
        let x = graph.create_signal(0i32);
        let y = graph.create_signal(0i32);
        let mut manager = DependencyManager::<RedrawSurface>::new();

        manager.visit(&node("rect").prop("x", x));
        manager.visit(&node("rect").prop("y", y));
        assert_eq!(manager.pending().to_vec(), vec![ValueId::from(y)]);
    }

    #[test]
    fn test_single_registration_per_subscribe() {
        let mut graph = ReactiveGraph::new();
        let x = graph.create_signal(0i32);
        let y = graph.create_signal(0i32);
        let surface = Rc::new(RecordingSurface::default());
        let mut manager = DependencyManager::with_surface(surface.clone());

        let tree = node("group")
            .child(node("rect").prop("x", x).prop("y", y))
            .child(node("rect").prop("x", x));
        manager.visit(&tree);
        manager.subscribe(&mut graph).unwrap();
        // Second subscribe without a visit has nothing to register
        manager.subscribe(&mut graph).unwrap();

        assert_eq!(
            *surface.calls.borrow(),
            vec![vec![ValueId::from(x), ValueId::from(y)]]
        );
        assert_eq!(manager.registration_count(), 1);
        manager.unsubscribe(&mut graph);
    }

    #[test]
    fn test_empty_tree_registers_nothing() {
        let mut graph = ReactiveGraph::new();
        let surface = Rc::new(RecordingSurface::default());
        let mut manager = DependencyManager::with_surface(surface.clone());

        manager.render(&mut graph, &node("rect").prop("x", 1.0f32)).unwrap();
        assert!(surface.calls.borrow().is_empty());
        assert_eq!(manager.registration_count(), 0);
        assert_eq!(manager.state(), ManagerState::Idle);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let mut graph = ReactiveGraph::new();
        let x = graph.create_signal(0i32);
        let mut manager = DependencyManager::with_surface(Rc::new(RedrawSurface::new()));

        manager.unsubscribe(&mut graph);
        manager.render(&mut graph, &node("rect").prop("x", x)).unwrap();
        manager.unsubscribe(&mut graph);
        manager.unsubscribe(&mut graph);
        assert_eq!(graph.subscriber_count(x.into()), 0);
    }

    #[test]
    fn test_repeated_render_cycles_do_not_leak() {
        let mut graph = ReactiveGraph::new();
        let x = graph.create_signal(0i32);
        let y = graph.create_derived((x,), |(v,)| v * 2).unwrap();
        let surface = Rc::new(RedrawSurface::new());
        let mut manager = DependencyManager::with_surface(surface.clone());
        let tree = node("group")
            .child(node("rect").prop("x", x))
            .child(node("rect").prop("width", y));

        for _ in 0..100 {
            manager.visit(&tree);
            manager.subscribe(&mut graph).unwrap();
            assert_eq!(surface.registration_count(), 1);
            manager.unsubscribe(&mut graph);
        }

        assert_eq!(surface.registration_count(), 0);
        assert_eq!(graph.subscriber_count(x.into()), 0);
        assert_eq!(graph.subscriber_count(y.into()), 0);
        assert_eq!(graph.stats().subscription_count, 0);
    }

    #[test]
    fn test_rerender_drops_removed_values() {
        let mut graph = ReactiveGraph::new();
        let x = graph.create_signal(0i32);
        let y = graph.create_signal(0i32);
        let surface = Rc::new(RedrawSurface::new());
        let mut manager = DependencyManager::with_surface(surface.clone());

        manager
            .render(&mut graph, &node("rect").prop("x", x).prop("y", y))
            .unwrap();
        manager.render(&mut graph, &node("rect").prop("x", x)).unwrap();

        assert_eq!(graph.subscriber_count(x.into()), 1);
        assert_eq!(graph.subscriber_count(y.into()), 0);

        graph.set(y, 5).unwrap();
        assert!(!surface.take_redraw());
        graph.set(x, 5).unwrap();
        assert!(surface.take_redraw());
        manager.unsubscribe(&mut graph);
    }

    #[test]
    fn test_two_managers_share_a_value() {
        let mut graph = ReactiveGraph::new();
        let clock = graph.create_signal(0.0f64);
        let left = Rc::new(RedrawSurface::new());
        let right = Rc::new(RedrawSurface::new());
        let mut a = DependencyManager::with_surface(left.clone());
        let mut b = DependencyManager::with_surface(right.clone());

        a.render(&mut graph, &node("rect").prop("x", clock)).unwrap();
        b.render(&mut graph, &node("circle").prop("r", clock)).unwrap();
        graph.set(clock, 16.0).unwrap();
        assert!(left.take_redraw());
        assert!(right.take_redraw());

        a.unsubscribe(&mut graph);
        graph.set(clock, 32.0).unwrap();
        assert!(!left.take_redraw());
        assert!(right.take_redraw());
        b.unsubscribe(&mut graph);
    }

    #[test]
    fn test_derived_redraw_only_on_change() {
        let mut graph = ReactiveGraph::new();
        let x = graph.create_signal(3i32);
        let parity = graph.create_derived((x,), |(v,)| v % 2).unwrap();
        let surface = Rc::new(RedrawSurface::new());
        let mut manager = DependencyManager::with_surface(surface.clone());

        manager.render(&mut graph, &node("rect").prop("visible", parity)).unwrap();
        graph.set(x, 5).unwrap();
        assert_eq!(surface.invalidation_count(), 0);
        graph.set(x, 6).unwrap();
        assert_eq!(surface.invalidation_count(), 1);
        manager.unsubscribe(&mut graph);
    }
}
