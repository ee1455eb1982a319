//! Canvas surfaces
//!
//! A [`CanvasSurface`] is whatever schedules redraws for a canvas. It is handed
//! a list of values and must arrange to redraw whenever any of them changes,
//! returning an [`Unregister`] handle that revokes exactly that registration.
//! Registrations accumulate: registering twice keeps both alive until each
//! handle is invoked.
//!
//! [`RedrawSurface`] is the stock implementation: it raises a redraw flag the
//! frame loop polls, and optionally calls a hook to wake the loop up.

use skein_core::{subscriber, ReactiveGraph, SubscriptionId, ValueId};
use smallvec::SmallVec;
use std::cell::Cell;
use std::rc::Rc;

use crate::error::Result;

/// Revokes one registration made with [`CanvasSurface::register_values`]
pub type Unregister = Box<dyn FnOnce(&mut ReactiveGraph)>;

/// Hook invoked when a registered value changes
pub type InvalidateCallback = Rc<dyn Fn()>;

/// Redraw scheduling for one canvas
pub trait CanvasSurface {
    /// Redraw whenever any of `values` changes until the returned handle runs
    fn register_values(&self, graph: &mut ReactiveGraph, values: &[ValueId]) -> Result<Unregister>;
}

/// A surface that records invalidations for a polling frame loop
#[derive(Default)]
pub struct RedrawSurface {
    needs_redraw: Rc<Cell<bool>>,
    invalidations: Rc<Cell<u64>>,
    registrations: Rc<Cell<usize>>,
    on_invalidate: Option<InvalidateCallback>,
}

impl RedrawSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `callback` on every invalidation (e.g. to wake an event loop)
    pub fn with_invalidate_callback<F>(callback: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self {
            on_invalidate: Some(Rc::new(callback)),
            ..Self::default()
        }
    }

    /// Check and clear the redraw flag
    pub fn take_redraw(&self) -> bool {
        self.needs_redraw.replace(false)
    }

    /// Manually request a redraw
    pub fn request_redraw(&self) {
        self.needs_redraw.set(true);
    }

    /// Total change notifications received
    pub fn invalidation_count(&self) -> u64 {
        self.invalidations.get()
    }

    /// Registrations not yet revoked
    pub fn registration_count(&self) -> usize {
        self.registrations.get()
    }
}

impl CanvasSurface for RedrawSurface {
    fn register_values(&self, graph: &mut ReactiveGraph, values: &[ValueId]) -> Result<Unregister> {
        let needs_redraw = Rc::clone(&self.needs_redraw);
        let invalidations = Rc::clone(&self.invalidations);
        let on_invalidate = self.on_invalidate.clone();
        let redraw = subscriber(move |_| {
            needs_redraw.set(true);
            invalidations.set(invalidations.get() + 1);
            if let Some(ref callback) = on_invalidate {
                callback();
            }
        });

        let mut subs: SmallVec<[SubscriptionId; 8]> = SmallVec::new();
        for &value in values {
            match graph.subscribe(value, Rc::clone(&redraw)) {
                Ok(sub) => subs.push(sub),
                Err(err) => {
                    for sub in subs {
                        graph.unsubscribe(sub);
                    }
                    return Err(err.into());
                }
            }
        }

        let registrations = Rc::clone(&self.registrations);
        registrations.set(registrations.get() + 1);
        tracing::debug!(values = values.len(), "surface registered values");

        Ok(Box::new(move |graph: &mut ReactiveGraph| {
            for sub in subs {
                graph.unsubscribe(sub);
            }
            registrations.set(registrations.get().saturating_sub(1));
            tracing::debug!("surface registration revoked");
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CanvasError;
    use skein_core::ReactiveError;

    #[test]
    fn test_change_requests_redraw() {
        let mut graph = ReactiveGraph::new();
        let x = graph.create_signal(0.0f32);
        let surface = RedrawSurface::new();

        let unregister = surface.register_values(&mut graph, &[x.into()]).unwrap();
        assert!(!surface.take_redraw());

        graph.set(x, 1.0).unwrap();
        assert!(surface.take_redraw());
        assert!(!surface.take_redraw());

        unregister(&mut graph);
        graph.set(x, 2.0).unwrap();
        assert!(!surface.take_redraw());
        assert_eq!(surface.invalidation_count(), 1);
        assert_eq!(graph.subscriber_count(x.into()), 0);
    }

    #[test]
    fn test_registrations_accumulate() {
        let mut graph = ReactiveGraph::new();
        let x = graph.create_signal(0i32);
        let surface = RedrawSurface::new();

        let first = surface.register_values(&mut graph, &[x.into()]).unwrap();
        let second = surface.register_values(&mut graph, &[x.into()]).unwrap();
        assert_eq!(surface.registration_count(), 2);
        assert_eq!(graph.subscriber_count(x.into()), 2);

        first(&mut graph);
        graph.set(x, 1).unwrap();
        assert!(surface.take_redraw());

        second(&mut graph);
        assert_eq!(surface.registration_count(), 0);
    }

    #[test]
    fn test_invalidate_callback() {
        let mut graph = ReactiveGraph::new();
        let x = graph.create_signal(0i32);
        let wakes = Rc::new(Cell::new(0));
        let wakes_clone = wakes.clone();
        let surface = RedrawSurface::with_invalidate_callback(move || {
            wakes_clone.set(wakes_clone.get() + 1)
        });

        let _unregister = surface.register_values(&mut graph, &[x.into()]).unwrap();
        graph.set(x, 1).unwrap();
        graph.set(x, 2).unwrap();
        assert_eq!(wakes.get(), 2);
    }

    #[test]
    fn test_unknown_value_rolls_back() {
        let mut graph = ReactiveGraph::new();
        let x = graph.create_signal(0i32);
        let gone = graph.create_signal(0i32);
        graph.dispose_signal(gone).unwrap();
        let surface = RedrawSurface::new();

        let err = match surface.register_values(&mut graph, &[x.into(), gone.into()]) {
            Err(err) => err,
            Ok(_) => panic!("registration should fail"),
        };
        assert_eq!(
            err,
            CanvasError::Reactive(ReactiveError::UnknownValue(gone.into()))
        );
        assert_eq!(graph.subscriber_count(x.into()), 0);
        assert_eq!(surface.registration_count(), 0);
    }
}
