//! Fine-grained reactive value graph
//!
//! A push-pull hybrid:
//! - Writing a signal pushes invalidation (dirty flags) through every derived
//!   value downstream of it
//! - Derived values pull (lazily recompute) when read
//! - Derived values that somebody subscribed to are recomputed once when the
//!   write settles, and their subscribers only run if the result changed
//!
//! Writes outside a [`batch`](ReactiveGraph::batch) settle immediately: every
//! direct subscriber has run before [`set`](ReactiveGraph::set) returns. Inside
//! a batch, notification is deferred until the outermost batch ends, so no
//! subscriber ever reads a derived value computed from half of the batch.
//!
//! Compute functions receive plain source values, never the graph, so they
//! cannot write signals. Subscribers do receive the graph and may write; a
//! write that would feed back into a notification still in progress is
//! rejected with [`ReactiveError::ReentrantWrite`].
//!
//! ```
//! use skein_core::reactive::ReactiveGraph;
//!
//! let mut graph = ReactiveGraph::new();
//! let x = graph.create_signal(0i32);
//! let y = graph.create_derived((x,), |(x,)| x * 2).unwrap();
//!
//! graph.set(x, 5).unwrap();
//! assert_eq!(graph.get_derived(y), Some(10));
//! ```

use indexmap::IndexSet;
use rustc_hash::FxHashSet;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::config::ReactiveConfig;
use crate::error::{ReactiveError, Result};
use crate::value::{Sources, ValueId};

new_key_type! {
    /// Unique identifier for a signal
    pub struct SignalId;
    /// Unique identifier for a derived/computed value
    pub struct DerivedId;
    /// Token returned by [`ReactiveGraph::subscribe`]
    pub struct SubscriptionId;
}

/// Change callback. Identity is the `Rc` allocation: subscribing the same
/// `Rc` twice to one value is a no-op.
pub type Subscriber = Rc<dyn Fn(&mut ReactiveGraph)>;

/// Wrap a closure as a [`Subscriber`]
pub fn subscriber<F>(f: F) -> Subscriber
where
    F: Fn(&mut ReactiveGraph) + 'static,
{
    Rc::new(f)
}

/// A mutable value cell handle (cheap to copy)
#[derive(Debug)]
pub struct Signal<T> {
    id: SignalId,
    _marker: std::marker::PhantomData<T>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Signal<T> {}

impl<T> Signal<T> {
    /// Get the signal's internal ID
    pub fn id(&self) -> SignalId {
        self.id
    }
}

/// A derived/computed value handle
#[derive(Debug)]
pub struct Derived<T> {
    id: DerivedId,
    _marker: std::marker::PhantomData<T>,
}

impl<T> Clone for Derived<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Derived<T> {}

impl<T> Derived<T> {
    pub fn id(&self) -> DerivedId {
        self.id
    }
}

type ComputeFn = Rc<dyn Fn(&ReactiveGraph) -> Option<Box<dyn Any>>>;
type SameFn = fn(&dyn Any, &dyn Any) -> bool;

/// Internal signal node storage
struct SignalNode {
    value: Box<dyn Any>,
    /// Bumped on every write
    version: u64,
    subscribers: SmallVec<[SubscriptionId; 4]>,
    /// Derived values reading this signal
    dependents: SmallVec<[DerivedId; 4]>,
}

/// Internal derived node storage
struct DerivedNode {
    /// Cached value (if computed)
    value: RefCell<Option<Box<dyn Any>>>,
    compute: ComputeFn,
    /// Typed equality for the cached value
    same: SameFn,
    sources: SmallVec<[ValueId; 4]>,
    dependents: SmallVec<[DerivedId; 4]>,
    subscribers: SmallVec<[SubscriptionId; 4]>,
    /// Whether the cached value is stale
    dirty: Cell<bool>,
    /// Set while `compute` runs
    computing: Cell<bool>,
    /// Bumped whenever a recompute yields a different value
    revision: Cell<u64>,
    /// Revision the subscribers were last told about
    notified_revision: Cell<u64>,
}

struct SubscriptionEntry {
    value: ValueId,
    callback: Subscriber,
}

/// The reactive graph that owns all signals, derived values and subscriptions
pub struct ReactiveGraph {
    signals: SlotMap<SignalId, SignalNode>,
    derived: SlotMap<DerivedId, DerivedNode>,
    subscriptions: SlotMap<SubscriptionId, SubscriptionEntry>,
    /// Current batch depth (> 0 means we're in a batch)
    batch_depth: u32,
    /// Values changed inside the current batch, in write order
    pending: IndexSet<ValueId>,
    /// Values whose subscribers are running, innermost last
    notifying: SmallVec<[ValueId; 4]>,
    notify_depth: u32,
    /// Global version counter
    global_version: u64,
    config: ReactiveConfig,
}

impl ReactiveGraph {
    /// Create a new reactive graph with default configuration
    pub fn new() -> Self {
        Self::with_config(ReactiveConfig::default())
    }

    pub fn with_config(config: ReactiveConfig) -> Self {
        Self {
            signals: SlotMap::with_key(),
            derived: SlotMap::with_key(),
            subscriptions: SlotMap::with_key(),
            batch_depth: 0,
            pending: IndexSet::new(),
            notifying: SmallVec::new(),
            notify_depth: 0,
            global_version: 0,
            config,
        }
    }

    pub fn config(&self) -> &ReactiveConfig {
        &self.config
    }

    /// Whether `value` still exists in this graph
    pub fn contains(&self, value: ValueId) -> bool {
        match value {
            ValueId::Signal(id) => self.signals.contains_key(id),
            ValueId::Derived(id) => self.derived.contains_key(id),
        }
    }

    // =========================================================================
    // SIGNALS
    // =========================================================================

    /// Create a new signal with an initial value
    pub fn create_signal<T: 'static>(&mut self, initial: T) -> Signal<T> {
        let id = self.signals.insert(SignalNode {
            value: Box::new(initial),
            version: 0,
            subscribers: SmallVec::new(),
            dependents: SmallVec::new(),
        });
        tracing::trace!(?id, "signal created");
        Signal {
            id,
            _marker: std::marker::PhantomData,
        }
    }

    /// Get the current value of a signal
    pub fn get<T: Clone + 'static>(&self, signal: Signal<T>) -> Option<T> {
        self.signals
            .get(signal.id)
            .and_then(|node| node.value.downcast_ref::<T>().cloned())
    }

    /// Set the value of a signal and notify everything that depends on it
    pub fn set<T: 'static>(&mut self, signal: Signal<T>, value: T) -> Result<()> {
        let written = ValueId::Signal(signal.id);
        if !self.signals.contains_key(signal.id) {
            return Err(ReactiveError::UnknownValue(written));
        }
        self.check_reentrant(written)?;

        if let Some(node) = self.signals.get_mut(signal.id) {
            node.value = Box::new(value);
            node.version += 1;
        }
        self.global_version += 1;
        self.invalidate(&[written]);

        if self.batch_depth > 0 {
            self.pending.insert(written);
            return Ok(());
        }
        self.settle(&[written])
    }

    /// Update a signal using a function
    pub fn update<T: Clone + 'static, F: FnOnce(T) -> T>(
        &mut self,
        signal: Signal<T>,
        f: F,
    ) -> Result<()> {
        let current = self
            .get(signal)
            .ok_or(ReactiveError::UnknownValue(ValueId::Signal(signal.id)))?;
        self.set(signal, f(current))
    }

    /// Get the version of a signal (for change detection)
    pub fn signal_version(&self, id: SignalId) -> Option<u64> {
        self.signals.get(id).map(|n| n.version)
    }

    /// Remove a signal and every subscription pointing at it
    ///
    /// Subscribers are dropped, not invoked.
    pub fn dispose_signal<T>(&mut self, signal: Signal<T>) -> Result<()> {
        let value = ValueId::Signal(signal.id);
        let node = self
            .signals
            .get(signal.id)
            .ok_or(ReactiveError::UnknownValue(value))?;
        if !node.dependents.is_empty() {
            return Err(ReactiveError::ValueInUse(value));
        }
        if let Some(node) = self.signals.remove(signal.id) {
            self.drop_subscriptions(&node.subscribers);
        }
        self.pending.shift_remove(&value);
        tracing::trace!(id = ?signal.id, "signal disposed");
        Ok(())
    }

    // =========================================================================
    // DERIVED VALUES
    // =========================================================================

    /// Create a derived (computed) value over an ordered list of sources
    ///
    /// `compute` receives the current source values in order. The value is
    /// computed lazily on first read.
    pub fn create_derived<S, T, F>(&mut self, sources: S, compute: F) -> Result<Derived<T>>
    where
        S: Sources,
        T: Clone + PartialEq + 'static,
        F: Fn(S::Values) -> T + 'static,
    {
        let source_ids = sources.ids();
        self.check_sources(&source_ids, None)?;

        let id = self.derived.insert(DerivedNode {
            value: RefCell::new(None),
            compute: erase_compute(sources, compute),
            same: same_value::<T>,
            sources: source_ids.clone(),
            dependents: SmallVec::new(),
            subscribers: SmallVec::new(),
            dirty: Cell::new(true), // Start dirty to force initial computation
            computing: Cell::new(false),
            revision: Cell::new(0),
            notified_revision: Cell::new(0),
        });
        self.link(id, &source_ids);
        tracing::trace!(?id, sources = source_ids.len(), "derived created");

        Ok(Derived {
            id,
            _marker: std::marker::PhantomData,
        })
    }

    /// Get the value of a derived, recomputing it first if any source changed
    ///
    /// Returns `None` if the derived value or one of its sources is gone.
    pub fn get_derived<T: Clone + 'static>(&self, derived: Derived<T>) -> Option<T> {
        self.read_as(ValueId::Derived(derived.id))
    }

    /// Typed read through a type-erased id
    ///
    /// Returns `None` if the value is gone or does not hold a `T`.
    pub fn read_as<T: Clone + 'static>(&self, value: ValueId) -> Option<T> {
        match value {
            ValueId::Signal(id) => self
                .signals
                .get(id)
                .and_then(|node| node.value.downcast_ref::<T>().cloned()),
            ValueId::Derived(id) => {
                self.refresh(id)?;
                let node = self.derived.get(id)?;
                let cached = node.value.borrow();
                cached.as_ref()?.downcast_ref::<T>().cloned()
            }
        }
    }

    /// Replace the sources and compute function of an existing derived value
    ///
    /// Identity and subscribers are kept. Fails without changing anything if
    /// the new sources would make the value depend on itself.
    pub fn rebind_derived<S, T, F>(&mut self, derived: Derived<T>, sources: S, compute: F) -> Result<()>
    where
        S: Sources,
        T: Clone + PartialEq + 'static,
        F: Fn(S::Values) -> T + 'static,
    {
        let id = derived.id;
        if !self.derived.contains_key(id) {
            return Err(ReactiveError::UnknownValue(ValueId::Derived(id)));
        }
        let source_ids = sources.ids();
        self.check_sources(&source_ids, Some(id))?;

        let Some(node) = self.derived.get_mut(id) else {
            return Err(ReactiveError::UnknownValue(ValueId::Derived(id)));
        };
        let previous = std::mem::replace(&mut node.sources, source_ids.clone());
        node.compute = erase_compute(sources, compute);
        self.unlink(id, &previous);
        self.link(id, &source_ids);
        tracing::debug!(?id, sources = source_ids.len(), "derived rebound");

        let rebound = ValueId::Derived(id);
        self.invalidate(&[rebound]);
        if self.batch_depth > 0 {
            self.pending.insert(rebound);
            return Ok(());
        }
        self.settle(&[rebound])
    }

    /// Remove a derived value and every subscription pointing at it
    pub fn dispose_derived<T>(&mut self, derived: Derived<T>) -> Result<()> {
        let value = ValueId::Derived(derived.id);
        let node = self
            .derived
            .get(derived.id)
            .ok_or(ReactiveError::UnknownValue(value))?;
        if !node.dependents.is_empty() {
            return Err(ReactiveError::ValueInUse(value));
        }
        if let Some(node) = self.derived.remove(derived.id) {
            self.unlink(derived.id, &node.sources);
            self.drop_subscriptions(&node.subscribers);
        }
        self.pending.shift_remove(&value);
        tracing::trace!(id = ?derived.id, "derived disposed");
        Ok(())
    }

    /// Sources of a derived value, in declaration order
    pub fn sources_of(&self, id: DerivedId) -> Option<&[ValueId]> {
        self.derived.get(id).map(|n| n.sources.as_slice())
    }

    // =========================================================================
    // SUBSCRIPTIONS
    // =========================================================================

    /// Run `callback` whenever `value` changes
    ///
    /// Re-subscribing the same callback returns the existing id.
    pub fn subscribe(&mut self, value: ValueId, callback: Subscriber) -> Result<SubscriptionId> {
        let existing = self
            .subscribers_of(value)
            .ok_or(ReactiveError::UnknownValue(value))?;
        for &sub in existing {
            if let Some(entry) = self.subscriptions.get(sub) {
                if same_callback(&entry.callback, &callback) {
                    return Ok(sub);
                }
            }
        }

        let sub = self.subscriptions.insert(SubscriptionEntry { value, callback });
        match value {
            ValueId::Signal(id) => {
                if let Some(node) = self.signals.get_mut(id) {
                    node.subscribers.push(sub);
                }
            }
            ValueId::Derived(id) => {
                let mut first = false;
                if let Some(node) = self.derived.get_mut(id) {
                    first = node.subscribers.is_empty();
                    node.subscribers.push(sub);
                }
                self.refresh(id);
                // Baseline only for the first subscriber; a change still owed to
                // existing subscribers must survive until the next settle
                if first {
                    if let Some(node) = self.derived.get(id) {
                        node.notified_revision.set(node.revision.get());
                    }
                }
            }
        }
        tracing::trace!(?value, ?sub, "subscribed");
        Ok(sub)
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, subscription: SubscriptionId) -> bool {
        let Some(entry) = self.subscriptions.remove(subscription) else {
            return false;
        };
        match entry.value {
            ValueId::Signal(id) => {
                if let Some(node) = self.signals.get_mut(id) {
                    node.subscribers.retain(|s| *s != subscription);
                }
            }
            ValueId::Derived(id) => {
                if let Some(node) = self.derived.get_mut(id) {
                    node.subscribers.retain(|s| *s != subscription);
                }
            }
        }
        tracing::trace!(value = ?entry.value, ?subscription, "unsubscribed");
        true
    }

    /// Number of live subscriptions on a value
    pub fn subscriber_count(&self, value: ValueId) -> usize {
        self.subscribers_of(value).map_or(0, |subs| subs.len())
    }

    // =========================================================================
    // BATCHING
    // =========================================================================

    /// Run `f` with notification deferred until the outermost batch ends
    ///
    /// Every write inside the batch is applied before any subscriber runs.
    pub fn batch<F, R>(&mut self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Self) -> R,
    {
        self.batch_depth += 1;
        let result = {
            let mut scope = BatchScope { graph: self };
            f(&mut *scope.graph)
        };

        if self.batch_depth == 0 && !self.pending.is_empty() {
            let changed: Vec<ValueId> = self.pending.drain(..).collect();
            tracing::trace!(changed = changed.len(), "batch settled");
            self.settle(&changed)?;
        }
        Ok(result)
    }

    // =========================================================================
    // INTERNAL
    // =========================================================================

    fn subscribers_of(&self, value: ValueId) -> Option<&SmallVec<[SubscriptionId; 4]>> {
        match value {
            ValueId::Signal(id) => self.signals.get(id).map(|n| &n.subscribers),
            ValueId::Derived(id) => self.derived.get(id).map(|n| &n.subscribers),
        }
    }

    fn drop_subscriptions(&mut self, subs: &[SubscriptionId]) {
        for &sub in subs {
            self.subscriptions.remove(sub);
        }
    }

    /// Recompute a derived value if it is dirty
    fn refresh(&self, id: DerivedId) -> Option<()> {
        let node = self.derived.get(id)?;
        if !node.dirty.get() && node.value.borrow().is_some() {
            return Some(());
        }
        if node.computing.get() {
            // Sources are cycle-checked, so this only trips on a broken graph
            tracing::warn!(?id, "derived value read during its own computation");
            return None;
        }

        node.computing.set(true);
        let compute = Rc::clone(&node.compute);
        let next = compute(self);
        node.computing.set(false);
        let next = next?;

        let mut cached = node.value.borrow_mut();
        let changed = match cached.as_deref() {
            Some(previous) => !(node.same)(previous, &*next),
            None => true,
        };
        *cached = Some(next);
        node.dirty.set(false);
        if changed {
            node.revision.set(node.revision.get() + 1);
        }
        Some(())
    }

    /// Mark every derived value downstream of `roots` dirty
    fn invalidate(&mut self, roots: &[ValueId]) {
        for id in self.downstream(roots) {
            if let Some(node) = self.derived.get(id) {
                node.dirty.set(true);
            }
        }
    }

    /// Notify subscribers of the changed roots, then of every downstream
    /// derived value whose result actually changed
    ///
    /// Roots cut off by the depth limit (or by a panicking batch) are kept in
    /// `pending` and settled by the next outermost settle.
    fn settle(&mut self, roots: &[ValueId]) -> Result<()> {
        if self.notify_depth >= self.config.max_notify_depth {
            tracing::warn!(depth = self.notify_depth, "notification depth exceeded");
            self.pending.extend(roots.iter().copied());
            return Err(ReactiveError::NotifyDepthExceeded(self.notify_depth));
        }

        let mut roots = roots.to_vec();
        if self.notify_depth == 0 && !self.pending.is_empty() {
            let mut all: IndexSet<ValueId> = self.pending.drain(..).collect();
            tracing::debug!(deferred = all.len(), "settling deferred values");
            all.extend(roots);
            roots = all.into_iter().collect();
        }
        self.notify_depth += 1;

        for &root in &roots {
            if let ValueId::Signal(_) = root {
                self.notify(root);
            }
        }

        for id in self.downstream(&roots) {
            let Some(node) = self.derived.get(id) else {
                continue;
            };
            if node.subscribers.is_empty() || self.refresh(id).is_none() {
                continue;
            }
            let revision = node.revision.get();
            if revision == node.notified_revision.get() {
                continue;
            }
            node.notified_revision.set(revision);
            self.notify(ValueId::Derived(id));
        }

        self.notify_depth -= 1;
        Ok(())
    }

    /// Invoke the subscribers of one value
    fn notify(&mut self, value: ValueId) {
        // Snapshot: callbacks may subscribe or unsubscribe while we iterate
        let subs = match self.subscribers_of(value) {
            Some(subs) if !subs.is_empty() => subs.clone(),
            _ => return,
        };

        self.notifying.push(value);
        for sub in subs {
            let Some(callback) = self.subscriptions.get(sub).map(|e| Rc::clone(&e.callback)) else {
                continue;
            };
            callback(self);
        }
        self.notifying.pop();
    }

    fn check_reentrant(&self, written: ValueId) -> Result<()> {
        for &notifying in &self.notifying {
            if self.depends_on(notifying, written) {
                tracing::warn!(?written, ?notifying, "rejected re-entrant write");
                return Err(ReactiveError::ReentrantWrite { written, notifying });
            }
        }
        Ok(())
    }

    fn check_sources(&self, sources: &[ValueId], target: Option<DerivedId>) -> Result<()> {
        for &source in sources {
            if !self.contains(source) {
                return Err(ReactiveError::UnknownValue(source));
            }
            if let Some(target) = target {
                let target = ValueId::Derived(target);
                if self.depends_on(source, target) {
                    tracing::warn!(?target, ?source, "rejected cyclic dependency");
                    return Err(ReactiveError::CyclicDependency(target));
                }
            }
        }
        Ok(())
    }

    /// Whether `value` is `target` or reads it, directly or transitively
    fn depends_on(&self, value: ValueId, target: ValueId) -> bool {
        let mut stack: SmallVec<[ValueId; 8]> = SmallVec::new();
        let mut visited = FxHashSet::default();
        stack.push(value);

        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if let ValueId::Derived(id) = current {
                if visited.insert(id) {
                    if let Some(node) = self.derived.get(id) {
                        stack.extend(node.sources.iter().copied());
                    }
                }
            }
        }
        false
    }

    /// Derived values downstream of `roots` (derived roots included), sources
    /// before the values reading them
    fn downstream(&self, roots: &[ValueId]) -> Vec<DerivedId> {
        let mut starts: SmallVec<[DerivedId; 8]> = SmallVec::new();
        for &root in roots {
            match root {
                ValueId::Signal(id) => {
                    if let Some(node) = self.signals.get(id) {
                        starts.extend(node.dependents.iter().copied());
                    }
                }
                ValueId::Derived(id) => starts.push(id),
            }
        }

        // Iterative postorder: (node, index of the next dependent to visit)
        let mut visited = FxHashSet::default();
        let mut order = Vec::new();
        let mut stack: Vec<(DerivedId, usize)> = Vec::new();
        for start in starts {
            if !visited.insert(start) {
                continue;
            }
            stack.push((start, 0));
            while let Some(frame) = stack.last_mut() {
                let (id, next) = *frame;
                let dependent = self
                    .derived
                    .get(id)
                    .and_then(|node| node.dependents.get(next).copied());
                match dependent {
                    Some(dependent) => {
                        frame.1 += 1;
                        if visited.insert(dependent) {
                            stack.push((dependent, 0));
                        }
                    }
                    None => {
                        order.push(id);
                        stack.pop();
                    }
                }
            }
        }
        order.reverse();
        order
    }

    fn link(&mut self, id: DerivedId, sources: &[ValueId]) {
        for &source in sources {
            let dependents = match source {
                ValueId::Signal(s) => self.signals.get_mut(s).map(|n| &mut n.dependents),
                ValueId::Derived(d) => self.derived.get_mut(d).map(|n| &mut n.dependents),
            };
            if let Some(dependents) = dependents {
                if !dependents.contains(&id) {
                    dependents.push(id);
                }
            }
        }
    }

    fn unlink(&mut self, id: DerivedId, sources: &[ValueId]) {
        for &source in sources {
            let dependents = match source {
                ValueId::Signal(s) => self.signals.get_mut(s).map(|n| &mut n.dependents),
                ValueId::Derived(d) => self.derived.get_mut(d).map(|n| &mut n.dependents),
            };
            if let Some(dependents) = dependents {
                dependents.retain(|d| *d != id);
            }
        }
    }

    /// Get statistics about the reactive graph
    pub fn stats(&self) -> ReactiveStats {
        ReactiveStats {
            signal_count: self.signals.len(),
            derived_count: self.derived.len(),
            subscription_count: self.subscriptions.len(),
            global_version: self.global_version,
        }
    }
}

/// Closes a batch level even if the batch body panics
struct BatchScope<'a> {
    graph: &'a mut ReactiveGraph,
}

impl Drop for BatchScope<'_> {
    fn drop(&mut self) {
        self.graph.batch_depth -= 1;
    }
}

impl Default for ReactiveGraph {
    fn default() -> Self {
        Self::new()
    }
}

fn erase_compute<S, T, F>(sources: S, compute: F) -> ComputeFn
where
    S: Sources,
    T: 'static,
    F: Fn(S::Values) -> T + 'static,
{
    Rc::new(move |graph: &ReactiveGraph| {
        let values = sources.read(graph)?;
        Some(Box::new(compute(values)) as Box<dyn Any>)
    })
}

fn same_value<T: PartialEq + 'static>(a: &dyn Any, b: &dyn Any) -> bool {
    match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn same_callback(a: &Subscriber, b: &Subscriber) -> bool {
    std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}

/// Statistics about the reactive graph
#[derive(Debug, Clone)]
pub struct ReactiveStats {
    pub signal_count: usize,
    pub derived_count: usize,
    pub subscription_count: usize,
    pub global_version: u64,
}
