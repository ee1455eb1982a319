//! Skein Core
//!
//! The reactive value engine behind Skein canvases:
//!
//! - **Signals**: mutable value cells that notify subscribers synchronously
//! - **Derived Values**: memoized pure computations over ordered source lists
//! - **Subscriptions**: identity-keyed change callbacks with idempotent
//!   subscribe/unsubscribe
//! - **Batching**: several writes settle before anyone observes them
//!
//! # Example
//!
//! ```rust
//! use skein_core::reactive::{subscriber, ReactiveGraph};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let mut graph = ReactiveGraph::new();
//!
//! // Create a signal
//! let x = graph.create_signal(0.0f32);
//!
//! // Create a derived value
//! let scaled = graph.create_derived((x,), |(x,)| x * 400.0).unwrap();
//!
//! // Observe it
//! let redraws = Rc::new(Cell::new(0));
//! let counter = redraws.clone();
//! graph
//!     .subscribe(scaled.into(), subscriber(move |_| counter.set(counter.get() + 1)))
//!     .unwrap();
//!
//! // Update the signal
//! graph.set(x, 0.5).unwrap();
//! assert_eq!(graph.get_derived(scaled), Some(200.0));
//! assert_eq!(redraws.get(), 1);
//! ```

pub mod config;
pub mod error;
pub mod reactive;
pub mod value;

pub use config::ReactiveConfig;
pub use error::{ReactiveError, Result};
pub use reactive::{
    subscriber, Derived, DerivedId, ReactiveGraph, ReactiveStats, Signal, SignalId, Subscriber,
    SubscriptionId,
};
pub use value::{Observable, Sources, ValueId};
