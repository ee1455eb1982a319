//! Skein Canvas
//!
//! Binds declarative node trees to a canvas surface so the canvas redraws
//! whenever any value the tree reads changes.
//!
//! - **Tree**: nodes with named props that are literals, values, lists or structs
//! - **Discovery**: collects every value reachable from a tree's props
//! - **Surface**: schedules redraws for registered values
//! - **Dependency manager**: per-canvas lifecycle of visit, subscribe and unsubscribe
//!
//! # Example
//!
//! ```rust
//! use skein_canvas::{node, DependencyManager, RedrawSurface};
//! use skein_core::ReactiveGraph;
//! use std::rc::Rc;
//!
//! let mut graph = ReactiveGraph::new();
//! let x = graph.create_signal(0.0f32);
//! let width = graph.create_derived((x,), |(x,)| x * 2.0).unwrap();
//!
//! let tree = node("rect").prop("x", x).prop("width", width).prop("height", 40.0f32);
//!
//! let surface = Rc::new(RedrawSurface::new());
//! let mut manager = DependencyManager::with_surface(surface.clone());
//! manager.render(&mut graph, &tree).unwrap();
//!
//! graph.set(x, 10.0).unwrap();
//! assert!(surface.take_redraw());
//!
//! manager.unsubscribe(&mut graph);
//! ```

pub mod dependency;
pub mod discovery;
pub mod error;
pub mod surface;
pub mod tree;

pub use dependency::{DependencyManager, ManagerState};
pub use discovery::{discover, discover_prop, DependencySet};
pub use error::{CanvasError, Result};
pub use surface::{CanvasSurface, InvalidateCallback, RedrawSurface, Unregister};
pub use tree::{node, Literal, Node, Prop};
