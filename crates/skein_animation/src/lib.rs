//! Skein Animation
//!
//! Drivers that feed the reactive graph from outside:
//!
//! - **Frame Clock**: a signal of elapsed milliseconds, ticked once per frame
//! - **Value Effects**: callbacks that turn one value's changes into writes
//! - **Interpolation**: `mix` and the [`Interpolate`] trait for scalars,
//!   points and colors

pub mod clock;
pub mod effect;
pub mod interpolate;

pub use clock::{ClockConfig, FrameClock};
pub use effect::value_effect;
pub use interpolate::{mix, Interpolate};
