//! Reactive graph error types

use thiserror::Error;

use crate::value::ValueId;

/// Errors raised by the reactive graph
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReactiveError {
    /// A derived value would (transitively) read from itself
    #[error("cyclic dependency: {0:?} would depend on itself")]
    CyclicDependency(ValueId),

    /// A subscriber tried to write a signal whose notification is still running
    #[error("re-entrant write to {written:?} while notifying {notifying:?}")]
    ReentrantWrite {
        written: ValueId,
        notifying: ValueId,
    },

    /// The value was disposed or belongs to another graph
    #[error("unknown value {0:?}")]
    UnknownValue(ValueId),

    /// The value still feeds at least one derived value
    #[error("{0:?} is still a source of another derived value")]
    ValueInUse(ValueId),

    /// Write -> notify -> write chains nested deeper than the configured limit
    #[error("notification depth exceeded ({0})")]
    NotifyDepthExceeded(u32),

    /// A configuration string could not be parsed
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type for reactive graph operations
pub type Result<T> = std::result::Result<T, ReactiveError>;
