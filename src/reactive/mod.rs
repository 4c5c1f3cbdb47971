//! Reactivity core: dependency tracking, effect scheduling, deep container
//! observation, single-value cells, and disposal scopes.
//!
//! - [`runtime`] - explicit tracking context (no process-wide globals)
//! - [`dep`] - per-slot subscriber sets
//! - [`effect`] - re-runnable computations with tracked dependencies
//! - [`container`] - tagged reactive list/map capability set
//! - [`cell`] - strict [`Ref`] and memoized [`Computed`]
//! - [`scope`] - recursive disposal units

pub mod cell;
pub mod container;
pub mod dep;
pub mod effect;
pub mod runtime;
mod scheduler;
pub mod scope;

pub use cell::{Computed, Ref, RefError};
pub use container::{Key, Reactive, reactive};
pub use dep::Dep;
pub use effect::Effect;
pub use runtime::Runtime;
pub use scope::Scope;
