//! # weft
//!
//! Fine-grained reactive state and template binding for Rust.
//!
//! State lives in reactive containers, refs, and computeds; templates
//! bind a mutable node tree to that state through directives. There is
//! no virtual tree: every binding owns one effect that patches exactly
//! the node it renders, and mutations batch through a scheduler that
//! flushes effects once per tick in creation order.
//!
//! ## Architecture
//!
//! ```text
//! Reactive / Ref / Computed → Dep → Scheduler queue → flush → effects patch nodes
//! ```
//!
//! ## Modules
//!
//! - [`value`] - The dynamic value model shared by state and templates
//! - [`reactive`] - Deps, effects, scheduler, containers, refs, scopes
//! - [`eval`] - Sandboxed template expression evaluation
//! - [`dom`] - Arena-backed mutable node tree
//! - [`template`] - Directive compiler and renderers

pub mod dom;
pub mod eval;
pub mod reactive;
pub mod template;
pub mod value;

// Re-export commonly used items
pub use value::Value;

pub use reactive::{
    Computed, Dep, Effect, Key, Reactive, Ref, RefError, Runtime, Scope, reactive,
};

pub use eval::{Binding, Bindings, ExprCache, assign, evaluate};

pub use dom::{Document, DomError, Event, ListenerId, Node, NodeId};

pub use template::mount;
