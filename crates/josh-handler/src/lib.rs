//! `josh-handler` — the handler registry and expression evaluation seam.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                   |
//! |----------------|--------------------------------------------------------------|
//! | [`expression`] | `Expression` trait — the external DSL's evaluation interface |
//! | [`scope`]      | `Scope` trait — how expressions read attribute state          |
//! | [`handler`]    | `Handler`, `HandlerGroup`, `HandlerRegistry`                   |
//! | [`error`]      | `HandlerError`, `HandlerResult`                                |
//!
//! # Design notes
//!
//! This crate defines the traits the resolver and scheduler depend on
//! (`Expression`, `Scope`) without implementing either concretely — the
//! expression tree comes from an external DSL front-end, and `Scope` is
//! implemented by `josh-resolver` over its shadowing entity. Keeping both
//! traits here, one layer below the resolver, avoids a dependency cycle
//! between "the thing that evaluates" and "the thing that resolves in what
//! order".

pub mod error;
pub mod expression;
pub mod handler;
pub mod scope;

#[cfg(test)]
mod tests;

pub use error::{HandlerError, HandlerResult};
pub use expression::{AttributeRefExpression, ConstantExpression, Expression};
pub use handler::{Handler, HandlerGroup, HandlerRegistry};
pub use scope::Scope;
