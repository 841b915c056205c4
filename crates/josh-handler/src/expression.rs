//! The `Expression` trait — the seam between this engine and the (external,
//! out of scope here) DSL front-end that parses handler bodies and
//! conditions into expression trees.
//!
//! This crate only calls [`Expression::evaluate`]; it never constructs or
//! inspects concrete expression nodes. A front-end (lexer/parser/AST — see
//! the workspace's non-goals) builds a tree of `Box<dyn Expression>` once
//! per program load and hands it to a [`crate::handler::Handler`].

use josh_value::Value;

use crate::error::HandlerResult;
use crate::scope::Scope;

/// One evaluable node in an externally supplied expression tree.
pub trait Expression: Send + Sync {
    /// Evaluate this node against `scope`, returning the resulting value.
    ///
    /// Implementations are free to call `scope.current`/`scope.prior` any
    /// number of times; the resolver, not this trait, is responsible for
    /// memoizing repeated reads of the same attribute within one evaluation.
    fn evaluate(&self, scope: &dyn Scope) -> HandlerResult<Value>;
}

/// An `Expression` that always evaluates to a fixed value — the simplest
/// possible handler body, and a convenient building block for tests.
pub struct ConstantExpression(pub Value);

impl Expression for ConstantExpression {
    fn evaluate(&self, _scope: &dyn Scope) -> HandlerResult<Value> {
        Ok(self.0.clone())
    }
}

/// An `Expression` that reads another attribute's current value by name.
pub struct AttributeRefExpression(pub String);

impl Expression for AttributeRefExpression {
    fn evaluate(&self, scope: &dyn Scope) -> HandlerResult<Value> {
        let index = scope
            .attribute_index(&self.0)
            .ok_or_else(|| crate::error::HandlerError::Config(format!("no such attribute {:?}", self.0)))?;
        scope.current(index)
    }
}
