//! `Handler`, `HandlerGroup`, and the registry that owns them.
//!
//! # Resolution order
//!
//! A [`HandlerGroup`] holds the handlers that may resolve one attribute, in
//! the order the program declared them. Resolving the attribute means
//! trying each handler's `condition` in turn; the first one that evaluates
//! to `true` (or has no condition at all) supplies the value via its `body`.
//! A group with no matching handler and no unconditional fallback leaves the
//! attribute unresolved for this substep — `josh-resolver` treats that as
//! "keep the prior value".

use josh_core::HandlerGroupId;
use josh_value::Value;

use crate::error::HandlerResult;
use crate::expression::Expression;
use crate::scope::Scope;

/// One conditional handler: an optional guard and a body expression.
pub struct Handler {
    pub condition: Option<Box<dyn Expression>>,
    pub body: Box<dyn Expression>,
}

impl Handler {
    pub fn unconditional(body: Box<dyn Expression>) -> Self {
        Self { condition: None, body }
    }

    pub fn conditional(condition: Box<dyn Expression>, body: Box<dyn Expression>) -> Self {
        Self { condition: Some(condition), body }
    }

    /// `true` if this handler's condition holds (or it has none).
    fn matches(&self, scope: &dyn Scope) -> HandlerResult<bool> {
        match &self.condition {
            None => Ok(true),
            Some(cond) => match cond.evaluate(scope)? {
                Value::Bool(b) => Ok(b),
                other => Ok(other.as_f64().map(|v| v != 0.0).unwrap_or(false)),
            },
        }
    }
}

/// All the handlers that may resolve one attribute, tried in declaration
/// order.
#[derive(Default)]
pub struct HandlerGroup {
    handlers: Vec<Handler>,
}

impl HandlerGroup {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    pub fn push(&mut self, handler: Handler) {
        self.handlers.push(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Evaluate handlers in order, returning the first match's value.
    /// Returns `Ok(None)` if no handler matched — the caller falls back to
    /// the prior value in that case.
    pub fn resolve(&self, scope: &dyn Scope) -> HandlerResult<Option<Value>> {
        for handler in &self.handlers {
            if handler.matches(scope)? {
                return Ok(Some(handler.body.evaluate(scope)?));
            }
        }
        Ok(None)
    }
}

/// Owns every [`HandlerGroup`] in a loaded program, addressed by
/// [`HandlerGroupId`].
#[derive(Default)]
pub struct HandlerRegistry {
    groups: Vec<HandlerGroup>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self { groups: Vec::new() }
    }

    /// Register a new handler group, returning the id it was assigned.
    pub fn insert(&mut self, group: HandlerGroup) -> HandlerGroupId {
        let id = HandlerGroupId(self.groups.len() as u32);
        self.groups.push(group);
        id
    }

    pub fn get(&self, id: HandlerGroupId) -> &HandlerGroup {
        &self.groups[id.index()]
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
