use std::collections::HashMap;

use josh_core::AttributeIndex;
use josh_units::Units;
use josh_value::Value;

use crate::error::{HandlerError, HandlerResult};
use crate::expression::{ConstantExpression, Expression};
use crate::handler::{Handler, HandlerGroup, HandlerRegistry};
use crate::scope::Scope;

/// A scope backed by a plain map, standing in for `josh-resolver`'s
/// `ShadowingEntity` in these unit tests.
struct MockScope {
    names: HashMap<&'static str, AttributeIndex>,
    current: HashMap<AttributeIndex, Value>,
    prior: HashMap<AttributeIndex, Value>,
}

impl Scope for MockScope {
    fn current(&self, attribute: AttributeIndex) -> HandlerResult<Value> {
        self.current
            .get(&attribute)
            .cloned()
            .ok_or(HandlerError::UnknownAttribute(attribute))
    }

    fn prior(&self, attribute: AttributeIndex) -> HandlerResult<Value> {
        self.prior
            .get(&attribute)
            .cloned()
            .ok_or(HandlerError::UnknownAttribute(attribute))
    }

    fn attribute_index(&self, name: &str) -> Option<AttributeIndex> {
        self.names.get(name).copied()
    }
}

fn scope_with(attr: AttributeIndex, current: Value) -> MockScope {
    let mut names = HashMap::new();
    names.insert("x", attr);
    let mut current_map = HashMap::new();
    current_map.insert(attr, current);
    MockScope { names, current: current_map, prior: HashMap::new() }
}

#[test]
fn unconditional_handler_always_matches() {
    let attr = AttributeIndex(0);
    let scope = scope_with(attr, Value::Int64(1, Units::unitless()));
    let mut group = HandlerGroup::new();
    group.push(Handler::unconditional(Box::new(ConstantExpression(Value::Int64(42, Units::unitless())))));

    let resolved = group.resolve(&scope).unwrap();
    assert_eq!(resolved, Some(Value::Int64(42, Units::unitless())));
}

#[test]
fn conditional_handler_falls_through_to_next() {
    let attr = AttributeIndex(0);
    let scope = scope_with(attr, Value::Bool(false));
    let mut group = HandlerGroup::new();
    group.push(Handler::conditional(
        Box::new(ConstantExpression(Value::Bool(false))),
        Box::new(ConstantExpression(Value::Int64(1, Units::unitless()))),
    ));
    group.push(Handler::unconditional(Box::new(ConstantExpression(Value::Int64(2, Units::unitless())))));

    let resolved = group.resolve(&scope).unwrap();
    assert_eq!(resolved, Some(Value::Int64(2, Units::unitless())));
}

#[test]
fn empty_group_resolves_to_none() {
    let attr = AttributeIndex(0);
    let scope = scope_with(attr, Value::Int64(1, Units::unitless()));
    let group = HandlerGroup::new();
    assert_eq!(group.resolve(&scope).unwrap(), None);
}

#[test]
fn registry_assigns_sequential_ids() {
    let mut registry = HandlerRegistry::new();
    let id0 = registry.insert(HandlerGroup::new());
    let id1 = registry.insert(HandlerGroup::new());
    assert_ne!(id0, id1);
    assert_eq!(registry.len(), 2);
}

#[test]
fn attribute_ref_expression_reads_through_scope() {
    let attr = AttributeIndex(0);
    let scope = scope_with(attr, Value::Int64(7, Units::unitless()));
    let expr = crate::expression::AttributeRefExpression("x".to_string());
    let result = expr.evaluate(&scope).unwrap();
    assert_eq!(result, Value::Int64(7, Units::unitless()));
}
