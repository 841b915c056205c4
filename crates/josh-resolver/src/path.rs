//! `PathForm` — the parsed shape of a dotted attribute path as seen by
//! expressions, e.g. `prior.mass` or `here.Tree.count`.
//!
//! Parsing happens once per expression node at program-load time; the
//! resulting `PathForm` is cached on the node so evaluation never re-parses
//! or re-looks-up a name by string.

use josh_core::AttributeIndex;

use crate::error::{ResolveError, ResolveResult};

/// One of the path forms a handler expression may reference.
///
/// `This`, `Prior`, and `Current` resolve against the entity's own
/// descriptor and therefore carry a concrete [`AttributeIndex`]. The
/// remaining forms name another entity type or collection by its program
/// identifier — resolving those to an index requires that other type's
/// descriptor, which is not available at this parse site, so they stay
/// string-keyed until the expression tree is bound to a world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathForm {
    /// `attr` — this entity, this substep.
    This(AttributeIndex),
    /// `prior.attr` — this entity, previous substep's frozen value.
    Prior(AttributeIndex),
    /// `current.attr` — this entity, this substep (same as `This`).
    Current(AttributeIndex),
    /// `here.attr` — the patch containing this entity.
    Here(String),
    /// `here.Coll.attr` — every entity of collection `Coll` on this patch.
    HereCollection(String, String),
    /// `meta.attr` — the singleton Simulation entity.
    Meta(String),
    /// `Kind.attr` — every entity of `Kind` currently in scope.
    Kind(String, String),
}

/// Parse a dotted path against `descriptor`, the entity type the
/// expression is being compiled for.
///
/// `descriptor` only resolves the this-entity forms (`attr`, `prior.attr`,
/// `current.attr`); the other forms are returned with their segments intact
/// for the caller to bind against the relevant type later.
pub fn parse(path: &str, descriptor: &josh_entity::EntityType) -> ResolveResult<PathForm> {
    let segments: Vec<&str> = path.split('.').collect();
    match segments.as_slice() {
        [attr] => resolve_this(attr, descriptor).map(PathForm::This),
        ["prior", attr] => resolve_this(attr, descriptor).map(PathForm::Prior),
        ["current", attr] => resolve_this(attr, descriptor).map(PathForm::Current),
        ["here", attr] => Ok(PathForm::Here((*attr).to_string())),
        ["here", coll, attr] => Ok(PathForm::HereCollection((*coll).to_string(), (*attr).to_string())),
        ["meta", attr] => Ok(PathForm::Meta((*attr).to_string())),
        [kind, attr] => Ok(PathForm::Kind((*kind).to_string(), (*attr).to_string())),
        _ => Err(ResolveError::InvalidPath(path.to_string())),
    }
}

fn resolve_this(attr: &str, descriptor: &josh_entity::EntityType) -> ResolveResult<AttributeIndex> {
    descriptor
        .attribute_index(attr)
        .ok_or_else(|| ResolveError::InvalidPath(attr.to_string()))
}
