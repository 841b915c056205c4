//! Read-only view of entity state passed to every expression evaluation.

use josh_core::AttributeIndex;
use josh_value::Value;

use crate::error::HandlerResult;

/// The interface an [`crate::expression::Expression`] uses to read attribute
/// values while it is being evaluated.
///
/// `josh-resolver` implements `Scope` over a `ShadowingEntity`: resolving an
/// attribute that has not yet been computed this substep recurses back into
/// the resolver (`current`), while `prior` always returns last substep's
/// frozen value without triggering resolution — this is what lets handler
/// expressions break circular references deterministically.
pub trait Scope {
    /// Resolve `attribute` for the substep in progress, computing it via its
    /// handler group if it has not been resolved yet. May recurse through
    /// other attributes' handlers; implementations must detect cycles.
    fn current(&self, attribute: AttributeIndex) -> HandlerResult<Value>;

    /// The frozen value of `attribute` from the previous substep. Never
    /// triggers resolution and never recurses.
    fn prior(&self, attribute: AttributeIndex) -> HandlerResult<Value>;

    /// Look up an attribute index by name on the entity type this scope is
    /// evaluating. Expressions resolve names to indices once (see
    /// `josh-resolver`'s path-form cache) rather than on every evaluation.
    fn attribute_index(&self, name: &str) -> Option<AttributeIndex>;

    /// `here.attr` — the named attribute of the patch containing this
    /// entity, read from its last completed timestep. Scopes with no
    /// notion of a surrounding world (e.g. single-entity-type tests)
    /// return the default error.
    fn here(&self, attribute: &str) -> HandlerResult<Value> {
        let _ = attribute;
        Err(crate::error::HandlerError::Config("here.* is not available in this scope".into()))
    }

    /// `here.Coll.attr` — the named attribute of every entity of collection
    /// `Coll` on this entity's patch, broadcast as a `Distribution`.
    fn here_collection(&self, collection: &str, attribute: &str) -> HandlerResult<Value> {
        let _ = (collection, attribute);
        Err(crate::error::HandlerError::Config("here.Coll.* is not available in this scope".into()))
    }

    /// `meta.attr` — the named attribute of the singleton Simulation entity.
    fn meta(&self, attribute: &str) -> HandlerResult<Value> {
        let _ = attribute;
        Err(crate::error::HandlerError::Config("meta.* is not available in this scope".into()))
    }

    /// `Kind.attr` — the named attribute of every entity of type `Kind`
    /// currently in scope, broadcast as a `Distribution`.
    fn kind(&self, kind: &str, attribute: &str) -> HandlerResult<Value> {
        let _ = (kind, attribute);
        Err(crate::error::HandlerError::Config("Kind.* is not available in this scope".into()))
    }
}
