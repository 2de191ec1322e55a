//! Dependency tokens for reactive invalidation.
//!
//! Every read operation maps to one or more tokens describing what it
//! observed; every write maps to the token set a read of the same object
//! or namespace would have produced. A live query is re-run when a write
//! batch touches any token it recorded on its last run.

use crate::operation::Operation;
use std::collections::HashSet;

/// An opaque key identifying a unit of observable store state.
///
/// Tokens are derived, never stored persistently. The four shapes are:
/// - `ns/id/value` - this exact object's value
/// - `ns/id/key` - this exact object's existence
/// - `ns/keys` - the namespace's id set
/// - `ns/values` - the namespace's value set
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyToken(String);

impl DependencyToken {
    /// Token for a single object's value.
    pub fn object_value(namespace: &str, id: &str) -> Self {
        Self(format!("{namespace}/{id}/value"))
    }

    /// Token for a single object's existence.
    pub fn object_key(namespace: &str, id: &str) -> Self {
        Self(format!("{namespace}/{id}/key"))
    }

    /// Token for a namespace's id set.
    pub fn namespace_keys(namespace: &str) -> Self {
        Self(format!("{namespace}/keys"))
    }

    /// Token for a namespace's value set.
    pub fn namespace_values(namespace: &str) -> Self {
        Self(format!("{namespace}/values"))
    }

    /// The token's string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Maps operations to the dependency tokens they touch.
///
/// Reads produce the tokens they observed; writes produce the tokens a
/// read of the same object or namespace would have produced, so a write
/// batch can be intersected with recorded read dependencies.
pub fn operations_to_dependencies<'a, I>(operations: I) -> HashSet<DependencyToken>
where
    I: IntoIterator<Item = &'a Operation>,
{
    let mut dependencies = HashSet::new();

    for operation in operations {
        match operation {
            Operation::Put { namespace, id, .. } | Operation::Update { namespace, id, .. } => {
                dependencies.insert(DependencyToken::object_value(namespace, id));
                dependencies.insert(DependencyToken::namespace_values(namespace));
                dependencies.insert(DependencyToken::namespace_keys(namespace));
            }
            Operation::Delete { namespace, id, .. } => {
                dependencies.insert(DependencyToken::object_value(namespace, id));
                dependencies.insert(DependencyToken::object_key(namespace, id));
                dependencies.insert(DependencyToken::namespace_values(namespace));
                dependencies.insert(DependencyToken::namespace_keys(namespace));
            }
            Operation::Get { namespace, id } => {
                dependencies.insert(DependencyToken::object_value(namespace, id));
                dependencies.insert(DependencyToken::object_key(namespace, id));
            }
            Operation::GetAll { namespace } => {
                dependencies.insert(DependencyToken::namespace_values(namespace));
                dependencies.insert(DependencyToken::namespace_keys(namespace));
            }
            Operation::GetAllKeys { namespace } => {
                dependencies.insert(DependencyToken::namespace_keys(namespace));
            }
        }
    }

    dependencies
}
