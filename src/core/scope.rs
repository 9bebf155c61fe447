//! Access scopes: the unit of exclusivity between isolation sessions.

use crate::core::error::CloisterError;
use crate::core::store::{ScopedEntity, Store};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// An immutable (store, claim) pair identifying one claimable unit of
/// exclusive access.
///
/// Equality and hashing cover the store identity, the claim's entity-type tag
/// and its scoped name: two scopes built from distinct claim objects with the
/// same tag and name under the same store are the same scope for
/// conflict-detection purposes.
#[derive(Debug, Clone)]
pub struct AccessScope {
    store: Arc<Store>,
    entity_type: &'static str,
    scoped_name: String,
}

impl AccessScope {
    /// Build a scope targeting `claim` inside `store`.
    ///
    /// Fails with a definition error when the store is unscoped, when the
    /// claim's entity type does not match the store's declared type, or when
    /// the claim's scoped name is empty. These are caller bugs, not runtime
    /// races.
    pub fn new(store: &Arc<Store>, claim: &dyn ScopedEntity) -> Result<AccessScope, CloisterError> {
        if !store.kind().is_scoped() {
            return Err(CloisterError::ScopeDefinition(
                "cannot create an access scope targeting a non-scoped store".to_string(),
            ));
        }

        // Scoped stores always declare an entity type.
        let declared = store.entity_type().unwrap_or_default();
        if claim.entity_type() != declared {
            return Err(CloisterError::ScopeDefinition(format!(
                "cannot create an access scope using a non compatible scoped entity type on '{}' store (got '{}', expected '{}')",
                store.name(),
                claim.entity_type(),
                declared
            )));
        }

        let scoped_name = claim.scoped_name();
        if scoped_name.is_empty() {
            return Err(CloisterError::ScopeDefinition(
                "the claim's scoped name cannot be empty".to_string(),
            ));
        }

        Ok(AccessScope {
            store: store.clone(),
            entity_type: claim.entity_type(),
            scoped_name,
        })
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn entity_type(&self) -> &'static str {
        self.entity_type
    }

    pub fn scoped_name(&self) -> &str {
        &self.scoped_name
    }
}

/// A scope stands in for its own claim during path resolution, so entity-keyed
/// resolver calls accept it directly.
impl ScopedEntity for AccessScope {
    fn scoped_name(&self) -> String {
        self.scoped_name.clone()
    }

    fn entity_type(&self) -> &'static str {
        self.entity_type
    }
}

impl PartialEq for AccessScope {
    fn eq(&self, other: &AccessScope) -> bool {
        Arc::ptr_eq(&self.store, &other.store)
            && self.entity_type == other.entity_type
            && self.scoped_name == other.scoped_name
    }
}

impl Eq for AccessScope {}

impl Hash for AccessScope {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.store) as usize).hash(state);
        self.entity_type.hash(state);
        self.scoped_name.hash(state);
    }
}

impl fmt::Display for AccessScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scope '{}:{}'",
            self.store.name(),
            self.scoped_name
        )
    }
}
