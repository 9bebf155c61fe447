//! Store model: named, policy-governed subtrees of a library root.
//!
//! A [`Store`] declares the on-disk directory name and the structure expected
//! inside it. Scoped stores sub-divide their content per entity and carry the
//! entity-type tag used to type-check claims; identity is reference identity,
//! so stores are handled as `Arc<Store>` and the registry compares allocations.

use std::sync::Arc;

/// An entity that can be used as a claim target inside a scoped [`Store`].
pub trait ScopedEntity {
    /// Stable name used as the on-disk path segment for this entity. In most
    /// cases this is the identifier of the domain object.
    fn scoped_name(&self) -> String;

    /// Tag identifying the claim kind, compared by value against the store's
    /// declared entity type.
    fn entity_type(&self) -> &'static str;
}

/// Structural kind of a [`Store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// Freeform content without a declared structure.
    Unscoped,
    /// One subdirectory per entity, named by its scoped name.
    DirectoryPerEntity,
    /// One file per entity, named `<scoped-name>.<extension>`.
    FilePerEntity,
}

impl StoreKind {
    pub fn is_scoped(self) -> bool {
        !matches!(self, StoreKind::Unscoped)
    }
}

/// Merge strategy bound to a [`Store`] at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorePolicy {
    /// Usable only outside isolation sessions.
    Private,
    /// Isolated content overlays shared content on commit; shared paths absent
    /// from the isolation survive untouched.
    Overwrite,
    /// Isolated content entirely replaces shared content on commit, including
    /// removal of shared paths the isolation never touched.
    FullSwap,
    /// Isolated content is thrown away on commit.
    Discard,
}

impl StorePolicy {
    /// Whether committing under this policy writes back into shared storage.
    /// Unscoped stores reject such policies: without a scope boundary there is
    /// nothing to merge against.
    pub fn modifies_shared_state(self) -> bool {
        matches!(self, StorePolicy::Overwrite | StorePolicy::FullSwap)
    }
}

/// A registered storage area. Immutable once constructed.
#[derive(Debug)]
pub struct Store {
    name: String,
    kind: StoreKind,
    entity_type: Option<&'static str>,
    extension: Option<String>,
}

impl Store {
    /// Declare a store without internal structure, ideal for externally
    /// managed directories.
    pub fn unscoped(name: impl Into<String>) -> Arc<Store> {
        Arc::new(Store {
            name: name.into(),
            kind: StoreKind::Unscoped,
            entity_type: None,
            extension: None,
        })
    }

    /// Declare a store holding one directory per entity of the given type.
    pub fn directory_per_entity(name: impl Into<String>, entity_type: &'static str) -> Arc<Store> {
        Arc::new(Store {
            name: name.into(),
            kind: StoreKind::DirectoryPerEntity,
            entity_type: Some(entity_type),
            extension: None,
        })
    }

    /// Declare a store holding one file per entity of the given type, with the
    /// extension enforced at the store level.
    pub fn file_per_entity(
        name: impl Into<String>,
        entity_type: &'static str,
        extension: impl Into<String>,
    ) -> Arc<Store> {
        Arc::new(Store {
            name: name.into(),
            kind: StoreKind::FilePerEntity,
            entity_type: Some(entity_type),
            extension: Some(extension.into()),
        })
    }

    /// The store name, which is also its directory name on disk.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> StoreKind {
        self.kind
    }

    /// Declared entity-type tag; `None` for unscoped stores.
    pub fn entity_type(&self) -> Option<&'static str> {
        self.entity_type
    }

    /// Enforced file extension; `None` unless the store is file-per-entity.
    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }
}
