//! Path resolution façade over a [`Walker`], guarded by a policy chain.
//!
//! Every resolution form runs through the ordered chain first: all links must
//! accept, the first rejection wins. The structural policy enforces the shape
//! a store declares; the isolation grant policy additionally restricts
//! entity resolution inside a session to the scopes that session holds,
//! checked on every call rather than only at grant time.

use crate::core::error::CloisterError;
use crate::core::scope::AccessScope;
use crate::core::store::{ScopedEntity, Store, StoreKind};
use crate::core::walker::Walker;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One link of a resolver policy chain, with one check per resolution form.
pub trait ResolverPolicy {
    fn check_directory(&self, name: &str) -> Result<(), CloisterError>;

    fn check_file(&self, filename: &str) -> Result<(), CloisterError>;

    fn check_entity_directory(&self, entity: &dyn ScopedEntity) -> Result<(), CloisterError>;

    fn check_entity_file(&self, entity: &dyn ScopedEntity) -> Result<(), CloisterError>;

    fn check_entity_file_named(
        &self,
        entity: &dyn ScopedEntity,
        filename: &str,
    ) -> Result<(), CloisterError>;
}

/// Enforces the structural rules of a store's [`StoreKind`].
pub struct StoreStructurePolicy {
    store: Arc<Store>,
}

impl StoreStructurePolicy {
    pub fn new(store: Arc<Store>) -> StoreStructurePolicy {
        StoreStructurePolicy { store }
    }
}

impl ResolverPolicy for StoreStructurePolicy {
    fn check_directory(&self, _name: &str) -> Result<(), CloisterError> {
        if !self.store.kind().is_scoped() {
            return Ok(());
        }
        Err(CloisterError::Storage(
            "tried to resolve a bare directory on a scoped store".to_string(),
        ))
    }

    fn check_file(&self, _filename: &str) -> Result<(), CloisterError> {
        if !self.store.kind().is_scoped() {
            return Ok(());
        }
        Err(CloisterError::Storage(
            "tried to resolve a bare file on a scoped store".to_string(),
        ))
    }

    fn check_entity_directory(&self, _entity: &dyn ScopedEntity) -> Result<(), CloisterError> {
        if self.store.kind().is_scoped() {
            return Ok(());
        }
        Err(CloisterError::Storage(
            "tried to resolve an entity directory on an unscoped store".to_string(),
        ))
    }

    fn check_entity_file(&self, _entity: &dyn ScopedEntity) -> Result<(), CloisterError> {
        match self.store.kind() {
            StoreKind::FilePerEntity => Ok(()),
            StoreKind::DirectoryPerEntity => Err(CloisterError::Storage(
                "tried to resolve an entity file on a directory-per-entity store".to_string(),
            )),
            StoreKind::Unscoped => Err(CloisterError::Storage(
                "tried to resolve an entity file on an unscoped store".to_string(),
            )),
        }
    }

    fn check_entity_file_named(
        &self,
        _entity: &dyn ScopedEntity,
        _filename: &str,
    ) -> Result<(), CloisterError> {
        match self.store.kind() {
            StoreKind::DirectoryPerEntity => Ok(()),
            StoreKind::FilePerEntity => Err(CloisterError::Storage(
                "tried to resolve a named file under an entity on a file-per-entity store"
                    .to_string(),
            )),
            StoreKind::Unscoped => Err(CloisterError::Storage(
                "tried to resolve a named entity file on an unscoped store".to_string(),
            )),
        }
    }
}

/// Restricts entity resolution to the scopes granted to one session.
///
/// Bare-name resolution carries no entity and passes through; the structural
/// policy decides whether it is legal at all.
pub struct IsolationGrantPolicy<'a> {
    session_id: &'a str,
    granted: &'a HashSet<AccessScope>,
    store: Arc<Store>,
}

impl<'a> IsolationGrantPolicy<'a> {
    pub(crate) fn new(
        session_id: &'a str,
        granted: &'a HashSet<AccessScope>,
        store: Arc<Store>,
    ) -> IsolationGrantPolicy<'a> {
        IsolationGrantPolicy {
            session_id,
            granted,
            store,
        }
    }

    fn check_granted(&self, entity: &dyn ScopedEntity) -> Result<(), CloisterError> {
        let scope = AccessScope::new(&self.store, entity)?;
        if self.granted.contains(&scope) {
            return Ok(());
        }
        Err(CloisterError::ScopeForbidden(format!(
            "{} is not within the granted scopes of isolation session '{}'",
            scope, self.session_id
        )))
    }
}

impl ResolverPolicy for IsolationGrantPolicy<'_> {
    fn check_directory(&self, _name: &str) -> Result<(), CloisterError> {
        Ok(())
    }

    fn check_file(&self, _filename: &str) -> Result<(), CloisterError> {
        Ok(())
    }

    fn check_entity_directory(&self, entity: &dyn ScopedEntity) -> Result<(), CloisterError> {
        self.check_granted(entity)
    }

    fn check_entity_file(&self, entity: &dyn ScopedEntity) -> Result<(), CloisterError> {
        self.check_granted(entity)
    }

    fn check_entity_file_named(
        &self,
        entity: &dyn ScopedEntity,
        _filename: &str,
    ) -> Result<(), CloisterError> {
        self.check_granted(entity)
    }
}

/// Name-based and entity-based path resolution rooted at one store directory.
///
/// Resolved paths are not guaranteed to exist; creation is left to the I/O
/// layer. The lifetime ties session-bound resolvers to the library borrow they
/// were issued from, so grants cannot change behind a live resolver.
pub struct Resolver<'a> {
    walker: Walker,
    store: Arc<Store>,
    policies: Vec<Box<dyn ResolverPolicy + 'a>>,
}

impl fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("walker", &self.walker)
            .field("store", &self.store)
            .field("policies", &self.policies.len())
            .finish()
    }
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(
        root: impl Into<PathBuf>,
        store: Arc<Store>,
        policies: Vec<Box<dyn ResolverPolicy + 'a>>,
    ) -> Result<Resolver<'a>, CloisterError> {
        Ok(Resolver {
            walker: Walker::new(root)?,
            store,
            policies,
        })
    }

    /// Root directory this resolver resolves under.
    pub fn root(&self) -> &Path {
        self.walker.root()
    }

    /// Resolve a directory by bare name.
    pub fn directory(&self, name: &str) -> Result<PathBuf, CloisterError> {
        for policy in &self.policies {
            policy.check_directory(name)?;
        }
        self.walker.directory(name)
    }

    /// Resolve a file by bare name.
    pub fn file(&self, filename: &str) -> Result<PathBuf, CloisterError> {
        for policy in &self.policies {
            policy.check_file(filename)?;
        }
        self.walker.file(filename)
    }

    /// Resolve the directory belonging to `entity`.
    pub fn entity_directory(&self, entity: &dyn ScopedEntity) -> Result<PathBuf, CloisterError> {
        for policy in &self.policies {
            policy.check_entity_directory(entity)?;
        }
        self.walker.directory(&entity.scoped_name())
    }

    /// Resolve the file belonging to `entity`, appending the store extension.
    pub fn entity_file(&self, entity: &dyn ScopedEntity) -> Result<PathBuf, CloisterError> {
        for policy in &self.policies {
            policy.check_entity_file(entity)?;
        }
        let filename = format!(
            "{}.{}",
            entity.scoped_name(),
            self.store.extension().unwrap_or_default()
        );
        self.walker.file(&filename)
    }

    /// Resolve a named file inside the directory belonging to `entity`.
    pub fn entity_file_named(
        &self,
        entity: &dyn ScopedEntity,
        filename: &str,
    ) -> Result<PathBuf, CloisterError> {
        for policy in &self.policies {
            policy.check_entity_file_named(entity, filename)?;
        }
        self.walker.walk(&entity.scoped_name())?.file(filename)
    }
}
