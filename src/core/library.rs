//! The library registry: stores, policies, sessions, commit and discard.
//!
//! A [`Library`] exclusively owns its root directory tree. It is plain
//! single-threaded mutable state: no internal locking, no background work.
//! Callers needing multi-thread access must wrap the whole library in a mutex
//! at its boundary.

use crate::core::error::CloisterError;
use crate::core::fsutil;
use crate::core::resolver::{IsolationGrantPolicy, Resolver, ResolverPolicy, StoreStructurePolicy};
use crate::core::scope::AccessScope;
use crate::core::session::{IsolationSession, SessionDescriptor, SESSION_ENTITY_TYPE};
use crate::core::store::{Store, StoreKind, StorePolicy};
use crate::core::walker::Walker;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use ulid::Ulid;

/// Built-in unscoped store for scratch temporary files, discarded on commit.
const TEMPORARY_STORE: &str = "tmp";
/// Built-in store hosting one working directory per isolation session.
const ISOLATION_STORE: &str = "isolation";

fn random_name() -> String {
    Ulid::new().to_string().to_ascii_lowercase()
}

/// The main storage access point: store registry, claim bookkeeping, and the
/// commit/discard algorithms.
#[derive(Debug)]
pub struct Library {
    root: PathBuf,
    walker: Walker,
    stores: HashMap<String, (Arc<Store>, StorePolicy)>,
    sessions: HashMap<String, SessionDescriptor>,
    temporary_store: Arc<Store>,
}

impl Library {
    /// Open a library rooted at `root`, creating the directory if absent.
    /// Fails if the root exists as a regular file.
    pub fn new(root: impl Into<PathBuf>) -> Result<Library, CloisterError> {
        let walker = Walker::new(root)?;
        let root = walker.root().to_path_buf();

        let temporary_store = Store::unscoped(TEMPORARY_STORE);
        let isolation_store = Store::directory_per_entity(ISOLATION_STORE, SESSION_ENTITY_TYPE);

        let mut library = Library {
            root,
            walker,
            stores: HashMap::new(),
            sessions: HashMap::new(),
            temporary_store: temporary_store.clone(),
        };

        library.register_store(temporary_store, StorePolicy::Discard)?;
        library.register_store(isolation_store, StorePolicy::Private)?;

        Ok(library)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Register a store under the given merge policy.
    ///
    /// Fails on a duplicate name, on an unscoped store paired with a policy
    /// that writes back into shared storage, or when the store's root
    /// directory cannot be obtained under the library root.
    pub fn register_store(
        &mut self,
        store: Arc<Store>,
        policy: StorePolicy,
    ) -> Result<(), CloisterError> {
        if self.stores.contains_key(store.name()) {
            return Err(CloisterError::StoreRegistration(format!(
                "store '{}' already exists",
                store.name()
            )));
        }

        if !store.kind().is_scoped() && policy.modifies_shared_state() {
            return Err(CloisterError::StoreRegistration(format!(
                "the '{}' unscoped store cannot be registered under the '{:?}' policy",
                store.name(),
                policy
            )));
        }

        let path = self
            .walker
            .directory(store.name())
            .map_err(|err| CloisterError::StoreRoot {
                store: store.name().to_string(),
                source: Box::new(err),
            })?;

        if !path.exists() {
            fs::create_dir_all(&path).map_err(|err| CloisterError::StoreRoot {
                store: store.name().to_string(),
                source: Box::new(err.into()),
            })?;
        }

        tracing::debug!(store = store.name(), policy = ?policy, "registered store");
        self.stores.insert(store.name().to_string(), (store, policy));
        Ok(())
    }

    /// Whether this exact store instance is registered here.
    pub fn has_store(&self, store: &Arc<Store>) -> bool {
        self.stores
            .get(store.name())
            .is_some_and(|(registered, _)| Arc::ptr_eq(registered, store))
    }

    /// Open an isolation session claiming the given scopes. Validation runs
    /// against the global claim set before anything is allocated, so a
    /// rejected request leaves no partial state. Zero scopes is valid.
    pub fn create_isolation(
        &mut self,
        scopes: Vec<AccessScope>,
    ) -> Result<IsolationSession, CloisterError> {
        self.check_scopes(&scopes)?;

        let id = random_name();
        let isolation_root = self.walker.walk(ISOLATION_STORE)?.directory(&id)?;
        fs::create_dir_all(&isolation_root)?;

        let session = IsolationSession::new(id.clone(), isolation_root.clone());
        let mut descriptor = SessionDescriptor::new(id.clone(), isolation_root);
        for scope in scopes {
            descriptor.grant(scope);
        }

        tracing::debug!(session = %id, scopes = descriptor.scopes().len(), "created isolation session");
        self.sessions.insert(id, descriptor);
        Ok(session)
    }

    /// Open an isolation session without any scope.
    pub fn create_isolation_empty(&mut self) -> Result<IsolationSession, CloisterError> {
        self.create_isolation(Vec::new())
    }

    /// Claim additional scopes for a live, uncommitted session. All-or-nothing:
    /// one rejected scope fails the whole request and grants none.
    pub fn request_scope(
        &mut self,
        session: &IsolationSession,
        scopes: Vec<AccessScope>,
    ) -> Result<(), CloisterError> {
        self.descriptor(session, false)?;
        self.check_scopes(&scopes)?;

        if let Some(descriptor) = self.sessions.get_mut(session.id()) {
            for scope in scopes {
                tracing::debug!(session = session.id(), scope = %scope, "granted scope");
                descriptor.grant(scope);
            }
        }
        Ok(())
    }

    /// Resolver over a store's shared root, outside any isolation.
    pub fn resolver(&self, store: &Arc<Store>) -> Result<Resolver<'static>, CloisterError> {
        if !self.has_store(store) {
            return Err(CloisterError::Storage(format!(
                "store '{}' is not registered in this library",
                store.name()
            )));
        }

        let root = self.walker.directory(store.name())?;
        Resolver::new(
            root,
            store.clone(),
            vec![Box::new(StoreStructurePolicy::new(store.clone()))],
        )
    }

    /// Resolver over a store's mirror inside a session's isolated subtree.
    ///
    /// The returned resolver borrows the session's grant set, so further
    /// grants require dropping it and requesting a fresh one; resolution is
    /// checked against the grants on every call.
    pub fn session_resolver<'a>(
        &'a self,
        session: &IsolationSession,
        store: &Arc<Store>,
    ) -> Result<Resolver<'a>, CloisterError> {
        if !self.has_store(store) {
            return Err(CloisterError::Storage(format!(
                "store '{}' is not registered in this library",
                store.name()
            )));
        }

        // Registered by name and identity-checked just above.
        let policy = self
            .stores
            .get(store.name())
            .map(|(_, policy)| *policy)
            .unwrap_or(StorePolicy::Private);

        if policy == StorePolicy::Private {
            return Err(CloisterError::Storage(format!(
                "store '{}' cannot be used inside an isolation session",
                store.name()
            )));
        }

        let descriptor = self.descriptor(session, false)?;

        let root = self
            .walker
            .walk(ISOLATION_STORE)?
            .walk(descriptor.id())?
            .directory(store.name())?;

        let policies: Vec<Box<dyn ResolverPolicy + 'a>> = vec![
            Box::new(IsolationGrantPolicy::new(
                descriptor.id(),
                descriptor.scopes(),
                store.clone(),
            )),
            Box::new(StoreStructurePolicy::new(store.clone())),
        ];

        Resolver::new(root, store.clone(), policies)
    }

    /// Resolve a scope against shared storage: the entity file for a
    /// file-per-entity store, the entity directory otherwise.
    pub fn resolve(&self, scope: &AccessScope) -> Result<PathBuf, CloisterError> {
        let resolver = self.resolver(scope.store())?;
        resolve_scope(&resolver, scope)
    }

    /// Resolve a named file under a scope's entity directory in shared storage.
    pub fn resolve_named(
        &self,
        scope: &AccessScope,
        filename: &str,
    ) -> Result<PathBuf, CloisterError> {
        let resolver = self.resolver(scope.store())?;
        resolver.entity_file_named(scope, filename)
    }

    /// Resolve a scope inside a session's isolated subtree.
    pub fn resolve_in(
        &self,
        session: &IsolationSession,
        scope: &AccessScope,
    ) -> Result<PathBuf, CloisterError> {
        let resolver = self.session_resolver(session, scope.store())?;
        resolve_scope(&resolver, scope)
    }

    /// Resolve a named file under a scope's entity directory inside a
    /// session's isolated subtree.
    pub fn resolve_in_named(
        &self,
        session: &IsolationSession,
        scope: &AccessScope,
        filename: &str,
    ) -> Result<PathBuf, CloisterError> {
        let resolver = self.session_resolver(session, scope.store())?;
        resolver.entity_file_named(scope, filename)
    }

    /// Path for a fresh temporary file inside the session's scratch store.
    pub fn temporary_file(
        &self,
        session: &IsolationSession,
        extension: &str,
    ) -> Result<PathBuf, CloisterError> {
        let store = self.temporary_store.clone();
        let resolver = self.session_resolver(session, &store)?;
        resolver.file(&format!("{}.{}", random_name(), extension))
    }

    /// Merge every granted scope of the session back into shared storage,
    /// each under its store's policy.
    ///
    /// Commit is not transactional across scopes: scopes merged before a
    /// failing one stay merged, and the failure surfaces as a commit error.
    /// On success the session stays registered as committed, holding its
    /// claims until an explicit discard.
    pub fn commit(&mut self, session: &IsolationSession) -> Result<(), CloisterError> {
        let descriptor = self.descriptor(session, false)?;
        let id = descriptor.id().to_string();
        let scopes: Vec<AccessScope> = descriptor.scopes().iter().cloned().collect();

        for scope in &scopes {
            self.commit_scope(&id, scope)
                .map_err(|err| CloisterError::Commit {
                    session: id.clone(),
                    scope: scope.to_string(),
                    source: Box::new(err),
                })?;
        }

        if let Some(descriptor) = self.sessions.get_mut(&id) {
            descriptor.mark_committed();
        }
        tracing::debug!(session = %id, scopes = scopes.len(), "committed isolation session");
        Ok(())
    }

    /// Abandon a session, committed or not. Its claims are freed before its
    /// isolated subtree is deleted, so they become grantable again even if
    /// the deletion fails; a deletion failure still surfaces.
    pub fn discard(&mut self, session: &IsolationSession) -> Result<(), CloisterError> {
        let Some(descriptor) = self.sessions.remove(session.id()) else {
            return Err(CloisterError::SessionDiscarded(session.id().to_string()));
        };

        tracing::debug!(session = descriptor.id(), "discarded isolation session");
        fsutil::remove_path(descriptor.root()).map_err(|err| CloisterError::Discard {
            session: descriptor.id().to_string(),
            source: Box::new(err),
        })
    }

    /// Drop all session bookkeeping and delete the whole isolation subtree.
    /// Sessions are abandoned without a per-session discard.
    pub fn shutdown(&mut self) -> Result<(), CloisterError> {
        self.sessions.clear();
        let isolation_root = self.walker.directory(ISOLATION_STORE)?;
        tracing::debug!("library shutdown, isolation subtree removed");
        fsutil::remove_path(&isolation_root)
    }

    /// Global claim validation: every candidate must target a registered store
    /// and be unclaimed across all active sessions. A scope the requesting
    /// session itself already holds is rejected like any other claim.
    fn check_scopes(&self, scopes: &[AccessScope]) -> Result<(), CloisterError> {
        let mut claimed: HashMap<&AccessScope, &str> = HashMap::new();
        for descriptor in self.sessions.values() {
            for scope in descriptor.scopes() {
                claimed.insert(scope, descriptor.id());
            }
        }

        for scope in scopes {
            if let Some(owner) = claimed.get(scope) {
                return Err(CloisterError::ScopeGrant(format!(
                    "cannot grant {scope}: the scope is already claimed by isolation session '{owner}'"
                )));
            }

            if !self.has_store(scope.store()) {
                return Err(CloisterError::ScopeGrant(format!(
                    "cannot grant {scope}: the targeted store is not registered in this library"
                )));
            }
        }

        Ok(())
    }

    fn descriptor(
        &self,
        session: &IsolationSession,
        allow_committed: bool,
    ) -> Result<&SessionDescriptor, CloisterError> {
        let descriptor = self
            .sessions
            .get(session.id())
            .ok_or_else(|| CloisterError::SessionDiscarded(session.id().to_string()))?;

        if descriptor.is_committed() && !allow_committed {
            return Err(CloisterError::SessionCommitted(session.id().to_string()));
        }

        Ok(descriptor)
    }

    /// Merge one scope's isolated content into shared storage, guarded by a
    /// sibling backup of the pre-existing shared content. On merge failure the
    /// backup is restored best-effort and the original error surfaces.
    fn commit_scope(&self, session_id: &str, scope: &AccessScope) -> Result<(), CloisterError> {
        let store = scope.store();
        let Some((_, policy)) = self.stores.get(store.name()) else {
            return Err(CloisterError::Storage(format!(
                "store '{}' is not registered in this library",
                store.name()
            )));
        };
        let policy = *policy;

        // Unscoped or discard-policy content never moves.
        if policy == StorePolicy::Discard || !store.kind().is_scoped() {
            return Ok(());
        }

        let store_walker = self.walker.walk(store.name())?;
        let local = self.resolve(scope)?;

        let isolation_root = self
            .walker
            .walk(ISOLATION_STORE)?
            .walk(session_id)?
            .directory(store.name())?;
        let isolation_resolver = Resolver::new(
            isolation_root,
            store.clone(),
            vec![Box::new(StoreStructurePolicy::new(store.clone()))],
        )?;
        let isolated = resolve_scope(&isolation_resolver, scope)?;

        let local_name = local
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let backup_name = format!(".{local_name}");
        let backup = match store.kind() {
            StoreKind::FilePerEntity => store_walker.file(&backup_name)?,
            _ => store_walker.directory(&backup_name)?,
        };

        // A leftover backup from an earlier interrupted commit is stale.
        fsutil::remove_path(&backup)?;

        let mut has_backup = false;
        if local.exists() {
            fsutil::copy_recursive(&local, &backup)?;
            has_backup = true;
        }

        if let Err(err) = apply_merge(store.kind(), policy, &isolated, &local) {
            tracing::warn!(scope = %scope, error = %err, "merge failed, restoring backup");
            let _ = fsutil::remove_path(&local);
            if has_backup {
                let _ = fs::rename(&backup, &local);
            }
            return Err(err);
        }

        if has_backup {
            fsutil::remove_path(&backup)?;
        }
        Ok(())
    }
}

fn resolve_scope(resolver: &Resolver<'_>, scope: &AccessScope) -> Result<PathBuf, CloisterError> {
    if scope.store().kind() == StoreKind::FilePerEntity {
        resolver.entity_file(scope)
    } else {
        resolver.entity_directory(scope)
    }
}

/// The kind/policy-specific merge step of a scope commit.
fn apply_merge(
    kind: StoreKind,
    policy: StorePolicy,
    isolated: &Path,
    local: &Path,
) -> Result<(), CloisterError> {
    match kind {
        StoreKind::DirectoryPerEntity => match policy {
            StorePolicy::FullSwap => {
                fsutil::remove_path(local)?;
                fsutil::copy_recursive(isolated, local)
            }
            StorePolicy::Overwrite => fsutil::copy_recursive(isolated, local),
            _ => Ok(()),
        },
        StoreKind::FilePerEntity => {
            if policy == StorePolicy::FullSwap {
                fsutil::remove_path(local)?;
            }
            // Nothing written in isolation: Overwrite leaves the shared file
            // untouched, FullSwap has already deleted it.
            if isolated.is_file() {
                fsutil::copy_recursive(isolated, local)?;
            }
            Ok(())
        }
        StoreKind::Unscoped => Ok(()),
    }
}
