//! Isolation session handle and its private registry record.

use crate::core::scope::AccessScope;
use crate::core::store::ScopedEntity;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Entity-type tag of the built-in isolation store: each session claims its
/// own working directory under it, scoped by session identity.
pub(crate) const SESSION_ENTITY_TYPE: &str = "cloister.isolation-session";

/// Public handle to an isolated working copy.
///
/// The handle is stateless beyond its identity: every operation goes through
/// the owning [`Library`](crate::core::library::Library), which looks the
/// session up by identifier. Holding a handle after discard is harmless; the
/// library answers "unavailable".
#[derive(Debug, Clone)]
pub struct IsolationSession {
    id: String,
    root: PathBuf,
}

impl IsolationSession {
    pub(crate) fn new(id: String, root: PathBuf) -> IsolationSession {
        IsolationSession { id, root }
    }

    /// Session identifier, also the name of its directory on disk.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Root of the session's isolated subtree.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ScopedEntity for IsolationSession {
    fn scoped_name(&self) -> String {
        self.id.clone()
    }

    fn entity_type(&self) -> &'static str {
        SESSION_ENTITY_TYPE
    }
}

/// Private bookkeeping the registry keeps per session. The public handle must
/// not be able to mutate this, so it stays crate-internal.
#[derive(Debug)]
pub(crate) struct SessionDescriptor {
    id: String,
    root: PathBuf,
    scopes: HashSet<AccessScope>,
    committed: bool,
}

impl SessionDescriptor {
    pub(crate) fn new(id: String, root: PathBuf) -> SessionDescriptor {
        SessionDescriptor {
            id,
            root,
            scopes: HashSet::new(),
            committed: false,
        }
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn scopes(&self) -> &HashSet<AccessScope> {
        &self.scopes
    }

    /// Scopes are only ever added for the lifetime of a descriptor.
    pub(crate) fn grant(&mut self, scope: AccessScope) {
        self.scopes.insert(scope);
    }

    pub(crate) fn is_committed(&self) -> bool {
        self.committed
    }

    pub(crate) fn mark_committed(&mut self) {
        self.committed = true;
    }
}
