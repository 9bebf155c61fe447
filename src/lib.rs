//! Cloister: transaction-like staging for shared directory trees.
//!
//! Cloister gives multiple concurrent consumers of a shared directory tree
//! claim/work/merge semantics without a database. Callers register named
//! **stores** (directories with a declared structure), open **isolation
//! sessions** over claimed subsets of those stores, mutate freely inside the
//! private copy, then **commit** the result back under each store's merge
//! policy or **discard** it.
//!
//! # Model
//!
//! - A [`Store`] declares a directory under the library root and its
//!   structure: freeform, one directory per entity, or one file per entity.
//! - An [`AccessScope`] is the claimable unit: one entity inside one scoped
//!   store. No two live sessions ever hold the same scope.
//! - A [`Library`] owns the root tree, the store registry and the session
//!   table, and implements claim validation, commit and discard.
//! - Path resolution goes through containment-enforcing walkers: no resolved
//!   path ever escapes its root, `"../x"`-style names included.
//!
//! # Example
//!
//! ```no_run
//! use cloister::{AccessScope, Library, ScopedEntity, Store, StorePolicy};
//!
//! struct Report(String);
//!
//! impl ScopedEntity for Report {
//!     fn scoped_name(&self) -> String { self.0.clone() }
//!     fn entity_type(&self) -> &'static str { "report" }
//! }
//!
//! # fn main() -> Result<(), cloister::CloisterError> {
//! let mut library = Library::new("/var/lib/app/library")?;
//! let reports = Store::file_per_entity("reports", "report", "json");
//! library.register_store(reports.clone(), StorePolicy::Overwrite)?;
//!
//! let scope = AccessScope::new(&reports, &Report("2026-08".into()))?;
//! let session = library.create_isolation(vec![scope.clone()])?;
//!
//! let draft = library.resolve_in(&session, &scope)?;
//! std::fs::write(&draft, b"{}")?;
//!
//! library.commit(&session)?;
//! library.discard(&session)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! The engine assumes a single-process, cooperative-caller model: no internal
//! locking, no background threads. Wrap the [`Library`] in a mutex at its
//! boundary if multiple threads must share it.

pub mod core;

pub use crate::core::error::CloisterError;
pub use crate::core::library::Library;
pub use crate::core::resolver::{
    IsolationGrantPolicy, Resolver, ResolverPolicy, StoreStructurePolicy,
};
pub use crate::core::scope::AccessScope;
pub use crate::core::session::IsolationSession;
pub use crate::core::store::{ScopedEntity, Store, StoreKind, StorePolicy};
pub use crate::core::walker::Walker;
