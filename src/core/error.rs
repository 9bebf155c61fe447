use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloisterError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("scope definition error: {0}")]
    ScopeDefinition(String),
    #[error("scope grant error: {0}")]
    ScopeGrant(String),
    #[error("scope forbidden: {0}")]
    ScopeForbidden(String),
    #[error("store registration error: {0}")]
    StoreRegistration(String),
    #[error("store '{store}' root directory could not be obtained")]
    StoreRoot {
        store: String,
        #[source]
        source: Box<CloisterError>,
    },
    #[error("resolved out-of-bound path '{resolved}' from root '{root}'")]
    OutOfBounds { root: PathBuf, resolved: PathBuf },
    #[error("storage error: {0}")]
    Storage(String),
    #[error("isolation session '{0}' has already been discarded or never existed")]
    SessionDiscarded(String),
    #[error("isolation session '{0}' has already been committed")]
    SessionCommitted(String),
    #[error("failed to commit scope {scope} of isolation session '{session}'")]
    Commit {
        session: String,
        scope: String,
        #[source]
        source: Box<CloisterError>,
    },
    #[error("failed to discard isolation session '{session}'")]
    Discard {
        session: String,
        #[source]
        source: Box<CloisterError>,
    },
}
