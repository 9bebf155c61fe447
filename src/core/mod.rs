//! Core modules of the cloister staging engine.
//!
//! Leaves first: path walking and filesystem helpers, the store and scope
//! model, the resolver chain, then the session bookkeeping and the library
//! registry that ties them together.

pub mod error;
pub mod fsutil;
pub mod library;
pub mod resolver;
pub mod scope;
pub mod session;
pub mod store;
pub mod walker;
