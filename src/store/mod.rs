//! Storage engine
//!
//! Durable, transactional key-ordered store on top of sled. All document state (nodes,
//! version ledger, pending reads, conflicts, id counter) lives in one sled tree and is
//! only touched through [`Txn`].

pub mod keys;
pub mod persistence;
pub mod txn;

pub use persistence::{Store, StoreOptions, WaitPolicy};
pub use txn::{Txn, TxnMode};
