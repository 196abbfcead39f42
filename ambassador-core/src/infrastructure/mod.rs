//! Infrastructure layer: configuration, logging, ledger access, indexing,
//! session persistence and key handling.

pub mod config;
pub mod indexer;
pub mod ledger;
pub mod logging;
pub mod signer;
pub mod storage;
