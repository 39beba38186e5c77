//! Vault module: the encrypted credential database.
//!
//! This module provides:
//! - `Entry`, `ProtectedValue` and `EntrySummary` (`entry`)
//! - The in-memory `KeePassDatabase` tree with dirty tracking (`database`)
//! - The encrypted container codec and atomic file writes (`format`)

pub mod database;
pub mod entry;
pub mod format;

pub use database::{Group, KeePassDatabase, ROOT_GROUP_NAME};
pub use entry::{Entry, EntrySummary, ProtectedValue};
pub use format::{load_database, save_database, VaultHeader};
