//! Store adapters for vaultbridge.
//!
//! This module provides the repository contract the migration engine consumes
//! and the stores that implement it:
//! - `MemoryStore`: hierarchical in-memory store
//! - `FlatMemoryStore`: in-memory store with a flat folder namespace
//! - `CsvSource`: read-only Buttercup CSV export
//! - `bitwarden`: Bitwarden API (flat folder namespace)
//!
//! # Design Principles
//! - Store isolation: no store-specific logic in the vault model or engine
//! - Async operations: all store access is async
//! - Unified error semantics: transport errors become not-found,
//!   authentication, schema or request failures
//! - Retry and rate limiting stay inside the adapter that needs them

pub mod bcup;
pub mod bitwarden;
pub mod flat;
pub mod memory;
pub mod rate_limit;
pub mod repository;
pub mod retry;

pub use bcup::CsvSource;
pub use bitwarden::{BitwardenClient, BitwardenConfig, BitwardenStore};
pub use flat::FlatMemoryStore;
pub use memory::{MemoryStore, OperationCounts};
pub use rate_limit::RateLimiter;
pub use repository::{EntryRepository, FolderRepository, Store};
pub use retry::{RetryConfig, RetryExecutor};
