//! Response caching for Jenkins API data
//!
//! Provides a process-wide TTL cache and a coordinator that deduplicates
//! concurrent fetches of the same resource.
//!
//! # Freshness
//!
//! | Resource | TTL | Why |
//! |----------|-----|-----|
//! | Job inventory | 30s | Broad and expensive |
//! | Nodes | 15s | Moderate churn |
//! | Queue | 10s | Changes quickly |
//! | Build history | 20s | Moderate churn |
//! | Stages, build running | 10s | Must show progress |
//! | Stages, build finished | 24h | Immutable |
//! | Console output | never | Unbounded size |

pub mod coordinator;
pub mod keys;
pub mod policy;
pub mod store;

pub use coordinator::RequestCoordinator;
pub use policy::TtlPolicy;
pub use store::{CachedValue, ResponseCache};
