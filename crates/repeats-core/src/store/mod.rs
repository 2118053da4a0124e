//! Graph store seam.
//!
//! The engine never talks to a database directly. It drives an implementation
//! of [`GraphStore`], which holds Jingle nodes and the `REPEATS` edges between
//! them. `repeats-graph` provides the Neo4j implementation; [`MemoryGraphStore`]
//! backs tests and dry runs.

mod memory;

pub use memory::MemoryGraphStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::jingle::model::NodeRecord;
use crate::repeat::model::{EdgeRecord, EdgeStatus, EdgeWrite};

/// Errors surfaced by a graph store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A stored value is present but cannot be decoded.
    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

/// Result type for graph store calls.
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage for Jingles and the `REPEATS` edges between them.
///
/// Every method is one round-trip. Implementations must make each write
/// atomic on its own; the engine composes them.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Look up a Jingle. Fails with `NotFound` when it does not exist.
    async fn get_node(&self, id: &str) -> StoreResult<NodeRecord>;

    /// Whether a directed path of one or more `REPEATS` edges leads from
    /// `from` to `to`.
    async fn path_exists(&self, from: &str, to: &str) -> StoreResult<bool>;

    /// The node's outgoing edge to another node. When several exist, the
    /// earliest created. Self-loops are ignored.
    async fn outgoing_edge(&self, id: &str) -> StoreResult<Option<EdgeRecord>>;

    /// Every edge pointing at the node from another node, ordered by source
    /// id. Self-loops are ignored.
    async fn incoming_edges(&self, id: &str) -> StoreResult<Vec<EdgeRecord>>;

    /// The edge for an exact (source, target) pair.
    async fn edge(&self, source: &str, target: &str) -> StoreResult<Option<EdgeRecord>>;

    /// Create `source -> target` unless it exists. Returns whether it was new.
    async fn create_edge(&self, source: &str, target: &str, status: EdgeStatus) -> StoreResult<bool>;

    /// Delete `source -> target`. Returns whether an edge was removed.
    async fn delete_edge(&self, source: &str, target: &str) -> StoreResult<bool>;

    /// Replace `source -> old_target` with `source -> new_target` in one
    /// atomic write, stamping a fresh `created_at` and `Draft` status.
    ///
    /// Returns `None` without writing anything when the old edge is gone.
    async fn retarget_edge(
        &self,
        source: &str,
        old_target: &str,
        new_target: &str,
    ) -> StoreResult<Option<EdgeRecord>>;

    /// Apply `writes` in order as one transaction.
    ///
    /// Returns, per write, whether it changed anything. On error nothing
    /// from the batch is kept.
    async fn apply_writes(&self, writes: &[EdgeWrite]) -> StoreResult<Vec<bool>>;

    /// Ids of nodes with an edge from another node and an edge to another
    /// node, sorted. Self-loops do not count.
    async fn violating_nodes(&self) -> StoreResult<Vec<String>>;

    /// Ids of nodes with an edge to themselves, sorted.
    async fn self_loop_nodes(&self) -> StoreResult<Vec<String>>;
}
