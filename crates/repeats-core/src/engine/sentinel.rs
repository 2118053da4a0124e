//! Concurrency sentinel: node-local detection of broken star shape.

use super::RepeatEngine;
use crate::error::RepeatResult;
use crate::store::GraphStore;

impl<S: GraphStore> RepeatEngine<S> {
    /// True when the node is both a repeat (edge to another node) and an
    /// original (edge from another node) at the same time. Self-loops count
    /// as neither.
    ///
    /// That only happens when two writers raced or data was imported around
    /// the engine. Two cheap reads, no reachability query.
    pub async fn is_violating(&self, id: &str) -> RepeatResult<bool> {
        if self.store.outgoing_edge(id).await?.is_none() {
            return Ok(false);
        }
        Ok(!self.store.incoming_edges(id).await?.is_empty())
    }
}
