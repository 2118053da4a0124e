//! Cycle guard.

use tracing::debug;

use super::RepeatEngine;
use crate::error::RepeatResult;
use crate::store::GraphStore;

impl<S: GraphStore> RepeatEngine<S> {
    /// Whether adding `source -> target` would close a cycle.
    ///
    /// Checks the graph as it is now, so it must run before the edge exists.
    pub async fn would_create_cycle(&self, source: &str, target: &str) -> RepeatResult<bool> {
        if source == target {
            return Ok(true);
        }
        let closes = self.store.path_exists(target, source).await?;
        debug!(source, target, closes, "Cycle check");
        Ok(closes)
    }
}
