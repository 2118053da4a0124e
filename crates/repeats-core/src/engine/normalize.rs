//! Chain normalization.
//!
//! Keeps every repeat group a star: a repeat points straight at the original,
//! never at another repeat.
//!
//! ```text
//! target-side:  S -> T -> F    becomes   S -> F
//! source-side:  O -> S -> T    becomes   O -> T
//! ```
//!
//! Rewrites are planned from reads first, then handed to the store as one
//! batch, so a failed call leaves the graph as it was.

use tracing::{debug, info};

use super::model::Normalization;
use super::RepeatEngine;
use crate::error::{RepeatError, RepeatResult};
use crate::repeat::model::EdgeWrite;
use crate::store::GraphStore;

impl<S: GraphStore> RepeatEngine<S> {
    /// Collapse chains around an existing `source -> target`.
    ///
    /// Calling it again with no mutation in between changes nothing.
    pub async fn normalize(&self, source: &str, target: &str) -> RepeatResult<Normalization> {
        let _guard = self.lock_neighbourhood(&[source, target]).await?;
        self.normalize_locked(source, target).await
    }

    /// Normalization body. Callers hold the neighbourhood lock.
    pub(super) async fn normalize_locked(&self, source: &str, target: &str) -> RepeatResult<Normalization> {
        let present = self.store.edge(source, target).await?.is_some();
        let writes = self.plan_normalization(source, target, present).await?;
        let applied = self.apply_writes(&writes).await?;

        let report = Normalization::from_applied(&writes, &applied);
        log_normalization(source, target, &report);
        Ok(report)
    }

    /// Writes that collapse the chains around `source -> target`.
    ///
    /// Reads only. `edge_present` tells whether `source -> target` exists,
    /// or will once a create queued ahead of these writes lands.
    pub(super) async fn plan_normalization(
        &self,
        source: &str,
        target: &str,
        edge_present: bool,
    ) -> RepeatResult<Vec<EdgeWrite>> {
        if source == target {
            return Err(RepeatError::SelfRepeat(source.to_string()));
        }
        // Every rewrite below points at the root of `target`, so a path back
        // to `source` would turn one of them into a cycle.
        if self.store.path_exists(target, source).await? {
            return Err(RepeatError::CycleConflict {
                source_id: source.to_string(),
                target_id: target.to_string(),
            });
        }

        let mut writes = Vec::new();
        // Only an established edge from `source` may pull its repeats along.
        if !edge_present {
            return Ok(writes);
        }
        let root = self.plan_target_side(source, target, &mut writes).await?;
        self.plan_source_side(source, &root, &mut writes).await?;
        Ok(writes)
    }

    /// Apply a batch; an empty plan never reaches the store.
    pub(super) async fn apply_writes(&self, writes: &[EdgeWrite]) -> RepeatResult<Vec<bool>> {
        if writes.is_empty() {
            return Ok(Vec::new());
        }
        let applied = self.store.apply_writes(writes).await?;
        for (write, changed) in writes.iter().zip(&applied) {
            debug!(write = %write, changed, "Edge write");
        }
        Ok(applied)
    }

    /// `source -> target -> final` becomes `source -> final`.
    ///
    /// Returns the root `source` ends up pointing at.
    async fn plan_target_side(
        &self,
        source: &str,
        target: &str,
        writes: &mut Vec<EdgeWrite>,
    ) -> RepeatResult<String> {
        let Some(next) = self.store.outgoing_edge(target).await? else {
            return Ok(target.to_string());
        };
        let root = next.target;

        if self.store.edge(source, &root).await?.is_some() {
            writes.push(EdgeWrite::delete(source, target));
        } else {
            writes.push(EdgeWrite::retarget(source, target, &root));
        }
        Ok(root)
    }

    /// Every `origin -> source` becomes `origin -> root`.
    async fn plan_source_side(
        &self,
        source: &str,
        root: &str,
        writes: &mut Vec<EdgeWrite>,
    ) -> RepeatResult<()> {
        for inbound in self.store.incoming_edges(source).await? {
            let origin = inbound.source;
            if self.store.edge(&origin, root).await?.is_some() {
                writes.push(EdgeWrite::delete(&origin, source));
            } else {
                writes.push(EdgeWrite::retarget(&origin, source, root));
            }
        }
        Ok(())
    }
}

fn log_normalization(source: &str, target: &str, report: &Normalization) {
    if !report.is_empty() {
        info!(
            source,
            target,
            deleted = report.deleted_edges.len(),
            updated = report.updated_edges.len(),
            "Normalized repeat chain"
        );
    }
}
