//! Repeat-relationship consistency engine.
//!
//! Pipeline for a proposed "A repeats B":
//!
//! 1. resolve the orientation from publication and creation dates,
//! 2. refuse the edge if it would close a cycle,
//! 3. create (or confirm) the edge,
//! 4. collapse any chain it formed.
//!
//! The whole sequence runs while holding locks on every node it can read or
//! write, so overlapping proposals inside one process never interleave.

mod cycle;
mod direction;
mod locks;
pub mod model;
mod normalize;
#[cfg(test)]
mod properties;
mod repair;
mod sentinel;

pub use direction::resolve_direction;
pub use model::{DirectionRule, Normalization, ProposeOutcome, RepairReport, Resolution};

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{RepeatError, RepeatResult};
use crate::repeat::model::{EdgeStatus, EdgeWrite};
use crate::store::GraphStore;
use locks::{NodeLockGuard, NodeLocks};

/// Keeps the `REPEATS` graph acyclic, correctly oriented and star-shaped.
pub struct RepeatEngine<S: GraphStore> {
    store: Arc<S>,
    locks: NodeLocks,
    config: EngineConfig,
}

impl<S: GraphStore> RepeatEngine<S> {
    /// Create an engine with default configuration.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: Arc<S>, config: EngineConfig) -> Self {
        Self {
            store,
            locks: NodeLocks::new(),
            config,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Record that `a` repeats `b`, correcting the orientation if needed.
    ///
    /// Fails with `CycleConflict` (graph untouched) when the resolved edge
    /// would close a cycle. Any error leaves the graph as it was, so a
    /// `StoreUnavailable` call can simply be retried.
    pub async fn propose_repeat(&self, a: &str, b: &str) -> RepeatResult<ProposeOutcome> {
        if a == b {
            return Err(RepeatError::SelfRepeat(a.to_string()));
        }
        let operation_id = Uuid::new_v4();
        let _guard = self.lock_neighbourhood(&[a, b]).await?;

        let resolution = self.resolve(a, b).await?;
        let ambiguous = resolution.is_ambiguous();
        if ambiguous {
            if self.config.strict_direction {
                return Err(RepeatError::AmbiguousDirection {
                    source_id: resolution.source,
                    target_id: resolution.target,
                    reason: resolution.reason,
                });
            }
            warn!(
                %operation_id,
                source = %resolution.source,
                target = %resolution.target,
                reason = %resolution.reason,
                "Direction ambiguous, keeping proposed orientation"
            );
        }

        let source = resolution.source.as_str();
        let target = resolution.target.as_str();
        if self.would_create_cycle(source, target).await? {
            warn!(%operation_id, source, target, "Rejected repeat edge: would create a cycle");
            return Err(RepeatError::CycleConflict {
                source_id: source.to_string(),
                target_id: target.to_string(),
            });
        }

        // The new edge and every rewrite it triggers land together or not at all.
        let mut writes = Vec::new();
        if self.store.edge(source, target).await?.is_none() {
            writes.push(EdgeWrite::create(source, target, EdgeStatus::Draft));
        }
        writes.extend(self.plan_normalization(source, target, true).await?);
        let applied = self.apply_writes(&writes).await?;

        let created = writes
            .iter()
            .zip(&applied)
            .any(|(write, changed)| *changed && matches!(write, EdgeWrite::Create { .. }));
        if resolution.corrected {
            info!(
                %operation_id,
                proposed_source = a,
                proposed_target = b,
                source,
                target,
                reason = %resolution.reason,
                "Corrected repeat direction"
            );
        }
        info!(%operation_id, source, target, created, "Repeat edge established");

        let normalization = Normalization::from_applied(&writes, &applied);
        if !normalization.is_empty() {
            info!(
                %operation_id,
                source,
                target,
                deleted = normalization.deleted_edges.len(),
                updated = normalization.updated_edges.len(),
                "Normalized repeat chain"
            );
        }

        Ok(ProposeOutcome {
            operation_id,
            source: source.to_string(),
            target: target.to_string(),
            corrected: resolution.corrected,
            rule: resolution.rule,
            reason: resolution.reason.clone(),
            ambiguous,
            created,
            deleted_edges: normalization.deleted_edges,
            updated_edges: normalization.updated_edges,
        })
    }

    /// Check one node and normalize around it if it is both repeat and
    /// original. Returns whether it was violating.
    pub async fn sweep_node(&self, id: &str) -> RepeatResult<bool> {
        Ok(self.sweep_node_report(id).await?.is_some())
    }

    /// Like [`sweep_node`](Self::sweep_node), returning the edges changed.
    pub async fn sweep_node_report(&self, id: &str) -> RepeatResult<Option<Normalization>> {
        let _guard = self.lock_neighbourhood(&[id]).await?;

        if !self.is_violating(id).await? {
            return Ok(None);
        }
        let Some(outgoing) = self.store.outgoing_edge(id).await? else {
            return Ok(None);
        };

        warn!(node = id, target = %outgoing.target, "Node is both repeat and original, normalizing");
        let report = self.normalize_locked(id, &outgoing.target).await?;
        Ok(Some(report))
    }

    /// Lock the seeds plus every node a pipeline step around them may touch.
    ///
    /// The neighbourhood is read, locked, then read again. If it grew while
    /// locking, the larger set is locked on the next attempt.
    async fn lock_neighbourhood(&self, seeds: &[&str]) -> RepeatResult<NodeLockGuard> {
        let mut wanted = self.neighbourhood(seeds).await?;

        for attempt in 1..=self.config.lock_retries {
            let guard = self.locks.acquire(&wanted).await;
            let current = self.neighbourhood(seeds).await?;
            if current.is_subset(&wanted) {
                return Ok(guard);
            }

            drop(guard);
            debug!(attempt, seeds = ?seeds, "Neighbourhood changed while locking, retrying");
            wanted.extend(current);
        }

        Err(RepeatError::LockContention {
            nodes: seeds.iter().map(|s| s.to_string()).collect(),
            attempts: self.config.lock_retries,
        })
    }

    /// Seeds, their repeats, their originals, and the originals' originals.
    async fn neighbourhood(&self, seeds: &[&str]) -> RepeatResult<BTreeSet<String>> {
        let mut ids = BTreeSet::new();
        for seed in seeds {
            ids.insert(seed.to_string());
            for inbound in self.store.incoming_edges(seed).await? {
                ids.insert(inbound.source);
            }
            if let Some(out) = self.store.outgoing_edge(seed).await? {
                if let Some(next) = self.store.outgoing_edge(&out.target).await? {
                    ids.insert(next.target);
                }
                ids.insert(out.target);
            }
        }
        Ok(ids)
    }
}
