//! Full-graph repair for data that bypassed the engine.
//!
//! Out-of-band imports can leave self-loops and chains of any length. One
//! sweep only collapses the hops next to the swept node, so sweeps repeat
//! until no node is both repeat and original.

use std::collections::BTreeSet;

use tracing::{info, warn};

use super::model::RepairReport;
use super::RepeatEngine;
use crate::error::{RepeatError, RepeatResult};
use crate::store::GraphStore;

impl<S: GraphStore> RepeatEngine<S> {
    /// Sweep the whole graph to a fixed point.
    ///
    /// Nodes on a cycle cannot be collapsed safely; they are reported in
    /// `conflicts` and left as they are.
    pub async fn repair_graph(&self) -> RepeatResult<RepairReport> {
        let mut report = RepairReport::default();

        for id in self.store.self_loop_nodes().await? {
            if self.store.delete_edge(&id, &id).await? {
                warn!(node = %id, "Removed self-repeat edge");
                report.self_loops_removed.push(id);
            }
        }

        let mut conflicts = BTreeSet::new();
        for pass in 1..=self.config.repair_max_passes {
            let violating = self.pending(&conflicts).await?;
            if violating.is_empty() {
                break;
            }
            report.passes = pass;
            info!(pass, nodes = violating.len(), "Repair pass");
            self.sweep_pass(violating, &mut report, &mut conflicts).await?;
        }

        let remaining = self.pending(&conflicts).await?.len();
        if remaining > 0 {
            return Err(RepeatError::RepairDidNotConverge {
                passes: report.passes,
                remaining,
            });
        }

        report.conflicts = conflicts.into_iter().collect();
        info!(
            passes = report.passes,
            repaired = report.nodes_repaired,
            self_loops = report.self_loops_removed.len(),
            conflicts = report.conflicts.len(),
            "Repair complete"
        );
        Ok(report)
    }

    /// Sweep every node violating right now, once.
    ///
    /// Long imported chains may need several passes; see [`Self::repair_graph`].
    pub async fn sweep_all(&self) -> RepeatResult<RepairReport> {
        let mut report = RepairReport::default();
        let mut conflicts = BTreeSet::new();

        let violating = self.pending(&conflicts).await?;
        if !violating.is_empty() {
            report.passes = 1;
            self.sweep_pass(violating, &mut report, &mut conflicts).await?;
        }

        report.conflicts = conflicts.into_iter().collect();
        Ok(report)
    }

    async fn sweep_pass(
        &self,
        ids: Vec<String>,
        report: &mut RepairReport,
        conflicts: &mut BTreeSet<String>,
    ) -> RepeatResult<()> {
        for id in ids {
            match self.sweep_node_report(&id).await {
                Ok(Some(normalization)) => {
                    report.nodes_repaired += 1;
                    report.deleted_edges.extend(normalization.deleted_edges);
                    report.updated_edges.extend(normalization.updated_edges);
                }
                Ok(None) => {}
                Err(RepeatError::CycleConflict { source_id, target_id }) => {
                    warn!(node = %id, source = %source_id, target = %target_id, "Node sits on a repeat cycle, skipping");
                    conflicts.insert(id);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    async fn pending(&self, conflicts: &BTreeSet<String>) -> RepeatResult<Vec<String>> {
        Ok(self
            .store
            .violating_nodes()
            .await?
            .into_iter()
            .filter(|id| !conflicts.contains(id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use crate::config::EngineConfig;
    use crate::engine::RepeatEngine;
    use crate::jingle::model::NodeRecord;
    use crate::repeat::model::{EdgeRecord, EdgeRef};
    use crate::store::{GraphStore, MemoryGraphStore};

    async fn imported(ids: &[&str], edges: &[(&str, &str)]) -> Arc<MemoryGraphStore> {
        let store = Arc::new(MemoryGraphStore::new());
        for id in ids {
            store.insert_node(NodeRecord::inedito(*id, Some(Utc::now()))).await;
        }
        for (s, t) in edges {
            store.insert_edge(EdgeRecord::draft(*s, *t)).await;
        }
        store
    }

    #[tokio::test]
    async fn test_long_chain_collapses_to_root() {
        let store = imported(
            &["A", "B", "C", "D", "E"],
            &[("A", "B"), ("B", "C"), ("C", "D"), ("D", "E")],
        )
        .await;
        let engine = RepeatEngine::new(store.clone());

        let report = engine.repair_graph().await.unwrap();
        assert!(report.is_clean());
        assert!(report.nodes_repaired >= 1);
        assert!(store.violating_nodes().await.unwrap().is_empty());

        let edges = store.edge_refs().await;
        assert_eq!(edges.len(), 4);
        assert!(edges.iter().all(|e| e.target == "E"));
    }

    #[tokio::test]
    async fn test_self_loops_removed() {
        let store = imported(&["A", "B"], &[("A", "A"), ("A", "B")]).await;
        let engine = RepeatEngine::new(store.clone());

        let report = engine.repair_graph().await.unwrap();
        assert_eq!(report.self_loops_removed, vec!["A"]);
        assert_eq!(store.edge_refs().await, vec![EdgeRef::new("A", "B")]);
    }

    #[tokio::test]
    async fn test_cycles_reported_not_touched() {
        let store = imported(
            &["A", "B", "X", "Y", "Z"],
            &[("A", "B"), ("B", "A"), ("X", "Y"), ("Y", "Z")],
        )
        .await;
        let engine = RepeatEngine::new(store.clone());

        let report = engine.repair_graph().await.unwrap();
        assert_eq!(report.conflicts, vec!["A", "B"]);
        assert!(store.edge("A", "B").await.unwrap().is_some());
        assert!(store.edge("B", "A").await.unwrap().is_some());
        // The healthy component is still repaired.
        assert!(store.edge("X", "Z").await.unwrap().is_some());
        assert!(store.edge("Y", "Z").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sweep_all_runs_one_pass() {
        let store = imported(&["A", "B", "C", "D"], &[("A", "B"), ("B", "C"), ("D", "B")]).await;
        let engine = RepeatEngine::new(store.clone());

        let report = engine.sweep_all().await.unwrap();
        assert_eq!(report.passes, 1);
        assert_eq!(report.nodes_repaired, 1);
        assert_eq!(
            store.edge_refs().await,
            vec![EdgeRef::new("A", "C"), EdgeRef::new("B", "C"), EdgeRef::new("D", "C")]
        );

        let again = engine.sweep_all().await.unwrap();
        assert_eq!(again.passes, 0);
    }

    #[tokio::test]
    async fn test_clean_graph_needs_no_pass() {
        let store = imported(&["A", "B", "C"], &[("A", "C"), ("B", "C")]).await;
        let engine = RepeatEngine::with_config(store.clone(), EngineConfig::default());

        let report = engine.repair_graph().await.unwrap();
        assert_eq!(report.passes, 0);
        assert_eq!(report.nodes_repaired, 0);
    }
}
