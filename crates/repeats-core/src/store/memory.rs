//! In-memory graph store for tests and dry runs.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{GraphStore, StoreError, StoreResult};
use crate::jingle::model::NodeRecord;
use crate::repeat::model::{EdgeRecord, EdgeRef, EdgeStatus, EdgeWrite};

#[derive(Clone, Default)]
struct MemoryGraph {
    nodes: BTreeMap<String, NodeRecord>,
    edges: BTreeMap<EdgeRef, EdgeRecord>,
}

#[derive(Default)]
struct Faults {
    unavailable: bool,
    writes_left: Option<usize>,
}

/// Graph store kept entirely in process memory.
///
/// Supports fault injection so callers can observe how the engine behaves
/// when the store drops out mid-operation. Every single write inside a
/// batch counts against the write budget, so a batch can fail halfway.
#[derive(Default)]
pub struct MemoryGraphStore {
    graph: RwLock<MemoryGraph>,
    faults: RwLock<Faults>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a Jingle.
    pub async fn insert_node(&self, node: NodeRecord) {
        self.graph.write().await.nodes.insert(node.id.clone(), node);
    }

    /// Insert an edge verbatim, bypassing every engine rule.
    ///
    /// Used to seed fixtures and to simulate out-of-band imports.
    pub async fn insert_edge(&self, edge: EdgeRecord) {
        self.graph.write().await.edges.insert(edge.edge_ref(), edge);
    }

    /// Snapshot of every edge, ordered by (source, target).
    pub async fn edges(&self) -> Vec<EdgeRecord> {
        self.graph.read().await.edges.values().cloned().collect()
    }

    /// Snapshot of every edge identity, ordered by (source, target).
    pub async fn edge_refs(&self) -> Vec<EdgeRef> {
        self.graph.read().await.edges.keys().cloned().collect()
    }

    /// Make every subsequent call fail with `Unavailable`.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.faults.write().await.unavailable = unavailable;
    }

    /// Allow `writes` more successful writes, then fail every write.
    pub async fn fail_writes_after(&self, writes: usize) {
        self.faults.write().await.writes_left = Some(writes);
    }

    /// Clear all injected faults.
    pub async fn heal(&self) {
        *self.faults.write().await = Faults::default();
    }

    async fn check_read(&self) -> StoreResult<()> {
        if self.faults.read().await.unavailable {
            return Err(StoreError::Unavailable("memory store marked unavailable".to_string()));
        }
        Ok(())
    }

    async fn check_write(&self) -> StoreResult<()> {
        let mut faults = self.faults.write().await;
        if faults.unavailable {
            return Err(StoreError::Unavailable("memory store marked unavailable".to_string()));
        }
        if let Some(left) = faults.writes_left.as_mut() {
            if *left == 0 {
                return Err(StoreError::Unavailable("memory store write budget exhausted".to_string()));
            }
            *left -= 1;
        }
        Ok(())
    }

    async fn apply_one(&self, write: EdgeWrite) -> StoreResult<bool> {
        let applied = self.apply_writes(&[write]).await?;
        Ok(applied.first().copied().unwrap_or(false))
    }
}

impl MemoryGraph {
    /// Every edge leaving `id`, self-loops included.
    fn edges_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a EdgeRecord> + 'a {
        self.edges.values().filter(move |e| e.source == id)
    }

    fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a EdgeRecord> + 'a {
        self.edges_from(id).filter(move |e| e.target != id)
    }

    fn incoming<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a EdgeRecord> + 'a {
        self.edges.values().filter(move |e| e.target == id && e.source != id)
    }

    fn require_node(&self, id: &str) -> StoreResult<()> {
        if self.nodes.contains_key(id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(id.to_string()))
        }
    }

    fn apply(&mut self, write: &EdgeWrite) -> StoreResult<bool> {
        match write {
            EdgeWrite::Create { source, target, status } => {
                self.require_node(source)?;
                self.require_node(target)?;
                let key = EdgeRef::new(source, target);
                if self.edges.contains_key(&key) {
                    return Ok(false);
                }
                self.edges.insert(
                    key,
                    EdgeRecord {
                        source: source.clone(),
                        target: target.clone(),
                        status: *status,
                        created_at: Utc::now(),
                    },
                );
                Ok(true)
            }
            EdgeWrite::Delete { source, target } => {
                Ok(self.edges.remove(&EdgeRef::new(source, target)).is_some())
            }
            EdgeWrite::Retarget {
                source,
                old_target,
                new_target,
            } => {
                self.require_node(new_target)?;
                if self.edges.remove(&EdgeRef::new(source, old_target)).is_none() {
                    return Ok(false);
                }
                let edge = EdgeRecord::draft(source, new_target);
                self.edges.insert(edge.edge_ref(), edge);
                Ok(true)
            }
        }
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn get_node(&self, id: &str) -> StoreResult<NodeRecord> {
        self.check_read().await?;
        self.graph
            .read()
            .await
            .nodes
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn path_exists(&self, from: &str, to: &str) -> StoreResult<bool> {
        self.check_read().await?;
        let graph = self.graph.read().await;

        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([from.to_string()]);
        while let Some(current) = queue.pop_front() {
            for edge in graph.edges_from(&current) {
                if edge.target == to {
                    return Ok(true);
                }
                if seen.insert(edge.target.clone()) {
                    queue.push_back(edge.target.clone());
                }
            }
        }
        Ok(false)
    }

    async fn outgoing_edge(&self, id: &str) -> StoreResult<Option<EdgeRecord>> {
        self.check_read().await?;
        let graph = self.graph.read().await;
        Ok(graph
            .outgoing(id)
            .min_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.target.cmp(&b.target)))
            .cloned())
    }

    async fn incoming_edges(&self, id: &str) -> StoreResult<Vec<EdgeRecord>> {
        self.check_read().await?;
        // BTreeMap keys order by source first, so this is already sorted.
        Ok(self.graph.read().await.incoming(id).cloned().collect())
    }

    async fn edge(&self, source: &str, target: &str) -> StoreResult<Option<EdgeRecord>> {
        self.check_read().await?;
        Ok(self
            .graph
            .read()
            .await
            .edges
            .get(&EdgeRef::new(source, target))
            .cloned())
    }

    async fn create_edge(&self, source: &str, target: &str, status: EdgeStatus) -> StoreResult<bool> {
        self.apply_one(EdgeWrite::create(source, target, status)).await
    }

    async fn delete_edge(&self, source: &str, target: &str) -> StoreResult<bool> {
        self.apply_one(EdgeWrite::delete(source, target)).await
    }

    async fn retarget_edge(
        &self,
        source: &str,
        old_target: &str,
        new_target: &str,
    ) -> StoreResult<Option<EdgeRecord>> {
        if !self.apply_one(EdgeWrite::retarget(source, old_target, new_target)).await? {
            return Ok(None);
        }
        self.edge(source, new_target).await
    }

    async fn apply_writes(&self, writes: &[EdgeWrite]) -> StoreResult<Vec<bool>> {
        let mut graph = self.graph.write().await;
        let mut staged = graph.clone();

        let mut applied = Vec::with_capacity(writes.len());
        for write in writes {
            self.check_write().await?;
            applied.push(staged.apply(write)?);
        }

        *graph = staged;
        Ok(applied)
    }

    async fn violating_nodes(&self) -> StoreResult<Vec<String>> {
        self.check_read().await?;
        let graph = self.graph.read().await;
        let linked = graph.edges.keys().filter(|k| k.source != k.target);
        let (sources, targets): (BTreeSet<&str>, BTreeSet<&str>) =
            linked.map(|k| (k.source.as_str(), k.target.as_str())).unzip();
        Ok(sources
            .intersection(&targets)
            .map(|id| id.to_string())
            .collect())
    }

    async fn self_loop_nodes(&self) -> StoreResult<Vec<String>> {
        self.check_read().await?;
        Ok(self
            .graph
            .read()
            .await
            .edges
            .keys()
            .filter(|k| k.source == k.target)
            .map(|k| k.source.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with(ids: &[&str]) -> MemoryGraphStore {
        let store = MemoryGraphStore::new();
        for id in ids {
            store.insert_node(NodeRecord::inedito(*id, Some(Utc::now()))).await;
        }
        store
    }

    #[tokio::test]
    async fn test_get_missing_node() {
        let store = store_with(&["J1"]).await;
        assert!(store.get_node("J1").await.is_ok());
        assert_eq!(
            store.get_node("J9").await,
            Err(StoreError::NotFound("J9".to_string()))
        );
    }

    #[tokio::test]
    async fn test_create_edge_is_idempotent() {
        let store = store_with(&["J1", "J2"]).await;
        assert!(store.create_edge("J2", "J1", EdgeStatus::Draft).await.unwrap());
        assert!(!store.create_edge("J2", "J1", EdgeStatus::Approved).await.unwrap());
        assert_eq!(store.edges().await.len(), 1);
        assert_eq!(store.edges().await[0].status, EdgeStatus::Draft);
    }

    #[tokio::test]
    async fn test_path_exists_follows_chains() {
        let store = store_with(&["A", "B", "C", "D"]).await;
        store.insert_edge(EdgeRecord::draft("A", "B")).await;
        store.insert_edge(EdgeRecord::draft("B", "C")).await;

        assert!(store.path_exists("A", "C").await.unwrap());
        assert!(!store.path_exists("C", "A").await.unwrap());
        assert!(!store.path_exists("A", "D").await.unwrap());
    }

    #[tokio::test]
    async fn test_retarget_replaces_atomically() {
        let store = store_with(&["A", "B", "C"]).await;
        let mut approved = EdgeRecord::draft("A", "B");
        approved.status = EdgeStatus::Approved;
        store.insert_edge(approved).await;

        let edge = store.retarget_edge("A", "B", "C").await.unwrap().unwrap();
        assert_eq!(edge.status, EdgeStatus::Draft);
        assert_eq!(store.edge_refs().await, vec![EdgeRef::new("A", "C")]);

        // Old edge is gone now, so a second retarget writes nothing.
        assert_eq!(store.retarget_edge("A", "B", "C").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_violating_and_self_loops() {
        let store = store_with(&["A", "B", "C", "X"]).await;
        store.insert_edge(EdgeRecord::draft("A", "B")).await;
        store.insert_edge(EdgeRecord::draft("B", "C")).await;
        store.insert_edge(EdgeRecord::draft("C", "C")).await;
        store.insert_edge(EdgeRecord::draft("X", "X")).await;

        // A self-loop is neither an inbound nor an outbound link.
        assert_eq!(store.violating_nodes().await.unwrap(), vec!["B"]);
        assert_eq!(store.self_loop_nodes().await.unwrap(), vec!["C", "X"]);
        assert_eq!(store.outgoing_edge("C").await.unwrap(), None);
        assert!(store.incoming_edges("X").await.unwrap().is_empty());
        assert!(store.path_exists("X", "X").await.unwrap());
    }

    #[tokio::test]
    async fn test_batch_reports_each_write() {
        let store = store_with(&["A", "B", "C"]).await;
        store.insert_edge(EdgeRecord::draft("A", "B")).await;

        let applied = store
            .apply_writes(&[
                EdgeWrite::create("B", "C", EdgeStatus::Draft),
                EdgeWrite::retarget("A", "B", "C"),
                EdgeWrite::delete("A", "B"),
            ])
            .await
            .unwrap();
        assert_eq!(applied, vec![true, true, false]);
        assert_eq!(store.edge_refs().await, vec![EdgeRef::new("A", "C"), EdgeRef::new("B", "C")]);
    }

    #[tokio::test]
    async fn test_batch_failure_keeps_nothing() {
        let store = store_with(&["A", "B", "C"]).await;
        store.insert_edge(EdgeRecord::draft("A", "B")).await;
        store.fail_writes_after(1).await;

        let result = store
            .apply_writes(&[
                EdgeWrite::create("B", "C", EdgeStatus::Draft),
                EdgeWrite::retarget("A", "B", "C"),
            ])
            .await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(store.edge_refs().await, vec![EdgeRef::new("A", "B")]);

        // A missing endpoint halfway through also discards earlier writes.
        store.heal().await;
        let result = store
            .apply_writes(&[
                EdgeWrite::create("B", "C", EdgeStatus::Draft),
                EdgeWrite::create("B", "NOPE", EdgeStatus::Draft),
            ])
            .await;
        assert_eq!(result, Err(StoreError::NotFound("NOPE".to_string())));
        assert_eq!(store.edge_refs().await, vec![EdgeRef::new("A", "B")]);
    }

    #[tokio::test]
    async fn test_write_budget() {
        let store = store_with(&["A", "B", "C"]).await;
        store.fail_writes_after(1).await;

        assert!(store.create_edge("A", "B", EdgeStatus::Draft).await.is_ok());
        assert!(matches!(
            store.create_edge("A", "C", EdgeStatus::Draft).await,
            Err(StoreError::Unavailable(_))
        ));
        // Reads still work.
        assert!(store.edge("A", "B").await.unwrap().is_some());

        store.heal().await;
        assert!(store.create_edge("A", "C", EdgeStatus::Draft).await.is_ok());
    }
}
