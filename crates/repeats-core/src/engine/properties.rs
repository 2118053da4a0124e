//! Randomised checks of the graph invariants.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use super::RepeatEngine;
use crate::error::RepeatError;
use crate::jingle::model::NodeRecord;
use crate::store::{GraphStore, MemoryGraphStore};

const NODES: usize = 8;

fn id(i: usize) -> String {
    format!("J{i}")
}

/// Publication and creation offsets in days; `None` publication is Inedito.
fn arb_nodes() -> impl Strategy<Value = Vec<(Option<i64>, i64)>> {
    proptest::collection::vec((proptest::option::of(0i64..6), 0i64..6), NODES)
}

fn arb_proposals() -> impl Strategy<Value = Vec<(usize, usize)>> {
    proptest::collection::vec((0..NODES, 0..NODES), 1..24)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

async fn seeded(nodes: &[(Option<i64>, i64)]) -> Arc<MemoryGraphStore> {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let store = Arc::new(MemoryGraphStore::new());
    for (i, (published, created)) in nodes.iter().enumerate() {
        store
            .insert_node(NodeRecord::new(
                id(i),
                published.map(|d| base + Duration::days(d)),
                Some(base - Duration::days(30) + Duration::days(*created)),
            ))
            .await;
    }
    store
}

async fn has_cycle(store: &MemoryGraphStore) -> bool {
    for i in 0..NODES {
        if store.path_exists(&id(i), &id(i)).await.unwrap() {
            return true;
        }
    }
    false
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_proposals_keep_invariants(nodes in arb_nodes(), proposals in arb_proposals()) {
        runtime().block_on(async {
            let store = seeded(&nodes).await;
            let engine = RepeatEngine::new(store.clone());

            for (a, b) in proposals {
                match engine.propose_repeat(&id(a), &id(b)).await {
                    Ok(_) => {}
                    Err(RepeatError::SelfRepeat(_)) => prop_assert_eq!(a, b),
                    Err(RepeatError::CycleConflict { .. }) => {}
                    Err(e) => prop_assert!(false, "unexpected error: {e}"),
                }

                prop_assert!(store.self_loop_nodes().await.unwrap().is_empty());
                prop_assert!(store.violating_nodes().await.unwrap().is_empty());
                prop_assert!(!has_cycle(&store).await);
            }
            Ok::<(), TestCaseError>(())
        })?;
    }

    #[test]
    fn prop_normalize_twice_is_noop(nodes in arb_nodes(), proposals in arb_proposals()) {
        runtime().block_on(async {
            let store = seeded(&nodes).await;
            let engine = RepeatEngine::new(store.clone());

            for (a, b) in proposals {
                let Ok(outcome) = engine.propose_repeat(&id(a), &id(b)).await else {
                    continue;
                };
                let again = engine.normalize(&outcome.source, &outcome.target).await.unwrap();
                prop_assert!(again.is_empty());
            }
            Ok::<(), TestCaseError>(())
        })?;
    }
}
