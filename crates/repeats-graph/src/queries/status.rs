//! Repeat graph counters.

use anyhow::Result;
use neo4rs::Query;
use serde::Serialize;

use crate::GraphClient;

/// Node and edge totals plus the number of nodes breaking the star shape.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepeatCounts {
    pub jingles: i64,
    pub repeat_edges: i64,
    pub violating_nodes: i64,
    pub self_loops: i64,
}

impl RepeatCounts {
    pub fn is_consistent(&self) -> bool {
        self.violating_nodes == 0 && self.self_loops == 0
    }
}

/// Count Jingles, `REPEATS` edges, and nodes that are both repeat and original.
pub async fn repeat_counts(client: &GraphClient) -> Result<RepeatCounts> {
    let jingles = client
        .query_scalar::<i64>(
            Query::new("MATCH (j:Jingle) RETURN count(j) AS count".to_string()),
            "count",
        )
        .await?
        .unwrap_or(0);

    let repeat_edges = client
        .query_scalar::<i64>(
            Query::new("MATCH (:Jingle)-[r:REPEATS]->(:Jingle) RETURN count(r) AS count".to_string()),
            "count",
        )
        .await?
        .unwrap_or(0);

    let violating_nodes = client
        .query_scalar::<i64>(
            Query::new(
                "MATCH (a:Jingle)-[:REPEATS]->(m:Jingle)-[:REPEATS]->(b:Jingle)
                 WHERE a <> m AND b <> m
                 RETURN count(DISTINCT m) AS count"
                    .to_string(),
            ),
            "count",
        )
        .await?
        .unwrap_or(0);

    let self_loops = client
        .query_scalar::<i64>(
            Query::new("MATCH (j:Jingle)-[r:REPEATS]->(j) RETURN count(r) AS count".to_string()),
            "count",
        )
        .await?
        .unwrap_or(0);

    Ok(RepeatCounts {
        jingles,
        repeat_edges,
        violating_nodes,
        self_loops,
    })
}
