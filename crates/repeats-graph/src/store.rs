//! Neo4j-backed [`GraphStore`].
//!
//! Layout in the database:
//!
//! ```text
//! (:Jingle {id, publication_date, created_at})-[:REPEATS {status, created_at}]->(:Jingle)
//! ```
//!
//! Timestamps are RFC 3339 strings or bare dates; native Neo4j temporal
//! values are read too. A missing `publication_date` means the Jingle is
//! inedito. A value that is present but cannot be read is an error, never
//! a silent `None`.

use std::fmt::Display;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use neo4rs::{Query, Row, Txn};
use tracing::{debug, warn};

use repeats_core::jingle::parse_timestamp;
use repeats_core::{EdgeRecord, EdgeStatus, EdgeWrite, GraphStore, NodeRecord, StoreError, StoreResult};

use crate::GraphClient;

/// [`GraphStore`] over a Neo4j database.
#[derive(Clone)]
pub struct Neo4jGraphStore {
    client: GraphClient,
}

impl Neo4jGraphStore {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &GraphClient {
        &self.client
    }

    async fn rows(&self, query: Query) -> StoreResult<Vec<Row>> {
        self.client.query(query).await.map_err(unavailable)
    }

    async fn ids(&self, query: Query) -> StoreResult<Vec<String>> {
        self.rows(query)
            .await?
            .iter()
            .map(|row| required_string(row, "id", "node listing"))
            .collect()
    }

    async fn apply_one(&self, write: EdgeWrite) -> StoreResult<bool> {
        let applied = self.apply_writes(&[write]).await?;
        Ok(applied.first().copied().unwrap_or(false))
    }

    /// Name the node a write that matched nothing could not find.
    async fn missing_endpoint(&self, write: &EdgeWrite) -> StoreError {
        let required = match write {
            EdgeWrite::Create { source, target, .. } => vec![source, target],
            EdgeWrite::Retarget { new_target, .. } => vec![new_target],
            EdgeWrite::Delete { .. } => Vec::new(),
        };
        for id in required {
            if let Err(err) = self.get_node(id).await {
                return err;
            }
        }
        StoreError::Unavailable(format!("{write} returned no rows"))
    }
}

#[async_trait]
impl GraphStore for Neo4jGraphStore {
    async fn get_node(&self, id: &str) -> StoreResult<NodeRecord> {
        let query = Query::new(
            "MATCH (j:Jingle {id: $id})
             RETURN j.publication_date AS publication_date, j.created_at AS created_at
             LIMIT 1"
                .to_string(),
        )
        .param("id", id);

        let rows = self.rows(query).await?;
        let row = rows
            .first()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let context = format!("Jingle {id}");
        Ok(NodeRecord::new(
            id,
            optional_timestamp(row, "publication_date", &context)?,
            optional_timestamp(row, "created_at", &context)?,
        ))
    }

    async fn path_exists(&self, from: &str, to: &str) -> StoreResult<bool> {
        let query = Query::new(
            "MATCH (a:Jingle {id: $from}), (b:Jingle {id: $to})
             RETURN EXISTS { MATCH (a)-[:REPEATS*1..]->(b) } AS reachable"
                .to_string(),
        )
        .param("from", from)
        .param("to", to);

        let rows = self.rows(query).await?;
        let context = format!("path {from} -> {to}");
        match rows.first() {
            Some(row) => required_bool(row, "reachable", &context),
            None => Ok(false),
        }
    }

    async fn outgoing_edge(&self, id: &str) -> StoreResult<Option<EdgeRecord>> {
        let query = Query::new(
            "MATCH (j:Jingle {id: $id})-[r:REPEATS]->(t:Jingle)
             WHERE t <> j
             RETURN t.id AS target, r.status AS status, r.created_at AS created_at
             ORDER BY r.created_at, t.id
             LIMIT 1"
                .to_string(),
        )
        .param("id", id);

        let rows = self.rows(query).await?;
        rows.first()
            .map(|row| {
                let target = required_string(row, "target", &format!("edge from {id}"))?;
                edge_from_row(id, &target, row)
            })
            .transpose()
    }

    async fn incoming_edges(&self, id: &str) -> StoreResult<Vec<EdgeRecord>> {
        let query = Query::new(
            "MATCH (s:Jingle)-[r:REPEATS]->(j:Jingle {id: $id})
             WHERE s <> j
             RETURN s.id AS source, r.status AS status, r.created_at AS created_at
             ORDER BY s.id"
                .to_string(),
        )
        .param("id", id);

        let rows = self.rows(query).await?;
        rows.iter()
            .map(|row| {
                let source = required_string(row, "source", &format!("edge into {id}"))?;
                edge_from_row(&source, id, row)
            })
            .collect()
    }

    async fn edge(&self, source: &str, target: &str) -> StoreResult<Option<EdgeRecord>> {
        let query = Query::new(
            "MATCH (:Jingle {id: $source})-[r:REPEATS]->(:Jingle {id: $target})
             RETURN r.status AS status, r.created_at AS created_at
             ORDER BY r.created_at
             LIMIT 1"
                .to_string(),
        )
        .param("source", source)
        .param("target", target);

        let rows = self.rows(query).await?;
        rows.first()
            .map(|row| edge_from_row(source, target, row))
            .transpose()
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
        if writes.is_empty() {
            return Ok(Vec::new());
        }

        let mut txn = self.client.start_txn().await.map_err(unavailable)?;
        let created_at = now_stamp();
        let mut applied = Vec::with_capacity(writes.len());

        for write in writes {
            let outcome = match run_in_txn(&mut txn, write_query(write, &created_at)).await {
                Ok(rows) => write_outcome(write, &rows),
                Err(err) => Err(err),
            };
            match outcome {
                Ok(Some(changed)) => applied.push(changed),
                Ok(None) => {
                    rollback(txn, write).await;
                    return Err(self.missing_endpoint(write).await);
                }
                Err(err) => {
                    rollback(txn, write).await;
                    return Err(err);
                }
            }
        }

        txn.commit().await.map_err(neo4j_error)?;
        debug!(writes = writes.len(), "Committed REPEATS batch");
        Ok(applied)
    }

    async fn violating_nodes(&self) -> StoreResult<Vec<String>> {
        self.ids(Query::new(
            "MATCH (a:Jingle)-[:REPEATS]->(m:Jingle)-[:REPEATS]->(b:Jingle)
             WHERE a <> m AND b <> m
             RETURN DISTINCT m.id AS id
             ORDER BY id"
                .to_string(),
        ))
        .await
    }

    async fn self_loop_nodes(&self) -> StoreResult<Vec<String>> {
        self.ids(Query::new(
            "MATCH (j:Jingle)-[:REPEATS]->(j)
             RETURN DISTINCT j.id AS id
             ORDER BY id"
                .to_string(),
        ))
        .await
    }
}

/// Cypher for one batched write. Every statement returns at most one row
/// with a boolean `applied` column.
fn write_query(write: &EdgeWrite, created_at: &str) -> Query {
    match write {
        EdgeWrite::Create { source, target, status } => Query::new(
            "MATCH (s:Jingle {id: $source}), (t:Jingle {id: $target})
             OPTIONAL MATCH (s)-[existing:REPEATS]->(t)
             WITH s, t, count(existing) = 0 AS created
             MERGE (s)-[r:REPEATS]->(t)
             ON CREATE SET r.status = $status, r.created_at = $created_at
             RETURN created AS applied"
                .to_string(),
        )
        .param("source", source.as_str())
        .param("target", target.as_str())
        .param("status", status.as_str())
        .param("created_at", created_at),
        EdgeWrite::Delete { source, target } => Query::new(
            "OPTIONAL MATCH (:Jingle {id: $source})-[r:REPEATS]->(:Jingle {id: $target})
             DELETE r
             RETURN count(r) > 0 AS applied"
                .to_string(),
        )
        .param("source", source.as_str())
        .param("target", target.as_str()),
        EdgeWrite::Retarget {
            source,
            old_target,
            new_target,
        } => Query::new(
            "MATCH (n:Jingle {id: $new_target})
             OPTIONAL MATCH (s:Jingle {id: $source})-[old:REPEATS]->(:Jingle {id: $old_target})
             WITH n, s, collect(old) AS olds
             FOREACH (o IN olds | DELETE o)
             FOREACH (_ IN CASE WHEN size(olds) > 0 THEN [1] ELSE [] END |
                 MERGE (s)-[r:REPEATS]->(n)
                 SET r.status = $status, r.created_at = $created_at)
             RETURN size(olds) > 0 AS applied"
                .to_string(),
        )
        .param("source", source.as_str())
        .param("old_target", old_target.as_str())
        .param("new_target", new_target.as_str())
        .param("status", EdgeStatus::Draft.as_str())
        .param("created_at", created_at),
    }
}

/// `Some(changed)` for a decided write, `None` when a create or retarget
/// matched no endpoint node.
fn write_outcome(write: &EdgeWrite, rows: &[Row]) -> StoreResult<Option<bool>> {
    let context = write.to_string();
    match (rows.first(), write) {
        (Some(row), _) => required_bool(row, "applied", &context).map(Some),
        (None, EdgeWrite::Delete { .. }) => Ok(Some(false)),
        (None, _) => Ok(None),
    }
}

async fn run_in_txn(txn: &mut Txn, query: Query) -> StoreResult<Vec<Row>> {
    let mut stream = txn.execute(query).await.map_err(neo4j_error)?;
    let mut rows = Vec::new();
    while let Some(row) = stream.next(txn.handle()).await.map_err(neo4j_error)? {
        rows.push(row);
    }
    Ok(rows)
}

async fn rollback(txn: Txn, failed: &EdgeWrite) {
    if let Err(err) = txn.rollback().await {
        warn!(write = %failed, error = %err, "Rollback of REPEATS batch failed");
    }
}

fn unavailable(err: anyhow::Error) -> StoreError {
    StoreError::Unavailable(format!("{err:#}"))
}

fn neo4j_error(err: neo4rs::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

fn invalid(context: &str, field: &str, detail: impl Display) -> StoreError {
    StoreError::InvalidData(format!("{context}: field '{field}' {detail}"))
}

fn now_stamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn required_string(row: &Row, field: &str, context: &str) -> StoreResult<String> {
    row.get::<String>(field)
        .map_err(|e| invalid(context, field, format_args!("is not a string: {e}")))
}

fn optional_string(row: &Row, field: &str, context: &str) -> StoreResult<Option<String>> {
    row.get::<Option<String>>(field)
        .map_err(|e| invalid(context, field, format_args!("is not a string: {e}")))
}

fn required_bool(row: &Row, field: &str, context: &str) -> StoreResult<bool> {
    row.get::<bool>(field)
        .map_err(|e| invalid(context, field, format_args!("is not a boolean: {e}")))
}

/// Read a timestamp stored as a string or as a native temporal value.
fn optional_timestamp(row: &Row, field: &str, context: &str) -> StoreResult<Option<DateTime<Utc>>> {
    if let Ok(raw) = row.get::<Option<String>>(field) {
        return decode_timestamp(raw.as_deref(), field, context);
    }
    if let Ok(ts) = row.get::<DateTime<FixedOffset>>(field) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }
    if let Ok(local) = row.get::<NaiveDateTime>(field) {
        return Ok(Some(local.and_utc()));
    }
    if let Ok(date) = row.get::<NaiveDate>(field) {
        return Ok(date.and_hms_opt(0, 0, 0).map(|midnight| midnight.and_utc()));
    }
    Err(invalid(context, field, "is neither a timestamp string nor a temporal value"))
}

/// Blank or absent strings read as `None`; anything else must parse.
fn decode_timestamp(raw: Option<&str>, field: &str, context: &str) -> StoreResult<Option<DateTime<Utc>>> {
    match raw {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => parse_timestamp(value)
            .map(Some)
            .ok_or_else(|| invalid(context, field, format_args!("has unreadable timestamp {value:?}"))),
    }
}

fn edge_from_row(source: &str, target: &str, row: &Row) -> StoreResult<EdgeRecord> {
    let context = format!("edge {source} -> {target}");
    let status = optional_string(row, "status", &context)?;
    let created_at = optional_timestamp(row, "created_at", &context)?;
    Ok(edge_from_parts(source, target, status.as_deref(), created_at))
}

/// Build an edge from stored properties. Edges imported without a
/// `created_at` sort first, as if created at the epoch.
fn edge_from_parts(
    source: &str,
    target: &str,
    status: Option<&str>,
    created_at: Option<DateTime<Utc>>,
) -> EdgeRecord {
    EdgeRecord {
        source: source.to_string(),
        target: target.to_string(),
        status: status.map(EdgeStatus::from_str).unwrap_or_default(),
        created_at: created_at.unwrap_or_default(),
    }
}
