//! Neo4j schema initialization (constraints and indexes).

use anyhow::Result;
use neo4rs::Query;
use tracing::info;

use crate::GraphClient;

/// Cypher statements for schema initialization.
const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE CONSTRAINT jingle_id IF NOT EXISTS FOR (j:Jingle) REQUIRE j.id IS UNIQUE",
    "CREATE INDEX jingle_publication_date IF NOT EXISTS FOR (j:Jingle) ON (j.publication_date)",
    "CREATE INDEX repeats_status IF NOT EXISTS FOR ()-[r:REPEATS]-() ON (r.status)",
];

/// Initialize Neo4j schema with constraints and indexes.
///
/// Safe to run multiple times - uses IF NOT EXISTS clauses.
pub async fn initialize_schema(client: &GraphClient) -> Result<()> {
    info!("Initializing Neo4j schema...");

    for statement in SCHEMA_STATEMENTS {
        client.execute(Query::new(statement.to_string())).await?;
    }

    info!("Neo4j schema initialized ({} statements)", SCHEMA_STATEMENTS.len());
    Ok(())
}
