//! Repeat group lookup.
//!
//! A group is one original and every Jingle repeating it. Starting from any
//! member, the root is the node itself when it has no outgoing edge, or the
//! target of its (earliest) outgoing edge otherwise.

use anyhow::{Context, Result};
use neo4rs::{Query, Row};
use serde::Serialize;

use crate::GraphClient;

/// A Jingle as shown in a repeat group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupMember {
    pub id: String,
    pub publication_date: Option<String>,
    pub created_at: Option<String>,
    /// Status of the member's edge to the root. `None` for the root.
    pub status: Option<String>,
}

/// An original and its repeats.
#[derive(Debug, Clone, Serialize)]
pub struct RepeatGroup {
    pub root: GroupMember,
    pub repeats: Vec<GroupMember>,
    /// Set when the root itself repeats something, i.e. the chain is not
    /// normalized yet.
    pub root_repeats: Option<String>,
}

/// Find the repeat group `id` belongs to. `None` when the Jingle is unknown.
pub async fn repeat_group(client: &GraphClient, id: &str) -> Result<Option<RepeatGroup>> {
    let root_query = Query::new(
        "MATCH (j:Jingle {id: $id})
         OPTIONAL MATCH (j)-[r:REPEATS]->(o:Jingle)
         WHERE o <> j
         WITH j, o, r ORDER BY r.created_at, o.id
         WITH j, collect(o)[0] AS original
         WITH coalesce(original, j) AS root
         OPTIONAL MATCH (root)-[:REPEATS]->(up:Jingle)
         WHERE up <> root
         RETURN root.id AS id, root.publication_date AS publication_date,
                root.created_at AS created_at, collect(up.id)[0] AS root_repeats"
            .to_string(),
    )
    .param("id", id);

    let rows = client.query(root_query).await?;
    let Some(row) = rows.into_iter().next() else {
        return Ok(None);
    };
    let root = member_from_row(&row, false)?;
    let root_repeats = optional_field(&row, &root.id, "root_repeats")?;

    let members_query = Query::new(
        "MATCH (m:Jingle)-[r:REPEATS]->(:Jingle {id: $root})
         WHERE m.id <> $root
         RETURN m.id AS id, m.publication_date AS publication_date,
                m.created_at AS created_at, r.status AS status
         ORDER BY m.publication_date, m.created_at, m.id"
            .to_string(),
    )
    .param("root", root.id.as_str());

    let repeats = client
        .query(members_query)
        .await?
        .iter()
        .map(|row| member_from_row(row, true))
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(RepeatGroup { root, repeats, root_repeats }))
}

fn member_from_row(row: &Row, with_status: bool) -> Result<GroupMember> {
    let id: String = row.get("id").context("Repeat group row has no readable Jingle id")?;
    let status = if with_status {
        optional_field(row, &id, "status")?
    } else {
        None
    };
    Ok(GroupMember {
        publication_date: optional_field(row, &id, "publication_date")?,
        created_at: optional_field(row, &id, "created_at")?,
        status,
        id,
    })
}

fn optional_field(row: &Row, id: &str, field: &str) -> Result<Option<String>> {
    row.get::<Option<String>>(field)
        .with_context(|| format!("Jingle {id}: field '{field}' is not a string"))
}
