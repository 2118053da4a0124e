//! # Repeats Graph
//!
//! Neo4j storage for the Jingle repeat catalog.
//!
//! Provides the Bolt connection client, schema initialization, the
//! [`Neo4jGraphStore`] the engine runs against, and read-only catalog
//! queries.

pub mod client;
pub mod queries;
pub mod schema;
pub mod store;

pub use client::{GraphClient, GraphConfig};
pub use queries::groups::{repeat_group, GroupMember, RepeatGroup};
pub use queries::status::{repeat_counts, RepeatCounts};
pub use store::Neo4jGraphStore;
