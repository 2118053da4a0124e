//! Read-only catalog queries over the repeat graph.

pub mod groups;
pub mod status;
