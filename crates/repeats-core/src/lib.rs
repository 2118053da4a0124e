//! Repeats Core Library
//!
//! Domain models and the repeat-relationship consistency engine for the
//! Jingle catalog.
//!
//! A Jingle that is re-aired verbatim is linked to the Jingle it repeats by a
//! directed `REPEATS` edge. The engine decides the orientation of every edge,
//! refuses edges that would close a cycle, and keeps every repeat group shaped
//! as a star: each repeat points directly at the one original.

pub mod config;
pub mod engine;
pub mod error;
pub mod jingle;
pub mod repeat;
pub mod store;

pub use config::EngineConfig;
pub use engine::RepeatEngine;
pub use error::{RepeatError, RepeatResult};
pub use jingle::model::{NodeRecord, Publication};
pub use repeat::model::{EdgeRecord, EdgeRef, EdgeStatus, EdgeWrite};
pub use store::{GraphStore, MemoryGraphStore, StoreError, StoreResult};
