//! Engine outcome models.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::repeat::model::{EdgeRef, EdgeWrite};

/// Which orientation rule decided a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionRule {
    /// Both published; the later publication is the repeat.
    BothPublished,
    /// Both published on the same instant; proposed orientation kept.
    BothPublishedTie,
    /// Exactly one published; the Inedito is the repeat.
    IneditoIsRepeat,
    /// Neither published; the later-created Jingle is the repeat.
    CreatedAtOrder,
    /// Neither published, created at the same instant; proposed orientation kept.
    CreatedAtTie,
    /// Neither published and a creation time is missing; proposed orientation kept.
    MissingCreatedAt,
}

impl DirectionRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BothPublished => "both_published",
            Self::BothPublishedTie => "both_published_tie",
            Self::IneditoIsRepeat => "inedito_is_repeat",
            Self::CreatedAtOrder => "created_at_order",
            Self::CreatedAtTie => "created_at_tie",
            Self::MissingCreatedAt => "missing_created_at",
        }
    }

    /// Whether the outcome depended on the caller's argument order.
    pub fn kept_proposal(&self) -> bool {
        matches!(
            self,
            Self::BothPublishedTie | Self::CreatedAtTie | Self::MissingCreatedAt
        )
    }
}

/// Resolved orientation of a proposed pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// The repeat.
    pub source: String,
    /// The original.
    pub target: String,
    /// Whether the orientation differs from the proposal.
    pub corrected: bool,
    pub rule: DirectionRule,
    /// Rule fired and the compared values, for audit logs.
    pub reason: String,
}

impl Resolution {
    /// No date could order the pair.
    pub fn is_ambiguous(&self) -> bool {
        self.rule == DirectionRule::MissingCreatedAt
    }
}

/// Edges changed by one normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Normalization {
    pub deleted_edges: Vec<EdgeRef>,
    pub updated_edges: Vec<EdgeRef>,
}

impl Normalization {
    pub fn is_empty(&self) -> bool {
        self.deleted_edges.is_empty() && self.updated_edges.is_empty()
    }

    pub fn merge(&mut self, other: Normalization) {
        self.deleted_edges.extend(other.deleted_edges);
        self.updated_edges.extend(other.updated_edges);
    }

    /// Edges a batch actually changed. `applied` is the store's per-write
    /// result; writes that found nothing to change are left out, and so
    /// are creates.
    pub fn from_applied(writes: &[EdgeWrite], applied: &[bool]) -> Self {
        let mut report = Self::default();
        for (write, _) in writes.iter().zip(applied).filter(|(_, ok)| **ok) {
            match write {
                EdgeWrite::Create { .. } => {}
                EdgeWrite::Delete { source, target } => {
                    report.deleted_edges.push(EdgeRef::new(source, target));
                }
                EdgeWrite::Retarget {
                    source,
                    old_target,
                    new_target,
                } => {
                    report.deleted_edges.push(EdgeRef::new(source, old_target));
                    report.updated_edges.push(EdgeRef::new(source, new_target));
                }
            }
        }
        report
    }
}

/// Everything `propose_repeat` did, for audit logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposeOutcome {
    pub operation_id: Uuid,
    pub source: String,
    pub target: String,
    pub corrected: bool,
    pub rule: DirectionRule,
    pub reason: String,
    /// Orientation fell back to the proposal because no date could decide it.
    pub ambiguous: bool,
    /// Whether the resolved edge was new (false when it was only confirmed).
    pub created: bool,
    pub deleted_edges: Vec<EdgeRef>,
    pub updated_edges: Vec<EdgeRef>,
}

/// Summary of a full-graph repair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairReport {
    pub passes: u32,
    pub self_loops_removed: Vec<String>,
    pub nodes_repaired: usize,
    pub deleted_edges: Vec<EdgeRef>,
    pub updated_edges: Vec<EdgeRef>,
    /// Nodes sitting on a cycle; left untouched for manual review.
    pub conflicts: Vec<String>,
}

impl RepairReport {
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}
