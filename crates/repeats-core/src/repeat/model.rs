//! Repeat edge domain models.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Review state of a repeat edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeStatus {
    #[default]
    Draft,
    Approved,
    Rejected,
}

impl EdgeStatus {
    /// Parse from string.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            _ => Self::Draft,
        }
    }

    /// Convert to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// A stored `source -[:REPEATS]-> target` edge: source is a rerun of target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    pub status: EdgeStatus,
    pub created_at: DateTime<Utc>,
}

impl EdgeRecord {
    /// A fresh draft edge stamped now.
    pub fn draft(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            status: EdgeStatus::Draft,
            created_at: Utc::now(),
        }
    }

    pub fn edge_ref(&self) -> EdgeRef {
        EdgeRef::new(&self.source, &self.target)
    }
}

/// Identity of an edge: the ordered (source, target) pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeRef {
    pub source: String,
    pub target: String,
}

impl EdgeRef {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

impl fmt::Display for EdgeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

/// One edge mutation inside an all-or-nothing batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EdgeWrite {
    /// Merge `source -> target`; applied when the edge was new.
    Create {
        source: String,
        target: String,
        status: EdgeStatus,
    },
    /// Remove `source -> target`; applied when it existed.
    Delete { source: String, target: String },
    /// Swap `source -> old_target` for a fresh draft `source -> new_target`;
    /// applied when the old edge existed.
    Retarget {
        source: String,
        old_target: String,
        new_target: String,
    },
}

impl EdgeWrite {
    pub fn create(source: impl Into<String>, target: impl Into<String>, status: EdgeStatus) -> Self {
        Self::Create {
            source: source.into(),
            target: target.into(),
            status,
        }
    }

    pub fn delete(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::Delete {
            source: source.into(),
            target: target.into(),
        }
    }

    pub fn retarget(
        source: impl Into<String>,
        old_target: impl Into<String>,
        new_target: impl Into<String>,
    ) -> Self {
        Self::Retarget {
            source: source.into(),
            old_target: old_target.into(),
            new_target: new_target.into(),
        }
    }
}

impl fmt::Display for EdgeWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create { source, target, .. } => write!(f, "create {source} -> {target}"),
            Self::Delete { source, target } => write!(f, "delete {source} -> {target}"),
            Self::Retarget {
                source,
                old_target,
                new_target,
            } => write!(f, "retarget {source} -> {old_target} to {new_target}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!(EdgeStatus::from_str("APPROVED"), EdgeStatus::Approved);
        assert_eq!(EdgeStatus::from_str("rejected"), EdgeStatus::Rejected);
        assert_eq!(EdgeStatus::from_str("anything else"), EdgeStatus::Draft);
        assert_eq!(EdgeStatus::default().as_str(), "draft");
    }

    #[test]
    fn test_edge_ref_display() {
        let edge = EdgeRecord::draft("J6", "J4");
        assert_eq!(edge.edge_ref().to_string(), "J6 -> J4");
        assert_eq!(edge.status, EdgeStatus::Draft);
    }

    #[test]
    fn test_edge_write_display() {
        assert_eq!(EdgeWrite::delete("O", "S").to_string(), "delete O -> S");
        assert_eq!(EdgeWrite::retarget("O", "S", "T").to_string(), "retarget O -> S to T");
    }
}
