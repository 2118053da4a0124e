//! Jingle domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Publication state of a Jingle.
///
/// A Jingle inherits its publication date from the Fabrica it primarily airs
/// in. Until then it is *Inedito*.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "date", rename_all = "snake_case")]
pub enum Publication {
    Published(DateTime<Utc>),
    Inedito,
}

impl Publication {
    /// Build from an optional publication date.
    pub fn from_date(date: Option<DateTime<Utc>>) -> Self {
        match date {
            Some(date) => Self::Published(date),
            None => Self::Inedito,
        }
    }

    pub fn date(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Published(date) => Some(*date),
            Self::Inedito => None,
        }
    }

    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published(_))
    }
}

/// A Jingle node as seen by the repeat engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    pub publication: Publication,
    /// Node creation time. Legacy imports may lack it.
    pub created_at: Option<DateTime<Utc>>,
}

impl NodeRecord {
    pub fn new(
        id: impl Into<String>,
        publication_date: Option<DateTime<Utc>>,
        created_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: id.into(),
            publication: Publication::from_date(publication_date),
            created_at,
        }
    }

    /// A Jingle already tied to a published Fabrica.
    pub fn published(id: impl Into<String>, date: DateTime<Utc>, created_at: DateTime<Utc>) -> Self {
        Self::new(id, Some(date), Some(created_at))
    }

    /// An unreleased Jingle.
    pub fn inedito(id: impl Into<String>, created_at: Option<DateTime<Utc>>) -> Self {
        Self::new(id, None, created_at)
    }

    pub fn publication_date(&self) -> Option<DateTime<Utc>> {
        self.publication.date()
    }
}
