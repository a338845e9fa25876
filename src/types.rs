//! Core types for the record store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a record.
///
/// Backed by a UUID v7, so identifiers sort by creation time.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub Uuid);

impl RecordId {
    /// Generate a fresh time-ordered identifier.
    pub fn generate() -> Self {
        RecordId(Uuid::now_v7())
    }

    /// Parse an identifier from its textual form.
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(RecordId)
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(RecordId)
    }
}

/// A single stored (identifier, payload) pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    /// Opaque payload, replaced wholesale on update.
    pub raw: Vec<u8>,
}

/// Kind of mutation a change event describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::Updated => "updated",
            ChangeKind::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification produced once per successful mutation.
///
/// The identifier is kept in text form: a delete names whatever id the
/// caller passed, which need not be one this store could have issued.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub id: String,
    /// Empty for deletions.
    pub raw: Vec<u8>,
}

impl ChangeEvent {
    pub fn created(id: RecordId, raw: Vec<u8>) -> Self {
        Self {
            kind: ChangeKind::Created,
            id: id.to_string(),
            raw,
        }
    }

    pub fn updated(id: RecordId, raw: Vec<u8>) -> Self {
        Self {
            kind: ChangeKind::Updated,
            id: id.to_string(),
            raw,
        }
    }

    pub fn deleted(id: RecordId) -> Self {
        Self::deleted_str(id.to_string())
    }

    /// Deletion of an identifier given in text form.
    pub fn deleted_str(id: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Deleted,
            id: id.into(),
            raw: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The identifier as a [`RecordId`], if it is one.
    pub fn record_id(&self) -> Option<RecordId> {
        RecordId::parse(&self.id)
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}
