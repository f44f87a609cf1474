use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::source::SourceDocument;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Insert,
    Update,
    Replace,
    Delete,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Replace => "replace",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

impl FromStr for OperationType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "insert" => Ok(Self::Insert),
            "update" => Ok(Self::Update),
            "replace" => Ok(Self::Replace),
            "delete" => Ok(Self::Delete),
            _ => Err(()),
        }
    }
}

/// One observed mutation on the source collection. Ephemeral: never
/// persisted beyond the resume token it advances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub operation: OperationType,
    pub document_key: String,
    /// Present for insert/update/replace when the feed could resolve the
    /// document; a fallback fetch by key covers the rest.
    #[serde(default)]
    pub full_document: Option<SourceDocument>,
    /// Pre-delete state, only when the source retains pre-images.
    #[serde(default)]
    pub pre_image: Option<SourceDocument>,
}

impl ChangeEvent {
    pub fn new(operation: OperationType, document_key: impl Into<String>) -> Self {
        Self {
            operation,
            document_key: document_key.into(),
            full_document: None,
            pre_image: None,
        }
    }

    pub fn insert(document_key: impl Into<String>, doc: SourceDocument) -> Self {
        Self::new(OperationType::Insert, document_key).with_document(doc)
    }

    pub fn update(document_key: impl Into<String>, doc: SourceDocument) -> Self {
        Self::new(OperationType::Update, document_key).with_document(doc)
    }

    pub fn replace(document_key: impl Into<String>, doc: SourceDocument) -> Self {
        Self::new(OperationType::Replace, document_key).with_document(doc)
    }

    pub fn delete(document_key: impl Into<String>) -> Self {
        Self::new(OperationType::Delete, document_key)
    }

    pub fn with_document(mut self, doc: SourceDocument) -> Self {
        self.full_document = Some(doc);
        self
    }

    pub fn with_pre_image(mut self, doc: SourceDocument) -> Self {
        self.pre_image = Some(doc);
        self
    }
}

/// Opaque position marker in the mutation feed. The concrete shape belongs
/// to the feed implementation; the rest of the pipeline only stores and
/// replays it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResumeToken(pub serde_json::Value);

impl ResumeToken {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn from_id(id: impl Into<String>) -> Self {
        Self(serde_json::Value::String(id.into()))
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_str()
    }
}
