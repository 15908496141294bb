use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// --- Domain Errors ---
#[derive(Error, Debug, PartialEq)]
pub enum DomainError {
    #[error("Invalid document id '{0}': must not be empty")]
    InvalidDocumentId(String),
}

// --- Document ID ---

/// Key under which a document is stored. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId(String);

impl DocumentId {
    /// Creates a fresh random id (UUID v4).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DocumentId {
    type Error = DomainError;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        if id.is_empty() {
            return Err(DomainError::InvalidDocumentId(id));
        }
        Ok(Self(id))
    }
}

impl FromStr for DocumentId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_string())
    }
}

impl From<DocumentId> for String {
    fn from(doc_id: DocumentId) -> Self {
        doc_id.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// --- Author ---

/// Identity reference embedded in a document. Not stored on its own.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: String,
    pub name: String,
}

impl Author {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

// --- Document ---

/// A stored record. The id stays empty until the document is first saved.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Document {
    #[serde(default)]
    id: String,
    title: String,
    content: String,
    author: Author,
    created: DateTime<Utc>,
}

impl Document {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        author: Author,
        created: DateTime<Utc>,
    ) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            content: content.into(),
            author,
            created,
        }
    }

    /// Sets an explicit id. An empty id is replaced on save.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Returns the storage key, generating and recording a fresh id first if
    /// the document has none.
    pub fn ensure_id(&mut self) -> DocumentId {
        if self.id.is_empty() {
            self.id = DocumentId::generate().into();
        }
        DocumentId(self.id.clone())
    }

    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn title(&self) -> &str {
        &self.title
    }
    pub fn content(&self) -> &str {
        &self.content
    }
    pub fn author(&self) -> &Author {
        &self.author
    }
    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }
}

// --- Search Request ---

/// Filter set for a search. Absent filters impose no constraint; all present
/// filters must pass. Within a multi-value filter one hit is enough.
///
/// A filter that is present but empty matches nothing.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SearchRequest {
    #[serde(default)]
    pub title_prefixes: Option<Vec<String>>,
    #[serde(default)]
    pub contains_contents: Option<Vec<String>>,
    #[serde(default)]
    pub author_ids: Option<Vec<String>>,
    #[serde(default)]
    pub created_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_to: Option<DateTime<Utc>>,
}

impl SearchRequest {
    pub fn with_title_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.title_prefixes = Some(prefixes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_contains_contents<I, S>(mut self, needles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.contains_contents = Some(needles.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_author_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.author_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_created_from(mut self, from: DateTime<Utc>) -> Self {
        self.created_from = Some(from);
        self
    }

    pub fn with_created_to(mut self, to: DateTime<Utc>) -> Self {
        self.created_to = Some(to);
        self
    }

    /// True when no filter is set, i.e. every document matches.
    pub fn is_unfiltered(&self) -> bool {
        self == &Self::default()
    }

    /// Checks a document against every filter present in this request.
    pub fn matches(&self, document: &Document) -> bool {
        if let Some(prefixes) = &self.title_prefixes {
            if !prefixes
                .iter()
                .any(|prefix| document.title.starts_with(prefix.as_str()))
            {
                return false;
            }
        }
        if let Some(needles) = &self.contains_contents {
            if !needles
                .iter()
                .any(|needle| document.content.contains(needle.as_str()))
            {
                return false;
            }
        }
        if let Some(author_ids) = &self.author_ids {
            if !author_ids.iter().any(|id| *id == document.author.id) {
                return false;
            }
        }
        if let Some(from) = self.created_from {
            if document.created < from {
                return false;
            }
        }
        // Inclusive upper bound
        self.created_to.map_or(true, |to| document.created <= to)
    }
}
