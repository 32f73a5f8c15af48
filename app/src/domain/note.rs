//! Note records, their document-store shapes, and the materialised feed.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use tracing::warn;
use uuid::Uuid;

use crate::domain::UserId;

/// Name of the collection notes are written to and queried from.
pub const NOTES_COLLECTION: &str = "notes";
/// Document field the feed query orders by.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Validation errors raised while building notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteValidationError {
    /// The note id was blank.
    EmptyId,
    /// The note text was blank.
    EmptyText,
    /// The owner was not a usable user id.
    InvalidOwner,
}

impl fmt::Display for NoteValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "note id must not be empty"),
            Self::EmptyText => write!(f, "note text must not be empty"),
            Self::InvalidOwner => write!(f, "note owner is not a valid user id"),
        }
    }
}

impl std::error::Error for NoteValidationError {}

/// Opaque document identifier assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NoteId(String);

impl NoteId {
    /// Validate and construct a [`NoteId`].
    pub fn new(id: impl Into<String>) -> Result<Self, NoteValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(NoteValidationError::EmptyId);
        }
        Ok(Self(id))
    }

    /// Generate a random identifier for stores that assign ids client side.
    pub fn random() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }
}

impl AsRef<str> for NoteId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<NoteId> for String {
    fn from(value: NoteId) -> Self {
        value.0
    }
}

impl TryFrom<String> for NoteId {
    type Error = NoteValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Note body; trimmed and never empty.
///
/// # Examples
/// ```
/// use notes::domain::NoteText;
///
/// assert_eq!(NoteText::new("  Hello \n").unwrap().as_ref(), "Hello");
/// assert!(NoteText::new("   ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NoteText(String);

impl NoteText {
    /// Trim and validate note text.
    pub fn new(text: impl AsRef<str>) -> Result<Self, NoteValidationError> {
        let trimmed = text.as_ref().trim();
        if trimmed.is_empty() {
            return Err(NoteValidationError::EmptyText);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for NoteText {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NoteText> for String {
    fn from(value: NoteText) -> Self {
        value.0
    }
}

impl TryFrom<String> for NoteText {
    type Error = NoteValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Sentinel asking the store to stamp the write with its own clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServerTimestamp;

impl Serialize for ServerTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("REQUEST_TIME")
    }
}

/// Write payload for a new note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    text: NoteText,
    timestamp: ServerTimestamp,
    user_id: UserId,
}

impl NewNote {
    /// Tag `text` with its owner and a server timestamp placeholder.
    pub fn new(owner: UserId, text: NoteText) -> Self {
        Self {
            text,
            timestamp: ServerTimestamp,
            user_id: owner,
        }
    }

    /// Note body.
    pub fn text(&self) -> &NoteText {
        &self.text
    }

    /// Owning account.
    pub fn owner(&self) -> &UserId {
        &self.user_id
    }
}

/// Raw document fields as the store reports them.
///
/// `timestamp` stays `None` while a write is pending server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteFields {
    /// Note body.
    pub text: String,
    /// Server commit time.
    pub timestamp: Option<DateTime<Utc>>,
    /// Owning account.
    pub user_id: String,
}

/// One document from a live query snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDocument {
    id: NoteId,
    fields: NoteFields,
}

impl NoteDocument {
    /// Pair a document id with its fields.
    pub fn new(id: NoteId, fields: NoteFields) -> Self {
        Self { id, fields }
    }

    /// Document identifier.
    pub fn id(&self) -> &NoteId {
        &self.id
    }

    /// Raw document fields.
    pub fn fields(&self) -> &NoteFields {
        &self.fields
    }

    /// Whether the document's owner field equals `owner`.
    pub fn is_owned_by(&self, owner: &UserId) -> bool {
        self.fields.user_id == owner.as_ref()
    }

    /// Map the document to a [`Note`], using `now` for a pending timestamp.
    pub fn to_note(&self, now: DateTime<Utc>) -> Result<Note, NoteValidationError> {
        let owner =
            UserId::new(&self.fields.user_id).map_err(|_| NoteValidationError::InvalidOwner)?;
        let text = NoteText::new(&self.fields.text)?;
        Ok(Note {
            id: self.id.clone(),
            owner,
            text,
            created_at: self.fields.timestamp.unwrap_or(now),
            pending: self.fields.timestamp.is_none(),
        })
    }
}

/// Live query over the notes collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteQuery {
    collection: &'static str,
    owner: UserId,
    order_by: &'static str,
    descending: bool,
}

impl NoteQuery {
    /// Notes owned by `owner`, most recent first.
    pub fn for_owner(owner: UserId) -> Self {
        Self {
            collection: NOTES_COLLECTION,
            owner,
            order_by: TIMESTAMP_FIELD,
            descending: true,
        }
    }

    /// Collection the query reads.
    pub fn collection(&self) -> &str {
        self.collection
    }

    /// Owner equality filter.
    pub fn owner(&self) -> &UserId {
        &self.owner
    }

    /// Field the results are ordered by.
    pub fn order_by(&self) -> &str {
        self.order_by
    }

    /// Whether the ordering is descending.
    pub fn is_descending(&self) -> bool {
        self.descending
    }
}

/// A note as shown in the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    id: NoteId,
    owner: UserId,
    text: NoteText,
    created_at: DateTime<Utc>,
    pending: bool,
}

impl Note {
    /// Document identifier.
    pub fn id(&self) -> &NoteId {
        &self.id
    }

    /// Owning account.
    pub fn owner(&self) -> &UserId {
        &self.owner
    }

    /// Note body.
    pub fn text(&self) -> &NoteText {
        &self.text
    }

    /// Server time, or the client's "just now" while the write is pending.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// True when `created_at` was substituted locally.
    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

/// Ordered, owner-scoped notes materialised from the latest snapshot.
///
/// ## Invariants
/// - Every note belongs to the owner the feed was materialised for.
/// - Order is the store's order; the feed never re-sorts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteFeed {
    notes: Vec<Note>,
}

impl NoteFeed {
    /// Filter `documents` to `owner` and map them to notes, keeping order.
    pub fn materialize(owner: &UserId, documents: &[NoteDocument], now: DateTime<Utc>) -> Self {
        let notes = documents
            .iter()
            .filter(|document| document.is_owned_by(owner))
            .filter_map(|document| match document.to_note(now) {
                Ok(note) => Some(note),
                Err(error) => {
                    warn!(note_id = %document.id(), %error, "skipping malformed note document");
                    None
                }
            })
            .collect();
        Self { notes }
    }

    /// Notes in display order.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Iterate notes in display order.
    pub fn iter(&self) -> std::slice::Iter<'_, Note> {
        self.notes.iter()
    }

    /// Number of notes.
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    /// Whether the feed holds no notes.
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Drop every note.
    pub fn clear(&mut self) {
        self.notes.clear();
    }
}
