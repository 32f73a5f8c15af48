//! Driven port for the real-time document store holding notes.

use async_trait::async_trait;

use crate::domain::{NewNote, NoteId, NoteQuery};

use super::{SnapshotSink, SubscriptionHandle, define_port_error};

define_port_error! {
    /// Errors raised by note store adapters.
    pub enum NoteStoreError {
        /// Security rules refused the read or write.
        PermissionDenied { message: String } => "note store denied access: {message}",
        /// The store could not be reached.
        Unavailable { message: String } => "note store unavailable: {message}",
        /// The query or write was malformed or failed server side.
        Query { message: String } => "note store request failed: {message}",
    }
}

/// Port for reading and writing notes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Open a live query; every snapshot (or error) is pushed into `sink`.
    ///
    /// Snapshots arrive already ordered by the query. Documents whose server
    /// timestamp is still pending carry `timestamp: None`.
    fn watch(
        &self,
        query: NoteQuery,
        sink: SnapshotSink,
    ) -> Result<SubscriptionHandle, NoteStoreError>;

    /// Create a note; the store assigns the id and resolves the timestamp.
    async fn create(&self, note: NewNote) -> Result<NoteId, NoteStoreError>;
}
