//! Live document store emulator holding the notes collection.
//!
//! Writes behave like a latency-compensated client SDK: the document is
//! visible to live queries immediately with a pending timestamp, and the
//! server timestamp is filled in once the commit delay has passed.

use std::cmp::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::ports::{NoteStore, NoteStoreError, SnapshotSink, SubscriptionHandle};
use crate::domain::note::NOTES_COLLECTION;
use crate::domain::{NewNote, NoteDocument, NoteFields, NoteId, NoteQuery};

use super::lock;

#[derive(Debug)]
struct Collection {
    documents: Mutex<Vec<NoteDocument>>,
    revision: watch::Sender<u64>,
    write_failure: Mutex<Option<NoteStoreError>>,
}

impl Collection {
    fn bump(&self) {
        self.revision.send_modify(|revision| *revision = revision.wrapping_add(1));
    }

    fn insert(&self, document: NoteDocument) {
        lock(&self.documents).push(document);
        self.bump();
    }

    fn commit(&self, id: &NoteId, at: DateTime<Utc>) {
        let mut documents = lock(&self.documents);
        let Some(document) = documents.iter_mut().find(|document| document.id() == id) else {
            return;
        };
        let mut fields = document.fields().clone();
        fields.timestamp = Some(at);
        *document = NoteDocument::new(id.clone(), fields);
        drop(documents);
        self.bump();
    }

    /// Run `query`: owner equality filter, newest first, pending writes on
    /// top, arrival order on ties.
    fn run(&self, query: &NoteQuery) -> Vec<NoteDocument> {
        let mut matching: Vec<NoteDocument> = lock(&self.documents)
            .iter()
            .filter(|document| document.fields().user_id == query.owner().as_ref())
            .cloned()
            .collect();
        matching.sort_by(|a, b| newest_first(a.fields().timestamp, b.fields().timestamp));
        matching
    }
}

fn newest_first(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => b.cmp(&a),
    }
}

/// In-process note store with live queries.
#[derive(Clone)]
pub struct InMemoryNoteStore {
    collection: Arc<Collection>,
    clock: Arc<dyn Clock>,
    commit_delay: Duration,
}

impl InMemoryNoteStore {
    /// Empty store stamping commits with `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            collection: Arc::new(Collection {
                documents: Mutex::new(Vec::new()),
                revision,
                write_failure: Mutex::new(None),
            }),
            clock,
            commit_delay: Duration::ZERO,
        }
    }

    /// Hold each write pending for `delay` before committing it.
    #[must_use]
    pub fn with_commit_delay(mut self, delay: Duration) -> Self {
        self.commit_delay = delay;
        self
    }

    /// Add an already committed document.
    pub fn seed(&self, document: NoteDocument) {
        self.collection.insert(document);
    }

    /// Make every subsequent write fail with `error`, or succeed again with
    /// `None`.
    pub fn fail_writes(&self, error: Option<NoteStoreError>) {
        *lock(&self.collection.write_failure) = error;
    }

    /// Every stored document in arrival order.
    pub fn documents(&self) -> Vec<NoteDocument> {
        lock(&self.collection.documents).clone()
    }

    /// Number of live queries still registered.
    pub fn listener_count(&self) -> usize {
        self.collection.revision.receiver_count()
    }
}

#[async_trait]
impl NoteStore for InMemoryNoteStore {
    fn watch(
        &self,
        query: NoteQuery,
        sink: SnapshotSink,
    ) -> Result<SubscriptionHandle, NoteStoreError> {
        if query.collection() != NOTES_COLLECTION {
            return Err(NoteStoreError::query(format!(
                "unknown collection {}",
                query.collection()
            )));
        }

        let collection = Arc::clone(&self.collection);
        let mut revisions = collection.revision.subscribe();
        let token = CancellationToken::new();
        let cancelled = token.clone();
        tokio::spawn(async move {
            let subscription = sink.subscription();
            loop {
                revisions.mark_unchanged();
                if cancelled.is_cancelled() || !sink.push(Ok(collection.run(&query))) {
                    break;
                }
                tokio::select! {
                    () = cancelled.cancelled() => break,
                    changed = revisions.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            debug!(%subscription, "live query stopped");
        });
        Ok(SubscriptionHandle::new(token))
    }

    async fn create(&self, note: NewNote) -> Result<NoteId, NoteStoreError> {
        if let Some(error) = lock(&self.collection.write_failure).clone() {
            return Err(error);
        }

        let id = NoteId::random();
        self.collection.insert(NoteDocument::new(
            id.clone(),
            NoteFields {
                text: note.text().as_ref().to_owned(),
                timestamp: None,
                user_id: note.owner().to_string(),
            },
        ));
        tokio::time::sleep(self.commit_delay).await;
        self.collection.commit(&id, self.clock.utc());
        info!(note_id = %id, user_id = %note.owner(), "note committed");
        Ok(id)
    }
}
