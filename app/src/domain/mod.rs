//! Domain primitives, state machines, and the application coordinator.
//!
//! Purpose: Define the strongly typed records exchanged with the identity
//! service and the document store, plus the state slices that reconcile them
//! into a renderable view. Nothing here talks to a concrete service; adapters
//! plug in through [`ports`].
//!
//! Public surface:
//! - Identity / UserId / Email — the signed-in account.
//! - Note / NoteFeed / NoteDocument / NewNote — note records and their
//!   store-side shapes.
//! - SessionManager / SessionState — identity state machine.
//! - NoteFeedSubscriber — subscription lifecycle keyed to session state.
//! - Composer — note input buffer and submit trigger.
//! - View / render — pure projection of the state slices.
//! - NotesApp — single event loop owning all of the above.

pub mod composer;
pub mod identity;
pub mod note;
pub mod note_feed;
pub mod notes_app;
pub mod ports;
pub mod session;
pub mod trace_id;
pub mod view;

pub use self::composer::{Composer, Key, KeyPress};
pub use self::identity::{Email, Identity, IdentityValidationError, UserId};
pub use self::note::{
    NewNote, Note, NoteDocument, NoteFeed, NoteFields, NoteId, NoteQuery, NoteText,
    NoteValidationError, ServerTimestamp,
};
pub use self::note_feed::NoteFeedSubscriber;
pub use self::notes_app::{
    AppEvent, Flow, InputEvent, NotesApp, NotesAppOptions, NotesAppPorts, StartupError,
    TaskOutcome,
};
pub use self::ports::{FeedEvent, SubscriptionId};
pub use self::session::{SessionManager, SessionState, SessionTransition};
pub use self::trace_id::TraceId;
pub use self::view::{ComposerView, NoteCard, NotesPage, View, ViewInput, render};
