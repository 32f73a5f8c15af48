//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod auth_service;
mod note_store;
mod subscription;

#[cfg(test)]
pub use auth_service::MockAuthService;
pub use auth_service::{AuthService, AuthServiceError};
#[cfg(test)]
pub use note_store::MockNoteStore;
pub use note_store::{NoteStore, NoteStoreError};
pub use subscription::{
    FeedEvent, IdentitySink, SnapshotSink, SubscriptionHandle, SubscriptionId,
};
