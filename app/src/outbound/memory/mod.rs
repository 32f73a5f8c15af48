//! In-process emulators for the identity service and the note store.

mod auth_service;
mod note_store;

pub use auth_service::{InMemoryAuthService, PopupOutcome};
pub use note_store::InMemoryNoteStore;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock `mutex`, recovering the data if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
