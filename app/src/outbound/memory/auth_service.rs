//! Identity service emulator with a scripted sign-in popup.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::Identity;
use crate::domain::ports::{AuthService, AuthServiceError, IdentitySink, SubscriptionHandle};

use super::lock;

/// How the next interactive sign-in ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupOutcome {
    /// The user completes the flow as this identity.
    Complete(Identity),
    /// The user closes the popup.
    Cancel,
    /// The provider fails the attempt.
    Fail(AuthServiceError),
}

/// In-process identity service.
///
/// The current identity lives in a [`watch`] channel; every identity
/// subscription forwards its value once on registration and again on each
/// change until released.
#[derive(Debug)]
pub struct InMemoryAuthService {
    current: watch::Sender<Option<Identity>>,
    popup: Mutex<PopupOutcome>,
}

impl InMemoryAuthService {
    /// Start signed out; the popup ends as `popup` until rescripted.
    pub fn new(popup: PopupOutcome) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            current,
            popup: Mutex::new(popup),
        }
    }

    /// Start with `identity` already signed in, as after a restored session.
    #[must_use]
    pub fn signed_in_as(self, identity: Identity) -> Self {
        self.current.send_replace(Some(identity));
        self
    }

    /// Change how the next sign-in ends.
    pub fn script_popup(&self, outcome: PopupOutcome) {
        *lock(&self.popup) = outcome;
    }

    /// Change the signed-in identity from outside the application, as another
    /// tab or an expired token would.
    pub fn set_identity(&self, identity: Option<Identity>) {
        self.current.send_replace(identity);
    }

    /// Identity the service currently considers signed in.
    pub fn current_identity(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    /// Number of identity subscriptions still registered.
    pub fn listener_count(&self) -> usize {
        self.current.receiver_count()
    }
}

#[async_trait]
impl AuthService for InMemoryAuthService {
    fn watch_identity(&self, sink: IdentitySink) -> Result<SubscriptionHandle, AuthServiceError> {
        let mut changes = self.current.subscribe();
        let token = CancellationToken::new();
        let cancelled = token.clone();
        tokio::spawn(async move {
            loop {
                let identity = changes.borrow_and_update().clone();
                if !sink.notify(identity) {
                    break;
                }
                tokio::select! {
                    () = cancelled.cancelled() => break,
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            debug!("identity listener stopped");
        });
        Ok(SubscriptionHandle::new(token))
    }

    async fn sign_in_with_popup(&self) -> Result<Identity, AuthServiceError> {
        let outcome = lock(&self.popup).clone();
        match outcome {
            PopupOutcome::Complete(identity) => {
                info!(user_id = %identity.id(), "popup sign-in completed");
                self.current.send_replace(Some(identity.clone()));
                Ok(identity)
            }
            PopupOutcome::Cancel => Err(AuthServiceError::popup_closed()),
            PopupOutcome::Fail(error) => Err(error),
        }
    }

    async fn sign_out(&self) -> Result<(), AuthServiceError> {
        self.current.send_replace(None);
        Ok(())
    }
}
