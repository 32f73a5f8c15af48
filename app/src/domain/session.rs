//! Session state machine driven by the identity service.
//!
//! [`SessionManager`] owns the single identity-change subscription and turns
//! raw notifications into [`SessionTransition`]s. Callers react to
//! transitions, never to notifications, so duplicates cannot cause a second
//! feed subscription.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::{Identity, UserId};
use crate::domain::ports::{AuthService, AuthServiceError, IdentitySink, SubscriptionHandle};

/// Authentication status of this client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    /// The identity service has not reported yet.
    #[default]
    Unknown,
    /// Nobody is signed in.
    Anonymous,
    /// `Identity` is signed in.
    Authenticated(Identity),
}

impl SessionState {
    /// Signed-in identity, if any.
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            Self::Unknown | Self::Anonymous => None,
        }
    }

    /// Whether someone is signed in.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Anonymous => "anonymous",
            Self::Authenticated(_) => "authenticated",
        }
    }
}

/// A change of [`SessionState`].
///
/// Only four shapes occur: `Unknown → Anonymous`, `Unknown → Authenticated`,
/// `Anonymous → Authenticated`, and `Authenticated → Anonymous`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTransition {
    from: SessionState,
    to: SessionState,
}

impl SessionTransition {
    /// State before the change.
    pub fn from(&self) -> &SessionState {
        &self.from
    }

    /// State after the change.
    pub fn to(&self) -> &SessionState {
        &self.to
    }

    /// Identity that just signed in, when this transition enters
    /// `Authenticated`.
    pub fn entered(&self) -> Option<&Identity> {
        self.to.identity()
    }

    /// Whether this transition leaves `Authenticated`.
    pub fn left_authenticated(&self) -> bool {
        self.from.is_authenticated()
    }
}

/// Identity state machine plus the lifetime identity subscription.
pub struct SessionManager {
    auth: Arc<dyn AuthService>,
    state: SessionState,
    listener: Option<SubscriptionHandle>,
}

impl SessionManager {
    /// Create a manager in the `Unknown` state.
    pub fn new(auth: Arc<dyn AuthService>) -> Self {
        Self {
            auth,
            state: SessionState::Unknown,
            listener: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Whether the identity subscription is open.
    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    /// Open the identity subscription. Calling this again is a no-op.
    pub fn start(&mut self, sink: IdentitySink) -> Result<(), AuthServiceError> {
        if self.listener.is_some() {
            debug!("identity listener already registered");
            return Ok(());
        }
        self.listener = Some(self.auth.watch_identity(sink)?);
        info!("listening for identity changes");
        Ok(())
    }

    /// Fold one identity notification into the state machine.
    ///
    /// Returns the transitions it caused, in order. A different identity
    /// arriving while signed in yields `Authenticated → Anonymous` followed by
    /// `Anonymous → Authenticated` so subscribers tear down before rebuilding.
    pub fn apply_identity(&mut self, identity: Option<Identity>) -> Vec<SessionTransition> {
        let next = identity.map_or(SessionState::Anonymous, SessionState::Authenticated);
        match (&self.state, &next) {
            (SessionState::Authenticated(current), SessionState::Authenticated(incoming))
                if current.id() == incoming.id() =>
            {
                // Same account; profile fields may have refreshed.
                self.state = next;
                Vec::new()
            }
            (SessionState::Authenticated(_), SessionState::Authenticated(_)) => {
                vec![
                    self.transition_to(SessionState::Anonymous),
                    self.transition_to(next),
                ]
            }
            (current, incoming) if current == incoming => {
                debug!(state = current.label(), "ignoring duplicate identity notification");
                Vec::new()
            }
            _ => vec![self.transition_to(next)],
        }
    }

    /// Record a sign-out the identity service confirmed for `user_id`.
    ///
    /// A confirmation for an account that is no longer signed in changes
    /// nothing.
    pub fn confirm_signed_out(&mut self, user_id: &UserId) -> Option<SessionTransition> {
        if self.state.identity().map(Identity::id) != Some(user_id) {
            debug!(%user_id, "sign-out confirmed for an account no longer signed in");
            return None;
        }
        Some(self.transition_to(SessionState::Anonymous))
    }

    /// Interactive sign-in. Failures and cancellations are logged only; a
    /// successful sign-in is observed through the identity stream.
    pub fn sign_in(&self) -> impl Future<Output = ()> + Send + 'static {
        let auth = Arc::clone(&self.auth);
        async move {
            match auth.sign_in_with_popup().await {
                Ok(identity) => info!(user_id = %identity.id(), "sign-in completed"),
                Err(AuthServiceError::PopupClosed) => info!("sign-in cancelled"),
                Err(error) => warn!(%error, "sign-in failed"),
            }
        }
    }

    /// Ask the identity service to end the session.
    pub fn sign_out(&self) -> impl Future<Output = Result<(), AuthServiceError>> + Send + 'static {
        let auth = Arc::clone(&self.auth);
        async move { auth.sign_out().await }
    }

    /// Release the identity subscription.
    pub fn shutdown(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.release();
            info!("identity listener released");
        }
    }

    fn transition_to(&mut self, next: SessionState) -> SessionTransition {
        let from = std::mem::replace(&mut self.state, next.clone());
        info!(
            from = from.label(),
            to = next.label(),
            user_id = ?next.identity().map(|identity| identity.id().as_ref()),
            "session state changed"
        );
        SessionTransition { from, to: next }
    }
}
