//! Driven port for the external identity service.
//!
//! The service owns the session. The application only listens to its
//! identity stream and asks it to start or end a session; it never decides
//! who is signed in on its own.

use async_trait::async_trait;

use crate::domain::Identity;

use super::{IdentitySink, SubscriptionHandle, define_port_error};

define_port_error! {
    /// Errors raised by identity service adapters.
    pub enum AuthServiceError {
        /// The user closed the sign-in popup before finishing.
        PopupClosed => "sign-in popup was closed before completion",
        /// The provider rejected the attempt.
        Rejected { message: String } => "identity provider rejected the request: {message}",
        /// The service could not be reached.
        Network { message: String } => "identity service unreachable: {message}",
    }
}

/// Port for the identity service a session is delegated to.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Start pushing identity changes into `sink`.
    ///
    /// Adapters push the current state once the service has resolved it, then
    /// one notification per change. Duplicates are allowed.
    fn watch_identity(&self, sink: IdentitySink) -> Result<SubscriptionHandle, AuthServiceError>;

    /// Run the interactive sign-in flow.
    ///
    /// On success the identity stream also reports the new identity.
    async fn sign_in_with_popup(&self) -> Result<Identity, AuthServiceError>;

    /// End the current session.
    async fn sign_out(&self) -> Result<(), AuthServiceError>;
}
