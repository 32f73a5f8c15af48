//! Client configuration loaded via OrthoConfig.
//!
//! Connection parameters are public client identifiers, not secrets; they are
//! logged at startup so a misconfigured project is easy to spot.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::{Identity, IdentityValidationError};

const DEFAULT_PROJECT_ID: &str = "demo-notes";
const DEFAULT_DEMO_UID: &str = "demo-user";
const DEFAULT_DEMO_EMAIL: &str = "demo@example.com";

/// Connection and behaviour settings for the notes client.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "LULI")]
pub struct AppSettings {
    /// Web API key of the project.
    pub firebase_api_key: Option<String>,
    /// Project identifier.
    pub firebase_project_id: Option<String>,
    /// Auth domain; derived from the project id when absent.
    pub firebase_auth_domain: Option<String>,
    /// Storage bucket; derived from the project id when absent.
    pub firebase_storage_bucket: Option<String>,
    /// Sender id used for push messaging.
    pub firebase_messaging_sender_id: Option<String>,
    /// Web app identifier within the project.
    pub firebase_app_id: Option<String>,
    /// Analytics measurement id.
    pub firebase_measurement_id: Option<String>,
    /// Delay before the note input takes focus, in milliseconds.
    #[ortho_config(default = 15)]
    pub focus_delay_ms: u64,
    /// Account the emulated sign-in popup completes as.
    pub demo_uid: Option<String>,
    /// Email of the account the emulated popup completes as.
    pub demo_email: Option<String>,
}

/// Non-secret summary of where the client connects, for startup logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSummary {
    /// Project identifier.
    pub project_id: String,
    /// Host serving the sign-in flow.
    pub auth_domain: String,
    /// Storage bucket name.
    pub storage_bucket: String,
    /// Whether an API key was supplied; the key itself is never reported.
    pub api_key_configured: bool,
    /// Web app identifier, if configured.
    pub app_id: Option<String>,
}

impl AppSettings {
    /// Return the configured project id, falling back to the demo project.
    pub fn project_id(&self) -> &str {
        self.firebase_project_id
            .as_deref()
            .unwrap_or(DEFAULT_PROJECT_ID)
    }

    /// Return the auth domain, defaulting to `<project>.firebaseapp.com`.
    pub fn auth_domain(&self) -> String {
        self.firebase_auth_domain
            .clone()
            .unwrap_or_else(|| format!("{}.firebaseapp.com", self.project_id()))
    }

    /// Return the storage bucket, defaulting to `<project>.appspot.com`.
    pub fn storage_bucket(&self) -> String {
        self.firebase_storage_bucket
            .clone()
            .unwrap_or_else(|| format!("{}.appspot.com", self.project_id()))
    }

    /// Return the input focus delay.
    pub fn focus_delay(&self) -> Duration {
        Duration::from_millis(self.focus_delay_ms)
    }

    /// Identity the emulated popup signs in as.
    pub fn demo_identity(&self) -> Result<Identity, IdentityValidationError> {
        Identity::try_from_strings(
            self.demo_uid.as_deref().unwrap_or(DEFAULT_DEMO_UID),
            self.demo_email
                .clone()
                .unwrap_or_else(|| DEFAULT_DEMO_EMAIL.to_owned()),
        )
    }

    /// Describe the connection target without the API key itself.
    pub fn connection(&self) -> ConnectionSummary {
        ConnectionSummary {
            project_id: self.project_id().to_owned(),
            auth_domain: self.auth_domain(),
            storage_bucket: self.storage_bucket(),
            api_key_configured: self.firebase_api_key.is_some(),
            app_id: self.firebase_app_id.clone(),
        }
    }
}
