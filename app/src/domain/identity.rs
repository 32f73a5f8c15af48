//! Signed-in account identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Validation errors returned by the identity constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityValidationError {
    /// The user id was empty.
    EmptyId,
    /// The user id had surrounding whitespace.
    InvalidId,
    /// The email was empty.
    EmptyEmail,
}

impl fmt::Display for IdentityValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "user id must not be empty"),
            Self::InvalidId => write!(f, "user id must not contain surrounding whitespace"),
            Self::EmptyEmail => write!(f, "email must not be empty"),
        }
    }
}

impl std::error::Error for IdentityValidationError {}

/// Stable identifier assigned by the identity provider.
///
/// The value is opaque; only emptiness and surrounding whitespace are
/// rejected so provider-specific formats pass through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Validate and construct a [`UserId`] from borrowed input.
    pub fn new(id: impl AsRef<str>) -> Result<Self, IdentityValidationError> {
        Self::from_owned(id.as_ref().to_owned())
    }

    fn from_owned(id: String) -> Result<Self, IdentityValidationError> {
        if id.is_empty() {
            return Err(IdentityValidationError::EmptyId);
        }
        if id.trim() != id {
            return Err(IdentityValidationError::InvalidId);
        }
        Ok(Self(id))
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl TryFrom<String> for UserId {
    type Error = IdentityValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

/// Display email reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Validate and construct an [`Email`]; surrounding whitespace is trimmed.
    pub fn new(email: impl Into<String>) -> Result<Self, IdentityValidationError> {
        Self::from_owned(email.into())
    }

    fn from_owned(email: String) -> Result<Self, IdentityValidationError> {
        let trimmed = email.trim();
        if trimmed.is_empty() {
            return Err(IdentityValidationError::EmptyEmail);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

impl TryFrom<String> for Email {
    type Error = IdentityValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

/// Account record held for the lifetime of a signed-in session.
///
/// ## Invariants
/// - `id` is non-empty and carries no surrounding whitespace.
/// - `email` is non-empty once trimmed.
///
/// # Examples
/// ```
/// use notes::domain::Identity;
///
/// let identity = Identity::try_from_strings("uid-1", "ada@example.com").unwrap();
/// assert_eq!(identity.id().as_ref(), "uid-1");
/// assert_eq!(identity.email().as_ref(), "ada@example.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(alias = "uid")]
    id: UserId,
    email: Email,
}

impl Identity {
    /// Build an identity from validated parts.
    pub fn new(id: UserId, email: Email) -> Self {
        Self { id, email }
    }

    /// Fallible constructor from raw strings.
    pub fn try_from_strings(
        id: impl AsRef<str>,
        email: impl Into<String>,
    ) -> Result<Self, IdentityValidationError> {
        Ok(Self::new(UserId::new(id)?, Email::new(email)?))
    }

    /// Provider identifier.
    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// Display email.
    pub fn email(&self) -> &Email {
        &self.email
    }
}
