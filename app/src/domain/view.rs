//! Pure projection of the state slices into a displayable view.
//!
//! [`render`] holds no state of its own. Adapters draw the returned [`View`]
//! however their medium requires.

use std::fmt::Display;

use chrono::TimeZone;

use crate::domain::{Composer, NoteFeed, NoteId, SessionState};

/// Shown while the identity service has not reported.
pub const RESOLVING_MESSAGE: &str = "Checking authentication...";
/// Label of the sign-in control.
pub const SIGN_IN_LABEL: &str = "Sign in with your Google Account";
/// Heading of the notes page.
pub const NOTES_HEADING: &str = "Notes";
/// Label of the sign-out control.
pub const SIGN_OUT_LABEL: &str = "Sign Out";
/// Placeholder of the empty note input.
pub const COMPOSER_PLACEHOLDER: &str = "Type your note and press Enter to save...";

// Same shape as the en-US `toLocaleString` output.
const TIMESTAMP_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// Inputs of [`render`].
#[derive(Debug, Clone, Copy)]
pub struct ViewInput<'a> {
    /// Current session.
    pub session: &'a SessionState,
    /// Notes of the signed-in account.
    pub feed: &'a NoteFeed,
    /// Note input.
    pub composer: &'a Composer,
}

/// Note input as displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposerView {
    /// Text typed so far.
    pub text: String,
    /// Hint shown while the input is empty.
    pub placeholder: &'static str,
    /// Whether the input has focus.
    pub focused: bool,
}

/// One note as displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteCard {
    /// Document id.
    pub id: NoteId,
    /// Note body, line breaks included.
    pub text: String,
    /// Creation time in local time.
    pub timestamp: String,
}

/// Signed-in page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesPage {
    /// Page title.
    pub heading: &'static str,
    /// Email of the signed-in account.
    pub email: String,
    /// Caption of the sign-out control.
    pub sign_out_label: &'static str,
    /// Note input.
    pub composer: ComposerView,
    /// Notes, newest first.
    pub notes: Vec<NoteCard>,
}

/// The three mutually exclusive screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// Session not resolved yet.
    Resolving {
        /// Status line.
        message: &'static str,
    },
    /// Nobody signed in.
    SignIn {
        /// Caption of the sign-in control.
        label: &'static str,
    },
    /// Signed in.
    Notes(NotesPage),
}

/// Project state into a view, formatting timestamps in `tz`.
///
/// # Examples
/// ```
/// use chrono::Utc;
/// use notes::domain::{render, Composer, NoteFeed, SessionState, View, ViewInput};
///
/// let view = render(
///     ViewInput {
///         session: &SessionState::Unknown,
///         feed: &NoteFeed::default(),
///         composer: &Composer::default(),
///     },
///     &Utc,
/// );
/// assert!(matches!(view, View::Resolving { .. }));
/// ```
pub fn render<Tz>(input: ViewInput<'_>, tz: &Tz) -> View
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match input.session {
        SessionState::Unknown => View::Resolving {
            message: RESOLVING_MESSAGE,
        },
        SessionState::Anonymous => View::SignIn {
            label: SIGN_IN_LABEL,
        },
        SessionState::Authenticated(identity) => View::Notes(NotesPage {
            heading: NOTES_HEADING,
            email: identity.email().to_string(),
            sign_out_label: SIGN_OUT_LABEL,
            composer: ComposerView {
                text: input.composer.text().to_owned(),
                placeholder: COMPOSER_PLACEHOLDER,
                focused: input.composer.is_focused(),
            },
            notes: input
                .feed
                .iter()
                .map(|note| NoteCard {
                    id: note.id().clone(),
                    text: note.text().as_ref().to_owned(),
                    timestamp: note
                        .created_at()
                        .with_timezone(tz)
                        .format(TIMESTAMP_FORMAT)
                        .to_string(),
                })
                .collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::{Identity, NoteDocument, NoteFields};
    use chrono::{FixedOffset, Utc};
    use rstest::{fixture, rstest};

    #[fixture]
    fn alice() -> Identity {
        Identity::try_from_strings("alice", "alice@example.com").expect("identity")
    }

    fn feed_for(owner: &Identity) -> NoteFeed {
        let at = |rfc3339: &str| {
            chrono::DateTime::parse_from_rfc3339(rfc3339)
                .expect("timestamp")
                .with_timezone(&Utc)
        };
        let documents = vec![
            NoteDocument::new(
                NoteId::new("n2").expect("id"),
                NoteFields {
                    text: "second".to_owned(),
                    timestamp: Some(at("2026-10-18T15:04:05Z")),
                    user_id: "alice".to_owned(),
                },
            ),
            NoteDocument::new(
                NoteId::new("n1").expect("id"),
                NoteFields {
                    text: "first".to_owned(),
                    timestamp: Some(at("2026-10-18T09:00:00Z")),
                    user_id: "alice".to_owned(),
                },
            ),
        ];
        NoteFeed::materialize(owner.id(), &documents, at("2026-10-18T16:00:00Z"))
    }

    #[rstest]
    fn unknown_session_renders_the_resolving_indicator(alice: Identity) {
        let view = render(
            ViewInput {
                session: &SessionState::Unknown,
                feed: &feed_for(&alice),
                composer: &Composer::default(),
            },
            &Utc,
        );
        assert_eq!(
            view,
            View::Resolving {
                message: RESOLVING_MESSAGE
            }
        );
    }

    #[rstest]
    fn anonymous_session_renders_the_sign_in_prompt(alice: Identity) {
        let view = render(
            ViewInput {
                session: &SessionState::Anonymous,
                feed: &feed_for(&alice),
                composer: &Composer::default(),
            },
            &Utc,
        );
        assert_eq!(
            view,
            View::SignIn {
                label: SIGN_IN_LABEL
            }
        );
    }

    #[rstest]
    fn authenticated_session_renders_feed_in_order(alice: Identity) {
        let mut composer = Composer::default();
        composer.edit("draft");
        composer.focus();
        let session = SessionState::Authenticated(alice.clone());

        let View::Notes(page) = render(
            ViewInput {
                session: &session,
                feed: &feed_for(&alice),
                composer: &composer,
            },
            &Utc,
        ) else {
            panic!("expected the notes page");
        };

        assert_eq!(page.email, "alice@example.com");
        assert_eq!(page.composer.text, "draft");
        assert!(page.composer.focused);
        let rendered: Vec<(&str, &str)> = page
            .notes
            .iter()
            .map(|card| (card.text.as_str(), card.timestamp.as_str()))
            .collect();
        assert_eq!(
            rendered,
            [
                ("second", "10/18/2026, 3:04:05 PM"),
                ("first", "10/18/2026, 9:00:00 AM"),
            ]
        );
    }

    #[rstest]
    fn timestamps_follow_the_supplied_zone(alice: Identity) {
        let session = SessionState::Authenticated(alice.clone());
        let tokyo = FixedOffset::east_opt(9 * 3600).expect("offset");

        let View::Notes(page) = render(
            ViewInput {
                session: &session,
                feed: &feed_for(&alice),
                composer: &Composer::default(),
            },
            &tokyo,
        ) else {
            panic!("expected the notes page");
        };

        assert_eq!(
            page.notes.first().map(|card| card.timestamp.as_str()),
            Some("10/19/2026, 12:04:05 AM")
        );
    }
}
