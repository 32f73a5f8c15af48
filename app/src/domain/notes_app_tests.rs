//! Tests for the application coordinator.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use mockall::predicate::function;
use rstest::rstest;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::domain::ports::{MockAuthService, MockNoteStore, SubscriptionHandle};
use crate::domain::{NoteDocument, NoteFields};

const WAIT: Duration = Duration::from_secs(2);

struct FixedClock;

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-10-18T12:00:00Z")
            .map(|at| at.with_timezone(&Utc))
            .unwrap_or_default()
    }
}

#[derive(Default)]
struct Tokens(Mutex<Vec<CancellationToken>>);

impl Tokens {
    fn issue(&self) -> SubscriptionHandle {
        let token = CancellationToken::new();
        self.0.lock().expect("tokens lock").push(token.clone());
        SubscriptionHandle::new(token)
    }

    fn issued(&self) -> usize {
        self.0.lock().expect("tokens lock").len()
    }

    fn live(&self) -> usize {
        self.0
            .lock()
            .expect("tokens lock")
            .iter()
            .filter(|token| !token.is_cancelled())
            .count()
    }
}

fn identity(id: &str) -> Identity {
    Identity::try_from_strings(id, format!("{id}@example.com")).expect("identity")
}

fn document(id: &str, owner: &str) -> NoteDocument {
    NoteDocument::new(
        NoteId::new(id).expect("note id"),
        NoteFields {
            text: format!("text of {id}"),
            timestamp: None,
            user_id: owner.to_owned(),
        },
    )
}

fn auth_double() -> MockAuthService {
    let mut auth = MockAuthService::new();
    auth.expect_watch_identity()
        .times(1)
        .returning(|_| Ok(SubscriptionHandle::new(CancellationToken::new())));
    auth
}

fn store_double(watches: &Arc<Tokens>) -> MockNoteStore {
    let issuing = Arc::clone(watches);
    let mut store = MockNoteStore::new();
    store
        .expect_watch()
        .returning(move |_, _| Ok(issuing.issue()));
    store
}

fn app_with(auth: MockAuthService, store: MockNoteStore) -> NotesApp {
    NotesApp::new(
        NotesAppPorts {
            auth: Arc::new(auth),
            store: Arc::new(store),
            clock: Arc::new(FixedClock),
        },
        NotesAppOptions::default(),
    )
}

async fn next_task(app: &mut NotesApp, input: &mut UnboundedReceiver<InputEvent>) -> TaskOutcome {
    loop {
        let event = tokio::time::timeout(WAIT, app.next_event(input))
            .await
            .expect("event before timeout");
        if let AppEvent::Task(outcome) = event {
            if outcome != TaskOutcome::FocusDue {
                return outcome;
            }
            app.dispatch(AppEvent::Task(outcome));
        } else {
            app.dispatch(event);
        }
    }
}

fn type_and_press(app: &mut NotesApp, text: &str, key: KeyPress) {
    app.dispatch(AppEvent::Input(InputEvent::Edit(text.to_owned())));
    app.dispatch(AppEvent::Input(InputEvent::Key(key)));
}

#[rstest]
#[tokio::test]
async fn view_resolves_before_the_first_notification() {
    let watches = Arc::new(Tokens::default());
    let mut app = app_with(auth_double(), store_double(&watches));
    app.mount().expect("mount");

    assert!(matches!(app.view(), View::Resolving { .. }));

    app.dispatch(AppEvent::Identity(None));
    assert!(matches!(app.view(), View::SignIn { .. }));
    assert_eq!(watches.issued(), 0);
}

#[rstest]
#[tokio::test]
async fn duplicate_identity_notifications_subscribe_once() {
    let watches = Arc::new(Tokens::default());
    let mut app = app_with(auth_double(), store_double(&watches));
    app.mount().expect("mount");

    app.dispatch(AppEvent::Identity(Some(identity("alice"))));
    app.dispatch(AppEvent::Identity(Some(identity("alice"))));

    assert_eq!(watches.issued(), 1);
    assert_eq!(watches.live(), 1);
}

#[rstest]
#[tokio::test]
async fn switching_accounts_keeps_one_live_subscription_and_drops_stale_pushes() {
    let watches = Arc::new(Tokens::default());
    let mut app = app_with(auth_double(), store_double(&watches));
    app.mount().expect("mount");

    app.dispatch(AppEvent::Identity(Some(identity("alice"))));
    let alice_feed = app.active_feed_subscription().expect("alice subscribed");
    app.dispatch(AppEvent::Identity(Some(identity("bob"))));
    let bob_feed = app.active_feed_subscription().expect("bob subscribed");

    app.dispatch(AppEvent::Feed(FeedEvent {
        subscription: alice_feed,
        update: Ok(vec![document("a1", "alice")]),
    }));

    assert_ne!(alice_feed, bob_feed);
    assert_eq!(watches.issued(), 2);
    assert_eq!(watches.live(), 1);
    assert!(app.feed().is_empty());
}

#[rstest]
#[tokio::test]
async fn snapshot_for_two_owners_shows_only_the_session_owner() {
    let watches = Arc::new(Tokens::default());
    let mut app = app_with(auth_double(), store_double(&watches));
    app.mount().expect("mount");
    app.dispatch(AppEvent::Identity(Some(identity("alice"))));
    let subscription = app.active_feed_subscription().expect("subscribed");

    app.dispatch(AppEvent::Feed(FeedEvent {
        subscription,
        update: Ok(vec![
            document("a2", "alice"),
            document("b1", "bob"),
            document("a1", "alice"),
        ]),
    }));

    let ids: Vec<&str> = app.feed().iter().map(|note| note.id().as_ref()).collect();
    assert_eq!(ids, ["a2", "a1"]);
    assert!(app.feed().iter().all(|note| note.created_at() == FixedClock.utc()));
}

#[rstest]
#[tokio::test]
async fn enter_clears_synchronously_and_writes_once() {
    let watches = Arc::new(Tokens::default());
    let mut store = store_double(&watches);
    store
        .expect_create()
        .with(function(|note: &NewNote| {
            note.text().as_ref() == "Hello" && note.owner().as_ref() == "alice"
        }))
        .times(1)
        .returning(|_| Ok(NoteId::new("n1").expect("note id")));
    let mut app = app_with(auth_double(), store);
    let (_input_tx, mut input) = mpsc::unbounded_channel();
    app.mount().expect("mount");
    app.dispatch(AppEvent::Identity(Some(identity("alice"))));

    type_and_press(&mut app, "Hello", KeyPress::enter());

    assert_eq!(app.composer().text(), "");
    let outcome = next_task(&mut app, &mut input).await;
    assert!(matches!(
        outcome,
        TaskOutcome::NoteWritten { result: Ok(ref id), .. } if id.as_ref() == "n1"
    ));
}

#[rstest]
#[case("Hello", KeyPress::shift_enter(), "Hello")]
#[case("   ", KeyPress::enter(), "   ")]
#[tokio::test]
async fn non_submitting_keys_issue_no_write(
    #[case] text: &str,
    #[case] key: KeyPress,
    #[case] remaining: &str,
) {
    let watches = Arc::new(Tokens::default());
    let mut store = store_double(&watches);
    store.expect_create().times(0);
    let mut app = app_with(auth_double(), store);
    app.mount().expect("mount");
    app.dispatch(AppEvent::Identity(Some(identity("alice"))));

    type_and_press(&mut app, text, key);

    assert_eq!(app.composer().text(), remaining);
}

#[rstest]
#[tokio::test]
async fn failed_write_does_not_restore_the_input() {
    let watches = Arc::new(Tokens::default());
    let mut store = store_double(&watches);
    store
        .expect_create()
        .times(1)
        .returning(|_| Err(NoteStoreError::permission_denied("rules")));
    let mut app = app_with(auth_double(), store);
    let (_input_tx, mut input) = mpsc::unbounded_channel();
    app.mount().expect("mount");
    app.dispatch(AppEvent::Identity(Some(identity("alice"))));

    type_and_press(&mut app, "lost", KeyPress::enter());
    let outcome = next_task(&mut app, &mut input).await;
    app.dispatch(AppEvent::Task(outcome));

    assert_eq!(app.composer().text(), "");
    assert!(app.session_state().is_authenticated());
}

#[rstest]
#[tokio::test]
async fn sign_out_releases_and_empties_before_the_identity_stream_confirms() {
    let watches = Arc::new(Tokens::default());
    let mut auth = auth_double();
    auth.expect_sign_out().times(1).returning(|| Ok(()));
    let mut app = app_with(auth, store_double(&watches));
    let (_input_tx, mut input) = mpsc::unbounded_channel();
    app.mount().expect("mount");
    app.dispatch(AppEvent::Identity(Some(identity("alice"))));
    let subscription = app.active_feed_subscription().expect("subscribed");
    app.dispatch(AppEvent::Feed(FeedEvent {
        subscription,
        update: Ok(vec![document("a1", "alice")]),
    }));
    assert_eq!(app.feed().len(), 1);

    app.dispatch(AppEvent::Input(InputEvent::SignOut));
    let outcome = next_task(&mut app, &mut input).await;
    app.dispatch(AppEvent::Task(outcome));

    assert_eq!(app.session_state(), &SessionState::Anonymous);
    assert!(app.feed().is_empty());
    assert_eq!(watches.live(), 0);
    assert!(app.active_feed_subscription().is_none());

    app.dispatch(AppEvent::Identity(None));
    assert_eq!(watches.issued(), 1);
}

#[rstest]
#[tokio::test]
async fn late_sign_out_answer_keeps_the_next_account_signed_in() {
    let watches = Arc::new(Tokens::default());
    let mut auth = auth_double();
    auth.expect_sign_out().times(1).returning(|| Ok(()));
    let mut app = app_with(auth, store_double(&watches));
    let (_input_tx, mut input) = mpsc::unbounded_channel();
    app.mount().expect("mount");
    app.dispatch(AppEvent::Identity(Some(identity("alice"))));

    app.dispatch(AppEvent::Input(InputEvent::SignOut));
    let outcome = next_task(&mut app, &mut input).await;
    assert!(matches!(
        &outcome,
        TaskOutcome::SignOutFinished { user_id, result: Ok(()), .. }
            if user_id == identity("alice").id()
    ));
    app.dispatch(AppEvent::Identity(None));
    app.dispatch(AppEvent::Identity(Some(identity("bob"))));
    app.dispatch(AppEvent::Task(outcome));

    assert_eq!(
        app.session_state(),
        &SessionState::Authenticated(identity("bob"))
    );
    assert_eq!(watches.live(), 1);
    assert!(app.active_feed_subscription().is_some());
}

#[rstest]
#[tokio::test]
async fn failed_sign_out_keeps_the_session() {
    let watches = Arc::new(Tokens::default());
    let mut auth = auth_double();
    auth.expect_sign_out()
        .times(1)
        .returning(|| Err(AuthServiceError::network("offline")));
    let mut app = app_with(auth, store_double(&watches));
    let (_input_tx, mut input) = mpsc::unbounded_channel();
    app.mount().expect("mount");
    app.dispatch(AppEvent::Identity(Some(identity("alice"))));

    app.dispatch(AppEvent::Input(InputEvent::SignOut));
    let outcome = next_task(&mut app, &mut input).await;
    app.dispatch(AppEvent::Task(outcome));

    assert!(app.session_state().is_authenticated());
    assert_eq!(watches.live(), 1);
}

#[rstest]
#[tokio::test]
async fn cancelled_sign_in_stays_anonymous() {
    let watches = Arc::new(Tokens::default());
    let mut auth = auth_double();
    auth.expect_sign_in_with_popup()
        .times(1)
        .returning(|| Err(AuthServiceError::popup_closed()));
    let mut app = app_with(auth, store_double(&watches));
    let (_input_tx, mut input) = mpsc::unbounded_channel();
    app.mount().expect("mount");
    app.dispatch(AppEvent::Identity(None));

    app.dispatch(AppEvent::Input(InputEvent::SignIn));
    let outcome = next_task(&mut app, &mut input).await;

    assert!(matches!(outcome, TaskOutcome::SignInFinished { .. }));
    assert_eq!(app.session_state(), &SessionState::Anonymous);
}

#[rstest]
#[tokio::test]
async fn input_outside_a_session_is_ignored() {
    let watches = Arc::new(Tokens::default());
    let mut store = store_double(&watches);
    store.expect_create().times(0);
    let mut app = app_with(auth_double(), store);
    app.mount().expect("mount");
    app.dispatch(AppEvent::Identity(None));

    type_and_press(&mut app, "Hello", KeyPress::enter());

    assert_eq!(app.composer().text(), "");
}

#[rstest]
#[tokio::test]
async fn input_is_focused_after_the_mount_delay() {
    let watches = Arc::new(Tokens::default());
    let mut app = app_with(auth_double(), store_double(&watches));
    let (_input_tx, mut input) = mpsc::unbounded_channel();
    app.mount().expect("mount");
    assert!(!app.composer().is_focused());

    let event = tokio::time::timeout(WAIT, app.next_event(&mut input))
        .await
        .expect("focus event");
    assert_eq!(event, AppEvent::Task(TaskOutcome::FocusDue));
    app.dispatch(event);

    assert!(app.composer().is_focused());
}

#[rstest]
#[tokio::test]
async fn run_draws_and_releases_everything_on_quit() {
    let listener = CancellationToken::new();
    let listener_watch = listener.clone();
    let mut auth = MockAuthService::new();
    auth.expect_watch_identity()
        .times(1)
        .return_once(move |_| Ok(SubscriptionHandle::new(listener)));
    let watches = Arc::new(Tokens::default());
    let app = app_with(auth, store_double(&watches));
    let (input_tx, input) = mpsc::unbounded_channel();
    input_tx.send(InputEvent::Quit).expect("queue quit");
    let mut drawn = Vec::new();

    app.run(input, |view| drawn.push(view.clone()))
        .await
        .expect("runs");

    assert!(matches!(drawn.first(), Some(View::Resolving { .. })));
    assert!(listener_watch.is_cancelled());
}

#[rstest]
fn startup_fails_when_the_identity_listener_is_refused() {
    let mut auth = MockAuthService::new();
    auth.expect_watch_identity()
        .times(1)
        .returning(|_| Err(AuthServiceError::rejected("api key not valid")));
    let watches = Arc::new(Tokens::default());
    let mut app = app_with(auth, store_double(&watches));

    let error = app.mount().expect_err("mount fails");

    assert!(matches!(error, StartupError::IdentityListener(_)));
}
