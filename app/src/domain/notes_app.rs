//! Application coordinator: one event loop over every state slice.
//!
//! Identity notifications, feed pushes, user input, and the outcomes of
//! spawned work all arrive as [`AppEvent`]s and are applied one at a time by
//! [`NotesApp::dispatch`]. Nothing else mutates the session, feed, or
//! composer, so no locking is needed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, TimeZone};
use mockable::Clock;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

use crate::domain::ports::{
    AuthService, AuthServiceError, FeedEvent, IdentitySink, NoteStore, NoteStoreError,
    SubscriptionId,
};
use crate::domain::{
    Composer, Identity, KeyPress, NewNote, NoteFeed, NoteFeedSubscriber, NoteId, SessionManager,
    SessionState, SessionTransition, TraceId, UserId, View, ViewInput, render,
};

/// Delay before the note input takes focus after mount.
pub const DEFAULT_FOCUS_DELAY: Duration = Duration::from_millis(15);

/// Service handles the application is wired to.
#[derive(Clone)]
pub struct NotesAppPorts {
    /// Identity service.
    pub auth: Arc<dyn AuthService>,
    /// Note store.
    pub store: Arc<dyn NoteStore>,
    /// Clock used for pending note timestamps.
    pub clock: Arc<dyn Clock>,
}

/// Tunables for [`NotesApp`].
#[derive(Debug, Clone, Copy)]
pub struct NotesAppOptions {
    /// Delay between mount and the note input taking focus.
    pub focus_delay: Duration,
}

impl Default for NotesAppOptions {
    fn default() -> Self {
        Self {
            focus_delay: DEFAULT_FOCUS_DELAY,
        }
    }
}

/// User input delivered by an inbound adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// The note input now holds this text.
    Edit(String),
    /// A key was pressed in the note input.
    Key(KeyPress),
    /// The sign-in control was activated.
    SignIn,
    /// The sign-out control was activated.
    SignOut,
    /// The user closed the application.
    Quit,
}

/// Completion of work the loop spawned.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    /// The interactive sign-in flow ended, successfully or not.
    SignInFinished {
        /// Correlates the flow's log lines.
        trace_id: TraceId,
    },
    /// The identity service answered a sign-out request.
    SignOutFinished {
        /// Correlates the request's log lines.
        trace_id: TraceId,
        /// Account that was signed in when the request started.
        user_id: UserId,
        /// Service answer.
        result: Result<(), AuthServiceError>,
    },
    /// The store answered a note write.
    NoteWritten {
        /// Correlates the write's log lines.
        trace_id: TraceId,
        /// Id of the stored note, or why the write failed.
        result: Result<NoteId, NoteStoreError>,
    },
    /// The post-mount focus delay elapsed.
    FocusDue,
}

/// Anything the loop reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// User input.
    Input(InputEvent),
    /// Identity service notification; `None` means signed out.
    Identity(Option<Identity>),
    /// Note feed push.
    Feed(FeedEvent),
    /// Spawned work finished.
    Task(TaskOutcome),
}

/// Whether the loop keeps running after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Wait for the next event.
    Continue,
    /// Stop the loop.
    Exit,
}

/// Errors that prevent the application from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The identity service refused the identity subscription.
    #[error("failed to subscribe to identity changes: {0}")]
    IdentityListener(#[from] AuthServiceError),
}

/// The note-taking client.
pub struct NotesApp {
    session: SessionManager,
    feed: NoteFeedSubscriber,
    composer: Composer,
    store: Arc<dyn NoteStore>,
    options: NotesAppOptions,
    identity_tx: UnboundedSender<Option<Identity>>,
    identity_rx: UnboundedReceiver<Option<Identity>>,
    feed_rx: UnboundedReceiver<FeedEvent>,
    tasks_tx: UnboundedSender<TaskOutcome>,
    tasks_rx: UnboundedReceiver<TaskOutcome>,
    mounted: bool,
}

impl NotesApp {
    /// Wire the application to its ports. Nothing is subscribed until
    /// [`NotesApp::mount`].
    pub fn new(ports: NotesAppPorts, options: NotesAppOptions) -> Self {
        let (identity_tx, identity_rx) = mpsc::unbounded_channel();
        let (feed_tx, feed_rx) = mpsc::unbounded_channel();
        let (tasks_tx, tasks_rx) = mpsc::unbounded_channel();
        Self {
            session: SessionManager::new(ports.auth),
            feed: NoteFeedSubscriber::new(Arc::clone(&ports.store), ports.clock, feed_tx),
            composer: Composer::default(),
            store: ports.store,
            options,
            identity_tx,
            identity_rx,
            feed_rx,
            tasks_tx,
            tasks_rx,
            mounted: false,
        }
    }

    /// Subscribe to identity changes and schedule input focus.
    ///
    /// Must be called from within a tokio runtime.
    pub fn mount(&mut self) -> Result<(), StartupError> {
        self.session
            .start(IdentitySink::new(self.identity_tx.clone()))?;
        if !self.mounted {
            self.mounted = true;
            let delay = self.options.focus_delay;
            let tasks = self.tasks_tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                report(&tasks, TaskOutcome::FocusDue);
            });
        }
        Ok(())
    }

    /// Current session state.
    pub fn session_state(&self) -> &SessionState {
        self.session.state()
    }

    /// Current note feed.
    pub fn feed(&self) -> &NoteFeed {
        self.feed.feed()
    }

    /// Current composer.
    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    /// Live feed subscription, if any.
    pub fn active_feed_subscription(&self) -> Option<SubscriptionId> {
        self.feed.active_subscription()
    }

    /// Render in the local time zone.
    pub fn view(&self) -> View {
        self.view_in(&Local)
    }

    /// Render with timestamps in `tz`.
    pub fn view_in<Tz>(&self, tz: &Tz) -> View
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        render(
            ViewInput {
                session: self.session.state(),
                feed: self.feed.feed(),
                composer: &self.composer,
            },
            tz,
        )
    }

    /// Wait for the next event from any source.
    ///
    /// Service notifications are preferred over input. A closed input channel
    /// reads as [`InputEvent::Quit`].
    pub async fn next_event(&mut self, input: &mut UnboundedReceiver<InputEvent>) -> AppEvent {
        tokio::select! {
            biased;
            Some(identity) = self.identity_rx.recv() => AppEvent::Identity(identity),
            Some(event) = self.feed_rx.recv() => AppEvent::Feed(event),
            Some(outcome) = self.tasks_rx.recv() => AppEvent::Task(outcome),
            event = input.recv() => AppEvent::Input(event.unwrap_or(InputEvent::Quit)),
        }
    }

    /// Apply one event.
    pub fn dispatch(&mut self, event: AppEvent) -> Flow {
        match event {
            AppEvent::Input(input) => return self.handle_input(input),
            AppEvent::Identity(identity) => {
                let transitions = self.session.apply_identity(identity);
                self.apply_transitions(transitions);
            }
            AppEvent::Feed(event) => {
                self.feed.apply(event);
            }
            AppEvent::Task(outcome) => self.handle_task(outcome),
        }
        Flow::Continue
    }

    /// Mount, then process events until the user quits, calling `draw`
    /// whenever the view changes. Every subscription is released on exit.
    pub async fn run<F>(
        mut self,
        mut input: UnboundedReceiver<InputEvent>,
        mut draw: F,
    ) -> Result<(), StartupError>
    where
        F: FnMut(&View),
    {
        self.mount()?;
        let mut shown = self.view();
        draw(&shown);

        loop {
            let event = self.next_event(&mut input).await;
            if self.dispatch(event) == Flow::Exit {
                break;
            }
            let view = self.view();
            if view != shown {
                draw(&view);
                shown = view;
            }
        }

        self.shutdown();
        Ok(())
    }

    /// Release the feed and identity subscriptions.
    pub fn shutdown(&mut self) {
        self.feed.deactivate();
        self.session.shutdown();
    }

    fn apply_transitions(&mut self, transitions: Vec<SessionTransition>) {
        for transition in transitions {
            if transition.left_authenticated() {
                self.feed.deactivate();
            }
            if let Some(identity) = transition.entered() {
                if let Err(error) = self.feed.activate(identity) {
                    error!(user_id = %identity.id(), %error, "failed to subscribe to notes");
                }
            }
        }
    }

    fn handle_input(&mut self, input: InputEvent) -> Flow {
        match input {
            InputEvent::Edit(text) => {
                if self.session.state().is_authenticated() {
                    self.composer.edit(text);
                }
            }
            InputEvent::Key(key) => self.handle_key(key),
            InputEvent::SignIn => self.start_sign_in(),
            InputEvent::SignOut => self.start_sign_out(),
            InputEvent::Quit => return Flow::Exit,
        }
        Flow::Continue
    }

    fn handle_key(&mut self, key: KeyPress) {
        let Some(identity) = self.session.state().identity() else {
            return;
        };
        let Some(text) = self.composer.handle_key(key) else {
            return;
        };

        let note = NewNote::new(identity.id().clone(), text);
        let trace_id = TraceId::generate();
        let store = Arc::clone(&self.store);
        let tasks = self.tasks_tx.clone();
        info!(%trace_id, user_id = %identity.id(), "submitting note");
        tokio::spawn(TraceId::scope(trace_id, async move {
            let result = store.create(note).await;
            report(&tasks, TaskOutcome::NoteWritten { trace_id, result });
        }));
    }

    fn start_sign_in(&self) {
        if *self.session.state() != SessionState::Anonymous {
            debug!("sign-in requested outside the anonymous state; ignoring");
            return;
        }
        let trace_id = TraceId::generate();
        let sign_in = self.session.sign_in();
        let tasks = self.tasks_tx.clone();
        info!(%trace_id, "starting interactive sign-in");
        tokio::spawn(TraceId::scope(trace_id, async move {
            sign_in.await;
            report(&tasks, TaskOutcome::SignInFinished { trace_id });
        }));
    }

    fn start_sign_out(&self) {
        let Some(identity) = self.session.state().identity() else {
            debug!("sign-out requested without a session; ignoring");
            return;
        };
        let user_id = identity.id().clone();
        let trace_id = TraceId::generate();
        let sign_out = self.session.sign_out();
        let tasks = self.tasks_tx.clone();
        info!(%trace_id, %user_id, "signing out");
        tokio::spawn(TraceId::scope(trace_id, async move {
            let result = sign_out.await;
            report(
                &tasks,
                TaskOutcome::SignOutFinished {
                    trace_id,
                    user_id,
                    result,
                },
            );
        }));
    }

    fn handle_task(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::SignInFinished { trace_id } => {
                debug!(%trace_id, "sign-in flow finished");
            }
            TaskOutcome::SignOutFinished {
                trace_id,
                user_id,
                result: Ok(()),
            } => {
                info!(%trace_id, %user_id, "signed out");
                if let Some(transition) = self.session.confirm_signed_out(&user_id) {
                    self.apply_transitions(vec![transition]);
                }
            }
            TaskOutcome::SignOutFinished {
                trace_id,
                user_id,
                result: Err(error),
            } => warn!(%trace_id, %user_id, %error, "sign-out failed"),
            TaskOutcome::NoteWritten {
                trace_id,
                result: Ok(note_id),
            } => info!(%trace_id, %note_id, "note saved"),
            TaskOutcome::NoteWritten {
                trace_id,
                result: Err(error),
            } => error!(%trace_id, %error, "note write failed; its text is lost"),
            TaskOutcome::FocusDue => self.composer.focus(),
        }
    }
}

fn report(tasks: &UnboundedSender<TaskOutcome>, outcome: TaskOutcome) {
    if tasks.send(outcome).is_err() {
        debug!("event loop stopped before a task reported back");
    }
}

#[cfg(test)]
#[path = "notes_app_tests.rs"]
mod tests;
