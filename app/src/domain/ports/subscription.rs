//! Cancellable subscriptions and the sinks adapters push notifications into.
//!
//! Adapters never call back into application state directly. They push into
//! a sink, and the event loop drains the matching receiver one event at a
//! time. Every live subscription is represented by a [`SubscriptionHandle`];
//! releasing (or dropping) the handle cancels the adapter's push task.

use std::fmt;

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::domain::{Identity, NoteDocument};

use super::NoteStoreError;

/// Handle to a live adapter subscription.
///
/// # Examples
/// ```
/// use notes::domain::ports::SubscriptionHandle;
/// use tokio_util::sync::CancellationToken;
///
/// let token = CancellationToken::new();
/// let handle = SubscriptionHandle::new(token.clone());
/// handle.release();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug)]
#[must_use = "dropping a subscription handle releases the subscription"]
pub struct SubscriptionHandle {
    token: CancellationToken,
}

impl SubscriptionHandle {
    /// Wrap the token an adapter's push task watches for cancellation.
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Release the subscription; no further notifications are pushed.
    pub fn release(self) {
        self.token.cancel();
    }

    /// Whether the subscription has been cancelled.
    pub fn is_released(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Locally allocated identifier distinguishing successive feed subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// First identifier handed out by a subscriber.
    pub const FIRST: Self = Self(1);

    /// The identifier allocated after this one.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "feed-{}", self.0)
    }
}

/// Receives identity-change notifications from the auth adapter.
#[derive(Debug, Clone)]
pub struct IdentitySink {
    events: UnboundedSender<Option<Identity>>,
}

impl IdentitySink {
    /// Wrap the event loop's identity channel.
    pub fn new(events: UnboundedSender<Option<Identity>>) -> Self {
        Self { events }
    }

    /// Deliver the current identity, or `None` when signed out.
    ///
    /// Returns `false` once the event loop has gone away.
    pub fn notify(&self, identity: Option<Identity>) -> bool {
        self.events.send(identity).is_ok()
    }
}

/// One push from a live note query, tagged with the subscription it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEvent {
    /// Subscription the push belongs to.
    pub subscription: SubscriptionId,
    /// Snapshot in store order, or the error that interrupted the query.
    pub update: Result<Vec<NoteDocument>, NoteStoreError>,
}

/// Receives live query pushes for one subscription.
#[derive(Debug, Clone)]
pub struct SnapshotSink {
    subscription: SubscriptionId,
    events: UnboundedSender<FeedEvent>,
}

impl SnapshotSink {
    /// Bind a sink to `subscription`.
    pub fn new(subscription: SubscriptionId, events: UnboundedSender<FeedEvent>) -> Self {
        Self {
            subscription,
            events,
        }
    }

    /// Subscription this sink tags pushes with.
    pub fn subscription(&self) -> SubscriptionId {
        self.subscription
    }

    /// Deliver a snapshot or error.
    ///
    /// Returns `false` once the event loop has gone away.
    pub fn push(&self, update: Result<Vec<NoteDocument>, NoteStoreError>) -> bool {
        self.events
            .send(FeedEvent {
                subscription: self.subscription,
                update,
            })
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;
    use tokio::sync::mpsc;

    #[rstest]
    fn dropping_a_handle_cancels_its_token() {
        let token = CancellationToken::new();
        let handle = SubscriptionHandle::new(token.clone());
        assert!(!handle.is_released());
        drop(handle);
        assert!(token.is_cancelled());
    }

    #[rstest]
    fn subscription_ids_increase() {
        let first = SubscriptionId::FIRST;
        let second = first.next();
        assert!(second > first);
        assert_eq!(second.to_string(), "feed-2");
    }

    #[rstest]
    fn snapshot_sink_tags_pushes() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = SnapshotSink::new(SubscriptionId::FIRST.next(), tx);

        assert!(sink.push(Ok(Vec::new())));

        let event = rx.try_recv().expect("pushed event");
        assert_eq!(event.subscription, SubscriptionId::FIRST.next());
        assert_eq!(event.update, Ok(Vec::new()));
    }

    #[rstest]
    fn sinks_report_a_closed_loop() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = IdentitySink::new(tx);
        drop(rx);
        assert!(!sink.notify(None));
    }
}
