//! Live note feed subscription keyed to session state.
//!
//! [`NoteFeedSubscriber`] holds at most one live query. Entering
//! `Authenticated` activates it; leaving tears it down. Every push carries
//! the [`SubscriptionId`] it was opened with and pushes from anything but the
//! active subscription are dropped, so a late callback from a previous account
//! can never reach the visible feed.

use std::sync::Arc;

use mockable::Clock;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::domain::ports::{
    FeedEvent, NoteStore, NoteStoreError, SnapshotSink, SubscriptionHandle, SubscriptionId,
};
use crate::domain::{Identity, NoteFeed, NoteQuery, UserId};

struct ActiveFeed {
    subscription: SubscriptionId,
    owner: UserId,
    handle: SubscriptionHandle,
}

/// Subscription lifecycle manager for one identity's notes.
pub struct NoteFeedSubscriber {
    store: Arc<dyn NoteStore>,
    clock: Arc<dyn Clock>,
    events: UnboundedSender<FeedEvent>,
    active: Option<ActiveFeed>,
    next_subscription: SubscriptionId,
    feed: NoteFeed,
}

impl NoteFeedSubscriber {
    /// Create an inactive subscriber whose pushes are sent to `events`.
    pub fn new(
        store: Arc<dyn NoteStore>,
        clock: Arc<dyn Clock>,
        events: UnboundedSender<FeedEvent>,
    ) -> Self {
        Self {
            store,
            clock,
            events,
            active: None,
            next_subscription: SubscriptionId::FIRST,
            feed: NoteFeed::default(),
        }
    }

    /// Materialised notes for the active owner.
    pub fn feed(&self) -> &NoteFeed {
        &self.feed
    }

    /// Identifier of the live subscription, if any.
    pub fn active_subscription(&self) -> Option<SubscriptionId> {
        self.active.as_ref().map(|active| active.subscription)
    }

    /// Open a live query for `identity`, releasing any previous one first.
    pub fn activate(&mut self, identity: &Identity) -> Result<SubscriptionId, NoteStoreError> {
        self.deactivate();

        let subscription = self.next_subscription;
        self.next_subscription = subscription.next();
        let owner = identity.id().clone();
        let sink = SnapshotSink::new(subscription, self.events.clone());
        let handle = self
            .store
            .watch(NoteQuery::for_owner(owner.clone()), sink)?;

        info!(%subscription, user_id = %owner, "note feed subscribed");
        self.active = Some(ActiveFeed {
            subscription,
            owner,
            handle,
        });
        Ok(subscription)
    }

    /// Release the live query and empty the feed.
    ///
    /// Returns the released subscription, if one was active.
    pub fn deactivate(&mut self) -> Option<SubscriptionId> {
        let active = self.active.take()?;
        active.handle.release();
        self.feed.clear();
        info!(subscription = %active.subscription, "note feed released");
        Some(active.subscription)
    }

    /// Apply one push. Returns `true` when the visible feed changed.
    ///
    /// Errors keep the last good feed in place.
    pub fn apply(&mut self, event: FeedEvent) -> bool {
        let Some(active) = self
            .active
            .as_ref()
            .filter(|active| active.subscription == event.subscription)
        else {
            debug!(subscription = %event.subscription, "discarding push from stale subscription");
            return false;
        };

        match event.update {
            Ok(documents) => {
                self.feed = NoteFeed::materialize(&active.owner, &documents, self.clock.utc());
                debug!(
                    subscription = %active.subscription,
                    notes = self.feed.len(),
                    "note feed updated"
                );
                true
            }
            Err(error) => {
                warn!(
                    subscription = %active.subscription,
                    %error,
                    "note feed subscription error; keeping last snapshot"
                );
                false
            }
        }
    }
}
