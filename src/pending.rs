use std::sync::Arc;

use tokio::{
    sync::{mpsc::Receiver, watch, Mutex},
    task::JoinHandle,
};
use uuid::Uuid;

use crate::{
    AuthorityEvent, Error, NotificationAuthority, NotificationContent, NotificationRequest,
    Trigger,
};

/// Pending requests as of the last refresh
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingSnapshot {
    /// Number of refreshes that produced this snapshot, 0 before the first one
    pub generation: u64,
    pub requests: Vec<NotificationRequest>,
}

impl PendingSnapshot {
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.get(identifier).is_some()
    }

    pub fn get(&self, identifier: &str) -> Option<&NotificationRequest> {
        self.requests
            .iter()
            .find(|request| request.identifier == identifier)
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.requests.iter().map(|request| request.identifier.as_str())
    }
}

#[derive(Debug)]
struct PendingStoreInner<A> {
    authority: Arc<A>,
    snapshot: watch::Sender<PendingSnapshot>,
    /// Held across list-and-publish so snapshots land in listing order
    refresh_gate: Mutex<()>,
}

/// Mirror of the authority's pending notifications.
///
/// Every mutation goes to the authority first, is awaited, and is followed by
/// a full [`refresh`](Self::refresh). The snapshot is never edited locally.
#[derive(Debug)]
pub struct PendingStore<A> {
    inner: Arc<PendingStoreInner<A>>,
}

impl<A> Clone for PendingStore<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: NotificationAuthority + 'static> PendingStore<A> {
    pub fn new(authority: Arc<A>) -> Self {
        let (snapshot, _) = watch::channel(PendingSnapshot::default());
        Self {
            inner: Arc::new(PendingStoreInner {
                authority,
                snapshot,
                refresh_gate: Mutex::new(()),
            }),
        }
    }

    /// Schedule a notification with the given title and body and the default sound
    pub async fn schedule(
        &self,
        trigger: Trigger,
        title: &str,
        body: &str,
    ) -> Result<String, Error> {
        let content = NotificationContent::new()
            .title(title)
            .body(body)
            .sound("default");
        self.schedule_content(trigger, content).await
    }

    /// Submit a new request and refresh once the authority accepted it
    ///
    /// # Returns
    /// The identifier generated for the request
    ///
    /// # Errors
    /// - `Error::InvalidTrigger` if the trigger can never be scheduled
    /// - `Error::ScheduleSubmissionFailed` if the authority rejected the request,
    ///   the snapshot is left untouched in that case
    pub async fn schedule_content(
        &self,
        trigger: Trigger,
        content: NotificationContent,
    ) -> Result<String, Error> {
        let trigger = trigger.resolve(self.inner.authority.now())?;
        let request = NotificationRequest::new(Uuid::new_v4().to_string(), content, trigger);

        if let Err(err) = self.inner.authority.submit(&request).await {
            log::error!("failed to schedule notification: {err}");
            return Err(Error::ScheduleSubmissionFailed(Box::new(err)));
        }
        log::info!("notification {} scheduled", request.identifier);

        self.refresh_after("schedule").await;
        Ok(request.identifier)
    }

    /// Remove one pending request, unknown identifiers are a no-op
    pub async fn cancel(&self, identifier: &str) -> Result<(), Error> {
        self.inner
            .authority
            .remove_pending(&[identifier.to_owned()])
            .await?;
        log::info!("notification {identifier} cancelled");

        self.refresh_after("cancel").await;
        Ok(())
    }

    /// Remove every pending request, delivered notifications are untouched
    pub async fn clear_all(&self) -> Result<(), Error> {
        self.inner.authority.remove_all_pending().await?;
        log::info!("all pending notifications cleared");

        self.refresh_after("clear").await;
        Ok(())
    }

    /// Replace the snapshot with the authority's current pending list
    pub async fn refresh(&self) -> Result<(), Error> {
        let _gate = self.inner.refresh_gate.lock().await;
        let requests = self.inner.authority.list_pending().await?;
        log::debug!("pending requests: {}", requests.len());

        self.inner.snapshot.send_modify(|snapshot| {
            snapshot.generation += 1;
            snapshot.requests = requests;
        });
        Ok(())
    }

    /// A failed refresh after an accepted mutation leaves the snapshot stale
    /// until the next event or foreground transition.
    async fn refresh_after(&self, operation: &str) {
        if let Err(err) = self.refresh().await {
            log::warn!("refresh after {operation} failed, snapshot is stale: {err}");
        }
    }

    pub fn snapshot(&self) -> PendingSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PendingSnapshot> {
        self.inner.snapshot.subscribe()
    }

    /// Refresh on every event the authority pushes, until the channel closes
    pub fn listen(&self, mut events: Receiver<AuthorityEvent>) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                log::debug!("authority event: {event:?}");
                if let Err(err) = store.refresh().await {
                    log::error!("refresh after {} failed: {err}", event.identifier());
                }
            }
            log::debug!("authority event channel closed");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        memory::{AuthorityCall, MemoryAuthority},
        AuthorizationState, CalendarMatch, PAST_CALENDAR_FALLBACK,
    };
    use chrono::{NaiveDate, NaiveDateTime};
    use std::time::Duration;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .and_then(|date| date.and_hms_opt(12, 0, 0))
            .unwrap()
    }

    async fn authorized() -> (Arc<MemoryAuthority>, PendingStore<MemoryAuthority>) {
        let authority = Arc::new(MemoryAuthority::starting_at(noon()));
        authority.set_authorization(AuthorizationState::Authorized).await;
        let store = PendingStore::new(Arc::clone(&authority));
        (authority, store)
    }

    #[tokio::test]
    async fn starts_empty() {
        let (_, store) = authorized().await;
        let snapshot = store.snapshot();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.generation, 0);
    }

    #[tokio::test]
    async fn schedule_adds_exactly_one_new_entry() {
        let (authority, store) = authorized().await;
        store
            .schedule(Trigger::after_secs(5.0).unwrap(), "Water the plants", "")
            .await
            .unwrap();
        let before = store.snapshot();

        let id = store
            .schedule(Trigger::after_secs(10.0).unwrap(), "Feed the cat", "It looks hangry")
            .await
            .unwrap();

        let after = store.snapshot();
        assert!(!before.contains(&id));
        assert_eq!(after.len(), before.len() + 1);
        let request = after.get(&id).unwrap();
        assert_eq!(request.title, "Feed the cat");
        assert_eq!(request.sound.as_deref(), Some("default"));
        assert_eq!(request.trigger, Trigger::Interval(Duration::from_secs(10)));
        assert_eq!(
            after.identifiers().collect::<Vec<_>>(),
            authority.pending_ids().await
        );
    }

    #[tokio::test]
    async fn identifiers_are_never_reused() {
        let (_, store) = authorized().await;
        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(
                store
                    .schedule(Trigger::after(Duration::from_secs(30)), "Feed the cat", "")
                    .await
                    .unwrap(),
            );
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 5);
        assert_eq!(store.snapshot().len(), 5);
    }

    #[tokio::test]
    async fn mutations_complete_before_refresh() {
        let (authority, store) = authorized().await;
        let id = store
            .schedule(Trigger::after(Duration::from_secs(3)), "Feed the cat", "")
            .await
            .unwrap();
        store.cancel(&id).await.unwrap();
        store.clear_all().await.unwrap();

        assert_eq!(
            authority.calls().await,
            vec![
                AuthorityCall::Submit,
                AuthorityCall::ListPending,
                AuthorityCall::RemovePending,
                AuthorityCall::ListPending,
                AuthorityCall::RemoveAllPending,
                AuthorityCall::ListPending,
            ]
        );
        assert_eq!(store.snapshot().generation, 3);
    }

    #[tokio::test]
    async fn rejected_submission_leaves_snapshot_alone() {
        let (authority, store) = authorized().await;
        store
            .schedule(Trigger::after(Duration::from_secs(3)), "Feed the cat", "")
            .await
            .unwrap();
        let before = store.snapshot();

        authority.set_authorization(AuthorizationState::Denied).await;
        let err = store
            .schedule(Trigger::after(Duration::from_secs(3)), "Feed the cat", "")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ScheduleSubmissionFailed(_)));
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn transient_rejection_can_be_retried() {
        let (authority, store) = authorized().await;
        let before = store.snapshot();

        authority.fail_next_submit("center busy").await;
        let err = store
            .schedule(Trigger::after(Duration::from_secs(3)), "Feed the cat", "")
            .await
            .unwrap_err();
        match err {
            Error::ScheduleSubmissionFailed(source) => {
                assert!(matches!(*source, Error::Rejected(ref reason) if reason == "center busy"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.snapshot(), before);
        assert!(authority.pending_ids().await.is_empty());

        let id = store
            .schedule(Trigger::after(Duration::from_secs(3)), "Feed the cat", "")
            .await
            .unwrap();
        assert!(store.snapshot().contains(&id));
    }

    #[tokio::test]
    async fn failed_refresh_after_schedule_still_returns_the_identifier() {
        let (authority, store) = authorized().await;
        store
            .schedule(Trigger::after(Duration::from_secs(20)), "Water the plants", "")
            .await
            .unwrap();
        let before = store.snapshot();
        authority.clear_calls().await;

        authority.fail_next_list("listing unavailable").await;
        let id = store
            .schedule(Trigger::after(Duration::from_secs(10)), "Feed the cat", "")
            .await
            .unwrap();

        assert_eq!(
            authority.calls().await,
            vec![AuthorityCall::Submit, AuthorityCall::ListPending]
        );
        assert_eq!(store.snapshot(), before);
        assert!(authority.pending_ids().await.contains(&id));

        store.refresh().await.unwrap();
        let after = store.snapshot();
        assert!(after.contains(&id));
        assert_eq!(after.generation, before.generation + 1);
        assert_eq!(
            after.identifiers().collect::<Vec<_>>(),
            authority.pending_ids().await
        );
    }

    #[tokio::test]
    async fn invalid_trigger_never_reaches_the_authority() {
        let (authority, store) = authorized().await;
        let err = store
            .schedule(Trigger::after(Duration::ZERO), "Feed the cat", "")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTrigger(_)));
        assert!(authority.calls().await.is_empty());
    }

    #[tokio::test]
    async fn cancel_twice_is_harmless() {
        let (_, store) = authorized().await;
        let keep = store
            .schedule(Trigger::after(Duration::from_secs(20)), "Keep", "")
            .await
            .unwrap();
        let dropped = store
            .schedule(Trigger::after(Duration::from_secs(20)), "Drop", "")
            .await
            .unwrap();

        store.cancel(&dropped).await.unwrap();
        let once = store.snapshot();
        store.cancel(&dropped).await.unwrap();
        let twice = store.snapshot();

        assert_eq!(once.requests, twice.requests);
        assert!(twice.contains(&keep));
        assert!(!twice.contains(&dropped));
    }

    #[tokio::test]
    async fn cancel_unknown_identifier_is_a_no_op() {
        let (_, store) = authorized().await;
        store
            .schedule(Trigger::after(Duration::from_secs(20)), "Feed the cat", "")
            .await
            .unwrap();
        store.cancel("not-a-real-id").await.unwrap();
        assert_eq!(store.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn clear_all_empties_the_snapshot() {
        let (authority, store) = authorized().await;
        for seconds in [1, 10, 30] {
            store
                .schedule(Trigger::after(Duration::from_secs(seconds)), "Feed the cat", "")
                .await
                .unwrap();
        }
        authority.advance(Duration::from_secs(2)).await.unwrap();

        store.clear_all().await.unwrap();
        store.refresh().await.unwrap();
        assert!(store.snapshot().is_empty());
        assert_eq!(authority.delivered().await.len(), 1);
    }

    #[tokio::test]
    async fn refresh_drops_delivered_requests() {
        let (authority, store) = authorized().await;
        let soon = store
            .schedule(Trigger::after(Duration::from_secs(1)), "Soon", "")
            .await
            .unwrap();
        store
            .schedule(Trigger::after(Duration::from_secs(60)), "Later", "")
            .await
            .unwrap();

        authority.advance(Duration::from_secs(5)).await.unwrap();
        assert!(store.snapshot().contains(&soon));

        store.refresh().await.unwrap();
        assert!(!store.snapshot().contains(&soon));
        assert_eq!(store.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn past_calendar_date_fires_immediately() {
        let (_, store) = authorized().await;
        let past = CalendarMatch::new().year(2024).month(11).day(8).hour(9).minute(0);
        let id = store
            .schedule(Trigger::at(past), "Feed the cat", "")
            .await
            .unwrap();
        assert_eq!(
            store.snapshot().get(&id).unwrap().trigger,
            Trigger::Interval(PAST_CALENDAR_FALLBACK)
        );
    }

    #[tokio::test]
    async fn subscribers_see_every_refresh() {
        let (_, store) = authorized().await;
        let mut updates = store.subscribe();
        store
            .schedule(Trigger::after(Duration::from_secs(8)), "Feed the cat", "")
            .await
            .unwrap();

        assert!(updates.has_changed().unwrap());
        let seen = updates.borrow_and_update().clone();
        assert_eq!(seen.generation, 1);
        assert_eq!(seen.len(), 1);
    }

    #[tokio::test]
    async fn listener_refreshes_on_events() {
        let (authority, store) = authorized().await;
        let mut updates = store.subscribe();
        let listener = store.listen(authority.subscribe().unwrap());

        let id = store
            .schedule(Trigger::after(Duration::from_secs(1)), "Feed the cat", "")
            .await
            .unwrap();
        updates.borrow_and_update();

        authority.advance(Duration::from_secs(1)).await.unwrap();
        updates.changed().await.unwrap();
        assert!(!updates.borrow().contains(&id));

        listener.abort();
    }
}
