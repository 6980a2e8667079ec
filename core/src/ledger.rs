//! In-memory storage: one ledger per event plus a request index.
//!
//! Each [`EventLedger`] sits behind its own `Mutex`, so every operation
//! that reads or changes an event's confirmed count is serialized per
//! event while different events proceed in parallel.

use crate::error::{DomainError, Result};
use crate::types::{Event, EventId, ParticipationRequest, RequestId, RequestStatus, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// An event together with its participation requests in submission order.
#[derive(Clone, Debug)]
pub struct EventLedger {
    event: Event,
    requests: Vec<ParticipationRequest>,
}

impl EventLedger {
    /// Creates a ledger with no requests.
    #[must_use]
    pub const fn new(event: Event) -> Self {
        Self {
            event,
            requests: Vec::new(),
        }
    }

    /// The event.
    #[must_use]
    pub const fn event(&self) -> &Event {
        &self.event
    }

    pub(crate) const fn event_mut(&mut self) -> &mut Event {
        &mut self.event
    }

    /// All requests in submission order.
    #[must_use]
    pub fn requests(&self) -> &[ParticipationRequest] {
        &self.requests
    }

    pub(crate) fn push_request(&mut self, request: ParticipationRequest) {
        self.requests.push(request);
    }

    pub(crate) fn request_mut(&mut self, id: RequestId) -> Option<&mut ParticipationRequest> {
        self.requests.iter_mut().find(|r| r.id == id)
    }

    /// Looks up a request by id.
    #[must_use]
    pub fn request(&self, id: RequestId) -> Option<&ParticipationRequest> {
        self.requests.iter().find(|r| r.id == id)
    }

    /// Whether `user` already has a request for this event.
    #[must_use]
    pub fn has_request_from(&self, user: UserId) -> bool {
        self.requests.iter().any(|r| r.requester == user)
    }

    /// Number of requests currently CONFIRMED, counted from the requests.
    #[must_use]
    pub fn live_confirmed(&self) -> usize {
        self.requests
            .iter()
            .filter(|r| r.status == RequestStatus::Confirmed)
            .count()
    }

    /// Checks the counter against the requests and the participant limit.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let live = self.live_confirmed();
        let counter_matches = u32::try_from(live).is_ok_and(|n| n == self.event.confirmed_requests());
        let within_limit = self.event.is_unlimited()
            || self.event.confirmed_requests() <= self.event.participant_limit;
        counter_matches && within_limit
    }
}

/// Registry of all event ledgers.
#[derive(Debug, Default)]
pub struct Registry {
    ledgers: RwLock<HashMap<EventId, Arc<Mutex<EventLedger>>>>,
    request_index: RwLock<HashMap<RequestId, EventId>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a freshly created event.
    pub async fn insert(&self, event: Event) {
        let id = event.id;
        self.ledgers
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(EventLedger::new(event))));
    }

    /// Returns the ledger handle for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] if no such event exists.
    pub async fn ledger(&self, id: EventId) -> Result<Arc<Mutex<EventLedger>>> {
        self.ledgers
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("Event with id={id} was not found")))
    }

    /// Records which event a request belongs to.
    pub async fn index_request(&self, request: RequestId, event: EventId) {
        self.request_index.write().await.insert(request, event);
    }

    /// Resolves the event a request belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] if the request is unknown.
    pub async fn event_of_request(&self, request: RequestId) -> Result<EventId> {
        self.request_index
            .read()
            .await
            .get(&request)
            .copied()
            .ok_or_else(|| DomainError::not_found(format!("Request with id={request} was not found")))
    }

    /// Stores freshly queried view counts. Unknown events are skipped.
    pub async fn cache_views(&self, counts: &[(EventId, u64)]) {
        for &(id, views) in counts {
            let Some(handle) = self.ledgers.read().await.get(&id).cloned() else {
                continue;
            };
            handle.lock().await.event_mut().views = views;
        }
    }

    /// Clones every ledger, ordered by event creation time.
    ///
    /// Ledger locks are taken one at a time after the map lock is released.
    pub async fn snapshot(&self) -> Vec<EventLedger> {
        let handles: Vec<_> = self.ledgers.read().await.values().cloned().collect();

        let mut ledgers = Vec::with_capacity(handles.len());
        for handle in handles {
            ledgers.push(handle.lock().await.clone());
        }
        ledgers.sort_by(|a, b| {
            a.event
                .created_on
                .cmp(&b.event.created_on)
                .then_with(|| a.event.id.cmp(&b.event.id))
        });
        ledgers
    }
}
