//! Application facade tying the lifecycle, allocator and views together.

use crate::allocator::RequestAllocator;
use crate::environment::DomainEnvironment;
use crate::error::{DomainError, Result};
use crate::ledger::Registry;
use crate::lifecycle::{EventLifecycle, LifecycleAction, LifecycleFact};
use crate::query::{AdminFilter, Page, PublicFilter};
use crate::reducer::Reducer;
use crate::stats::event_uri;
use crate::types::{AdminUpdate, ClientContext, Event, EventId, EventState, InitiatorUpdate, NewEvent, UserId};
use crate::views::ViewAggregator;
use std::sync::Arc;

/// Event operations for initiators, admins and the public.
#[derive(Clone, Debug)]
pub struct EventService {
    registry: Arc<Registry>,
    lifecycle: EventLifecycle,
    env: DomainEnvironment,
    allocator: RequestAllocator,
    views: ViewAggregator,
}

impl EventService {
    /// Creates a service over `registry`.
    #[must_use]
    pub fn new(registry: Arc<Registry>, env: DomainEnvironment, views: ViewAggregator) -> Self {
        let allocator = RequestAllocator::new(Arc::clone(&registry), env.clone());
        Self {
            registry,
            lifecycle: EventLifecycle::new(),
            env,
            allocator,
            views,
        }
    }

    /// Participation request operations.
    #[must_use]
    pub const fn allocator(&self) -> &RequestAllocator {
        &self.allocator
    }

    /// View aggregation.
    #[must_use]
    pub const fn views(&self) -> &ViewAggregator {
        &self.views
    }

    // ------------------------------------------------------------------------
    // Initiator
    // ------------------------------------------------------------------------

    /// Creates a PENDING event owned by `initiator`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] for invalid fields, a negative
    /// limit or an event date inside the initiator lead time.
    pub async fn create_event(&self, initiator: UserId, draft: NewEvent) -> Result<Event> {
        let event = self
            .lifecycle
            .create(EventId::new(), initiator, draft, &self.env)?;
        self.registry.insert(event.clone()).await;

        tracing::info!(event_id = %event.id, initiator = %initiator, "Event created");
        Ok(event)
    }

    /// Applies an initiator's update to their event.
    ///
    /// # Errors
    ///
    /// - [`DomainError::NotFound`] if the event does not exist or is not owned by `caller`
    /// - [`DomainError::Conflict`] if the event is PUBLISHED, or the new limit
    ///   is below the confirmed count
    /// - [`DomainError::Validation`] for invalid fields or a too-close date
    pub async fn update_by_initiator(
        &self,
        caller: UserId,
        event_id: EventId,
        update: InitiatorUpdate,
    ) -> Result<Event> {
        self.apply(event_id, LifecycleAction::UpdateByInitiator { caller, update })
            .await
    }

    /// Returns one of the caller's events.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] if the event does not exist or is
    /// owned by someone else.
    pub async fn initiator_event(&self, caller: UserId, event_id: EventId) -> Result<Event> {
        let ledger = self.registry.ledger(event_id).await?;
        let event = ledger.lock().await.event().clone();
        if event.initiator != caller {
            return Err(DomainError::not_found(format!(
                "Event with id={event_id} was not found"
            )));
        }
        Ok(event)
    }

    /// Lists the caller's events in creation order.
    pub async fn initiator_events(&self, caller: UserId, page: Page) -> Vec<Event> {
        let events = self
            .registry
            .snapshot()
            .await
            .into_iter()
            .map(|ledger| ledger.event().clone())
            .filter(|event| event.initiator == caller)
            .collect();
        page.slice(events)
    }

    // ------------------------------------------------------------------------
    // Admin
    // ------------------------------------------------------------------------

    /// Applies an admin update, possibly publishing or rejecting the event.
    ///
    /// # Errors
    ///
    /// - [`DomainError::NotFound`] if the event does not exist
    /// - [`DomainError::Conflict`] for a forbidden transition or a limit
    ///   below the confirmed count
    /// - [`DomainError::Validation`] for invalid fields or a too-close date
    pub async fn update_by_admin(&self, event_id: EventId, update: AdminUpdate) -> Result<Event> {
        self.apply(event_id, LifecycleAction::UpdateByAdmin { update })
            .await
    }

    /// Admin search across all events, decorated with view counts.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] if the date range is inverted.
    pub async fn search_admin(&self, filter: &AdminFilter) -> Result<Vec<Event>> {
        filter.validate()?;
        let now = self.env.clock.now();
        let matching = self
            .registry
            .snapshot()
            .await
            .into_iter()
            .map(|ledger| ledger.event().clone())
            .filter(|event| filter.matches(event, now))
            .collect();

        let mut events = filter.page.slice(matching);
        self.refresh_views(&mut events).await;
        Ok(events)
    }

    // ------------------------------------------------------------------------
    // Public
    // ------------------------------------------------------------------------

    /// Lists published events for anonymous callers and records the access.
    ///
    /// Events are filtered, decorated with view counts, sorted, then paged.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] if the date range is inverted.
    pub async fn list_public(&self, filter: &PublicFilter, context: &ClientContext) -> Result<Vec<Event>> {
        filter.validate()?;
        let now = self.env.clock.now();

        let mut events: Vec<Event> = self
            .registry
            .snapshot()
            .await
            .into_iter()
            .map(|ledger| ledger.event().clone())
            .filter(|event| filter.matches(event, now))
            .collect();

        self.views.record_view(context);
        self.refresh_views(&mut events).await;
        ViewAggregator::apply_sort(&mut events, filter.sort);
        Ok(filter.page.slice(events))
    }

    /// Returns a published event and records the access.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] if the event does not exist or is
    /// not PUBLISHED.
    pub async fn get_public(&self, event_id: EventId, context: &ClientContext) -> Result<Event> {
        let not_found = || DomainError::not_found(format!("Event with id={event_id} was not found"));

        let ledger = self.registry.ledger(event_id).await.map_err(|_| not_found())?;
        let mut event = ledger.lock().await.event().clone();
        if event.state != EventState::Published {
            return Err(not_found());
        }

        if self.views.decorate_single(&mut event).await {
            self.registry.cache_views(&[(event.id, event.views)]).await;
        }
        self.views.record_view(&ClientContext {
            ip: context.ip.clone(),
            endpoint: event_uri(event_id),
        });
        Ok(event)
    }

    async fn refresh_views(&self, events: &mut [Event]) {
        if self.views.decorate(events).await {
            let counts: Vec<_> = events.iter().map(|event| (event.id, event.views)).collect();
            self.registry.cache_views(&counts).await;
        }
    }

    async fn apply(&self, event_id: EventId, action: LifecycleAction) -> Result<Event> {
        let ledger = self.registry.ledger(event_id).await?;
        let mut ledger = ledger.lock().await;

        let facts = self.lifecycle.reduce(ledger.event_mut(), action, &self.env)?;
        let event = ledger.event().clone();
        drop(ledger);

        for fact in &facts {
            match fact {
                LifecycleFact::Published { at } => {
                    metrics::counter!("ewm.events.published").increment(1);
                    tracing::info!(event_id = %event_id, published_on = %at, "Event published");
                },
                LifecycleFact::Rejected => tracing::info!(event_id = %event_id, "Event rejected"),
                LifecycleFact::SentToReview => {
                    tracing::info!(event_id = %event_id, "Event sent to review");
                },
                LifecycleFact::ReviewCancelled => {
                    tracing::info!(event_id = %event_id, "Event review cancelled");
                },
                LifecycleFact::DetailsChanged => tracing::debug!(event_id = %event_id, "Event details changed"),
            }
        }
        Ok(event)
    }
}
