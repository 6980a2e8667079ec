//! Participation request allocation.
//!
//! [`AllocationReducer`] holds the capacity rules and operates on a single
//! [`EventLedger`]. [`RequestAllocator`] locks the ledger, runs the reducer
//! and keeps the request index current.
//!
//! Capacity rule: for an event with `participant_limit > 0` the number of
//! CONFIRMED requests never exceeds the limit, and the event's
//! `confirmed_requests` counter always equals that number.

use crate::environment::DomainEnvironment;
use crate::error::{DomainError, Result};
use crate::ledger::{EventLedger, Registry};
use crate::reducer::{Facts, Reducer};
use crate::types::{
    EventId, EventState, ParticipationRequest, RequestId, RequestStatus, StatusUpdateResult, UserId,
};
use smallvec::smallvec;
use std::collections::HashSet;
use std::sync::Arc;

// ============================================================================
// Actions
// ============================================================================

/// Commands handled by [`AllocationReducer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllocationAction {
    /// A user asks to attend the event.
    Submit {
        /// Id for the new request.
        request_id: RequestId,
        /// User asking to attend.
        requester: UserId,
    },
    /// The initiator confirms or rejects pending requests.
    BulkUpdate {
        /// Caller identity, must own the event.
        caller: UserId,
        /// Requests to update, processed in this order.
        request_ids: Vec<RequestId>,
        /// `CONFIRMED` or `REJECTED`.
        target: RequestStatus,
    },
    /// The requester withdraws a request.
    Cancel {
        /// Caller identity, must own the request.
        caller: UserId,
        /// Request to cancel.
        request_id: RequestId,
    },
}

/// What an allocation reduction changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllocationFact {
    /// A request was stored.
    Submitted(ParticipationRequest),
    /// A pending request was confirmed.
    Confirmed(ParticipationRequest),
    /// A pending request was rejected.
    Rejected(ParticipationRequest),
    /// A request was cancelled by its requester.
    Cancelled {
        /// The request after cancellation.
        request: ParticipationRequest,
        /// Whether a confirmed slot was given back.
        released_slot: bool,
    },
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer enforcing the capacity rules on one event ledger.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllocationReducer;

impl AllocationReducer {
    /// Creates a new `AllocationReducer`.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn validate_submit(ledger: &EventLedger, requester: UserId) -> Result<()> {
        let event = ledger.event();
        if event.state != EventState::Published {
            return Err(DomainError::not_found(format!(
                "Event with id={} was not found",
                event.id
            )));
        }
        if event.initiator == requester {
            return Err(DomainError::conflict(
                "The initiator cannot request participation in their own event",
            ));
        }
        if ledger.has_request_from(requester) {
            return Err(DomainError::conflict(format!(
                "User {requester} already has a request for event {}",
                event.id
            )));
        }
        // Live count, so a drifted counter cannot admit an extra request.
        let limit = usize::try_from(event.participant_limit).unwrap_or(usize::MAX);
        if !event.is_unlimited() && ledger.live_confirmed() >= limit {
            return Err(DomainError::conflict(format!(
                "Event {} has reached its participant limit",
                event.id
            )));
        }
        Ok(())
    }

    fn submit(
        ledger: &mut EventLedger,
        request_id: RequestId,
        requester: UserId,
        env: &DomainEnvironment,
    ) -> Result<Facts<AllocationFact>> {
        Self::validate_submit(ledger, requester)?;

        let event = ledger.event();
        let status = if !event.request_moderation || event.is_unlimited() {
            RequestStatus::Confirmed
        } else {
            RequestStatus::Pending
        };
        let request = ParticipationRequest {
            id: request_id,
            event: event.id,
            requester,
            created: env.clock.now(),
            status,
        };

        if status == RequestStatus::Confirmed {
            ledger.event_mut().add_confirmed(1);
        }
        ledger.push_request(request.clone());

        let mut facts: Facts<AllocationFact> = smallvec![AllocationFact::Submitted(request.clone())];
        if status == RequestStatus::Confirmed {
            facts.push(AllocationFact::Confirmed(request));
        }
        Ok(facts)
    }

    fn validate_bulk(
        ledger: &EventLedger,
        caller: UserId,
        request_ids: &[RequestId],
        target: RequestStatus,
    ) -> Result<()> {
        if request_ids.is_empty() {
            return Err(DomainError::validation("Request id list must not be empty"));
        }
        if !matches!(target, RequestStatus::Confirmed | RequestStatus::Rejected) {
            return Err(DomainError::validation(format!(
                "Target status must be CONFIRMED or REJECTED, got {target}"
            )));
        }
        let mut seen = HashSet::with_capacity(request_ids.len());
        if let Some(dup) = request_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(DomainError::validation(format!("Duplicate request id {dup}")));
        }

        let event = ledger.event();
        if event.initiator != caller {
            return Err(DomainError::not_found(format!(
                "Event with id={} was not found",
                event.id
            )));
        }
        if target == RequestStatus::Confirmed && event.free_slots() == Some(0) {
            return Err(DomainError::conflict(format!(
                "Event {} has reached its participant limit",
                event.id
            )));
        }

        for id in request_ids {
            let request = ledger.request(*id).ok_or_else(|| {
                DomainError::not_found(format!("Request with id={id} was not found"))
            })?;
            if request.status != RequestStatus::Pending {
                return Err(DomainError::conflict(format!(
                    "Request {id} must have status PENDING, got {}",
                    request.status
                )));
            }
        }
        Ok(())
    }

    fn bulk_update(
        ledger: &mut EventLedger,
        caller: UserId,
        request_ids: &[RequestId],
        target: RequestStatus,
    ) -> Result<Facts<AllocationFact>> {
        Self::validate_bulk(ledger, caller, request_ids, target)?;

        // Confirm in the order given until capacity runs out.
        let to_confirm = match (target, ledger.event().free_slots()) {
            (RequestStatus::Confirmed, None) => request_ids.len(),
            (RequestStatus::Confirmed, Some(free)) => {
                request_ids.len().min(usize::try_from(free).unwrap_or(usize::MAX))
            },
            _ => 0,
        };

        let mut facts: Facts<AllocationFact> = Facts::with_capacity(request_ids.len());
        for (position, id) in request_ids.iter().enumerate() {
            let Some(request) = ledger.request_mut(*id) else {
                continue;
            };
            if position < to_confirm {
                request.status = RequestStatus::Confirmed;
                facts.push(AllocationFact::Confirmed(request.clone()));
            } else {
                request.status = RequestStatus::Rejected;
                facts.push(AllocationFact::Rejected(request.clone()));
            }
        }

        let confirmed = u32::try_from(to_confirm).map_err(|_| {
            DomainError::internal(format!("Confirmed batch too large: {to_confirm}"))
        })?;
        ledger.event_mut().add_confirmed(confirmed);
        Ok(facts)
    }

    fn cancel(
        ledger: &mut EventLedger,
        caller: UserId,
        request_id: RequestId,
    ) -> Result<Facts<AllocationFact>> {
        let not_found = || DomainError::not_found(format!("Request with id={request_id} was not found"));

        let request = ledger.request_mut(request_id).ok_or_else(not_found)?;
        if request.requester != caller {
            return Err(not_found());
        }

        let released_slot = request.status == RequestStatus::Confirmed;
        request.status = RequestStatus::Canceled;
        let request = request.clone();
        if released_slot {
            ledger.event_mut().release_confirmed();
        }

        Ok(smallvec![AllocationFact::Cancelled {
            request,
            released_slot
        }])
    }
}

impl Reducer for AllocationReducer {
    type State = EventLedger;
    type Action = AllocationAction;
    type Environment = DomainEnvironment;
    type Fact = AllocationFact;

    fn reduce(
        &self,
        state: &mut EventLedger,
        action: AllocationAction,
        env: &DomainEnvironment,
    ) -> Result<Facts<AllocationFact>> {
        match action {
            AllocationAction::Submit {
                request_id,
                requester,
            } => Self::submit(state, request_id, requester, env),
            AllocationAction::BulkUpdate {
                caller,
                request_ids,
                target,
            } => Self::bulk_update(state, caller, &request_ids, target),
            AllocationAction::Cancel { caller, request_id } => {
                Self::cancel(state, caller, request_id)
            },
        }
    }
}

// ============================================================================
// Service
// ============================================================================

/// Entry point for participation request operations.
///
/// Every operation runs under the target event's ledger lock, so two
/// concurrent submissions for the last slot cannot both be confirmed.
#[derive(Clone, Debug)]
pub struct RequestAllocator {
    registry: Arc<Registry>,
    reducer: AllocationReducer,
    env: DomainEnvironment,
}

impl RequestAllocator {
    /// Creates an allocator over `registry`.
    #[must_use]
    pub const fn new(registry: Arc<Registry>, env: DomainEnvironment) -> Self {
        Self {
            registry,
            reducer: AllocationReducer::new(),
            env,
        }
    }

    /// Submits a participation request for `event_id` on behalf of `requester`.
    ///
    /// The request is confirmed immediately when the event needs no
    /// moderation or has no limit; otherwise it stays PENDING.
    ///
    /// # Errors
    ///
    /// - [`DomainError::NotFound`] if the event does not exist or is not published
    /// - [`DomainError::Conflict`] on a duplicate request, a request by the
    ///   initiator, or when the limit is already reached
    pub async fn submit(&self, requester: UserId, event_id: EventId) -> Result<ParticipationRequest> {
        let ledger = self.registry.ledger(event_id).await?;
        let mut ledger = ledger.lock().await;

        let request_id = RequestId::new();
        let facts = self.reducer.reduce(
            &mut ledger,
            AllocationAction::Submit {
                request_id,
                requester,
            },
            &self.env,
        )?;
        self.registry.index_request(request_id, event_id).await;
        drop(ledger);

        record_facts(&facts);
        let request = facts
            .into_iter()
            .find_map(|fact| match fact {
                AllocationFact::Submitted(request) => Some(request),
                _ => None,
            })
            .ok_or_else(|| DomainError::internal("Submission produced no request"))?;

        tracing::info!(
            request_id = %request.id,
            event_id = %event_id,
            requester = %requester,
            status = %request.status,
            "Participation request submitted"
        );
        Ok(request)
    }

    /// Confirms or rejects pending requests of an event owned by `caller`.
    ///
    /// When confirming, requests are taken in the order given; once the
    /// limit is reached the remainder is rejected.
    ///
    /// # Errors
    ///
    /// - [`DomainError::Validation`] for an empty list, a duplicate id or a
    ///   target other than CONFIRMED/REJECTED
    /// - [`DomainError::NotFound`] if `caller` does not own the event or an
    ///   id does not belong to it
    /// - [`DomainError::Conflict`] if a request is not PENDING or the limit
    ///   is already reached
    pub async fn bulk_update_status(
        &self,
        caller: UserId,
        event_id: EventId,
        request_ids: Vec<RequestId>,
        target: RequestStatus,
    ) -> Result<StatusUpdateResult> {
        let ledger = self.registry.ledger(event_id).await?;
        let facts = {
            let mut ledger = ledger.lock().await;
            self.reducer.reduce(
                &mut ledger,
                AllocationAction::BulkUpdate {
                    caller,
                    request_ids,
                    target,
                },
                &self.env,
            )?
        };
        record_facts(&facts);

        let mut result = StatusUpdateResult::default();
        for fact in facts {
            match fact {
                AllocationFact::Confirmed(request) => result.confirmed_requests.push(request),
                AllocationFact::Rejected(request) => result.rejected_requests.push(request),
                AllocationFact::Submitted(_) | AllocationFact::Cancelled { .. } => {},
            }
        }

        tracing::info!(
            event_id = %event_id,
            confirmed = result.confirmed_requests.len(),
            rejected = result.rejected_requests.len(),
            "Request statuses updated"
        );
        Ok(result)
    }

    /// Cancels `request_id` on behalf of its requester.
    ///
    /// Cancelling a CONFIRMED request gives its slot back to the event.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] if the request does not exist or
    /// belongs to another user.
    pub async fn cancel(&self, caller: UserId, request_id: RequestId) -> Result<ParticipationRequest> {
        let event_id = self.registry.event_of_request(request_id).await?;
        let ledger = self.registry.ledger(event_id).await?;
        let facts = {
            let mut ledger = ledger.lock().await;
            self.reducer.reduce(
                &mut ledger,
                AllocationAction::Cancel { caller, request_id },
                &self.env,
            )?
        };
        record_facts(&facts);

        match facts.into_iter().next() {
            Some(AllocationFact::Cancelled {
                request,
                released_slot,
            }) => {
                tracing::info!(
                    request_id = %request_id,
                    event_id = %event_id,
                    released_slot,
                    "Participation request cancelled"
                );
                Ok(request)
            },
            _ => Err(DomainError::internal("Cancellation produced no request")),
        }
    }

    /// Lists the requests of an event owned by `caller`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] if the event does not exist or is
    /// owned by someone else.
    pub async fn event_requests(
        &self,
        caller: UserId,
        event_id: EventId,
    ) -> Result<Vec<ParticipationRequest>> {
        let ledger = self.registry.ledger(event_id).await?;
        let ledger = ledger.lock().await;
        if ledger.event().initiator != caller {
            return Err(DomainError::not_found(format!(
                "Event with id={event_id} was not found"
            )));
        }
        Ok(ledger.requests().to_vec())
    }

    /// Lists every request submitted by `user`.
    pub async fn user_requests(&self, user: UserId) -> Vec<ParticipationRequest> {
        let mut requests: Vec<_> = self
            .registry
            .snapshot()
            .await
            .iter()
            .flat_map(|ledger| ledger.requests().iter().filter(move |r| r.requester == user).cloned())
            .collect();
        requests.sort_by_key(|r| r.created);
        requests
    }
}

fn record_facts(facts: &[AllocationFact]) {
    for fact in facts {
        match fact {
            AllocationFact::Submitted(_) => metrics::counter!("ewm.requests.submitted").increment(1),
            AllocationFact::Confirmed(_) => metrics::counter!("ewm.requests.confirmed").increment(1),
            AllocationFact::Rejected(_) => metrics::counter!("ewm.requests.rejected").increment(1),
            AllocationFact::Cancelled { .. } => {
                metrics::counter!("ewm.requests.cancelled").increment(1);
            },
        }
    }
}
