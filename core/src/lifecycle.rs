//! Event lifecycle: creation, detail edits and moderation transitions.
//!
//! ```text
//!            SEND_TO_REVIEW          PUBLISH_EVENT
//!   CANCELED ──────────────► PENDING ─────────────► PUBLISHED
//!            ◄──────────────         (admin only)
//!            CANCEL_REVIEW /
//!            REJECT_EVENT
//! ```
//!
//! The initiator may only touch events that are still PENDING or CANCELED.
//! An admin may edit details in any state but may only publish a PENDING
//! event and may never reject a PUBLISHED one.

use crate::environment::DomainEnvironment;
use crate::error::{DomainError, Result};
use crate::reducer::{Facts, Reducer};
use crate::types::{
    AdminAction, AdminUpdate, Event, EventId, EventPatch, EventState, InitiatorAction,
    InitiatorUpdate, NewEvent, UserId,
};
use chrono::{DateTime, Duration, Utc};
use smallvec::smallvec;

const TITLE_LEN: (usize, usize) = (3, 120);
const ANNOTATION_LEN: (usize, usize) = (20, 2000);
const DESCRIPTION_LEN: (usize, usize) = (20, 7000);

// ============================================================================
// Actions
// ============================================================================

/// Commands handled by [`EventLifecycle`].
#[derive(Clone, Debug, PartialEq)]
pub enum LifecycleAction {
    /// Update submitted by `caller`, who must own the event.
    UpdateByInitiator {
        /// Caller identity.
        caller: UserId,
        /// Requested changes.
        update: InitiatorUpdate,
    },
    /// Update submitted by an admin.
    UpdateByAdmin {
        /// Requested changes.
        update: AdminUpdate,
    },
}

/// What a successful lifecycle reduction changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleFact {
    /// At least one detail field changed.
    DetailsChanged,
    /// The event went (back) into review.
    SentToReview,
    /// The initiator withdrew the event.
    ReviewCancelled,
    /// An admin published the event.
    Published {
        /// Publication time.
        at: DateTime<Utc>,
    },
    /// An admin rejected the event.
    Rejected,
}

/// A requested state change, tagged with the role asking for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Initiator-side transition.
    Initiator(InitiatorAction),
    /// Admin-side transition.
    Admin(AdminAction),
}

/// Computes the state reached by applying `transition` to `current`.
///
/// # Errors
///
/// Returns [`DomainError::Conflict`] when the transition is not allowed
/// from `current`.
pub fn next_state(current: EventState, transition: Transition) -> Result<EventState> {
    use AdminAction::{PublishEvent, RejectEvent};
    use EventState::{Canceled, Pending, Published};
    use InitiatorAction::{CancelReview, SendToReview};

    match (current, transition) {
        (Published, Transition::Initiator(_)) => Err(DomainError::conflict(
            "Only pending or canceled events can be changed",
        )),
        (Pending | Canceled, Transition::Initiator(SendToReview)) => Ok(Pending),
        (Pending | Canceled, Transition::Initiator(CancelReview)) => Ok(Canceled),
        (Pending, Transition::Admin(PublishEvent)) => Ok(Published),
        (Published | Canceled, Transition::Admin(PublishEvent)) => Err(DomainError::conflict(
            format!("Cannot publish the event because it's not in the right state: {current}"),
        )),
        (Published, Transition::Admin(RejectEvent)) => Err(DomainError::conflict(
            "Cannot reject the event because it's already published",
        )),
        (Pending | Canceled, Transition::Admin(RejectEvent)) => Ok(Canceled),
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer enforcing the event state machine and field rules.
#[derive(Clone, Copy, Debug, Default)]
pub struct EventLifecycle;

impl EventLifecycle {
    /// Creates a new `EventLifecycle`.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a draft and opens a PENDING event owned by `initiator`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] when a field is out of range,
    /// the participant limit is negative, or the event date is closer than
    /// the initiator lead time.
    pub fn create(
        &self,
        id: EventId,
        initiator: UserId,
        draft: NewEvent,
        env: &DomainEnvironment,
    ) -> Result<Event> {
        let now = env.clock.now();
        Self::validate_event_date(draft.event_date, now, env.lead_times.initiator)?;
        check_len("Title", &draft.title, TITLE_LEN)?;
        check_len("Annotation", &draft.annotation, ANNOTATION_LEN)?;
        check_len("Description", &draft.description, DESCRIPTION_LEN)?;
        let limit = Self::validate_limit(draft.participant_limit.unwrap_or(0))?;

        Ok(Event::open(id, initiator, draft, limit, now))
    }

    fn validate_event_date(
        event_date: DateTime<Utc>,
        now: DateTime<Utc>,
        lead: Duration,
    ) -> Result<()> {
        if event_date < now + lead {
            return Err(DomainError::validation(format!(
                "Event date must be at least {} hour(s) from now, got {}",
                lead.num_hours(),
                event_date.format("%Y-%m-%d %H:%M:%S")
            )));
        }
        Ok(())
    }

    fn validate_limit(limit: i64) -> Result<u32> {
        if limit < 0 {
            return Err(DomainError::validation(format!(
                "Participant limit cannot be negative: {limit}"
            )));
        }
        u32::try_from(limit)
            .map_err(|_| DomainError::validation(format!("Participant limit is too large: {limit}")))
    }

    /// Checks every field of `patch` and returns the parsed limit, if any.
    fn validate_patch(event: &Event, patch: &EventPatch) -> Result<Option<u32>> {
        if let Some(title) = &patch.title {
            check_len("Title", title, TITLE_LEN)?;
        }
        if let Some(annotation) = &patch.annotation {
            check_len("Annotation", annotation, ANNOTATION_LEN)?;
        }
        if let Some(description) = &patch.description {
            check_len("Description", description, DESCRIPTION_LEN)?;
        }

        let Some(raw) = patch.participant_limit else {
            return Ok(None);
        };
        let limit = Self::validate_limit(raw)?;
        if limit > 0 && limit < event.confirmed_requests() {
            return Err(DomainError::conflict(format!(
                "Participant limit {limit} is below the {} already confirmed requests",
                event.confirmed_requests()
            )));
        }
        Ok(Some(limit))
    }

    /// Applies a validated patch. Returns whether anything changed.
    fn apply_patch(event: &mut Event, patch: EventPatch, limit: Option<u32>) -> bool {
        let before = event.clone();

        if let Some(title) = patch.title {
            event.title = title;
        }
        if let Some(annotation) = patch.annotation {
            event.annotation = annotation;
        }
        if let Some(description) = patch.description {
            event.description = description;
        }
        if let Some(category) = patch.category {
            event.category = category;
        }
        if let Some(location) = patch.location {
            event.location = location;
        }
        if let Some(paid) = patch.paid {
            event.paid = paid;
        }
        if let Some(limit) = limit {
            event.participant_limit = limit;
        }
        if let Some(moderation) = patch.request_moderation {
            event.request_moderation = moderation;
        }
        if let Some(date) = patch.event_date {
            event.event_date = date;
        }

        *event != before
    }

    fn update_by_initiator(
        event: &Event,
        caller: UserId,
        update: InitiatorUpdate,
        env: &DomainEnvironment,
    ) -> Result<(Event, Facts<LifecycleFact>)> {
        if event.initiator != caller {
            return Err(DomainError::not_found(format!(
                "Event with id={} was not found",
                event.id
            )));
        }
        if !matches!(event.state, EventState::Pending | EventState::Canceled) {
            return Err(DomainError::conflict(
                "Only pending or canceled events can be changed",
            ));
        }
        if let Some(date) = update.patch.event_date {
            Self::validate_event_date(date, env.clock.now(), env.lead_times.initiator)?;
        }
        let limit = Self::validate_patch(event, &update.patch)?;

        let mut next = event.clone();
        let mut facts: Facts<LifecycleFact> = smallvec![];
        if Self::apply_patch(&mut next, update.patch, limit) {
            facts.push(LifecycleFact::DetailsChanged);
        }
        if let Some(action) = update.action {
            next.state = next_state(next.state, Transition::Initiator(action))?;
            facts.push(match action {
                InitiatorAction::SendToReview => LifecycleFact::SentToReview,
                InitiatorAction::CancelReview => LifecycleFact::ReviewCancelled,
            });
        }
        Ok((next, facts))
    }

    fn update_by_admin(
        event: &Event,
        update: AdminUpdate,
        env: &DomainEnvironment,
    ) -> Result<(Event, Facts<LifecycleFact>)> {
        let now = env.clock.now();
        if let Some(date) = update.patch.event_date {
            Self::validate_event_date(date, now, env.lead_times.admin)?;
        }
        let limit = Self::validate_patch(event, &update.patch)?;

        let mut next = event.clone();
        let mut facts: Facts<LifecycleFact> = smallvec![];
        if Self::apply_patch(&mut next, update.patch, limit) {
            facts.push(LifecycleFact::DetailsChanged);
        }
        if let Some(action) = update.action {
            next.state = next_state(next.state, Transition::Admin(action))?;
            match action {
                AdminAction::PublishEvent => {
                    next.published_on = Some(now);
                    facts.push(LifecycleFact::Published { at: now });
                },
                AdminAction::RejectEvent => facts.push(LifecycleFact::Rejected),
            }
        }
        Ok((next, facts))
    }
}

impl Reducer for EventLifecycle {
    type State = Event;
    type Action = LifecycleAction;
    type Environment = DomainEnvironment;
    type Fact = LifecycleFact;

    fn reduce(
        &self,
        state: &mut Event,
        action: LifecycleAction,
        env: &DomainEnvironment,
    ) -> Result<Facts<LifecycleFact>> {
        // Work on a copy; the stored event only changes on success.
        let (next, facts) = match action {
            LifecycleAction::UpdateByInitiator { caller, update } => {
                Self::update_by_initiator(state, caller, update, env)?
            },
            LifecycleAction::UpdateByAdmin { update } => Self::update_by_admin(state, update, env)?,
        };
        *state = next;
        Ok(facts)
    }
}

fn check_len(field: &str, value: &str, (min, max): (usize, usize)) -> Result<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(DomainError::validation(format!(
            "{field} must be between {min} and {max} characters, got {len}"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::environment::{Clock, LeadTimes};
    use crate::types::{CategoryId, Location};
    use chrono::TimeZone;
    use std::sync::Arc;

    struct StoppedClock(DateTime<Utc>);

    impl Clock for StoppedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
    }

    fn env() -> DomainEnvironment {
        DomainEnvironment::new(Arc::new(StoppedClock(now())), LeadTimes::default())
    }

    fn draft(hours_ahead: i64) -> NewEvent {
        NewEvent {
            title: "Rust meetup".to_string(),
            annotation: "Monthly gathering of local Rustaceans".to_string(),
            description: "Talks, pizza and an evening of pair programming".to_string(),
            category: CategoryId(1),
            location: Location { lat: 55.75, lon: 37.62 },
            paid: None,
            participant_limit: None,
            request_moderation: None,
            event_date: now() + Duration::hours(hours_ahead),
        }
    }

    #[test]
    fn test_create_applies_defaults() {
        let owner = UserId::new();
        let event = EventLifecycle::new()
            .create(EventId::new(), owner, draft(3), &env())
            .unwrap();

        assert_eq!(event.state, EventState::Pending);
        assert_eq!(event.participant_limit, 0);
        assert!(!event.paid);
        assert!(event.request_moderation);
        assert_eq!(event.confirmed_requests(), 0);
        assert_eq!(event.created_on, now());
        assert_eq!(event.initiator, owner);
    }

    #[test]
    fn test_create_rejects_short_lead_time() {
        let result = EventLifecycle::new().create(EventId::new(), UserId::new(), draft(1), &env());
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_create_accepts_exact_lead_time() {
        let result = EventLifecycle::new().create(EventId::new(), UserId::new(), draft(2), &env());
        assert!(result.is_ok());
    }

    #[test]
    fn test_create_rejects_negative_limit() {
        let mut d = draft(5);
        d.participant_limit = Some(-1);
        let result = EventLifecycle::new().create(EventId::new(), UserId::new(), d, &env());
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_create_rejects_short_annotation() {
        let mut d = draft(5);
        d.annotation = "too short".to_string();
        let result = EventLifecycle::new().create(EventId::new(), UserId::new(), d, &env());
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_transition_table() {
        use AdminAction::{PublishEvent, RejectEvent};
        use EventState::{Canceled, Pending, Published};
        use InitiatorAction::{CancelReview, SendToReview};

        assert_eq!(next_state(Canceled, Transition::Initiator(SendToReview)), Ok(Pending));
        assert_eq!(next_state(Pending, Transition::Initiator(CancelReview)), Ok(Canceled));
        assert_eq!(next_state(Pending, Transition::Admin(PublishEvent)), Ok(Published));
        assert_eq!(next_state(Canceled, Transition::Admin(RejectEvent)), Ok(Canceled));
        assert!(next_state(Canceled, Transition::Admin(PublishEvent)).is_err());
        assert!(next_state(Published, Transition::Admin(PublishEvent)).is_err());
        assert!(next_state(Published, Transition::Admin(RejectEvent)).is_err());
        assert!(next_state(Published, Transition::Initiator(CancelReview)).is_err());
    }

    #[test]
    fn test_failed_update_leaves_event_untouched() {
        let owner = UserId::new();
        let lifecycle = EventLifecycle::new();
        let mut event = lifecycle.create(EventId::new(), owner, draft(5), &env()).unwrap();
        let before = event.clone();

        // Valid title change combined with a transition that cannot happen.
        let action = LifecycleAction::UpdateByAdmin {
            update: AdminUpdate {
                patch: EventPatch {
                    title: Some("Renamed meetup".to_string()),
                    ..EventPatch::default()
                },
                action: Some(AdminAction::RejectEvent),
            },
        };
        lifecycle.reduce(&mut event, action.clone(), &env()).unwrap();
        assert_eq!(event.state, EventState::Canceled);

        let mut published = before.clone();
        published.state = EventState::Published;
        let snapshot = published.clone();
        let result = lifecycle.reduce(&mut published, action, &env());
        assert!(matches!(result, Err(DomainError::Conflict(_))));
        assert_eq!(published, snapshot);
    }
}
