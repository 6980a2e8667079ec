//! Property tests: arbitrary operation sequences never break the capacity rule.

#![allow(clippy::unwrap_used)]

use ewm_core::allocator::{AllocationAction, AllocationReducer};
use ewm_core::ledger::EventLedger;
use ewm_core::lifecycle::{EventLifecycle, LifecycleAction};
use ewm_core::reducer::Reducer;
use ewm_core::types::{AdminAction, AdminUpdate, EventId, RequestId, RequestStatus, UserId};
use ewm_testing::fixtures;
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Submit(usize),
    Confirm(Vec<usize>),
    Reject(Vec<usize>),
    Cancel(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..8usize).prop_map(Op::Submit),
        2 => prop::collection::vec(0..8usize, 0..5).prop_map(Op::Confirm),
        1 => prop::collection::vec(0..8usize, 0..5).prop_map(Op::Reject),
        1 => (0..8usize).prop_map(Op::Cancel),
    ]
}

fn ledger(owner: UserId, limit: i64, moderation: bool) -> EventLedger {
    let env = fixtures::environment();
    let mut draft = fixtures::draft(10);
    draft.participant_limit = Some(limit);
    draft.request_moderation = Some(moderation);
    let mut event = EventLifecycle::new()
        .create(EventId::new(), owner, draft, &env)
        .unwrap();
    EventLifecycle::new()
        .reduce(
            &mut event,
            LifecycleAction::UpdateByAdmin {
                update: AdminUpdate {
                    action: Some(AdminAction::PublishEvent),
                    ..AdminUpdate::default()
                },
            },
            &env,
        )
        .unwrap();
    EventLedger::new(event)
}

proptest! {
    #[test]
    fn confirmed_count_matches_and_stays_within_limit(
        limit in 0..5i64,
        moderation in any::<bool>(),
        ops in prop::collection::vec(op(), 1..40),
    ) {
        let env = fixtures::environment();
        let reducer = AllocationReducer::new();
        let owner = UserId::new();
        let users: Vec<UserId> = (0..8).map(|_| UserId::new()).collect();
        // Request id per user slot, once submitted.
        let mut submitted: Vec<Option<RequestId>> = vec![None; users.len()];
        let mut state = ledger(owner, limit, moderation);

        for op in ops {
            let action = match op {
                Op::Submit(user) => AllocationAction::Submit {
                    request_id: RequestId::new(),
                    requester: users[user],
                },
                Op::Confirm(slots) => AllocationAction::BulkUpdate {
                    caller: owner,
                    request_ids: slots.iter().filter_map(|s| submitted[*s]).collect(),
                    target: RequestStatus::Confirmed,
                },
                Op::Reject(slots) => AllocationAction::BulkUpdate {
                    caller: owner,
                    request_ids: slots.iter().filter_map(|s| submitted[*s]).collect(),
                    target: RequestStatus::Rejected,
                },
                Op::Cancel(user) => match submitted[user] {
                    Some(request_id) => AllocationAction::Cancel { caller: users[user], request_id },
                    None => continue,
                },
            };

            let before = state.clone();
            let outcome = reducer.reduce(&mut state, action, &env);

            prop_assert!(state.is_consistent(), "inconsistent ledger after {:?}", outcome);
            if outcome.is_err() {
                prop_assert_eq!(state.requests(), before.requests());
                prop_assert_eq!(state.event(), before.event());
            }
            for request in state.requests() {
                if let Some(slot) = users.iter().position(|u| *u == request.requester) {
                    submitted[slot] = Some(request.id);
                }
            }
        }
    }
}
