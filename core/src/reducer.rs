//! The reducer abstraction shared by the lifecycle and allocation logic.

use crate::error::DomainError;
use smallvec::SmallVec;

/// Facts emitted by a successful reduction.
///
/// Most actions produce one or two facts, so they stay inline.
pub type Facts<F> = SmallVec<[F; 4]>;

/// A reducer applies an action to state and reports what happened.
///
/// Implementations validate before mutating: when `reduce` returns an
/// error the state is exactly as it was before the call.
pub trait Reducer {
    /// The state this reducer operates on.
    type State;
    /// The commands this reducer accepts.
    type Action;
    /// Injected dependencies (clock, configuration).
    type Environment;
    /// What the reducer reports after a successful reduction.
    type Fact;

    /// Applies `action` to `state`.
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] when the action is invalid for the
    /// current state. The state is left untouched in that case.
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Result<Facts<Self::Fact>, DomainError>;
}
