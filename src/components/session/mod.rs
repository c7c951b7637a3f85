mod reducer;

pub use reducer::{reduce, SessionAction, SessionState, SessionStore};

use crate::environment::Environment;
use crate::store::{Context, Effect, Reducer};

pub struct SessionReducer;

impl Reducer for SessionReducer {
    type Action = SessionAction;

    type State = SessionState;

    type Environment = Environment;

    fn reduce(
        context: &Context<Self::Action>,
        action: Self::Action,
        state: &mut Self::State,
        environment: &Self::Environment,
    ) -> Effect<Self::Action> {
        reducer::reduce(context, action, state, environment)
    }

    fn initial_action() -> Option<Self::Action> {
        Some(SessionAction::Check)
    }
}
