mod action;
mod reducer;
mod state;

pub use action::TalkAction;
pub use reducer::{reduce, TalkStore};
pub use state::{FormField, FormState, TalkList, TalkState};

use crate::environment::Environment;
use crate::store::{Context, Effect, Reducer};

pub struct TalkReducer;

impl Reducer for TalkReducer {
    type Action = TalkAction;

    type State = TalkState;

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
        Some(TalkAction::Mount)
    }
}
