use crate::environment::types::Identity;
use crate::environment::Environment;
use crate::store::{Context, Effect};

pub type SessionStore = crate::store::Store<super::SessionReducer>;

#[derive(Debug, Clone)]
pub enum SessionAction {
    Check,
    Checked(Result<Identity, String>),
    SignIn,
    SignInStarted(Result<(), String>),
    /// The code the hosted sign in page redirected with
    EnteredCode(String),
    SignedIn(Result<Identity, String>),
    SignOut,
    SignedOut(Result<(), String>),
}

#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct SessionState {
    pub identity: Option<Identity>,
    pub is_loading: bool,
    pub error_message: Option<String>,
}

impl SessionState {
    pub fn is_signed_in(&self) -> bool {
        self.identity.is_some()
    }

    pub fn greeting(&self) -> Option<String> {
        self.identity
            .as_ref()
            .map(|identity| format!("Hello, {}", identity.username))
    }
}

pub fn reduce(
    _context: &Context<SessionAction>,
    action: SessionAction,
    state: &mut SessionState,
    environment: &Environment,
) -> Effect<SessionAction> {
    log::trace!("{action:?}");
    let auth = environment.auth.clone();
    match action {
        SessionAction::Check => {
            state.is_loading = true;
            Effect::future(
                async move { auth.current_user().await },
                SessionAction::Checked,
            )
        }
        SessionAction::Checked(result) => {
            state.is_loading = false;
            match result {
                Ok(identity) => state.identity = Some(identity),
                Err(e) => {
                    log::debug!("Not signed in: {e}");
                    state.identity = None;
                }
            }
            Effect::NONE
        }
        SessionAction::SignIn => Effect::future(
            async move { auth.federated_sign_in().await },
            SessionAction::SignInStarted,
        ),
        SessionAction::SignInStarted(result) => {
            if let Err(e) = result {
                log::error!("Could not start sign in: {e}");
            }
            Effect::NONE
        }
        SessionAction::EnteredCode(code) => {
            state.is_loading = true;
            state.error_message = None;
            Effect::future(
                async move { auth.complete_sign_in(code).await },
                SessionAction::SignedIn,
            )
        }
        SessionAction::SignedIn(result) => {
            state.is_loading = false;
            if let Err(e) = result {
                log::error!("Sign in failed: {e}");
                state.error_message = Some(format!("Sign in failed: {e}"));
            }
            Effect::action(SessionAction::Check)
        }
        SessionAction::SignOut => Effect::future(
            async move { auth.sign_out().await },
            SessionAction::SignedOut,
        ),
        SessionAction::SignedOut(result) => {
            if let Err(e) = result {
                log::error!("Could not sign out: {e}");
            }
            Effect::action(SessionAction::Check)
        }
    }
}
