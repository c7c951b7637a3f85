pub mod auth;
pub mod model;
pub mod repository;
pub mod subscription;
pub mod types;

#[cfg(test)]
pub mod mock;

use std::sync::Arc;

use async_trait::async_trait;

pub use auth::HostedUiAuth;
pub use model::GraphQlModel;
pub use repository::Repository;
pub use subscription::Subscription;

use self::types::{ClientId, Identity, Talk, TalkId};

/// The hosted backend that stores talks
#[async_trait]
pub trait TalkApi: Send + Sync {
    async fn list_talks(&self) -> Result<Vec<Talk>, String>;
    async fn create_talk(&self, talk: &Talk) -> Result<Talk, String>;
    async fn delete_talk(&self, id: &TalkId) -> Result<TalkId, String>;
    /// Calls `sender` for every talk created by any client until the
    /// returned subscription is released. If the backend ends the stream
    /// first, `sender` receives a final [`FeedEvent::Ended`].
    async fn subscribe_created(
        &self,
        sender: Arc<dyn Fn(FeedEvent) + Send + Sync>,
    ) -> Result<Subscription, String>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Created(Talk),
    /// The stream stopped without being released
    Ended(String),
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Fails when nobody is signed in
    async fn current_user(&self) -> Result<Identity, String>;
    async fn federated_sign_in(&self) -> Result<(), String>;
    async fn complete_sign_in(&self, code: String) -> Result<Identity, String>;
    async fn sign_out(&self) -> Result<(), String>;
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SyncOperation {
    List,
    Create(TalkId),
    Delete(TalkId),
    Subscribe,
}

/// What happens when a backend call fails after the local state was
/// already updated.
pub trait SyncFailures: Send + Sync {
    fn failed(&self, operation: SyncOperation, error: &str);
}

/// Failures are only logged. Local state is kept as is until the next reload.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFailures;

impl SyncFailures for LogFailures {
    fn failed(&self, operation: SyncOperation, error: &str) {
        log::error!("{operation:?} failed: {error}");
    }
}

#[derive(Clone)]
pub struct Environment {
    pub api: Arc<dyn TalkApi>,
    pub auth: Arc<dyn AuthProvider>,
    pub failures: Arc<dyn SyncFailures>,
    pub client_id: ClientId,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("client_id", &self.client_id)
            .finish()
    }
}

impl Environment {
    pub fn new(
        api: Arc<dyn TalkApi>,
        auth: Arc<dyn AuthProvider>,
        failures: Arc<dyn SyncFailures>,
        client_id: ClientId,
    ) -> Self {
        Self {
            api,
            auth,
            failures,
            client_id,
        }
    }
}

pub(crate) trait ResultExt {
    type Output;
    fn string_error(self, call: &'static str) -> Result<Self::Output, String>;
}

impl<T, E: std::fmt::Debug> ResultExt for Result<T, E> {
    type Output = T;
    fn string_error(self, call: &'static str) -> Result<T, String> {
        self.map_err(|e| {
            let string_error = format!("API Error: {call} {e:?}");
            // reported once by whoever handles the error
            log::debug!("{string_error}");
            string_error
        })
    }
}
