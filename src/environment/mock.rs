//! In-memory collaborators for reducer tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use super::subscription::Subscription;
use super::types::{ClientId, Identity, Talk, TalkId};
use super::{AuthProvider, Environment, FeedEvent, SyncFailures, SyncOperation, TalkApi};

pub fn make_talk(id: &str, client_id: &ClientId) -> Talk {
    Talk {
        id: TalkId::from(id),
        name: format!("Talk {id}"),
        description: "About things".to_string(),
        speaker_name: "Ada".to_string(),
        speaker_bio: "Counts".to_string(),
        client_id: client_id.clone(),
    }
}

#[derive(Default)]
pub struct MockApi {
    pub talks: Mutex<Vec<Talk>>,
    pub created: Mutex<Vec<Talk>>,
    pub deleted: Mutex<Vec<TalkId>>,
    pub fail: Mutex<bool>,
    pub subscribers: Mutex<Vec<Arc<dyn Fn(FeedEvent) + Send + Sync>>>,
    pub subscribe_calls: AtomicUsize,
    pub unsubscribe_calls: Arc<AtomicUsize>,
}

impl MockApi {
    pub fn with_talks(talks: Vec<Talk>) -> Self {
        Self {
            talks: Mutex::new(talks),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: Mutex::new(true),
            ..Default::default()
        }
    }

    /// Deliver `talk` to every subscriber, like the backend would
    pub fn push(&self, talk: Talk) {
        for subscriber in self.subscribers.lock().unwrap().iter() {
            subscriber(FeedEvent::Created(talk.clone()));
        }
    }

    /// Drop every feed from the backend side
    pub fn end_feeds(&self, reason: &str) {
        for subscriber in self.subscribers.lock().unwrap().drain(..) {
            subscriber(FeedEvent::Ended(reason.to_string()));
        }
    }

    pub fn unsubscribed(&self) -> usize {
        self.unsubscribe_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), String> {
        if *self.fail.lock().unwrap() {
            Err("backend unavailable".to_string())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TalkApi for MockApi {
    async fn list_talks(&self) -> Result<Vec<Talk>, String> {
        self.check()?;
        Ok(self.talks.lock().unwrap().clone())
    }

    async fn create_talk(&self, talk: &Talk) -> Result<Talk, String> {
        self.check()?;
        self.created.lock().unwrap().push(talk.clone());
        self.talks.lock().unwrap().push(talk.clone());
        Ok(talk.clone())
    }

    async fn delete_talk(&self, id: &TalkId) -> Result<TalkId, String> {
        self.check()?;
        self.deleted.lock().unwrap().push(id.clone());
        self.talks.lock().unwrap().retain(|talk| &talk.id != id);
        Ok(id.clone())
    }

    async fn subscribe_created(
        &self,
        sender: Arc<dyn Fn(FeedEvent) + Send + Sync>,
    ) -> Result<Subscription, String> {
        self.check()?;
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        self.subscribers.lock().unwrap().push(sender);
        let calls = self.unsubscribe_calls.clone();
        Ok(Subscription::new("mock", move || {
            calls.fetch_add(1, Ordering::SeqCst);
        }))
    }
}

#[derive(Default)]
pub struct MockAuth {
    pub user: Mutex<Option<String>>,
    pub sign_in_calls: AtomicUsize,
    pub sign_out_calls: AtomicUsize,
}

impl MockAuth {
    pub fn signed_in(username: &str) -> Self {
        Self {
            user: Mutex::new(Some(username.to_string())),
            ..Default::default()
        }
    }
}

#[async_trait]
impl AuthProvider for MockAuth {
    async fn current_user(&self) -> Result<Identity, String> {
        self.user
            .lock()
            .unwrap()
            .clone()
            .map(|username| Identity {
                username,
                expires_at: Utc::now() + Duration::hours(1),
            })
            .ok_or_else(|| "Not signed in".to_string())
    }

    async fn federated_sign_in(&self) -> Result<(), String> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn complete_sign_in(&self, code: String) -> Result<Identity, String> {
        if code.is_empty() {
            return Err("invalid_grant".to_string());
        }
        *self.user.lock().unwrap() = Some(format!("user-{code}"));
        self.current_user().await
    }

    async fn sign_out(&self) -> Result<(), String> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        *self.user.lock().unwrap() = None;
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordedFailures(pub Mutex<Vec<SyncOperation>>);

impl RecordedFailures {
    pub fn operations(&self) -> Vec<SyncOperation> {
        self.0.lock().unwrap().clone()
    }
}

impl SyncFailures for RecordedFailures {
    fn failed(&self, operation: SyncOperation, _error: &str) {
        self.0.lock().unwrap().push(operation);
    }
}

pub struct Mocks {
    pub api: Arc<MockApi>,
    pub auth: Arc<MockAuth>,
    pub failures: Arc<RecordedFailures>,
    pub environment: Environment,
}

pub fn environment(api: MockApi, auth: MockAuth) -> Mocks {
    let api = Arc::new(api);
    let auth = Arc::new(auth);
    let failures = Arc::new(RecordedFailures::default());
    let environment = Environment::new(
        api.clone(),
        auth.clone(),
        failures.clone(),
        ClientId::generate(),
    );
    Mocks {
        api,
        auth,
        failures,
        environment,
    }
}
