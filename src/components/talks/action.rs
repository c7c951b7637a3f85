use crate::environment::subscription::Subscription;
use crate::environment::types::{Talk, TalkId};
use crate::environment::FeedEvent;

use super::FormField;

#[derive(Debug)]
pub enum TalkAction {
    SetField(FormField, String),
    ClearForm,
    ReplaceAll(Vec<Talk>),
    AddTalk(Talk),
    DeleteTalk(TalkId),
    /// Fetch the full list from the backend
    Load,
    Loaded(Result<Vec<Talk>, String>),
    /// Create a talk from the form
    Submit,
    Created(TalkId, Result<Talk, String>),
    Remove(TalkId),
    Deleted(TalkId, Result<TalkId, String>),
    /// Load and start listening for talks created elsewhere
    Mount,
    Subscribed(Result<Subscription, String>),
    RemoteCreated(Talk),
    /// The backend stopped the feed on its own
    SubscriptionEnded(String),
    Unmount,
    /// The released subscription finished shutting down
    Closed,
}

impl From<FeedEvent> for TalkAction {
    fn from(event: FeedEvent) -> Self {
        match event {
            FeedEvent::Created(talk) => TalkAction::RemoteCreated(talk),
            FeedEvent::Ended(reason) => TalkAction::SubscriptionEnded(reason),
        }
    }
}
