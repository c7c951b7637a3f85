use std::sync::Arc;

use crate::environment::types::TalkId;
use crate::environment::{Environment, SyncOperation};
use crate::store::{Context, Effect};

use super::{TalkAction, TalkState};

pub type TalkStore = crate::store::Store<super::TalkReducer>;

pub fn reduce(
    context: &Context<TalkAction>,
    action: TalkAction,
    state: &mut TalkState,
    environment: &Environment,
) -> Effect<TalkAction> {
    log::trace!("{action:?}");
    match action {
        TalkAction::SetField(field, value) => {
            state.set_field(field, value);
            Effect::NONE
        }
        TalkAction::ClearForm => {
            state.clear_form();
            Effect::NONE
        }
        TalkAction::ReplaceAll(talks) => {
            state.replace_all(talks);
            Effect::NONE
        }
        TalkAction::AddTalk(talk) => {
            state.add_talk(talk);
            Effect::NONE
        }
        TalkAction::DeleteTalk(id) => {
            state.delete_talk(&id);
            Effect::NONE
        }
        TalkAction::Load => {
            state.loading = true;
            let api = environment.api.clone();
            Effect::future(async move { api.list_talks().await }, TalkAction::Loaded)
        }
        TalkAction::Loaded(result) => {
            state.loading = false;
            match result {
                Ok(talks) => Effect::action(TalkAction::ReplaceAll(talks)),
                Err(e) => {
                    environment.failures.failed(SyncOperation::List, &e);
                    Effect::NONE
                }
            }
        }
        TalkAction::Submit => {
            if !state.form.is_complete() {
                log::debug!("Not creating a talk from an incomplete form");
                return Effect::NONE;
            }
            let talk = state
                .form
                .to_talk(TalkId::generate(), environment.client_id.clone());
            state.clear_form();
            state.add_talk(talk.clone());

            let api = environment.api.clone();
            let id = talk.id.clone();
            Effect::future(async move { api.create_talk(&talk).await }, move |result| {
                TalkAction::Created(id, result)
            })
        }
        TalkAction::Created(id, result) => {
            match result {
                Ok(_) => log::info!("New talk created {id}"),
                Err(e) => environment.failures.failed(SyncOperation::Create(id), &e),
            }
            Effect::NONE
        }
        TalkAction::Remove(id) => {
            if state.delete_talk(&id).is_none() {
                log::debug!("Removing unknown talk {id}");
            }
            let api = environment.api.clone();
            let cloned = id.clone();
            Effect::future(async move { api.delete_talk(&cloned).await }, move |result| {
                TalkAction::Deleted(id, result)
            })
        }
        TalkAction::Deleted(id, result) => {
            match result {
                Ok(deleted) => log::info!("This talk deleted: {deleted}"),
                Err(e) => environment.failures.failed(SyncOperation::Delete(id), &e),
            }
            Effect::NONE
        }
        TalkAction::Mount => {
            if state.mounted {
                return Effect::NONE;
            }
            state.mounted = true;
            let api = environment.api.clone();
            let updater = context.updater();
            let subscribe = Effect::future(
                async move {
                    api.subscribe_created(Arc::new(move |event| updater(TalkAction::from(event))))
                        .await
                },
                TalkAction::Subscribed,
            );
            Effect::merge2(Effect::action(TalkAction::Load), subscribe)
        }
        TalkAction::Subscribed(result) => {
            match result {
                Ok(subscription) if state.mounted => {
                    if let Some(previous) = state.subscription.replace(subscription) {
                        previous.unsubscribe();
                    }
                }
                Ok(subscription) => {
                    log::debug!("Unmounted before the subscription was ready");
                    subscription.unsubscribe();
                }
                Err(e) => {
                    state.mounted = false;
                    environment.failures.failed(SyncOperation::Subscribe, &e);
                }
            }
            Effect::NONE
        }
        TalkAction::RemoteCreated(talk) => {
            // we already have our own talks
            if talk.client_id == environment.client_id {
                log::trace!("Ignoring own talk {}", talk.id);
                return Effect::NONE;
            }
            state.add_talk(talk);
            Effect::NONE
        }
        TalkAction::SubscriptionEnded(reason) => {
            if !state.mounted {
                log::debug!("Feed ended after unmount: {reason}");
                return Effect::NONE;
            }
            // no retry, a later Mount subscribes again
            state.mounted = false;
            state.subscription = None;
            environment.failures.failed(SyncOperation::Subscribe, &reason);
            Effect::NONE
        }
        TalkAction::Unmount => {
            state.mounted = false;
            match state.subscription.take() {
                Some(subscription) => {
                    state.closing = true;
                    Effect::future(subscription.close(), |_| TalkAction::Closed)
                }
                None => Effect::NONE,
            }
        }
        TalkAction::Closed => {
            state.closing = false;
            Effect::NONE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::talks::{FormField, FormState};
    use crate::environment::mock::{self, make_talk, MockApi, MockAuth, RecordedFailures};
    use crate::environment::types::ClientId;
    use std::sync::Arc;

    async fn settle(store: &mut TalkStore) {
        loop {
            // spawned effects only make progress while we yield
            for _ in 0..10 {
                tokio::task::yield_now().await;
            }
            if store.process_pending() == 0 {
                break;
            }
        }
    }

    fn fill(store: &mut TalkStore, name: &str, description: &str, speaker: &str, bio: &str) {
        store.send(TalkAction::SetField(FormField::Name, name.to_string()));
        store.send(TalkAction::SetField(FormField::Description, description.to_string()));
        store.send(TalkAction::SetField(FormField::SpeakerName, speaker.to_string()));
        store.send(TalkAction::SetField(FormField::SpeakerBio, bio.to_string()));
    }

    #[tokio::test]
    async fn mount_loads_and_subscribes() {
        let other = ClientId::from("other");
        let mocks = mock::environment(
            MockApi::with_talks(vec![make_talk("a", &other), make_talk("b", &other)]),
            MockAuth::default(),
        );
        let mut store = TalkStore::new(TalkState::default(), mocks.environment);
        settle(&mut store).await;

        assert_eq!(store.state().talks.len(), 2);
        assert!(!store.state().loading);
        assert!(store.state().subscription.is_some());
        assert_eq!(
            mocks.api.subscribe_calls.load(std::sync::atomic::Ordering::SeqCst),
            1
        );
    }

    #[tokio::test]
    async fn second_mount_does_not_subscribe_again() {
        let mocks = mock::environment(MockApi::default(), MockAuth::default());
        let mut store = TalkStore::new(TalkState::default(), mocks.environment);
        settle(&mut store).await;
        store.send(TalkAction::Mount);
        settle(&mut store).await;
        assert_eq!(
            mocks.api.subscribe_calls.load(std::sync::atomic::Ordering::SeqCst),
            1
        );
    }

    #[tokio::test]
    async fn submit_adds_one_talk_and_resets_the_form() {
        let mocks = mock::environment(MockApi::default(), MockAuth::default());
        let client_id = mocks.environment.client_id.clone();
        let mut store = TalkStore::new(TalkState::default(), mocks.environment);
        settle(&mut store).await;

        fill(&mut store, "A", "B", "C", "D");
        store.send(TalkAction::Submit);

        assert_eq!(store.state().form, FormState::default());
        assert_eq!(store.state().talks.len(), 1);
        let talk = store.state().talks.at(0).cloned().unwrap();
        assert_eq!(
            (
                talk.name.as_str(),
                talk.description.as_str(),
                talk.speaker_name.as_str(),
                talk.speaker_bio.as_str()
            ),
            ("A", "B", "C", "D")
        );
        assert_eq!(talk.client_id, client_id);

        settle(&mut store).await;
        assert_eq!(mocks.api.created.lock().unwrap().clone(), vec![talk]);
        assert!(mocks.failures.operations().is_empty());
    }

    #[tokio::test]
    async fn incomplete_form_is_not_submitted() {
        let mocks = mock::environment(MockApi::default(), MockAuth::default());
        let mut store = TalkStore::new(TalkState::default(), mocks.environment);
        settle(&mut store).await;

        fill(&mut store, "A", "B", "C", "");
        let form = store.state().form.clone();
        store.send(TalkAction::Submit);
        settle(&mut store).await;

        assert_eq!(store.state().form, form);
        assert!(store.state().talks.is_empty());
        assert!(mocks.api.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn every_submit_gets_its_own_id() {
        let mocks = mock::environment(MockApi::default(), MockAuth::default());
        let mut store = TalkStore::new(TalkState::default(), mocks.environment);
        settle(&mut store).await;

        fill(&mut store, "A", "B", "C", "D");
        store.send(TalkAction::Submit);
        fill(&mut store, "E", "F", "G", "H");
        store.send(TalkAction::Submit);
        settle(&mut store).await;

        assert_eq!(store.state().talks.len(), 2);
        let created = mocks.api.created.lock().unwrap().clone();
        assert_eq!(created.len(), 2);
        assert_ne!(created[0].id, created[1].id);
    }

    #[tokio::test]
    async fn remove_deletes_locally_and_remotely() {
        let other = ClientId::from("other");
        let mocks = mock::environment(
            MockApi::with_talks(vec![make_talk("x", &other)]),
            MockAuth::default(),
        );
        let mut store = TalkStore::new(TalkState::default(), mocks.environment);
        settle(&mut store).await;
        assert_eq!(store.state().talks.len(), 1);

        store.send(TalkAction::Remove(TalkId::from("x")));
        assert!(store.state().talks.is_empty());

        settle(&mut store).await;
        assert_eq!(
            mocks.api.deleted.lock().unwrap().clone(),
            vec![TalkId::from("x")]
        );
    }

    #[tokio::test]
    async fn own_pushes_are_ignored_and_others_are_merged() {
        let api = Arc::new(MockApi::default());
        let auth = Arc::new(MockAuth::default());
        let failures = Arc::new(RecordedFailures::default());
        let first = Environment::new(
            api.clone(),
            auth.clone(),
            failures.clone(),
            ClientId::generate(),
        );
        let second = Environment::new(api.clone(), auth.clone(), failures, ClientId::generate());
        let mut first = TalkStore::new(TalkState::default(), first);
        let mut second = TalkStore::new(TalkState::default(), second);
        settle(&mut first).await;
        settle(&mut second).await;

        fill(&mut first, "A", "B", "C", "D");
        first.send(TalkAction::Submit);
        settle(&mut first).await;

        let created = api.created.lock().unwrap()[0].clone();
        api.push(created.clone());
        settle(&mut first).await;
        settle(&mut second).await;

        assert_eq!(first.state().talks.len(), 1);
        assert_eq!(second.state().talks.len(), 1);
        assert_eq!(second.state().talks.at(0), Some(&created));
    }

    #[tokio::test]
    async fn remote_push_keeps_the_form() {
        let mocks = mock::environment(MockApi::default(), MockAuth::default());
        let mut store = TalkStore::new(TalkState::default(), mocks.environment);
        settle(&mut store).await;

        store.send(TalkAction::SetField(FormField::Name, "half done".to_string()));
        mocks.api.push(make_talk("remote", &ClientId::from("other")));
        settle(&mut store).await;

        assert_eq!(store.state().talks.len(), 1);
        assert_eq!(store.state().form.name, "half done");
    }

    #[tokio::test]
    async fn duplicate_push_does_not_duplicate() {
        let mocks = mock::environment(MockApi::default(), MockAuth::default());
        let mut store = TalkStore::new(TalkState::default(), mocks.environment);
        settle(&mut store).await;

        let talk = make_talk("remote", &ClientId::from("other"));
        mocks.api.push(talk.clone());
        mocks.api.push(talk);
        settle(&mut store).await;
        assert_eq!(store.state().talks.len(), 1);
    }

    #[tokio::test]
    async fn unmount_releases_the_subscription_once() {
        let mocks = mock::environment(MockApi::default(), MockAuth::default());
        let mut store = TalkStore::new(TalkState::default(), mocks.environment);
        settle(&mut store).await;

        store.send(TalkAction::Unmount);
        store.send(TalkAction::Unmount);
        assert!(store.state().subscription.is_none());
        assert!(store.state().closing);

        settle(&mut store).await;
        assert_eq!(mocks.api.unsubscribed(), 1);
        assert!(!store.state().closing);
    }

    #[tokio::test]
    async fn ended_feed_is_reported_and_can_be_remounted() {
        let mocks = mock::environment(MockApi::default(), MockAuth::default());
        let mut store = TalkStore::new(TalkState::default(), mocks.environment);
        settle(&mut store).await;
        assert!(store.state().subscription.is_some());

        mocks.api.end_feeds("Subscription rejected: unauthorized");
        settle(&mut store).await;

        assert_eq!(mocks.failures.operations(), vec![SyncOperation::Subscribe]);
        assert!(store.state().subscription.is_none());
        assert!(!store.state().mounted);
        assert_eq!(
            mocks.api.subscribe_calls.load(std::sync::atomic::Ordering::SeqCst),
            1
        );

        store.send(TalkAction::Mount);
        settle(&mut store).await;
        assert!(store.state().subscription.is_some());
        assert_eq!(
            mocks.api.subscribe_calls.load(std::sync::atomic::Ordering::SeqCst),
            2
        );
    }

    #[tokio::test]
    async fn feed_ending_after_unmount_is_not_a_failure() {
        let mocks = mock::environment(MockApi::default(), MockAuth::default());
        let mut store = TalkStore::new(TalkState::default(), mocks.environment);
        settle(&mut store).await;

        store.send(TalkAction::Unmount);
        mocks.api.end_feeds("Subscription connection closed");
        settle(&mut store).await;

        assert!(mocks.failures.operations().is_empty());
    }

    #[tokio::test]
    async fn late_subscription_is_released_right_away() {
        let mocks = mock::environment(MockApi::default(), MockAuth::default());
        let mut store = TalkStore::new(TalkState::default(), mocks.environment);
        // reduce the queued mount, then leave before the subscription is ready
        store.process_pending();
        store.send(TalkAction::Unmount);
        settle(&mut store).await;

        assert_eq!(mocks.api.unsubscribed(), 1);
        assert!(store.state().subscription.is_none());
    }

    #[tokio::test]
    async fn failures_are_reported_without_rollback() {
        let mocks = mock::environment(MockApi::failing(), MockAuth::default());
        let mut store = TalkStore::new(TalkState::default(), mocks.environment);
        settle(&mut store).await;

        fill(&mut store, "A", "B", "C", "D");
        store.send(TalkAction::Submit);
        settle(&mut store).await;
        let id = store.state().talks.at(0).map(|t| t.id.clone()).unwrap();

        store.send(TalkAction::Remove(id.clone()));
        settle(&mut store).await;

        let operations = mocks.failures.operations();
        assert!(operations.contains(&SyncOperation::List));
        assert!(operations.contains(&SyncOperation::Subscribe));
        assert!(operations.contains(&SyncOperation::Create(id.clone())));
        assert!(operations.contains(&SyncOperation::Delete(id)));
        assert!(store.state().talks.is_empty());
        assert!(!store.state().mounted);
    }

    #[tokio::test]
    async fn failed_reload_keeps_the_list() {
        let mocks = mock::environment(MockApi::default(), MockAuth::default());
        let mut store = TalkStore::new(TalkState::default(), mocks.environment);
        settle(&mut store).await;
        fill(&mut store, "A", "B", "C", "D");
        store.send(TalkAction::Submit);
        settle(&mut store).await;

        *mocks.api.fail.lock().unwrap() = true;
        store.send(TalkAction::Load);
        settle(&mut store).await;

        assert_eq!(store.state().talks.len(), 1);
        assert_eq!(mocks.failures.operations(), vec![SyncOperation::List]);
    }
}
