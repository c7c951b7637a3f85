//! A minimal reducer runtime.
//!
//! Every action, whether it comes from the user, from a finished future or
//! from a subscription callback, travels through the same channel and is
//! reduced one at a time against the state owned by the [`Store`].

use std::fmt::Debug;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::Future;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

pub trait Reducer {
    type Action: Debug + Send + 'static;
    type State;
    type Environment;

    fn reduce(
        context: &Context<Self::Action>,
        action: Self::Action,
        state: &mut Self::State,
        environment: &Self::Environment,
    ) -> Effect<Self::Action>;

    fn initial_action() -> Option<Self::Action> {
        None
    }
}

/// What a reducer asks the runtime to do after a state transition
pub enum Effect<A> {
    Nothing,
    Action(A),
    Future(BoxFuture<A>),
    Multiple(Vec<Effect<A>>),
}

impl<A> Effect<A> {
    pub const NONE: Self = Effect::Nothing;
}

impl<A: Send + 'static> Effect<A> {
    pub fn action(action: A) -> Self {
        Effect::Action(action)
    }

    /// Run `future` and feed its output, converted by `mapper`, back into the store
    pub fn future<T, F, M>(future: F, mapper: M) -> Self
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
        M: FnOnce(T) -> A + Send + 'static,
    {
        Effect::Future(Box::pin(async move { mapper(future.await) }))
    }

    pub fn merge2(a: Effect<A>, b: Effect<A>) -> Self {
        Effect::Multiple(vec![a, b])
    }
}

impl<A> Debug for Effect<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effect::Nothing => f.write_str("Effect::Nothing"),
            Effect::Action(_) => f.write_str("Effect::Action"),
            Effect::Future(_) => f.write_str("Effect::Future"),
            Effect::Multiple(e) => f.debug_tuple("Effect::Multiple").field(&e.len()).finish(),
        }
    }
}

/// Handed to reducers so they can hand out callbacks that dispatch back
/// into their own store (e.g. for long lived subscriptions).
pub struct Context<A> {
    sender: flume::Sender<A>,
}

impl<A> Clone for Context<A> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<A: Send + 'static> Context<A> {
    pub fn send(&self, action: A) {
        if self.sender.send(action).is_err() {
            log::debug!("Store is gone, dropping action");
        }
    }

    pub fn updater(&self) -> Arc<dyn Fn(A) + Send + Sync> {
        let sender = self.sender.clone();
        Arc::new(move |action| {
            let _ = sender.send(action);
        })
    }
}

pub struct Store<R: Reducer> {
    state: R::State,
    environment: R::Environment,
    context: Context<R::Action>,
    receiver: flume::Receiver<R::Action>,
}

impl<R: Reducer> Store<R> {
    /// Effects are spawned onto the current tokio runtime, so a store has to
    /// be driven from within one.
    pub fn new(state: R::State, environment: R::Environment) -> Self {
        let (sender, receiver) = flume::unbounded();
        let context = Context { sender };
        if let Some(action) = R::initial_action() {
            context.send(action);
        }
        Self {
            state,
            environment,
            context,
            receiver,
        }
    }

    pub fn state(&self) -> &R::State {
        &self.state
    }

    pub fn context(&self) -> Context<R::Action> {
        self.context.clone()
    }

    /// Reduce `action` right away
    pub fn send(&mut self, action: R::Action) {
        let effect = R::reduce(&self.context, action, &mut self.state, &self.environment);
        self.run(effect);
    }

    /// Reduce everything that is queued right now without waiting
    pub fn process_pending(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(action) = self.receiver.try_recv() {
            self.send(action);
            processed += 1;
        }
        processed
    }

    /// Wait for the next queued action and reduce it
    pub async fn next(&mut self) {
        // the store keeps a sender alive, so the channel never disconnects
        if let Ok(action) = self.receiver.recv_async().await {
            self.send(action);
        }
    }

    fn run(&self, effect: Effect<R::Action>) {
        match effect {
            Effect::Nothing => (),
            Effect::Action(action) => self.context.send(action),
            Effect::Future(future) => {
                let context = self.context.clone();
                tokio::spawn(async move {
                    let action = future.await;
                    context.send(action);
                });
            }
            Effect::Multiple(effects) => {
                for effect in effects {
                    self.run(effect);
                }
            }
        }
    }
}
