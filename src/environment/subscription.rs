use tokio::task::JoinHandle;

/// A live subscription to a backend event stream.
///
/// The stream is released exactly once: either through [`Subscription::unsubscribe`]
/// or, failing that, when the value is dropped.
pub struct Subscription {
    name: &'static str,
    cancel: Option<Box<dyn FnOnce() + Send>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(name: &'static str, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            name,
            cancel: Some(Box::new(cancel)),
            task: None,
        }
    }

    /// The task serving the stream, awaited by [`Subscription::close`]
    pub fn with_task(mut self, task: JoinHandle<()>) -> Self {
        self.task = Some(task);
        self
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Release the stream and wait until its task has finished
    pub async fn close(mut self) {
        self.release();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                log::error!("{} task failed: {e:?}", self.name);
            }
        }
    }

    fn release(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            log::debug!("Unsubscribing from {}", self.name);
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release()
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("name", &self.name)
            .field("active", &self.cancel.is_some())
            .field("task", &self.task.is_some())
            .finish()
    }
}
