use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::time::Duration;

use futures::FutureExt;
use log::debug;
use log::error;
use log::warn;
use tracing::Instrument;

use crate::event::Signal;
use crate::event::SignalPayload;
use crate::event::error::EventError;
use crate::event::error::HandlerError;
use crate::subscriber::Subscriber;
use crate::subscriber::error::SubscriberError;

type AsyncCallback = Box<
    dyn Fn(SignalPayload) -> Pin<Box<dyn Future<Output = Result<(), SubscriberError>> + Send>>
        + Send
        + Sync,
>;
type Subscribers = RwLock<HashMap<Signal, Vec<Arc<dyn Subscriber>>>>;

/// Bounded retry for handlers failing with a transient error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. `0` behaves like `1`.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(50),
        }
    }
}

/// A handler that gave up during one publish call.
#[derive(Debug)]
pub struct HandlerFailure {
    pub handler: &'static str,
    pub attempts: u32,
    pub error: HandlerError,
}

/// Outcome of one publish call.
///
/// Informational only: the publisher has already committed its primary
/// mutation, so nothing here is meant to be turned back into a request error.
#[derive(Debug)]
#[must_use = "ignore with `let _ =` if the outcome is not needed"]
pub struct DispatchReport {
    pub signal: Signal,
    pub delivered: usize,
    pub failures: Vec<HandlerFailure>,
}

impl DispatchReport {
    fn empty(signal: Signal) -> Self {
        Self {
            signal,
            delivered: 0,
            failures: Vec::new(),
        }
    }

    /// Number of handlers invoked, successful or not.
    pub fn handled(&self) -> usize {
        self.delivered + self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Registry of signal subscriptions and the synchronous publisher over them.
///
/// Built once at startup, filled with subscriptions, then shared behind an
/// `Arc` with every request-handling service.
pub struct EventBus {
    subscribers: Subscribers,
    retry: RetryPolicy,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_retry_policy(RetryPolicy::default())
    }

    pub fn with_retry_policy(retry: RetryPolicy) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            retry,
        }
    }

    /// Resolves a channel by name.
    ///
    /// Used during startup wiring so an unknown name aborts the process
    /// before any request is served.
    pub fn define(&self, name: &str) -> Result<Signal, EventError> {
        name.parse()
    }

    pub fn subscribe(&self, signal: Signal, subscriber: Arc<dyn Subscriber>) -> &Self {
        debug!("Subscribing {} to {signal}", subscriber.name());
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(signal)
            .or_default()
            .push(subscriber);
        self
    }

    pub fn subscribe_all(&self, signals: &[Signal], subscriber: Arc<dyn Subscriber>) -> &Self {
        for signal in signals {
            self.subscribe(*signal, subscriber.clone());
        }
        self
    }

    /// Subscribes a closure. The closure receives its own copy of the payload.
    pub fn subscribe_fn<F, Fut>(&self, signal: Signal, name: &'static str, callback: F) -> &Self
    where
        F: Fn(SignalPayload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), SubscriberError>> + Send + 'static,
    {
        let callback: AsyncCallback = Box::new(move |payload| Box::pin(callback(payload)));
        self.subscribe(signal, Arc::new(CallbackSubscriber { name, callback }))
    }

    pub fn subscriber_count(&self, signal: Signal) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&signal)
            .map_or(0, Vec::len)
    }

    /// Runs every handler subscribed to `signal`, one after another in
    /// registration order, and returns once all of them have finished.
    ///
    /// Handler errors and panics stop at this boundary: they are logged and
    /// collected in the report, and the remaining handlers still run.
    /// Calling this twice for one occurrence applies every side effect twice.
    pub async fn publish(&self, signal: Signal, payload: SignalPayload) -> DispatchReport {
        let subscribers = self.subscribers_of(signal);
        if subscribers.is_empty() {
            debug!("No subscribers for {signal}");
            return DispatchReport::empty(signal);
        }

        debug!("Publishing {signal} to {} subscriber(s)", subscribers.len());
        let mut report = DispatchReport::empty(signal);
        for subscriber in subscribers {
            let span = tracing::debug_span!("handler", %signal, name = subscriber.name());
            match self
                .deliver(signal, subscriber.as_ref(), &payload)
                .instrument(span)
                .await
            {
                Ok(()) => report.delivered += 1,
                Err(failure) => {
                    error!(
                        "Handler {} failed on {signal} after {} attempt(s), dropping: {}",
                        failure.handler, failure.attempts, failure.error
                    );
                    report.failures.push(failure);
                }
            }
        }
        report
    }

    fn subscribers_of(&self, signal: Signal) -> Vec<Arc<dyn Subscriber>> {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&signal)
            .cloned()
            .unwrap_or_default()
    }

    async fn deliver(
        &self,
        signal: Signal,
        subscriber: &dyn Subscriber,
        payload: &SignalPayload,
    ) -> Result<(), HandlerFailure> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let outcome = AssertUnwindSafe(subscriber.callback(signal, payload))
                .catch_unwind()
                .await;
            let error = match outcome {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(err)) if err.is_transient() && attempt < max_attempts => {
                    warn!(
                        "Handler {} failed on {signal} (attempt {attempt}/{max_attempts}), retrying: {err}",
                        subscriber.name()
                    );
                    tokio::time::sleep(self.retry.delay).await;
                    attempt += 1;
                    continue;
                }
                Ok(Err(err)) => HandlerError::Failed(err),
                Err(panic) => HandlerError::Panicked {
                    message: panic_message(panic.as_ref()),
                },
            };
            return Err(HandlerFailure {
                handler: subscriber.name(),
                attempts: attempt,
                error,
            });
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

struct CallbackSubscriber {
    name: &'static str,
    callback: AsyncCallback,
}

#[async_trait::async_trait]
impl Subscriber for CallbackSubscriber {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn callback(&self, _signal: Signal, payload: &SignalPayload) -> Result<(), SubscriberError> {
        (self.callback)(payload.clone()).await
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::event::UserRef;
    use crate::repository::error::DatabaseError;
    use crate::subscriber::MockSubscriber;

    fn payload() -> SignalPayload {
        SignalPayload::from_user(UserRef {
            id: 1,
            username: "ada".to_string(),
        })
    }

    fn transient() -> SubscriberError {
        SubscriberError::DatabaseError(DatabaseError::BackendError(sqlx::Error::PoolTimedOut))
    }

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_define_resolves_known_names_only() {
        let bus = EventBus::new();
        assert_eq!(bus.define("article-created").unwrap(), Signal::ArticleCreated);
        assert!(bus.define("article-exploded").is_err());
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let bus = EventBus::new();
        let report = bus.publish(Signal::Shared, payload()).await;
        assert_eq!(report.handled(), 0);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_publish_only_reaches_its_channel() {
        let bus = EventBus::new();
        let mut created = MockSubscriber::new();
        created.expect_name().return_const("created");
        created
            .expect_callback()
            .times(1)
            .returning(|signal, _| {
                assert_eq!(signal, Signal::ArticleCreated);
                Ok(())
            });
        let mut deleted = MockSubscriber::new();
        deleted.expect_name().return_const("deleted");
        deleted.expect_callback().times(0);

        bus.subscribe(Signal::ArticleCreated, Arc::new(created))
            .subscribe(Signal::ArticleDeleted, Arc::new(deleted));

        let report = bus.publish(Signal::ArticleCreated, payload()).await;
        assert_eq!(report.delivered, 1);
    }

    #[tokio::test]
    async fn test_handlers_run_in_registration_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for name in ["first", "second", "third"] {
            let order = order.clone();
            bus.subscribe_fn(Signal::Registered, name, move |_| {
                order.lock().unwrap().push(name);
                async { Ok(()) }
            });
        }

        let report = bus.publish(Signal::Registered, payload()).await;
        assert_eq!(report.delivered, 3);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_stop_others() {
        let bus = EventBus::with_retry_policy(fast_retry(3));
        let calls = Arc::new(AtomicUsize::new(0));
        bus.subscribe_fn(Signal::ArticleCreated, "missing-user", |_| async {
            Err(SubscriberError::NotFound {
                entity: "user",
                id: 1,
            })
        });
        let counter = calls.clone();
        bus.subscribe_fn(Signal::ArticleCreated, "counter", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        });

        let report = bus.publish(Signal::ArticleCreated, payload()).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failures.len(), 1);
        let failure = &report.failures[0];
        assert_eq!(failure.handler, "missing-user");
        // Not transient, so no retry.
        assert_eq!(failure.attempts, 1);
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried_until_success() {
        let bus = EventBus::with_retry_policy(fast_retry(3));
        let attempts = Arc::new(AtomicUsize::new(0));
        let seen = attempts.clone();
        bus.subscribe_fn(Signal::ArticleCreated, "flaky", move |_| {
            let n = seen.fetch_add(1, Ordering::SeqCst);
            async move { if n < 2 { Err(transient()) } else { Ok(()) } }
        });

        let report = bus.publish(Signal::ArticleCreated, payload()).await;
        assert!(report.is_clean());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_transient_failure_is_dropped_after_max_attempts() {
        let bus = EventBus::with_retry_policy(fast_retry(2));
        let mut flaky = MockSubscriber::new();
        flaky.expect_name().return_const("always-busy");
        flaky
            .expect_callback()
            .times(2)
            .returning(|_, _| Err(transient()));
        bus.subscribe(Signal::ArticleDeleted, Arc::new(flaky));

        let report = bus.publish(Signal::ArticleDeleted, payload()).await;
        assert_eq!(report.delivered, 0);
        assert_eq!(report.failures[0].attempts, 2);
        assert!(matches!(report.failures[0].error, HandlerError::Failed(_)));
    }

    #[tokio::test]
    async fn test_panicking_handler_is_contained() {
        let bus = EventBus::new();
        async fn vanished(_: SignalPayload) -> Result<(), SubscriberError> {
            panic!("user row vanished")
        }
        bus.subscribe_fn(Signal::LoggedIn, "panics", vanished);
        bus.subscribe_fn(Signal::LoggedIn, "fine", |_| async { Ok(()) });

        let report = bus.publish(Signal::LoggedIn, payload()).await;
        assert_eq!(report.delivered, 1);
        match &report.failures[0].error {
            HandlerError::Panicked { message } => assert_eq!(message, "user row vanished"),
            other => panic!("expected panic failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_handlers_receive_the_published_payload() {
        let bus = EventBus::new();
        let received = Arc::new(Mutex::new(None));
        let slot = received.clone();
        bus.subscribe_fn(Signal::InfoGot, "capture", move |payload| {
            *slot.lock().unwrap() = Some(payload);
            async { Ok(()) }
        });

        let _ = bus.publish(Signal::InfoGot, payload()).await;
        assert_eq!(*received.lock().unwrap(), Some(payload()));
    }

    #[test]
    fn test_subscriber_count_per_signal() {
        let bus = EventBus::new();
        bus.subscribe_fn(Signal::Followed, "a", |_| async { Ok(()) })
            .subscribe_fn(Signal::Followed, "b", |_| async { Ok(()) });
        assert_eq!(bus.subscriber_count(Signal::Followed), 2);
        assert_eq!(bus.subscriber_count(Signal::Unfollowed), 0);
    }
}
