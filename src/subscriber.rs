//! Event subscribers that apply side effects of published signals.

pub mod activity_log_subscriber;
pub mod article_count_subscriber;
pub mod article_view_subscriber;
pub mod error;
pub mod follow_count_subscriber;
pub mod last_login_subscriber;

use std::sync::Arc;

use crate::event::Signal;
use crate::event::SignalPayload;
use crate::event::error::EventError;
use crate::event::event_bus::EventBus;
use crate::repository::Repository;
use crate::subscriber::activity_log_subscriber::ActivityLogSubscriber;
use crate::subscriber::article_count_subscriber::ArticleCountSubscriber;
use crate::subscriber::article_view_subscriber::ArticleViewSubscriber;
use crate::subscriber::error::SubscriberError;
use crate::subscriber::follow_count_subscriber::FollowCountSubscriber;
use crate::subscriber::last_login_subscriber::LastLoginSubscriber;

/// Trait for event subscribers.
///
/// A subscriber may be registered on several signals and receives the signal
/// it is being called for. Side effects must not depend on the order in which
/// subscribers of the same signal run.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Subscriber: Send + Sync {
    /// Name used in dispatch logs.
    fn name(&self) -> &'static str;

    /// Called when a signal this subscriber is registered on is published.
    async fn callback(&self, signal: Signal, payload: &SignalPayload)
    -> Result<(), SubscriberError>;
}

/// Registers every built-in subscriber on `bus`.
///
/// Called once at startup, before any service can publish.
pub fn register_all(bus: &EventBus, db: Arc<Repository>) -> Result<(), EventError> {
    bus.subscribe_all(
        ArticleCountSubscriber::SIGNALS,
        Arc::new(ArticleCountSubscriber::new(db.clone())),
    )
    .subscribe_all(
        FollowCountSubscriber::SIGNALS,
        Arc::new(FollowCountSubscriber::new(db.clone())),
    )
    .subscribe(
        bus.define("article-viewed")?,
        Arc::new(ArticleViewSubscriber::new(db.clone())),
    )
    .subscribe(
        bus.define("logged-in")?,
        Arc::new(LastLoginSubscriber::new(db)),
    )
    .subscribe_all(ActivityLogSubscriber::SIGNALS, Arc::new(ActivityLogSubscriber));
    Ok(())
}
