use log::info;

use crate::event::EntityRef;
use crate::event::Signal;
use crate::event::SignalPayload;
use crate::subscriber::Subscriber;
use crate::subscriber::error::SubscriberError;

/// Writes account activity to the log. Has no side effects on storage.
pub struct ActivityLogSubscriber;

impl ActivityLogSubscriber {
    pub const SIGNALS: &'static [Signal] = &[
        Signal::Registered,
        Signal::LoggedOut,
        Signal::Updated,
        Signal::Deleted,
        Signal::InfoGot,
        Signal::ArticleUpdated,
    ];
}

#[async_trait::async_trait]
impl Subscriber for ActivityLogSubscriber {
    fn name(&self) -> &'static str {
        "activity-log"
    }

    async fn callback(
        &self,
        signal: Signal,
        payload: &SignalPayload,
    ) -> Result<(), SubscriberError> {
        let actor = payload
            .actor
            .as_ref()
            .map_or_else(|| "anonymous".to_string(), |u| format!("{} (id {})", u.username, u.id));
        match &payload.target {
            Some(EntityRef::User(user)) => info!("{signal}: {actor} -> user {}", user.username),
            Some(EntityRef::Article { id, .. }) => info!("{signal}: {actor} -> article {id}"),
            None => info!("{signal}: {actor}"),
        }
        Ok(())
    }
}
