use std::sync::Arc;

use chrono::Utc;

use crate::event::Signal;
use crate::event::SignalPayload;
use crate::repository::Repository;
use crate::subscriber::Subscriber;
use crate::subscriber::error::SubscriberError;

/// Stamps `users.last_login` on every successful login.
pub struct LastLoginSubscriber {
    db: Arc<Repository>,
}

impl LastLoginSubscriber {
    pub fn new(db: Arc<Repository>) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl Subscriber for LastLoginSubscriber {
    fn name(&self) -> &'static str {
        "last-login"
    }

    async fn callback(
        &self,
        signal: Signal,
        payload: &SignalPayload,
    ) -> Result<(), SubscriberError> {
        let user = payload.actor(signal)?;
        if !self.db.user.set_last_login(user.id, &Utc::now()).await? {
            return Err(SubscriberError::NotFound {
                entity: "user",
                id: user.id,
            });
        }
        Ok(())
    }
}
