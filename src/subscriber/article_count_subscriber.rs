use std::sync::Arc;

use log::debug;

use crate::event::EntityRef;
use crate::event::Signal;
use crate::event::SignalPayload;
use crate::model::UserCounter;
use crate::repository::Repository;
use crate::subscriber::Subscriber;
use crate::subscriber::error::SubscriberError;

/// Keeps `users.article_count` in step with the articles a user authored.
pub struct ArticleCountSubscriber {
    db: Arc<Repository>,
}

impl ArticleCountSubscriber {
    pub const SIGNALS: &'static [Signal] = &[Signal::ArticleCreated, Signal::ArticleDeleted];

    pub fn new(db: Arc<Repository>) -> Self {
        Self { db }
    }

    /// The article's author when the payload names the article, else the actor.
    ///
    /// A staff member deleting someone else's article must decrement the
    /// author, not themselves.
    fn author_id(signal: Signal, payload: &SignalPayload) -> Result<i64, SubscriberError> {
        match payload.target {
            Some(EntityRef::Article { author_id, .. }) => Ok(author_id),
            _ => Ok(payload.actor(signal)?.id),
        }
    }
}

#[async_trait::async_trait]
impl Subscriber for ArticleCountSubscriber {
    fn name(&self) -> &'static str {
        "article-count"
    }

    async fn callback(
        &self,
        signal: Signal,
        payload: &SignalPayload,
    ) -> Result<(), SubscriberError> {
        let delta = match signal {
            Signal::ArticleCreated => 1,
            Signal::ArticleDeleted => -1,
            _ => {
                debug!("{} ignoring {signal}", self.name());
                return Ok(());
            }
        };

        let author_id = Self::author_id(signal, payload)?;
        if !self
            .db
            .user
            .increment_counter(author_id, UserCounter::Articles, delta)
            .await?
        {
            return Err(SubscriberError::NotFound {
                entity: "user",
                id: author_id,
            });
        }
        debug!("article_count of user {author_id} adjusted by {delta}");
        Ok(())
    }
}
