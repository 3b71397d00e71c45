use std::sync::Arc;

use crate::event::Signal;
use crate::event::SignalPayload;
use crate::model::ArticleCounter;
use crate::repository::Repository;
use crate::subscriber::Subscriber;
use crate::subscriber::error::SubscriberError;

/// Counts article reads into `articles.view_count`.
pub struct ArticleViewSubscriber {
    db: Arc<Repository>,
}

impl ArticleViewSubscriber {
    pub fn new(db: Arc<Repository>) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl Subscriber for ArticleViewSubscriber {
    fn name(&self) -> &'static str {
        "article-view"
    }

    async fn callback(
        &self,
        signal: Signal,
        payload: &SignalPayload,
    ) -> Result<(), SubscriberError> {
        let (article_id, _) = payload.target_article(signal)?;
        if !self
            .db
            .article
            .increment_counter(article_id, ArticleCounter::Views, 1)
            .await?
        {
            return Err(SubscriberError::NotFound {
                entity: "article",
                id: article_id,
            });
        }
        Ok(())
    }
}
