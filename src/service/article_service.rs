//! Article authoring. Every mutation publishes its signal after the row
//! change has been committed.

use std::sync::Arc;

use chrono::Utc;
use log::info;

use crate::event::EntityRef;
use crate::event::Signal;
use crate::event::SignalPayload;
use crate::event::event_bus::EventBus;
use crate::model::ArticleModel;
use crate::model::UserModel;
use crate::repository::Repository;
use crate::repository::table::Table;
use crate::service::error::ServiceError;

pub const MAX_TITLE_LEN: usize = 50;

#[derive(Clone, Debug, Default)]
pub struct ArticleDraft {
    pub title: String,
    pub content: String,
}

/// Partial article edit. `None` keeps the stored value.
#[derive(Clone, Debug, Default)]
pub struct ArticleUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
}

pub struct ArticleService {
    db: Arc<Repository>,
    bus: Arc<EventBus>,
}

impl ArticleService {
    pub fn new(db: Arc<Repository>, bus: Arc<EventBus>) -> Self {
        Self { db, bus }
    }

    pub async fn create(
        &self,
        author: &UserModel,
        draft: ArticleDraft,
    ) -> Result<ArticleModel, ServiceError> {
        validate_title(&draft.title)?;
        validate_content(&draft.content)?;

        let now = Utc::now();
        let model = ArticleModel {
            title: draft.title,
            content: draft.content,
            author_id: author.id,
            created_time: now,
            updated_time: now,
            ..Default::default()
        };
        let id = self.db.article.insert(&model).await?;
        let article = self.load(id).await?;
        info!("User {} created article {}", author.username, article.id);

        let _ = self
            .bus
            .publish(Signal::ArticleCreated, article_payload(Some(author), &article))
            .await;
        Ok(article)
    }

    /// Fetches an article for reading and publishes `article-viewed`.
    ///
    /// The returned model reflects the row before this view was counted.
    pub async fn view(
        &self,
        article_id: i64,
        viewer: Option<&UserModel>,
    ) -> Result<ArticleModel, ServiceError> {
        let article = self.load(article_id).await?;
        let _ = self
            .bus
            .publish(Signal::ArticleViewed, article_payload(viewer, &article))
            .await;
        Ok(article)
    }

    pub async fn update(
        &self,
        actor: &UserModel,
        article_id: i64,
        update: ArticleUpdate,
    ) -> Result<ArticleModel, ServiceError> {
        let mut article = self.load(article_id).await?;
        ensure_can_modify(actor, &article)?;

        if let Some(title) = update.title {
            validate_title(&title)?;
            article.title = title;
        }
        if let Some(content) = update.content {
            validate_content(&content)?;
            article.content = content;
        }
        article.updated_time = Utc::now();
        self.db.article.update(&article).await?;

        let _ = self
            .bus
            .publish(Signal::ArticleUpdated, article_payload(Some(actor), &article))
            .await;
        self.load(article_id).await
    }

    /// Deletes an article. Allowed for staff and for the author.
    pub async fn delete(&self, actor: &UserModel, article_id: i64) -> Result<(), ServiceError> {
        let article = self.load(article_id).await?;
        ensure_can_modify(actor, &article)?;

        if !self.db.article.delete(&article_id).await? {
            return Err(ServiceError::not_found("article", article_id));
        }
        info!("User {} deleted article {}", actor.username, article.id);

        let _ = self
            .bus
            .publish(Signal::ArticleDeleted, article_payload(Some(actor), &article))
            .await;
        Ok(())
    }

    pub async fn list_by_author(&self, author_id: i64) -> Result<Vec<ArticleModel>, ServiceError> {
        Ok(self.db.article.select_by_author(author_id).await?)
    }

    async fn load(&self, article_id: i64) -> Result<ArticleModel, ServiceError> {
        self.db
            .article
            .select(&article_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("article", article_id))
    }
}

fn article_payload(actor: Option<&UserModel>, article: &ArticleModel) -> SignalPayload {
    let payload = match actor {
        Some(user) => SignalPayload::from_user(user),
        None => SignalPayload::anonymous(),
    };
    payload.with_target(EntityRef::Article {
        id: article.id,
        author_id: article.author_id,
    })
}

fn ensure_can_modify(actor: &UserModel, article: &ArticleModel) -> Result<(), ServiceError> {
    if actor.is_staff || actor.id == article.author_id {
        Ok(())
    } else {
        Err(ServiceError::PermissionDenied {
            message: format!("{} is not the author of article {}", actor.username, article.id),
        })
    }
}

fn validate_title(title: &str) -> Result<(), ServiceError> {
    if title.trim().is_empty() {
        return Err(ServiceError::invalid("Title cannot be empty"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ServiceError::invalid(format!(
            "Title is longer than {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_content(content: &str) -> Result<(), ServiceError> {
    if content.trim().is_empty() {
        return Err(ServiceError::invalid("Content cannot be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_length_counts_chars() {
        assert!(validate_title(&"文".repeat(MAX_TITLE_LEN)).is_ok());
        assert!(validate_title(&"a".repeat(MAX_TITLE_LEN + 1)).is_err());
        assert!(validate_title("   ").is_err());
    }

    #[test]
    fn test_staff_and_author_can_modify() {
        let article = ArticleModel {
            id: 1,
            author_id: 10,
            ..Default::default()
        };
        let author = UserModel {
            id: 10,
            ..Default::default()
        };
        let staff = UserModel {
            id: 11,
            is_staff: true,
            ..Default::default()
        };
        let stranger = UserModel {
            id: 12,
            ..Default::default()
        };
        assert!(ensure_can_modify(&author, &article).is_ok());
        assert!(ensure_can_modify(&staff, &article).is_ok());
        assert!(matches!(
            ensure_can_modify(&stranger, &article),
            Err(ServiceError::PermissionDenied { .. })
        ));
    }
}
