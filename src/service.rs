//! Request-handling services. Each one publishes the signal for its primary
//! mutation once that mutation has been committed.

use std::sync::Arc;

use crate::event::event_bus::EventBus;
use crate::repository::Repository;
use crate::service::article_service::ArticleService;
use crate::service::maintenance_service::MaintenanceService;
use crate::service::user_service::UserService;

pub mod article_service;
pub mod error;
pub mod maintenance_service;
pub mod user_service;

/// Container for all application services.
pub struct Services {
    pub user: Arc<UserService>,
    pub article: Arc<ArticleService>,
    pub maintenance: Arc<MaintenanceService>,
}

impl Services {
    /// Creates and initializes all services.
    pub fn new(db: Arc<Repository>, bus: Arc<EventBus>) -> Self {
        Self {
            user: Arc::new(UserService::new(db.clone(), bus.clone())),
            article: Arc::new(ArticleService::new(db.clone(), bus)),
            maintenance: Arc::new(MaintenanceService::new(db)),
        }
    }
}
