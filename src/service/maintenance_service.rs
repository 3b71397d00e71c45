//! Administrative and maintenance service.

use std::sync::Arc;

use log::info;
use log::warn;

use crate::model::UserCounter;
use crate::repository::Repository;
use crate::repository::error::DatabaseError;
use crate::repository::table::Table;

/// A counter that disagreed with the live rows and was rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterDrift {
    pub user_id: i64,
    pub username: String,
    pub counter: UserCounter,
    pub stored: i64,
    pub actual: i64,
}

/// Service for administrative and maintenance tasks.
pub struct MaintenanceService {
    db: Arc<Repository>,
}

impl MaintenanceService {
    /// Creates a new maintenance service.
    pub fn new(db: Arc<Repository>) -> Self {
        Self { db }
    }

    /// Recomputes the user counters that have a backing table and rewrites
    /// any that drifted.
    ///
    /// Runs without coordinating with live subscribers: an increment landing
    /// between the count and the rewrite is lost. Run it at startup or while
    /// traffic is quiet.
    pub async fn reconcile_counters(&self) -> Result<Vec<CounterDrift>, DatabaseError> {
        let users = self.db.user.select_all().await?;
        let mut drifts = Vec::new();

        for user in &users {
            let actual = [
                (
                    UserCounter::Articles,
                    self.db.article.count_by_author(user.id).await?,
                ),
                (
                    UserCounter::Followers,
                    self.db.follow.count_followers(user.id).await?,
                ),
                (
                    UserCounter::Following,
                    self.db.follow.count_following(user.id).await?,
                ),
            ];

            for (counter, actual) in actual {
                let stored = counter.read(user);
                if stored == actual {
                    continue;
                }
                warn!(
                    "{} of user {} drifted: stored {stored}, actual {actual}",
                    counter.column(),
                    user.username
                );
                self.db.user.set_counter(user.id, counter, actual).await?;
                drifts.push(CounterDrift {
                    user_id: user.id,
                    username: user.username.clone(),
                    counter,
                    stored,
                    actual,
                });
            }
        }

        info!(
            "Reconciled counters of {} user(s), {} correction(s).",
            users.len(),
            drifts.len()
        );
        Ok(drifts)
    }
}
