//! Database table operations and implementations.

use chrono::DateTime;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::model::ArticleCounter;
use crate::model::ArticleModel;
use crate::model::FollowModel;
use crate::model::UserCounter;
use crate::model::UserModel;
use crate::repository::error::DatabaseError;

/// Base table struct providing database pool access.
#[derive(Clone)]
pub struct BaseTable {
    pub pool: SqlitePool,
}

impl BaseTable {
    /// Creates a new base table with the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Base trait for table operations.
#[async_trait::async_trait]
pub trait TableBase {
    /// Deletes all rows from the table.
    async fn delete_all(&self) -> Result<(), DatabaseError>;
}

/// Trait for tables with CRUD operations.
///
/// `update` writes the non-counter columns only, so a profile or article edit
/// never overwrites a counter that a subscriber changed in the meantime.
#[async_trait::async_trait]
pub trait Table<T, ID>: TableBase {
    async fn select_all(&self) -> Result<Vec<T>, DatabaseError>;
    async fn insert(&self, model: &T) -> Result<ID, DatabaseError>;
    async fn select(&self, id: &ID) -> Result<Option<T>, DatabaseError>;
    async fn update(&self, model: &T) -> Result<(), DatabaseError>;
    /// Returns `false` when no row had that id.
    async fn delete(&self, id: &ID) -> Result<bool, DatabaseError>;
}

macro_rules! impl_table {
    (
        $struct_name:ident,
        $model:ty,
        $table:expr,
        $pk:ident,
        $id_type:ty,
        $cols:expr,
        $vals:expr,
        $update_set:expr,
        [ $( $field:ident ),+ ]
    ) => {
        #[derive(Clone)]
        pub struct $struct_name {
            base: BaseTable,
        }

        impl $struct_name {
            pub fn new(pool: SqlitePool) -> Self {
                Self {
                    base: BaseTable::new(pool),
                }
            }
        }

        #[async_trait::async_trait]
        impl TableBase for $struct_name {
            async fn delete_all(&self) -> Result<(), DatabaseError> {
                sqlx::query(concat!("DELETE FROM ", $table))
                    .execute(&self.base.pool)
                    .await?;
                Ok(())
            }
        }

        #[async_trait::async_trait]
        impl Table<$model, $id_type> for $struct_name {
            async fn select_all(&self) -> Result<Vec<$model>, DatabaseError> {
                Ok(sqlx::query_as::<_, $model>(concat!("SELECT * FROM ", $table, " ORDER BY ", stringify!($pk)))
                    .fetch_all(&self.base.pool)
                    .await?)
            }

            async fn select(&self, id: &$id_type) -> Result<Option<$model>, DatabaseError> {
                Ok(
                    sqlx::query_as::<_, $model>(concat!("SELECT * FROM ", $table, " WHERE ", stringify!($pk), " = ?"))
                        .bind(id)
                        .fetch_optional(&self.base.pool)
                        .await?,
                )
            }

            async fn insert(&self, model: &$model) -> Result<$id_type, DatabaseError> {
                let mut query = sqlx::query_as::<_, ($id_type,)>(concat!(
                        "INSERT INTO ", $table, " (", $cols, ") VALUES (", $vals, ") RETURNING ", stringify!($pk)
                    ));

                $(
                    query = query.bind(&model.$field);
                )+

                let row = query.fetch_one(&self.base.pool).await?;
                Ok(row.0)
            }

            async fn update(&self, model: &$model) -> Result<(), DatabaseError> {
                let mut query = sqlx::query(concat!(
                        "UPDATE ", $table, " SET ", $update_set, " WHERE ", stringify!($pk), " = ?"
                    ));

                $(
                    query = query.bind(&model.$field);
                )+
                query = query.bind(&model.$pk);

                query.execute(&self.base.pool).await?;
                Ok(())
            }

            async fn delete(&self, id: &$id_type) -> Result<bool, DatabaseError> {
                let result = sqlx::query(concat!("DELETE FROM ", $table, " WHERE ", stringify!($pk), " = ?"))
                    .bind(id)
                    .execute(&self.base.pool)
                    .await?;
                Ok(result.rows_affected() > 0)
            }
        }
    };
}

// ============================================================================
// UserTable
// ============================================================================

impl_table!(
    UserTable,
    UserModel,
    "users",
    id,
    i64,
    "username, email, nickname, bio, avatar_url, is_active, is_staff, create_time, update_time, last_login",
    "?, ?, ?, ?, ?, ?, ?, ?, ?, ?",
    "username = ?, email = ?, nickname = ?, bio = ?, avatar_url = ?, is_active = ?, is_staff = ?, create_time = ?, update_time = ?, last_login = ?",
    [
        username,
        email,
        nickname,
        bio,
        avatar_url,
        is_active,
        is_staff,
        create_time,
        update_time,
        last_login
    ]
);

impl UserTable {
    pub async fn select_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserModel>, DatabaseError> {
        Ok(
            sqlx::query_as::<_, UserModel>("SELECT * FROM users WHERE username = ?")
                .bind(username)
                .fetch_optional(&self.base.pool)
                .await?,
        )
    }

    pub async fn exists_by_username(&self, username: &str) -> Result<bool, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(&self.base.pool)
            .await?;
        Ok(row.0 > 0)
    }

    /// Adds `delta` to a counter in a single statement.
    ///
    /// The read and the write happen inside SQLite, so concurrent callers
    /// cannot lose each other's updates. Returns `false` when the user is gone.
    pub async fn increment_counter(
        &self,
        id: i64,
        counter: UserCounter,
        delta: i64,
    ) -> Result<bool, DatabaseError> {
        let col = counter.column();
        let sql = format!("UPDATE users SET {col} = {col} + ? WHERE id = ?");
        let result = sqlx::query(&sql)
            .bind(delta)
            .bind(id)
            .execute(&self.base.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Overwrites a counter. Only counter reconciliation should call this.
    pub async fn set_counter(
        &self,
        id: i64,
        counter: UserCounter,
        value: i64,
    ) -> Result<bool, DatabaseError> {
        let sql = format!("UPDATE users SET {} = ? WHERE id = ?", counter.column());
        let result = sqlx::query(&sql)
            .bind(value)
            .bind(id)
            .execute(&self.base.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_last_login(
        &self,
        id: i64,
        at: &DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(at)
            .bind(id)
            .execute(&self.base.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Adds `delta` to the follower's `following_count` and the followee's
    /// `follower_count` in one transaction.
    ///
    /// Returns the id of a user that no longer exists, in which case nothing
    /// was written.
    pub async fn adjust_follow_counts(
        &self,
        follower_id: i64,
        followee_id: i64,
        delta: i64,
    ) -> Result<Option<i64>, DatabaseError> {
        let mut tx = self.base.pool.begin().await?;

        let updates = [
            (follower_id, UserCounter::Following),
            (followee_id, UserCounter::Followers),
        ];
        for (id, counter) in updates {
            let col = counter.column();
            let sql = format!("UPDATE users SET {col} = {col} + ? WHERE id = ?");
            let result = sqlx::query(&sql)
                .bind(delta)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() == 0 {
                tx.rollback().await?;
                return Ok(Some(id));
            }
        }

        tx.commit().await?;
        Ok(None)
    }

    /// Deletes an account and, in the same transaction, takes its follow
    /// edges out of the counters of the users on the other side.
    ///
    /// The edges themselves go with the row through `ON DELETE CASCADE`.
    /// Returns `false` when no row had that id.
    pub async fn delete_account(&self, id: i64) -> Result<bool, DatabaseError> {
        let mut tx = self.base.pool.begin().await?;

        sqlx::query(
            "UPDATE users SET follower_count = follower_count - 1 \
             WHERE id IN (SELECT followee_id FROM follows WHERE follower_id = ?)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "UPDATE users SET following_count = following_count - 1 \
             WHERE id IN (SELECT follower_id FROM follows WHERE followee_id = ?)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }
        tx.commit().await?;
        Ok(true)
    }
}

// ============================================================================
// ArticleTable
// ============================================================================

impl_table!(
    ArticleTable,
    ArticleModel,
    "articles",
    id,
    i64,
    "title, content, author_id, created_time, updated_time",
    "?, ?, ?, ?, ?",
    "title = ?, content = ?, author_id = ?, created_time = ?, updated_time = ?",
    [title, content, author_id, created_time, updated_time]
);

impl ArticleTable {
    /// Adds `delta` to an article counter. Returns `false` when the article is gone.
    pub async fn increment_counter(
        &self,
        id: i64,
        counter: ArticleCounter,
        delta: i64,
    ) -> Result<bool, DatabaseError> {
        let col = counter.column();
        let sql = format!("UPDATE articles SET {col} = {col} + ? WHERE id = ?");
        let result = sqlx::query(&sql)
            .bind(delta)
            .bind(id)
            .execute(&self.base.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn select_by_author(&self, author_id: i64) -> Result<Vec<ArticleModel>, DatabaseError> {
        Ok(sqlx::query_as::<_, ArticleModel>(
            "SELECT * FROM articles WHERE author_id = ? ORDER BY created_time DESC, id DESC",
        )
        .bind(author_id)
        .fetch_all(&self.base.pool)
        .await?)
    }

    /// Live article count, the source of truth for `users.article_count`.
    pub async fn count_by_author(&self, author_id: i64) -> Result<i64, DatabaseError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles WHERE author_id = ?")
            .bind(author_id)
            .fetch_one(&self.base.pool)
            .await?;
        Ok(count.0)
    }
}

// ============================================================================
// FollowTable
// ============================================================================

impl_table!(
    FollowTable,
    FollowModel,
    "follows",
    id,
    i64,
    "follower_id, followee_id, created_time",
    "?, ?, ?",
    "follower_id = ?, followee_id = ?, created_time = ?",
    [follower_id, followee_id, created_time]
);

impl FollowTable {
    pub async fn select_pair(
        &self,
        follower_id: i64,
        followee_id: i64,
    ) -> Result<Option<FollowModel>, DatabaseError> {
        Ok(sqlx::query_as::<_, FollowModel>(
            "SELECT * FROM follows WHERE follower_id = ? AND followee_id = ?",
        )
        .bind(follower_id)
        .bind(followee_id)
        .fetch_optional(&self.base.pool)
        .await?)
    }

    pub async fn delete_pair(&self, follower_id: i64, followee_id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND followee_id = ?")
            .bind(follower_id)
            .bind(followee_id)
            .execute(&self.base.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Number of users following `user_id`.
    pub async fn count_followers(&self, user_id: i64) -> Result<i64, DatabaseError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM follows WHERE followee_id = ?")
            .bind(user_id)
            .fetch_one(&self.base.pool)
            .await?;
        Ok(count.0)
    }

    /// Number of users `user_id` follows.
    pub async fn count_following(&self, user_id: i64) -> Result<i64, DatabaseError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM follows WHERE follower_id = ?")
            .bind(user_id)
            .fetch_one(&self.base.pool)
            .await?;
        Ok(count.0)
    }
}
