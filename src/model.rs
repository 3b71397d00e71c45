use chrono::DateTime;
use chrono::Utc;
use derive_builder::Builder;
use serde::Deserialize;
use serde::Serialize;
use sqlx::FromRow;

/// A registered account.
///
/// The `*_count` fields are denormalized counters. They are never the source
/// of truth for the related rows (articles, follows, ...) and are only
/// mutated by event subscribers or by counter reconciliation. Deleting an
/// account also decrements the follow counters on the other side of its edges.
#[derive(FromRow, Serialize, Deserialize, Clone, Debug)]
pub struct UserModel {
    #[serde(default)]
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub avatar_url: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default)]
    pub article_count: i64,
    #[serde(default)]
    pub comment_count: i64,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub star_count: i64,
    #[serde(default)]
    pub follower_count: i64,
    #[serde(default)]
    pub following_count: i64,
}

impl Default for UserModel {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            username: String::new(),
            email: String::new(),
            nickname: String::new(),
            bio: String::new(),
            avatar_url: String::new(),
            is_active: true,
            is_staff: false,
            create_time: now,
            update_time: now,
            last_login: None,
            article_count: 0,
            comment_count: 0,
            like_count: 0,
            star_count: 0,
            follower_count: 0,
            following_count: 0,
        }
    }
}

#[derive(FromRow, Serialize, Deserialize, Clone, Debug)]
pub struct ArticleModel {
    #[serde(default)]
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author_id: i64,
    pub created_time: DateTime<Utc>,
    pub updated_time: DateTime<Utc>,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub dislike_count: i64,
    #[serde(default)]
    pub star_count: i64,
    #[serde(default)]
    pub comment_count: i64,
    #[serde(default)]
    pub view_count: i64,
}

impl Default for ArticleModel {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            title: String::new(),
            content: String::new(),
            author_id: 0,
            created_time: now,
            updated_time: now,
            like_count: 0,
            dislike_count: 0,
            star_count: 0,
            comment_count: 0,
            view_count: 0,
        }
    }
}

/// Directed follow edge: `follower_id` follows `followee_id`.
#[derive(FromRow, Serialize, Clone, Debug)]
pub struct FollowModel {
    #[serde(default)]
    pub id: i64,
    pub follower_id: i64,
    pub followee_id: i64,
    pub created_time: DateTime<Utc>,
}

impl Default for FollowModel {
    fn default() -> Self {
        Self {
            id: 0,
            follower_id: 0,
            followee_id: 0,
            created_time: Utc::now(),
        }
    }
}

/// Counter columns on `users`. Only these may be incremented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserCounter {
    Articles,
    Comments,
    Likes,
    Stars,
    Followers,
    Following,
}

impl UserCounter {
    pub fn column(self) -> &'static str {
        match self {
            Self::Articles => "article_count",
            Self::Comments => "comment_count",
            Self::Likes => "like_count",
            Self::Stars => "star_count",
            Self::Followers => "follower_count",
            Self::Following => "following_count",
        }
    }

    pub fn read(self, user: &UserModel) -> i64 {
        match self {
            Self::Articles => user.article_count,
            Self::Comments => user.comment_count,
            Self::Likes => user.like_count,
            Self::Stars => user.star_count,
            Self::Followers => user.follower_count,
            Self::Following => user.following_count,
        }
    }
}

/// Counter columns on `articles`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArticleCounter {
    Likes,
    Dislikes,
    Stars,
    Comments,
    Views,
}

impl ArticleCounter {
    pub fn column(self) -> &'static str {
        match self {
            Self::Likes => "like_count",
            Self::Dislikes => "dislike_count",
            Self::Stars => "star_count",
            Self::Comments => "comment_count",
            Self::Views => "view_count",
        }
    }
}

/// Fields a user may change on their own profile.
///
/// `None` leaves the stored value untouched.
#[derive(Builder, Clone, Debug, Default)]
#[builder(pattern = "owned", default)]
pub struct ProfileUpdate {
    #[builder(setter(into, strip_option))]
    pub nickname: Option<String>,
    #[builder(setter(into, strip_option))]
    pub bio: Option<String>,
    #[builder(setter(into, strip_option))]
    pub email: Option<String>,
    #[builder(setter(into, strip_option))]
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.nickname.is_none()
            && self.bio.is_none()
            && self.email.is_none()
            && self.avatar_url.is_none()
    }

    /// Applies the set fields to `user`. Returns whether anything changed.
    pub fn apply(&self, user: &mut UserModel) -> bool {
        let mut changed = false;
        for (value, field) in [
            (&self.nickname, &mut user.nickname),
            (&self.bio, &mut user.bio),
            (&self.email, &mut user.email),
            (&self.avatar_url, &mut user.avatar_url),
        ] {
            if let Some(value) = value
                && field != value
            {
                *field = value.clone();
                changed = true;
            }
        }
        changed
    }
}

/// Public view of a user returned by profile lookups.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub nickname: String,
    pub bio: String,
    pub avatar_url: String,
    pub last_login: Option<DateTime<Utc>>,
    pub article_count: i64,
    pub comment_count: i64,
    pub like_count: i64,
    pub star_count: i64,
    pub follower_count: i64,
    pub following_count: i64,
}

impl From<&UserModel> for UserInfo {
    fn from(user: &UserModel) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            nickname: user.nickname.clone(),
            bio: user.bio.clone(),
            avatar_url: user.avatar_url.clone(),
            last_login: user.last_login,
            article_count: user.article_count,
            comment_count: user.comment_count,
            like_count: user.like_count,
            star_count: user.star_count,
            follower_count: user.follower_count,
            following_count: user.following_count,
        }
    }
}
