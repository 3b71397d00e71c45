//! Named signals and the payload every publish call carries.

use std::fmt;
use std::str::FromStr;

use crate::event::error::EventError;
use crate::model::UserModel;
use crate::subscriber::error::SubscriberError;

pub mod error;
pub mod event_bus;

macro_rules! signals {
    ( $( $variant:ident => $name:literal ),+ $(,)? ) => {
        /// A named event kind. The set is closed: channels exist from process
        /// start and cannot be created at runtime.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Signal {
            $( $variant, )+
        }

        impl Signal {
            pub const ALL: &'static [Signal] = &[ $( Signal::$variant, )+ ];

            pub fn name(self) -> &'static str {
                match self {
                    $( Signal::$variant => $name, )+
                }
            }
        }

        impl FromStr for Signal {
            type Err = EventError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $name => Ok(Signal::$variant), )+
                    _ => Err(EventError::UnknownSignal { name: s.to_string() }),
                }
            }
        }
    };
}

signals! {
    Registered => "registered",
    LoggedIn => "logged-in",
    LoggedOut => "logged-out",
    Updated => "updated",
    Deleted => "deleted",
    Followed => "followed",
    Unfollowed => "unfollowed",
    Liked => "liked",
    Unliked => "unliked",
    Commented => "commented",
    CommentDeleted => "comment-deleted",
    ArticleCreated => "article-created",
    ArticleDeleted => "article-deleted",
    ArticleLiked => "article-liked",
    ArticleUnliked => "article-unliked",
    ArticleCommented => "article-commented",
    ArticleCommentDeleted => "article-comment-deleted",
    ArticleUpdated => "article-updated",
    ArticleViewed => "article-viewed",
    Shared => "shared",
    ShareDeleted => "share-deleted",
    InfoGot => "info-got",
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity of a user as carried in a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub id: i64,
    pub username: String,
}

impl From<&UserModel> for UserRef {
    fn from(user: &UserModel) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

/// The entity an event is about, when it is not the actor itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
    User(UserRef),
    Article { id: i64, author_id: i64 },
}

/// Payload passed from a publisher to every handler of a signal.
///
/// All call sites use the same shape: `actor` is the user performing the
/// action (absent for anonymous requests), `target` is the affected entity.
/// Handlers pull out what they need and fail with
/// [`SubscriberError::MissingPayload`] when it is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalPayload {
    pub actor: Option<UserRef>,
    pub target: Option<EntityRef>,
}

impl SignalPayload {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn from_user(user: impl Into<UserRef>) -> Self {
        Self {
            actor: Some(user.into()),
            target: None,
        }
    }

    pub fn with_target(mut self, target: EntityRef) -> Self {
        self.target = Some(target);
        self
    }

    pub fn actor(&self, signal: Signal) -> Result<&UserRef, SubscriberError> {
        self.actor.as_ref().ok_or(SubscriberError::MissingPayload {
            signal,
            field: "actor",
        })
    }

    pub fn target_user(&self, signal: Signal) -> Result<&UserRef, SubscriberError> {
        match &self.target {
            Some(EntityRef::User(user)) => Ok(user),
            _ => Err(SubscriberError::MissingPayload {
                signal,
                field: "target user",
            }),
        }
    }

    /// Returns `(article_id, author_id)`.
    pub fn target_article(&self, signal: Signal) -> Result<(i64, i64), SubscriberError> {
        match self.target {
            Some(EntityRef::Article { id, author_id }) => Ok((id, author_id)),
            _ => Err(SubscriberError::MissingPayload {
                signal,
                field: "target article",
            }),
        }
    }
}
