//! Account operations: registration, login, profile and follow graph.

use std::sync::Arc;

use chrono::Utc;
use log::info;

use crate::event::EntityRef;
use crate::event::Signal;
use crate::event::SignalPayload;
use crate::event::UserRef;
use crate::event::event_bus::EventBus;
use crate::model::FollowModel;
use crate::model::ProfileUpdate;
use crate::model::UserInfo;
use crate::model::UserModel;
use crate::repository::Repository;
use crate::repository::table::Table;
use crate::service::error::ServiceError;
use crate::service::error::is_unique_violation;

/// Data accepted at registration. Credentials are checked upstream.
#[derive(Clone, Debug, Default)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub nickname: Option<String>,
}

pub struct UserService {
    db: Arc<Repository>,
    bus: Arc<EventBus>,
}

impl UserService {
    pub fn new(db: Arc<Repository>, bus: Arc<EventBus>) -> Self {
        Self { db, bus }
    }

    /// Creates an account and publishes `registered`.
    ///
    /// The nickname defaults to the username.
    pub async fn register(&self, req: RegisterRequest) -> Result<UserModel, ServiceError> {
        let username = req.username.trim();
        let email = req.email.trim();
        if username.is_empty() || email.is_empty() {
            return Err(ServiceError::invalid("Missing username or email"));
        }
        if self.db.user.exists_by_username(username).await? {
            return Err(ServiceError::UsernameTaken {
                username: username.to_string(),
            });
        }

        let now = Utc::now();
        let model = UserModel {
            username: username.to_string(),
            email: email.to_string(),
            nickname: req
                .nickname
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| username.to_string()),
            create_time: now,
            update_time: now,
            ..Default::default()
        };
        let id = match self.db.user.insert(&model).await {
            Ok(id) => id,
            // Lost a race with a concurrent registration of the same name.
            Err(e) if is_unique_violation(&e) => {
                return Err(ServiceError::UsernameTaken {
                    username: username.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        let user = self.load(id).await?;
        info!("Registered user {} (id {})", user.username, user.id);

        let _ = self
            .bus
            .publish(Signal::Registered, SignalPayload::from_user(&user))
            .await;
        Ok(user)
    }

    /// Resolves the authenticated user and publishes `logged-in`.
    pub async fn login(&self, username: &str) -> Result<UserModel, ServiceError> {
        let user = self.load_by_username(username).await?;
        if !user.is_active {
            return Err(ServiceError::Inactive {
                username: user.username,
            });
        }
        let _ = self
            .bus
            .publish(Signal::LoggedIn, SignalPayload::from_user(&user))
            .await;
        Ok(user)
    }

    pub async fn logout(&self, user: &UserModel) {
        let _ = self
            .bus
            .publish(Signal::LoggedOut, SignalPayload::from_user(user))
            .await;
    }

    /// Applies the allow-listed profile fields and publishes `updated` when
    /// something actually changed.
    pub async fn update_profile(
        &self,
        user_id: i64,
        update: ProfileUpdate,
    ) -> Result<UserModel, ServiceError> {
        if update.is_empty() {
            return Err(ServiceError::invalid("Nothing to update"));
        }
        if update.email.as_deref().is_some_and(|e| e.trim().is_empty()) {
            return Err(ServiceError::invalid("Email cannot be empty"));
        }

        let mut user = self.load(user_id).await?;
        if !update.apply(&mut user) {
            return Ok(user);
        }
        user.update_time = Utc::now();
        self.db.user.update(&user).await?;

        let _ = self
            .bus
            .publish(Signal::Updated, SignalPayload::from_user(&user))
            .await;
        self.load(user_id).await
    }

    /// Public profile lookup. Publishes `info-got`.
    pub async fn get_info(&self, username: &str) -> Result<UserInfo, ServiceError> {
        let user = self.load_by_username(username).await?;
        let _ = self
            .bus
            .publish(Signal::InfoGot, SignalPayload::from_user(&user))
            .await;
        Ok(UserInfo::from(&user))
    }

    /// Deletes an account. Allowed for staff and for the account owner.
    ///
    /// Follow counters of the users on the other side of the account's
    /// follow edges are decremented together with the delete.
    pub async fn delete(&self, actor: &UserModel, user_id: i64) -> Result<(), ServiceError> {
        if !actor.is_staff && actor.id != user_id {
            return Err(ServiceError::PermissionDenied {
                message: format!("{} cannot delete user {user_id}", actor.username),
            });
        }
        let user = self.load(user_id).await?;
        if !self.db.user.delete_account(user_id).await? {
            return Err(ServiceError::not_found("user", user_id));
        }
        info!("Deleted user {} (id {})", user.username, user.id);

        let payload =
            SignalPayload::from_user(actor).with_target(EntityRef::User(UserRef::from(&user)));
        let _ = self.bus.publish(Signal::Deleted, payload).await;
        Ok(())
    }

    /// Records that `follower` follows `username` and publishes `followed`.
    pub async fn follow(&self, follower: &UserModel, username: &str) -> Result<(), ServiceError> {
        let followee = self.load_by_username(username).await?;
        if followee.id == follower.id {
            return Err(ServiceError::invalid("Users cannot follow themselves"));
        }
        if self
            .db
            .follow
            .select_pair(follower.id, followee.id)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict {
                message: format!("{} already follows {}", follower.username, followee.username),
            });
        }

        let edge = FollowModel {
            follower_id: follower.id,
            followee_id: followee.id,
            ..Default::default()
        };
        match self.db.follow.insert(&edge).await {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(ServiceError::Conflict {
                    message: format!(
                        "{} already follows {}",
                        follower.username, followee.username
                    ),
                });
            }
            Err(e) => return Err(e.into()),
        }

        let payload = SignalPayload::from_user(follower)
            .with_target(EntityRef::User(UserRef::from(&followee)));
        let _ = self.bus.publish(Signal::Followed, payload).await;
        Ok(())
    }

    /// Removes a follow edge and publishes `unfollowed`.
    pub async fn unfollow(&self, follower: &UserModel, username: &str) -> Result<(), ServiceError> {
        let followee = self.load_by_username(username).await?;
        if !self.db.follow.delete_pair(follower.id, followee.id).await? {
            return Err(ServiceError::not_found(
                "follow",
                format!("{} -> {}", follower.username, followee.username),
            ));
        }

        let payload = SignalPayload::from_user(follower)
            .with_target(EntityRef::User(UserRef::from(&followee)));
        let _ = self.bus.publish(Signal::Unfollowed, payload).await;
        Ok(())
    }

    async fn load(&self, user_id: i64) -> Result<UserModel, ServiceError> {
        self.db
            .user
            .select(&user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("user", user_id))
    }

    async fn load_by_username(&self, username: &str) -> Result<UserModel, ServiceError> {
        self.db
            .user
            .select_by_username(username)
            .await?
            .ok_or_else(|| ServiceError::not_found("user", username))
    }
}
