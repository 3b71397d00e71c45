use std::sync::Arc;

use crate::event::Signal;
use crate::event::SignalPayload;
use crate::repository::Repository;
use crate::subscriber::Subscriber;
use crate::subscriber::error::SubscriberError;

/// Maintains `following_count` on the actor and `follower_count` on the
/// followed user.
pub struct FollowCountSubscriber {
    db: Arc<Repository>,
}

impl FollowCountSubscriber {
    pub const SIGNALS: &'static [Signal] = &[Signal::Followed, Signal::Unfollowed];

    pub fn new(db: Arc<Repository>) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl Subscriber for FollowCountSubscriber {
    fn name(&self) -> &'static str {
        "follow-count"
    }

    async fn callback(
        &self,
        signal: Signal,
        payload: &SignalPayload,
    ) -> Result<(), SubscriberError> {
        let delta = match signal {
            Signal::Followed => 1,
            Signal::Unfollowed => -1,
            _ => return Ok(()),
        };
        let follower = payload.actor(signal)?;
        let followee = payload.target_user(signal)?;

        // Both sides or neither.
        match self
            .db
            .user
            .adjust_follow_counts(follower.id, followee.id, delta)
            .await?
        {
            None => Ok(()),
            Some(id) => Err(SubscriberError::NotFound { entity: "user", id }),
        }
    }
}
