//! # ProfileService
//!
//! Identity resolution and the thought listings shown on user and community profiles.

use domains::errors::{AppError, Result, StorageContext};
use domains::models::{
    AuthorSummary, CommunitySummary, ProfileOwner, ProfileThoughts, Thought, ThoughtView, User,
};
use uuid::Uuid;

use crate::expand::Expander;
use crate::thoughts::LISTING_DEPTH;
use crate::Ports;

pub struct ProfileService {
    ports: Ports,
}

impl ProfileService {
    pub fn new(ports: Ports) -> Self {
        Self { ports }
    }

    /// Maps an identity-provider user id to the internal User record.
    #[tracing::instrument(skip(self))]
    pub async fn resolve_user(&self, external_id: &str) -> Result<User> {
        self.ports
            .users
            .find_by_external_id(external_id)
            .await
            .during("fetch user")?
            .ok_or_else(|| AppError::not_found("User", external_id))
    }

    #[tracing::instrument(skip(self))]
    pub async fn fetch_user_thoughts(&self, user_id: Uuid) -> Result<ProfileThoughts> {
        const OP: &str = "fetch user posts";

        let user = self
            .ports
            .users
            .find_by_id(user_id)
            .await
            .during(OP)?
            .ok_or_else(|| AppError::not_found("User", user_id))?;

        let thoughts = self.listing(&user.thoughts).await.during(OP)?;
        Ok(ProfileThoughts {
            owner: ProfileOwner::User(AuthorSummary::from(&user)),
            thoughts,
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn fetch_community_thoughts(&self, community_id: Uuid) -> Result<ProfileThoughts> {
        const OP: &str = "fetch community posts";

        let community = self
            .ports
            .communities
            .find_by_id(community_id)
            .await
            .during(OP)?
            .ok_or_else(|| AppError::not_found("Community", community_id))?;

        let thoughts = self.listing(&community.thoughts).await.during(OP)?;
        Ok(ProfileThoughts {
            owner: ProfileOwner::Community(CommunitySummary::from(&community)),
            thoughts,
        })
    }

    /// Newest first; ids that no longer resolve are skipped.
    async fn listing(&self, ids: &[Uuid]) -> anyhow::Result<Vec<ThoughtView>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut thoughts: Vec<Thought> = self.ports.thoughts.find_many(ids).await?;
        thoughts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Expander::new(&self.ports)
            .expand(thoughts, LISTING_DEPTH)
            .await
    }
}
