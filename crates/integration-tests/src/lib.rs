//! Shared fixtures for the cross-crate tests under `tests/`.
//!
//! [`scenarios`] holds end-to-end checks written once against [`World`] and
//! run by each backend's test target.

use std::sync::Arc;

use domains::models::{Community, FeedPage, PageRequest, Thought, User};
use domains::ports::{CommunityRepository, ThoughtRepository, UserRepository};
use services::{NewComment, NewThought, Ports, ProfileService, ThoughtService};
use storage_adapters::{InMemoryStore, StaleViewRegistry};
use uuid::Uuid;

pub mod scenarios;

/// A store with both services wired over it.
pub struct World<S> {
    pub store: Arc<S>,
    pub views: Arc<StaleViewRegistry>,
    pub thoughts: ThoughtService,
    pub profiles: ProfileService,
}

impl<S> World<S>
where
    S: ThoughtRepository + UserRepository + CommunityRepository + 'static,
{
    pub fn over(store: Arc<S>) -> Self {
        let views = Arc::new(StaleViewRegistry::new());
        let ports = Ports::from_store(store.clone(), views.clone());
        Self {
            store,
            views,
            thoughts: ThoughtService::new(ports.clone()),
            profiles: ProfileService::new(ports),
        }
    }

    pub async fn user(&self, username: &str) -> User {
        let user = User::new(
            format!("user_{username}"),
            username,
            username.to_uppercase(),
        );
        UserRepository::upsert(self.store.as_ref(), &user)
            .await
            .unwrap();
        user
    }

    pub async fn community(&self, username: &str) -> Community {
        let community = Community::new(
            format!("org_{username}"),
            username,
            username.to_uppercase(),
        );
        CommunityRepository::upsert(self.store.as_ref(), &community)
            .await
            .unwrap();
        community
    }

    pub async fn post(&self, author: &User, text: &str) -> Thought {
        self.post_in(author, text, None).await
    }

    pub async fn post_in(
        &self,
        author: &User,
        text: &str,
        community: Option<&Community>,
    ) -> Thought {
        self.thoughts
            .create_thought(NewThought {
                text: text.to_owned(),
                author_id: author.id,
                community_external_id: community.map(|c| c.external_id.clone()),
                path: "/".to_owned(),
            })
            .await
            .unwrap()
    }

    pub async fn reply(&self, parent_id: Uuid, author: &User, text: &str) -> Thought {
        self.thoughts
            .add_comment(NewComment {
                parent_id,
                text: text.to_owned(),
                author_id: author.id,
                path: format!("/thought/{parent_id}"),
            })
            .await
            .unwrap()
    }

    pub async fn stored(&self, id: Uuid) -> Option<Thought> {
        ThoughtRepository::find_by_id(self.store.as_ref(), id)
            .await
            .unwrap()
    }

    pub async fn feed(&self, number: u32, size: u32) -> FeedPage {
        self.thoughts
            .fetch_posts(PageRequest::new(number, size))
            .await
            .unwrap()
    }

    pub async fn user_list(&self, user: &User) -> Vec<Uuid> {
        UserRepository::find_by_id(self.store.as_ref(), user.id)
            .await
            .unwrap()
            .map(|u| u.thoughts)
            .unwrap_or_default()
    }

    pub async fn community_list(&self, community: &Community) -> Vec<Uuid> {
        CommunityRepository::find_by_id(self.store.as_ref(), community.id)
            .await
            .unwrap()
            .map(|c| c.thoughts)
            .unwrap_or_default()
    }
}

pub fn memory_world() -> World<InMemoryStore> {
    World::over(Arc::new(InMemoryStore::new()))
}

#[cfg(feature = "db-sqlite")]
pub async fn sqlite_world() -> World<storage_adapters::SqliteStore> {
    let store = storage_adapters::SqliteStore::in_memory().await.unwrap();
    World::over(Arc::new(store))
}
