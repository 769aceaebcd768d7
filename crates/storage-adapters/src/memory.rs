//! # In-memory store
//!
//! Implements every repository port over `DashMap`s. Each thought carries an
//! insertion sequence number, which stands in for the natural storage order
//! used to break `created_at` ties in the feed.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use domains::models::{Community, PageRequest, Thought, User};
use domains::ports::{CommunityRepository, ThoughtRepository, UserRepository};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Stored {
    seq: u64,
    thought: Thought,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    thoughts: DashMap<Uuid, Stored>,
    users: DashMap<Uuid, User>,
    communities: DashMap<Uuid, Community>,
    sequence: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn thought_count(&self) -> usize {
        self.thoughts.len()
    }
}

#[async_trait]
impl ThoughtRepository for InMemoryStore {
    async fn insert(&self, thought: &Thought) -> anyhow::Result<()> {
        match self.thoughts.entry(thought.id) {
            Entry::Occupied(_) => anyhow::bail!("thought {} already exists", thought.id),
            Entry::Vacant(slot) => {
                let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
                slot.insert(Stored {
                    seq,
                    thought: thought.clone(),
                });
                Ok(())
            }
        }
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Thought>> {
        Ok(self.thoughts.get(&id).map(|s| s.thought.clone()))
    }

    async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Thought>> {
        Ok(ids
            .iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .filter_map(|id| self.thoughts.get(id).map(|s| s.thought.clone()))
            .collect())
    }

    async fn find_children(&self, parent_id: Uuid) -> anyhow::Result<Vec<Thought>> {
        let mut children: Vec<Stored> = self
            .thoughts
            .iter()
            .filter(|s| s.thought.parent_id == Some(parent_id))
            .map(|s| s.value().clone())
            .collect();
        children.sort_by_key(|s| s.seq);
        Ok(children.into_iter().map(|s| s.thought).collect())
    }

    async fn append_child(&self, parent_id: Uuid, child_id: Uuid) -> anyhow::Result<()> {
        match self.thoughts.get_mut(&parent_id) {
            Some(mut parent) => {
                parent.thought.children.push(child_id);
                Ok(())
            }
            None => anyhow::bail!("thought {parent_id} does not exist"),
        }
    }

    async fn remove_child(&self, parent_id: Uuid, child_id: Uuid) -> anyhow::Result<()> {
        if let Some(mut parent) = self.thoughts.get_mut(&parent_id) {
            parent.thought.children.retain(|id| *id != child_id);
        }
        Ok(())
    }

    async fn list_top_level(&self, page: PageRequest) -> anyhow::Result<Vec<Thought>> {
        let mut posts: Vec<Stored> = self
            .thoughts
            .iter()
            .filter(|s| s.thought.is_top_level())
            .map(|s| s.value().clone())
            .collect();
        posts.sort_by(|a, b| {
            b.thought
                .created_at
                .cmp(&a.thought.created_at)
                .then(a.seq.cmp(&b.seq))
        });
        Ok(posts
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .map(|s| s.thought)
            .collect())
    }

    async fn count_top_level(&self) -> anyhow::Result<u64> {
        let count = self
            .thoughts
            .iter()
            .filter(|s| s.thought.is_top_level())
            .count();
        Ok(count as u64)
    }

    async fn delete_many(&self, ids: &[Uuid]) -> anyhow::Result<u64> {
        let removed = ids
            .iter()
            .filter(|id| self.thoughts.remove(*id).is_some())
            .count();
        Ok(removed as u64)
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn upsert(&self, user: &User) -> anyhow::Result<()> {
        self.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn find_by_external_id(&self, external_id: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|u| u.external_id == external_id)
            .map(|u| u.value().clone()))
    }

    async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<User>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.users.get(id).map(|u| u.clone()))
            .collect())
    }

    async fn push_thought(&self, user_id: Uuid, thought_id: Uuid) -> anyhow::Result<()> {
        match self.users.get_mut(&user_id) {
            Some(mut user) => {
                user.thoughts.push(thought_id);
                Ok(())
            }
            None => anyhow::bail!("user {user_id} does not exist"),
        }
    }

    async fn pull_thoughts(&self, user_ids: &[Uuid], thought_ids: &[Uuid]) -> anyhow::Result<()> {
        let pulled: HashSet<&Uuid> = thought_ids.iter().collect();
        for id in user_ids {
            if let Some(mut user) = self.users.get_mut(id) {
                user.thoughts.retain(|t| !pulled.contains(t));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CommunityRepository for InMemoryStore {
    async fn upsert(&self, community: &Community) -> anyhow::Result<()> {
        self.communities.insert(community.id, community.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Community>> {
        Ok(self.communities.get(&id).map(|c| c.clone()))
    }

    async fn find_by_external_id(&self, external_id: &str) -> anyhow::Result<Option<Community>> {
        Ok(self
            .communities
            .iter()
            .find(|c| c.external_id == external_id)
            .map(|c| c.value().clone()))
    }

    async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Community>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.communities.get(id).map(|c| c.clone()))
            .collect())
    }

    async fn push_thought(&self, community_id: Uuid, thought_id: Uuid) -> anyhow::Result<()> {
        match self.communities.get_mut(&community_id) {
            Some(mut community) => {
                community.thoughts.push(thought_id);
                Ok(())
            }
            None => anyhow::bail!("community {community_id} does not exist"),
        }
    }

    async fn pull_thoughts(
        &self,
        community_ids: &[Uuid],
        thought_ids: &[Uuid],
    ) -> anyhow::Result<()> {
        let pulled: HashSet<&Uuid> = thought_ids.iter().collect();
        for id in community_ids {
            if let Some(mut community) = self.communities.get_mut(id) {
                community.thoughts.retain(|t| !pulled.contains(t));
            }
        }
        Ok(())
    }
}
