//! # Ports
//!
//! Storage adapters implement these traits; services only see the traits.
//! All methods are plain reads and writes with equality or set-membership
//! filters. Nothing here spans more than one record atomically.

use std::collections::HashSet;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Community, PageRequest, Thought, User};

/// Persistence contract for the thought forest.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ThoughtRepository: Send + Sync {
    async fn insert(&self, thought: &Thought) -> anyhow::Result<()>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Thought>>;

    /// Loads every existing thought in `ids`. Missing ids are skipped; order is unspecified.
    async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Thought>>;

    /// Thoughts whose `parent_id` equals `parent_id`.
    async fn find_children(&self, parent_id: Uuid) -> anyhow::Result<Vec<Thought>>;

    /// Every thought below `root_id`, excluding the root itself, in no particular order.
    ///
    /// The default walks the tree one `find_children` call per visited node.
    /// Adapters that can answer with a single subtree query should override it.
    async fn find_descendants(&self, root_id: Uuid) -> anyhow::Result<Vec<Thought>> {
        let mut seen = HashSet::from([root_id]);
        let mut pending = vec![root_id];
        let mut descendants = Vec::new();

        while let Some(id) = pending.pop() {
            for child in self.find_children(id).await? {
                if seen.insert(child.id) {
                    pending.push(child.id);
                    descendants.push(child);
                }
            }
        }
        Ok(descendants)
    }

    /// Appends `child_id` to the parent's `children` list.
    async fn append_child(&self, parent_id: Uuid, child_id: Uuid) -> anyhow::Result<()>;

    /// Removes `child_id` from the parent's `children` list, if present.
    async fn remove_child(&self, parent_id: Uuid, child_id: Uuid) -> anyhow::Result<()>;

    /// Top-level thoughts, newest first, ties in storage order.
    async fn list_top_level(&self, page: PageRequest) -> anyhow::Result<Vec<Thought>>;
    async fn count_top_level(&self) -> anyhow::Result<u64>;

    /// Deletes every thought in `ids`; returns how many were removed.
    async fn delete_many(&self, ids: &[Uuid]) -> anyhow::Result<u64>;
}

/// Persistence contract for user records and their thought lists.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn upsert(&self, user: &User) -> anyhow::Result<()>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_by_external_id(&self, external_id: &str) -> anyhow::Result<Option<User>>;
    async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<User>>;
    async fn push_thought(&self, user_id: Uuid, thought_id: Uuid) -> anyhow::Result<()>;

    /// Removes every id in `thought_ids` from the lists of every user in `user_ids`.
    async fn pull_thoughts(&self, user_ids: &[Uuid], thought_ids: &[Uuid]) -> anyhow::Result<()>;
}

/// Persistence contract for community records and their thought lists.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CommunityRepository: Send + Sync {
    async fn upsert(&self, community: &Community) -> anyhow::Result<()>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Community>>;
    async fn find_by_external_id(&self, external_id: &str) -> anyhow::Result<Option<Community>>;
    async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Community>>;
    async fn push_thought(&self, community_id: Uuid, thought_id: Uuid) -> anyhow::Result<()>;
    async fn pull_thoughts(
        &self,
        community_ids: &[Uuid],
        thought_ids: &[Uuid],
    ) -> anyhow::Result<()>;
}

/// Marks rendered output for a page path as stale.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait ViewInvalidator: Send + Sync {
    fn invalidate(&self, path: &str);
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    /// Answers only `find_children`, so the trait's default walk is exercised.
    #[derive(Default)]
    struct ChildIndex {
        by_parent: HashMap<Uuid, Vec<Thought>>,
        broken: bool,
    }

    #[async_trait]
    impl ThoughtRepository for ChildIndex {
        async fn insert(&self, _: &Thought) -> anyhow::Result<()> {
            unreachable!()
        }
        async fn find_by_id(&self, _: Uuid) -> anyhow::Result<Option<Thought>> {
            unreachable!()
        }
        async fn find_many(&self, _: &[Uuid]) -> anyhow::Result<Vec<Thought>> {
            unreachable!()
        }
        async fn append_child(&self, _: Uuid, _: Uuid) -> anyhow::Result<()> {
            unreachable!()
        }
        async fn remove_child(&self, _: Uuid, _: Uuid) -> anyhow::Result<()> {
            unreachable!()
        }
        async fn list_top_level(&self, _: PageRequest) -> anyhow::Result<Vec<Thought>> {
            unreachable!()
        }
        async fn count_top_level(&self) -> anyhow::Result<u64> {
            unreachable!()
        }
        async fn delete_many(&self, _: &[Uuid]) -> anyhow::Result<u64> {
            unreachable!()
        }

        async fn find_children(&self, parent_id: Uuid) -> anyhow::Result<Vec<Thought>> {
            if self.broken {
                anyhow::bail!("connection reset");
            }
            Ok(self.by_parent.get(&parent_id).cloned().unwrap_or_default())
        }
    }

    impl ChildIndex {
        fn reply(&mut self, parent: Uuid) -> Uuid {
            let child = Thought::new_comment(parent, "reply", Uuid::now_v7());
            let id = child.id;
            self.by_parent.entry(parent).or_default().push(child);
            id
        }
    }

    #[tokio::test]
    async fn default_descendant_walk_visits_every_level() {
        let root = Uuid::now_v7();
        let mut index = ChildIndex::default();
        let b = index.reply(root);
        let c = index.reply(root);
        let d = index.reply(b);
        let e = index.reply(d);

        let mut ids: Vec<Uuid> = index
            .find_descendants(root)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        ids.sort();
        let mut expected = vec![b, c, d, e];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn default_descendant_walk_of_leaf_is_empty() {
        let index = ChildIndex::default();
        let descendants = index.find_descendants(Uuid::now_v7()).await.unwrap();
        assert!(descendants.is_empty());
    }

    #[tokio::test]
    async fn default_descendant_walk_propagates_errors() {
        let index = ChildIndex {
            broken: true,
            ..Default::default()
        };
        let err = index.find_descendants(Uuid::now_v7()).await.unwrap_err();
        assert!(err.to_string().contains("connection reset"));
    }
}
