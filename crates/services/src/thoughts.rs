//! # ThoughtService
//!
//! Creation, threading, listing and cascade deletion of thoughts.
//!
//! # Developer Note
//! None of these operations is transactional. Each one issues its writes in a
//! fixed order and stops at the first failure, so a crash or storage error in
//! the middle can leave a dangling reference (a comment not yet linked from its
//! parent, or a deleted id still listed on a profile). Readers tolerate this:
//! expansion skips references to missing records.

use std::collections::BTreeSet;

use domains::errors::{AppError, Result, StorageContext};
use domains::models::{FeedPage, PageRequest, Thought, ThoughtView};
use tracing::{info, warn};
use uuid::Uuid;

use crate::expand::Expander;
use crate::Ports;

/// Reply levels expanded on the thread page.
pub const THREAD_DEPTH: usize = 2;
/// Reply levels expanded on feed and profile listings.
pub const LISTING_DEPTH: usize = 1;

/// Input for a new top-level post.
#[derive(Debug, Clone)]
pub struct NewThought {
    pub text: String,
    pub author_id: Uuid,
    /// Identity-provider organization id; unknown ids post without a community.
    pub community_external_id: Option<String>,
    /// Page whose rendered view becomes stale.
    pub path: String,
}

/// Input for a reply.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub parent_id: Uuid,
    pub text: String,
    pub author_id: Uuid,
    pub path: String,
}

pub struct ThoughtService {
    ports: Ports,
}

impl ThoughtService {
    pub fn new(ports: Ports) -> Self {
        Self { ports }
    }

    /// Lists top-level thoughts newest first.
    #[tracing::instrument(skip(self, page), fields(page = page.number, size = page.size))]
    pub async fn fetch_posts(&self, page: PageRequest) -> Result<FeedPage> {
        const OP: &str = "fetch posts";

        if page.number == 0 {
            return Err(AppError::ValidationError("page number starts at 1".into()));
        }
        if page.size == 0 {
            return Err(AppError::ValidationError(
                "page size must be positive".into(),
            ));
        }

        let posts = self.ports.thoughts.list_top_level(page).await.during(OP)?;
        let total = self.ports.thoughts.count_top_level().await.during(OP)?;
        let has_next = total > page.offset() + posts.len() as u64;

        let posts = Expander::new(&self.ports)
            .expand(posts, LISTING_DEPTH)
            .await
            .during(OP)?;

        Ok(FeedPage { posts, has_next })
    }

    /// Publishes a top-level thought and records it on the author's and community's lists.
    ///
    /// The author must exist; an unknown author fails with `NotFound` before anything is written.
    #[tracing::instrument(skip(self, input), fields(author_id = %input.author_id))]
    pub async fn create_thought(&self, input: NewThought) -> Result<Thought> {
        const OP: &str = "post thought";

        let author = self
            .ports
            .users
            .find_by_id(input.author_id)
            .await
            .during(OP)?
            .ok_or_else(|| AppError::not_found("User", input.author_id))?;

        let community = match input.community_external_id.as_deref() {
            Some(external_id) => self
                .ports
                .communities
                .find_by_external_id(external_id)
                .await
                .during(OP)?,
            None => None,
        };
        if community.is_none() {
            if let Some(external_id) = &input.community_external_id {
                warn!(community = %external_id, "unknown community, posting without one");
            }
        }

        let community_id = community.as_ref().map(|c| c.id);
        let thought = Thought::new_post(input.text, author.id, community_id);
        self.ports.thoughts.insert(&thought).await.during(OP)?;
        self.ports
            .users
            .push_thought(author.id, thought.id)
            .await
            .during(OP)?;
        if let Some(community) = &community {
            self.ports
                .communities
                .push_thought(community.id, thought.id)
                .await
                .during(OP)?;
        }

        self.ports.views.invalidate(&input.path);
        info!(thought_id = %thought.id, "thought created");
        Ok(thought)
    }

    /// Loads a thread: the thought, its replies and their replies, with references expanded.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_thought_by_id(&self, id: Uuid) -> Result<ThoughtView> {
        const OP: &str = "fetch thought";

        let thought = self
            .ports
            .thoughts
            .find_by_id(id)
            .await
            .during(OP)?
            .ok_or_else(|| AppError::not_found("Thought", id))?;

        Expander::new(&self.ports)
            .expand(vec![thought], THREAD_DEPTH)
            .await
            .during(OP)?
            .pop()
            .ok_or_else(|| AppError::not_found("Thought", id))
    }

    /// Attaches a reply under `input.parent_id`.
    #[tracing::instrument(skip(self, input), fields(parent_id = %input.parent_id))]
    pub async fn add_comment(&self, input: NewComment) -> Result<Thought> {
        const OP: &str = "add comment";

        let parent = self
            .ports
            .thoughts
            .find_by_id(input.parent_id)
            .await
            .during(OP)?
            .ok_or_else(|| AppError::not_found("Thought", input.parent_id))?;

        let comment = Thought::new_comment(parent.id, input.text, input.author_id);
        self.ports.thoughts.insert(&comment).await.during(OP)?;
        self.ports
            .thoughts
            .append_child(parent.id, comment.id)
            .await
            .during(OP)?;

        self.ports.views.invalidate(&input.path);
        info!(comment_id = %comment.id, "comment attached");
        Ok(comment)
    }

    /// Deletes a thought with its whole reply subtree. Returns the deleted ids,
    /// root first.
    #[tracing::instrument(skip(self))]
    pub async fn delete_thought(&self, id: Uuid, path: &str) -> Result<Vec<Uuid>> {
        let root = self.load_for_delete(id).await?;
        self.delete_subtree(root, path).await
    }

    /// Same as [`Self::delete_thought`], but only the root's author may delete.
    #[tracing::instrument(skip(self))]
    pub async fn delete_thought_as(
        &self,
        actor_id: Uuid,
        id: Uuid,
        path: &str,
    ) -> Result<Vec<Uuid>> {
        let root = self.load_for_delete(id).await?;
        if root.author_id != actor_id {
            warn!(thought_id = %id, "delete refused for non-author");
            return Err(AppError::Forbidden(
                "only the author can delete a thought".into(),
            ));
        }
        self.delete_subtree(root, path).await
    }

    async fn load_for_delete(&self, id: Uuid) -> Result<Thought> {
        self.ports
            .thoughts
            .find_by_id(id)
            .await
            .during(DELETE_OP)?
            .ok_or_else(|| AppError::not_found("Thought", id))
    }

    async fn delete_subtree(&self, root: Thought, path: &str) -> Result<Vec<Uuid>> {
        let descendants = self
            .ports
            .thoughts
            .find_descendants(root.id)
            .await
            .during(DELETE_OP)?;

        let doomed: Vec<Uuid> = std::iter::once(root.id)
            .chain(descendants.iter().map(|t| t.id))
            .collect();
        let subtree = || std::iter::once(&root).chain(descendants.iter());
        let author_ids: Vec<Uuid> = subtree()
            .map(|t| t.author_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let community_ids: Vec<Uuid> = subtree()
            .filter_map(|t| t.community_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let removed = self
            .ports
            .thoughts
            .delete_many(&doomed)
            .await
            .during(DELETE_OP)?;
        self.ports
            .users
            .pull_thoughts(&author_ids, &doomed)
            .await
            .during(DELETE_OP)?;
        if !community_ids.is_empty() {
            self.ports
                .communities
                .pull_thoughts(&community_ids, &doomed)
                .await
                .during(DELETE_OP)?;
        }
        if let Some(parent_id) = root.parent_id {
            self.ports
                .thoughts
                .remove_child(parent_id, root.id)
                .await
                .during(DELETE_OP)?;
        }

        self.ports.views.invalidate(path);
        info!(thought_id = %root.id, removed, subtree = doomed.len(), "thought subtree deleted");
        Ok(doomed)
    }
}

const DELETE_OP: &str = "delete thought";

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use domains::models::User;
    use domains::ports::{
        MockCommunityRepository, MockThoughtRepository, MockUserRepository, MockViewInvalidator,
    };
    use mockall::predicate::eq;

    use super::*;

    struct Mocks {
        thoughts: MockThoughtRepository,
        users: MockUserRepository,
        communities: MockCommunityRepository,
        views: MockViewInvalidator,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                thoughts: MockThoughtRepository::new(),
                users: MockUserRepository::new(),
                communities: MockCommunityRepository::new(),
                views: MockViewInvalidator::new(),
            }
        }

        fn service(self) -> ThoughtService {
            ThoughtService::new(Ports {
                thoughts: Arc::new(self.thoughts),
                users: Arc::new(self.users),
                communities: Arc::new(self.communities),
                views: Arc::new(self.views),
            })
        }
    }

    #[tokio::test]
    async fn comment_on_missing_parent_persists_nothing() {
        let mut mocks = Mocks::new();
        mocks.thoughts.expect_find_by_id().returning(|_| Ok(None));
        mocks.thoughts.expect_insert().never();
        mocks.thoughts.expect_append_child().never();
        mocks.views.expect_invalidate().never();

        let err = mocks
            .service()
            .add_comment(NewComment {
                parent_id: Uuid::now_v7(),
                text: "hello there".into(),
                author_id: Uuid::now_v7(),
                path: "/".into(),
            })
            .await
            .unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn comment_is_inserted_before_parent_is_linked() {
        let parent = Thought::new_post("parent", Uuid::now_v7(), None);
        let parent_id = parent.id;
        let mut seq = mockall::Sequence::new();
        let mut mocks = Mocks::new();
        mocks
            .thoughts
            .expect_find_by_id()
            .with(eq(parent_id))
            .returning(move |_| Ok(Some(parent.clone())));
        mocks
            .thoughts
            .expect_insert()
            .withf(move |t| t.parent_id == Some(parent_id))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mocks
            .thoughts
            .expect_append_child()
            .withf(move |p, _| *p == parent_id)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        mocks
            .views
            .expect_invalidate()
            .withf(|path| path == "/thought/1")
            .times(1)
            .return_const(());

        let comment = mocks
            .service()
            .add_comment(NewComment {
                parent_id,
                text: "a reply".into(),
                author_id: Uuid::now_v7(),
                path: "/thought/1".into(),
            })
            .await
            .unwrap();
        assert_eq!(comment.parent_id, Some(parent_id));
        assert!(comment.community_id.is_none());
    }

    #[tokio::test]
    async fn unknown_community_posts_without_one() {
        let author = User::new("ext_1", "ada", "Ada");
        let author_id = author.id;
        let mut mocks = Mocks::new();
        mocks
            .users
            .expect_find_by_id()
            .with(eq(author_id))
            .returning(move |_| Ok(Some(author.clone())));
        mocks
            .communities
            .expect_find_by_external_id()
            .withf(|ext| ext == "org_missing")
            .returning(|_| Ok(None));
        mocks
            .thoughts
            .expect_insert()
            .withf(|t| t.community_id.is_none() && t.is_top_level())
            .times(1)
            .returning(|_| Ok(()));
        mocks
            .users
            .expect_push_thought()
            .withf(move |u, _| *u == author_id)
            .times(1)
            .returning(|_, _| Ok(()));
        mocks.communities.expect_push_thought().never();
        mocks.views.expect_invalidate().times(1).return_const(());

        let thought = mocks
            .service()
            .create_thought(NewThought {
                text: "standalone".into(),
                author_id,
                community_external_id: Some("org_missing".into()),
                path: "/".into(),
            })
            .await
            .unwrap();
        assert!(thought.community_id.is_none());
    }

    #[tokio::test]
    async fn unknown_author_is_rejected_before_any_write() {
        let mut mocks = Mocks::new();
        mocks.users.expect_find_by_id().returning(|_| Ok(None));
        mocks.communities.expect_find_by_external_id().never();
        mocks.thoughts.expect_insert().never();
        mocks.users.expect_push_thought().never();
        mocks.views.expect_invalidate().never();

        let err = mocks
            .service()
            .create_thought(NewThought {
                text: "who am i".into(),
                author_id: Uuid::now_v7(),
                community_external_id: Some("org_any".into()),
                path: "/".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound("User", _)));
    }

    #[tokio::test]
    async fn zero_page_is_rejected_before_storage() {
        let mut mocks = Mocks::new();
        mocks.thoughts.expect_list_top_level().never();

        let err = mocks
            .service()
            .fetch_posts(PageRequest::new(0, 20))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn feed_reports_next_page_from_total() {
        let author = Uuid::now_v7();
        let page: Vec<Thought> = (0..2)
            .map(|i| Thought::new_post(format!("post {i}"), author, None))
            .collect();
        let mut mocks = Mocks::new();
        mocks
            .thoughts
            .expect_list_top_level()
            .with(eq(PageRequest::new(2, 2)))
            .returning(move |_| Ok(page.clone()));
        mocks.thoughts.expect_count_top_level().returning(|| Ok(5));
        mocks.users.expect_find_many().returning(|_| Ok(vec![]));

        let feed = mocks
            .service()
            .fetch_posts(PageRequest::new(2, 2))
            .await
            .unwrap();
        assert_eq!(feed.posts.len(), 2);
        // 5 > 2 + 2
        assert!(feed.has_next);
    }

    #[tokio::test]
    async fn failure_after_bulk_delete_is_reported_without_rollback() {
        let root = Thought::new_post("root", Uuid::now_v7(), None);
        let root_id = root.id;
        let mut mocks = Mocks::new();
        mocks
            .thoughts
            .expect_find_by_id()
            .returning(move |_| Ok(Some(root.clone())));
        mocks
            .thoughts
            .expect_find_descendants()
            .returning(|_| Ok(vec![]));
        mocks
            .thoughts
            .expect_delete_many()
            .withf(move |ids| ids.len() == 1 && ids[0] == root_id)
            .times(1)
            .returning(|_| Ok(1));
        mocks
            .users
            .expect_pull_thoughts()
            .returning(|_, _| Err(anyhow::anyhow!("write conflict")));
        mocks.views.expect_invalidate().never();

        let err = mocks
            .service()
            .delete_thought(root_id, "/")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "failed to delete thought: write conflict");
    }

    #[tokio::test]
    async fn non_author_cannot_delete() {
        let root = Thought::new_post("mine", Uuid::now_v7(), None);
        let root_id = root.id;
        let mut mocks = Mocks::new();
        mocks
            .thoughts
            .expect_find_by_id()
            .returning(move |_| Ok(Some(root.clone())));
        mocks.thoughts.expect_find_descendants().never();
        mocks.thoughts.expect_delete_many().never();

        let err = mocks
            .service()
            .delete_thought_as(Uuid::now_v7(), root_id, "/")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn deleting_a_comment_unlinks_it_from_its_parent() {
        let parent_id = Uuid::now_v7();
        let comment = Thought::new_comment(parent_id, "reply", Uuid::now_v7());
        let comment_id = comment.id;
        let mut mocks = Mocks::new();
        mocks
            .thoughts
            .expect_find_by_id()
            .returning(move |_| Ok(Some(comment.clone())));
        mocks
            .thoughts
            .expect_find_descendants()
            .returning(|_| Ok(vec![]));
        mocks.thoughts.expect_delete_many().returning(|_| Ok(1));
        mocks.users.expect_pull_thoughts().returning(|_, _| Ok(()));
        mocks.communities.expect_pull_thoughts().never();
        mocks
            .thoughts
            .expect_remove_child()
            .with(eq(parent_id), eq(comment_id))
            .times(1)
            .returning(|_, _| Ok(()));
        mocks.views.expect_invalidate().times(1).return_const(());

        let deleted = mocks
            .service()
            .delete_thought(comment_id, "/thought/x")
            .await
            .unwrap();
        assert_eq!(deleted, vec![comment_id]);
    }
}
