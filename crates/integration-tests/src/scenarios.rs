//! Backend-independent behavior checks. Each function panics on failure.

use std::collections::HashSet;

use chrono::{DateTime, Duration};
use domains::errors::AppError;
use domains::models::Thought;
use domains::ports::{CommunityRepository, ThoughtRepository, UserRepository};
use services::{NewComment, NewThought};
use uuid::Uuid;

use crate::World;

/// A with replies [B, C], B with reply D. Deleting A removes all four and
/// purges them from every profile list.
pub async fn cascade_delete_removes_whole_tree<S>(world: &World<S>)
where
    S: ThoughtRepository + UserRepository + CommunityRepository + 'static,
{
    let ada = world.user("ada").await;
    let bob = world.user("bob").await;
    let club = world.community("club").await;

    let a = world.post_in(&ada, "thought A", Some(&club)).await;
    let b = world.reply(a.id, &bob, "reply B").await;
    let c = world.reply(a.id, &ada, "reply C").await;
    let d = world.reply(b.id, &bob, "reply D").await;
    // Reply ids can end up on profile lists through older data; they must be purged too.
    UserRepository::push_thought(world.store.as_ref(), bob.id, d.id)
        .await
        .unwrap();
    let survivor = world.post(&ada, "unrelated").await;

    let mut deleted = world.thoughts.delete_thought(a.id, "/").await.unwrap();
    assert_eq!(deleted[0], a.id);
    deleted.sort();
    let mut expected = vec![a.id, b.id, c.id, d.id];
    expected.sort();
    assert_eq!(deleted, expected);

    for id in [a.id, b.id, c.id, d.id] {
        assert!(world.stored(id).await.is_none(), "{id} survived the delete");
    }
    assert_eq!(world.user_list(&ada).await, vec![survivor.id]);
    assert!(world.user_list(&bob).await.is_empty());
    assert!(world.community_list(&club).await.is_empty());
    assert!(world.stored(survivor.id).await.is_some());
    assert!(world.views.is_stale("/"));
}

/// Five levels deep, deleted from the middle.
pub async fn deep_delete_unlinks_from_parent<S>(world: &World<S>)
where
    S: ThoughtRepository + UserRepository + CommunityRepository + 'static,
{
    let ada = world.user("ada").await;
    let root = world.post(&ada, "root").await;

    let mut chain = vec![root.clone()];
    for depth in 1..=4 {
        let parent = chain[depth - 1].id;
        chain.push(world.reply(parent, &ada, &format!("level {depth}")).await);
    }

    let deleted = world
        .thoughts
        .delete_thought(chain[1].id, "/")
        .await
        .unwrap();
    assert_eq!(deleted.len(), 4);
    for thought in &chain[1..] {
        assert!(world.stored(thought.id).await.is_none());
    }

    let root_now = world.stored(root.id).await.unwrap();
    assert!(root_now.children.is_empty());
    let view = world.thoughts.fetch_thought_by_id(root.id).await.unwrap();
    assert!(view.children.is_empty());
    assert_eq!(world.user_list(&ada).await, vec![root.id]);
}

/// Consecutive pages are disjoint and together are the newest top-level posts.
pub async fn feed_pages_are_disjoint<S>(world: &World<S>)
where
    S: ThoughtRepository + UserRepository + CommunityRepository + 'static,
{
    let ada = world.user("ada").await;
    // Whole seconds, so backends that store microseconds compare equal.
    let base = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    let mut posts = Vec::new();
    for i in 0..7 {
        let post = Thought::new_post(format!("post {i}"), ada.id, None)
            .with_created_at(base + Duration::seconds(i64::from(i % 4)));
        ThoughtRepository::insert(world.store.as_ref(), &post)
            .await
            .unwrap();
        posts.push(post);
    }
    let reply = Thought::new_comment(posts[0].id, "never in the feed", ada.id)
        .with_created_at(base + Duration::hours(1));
    ThoughtRepository::insert(world.store.as_ref(), &reply)
        .await
        .unwrap();

    let first = world.feed(1, 3).await;
    let second = world.feed(2, 3).await;
    let third = world.feed(3, 3).await;
    assert!(first.has_next && second.has_next && !third.has_next);
    assert_eq!(third.posts.len(), 1);

    let first_ids: HashSet<Uuid> = first.posts.iter().map(|p| p.id).collect();
    assert!(second.posts.iter().all(|p| !first_ids.contains(&p.id)));

    let listed: Vec<_> = first
        .posts
        .iter()
        .chain(&second.posts)
        .map(|p| p.created_at)
        .collect();
    let mut newest: Vec<_> = posts.iter().map(|p| p.created_at).collect();
    newest.sort_by(|a, b| b.cmp(a));
    newest.truncate(6);
    assert_eq!(listed, newest);
}

/// Six posts in pages of three: the second page is full and is the last one.
pub async fn full_last_page_has_no_next<S>(world: &World<S>)
where
    S: ThoughtRepository + UserRepository + CommunityRepository + 'static,
{
    let ada = world.user("ada").await;
    for i in 0..6 {
        world.post(&ada, &format!("post {i}")).await;
    }

    let first = world.feed(1, 3).await;
    assert_eq!(first.posts.len(), 3);
    assert!(first.has_next);

    let last = world.feed(2, 3).await;
    assert_eq!(last.posts.len(), 3);
    assert!(!last.has_next);

    assert!(world.feed(3, 3).await.posts.is_empty());
}

/// A failed reply leaves no trace; a successful one links exactly once.
pub async fn comment_attachment<S>(world: &World<S>)
where
    S: ThoughtRepository + UserRepository + CommunityRepository + 'static,
{
    let ada = world.user("ada").await;
    let missing = Uuid::now_v7();

    let err = world
        .thoughts
        .add_comment(NewComment {
            parent_id: missing,
            text: "into the void".into(),
            author_id: ada.id,
            path: "/".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound("Thought", _)));
    assert!(world.feed(1, 10).await.posts.is_empty());
    let orphans = ThoughtRepository::find_children(world.store.as_ref(), missing)
        .await
        .unwrap();
    assert!(orphans.is_empty());

    let root = world.post(&ada, "root").await;
    let reply = world.reply(root.id, &ada, "first reply").await;
    assert_eq!(reply.parent_id, Some(root.id));
    let root_now = world.stored(root.id).await.unwrap();
    assert_eq!(root_now.children, vec![reply.id]);
    assert_eq!(world.user_list(&ada).await, vec![root.id]);
    assert!(world.views.is_stale(&format!("/thought/{}", root.id)));
}

/// Posting as an author with no user record fails before anything is stored.
pub async fn unknown_author_persists_nothing<S>(world: &World<S>)
where
    S: ThoughtRepository + UserRepository + CommunityRepository + 'static,
{
    let club = world.community("club").await;

    let err = world
        .thoughts
        .create_thought(NewThought {
            text: "who posted this?".into(),
            author_id: Uuid::now_v7(),
            community_external_id: Some(club.external_id.clone()),
            path: "/".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound("User", _)));

    assert!(world.feed(1, 10).await.posts.is_empty());
    assert!(world.community_list(&club).await.is_empty());
    assert!(!world.views.is_stale("/"));

    let ada = world.user("ada").await;
    let post = world.post_in(&ada, "now with an author", Some(&club)).await;
    assert_eq!(world.community_list(&club).await, vec![post.id]);
}

/// An unknown community id is dropped, not an error.
pub async fn unknown_community_posts_without_one<S>(world: &World<S>)
where
    S: ThoughtRepository + UserRepository + CommunityRepository + 'static,
{
    let ada = world.user("ada").await;
    let ghost = domains::models::Community::new("org_ghost", "ghost", "Ghost");

    let thought = world.post_in(&ada, "lonely post", Some(&ghost)).await;

    assert_eq!(thought.community_id, None);
    assert_eq!(world.stored(thought.id).await.unwrap().community_id, None);
    assert_eq!(world.user_list(&ada).await, vec![thought.id]);
}

/// The thread view expands two reply levels with authors.
pub async fn thread_view_expands_two_levels<S>(world: &World<S>)
where
    S: ThoughtRepository + UserRepository + CommunityRepository + 'static,
{
    let ada = world.user("ada").await;
    let bob = world.user("bob").await;
    let club = world.community("club").await;

    let root = world.post_in(&ada, "root", Some(&club)).await;
    let first = world.reply(root.id, &bob, "level one").await;
    let second = world.reply(first.id, &ada, "level two").await;
    world.reply(second.id, &bob, "level three").await;

    let view = world.thoughts.fetch_thought_by_id(root.id).await.unwrap();
    assert_eq!(view.author.as_ref().unwrap().id, ada.id);
    assert_eq!(view.community.as_ref().unwrap().id, club.id);
    assert_eq!(view.children.len(), 1);

    let level_one = &view.children[0];
    assert_eq!(level_one.author.as_ref().unwrap().id, bob.id);
    assert_eq!(level_one.children.len(), 1);

    let level_two = &level_one.children[0];
    assert_eq!(level_two.text, "level two");
    assert_eq!(level_two.reply_count, 1);
    assert!(level_two.children.is_empty());
}
