// tests/thought_tree.rs
//! Thought tree behavior over the in-memory store.

use integration_tests::{memory_world, scenarios};

#[tokio::test]
async fn test_cascade_delete_removes_whole_tree() {
    scenarios::cascade_delete_removes_whole_tree(&memory_world()).await;
}

#[tokio::test]
async fn test_deep_delete_unlinks_from_parent() {
    scenarios::deep_delete_unlinks_from_parent(&memory_world()).await;
}

#[tokio::test]
async fn test_comment_attachment() {
    let world = memory_world();
    scenarios::comment_attachment(&world).await;
    assert_eq!(world.store.thought_count(), 2);
}

#[tokio::test]
async fn test_unknown_author_persists_nothing() {
    let world = memory_world();
    scenarios::unknown_author_persists_nothing(&world).await;
    assert_eq!(world.store.thought_count(), 1);
}

#[tokio::test]
async fn test_unknown_community_posts_without_one() {
    scenarios::unknown_community_posts_without_one(&memory_world()).await;
}

#[tokio::test]
async fn test_thread_view_expands_two_levels() {
    scenarios::thread_view_expands_two_levels(&memory_world()).await;
}

#[tokio::test]
async fn test_delete_of_missing_thought_is_not_found() {
    let world = memory_world();
    let err = world
        .thoughts
        .delete_thought(uuid::Uuid::now_v7(), "/")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(!world.views.is_stale("/"));
}

#[tokio::test]
async fn test_only_the_author_may_delete() {
    let world = memory_world();
    let ada = world.user("ada").await;
    let bob = world.user("bob").await;
    let post = world.post(&ada, "mine").await;

    let err = world
        .thoughts
        .delete_thought_as(bob.id, post.id, "/")
        .await
        .unwrap_err();
    assert!(matches!(err, domains::errors::AppError::Forbidden(_)));
    assert!(world.stored(post.id).await.is_some());

    world
        .thoughts
        .delete_thought_as(ada.id, post.id, "/")
        .await
        .unwrap();
    assert_eq!(world.store.thought_count(), 0);
}

#[tokio::test]
async fn test_thread_view_skips_deleted_replies() {
    let world = memory_world();
    let ada = world.user("ada").await;
    let root = world.post(&ada, "root").await;
    let reply = world.reply(root.id, &ada, "short lived").await;

    // Bypass the service so the parent keeps a dangling child id.
    domains::ports::ThoughtRepository::delete_many(world.store.as_ref(), &[reply.id])
        .await
        .unwrap();

    let view = world.thoughts.fetch_thought_by_id(root.id).await.unwrap();
    assert!(view.children.is_empty());
    assert_eq!(view.reply_count, 1);
}
