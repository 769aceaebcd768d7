//! Populates the configured SQLite database with demo users, a community,
//! a few posts and a reply chain.
//!
//! Existing rows are left alone; users and the community are matched by
//! external id, so running twice only adds a second batch of thoughts.

use std::sync::Arc;

use anyhow::Context;
use configs::Settings;
use domains::models::{Community, User};
use domains::ports::{CommunityRepository, UserRepository};
use services::{NewComment, NewThought, Ports, ThoughtService};
use storage_adapters::{SqliteStore, StaleViewRegistry};
use tracing::info;

const DEFAULT_URL: &str = "sqlite://thoughtboard.db";
const COMMUNITY: &str = "org_demo_compilers";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = Settings::load().context("loading settings")?;
    let url = settings.database_url().unwrap_or(DEFAULT_URL);
    let store = Arc::new(
        SqliteStore::connect(url, 1)
            .await
            .with_context(|| format!("opening {url}"))?,
    );
    info!(url, "connected");

    let ada = ensure_user(&store, "user_demo_ada", "ada", "Ada Lovelace").await?;
    let grace = ensure_user(&store, "user_demo_grace", "grace", "Grace Hopper").await?;
    let linus = ensure_user(&store, "user_demo_linus", "linus", "Linus Torvalds").await?;

    let existing = CommunityRepository::find_by_external_id(store.as_ref(), COMMUNITY).await?;
    let community = match existing {
        Some(existing) => existing,
        None => {
            let community = Community::new(COMMUNITY, "compilers", "Compiler Club");
            CommunityRepository::upsert(store.as_ref(), &community).await?;
            community
        }
    };

    let views = Arc::new(StaleViewRegistry::new());
    let thoughts = ThoughtService::new(Ports::from_store(store.clone(), views));

    let post = |text: &str, author: &User, community: Option<&Community>| NewThought {
        text: text.to_owned(),
        author_id: author.id,
        community_external_id: community.map(|c| c.external_id.clone()),
        path: "/".to_owned(),
    };

    let engine = post(
        "The analytical engine weaves algebraic patterns.",
        &ada,
        None,
    );
    thoughts.create_thought(engine).await?;
    let ship = post(
        "A ship in port is safe, but that's not what ships are built for.",
        &grace,
        None,
    );
    thoughts.create_thought(ship).await?;
    let parser = post(
        "Who else is writing a parser this weekend?",
        &linus,
        Some(&community),
    );
    let root = thoughts.create_thought(parser).await?;

    let mut parent_id = root.id;
    for (text, author) in [
        ("Recursive descent, as always.", &grace),
        ("Pratt parsing for the expressions though.", &ada),
        ("Both of you are right.", &linus),
    ] {
        let reply = thoughts
            .add_comment(NewComment {
                parent_id,
                text: text.to_owned(),
                author_id: author.id,
                path: format!("/thought/{}", root.id),
            })
            .await?;
        parent_id = reply.id;
    }

    info!(thread = %root.id, "seeding complete");
    Ok(())
}

/// Reuses a stored user with the same external id so reruns keep one record.
async fn ensure_user(
    store: &SqliteStore,
    external_id: &str,
    username: &str,
    name: &str,
) -> anyhow::Result<User> {
    if let Some(existing) = UserRepository::find_by_external_id(store, external_id).await? {
        return Ok(existing);
    }
    let user = User::new(external_id, username, name);
    UserRepository::upsert(store, &user).await?;
    Ok(user)
}
