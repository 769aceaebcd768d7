//! # SQLite store
//!
//! Maps the document-shaped domain records onto relational tables. Ordered
//! reference lists (`children`, `User.thoughts`, `Community.thoughts`) live in
//! link tables ordered by an autoincrement `position`.
//!
//! # Developer Note
//! Subtree collection is answered by a single recursive CTE instead of the
//! port's default one-query-per-node walk.

use std::collections::HashMap;
use std::str::FromStr;

use anyhow::Context;
use async_trait::async_trait;
use chrono::DateTime;
use domains::models::{Community, PageRequest, Thought, User};
use domains::ports::{CommunityRepository, ThoughtRepository, UserRepository};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::info;
use uuid::Uuid;

const THOUGHT_COLUMNS: &str = "id, text, author_id, community_id, parent_id, created_at_us";

/// Ids bound per statement. SQLite builds before 3.32 accept at most 999 variables.
const MAX_BOUND_IDS: usize = 500;

/// Users and communities share one table layout.
struct ProfileTable {
    table: &'static str,
    links: &'static str,
    owner_column: &'static str,
}

const USERS: ProfileTable = ProfileTable {
    table: "users",
    links: "user_thoughts",
    owner_column: "user_id",
};

const COMMUNITIES: ProfileTable = ProfileTable {
    table: "communities",
    links: "community_thoughts",
    owner_column: "community_id",
};

struct ProfileRecord {
    id: Uuid,
    external_id: String,
    username: String,
    name: String,
    image: Option<String>,
    thoughts: Vec<Uuid>,
}

impl From<ProfileRecord> for User {
    fn from(r: ProfileRecord) -> Self {
        User {
            id: r.id,
            external_id: r.external_id,
            username: r.username,
            name: r.name,
            image: r.image,
            thoughts: r.thoughts,
        }
    }
}

impl From<ProfileRecord> for Community {
    fn from(r: ProfileRecord) -> Self {
        Community {
            id: r.id,
            external_id: r.external_id,
            username: r.username,
            name: r.name,
            image: r.image,
            thoughts: r.thoughts,
        }
    }
}

enum ProfileFilter<'a> {
    Ids(&'a [Uuid]),
    ExternalId(&'a str),
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) the database at `url` and applies migrations.
    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Self::migrate(pool).await
    }

    /// A private in-memory database. One connection that never expires, since
    /// each SQLite memory connection is its own database.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(SqliteConnectOptions::from_str("sqlite::memory:")?)
            .await?;
        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> anyhow::Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("sqlite schema is up to date");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Ordered link lists for `owners`, keyed by owner id.
    async fn link_lists(
        &self,
        table: &str,
        owner_column: &str,
        item_column: &str,
        owners: &[Uuid],
    ) -> anyhow::Result<HashMap<Uuid, Vec<Uuid>>> {
        let select = format!(
            "SELECT {owner_column} AS owner, {item_column} AS item FROM {table} \
             WHERE {owner_column} IN ("
        );
        let rows = self
            .fetch_in_chunks(&select, owners, " ORDER BY position")
            .await?;

        let mut lists: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for row in rows {
            lists
                .entry(row.try_get("owner")?)
                .or_default()
                .push(row.try_get("item")?);
        }
        Ok(lists)
    }

    /// Fills in each thought's `children` list.
    async fn with_children(&self, mut thoughts: Vec<Thought>) -> anyhow::Result<Vec<Thought>> {
        let ids: Vec<Uuid> = thoughts.iter().map(|t| t.id).collect();
        let mut lists = self
            .link_lists("thought_children", "parent_id", "child_id", &ids)
            .await?;
        for thought in &mut thoughts {
            thought.children = lists.remove(&thought.id).unwrap_or_default();
        }
        Ok(thoughts)
    }

    /// Runs `sql` once per chunk of `ids`. `sql` ends with an open `IN (`;
    /// `suffix` follows the closed list.
    async fn fetch_in_chunks(
        &self,
        sql: &str,
        ids: &[Uuid],
        suffix: &str,
    ) -> anyhow::Result<Vec<SqliteRow>> {
        let mut rows = Vec::new();
        for chunk in ids.chunks(MAX_BOUND_IDS) {
            let mut qb = QueryBuilder::<Sqlite>::new(sql);
            push_id_list(&mut qb, chunk);
            qb.push(suffix);
            rows.extend(qb.build().fetch_all(&self.pool).await?);
        }
        Ok(rows)
    }

    async fn load_profiles(
        &self,
        t: &ProfileTable,
        filter: ProfileFilter<'_>,
    ) -> anyhow::Result<Vec<ProfileRecord>> {
        let select = format!(
            "SELECT id, external_id, username, name, image FROM {} WHERE ",
            t.table
        );
        let rows = match filter {
            ProfileFilter::Ids(ids) => {
                let select = format!("{select}id IN (");
                self.fetch_in_chunks(&select, ids, "").await?
            }
            ProfileFilter::ExternalId(external_id) => {
                let mut qb = QueryBuilder::<Sqlite>::new(select);
                qb.push("external_id = ").push_bind(external_id.to_owned());
                qb.build().fetch_all(&self.pool).await?
            }
        };

        let mut records = rows
            .iter()
            .map(profile_from_row)
            .collect::<anyhow::Result<Vec<_>>>()?;

        let owners: Vec<Uuid> = records.iter().map(|r| r.id).collect();
        let mut lists = self
            .link_lists(t.links, t.owner_column, "thought_id", &owners)
            .await?;
        for record in &mut records {
            record.thoughts = lists.remove(&record.id).unwrap_or_default();
        }
        Ok(records)
    }

    /// Inserts or replaces a profile document, including its thought list.
    async fn upsert_profile(&self, t: &ProfileTable, record: ProfileRecord) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            "INSERT INTO {} (id, external_id, username, name, image) VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET external_id = excluded.external_id, \
             username = excluded.username, name = excluded.name, image = excluded.image",
            t.table
        ))
        .bind(record.id)
        .bind(&record.external_id)
        .bind(&record.username)
        .bind(&record.name)
        .bind(&record.image)
        .execute(&mut *tx)
        .await?;

        let clear_links = format!("DELETE FROM {} WHERE {} = ?", t.links, t.owner_column);
        sqlx::query(&clear_links)
            .bind(record.id)
            .execute(&mut *tx)
            .await?;
        for thought_id in &record.thoughts {
            sqlx::query(&format!(
                "INSERT INTO {} ({}, thought_id) VALUES (?, ?)",
                t.links, t.owner_column
            ))
            .bind(record.id)
            .bind(*thought_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn push_profile_thought(
        &self,
        t: &ProfileTable,
        owner: Uuid,
        thought_id: Uuid,
    ) -> anyhow::Result<()> {
        let inserted = sqlx::query(&format!(
            "INSERT INTO {links} ({owner_column}, thought_id) \
             SELECT ?, ? WHERE EXISTS (SELECT 1 FROM {table} WHERE id = ?)",
            links = t.links,
            owner_column = t.owner_column,
            table = t.table,
        ))
        .bind(owner)
        .bind(thought_id)
        .bind(owner)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted == 0 {
            anyhow::bail!("{} row {owner} does not exist", t.table);
        }
        Ok(())
    }

    /// Both id lists are chunked, so one statement binds at most
    /// `MAX_BOUND_IDS` variables.
    async fn pull_profile_thoughts(
        &self,
        t: &ProfileTable,
        owners: &[Uuid],
        thought_ids: &[Uuid],
    ) -> anyhow::Result<()> {
        if owners.is_empty() || thought_ids.is_empty() {
            return Ok(());
        }
        let delete = format!("DELETE FROM {} WHERE {} IN (", t.links, t.owner_column);
        let mut tx = self.pool.begin().await?;

        for owner_chunk in owners.chunks(MAX_BOUND_IDS / 2) {
            for thought_chunk in thought_ids.chunks(MAX_BOUND_IDS / 2) {
                let mut qb = QueryBuilder::<Sqlite>::new(delete.as_str());
                push_id_list(&mut qb, owner_chunk);
                qb.push(" AND thought_id IN (");
                push_id_list(&mut qb, thought_chunk);
                qb.build().execute(&mut *tx).await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

/// Pushes `?, ?, ...)` bound to `ids`. The caller has opened the parenthesis.
fn push_id_list(qb: &mut QueryBuilder<'_, Sqlite>, ids: &[Uuid]) {
    let mut list = qb.separated(", ");
    for id in ids {
        list.push_bind(*id);
    }
    list.push_unseparated(")");
}

fn thought_from_row(row: &SqliteRow) -> anyhow::Result<Thought> {
    let created_at_us: i64 = row.try_get("created_at_us")?;
    Ok(Thought {
        id: row.try_get("id")?,
        text: row.try_get("text")?,
        author_id: row.try_get("author_id")?,
        community_id: row.try_get("community_id")?,
        parent_id: row.try_get("parent_id")?,
        children: Vec::new(),
        created_at: DateTime::from_timestamp_micros(created_at_us)
            .with_context(|| format!("created_at {created_at_us} out of range"))?,
    })
}

fn profile_from_row(row: &SqliteRow) -> anyhow::Result<ProfileRecord> {
    Ok(ProfileRecord {
        id: row.try_get("id")?,
        external_id: row.try_get("external_id")?,
        username: row.try_get("username")?,
        name: row.try_get("name")?,
        image: row.try_get("image")?,
        thoughts: Vec::new(),
    })
}

#[async_trait]
impl ThoughtRepository for SqliteStore {
    async fn insert(&self, thought: &Thought) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO thoughts (id, text, author_id, community_id, parent_id, created_at_us) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(thought.id)
        .bind(&thought.text)
        .bind(thought.author_id)
        .bind(thought.community_id)
        .bind(thought.parent_id)
        .bind(thought.created_at.timestamp_micros())
        .execute(&mut *tx)
        .await?;

        for child_id in &thought.children {
            sqlx::query(
                "INSERT INTO thought_children (parent_id, child_id) VALUES (?, ?)",
            )
            .bind(thought.id)
            .bind(*child_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Thought>> {
        let row = sqlx::query(&format!(
            "SELECT {THOUGHT_COLUMNS} FROM thoughts WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let thought = thought_from_row(&row)?;
                Ok(self.with_children(vec![thought]).await?.pop())
            }
            None => Ok(None),
        }
    }

    async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Thought>> {
        let select = format!("SELECT {THOUGHT_COLUMNS} FROM thoughts WHERE id IN (");
        let thoughts = self
            .fetch_in_chunks(&select, ids, "")
            .await?
            .iter()
            .map(thought_from_row)
            .collect::<anyhow::Result<Vec<_>>>()?;
        self.with_children(thoughts).await
    }

    async fn find_children(&self, parent_id: Uuid) -> anyhow::Result<Vec<Thought>> {
        let thoughts = sqlx::query(&format!(
            "SELECT {THOUGHT_COLUMNS} FROM thoughts WHERE parent_id = ? ORDER BY rowid"
        ))
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(thought_from_row)
        .collect::<anyhow::Result<Vec<_>>>()?;
        self.with_children(thoughts).await
    }

    async fn find_descendants(&self, root_id: Uuid) -> anyhow::Result<Vec<Thought>> {
        // UNION (not UNION ALL) stops the walk if a cycle was ever written.
        let thoughts = sqlx::query(&format!(
            "WITH RECURSIVE subtree(id) AS ( \
                 SELECT id FROM thoughts WHERE parent_id = ? \
                 UNION \
                 SELECT t.id FROM thoughts t JOIN subtree s ON t.parent_id = s.id \
             ) \
             SELECT {THOUGHT_COLUMNS} FROM thoughts \
             WHERE id IN (SELECT id FROM subtree) AND id != ?"
        ))
        .bind(root_id)
        .bind(root_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(thought_from_row)
        .collect::<anyhow::Result<Vec<_>>>()?;
        self.with_children(thoughts).await
    }

    async fn append_child(&self, parent_id: Uuid, child_id: Uuid) -> anyhow::Result<()> {
        let inserted = sqlx::query(
            "INSERT INTO thought_children (parent_id, child_id) \
             SELECT ?, ? WHERE EXISTS (SELECT 1 FROM thoughts WHERE id = ?)",
        )
        .bind(parent_id)
        .bind(child_id)
        .bind(parent_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted == 0 {
            anyhow::bail!("thought {parent_id} does not exist");
        }
        Ok(())
    }

    async fn remove_child(&self, parent_id: Uuid, child_id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            "DELETE FROM thought_children WHERE parent_id = ? AND child_id = ?",
        )
        .bind(parent_id)
        .bind(child_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_top_level(&self, page: PageRequest) -> anyhow::Result<Vec<Thought>> {
        let thoughts = sqlx::query(&format!(
            "SELECT {THOUGHT_COLUMNS} FROM thoughts WHERE parent_id IS NULL \
             ORDER BY created_at_us DESC, rowid ASC LIMIT ? OFFSET ?"
        ))
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(thought_from_row)
        .collect::<anyhow::Result<Vec<_>>>()?;
        self.with_children(thoughts).await
    }

    async fn count_top_level(&self) -> anyhow::Result<u64> {
        let count: i64 = sqlx::query("SELECT COUNT(*) FROM thoughts WHERE parent_id IS NULL")
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?;
        Ok(count as u64)
    }

    async fn delete_many(&self, ids: &[Uuid]) -> anyhow::Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut tx = self.pool.begin().await?;
        let mut removed = 0;

        for chunk in ids.chunks(MAX_BOUND_IDS) {
            let mut qb = QueryBuilder::new("DELETE FROM thoughts WHERE id IN (");
            push_id_list(&mut qb, chunk);
            removed += qb.build().execute(&mut *tx).await?.rows_affected();

            // A deleted document takes its embedded children list with it.
            let mut qb = QueryBuilder::new("DELETE FROM thought_children WHERE parent_id IN (");
            push_id_list(&mut qb, chunk);
            qb.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(removed)
    }
}

#[async_trait]
impl UserRepository for SqliteStore {
    async fn upsert(&self, user: &User) -> anyhow::Result<()> {
        self.upsert_profile(
            &USERS,
            ProfileRecord {
                id: user.id,
                external_id: user.external_id.clone(),
                username: user.username.clone(),
                name: user.name.clone(),
                image: user.image.clone(),
                thoughts: user.thoughts.clone(),
            },
        )
        .await
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let mut found = self.load_profiles(&USERS, ProfileFilter::Ids(&[id])).await?;
        Ok(found.pop().map(User::from))
    }

    async fn find_by_external_id(&self, external_id: &str) -> anyhow::Result<Option<User>> {
        let mut found = self
            .load_profiles(&USERS, ProfileFilter::ExternalId(external_id))
            .await?;
        Ok(found.pop().map(User::from))
    }

    async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<User>> {
        let found = self.load_profiles(&USERS, ProfileFilter::Ids(ids)).await?;
        Ok(found.into_iter().map(User::from).collect())
    }

    async fn push_thought(&self, user_id: Uuid, thought_id: Uuid) -> anyhow::Result<()> {
        self.push_profile_thought(&USERS, user_id, thought_id).await
    }

    async fn pull_thoughts(&self, user_ids: &[Uuid], thought_ids: &[Uuid]) -> anyhow::Result<()> {
        self.pull_profile_thoughts(&USERS, user_ids, thought_ids)
            .await
    }
}

#[async_trait]
impl CommunityRepository for SqliteStore {
    async fn upsert(&self, community: &Community) -> anyhow::Result<()> {
        self.upsert_profile(
            &COMMUNITIES,
            ProfileRecord {
                id: community.id,
                external_id: community.external_id.clone(),
                username: community.username.clone(),
                name: community.name.clone(),
                image: community.image.clone(),
                thoughts: community.thoughts.clone(),
            },
        )
        .await
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Community>> {
        let mut found = self
            .load_profiles(&COMMUNITIES, ProfileFilter::Ids(&[id]))
            .await?;
        Ok(found.pop().map(Community::from))
    }

    async fn find_by_external_id(&self, external_id: &str) -> anyhow::Result<Option<Community>> {
        let mut found = self
            .load_profiles(&COMMUNITIES, ProfileFilter::ExternalId(external_id))
            .await?;
        Ok(found.pop().map(Community::from))
    }

    async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Community>> {
        let found = self
            .load_profiles(&COMMUNITIES, ProfileFilter::Ids(ids))
            .await?;
        Ok(found.into_iter().map(Community::from).collect())
    }

    async fn push_thought(&self, community_id: Uuid, thought_id: Uuid) -> anyhow::Result<()> {
        self.push_profile_thought(&COMMUNITIES, community_id, thought_id)
            .await
    }

    async fn pull_thoughts(
        &self,
        community_ids: &[Uuid],
        thought_ids: &[Uuid],
    ) -> anyhow::Result<()> {
        self.pull_profile_thoughts(&COMMUNITIES, community_ids, thought_ids)
            .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    async fn store() -> SqliteStore {
        SqliteStore::in_memory().await.expect("in-memory sqlite")
    }

    #[tokio::test]
    async fn thought_round_trips_with_children() {
        let store = store().await;
        let author = Uuid::now_v7();
        let root = Thought::new_post("root post", author, Some(Uuid::now_v7()));
        let reply = Thought::new_comment(root.id, "reply", author);
        store.insert(&root).await.unwrap();
        store.insert(&reply).await.unwrap();
        store.append_child(root.id, reply.id).await.unwrap();

        let loaded = ThoughtRepository::find_by_id(&store, root.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.text, "root post");
        assert_eq!(loaded.community_id, root.community_id);
        assert_eq!(loaded.children, vec![reply.id]);
        assert_eq!(
            loaded.created_at.timestamp_micros(),
            root.created_at.timestamp_micros()
        );
    }

    #[tokio::test]
    async fn descendants_come_from_one_recursive_query() {
        let store = store().await;
        let author = Uuid::now_v7();
        let a = Thought::new_post("A", author, None);
        let b = Thought::new_comment(a.id, "B", author);
        let c = Thought::new_comment(a.id, "C", author);
        let d = Thought::new_comment(b.id, "D", author);
        let e = Thought::new_comment(d.id, "E", author);
        let unrelated = Thought::new_post("Z", author, None);
        for t in [&a, &b, &c, &d, &e, &unrelated] {
            store.insert(t).await.unwrap();
        }

        let mut ids: Vec<Uuid> = store
            .find_descendants(a.id)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        ids.sort();
        let mut expected = vec![b.id, c.id, d.id, e.id];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn feed_orders_newest_first_with_rowid_ties() {
        let store = store().await;
        let author = Uuid::now_v7();
        let at = Utc::now();
        let first = Thought::new_post("first", author, None).with_created_at(at);
        let second = Thought::new_post("second", author, None).with_created_at(at);
        let newest = Thought::new_post("newest", author, None)
            .with_created_at(at + Duration::seconds(5));
        for t in [&first, &second, &newest] {
            store.insert(t).await.unwrap();
        }

        let page = store.list_top_level(PageRequest::new(1, 2)).await.unwrap();
        let texts: Vec<&str> = page.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["newest", "first"]);
        let page = store.list_top_level(PageRequest::new(2, 2)).await.unwrap();
        assert_eq!(page[0].text, "second");
        assert_eq!(store.count_top_level().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn delete_many_drops_rows_and_their_child_lists() {
        let store = store().await;
        let author = Uuid::now_v7();
        let root = Thought::new_post("root", author, None);
        let reply = Thought::new_comment(root.id, "reply", author);
        store.insert(&root).await.unwrap();
        store.insert(&reply).await.unwrap();
        store.append_child(root.id, reply.id).await.unwrap();

        let removed = store
            .delete_many(&[root.id, reply.id, Uuid::now_v7()])
            .await
            .unwrap();
        assert_eq!(removed, 2);
        let gone = ThoughtRepository::find_by_id(&store, root.id)
            .await
            .unwrap();
        assert!(gone.is_none());

        let leftover: i64 = sqlx::query("SELECT COUNT(*) FROM thought_children")
            .fetch_one(store.pool())
            .await
            .unwrap()
            .get(0);
        assert_eq!(leftover, 0);
    }

    #[tokio::test]
    async fn long_id_lists_are_split_across_statements() {
        let store = store().await;
        let author = Uuid::now_v7();
        let root = Thought::new_post("root", author, None);
        let reply = Thought::new_comment(root.id, "reply", author);
        store.insert(&root).await.unwrap();
        store.insert(&reply).await.unwrap();
        store.append_child(root.id, reply.id).await.unwrap();
        let user = User::new("ext_ada", "ada", "Ada");
        UserRepository::upsert(&store, &user).await.unwrap();
        UserRepository::push_thought(&store, user.id, root.id)
            .await
            .unwrap();

        // Known rows sit in the first and the last chunk.
        let mut ids = vec![root.id];
        ids.extend((0..2_500).map(|_| Uuid::now_v7()));
        ids.push(reply.id);

        let found = ThoughtRepository::find_many(&store, &ids).await.unwrap();
        assert_eq!(found.len(), 2);
        let mut owners = ids.clone();
        owners.push(user.id);
        let users = UserRepository::find_many(&store, &owners).await.unwrap();
        assert_eq!(users.len(), 1);

        UserRepository::pull_thoughts(&store, &owners, &ids)
            .await
            .unwrap();
        assert_eq!(store.delete_many(&ids).await.unwrap(), 2);

        let loaded = UserRepository::find_by_id(&store, user.id)
            .await
            .unwrap()
            .unwrap();
        assert!(loaded.thoughts.is_empty());
        let leftover: i64 = sqlx::query("SELECT COUNT(*) FROM thought_children")
            .fetch_one(store.pool())
            .await
            .unwrap()
            .get(0);
        assert_eq!(leftover, 0);
    }

    #[tokio::test]
    async fn profile_lists_keep_append_order_and_pull_by_set() {
        let store = store().await;
        let user = User::new("ext_ada", "ada", "Ada");
        UserRepository::upsert(&store, &user).await.unwrap();
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::now_v7()).collect();
        for id in &ids {
            UserRepository::push_thought(&store, user.id, *id)
                .await
                .unwrap();
        }

        UserRepository::pull_thoughts(&store, &[user.id], &[ids[1]])
            .await
            .unwrap();

        let loaded = UserRepository::find_by_external_id(&store, "ext_ada")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.thoughts, vec![ids[0], ids[2]]);
    }

    #[tokio::test]
    async fn pushing_to_missing_community_fails() {
        let store = store().await;
        let err = CommunityRepository::push_thought(&store, Uuid::now_v7(), Uuid::now_v7())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
