//! # Domain Models
//!
//! These structs represent the core entities of Thoughtboard.
//! We use UUID v7 for time-ordered, globally unique identification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A post or a comment: one node in the reply forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thought {
    pub id: Uuid,
    pub text: String,
    pub author_id: Uuid,
    /// Optional community tag; never inherited by comments.
    pub community_id: Option<Uuid>,
    /// `None` marks a top-level post.
    pub parent_id: Option<Uuid>,
    /// Direct replies in attachment order.
    pub children: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Thought {
    /// Builds a new top-level post.
    pub fn new_post(text: impl Into<String>, author_id: Uuid, community_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::now_v7(),
            text: text.into(),
            author_id,
            community_id,
            parent_id: None,
            children: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Builds a reply to `parent_id`.
    pub fn new_comment(parent_id: Uuid, text: impl Into<String>, author_id: Uuid) -> Self {
        Self {
            parent_id: Some(parent_id),
            ..Self::new_post(text, author_id, None)
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// A registered account. Created by the onboarding flow, which lives outside this service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Identifier issued by the identity provider.
    pub external_id: String,
    pub username: String,
    pub name: String,
    pub image: Option<String>,
    /// Authored top-level thoughts, oldest first.
    pub thoughts: Vec<Uuid>,
}

impl User {
    pub fn new(
        external_id: impl Into<String>,
        username: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            external_id: external_id.into(),
            username: username.into(),
            name: name.into(),
            image: None,
            thoughts: Vec::new(),
        }
    }
}

/// An organization that members can post under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Community {
    pub id: Uuid,
    /// Organization identifier issued by the identity provider.
    pub external_id: String,
    pub username: String,
    pub name: String,
    pub image: Option<String>,
    pub thoughts: Vec<Uuid>,
}

impl Community {
    pub fn new(
        external_id: impl Into<String>,
        username: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            external_id: external_id.into(),
            username: username.into(),
            name: name.into(),
            image: None,
            thoughts: Vec::new(),
        }
    }
}

/// Public fields of a User embedded in expanded thoughts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: Uuid,
    pub external_id: String,
    pub name: String,
    pub image: Option<String>,
}

impl From<&User> for AuthorSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            external_id: user.external_id.clone(),
            name: user.name.clone(),
            image: user.image.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunitySummary {
    pub id: Uuid,
    pub external_id: String,
    pub name: String,
    pub image: Option<String>,
}

impl From<&Community> for CommunitySummary {
    fn from(community: &Community) -> Self {
        Self {
            id: community.id,
            external_id: community.external_id.clone(),
            name: community.name.clone(),
            image: community.image.clone(),
        }
    }
}

/// A thought with its references expanded for display.
///
/// `children` holds only the levels that were expanded; `reply_count` always
/// reflects the stored children list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThoughtView {
    pub id: Uuid,
    pub text: String,
    pub parent_id: Option<Uuid>,
    pub author: Option<AuthorSummary>,
    pub community: Option<CommunitySummary>,
    pub created_at: DateTime<Utc>,
    pub reply_count: usize,
    pub children: Vec<ThoughtView>,
}

/// One page of the top-level feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPage {
    pub posts: Vec<ThoughtView>,
    pub has_next: bool,
}

/// 1-based page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub number: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn new(number: u32, size: u32) -> Self {
        Self { number, size }
    }

    /// Rows to skip. Callers must reject `number == 0` first.
    pub fn offset(&self) -> u64 {
        u64::from(self.number.saturating_sub(1)) * u64::from(self.size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.size)
    }
}

/// Whose profile a thought listing belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProfileOwner {
    User(AuthorSummary),
    Community(CommunitySummary),
}

/// Thoughts listed on a user or community profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileThoughts {
    pub owner: ProfileOwner,
    pub thoughts: Vec<ThoughtView>,
}
