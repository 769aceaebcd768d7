//! # services
//!
//! Use-case orchestration for Thoughtboard. Each service owns a [`Ports`]
//! bundle and performs a strict sequence of awaited port calls per operation.

use std::sync::Arc;

use domains::ports::{CommunityRepository, ThoughtRepository, UserRepository, ViewInvalidator};

mod expand;
pub mod profiles;
pub mod thoughts;

pub use profiles::ProfileService;
pub use thoughts::{NewComment, NewThought, ThoughtService};

/// The adapters a service talks to.
#[derive(Clone)]
pub struct Ports {
    pub thoughts: Arc<dyn ThoughtRepository>,
    pub users: Arc<dyn UserRepository>,
    pub communities: Arc<dyn CommunityRepository>,
    pub views: Arc<dyn ViewInvalidator>,
}

impl Ports {
    /// Bundles one store that implements every repository port.
    pub fn from_store<S>(store: Arc<S>, views: Arc<dyn ViewInvalidator>) -> Self
    where
        S: ThoughtRepository + UserRepository + CommunityRepository + 'static,
    {
        Self {
            thoughts: store.clone(),
            users: store.clone(),
            communities: store,
            views,
        }
    }
}
