//! Reference expansion ("populate") for thought listings.
//!
//! Loads a fixed number of reply levels below the given roots, then resolves
//! every author and community reference in two batch lookups. References to
//! records that no longer exist are dropped from the result.

use std::collections::{BTreeSet, HashMap};

use domains::models::{AuthorSummary, Community, CommunitySummary, Thought, ThoughtView, User};
use uuid::Uuid;

use crate::Ports;

pub(crate) struct Expander<'a> {
    ports: &'a Ports,
}

impl<'a> Expander<'a> {
    pub(crate) fn new(ports: &'a Ports) -> Self {
        Self { ports }
    }

    /// Expands `roots` keeping their order, with `depth` levels of children.
    pub(crate) async fn expand(
        &self,
        roots: Vec<Thought>,
        depth: usize,
    ) -> anyhow::Result<Vec<ThoughtView>> {
        let root_ids: Vec<Uuid> = roots.iter().map(|t| t.id).collect();
        let mut nodes: HashMap<Uuid, Thought> = HashMap::new();
        let mut level: Vec<Uuid> = root_ids.clone();
        for root in roots {
            nodes.insert(root.id, root);
        }

        for _ in 0..depth {
            let wanted: Vec<Uuid> = level
                .iter()
                .filter_map(|id| nodes.get(id))
                .flat_map(|t| t.children.iter().copied())
                .filter(|id| !nodes.contains_key(id))
                .collect();
            if wanted.is_empty() {
                break;
            }
            level.clear();
            for child in self.ports.thoughts.find_many(&wanted).await? {
                level.push(child.id);
                nodes.insert(child.id, child);
            }
        }

        let author_ids: Vec<Uuid> = nodes
            .values()
            .map(|t| t.author_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let community_ids: Vec<Uuid> = nodes
            .values()
            .filter_map(|t| t.community_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let authors: HashMap<Uuid, User> = self
            .ports
            .users
            .find_many(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();
        let communities: HashMap<Uuid, Community> = if community_ids.is_empty() {
            HashMap::new()
        } else {
            self.ports
                .communities
                .find_many(&community_ids)
                .await?
                .into_iter()
                .map(|c| (c.id, c))
                .collect()
        };

        let lookup = Lookup {
            nodes: &nodes,
            authors: &authors,
            communities: &communities,
        };
        Ok(root_ids
            .iter()
            .filter_map(|id| nodes.get(id))
            .map(|root| lookup.view(root, depth))
            .collect())
    }
}

struct Lookup<'a> {
    nodes: &'a HashMap<Uuid, Thought>,
    authors: &'a HashMap<Uuid, User>,
    communities: &'a HashMap<Uuid, Community>,
}

impl Lookup<'_> {
    fn view(&self, thought: &Thought, depth: usize) -> ThoughtView {
        let children = if depth == 0 {
            Vec::new()
        } else {
            thought
                .children
                .iter()
                .filter_map(|id| self.nodes.get(id))
                .map(|child| self.view(child, depth - 1))
                .collect()
        };

        ThoughtView {
            id: thought.id,
            text: thought.text.clone(),
            parent_id: thought.parent_id,
            author: self
                .authors
                .get(&thought.author_id)
                .map(AuthorSummary::from),
            community: thought
                .community_id
                .and_then(|id| self.communities.get(&id))
                .map(CommunitySummary::from),
            created_at: thought.created_at,
            reply_count: thought.children.len(),
            children,
        }
    }
}
