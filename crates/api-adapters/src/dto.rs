//! Wire shapes for requests the services do not model directly.

use domains::models::PageRequest;
use serde::Deserialize;

/// Page-size bounds applied to feed requests.
#[derive(Debug, Clone, Copy)]
pub struct FeedLimits {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for FeedLimits {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl FeedQuery {
    /// Fills in defaults and caps the size. Zero values pass through so the
    /// service can reject them.
    pub fn page_request(&self, limits: FeedLimits) -> PageRequest {
        let size = self
            .page_size
            .unwrap_or(limits.default_page_size)
            .min(limits.max_page_size);
        PageRequest::new(self.page.unwrap_or(1), size)
    }
}

/// Body of `POST /api/thoughts` and `POST /api/thoughts/{id}/comments`.
#[derive(Debug, Deserialize)]
pub struct ThoughtPayload {
    pub text: String,
    /// Identity-provider organization id. Ignored for comments.
    #[serde(default)]
    pub community_id: Option<String>,
    #[serde(default = "root_path")]
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    #[serde(default = "root_path")]
    pub path: String,
}

fn root_path() -> String {
    "/".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_query_defaults_and_caps() {
        let limits = FeedLimits {
            default_page_size: 20,
            max_page_size: 50,
        };

        let page = FeedQuery::default().page_request(limits);
        assert_eq!((page.number, page.size), (1, 20));

        let page = FeedQuery {
            page: Some(3),
            page_size: Some(500),
        }
        .page_request(limits);
        assert_eq!((page.number, page.size), (3, 50));

        let page = FeedQuery {
            page: Some(0),
            page_size: Some(0),
        }
        .page_request(limits);
        assert_eq!((page.number, page.size), (0, 0));
    }

    #[test]
    fn payload_path_defaults_to_root() {
        let payload: ThoughtPayload = serde_json::from_str(r#"{"text":"hello"}"#).unwrap();
        assert_eq!(payload.path, "/");
        assert!(payload.community_id.is_none());
    }
}
