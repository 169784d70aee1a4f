use chrono::{DateTime, Utc};

use crate::content::PostRecord;

pub const FEED_TITLE: &str = "Jordi's Blog";
pub const FEED_DESCRIPTION: &str = "Aprendiendo con Astro";
pub const FEED_CUSTOM_DATA: &str = "<language>es-es</language>";

/// Path prefix every post link is built from.
pub const POST_LINK_PREFIX: &str = "/posts/";

#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub title: String,
    pub pub_date: DateTime<Utc>,
    pub description: String,
    pub link: String,
}

impl FeedItem {
    pub fn from_post(post: &PostRecord) -> Self {
        Self {
            title: post.title.clone(),
            pub_date: post.publish_date,
            description: post.description.clone(),
            link: format!("{}{}", POST_LINK_PREFIX, post.slug),
        }
    }
}

/// Everything the renderer needs to produce one RSS document.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedDescriptor {
    pub title: String,
    pub description: String,
    pub site_url: String,
    pub items: Vec<FeedItem>,
    /// Raw XML injected into `<channel>` as-is.
    pub custom_data: String,
    pub stylesheet: Option<String>,
}

impl FeedDescriptor {
    pub fn with_stylesheet(mut self, stylesheet: Option<String>) -> Self {
        self.stylesheet = stylesheet;
        self
    }
}

/// Build the blog feed from posts, keeping their order.
///
/// A missing site URL becomes the empty string; this never fails.
pub fn assemble(site_url: Option<&str>, posts: &[PostRecord]) -> FeedDescriptor {
    FeedDescriptor {
        title: FEED_TITLE.to_string(),
        description: FEED_DESCRIPTION.to_string(),
        site_url: site_url.unwrap_or_default().to_string(),
        items: posts.iter().map(FeedItem::from_post).collect(),
        custom_data: FEED_CUSTOM_DATA.to_string(),
        stylesheet: None,
    }
}
