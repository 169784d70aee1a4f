use std::sync::Arc;

use askama::Template;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::error;

use crate::db::Database;
use crate::feed::{self, FeedDescriptor, FeedItem};

/// Collection the feed is built from.
pub const BLOG_COLLECTION: &str = "blog";

pub struct AppState {
    pub db: Arc<Database>,
    /// Site base URL, when known.
    pub site: Option<String>,
    pub stylesheet: Option<String>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/rss.xml", get(rss))
        .route("/health", get(health))
        .with_state(state)
}

#[derive(Template)]
#[template(path = "rss.xml")]
pub struct RssTemplate {
    pub title: String,
    pub description: String,
    pub site_url: String,
    pub custom_data: String,
    pub stylesheet: Option<String>,
    pub items: Vec<RssItem>,
}

pub struct RssItem {
    pub title: String,
    pub link: String,
    /// Only absolute links may be marked as permalink guids.
    pub is_permalink: bool,
    pub description: String,
    /// RFC 2822, as RSS 2.0 requires.
    pub pub_date: String,
}

impl RssItem {
    fn new(item: FeedItem, site_url: &str) -> Self {
        let link = absolute_link(site_url, &item.link);
        Self {
            title: item.title,
            is_permalink: link.contains("://"),
            link,
            description: item.description,
            pub_date: item.pub_date.to_rfc2822(),
        }
    }
}

impl From<FeedDescriptor> for RssTemplate {
    fn from(feed: FeedDescriptor) -> Self {
        let items = feed
            .items
            .into_iter()
            .map(|item| RssItem::new(item, &feed.site_url))
            .collect();

        Self {
            title: feed.title,
            description: feed.description,
            site_url: feed.site_url,
            custom_data: feed.custom_data,
            stylesheet: feed.stylesheet,
            items,
        }
    }
}

/// Resolve a root-relative link against the site URL. Links stay relative
/// when the site is unknown, and absolute links are left alone.
pub fn absolute_link(site_url: &str, link: &str) -> String {
    if site_url.is_empty() || !link.starts_with('/') {
        return link.to_string();
    }
    format!("{}{}", site_url.trim_end_matches('/'), link)
}

// Wrapper for XML responses
struct XmlTemplate<T>(T);

impl<T: Template> IntoResponse for XmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(xml) => ([(header::CONTENT_TYPE, "application/xml")], xml).into_response(),
            Err(err) => {
                error!("Failed to render feed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to render template: {}", err),
                )
                    .into_response()
            }
        }
    }
}

// Custom error type
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("Request failed: {:#}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error: {}", self.0),
        )
            .into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        AppError(err.into())
    }
}

// Route handlers
pub async fn rss(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let posts = state.db.get_collection(BLOG_COLLECTION).await?;

    let feed = feed::assemble(state.site.as_deref(), &posts)
        .with_stylesheet(state.stylesheet.clone());

    Ok(XmlTemplate(RssTemplate::from(feed)))
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}
