//! Blog RSS - serves a blog content collection as an RSS feed
//!
//! Markdown posts are loaded from a content directory into SQLite and
//! rendered as an RSS 2.0 document at `/rss.xml`.

pub mod config;
pub mod content;
pub mod db;
pub mod feed;
pub mod loader;
pub mod routes;
