//! Markdown content collections.
//!
//! A collection is a directory of markdown files. Each file starts with a
//! frontmatter block, either TOML between `+++` fences or simple
//! `key: value` lines between `---` fences, and its file stem is the post's
//! slug.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

#[derive(Debug, Clone, PartialEq)]
pub struct PostRecord {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub publish_date: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: no frontmatter block", path.display())]
    MissingFrontmatter { path: PathBuf },
    #[error("{}: invalid TOML frontmatter: {source}", path.display())]
    InvalidFrontmatter {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{}: missing `{field}` in frontmatter", path.display())]
    MissingField { path: PathBuf, field: &'static str },
    #[error("{}: unrecognised date `{value}`", path.display())]
    InvalidDate { path: PathBuf, value: String },
    #[error("{} and {} share the slug `{slug}`", first.display(), second.display())]
    DuplicateSlug {
        slug: String,
        first: PathBuf,
        second: PathBuf,
    },
}

#[derive(Debug, Deserialize)]
struct TomlFrontmatter {
    title: Option<String>,
    description: Option<String>,
    #[serde(alias = "pubDate", alias = "publishDate")]
    date: Option<toml::Value>,
}

/// Frontmatter fields before validation, whatever the fence style.
#[derive(Debug, Default)]
struct RawMeta {
    title: Option<String>,
    description: Option<String>,
    date: Option<String>,
}

enum Fence {
    Toml,
    Yaml,
}

/// Load every post of the collection stored in `dir`, sorted by slug.
///
/// Files whose name starts with `_` and files that are not markdown are
/// skipped.
pub fn load_collection(dir: &Path) -> Result<Vec<PostRecord>, ContentError> {
    let io_err = |source| ContentError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut posts = Vec::new();
    let mut seen: HashMap<String, PathBuf> = HashMap::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if !is_post_file(&path) {
            continue;
        }

        let source = std::fs::read_to_string(&path).map_err(|source| ContentError::Io {
            path: path.clone(),
            source,
        })?;
        let post = parse_post(&path, &source)?;
        if let Some(first) = seen.insert(post.slug.clone(), path.clone()) {
            return Err(ContentError::DuplicateSlug {
                slug: post.slug,
                first,
                second: path,
            });
        }
        posts.push(post);
    }

    posts.sort_by(|a, b| a.slug.cmp(&b.slug));
    Ok(posts)
}

fn is_post_file(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }

    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .map_or(true, |n| n.starts_with('_') || n.starts_with('.'));
    let markdown = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| MARKDOWN_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));

    !hidden && markdown
}

/// Parse one markdown file. The slug is taken from the file stem of `path`.
pub fn parse_post(path: &Path, source: &str) -> Result<PostRecord, ContentError> {
    let slug = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();

    let (fence, frontmatter) =
        split_frontmatter(source).ok_or_else(|| ContentError::MissingFrontmatter {
            path: path.to_path_buf(),
        })?;

    let meta = match fence {
        Fence::Toml => parse_toml(path, frontmatter)?,
        Fence::Yaml => parse_yaml_like(frontmatter),
    };

    let missing = |field: &'static str| ContentError::MissingField {
        path: path.to_path_buf(),
        field,
    };
    let title = meta.title.ok_or_else(|| missing("title"))?;
    let description = meta.description.ok_or_else(|| missing("description"))?;
    let date = meta.date.ok_or_else(|| missing("date"))?;
    let publish_date = parse_date(&date).ok_or_else(|| ContentError::InvalidDate {
        path: path.to_path_buf(),
        value: date.clone(),
    })?;

    Ok(PostRecord {
        slug,
        title,
        description,
        publish_date,
    })
}

/// Returns the fence style and the text between the fences.
fn split_frontmatter(source: &str) -> Option<(Fence, &str)> {
    let trimmed = source.trim_start_matches('\u{feff}').trim_start();

    let (fence, marker) = if trimmed.starts_with("+++") {
        (Fence::Toml, "+++")
    } else if trimmed.starts_with("---") {
        (Fence::Yaml, "---")
    } else {
        return None;
    };

    let rest = &trimmed[marker.len()..];
    let rest = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))?;

    if rest.starts_with(marker) {
        return Some((fence, ""));
    }
    let end = rest.find(&format!("\n{}", marker))?;
    let front = &rest[..end];
    Some((fence, front.strip_suffix('\r').unwrap_or(front)))
}

fn parse_toml(path: &Path, content: &str) -> Result<RawMeta, ContentError> {
    let front: TomlFrontmatter =
        toml::from_str(content).map_err(|source| ContentError::InvalidFrontmatter {
            path: path.to_path_buf(),
            source,
        })?;

    let date = front.date.map(|value| match value {
        toml::Value::String(s) => s,
        toml::Value::Datetime(dt) => dt.to_string(),
        other => other.to_string(),
    });

    Ok(RawMeta {
        title: front.title,
        description: front.description,
        date,
    })
}

fn parse_yaml_like(content: &str) -> RawMeta {
    let mut fields: HashMap<String, String> = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            fields.insert(key.trim().to_string(), unquote(value.trim()).to_string());
        }
    }

    let date = ["date", "pubDate", "publishDate"]
        .iter()
        .find_map(|key| fields.remove(*key));

    RawMeta {
        title: fields.remove("title"),
        description: fields.remove("description"),
        date,
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC) or a bare
/// `YYYY-MM-DD` (midnight UTC).
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
