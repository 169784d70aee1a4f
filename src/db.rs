use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, FromRow, SqlitePool};

use crate::content::PostRecord;

#[derive(Debug, Clone, FromRow)]
pub struct Post {
    pub id: i64,
    pub collection: String,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub publish_date: String,
}

impl TryFrom<Post> for PostRecord {
    type Error = anyhow::Error;

    fn try_from(post: Post) -> anyhow::Result<Self> {
        let publish_date = DateTime::parse_from_rfc3339(&post.publish_date)?.with_timezone(&Utc);
        Ok(PostRecord {
            slug: post.slug,
            title: post.title,
            description: post.description,
            publish_date,
        })
    }
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Every connection to `:memory:` is its own database.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn initialize(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY,
                collection TEXT NOT NULL,
                slug TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                publish_date TEXT NOT NULL,
                UNIQUE(collection, slug)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Replace the stored contents of `collection` with `posts`.
    ///
    /// Existing posts are updated in place, new ones inserted, and posts no
    /// longer present are removed, all in one transaction.
    pub async fn sync_collection(
        &self,
        collection: &str,
        posts: &[PostRecord],
    ) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        for post in posts {
            sqlx::query(
                r#"
                INSERT INTO posts (collection, slug, title, description, publish_date)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(collection, slug) DO UPDATE SET
                    title = excluded.title,
                    description = excluded.description,
                    publish_date = excluded.publish_date
                "#,
            )
            .bind(collection)
            .bind(&post.slug)
            .bind(&post.title)
            .bind(&post.description)
            .bind(post.publish_date.to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }

        let current: HashSet<&str> = posts.iter().map(|p| p.slug.as_str()).collect();
        let stored: Vec<String> =
            sqlx::query_scalar("SELECT slug FROM posts WHERE collection = ?")
                .bind(collection)
                .fetch_all(&mut *tx)
                .await?;

        for slug in stored.iter().filter(|s| !current.contains(s.as_str())) {
            sqlx::query("DELETE FROM posts WHERE collection = ? AND slug = ?")
                .bind(collection)
                .bind(slug)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Every post of `collection`, ordered by slug.
    pub async fn get_collection(&self, collection: &str) -> anyhow::Result<Vec<PostRecord>> {
        let posts = sqlx::query_as::<_, Post>(
            "SELECT * FROM posts WHERE collection = ? ORDER BY slug",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        posts.into_iter().map(PostRecord::try_from).collect()
    }

    pub async fn count_posts(&self, collection: &str) -> anyhow::Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts WHERE collection = ?")
            .bind(collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn create_test_db() -> Database {
        let db = Database::new("sqlite::memory:").await.unwrap();
        db.initialize().await.unwrap();
        db
    }

    fn create_post(slug: &str, title: &str, day: u32) -> PostRecord {
        PostRecord {
            slug: slug.to_string(),
            title: title.to_string(),
            description: format!("About {}", title),
            publish_date: Utc.with_ymd_and_hms(2024, 1, day, 9, 30, 0).unwrap(),
        }
    }

    mod initialization_tests {
        use super::*;

        #[tokio::test]
        async fn test_database_creation() {
            let db = Database::new("sqlite::memory:").await;
            assert!(db.is_ok());
        }

        #[tokio::test]
        async fn test_database_initialization() {
            let db = create_test_db().await;
            let posts = db.get_collection("blog").await.unwrap();
            assert!(posts.is_empty());
        }

        #[tokio::test]
        async fn test_double_initialization_is_safe() {
            let db = create_test_db().await;
            let result = db.initialize().await;
            assert!(result.is_ok());
        }
    }

    mod sync_collection_tests {
        use super::*;

        #[tokio::test]
        async fn test_sync_inserts_posts() {
            let db = create_test_db().await;
            let posts = vec![create_post("hello-world", "Hello", 1)];

            db.sync_collection("blog", &posts).await.unwrap();

            let stored = db.get_collection("blog").await.unwrap();
            assert_eq!(stored, posts);
        }

        #[tokio::test]
        async fn test_sync_updates_existing_post() {
            let db = create_test_db().await;
            db.sync_collection("blog", &[create_post("post", "Original", 1)])
                .await
                .unwrap();

            db.sync_collection("blog", &[create_post("post", "Updated", 2)])
                .await
                .unwrap();

            let stored = db.get_collection("blog").await.unwrap();
            assert_eq!(stored.len(), 1);
            assert_eq!(stored[0].title, "Updated");
            assert_eq!(
                stored[0].publish_date,
                Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap()
            );
        }

        #[tokio::test]
        async fn test_sync_removes_deleted_posts() {
            let db = create_test_db().await;
            db.sync_collection(
                "blog",
                &[create_post("keep", "Keep", 1), create_post("gone", "Gone", 2)],
            )
            .await
            .unwrap();

            db.sync_collection("blog", &[create_post("keep", "Keep", 1)])
                .await
                .unwrap();

            let stored = db.get_collection("blog").await.unwrap();
            assert_eq!(stored.len(), 1);
            assert_eq!(stored[0].slug, "keep");
        }

        #[tokio::test]
        async fn test_sync_empty_clears_collection() {
            let db = create_test_db().await;
            db.sync_collection("blog", &[create_post("a", "A", 1)])
                .await
                .unwrap();

            db.sync_collection("blog", &[]).await.unwrap();

            assert_eq!(db.count_posts("blog").await.unwrap(), 0);
        }

        #[tokio::test]
        async fn test_collections_are_isolated() {
            let db = create_test_db().await;
            db.sync_collection("blog", &[create_post("same", "Blog post", 1)])
                .await
                .unwrap();
            db.sync_collection("notes", &[create_post("same", "Note", 2)])
                .await
                .unwrap();

            // Syncing one collection must not touch the other.
            db.sync_collection("notes", &[]).await.unwrap();

            let blog = db.get_collection("blog").await.unwrap();
            assert_eq!(blog.len(), 1);
            assert_eq!(blog[0].title, "Blog post");
            assert!(db.get_collection("notes").await.unwrap().is_empty());
        }
    }

    mod get_collection_tests {
        use super::*;

        #[tokio::test]
        async fn test_ordered_by_slug() {
            let db = create_test_db().await;
            db.sync_collection(
                "blog",
                &[
                    create_post("charlie", "C", 1),
                    create_post("alpha", "A", 3),
                    create_post("bravo", "B", 2),
                ],
            )
            .await
            .unwrap();

            let slugs: Vec<_> = db
                .get_collection("blog")
                .await
                .unwrap()
                .into_iter()
                .map(|p| p.slug)
                .collect();
            assert_eq!(slugs, vec!["alpha", "bravo", "charlie"]);
        }

        #[tokio::test]
        async fn test_unknown_collection_is_empty() {
            let db = create_test_db().await;
            let posts = db.get_collection("does-not-exist").await.unwrap();
            assert!(posts.is_empty());
        }

        #[tokio::test]
        async fn test_corrupt_date_is_an_error() {
            let db = create_test_db().await;
            sqlx::query(
                "INSERT INTO posts (collection, slug, title, description, publish_date) VALUES ('blog', 'x', 'X', 'X', 'yesterday')",
            )
            .execute(&db.pool)
            .await
            .unwrap();

            assert!(db.get_collection("blog").await.is_err());
        }

        #[tokio::test]
        async fn test_count_posts() {
            let db = create_test_db().await;
            let posts: Vec<_> = (1..=7)
                .map(|i| create_post(&format!("post-{}", i), "Post", i))
                .collect();
            db.sync_collection("blog", &posts).await.unwrap();

            assert_eq!(db.count_posts("blog").await.unwrap(), 7);
            assert_eq!(db.count_posts("other").await.unwrap(), 0);
        }
    }
}
