use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::content;
use crate::db::Database;

/// Keeps the database in step with the collections on disk.
///
/// Every subdirectory of the content root is one collection, named after
/// the directory.
pub struct Loader {
    content_dir: PathBuf,
    db: Arc<Database>,
    reloading: Arc<RwLock<bool>>,
}

impl Loader {
    pub fn new(content_dir: impl Into<PathBuf>, db: Arc<Database>) -> Self {
        Self {
            content_dir: content_dir.into(),
            db,
            reloading: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn is_reloading(&self) -> bool {
        *self.reloading.read().await
    }

    pub async fn reload_all(&self) -> anyhow::Result<()> {
        {
            let mut reloading = self.reloading.write().await;
            if *reloading {
                info!("Reload already in progress, skipping");
                return Ok(());
            }
            *reloading = true;
        }

        let result = self.do_reload_all().await;

        {
            let mut reloading = self.reloading.write().await;
            *reloading = false;
        }

        result
    }

    async fn do_reload_all(&self) -> anyhow::Result<()> {
        let collections = self.collection_dirs()?;
        info!(
            "Reloading {} collections from {}",
            collections.len(),
            self.content_dir.display()
        );

        for (name, dir) in collections {
            if let Err(e) = self.reload_collection(&name, &dir).await {
                error!("Failed to reload collection '{}': {}", name, e);
            }
        }

        info!("Content reload complete");
        Ok(())
    }

    async fn reload_collection(&self, name: &str, dir: &Path) -> anyhow::Result<()> {
        let posts = content::load_collection(dir)?;
        self.db.sync_collection(name, &posts).await?;
        info!("Synced {} posts into collection '{}'", posts.len(), name);
        Ok(())
    }

    fn collection_dirs(&self) -> anyhow::Result<Vec<(String, PathBuf)>> {
        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(&self.content_dir)? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => dirs.push((name.to_string(), path.clone())),
                None => warn!("Skipping non UTF-8 collection directory {}", path.display()),
            }
        }
        dirs.sort();
        Ok(dirs)
    }
}

fn reload_interval(minutes: u64) -> Duration {
    Duration::from_secs(minutes.saturating_mul(60))
}

pub async fn start_background_reload(loader: Arc<Loader>, interval_minutes: u64) {
    if interval_minutes == 0 {
        return;
    }
    let interval = reload_interval(interval_minutes);

    loop {
        tokio::time::sleep(interval).await;
        info!("Starting scheduled content reload");
        if let Err(e) = loader.reload_all().await {
            error!("Scheduled content reload failed: {}", e);
        }
    }
}
