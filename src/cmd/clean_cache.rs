use crate::cache::CacheStore;
use crate::config::{default_cache_dir, GeneratorConfig};
use anyhow::Context;
use std::path::PathBuf;
use tracing::info;

pub fn run(cache_dir: Option<PathBuf>, config: Option<PathBuf>) -> anyhow::Result<()> {
    let dir = match (cache_dir, config) {
        (Some(dir), _) => dir,
        (None, Some(path)) => match GeneratorConfig::load(&path)?.cache_dir {
            Some(dir) => dir,
            None => default_cache_dir()?,
        },
        (None, None) => default_cache_dir()?,
    };

    if !dir.is_dir() {
        eprintln!("No cache directory at {}", dir.display());
        return Ok(());
    }

    let store = CacheStore::with_dir(dir.clone())?;
    let removed = store
        .purge_all()
        .with_context(|| format!("Failed to clean cache directory {}", dir.display()))?;

    info!("Removed {} cache stores from {}", removed, dir.display());
    eprintln!("✓ Removed {} cache file(s) from {}", removed, dir.display());
    Ok(())
}
