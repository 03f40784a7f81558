//! Cache management commands.

use std::sync::Arc;

use tokio::runtime::Runtime;

use artwork_minder::cache::CacheStore;
use artwork_minder::config;
use artwork_minder::engine::ArtworkManager;
use artwork_minder::sources::NetworkState;

use super::format_bytes;

/// Delete every cached image
pub fn cmd_cache_clear(rt: &Runtime) -> anyhow::Result<()> {
    let config = config::load();
    let dir = config.cache.disk_dir();

    let cleared = rt.block_on(async {
        let manager = ArtworkManager::from_config(&config, Arc::new(NetworkState::OFFLINE))?;
        anyhow::Ok(manager.clear_all_caches().await)
    })?;

    if !cleared {
        anyhow::bail!("Failed to clear artwork cache at {}", dir.display());
    }
    println!("✓ Cleared artwork cache at {}", dir.display());
    Ok(())
}

/// Show disk cache location and size
pub fn cmd_cache_size() -> anyhow::Result<()> {
    let config = config::load();
    let store = CacheStore::from_config(&config.cache);

    println!("Location: {}", config.cache.disk_dir().display());
    println!("Size:     {}", format_bytes(store.disk_size_bytes()));
    if config.cache.disk_max_bytes > 0 {
        println!("Limit:    {}", format_bytes(config.cache.disk_max_bytes));
    } else {
        println!("Limit:    none");
    }
    Ok(())
}
