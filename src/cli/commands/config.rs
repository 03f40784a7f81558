//! Config file commands.

use artwork_minder::config;

/// Print the config file path
pub fn cmd_config_path() -> anyhow::Result<()> {
    let path = config::config_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    println!("{}", path.display());
    Ok(())
}

/// Set one value and save the config file
pub fn cmd_config_set(key: &str, value: &str) -> anyhow::Result<()> {
    let mut config = config::load();
    config.set(key, value)?;
    let path = config::save(&config)?;
    println!("✓ Set {} in {}", key, path.display());
    Ok(())
}

/// Print the effective configuration as TOML
pub fn cmd_config_show() -> anyhow::Result<()> {
    let mut config = config::load();
    // Never echo secrets
    if config.credentials.lastfm_api_key.is_some() {
        config.credentials.lastfm_api_key = Some("<set>".to_string());
    }
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
