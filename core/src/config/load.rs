use std::path::{Path, PathBuf};

use super::types::AppConfig;

/// Get the default windup data directory: ~/.windup
pub fn get_windup_data_dir() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".windup"))
}

/// Expands `~` and `$VAR` references in a user supplied path.
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(raw),
    }
}

pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)?;
    let mut cfg = toml::from_str::<AppConfig>(&s)?;
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.windup/config.toml (highest)
    let windup_dir = get_windup_data_dir()?;
    let windup_config = windup_dir.join("config.toml");

    // Priority 2: ./windup.toml (current directory)
    let local_config = Path::new("windup.toml");

    let mut cfg: AppConfig = if windup_config.exists() {
        let s = std::fs::read_to_string(&windup_config)?;
        toml::from_str::<AppConfig>(&s)?
    } else if local_config.exists() {
        let s = std::fs::read_to_string(local_config)?;
        toml::from_str::<AppConfig>(&s)?
    } else {
        AppConfig::default()
    };

    if cfg
        .store
        .data_dir
        .as_deref()
        .map(|s| s.trim().is_empty())
        .unwrap_or(true)
    {
        cfg.store.data_dir = Some(windup_dir.to_string_lossy().to_string());
    }

    if cfg
        .logging
        .directory
        .as_deref()
        .map(|s| s.trim().is_empty())
        .unwrap_or(true)
    {
        cfg.logging.directory = Some(windup_dir.join("logs").to_string_lossy().to_string());
    }

    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

// Environment variables outrank every file.
fn apply_env_overrides(cfg: &mut AppConfig) {
    if let Ok(v) = std::env::var("WINDUP_HOME") {
        if !v.trim().is_empty() {
            cfg.runner.kantra_home = v;
        }
    }
    if let Ok(v) = std::env::var("WINDUP_DATA_DIR") {
        if !v.trim().is_empty() {
            cfg.store.data_dir = Some(v);
        }
    }
    if let Some(dir) = cfg.store.data_dir.as_deref() {
        cfg.store.data_dir = Some(expand_path(dir).to_string_lossy().to_string());
    }
    cfg.runner.kantra_home = if cfg.runner.kantra_home.trim().is_empty() {
        String::new()
    } else {
        expand_path(&cfg.runner.kantra_home)
            .to_string_lossy()
            .to_string()
    };
}
