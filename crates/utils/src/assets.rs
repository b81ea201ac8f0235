use std::path::PathBuf;

use directories::ProjectDirs;

const PROJECT_ROOT: &str = env!("CARGO_MANIFEST_DIR");
pub const ASSET_DIR_ENV: &str = "KANBAN_ASSET_DIR";

/// Resolves the directory holding the database file and `config.json`.
///
/// `KANBAN_ASSET_DIR` wins when set and non-empty. Debug builds otherwise use
/// `dev_assets/` at the workspace root so local runs never touch user data.
pub fn asset_dir() -> PathBuf {
    if let Ok(override_dir) = std::env::var(ASSET_DIR_ENV) {
        let override_dir = override_dir.trim();
        if !override_dir.is_empty() {
            return PathBuf::from(override_dir);
        }
    }

    if cfg!(debug_assertions) {
        return PathBuf::from(PROJECT_ROOT).join("../../dev_assets");
    }

    match ProjectDirs::from("dev", "kanban", "kanban-board") {
        Some(dirs) => dirs.data_dir().to_path_buf(),
        None => {
            tracing::warn!("No home directory available; storing assets in the temp dir");
            std::env::temp_dir().join("kanban-board")
        }
    }
    // macOS → ~/Library/Application Support/dev.kanban.kanban-board
    // Linux → ~/.local/share/kanban-board (respects XDG_DATA_HOME)
}

/// Same as [`asset_dir`], creating the directory when missing.
pub fn ensure_asset_dir() -> std::io::Result<PathBuf> {
    let path = asset_dir();
    if !path.exists() {
        std::fs::create_dir_all(&path)?;
    }
    Ok(path)
}

pub fn config_path() -> PathBuf {
    asset_dir().join("config.json")
}
