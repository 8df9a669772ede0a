use std::path::PathBuf;

use directories::ProjectDirs;

/// Directory holding runtime assets (the SQLite database lives here).
pub fn asset_dir() -> PathBuf {
    let dir = ProjectDirs::from("dev", "taskdesk", "taskdesk")
        .expect("OS didn't give us a home directory")
        .data_dir()
        .to_path_buf();
    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::error!("Failed to create asset dir {:?}: {}", dir, e);
    }
    dir
}
