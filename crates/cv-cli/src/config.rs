use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub const APP_QUALIFIER: &str = "com";
pub const APP_ORG: &str = "darklock";
pub const APP_NAME: &str = "credential-vault";

pub const DB_FILE: &str = "vault.db";
pub const ENV_VAULT_KEY: &str = "CV_VAULT_KEY";
pub const DEFAULT_LOG_FILTER: &str = "cv_cli=info,cv_service=info,cv_store=info";

pub fn data_dir() -> anyhow::Result<PathBuf> {
    let dirs = ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .ok_or_else(|| anyhow::anyhow!("cannot determine data directory"))?;
    Ok(dirs.data_dir().to_path_buf())
}

/// `--db` / `CV_DB_PATH` when given, otherwise `<data dir>/vault.db`.
pub fn db_path(override_path: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    match override_path {
        Some(path) => Ok(path),
        None => Ok(data_dir()?.join(DB_FILE)),
    }
}

pub fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let path = PathBuf::from("/tmp/somewhere/v.db");
        assert_eq!(db_path(Some(path.clone())).unwrap(), path);
    }

    #[test]
    fn ensure_parent_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/vault.db");
        ensure_parent(&path).unwrap();
        assert!(dir.path().join("a/b").is_dir());
        ensure_parent(Path::new("vault.db")).unwrap();
    }
}
