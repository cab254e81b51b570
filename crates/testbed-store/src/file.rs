use crate::{fsync_dir, StoreError};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use testbed_schema::Config;
use tracing::{debug, info};

/// Read a configuration file.
///
/// No defaults and no validation are applied: a previously finalized file
/// comes back exactly as it was written. `config-path` is replaced with the
/// absolute form of `path`.
pub fn load(path: &Path) -> Result<Config, StoreError> {
    let content = fs::read_to_string(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut cfg: Config = serde_yaml::from_str(&content).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let abs = std::path::absolute(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    cfg.config_path = abs.to_string_lossy().into_owned();
    debug!("loaded {} ({} instances)", abs.display(), cfg.instances.len());
    Ok(cfg)
}

/// Stamp `updated-at` and write the configuration to its `config-path`.
///
/// The write goes through a temp file in the same directory and a rename, so
/// readers never observe a half-written file. The result is mode 0600.
pub fn sync(cfg: &mut Config) -> Result<PathBuf, StoreError> {
    if cfg.config_path.is_empty() {
        return Err(StoreError::NoPath);
    }
    let dest = std::path::absolute(&cfg.config_path).map_err(|source| StoreError::Write {
        path: PathBuf::from(&cfg.config_path),
        source,
    })?;
    cfg.config_path = dest.to_string_lossy().into_owned();
    cfg.updated_at = Some(chrono::Utc::now());

    let content = serde_yaml::to_string(&*cfg)?;
    let write_err = |source| StoreError::Write {
        path: dest.clone(),
        source,
    };

    let dir = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(write_err)?;

    let mut tmp = NamedTempFile::new_in(&dir).map_err(write_err)?;
    tmp.write_all(content.as_bytes()).map_err(write_err)?;
    restrict_permissions(tmp.path()).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(&dest).map_err(|e| write_err(e.error))?;
    fsync_dir(&dir).map_err(write_err)?;

    info!("saved configuration to {}", dest.display());
    Ok(dest)
}

/// `<dir>/<stem>.backup.yaml` next to the configuration file.
pub fn backup_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map_or_else(|| "config".into(), |s| s.to_string_lossy());
    path.with_file_name(format!("{stem}.backup.yaml"))
}

/// Copy the on-disk configuration aside before it is rewritten.
///
/// Only the first call creates a backup; later calls leave the existing one
/// alone. Returns the backup path when one was written.
pub fn backup(cfg: &Config) -> Result<Option<PathBuf>, StoreError> {
    if cfg.config_path.is_empty() {
        return Ok(None);
    }
    let src = Path::new(&cfg.config_path);
    if !src.exists() {
        return Ok(None);
    }
    let dest = backup_path(src);
    if dest.exists() {
        debug!("backup {} already present", dest.display());
        return Ok(None);
    }

    fs::copy(src, &dest).map_err(|source| StoreError::Write {
        path: dest.clone(),
        source,
    })?;
    restrict_permissions(&dest).map_err(|source| StoreError::Write {
        path: dest.clone(),
        source,
    })?;
    info!("backed up {} to {}", src.display(), dest.display());
    Ok(Some(dest))
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
