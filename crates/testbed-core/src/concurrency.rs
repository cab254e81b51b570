use crate::CoreError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Advisory lock held while a command mutates one configuration file.
pub struct ConfigLock {
    lock_file: File,
}

impl ConfigLock {
    /// `<config>.lock` next to the configuration file.
    pub fn path_for(config_path: &Path) -> PathBuf {
        let mut name = config_path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    fn open(lock_path: &Path) -> Result<File, CoreError> {
        if let Some(parent) = lock_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        Ok(OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(lock_path)?)
    }

    pub fn try_acquire(lock_path: &Path) -> Result<Option<Self>, CoreError> {
        let file = Self::open(lock_path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { lock_file: file })),
            Err(_) => Ok(None),
        }
    }

    /// Lock for `config_path`, failing instead of waiting if another process holds it.
    pub fn for_config(config_path: &Path) -> Result<Self, CoreError> {
        let lock_path = Self::path_for(config_path);
        Self::try_acquire(&lock_path)?.ok_or_else(|| CoreError::Locked(config_path.to_path_buf()))
    }
}

impl Drop for ConfigLock {
    fn drop(&mut self) {
        let _ = self.lock_file.unlock();
    }
}

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Route SIGINT/SIGTERM into a cancellation token.
///
/// The first signal cancels the returned token so in-flight work can stop at
/// its next wait point; a second signal exits immediately.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let handler_token = token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        if SHUTDOWN_REQUESTED.swap(true, Ordering::SeqCst) {
            std::process::exit(130);
        }
        handler_token.cancel();
        eprintln!("\nshutdown requested, stopping after the current step...");
    }) {
        warn!("failed to install signal handler: {e}");
    }
    token
}
