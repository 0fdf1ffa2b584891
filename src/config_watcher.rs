//! File-system watcher for the limit configuration file.
//!
//! [`ConfigWatcher`] uses the `notify` crate and forwards every event that
//! touches the configuration file as a [`ChangeNotification`] over an
//! unbounded tokio channel. Event kinds are not inspected: debouncing in the
//! [`scheduler`](crate::scheduler) absorbs the bursts editors produce.
//!
//! The `notify` callback runs on the watcher's own thread, so the only thing
//! it does is a non-blocking send.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::scheduler::ChangeNotification;
use crate::{AppError, Result};

/// Returns `true` if `event` concerns a file named `file_name`.
fn touches_config(event: &Event, file_name: &OsString) -> bool {
    event
        .paths
        .iter()
        .any(|p| p.file_name().is_some_and(|name| name == file_name))
}

/// Keeps the OS watch alive; dropping it stops notifications and closes the
/// channel returned by [`ConfigWatcher::new`].
#[derive(Debug)]
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    path: PathBuf,
}

impl ConfigWatcher {
    /// Start watching `config_path`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Watch` if the path has no file name or the
    /// `notify` watcher cannot be created or attached.
    pub fn new(
        config_path: &Path,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ChangeNotification>)> {
        let file_name = config_path
            .file_name()
            .map(OsString::from)
            .ok_or_else(|| {
                AppError::Watch(format!(
                    "config path '{}' does not name a file",
                    config_path.display()
                ))
            })?;

        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(
            move |result: std::result::Result<Event, notify::Error>| match result {
                Ok(event) if touches_config(&event, &file_name) => {
                    debug!(kind = ?event.kind, "config file event");
                    if tx.send(ChangeNotification).is_err() {
                        debug!("scheduler gone, dropping config change");
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(%err, "config file watcher error");
                }
            },
        )
        .map_err(|err| AppError::Watch(format!("failed to create config file watcher: {err}")))?;

        // Watch the directory so that editors saving via write-to-temp and
        // rename are still seen. A bare file name has an empty parent.
        let watch_target = config_path
            .parent()
            .filter(|p| p != &Path::new(""))
            .unwrap_or(config_path);

        watcher
            .watch(watch_target, RecursiveMode::NonRecursive)
            .map_err(|err| {
                AppError::Watch(format!(
                    "failed to watch '{}': {err}",
                    watch_target.display()
                ))
            })?;

        info!(path = %config_path.display(), "watching configuration file");

        Ok((
            Self {
                _watcher: watcher,
                path: config_path.to_path_buf(),
            },
            rx,
        ))
    }

    /// The watched configuration file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
