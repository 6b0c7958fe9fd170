//! Hot reload of the gateway's TOML file.
//!
//! The parent directory is watched rather than the file itself, so editors
//! that save by rename are picked up. Only configs that parse, validate and
//! differ from the last published one are sent on.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::ResilienceConfig;

pub struct ConfigWatcher {
    reloader: Reloader,
    updates: mpsc::UnboundedSender<ResilienceConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the stream of accepted configs.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ResilienceConfig>) {
        let (updates, rx) = mpsc::unbounded_channel();
        let watcher = Self {
            reloader: Reloader::new(path.to_path_buf()),
            updates,
        };
        (watcher, rx)
    }

    /// Start the notify watcher. Dropping the returned handle stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self {
            mut reloader,
            updates,
        } = self;
        let dir = reloader
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let file = reloader.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if touches(&event, &reloader.path) => {
                    if let Some(config) = reloader.reload() {
                        let _ = updates.send(config);
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(file = %file.display(), "Watching gateway config");
        Ok(watcher)
    }
}

fn touches(event: &Event, path: &Path) -> bool {
    (event.kind.is_modify() || event.kind.is_create())
        && event.paths.iter().any(|p| p.file_name() == path.file_name())
}

/// Re-reads the file and decides whether the result is worth publishing.
struct Reloader {
    path: PathBuf,
    last: Option<ResilienceConfig>,
}

impl Reloader {
    fn new(path: PathBuf) -> Self {
        let last = load_config(&path).ok();
        Self { path, last }
    }

    fn reload(&mut self) -> Option<ResilienceConfig> {
        let config = match load_config(&self.path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(file = %self.path.display(), error = %e, "Rejected config edit, gateway keeps running on the previous one");
                return None;
            }
        };
        if self.last.as_ref() == Some(&config) {
            tracing::debug!(file = %self.path.display(), "Config touched but unchanged");
            return None;
        }
        tracing::info!(file = %self.path.display(), "Accepted config edit");
        self.last = Some(config.clone());
        Some(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("gateway-watch-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn unchanged_file_is_not_republished() {
        let path = temp_config("[cache]\ngeneration = \"g1\"\n");
        let mut reloader = Reloader::new(path.clone());
        assert!(reloader.reload().is_none());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn edited_file_is_published_once() {
        let path = temp_config("[cache]\ngeneration = \"g1\"\n");
        let mut reloader = Reloader::new(path.clone());

        std::fs::write(&path, "[cache]\ngeneration = \"g2\"\n").unwrap();
        let config = reloader.reload().expect("edit should publish");
        assert_eq!(config.cache.generation, "g2");
        assert!(reloader.reload().is_none());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn broken_edit_keeps_previous() {
        let path = temp_config("[cache]\ngeneration = \"g1\"\n");
        let mut reloader = Reloader::new(path.clone());

        std::fs::write(&path, "[cache\ngeneration = ").unwrap();
        assert!(reloader.reload().is_none());
        assert_eq!(reloader.last.as_ref().map(|c| c.cache.generation.as_str()), Some("g1"));
        let _ = std::fs::remove_file(&path);
    }
}
