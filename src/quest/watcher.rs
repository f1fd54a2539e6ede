//! Quest Hot Reload
//!
//! Watches the quest directory and signals when definitions change. The
//! reload itself happens on the receiving side, under the quest book lock.

use std::path::PathBuf;
use std::time::Duration;

use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{error, info};

/// A quest file was created, modified or removed. The reload works out which.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotReloadEvent {
    pub path: PathBuf,
}

/// Translate a filesystem event into reload signals for quest files
pub fn reload_events(event: &notify::Event) -> Vec<HotReloadEvent> {
    match event.kind {
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_) => event
            .paths
            .iter()
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("toml"))
            .map(|path| HotReloadEvent { path: path.clone() })
            .collect(),
        _ => Vec::new(),
    }
}

/// Start a file watcher on the quest directory.
/// Returns a channel receiver that signals when quest files change.
pub fn start_file_watcher(quests_dir: PathBuf) -> mpsc::Receiver<HotReloadEvent> {
    let (tx, rx) = mpsc::channel(32);

    // notify is sync; the watcher lives on its own thread
    std::thread::spawn(move || {
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();

        let mut watcher = match RecommendedWatcher::new(
            move |res: Result<notify::Event, notify::Error>| {
                if let Ok(event) = res {
                    let _ = notify_tx.send(event);
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(1)),
        ) {
            Ok(w) => w,
            Err(e) => {
                error!("Failed to create file watcher: {}", e);
                return;
            }
        };

        if let Err(e) = watcher.watch(&quests_dir, RecursiveMode::Recursive) {
            error!("Failed to watch quest directory {:?}: {}", quests_dir, e);
            return;
        }

        info!("Quest hot-reload watcher started for {:?}", quests_dir);

        while let Ok(event) = notify_rx.recv() {
            for signal in reload_events(&event) {
                info!("Detected change in {:?}, triggering reload", signal.path);
                if tx.blocking_send(signal).is_err() {
                    // Receiver dropped, stop watching
                    return;
                }
            }
        }
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};

    fn signal(path: &str) -> HotReloadEvent {
        HotReloadEvent {
            path: PathBuf::from(path),
        }
    }

    fn event(kind: EventKind, paths: &[&str]) -> notify::Event {
        let mut event = notify::Event::new(kind);
        for path in paths {
            event = event.add_path(PathBuf::from(path));
        }
        event
    }

    #[test]
    fn test_only_toml_files_signal() {
        let signals = reload_events(&event(
            EventKind::Modify(ModifyKind::Any),
            &["quests/a.toml", "quests/a.toml.swp", "quests/notes.md"],
        ));
        assert_eq!(signals, vec![signal("quests/a.toml")]);
    }

    #[test]
    fn test_event_kinds() {
        let created = reload_events(&event(EventKind::Create(CreateKind::File), &["b.toml"]));
        assert_eq!(created, vec![signal("b.toml")]);

        let removed = reload_events(&event(EventKind::Remove(RemoveKind::File), &["b.toml"]));
        assert_eq!(removed, vec![signal("b.toml")]);

        assert!(reload_events(&event(EventKind::Any, &["b.toml"])).is_empty());
    }

    #[tokio::test]
    async fn test_watcher_signals_change() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let mut rx = start_file_watcher(temp_dir.path().to_path_buf());

        // Give the watcher thread time to register
        tokio::time::sleep(Duration::from_millis(200)).await;
        std::fs::write(temp_dir.path().join("new.toml"), "[quest]\n").unwrap();

        let received = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .ok()
            .flatten();
        let name = received.as_ref().and_then(|s| s.path.file_name());
        assert_eq!(name, Some(std::ffi::OsStr::new("new.toml")));
    }
}
