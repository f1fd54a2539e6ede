//! Progress Documents
//!
//! Reads and writes a task's progress as
//! `{ "completeUsers": [uuid, ..], "userProgress": [{ "uuid", "value" }, ..] }`.
//! Loading can either replace the store or merge into it; malformed entries are
//! skipped with a warning.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

use super::progress::{PlayerId, ProgressStore};

pub const COMPLETE_USERS: &str = "completeUsers";
pub const USER_PROGRESS: &str = "userProgress";

#[derive(Serialize)]
struct ProgressEntryRef<'a, P> {
    uuid: String,
    value: &'a P,
}

#[derive(Deserialize)]
struct RawProgressEntry<P> {
    uuid: String,
    value: P,
}

/// What a document load did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadSummary {
    pub completed: usize,
    pub progress: usize,
    pub skipped: usize,
}

impl std::ops::AddAssign for ReadSummary {
    fn add_assign(&mut self, other: Self) {
        self.completed += other.completed;
        self.progress += other.progress;
        self.skipped += other.skipped;
    }
}

impl<P> ProgressStore<P>
where
    P: Clone + Default + Serialize + DeserializeOwned,
{
    /// Serialise completion and progress. With `players`, only those players'
    /// entries are written; otherwise everything is.
    pub fn write_document(&self, players: Option<&[PlayerId]>) -> Value {
        let mut complete = Vec::new();
        let mut progress = Vec::new();

        match players {
            Some(players) => {
                for &player in players {
                    if self.is_complete(player) {
                        complete.push(Value::String(player.to_string()));
                    }
                    if let Some(value) = self.get(player) {
                        push_entry(&mut progress, player, value);
                    }
                }
            }
            None => {
                complete.extend(self.completed().map(|p| Value::String(p.to_string())));
                for (&player, value) in self.entries() {
                    push_entry(&mut progress, player, value);
                }
            }
        }

        let mut doc = Map::new();
        doc.insert(COMPLETE_USERS.to_string(), Value::Array(complete));
        doc.insert(USER_PROGRESS.to_string(), Value::Array(progress));
        Value::Object(doc)
    }

    /// Load a document. Without `merge` the store is cleared first. Either way,
    /// loaded completion is unioned in and loaded progress overwrites per player.
    pub fn read_document(&mut self, doc: &Value, merge: bool) -> ReadSummary {
        if !merge {
            self.reset(None);
        }

        let mut summary = ReadSummary::default();

        for item in list(doc, COMPLETE_USERS) {
            match item.as_str().map(Uuid::parse_str) {
                Some(Ok(player)) => {
                    self.set_complete(player);
                    summary.completed += 1;
                }
                _ => {
                    warn!("Unable to load UUID for task: {}", item);
                    summary.skipped += 1;
                }
            }
        }

        for item in list(doc, USER_PROGRESS) {
            let entry = match RawProgressEntry::<P>::deserialize(item) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Unable to load user progress for task: {}", e);
                    summary.skipped += 1;
                    continue;
                }
            };

            match Uuid::parse_str(&entry.uuid) {
                Ok(player) => {
                    self.set_progress(player, entry.value);
                    summary.progress += 1;
                }
                Err(e) => {
                    warn!("Unable to load user progress for '{}': {}", entry.uuid, e);
                    summary.skipped += 1;
                }
            }
        }

        summary
    }
}

fn push_entry<P: Serialize>(out: &mut Vec<Value>, player: PlayerId, value: &P) {
    let entry = ProgressEntryRef {
        uuid: player.to_string(),
        value,
    };
    match serde_json::to_value(&entry) {
        Ok(v) => out.push(v),
        Err(e) => warn!("Unable to write progress for {}: {}", player, e),
    }
}

fn list<'a>(doc: &'a Value, key: &str) -> &'a [Value] {
    match doc.get(key) {
        Some(Value::Array(items)) => items.as_slice(),
        Some(other) => {
            warn!("Expected '{}' to be a list, found {}", key, other);
            &[]
        }
        None => &[],
    }
}
