//! Quest Book
//!
//! Loads quest definitions from TOML files and owns every task instance along
//! with its per-player progress. The book itself is not synchronised; callers
//! hold it behind a single lock.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::cache::QuestCache;
use super::definition::{Quest, QuestView, RawQuestFile};
use crate::catalog::Catalog;
use crate::error::TaskError;
use crate::task::{PlayerId, ReadSummary, TaskContext, TaskEvent, TaskEventResult};

pub struct QuestBook {
    quests: BTreeMap<String, Quest>,
    /// Quest id loaded from each file
    sources: BTreeMap<PathBuf, String>,
    /// Base directory for quest files
    quests_dir: PathBuf,
}

/// Outcome of [`QuestBook::reload`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadSummary {
    pub loaded: usize,
    /// Quests whose definition is gone; their stored progress is stale
    pub removed: Vec<String>,
}

struct Definitions {
    quests: BTreeMap<String, Quest>,
    sources: BTreeMap<PathBuf, String>,
    /// Files that exist but failed to load
    failed: Vec<PathBuf>,
}

impl QuestBook {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            quests: BTreeMap::new(),
            sources: BTreeMap::new(),
            quests_dir: data_dir.join("quests"),
        }
    }

    pub fn quests_dir(&self) -> &Path {
        &self.quests_dir
    }

    /// Load all quest definitions, replacing anything already loaded
    pub fn load_all(&mut self) -> Result<usize, TaskError> {
        let definitions = self.read_definitions()?;
        let count = definitions.quests.len();
        self.quests = definitions.quests;
        self.sources = definitions.sources;
        info!("Loaded {} quest definitions", count);
        Ok(count)
    }

    /// Re-read definitions while keeping progress. A task keeps its progress
    /// when the same quest still has a task of the same kind at its index.
    /// A file or task table that fails to load keeps its previous definition
    /// and progress until it loads again.
    pub fn reload(&mut self) -> Result<ReloadSummary, TaskError> {
        let Definitions {
            mut quests,
            mut sources,
            failed,
        } = self.read_definitions()?;
        let mut previous = std::mem::take(&mut self.quests);

        for path in failed {
            let Some(quest_id) = self.sources.get(&path) else {
                continue;
            };
            if quests.contains_key(quest_id) {
                continue;
            }
            if let Some(quest) = previous.remove(quest_id) {
                warn!("Keeping previous definition of '{}' until {:?} loads", quest_id, path);
                sources.insert(path, quest_id.clone());
                quests.insert(quest_id.clone(), quest);
            }
        }

        for (quest_id, quest) in quests.iter_mut() {
            let Some(mut old) = previous.remove(quest_id) else {
                continue;
            };

            for index in &quest.skipped {
                if let Some(kept) = old.tasks.remove(index) {
                    warn!("Task {} of '{}' failed to load, keeping previous definition", index, quest_id);
                    quest.tasks.insert(*index, kept);
                }
            }

            for (index, task) in quest.tasks.iter_mut() {
                let Some(mut kept) = old.tasks.remove(index) else {
                    continue;
                };
                match kept.apply_config(task.config()) {
                    Ok(()) => *task = kept,
                    Err(e) => info!("Task {} of '{}' changed kind, progress dropped: {}", index, quest_id, e),
                }
            }
            for index in old.tasks.keys() {
                info!("Task {} of '{}' removed, progress dropped", index, quest_id);
            }
        }

        let removed: Vec<String> = previous.into_keys().collect();
        for quest_id in &removed {
            info!("Quest '{}' removed, progress dropped", quest_id);
        }

        self.quests = quests;
        self.sources = sources;
        info!("Reloaded {} quest definitions", self.quests.len());
        Ok(ReloadSummary {
            loaded: self.quests.len(),
            removed,
        })
    }

    fn read_definitions(&self) -> Result<Definitions, TaskError> {
        info!("Loading quests from {:?}", self.quests_dir);

        let mut definitions = Definitions {
            quests: BTreeMap::new(),
            sources: BTreeMap::new(),
            failed: Vec::new(),
        };
        if !self.quests_dir.exists() {
            warn!("Quest directory does not exist: {:?}", self.quests_dir);
            return Ok(definitions);
        }

        let mut paths = Vec::new();
        collect_toml_files(&self.quests_dir, &mut paths)?;
        paths.sort();

        for path in paths {
            match load_quest_file(&path) {
                Ok(quest) => {
                    if definitions.quests.contains_key(&quest.id) {
                        warn!("Duplicate quest id '{}' in {:?}, overwriting", quest.id, path);
                    }
                    debug!("Loaded quest: {} ({})", quest.name, quest.id);
                    definitions.sources.insert(path, quest.id.clone());
                    definitions.quests.insert(quest.id.clone(), quest);
                }
                Err(e) => {
                    warn!("Failed to load quest {:?}: {}", path, e);
                    definitions.failed.push(path);
                }
            }
        }

        Ok(definitions)
    }

    /// Add or replace a quest directly
    pub fn insert(&mut self, quest: Quest) {
        self.quests.insert(quest.id.clone(), quest);
    }

    pub fn get(&self, quest_id: &str) -> Option<&Quest> {
        self.quests.get(quest_id)
    }

    pub fn quest_ids(&self) -> Vec<String> {
        self.quests.keys().cloned().collect()
    }

    pub fn quests(&self) -> impl Iterator<Item = &Quest> {
        self.quests.values()
    }

    pub fn len(&self) -> usize {
        self.quests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quests.is_empty()
    }

    // ------------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------------

    /// Route an event to every task of every quest
    pub fn process_event(
        &mut self,
        event: &TaskEvent,
        catalog: &Catalog,
        cache: &mut dyn QuestCache,
    ) -> Vec<TaskEventResult> {
        let player = event.player_id();
        let mut results = Vec::new();

        for quest in self.quests.values_mut() {
            let id = quest.id.as_str();
            for (&index, task) in quest.tasks.iter_mut() {
                let mut ctx = TaskContext {
                    quest_id: id,
                    entities: &catalog.entities,
                    ores: &catalog.ores,
                    cache: &mut *cache,
                };
                if let Some(update) = task.handle_event(event, &mut ctx) {
                    if update.completed {
                        info!("Player {} completed task {} of '{}'", player, index, id);
                    }
                    results.push(TaskEventResult::new(id, index, player, update));
                }
            }
        }

        debug!("{} for {} produced {} updates", event.event_type(), player, results.len());
        results
    }

    /// Re-check every task's completion threshold for one player
    pub fn detect_player(
        &mut self,
        player: PlayerId,
        catalog: &Catalog,
        cache: &mut dyn QuestCache,
    ) -> Vec<TaskEventResult> {
        self.process_event(&TaskEvent::Tick { player_id: player }, catalog, cache)
    }

    /// Clear progress. `None` for the quest resets every quest; `None` for the
    /// player resets every player. Returns the number of tasks touched.
    pub fn reset(
        &mut self,
        quest_id: Option<&str>,
        player: Option<PlayerId>,
        cache: &mut dyn QuestCache,
    ) -> usize {
        let mut touched = 0;
        for quest in self.quests.values_mut() {
            if quest_id.is_some_and(|id| id != quest.id) {
                continue;
            }
            for task in quest.tasks.values_mut() {
                task.reset(player);
                touched += 1;
            }
            cache.mark_quest_dirty(&quest.id);
        }
        touched
    }

    // ------------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------------

    /// Progress of every task as `{ exportedAt, quests: { id: { index: doc } } }`
    pub fn export_progress(&self, players: Option<&[PlayerId]>) -> Value {
        let mut quests = Map::new();
        for quest in self.quests.values() {
            let tasks: Map<String, Value> = quest
                .tasks
                .iter()
                .map(|(index, task)| (index.to_string(), task.serialize_progress(players)))
                .collect();
            quests.insert(quest.id.clone(), Value::Object(tasks));
        }

        let mut doc = Map::new();
        doc.insert("exportedAt".to_string(), Value::String(chrono::Utc::now().to_rfc3339()));
        doc.insert("quests".to_string(), Value::Object(quests));
        Value::Object(doc)
    }

    /// Load a document written by [`QuestBook::export_progress`]. Unknown quests
    /// and tasks are skipped. Tasks absent from the document are left alone.
    pub fn import_progress(&mut self, doc: &Value, merge: bool, cache: &mut dyn QuestCache) -> ReadSummary {
        let mut summary = ReadSummary::default();

        let Some(quests) = doc.get("quests").and_then(Value::as_object) else {
            warn!("Progress document has no 'quests' table");
            return summary;
        };

        for (quest_id, tasks) in quests {
            let Some(quest) = self.quests.get_mut(quest_id) else {
                warn!("Skipping progress for unknown quest '{}'", quest_id);
                continue;
            };
            let Some(tasks) = tasks.as_object() else {
                warn!("Progress for quest '{}' is not a table", quest_id);
                continue;
            };

            for (index, task_doc) in tasks {
                let task = index.parse::<u32>().ok().and_then(|i| quest.tasks.get_mut(&i));
                match task {
                    Some(task) => summary += task.deserialize_progress(task_doc, merge),
                    None => warn!("Skipping progress for unknown task '{}' of '{}'", index, quest_id),
                }
            }
            cache.mark_quest_dirty(quest_id);
        }

        summary
    }

    /// Full documents (config plus progress) for each task of a quest
    pub fn task_documents(&self, quest_id: &str) -> Vec<(u32, Value)> {
        let Some(quest) = self.quests.get(quest_id) else {
            return Vec::new();
        };

        quest
            .tasks
            .iter()
            .filter_map(|(&index, task)| match task.to_document(None) {
                Ok(doc) => Some((index, doc)),
                Err(e) => {
                    warn!("Unable to write task {} of '{}': {}", index, quest_id, e);
                    None
                }
            })
            .collect()
    }

    /// Replace a task's progress from a stored document. The stored `type`,
    /// when present, must still match the task's kind.
    pub fn restore_task_document(&mut self, quest_id: &str, index: u32, doc: &Value) -> bool {
        let Some(task) = self.quests.get_mut(quest_id).and_then(|q| q.task_mut(index)) else {
            debug!("No task {} in quest '{}', stored progress ignored", index, quest_id);
            return false;
        };

        if let Some(kind) = doc.get("type").and_then(Value::as_str) {
            if kind != task.kind() {
                warn!(
                    "Stored progress for task {} of '{}' is for a {} task, now {}",
                    index,
                    quest_id,
                    kind,
                    task.kind()
                );
                return false;
            }
        }

        let summary = task.deserialize_progress(doc, false);
        if summary.skipped > 0 {
            warn!("Skipped {} malformed entries restoring '{}' task {}", summary.skipped, quest_id, index);
        }
        true
    }

    pub fn view(&self, quest_id: &str, player: PlayerId) -> Option<QuestView> {
        self.quests.get(quest_id).map(|quest| quest.view(player))
    }
}

/// Recursively collect `.toml` files under a directory
fn collect_toml_files(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<(), TaskError> {
    let entries = std::fs::read_dir(dir).map_err(|e| TaskError::io(dir, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| TaskError::io(dir, e))?;
        let path = entry.path();

        if path.is_dir() {
            collect_toml_files(&path, paths)?;
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            paths.push(path);
        }
    }

    Ok(())
}

fn load_quest_file(path: &Path) -> Result<Quest, TaskError> {
    let content = std::fs::read_to_string(path).map_err(|e| TaskError::io(path, e))?;
    let raw: RawQuestFile = toml::from_str(&content).map_err(|e| TaskError::parse(path, e))?;
    Quest::from_raw(&raw.quest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{EntityHierarchy, ItemStack, OreTable};
    use crate::quest::cache::DirtyQuests;
    use crate::task::{CraftSource, EntitySnapshot, Task};
    use serde_json::json;
    use tempfile::TempDir;
    use uuid::Uuid;

    const DEFENSE: &str = r#"
[quest]
id = "village_defense"
name = "Village Defense"

[[quest.tasks]]
type = "hunt"
target = "zombie"
required = 3

[[quest.tasks]]
type = "crafting"
requiredItems = [{ id = "torch", count = 4 }]
"#;

    fn catalog() -> Catalog {
        let mut entities = EntityHierarchy::new();
        entities.register("zombie", None);
        entities.register("husk", Some("zombie"));
        entities.register("villager", None);
        Catalog {
            entities,
            ores: OreTable::new(),
        }
    }

    fn book_with(files: &[(&str, &str)]) -> (TempDir, QuestBook) {
        let temp_dir = TempDir::new().unwrap();
        let quest_dir = temp_dir.path().join("quests");
        std::fs::create_dir_all(&quest_dir).unwrap();
        for (name, content) in files {
            std::fs::write(quest_dir.join(name), content).unwrap();
        }
        let mut book = QuestBook::new(temp_dir.path());
        book.load_all().unwrap();
        (temp_dir, book)
    }

    fn kill(player: PlayerId, entity: &str) -> TaskEvent {
        TaskEvent::EntityKilled {
            player_id: player,
            entity: EntitySnapshot::new(entity),
            damage_type: None,
        }
    }

    #[test]
    fn test_load_quests() {
        let (_dir, book) = book_with(&[("defense.toml", DEFENSE), ("broken.toml", "[quest")]);
        assert_eq!(book.len(), 1);

        let quest = book.get("village_defense").unwrap();
        let kinds: Vec<_> = quest.tasks.values().map(Task::kind).collect();
        assert_eq!(kinds, vec!["hunt", "crafting"]);
    }

    #[test]
    fn test_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let mut book = QuestBook::new(temp_dir.path());
        assert_eq!(book.load_all().unwrap(), 0);
        assert!(book.is_empty());
    }

    #[test]
    fn test_process_event() {
        let (_dir, mut book) = book_with(&[("defense.toml", DEFENSE)]);
        let catalog = catalog();
        let mut cache = DirtyQuests::new();
        let player = Uuid::new_v4();

        for _ in 0..2 {
            book.process_event(&kill(player, "husk"), &catalog, &mut cache);
        }
        let results = book.process_event(&kill(player, "zombie"), &catalog, &mut cache);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].quest_id, "village_defense");
        assert_eq!(results[0].task_index, 0);
        assert!(results[0].completed);
        assert!(cache.is_dirty("village_defense"));

        // Unrelated kind of event reaches only the crafting task
        let crafted = TaskEvent::ItemCrafted {
            player_id: player,
            source: CraftSource::Crafting,
            item: ItemStack::new("torch", 4),
        };
        let results = book.process_event(&crafted, &catalog, &mut cache);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].task_index, 1);
        assert!(book.get("village_defense").unwrap().is_complete(player));
    }

    #[test]
    fn test_detect_player() {
        let (_dir, mut book) = book_with(&[("defense.toml", DEFENSE)]);
        let player = Uuid::new_v4();

        book.import_progress(
            &json!({"quests": {"village_defense": {"0": {"userProgress": [{"uuid": player.to_string(), "value": 3}]}}}}),
            true,
            &mut DirtyQuests::new(),
        );

        let mut cache = DirtyQuests::new();
        let results = book.detect_player(player, &catalog(), &mut cache);
        assert_eq!(results.len(), 1);
        assert!(results[0].completed);
        assert!(cache.is_dirty("village_defense"));
    }

    #[test]
    fn test_reset() {
        let (_dir, mut book) = book_with(&[("defense.toml", DEFENSE)]);
        let catalog = catalog();
        let mut cache = DirtyQuests::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        book.process_event(&kill(alice, "zombie"), &catalog, &mut cache);
        book.process_event(&kill(bob, "zombie"), &catalog, &mut cache);

        book.reset(Some("village_defense"), Some(alice), &mut cache);
        let hunt = book.get("village_defense").and_then(|q| q.task(0)).unwrap();
        assert_eq!(hunt.progress(alice), 0);
        assert_eq!(hunt.progress(bob), 1);

        assert_eq!(book.reset(Some("unknown"), None, &mut cache), 0);
        assert_eq!(book.reset(None, None, &mut cache), 2);
        let hunt = book.get("village_defense").and_then(|q| q.task(0)).unwrap();
        assert_eq!(hunt.progress(bob), 0);
    }

    #[test]
    fn test_export_import_round_trip() {
        let (_dir, mut book) = book_with(&[("defense.toml", DEFENSE)]);
        let catalog = catalog();
        let mut cache = DirtyQuests::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        book.process_event(&kill(alice, "zombie"), &catalog, &mut cache);
        book.process_event(&kill(bob, "zombie"), &catalog, &mut cache);

        let only_alice = book.export_progress(Some(&[alice]));
        let hunt = &only_alice["quests"]["village_defense"]["0"];
        assert_eq!(hunt["userProgress"].as_array().map(Vec::len), Some(1));
        assert!(only_alice["exportedAt"].is_string());

        // Merge keeps bob, replace drops him
        book.reset(None, Some(alice), &mut cache);
        let summary = book.import_progress(&only_alice, true, &mut cache);
        assert_eq!(summary.progress, 1);
        let task = book.get("village_defense").and_then(|q| q.task(0)).unwrap();
        assert_eq!(task.progress(alice), 1);
        assert_eq!(task.progress(bob), 1);

        book.import_progress(&only_alice, false, &mut cache);
        let task = book.get("village_defense").and_then(|q| q.task(0)).unwrap();
        assert_eq!(task.progress(bob), 0);
    }

    #[test]
    fn test_import_skips_unknown() {
        let (_dir, mut book) = book_with(&[("defense.toml", DEFENSE)]);
        let summary = book.import_progress(
            &json!({"quests": {"nope": {}, "village_defense": {"9": {}, "x": {}}}}),
            true,
            &mut DirtyQuests::new(),
        );
        assert_eq!(summary, ReadSummary::default());
    }

    #[test]
    fn test_reload_keeps_progress() {
        let (dir, mut book) = book_with(&[("defense.toml", DEFENSE)]);
        let catalog = catalog();
        let mut cache = DirtyQuests::new();
        let player = Uuid::new_v4();
        book.process_event(&kill(player, "zombie"), &catalog, &mut cache);
        book.process_event(
            &TaskEvent::ItemCrafted {
                player_id: player,
                source: CraftSource::Crafting,
                item: ItemStack::new("torch", 2),
            },
            &catalog,
            &mut cache,
        );

        // Raise the hunt count, turn the crafting task into a meeting
        std::fs::write(
            dir.path().join("quests").join("defense.toml"),
            r#"
[quest]
id = "village_defense"
name = "Village Defense"

[[quest.tasks]]
type = "hunt"
target = "zombie"
required = 10

[[quest.tasks]]
type = "meeting"
target = "villager"
"#,
        )
        .unwrap();

        let summary = book.reload().unwrap();
        assert_eq!(summary.loaded, 1);
        assert!(summary.removed.is_empty());
        let quest = book.get("village_defense").unwrap();
        let hunt = quest.task(0).unwrap();
        assert_eq!(hunt.required(), 10);
        assert_eq!(hunt.progress(player), 1);
        assert_eq!(quest.task(1).map(Task::kind), Some("meeting"));
        assert_eq!(quest.task(1).unwrap().progress(player), 0);
    }

    fn hunt_progress(book: &QuestBook, player: PlayerId) -> i32 {
        book.get("village_defense")
            .and_then(|q| q.task(0))
            .map_or(0, |task| task.progress(player))
    }

    #[test]
    fn test_reload_keeps_task_that_fails_to_parse() {
        let (dir, mut book) = book_with(&[("defense.toml", DEFENSE)]);
        let catalog = catalog();
        let mut cache = DirtyQuests::new();
        let player = Uuid::new_v4();
        for _ in 0..2 {
            book.process_event(&kill(player, "zombie"), &catalog, &mut cache);
        }

        let path = dir.path().join("quests").join("defense.toml");
        std::fs::write(&path, DEFENSE.replace("required = 3", "required = \"five\"")).unwrap();
        book.reload().unwrap();

        // The broken hunt keeps its old config and progress
        let hunt = book.get("village_defense").and_then(|q| q.task(0)).unwrap();
        assert_eq!(hunt.required(), 3);
        assert_eq!(hunt.progress(player), 2);

        std::fs::write(&path, DEFENSE).unwrap();
        book.reload().unwrap();
        assert_eq!(hunt_progress(&book, player), 2);

        // Still counting after the round trip
        let results = book.process_event(&kill(player, "zombie"), &catalog, &mut cache);
        assert!(results[0].completed);
    }

    #[test]
    fn test_reload_keeps_quest_whose_file_fails_to_parse() {
        let (dir, mut book) = book_with(&[("defense.toml", DEFENSE)]);
        let mut cache = DirtyQuests::new();
        let player = Uuid::new_v4();
        book.process_event(&kill(player, "zombie"), &catalog(), &mut cache);

        let path = dir.path().join("quests").join("defense.toml");
        std::fs::write(&path, "[quest\nid = ").unwrap();
        let summary = book.reload().unwrap();
        assert_eq!(summary.loaded, 1);
        assert!(summary.removed.is_empty());
        assert_eq!(hunt_progress(&book, player), 1);

        // A second failing reload still has the source to fall back on
        book.reload().unwrap();
        assert_eq!(hunt_progress(&book, player), 1);

        std::fs::write(&path, DEFENSE).unwrap();
        book.reload().unwrap();
        assert_eq!(hunt_progress(&book, player), 1);
    }

    #[test]
    fn test_reload_reports_removed_quests() {
        let (dir, mut book) = book_with(&[("defense.toml", DEFENSE)]);
        std::fs::remove_file(dir.path().join("quests").join("defense.toml")).unwrap();

        let summary = book.reload().unwrap();
        assert_eq!(summary.loaded, 0);
        assert_eq!(summary.removed, vec!["village_defense".to_string()]);
        assert!(book.is_empty());
    }

    #[test]
    fn test_task_documents_restore() {
        let (_dir, mut book) = book_with(&[("defense.toml", DEFENSE)]);
        let catalog = catalog();
        let mut cache = DirtyQuests::new();
        let player = Uuid::new_v4();
        book.process_event(&kill(player, "zombie"), &catalog, &mut cache);

        let docs = book.task_documents("village_defense");
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].1["type"], json!("hunt"));
        assert_eq!(docs[0].1["target"], json!("zombie"));

        book.reset(None, None, &mut cache);
        assert!(book.restore_task_document("village_defense", 0, &docs[0].1));
        let hunt = book.get("village_defense").and_then(|q| q.task(0)).unwrap();
        assert_eq!(hunt.progress(player), 1);

        // Wrong kind or missing task
        assert!(!book.restore_task_document("village_defense", 1, &docs[0].1));
        assert!(!book.restore_task_document("village_defense", 7, &docs[0].1));
    }

    #[test]
    fn test_view() {
        let (_dir, book) = book_with(&[("defense.toml", DEFENSE)]);
        let view = book.view("village_defense", Uuid::new_v4()).unwrap();
        assert_eq!(view.name, "Village Defense");
        assert!(!view.complete);
        assert_eq!(view.tasks.len(), 2);
        assert_eq!(view.tasks[0].translation_key, "questing.task.hunt");
        assert!(view.rewards.is_empty());
        assert!(book.view("missing", Uuid::new_v4()).is_none());
    }
}
