//! Quest Tasks
//!
//! Each task kind carries its own config and per-player progress. Game events
//! are routed through [`Task::handle_event`], which picks the kind's handler.

pub mod crafting;
pub mod document;
pub mod events;
pub mod hunt;
pub mod interact;
pub mod meeting;
pub mod progress;
pub mod view;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{EntityCatalog, OreDictionary, TagCompound, compound_matches, resource_id};
use crate::error::TaskError;
use crate::quest::cache::QuestCache;

pub use crafting::{CraftingConfig, CraftingTask};
pub use document::ReadSummary;
pub use events::{CraftSource, EntitySnapshot, Hand, NearbyEntity, TaskEvent, TaskEventResult, TaskUpdate};
pub use hunt::{HuntConfig, HuntTask};
pub use interact::{InteractConfig, InteractTask};
pub use meeting::{MeetingConfig, MeetingTask};
pub use progress::{PlayerId, ProgressStore};
pub use view::{RewardLine, TaskView, ViewFlag, ViewLine};

/// Prefix for task translation keys
pub const TRANSLATION_PREFIX: &str = "questing.task";

/// Collaborators a task needs while handling an event
pub struct TaskContext<'a> {
    /// Quest that owns the task, reported to the cache on changes
    pub quest_id: &'a str,
    pub entities: &'a dyn EntityCatalog,
    pub ores: &'a dyn OreDictionary,
    pub cache: &'a mut dyn QuestCache,
}

impl TaskContext<'_> {
    pub fn mark_dirty(&mut self) {
        self.cache.mark_quest_dirty(self.quest_id);
    }
}

/// Task configuration as written in quest files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskConfig {
    Hunt(HuntConfig),
    InteractItem(InteractConfig),
    Crafting(CraftingConfig),
    Meeting(MeetingConfig),
}

impl TaskConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            TaskConfig::Hunt(_) => "hunt",
            TaskConfig::InteractItem(_) => "interact_item",
            TaskConfig::Crafting(_) => "crafting",
            TaskConfig::Meeting(_) => "meeting",
        }
    }
}

/// A task instance: config plus per-player progress
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    Hunt(HuntTask),
    InteractItem(InteractTask),
    Crafting(CraftingTask),
    Meeting(MeetingTask),
}

impl Task {
    pub fn from_config(config: TaskConfig) -> Self {
        match config {
            TaskConfig::Hunt(c) => Task::Hunt(HuntTask::new(c)),
            TaskConfig::InteractItem(c) => Task::InteractItem(InteractTask::new(c)),
            TaskConfig::Crafting(c) => Task::Crafting(CraftingTask::new(c)),
            TaskConfig::Meeting(c) => Task::Meeting(MeetingTask::new(c)),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Task::Hunt(_) => "hunt",
            Task::InteractItem(_) => "interact_item",
            Task::Crafting(_) => "crafting",
            Task::Meeting(_) => "meeting",
        }
    }

    pub fn translation_key(&self) -> String {
        format!("{}.{}", TRANSLATION_PREFIX, self.kind())
    }

    pub fn config(&self) -> TaskConfig {
        match self {
            Task::Hunt(t) => TaskConfig::Hunt(t.config.clone()),
            Task::InteractItem(t) => TaskConfig::InteractItem(t.config.clone()),
            Task::Crafting(t) => TaskConfig::Crafting(t.config.clone()),
            Task::Meeting(t) => TaskConfig::Meeting(t.config.clone()),
        }
    }

    // ------------------------------------------------------------------------
    // Progress store
    // ------------------------------------------------------------------------

    pub fn is_complete(&self, player: PlayerId) -> bool {
        match self {
            Task::Hunt(t) => t.progress.is_complete(player),
            Task::InteractItem(t) => t.progress.is_complete(player),
            Task::Crafting(t) => t.progress.is_complete(player),
            Task::Meeting(t) => t.progress.is_complete(player),
        }
    }

    /// Idempotent. A stored counter below the threshold is raised to it.
    pub fn set_complete(&mut self, player: PlayerId) {
        match self {
            Task::Hunt(t) => complete_counter(&mut t.progress, player, t.config.required),
            Task::InteractItem(t) => complete_counter(&mut t.progress, player, t.config.required),
            Task::Crafting(t) => t.set_complete(player),
            Task::Meeting(t) => t.progress.set_complete(player),
        }
    }

    /// `None` resets every player
    pub fn reset(&mut self, player: Option<PlayerId>) {
        match self {
            Task::Hunt(t) => t.progress.reset(player),
            Task::InteractItem(t) => t.progress.reset(player),
            Task::Crafting(t) => t.progress.reset(player),
            Task::Meeting(t) => t.progress.reset(player),
        }
    }

    /// Scalar progress; crafting reports the sum over its required items
    pub fn progress(&self, player: PlayerId) -> i32 {
        match self {
            Task::Hunt(t) => t.progress.progress(player),
            Task::InteractItem(t) => t.progress.progress(player),
            Task::Crafting(t) => t.progress_total(player),
            Task::Meeting(t) => {
                if t.progress.is_complete(player) {
                    t.config.amount
                } else {
                    0
                }
            }
        }
    }

    pub fn required(&self) -> i32 {
        match self {
            Task::Hunt(t) => t.config.required,
            Task::InteractItem(t) => t.config.required,
            Task::Crafting(t) => t.config.required_total(),
            Task::Meeting(t) => t.config.amount,
        }
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    /// Route an event to this task. Returns the progress change, if any.
    pub fn handle_event(&mut self, event: &TaskEvent, ctx: &mut TaskContext<'_>) -> Option<TaskUpdate> {
        match (self, event) {
            (
                Task::Hunt(t),
                TaskEvent::EntityKilled {
                    player_id,
                    entity,
                    damage_type,
                },
            ) => t.on_killed(*player_id, entity, damage_type.as_deref(), ctx),
            (
                Task::InteractItem(t),
                TaskEvent::Interacted {
                    player_id,
                    hand,
                    item,
                    block,
                    is_hit,
                },
            ) => t.on_interact(*player_id, *hand, item, block.as_ref(), *is_hit, ctx),
            (
                Task::Crafting(t),
                TaskEvent::ItemCrafted {
                    player_id,
                    source,
                    item,
                },
            ) => t.on_crafted(*player_id, *source, item, ctx),
            (Task::Meeting(t), TaskEvent::EntitiesNearby { player_id, entities }) => {
                t.on_nearby(*player_id, entities, ctx)
            }
            (task, TaskEvent::Tick { player_id }) => {
                let completed = task.detect(*player_id, ctx);
                completed.then(|| TaskUpdate {
                    progress: task.progress(*player_id),
                    required: task.required(),
                    completed: true,
                })
            }
            _ => None,
        }
    }

    /// Re-check the completion threshold. Returns true if the player became complete.
    pub fn detect(&mut self, player: PlayerId, ctx: &mut TaskContext<'_>) -> bool {
        match self {
            Task::Hunt(t) => t.detect(player, ctx),
            Task::InteractItem(t) => t.detect(player, ctx),
            Task::Crafting(t) => t.detect(player, ctx),
            // Meeting completes only from a nearby-entity scan
            Task::Meeting(_) => false,
        }
    }

    // ------------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------------

    /// Config document, including the `type` tag
    pub fn serialize_config(&self) -> Result<Value, TaskError> {
        Ok(serde_json::to_value(self.config())?)
    }

    /// Overwrite the config from a document. The document may omit `type`;
    /// when present it must name this task's kind. Progress is kept.
    pub fn deserialize_config(&mut self, doc: &Value) -> Result<(), TaskError> {
        let config = if doc.get("type").is_some() {
            TaskConfig::deserialize(doc)?
        } else {
            match self {
                Task::Hunt(_) => TaskConfig::Hunt(HuntConfig::deserialize(doc)?),
                Task::InteractItem(_) => TaskConfig::InteractItem(InteractConfig::deserialize(doc)?),
                Task::Crafting(_) => TaskConfig::Crafting(CraftingConfig::deserialize(doc)?),
                Task::Meeting(_) => TaskConfig::Meeting(MeetingConfig::deserialize(doc)?),
            }
        };
        self.apply_config(config)
    }

    /// Replace the config with one of the same kind
    pub fn apply_config(&mut self, config: TaskConfig) -> Result<(), TaskError> {
        match (self, config) {
            (Task::Hunt(t), TaskConfig::Hunt(c)) => t.config = c,
            (Task::InteractItem(t), TaskConfig::InteractItem(c)) => t.config = c,
            (Task::Crafting(t), TaskConfig::Crafting(c)) => t.config = c,
            (Task::Meeting(t), TaskConfig::Meeting(c)) => t.config = c,
            (task, config) => {
                return Err(TaskError::KindMismatch {
                    expected: task.kind(),
                    found: config.kind(),
                });
            }
        }
        Ok(())
    }

    pub fn serialize_progress(&self, players: Option<&[PlayerId]>) -> Value {
        match self {
            Task::Hunt(t) => t.progress.write_document(players),
            Task::InteractItem(t) => t.progress.write_document(players),
            Task::Crafting(t) => t.progress.write_document(players),
            Task::Meeting(t) => t.progress.write_document(players),
        }
    }

    pub fn deserialize_progress(&mut self, doc: &Value, merge: bool) -> ReadSummary {
        match self {
            Task::Hunt(t) => t.progress.read_document(doc, merge),
            Task::InteractItem(t) => t.progress.read_document(doc, merge),
            Task::Crafting(t) => t.progress.read_document(doc, merge),
            Task::Meeting(t) => t.progress.read_document(doc, merge),
        }
    }

    /// Config fields and progress lists in a single document
    pub fn to_document(&self, players: Option<&[PlayerId]>) -> Result<Value, TaskError> {
        let mut doc = self.serialize_config()?;
        if let (Value::Object(doc), Value::Object(progress)) = (&mut doc, self.serialize_progress(players)) {
            doc.extend(progress);
        }
        Ok(doc)
    }

    pub fn view(&self, player: PlayerId) -> TaskView {
        let mut view = match self {
            Task::Hunt(t) => t.view(player),
            Task::InteractItem(t) => t.view(player),
            Task::Crafting(t) => t.view(player),
            Task::Meeting(t) => t.view(player),
        };
        view.translation_key = self.translation_key();
        view
    }
}

/// Shared entity check for hunt and meeting tasks: the target and subject
/// must both be known, the subject must be the target (or a subtype when
/// `subtypes` is set), and tags must match partially unless ignored.
pub(crate) fn entity_matches(
    target: &str,
    subtypes: bool,
    ignore_nbt: bool,
    target_nbt: &TagCompound,
    entity: &EntitySnapshot,
    catalog: &dyn EntityCatalog,
) -> bool {
    if !catalog.is_known(target) || !catalog.is_known(&entity.entity_type) {
        return false;
    }

    let type_match = if subtypes {
        catalog.is_subtype(&entity.entity_type, target)
    } else {
        resource_id(&entity.entity_type) == resource_id(target)
    };

    type_match && (ignore_nbt || compound_matches(target_nbt, Some(&entity.tags), true))
}

fn complete_counter(store: &mut ProgressStore<i32>, player: PlayerId, required: i32) {
    if store.progress(player) < required {
        store.set_progress(player, required);
    }
    store.set_complete(player);
}

/// Threshold check shared by counter-based tasks
pub(crate) fn detect_threshold(
    store: &mut ProgressStore<i32>,
    player: PlayerId,
    required: i32,
    ctx: &mut TaskContext<'_>,
) -> bool {
    if store.is_complete(player) {
        return false;
    }
    if store.progress(player) >= required {
        store.set_complete(player);
        ctx.mark_dirty();
        return true;
    }
    false
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::catalog::{EntityHierarchy, OreTable};
    use crate::quest::cache::DirtyQuests;

    pub struct Fixture {
        pub entities: EntityHierarchy,
        pub ores: OreTable,
        pub cache: DirtyQuests,
    }

    impl Fixture {
        pub fn new() -> Self {
            let mut entities = EntityHierarchy::new();
            entities.register("monster", None);
            entities.register("zombie", Some("monster"));
            entities.register("husk", Some("zombie"));
            entities.register("skeleton", Some("monster"));
            entities.register("villager", None);

            let mut ores = OreTable::new();
            ores.register("logWood", "log", crate::catalog::WILDCARD);
            ores.register("ingotIron", "iron_ingot", 0);

            Self {
                entities,
                ores,
                cache: DirtyQuests::new(),
            }
        }

        pub fn ctx(&mut self) -> TaskContext<'_> {
            TaskContext {
                quest_id: "test_quest",
                entities: &self.entities,
                ores: &self.ores,
                cache: &mut self.cache,
            }
        }
    }
}
