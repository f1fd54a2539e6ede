//! Quest Definition Structures
//!
//! Quests are deserialized from TOML files. Each task entry is parsed on its
//! own so one broken task does not take the rest of the quest with it.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::catalog::{ItemStack, resource_id};
use crate::error::TaskError;
use crate::task::{PlayerId, RewardLine, Task, TaskConfig, TaskView};

/// A quest definition loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuestFile {
    pub quest: RawQuest,
}

/// Raw quest data as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Task tables, kept untyped until each is resolved
    #[serde(default)]
    pub tasks: Vec<toml::Value>,
    #[serde(default)]
    pub rewards: Vec<ItemStack>,
}

// ============================================================================
// Resolved Quest Structures (after parsing)
// ============================================================================

/// A quest with its tasks keyed by position in the file
#[derive(Debug, Clone, PartialEq)]
pub struct Quest {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tasks: BTreeMap<u32, Task>,
    /// Indices whose task table failed to parse
    pub skipped: BTreeSet<u32>,
    /// Items handed out on completion
    pub rewards: Vec<ItemStack>,
}

/// A quest's progress for one player, with its reward list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestView {
    pub name: String,
    pub complete: bool,
    pub tasks: Vec<TaskView>,
    pub rewards: Vec<RewardLine>,
}

impl Quest {
    /// Create a Quest from raw TOML data. Tasks that fail to parse are
    /// skipped; their index is left empty so siblings keep theirs.
    pub fn from_raw(raw: &RawQuest) -> Result<Self, TaskError> {
        if raw.id.trim().is_empty() {
            return Err(TaskError::parse("<quest>", "quest id is empty"));
        }

        let mut tasks = BTreeMap::new();
        let mut skipped = BTreeSet::new();
        for (index, value) in raw.tasks.iter().enumerate() {
            let index = index as u32;
            match TaskConfig::deserialize(value.clone()) {
                Ok(config) => {
                    tasks.insert(index, Task::from_config(config));
                }
                Err(e) => {
                    warn!("Skipping task {} of quest '{}': {}", index, raw.id, e);
                    skipped.insert(index);
                }
            }
        }

        let rewards = raw
            .rewards
            .iter()
            .filter(|item| {
                let usable = !item.is_air() && item.count > 0;
                if !usable {
                    warn!("Skipping empty reward '{}' of quest '{}'", item.id, raw.id);
                }
                usable
            })
            .map(|item| ItemStack {
                id: resource_id(&item.id),
                ..item.clone()
            })
            .collect();

        if tasks.is_empty() {
            warn!("Quest '{}' has no usable tasks", raw.id);
        }

        Ok(Self {
            id: raw.id.clone(),
            name: raw.name.clone(),
            description: raw.description.clone(),
            tasks,
            skipped,
            rewards,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, TaskError> {
        let raw: RawQuestFile =
            toml::from_str(content).map_err(|e| TaskError::parse("<quest>", e))?;
        Self::from_raw(&raw.quest)
    }

    pub fn task(&self, index: u32) -> Option<&Task> {
        self.tasks.get(&index)
    }

    pub fn task_mut(&mut self, index: u32) -> Option<&mut Task> {
        self.tasks.get_mut(&index)
    }

    /// A quest is complete for a player when every task is
    pub fn is_complete(&self, player: PlayerId) -> bool {
        !self.tasks.is_empty() && self.tasks.values().all(|t| t.is_complete(player))
    }

    pub fn view(&self, player: PlayerId) -> QuestView {
        QuestView {
            name: self.name.clone(),
            complete: self.is_complete(player),
            tasks: self.tasks.values().map(|task| task.view(player)).collect(),
            rewards: self.rewards.iter().map(RewardLine::new).collect(),
        }
    }
}
