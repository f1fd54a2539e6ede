//! Meeting Task
//!
//! Be near enough living entities of a given type. Completion is a single
//! flag; no counter is stored between scans.

use serde::{Deserialize, Serialize};

use super::events::{NearbyEntity, TaskUpdate};
use super::progress::{PlayerId, ProgressStore};
use super::view::{TaskView, ViewFlag, ViewLine};
use super::{TaskContext, entity_matches};
use crate::catalog::{EntityCatalog, TagCompound};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeetingConfig {
    pub target: String,
    /// Search radius in blocks
    pub range: f64,
    pub amount: i32,
    pub subtypes: bool,
    #[serde(rename = "ignoreNBT")]
    pub ignore_nbt: bool,
    #[serde(rename = "targetNBT")]
    pub target_nbt: TagCompound,
}

impl Default for MeetingConfig {
    fn default() -> Self {
        Self {
            target: "minecraft:villager".to_string(),
            range: 4.0,
            amount: 1,
            subtypes: true,
            ignore_nbt: true,
            target_nbt: TagCompound::new(),
        }
    }
}

impl MeetingConfig {
    /// Number of scanned entities that count towards the meeting
    pub fn count_matches(&self, entities: &[NearbyEntity], catalog: &dyn EntityCatalog) -> i32 {
        entities
            .iter()
            .filter(|nearby| nearby.alive && nearby.distance <= self.range)
            .filter(|nearby| {
                entity_matches(
                    &self.target,
                    self.subtypes,
                    self.ignore_nbt,
                    &self.target_nbt,
                    &nearby.entity,
                    catalog,
                )
            })
            .count() as i32
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeetingTask {
    pub config: MeetingConfig,
    pub progress: ProgressStore<i32>,
}

impl MeetingTask {
    pub fn new(config: MeetingConfig) -> Self {
        Self {
            config,
            progress: ProgressStore::new(),
        }
    }

    pub fn on_nearby(
        &mut self,
        player: PlayerId,
        entities: &[NearbyEntity],
        ctx: &mut TaskContext<'_>,
    ) -> Option<TaskUpdate> {
        if self.progress.is_complete(player) {
            return None;
        }

        let count = self.config.count_matches(entities, ctx.entities);
        if count < self.config.amount {
            return None;
        }

        self.progress.set_complete(player);
        ctx.mark_dirty();
        Some(TaskUpdate {
            progress: self.config.amount,
            required: self.config.amount,
            completed: true,
        })
    }

    pub fn view(&self, player: PlayerId) -> TaskView {
        let complete = self.progress.is_complete(player);
        let current = if complete { self.config.amount } else { 0 };

        TaskView {
            title: format!("Meet {}", self.config.target),
            translation_key: String::new(),
            complete,
            lines: vec![ViewLine::new(&self.config.target, current, self.config.amount)],
            flags: vec![
                ViewFlag::new("subtypes", self.config.subtypes),
                ViewFlag::new("ignore_nbt", self.config.ignore_nbt),
            ],
        }
    }
}
