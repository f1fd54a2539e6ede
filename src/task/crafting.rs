//! Crafting Task
//!
//! Produce a list of items by crafting, smelting or anvil work. Each required
//! item keeps its own counter.

use serde::{Deserialize, Serialize};

use super::TaskContext;
use super::events::{CraftSource, TaskUpdate};
use super::progress::{PlayerId, ProgressStore};
use super::view::{TaskView, ViewFlag, ViewLine};
use crate::catalog::{ItemStack, OreDictionary, ore_matches, stack_matches};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CraftingConfig {
    #[serde(rename = "requiredItems")]
    pub required_items: Vec<ItemStack>,
    #[serde(rename = "partialMatch")]
    pub partial_match: bool,
    #[serde(rename = "ignoreNBT")]
    pub ignore_nbt: bool,
    #[serde(rename = "allowCraft")]
    pub allow_craft: bool,
    #[serde(rename = "allowSmelt")]
    pub allow_smelt: bool,
    #[serde(rename = "allowAnvil")]
    pub allow_anvil: bool,
}

impl Default for CraftingConfig {
    fn default() -> Self {
        Self {
            required_items: Vec::new(),
            partial_match: true,
            ignore_nbt: false,
            allow_craft: true,
            allow_smelt: true,
            allow_anvil: true,
        }
    }
}

impl CraftingConfig {
    pub fn allows(&self, source: CraftSource) -> bool {
        match source {
            CraftSource::Crafting => self.allow_craft,
            CraftSource::Smelting => self.allow_smelt,
            CraftSource::Anvil => self.allow_anvil,
        }
    }

    /// Whether a crafted stack counts towards a required entry
    pub fn item_matches(&self, required: &ItemStack, item: &ItemStack, ores: &dyn OreDictionary) -> bool {
        let nbt_check = !self.ignore_nbt;
        stack_matches(required, item, nbt_check, self.partial_match)
            || (required.has_ore_dict() && ore_matches(required, item, ores, nbt_check, self.partial_match))
    }

    pub fn required_total(&self) -> i32 {
        self.required_items
            .iter()
            .fold(0i32, |total, item| total.saturating_add(item.count))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CraftingTask {
    pub config: CraftingConfig,
    pub progress: ProgressStore<Vec<i32>>,
}

impl CraftingTask {
    pub fn new(config: CraftingConfig) -> Self {
        Self {
            config,
            progress: ProgressStore::new(),
        }
    }

    /// Per-item counters, sized to the current required list
    pub fn user_progress(&self, player: PlayerId) -> Vec<i32> {
        let mut progress = self.progress.progress(player);
        progress.resize(self.config.required_items.len(), 0);
        progress
    }

    pub fn on_crafted(
        &mut self,
        player: PlayerId,
        source: CraftSource,
        item: &ItemStack,
        ctx: &mut TaskContext<'_>,
    ) -> Option<TaskUpdate> {
        if self.progress.is_complete(player) || !self.config.allows(source) {
            return None;
        }
        if item.is_air() || item.count <= 0 {
            return None;
        }

        let mut progress = self.user_progress(player);
        let mut updated = false;

        for (slot, required) in progress.iter_mut().zip(&self.config.required_items) {
            if *slot >= required.count {
                continue;
            }
            if self.config.item_matches(required, item, ctx.ores) {
                *slot = slot.saturating_add(item.count).min(required.count);
                updated = true;
            }
        }

        if !updated {
            return None;
        }

        self.progress.set_progress(player, progress);
        let total = self.progress_total(player);
        ctx.mark_dirty();

        let completed = self.detect(player, ctx);
        Some(TaskUpdate {
            progress: total,
            required: self.config.required_total(),
            completed,
        })
    }

    pub fn progress_total(&self, player: PlayerId) -> i32 {
        self.user_progress(player)
            .iter()
            .fold(0i32, |total, count| total.saturating_add(*count))
    }

    /// Mark complete, raising every counter to at least its required count
    pub fn set_complete(&mut self, player: PlayerId) {
        let mut progress = self.user_progress(player);
        for (slot, required) in progress.iter_mut().zip(&self.config.required_items) {
            *slot = (*slot).max(required.count);
        }
        self.progress.set_progress(player, progress);
        self.progress.set_complete(player);
    }

    /// Complete once every required entry is satisfied. An empty list never completes.
    pub fn detect(&mut self, player: PlayerId, ctx: &mut TaskContext<'_>) -> bool {
        if self.progress.is_complete(player) || self.config.required_items.is_empty() {
            return false;
        }

        let progress = self.user_progress(player);
        let satisfied = progress
            .iter()
            .zip(&self.config.required_items)
            .all(|(count, required)| *count >= required.count);

        if satisfied {
            self.progress.set_complete(player);
            ctx.mark_dirty();
        }
        satisfied
    }

    pub fn view(&self, player: PlayerId) -> TaskView {
        let progress = self.user_progress(player);
        let lines = self
            .config
            .required_items
            .iter()
            .zip(progress)
            .map(|(required, count)| ViewLine::new(&required.label(), count, required.count))
            .collect();

        TaskView {
            title: "Craft".to_string(),
            translation_key: String::new(),
            complete: self.progress.is_complete(player),
            lines,
            flags: vec![
                ViewFlag::new("crafting", self.config.allow_craft),
                ViewFlag::new("smelting", self.config.allow_smelt),
                ViewFlag::new("anvil", self.config.allow_anvil),
            ],
        }
    }
}
