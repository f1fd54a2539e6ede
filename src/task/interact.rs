//! Interact Task
//!
//! Use or hit a block (or the air) while holding an item. Block and item
//! targets are independent gates; an air target leaves its gate open.

use serde::{Deserialize, Serialize};

use super::events::{Hand, TaskUpdate};
use super::progress::{PlayerId, ProgressStore};
use super::view::{TaskView, ViewFlag, ViewLine};
use super::{TaskContext, detect_threshold};
use crate::catalog::{BlockState, BlockTarget, ItemStack, OreDictionary, ore_matches, stack_matches};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractConfig {
    pub item: ItemStack,
    pub block: BlockTarget,
    #[serde(rename = "ignoreNbt")]
    pub ignore_nbt: bool,
    #[serde(rename = "partialMatch")]
    pub partial_match: bool,
    #[serde(rename = "allowMainHand")]
    pub use_main_hand: bool,
    #[serde(rename = "allowOffHand")]
    pub use_off_hand: bool,
    #[serde(rename = "requiredUses")]
    pub required: i32,
    #[serde(rename = "onInteract")]
    pub on_interact: bool,
    #[serde(rename = "onHit")]
    pub on_hit: bool,
}

impl Default for InteractConfig {
    fn default() -> Self {
        Self {
            item: ItemStack::default(),
            block: BlockTarget::default(),
            ignore_nbt: false,
            partial_match: true,
            use_main_hand: true,
            use_off_hand: true,
            required: 1,
            on_interact: true,
            on_hit: false,
        }
    }
}

impl InteractConfig {
    pub fn matches(
        &self,
        hand: Hand,
        item: &ItemStack,
        block: Option<&BlockState>,
        is_hit: bool,
        ores: &dyn OreDictionary,
    ) -> bool {
        if (is_hit && !self.on_hit) || (!is_hit && !self.on_interact) {
            return false;
        }

        let hand_allowed = match hand {
            Hand::MainHand => self.use_main_hand,
            Hand::OffHand => self.use_off_hand,
        };
        if !hand_allowed {
            return false;
        }

        if !self.block.is_air() && !self.block.matches(block, ores) {
            return false;
        }

        if !self.item.is_air() {
            let nbt_check = !self.ignore_nbt;
            let item_match = if self.item.has_ore_dict() {
                ore_matches(&self.item, item, ores, nbt_check, self.partial_match)
            } else {
                stack_matches(&self.item, item, nbt_check, self.partial_match)
            };
            if !item_match {
                return false;
            }
        }

        true
    }

    fn target_label(&self) -> String {
        match (self.item.is_air(), self.block.is_air()) {
            (false, true) => self.item.label(),
            (true, false) => self.block.block.clone(),
            (false, false) => format!("{} -> {}", self.item.label(), self.block.block),
            (true, true) => "anything".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractTask {
    pub config: InteractConfig,
    pub progress: ProgressStore<i32>,
}

impl InteractTask {
    pub fn new(config: InteractConfig) -> Self {
        Self {
            config,
            progress: ProgressStore::new(),
        }
    }

    pub fn on_interact(
        &mut self,
        player: PlayerId,
        hand: Hand,
        item: &ItemStack,
        block: Option<&BlockState>,
        is_hit: bool,
        ctx: &mut TaskContext<'_>,
    ) -> Option<TaskUpdate> {
        if self.progress.is_complete(player) {
            return None;
        }
        if !self.config.matches(hand, item, block, is_hit, ctx.ores) {
            return None;
        }

        let value = self.progress.progress(player).saturating_add(1);
        self.progress.set_progress(player, value);
        ctx.mark_dirty();

        let completed = self.detect(player, ctx);
        Some(TaskUpdate {
            progress: value,
            required: self.config.required,
            completed,
        })
    }

    pub fn detect(&mut self, player: PlayerId, ctx: &mut TaskContext<'_>) -> bool {
        detect_threshold(&mut self.progress, player, self.config.required, ctx)
    }

    pub fn view(&self, player: PlayerId) -> TaskView {
        TaskView {
            title: "Interact".to_string(),
            translation_key: String::new(),
            complete: self.progress.is_complete(player),
            lines: vec![ViewLine::new(
                &self.config.target_label(),
                self.progress.progress(player),
                self.config.required,
            )],
            flags: vec![
                ViewFlag::new("main_hand", self.config.use_main_hand),
                ViewFlag::new("off_hand", self.config.use_off_hand),
                ViewFlag::new("on_interact", self.config.on_interact),
                ViewFlag::new("on_hit", self.config.on_hit),
            ],
        }
    }
}
