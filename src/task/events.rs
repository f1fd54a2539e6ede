//! Task Event Types
//!
//! Game events that can advance task progress.

use serde::{Deserialize, Serialize};

use super::progress::PlayerId;
use crate::catalog::{BlockState, ItemStack, TagCompound};

/// Which hand performed an interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hand {
    MainHand,
    OffHand,
}

/// Where a crafted item came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CraftSource {
    Crafting,
    Smelting,
    Anvil,
}

impl CraftSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CraftSource::Crafting => "crafting",
            CraftSource::Smelting => "smelting",
            CraftSource::Anvil => "anvil",
        }
    }
}

/// An entity as the event source saw it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Entity type id (e.g., "minecraft:zombie")
    pub entity_type: String,
    /// Saved entity data
    #[serde(default)]
    pub tags: TagCompound,
}

impl EntitySnapshot {
    pub fn new(entity_type: &str) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            tags: TagCompound::new(),
        }
    }

    pub fn with_tags(mut self, tags: TagCompound) -> Self {
        self.tags = tags;
        self
    }
}

fn default_true() -> bool {
    true
}

/// An entity near the player during a tick scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyEntity {
    pub entity: EntitySnapshot,
    /// Distance from the player in blocks
    pub distance: f64,
    #[serde(default = "default_true")]
    pub alive: bool,
}

/// Events that can trigger task progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEvent {
    /// Player killed an entity
    EntityKilled {
        player_id: PlayerId,
        entity: EntitySnapshot,
        /// Damage source type (e.g., "player", "arrow")
        #[serde(default)]
        damage_type: Option<String>,
    },

    /// Player used or hit something, with an item in hand
    Interacted {
        player_id: PlayerId,
        hand: Hand,
        #[serde(default)]
        item: ItemStack,
        /// Targeted block, if any
        #[serde(default)]
        block: Option<BlockState>,
        /// Left click rather than use
        #[serde(default)]
        is_hit: bool,
    },

    /// Player crafted, smelted or repaired an item
    ItemCrafted {
        player_id: PlayerId,
        source: CraftSource,
        item: ItemStack,
    },

    /// Periodic scan of entities around the player
    EntitiesNearby {
        player_id: PlayerId,
        entities: Vec<NearbyEntity>,
    },

    /// Periodic re-check of completion thresholds
    Tick { player_id: PlayerId },
}

impl TaskEvent {
    /// Get the player ID associated with this event
    pub fn player_id(&self) -> PlayerId {
        match self {
            TaskEvent::EntityKilled { player_id, .. } => *player_id,
            TaskEvent::Interacted { player_id, .. } => *player_id,
            TaskEvent::ItemCrafted { player_id, .. } => *player_id,
            TaskEvent::EntitiesNearby { player_id, .. } => *player_id,
            TaskEvent::Tick { player_id } => *player_id,
        }
    }

    /// Get event type as string (for logging/debugging)
    pub fn event_type(&self) -> &'static str {
        match self {
            TaskEvent::EntityKilled { .. } => "entity_killed",
            TaskEvent::Interacted { .. } => "interacted",
            TaskEvent::ItemCrafted { .. } => "item_crafted",
            TaskEvent::EntitiesNearby { .. } => "entities_nearby",
            TaskEvent::Tick { .. } => "tick",
        }
    }
}

/// Progress change produced by a single task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskUpdate {
    pub progress: i32,
    pub required: i32,
    /// The player completed the task with this event
    pub completed: bool,
}

/// Result of processing an event against a quest's task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskEventResult {
    pub quest_id: String,
    pub task_index: u32,
    pub player_id: PlayerId,
    pub progress: i32,
    pub required: i32,
    pub completed: bool,
}

impl TaskEventResult {
    pub fn new(quest_id: &str, task_index: u32, player_id: PlayerId, update: TaskUpdate) -> Self {
        Self {
            quest_id: quest_id.to_string(),
            task_index,
            player_id,
            progress: update.progress,
            required: update.required,
            completed: update.completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn test_parse_kill_event() {
        let player = Uuid::new_v4();
        let event: TaskEvent = serde_json::from_value(json!({
            "type": "entity_killed",
            "player_id": player.to_string(),
            "entity": { "entity_type": "minecraft:zombie" },
        }))
        .unwrap();

        assert_eq!(event.player_id(), player);
        assert_eq!(event.event_type(), "entity_killed");
        match event {
            TaskEvent::EntityKilled { damage_type, entity, .. } => {
                assert!(damage_type.is_none());
                assert!(entity.tags.is_empty());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_parse_interact_defaults() {
        let event: TaskEvent = serde_json::from_value(json!({
            "type": "interacted",
            "player_id": Uuid::new_v4().to_string(),
            "hand": "off_hand",
        }))
        .unwrap();

        match event {
            TaskEvent::Interacted { hand, item, block, is_hit, .. } => {
                assert_eq!(hand, Hand::OffHand);
                assert!(item.is_air());
                assert!(block.is_none());
                assert!(!is_hit);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_nearby_entity_alive_default() {
        let nearby: NearbyEntity = serde_json::from_value(json!({
            "entity": { "entity_type": "villager" },
            "distance": 2.5,
        }))
        .unwrap();
        assert!(nearby.alive);
    }
}
