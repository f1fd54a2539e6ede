//! Item and Block Descriptors
//!
//! Item stacks and block states as seen by tasks, plus the comparison rules
//! used to decide whether a sample satisfies a configured target.

use serde::{Deserialize, Serialize};

use super::ore::OreDictionary;
use super::resource_id;
use super::tags::{TagCompound, compound_matches};

/// Meta value that matches any variant
pub const WILDCARD: i32 = 32767;

/// The empty item / block
pub const AIR: &str = "minecraft:air";

pub fn is_air(id: &str) -> bool {
    id.is_empty() || resource_id(id) == AIR
}

fn default_air() -> String {
    AIR.to_string()
}

fn default_count() -> i32 {
    1
}

fn default_any_meta() -> i32 {
    -1
}

// ============================================================================
// Items
// ============================================================================

/// An item stack, optionally standing in for an ore-dictionary group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStack {
    #[serde(default = "default_air")]
    pub id: String,
    #[serde(default)]
    pub damage: i32,
    #[serde(default = "default_count")]
    pub count: i32,
    #[serde(default, skip_serializing_if = "TagCompound::is_empty")]
    pub tag: TagCompound,
    #[serde(default, rename = "oreDict", skip_serializing_if = "String::is_empty")]
    pub ore_dict: String,
}

impl Default for ItemStack {
    fn default() -> Self {
        Self {
            id: default_air(),
            damage: 0,
            count: 1,
            tag: TagCompound::new(),
            ore_dict: String::new(),
        }
    }
}

impl ItemStack {
    pub fn new(id: &str, count: i32) -> Self {
        Self {
            id: resource_id(id),
            count,
            ..Self::default()
        }
    }

    pub fn with_damage(mut self, damage: i32) -> Self {
        self.damage = damage;
        self
    }

    pub fn with_tag(mut self, tag: TagCompound) -> Self {
        self.tag = tag;
        self
    }

    pub fn with_ore_dict(mut self, ore: &str) -> Self {
        self.ore_dict = ore.to_string();
        self
    }

    pub fn is_air(&self) -> bool {
        is_air(&self.id)
    }

    pub fn has_ore_dict(&self) -> bool {
        !self.ore_dict.is_empty()
    }

    /// Display label: the id, followed by the ore group when present
    pub fn label(&self) -> String {
        if self.has_ore_dict() {
            format!("{} ({})", self.id, self.ore_dict)
        } else {
            self.id.clone()
        }
    }
}

/// Exact stack comparison: same item, same damage unless the target is a
/// wildcard, and matching tags when `nbt_check` is set
pub fn stack_matches(target: &ItemStack, sample: &ItemStack, nbt_check: bool, partial: bool) -> bool {
    if resource_id(&target.id) != resource_id(&sample.id) {
        return false;
    }
    if target.damage != WILDCARD && target.damage != sample.damage {
        return false;
    }
    !nbt_check || compound_matches(&target.tag, Some(&sample.tag), partial)
}

/// Ore-dictionary comparison: the sample belongs to the target's ore group
pub fn ore_matches(
    target: &ItemStack,
    sample: &ItemStack,
    ores: &dyn OreDictionary,
    nbt_check: bool,
    partial: bool,
) -> bool {
    if nbt_check && !compound_matches(&target.tag, Some(&sample.tag), partial) {
        return false;
    }
    ores.contains(&target.ore_dict, &sample.id, sample.damage)
}

// ============================================================================
// Blocks
// ============================================================================

/// A block in the world, as reported by an interaction event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockState {
    pub block: String,
    #[serde(default)]
    pub meta: i32,
    /// Tile data, when the block carries any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile: Option<TagCompound>,
}

impl BlockState {
    pub fn new(block: &str, meta: i32) -> Self {
        Self {
            block: resource_id(block),
            meta,
            tile: None,
        }
    }

    pub fn with_tile(mut self, tile: TagCompound) -> Self {
        self.tile = Some(tile);
        self
    }
}

/// A configured block target. Negative meta (or the wildcard) accepts any variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockTarget {
    #[serde(rename = "blockID", default = "default_air")]
    pub block: String,
    #[serde(default = "default_any_meta")]
    pub meta: i32,
    #[serde(rename = "oreDict", default, skip_serializing_if = "String::is_empty")]
    pub ore_dict: String,
    #[serde(default, skip_serializing_if = "TagCompound::is_empty")]
    pub nbt: TagCompound,
}

impl Default for BlockTarget {
    fn default() -> Self {
        Self {
            block: default_air(),
            meta: default_any_meta(),
            ore_dict: String::new(),
            nbt: TagCompound::new(),
        }
    }
}

impl BlockTarget {
    pub fn new(block: &str, meta: i32) -> Self {
        Self {
            block: resource_id(block),
            meta,
            ..Self::default()
        }
    }

    pub fn is_air(&self) -> bool {
        is_air(&self.block)
    }

    fn accepts_any_meta(&self) -> bool {
        self.meta < 0 || self.meta == WILDCARD
    }

    /// Whether the reported block satisfies this target.
    /// Air (or no block) never does.
    pub fn matches(&self, state: Option<&BlockState>, ores: &dyn OreDictionary) -> bool {
        let Some(state) = state.filter(|s| !is_air(&s.block)) else {
            return false;
        };

        let probe_meta = if self.accepts_any_meta() {
            WILDCARD
        } else {
            state.meta
        };
        let ore_match =
            !self.ore_dict.is_empty() && ores.contains(&self.ore_dict, &state.block, probe_meta);
        let exact_match = resource_id(&state.block) == resource_id(&self.block)
            && (self.accepts_any_meta() || state.meta == self.meta);

        (ore_match || exact_match) && compound_matches(&self.nbt, state.tile.as_ref(), true)
    }
}
