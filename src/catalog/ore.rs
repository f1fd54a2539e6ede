//! Ore Dictionary
//!
//! Named groups of interchangeable items ("logWood", "ingotIron").

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use super::item::WILDCARD;
use super::resource_id;
use crate::error::TaskError;

pub trait OreDictionary {
    /// Whether `item_id` at `meta` belongs to the named group.
    /// A wildcard on either side matches any meta.
    fn contains(&self, ore: &str, item_id: &str, meta: i32) -> bool;
}

fn default_wildcard() -> i32 {
    WILDCARD
}

/// Raw ore entry from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawOreEntry {
    pub id: String,
    #[serde(default = "default_wildcard")]
    pub damage: i32,
}

/// Ore groups loaded from `ores.toml`
#[derive(Debug, Clone, Default)]
pub struct OreTable {
    ores: HashMap<String, Vec<(String, i32)>>,
}

impl OreTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, ore: &str, item_id: &str, meta: i32) {
        self.ores
            .entry(ore.to_string())
            .or_default()
            .push((resource_id(item_id), meta));
    }

    pub fn load_from_file(&mut self, path: &Path) -> Result<(), TaskError> {
        let content = std::fs::read_to_string(path).map_err(|e| TaskError::io(path, e))?;
        let table: HashMap<String, Vec<RawOreEntry>> =
            toml::from_str(&content).map_err(|e| TaskError::parse(path, e))?;

        for (ore, entries) in table {
            for entry in entries {
                self.register(&ore, &entry.id, entry.damage);
            }
        }

        info!("Loaded {} ore groups from {:?}", self.ores.len(), path);
        Ok(())
    }

    /// Items registered under an ore name
    pub fn entries(&self, ore: &str) -> &[(String, i32)] {
        self.ores.get(ore).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.ores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ores.is_empty()
    }
}

impl OreDictionary for OreTable {
    fn contains(&self, ore: &str, item_id: &str, meta: i32) -> bool {
        let item_id = resource_id(item_id);
        self.entries(ore).iter().any(|(id, entry_meta)| {
            *id == item_id && (*entry_meta == WILDCARD || meta == WILDCARD || *entry_meta == meta)
        })
    }
}
