//! World Catalog
//!
//! Stand-ins for the host game's entity, item, block and ore-dictionary
//! lookups. Tasks only see the `EntityCatalog` and `OreDictionary` traits.

pub mod entity;
pub mod item;
pub mod ore;
pub mod tags;

use std::path::Path;
use tracing::{info, warn};

use crate::error::TaskError;

pub use entity::{EntityCatalog, EntityHierarchy};
pub use item::{AIR, BlockState, BlockTarget, ItemStack, WILDCARD, ore_matches, stack_matches};
pub use ore::{OreDictionary, OreTable};
pub use tags::{TagCompound, compare_tags, compound_matches};

/// Namespace assumed for ids written without one
pub const DEFAULT_NAMESPACE: &str = "minecraft";

/// Normalise an id to `namespace:path` form
pub fn resource_id(id: &str) -> String {
    let id = id.trim();
    if id.contains(':') {
        id.to_string()
    } else {
        format!("{}:{}", DEFAULT_NAMESPACE, id)
    }
}

/// Entity hierarchy and ore table loaded from the data directory
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub entities: EntityHierarchy,
    pub ores: OreTable,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `entities.toml` and `ores.toml`; missing files leave that half empty
    pub fn load_from_directory(data_dir: &Path) -> Result<Self, TaskError> {
        let mut catalog = Self::new();

        let entities_path = data_dir.join("entities.toml");
        if entities_path.exists() {
            catalog.entities.load_from_file(&entities_path)?;
        } else {
            warn!("Entity catalog does not exist: {:?}", entities_path);
        }

        let ores_path = data_dir.join("ores.toml");
        if ores_path.exists() {
            catalog.ores.load_from_file(&ores_path)?;
        } else {
            info!("No ore dictionary at {:?}", ores_path);
        }

        Ok(catalog)
    }
}
