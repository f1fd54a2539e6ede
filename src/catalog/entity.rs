//! Entity Type Hierarchy
//!
//! Entity kinds are declared in TOML with an optional `extends` parent, the
//! same way entity prototypes inherit from one another. Subtype checks walk the
//! parent chain.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use super::resource_id;
use crate::error::TaskError;

/// Entity type lookups needed by hunt and meeting tasks
pub trait EntityCatalog {
    /// Whether the entity type is registered
    fn is_known(&self, entity_type: &str) -> bool;

    /// Whether `subject` is `target` or inherits from it
    fn is_subtype(&self, subject: &str, target: &str) -> bool;
}

/// Raw entity kind as it appears in TOML
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEntityKind {
    pub extends: Option<String>,
}

/// Registered entity kinds keyed by normalised id
#[derive(Debug, Clone, Default)]
pub struct EntityHierarchy {
    parents: HashMap<String, Option<String>>,
}

impl EntityHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity kind, optionally extending a parent
    pub fn register(&mut self, id: &str, extends: Option<&str>) {
        self.parents
            .insert(resource_id(id), extends.map(resource_id));
    }

    /// Load kinds from a TOML table of `[id] extends = "parent"` entries
    pub fn load_from_file(&mut self, path: &Path) -> Result<(), TaskError> {
        let content = std::fs::read_to_string(path).map_err(|e| TaskError::io(path, e))?;
        self.load_from_str(&content)
            .map_err(|e| match e {
                TaskError::Parse { message, .. } => TaskError::parse(path, message),
                other => other,
            })?;
        info!("Loaded {} entity kinds from {:?}", self.parents.len(), path);
        Ok(())
    }

    pub fn load_from_str(&mut self, content: &str) -> Result<(), TaskError> {
        let table: HashMap<String, RawEntityKind> =
            toml::from_str(content).map_err(|e| TaskError::parse("<entities>", e))?;

        for (id, raw) in table {
            let id = resource_id(&id);
            if self.parents.contains_key(&id) {
                warn!("Duplicate entity kind '{}', overwriting", id);
            }
            self.parents.insert(id, raw.extends.as_deref().map(resource_id));
        }

        self.validate()
    }

    /// Reject circular `extends` chains and warn about dangling parents
    pub fn validate(&self) -> Result<(), TaskError> {
        let mut visited: HashSet<&str> = HashSet::new();

        for start in self.parents.keys() {
            let mut visiting: HashSet<&str> = HashSet::new();
            let mut current = Some(start.as_str());

            while let Some(id) = current {
                if visited.contains(id) {
                    break;
                }
                if !visiting.insert(id) {
                    return Err(TaskError::CircularInheritance(id.to_string()));
                }
                current = match self.parents.get(id) {
                    Some(parent) => parent.as_deref(),
                    None => {
                        warn!("Entity kind '{}' extends unknown kind '{}'", start, id);
                        None
                    }
                };
            }

            visited.extend(visiting);
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}

impl EntityCatalog for EntityHierarchy {
    fn is_known(&self, entity_type: &str) -> bool {
        self.parents.contains_key(&resource_id(entity_type))
    }

    fn is_subtype(&self, subject: &str, target: &str) -> bool {
        let target = resource_id(target);
        let mut current = Some(resource_id(subject));
        // Bounded by the number of kinds so a bad chain can never spin
        let mut steps = 0;

        while let Some(id) = current {
            if id == target {
                return true;
            }
            if steps > self.parents.len() {
                return false;
            }
            steps += 1;
            current = self.parents.get(&id).cloned().flatten();
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hierarchy() -> EntityHierarchy {
        let mut h = EntityHierarchy::new();
        h.load_from_str(
            r#"
            [monster]

            [zombie]
            extends = "monster"

            [husk]
            extends = "zombie"

            [villager]
            "#,
        )
        .unwrap();
        h
    }

    #[test]
    fn test_subtypes() {
        let h = hierarchy();
        assert!(h.is_subtype("minecraft:husk", "minecraft:zombie"));
        assert!(h.is_subtype("husk", "monster"));
        assert!(h.is_subtype("zombie", "zombie"));
        assert!(!h.is_subtype("zombie", "husk"));
        assert!(!h.is_subtype("villager", "monster"));
    }

    #[test]
    fn test_known() {
        let h = hierarchy();
        assert!(h.is_known("zombie"));
        assert!(h.is_known("minecraft:villager"));
        assert!(!h.is_known("creeper"));
        assert_eq!(h.len(), 4);
    }

    #[test]
    fn test_circular_inheritance() {
        let mut h = EntityHierarchy::new();
        let result = h.load_from_str(
            r#"
            [a]
            extends = "b"

            [b]
            extends = "a"
            "#,
        );
        assert!(matches!(result, Err(TaskError::CircularInheritance(_))));
    }

    #[test]
    fn test_register() {
        let mut h = EntityHierarchy::new();
        h.register("modded:wraith", Some("monster"));
        h.register("monster", None);
        assert!(h.is_subtype("modded:wraith", "minecraft:monster"));
        assert!(!h.is_subtype("wraith", "monster"));
    }
}
