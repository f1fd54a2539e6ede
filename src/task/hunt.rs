//! Hunt Task
//!
//! Kill a number of entities of a given type.

use serde::{Deserialize, Serialize};

use super::events::{EntitySnapshot, TaskUpdate};
use super::progress::{PlayerId, ProgressStore};
use super::view::{TaskView, ViewFlag, ViewLine};
use super::{TaskContext, detect_threshold, entity_matches};
use crate::catalog::{EntityCatalog, TagCompound};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HuntConfig {
    /// Entity type to hunt
    pub target: String,
    pub required: i32,
    /// Accept subtypes of the target
    pub subtypes: bool,
    #[serde(rename = "ignoreNBT")]
    pub ignore_nbt: bool,
    /// Captured target data, compared partially when `ignore_nbt` is off
    #[serde(rename = "targetNBT")]
    pub target_nbt: TagCompound,
    /// Required damage source type; empty accepts any
    #[serde(rename = "damageType")]
    pub damage_type: String,
}

impl Default for HuntConfig {
    fn default() -> Self {
        Self {
            target: "minecraft:zombie".to_string(),
            required: 1,
            subtypes: true,
            ignore_nbt: true,
            target_nbt: TagCompound::new(),
            damage_type: String::new(),
        }
    }
}

impl HuntConfig {
    pub fn matches_kill(
        &self,
        entity: &EntitySnapshot,
        damage_type: Option<&str>,
        catalog: &dyn EntityCatalog,
    ) -> bool {
        if !self.damage_type.is_empty() {
            match damage_type {
                Some(source) if source.eq_ignore_ascii_case(&self.damage_type) => {}
                _ => return false,
            }
        }

        entity_matches(
            &self.target,
            self.subtypes,
            self.ignore_nbt,
            &self.target_nbt,
            entity,
            catalog,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HuntTask {
    pub config: HuntConfig,
    pub progress: ProgressStore<i32>,
}

impl HuntTask {
    pub fn new(config: HuntConfig) -> Self {
        Self {
            config,
            progress: ProgressStore::new(),
        }
    }

    pub fn on_killed(
        &mut self,
        player: PlayerId,
        entity: &EntitySnapshot,
        damage_type: Option<&str>,
        ctx: &mut TaskContext<'_>,
    ) -> Option<TaskUpdate> {
        if self.progress.is_complete(player) {
            return None;
        }
        if !self.config.matches_kill(entity, damage_type, ctx.entities) {
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
        let mut title = format!("Hunt {}", self.config.target);
        if !self.config.damage_type.is_empty() {
            title.push_str(&format!(" ({})", self.config.damage_type));
        }

        TaskView {
            title,
            translation_key: String::new(),
            complete: self.progress.is_complete(player),
            lines: vec![ViewLine::new(
                &self.config.target,
                self.progress.progress(player),
                self.config.required,
            )],
            flags: vec![
                ViewFlag::new("subtypes", self.config.subtypes),
                ViewFlag::new("ignore_nbt", self.config.ignore_nbt),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::test_support::Fixture;
    use serde_json::json;
    use uuid::Uuid;

    fn zombie_hunt(required: i32) -> HuntTask {
        HuntTask::new(HuntConfig {
            target: "zombie".to_string(),
            required,
            subtypes: true,
            ..HuntConfig::default()
        })
    }

    #[test]
    fn test_three_kills_complete() {
        let mut fixture = Fixture::new();
        let mut task = zombie_hunt(3);
        let player = Uuid::new_v4();
        let zombie = EntitySnapshot::new("minecraft:zombie");

        let first = task.on_killed(player, &zombie, None, &mut fixture.ctx()).unwrap();
        assert_eq!(first.progress, 1);
        assert!(!first.completed);

        task.on_killed(player, &zombie, None, &mut fixture.ctx()).unwrap();
        let third = task.on_killed(player, &zombie, None, &mut fixture.ctx()).unwrap();
        assert!(third.completed);
        assert!(task.progress.is_complete(player));
        assert_eq!(task.progress.progress(player), 3);

        // Fourth kill is ignored
        assert!(task.on_killed(player, &zombie, None, &mut fixture.ctx()).is_none());
        assert_eq!(task.progress.progress(player), 3);
    }

    #[test]
    fn test_subtypes() {
        let mut fixture = Fixture::new();
        let player = Uuid::new_v4();
        let husk = EntitySnapshot::new("husk");

        let mut loose = zombie_hunt(5);
        assert!(loose.on_killed(player, &husk, None, &mut fixture.ctx()).is_some());

        let mut strict = zombie_hunt(5);
        strict.config.subtypes = false;
        assert!(strict.on_killed(player, &husk, None, &mut fixture.ctx()).is_none());
        assert!(
            strict
                .on_killed(player, &EntitySnapshot::new("zombie"), None, &mut fixture.ctx())
                .is_some()
        );

        // Parents never count
        assert!(
            loose
                .on_killed(player, &EntitySnapshot::new("monster"), None, &mut fixture.ctx())
                .is_none()
        );
    }

    #[test]
    fn test_unknown_types_never_match() {
        let mut fixture = Fixture::new();
        let player = Uuid::new_v4();

        let mut task = zombie_hunt(1);
        assert!(
            task.on_killed(player, &EntitySnapshot::new("creeper"), None, &mut fixture.ctx())
                .is_none()
        );

        task.config.target = "minecraft:dragon".to_string();
        assert!(
            task.on_killed(player, &EntitySnapshot::new("zombie"), None, &mut fixture.ctx())
                .is_none()
        );
    }

    #[test]
    fn test_damage_type_filter() {
        let mut fixture = Fixture::new();
        let player = Uuid::new_v4();
        let zombie = EntitySnapshot::new("zombie");

        let mut task = zombie_hunt(5);
        task.config.damage_type = "arrow".to_string();

        assert!(task.on_killed(player, &zombie, None, &mut fixture.ctx()).is_none());
        assert!(task.on_killed(player, &zombie, Some("player"), &mut fixture.ctx()).is_none());
        assert!(task.on_killed(player, &zombie, Some("ARROW"), &mut fixture.ctx()).is_some());
    }

    #[test]
    fn test_target_nbt() {
        let mut fixture = Fixture::new();
        let player = Uuid::new_v4();

        let mut task = zombie_hunt(5);
        task.config.ignore_nbt = false;
        task.config.target_nbt = json!({"CustomName": "Boss"}).as_object().cloned().unwrap();

        let plain = EntitySnapshot::new("zombie");
        let boss = EntitySnapshot::new("zombie")
            .with_tags(json!({"CustomName": "Boss", "Health": 40}).as_object().cloned().unwrap());

        assert!(task.on_killed(player, &plain, None, &mut fixture.ctx()).is_none());
        assert!(task.on_killed(player, &boss, None, &mut fixture.ctx()).is_some());
    }

    #[test]
    fn test_marks_dirty() {
        let mut fixture = Fixture::new();
        let mut task = zombie_hunt(3);
        task.on_killed(Uuid::new_v4(), &EntitySnapshot::new("zombie"), None, &mut fixture.ctx());
        assert!(fixture.cache.is_dirty("test_quest"));
    }

    #[test]
    fn test_counter_saturates_at_max() {
        let mut fixture = Fixture::new();
        let mut task = zombie_hunt(5);
        task.config.required = i32::MAX;
        let player = Uuid::new_v4();
        task.progress.set_progress(player, i32::MAX);

        let update = task
            .on_killed(player, &EntitySnapshot::new("zombie"), None, &mut fixture.ctx())
            .unwrap();
        assert_eq!(update.progress, i32::MAX);
        assert!(update.completed);
    }

    #[test]
    fn test_view() {
        let mut fixture = Fixture::new();
        let mut task = zombie_hunt(3);
        let player = Uuid::new_v4();
        task.on_killed(player, &EntitySnapshot::new("zombie"), None, &mut fixture.ctx());

        let view = task.view(player);
        assert!(!view.complete);
        assert_eq!(view.lines[0].current, 1);
        assert_eq!(view.lines[0].required, 3);
    }
}
