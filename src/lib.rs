//! Per-player quest task tracking.
//!
//! Hunt, interact, crafting and meeting tasks match game events against their
//! configured targets, count progress per player and persist it as mergeable
//! documents.

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod quest;
pub mod task;

pub use catalog::Catalog;
pub use config::ServerConfig;
pub use db::Database;
pub use error::TaskError;
pub use quest::{DirtyQuests, Quest, QuestBook, QuestCache};
pub use task::{PlayerId, Task, TaskConfig, TaskEvent, TaskEventResult, TaskView};
