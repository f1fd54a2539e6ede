//! Quest System Module
//!
//! TOML quest definitions grouping tasks, the book that owns their progress,
//! dirty tracking for persistence, and hot reload of definitions.

pub mod book;
pub mod cache;
pub mod definition;
pub mod watcher;

pub use book::{QuestBook, ReloadSummary};
pub use cache::{DirtyQuests, QuestCache};
pub use definition::{Quest, QuestView, RawQuest, RawQuestFile};
pub use watcher::{HotReloadEvent, start_file_watcher};
