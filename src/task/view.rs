//! Task Progress Views
//!
//! Declarative description of a task's progress for one player. Rendering is
//! left to whoever consumes it; `Display` gives a plain-text fallback.

use std::fmt;

use serde::Serialize;

use crate::catalog::ItemStack;

/// One progress row ("minecraft:zombie 2/3")
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewLine {
    pub label: String,
    pub current: i32,
    pub required: i32,
}

impl ViewLine {
    pub fn new(label: &str, current: i32, required: i32) -> Self {
        Self {
            label: label.to_string(),
            current,
            required,
        }
    }

    pub fn is_done(&self) -> bool {
        self.current >= self.required
    }
}

/// A configuration switch shown as a tick or cross
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewFlag {
    pub label: &'static str,
    pub enabled: bool,
}

impl ViewFlag {
    pub fn new(label: &'static str, enabled: bool) -> Self {
        Self { label, enabled }
    }
}

/// One reward row ("minecraft:diamond x3")
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewardLine {
    pub label: String,
    pub count: i32,
}

impl RewardLine {
    pub fn new(item: &ItemStack) -> Self {
        Self {
            label: item.label(),
            count: item.count,
        }
    }
}

impl fmt::Display for RewardLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x{}", self.label, self.count)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskView {
    pub title: String,
    pub translation_key: String,
    pub complete: bool,
    pub lines: Vec<ViewLine>,
    pub flags: Vec<ViewFlag>,
}

impl fmt::Display for TaskView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        for line in &self.lines {
            let status = if self.complete || line.is_done() {
                "complete"
            } else {
                "incomplete"
            };
            writeln!(f, "  {} {}/{} [{}]", line.label, line.current, line.required, status)?;
        }
        for flag in &self.flags {
            let mark = if flag.enabled { "x" } else { " " };
            writeln!(f, "  [{}] {}", mark, flag.label)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TaskView {
        TaskView {
            title: "Craft".to_string(),
            translation_key: "questing.task.crafting".to_string(),
            complete: false,
            lines: vec![ViewLine::new("stick", 4, 4), ViewLine::new("torch", 1, 4)],
            flags: vec![ViewFlag::new("crafting", true), ViewFlag::new("anvil", false)],
        }
    }

    #[test]
    fn test_reward_line() {
        let line = RewardLine::new(&ItemStack::new("diamond", 3));
        assert_eq!(line.to_string(), "minecraft:diamond x3");
    }

    #[test]
    fn test_display() {
        let text = sample().to_string();
        assert!(text.starts_with("Craft\n"));
        assert!(text.contains("  stick 4/4 [complete]\n"));
        assert!(text.contains("  torch 1/4 [incomplete]\n"));
        assert!(text.contains("  [x] crafting\n"));
        assert!(text.contains("  [ ] anvil\n"));
    }
}
