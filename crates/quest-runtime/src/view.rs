//! Read models for a renderer. Nothing here mutates the profile.

use quest_core::{Profile, Task};
use quest_rules::Rules;

/// Player status line and xp bar.
#[derive(Clone, Debug, PartialEq)]
pub struct StatusView {
    pub name: String,
    pub level: u32,
    pub gold: u64,
    /// "class | gear", or just the class without gear.
    pub class_line: String,
    pub xp: u32,
    pub xp_to_level_up: u32,
    pub xp_ratio: f32,
}

pub fn status(profile: &Profile, rules: &Rules) -> StatusView {
    let class_line = match &profile.gear {
        Some(gear) => format!("{} | {}", profile.player_class, gear),
        None => profile.player_class.clone(),
    };
    StatusView {
        name: profile.name.clone(),
        level: profile.level,
        gold: profile.gold,
        class_line,
        xp: profile.xp,
        xp_to_level_up: rules.xp_to_level_up,
        xp_ratio: rules.xp_ratio(profile),
    }
}

/// Tasks of one subject, in insertion order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskGroup<'a> {
    pub subject: &'a str,
    pub tasks: Vec<&'a Task>,
}

/// Tasks grouped by subject in catalog order. Subjects without tasks are
/// omitted.
pub fn task_groups(profile: &Profile) -> Vec<TaskGroup<'_>> {
    profile
        .subjects
        .iter()
        .filter_map(|subject| {
            let tasks: Vec<&Task> = profile
                .active_tasks
                .iter()
                .filter(|t| &t.subject == subject)
                .collect();
            (!tasks.is_empty()).then_some(TaskGroup {
                subject: subject.as_str(),
                tasks,
            })
        })
        .collect()
}

/// Unlocked achievement names in unlock order.
pub fn achievement_names(profile: &Profile) -> Vec<&str> {
    profile.achievements.iter().map(|a| a.name.as_str()).collect()
}
