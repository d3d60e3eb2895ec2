#![deny(warnings)]

//! Core domain models and invariants for Study Quest.
//!
//! This crate defines the serializable player profile shared by the rules,
//! persistence and runtime crates, together with the catalog repair and
//! validation helpers that keep it structurally sound.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

mod notice;

pub use notice::Notice;

/// Identifier of an active task. Legacy saves use small sequential values,
/// new tasks use a millisecond timestamp.
pub type TaskId = u64;

/// The permanent default subject. It can never be removed from the catalog.
pub const GENERAL_SUBJECT: &str = "Geral";

/// Subject catalog of a fresh profile.
pub const DEFAULT_SUBJECTS: [&str; 4] = ["Código", "Matemática", "História", "Geral"];

pub const DEFAULT_NAME: &str = "Herói";
pub const DEFAULT_CLASS: &str = "Aprendiz";
pub const DEFAULT_GEAR: &str = "Livro Sagrado";

/// A single pending unit of work.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique within a profile.
    pub id: TaskId,
    /// Free text, never empty.
    pub description: String,
    /// Must name an entry of [`Profile::subjects`].
    pub subject: String,
}

/// An achievement definition. Unlocked achievements are stored in the
/// profile as a copy of their definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    /// Stable identifier, e.g. "first_quest".
    pub id: String,
    /// Minimum number of completed tasks.
    #[serde(rename = "requirement", default, skip_serializing_if = "Option::is_none")]
    pub task_requirement: Option<u64>,
    /// Minimum player level.
    #[serde(
        rename = "requirement_level",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub level_requirement: Option<u32>,
    /// Display name.
    pub name: String,
    /// Message shown on unlock.
    pub message: String,
}

impl Achievement {
    /// Either requirement alone is sufficient.
    pub fn is_met(&self, tasks_completed: u64, level: u32) -> bool {
        let by_tasks = self
            .task_requirement
            .is_some_and(|req| tasks_completed >= req);
        let by_level = self.level_requirement.is_some_and(|req| level >= req);
        by_tasks || by_level
    }
}

/// Full persisted player state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub name: String,
    #[serde(rename = "class")]
    pub player_class: String,
    pub gear: Option<String>,
    /// Starts at 1, uncapped.
    pub level: u32,
    /// Remainder below the level-up threshold once normalized.
    pub xp: u32,
    pub gold: u64,
    /// Never decreases.
    pub tasks_completed: u64,
    /// Unlock order, unique by id.
    pub achievements: Vec<Achievement>,
    /// Catalog order, unique, always contains [`GENERAL_SUBJECT`].
    pub subjects: Vec<String>,
    /// Insertion order is display priority within a subject group.
    pub active_tasks: Vec<Task>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            player_class: DEFAULT_CLASS.to_string(),
            gear: Some(DEFAULT_GEAR.to_string()),
            level: 1,
            xp: 0,
            gold: 0,
            tasks_completed: 0,
            achievements: Vec::new(),
            subjects: default_subjects(),
            active_tasks: vec![
                Task {
                    id: 1,
                    description: "Revisar JS Básico".to_string(),
                    subject: "Código".to_string(),
                },
                Task {
                    id: 2,
                    description: "Resolver 5 Equações".to_string(),
                    subject: "Matemática".to_string(),
                },
            ],
        }
    }
}

fn free_id(used: &BTreeSet<TaskId>) -> TaskId {
    match used.last() {
        None => 0,
        Some(&max) => match max.checked_add(1) {
            Some(next) => next,
            None => (0..)
                .zip(used.iter())
                .find(|(candidate, id)| candidate != *id)
                .map_or(used.len() as TaskId, |(candidate, _)| candidate),
        },
    }
}

/// The default four-subject catalog as owned strings.
pub fn default_subjects() -> Vec<String> {
    DEFAULT_SUBJECTS.iter().map(|s| s.to_string()).collect()
}

impl Profile {
    pub fn has_subject(&self, subject: &str) -> bool {
        self.subjects.iter().any(|s| s == subject)
    }

    pub fn has_achievement(&self, id: &str) -> bool {
        self.achievements.iter().any(|a| a.id == id)
    }

    /// Largest task id in use, if any task exists.
    pub fn max_task_id(&self) -> Option<TaskId> {
        self.active_tasks.iter().map(|t| t.id).max()
    }

    /// An id no active task uses: one past the largest, or the smallest gap
    /// when the largest is `TaskId::MAX`.
    pub fn free_task_id(&self) -> TaskId {
        let used: BTreeSet<TaskId> = self.active_tasks.iter().map(|t| t.id).collect();
        free_id(&used)
    }

    /// Bring a possibly legacy profile back within the structural invariants.
    ///
    /// Returns one entry per fix applied, in the order applied. A profile that
    /// already satisfies the invariants is left untouched and yields nothing.
    pub fn repair_catalog(&mut self) -> Vec<Repair> {
        let mut fixes = Vec::new();

        if self.level == 0 {
            self.level = 1;
            fixes.push(Repair::RaisedLevel);
        }

        let mut seen = BTreeSet::new();
        self.subjects.retain(|s| {
            if s.trim().is_empty() {
                fixes.push(Repair::DroppedSubject(s.clone()));
                return false;
            }
            if !seen.insert(s.clone()) {
                fixes.push(Repair::DroppedSubject(s.clone()));
                return false;
            }
            true
        });
        if !self.has_subject(GENERAL_SUBJECT) {
            self.subjects.push(GENERAL_SUBJECT.to_string());
            seen.insert(GENERAL_SUBJECT.to_string());
            fixes.push(Repair::RestoredGeneralSubject);
        }

        let mut ids = BTreeSet::new();
        self.achievements.retain(|a| {
            if ids.insert(a.id.clone()) {
                true
            } else {
                fixes.push(Repair::DroppedAchievement(a.id.clone()));
                false
            }
        });

        self.active_tasks.retain(|t| {
            if t.description.trim().is_empty() {
                fixes.push(Repair::DroppedTask(t.id));
                false
            } else {
                true
            }
        });

        let mut used: BTreeSet<TaskId> = self.active_tasks.iter().map(|t| t.id).collect();
        let mut seen_ids = BTreeSet::new();
        for task in &mut self.active_tasks {
            if !seen_ids.insert(task.id) {
                let fresh = free_id(&used);
                fixes.push(Repair::ReissuedTaskId {
                    from: task.id,
                    to: fresh,
                });
                task.id = fresh;
                used.insert(fresh);
                seen_ids.insert(fresh);
            }
        }

        for task in &mut self.active_tasks {
            if !seen.contains(&task.subject) {
                fixes.push(Repair::ReassignedTask {
                    id: task.id,
                    from: std::mem::replace(&mut task.subject, GENERAL_SUBJECT.to_string()),
                });
            }
        }

        fixes
    }
}

/// A single fix performed by [`Profile::repair_catalog`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Repair {
    RaisedLevel,
    DroppedSubject(String),
    RestoredGeneralSubject,
    DroppedAchievement(String),
    DroppedTask(TaskId),
    ReissuedTaskId { from: TaskId, to: TaskId },
    ReassignedTask { id: TaskId, from: String },
}

impl fmt::Display for Repair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repair::RaisedLevel => write!(f, "raised level 0 to 1"),
            Repair::DroppedSubject(s) => write!(f, "dropped blank or duplicate subject {s:?}"),
            Repair::RestoredGeneralSubject => {
                write!(f, "restored missing subject {GENERAL_SUBJECT:?}")
            }
            Repair::DroppedAchievement(id) => write!(f, "dropped duplicate achievement {id}"),
            Repair::DroppedTask(id) => write!(f, "dropped task {id} with empty description"),
            Repair::ReissuedTaskId { from, to } => {
                write!(f, "reissued duplicate task id {from} as {to}")
            }
            Repair::ReassignedTask { id, from } => {
                write!(f, "moved task {id} from unknown subject {from:?} to {GENERAL_SUBJECT:?}")
            }
        }
    }
}

/// Validation errors for profile invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("subject catalog is missing \"Geral\"")]
    MissingGeneralSubject,
    #[error("blank subject in catalog")]
    BlankSubject,
    #[error("duplicate subject: {0}")]
    DuplicateSubject(String),
    #[error("level must be >= 1")]
    LevelZero,
    /// xp was left at or above the level-up threshold.
    #[error("xp {xp} is not below the level-up threshold {threshold}")]
    XpNotNormalized { xp: u32, threshold: u32 },
    #[error("duplicate achievement: {0}")]
    DuplicateAchievement(String),
    #[error("duplicate task id: {0}")]
    DuplicateTaskId(TaskId),
    #[error("task {0} has an empty description")]
    EmptyDescription(TaskId),
    #[error("task {id} references unknown subject {subject:?}")]
    UnknownSubject { id: TaskId, subject: String },
}

/// Validate a profile against its structural invariants.
pub fn validate_profile(profile: &Profile, xp_threshold: u32) -> Result<(), ValidationError> {
    if profile.level == 0 {
        return Err(ValidationError::LevelZero);
    }
    if profile.xp >= xp_threshold {
        return Err(ValidationError::XpNotNormalized {
            xp: profile.xp,
            threshold: xp_threshold,
        });
    }

    let mut subjects: BTreeSet<&str> = BTreeSet::new();
    for s in &profile.subjects {
        if s.trim().is_empty() {
            return Err(ValidationError::BlankSubject);
        }
        if !subjects.insert(s.as_str()) {
            return Err(ValidationError::DuplicateSubject(s.clone()));
        }
    }
    if !subjects.contains(GENERAL_SUBJECT) {
        return Err(ValidationError::MissingGeneralSubject);
    }

    let mut achievements = BTreeSet::new();
    for a in &profile.achievements {
        if !achievements.insert(a.id.as_str()) {
            return Err(ValidationError::DuplicateAchievement(a.id.clone()));
        }
    }

    let mut ids = BTreeSet::new();
    for t in &profile.active_tasks {
        if !ids.insert(t.id) {
            return Err(ValidationError::DuplicateTaskId(t.id));
        }
        if t.description.trim().is_empty() {
            return Err(ValidationError::EmptyDescription(t.id));
        }
        if !subjects.contains(t.subject.as_str()) {
            return Err(ValidationError::UnknownSubject {
                id: t.id,
                subject: t.subject.clone(),
            });
        }
    }
    Ok(())
}
