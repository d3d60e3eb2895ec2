#![deny(warnings)]

//! Game rules for Study Quest: rewards, level-up normalization and
//! achievement evaluation.
//!
//! The rules are plain data ([`Rules`]) with defaults matching the shipped
//! `assets/rules.yaml`. Every function here is pure over a [`Profile`]; the
//! notices it returns are applied to a display surface by the caller.

use quest_core::{Achievement, Notice, Profile, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

mod transition;

pub use transition::{apply, preflight_remove_subject, Command, ProfileUpdate, Refresh, Transition};

/// Errors loading or validating a rules file.
#[derive(Debug, Error)]
pub enum RulesError {
    #[error("io error reading rules: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid rules yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// A zero threshold would make level-up normalization loop forever.
    #[error("xp_to_level_up must be > 0")]
    ZeroThreshold,
    #[error("duplicate achievement id: {0}")]
    DuplicateAchievement(String),
    #[error("achievement {0} has no requirement")]
    NoRequirement(String),
    /// A zero requirement would unlock before any progress.
    #[error("achievement {0} has a zero requirement")]
    ZeroRequirement(String),
}

/// Reward constants and the achievement catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rules {
    pub xp_per_task: u32,
    pub gold_per_task: u64,
    pub xp_to_level_up: u32,
    /// Evaluated in order.
    pub achievements: Vec<Achievement>,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            xp_per_task: 100,
            gold_per_task: 50,
            xp_to_level_up: 500,
            achievements: default_achievements(),
        }
    }
}

fn achievement(
    id: &str,
    task_requirement: Option<u64>,
    level_requirement: Option<u32>,
    name: &str,
    message: &str,
) -> Achievement {
    Achievement {
        id: id.to_string(),
        task_requirement,
        level_requirement,
        name: name.to_string(),
        message: message.to_string(),
    }
}

/// The built-in achievement catalog.
pub fn default_achievements() -> Vec<Achievement> {
    vec![
        achievement(
            "first_quest",
            Some(1),
            None,
            "Primeira Missão",
            "Você deu o primeiro passo! A jornada é longa, mas gratificante.",
        ),
        achievement(
            "apprentice",
            Some(5),
            None,
            "Aprendiz Dedicado",
            "Sua dedicação é notável. Mantenha o foco!",
        ),
        achievement(
            "journeyman",
            Some(10),
            None,
            "Viajante do Conhecimento",
            "Dez tarefas concluídas! Você é um verdadeiro viajante.",
        ),
        achievement(
            "level_5",
            None,
            Some(5),
            "Mundo Novo Desbloqueado",
            "Nível 5 alcançado! O mundo de estudo se expandiu. Veja a nova paisagem!",
        ),
    ]
}

impl Rules {
    /// Parse and validate rules from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, RulesError> {
        let rules: Rules = serde_yaml::from_str(text)?;
        rules.validate()?;
        Ok(rules)
    }

    /// Read rules from a YAML file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, RulesError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<(), RulesError> {
        if self.xp_to_level_up == 0 {
            return Err(RulesError::ZeroThreshold);
        }
        let mut ids = BTreeSet::new();
        for a in &self.achievements {
            if !ids.insert(a.id.as_str()) {
                return Err(RulesError::DuplicateAchievement(a.id.clone()));
            }
            if a.task_requirement.is_none() && a.level_requirement.is_none() {
                return Err(RulesError::NoRequirement(a.id.clone()));
            }
            if a.task_requirement == Some(0) || a.level_requirement == Some(0) {
                return Err(RulesError::ZeroRequirement(a.id.clone()));
            }
        }
        Ok(())
    }

    /// Fraction of the way to the next level, in [0, 1).
    pub fn xp_ratio(&self, profile: &Profile) -> f32 {
        profile.xp.min(self.xp_to_level_up) as f32 / self.xp_to_level_up as f32
    }
}

/// Convert surplus xp into levels, one notice per level gained.
pub fn normalize_level(profile: &mut Profile, xp_to_level_up: u32) -> Vec<Notice> {
    let mut notices = Vec::new();
    if xp_to_level_up == 0 {
        return notices;
    }
    while profile.xp >= xp_to_level_up {
        profile.level = profile.level.saturating_add(1);
        profile.xp -= xp_to_level_up;
        notices.push(Notice::LevelUp {
            level: profile.level,
        });
    }
    notices
}

/// Fold surplus xp into levels in one step, without notices. Returns the
/// number of levels gained. Used on load, where a stored xp can be
/// arbitrarily large.
pub fn absorb_surplus_xp(profile: &mut Profile, xp_to_level_up: u32) -> u32 {
    if xp_to_level_up == 0 {
        return 0;
    }
    let gained = profile.xp / xp_to_level_up;
    profile.level = profile.level.saturating_add(gained);
    profile.xp %= xp_to_level_up;
    gained
}

/// Unlock every catalog entry whose requirement is met and that is not yet
/// unlocked. Re-running with no state change unlocks nothing.
pub fn evaluate_achievements(profile: &mut Profile, catalog: &[Achievement]) -> Vec<Notice> {
    let mut notices = Vec::new();
    for def in catalog {
        if profile.has_achievement(&def.id) {
            continue;
        }
        if def.is_met(profile.tasks_completed, profile.level) {
            debug!(id = %def.id, "achievement unlocked");
            profile.achievements.push(def.clone());
            notices.push(Notice::AchievementUnlocked {
                name: def.name.clone(),
                message: def.message.clone(),
            });
        }
    }
    notices
}

/// A task id derived from the clock, bumped past existing ids on collision.
pub fn next_task_id(profile: &Profile, now_millis: u64) -> TaskId {
    match profile.max_task_id() {
        Some(max) if now_millis <= max => profile.free_task_id(),
        _ => now_millis,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::path::PathBuf;

    #[test]
    fn shipped_rules_match_defaults() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../assets/rules.yaml");
        let rules = Rules::from_path(&path).unwrap();
        assert_eq!(rules, Rules::default());
    }

    #[test]
    fn rejects_zero_threshold_and_duplicates() {
        let yaml = "xp_per_task: 1\ngold_per_task: 1\nxp_to_level_up: 0\nachievements: []\n";
        assert!(matches!(
            Rules::from_yaml_str(yaml),
            Err(RulesError::ZeroThreshold)
        ));

        let mut rules = Rules::default();
        rules.achievements.push(rules.achievements[0].clone());
        assert!(matches!(
            rules.validate(),
            Err(RulesError::DuplicateAchievement(id)) if id == "first_quest"
        ));

        let mut rules = Rules::default();
        rules.achievements[0].task_requirement = None;
        assert!(matches!(rules.validate(), Err(RulesError::NoRequirement(_))));
    }

    #[test]
    fn rejects_zero_requirement() {
        let mut rules = Rules::default();
        rules.achievements[1].task_requirement = Some(0);
        assert!(matches!(
            rules.validate(),
            Err(RulesError::ZeroRequirement(id)) if id == "apprentice"
        ));

        let mut rules = Rules::default();
        rules.achievements[3].level_requirement = Some(0);
        assert!(matches!(
            rules.validate(),
            Err(RulesError::ZeroRequirement(_))
        ));
    }

    #[test]
    fn level_up_from_450_plus_reward() {
        let mut p = Profile {
            xp: 450 + 100,
            ..Profile::default()
        };
        let notices = normalize_level(&mut p, 500);
        assert_eq!(p.level, 2);
        assert_eq!(p.xp, 50);
        assert_eq!(notices, vec![Notice::LevelUp { level: 2 }]);
    }

    #[test]
    fn multi_level_jump() {
        let mut p = Profile {
            xp: 1_600,
            ..Profile::default()
        };
        let notices = normalize_level(&mut p, 500);
        assert_eq!(p.level, 4);
        assert_eq!(p.xp, 100);
        assert_eq!(notices.len(), 3);
    }

    #[test]
    fn absorbing_max_xp_is_arithmetic() {
        let mut p = Profile {
            xp: u32::MAX,
            ..Profile::default()
        };
        let gained = absorb_surplus_xp(&mut p, 500);
        assert_eq!(gained, 8_589_934);
        assert_eq!(p.level, 8_589_935);
        assert_eq!(p.xp, 295);
        assert_eq!(absorb_surplus_xp(&mut p, 500), 0);
    }

    #[test]
    fn achievements_are_idempotent() {
        let mut p = Profile {
            tasks_completed: 10,
            level: 5,
            ..Profile::default()
        };
        let catalog = default_achievements();
        let first = evaluate_achievements(&mut p, &catalog);
        assert_eq!(first.len(), 4);
        let ids: Vec<_> = p.achievements.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["first_quest", "apprentice", "journeyman", "level_5"]);
        let second = evaluate_achievements(&mut p, &catalog);
        assert!(second.is_empty());
        assert_eq!(p.achievements.len(), 4);
    }

    #[test]
    fn next_id_avoids_collisions() {
        let p = Profile::default();
        assert_eq!(next_task_id(&p, 1_700_000_000_000), 1_700_000_000_000);
        assert_eq!(next_task_id(&p, 2), 3);
        let empty = Profile {
            active_tasks: vec![],
            ..Profile::default()
        };
        assert_eq!(next_task_id(&empty, 0), 0);
    }

    #[test]
    fn next_id_past_u64_max_fills_a_gap() {
        let mut p = Profile::default();
        p.active_tasks[0].id = TaskId::MAX;
        let id = next_task_id(&p, 1_700_000_000_000);
        assert!(p.active_tasks.iter().all(|t| t.id != id));
        assert_eq!(id, 0);
    }

    #[test]
    fn xp_ratio_is_fractional() {
        let rules = Rules::default();
        let p = Profile {
            xp: 250,
            ..Profile::default()
        };
        assert!((rules.xp_ratio(&p) - 0.5).abs() < f32::EPSILON);
    }

    proptest! {
        #[test]
        fn xp_always_below_threshold(start in 0u32..10_000, threshold in 1u32..2_000) {
            let mut p = Profile { xp: start, ..Profile::default() };
            let gained = normalize_level(&mut p, threshold);
            prop_assert!(p.xp < threshold);
            prop_assert_eq!(gained.len() as u32, p.level - 1);
            prop_assert_eq!((p.level - 1) * threshold + p.xp, start);
        }

        #[test]
        fn absorbing_matches_the_reward_loop(start in 0u32..10_000, threshold in 1u32..2_000) {
            let mut looped = Profile { xp: start, ..Profile::default() };
            let mut absorbed = looped.clone();
            let notices = normalize_level(&mut looped, threshold);
            prop_assert_eq!(absorb_surplus_xp(&mut absorbed, threshold) as usize, notices.len());
            prop_assert_eq!(looped, absorbed);
        }
    }
}
