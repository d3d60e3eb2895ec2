//! Pure profile transitions: profile + command in, profile + notices out.

use crate::{evaluate_achievements, normalize_level, Rules};
use quest_core::{Notice, Profile, Task, TaskId, GENERAL_SUBJECT};
use tracing::debug;

/// Profile fields editable by the player.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    /// Ignored when blank after trimming.
    pub name: String,
    pub player_class: String,
    pub gear: Option<String>,
}

/// A single player action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    CompleteTask { task_id: Option<TaskId> },
    AddSubject { name: String },
    /// Confirmation is the caller's concern and happens before this runs.
    RemoveSubject { name: String },
    AddTask {
        id: TaskId,
        description: String,
        subject: String,
    },
    UpdateProfile(ProfileUpdate),
}

/// Views a renderer should redraw after a transition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Refresh {
    /// Name, level, gold, class/gear, xp bar and achievements.
    pub status: bool,
    pub tasks: bool,
    /// Task-creation choices and the subject-management list.
    pub subjects: bool,
}

impl Refresh {
    pub const NONE: Refresh = Refresh {
        status: false,
        tasks: false,
        subjects: false,
    };
    pub const ALL: Refresh = Refresh {
        status: true,
        tasks: true,
        subjects: true,
    };
}

/// Result of applying a command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub profile: Profile,
    /// In emission order; the last one is what a single-message display shows.
    pub notices: Vec<Notice>,
    /// False when the command was rejected and `profile` is unchanged.
    pub committed: bool,
    pub refresh: Refresh,
}

impl Transition {
    fn rejected(profile: &Profile, notice: Notice) -> Self {
        Self {
            profile: profile.clone(),
            notices: vec![notice],
            committed: false,
            refresh: Refresh::NONE,
        }
    }

    fn committed(profile: Profile, notices: Vec<Notice>, refresh: Refresh) -> Self {
        Self {
            profile,
            notices,
            committed: true,
            refresh,
        }
    }
}

/// The rejection a subject removal would produce, if any. Checked before the
/// player is asked to confirm.
pub fn preflight_remove_subject(profile: &Profile, name: &str) -> Option<Notice> {
    if name == GENERAL_SUBJECT {
        return Some(Notice::SubjectProtected);
    }
    if !profile.has_subject(name) {
        return Some(Notice::SubjectUnknown {
            name: name.to_string(),
        });
    }
    None
}

/// Apply one command to a profile.
pub fn apply(profile: &Profile, command: Command, rules: &Rules) -> Transition {
    debug!(?command, "applying command");
    match command {
        Command::CompleteTask { task_id } => complete_task(profile, task_id, rules),
        Command::AddSubject { name } => add_subject(profile, &name),
        Command::RemoveSubject { name } => remove_subject(profile, &name),
        Command::AddTask {
            id,
            description,
            subject,
        } => add_task(profile, id, &description, &subject),
        Command::UpdateProfile(update) => update_profile(profile, update),
    }
}

fn complete_task(profile: &Profile, task_id: Option<TaskId>, rules: &Rules) -> Transition {
    let mut next = profile.clone();
    next.xp = next.xp.saturating_add(rules.xp_per_task);
    next.gold = next.gold.saturating_add(rules.gold_per_task);
    next.tasks_completed = next.tasks_completed.saturating_add(1);
    let mut notices = vec![Notice::TaskCompleted {
        xp: rules.xp_per_task,
        gold: rules.gold_per_task,
    }];

    if let Some(id) = task_id {
        if let Some(pos) = next.active_tasks.iter().position(|t| t.id == id) {
            next.active_tasks.remove(pos);
        }
    }

    notices.extend(normalize_level(&mut next, rules.xp_to_level_up));
    notices.extend(evaluate_achievements(&mut next, &rules.achievements));
    Transition::committed(next, notices, Refresh::ALL)
}

fn add_subject(profile: &Profile, name: &str) -> Transition {
    let name = name.trim();
    if name.is_empty() {
        return Transition::rejected(profile, Notice::SubjectNameMissing);
    }
    if profile.has_subject(name) {
        return Transition::rejected(
            profile,
            Notice::SubjectExists {
                name: name.to_string(),
            },
        );
    }
    let mut next = profile.clone();
    next.subjects.push(name.to_string());
    Transition::committed(
        next,
        vec![Notice::SubjectAdded {
            name: name.to_string(),
        }],
        Refresh {
            subjects: true,
            ..Refresh::NONE
        },
    )
}

fn remove_subject(profile: &Profile, name: &str) -> Transition {
    if let Some(rejection) = preflight_remove_subject(profile, name) {
        return Transition::rejected(profile, rejection);
    }
    let mut next = profile.clone();
    next.subjects.retain(|s| s != name);
    for task in next.active_tasks.iter_mut().filter(|t| t.subject == name) {
        task.subject = GENERAL_SUBJECT.to_string();
    }
    Transition::committed(
        next,
        vec![Notice::SubjectRemoved {
            name: name.to_string(),
        }],
        Refresh {
            tasks: true,
            subjects: true,
            ..Refresh::NONE
        },
    )
}

fn add_task(profile: &Profile, id: TaskId, description: &str, subject: &str) -> Transition {
    let description = description.trim();
    if description.is_empty() {
        return Transition::rejected(profile, Notice::TaskDescriptionMissing);
    }
    let subject = if profile.has_subject(subject.trim()) {
        subject.trim()
    } else {
        debug!(subject, "unknown subject, filing task under {}", GENERAL_SUBJECT);
        GENERAL_SUBJECT
    };
    let mut next = profile.clone();
    next.active_tasks.push(Task {
        id,
        description: description.to_string(),
        subject: subject.to_string(),
    });
    Transition::committed(
        next,
        vec![Notice::TaskAdded {
            subject: subject.to_string(),
        }],
        Refresh {
            tasks: true,
            ..Refresh::NONE
        },
    )
}

fn update_profile(profile: &Profile, update: ProfileUpdate) -> Transition {
    let mut next = profile.clone();
    let name = update.name.trim();
    if !name.is_empty() {
        next.name = name.to_string();
    }
    next.player_class = update.player_class;
    next.gear = update.gear;
    let notice = Notice::ProfileUpdated {
        gear: next.gear.clone(),
    };
    Transition::committed(next, vec![notice], Refresh::ALL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn run(profile: &Profile, command: Command) -> Transition {
        apply(profile, command, &Rules::default())
    }

    fn complete(profile: &Profile) -> Profile {
        run(profile, Command::CompleteTask { task_id: None }).profile
    }

    #[test]
    fn complete_task_rewards_and_removes_first_match() {
        let mut p = Profile::default();
        p.active_tasks.push(Task {
            id: 1,
            description: "dup".into(),
            subject: "Geral".into(),
        });
        let t = run(&p, Command::CompleteTask { task_id: Some(1) });
        assert!(t.committed);
        assert_eq!(t.profile.xp, 100);
        assert_eq!(t.profile.gold, 50);
        assert_eq!(t.profile.tasks_completed, 1);
        let ids: Vec<_> = t.profile.active_tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, [2, 1]);
        assert_eq!(t.notices[0], Notice::TaskCompleted { xp: 100, gold: 50 });
        assert_eq!(t.refresh, Refresh::ALL);
    }

    #[test]
    fn complete_unknown_task_still_rewards() {
        let p = Profile::default();
        let t = run(&p, Command::CompleteTask { task_id: Some(99) });
        assert_eq!(t.profile.active_tasks, p.active_tasks);
        assert_eq!(t.profile.tasks_completed, 1);
    }

    #[test]
    fn level_up_runs_before_achievements() {
        let p = Profile {
            level: 4,
            xp: 450,
            tasks_completed: 20,
            ..Profile::default()
        };
        let t = run(&p, Command::CompleteTask { task_id: None });
        assert_eq!(t.profile.level, 5);
        assert_eq!(t.profile.xp, 50);
        assert!(t.profile.has_achievement("level_5"));
        assert_eq!(t.notices[1], Notice::LevelUp { level: 5 });
        assert!(matches!(
            t.notices.last(),
            Some(Notice::AchievementUnlocked { name, .. }) if name == "Mundo Novo Desbloqueado"
        ));
    }

    #[test]
    fn fifth_completion_unlocks_apprentice_once() {
        let mut p = Profile::default();
        for _ in 0..5 {
            p = complete(&p);
        }
        let count = p.achievements.iter().filter(|a| a.id == "apprentice").count();
        assert_eq!(count, 1);
        p = complete(&p);
        let count = p.achievements.iter().filter(|a| a.id == "apprentice").count();
        assert_eq!(count, 1);
    }

    #[test]
    fn add_subject_trims_and_rejects_duplicates() {
        let p = Profile::default();
        let t = run(
            &p,
            Command::AddSubject {
                name: "  Física ".into(),
            },
        );
        assert!(t.committed);
        assert_eq!(t.profile.subjects.last().map(String::as_str), Some("Física"));
        assert!(t.refresh.subjects && !t.refresh.tasks);

        let t = run(
            &p,
            Command::AddSubject {
                name: "Código".into(),
            },
        );
        assert!(!t.committed);
        assert_eq!(t.profile.subjects, p.subjects);
        assert!(t.notices[0].is_rejection());

        let t = run(&p, Command::AddSubject { name: "   ".into() });
        assert_eq!(t.notices, vec![Notice::SubjectNameMissing]);
    }

    #[test]
    fn subject_match_is_case_sensitive() {
        let t = run(
            &Profile::default(),
            Command::AddSubject {
                name: "código".into(),
            },
        );
        assert!(t.committed);
    }

    #[test]
    fn general_subject_is_protected() {
        let p = Profile::default();
        let t = run(
            &p,
            Command::RemoveSubject {
                name: GENERAL_SUBJECT.into(),
            },
        );
        assert!(!t.committed);
        assert_eq!(t.profile.subjects, p.subjects);
        assert_eq!(t.notices, vec![Notice::SubjectProtected]);
    }

    #[test]
    fn removing_subject_moves_tasks_to_general() {
        let p = Profile::default();
        let t = run(
            &p,
            Command::RemoveSubject {
                name: "Matemática".into(),
            },
        );
        assert!(t.committed);
        assert!(!t.profile.has_subject("Matemática"));
        let task = t.profile.active_tasks.iter().find(|t| t.id == 2).unwrap();
        assert_eq!(task.subject, GENERAL_SUBJECT);
        assert_eq!(t.profile.active_tasks[0].subject, "Código");
    }

    #[test]
    fn removing_unknown_subject_is_rejected() {
        let p = Profile::default();
        assert_eq!(
            preflight_remove_subject(&p, "Física"),
            Some(Notice::SubjectUnknown {
                name: "Física".into()
            })
        );
        assert_eq!(preflight_remove_subject(&p, "História"), None);
    }

    #[test]
    fn add_task_rejects_blank_description() {
        let p = Profile::default();
        let t = run(
            &p,
            Command::AddTask {
                id: 10,
                description: " \t".into(),
                subject: "Código".into(),
            },
        );
        assert!(!t.committed);
        assert_eq!(t.profile.active_tasks, p.active_tasks);
        assert_eq!(t.notices, vec![Notice::TaskDescriptionMissing]);
    }

    #[test]
    fn add_task_appends_and_files_unknown_subject_under_general() {
        let p = Profile::default();
        let t = run(
            &p,
            Command::AddTask {
                id: 10,
                description: " Ler capítulo 3 ".into(),
                subject: "História".into(),
            },
        );
        let last = t.profile.active_tasks.last().unwrap();
        assert_eq!(last.description, "Ler capítulo 3");
        assert_eq!(last.subject, "História");

        let t = run(
            &p,
            Command::AddTask {
                id: 11,
                description: "x".into(),
                subject: "Química".into(),
            },
        );
        assert_eq!(t.profile.active_tasks.last().unwrap().subject, GENERAL_SUBJECT);
        assert_eq!(
            t.notices,
            vec![Notice::TaskAdded {
                subject: GENERAL_SUBJECT.into()
            }]
        );
    }

    #[test]
    fn blank_name_keeps_existing_name() {
        let p = Profile::default();
        let t = run(
            &p,
            Command::UpdateProfile(ProfileUpdate {
                name: "  ".into(),
                player_class: "Mago".into(),
                gear: Some("Cajado".into()),
            }),
        );
        assert!(t.committed);
        assert_eq!(t.profile.name, p.name);
        assert_eq!(t.profile.player_class, "Mago");
        assert_eq!(t.profile.gear.as_deref(), Some("Cajado"));
    }

    proptest! {
        #[test]
        fn xp_stays_normalized(steps in 0usize..60, start_xp in 0u32..500) {
            let mut p = Profile { xp: start_xp, ..Profile::default() };
            for _ in 0..steps {
                p = complete(&p);
                prop_assert!(p.xp < 500);
            }
            prop_assert_eq!(p.tasks_completed, steps as u64);
        }
    }
}
