#![deny(warnings)]

//! Profile state manager for Study Quest.
//!
//! [`QuestManager`] owns the single profile instance and its store. Each
//! operation runs a pure transition from `quest-rules`, persists the result
//! when it committed, and hands the notices back as an [`Outcome`] for the
//! caller to publish to a display.

use persistence::{clear_profile, load_profile, save_profile, KvStore, StoreError};
use quest_core::{validate_profile, Notice, Profile, TaskId};
use quest_rules::{
    absorb_surplus_xp, apply, next_task_id, preflight_remove_subject, Command, ProfileUpdate,
    Refresh, Rules,
};
use tracing::{debug, info, warn};

pub mod view;

/// A display surface for notices.
pub trait Notifier {
    fn notify(&mut self, notice: &Notice);
}

/// Keeps only the most recent message.
#[derive(Debug, Default)]
pub struct LatestMessage {
    message: Option<String>,
}

impl LatestMessage {
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl Notifier for LatestMessage {
    fn notify(&mut self, notice: &Notice) {
        self.message = Some(notice.to_string());
    }
}

/// Yes/no gate for destructive actions.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> Confirm for F {
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// State changed and was persisted.
    Committed,
    /// Refused with a notice; nothing changed.
    Rejected,
    /// The confirmation gate declined; nothing changed.
    Cancelled,
}

/// What an operation did and what the player should see.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub status: Status,
    pub notices: Vec<Notice>,
    pub refresh: Refresh,
}

impl Outcome {
    fn rejected(notice: Notice) -> Self {
        Self {
            status: Status::Rejected,
            notices: vec![notice],
            refresh: Refresh::NONE,
        }
    }

    fn cancelled() -> Self {
        Self {
            status: Status::Cancelled,
            notices: Vec::new(),
            refresh: Refresh::NONE,
        }
    }

    /// Deliver notices in emission order.
    pub fn publish(&self, notifier: &mut dyn Notifier) {
        for notice in &self.notices {
            notifier.notify(notice);
        }
    }
}

/// Confirmation prompt for subject removal.
pub fn remove_subject_prompt(name: &str) -> String {
    format!("Tem certeza que deseja remover \"{name}\"? Missões serão movidas para 'Geral'.")
}

pub const RESET_PROMPT: &str =
    "ATENÇÃO: Você tem certeza que deseja reiniciar todo o seu progresso?";

/// Owner of the profile and its persistence.
pub struct QuestManager<S> {
    store: S,
    rules: Rules,
    profile: Profile,
}

impl<S: KvStore> QuestManager<S> {
    /// Load the saved profile, falling back to defaults.
    pub fn load(store: S, rules: Rules) -> Result<Self, StoreError> {
        let profile = load_checked(&store, &rules)?;
        Ok(Self {
            store,
            rules,
            profile,
        })
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn complete_task(&mut self, task_id: Option<TaskId>) -> Result<Outcome, StoreError> {
        self.run(Command::CompleteTask { task_id })
    }

    pub fn add_subject(&mut self, name: &str) -> Result<Outcome, StoreError> {
        self.run(Command::AddSubject {
            name: name.to_string(),
        })
    }

    /// Rejections are reported before the player is asked to confirm.
    pub fn remove_subject(
        &mut self,
        name: &str,
        confirm: &mut impl Confirm,
    ) -> Result<Outcome, StoreError> {
        if let Some(rejection) = preflight_remove_subject(&self.profile, name) {
            return Ok(Outcome::rejected(rejection));
        }
        if !confirm.confirm(&remove_subject_prompt(name)) {
            debug!(subject = name, "subject removal cancelled");
            return Ok(Outcome::cancelled());
        }
        self.run(Command::RemoveSubject {
            name: name.to_string(),
        })
    }

    pub fn add_task(&mut self, description: &str, subject: &str) -> Result<Outcome, StoreError> {
        let id = next_task_id(&self.profile, now_millis());
        self.run(Command::AddTask {
            id,
            description: description.to_string(),
            subject: subject.to_string(),
        })
    }

    pub fn update_profile(&mut self, update: ProfileUpdate) -> Result<Outcome, StoreError> {
        self.run(Command::UpdateProfile(update))
    }

    /// Drop the saved profile and start over from defaults.
    pub fn reset_progress(&mut self, confirm: &mut impl Confirm) -> Result<Outcome, StoreError> {
        if !confirm.confirm(RESET_PROMPT) {
            debug!("reset cancelled");
            return Ok(Outcome::cancelled());
        }
        clear_profile(&mut self.store)?;
        self.profile = load_checked(&self.store, &self.rules)?;
        info!("progress reset");
        Ok(Outcome {
            status: Status::Committed,
            notices: vec![Notice::ProgressReset],
            refresh: Refresh::ALL,
        })
    }

    fn run(&mut self, command: Command) -> Result<Outcome, StoreError> {
        let transition = apply(&self.profile, command, &self.rules);
        if !transition.committed {
            debug!(notices = ?transition.notices, "command rejected");
            return Ok(Outcome {
                status: Status::Rejected,
                notices: transition.notices,
                refresh: transition.refresh,
            });
        }
        // In-memory state only advances after a successful write.
        save_profile(&mut self.store, &transition.profile)?;
        self.profile = transition.profile;
        info!(
            level = self.profile.level,
            xp = self.profile.xp,
            gold = self.profile.gold,
            tasks = self.profile.active_tasks.len(),
            "profile saved"
        );
        Ok(Outcome {
            status: Status::Committed,
            notices: transition.notices,
            refresh: transition.refresh,
        })
    }
}

fn load_checked<S: KvStore>(store: &S, rules: &Rules) -> Result<Profile, StoreError> {
    let mut profile = load_profile(store)?;
    let gained = absorb_surplus_xp(&mut profile, rules.xp_to_level_up);
    if gained > 0 {
        warn!(levels = gained, "normalized surplus xp in saved profile");
    }
    if let Err(e) = validate_profile(&profile, rules.xp_to_level_up) {
        warn!(error = %e, "saved profile is inconsistent, repairing");
        for fix in profile.repair_catalog() {
            warn!(%fix, "repaired saved profile");
        }
        if let Err(e) = validate_profile(&profile, rules.xp_to_level_up) {
            warn!(error = %e, "saved profile could not be repaired, using defaults");
            profile = Profile::default();
        }
    }
    Ok(profile)
}

fn now_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}
