#![deny(warnings)]

//! Terminal front end: one player action per invocation.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use persistence::FileStore;
use quest_core::{Profile, TaskId, GENERAL_SUBJECT};
use quest_rules::{ProfileUpdate, Refresh, Rules};
use quest_runtime::{view, Confirm, LatestMessage, Outcome, QuestManager, Status};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "study-quest", version, about = "Gamified study task list")]
struct Args {
    /// Directory holding the saved profile.
    #[arg(long, env = "STUDY_QUEST_DIR", default_value = persistence::default_data_dir())]
    data_dir: PathBuf,
    /// YAML file overriding rewards and achievements.
    #[arg(long)]
    rules: Option<PathBuf>,
    /// Approve destructive actions without asking.
    #[arg(short, long)]
    yes: bool,
    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Show status, tasks and achievements.
    Status,
    /// Complete a task by id, or log an untracked one.
    Complete { id: Option<TaskId> },
    /// Register a new task.
    AddTask {
        #[arg(short, long, default_value = GENERAL_SUBJECT)]
        subject: String,
        #[arg(required = true)]
        description: Vec<String>,
    },
    AddSubject { name: String },
    RemoveSubject { name: String },
    /// List the subject catalog.
    Subjects,
    Achievements,
    /// Edit name, class and gear.
    Profile {
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long)]
        class: Option<String>,
        #[arg(long, conflicts_with = "no_gear")]
        gear: Option<String>,
        #[arg(long)]
        no_gear: bool,
    },
    /// Erase all progress.
    Reset,
}

struct TerminalConfirm {
    assume_yes: bool,
}

impl Confirm for TerminalConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        print!("{prompt} [s/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line).is_err() {
            return false;
        }
        matches!(
            line.trim().to_lowercase().as_str(),
            "s" | "sim" | "y" | "yes"
        )
    }
}

fn print_status(profile: &Profile, rules: &Rules) {
    let s = view::status(profile, rules);
    let filled = (s.xp_ratio * 20.0).round() as usize;
    println!("{} | Nível {} | Ouro {}", s.name, s.level, s.gold);
    println!("{}", s.class_line);
    println!(
        "[{}{}] {} / {} XP",
        "#".repeat(filled),
        "-".repeat(20usize.saturating_sub(filled)),
        s.xp,
        s.xp_to_level_up
    );
}

fn print_tasks(profile: &Profile) {
    let groups = view::task_groups(profile);
    if groups.is_empty() {
        println!("Nenhuma missão ativa. Crie uma com `add-task`!");
        return;
    }
    for group in groups {
        println!("{} ({})", group.subject, group.tasks.len());
        for task in group.tasks {
            println!("  [{}] {}", task.id, task.description);
        }
    }
}

fn print_subjects(profile: &Profile) {
    for subject in &profile.subjects {
        println!("- {subject}");
    }
}

fn print_achievements(profile: &Profile) {
    let names = view::achievement_names(profile);
    if names.is_empty() {
        println!("Nenhuma conquista ainda.");
    }
    for name in names {
        println!("★ {name}");
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Section {
    Status,
    Tasks,
    Subjects,
}

/// Sections to redraw, in print order.
fn sections(refresh: Refresh) -> Vec<Section> {
    let Refresh {
        status,
        tasks,
        subjects,
    } = refresh;
    [
        (status, Section::Status),
        (tasks, Section::Tasks),
        (subjects, Section::Subjects),
    ]
    .into_iter()
    .filter_map(|(on, section)| on.then_some(section))
    .collect()
}

fn render(manager: &QuestManager<FileStore>, outcome: &Outcome) {
    let mut display = LatestMessage::default();
    outcome.publish(&mut display);
    if let Some(message) = display.message() {
        println!("> {message}");
    }
    let profile = manager.profile();
    for section in sections(outcome.refresh) {
        match section {
            Section::Status => {
                print_status(profile, manager.rules());
                print_achievements(profile);
            }
            Section::Tasks => print_tasks(profile),
            Section::Subjects => print_subjects(profile),
        }
    }
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    info!(data_dir = %args.data_dir.display(), rules = ?args.rules, "starting CLI");

    let rules = match &args.rules {
        Some(path) => Rules::from_path(path)
            .with_context(|| format!("failed to load rules from {}", path.display()))?,
        None => Rules::default(),
    };
    let store = FileStore::new(&args.data_dir);
    let mut manager = QuestManager::load(store, rules).context("failed to load profile")?;
    let mut confirm = TerminalConfirm {
        assume_yes: args.yes,
    };

    let outcome = match args.command.unwrap_or(Cmd::Status) {
        Cmd::Status => {
            let profile = manager.profile();
            print_status(profile, manager.rules());
            print_tasks(profile);
            print_achievements(profile);
            return Ok(());
        }
        Cmd::Subjects => {
            print_subjects(manager.profile());
            return Ok(());
        }
        Cmd::Achievements => {
            print_achievements(manager.profile());
            return Ok(());
        }
        Cmd::Complete { id } => manager.complete_task(id)?,
        Cmd::AddTask {
            subject,
            description,
        } => manager.add_task(&description.join(" "), &subject)?,
        Cmd::AddSubject { name } => manager.add_subject(&name)?,
        Cmd::RemoveSubject { name } => manager.remove_subject(&name, &mut confirm)?,
        Cmd::Profile {
            name,
            class,
            gear,
            no_gear,
        } => {
            let current = manager.profile();
            let update = ProfileUpdate {
                name,
                player_class: class.unwrap_or_else(|| current.player_class.clone()),
                gear: match (gear, no_gear) {
                    (_, true) => None,
                    (Some(g), false) => Some(g),
                    (None, false) => current.gear.clone(),
                },
            };
            manager.update_profile(update)?
        }
        Cmd::Reset => manager.reset_progress(&mut confirm)?,
    };

    render(&manager, &outcome);
    if outcome.status == Status::Cancelled {
        println!("Operação cancelada.");
    }
    Ok(())
}
