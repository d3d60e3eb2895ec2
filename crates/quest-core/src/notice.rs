//! User-facing notifications produced by profile transitions.

use std::fmt;

/// One message for the notification channel. Rejections are notices too:
/// they never surface as errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    TaskCompleted { xp: u32, gold: u64 },
    LevelUp { level: u32 },
    AchievementUnlocked { name: String, message: String },
    SubjectAdded { name: String },
    SubjectRemoved { name: String },
    TaskAdded { subject: String },
    ProfileUpdated { gear: Option<String> },
    ProgressReset,
    // Rejections.
    SubjectNameMissing,
    SubjectExists { name: String },
    SubjectProtected,
    SubjectUnknown { name: String },
    TaskDescriptionMissing,
}

impl Notice {
    /// True for notices that report a refused operation.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Notice::SubjectNameMissing
                | Notice::SubjectExists { .. }
                | Notice::SubjectProtected
                | Notice::SubjectUnknown { .. }
                | Notice::TaskDescriptionMissing
        )
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::TaskCompleted { xp, gold } => {
                write!(f, "Missão concluída! Você ganhou {xp} XP e {gold} Ouro.")
            }
            Notice::LevelUp { level } => write!(
                f,
                "🎉 NÍVEL {level} ALCANÇADO! Sua força intelectual aumentou!"
            ),
            Notice::AchievementUnlocked { name, message } => {
                write!(f, "🏆 CONQUISTA DESBLOQUEADA: \"{name}\"! {message}")
            }
            Notice::SubjectAdded { name } => write!(f, "Nova matéria \"{name}\" adicionada."),
            Notice::SubjectRemoved { name } => write!(f, "Matéria \"{name}\" removida."),
            Notice::TaskAdded { subject } => write!(f, "Nova missão registrada em {subject}."),
            Notice::ProfileUpdated { gear: Some(gear) } => {
                write!(f, "Perfil e equipamento ({gear}) atualizados!")
            }
            Notice::ProfileUpdated { gear: None } => write!(f, "Perfil atualizado!"),
            Notice::ProgressReset => write!(f, "Progresso reiniciado. Uma nova jornada começa!"),
            Notice::SubjectNameMissing => {
                write!(f, "Guardião: A matéria precisa de um nome, Herói!")
            }
            Notice::SubjectExists { .. } => write!(f, "Guardião: Essa matéria já existe, Herói!"),
            Notice::SubjectProtected => write!(
                f,
                "Guardião: A matéria 'Geral' é essencial e não pode ser removida!"
            ),
            Notice::SubjectUnknown { name } => {
                write!(f, "Guardião: A matéria \"{name}\" não existe.")
            }
            Notice::TaskDescriptionMissing => {
                write!(f, "Guardião: A missão precisa de uma descrição, Herói!")
            }
        }
    }
}
