//! Achievement table - fixed milestones over the training summary

use crate::summary::Summary;

/// Threshold an achievement checks
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Criterion {
    /// Completed workout-days, inclusive
    CompletedDays(u32),
    /// Distinct weekdays trained in the current week, inclusive
    WeeklyDays(usize),
    /// Total lifted volume in kg as displayed (2 decimals), strictly above
    VolumeAbove(f64),
}

impl Criterion {
    pub fn is_met(&self, summary: &Summary) -> bool {
        match *self {
            Criterion::CompletedDays(min) => summary.trained_days_count >= min,
            Criterion::WeeklyDays(min) => summary.weekly_trained_count() >= min,
            Criterion::VolumeAbove(limit) => summary.displayed_volume() > limit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Achievement {
    pub name: &'static str,
    pub description: &'static str,
    pub criterion: Criterion,
}

impl Achievement {
    pub fn is_unlocked(&self, summary: &Summary) -> bool {
        self.criterion.is_met(summary)
    }
}

pub const ACHIEVEMENTS: &[Achievement] = &[
    Achievement {
        name: "Início da Jornada",
        description: "Complete seu primeiro treino!",
        criterion: Criterion::CompletedDays(1),
    },
    Achievement {
        name: "Cavaleiro Persistente",
        description: "Complete 7 treinos no total.",
        criterion: Criterion::CompletedDays(7),
    },
    Achievement {
        name: "Rotina Consistente",
        description: "Treine em 3 dias diferentes na mesma semana.",
        criterion: Criterion::WeeklyDays(3),
    },
    Achievement {
        name: "Ferrão Afiado",
        description: "Complete 30 treinos no total. Seu ferrão está ficando afiado!",
        criterion: Criterion::CompletedDays(30),
    },
    Achievement {
        name: "Ferrão Canalizado",
        description: "Complete 65 treinos no total. Seu ferrão agora canaliza mais força!",
        criterion: Criterion::CompletedDays(65),
    },
    Achievement {
        name: "Ferrão Serpenteado",
        description: "Complete 130 treinos no total. Seu ferrão tem um movimento serpenteado e mortal!",
        criterion: Criterion::CompletedDays(130),
    },
    Achievement {
        name: "Ferrão Puro",
        description: "Complete 260 treinos no total. Você alcançou a maestria do Ferrão Puro!",
        criterion: Criterion::CompletedDays(260),
    },
    Achievement {
        name: "Mestre do Volume",
        description: "Levante um volume total de 10.000 kg.",
        criterion: Criterion::VolumeAbove(10_000.0),
    },
    Achievement {
        name: "Lenda do Reino",
        description: "Levante um volume total de 50.000 kg.",
        criterion: Criterion::VolumeAbove(50_000.0),
    },
];

pub fn find(name: &str) -> Option<&'static Achievement> {
    ACHIEVEMENTS.iter().find(|a| a.name == name)
}
