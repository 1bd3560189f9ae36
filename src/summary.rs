//! Training summary - aggregate statistics behind the report tab
//!
//! Recomputed from the full collection on every read, so achievements
//! follow the stored data rather than being kept once earned.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, Utc};

use crate::achievements::{ACHIEVEMENTS, Achievement};
use crate::db::Result;
use crate::store::WorkoutStore;
use crate::workout::{Weekday, WorkoutRecord};

pub const SUMMARY_FAILURE: &str = "Falha ao carregar o resumo do Cavaleiro.";

/// Estimated minutes per recorded exercise
const MINUTES_PER_EXERCISE: u32 = 5;

/// One recorded occurrence of an exercise
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// Local date of the record's timestamp, if it had one
    pub date: Option<NaiveDate>,
    pub load: f64,
    pub reps: u32,
    pub series: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub trained_days_count: u32,
    pub last_trained: Option<DateTime<Utc>>,
    pub total_volume: f64,
    pub total_exercises: u32,
    /// Weekdays trained since the start of the current week, 0 = Sunday
    pub weekly_trained_days: BTreeSet<u32>,
    /// Per-exercise history, most recent first
    pub exercise_progress: BTreeMap<String, Vec<HistoryEntry>>,
}

/// Most recent Sunday at local midnight
pub fn start_of_week(now: DateTime<Local>) -> NaiveDateTime {
    let days_since_sunday = i64::from(now.weekday().num_days_from_sunday());
    (now.date_naive() - Duration::days(days_since_sunday)).and_time(chrono::NaiveTime::MIN)
}

impl Summary {
    /// Aggregate all records as seen at `now`
    pub fn compute(records: &[WorkoutRecord], now: DateTime<Local>) -> Self {
        let week_start = start_of_week(now);
        let mut summary = Summary::default();

        for record in records {
            let local_time = record.timestamp.map(|t| t.with_timezone(&Local));

            if let Some(local) = local_time.filter(|_| record.completed) {
                summary.trained_days_count += 1;
                let timestamp = local.with_timezone(&Utc);
                if summary.last_trained.is_none_or(|last| timestamp > last) {
                    summary.last_trained = Some(timestamp);
                }
                if local.naive_local() >= week_start {
                    summary
                        .weekly_trained_days
                        .insert(local.weekday().num_days_from_sunday());
                }
            }

            // Volume and history count every record, completed or not
            for exercise in &record.exercises {
                summary.total_volume += exercise.volume();
                summary.total_exercises += 1;
                summary
                    .exercise_progress
                    .entry(exercise.name.clone())
                    .or_default()
                    .push(HistoryEntry {
                        date: local_time.map(|t| t.date_naive()),
                        load: exercise.load,
                        reps: exercise.reps,
                        series: exercise.series,
                    });
            }
        }

        for history in summary.exercise_progress.values_mut() {
            // Undated entries sort last; same-date entries keep insertion order
            history.sort_by(|a, b| b.date.cmp(&a.date));
        }

        summary
    }

    /// One-shot read of the collection
    pub fn load(store: &WorkoutStore) -> Result<Self> {
        let records = store.list()?;
        Ok(Self::compute(&records, Local::now()))
    }

    /// Heuristic: 5 minutes per recorded exercise
    pub fn average_duration_minutes(&self) -> u32 {
        self.total_exercises * MINUTES_PER_EXERCISE
    }

    pub fn weekly_trained_count(&self) -> usize {
        self.weekly_trained_days.len()
    }

    pub fn trained_on(&self, day: Weekday) -> bool {
        self.weekly_trained_days.contains(&day.index_from_sunday())
    }

    /// `dd/mm/yyyy` in local time, or "Nenhum"
    pub fn last_trained_label(&self) -> String {
        match self.last_trained {
            Some(t) => t.with_timezone(&Local).format("%d/%m/%Y").to_string(),
            None => "Nenhum".to_string(),
        }
    }

    /// Total volume rounded to the 2 decimals shown to the user
    pub fn displayed_volume(&self) -> f64 {
        (self.total_volume * 100.0).round() / 100.0
    }

    pub fn total_volume_label(&self) -> String {
        format!("{:.2}", self.displayed_volume())
    }

    /// Every achievement with its current state
    pub fn achievements(&self) -> Vec<(&'static Achievement, bool)> {
        ACHIEVEMENTS
            .iter()
            .map(|a| (a, a.is_unlocked(self)))
            .collect()
    }
}
