//! Workout data model - weekdays, exercises and the stored weekly record

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::warn;

/// Training weekday, ordered Monday..Sunday
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Weekday {
    #[serde(rename = "Segunda-feira")]
    Monday,
    #[serde(rename = "Terça-feira")]
    Tuesday,
    #[serde(rename = "Quarta-feira")]
    Wednesday,
    #[serde(rename = "Quinta-feira")]
    Thursday,
    #[serde(rename = "Sexta-feira")]
    Friday,
    #[serde(rename = "Sábado")]
    Saturday,
    #[serde(rename = "Domingo")]
    Sunday,
}

impl Weekday {
    /// All weekdays in schedule order
    pub fn all() -> &'static [Weekday] {
        &[
            Weekday::Monday,
            Weekday::Tuesday,
            Weekday::Wednesday,
            Weekday::Thursday,
            Weekday::Friday,
            Weekday::Saturday,
            Weekday::Sunday,
        ]
    }

    /// Localized name, also used as the document key
    pub fn name(&self) -> &'static str {
        match self {
            Weekday::Monday => "Segunda-feira",
            Weekday::Tuesday => "Terça-feira",
            Weekday::Wednesday => "Quarta-feira",
            Weekday::Thursday => "Quinta-feira",
            Weekday::Friday => "Sexta-feira",
            Weekday::Saturday => "Sábado",
            Weekday::Sunday => "Domingo",
        }
    }

    /// Exact match on the localized name
    pub fn from_name(name: &str) -> Option<Weekday> {
        Weekday::all().iter().copied().find(|d| d.name() == name)
    }

    pub fn from_chrono(day: chrono::Weekday) -> Weekday {
        match day {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }

    /// Weekday of the local clock
    pub fn today() -> Weekday {
        Weekday::from_chrono(Local::now().weekday())
    }

    /// 0 = Sunday .. 6 = Saturday, matching the summary's weekly strip
    pub fn index_from_sunday(&self) -> u32 {
        match self {
            Weekday::Sunday => 0,
            other => *other as u32 + 1,
        }
    }

    pub fn next(&self) -> Weekday {
        let all = Weekday::all();
        all[(*self as usize + 1) % all.len()]
    }

    pub fn prev(&self) -> Weekday {
        let all = Weekday::all();
        all[(*self as usize + all.len() - 1) % all.len()]
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lowercase and strip the accents used in weekday names
fn fold(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' => 'a',
            'é' | 'ê' => 'e',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("dia da semana desconhecido: {0}")]
pub struct UnknownWeekday(pub String);

/// Lenient parsing for command-line input: full name or 3-letter prefix
impl FromStr for Weekday {
    type Err = UnknownWeekday;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = fold(s);
        if wanted.is_empty() {
            return Err(UnknownWeekday(s.to_string()));
        }

        Weekday::all()
            .iter()
            .copied()
            .find(|d| {
                let name = fold(d.name());
                name == wanted || (wanted.chars().count() == 3 && name.starts_with(&wanted))
            })
            .ok_or_else(|| UnknownWeekday(s.to_string()))
    }
}

/// A single movement: sets, reps and load in kilograms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    pub series: u32,
    pub reps: u32,
    pub load: f64,
}

impl Exercise {
    /// load × reps × series
    pub fn volume(&self) -> f64 {
        self.load * f64::from(self.reps) * f64::from(self.series)
    }

    /// Line shown in the workout detail dialog
    pub fn describe(&self) -> String {
        format!(
            "{}: {} séries de {} reps com {} kg",
            self.name, self.series, self.reps, self.load
        )
    }
}

/// Numbers written by other clients may arrive as JSON strings
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Numeric::Number(n) => Some(*n),
            Numeric::Text(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        };
        value.filter(|v| v.is_finite())
    }

    fn as_u32(&self) -> Option<u32> {
        match self {
            Numeric::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n <= f64::from(u32::MAX) => {
                Some(*n as u32)
            }
            Numeric::Number(_) => None,
            Numeric::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StoredExercise {
    #[serde(default)]
    name: String,
    series: Option<Numeric>,
    reps: Option<Numeric>,
    load: Option<Numeric>,
}

impl StoredExercise {
    fn decode(self) -> Option<Exercise> {
        Some(Exercise {
            series: self.series.as_ref()?.as_u32()?,
            reps: self.reps.as_ref()?.as_u32()?,
            load: self.load.as_ref()?.as_f64()?,
            name: self.name,
        })
    }
}

/// Stored entry whose numbers did not decode, with its index in the stored list
#[derive(Debug, Clone, PartialEq)]
pub struct UnreadableExercise {
    pub position: usize,
    pub raw: Value,
}

/// One weekday's workout for a user; stored under the weekday's name
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutRecord {
    pub day: Weekday,
    pub exercises: Vec<Exercise>,
    /// Left out of totals; the editor shows them so they can be corrected
    pub unreadable: Vec<UnreadableExercise>,
    pub timestamp: Option<DateTime<Utc>>,
    pub completed: bool,
}

impl WorkoutRecord {
    pub fn new(day: Weekday, exercises: Vec<Exercise>, timestamp: DateTime<Utc>) -> Self {
        Self {
            day,
            exercises,
            unreadable: Vec::new(),
            timestamp: Some(timestamp),
            completed: false,
        }
    }

    /// Document key in the per-user collection
    pub fn key(&self) -> &'static str {
        self.day.name()
    }

    pub fn to_document(&self) -> Value {
        json!({
            "day": self.day.name(),
            "exercises": self.exercises,
            "timestamp": self.timestamp.map(|t| t.to_rfc3339()),
            "completed": self.completed,
        })
    }

    /// Decode a stored document. Returns `None` when neither the `day` field
    /// nor the key names a weekday. Exercises with unreadable numbers are set
    /// aside in `unreadable`.
    pub fn from_document(key: &str, body: &Value) -> Option<Self> {
        let day = body
            .get("day")
            .and_then(Value::as_str)
            .and_then(Weekday::from_name)
            .or_else(|| Weekday::from_name(key))?;

        let timestamp = body
            .get("timestamp")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc));

        let completed = body.get("completed") == Some(&Value::Bool(true));

        let mut exercises = Vec::new();
        let mut unreadable = Vec::new();
        let items = body.get("exercises").and_then(Value::as_array);
        for (position, item) in items.into_iter().flatten().enumerate() {
            let decoded = serde_json::from_value::<StoredExercise>(item.clone())
                .ok()
                .and_then(StoredExercise::decode);
            match decoded {
                Some(exercise) => exercises.push(exercise),
                None => {
                    warn!("Unreadable exercise #{} in {}: {}", position + 1, key, item);
                    unreadable.push(UnreadableExercise {
                        position,
                        raw: item.clone(),
                    });
                }
            }
        }

        Some(Self {
            day,
            exercises,
            unreadable,
            timestamp,
            completed,
        })
    }

    /// Lines for the detail dialog
    pub fn detail_lines(&self) -> Vec<String> {
        if self.exercises.is_empty() {
            return vec!["Nenhum exercício registrado para este dia.".to_string()];
        }
        self.exercises.iter().map(Exercise::describe).collect()
    }
}

/// Fixed Monday..Sunday order regardless of arrival order
pub fn sort_by_weekday(records: &mut [WorkoutRecord]) {
    records.sort_by_key(|r| r.day);
}
