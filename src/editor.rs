//! Workout editor - weekday selection, exercise drafts and validation

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};

use crate::db::StoreError;
use crate::store::WorkoutStore;
use crate::workout::{Exercise, Weekday, WorkoutRecord};

pub const SAVE_SUCCESS: &str = "Treino salvo com sucesso! O Reino agradece seu esforço.";
pub const SAVE_FAILURE: &str = "Falha ao salvar treino. Tente novamente.";
pub const LOAD_FAILURE: &str = "Erro ao carregar treino existente.";

/// Validation failures, checked in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Por favor, selecione um dia da semana.")]
    MissingDay,

    #[error("Adicione pelo menos um exercício.")]
    NoExercises,

    #[error("Todos os campos de exercício devem ser preenchidos.")]
    EmptyField,

    #[error("Carga, Repetições e Séries devem ser números válidos e não negativos.")]
    InvalidNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    Name,
    Series,
    Reps,
    Load,
}

impl DraftField {
    pub fn all() -> &'static [DraftField] {
        &[
            DraftField::Name,
            DraftField::Series,
            DraftField::Reps,
            DraftField::Load,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            DraftField::Name => "Exercício",
            DraftField::Series => "Séries",
            DraftField::Reps => "Repetições",
            DraftField::Load => "Carga (kg)",
        }
    }

    pub fn next(&self) -> DraftField {
        let all = DraftField::all();
        all[(*self as usize + 1) % all.len()]
    }

    pub fn prev(&self) -> DraftField {
        let all = DraftField::all();
        all[(*self as usize + all.len() - 1) % all.len()]
    }
}

/// Exercise as typed by the user, before validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExerciseDraft {
    pub name: String,
    pub series: String,
    pub reps: String,
    pub load: String,
}

impl ExerciseDraft {
    pub fn new(name: &str, series: &str, reps: &str, load: &str) -> Self {
        Self {
            name: name.to_string(),
            series: series.to_string(),
            reps: reps.to_string(),
            load: load.to_string(),
        }
    }

    pub fn from_exercise(exercise: &Exercise) -> Self {
        Self {
            name: exercise.name.clone(),
            series: exercise.series.to_string(),
            reps: exercise.reps.to_string(),
            load: exercise.load.to_string(),
        }
    }

    /// Stored entry that failed to decode; fields keep their raw text
    pub fn from_stored(raw: &Value) -> Self {
        let text = |field: &str| match raw.get(field) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        Self {
            name: text("name"),
            series: text("series"),
            reps: text("reps"),
            load: text("load"),
        }
    }

    pub fn field(&self, field: DraftField) -> &str {
        match field {
            DraftField::Name => &self.name,
            DraftField::Series => &self.series,
            DraftField::Reps => &self.reps,
            DraftField::Load => &self.load,
        }
    }

    pub fn field_mut(&mut self, field: DraftField) -> &mut String {
        match field {
            DraftField::Name => &mut self.name,
            DraftField::Series => &mut self.series,
            DraftField::Reps => &mut self.reps,
            DraftField::Load => &mut self.load,
        }
    }

    fn has_empty_field(&self) -> bool {
        DraftField::all()
            .iter()
            .any(|f| self.field(*f).trim().is_empty())
    }

    /// Parse into a stored exercise. Series and reps are whole numbers,
    /// load accepts a decimal comma.
    pub fn parse(&self) -> Result<Exercise, ValidationError> {
        if self.has_empty_field() {
            return Err(ValidationError::EmptyField);
        }

        let series = self
            .series
            .trim()
            .parse::<u32>()
            .map_err(|_| ValidationError::InvalidNumber)?;
        let reps = self
            .reps
            .trim()
            .parse::<u32>()
            .map_err(|_| ValidationError::InvalidNumber)?;
        let load = self
            .load
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .map_err(|_| ValidationError::InvalidNumber)?;
        if !load.is_finite() || load < 0.0 {
            return Err(ValidationError::InvalidNumber);
        }

        Ok(Exercise {
            name: self.name.trim().to_string(),
            series,
            reps,
            load,
        })
    }
}

/// Result of a confirmed save, shown in the result dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    Failed,
}

impl SaveOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            SaveOutcome::Saved => SAVE_SUCCESS,
            SaveOutcome::Failed => SAVE_FAILURE,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SaveOutcome::Saved)
    }
}

/// Editor state for one weekday's exercise list
#[derive(Debug, Clone, Default)]
pub struct WorkoutEditor {
    day: Option<Weekday>,
    drafts: Vec<ExerciseDraft>,
}

impl WorkoutEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Editor prefilled without consulting the store
    pub fn with_drafts(day: Weekday, drafts: Vec<ExerciseDraft>) -> Self {
        Self {
            day: Some(day),
            drafts,
        }
    }

    pub fn day(&self) -> Option<Weekday> {
        self.day
    }

    pub fn drafts(&self) -> &[ExerciseDraft] {
        &self.drafts
    }

    /// Choose a weekday and load its stored exercises. On a read failure the
    /// day stays selected and the current drafts are kept.
    pub fn select_day(&mut self, store: &WorkoutStore, day: Weekday) -> Result<(), StoreError> {
        self.day = Some(day);
        match store.get(day) {
            Ok(record) => {
                self.drafts = record.as_ref().map(stored_drafts).unwrap_or_default();
                Ok(())
            }
            Err(e) => {
                error!("Failed to load workout for {}: {}", day, e);
                Err(e)
            }
        }
    }

    /// Append a blank exercise
    pub fn add_exercise(&mut self) {
        self.drafts.push(ExerciseDraft::default());
    }

    /// Drop the exercise at `index`, keeping the others in order
    pub fn remove_exercise(&mut self, index: usize) {
        if index < self.drafts.len() {
            self.drafts.remove(index);
        }
    }

    pub fn update(&mut self, index: usize, field: DraftField, value: &str) {
        if let Some(draft) = self.drafts.get_mut(index) {
            *draft.field_mut(field) = value.to_string();
        }
    }

    pub fn draft_mut(&mut self, index: usize) -> Option<&mut ExerciseDraft> {
        self.drafts.get_mut(index)
    }

    pub fn validate(&self) -> Result<(Weekday, Vec<Exercise>), ValidationError> {
        let day = self.day.ok_or(ValidationError::MissingDay)?;
        if self.drafts.is_empty() {
            return Err(ValidationError::NoExercises);
        }

        // Empty fields are reported before bad numbers, across all entries
        if self.drafts.iter().any(ExerciseDraft::has_empty_field) {
            return Err(ValidationError::EmptyField);
        }

        let exercises = self
            .drafts
            .iter()
            .map(ExerciseDraft::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((day, exercises))
    }

    /// Assemble the record awaiting confirmation. Saving resets completion.
    pub fn prepare(&self, now: DateTime<Utc>) -> Result<WorkoutRecord, ValidationError> {
        let (day, exercises) = self.validate()?;
        Ok(WorkoutRecord::new(day, exercises, now))
    }
}

/// Drafts in stored order, unreadable entries included
fn stored_drafts(record: &WorkoutRecord) -> Vec<ExerciseDraft> {
    let mut drafts: Vec<_> = record
        .exercises
        .iter()
        .map(ExerciseDraft::from_exercise)
        .collect();
    for entry in &record.unreadable {
        let at = entry.position.min(drafts.len());
        drafts.insert(at, ExerciseDraft::from_stored(&entry.raw));
    }
    drafts
}

/// Write a confirmed record. Failures are logged and reported, never retried.
pub fn save_confirmed(store: &WorkoutStore, record: &WorkoutRecord) -> SaveOutcome {
    match store.save(record) {
        Ok(()) => {
            info!("Workout for {} confirmed and saved", record.day);
            SaveOutcome::Saved
        }
        Err(e) => {
            error!("Failed to save workout for {}: {}", record.day, e);
            SaveOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::store::collection_path;

    fn store() -> WorkoutStore {
        WorkoutStore::new(Database::open_in_memory().unwrap(), "app", "u1").unwrap()
    }

    fn valid_editor() -> WorkoutEditor {
        WorkoutEditor::with_drafts(
            Weekday::Monday,
            vec![
                ExerciseDraft::new("Supino Reto", "3", "10", "50"),
                ExerciseDraft::new("Remada", "4", "12", "20.5"),
            ],
        )
    }

    #[test]
    fn test_valid_drafts_pass() {
        let (day, exercises) = valid_editor().validate().unwrap();
        assert_eq!(day, Weekday::Monday);
        assert_eq!(exercises.len(), 2);
        assert_eq!(exercises[1].load, 20.5);
        assert_eq!(exercises[1].series, 4);
    }

    #[test]
    fn test_zero_values_are_valid() {
        let draft = ExerciseDraft::new("Prancha", "0", "0", "0");
        assert!(draft.parse().is_ok());
    }

    #[test]
    fn test_missing_day() {
        let mut editor = WorkoutEditor::new();
        editor.add_exercise();
        assert_eq!(editor.validate().unwrap_err(), ValidationError::MissingDay);
    }

    #[test]
    fn test_no_exercises() {
        let editor = WorkoutEditor::with_drafts(Weekday::Friday, vec![]);
        assert_eq!(editor.validate().unwrap_err(), ValidationError::NoExercises);
    }

    #[test]
    fn test_each_empty_field_fails() {
        for field in DraftField::all() {
            let mut draft = ExerciseDraft::new("Supino", "3", "10", "50");
            draft.field_mut(*field).clear();
            assert_eq!(draft.parse().unwrap_err(), ValidationError::EmptyField, "{:?}", field);
        }
    }

    #[test]
    fn test_empty_field_reported_before_bad_number() {
        let editor = WorkoutEditor::with_drafts(
            Weekday::Monday,
            vec![
                ExerciseDraft::new("Supino", "abc", "10", "50"),
                ExerciseDraft::new("", "3", "10", "50"),
            ],
        );
        assert_eq!(editor.validate().unwrap_err(), ValidationError::EmptyField);
    }

    #[test]
    fn test_invalid_numbers_fail() {
        let cases = [
            ExerciseDraft::new("Supino", "-1", "10", "50"),
            ExerciseDraft::new("Supino", "3", "dez", "50"),
            ExerciseDraft::new("Supino", "3", "10", "-0.5"),
            ExerciseDraft::new("Supino", "3", "10", "NaN"),
            ExerciseDraft::new("Supino", "3", "10", "inf"),
            ExerciseDraft::new("Supino", "2.5", "10", "50"),
        ];
        for draft in cases {
            assert_eq!(draft.parse().unwrap_err(), ValidationError::InvalidNumber, "{:?}", draft);
        }
    }

    #[test]
    fn test_decimal_comma_load() {
        let exercise = ExerciseDraft::new("Rosca", "3", "12", "12,5").parse().unwrap();
        assert_eq!(exercise.load, 12.5);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ValidationError::MissingDay.to_string(),
            "Por favor, selecione um dia da semana."
        );
        assert_eq!(
            ValidationError::InvalidNumber.to_string(),
            "Carga, Repetições e Séries devem ser números válidos e não negativos."
        );
    }

    #[test]
    fn test_add_and_remove_preserve_order() {
        let mut editor = WorkoutEditor::with_drafts(Weekday::Monday, vec![]);
        for name in ["A", "B", "C"] {
            editor.add_exercise();
            let last = editor.drafts().len() - 1;
            editor.update(last, DraftField::Name, name);
        }
        editor.remove_exercise(1);
        let names: Vec<_> = editor.drafts().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);

        editor.remove_exercise(10);
        assert_eq!(editor.drafts().len(), 2);
    }

    #[test]
    fn test_prepare_resets_completion() {
        let record = valid_editor().prepare(Utc::now()).unwrap();
        assert!(!record.completed);
        assert!(record.timestamp.is_some());
    }

    #[test]
    fn test_select_day_loads_existing_record() {
        let store = store();
        let record = valid_editor().prepare(Utc::now()).unwrap();
        assert!(save_confirmed(&store, &record).is_success());

        let mut editor = WorkoutEditor::new();
        editor.select_day(&store, Weekday::Monday).unwrap();
        assert_eq!(editor.drafts().len(), 2);
        assert_eq!(editor.drafts()[0], ExerciseDraft::new("Supino Reto", "3", "10", "50"));

        editor.select_day(&store, Weekday::Tuesday).unwrap();
        assert!(editor.drafts().is_empty());
    }

    #[test]
    fn test_select_day_keeps_unreadable_entries() {
        let db = Database::open_in_memory().unwrap();
        let body = serde_json::json!({
            "day": "Quarta-feira",
            "exercises": [
                {"name": "Supino", "series": 3, "reps": 10, "load": 50},
                {"name": "Remada", "series": 3.5, "reps": "12", "load": "20"},
                {"name": "Agachamento", "series": "4", "reps": "-1", "load": 60},
            ],
            "completed": false,
        });
        db.set_document(&collection_path("app", "u1"), "Quarta-feira", &body, false)
            .unwrap();
        let store = WorkoutStore::new(db, "app", "u1").unwrap();

        let mut editor = WorkoutEditor::new();
        editor.select_day(&store, Weekday::Wednesday).unwrap();
        let names: Vec<_> = editor.drafts().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Supino", "Remada", "Agachamento"]);
        assert_eq!(editor.drafts()[1].series, "3.5");
        assert_eq!(editor.drafts()[2].reps, "-1");

        // Must be corrected before it can be saved again
        assert_eq!(editor.validate().unwrap_err(), ValidationError::InvalidNumber);
    }

    #[test]
    fn test_resave_overwrites_exercises_and_completion() {
        let store = store();
        save_confirmed(&store, &valid_editor().prepare(Utc::now()).unwrap());
        store.set_completed(Weekday::Monday, true).unwrap();

        let editor = WorkoutEditor::with_drafts(
            Weekday::Monday,
            vec![ExerciseDraft::new("Agachamento", "5", "5", "100")],
        );
        save_confirmed(&store, &editor.prepare(Utc::now()).unwrap());

        let stored = store.get(Weekday::Monday).unwrap().unwrap();
        assert_eq!(stored.exercises.len(), 1);
        assert_eq!(stored.exercises[0].name, "Agachamento");
        assert!(!stored.completed);
    }

    #[test]
    fn test_outcome_messages() {
        assert_eq!(SaveOutcome::Saved.message(), SAVE_SUCCESS);
        assert_eq!(SaveOutcome::Failed.message(), SAVE_FAILURE);
    }
}
