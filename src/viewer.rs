//! Workout viewer - live weekly schedule with today highlighted

use tracing::{error, warn};

use crate::db::{Result, StoreError};
use crate::store::{SnapshotEvent, Subscription, WorkoutStore};
use crate::workout::{Weekday, WorkoutRecord, sort_by_weekday};

pub const EMPTY_MESSAGE: &str =
    "Nenhum treino encontrado. Comece a forjar seus treinos na aba \"Forjar Treino\"!";
pub const LOAD_FAILURE: &str = "Falha ao carregar seus treinos. Tente novamente.";

#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    Loading,
    /// Sorted Monday..Sunday
    Ready(Vec<WorkoutRecord>),
    /// Persistent until the viewer is mounted again
    Failed(String),
}

/// Mounted viewer. Holds the live subscription; dropping the viewer releases it.
pub struct WorkoutViewer {
    subscription: Subscription,
    state: ViewState,
    today: Weekday,
    selected: usize,
}

impl WorkoutViewer {
    pub fn mount(store: &WorkoutStore) -> Self {
        Self::mount_on(store, Weekday::today())
    }

    /// Mount with an explicit "today"
    pub fn mount_on(store: &WorkoutStore, today: Weekday) -> Self {
        let mut viewer = Self {
            subscription: store.subscribe(),
            state: ViewState::Loading,
            today,
            selected: 0,
        };
        viewer.poll(store);
        viewer
    }

    /// Pick up writes from other sessions, then apply pending updates.
    /// Returns true when the state changed.
    pub fn poll(&mut self, store: &WorkoutStore) -> bool {
        if let Err(e) = store.sync_external() {
            warn!("Failed to check for external changes: {}", e);
        }

        let mut changed = false;
        while let Some(event) = self.subscription.try_next() {
            if matches!(self.state, ViewState::Failed(_)) {
                continue;
            }
            match event {
                SnapshotEvent::Snapshot(mut records) => {
                    sort_by_weekday(&mut records);
                    self.selected = self.selected.min(records.len().saturating_sub(1));
                    self.state = ViewState::Ready(records);
                }
                SnapshotEvent::Failed(reason) => {
                    error!("Workout subscription failed: {}", reason);
                    self.state = ViewState::Failed(LOAD_FAILURE.to_string());
                }
            }
            changed = true;
        }
        changed
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn workouts(&self) -> &[WorkoutRecord] {
        match &self.state {
            ViewState::Ready(records) => records,
            _ => &[],
        }
    }

    pub fn today(&self) -> Weekday {
        self.today
    }

    pub fn is_today(&self, record: &WorkoutRecord) -> bool {
        record.day == self.today
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> Option<&WorkoutRecord> {
        self.workouts().get(self.selected)
    }

    pub fn select_next(&mut self) {
        let len = self.workouts().len();
        if len > 0 {
            self.selected = (self.selected + 1) % len;
        }
    }

    pub fn select_prev(&mut self) {
        let len = self.workouts().len();
        if len > 0 {
            self.selected = (self.selected + len - 1) % len;
        }
    }

    /// Flip the completion flag of the record for `day` as currently displayed.
    /// The new state arrives through the subscription.
    pub fn toggle_completion(&self, store: &WorkoutStore, day: Weekday) -> Result<bool> {
        let current = self
            .workouts()
            .iter()
            .find(|r| r.day == day)
            .map(|r| r.completed)
            .ok_or_else(|| StoreError::NotFound {
                collection: store.collection().to_string(),
                key: day.name().to_string(),
            })?;

        store.set_completed(day, !current).inspect_err(|e| {
            warn!("Failed to update completion for {}: {}", day, e);
        })?;
        Ok(!current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::workout::Exercise;
    use chrono::Utc;

    fn store() -> WorkoutStore {
        WorkoutStore::new(Database::open_in_memory().unwrap(), "app", "u1").unwrap()
    }

    fn save(store: &WorkoutStore, day: Weekday) {
        let exercise = Exercise {
            name: "Supino".to_string(),
            series: 3,
            reps: 10,
            load: 40.0,
        };
        store
            .save(&WorkoutRecord::new(day, vec![exercise], Utc::now()))
            .unwrap();
    }

    fn days(viewer: &WorkoutViewer) -> Vec<Weekday> {
        viewer.workouts().iter().map(|r| r.day).collect()
    }

    #[test]
    fn test_empty_collection_is_ready() {
        let store = store();
        let viewer = WorkoutViewer::mount_on(&store, Weekday::Monday);
        assert_eq!(viewer.state(), &ViewState::Ready(vec![]));
        assert!(viewer.selected().is_none());
    }

    #[test]
    fn test_sorted_regardless_of_write_order() {
        let store = store();
        save(&store, Weekday::Saturday);
        save(&store, Weekday::Monday);

        let mut viewer = WorkoutViewer::mount_on(&store, Weekday::Monday);
        save(&store, Weekday::Wednesday);
        assert!(viewer.poll(&store));
        assert_eq!(
            days(&viewer),
            vec![Weekday::Monday, Weekday::Wednesday, Weekday::Saturday]
        );
    }

    #[test]
    fn test_today_highlight() {
        let store = store();
        save(&store, Weekday::Monday);
        save(&store, Weekday::Friday);
        let viewer = WorkoutViewer::mount_on(&store, Weekday::Friday);
        let highlighted: Vec<_> = viewer
            .workouts()
            .iter()
            .filter(|r| viewer.is_today(r))
            .map(|r| r.day)
            .collect();
        assert_eq!(highlighted, vec![Weekday::Friday]);
    }

    #[test]
    fn test_toggle_roundtrip_through_subscription() {
        let store = store();
        save(&store, Weekday::Tuesday);
        let mut viewer = WorkoutViewer::mount_on(&store, Weekday::Tuesday);

        assert!(viewer.toggle_completion(&store, Weekday::Tuesday).unwrap());
        viewer.poll(&store);
        assert!(viewer.workouts()[0].completed);

        assert!(!viewer.toggle_completion(&store, Weekday::Tuesday).unwrap());
        viewer.poll(&store);
        assert!(!viewer.workouts()[0].completed);
        assert_eq!(viewer.workouts()[0].exercises.len(), 1);
    }

    #[test]
    fn test_toggle_unknown_day() {
        let store = store();
        let viewer = WorkoutViewer::mount_on(&store, Weekday::Tuesday);
        assert!(viewer.toggle_completion(&store, Weekday::Sunday).is_err());
    }

    #[test]
    fn test_selection_wraps() {
        let store = store();
        save(&store, Weekday::Monday);
        save(&store, Weekday::Tuesday);
        let mut viewer = WorkoutViewer::mount_on(&store, Weekday::Monday);

        viewer.select_prev();
        assert_eq!(viewer.selected().unwrap().day, Weekday::Tuesday);
        viewer.select_next();
        assert_eq!(viewer.selected().unwrap().day, Weekday::Monday);
    }

    #[test]
    fn test_failure_persists_until_remount() {
        let store = store();
        let mut viewer = WorkoutViewer::mount_on(&store, Weekday::Monday);
        store
            .listeners()
            .broadcast(store.collection(), &SnapshotEvent::Failed("disk".to_string()));
        viewer.poll(&store);
        assert_eq!(viewer.state(), &ViewState::Failed(LOAD_FAILURE.to_string()));

        save(&store, Weekday::Monday);
        viewer.poll(&store);
        assert!(matches!(viewer.state(), ViewState::Failed(_)));

        let viewer = WorkoutViewer::mount_on(&store, Weekday::Monday);
        assert_eq!(viewer.workouts().len(), 1);
    }

    #[test]
    fn test_refreshes_on_other_session_write() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("journal.db");
        let path = path.to_str().unwrap();
        let tui = WorkoutStore::new(Database::open(path).unwrap(), "app", "u1").unwrap();
        let cli = WorkoutStore::new(Database::open(path).unwrap(), "app", "u1").unwrap();

        let mut viewer = WorkoutViewer::mount_on(&tui, Weekday::Monday);
        assert!(viewer.workouts().is_empty());

        save(&cli, Weekday::Thursday);
        assert!(viewer.poll(&tui));
        assert_eq!(days(&viewer), vec![Weekday::Thursday]);

        cli.set_completed(Weekday::Thursday, true).unwrap();
        viewer.poll(&tui);
        assert!(viewer.workouts()[0].completed);
    }

    #[test]
    fn test_unmount_releases_subscription() {
        let store = store();
        let viewer = WorkoutViewer::mount_on(&store, Weekday::Monday);
        assert_eq!(store.listeners().len(), 1);
        drop(viewer);
        assert!(store.listeners().is_empty());
    }
}
