//! cavaleiro - Diário de Treino do Cavaleiro
//!
//! Weekly workout journal: one record per weekday, completion tracking,
//! and a summary with achievements.

pub mod achievements;
pub mod auth;
pub mod config;
pub mod db;
pub mod editor;
pub mod store;
pub mod summary;
pub mod tui;
pub mod viewer;
pub mod workout;

pub use db::Database;
pub use store::WorkoutStore;

use anyhow::{Context, Result};
use tracing::info;

use auth::Identity;
use config::Config;

/// Open the store and sign in. Failures here block the whole app.
pub fn bootstrap(config: &Config) -> Result<(WorkoutStore, Identity)> {
    let db = Database::open(&config.db_path)
        .with_context(|| format!("Failed to open store at {}", config.db_path))?;
    let identity = auth::sign_in(&db, config.auth_token.as_deref()).context("Sign-in failed")?;
    let store = WorkoutStore::new(db, &config.app_id, &identity.user_id)
        .context("Failed to open workout collection")?;
    info!("Workout collection: {}", store.collection());
    Ok((store, identity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth::SignInMethod;
    use workout::{Weekday, WorkoutRecord};

    fn config(path: &str, token: Option<&str>) -> Config {
        Config::new(path, "app", token).unwrap()
    }

    #[test]
    fn test_bootstrap_anonymous() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("journal.db");
        let path = path.to_str().unwrap();

        let (store, identity) = bootstrap(&config(path, None)).unwrap();
        assert_eq!(identity.method, SignInMethod::Anonymous);
        assert_eq!(
            store.collection(),
            format!("artifacts/app/users/{}/workouts", identity.user_id)
        );
        store
            .save(&WorkoutRecord::new(Weekday::Monday, vec![], chrono::Utc::now()))
            .unwrap();
        drop(store);

        // Same device, same user, same data
        let (store, again) = bootstrap(&config(path, None)).unwrap();
        assert_eq!(again, identity);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_bootstrap_with_token() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("journal.db");
        let path = path.to_str().unwrap();

        let (_, anon) = bootstrap(&config(path, None)).unwrap();
        let (_, signed) = bootstrap(&config(path, Some("abc123"))).unwrap();
        assert_eq!(signed.method, SignInMethod::CustomToken);
        assert_ne!(signed.user_id, anon.user_id);
    }

    #[test]
    fn test_bootstrap_fails_on_unopenable_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("missing").join("journal.db");

        let err = bootstrap(&config(path.to_str().unwrap(), None)).unwrap_err();
        assert!(err.to_string().starts_with("Failed to open store at"));
    }
}
