use anyhow::{Result, bail};

pub const DEFAULT_DB_PATH: &str = "cavaleiro.db";
pub const DEFAULT_APP_ID: &str = "default-app-id";

/// Backend settings resolved from flags, env vars and `.env`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: String,
    pub app_id: String,
    pub auth_token: Option<String>,
}

impl Config {
    /// Validate bootstrap settings. Any error here is fatal for the app.
    pub fn new(db_path: &str, app_id: &str, auth_token: Option<&str>) -> Result<Self> {
        let db_path = db_path.trim();
        if db_path.is_empty() {
            bail!("Store path is empty (set --db or CAVALEIRO_DB)");
        }

        let app_id = app_id.trim();
        if app_id.is_empty() {
            bail!("App id is empty (set --app-id or CAVALEIRO_APP_ID)");
        }
        if app_id.contains('/') {
            bail!("App id must not contain '/': {}", app_id);
        }

        let auth_token = match auth_token.map(str::trim) {
            Some("") => bail!("Auth token is empty (unset CAVALEIRO_AUTH_TOKEN to sign in anonymously)"),
            other => other.map(str::to_string),
        };

        Ok(Self {
            db_path: db_path.to_string(),
            app_id: app_id.to_string(),
            auth_token,
        })
    }
}
