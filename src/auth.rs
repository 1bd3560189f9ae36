//! Identity bootstrap - anonymous or pre-issued token sign-in
//!
//! The resulting user id is opaque to the rest of the app; it only scopes
//! the document collection.

use tracing::info;
use uuid::Uuid;

use crate::db::{Database, Result};

const ANONYMOUS_CREDENTIAL: &str = "anonymous";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInMethod {
    Anonymous,
    CustomToken,
}

/// Signed-in user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub method: SignInMethod,
}

/// Sign in with the pre-issued token when one is given, anonymously otherwise.
/// Both paths are stable: the same device or token always maps to the same id.
pub fn sign_in(db: &Database, token: Option<&str>) -> Result<Identity> {
    match token {
        Some(token) => sign_in_with_token(db, token),
        None => sign_in_anonymously(db),
    }
}

fn sign_in_anonymously(db: &Database) -> Result<Identity> {
    let user_id = resolve(db, ANONYMOUS_CREDENTIAL)?;
    info!("Signed in anonymously as {}", user_id);
    Ok(Identity {
        user_id,
        method: SignInMethod::Anonymous,
    })
}

fn sign_in_with_token(db: &Database, token: &str) -> Result<Identity> {
    let user_id = resolve(db, &format!("token:{token}"))?;
    info!("Signed in with token as {}", user_id);
    Ok(Identity {
        user_id,
        method: SignInMethod::CustomToken,
    })
}

fn resolve(db: &Database, credential: &str) -> Result<String> {
    if let Some(user_id) = db.find_identity(credential)? {
        return Ok(user_id);
    }

    let user_id = Uuid::new_v4().simple().to_string();
    db.insert_identity(credential, &user_id)?;
    Ok(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_is_stable() {
        let db = Database::open_in_memory().unwrap();
        let first = sign_in(&db, None).unwrap();
        let second = sign_in(&db, None).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.method, SignInMethod::Anonymous);
        assert!(!first.user_id.contains('/'));
    }

    #[test]
    fn test_token_identity_differs_from_anonymous() {
        let db = Database::open_in_memory().unwrap();
        let anon = sign_in(&db, None).unwrap();
        let token = sign_in(&db, Some("abc123")).unwrap();
        assert_ne!(anon.user_id, token.user_id);
        assert_eq!(token.method, SignInMethod::CustomToken);
        assert_eq!(sign_in(&db, Some("abc123")).unwrap().user_id, token.user_id);
    }

    #[test]
    fn test_distinct_tokens_get_distinct_users() {
        let db = Database::open_in_memory().unwrap();
        let a = sign_in(&db, Some("a")).unwrap();
        let b = sign_in(&db, Some("b")).unwrap();
        assert_ne!(a.user_id, b.user_id);
    }
}
