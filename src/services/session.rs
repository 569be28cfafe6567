use std::sync::Arc;

use crate::models::language::Language;
use crate::models::session::{AuthData, Session};
use crate::repositories::storage::{self, KeyValueStore, LANGUAGE_KEY, SESSION_KEY};

/// Current identity and bearer token, mirrored to durable storage.
///
/// Persistence is best effort: write failures are logged and the in-memory
/// session stays authoritative for the rest of the run.
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
    current: Option<Session>,
}

impl SessionStore {
    /// Restores a persisted session if one is present and well formed.
    pub fn init(store: Arc<dyn KeyValueStore>) -> Self {
        let current: Option<Session> = storage::load_json(store.as_ref(), SESSION_KEY)
            .filter(|s: &Session| !s.token.is_empty());
        if let Some(session) = &current {
            log::info!("Restored session for {}", session.username);
        }

        Self { store, current }
    }

    /// Trusts the caller: `auth` must come from a successful API response.
    pub fn login(&mut self, auth: AuthData) -> &Session {
        let session = Session::from(auth);
        if let Err(e) = storage::save_json(self.store.as_ref(), SESSION_KEY, &session) {
            log::warn!("Could not persist session: {}", e);
        }
        self.current.insert(session)
    }

    pub fn logout(&mut self) {
        self.current = None;
        if let Err(e) = self.store.remove(SESSION_KEY) {
            log::warn!("Could not remove persisted session: {}", e);
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub fn session(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.current
            .as_ref()
            .map(|s| s.token.as_str())
            .filter(|t| !t.is_empty())
    }
}

/// Selected display language, persisted next to the session.
pub struct LanguagePreference {
    store: Arc<dyn KeyValueStore>,
    current: Language,
}

impl LanguagePreference {
    pub fn init(store: Arc<dyn KeyValueStore>) -> Self {
        let current = store
            .get(LANGUAGE_KEY)
            .and_then(|raw| raw.trim().trim_matches('"').parse().ok())
            .unwrap_or_default();

        Self { store, current }
    }

    pub fn get(&self) -> Language {
        self.current
    }

    pub fn set(&mut self, language: Language) {
        self.current = language;
        if let Err(e) = self.store.set(LANGUAGE_KEY, language.code()) {
            log::warn!("Could not persist language: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::storage::{MemoryStore, StorageError};
    use serde_json::json;

    fn auth_data() -> AuthData {
        serde_json::from_value(json!({
            "user_id": "u1",
            "username": "bob",
            "email": "b@x.com",
            "token": "t1"
        }))
        .unwrap()
    }

    #[test]
    fn login_persists_session_record() {
        let store = Arc::new(MemoryStore::new());
        let mut sessions = SessionStore::init(store.clone());
        assert!(!sessions.is_authenticated());

        sessions.login(auth_data());

        assert!(sessions.is_authenticated());
        let persisted: serde_json::Value =
            serde_json::from_str(&store.get(SESSION_KEY).unwrap()).unwrap();
        assert_eq!(
            persisted,
            json!({"user_id": "u1", "username": "bob", "email": "b@x.com", "token": "t1"})
        );
    }

    #[test]
    fn session_survives_reload_and_logout_clears_it() {
        let store = Arc::new(MemoryStore::new());
        SessionStore::init(store.clone()).login(auth_data());

        let mut reloaded = SessionStore::init(store.clone());
        assert_eq!(reloaded.token(), Some("t1"));

        reloaded.logout();
        assert!(!reloaded.is_authenticated());
        assert!(store.get(SESSION_KEY).is_none());
        assert!(!SessionStore::init(store).is_authenticated());
    }

    #[test]
    fn malformed_record_means_no_session() {
        let store = Arc::new(MemoryStore::new());
        store.set(SESSION_KEY, r#"{"user_id": 5}"#).unwrap();

        assert!(!SessionStore::init(store).is_authenticated());
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
        }

        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
        }
    }

    #[test]
    fn storage_failures_do_not_block_login() {
        let mut sessions = SessionStore::init(Arc::new(BrokenStore));
        sessions.login(auth_data());
        assert!(sessions.is_authenticated());

        sessions.logout();
        assert!(!sessions.is_authenticated());
    }

    #[test]
    fn language_defaults_to_english_and_persists() {
        let store = Arc::new(MemoryStore::new());
        let mut language = LanguagePreference::init(store.clone());
        assert_eq!(language.get(), Language::En);

        language.set(Language::Id);
        assert_eq!(LanguagePreference::init(store.clone()).get(), Language::Id);

        store.set(LANGUAGE_KEY, "fr").unwrap();
        assert_eq!(LanguagePreference::init(store).get(), Language::En);
    }
}
