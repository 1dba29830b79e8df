use std::sync::Arc;

use storage::json::{load_json, save_json};
use storage::keys;
use storage::repository::KeyValueStore;

use crate::error::SettingsError;

/// User preferences that outlive a session.
#[derive(Clone)]
pub struct SettingsService {
    store: Arc<dyn KeyValueStore>,
}

impl SettingsService {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Whether answering an exam question moves on by itself. Off unless
    /// saved otherwise.
    pub async fn auto_advance(&self) -> bool {
        load_json(self.store.as_ref(), keys::AUTO_ADVANCE)
            .await
            .unwrap_or(false)
    }

    /// Persist the auto-advance preference.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` on storage failures.
    pub async fn set_auto_advance(&self, enabled: bool) -> Result<(), SettingsError> {
        save_json(self.store.as_ref(), keys::AUTO_ADVANCE, &enabled).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryStore;

    #[tokio::test]
    async fn auto_advance_defaults_off_and_persists() {
        let store = InMemoryStore::new();
        let settings = SettingsService::new(Arc::new(store.clone()));
        assert!(!settings.auto_advance().await);

        settings.set_auto_advance(true).await.unwrap();
        assert!(settings.auto_advance().await);
        assert_eq!(store.get("autoAdvance").await.unwrap().as_deref(), Some("true"));
    }

    #[tokio::test]
    async fn unparseable_value_reads_as_off() {
        let store = InMemoryStore::new();
        store.set("autoAdvance", "\"yes\"").await.unwrap();
        let settings = SettingsService::new(Arc::new(store));
        assert!(!settings.auto_advance().await);
    }
}
