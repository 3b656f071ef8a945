use statrelay_storage::db::DbStorage;
use statrelay_storage::Storage;
use std::sync::Arc;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Active backend every update and read goes through.
    pub storage: Arc<dyn Storage>,
    /// The relational backend when one is configured; `/ping` reports on
    /// this connection specifically.
    pub db: Option<Arc<DbStorage>>,
    /// Shared signing key for integrity tags; absent disables verification.
    pub sign_key: Option<Arc<str>>,
}

impl AppState {
    pub fn sign_key(&self) -> Option<&str> {
        self.sign_key.as_deref()
    }
}
