use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result, bail};

use crate::legacy::LegacyBookmarks;
use crate::notify::Notifier;
use crate::store::EntityStore;

/// Reject selectors that could escape the data directory once turned into a
/// file name.
pub fn validate_selector(selector: &str) -> Result<&str> {
    let selector = selector.trim();
    if selector.is_empty() {
        bail!("Campus name cannot be empty");
    }
    if selector.contains(['/', '\\']) || selector == "." || selector == ".." {
        bail!("Invalid campus name: {selector}");
    }
    Ok(selector)
}

enum Location {
    Directory(PathBuf),
    InMemory,
}

#[derive(Default)]
struct State {
    stores: HashMap<String, Arc<EntityStore>>,
    active: Option<String>,
}

/// Owns one [`EntityStore`] per selector (campus) and tracks which one is
/// active.
///
/// Every store shares the same legacy bookmark set and notifier. Stores are
/// built lazily under the manager's lock, so concurrent callers asking for
/// the same selector get the same handle.
pub struct StoreManager {
    location: Location,
    legacy: Arc<LegacyBookmarks>,
    notifier: Arc<Notifier>,
    state: Mutex<State>,
}

impl StoreManager {
    /// Stores live in `dir` as `<selector>.db`.
    pub fn new(dir: impl Into<PathBuf>, legacy: Arc<LegacyBookmarks>, notifier: Arc<Notifier>) -> Self {
        Self::with_location(Location::Directory(dir.into()), legacy, notifier)
    }

    pub fn in_memory(legacy: Arc<LegacyBookmarks>, notifier: Arc<Notifier>) -> Self {
        Self::with_location(Location::InMemory, legacy, notifier)
    }

    fn with_location(location: Location, legacy: Arc<LegacyBookmarks>, notifier: Arc<Notifier>) -> Self {
        Self {
            location,
            legacy,
            notifier,
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn notifier(&self) -> &Arc<Notifier> {
        &self.notifier
    }

    /// Database file backing `selector`, or `None` for in-memory managers.
    pub fn db_path(&self, selector: &str) -> Result<Option<PathBuf>> {
        let selector = validate_selector(selector)?;
        Ok(match &self.location {
            Location::Directory(dir) => Some(dir.join(format!("{selector}.db"))),
            Location::InMemory => None,
        })
    }

    /// Whether a store for `selector` has been created before.
    #[must_use]
    pub fn store_exists(&self, selector: &str) -> bool {
        match self.db_path(selector) {
            Ok(Some(path)) => path.exists(),
            Ok(None) => validate_selector(selector)
                .is_ok_and(|s| self.state().stores.contains_key(s)),
            Err(_) => false,
        }
    }

    /// Handle to the store for `selector`, creating it on first use. Does not
    /// change the active store.
    pub fn open(&self, selector: &str) -> Result<Arc<EntityStore>> {
        let selector = validate_selector(selector)?;
        let mut state = self.state();
        self.open_locked(&mut state, selector)
    }

    fn open_locked(&self, state: &mut State, selector: &str) -> Result<Arc<EntityStore>> {
        if let Some(store) = state.stores.get(selector) {
            return Ok(Arc::clone(store));
        }

        let legacy = Arc::clone(&self.legacy);
        let notifier = Arc::clone(&self.notifier);
        let store = match &self.location {
            Location::Directory(dir) => {
                std::fs::create_dir_all(dir).with_context(|| {
                    format!("Failed to create data directory: {}", dir.display())
                })?;
                let path = dir.join(format!("{selector}.db"));
                EntityStore::open(&path, selector, legacy, notifier)?
            }
            Location::InMemory => EntityStore::open_in_memory(selector, legacy, notifier)?,
        };
        tracing::debug!(store = selector, "opened restaurant store");

        let store = Arc::new(store);
        state.stores.insert(selector.to_string(), Arc::clone(&store));
        Ok(store)
    }

    /// Make `selector` the active store and return it.
    pub fn switch_to(&self, selector: &str) -> Result<Arc<EntityStore>> {
        let selector = validate_selector(selector)?;
        let mut state = self.state();
        let store = self.open_locked(&mut state, selector)?;
        if state.active.as_deref() != Some(selector) {
            tracing::info!(
                from = state.active.as_deref().unwrap_or("-"),
                to = selector,
                "switched active store"
            );
            state.active = Some(selector.to_string());
        }
        Ok(store)
    }

    #[must_use]
    pub fn active(&self) -> Option<Arc<EntityStore>> {
        let state = self.state();
        let selector = state.active.as_ref()?;
        state.stores.get(selector).cloned()
    }

    #[must_use]
    pub fn active_selector(&self) -> Option<String> {
        self.state().active.clone()
    }
}
