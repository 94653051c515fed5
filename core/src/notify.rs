use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

/// Something on the UI side that re-reads the store when told to.
///
/// `reload` always runs on whichever thread drains the [`UiContext`].
pub trait Observer: Send + Sync {
    fn reload(&self);
}

impl<F> Observer for F
where
    F: Fn() + Send + Sync,
{
    fn reload(&self) {
        self();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReloadTarget {
    RestaurantList,
    Favorites,
    /// Detail screen of the restaurant with this server id.
    Detail(i64),
}

/// A reload waiting on the UI queue.
pub struct Reload {
    pub target: ReloadTarget,
    observer: Arc<dyn Observer>,
}

impl Reload {
    pub fn apply(self) {
        self.observer.reload();
    }
}

#[derive(Default)]
struct Slots {
    restaurant_list: Option<Arc<dyn Observer>>,
    favorites: Option<Arc<dyn Observer>>,
    details: HashMap<i64, Arc<dyn Observer>>,
}

/// Observer registry plus the sending half of the UI queue.
pub struct Notifier {
    slots: Mutex<Slots>,
    ui: mpsc::UnboundedSender<Reload>,
}

/// Receiving half of the UI queue. Owned by the thread that is allowed to
/// touch views.
pub struct UiContext {
    rx: mpsc::UnboundedReceiver<Reload>,
}

impl Notifier {
    #[must_use]
    pub fn new() -> (Arc<Notifier>, UiContext) {
        let (ui, rx) = mpsc::unbounded_channel();
        let notifier = Notifier {
            slots: Mutex::new(Slots::default()),
            ui,
        };
        (Arc::new(notifier), UiContext { rx })
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_restaurant_list(&self, observer: Option<Arc<dyn Observer>>) {
        self.slots().restaurant_list = observer;
    }

    pub fn set_favorites(&self, observer: Option<Arc<dyn Observer>>) {
        self.slots().favorites = observer;
    }

    pub fn subscribe_detail(&self, server_id: i64, observer: Arc<dyn Observer>) {
        self.slots().details.insert(server_id, observer);
    }

    pub fn unsubscribe_detail(&self, server_id: i64) {
        self.slots().details.remove(&server_id);
    }

    /// Queue a reload for `target`. Returns `false` when nobody occupies the
    /// slot (the view may not exist yet) or the UI side is gone.
    pub fn notify(&self, target: ReloadTarget) -> bool {
        let observer = {
            let slots = self.slots();
            match target {
                ReloadTarget::RestaurantList => slots.restaurant_list.clone(),
                ReloadTarget::Favorites => slots.favorites.clone(),
                ReloadTarget::Detail(server_id) => slots.details.get(&server_id).cloned(),
            }
        };
        let Some(observer) = observer else {
            return false;
        };
        if self.ui.send(Reload { target, observer }).is_err() {
            tracing::debug!(?target, "UI context closed, dropping reload");
            return false;
        }
        true
    }
}

impl UiContext {
    /// Run every reload queued so far on the calling thread and report what
    /// was reloaded, in order.
    pub fn drain(&mut self) -> Vec<ReloadTarget> {
        let mut applied = Vec::new();
        while let Ok(reload) = self.rx.try_recv() {
            applied.push(reload.target);
            reload.apply();
        }
        applied
    }

    /// Apply reloads as they arrive until every [`Notifier`] handle is gone.
    pub async fn run(mut self) {
        while let Some(reload) = self.rx.recv().await {
            reload.apply();
        }
    }
}
