use std::collections::HashSet;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::CacheError;
use crate::gateway::ServerGateway;
use crate::models::Upsert;
use crate::notify::ReloadTarget;
use crate::snapshot::{ListingEntry, RestaurantSnapshot};
use crate::store::EntityStore;

/// Fetches scheduled by a category reconciliation.
///
/// Dropping this leaves the fetches running; awaiting [`Self::wait`] blocks
/// until each one has been applied to the store (or has failed).
#[derive(Default)]
pub struct PendingRefreshes(Vec<JoinHandle<()>>);

impl PendingRefreshes {
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub async fn wait(self) {
        for handle in self.0 {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "restaurant refresh task did not finish");
            }
        }
    }
}

/// Brings an [`EntityStore`] in line with what the server reports.
pub struct Reconciler {
    store: Arc<EntityStore>,
    gateway: Arc<dyn ServerGateway>,
    runtime: Handle,
}

impl Reconciler {
    pub fn new(store: Arc<EntityStore>, gateway: Arc<dyn ServerGateway>, runtime: Handle) -> Self {
        Self {
            store,
            gateway,
            runtime,
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }

    /// Store one restaurant with its menus and flyers.
    ///
    /// Writes happen in order (row, menus, flyers); the first failure stops
    /// the rest and nothing is rolled back. The detail view of the
    /// restaurant and the restaurant list are reloaded either way.
    pub fn reconcile_single(&self, snapshot: RestaurantSnapshot) -> Option<Upsert> {
        apply_snapshot(&self.store, snapshot)
    }

    /// Reconcile the cached rows of `category` against a listing.
    ///
    /// Known restaurants whose `updated_at` moved are re-fetched in full in
    /// the background; unknown ones are stored with placeholder columns;
    /// cached rows missing from the listing are deleted.
    pub fn reconcile_category(&self, listing: &[ListingEntry], category: &str) -> PendingRefreshes {
        let category = category.trim();
        let mut pending = Vec::new();
        if let Err(err) = self.walk_listing(listing, category, &mut pending) {
            tracing::warn!(
                store = %self.store.label(),
                category,
                error = %err,
                "category reconciliation aborted"
            );
        }
        self.store.notifier().notify(ReloadTarget::RestaurantList);
        PendingRefreshes(pending)
    }

    fn walk_listing(
        &self,
        listing: &[ListingEntry],
        category: &str,
        pending: &mut Vec<JoinHandle<()>>,
    ) -> Result<(), CacheError> {
        let mut listed = HashSet::with_capacity(listing.len());
        let mut added = 0usize;

        for entry in listing {
            let server_id = entry.server_id()?;
            listed.insert(server_id);

            match self.store.try_restaurant(server_id)? {
                Some(local) => {
                    let remote_updated_at = entry.updated_at()?;
                    if local.updated_at != remote_updated_at {
                        tracing::debug!(
                            server_id,
                            local = %local.updated_at,
                            remote = %remote_updated_at,
                            "restaurant outdated, fetching full record"
                        );
                        pending.push(self.schedule_refresh(server_id, local.updated_at));
                    }
                }
                None => {
                    // A listing row is incomplete; store placeholders now and
                    // let the next listing trigger the full fetch.
                    if apply_snapshot(&self.store, entry.placeholder_snapshot(category)).is_some() {
                        added += 1;
                    }
                }
            }
        }

        let mut removed = 0usize;
        for server_id in self.store.try_server_ids_in_category(category)? {
            if !listed.contains(&server_id) {
                tracing::debug!(server_id, category, "restaurant no longer listed, deleting");
                self.store.try_delete_restaurant(server_id)?;
                removed += 1;
            }
        }

        tracing::info!(
            store = %self.store.label(),
            category,
            listed = listed.len(),
            added,
            refreshing = pending.len(),
            removed,
            "category reconciled"
        );
        Ok(())
    }

    fn schedule_refresh(&self, server_id: i64, known_updated_at: String) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let gateway = Arc::clone(&self.gateway);
        self.runtime.spawn(async move {
            match gateway.fetch_restaurant(server_id, &known_updated_at).await {
                Ok(snapshot) => {
                    apply_snapshot(&store, snapshot);
                }
                Err(err) => {
                    tracing::warn!(server_id, error = %err, "restaurant refresh failed, keeping cached row");
                }
            }
        })
    }

    /// Fetch the listing for `category` and reconcile against it.
    pub async fn refresh_category(&self, category: &str) -> PendingRefreshes {
        match self.gateway.fetch_category(category).await {
            Ok(listing) => self.reconcile_category(&listing, category),
            Err(err) => {
                tracing::warn!(category, error = %err, "category listing unavailable");
                PendingRefreshes::default()
            }
        }
    }

    /// Fetch and store the full record of one restaurant.
    pub async fn refresh_restaurant(&self, server_id: i64) -> Option<Upsert> {
        let known_updated_at = self
            .store
            .restaurant(server_id)
            .map(|r| r.updated_at)
            .unwrap_or_default();
        match self
            .gateway
            .fetch_restaurant(server_id, &known_updated_at)
            .await
        {
            Ok(snapshot) => self.reconcile_single(snapshot),
            Err(err) => {
                tracing::warn!(server_id, error = %err, "restaurant unavailable");
                None
            }
        }
    }
}

fn apply_snapshot(store: &EntityStore, snapshot: RestaurantSnapshot) -> Option<Upsert> {
    let server_id = snapshot.id;
    let upsert = match write_snapshot(store, snapshot) {
        Ok(upsert) => Some(upsert),
        Err(err) => {
            tracing::warn!(
                store = %store.label(),
                server_id,
                error = %err,
                "restaurant snapshot not fully applied"
            );
            None
        }
    };

    let notifier = store.notifier();
    if let Some(server_id) = server_id {
        notifier.notify(ReloadTarget::Detail(server_id));
    }
    notifier.notify(ReloadTarget::RestaurantList);
    upsert
}

fn write_snapshot(store: &EntityStore, snapshot: RestaurantSnapshot) -> Result<Upsert, CacheError> {
    let valid = snapshot.validate()?;
    let server_id = valid.record.server_id;

    let upsert = store.try_upsert_restaurant(&valid.record)?;
    if let Upsert::Inserted {
        is_favorite: true, ..
    } = upsert
    {
        store.notifier().notify(ReloadTarget::Favorites);
    }
    store.try_replace_menus(server_id, &valid.menus)?;
    store.try_replace_flyers(server_id, &valid.flyer_urls)?;

    tracing::debug!(server_id, ?upsert, menus = valid.menus.len(), "restaurant stored");
    Ok(upsert)
}
