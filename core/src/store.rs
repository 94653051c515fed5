use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;

use crate::db::Database;
use crate::error::CacheError;
use crate::legacy::LegacyBookmarks;
use crate::models::{
    Menu, MenuSection, NewMenu, Restaurant, RestaurantDetail, RestaurantRecord, Upsert,
    group_sections,
};
use crate::notify::{Notifier, ReloadTarget};

/// The local restaurant cache for one campus.
///
/// Public operations never fail: storage faults are logged and turned into
/// an empty or absent result. The `try_*` variants are for the reconciler,
/// which needs to know when to stop.
pub struct EntityStore {
    label: String,
    db: Mutex<Database>,
    legacy: Arc<LegacyBookmarks>,
    notifier: Arc<Notifier>,
}

impl EntityStore {
    pub fn open(
        path: &Path,
        label: &str,
        legacy: Arc<LegacyBookmarks>,
        notifier: Arc<Notifier>,
    ) -> Result<Self> {
        let db = Database::open(path)?;
        Ok(Self::from_database(db, label, legacy, notifier))
    }

    pub fn open_in_memory(
        label: &str,
        legacy: Arc<LegacyBookmarks>,
        notifier: Arc<Notifier>,
    ) -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self::from_database(db, label, legacy, notifier))
    }

    fn from_database(
        db: Database,
        label: &str,
        legacy: Arc<LegacyBookmarks>,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            label: label.to_string(),
            db: Mutex::new(db),
            legacy,
            notifier,
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn notifier(&self) -> &Arc<Notifier> {
        &self.notifier
    }

    fn run<T>(&self, f: impl FnOnce(&Database) -> Result<T>) -> Result<T, CacheError> {
        let db = self.db.lock().unwrap_or_else(PoisonError::into_inner);
        f(&db).map_err(CacheError::from)
    }

    fn swallow<T: Default>(&self, op: &str, result: Result<T, CacheError>) -> T {
        result.unwrap_or_else(|err| {
            tracing::warn!(store = %self.label, op, error = %err, "storage fault, using empty result");
            T::default()
        })
    }

    // --- Writes ---

    pub fn try_upsert_restaurant(&self, record: &RestaurantRecord) -> Result<Upsert, CacheError> {
        let seed_favorite = self.legacy.contains(record.server_id);
        self.run(|db| db.upsert_restaurant(record, seed_favorite))
    }

    pub fn try_replace_menus(&self, server_id: i64, menus: &[NewMenu]) -> Result<(), CacheError> {
        self.run(|db| db.replace_menus(server_id, menus))
    }

    pub fn try_replace_flyers(&self, server_id: i64, urls: &[String]) -> Result<(), CacheError> {
        self.run(|db| db.replace_flyers(server_id, urls))
    }

    pub fn try_delete_restaurant(&self, server_id: i64) -> Result<bool, CacheError> {
        self.run(|db| db.delete_restaurant(server_id))
    }

    /// A new row is marked favorite iff its server id is a legacy bookmark;
    /// an existing row keeps its favorite flag.
    pub fn upsert_restaurant(&self, record: &RestaurantRecord) -> Option<Upsert> {
        let result = self.try_upsert_restaurant(record).map(Some);
        self.swallow("upsert_restaurant", result)
    }

    /// Returns whether the replacement went through.
    pub fn replace_menus(&self, server_id: i64, menus: &[NewMenu]) -> bool {
        let result = self.try_replace_menus(server_id, menus).map(|()| true);
        self.swallow("replace_menus", result)
    }

    pub fn replace_flyers(&self, server_id: i64, urls: &[String]) -> bool {
        let result = self.try_replace_flyers(server_id, urls).map(|()| true);
        self.swallow("replace_flyers", result)
    }

    /// Does not touch the restaurant's menus or flyers.
    pub fn delete_restaurant(&self, server_id: i64) -> bool {
        let result = self.try_delete_restaurant(server_id);
        self.swallow("delete_restaurant", result)
    }

    /// Flip the favorite flag of the row with surrogate id `row_id` and
    /// return the new value. A missing row yields `false`.
    pub fn toggle_favorite(&self, row_id: i64) -> bool {
        let toggled = match self.run(|db| db.toggle_favorite(row_id)) {
            Ok(Some(value)) => value,
            Ok(None) => {
                tracing::warn!(store = %self.label, row_id, "no restaurant to toggle");
                false
            }
            Err(err) => {
                tracing::warn!(store = %self.label, row_id, error = %err, "storage fault while toggling favorite");
                false
            }
        };
        self.notifier.notify(ReloadTarget::Favorites);
        toggled
    }

    // --- Reads ---

    pub fn try_restaurant(&self, server_id: i64) -> Result<Option<Restaurant>, CacheError> {
        self.run(|db| db.get_restaurant_by_server_id(server_id))
    }

    pub fn try_server_ids_in_category(&self, category: &str) -> Result<Vec<i64>, CacheError> {
        self.run(|db| db.get_server_ids_in_category(category))
    }

    pub fn restaurant(&self, server_id: i64) -> Option<Restaurant> {
        let result = self.try_restaurant(server_id);
        self.swallow("restaurant", result)
    }

    pub fn restaurant_by_row_id(&self, row_id: i64) -> Option<Restaurant> {
        let result = self.run(|db| db.get_restaurant_by_row_id(row_id));
        self.swallow("restaurant_by_row_id", result)
    }

    pub fn random_restaurant(&self) -> Option<Restaurant> {
        let result = self.run(Database::get_random_restaurant);
        self.swallow("random_restaurant", result)
    }

    pub fn restaurants_by_category(&self, category: &str) -> Vec<Restaurant> {
        let result = self.run(|db| db.get_restaurants_by_category(category));
        self.swallow("restaurants_by_category", result)
    }

    pub fn favorite_restaurants(&self) -> Vec<Restaurant> {
        let result = self.run(Database::get_favorite_restaurants);
        self.swallow("favorite_restaurants", result)
    }

    pub fn menus_by_section(&self, server_id: i64) -> Vec<Menu> {
        let result = self.run(|db| db.get_menus_by_section(server_id));
        self.swallow("menus_by_section", result)
    }

    pub fn menu_sections(&self, server_id: i64) -> Vec<MenuSection> {
        group_sections(self.menus_by_section(server_id))
    }

    pub fn flyer_urls(&self, server_id: i64) -> Vec<String> {
        let result = self.run(|db| db.get_flyer_urls(server_id));
        self.swallow("flyer_urls", result)
    }

    pub fn detail(&self, server_id: i64) -> Option<RestaurantDetail> {
        let restaurant = self.restaurant(server_id)?;
        Some(RestaurantDetail {
            restaurant,
            sections: self.menu_sections(server_id),
            flyer_urls: self.flyer_urls(server_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::UiContext;

    fn store_with(legacy: &[i64]) -> (EntityStore, UiContext) {
        let (notifier, ui) = Notifier::new();
        let legacy = Arc::new(legacy.iter().copied().collect());
        let store = EntityStore::open_in_memory("test", legacy, notifier).unwrap();
        (store, ui)
    }

    fn record(server_id: i64, name: &str) -> RestaurantRecord {
        RestaurantRecord {
            server_id,
            name: name.to_string(),
            category: "치킨".to_string(),
            opening_hours: "11.0".to_string(),
            closing_hours: "23.0".to_string(),
            phone_number: "02-000-0000".to_string(),
            has_flyer: false,
            has_coupon: false,
            is_new: false,
            coupon_string: String::new(),
            updated_at: "2015-01-01".to_string(),
        }
    }

    #[test]
    fn test_legacy_bookmark_seeds_favorite_on_insert() {
        let (store, _ui) = store_with(&[1]);
        let bookmarked = store.upsert_restaurant(&record(1, "A")).unwrap();
        let plain = store.upsert_restaurant(&record(2, "B")).unwrap();

        assert!(matches!(bookmarked, Upsert::Inserted { is_favorite: true, .. }));
        assert!(matches!(plain, Upsert::Inserted { is_favorite: false, .. }));
        assert!(store.restaurant(1).unwrap().is_favorite);
        assert!(!store.restaurant(2).unwrap().is_favorite);
    }

    #[test]
    fn test_legacy_bookmark_ignored_on_update() {
        let (store, _ui) = store_with(&[1]);
        let row_id = store.upsert_restaurant(&record(1, "A")).unwrap().row_id();
        assert!(!store.toggle_favorite(row_id));

        let upsert = store.upsert_restaurant(&record(1, "A2")).unwrap();
        assert_eq!(upsert, Upsert::Updated { row_id });
        assert!(!store.restaurant(1).unwrap().is_favorite);
    }

    #[test]
    fn test_toggle_notifies_favorites() {
        let (store, mut ui) = store_with(&[]);
        let count = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let seen = count.clone();
        store.notifier().set_favorites(Some(Arc::new(move || {
            seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        })));

        let row_id = store.upsert_restaurant(&record(5, "E")).unwrap().row_id();
        assert!(store.toggle_favorite(row_id));
        assert!(!store.toggle_favorite(row_id));

        assert_eq!(ui.drain(), [ReloadTarget::Favorites, ReloadTarget::Favorites]);
        assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn test_toggle_uses_row_id_not_server_id() {
        let (store, _ui) = store_with(&[]);
        let row_id = store.upsert_restaurant(&record(500, "E")).unwrap().row_id();
        assert_ne!(row_id, 500);

        assert!(!store.toggle_favorite(500));
        assert!(!store.restaurant(500).unwrap().is_favorite);
        assert!(store.toggle_favorite(row_id));
        assert!(store.restaurant_by_row_id(row_id).unwrap().is_favorite);
    }

    #[test]
    fn test_detail() {
        let (store, _ui) = store_with(&[]);
        store.upsert_restaurant(&record(3, "C"));
        store.replace_menus(
            3,
            &[
                NewMenu {
                    item: "Fried".to_string(),
                    section: "Chicken".to_string(),
                    price: 16000,
                },
                NewMenu {
                    item: "Cola".to_string(),
                    section: "Drinks".to_string(),
                    price: 1500,
                },
            ],
        );
        store.replace_flyers(3, &["f.jpg".to_string()]);

        let detail = store.detail(3).unwrap();
        assert_eq!(detail.restaurant.name, "C");
        assert_eq!(detail.sections.len(), 2);
        assert_eq!(detail.sections[1].menus[0].item, "Cola");
        assert_eq!(detail.flyer_urls, ["f.jpg"]);
        assert!(store.detail(4).is_none());
    }

    #[test]
    fn test_reads_on_empty_store() {
        let (store, _ui) = store_with(&[]);
        assert!(store.restaurants_by_category("치킨").is_empty());
        assert!(store.favorite_restaurants().is_empty());
        assert!(store.random_restaurant().is_none());
        assert!(store.menus_by_section(1).is_empty());
        assert!(store.flyer_urls(1).is_empty());
        assert!(!store.delete_restaurant(1));
    }
}
