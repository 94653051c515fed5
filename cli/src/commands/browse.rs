use anyhow::{Result, bail};
use serde::Serialize;

use shadal_core::models::CATEGORIES;
use shadal_core::store::EntityStore;

use super::helpers::{print_detail, print_restaurant_table, reload_logger};

pub(crate) fn cmd_categories(store: &EntityStore, json: bool) -> Result<()> {
    #[derive(Serialize)]
    struct CategoryCount<'a> {
        category: &'a str,
        restaurants: usize,
    }

    let counts: Vec<CategoryCount> = CATEGORIES
        .iter()
        .map(|&category| CategoryCount {
            category,
            restaurants: store.restaurants_by_category(category).len(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&counts)?);
    } else {
        for c in &counts {
            println!("{:<16} {:>4}", c.category, c.restaurants);
        }
    }
    Ok(())
}

pub(crate) fn cmd_list(store: &EntityStore, category: &str, json: bool) -> Result<()> {
    let category = category.trim();
    let restaurants = store.restaurants_by_category(category);

    if json {
        println!("{}", serde_json::to_string_pretty(&restaurants)?);
    } else if restaurants.is_empty() {
        println!("No restaurants cached for '{category}'. Try `shadal sync {category}`.");
    } else {
        print_restaurant_table(&restaurants);
    }
    Ok(())
}

pub(crate) fn cmd_favorites(store: &EntityStore, json: bool) -> Result<()> {
    let favorites = store.favorite_restaurants();

    if json {
        println!("{}", serde_json::to_string_pretty(&favorites)?);
    } else if favorites.is_empty() {
        println!("No favorites yet.");
    } else {
        print_restaurant_table(&favorites);
    }
    Ok(())
}

pub(crate) fn cmd_show(store: &EntityStore, server_id: i64, json: bool) -> Result<()> {
    let Some(detail) = store.detail(server_id) else {
        bail!("Restaurant {server_id} is not cached");
    };
    store
        .notifier()
        .subscribe_detail(server_id, reload_logger("detail"));

    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
    } else {
        print_detail(&detail);
    }
    Ok(())
}

pub(crate) fn cmd_random(store: &EntityStore, json: bool) -> Result<()> {
    let Some(restaurant) = store.random_restaurant() else {
        bail!("No restaurants cached yet");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&restaurant)?);
    } else {
        print_restaurant_table(std::slice::from_ref(&restaurant));
    }
    Ok(())
}

pub(crate) fn cmd_toggle(store: &EntityStore, row_id: i64, json: bool) -> Result<()> {
    let Some(restaurant) = store.restaurant_by_row_id(row_id) else {
        bail!("No restaurant with row id {row_id}");
    };
    let is_favorite = store.toggle_favorite(row_id);

    if json {
        println!(
            "{}",
            serde_json::json!({
                "id": row_id,
                "server_id": restaurant.server_id,
                "is_favorite": is_favorite,
            })
        );
    } else if is_favorite {
        println!("Added {} to favorites", restaurant.name);
    } else {
        println!("Removed {} from favorites", restaurant.name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use shadal_core::legacy::LegacyBookmarks;
    use shadal_core::models::RestaurantRecord;
    use shadal_core::notify::{Notifier, ReloadTarget, UiContext};

    fn store() -> (EntityStore, UiContext) {
        let (notifier, ui) = Notifier::new();
        let store =
            EntityStore::open_in_memory("test", Arc::new(LegacyBookmarks::default()), notifier)
                .unwrap();
        store.upsert_restaurant(&RestaurantRecord {
            server_id: 10,
            name: "Domino".to_string(),
            category: "피자".to_string(),
            opening_hours: "11.0".to_string(),
            closing_hours: "23.0".to_string(),
            phone_number: "1577-3082".to_string(),
            has_flyer: true,
            has_coupon: true,
            is_new: false,
            coupon_string: "Cola".to_string(),
            updated_at: "t".to_string(),
        });
        (store, ui)
    }

    #[test]
    fn test_read_commands() {
        let (store, _ui) = store();
        cmd_categories(&store, true).unwrap();
        cmd_list(&store, " 피자 ", false).unwrap();
        cmd_list(&store, "냉면", false).unwrap();
        cmd_favorites(&store, false).unwrap();
        cmd_random(&store, true).unwrap();
        cmd_show(&store, 10, false).unwrap();
        assert!(cmd_show(&store, 11, false).is_err());
    }

    #[test]
    fn test_toggle_flips_and_notifies() {
        let (store, mut ui) = store();
        store.notifier().set_favorites(Some(reload_logger("favorites")));
        let row_id = store.restaurant(10).unwrap().id;

        cmd_toggle(&store, row_id, false).unwrap();
        assert!(store.restaurant(10).unwrap().is_favorite);
        cmd_toggle(&store, row_id, true).unwrap();
        assert!(!store.restaurant(10).unwrap().is_favorite);
        assert_eq!(ui.drain(), [ReloadTarget::Favorites, ReloadTarget::Favorites]);

        assert!(cmd_toggle(&store, row_id + 100, false).is_err());
    }

    #[test]
    fn test_random_on_empty_store() {
        let (notifier, _ui) = Notifier::new();
        let store =
            EntityStore::open_in_memory("empty", Arc::new(LegacyBookmarks::default()), notifier)
                .unwrap();
        assert!(cmd_random(&store, false).is_err());
    }
}
