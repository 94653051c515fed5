use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, params};

use crate::models::{CATEGORIES, Menu, NewMenu, Restaurant, RestaurantRecord, Upsert};

/// Bumping this wipes the local cache on next open; it is repopulated from
/// the server.
pub const SCHEMA_VERSION: i64 = 18;

const RESTAURANT_COLUMNS: &str = "id, server_id, name, category, openingHours, closingHours, \
     phoneNumber, has_flyer, has_coupon, is_new, is_favorite, coupon_string, updated_at";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version != SCHEMA_VERSION {
            // No upgrade path: the cache is disposable.
            self.conn
                .execute_batch(&format!(
                    "DROP TABLE IF EXISTS restaurants;
                     DROP TABLE IF EXISTS menus;
                     DROP TABLE IF EXISTS flyers;

                     CREATE TABLE restaurants (
                         id INTEGER PRIMARY KEY AUTOINCREMENT,
                         server_id INTEGER NOT NULL,
                         name TEXT NOT NULL,
                         category TEXT NOT NULL,
                         openingHours TEXT NOT NULL,
                         closingHours TEXT NOT NULL,
                         phoneNumber TEXT NOT NULL,
                         has_flyer INTEGER NOT NULL DEFAULT 0,
                         has_coupon INTEGER NOT NULL DEFAULT 0,
                         is_new INTEGER NOT NULL DEFAULT 0,
                         is_favorite INTEGER NOT NULL DEFAULT 0,
                         coupon_string TEXT NOT NULL,
                         updated_at TEXT NOT NULL
                     );

                     CREATE TABLE menus (
                         id INTEGER PRIMARY KEY AUTOINCREMENT,
                         menu TEXT NOT NULL,
                         section TEXT NOT NULL,
                         price INTEGER NOT NULL,
                         restaurant_id INTEGER NOT NULL
                     );

                     CREATE TABLE flyers (
                         id INTEGER PRIMARY KEY AUTOINCREMENT,
                         url TEXT NOT NULL,
                         restaurant_id INTEGER NOT NULL
                     );

                     CREATE UNIQUE INDEX idx_restaurants_server_id ON restaurants(server_id);
                     CREATE INDEX idx_restaurants_category ON restaurants(category);
                     CREATE INDEX idx_menus_restaurant ON menus(restaurant_id);
                     CREATE INDEX idx_flyers_restaurant ON flyers(restaurant_id);

                     PRAGMA user_version = {SCHEMA_VERSION};"
                ))
                .context("Failed to create cache schema")?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    fn restaurant_from_row(row: &rusqlite::Row) -> rusqlite::Result<Restaurant> {
        Ok(Restaurant {
            id: row.get(0)?,
            server_id: row.get(1)?,
            name: row.get(2)?,
            category: row.get(3)?,
            opening_hours: row.get(4)?,
            closing_hours: row.get(5)?,
            phone_number: row.get(6)?,
            has_flyer: row.get(7)?,
            has_coupon: row.get(8)?,
            is_new: row.get(9)?,
            is_favorite: row.get(10)?,
            coupon_string: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }

    fn menu_from_row(row: &rusqlite::Row) -> rusqlite::Result<Menu> {
        Ok(Menu {
            id: row.get(0)?,
            item: row.get(1)?,
            section: row.get(2)?,
            price: row.get(3)?,
            restaurant_id: row.get(4)?,
        })
    }

    // --- Restaurants ---

    /// Insert or overwrite the row for `record.server_id`.
    ///
    /// `favorite_on_insert` is only used when the row is new; an update
    /// leaves `is_favorite` as it is.
    pub fn upsert_restaurant(
        &self,
        record: &RestaurantRecord,
        favorite_on_insert: bool,
    ) -> Result<Upsert> {
        if let Some(row_id) = self.row_id_for_server_id(record.server_id)? {
            self.conn
                .execute(
                    "UPDATE restaurants SET name = ?1, category = ?2, openingHours = ?3,
                        closingHours = ?4, phoneNumber = ?5, has_flyer = ?6, has_coupon = ?7,
                        is_new = ?8, coupon_string = ?9, updated_at = ?10
                     WHERE id = ?11",
                    params![
                        record.name,
                        record.category,
                        record.opening_hours,
                        record.closing_hours,
                        record.phone_number,
                        record.has_flyer,
                        record.has_coupon,
                        record.is_new,
                        record.coupon_string,
                        record.updated_at,
                        row_id,
                    ],
                )
                .with_context(|| format!("Failed to update restaurant {}", record.server_id))?;
            return Ok(Upsert::Updated { row_id });
        }

        self.conn
            .execute(
                "INSERT INTO restaurants (server_id, name, category, openingHours, closingHours,
                    phoneNumber, has_flyer, has_coupon, is_new, is_favorite, coupon_string, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    record.server_id,
                    record.name,
                    record.category,
                    record.opening_hours,
                    record.closing_hours,
                    record.phone_number,
                    record.has_flyer,
                    record.has_coupon,
                    record.is_new,
                    favorite_on_insert,
                    record.coupon_string,
                    record.updated_at,
                ],
            )
            .with_context(|| format!("Failed to insert restaurant {}", record.server_id))?;
        Ok(Upsert::Inserted {
            row_id: self.conn.last_insert_rowid(),
            is_favorite: favorite_on_insert,
        })
    }

    fn row_id_for_server_id(&self, server_id: i64) -> Result<Option<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM restaurants WHERE server_id = ?1")?;
        let mut rows = stmt.query(params![server_id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }

    /// Menus and flyers of the restaurant are left in place.
    pub fn delete_restaurant(&self, server_id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM restaurants WHERE server_id = ?1",
            params![server_id],
        )?;
        Ok(rows > 0)
    }

    pub fn get_restaurant_by_server_id(&self, server_id: i64) -> Result<Option<Restaurant>> {
        self.query_one_restaurant(
            &format!("SELECT {RESTAURANT_COLUMNS} FROM restaurants WHERE server_id = ?1"),
            server_id,
        )
    }

    pub fn get_restaurant_by_row_id(&self, row_id: i64) -> Result<Option<Restaurant>> {
        self.query_one_restaurant(
            &format!("SELECT {RESTAURANT_COLUMNS} FROM restaurants WHERE id = ?1"),
            row_id,
        )
    }

    fn query_one_restaurant(&self, sql: &str, key: i64) -> Result<Option<Restaurant>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params![key])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Self::restaurant_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn get_random_restaurant(&self) -> Result<Option<Restaurant>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RESTAURANT_COLUMNS} FROM restaurants ORDER BY RANDOM() LIMIT 1"
        ))?;
        let mut rows = stmt.query([])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Self::restaurant_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// Flyer-carrying restaurants first, then by name.
    pub fn get_restaurants_by_category(&self, category: &str) -> Result<Vec<Restaurant>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RESTAURANT_COLUMNS} FROM restaurants
             WHERE category = ?1
             ORDER BY has_flyer DESC, name ASC"
        ))?;
        let restaurants = stmt
            .query_map(params![category], Self::restaurant_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(restaurants)
    }

    /// Favorites grouped by [`CATEGORIES`] order, each group sorted like
    /// [`Self::get_restaurants_by_category`].
    pub fn get_favorite_restaurants(&self) -> Result<Vec<Restaurant>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RESTAURANT_COLUMNS} FROM restaurants
             WHERE is_favorite = 1 AND category = ?1
             ORDER BY has_flyer DESC, name ASC"
        ))?;
        let mut favorites = Vec::new();
        for category in CATEGORIES {
            let rows = stmt
                .query_map(params![category], Self::restaurant_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            favorites.extend(rows);
        }
        Ok(favorites)
    }

    pub fn get_server_ids_in_category(&self, category: &str) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT server_id FROM restaurants WHERE category = ?1 ORDER BY id")?;
        let ids = stmt
            .query_map(params![category], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Flip `is_favorite` on the row with surrogate id `row_id`.
    /// Returns the new value, or `None` when no such row exists.
    pub fn toggle_favorite(&self, row_id: i64) -> Result<Option<bool>> {
        let mut stmt = self
            .conn
            .prepare("SELECT is_favorite FROM restaurants WHERE id = ?1")?;
        let mut rows = stmt.query(params![row_id])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let current: bool = row.get(0)?;
        let toggled = !current;
        self.conn.execute(
            "UPDATE restaurants SET is_favorite = ?1 WHERE id = ?2",
            params![toggled, row_id],
        )?;
        Ok(Some(toggled))
    }

    // --- Menus ---

    pub fn replace_menus(&self, restaurant_id: i64, menus: &[NewMenu]) -> Result<()> {
        self.conn.execute(
            "DELETE FROM menus WHERE restaurant_id = ?1",
            params![restaurant_id],
        )?;
        let mut stmt = self.conn.prepare(
            "INSERT INTO menus (menu, section, price, restaurant_id) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for menu in menus {
            stmt.execute(params![menu.item, menu.section, menu.price, restaurant_id])
                .with_context(|| format!("Failed to insert menu for restaurant {restaurant_id}"))?;
        }
        Ok(())
    }

    /// Menus of a restaurant with each section's items adjacent. Sections
    /// appear in the order their first item was stored.
    pub fn get_menus_by_section(&self, restaurant_id: i64) -> Result<Vec<Menu>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, menu, section, price, restaurant_id FROM menus
             WHERE restaurant_id = ?1
             ORDER BY id",
        )?;
        let menus = stmt
            .query_map(params![restaurant_id], Self::menu_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut sections: Vec<&str> = Vec::new();
        for menu in &menus {
            if !sections.contains(&menu.section.as_str()) {
                sections.push(&menu.section);
            }
        }
        let ordered = sections
            .iter()
            .flat_map(|section| menus.iter().filter(move |m| m.section == *section))
            .cloned()
            .collect();
        Ok(ordered)
    }

    // --- Flyers ---

    pub fn replace_flyers(&self, restaurant_id: i64, urls: &[String]) -> Result<()> {
        self.conn.execute(
            "DELETE FROM flyers WHERE restaurant_id = ?1",
            params![restaurant_id],
        )?;
        let mut stmt = self
            .conn
            .prepare("INSERT INTO flyers (url, restaurant_id) VALUES (?1, ?2)")?;
        for url in urls {
            stmt.execute(params![url, restaurant_id])
                .with_context(|| format!("Failed to insert flyer for restaurant {restaurant_id}"))?;
        }
        Ok(())
    }

    pub fn get_flyer_urls(&self, restaurant_id: i64) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT url FROM flyers WHERE restaurant_id = ?1 ORDER BY id")?;
        let urls = stmt
            .query_map(params![restaurant_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(urls)
    }
}
