use serde::{Deserialize, Serialize};

/// Categories in the order the favorites view walks them.
///
/// Restaurants filed under any other category are still listed by
/// category but never show up among favorites.
pub const CATEGORIES: &[&str] = &[
    "치킨",
    "피자",
    "중국집",
    "한식/분식",
    "도시락/돈까스",
    "족발/보쌈",
    "냉면",
    "기타",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restaurant {
    /// Local surrogate key. Only the favorite toggle addresses rows by it.
    pub id: i64,
    pub server_id: i64,
    pub name: String,
    pub category: String,
    pub opening_hours: String,
    pub closing_hours: String,
    pub phone_number: String,
    pub has_flyer: bool,
    pub has_coupon: bool,
    pub is_new: bool,
    pub is_favorite: bool,
    pub coupon_string: String,
    pub updated_at: String,
}

/// Every server-owned column of a restaurant row.
///
/// `is_favorite` is not one of them: it is seeded from the legacy
/// bookmark set on insert and only the toggle changes it afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestaurantRecord {
    pub server_id: i64,
    pub name: String,
    pub category: String,
    pub opening_hours: String,
    pub closing_hours: String,
    pub phone_number: String,
    pub has_flyer: bool,
    pub has_coupon: bool,
    pub is_new: bool,
    pub coupon_string: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    pub id: i64,
    pub item: String,
    pub section: String,
    /// Minor currency unit.
    pub price: i64,
    pub restaurant_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMenu {
    pub item: String,
    pub section: String,
    pub price: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuSection {
    pub section: String,
    pub menus: Vec<Menu>,
}

/// Group menus that are already in section order into consecutive runs.
#[must_use]
pub fn group_sections(menus: Vec<Menu>) -> Vec<MenuSection> {
    let mut sections: Vec<MenuSection> = Vec::new();
    for menu in menus {
        match sections.last_mut() {
            Some(last) if last.section == menu.section => last.menus.push(menu),
            _ => sections.push(MenuSection {
                section: menu.section.clone(),
                menus: vec![menu],
            }),
        }
    }
    sections
}

/// A restaurant together with everything the detail screen shows.
#[derive(Debug, Clone, Serialize)]
pub struct RestaurantDetail {
    pub restaurant: Restaurant,
    pub sections: Vec<MenuSection>,
    pub flyer_urls: Vec<String>,
}

/// Outcome of writing a restaurant row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted { row_id: i64, is_favorite: bool },
    Updated { row_id: i64 },
}

impl Upsert {
    #[must_use]
    pub fn row_id(self) -> i64 {
        match self {
            Upsert::Inserted { row_id, .. } | Upsert::Updated { row_id } => row_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn menu(id: i64, section: &str) -> Menu {
        Menu {
            id,
            item: format!("item {id}"),
            section: section.to_string(),
            price: 1000,
            restaurant_id: 1,
        }
    }

    #[test]
    fn test_group_sections_runs() {
        let grouped = group_sections(vec![
            menu(1, "Soup"),
            menu(3, "Soup"),
            menu(2, "Main"),
            menu(4, "Dessert"),
        ]);
        let names: Vec<&str> = grouped.iter().map(|s| s.section.as_str()).collect();
        assert_eq!(names, ["Soup", "Main", "Dessert"]);
        assert_eq!(grouped[0].menus.len(), 2);
    }

    #[test]
    fn test_group_sections_empty() {
        assert!(group_sections(Vec::new()).is_empty());
    }

    #[test]
    fn test_upsert_row_id() {
        assert_eq!(
            Upsert::Inserted {
                row_id: 4,
                is_favorite: true
            }
            .row_id(),
            4
        );
        assert_eq!(Upsert::Updated { row_id: 9 }.row_id(), 9);
    }
}
