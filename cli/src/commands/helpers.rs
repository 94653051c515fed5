use std::sync::Arc;

use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use shadal_core::models::{Restaurant, RestaurantDetail};
use shadal_core::notify::Observer;

/// Observer that only records that a view would have been redrawn.
pub(crate) fn reload_logger(view: &'static str) -> Arc<dyn Observer> {
    Arc::new(move || tracing::debug!(view, "view reloaded"))
}

/// Short markers for the boolean columns, e.g. `★ flyer coupon`.
pub(crate) fn badges(r: &Restaurant) -> String {
    let mut out = Vec::new();
    if r.is_favorite {
        out.push("★");
    }
    if r.is_new {
        out.push("new");
    }
    if r.has_flyer {
        out.push("flyer");
    }
    if r.has_coupon {
        out.push("coupon");
    }
    out.join(" ")
}

/// `16000` -> `16,000`.
pub(crate) fn format_price(price: i64) -> String {
    let digits = price.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if price < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub(crate) fn print_restaurant_table(restaurants: &[Restaurant]) {
    #[derive(Tabled)]
    struct RestaurantRow {
        #[tabled(rename = "#")]
        row_id: i64,
        #[tabled(rename = "Server ID")]
        server_id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Hours")]
        hours: String,
        #[tabled(rename = "Phone")]
        phone: String,
        #[tabled(rename = "")]
        badges: String,
    }

    let rows: Vec<RestaurantRow> = restaurants
        .iter()
        .map(|r| RestaurantRow {
            row_id: r.id,
            server_id: r.server_id,
            name: truncate(&r.name, 30),
            category: r.category.clone(),
            hours: format!("{} - {}", r.opening_hours, r.closing_hours),
            phone: r.phone_number.clone(),
            badges: badges(r),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(0..2)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_detail(detail: &RestaurantDetail) {
    #[derive(Tabled)]
    struct MenuRow {
        #[tabled(rename = "Section")]
        section: String,
        #[tabled(rename = "Item")]
        item: String,
        #[tabled(rename = "Price")]
        price: String,
    }

    let r = &detail.restaurant;
    println!("{} ({})  {}", r.name, r.category, badges(r));
    println!("  Phone: {}", r.phone_number);
    println!("  Hours: {} - {}", r.opening_hours, r.closing_hours);
    if r.has_coupon && !r.coupon_string.is_empty() {
        println!("  Coupon: {}", r.coupon_string);
    }
    println!("  Updated: {}", r.updated_at);

    if detail.sections.is_empty() {
        println!("\nNo menu cached.");
    } else {
        // Section name only on the first row of each run
        let rows: Vec<MenuRow> = detail
            .sections
            .iter()
            .flat_map(|s| {
                s.menus.iter().enumerate().map(move |(i, m)| MenuRow {
                    section: if i == 0 { s.section.clone() } else { String::new() },
                    item: m.item.clone(),
                    price: format_price(m.price),
                })
            })
            .collect();
        let table = Table::new(&rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::new(2..3)).with(Alignment::right()))
            .to_string();
        println!("\n{table}");
    }

    for url in &detail.flyer_urls {
        println!("  Flyer: {url}");
    }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn restaurant() -> Restaurant {
        Restaurant {
            id: 1,
            server_id: 10,
            name: "BBQ".to_string(),
            category: "치킨".to_string(),
            opening_hours: "11.0".to_string(),
            closing_hours: "24.0".to_string(),
            phone_number: "02-000-0000".to_string(),
            has_flyer: true,
            has_coupon: false,
            is_new: true,
            is_favorite: true,
            coupon_string: String::new(),
            updated_at: "t".to_string(),
        }
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(0), "0");
        assert_eq!(format_price(500), "500");
        assert_eq!(format_price(1500), "1,500");
        assert_eq!(format_price(16000), "16,000");
        assert_eq!(format_price(1_234_567), "1,234,567");
        assert_eq!(format_price(-2500), "-2,500");
    }

    #[test]
    fn test_badges() {
        assert_eq!(badges(&restaurant()), "★ new flyer");
        let plain = Restaurant {
            has_flyer: false,
            is_new: false,
            is_favorite: false,
            ..restaurant()
        };
        assert_eq!(badges(&plain), "");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world this is long", 10), "hello w...");
        assert_eq!(truncate("교촌치킨 허니콤보 세트", 6), "교촌치...");
    }
}
