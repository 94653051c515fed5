use serde::{Deserialize, Deserializer};

use crate::error::CacheError;
use crate::models::{NewMenu, RestaurantRecord};

/// Hours placeholder for restaurants only known from a category listing.
pub const PLACEHOLDER_HOURS: &str = "0.0";
pub const PLACEHOLDER_COUPON: &str = "loading...";
/// Never equal to a real server timestamp, so the next listing that mentions
/// the restaurant schedules a full fetch.
pub const PLACEHOLDER_UPDATED_AT: &str = "00:00";

/// A full restaurant record as the server sends it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RestaurantSnapshot {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub category: Option<String>,
    #[serde(rename = "openingHours", default, deserialize_with = "lenient_string")]
    pub opening_hours: Option<String>,
    #[serde(rename = "closingHours", default, deserialize_with = "lenient_string")]
    pub closing_hours: Option<String>,
    pub phone_number: Option<String>,
    pub has_flyer: Option<bool>,
    pub has_coupon: Option<bool>,
    pub is_new: Option<bool>,
    pub coupon_string: Option<String>,
    pub updated_at: Option<String>,
    pub menus: Option<Vec<MenuData>>,
    pub flyers_url: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuData {
    pub name: Option<String>,
    pub section: Option<String>,
    pub price: Option<i64>,
}

/// One row of a category listing. The server only projects a subset of the
/// restaurant columns here, so these are never written to the store as-is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingEntry {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub has_flyer: Option<bool>,
    pub has_coupon: Option<bool>,
    pub is_new: Option<bool>,
    pub updated_at: Option<String>,
}

/// A snapshot whose fields are all present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSnapshot {
    pub record: RestaurantRecord,
    pub menus: Vec<NewMenu>,
    pub flyer_urls: Vec<String>,
}

// Hours arrive as either strings or bare numbers depending on the endpoint.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, CacheError> {
    value.ok_or_else(|| CacheError::malformed(format!("missing field `{field}`")))
}

impl RestaurantSnapshot {
    pub fn validate(self) -> Result<ValidSnapshot, CacheError> {
        let server_id = required(self.id, "id")?;
        let record = RestaurantRecord {
            server_id,
            name: required(self.name, "name")?,
            category: required(self.category, "category")?.trim().to_string(),
            opening_hours: required(self.opening_hours, "openingHours")?,
            closing_hours: required(self.closing_hours, "closingHours")?,
            phone_number: required(self.phone_number, "phone_number")?,
            has_flyer: required(self.has_flyer, "has_flyer")?,
            has_coupon: required(self.has_coupon, "has_coupon")?,
            is_new: required(self.is_new, "is_new")?,
            coupon_string: required(self.coupon_string, "coupon_string")?,
            updated_at: required(self.updated_at, "updated_at")?,
        };

        let menus = required(self.menus, "menus")?
            .into_iter()
            .enumerate()
            .map(|(i, m)| {
                Ok(NewMenu {
                    item: required(m.name, &format!("menus[{i}].name"))?,
                    section: required(m.section, &format!("menus[{i}].section"))?,
                    price: required(m.price, &format!("menus[{i}].price"))?,
                })
            })
            .collect::<Result<Vec<_>, CacheError>>()?;

        let flyer_urls = required(self.flyers_url, "flyers_url")?;

        Ok(ValidSnapshot {
            record,
            menus,
            flyer_urls,
        })
    }
}

impl ListingEntry {
    pub fn server_id(&self) -> Result<i64, CacheError> {
        required(self.id, "id")
    }

    pub fn updated_at(&self) -> Result<&str, CacheError> {
        self.updated_at
            .as_deref()
            .ok_or_else(|| CacheError::malformed("missing field `updated_at`"))
    }

    /// Fill the columns a listing leaves out so a first sighting can be
    /// stored through the regular single-restaurant path.
    #[must_use]
    pub fn placeholder_snapshot(&self, category: &str) -> RestaurantSnapshot {
        RestaurantSnapshot {
            id: self.id,
            name: self.name.clone(),
            category: Some(category.to_string()),
            opening_hours: Some(PLACEHOLDER_HOURS.to_string()),
            closing_hours: Some(PLACEHOLDER_HOURS.to_string()),
            phone_number: self.phone_number.clone(),
            has_flyer: self.has_flyer,
            has_coupon: self.has_coupon,
            is_new: self.is_new,
            coupon_string: Some(PLACEHOLDER_COUPON.to_string()),
            updated_at: Some(PLACEHOLDER_UPDATED_AT.to_string()),
            menus: Some(Vec::new()),
            flyers_url: Some(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_json() -> serde_json::Value {
        serde_json::json!({
            "id": 42,
            "name": "BBQ Chicken",
            "category": " 치킨 ",
            "openingHours": 11.5,
            "closingHours": "24.0",
            "phone_number": "02-123-4567",
            "has_flyer": true,
            "has_coupon": false,
            "is_new": true,
            "coupon_string": "",
            "updated_at": "2015-03-01 12:00:00",
            "menus": [
                {"name": "Fried", "section": "Chicken", "price": 16000},
                {"name": "Cola", "section": "Drinks", "price": 1500}
            ],
            "flyers_url": ["http://img.example/1.jpg"]
        })
    }

    #[test]
    fn test_validate_complete() {
        let snapshot: RestaurantSnapshot = serde_json::from_value(full_json()).unwrap();
        let valid = snapshot.validate().unwrap();

        assert_eq!(valid.record.server_id, 42);
        assert_eq!(valid.record.category, "치킨");
        assert_eq!(valid.record.opening_hours, "11.5");
        assert_eq!(valid.record.closing_hours, "24.0");
        assert!(valid.record.has_flyer);
        assert!(!valid.record.has_coupon);
        assert_eq!(valid.menus.len(), 2);
        assert_eq!(valid.menus[0].item, "Fried");
        assert_eq!(valid.menus[1].price, 1500);
        assert_eq!(valid.flyer_urls, ["http://img.example/1.jpg"]);
    }

    #[test]
    fn test_validate_missing_field() {
        let mut json = full_json();
        json.as_object_mut().unwrap().remove("updated_at");
        let snapshot: RestaurantSnapshot = serde_json::from_value(json).unwrap();
        let err = snapshot.validate().unwrap_err();
        assert!(matches!(err, CacheError::MalformedSnapshot(ref m) if m.contains("updated_at")));
    }

    #[test]
    fn test_validate_missing_menu_price() {
        let mut json = full_json();
        json["menus"][1].as_object_mut().unwrap().remove("price");
        let snapshot: RestaurantSnapshot = serde_json::from_value(json).unwrap();
        let err = snapshot.validate().unwrap_err();
        assert!(matches!(err, CacheError::MalformedSnapshot(ref m) if m == "missing field `menus[1].price`"));
    }

    #[test]
    fn test_placeholder_snapshot_defaults() {
        let entry: ListingEntry = serde_json::from_value(serde_json::json!({
            "id": 7,
            "name": "Hong Kong",
            "phone_number": "02-999-0000",
            "has_flyer": false,
            "has_coupon": true,
            "is_new": false,
            "updated_at": "2015-03-02"
        }))
        .unwrap();

        let valid = entry.placeholder_snapshot("중국집").validate().unwrap();
        assert_eq!(valid.record.server_id, 7);
        assert_eq!(valid.record.category, "중국집");
        assert_eq!(valid.record.opening_hours, PLACEHOLDER_HOURS);
        assert_eq!(valid.record.closing_hours, PLACEHOLDER_HOURS);
        assert_eq!(valid.record.coupon_string, PLACEHOLDER_COUPON);
        assert_eq!(valid.record.updated_at, PLACEHOLDER_UPDATED_AT);
        assert!(valid.record.has_coupon);
        assert!(valid.menus.is_empty());
        assert!(valid.flyer_urls.is_empty());
    }

    #[test]
    fn test_listing_entry_missing_id() {
        let entry = ListingEntry::default();
        assert!(entry.server_id().is_err());
        assert!(entry.updated_at().is_err());
    }
}
