use async_trait::async_trait;

use crate::error::CacheError;
use crate::snapshot::{ListingEntry, RestaurantSnapshot};

/// Where fresh restaurant data comes from.
///
/// The CLI implements this over HTTP with reqwest. Implementations own
/// transport concerns (timeouts, retries); the core only sees a snapshot or
/// a [`CacheError::Gateway`].
#[async_trait]
pub trait ServerGateway: Send + Sync {
    /// Full record of one restaurant. `known_updated_at` is the timestamp of
    /// the local copy, empty when there is none.
    async fn fetch_restaurant(
        &self,
        server_id: i64,
        known_updated_at: &str,
    ) -> Result<RestaurantSnapshot, CacheError>;

    /// Partial records of every restaurant currently listed in `category`.
    async fn fetch_category(&self, category: &str) -> Result<Vec<ListingEntry>, CacheError>;
}

#[cfg(test)]
pub(crate) mod scripted {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// Serves canned JSON and records every request.
    #[derive(Default)]
    pub(crate) struct ScriptedGateway {
        restaurants: Mutex<HashMap<i64, serde_json::Value>>,
        listings: Mutex<HashMap<String, serde_json::Value>>,
        restaurant_requests: Mutex<Vec<(i64, String)>>,
        category_requests: Mutex<Vec<String>>,
    }

    impl ScriptedGateway {
        pub(crate) fn with_restaurant(self, server_id: i64, json: serde_json::Value) -> Self {
            self.restaurants.lock().unwrap().insert(server_id, json);
            self
        }

        pub(crate) fn with_listing(self, category: &str, json: serde_json::Value) -> Self {
            self.listings
                .lock()
                .unwrap()
                .insert(category.to_string(), json);
            self
        }

        pub(crate) fn restaurant_requests(&self) -> Vec<(i64, String)> {
            self.restaurant_requests.lock().unwrap().clone()
        }

        pub(crate) fn category_requests(&self) -> Vec<String> {
            self.category_requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ServerGateway for ScriptedGateway {
        async fn fetch_restaurant(
            &self,
            server_id: i64,
            known_updated_at: &str,
        ) -> Result<RestaurantSnapshot, CacheError> {
            self.restaurant_requests
                .lock()
                .unwrap()
                .push((server_id, known_updated_at.to_string()));
            let json = self
                .restaurants
                .lock()
                .unwrap()
                .get(&server_id)
                .cloned()
                .ok_or_else(|| CacheError::gateway(format!("no restaurant {server_id}")))?;
            serde_json::from_value(json).map_err(|e| CacheError::malformed(e.to_string()))
        }

        async fn fetch_category(&self, category: &str) -> Result<Vec<ListingEntry>, CacheError> {
            self.category_requests
                .lock()
                .unwrap()
                .push(category.to_string());
            let json = self
                .listings
                .lock()
                .unwrap()
                .get(category)
                .cloned()
                .ok_or_else(|| CacheError::gateway(format!("no listing for {category}")))?;
            serde_json::from_value(json).map_err(|e| CacheError::malformed(e.to_string()))
        }
    }
}
