use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;

use shadal_core::error::CacheError;
use shadal_core::gateway::ServerGateway;
use shadal_core::snapshot::{ListingEntry, RestaurantSnapshot};

/// Talks to the shadal directory server over HTTP.
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpGateway {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("Invalid server URL: {base_url}"))?;
        if base_url.cannot_be_a_base() {
            bail!("Invalid server URL: {base_url}");
        }
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "shadal-cli/{} (restaurant directory)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(std::time::Duration::from_secs(10))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("Invalid server URL: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn restaurant_url(&self, server_id: i64) -> Result<Url> {
        self.endpoint(&["restaurants", &server_id.to_string()])
    }

    fn category_url(&self, category: &str) -> Result<Url> {
        self.endpoint(&["categories", category, "restaurants"])
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<T, CacheError> {
        tracing::debug!(%url, "GET");
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| CacheError::gateway(format!("Failed to reach server: {e}")))?;

        resp.json().await.map_err(|e| {
            if e.is_decode() {
                CacheError::malformed(format!("Failed to parse server response: {e}"))
            } else {
                CacheError::gateway(format!("Failed to read server response: {e}"))
            }
        })
    }
}

#[async_trait]
impl ServerGateway for HttpGateway {
    async fn fetch_restaurant(
        &self,
        server_id: i64,
        known_updated_at: &str,
    ) -> Result<RestaurantSnapshot, CacheError> {
        let url = self.restaurant_url(server_id).map_err(CacheError::gateway)?;
        self.get_json(url, &[("updated_at", known_updated_at)]).await
    }

    async fn fetch_category(&self, category: &str) -> Result<Vec<ListingEntry>, CacheError> {
        let url = self.category_url(category).map_err(CacheError::gateway)?;
        self.get_json(url, &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restaurant_url() {
        let gateway = HttpGateway::new("http://localhost:8080/api/").unwrap();
        assert_eq!(
            gateway.restaurant_url(42).unwrap().as_str(),
            "http://localhost:8080/api/restaurants/42"
        );

        let gateway = HttpGateway::new("http://localhost:8080").unwrap();
        assert_eq!(
            gateway.restaurant_url(7).unwrap().as_str(),
            "http://localhost:8080/restaurants/7"
        );
    }

    #[test]
    fn test_category_url_escapes_slash() {
        let gateway = HttpGateway::new("http://localhost:8080/api").unwrap();
        let url = gateway.category_url("한식/분식").unwrap();
        assert!(url.as_str().starts_with("http://localhost:8080/api/categories/"));
        assert!(url.as_str().ends_with("/restaurants"));
        assert!(url.as_str().contains("%2F"));
        assert_eq!(url.path_segments().unwrap().count(), 4);
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(HttpGateway::new("not a url").is_err());
        assert!(HttpGateway::new("mailto:someone@example.com").is_err());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_gateway_fault() {
        // Port 9 (discard) on loopback is closed on any sane test host
        let gateway = HttpGateway::new("http://127.0.0.1:9").unwrap();
        let err = gateway.fetch_category("치킨").await.unwrap_err();
        assert!(matches!(err, CacheError::Gateway(_)));
    }
}
