use anyhow::{anyhow, Result};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

/// HTTP client for the PostgREST-style data store. All table access
/// (appointments, scheduling settings, clinic/doctor directory) goes
/// through here; requests are signed with the service key from config.
pub struct StoreClient {
    client: Client,
    base_url: String,
    service_key: String,
}

impl StoreClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.store_url.clone(),
            service_key: config.store_service_key.clone(),
        }
    }

    fn headers(&self, representation: bool) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Ok(key) = HeaderValue::from_str(&self.service_key) {
            headers.insert("apikey", key);
        }
        if let Ok(bearer) = HeaderValue::from_str(&format!("Bearer {}", self.service_key)) {
            headers.insert(AUTHORIZATION, bearer);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if representation {
            headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        }

        headers
    }

    async fn request<T>(
        &self,
        method: Method,
        table: &str,
        filters: &str,
        body: Option<Value>,
        representation: bool,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = if filters.is_empty() {
            format!("{}/rest/v1/{}", self.base_url, table)
        } else {
            format!("{}/rest/v1/{}?{}", self.base_url, table, filters)
        };
        debug!("Store request: {} {}", method, url);

        let mut req = self
            .client
            .request(method, &url)
            .headers(self.headers(representation));

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Store error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Store authentication error: {}", error_text),
                404 => anyhow!("Store resource not found: {}", error_text),
                _ => anyhow!("Store error ({}): {}", status, error_text),
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Fetch rows from a table. `filters` is a raw PostgREST query string
    /// (e.g. `doctor_id=eq.<uuid>&status=in.(pending_approval,confirmed)`).
    pub async fn select<T>(&self, table: &str, filters: &str) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        self.request(Method::GET, table, filters, None, false).await
    }

    /// Insert a row and return the stored representation.
    pub async fn insert<T>(&self, table: &str, body: Value) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        self.request(Method::POST, table, "", Some(body), true).await
    }

    /// Partial update of all rows matching `filters`; returns the updated rows.
    pub async fn update<T>(&self, table: &str, filters: &str, body: Value) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        self.request(Method::PATCH, table, filters, Some(body), true)
            .await
    }

    /// Delete all rows matching `filters`; returns the deleted rows.
    pub async fn delete(&self, table: &str, filters: &str) -> Result<Vec<Value>> {
        self.request(Method::DELETE, table, filters, None, true).await
    }
}
