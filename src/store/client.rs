//! Registry Store Client
//!
//! A client for the patient registry's PostgREST endpoint, covering the three
//! read queries and the single insert the dashboard needs.

use crate::config::Config;
use crate::consts::cli_consts::http;
use crate::patient::{NewPatient, Patient};
use crate::store::Store;
use crate::store::error::StoreError;
use reqwest::header::{AUTHORIZATION, RANGE};
use reqwest::{Client, ClientBuilder, RequestBuilder, Response};

// User-Agent string with CLI version
const USER_AGENT: &str = concat!("baripronto/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct StoreClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl StoreClient {
    pub fn new(config: Config) -> Self {
        Self {
            client: ClientBuilder::new()
                .connect_timeout(http::connect_timeout())
                .timeout(http::request_timeout())
                .build()
                .expect("Failed to create HTTP client"),
            base_url: config.url,
            api_key: config.key,
        }
    }

    fn build_url(&self, endpoint: &str) -> String {
        format!(
            "{}/rest/v1/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    fn with_auth(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("User-Agent", USER_AGENT)
            .header("apikey", &self.api_key)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
    }

    async fn handle_response_status(response: Response) -> Result<Response, StoreError> {
        if !response.status().is_success() {
            return Err(StoreError::from_response(response).await);
        }
        Ok(response)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
    ) -> Result<T, StoreError> {
        let url = self.build_url(endpoint);
        let response = self.with_auth(self.client.get(&url)).send().await?;

        let response = Self::handle_response_status(response).await?;
        let response_bytes = response.bytes().await?;
        serde_json::from_slice(&response_bytes).map_err(StoreError::Decode)
    }

    /// Exact row count of a table via a zero-row ranged request. PostgREST
    /// reports the total in the `Content-Range` header (`0-0/N` or `*/N`).
    async fn count(&self, table: &str) -> Result<u64, StoreError> {
        let url = self.build_url(&format!("{table}?select=id"));
        let response = self
            .with_auth(self.client.get(&url))
            .header("Prefer", "count=exact")
            .header(RANGE, "0-0")
            .send()
            .await?;

        let response = Self::handle_response_status(response).await?;
        response
            .headers()
            .get("content-range")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or(StoreError::MissingCount)
    }
}

/// Extracts the total from a `Content-Range` value such as `0-0/42` or `*/42`.
fn parse_content_range_total(value: &str) -> Option<u64> {
    value.rsplit('/').next()?.trim().parse().ok()
}

#[async_trait::async_trait]
impl Store for StoreClient {
    async fn list_recent_patients(&self, limit: u32) -> Result<Vec<Patient>, StoreError> {
        let endpoint = format!(
            "patients?select=id,name,birth_date,created_at&order=created_at.desc,id.desc&limit={limit}"
        );
        self.get_json(&endpoint).await
    }

    async fn count_patients(&self) -> Result<u64, StoreError> {
        self.count("patients").await
    }

    async fn count_visits(&self) -> Result<u64, StoreError> {
        self.count("visits").await
    }

    async fn insert_patient(&self, patient: NewPatient) -> Result<(), StoreError> {
        let url = self.build_url("patients");
        let response = self
            .with_auth(self.client.post(&url))
            .header("Prefer", "return=minimal")
            .json(&patient)
            .send()
            .await?;

        Self::handle_response_status(response).await?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> StoreClient {
        StoreClient::new(Config::new(url.to_string(), "anon-key".to_string()))
    }

    #[test]
    // Trailing slashes on the base URL must not produce double slashes.
    fn test_build_url_normalizes_slashes() {
        let client = client("https://registry.example.com/");
        assert_eq!(
            client.build_url("/patients"),
            "https://registry.example.com/rest/v1/patients"
        );
        assert_eq!(
            client.build_url("visits?select=id"),
            "https://registry.example.com/rest/v1/visits?select=id"
        );
    }

    #[test]
    fn test_parse_content_range_total() {
        assert_eq!(parse_content_range_total("0-0/42"), Some(42));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("*/*"), None);
        assert_eq!(parse_content_range_total("garbage"), None);
    }
}
