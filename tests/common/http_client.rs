//! HTTP client helpers for tests.

use std::time::Duration;

use serde::Deserialize;

use hilite::pipeline::STATUS_HEADER;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(DEFAULT_TIMEOUT_SECS);

pub struct TestClient {
    client: reqwest::Client,
    base_url: String,
}

impl TestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}/{}", self.base_url, path)
    }

    pub async fn health(&self) -> Result<HealthBody, TestClientError> {
        let resp = self.client.get(self.url("/api/health")).send().await?;

        if resp.status().is_success() {
            Ok(resp.json().await?)
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            Err(TestClientError::UnexpectedStatus(status, body))
        }
    }

    /// Posts a highlight request and returns the body together with the
    /// `X-Hilite-Status` header value.
    pub async fn highlight(
        &self,
        text: &str,
        question: &str,
    ) -> Result<(serde_json::Value, String), TestClientError> {
        self.highlight_request(text, question, None).await
    }

    pub async fn highlight_with_key(
        &self,
        text: &str,
        question: &str,
        api_key: &str,
    ) -> Result<(serde_json::Value, String), TestClientError> {
        self.highlight_request(text, question, Some(api_key)).await
    }

    async fn highlight_request(
        &self,
        text: &str,
        question: &str,
        api_key: Option<&str>,
    ) -> Result<(serde_json::Value, String), TestClientError> {
        let body = serde_json::json!({ "text": text, "question": question });
        let mut builder = self.client.post(self.url("/api/highlight")).json(&body);
        if let Some(key) = api_key {
            builder = builder.header("x-api-key", key);
        }

        let resp = builder.send().await?;

        let status_header = resp
            .headers()
            .get(STATUS_HEADER)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        match resp.status().as_u16() {
            200 => Ok((resp.json().await?, status_header)),
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(TestClientError::UnexpectedStatus(status, body))
            }
        }
    }

    pub async fn saved_list(&self) -> Result<serde_json::Value, TestClientError> {
        let resp = self.client.get(self.url("/api/saved")).send().await?;

        if resp.status().is_success() {
            Ok(resp.json().await?)
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            Err(TestClientError::UnexpectedStatus(status, body))
        }
    }

    /// Fetches one saved query. Returns `None` on 404.
    pub async fn saved_get(&self, hash: &str) -> Result<Option<serde_json::Value>, TestClientError> {
        let resp = self
            .client
            .get(self.url(&format!("/api/saved/{hash}")))
            .send()
            .await?;

        match resp.status().as_u16() {
            200 => Ok(Some(resp.json().await?)),
            404 => Ok(None),
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(TestClientError::UnexpectedStatus(status, body))
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthBody {
    pub status: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TestClientError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Unexpected HTTP status: {0} - Body: {1}")]
    UnexpectedStatus(u16, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_url_building() {
        let client = TestClient::new("http://localhost:8080");
        assert_eq!(client.url("/api/health"), "http://localhost:8080/api/health");
        assert_eq!(client.url("api/health"), "http://localhost:8080/api/health");
    }
}
