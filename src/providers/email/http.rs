//! Authenticated JSON-over-HTTPS client shared by the REST sessions.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, RETRY_AFTER};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use super::{ProviderError, Result};

/// OAuth token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[allow(dead_code)]
    expires_in: Option<u64>,
}

/// Exchanges a refresh token for an access token.
///
/// `params` are sent as a form body alongside `grant_type=refresh_token`.
pub async fn refresh_access_token(
    client: &reqwest::Client,
    token_url: &str,
    params: &[(&str, &str)],
) -> Result<String> {
    let mut form: Vec<(&str, &str)> = params.to_vec();
    form.push(("grant_type", "refresh_token"));

    let response = client
        .post(token_url)
        .form(&form)
        .send()
        .await
        .map_err(map_transport_error)?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Authentication(format!(
            "token refresh failed ({}): {}",
            status, body
        )));
    }

    let token_response: TokenResponse = response
        .json()
        .await
        .map_err(|e| ProviderError::MalformedResponse(format!("parse token response: {}", e)))?;

    Ok(token_response.access_token)
}

/// Builds the HTTP client used by every session.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Internal(format!("build HTTP client: {}", e)))
}

/// A bearer-authenticated client bound to one API base URL.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl RestClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, access_token: String) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token,
        }
    }

    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.access_token))
                .map_err(|e| ProviderError::Internal(format!("invalid header: {}", e)))?,
        );
        Ok(headers)
    }

    /// GET `{base_url}{endpoint}` with query parameters.
    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers()?)
            .query(query)
            .send()
            .await
            .map_err(map_transport_error)?;

        self.handle_response(response).await
    }

    /// GET an absolute URL, such as a server-issued next-page link.
    pub async fn get_url<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .headers(self.auth_headers()?)
            .send()
            .await
            .map_err(map_transport_error)?;

        self.handle_response(response).await
    }

    /// DELETE `{base_url}{endpoint}`, expecting an empty success response.
    pub async fn delete(&self, endpoint: &str) -> Result<()> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self
            .client
            .delete(&url)
            .headers(self.auth_headers()?)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            return Err(self.handle_error(response).await);
        }
        Ok(())
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            return Err(self.handle_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(format!("parse response: {}", e)))
    }

    async fn handle_error(&self, response: reqwest::Response) -> ProviderError {
        let status = response.status();
        let retry_after_secs = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();

        map_status(status.as_u16(), body, retry_after_secs)
    }
}

fn map_status(status: u16, body: String, retry_after_secs: Option<u64>) -> ProviderError {
    match status {
        401 => ProviderError::Authentication(format!("unauthorized: {}", body)),
        404 => ProviderError::NotFound(body),
        429 => ProviderError::RateLimited { retry_after_secs },
        _ => ProviderError::Api {
            status,
            message: body,
        },
    }
}

fn map_transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Connection(e.to_string())
    }
}
