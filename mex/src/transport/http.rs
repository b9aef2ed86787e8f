use super::body::{content_type, decode, header_map, read_capped};
use super::{FetchedBody, LocationFetcher};
use crate::config::HttpFetchConfig;
use crate::error::{MexError, MexResult, TransportError};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT};
use std::time::Duration;
use url::Url;

/// Location fetcher that performs a plain HTTP GET
pub struct HttpLocationFetcher {
    config: HttpFetchConfig,
    client: reqwest::Client,
}

impl HttpLocationFetcher {
    pub fn new(config: HttpFetchConfig) -> MexResult<Self> {
        let mut headers = header_map(&config.headers)?;
        headers
            .entry(ACCEPT)
            .or_insert(HeaderValue::from_static("application/xml, text/xml, */*"));

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| MexError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl LocationFetcher for HttpLocationFetcher {
    async fn fetch(
        &self,
        location: &Url,
        dialect: Option<&str>,
        _identifier: Option<&str>,
        timeout: Duration,
    ) -> Result<FetchedBody, TransportError> {
        log::debug!(
            "GET {} (dialect: {})",
            location,
            dialect.unwrap_or("unspecified")
        );

        let response = self
            .client
            .get(location.clone())
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }

        let content_type = content_type(&response);
        let bytes = read_capped(response, self.config.max_response_bytes).await?;
        let text = decode(bytes, content_type.as_deref())?;

        Ok(FetchedBody { text, content_type })
    }

    fn name(&self) -> &str {
        "HttpGet"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_fetcher_builds_with_default_config() {
        assert!(HttpLocationFetcher::new(HttpFetchConfig::default()).is_ok());
    }

    #[test]
    fn test_fetcher_rejects_invalid_header() {
        let mut headers = HashMap::new();
        headers.insert("X-Ok".to_string(), "bad\nvalue".to_string());
        let config = HttpFetchConfig {
            headers,
            ..Default::default()
        };
        assert!(matches!(
            HttpLocationFetcher::new(config),
            Err(MexError::Config(_))
        ));
    }
}
