use crate::domain::market::macro_context::{MacroModifiers, SentimentClassification};
use crate::domain::ports::MacroSignalProvider;
use crate::infrastructure::core::http_client_factory::{HttpClientFactory, build_url_with_query};
use anyhow::Context;
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_URL: &str = "https://api.alternative.me/fng/";

#[derive(Debug, Deserialize)]
struct FearGreedResponse {
    data: Vec<FearGreedEntry>,
}

#[derive(Debug, Deserialize)]
struct FearGreedEntry {
    value: String,
}

/// Crypto Fear & Greed index from alternative.me.
///
/// Only `fear_index` is filled; the other modifiers stay unset.
pub struct AlternativeMeMacroProvider {
    client: ClientWithMiddleware,
    url: String,
}

impl AlternativeMeMacroProvider {
    pub fn new() -> Self {
        Self::with_url(DEFAULT_URL)
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            client: HttpClientFactory::create_client(3, Duration::from_secs(10)),
            url: url.into(),
        }
    }

    /// Latest index value in a response body.
    pub fn parse_index(body: &str) -> anyhow::Result<u8> {
        let response: FearGreedResponse =
            serde_json::from_str(body).context("Failed to parse alternative.me response")?;
        let entry = response
            .data
            .first()
            .context("No fear & greed data in response")?;
        let value: u8 = entry
            .value
            .trim()
            .parse()
            .with_context(|| format!("Failed to parse index value {:?}", entry.value))?;
        anyhow::ensure!(value <= 100, "Fear & greed index out of range: {}", value);
        Ok(value)
    }
}

impl Default for AlternativeMeMacroProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MacroSignalProvider for AlternativeMeMacroProvider {
    async fn fetch_modifiers(&self) -> anyhow::Result<MacroModifiers> {
        let url = build_url_with_query(&self.url, &[("limit", "1")]);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send request to alternative.me")?;

        if !response.status().is_success() {
            anyhow::bail!("alternative.me returned status: {}", response.status());
        }

        let body = response
            .text()
            .await
            .context("Failed to read alternative.me response")?;
        let value = Self::parse_index(&body)?;

        info!(
            "AlternativeMe: fear & greed {} ({})",
            value,
            SentimentClassification::from_score(value)
        );
        Ok(MacroModifiers {
            fear_index: Some(value),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_latest_entry() {
        let body = r#"{"name":"Fear and Greed Index","data":[{"value":"23","value_classification":"Extreme Fear","timestamp":"1718150400"}],"metadata":{"error":null}}"#;
        assert_eq!(AlternativeMeMacroProvider::parse_index(body).unwrap(), 23);
    }

    #[test]
    fn test_parse_rejects_bad_payloads() {
        assert!(AlternativeMeMacroProvider::parse_index(r#"{"data":[]}"#).is_err());
        assert!(AlternativeMeMacroProvider::parse_index(r#"{"data":[{"value":"abc"}]}"#).is_err());
        assert!(AlternativeMeMacroProvider::parse_index(r#"{"data":[{"value":"250"}]}"#).is_err());
    }
}
