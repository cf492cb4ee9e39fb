//! HTTP phrasing collaborator.
//!
//! Delegates question wording to an external service. The runtime's
//! question text is always sent along so callers can fall back to it
//! when the service is unreachable.

use anyhow::{bail, Context as _, Result};
use async_trait::async_trait;
use cotiza_agent::collaborators::{PendingQuestion, PhrasingService};
use cotiza_core::config::PhrasingConfig;
use cotiza_core::domain::record::QuotationRecord;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug)]
pub struct HttpPhrasing {
    client: Client,
    base_url: String,
    api_key: Option<SecretString>,
}

#[derive(Debug, Serialize)]
struct PhraseRequest<'a> {
    question_key: String,
    prompt: &'a str,
    position: usize,
    total: Option<usize>,
    client_name: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PhraseResponse {
    text: String,
}

impl HttpPhrasing {
    pub fn from_config(config: &PhrasingConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .context("phrasing.base_url is required for http mode")?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("phrasing HTTP client build failed")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl PhrasingService for HttpPhrasing {
    async fn phrase(&self, pending: &PendingQuestion, record: &QuotationRecord) -> Result<String> {
        let url = format!("{}/phrase", self.base_url);
        let mut request = self.client.post(&url).json(&PhraseRequest {
            question_key: pending.key.storage_key(),
            prompt: &pending.prompt,
            position: pending.position,
            total: pending.total,
            client_name: record.client_name.as_deref(),
        });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request.send().await.context("phrasing request failed")?;
        if !response.status().is_success() {
            bail!("phrasing service returned {}", response.status());
        }

        let payload: PhraseResponse = response
            .json()
            .await
            .context("phrasing response decode failed")?;
        if payload.text.trim().is_empty() {
            bail!("phrasing service returned empty text");
        }
        Ok(payload.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cotiza_core::config::PhrasingMode;

    fn http_config(base_url: Option<&str>) -> PhrasingConfig {
        PhrasingConfig {
            mode: PhrasingMode::Http,
            base_url: base_url.map(str::to_string),
            api_key: None,
            timeout_secs: 5,
        }
    }

    #[test]
    fn http_mode_requires_a_base_url() {
        let error = HttpPhrasing::from_config(&http_config(None)).unwrap_err();
        assert!(error.to_string().contains("base_url"));
    }

    #[test]
    fn trailing_slashes_are_trimmed_from_the_base_url() {
        let phrasing = HttpPhrasing::from_config(&http_config(Some("http://phrase.local/"))).unwrap();
        assert_eq!(phrasing.base_url, "http://phrase.local");
    }
}
