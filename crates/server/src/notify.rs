//! Completion notice delivery over a JSON webhook.

use anyhow::{bail, Context as _, Result};
use async_trait::async_trait;
use cotiza_agent::collaborators::{CompletionNotice, NotificationDispatcher};
use cotiza_core::config::NotificationsConfig;
use cotiza_core::pricing::format_cop;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};

pub struct WebhookNotifier {
    client: Client,
    webhook_url: String,
    max_retries: u32,
}

impl WebhookNotifier {
    /// Returns `None` when notifications are disabled.
    pub fn from_config(config: &NotificationsConfig) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        let webhook_url = match &config.webhook_url {
            Some(url) => url.clone(),
            None => bail!("notifications.webhook_url is required when notifications are enabled"),
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("notification HTTP client build failed")?;
        Ok(Some(Self {
            client,
            webhook_url,
            max_retries: config.max_retries,
        }))
    }
}

pub(crate) fn notice_payload(notice: &CompletionNotice) -> Value {
    json!({
        "evento": "cotizacion_completada",
        "cliente": notice.client_name,
        "tipo_proyecto": notice.project_type,
        "area_total_m2": notice.costs.areas.total(),
        "costo_construccion": format_cop(notice.costs.construction_cost),
        "costo_diseno": format_cop(notice.costs.design_cost),
        "costo_total": format_cop(notice.costs.total_cost),
        "completada_en": notice.completed_at.to_rfc3339(),
    })
}

#[async_trait]
impl NotificationDispatcher for WebhookNotifier {
    async fn dispatch(&self, notice: &CompletionNotice) -> Result<()> {
        let payload = notice_payload(notice);
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.client.post(&self.webhook_url).json(&payload).send().await {
                Ok(response) if response.status().is_success() => {
                    info!(
                        event_name = "notify.completion.delivered",
                        attempt,
                        "completion notice delivered"
                    );
                    return Ok(());
                }
                Ok(response) if attempt > self.max_retries => {
                    bail!("completion webhook returned {}", response.status())
                }
                Err(error) if attempt > self.max_retries => {
                    return Err(error).context("completion webhook unreachable")
                }
                Ok(response) => warn!(
                    event_name = "notify.completion.retry",
                    status = %response.status(),
                    attempt,
                    "completion webhook rejected, retrying"
                ),
                Err(error) => warn!(
                    event_name = "notify.completion.retry",
                    error = %error,
                    attempt,
                    "completion webhook failed, retrying"
                ),
            }
            tokio::time::sleep(Duration::from_millis(200 * u64::from(attempt))).await;
        }
    }
}
