//! Side-effect collaborators.
//!
//! The turn pipeline itself is pure and synchronous; phrasing, document
//! rendering and completion notifications sit behind these traits so hosts
//! can wire HTTP-backed implementations without touching the interview
//! logic. [`TemplatePhrasing`] is the built-in fallback and the only
//! implementation the runtime needs to stay deterministic.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cotiza_core::domain::question::QuestionKey;
use cotiza_core::domain::record::QuotationRecord;
use cotiza_core::pricing::CostBreakdown;
use serde::{Deserialize, Serialize};

/// The question the flow is waiting on, with interview progress. `total`
/// stays unknown until the room count fixes the schedule length.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingQuestion {
    pub key: QuestionKey,
    pub prompt: String,
    pub position: usize,
    pub total: Option<usize>,
}

/// Summary handed to notification dispatchers when an interview completes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionNotice {
    pub client_name: Option<String>,
    pub project_type: Option<String>,
    pub costs: CostBreakdown,
    pub completed_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedDocument {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Turns the canonical prompt into the text shown to the client.
#[async_trait]
pub trait PhrasingService: Send + Sync {
    async fn phrase(&self, pending: &PendingQuestion, record: &QuotationRecord) -> Result<String>;
}

/// Renders the finished quotation as a downloadable document.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(&self, record: &QuotationRecord) -> Result<RenderedDocument>;
}

/// Delivers the completion notice to an external channel.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, notice: &CompletionNotice) -> Result<()>;
}

/// Canonical-prompt phrasing with a light personal touch once the client
/// has introduced themselves.
#[derive(Clone, Copy, Debug, Default)]
pub struct TemplatePhrasing;

#[async_trait]
impl PhrasingService for TemplatePhrasing {
    async fn phrase(&self, pending: &PendingQuestion, record: &QuotationRecord) -> Result<String> {
        match (&record.client_name, &pending.key) {
            (Some(name), QuestionKey::ClientAge) => {
                Ok(format!("Mucho gusto, {name}. {}", pending.prompt))
            }
            _ => Ok(pending.prompt.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use cotiza_core::domain::question::QuestionKey;
    use cotiza_core::domain::record::QuotationRecord;

    use super::{PendingQuestion, PhrasingService, TemplatePhrasing};

    fn pending(key: QuestionKey) -> PendingQuestion {
        PendingQuestion { prompt: key.prompt(), key, position: 1, total: None }
    }

    #[tokio::test]
    async fn template_phrasing_greets_after_the_name_arrives() {
        let mut record = QuotationRecord::new(Utc::now());
        record.client_name = Some("Laura".to_string());

        let phrased = TemplatePhrasing
            .phrase(&pending(QuestionKey::ClientAge), &record)
            .await
            .expect("template phrasing is infallible");
        assert!(phrased.starts_with("Mucho gusto, Laura."));
    }

    #[tokio::test]
    async fn template_phrasing_passes_prompts_through_otherwise() {
        let record = QuotationRecord::new(Utc::now());
        let question = pending(QuestionKey::SquareMeters);

        let phrased = TemplatePhrasing
            .phrase(&question, &record)
            .await
            .expect("template phrasing is infallible");
        assert_eq!(phrased, question.prompt);
    }
}
