//! Interview runtime.
//!
//! One turn runs the same pipeline every time: parse the text against the
//! pending question, record the answer, ask the flow engine for the next
//! state, then execute whatever actions the transition emitted. Pricing
//! happens inline when the flow reaches `Computing`, so callers only ever
//! observe states that wait on the client or the finished interview.

use std::collections::VecDeque;

use chrono::Utc;
use cotiza_core::domain::question::{Answer, QuestionKey, QuestionKind};
use cotiza_core::domain::record::QuotationRecord;
use cotiza_core::errors::{ApplicationError, DomainError};
use cotiza_core::flows::{
    schedule, FlowAction, FlowContext, FlowEngine, FlowEvent, FlowState, IntakeFlow,
    TransitionOutcome,
};
use cotiza_core::pricing::{format_cop, price_record_with_trace, survey_record_areas, AreaBreakdown};
use serde::Serialize;
use tracing::{debug, info};

use crate::collaborators::{CompletionNotice, PendingQuestion};
use crate::extraction::{Extraction, ExtractionMiss, FactExtractor};
use crate::guardrails::{ScopeGuard, ScopeVerdict};
use crate::session::{IntakeSession, SessionId, SessionStore};

/// What one turn produced.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TurnReply {
    /// The answer was recorded and the interview moved on.
    NextQuestion { pending: PendingQuestion },
    /// The turn did not answer the pending question; it is asked again.
    StillPending { pending: PendingQuestion, clarification: String },
    /// The turn was off topic; the fixed redirect is returned and nothing
    /// was recorded.
    Redirected { redirect: String, pending: PendingQuestion },
    /// The interview finished and costs are on the record.
    Completed { notice: CompletionNotice, closing: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OpenedSession {
    pub session_id: SessionId,
    pub pending: PendingQuestion,
}

/// Read-only view of a session for inspection endpoints.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecordSnapshot {
    pub session_id: String,
    pub state: FlowState,
    pub answered: Vec<String>,
    pub pending: Option<PendingQuestion>,
    pub record: QuotationRecord,
    pub areas: AreaBreakdown,
}

pub struct IntakeRuntime {
    engine: FlowEngine<IntakeFlow>,
    extractor: FactExtractor,
    guard: ScopeGuard,
    store: SessionStore,
}

impl IntakeRuntime {
    pub fn new() -> Self {
        Self {
            engine: FlowEngine::default(),
            extractor: FactExtractor::new(),
            guard: ScopeGuard::new(),
            store: SessionStore::new(),
        }
    }

    pub fn session_count(&self) -> usize {
        self.store.len()
    }

    pub fn open_session(&self) -> Result<OpenedSession, ApplicationError> {
        let session_id = self.store.create();
        let pending = self
            .store
            .with_session(&session_id, |session| -> Result<PendingQuestion, ApplicationError> {
                let outcome = self
                    .engine
                    .apply(&session.state, &FlowEvent::SessionOpened, &context_of(session))
                    .map_err(DomainError::from)?;
                session.state = outcome.to;
                pending_question_for(session).ok_or_else(|| {
                    ApplicationError::Domain(DomainError::InvariantViolation(
                        "opened session has no pending question".to_string(),
                    ))
                })
            })
            .ok_or_else(|| ApplicationError::SessionNotFound(session_id.to_string()))??;

        info!(event_name = "intake.session.opened", session_id = %session_id, "session opened");
        Ok(OpenedSession { session_id, pending })
    }

    pub fn submit_turn(
        &self,
        session_id: &SessionId,
        text: &str,
    ) -> Result<TurnReply, ApplicationError> {
        self.store
            .with_session(session_id, |session| self.process_turn(session_id, session, text))
            .ok_or_else(|| ApplicationError::SessionNotFound(session_id.to_string()))?
    }

    pub fn record(&self, session_id: &SessionId) -> Result<RecordSnapshot, ApplicationError> {
        let session = self
            .store
            .snapshot(session_id)
            .ok_or_else(|| ApplicationError::SessionNotFound(session_id.to_string()))?;

        let answered = session.answered.iter().map(|key| key.storage_key()).collect();
        let pending = pending_question_for(&session);
        let areas = survey_record_areas(&session.record);
        Ok(RecordSnapshot {
            session_id: session_id.to_string(),
            state: session.state.clone(),
            answered,
            pending,
            record: session.record,
            areas,
        })
    }

    /// Drops everything but the client's identity and resumes at the first
    /// unanswered question of the fixed part of the interview.
    pub fn restart(&self, session_id: &SessionId) -> Result<TurnReply, ApplicationError> {
        self.store
            .with_session(session_id, |session| {
                reset_quotation(session);
                let next = schedule::first_unanswered(&schedule::static_schedule(), &session.answered)
                    .unwrap_or(QuestionKey::ProjectType);
                session.state = FlowState::for_question(&next);
                info!(event_name = "intake.session.restarted", session_id = %session_id, "quotation restarted");
                TurnReply::NextQuestion { pending: describe_question(&next, &session.record) }
            })
            .ok_or_else(|| ApplicationError::SessionNotFound(session_id.to_string()))
    }

    pub fn end_session(&self, session_id: &SessionId) -> Result<(), ApplicationError> {
        if !self.store.remove(session_id) {
            return Err(ApplicationError::SessionNotFound(session_id.to_string()));
        }
        info!(event_name = "intake.session.ended", session_id = %session_id, "session ended");
        Ok(())
    }

    fn process_turn(
        &self,
        session_id: &SessionId,
        session: &mut IntakeSession,
        text: &str,
    ) -> Result<TurnReply, ApplicationError> {
        if session.state == FlowState::Idle {
            // An unopened session starts its interview on first contact.
            let outcome = self
                .engine
                .apply(&session.state, &FlowEvent::SessionOpened, &context_of(session))
                .map_err(DomainError::from)?;
            session.state = outcome.to;
        }

        if session.state == FlowState::Complete {
            return self.process_completed_turn(session_id, session, text);
        }

        let Some(pending_key) = session.state.pending_question() else {
            return Err(ApplicationError::Domain(DomainError::InvariantViolation(format!(
                "state {:?} accepts no answers",
                session.state
            ))));
        };

        match self.extractor.extract(&pending_key, text) {
            Extraction::Answered(value) => {
                self.advance(session_id, session, Answer::new(pending_key, value))
            }
            Extraction::Unanswered(miss) => {
                if let ScopeVerdict::OffTopic { marker } = self.guard.classify(text) {
                    info!(
                        event_name = "intake.turn.redirected",
                        session_id = %session_id,
                        marker,
                        "off-topic turn redirected"
                    );
                    return Ok(TurnReply::Redirected {
                        redirect: self.guard.redirect_message().to_string(),
                        pending: describe_question(&pending_key, &session.record),
                    });
                }
                debug!(
                    event_name = "intake.turn.unparsed",
                    session_id = %session_id,
                    question = %pending_key.storage_key(),
                    "turn did not answer the pending question"
                );
                Ok(TurnReply::StillPending {
                    clarification: clarification_for(&pending_key, miss),
                    pending: describe_question(&pending_key, &session.record),
                })
            }
        }
    }

    fn advance(
        &self,
        session_id: &SessionId,
        session: &mut IntakeSession,
        answer: Answer,
    ) -> Result<TurnReply, ApplicationError> {
        session.record.apply_answer(&answer)?;
        let outcome = self
            .engine
            .apply(
                &session.state,
                &FlowEvent::AnswerRecorded(answer.clone()),
                &context_of(session),
            )
            .map_err(DomainError::from)?;

        session.answered.insert(answer.key.clone());
        debug!(
            event_name = "intake.turn.answered",
            session_id = %session_id,
            question = %answer.key.storage_key(),
            "answer recorded"
        );

        let TransitionOutcome { to, actions, .. } = outcome;
        session.state = to;
        self.run_actions(session_id, session, actions)
    }

    fn process_completed_turn(
        &self,
        session_id: &SessionId,
        session: &mut IntakeSession,
        text: &str,
    ) -> Result<TurnReply, ApplicationError> {
        if wants_new_quotation(text) {
            let outcome = self
                .engine
                .apply(&session.state, &FlowEvent::NewQuotationRequested, &context_of(session))
                .map_err(DomainError::from)?;
            info!(
                event_name = "intake.session.new_quotation",
                session_id = %session_id,
                "starting a follow-up quotation"
            );
            let TransitionOutcome { to, actions, .. } = outcome;
            session.state = to;
            return self.run_actions(session_id, session, actions);
        }

        // The finished interview keeps answering with its closing summary.
        Ok(TurnReply::Completed {
            notice: completion_notice(&session.record)?,
            closing: closing_message(&session.record),
        })
    }

    fn run_actions(
        &self,
        session_id: &SessionId,
        session: &mut IntakeSession,
        actions: Vec<FlowAction>,
    ) -> Result<TurnReply, ApplicationError> {
        let mut queue: VecDeque<FlowAction> = actions.into();
        while let Some(action) = queue.pop_front() {
            match action {
                FlowAction::MaterializeRoomFlows { additional } => {
                    debug!(
                        event_name = "intake.flow.rooms_materialized",
                        session_id = %session_id,
                        additional,
                        "room sub-flow materialized"
                    );
                }
                FlowAction::EvaluatePricing => {
                    let (costs, trace) = price_record_with_trace(&session.record)?;
                    info!(
                        event_name = "intake.pricing.computed",
                        session_id = %session_id,
                        total = %costs.total_cost,
                        steps = trace.steps.len(),
                        "quotation priced"
                    );
                    session.record.costs = Some(costs);
                    let outcome = self
                        .engine
                        .apply(&session.state, &FlowEvent::CostsComputed, &context_of(session))
                        .map_err(DomainError::from)?;
                    let TransitionOutcome { to, actions, .. } = outcome;
                    session.state = to;
                    queue.extend(actions);
                }
                FlowAction::OfferDocumentExport | FlowAction::DispatchCompletionNotice => {
                    // Both surface through the Completed reply; the host
                    // decides whether to render or notify.
                }
                FlowAction::ResetQuotation => {
                    reset_quotation(session);
                }
            }
        }

        if let Some(pending) = pending_question_for(session) {
            return Ok(TurnReply::NextQuestion { pending });
        }
        if session.state == FlowState::Complete {
            return Ok(TurnReply::Completed {
                notice: completion_notice(&session.record)?,
                closing: closing_message(&session.record),
            });
        }
        Err(ApplicationError::Domain(DomainError::InvariantViolation(format!(
            "interview stopped in {:?} without a pending question",
            session.state
        ))))
    }
}

impl Default for IntakeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

fn context_of(session: &IntakeSession) -> FlowContext {
    FlowContext { additional_rooms: session.record.additional_rooms }
}

fn reset_quotation(session: &mut IntakeSession) {
    session.record.reset_for_new_quotation();
    session
        .answered
        .retain(|key| matches!(key, QuestionKey::ClientName | QuestionKey::ClientAge));
}

fn pending_question_for(session: &IntakeSession) -> Option<PendingQuestion> {
    session.state.pending_question().map(|key| describe_question(&key, &session.record))
}

fn describe_question(key: &QuestionKey, record: &QuotationRecord) -> PendingQuestion {
    let schedule = match record.additional_rooms {
        Some(additional) => schedule::full_schedule(additional),
        None => schedule::static_schedule(),
    };
    let position =
        schedule.iter().position(|entry| entry == key).map_or(schedule.len(), |index| index + 1);
    let total = record.additional_rooms.map(schedule::question_total);
    PendingQuestion { key: key.clone(), prompt: key.prompt(), position, total }
}

fn clarification_for(key: &QuestionKey, miss: ExtractionMiss) -> String {
    match (key.kind(), miss) {
        (QuestionKind::Integer(band), ExtractionMiss::OutOfRange) => match band.max {
            Some(max) => format!("Necesito un número entre {} y {}.", band.min, max),
            None => format!("Necesito un número mayor o igual a {}.", band.min),
        },
        _ => "No logré entender tu respuesta, ¿me la repites de otra forma?".to_string(),
    }
}

fn wants_new_quotation(text: &str) -> bool {
    let normalized = crate::extraction::normalize_text(text);
    [
        "nueva cotizacion",
        "otra cotizacion",
        "cotizar de nuevo",
        "empezar de nuevo",
        "nuevo proyecto",
        "iniciar otra",
    ]
    .iter()
    .any(|phrase| normalized.contains(phrase))
}

fn completion_notice(record: &QuotationRecord) -> Result<CompletionNotice, ApplicationError> {
    let costs = record.costs.clone().ok_or_else(|| {
        ApplicationError::Domain(DomainError::InvariantViolation(
            "completed interview without computed costs".to_string(),
        ))
    })?;
    Ok(CompletionNotice {
        client_name: record.client_name.clone(),
        project_type: record.project_type.clone(),
        costs,
        completed_at: Utc::now(),
    })
}

fn closing_message(record: &QuotationRecord) -> String {
    let thanks = match &record.client_name {
        Some(name) => format!("¡Gracias, {name}!"),
        None => "¡Gracias!".to_string(),
    };
    match &record.costs {
        Some(costs) => format!(
            "{thanks} Tu cotización está lista. Construcción: {}. Diseño: {}. Total: {}. \
             Puedes descargar el documento de tu cotización o pedirme una nueva cuando quieras.",
            format_cop(costs.construction_cost),
            format_cop(costs.design_cost),
            format_cop(costs.total_cost),
        ),
        None => format!("{thanks} Tu cotización está lista."),
    }
}
