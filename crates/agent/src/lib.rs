//! Intake agent - scoped extraction and interview orchestration
//!
//! This crate is the conversational layer of the cotiza system. It turns
//! free Spanish text into recorded answers and drives the quotation
//! interview to completion:
//! - **Scoped extraction** (`extraction`) - Parse one turn against the one
//!   pending question, nothing else
//! - **Scope guard** (`guardrails`) - Redirect off-topic turns without
//!   touching the record
//! - **Sessions** (`session`) - Independent, in-memory interviews keyed by id
//! - **Runtime** (`runtime`) - The extract, record, transition, price turn
//!   pipeline
//! - **Collaborators** (`collaborators`) - Phrasing, document and
//!   notification seams for hosts
//!
//! # Safety Principle
//!
//! Extraction is strictly a translator. It never decides costs or flow
//! order; those are deterministic decisions made by the core engine.

pub mod collaborators;
pub mod extraction;
pub mod guardrails;
pub mod runtime;
pub mod session;

pub use collaborators::{
    CompletionNotice, DocumentRenderer, NotificationDispatcher, PendingQuestion, PhrasingService,
    RenderedDocument, TemplatePhrasing,
};
pub use extraction::{Extraction, ExtractionMiss, FactExtractor};
pub use guardrails::{ScopeGuard, ScopeVerdict, REDIRECT_MESSAGE};
pub use runtime::{IntakeRuntime, OpenedSession, RecordSnapshot, TurnReply};
pub use session::{IntakeSession, SessionId, SessionStore};
