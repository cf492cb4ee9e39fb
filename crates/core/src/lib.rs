pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod pricing;

pub use catalog::{Catalog, FinishTier};
pub use domain::question::{Answer, AnswerValue, QuestionKey, QuestionKind};
pub use domain::record::{QuotationRecord, Room};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{
    FlowAction, FlowContext, FlowDefinition, FlowEngine, FlowEvent, FlowState,
    FlowTransitionError, IntakeFlow, TransitionOutcome,
};
pub use pricing::{
    AreaBreakdown, CostBreakdown, DeterministicPricingEngine, PricingEngine, PricingTrace,
};
