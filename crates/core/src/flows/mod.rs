pub mod engine;
pub mod schedule;
pub mod states;

pub use engine::{FlowDefinition, FlowEngine, FlowTransitionError, IntakeFlow};
pub use states::{FlowAction, FlowContext, FlowEvent, FlowState, FlowType, TransitionOutcome};
