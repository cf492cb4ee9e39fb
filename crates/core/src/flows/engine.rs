use thiserror::Error;

use crate::domain::question::{Answer, QuestionKey};
use crate::flows::states::{
    FlowAction, FlowContext, FlowEvent, FlowState, FlowType, TransitionOutcome,
};

pub trait FlowDefinition {
    fn flow_type(&self) -> FlowType;
    fn initial_state(&self) -> FlowState;
    fn transition(
        &self,
        current: &FlowState,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

/// The guided quotation interview. One fixed question order with a room
/// sub-flow whose length is decided mid-conversation.
#[derive(Clone, Debug, Default)]
pub struct IntakeFlow;

impl FlowDefinition for IntakeFlow {
    fn flow_type(&self) -> FlowType {
        FlowType::Intake
    }

    fn initial_state(&self) -> FlowState {
        FlowState::Idle
    }

    fn transition(
        &self,
        current: &FlowState,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_intake(current, event, context)
    }
}

pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn flow_type(&self) -> FlowType {
        self.flow.flow_type()
    }

    pub fn initial_state(&self) -> FlowState {
        self.flow.initial_state()
    }

    pub fn apply(
        &self,
        current: &FlowState,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        self.flow.transition(current, event, context)
    }
}

impl Default for FlowEngine<IntakeFlow> {
    fn default() -> Self {
        Self::new(IntakeFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("answer for {answered:?} does not match the pending question {pending:?}")]
    AnswerOutOfOrder { pending: Option<QuestionKey>, answered: QuestionKey },
    #[error("room count is missing from context in state {state:?}")]
    MissingRoomCount { state: FlowState },
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: FlowState, event: FlowEvent },
}

fn transition_intake(
    current: &FlowState,
    event: &FlowEvent,
    context: &FlowContext,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use FlowEvent::{AnswerRecorded, CostsComputed, NewQuotationRequested, SessionOpened};
    use FlowState::{Complete, Computing, Idle};

    let (to, actions) = match (current, event) {
        (Idle, SessionOpened) => (FlowState::AskName, Vec::new()),
        (state, AnswerRecorded(answer)) => {
            let pending = state.pending_question();
            if pending.as_ref() != Some(&answer.key) {
                return Err(FlowTransitionError::AnswerOutOfOrder {
                    pending,
                    answered: answer.key.clone(),
                });
            }
            advance_after_answer(state, answer, context)?
        }
        (Computing, CostsComputed) => (
            Complete,
            vec![FlowAction::OfferDocumentExport, FlowAction::DispatchCompletionNotice],
        ),
        (Complete, NewQuotationRequested) => {
            (FlowState::AskProjectType, vec![FlowAction::ResetQuotation])
        }
        _ => {
            return Err(FlowTransitionError::InvalidTransition {
                state: current.clone(),
                event: event.clone(),
            });
        }
    };

    Ok(TransitionOutcome { from: current.clone(), to, event: event.clone(), actions })
}

fn advance_after_answer(
    current: &FlowState,
    answer: &Answer,
    context: &FlowContext,
) -> Result<(FlowState, Vec<FlowAction>), FlowTransitionError> {
    use FlowState::{
        AskAge, AskAmenities, AskArea, AskBudget, AskDuration, AskFinishTier, AskHasLot, AskName,
        AskProjectType, AskRoomBathroom, AskRoomBed, AskRoomCount, Complete, Computing, Idle,
    };

    let next = match current {
        AskName => (AskAge, Vec::new()),
        AskAge => (AskProjectType, Vec::new()),
        AskProjectType => (AskArea, Vec::new()),
        AskArea => (AskFinishTier, Vec::new()),
        AskFinishTier => (AskDuration, Vec::new()),
        AskDuration => (AskBudget, Vec::new()),
        AskBudget => (AskHasLot, Vec::new()),
        AskHasLot => (AskRoomCount, Vec::new()),
        AskRoomCount => {
            let additional = room_count(current, context)?;
            (AskRoomBed(0), vec![FlowAction::MaterializeRoomFlows { additional }])
        }
        AskRoomBed(0) => {
            if room_count(current, context)? == 0 {
                (AskAmenities, Vec::new())
            } else {
                (AskRoomBed(1), Vec::new())
            }
        }
        AskRoomBed(index) => (AskRoomBathroom(*index), Vec::new()),
        AskRoomBathroom(index) => {
            if *index < room_count(current, context)? {
                (AskRoomBed(index + 1), Vec::new())
            } else {
                (AskAmenities, Vec::new())
            }
        }
        AskAmenities => (Computing, vec![FlowAction::EvaluatePricing]),
        // No pending question in these states, so the answer-key check has
        // already rejected the event before this point can be reached.
        Idle | Computing | Complete => {
            return Err(FlowTransitionError::InvalidTransition {
                state: current.clone(),
                event: FlowEvent::AnswerRecorded(answer.clone()),
            });
        }
    };

    Ok(next)
}

fn room_count(state: &FlowState, context: &FlowContext) -> Result<u32, FlowTransitionError> {
    context
        .additional_rooms
        .ok_or_else(|| FlowTransitionError::MissingRoomCount { state: state.clone() })
}
